//! Decision rules that map an observation window to an action.

use super::action::Action;
use crate::features::{SMA_LONG_COL, SMA_SHORT_COL};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait Policy {
    fn name(&self) -> &str;

    fn act(&mut self, observation: &Array2<f64>) -> Action;

    /// Called at the start of each episode.
    fn reset(&mut self) {}
}

/// Always flat.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoldPolicy;

impl Policy for HoldPolicy {
    fn name(&self) -> &str {
        "hold"
    }

    fn act(&mut self, _observation: &Array2<f64>) -> Action {
        Action::Hold
    }
}

/// Replays a fixed action list, then holds.
#[derive(Debug, Clone)]
pub struct ScriptedPolicy {
    actions: Vec<Action>,
    cursor: usize,
}

impl ScriptedPolicy {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions, cursor: 0 }
    }
}

impl Policy for ScriptedPolicy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn act(&mut self, _observation: &Array2<f64>) -> Action {
        let action = self.actions.get(self.cursor).copied().unwrap_or(Action::Hold);
        self.cursor += 1;
        action
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}

/// Uniform over the three actions.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: StdRng,
    seed: u64,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }
}

impl Policy for RandomPolicy {
    fn name(&self) -> &str {
        "random"
    }

    fn act(&mut self, _observation: &Array2<f64>) -> Action {
        Action::ALL[self.rng.gen_range(0..Action::ALL.len())]
    }

    fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }
}

/// Long while the short mean is above the long mean, short otherwise.
///
/// Reads the last observation row; expects the feature layout of
/// [`crate::features::FeatureSet`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SmaCrossPolicy;

impl Policy for SmaCrossPolicy {
    fn name(&self) -> &str {
        "sma-cross"
    }

    fn act(&mut self, observation: &Array2<f64>) -> Action {
        let Some(last) = observation.nrows().checked_sub(1).map(|i| observation.row(i)) else {
            return Action::Hold;
        };
        match (last.get(SMA_SHORT_COL), last.get(SMA_LONG_COL)) {
            (Some(short), Some(long)) if short > long => Action::Long,
            (Some(_), Some(_)) => Action::Short,
            _ => Action::Hold,
        }
    }
}
