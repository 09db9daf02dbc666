use std::sync::Arc;

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use super::action::{Action, Position};
use super::cost::CostModel;
use super::state::{SimStatus, SimulationState, StepInfo};
use super::SimError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Rows of history in each observation.
    pub window: usize,
    /// Cost rate per unit of position change.
    pub transaction_cost: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            window: 30,
            transaction_cost: 0.0005,
        }
    }
}

/// Result of one `step()`.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// `window x n_features`; all zeros once the episode is done.
    pub observation: Array2<f64>,
    pub reward: f64,
    pub done: bool,
    pub info: StepInfo,
}

/// Single-asset trading loop over pre-aligned features and prices.
///
/// Reward at step `t` is the return of the position held *entering* the step
/// minus the cost of moving to the new target. Inputs are shared behind
/// `Arc` so many simulators can replay the same data in parallel.
#[derive(Debug, Clone)]
pub struct MarketSimulator {
    features: Arc<Array2<f64>>,
    prices: Arc<[f64]>,
    window: usize,
    costs: CostModel,
    state: SimulationState,
    status: SimStatus,
}

impl MarketSimulator {
    pub fn new(
        features: Array2<f64>,
        prices: Vec<f64>,
        config: SimulatorConfig,
    ) -> Result<Self, SimError> {
        Self::from_shared(Arc::new(features), Arc::from(prices), config)
    }

    /// Validate inputs and start in `Ready` (the constructor performs the first reset).
    pub fn from_shared(
        features: Arc<Array2<f64>>,
        prices: Arc<[f64]>,
        config: SimulatorConfig,
    ) -> Result<Self, SimError> {
        if features.nrows() != prices.len() {
            return Err(SimError::LengthMismatch {
                features: features.nrows(),
                prices: prices.len(),
            });
        }
        if config.window == 0 {
            return Err(SimError::ZeroWindow);
        }
        if config.window >= prices.len() {
            return Err(SimError::WindowTooLarge {
                window: config.window,
                len: prices.len(),
            });
        }
        if let Some((index, &price)) = prices
            .iter()
            .enumerate()
            .find(|(_, p)| !(p.is_finite() && **p > 0.0))
        {
            return Err(SimError::InvalidPrice { index, price });
        }
        let costs = CostModel::new(config.transaction_cost)?;

        let mut sim = Self {
            state: SimulationState::initial(config.window, prices[config.window - 1]),
            features,
            prices,
            window: config.window,
            costs,
            status: SimStatus::Ready,
        };
        sim.reset();
        Ok(sim)
    }

    /// Back to `t = window`, flat. Returns the first observation.
    #[tracing::instrument(level = "debug", skip(self), fields(window = self.window, len = self.prices.len()))]
    pub fn reset(&mut self) -> Array2<f64> {
        self.state = SimulationState::initial(self.window, self.prices[self.window - 1]);
        self.status = SimStatus::Ready;
        self.window_at(self.state.t)
    }

    /// Decode `action` and advance one step.
    pub fn step(&mut self, action: Action) -> Result<StepOutcome, SimError> {
        self.step_to(action.target())
    }

    /// Advance one step towards an explicit target position.
    pub fn step_to(&mut self, target: Position) -> Result<StepOutcome, SimError> {
        self.check_step_status()?;

        let price = self.prices[self.state.t];
        let (reward, info) = self
            .state
            .advance(target, price, &self.costs, self.prices.len());

        let observation = if self.state.done {
            self.status = SimStatus::Done;
            tracing::debug!(t = self.state.t, "episode finished");
            Array2::zeros(self.observation_shape())
        } else {
            self.status = SimStatus::Stepping;
            self.window_at(self.state.t)
        };

        Ok(StepOutcome {
            observation,
            reward,
            done: self.state.done,
            info,
        })
    }

    pub fn status(&self) -> SimStatus {
        self.status
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// `(window, n_features)`.
    pub fn observation_shape(&self) -> (usize, usize) {
        (self.window, self.features.ncols())
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Steps an episode takes from reset to done.
    pub fn episode_len(&self) -> usize {
        self.prices.len() - self.window
    }

    pub fn costs(&self) -> &CostModel {
        &self.costs
    }

    fn check_step_status(&self) -> Result<(), SimError> {
        match self.status {
            SimStatus::Ready | SimStatus::Stepping => Ok(()),
            SimStatus::Done => Err(SimError::EpisodeFinished { t: self.state.t }),
        }
    }

    fn window_at(&self, t: usize) -> Array2<f64> {
        self.features.slice(s![t - self.window..t, ..]).to_owned()
    }
}
