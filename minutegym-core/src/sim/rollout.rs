//! Episode rollouts and parallel multi-seed evaluation.

use std::sync::Arc;

use ndarray::Array2;
use rayon::prelude::*;
use serde::Serialize;

use super::env::{MarketSimulator, SimulatorConfig};
use super::policy::{Policy, RandomPolicy};
use super::SimError;

/// Aggregate of one episode.
///
/// Equity compounds rewards (`prod(1 + r)`) from 1.0; drawdown is the largest
/// fractional fall from a running equity peak, reported as a positive number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeSummary {
    pub policy: String,
    pub steps: usize,
    pub total_reward: f64,
    pub total_cost: f64,
    pub final_equity: f64,
    pub max_drawdown: f64,
    /// Steps on which the position changed.
    pub trades: usize,
}

/// Reset `sim` and `policy`, then step until done.
pub fn run_episode(
    sim: &mut MarketSimulator,
    policy: &mut dyn Policy,
) -> Result<EpisodeSummary, SimError> {
    let mut observation = sim.reset();
    policy.reset();

    let mut steps = 0;
    let mut total_reward = 0.0;
    let mut total_cost = 0.0;
    let mut equity = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut max_drawdown = 0.0_f64;
    let mut trades = 0;

    loop {
        let before = sim.state().position;
        let outcome = sim.step(policy.act(&observation))?;
        if sim.state().position != before {
            trades += 1;
        }

        steps += 1;
        total_reward += outcome.reward;
        total_cost += outcome.info.transaction_cost;
        equity *= 1.0 + outcome.reward;
        peak = peak.max(equity);
        if peak > 0.0 {
            max_drawdown = max_drawdown.max((peak - equity) / peak);
        }

        if outcome.done {
            break;
        }
        observation = outcome.observation;
    }

    tracing::debug!(
        policy = policy.name(),
        steps,
        total_reward,
        equity,
        "episode complete"
    );
    Ok(EpisodeSummary {
        policy: policy.name().to_string(),
        steps,
        total_reward,
        total_cost,
        final_equity: equity,
        max_drawdown,
        trades,
    })
}

/// One random-policy episode per seed, run in parallel over shared inputs.
///
/// Results come back in `seeds` order and do not depend on thread count.
pub fn evaluate_random_seeds(
    features: Arc<Array2<f64>>,
    prices: Arc<[f64]>,
    config: SimulatorConfig,
    seeds: &[u64],
) -> Result<Vec<(u64, EpisodeSummary)>, SimError> {
    seeds
        .par_iter()
        .map(|&seed| {
            let mut sim = MarketSimulator::from_shared(features.clone(), prices.clone(), config)?;
            let mut policy = RandomPolicy::new(seed);
            run_episode(&mut sim, &mut policy).map(|summary| (seed, summary))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::action::Action;
    use crate::sim::policy::{HoldPolicy, ScriptedPolicy};

    fn sim() -> MarketSimulator {
        MarketSimulator::new(
            Array2::zeros((4, 1)),
            vec![100.0, 101.0, 99.0, 99.0],
            SimulatorConfig {
                window: 1,
                transaction_cost: 0.01,
            },
        )
        .unwrap()
    }

    #[test]
    fn hold_policy_is_flat_and_free() {
        let summary = run_episode(&mut sim(), &mut HoldPolicy).unwrap();
        assert_eq!(summary.steps, 3);
        assert_eq!(summary.total_reward, 0.0);
        assert_eq!(summary.final_equity, 1.0);
        assert_eq!(summary.trades, 0);
        assert_eq!(summary.max_drawdown, 0.0);
    }

    #[test]
    fn scripted_fixture_summary() {
        let mut policy = ScriptedPolicy::new(vec![Action::Long, Action::Long, Action::Hold]);
        let summary = run_episode(&mut sim(), &mut policy).unwrap();
        let expected = -0.01 + (99.0 - 101.0) / 101.0 - 0.01;
        assert!((summary.total_reward - expected).abs() < 1e-9);
        assert!((summary.total_cost - 0.02).abs() < 1e-12);
        assert_eq!(summary.trades, 2);
        assert!(summary.max_drawdown > 0.0);
        assert!(summary.final_equity < 1.0);
    }

    #[test]
    fn episode_can_be_rerun_after_completion() {
        let mut s = sim();
        let a = run_episode(&mut s, &mut HoldPolicy).unwrap();
        let b = run_episode(&mut s, &mut HoldPolicy).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parallel_seeds_match_sequential_runs() {
        let features = Arc::new(Array2::zeros((4, 1)));
        let prices: Arc<[f64]> = Arc::from(vec![100.0, 101.0, 99.0, 99.0]);
        let config = SimulatorConfig {
            window: 1,
            transaction_cost: 0.01,
        };
        let seeds = [1, 2, 3, 4, 5];

        let parallel =
            evaluate_random_seeds(features.clone(), prices.clone(), config, &seeds).unwrap();

        assert_eq!(parallel.len(), seeds.len());
        for (seed, summary) in parallel {
            let mut s = MarketSimulator::from_shared(features.clone(), prices.clone(), config)
                .unwrap();
            let sequential = run_episode(&mut s, &mut RandomPolicy::new(seed)).unwrap();
            assert_eq!(summary, sequential);
        }
    }
}
