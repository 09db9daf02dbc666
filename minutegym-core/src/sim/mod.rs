//! Discrete-time single-asset market simulator.
//!
//! Action decoding ([`Action`] to [`Position`]) is kept apart from the state
//! transition ([`SimulationState::advance`]); [`MarketSimulator`] owns the
//! data, enforces the lifecycle and builds observations.

pub mod action;
pub mod cost;
pub mod env;
pub mod policy;
pub mod rollout;
pub mod state;

pub use action::{Action, Position};
pub use cost::CostModel;
pub use env::{MarketSimulator, SimulatorConfig, StepOutcome};
pub use policy::{HoldPolicy, Policy, RandomPolicy, ScriptedPolicy, SmaCrossPolicy};
pub use rollout::{evaluate_random_seeds, run_episode, EpisodeSummary};
pub use state::{SimStatus, SimulationState, StepInfo};

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimError {
    #[error("episode finished at t={t}; call reset() before stepping again")]
    EpisodeFinished { t: usize },

    #[error("feature rows ({features}) do not match price count ({prices})")]
    LengthMismatch { features: usize, prices: usize },

    #[error("window {window} leaves no steps in a series of length {len}")]
    WindowTooLarge { window: usize, len: usize },

    #[error("window must be at least 1")]
    ZeroWindow,

    #[error("price at index {index} must be positive and finite, got {price}")]
    InvalidPrice { index: usize, price: f64 },

    #[error("transaction cost must be non-negative and finite, got {0}")]
    InvalidCost(f64),

    #[error("unknown action code {0}")]
    UnknownAction(u8),

    #[error("unknown action '{0}' (expected hold, long or short)")]
    UnknownActionName(String),
}
