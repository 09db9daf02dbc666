//! Simulator state and the pure step transition.

use super::action::Position;
use super::cost::CostModel;
use serde::{Deserialize, Serialize};

/// Lifecycle of a simulator instance.
///
/// ```md
/// Current      | Call            | Next
/// -------------|-----------------|---------
/// any          | reset()         | Ready
/// Ready        | step() (t < T)  | Stepping
/// Ready        | step() (t = T)  | Done
/// Stepping     | step() (t < T)  | Stepping
/// Stepping     | step() (t = T)  | Done
/// Done         | step()          | error, state unchanged
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimStatus {
    Ready,
    Stepping,
    Done,
}

impl SimStatus {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Per-step breakdown of the reward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Return earned by the position held entering the step.
    pub pnl: f64,
    pub transaction_cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub t: usize,
    pub position: Position,
    pub last_price: f64,
    pub done: bool,
}

impl SimulationState {
    /// State right after a reset: `t = window`, flat, priced at `price[window - 1]`.
    pub fn initial(window: usize, last_price: f64) -> Self {
        Self {
            t: window,
            position: Position::Flat,
            last_price,
            done: false,
        }
    }

    /// Move to `target` at `price`, returning `(reward, info)`.
    ///
    /// `horizon` is the series length `T`; the state is done once `t >= T`.
    /// The caller guarantees the state is not done and `price` is `prices[t]`.
    pub fn advance(
        &mut self,
        target: Position,
        price: f64,
        costs: &CostModel,
        horizon: usize,
    ) -> (f64, StepInfo) {
        let ret = (price - self.last_price) / self.last_price;
        let pnl = self.position.as_f64() * ret;
        let transaction_cost = costs.cost(self.position, target);
        let reward = pnl - transaction_cost;

        self.position = target;
        self.last_price = price;
        self.t += 1;
        self.done = self.t >= horizon;

        (
            reward,
            StepInfo {
                pnl,
                transaction_cost,
            },
        )
    }
}
