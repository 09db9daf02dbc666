//! MinuteGym Core: trading-minute calendar, feed repair and normalization,
//! and a single-asset market simulator.
//!
//! - Minute calendar with weekend skipping and forward extension
//! - Counter-axis repair onto real trading minutes
//! - Per-day normalization of Chinese/English minute feeds
//! - Polars-backed canonicalization and anomaly scan
//! - Feature matrix, simulator state machine, policies and rollouts

pub mod calendar;
pub mod config;
pub mod data;
pub mod domain;
pub mod features;
pub mod repair;
pub mod rng;
pub mod sim;

pub use calendar::{CalendarBuilder, CalendarError, MinuteCalendar, SessionTemplate};
pub use config::{ConfigError, MinuteGymConfig};
pub use domain::{BarValues, MinuteBar, OhlcvSeries};
pub use features::FeatureSet;
pub use repair::{repair_counter_axis, CounterRow, RepairError};
pub use sim::{Action, MarketSimulator, Position, SimError, SimulatorConfig, StepOutcome};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed to worker threads are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<MinuteBar>();
        require_sync::<MinuteBar>();
        require_send::<OhlcvSeries>();
        require_sync::<OhlcvSeries>();
        require_send::<MinuteCalendar>();
        require_sync::<MinuteCalendar>();
        require_send::<CalendarBuilder>();
        require_sync::<CalendarBuilder>();
        require_send::<FeatureSet>();
        require_sync::<FeatureSet>();
        require_send::<MarketSimulator>();
        require_sync::<MarketSimulator>();
        require_send::<StepOutcome>();
        require_send::<sim::EpisodeSummary>();

        require_send::<data::DataError>();
        require_send::<RepairError>();
        require_send::<SimError>();
        require_send::<ConfigError>();
    }
}
