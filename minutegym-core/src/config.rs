//! TOML configuration.
//!
//! Every section and field is optional; an empty file yields the defaults
//! (A-share sessions, window 30, cost 0.0005, SMA 5/20, seed 42).
//!
//! ```toml
//! [calendar]
//! morning_open = "09:30"
//! morning_close = "11:30"
//! afternoon_open = "13:00"
//! afternoon_close = "15:00"
//! step_minutes = 1
//!
//! [simulator]
//! window = 30
//! transaction_cost = 0.0005
//! ```

use crate::calendar::{CalendarBuilder, SessionTemplate, SessionWindow};
use crate::data::normalize::parse_time_of_day;
use crate::data::synthetic::SyntheticParams;
use crate::rng::RngHierarchy;
use crate::sim::SimulatorConfig;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub morning_open: String,
    pub morning_close: String,
    pub afternoon_open: String,
    pub afternoon_close: String,
    pub step_minutes: u32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            morning_open: "09:30".into(),
            morning_close: "11:30".into(),
            afternoon_open: "13:00".into(),
            afternoon_close: "15:00".into(),
            step_minutes: 1,
        }
    }
}

fn time_field(name: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    parse_time_of_day(value)
        .ok_or_else(|| ConfigError::Invalid(format!("calendar.{name}: '{value}' is not HH:MM")))
}

impl CalendarConfig {
    pub fn template(&self) -> Result<SessionTemplate, ConfigError> {
        let invalid = |e: crate::calendar::CalendarError| ConfigError::Invalid(e.to_string());
        let morning = SessionWindow::new(
            time_field("morning_open", &self.morning_open)?,
            time_field("morning_close", &self.morning_close)?,
        )
        .map_err(invalid)?;
        let afternoon = SessionWindow::new(
            time_field("afternoon_open", &self.afternoon_open)?,
            time_field("afternoon_close", &self.afternoon_close)?,
        )
        .map_err(invalid)?;
        SessionTemplate::new(morning, afternoon, self.step_minutes).map_err(invalid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub sma_short: usize,
    pub sma_long: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sma_short: 5,
            sma_long: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub seed: u64,
    #[serde(flatten)]
    pub params: SyntheticParams,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            params: SyntheticParams::default(),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinuteGymConfig {
    pub calendar: CalendarConfig,
    pub simulator: SimulatorConfig,
    pub features: FeatureConfig,
    pub synthetic: SyntheticConfig,
}

impl MinuteGymConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.calendar.template()?;
        if self.simulator.window == 0 {
            return Err(ConfigError::Invalid("simulator.window must be >= 1".into()));
        }
        let cost = self.simulator.transaction_cost;
        if !cost.is_finite() || cost < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "simulator.transaction_cost must be non-negative, got {cost}"
            )));
        }
        if self.features.sma_short == 0 || self.features.sma_long == 0 {
            return Err(ConfigError::Invalid(
                "features.sma_short and features.sma_long must be >= 1".into(),
            ));
        }
        let p = self.synthetic.params;
        if !(p.start_price.is_finite() && p.start_price > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "synthetic.start_price must be positive, got {}",
                p.start_price
            )));
        }
        if !(p.volatility.is_finite() && p.volatility >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "synthetic.volatility must be non-negative, got {}",
                p.volatility
            )));
        }
        Ok(())
    }

    pub fn calendar_builder(&self) -> Result<CalendarBuilder, ConfigError> {
        Ok(CalendarBuilder::new(self.calendar.template()?))
    }

    pub fn rng(&self) -> RngHierarchy {
        RngHierarchy::new(self.synthetic.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = MinuteGymConfig::from_toml("").unwrap();
        assert_eq!(config, MinuteGymConfig::default());
        assert_eq!(config.simulator.window, 30);
        assert_eq!(config.simulator.transaction_cost, 0.0005);
        assert_eq!(
            config.calendar_builder().unwrap().template(),
            &SessionTemplate::a_share()
        );
    }

    #[test]
    fn partial_sections_override_fields() {
        let config = MinuteGymConfig::from_toml(
            "[simulator]\nwindow = 10\n\n[calendar]\nstep_minutes = 5\n\n[synthetic]\nseed = 7\nvolatility = 0.001\n",
        )
        .unwrap();
        assert_eq!(config.simulator.window, 10);
        assert_eq!(config.simulator.transaction_cost, 0.0005);
        assert_eq!(config.synthetic.seed, 7);
        assert_eq!(config.synthetic.params.volatility, 0.001);
        assert_eq!(config.synthetic.params.start_price, 100.0);
        let builder = config.calendar_builder().unwrap();
        assert_eq!(builder.template().step_minutes(), 5);
        assert_eq!(builder.template().minutes_per_session(), 50);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            MinuteGymConfig::from_toml("[simulator]\nwindow = 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            MinuteGymConfig::from_toml("[calendar]\nmorning_open = \"9h30\"\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            MinuteGymConfig::from_toml("[calendar]\nmorning_close = \"13:30\"\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            MinuteGymConfig::from_toml("[simulator\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn toml_round_trip() {
        let config = MinuteGymConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(MinuteGymConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn from_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minutegym.toml");
        std::fs::write(&path, "[features]\nsma_long = 30\n").unwrap();
        let config = MinuteGymConfig::from_file(&path).unwrap();
        assert_eq!(config.features.sma_long, 30);
        assert!(MinuteGymConfig::from_file(&dir.path().join("missing.toml")).is_err());
    }
}
