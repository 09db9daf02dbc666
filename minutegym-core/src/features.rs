//! Observation features built from a clean series.
//!
//! Columns, in order: fractional close return, short and long rolling means
//! of close, and raw volume. Rows before the long mean is defined are dropped
//! so every observation row is finite.

use crate::domain::OhlcvSeries;
use chrono::NaiveDateTime;
use ndarray::Array2;
use thiserror::Error;

pub const FEATURE_NAMES: [&str; 4] = ["return", "sma_short", "sma_long", "volume"];

pub const SMA_SHORT_COL: usize = 1;
pub const SMA_LONG_COL: usize = 2;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("moving-average periods must be at least 1 (got {short}, {long})")]
    ZeroPeriod { short: usize, long: usize },

    #[error("need at least {required} bars, have {available}")]
    NotEnoughBars { required: usize, available: usize },

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

/// Fractional change `(x[i] - x[i-1]) / x[i-1]`, zero for the first value.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(0.0);
    out.extend(values.windows(2).map(|w| (w[1] - w[0]) / w[0]));
    out
}

/// Rolling mean; NaN until `period` values have been seen.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }
    let mut sum: f64 = values[..period].iter().sum();
    result[period - 1] = sum / period as f64;
    for i in period..n {
        sum += values[i] - values[i - period];
        result[i] = sum / period as f64;
    }
    result
}

/// Feature matrix plus the prices and timestamps aligned with its rows.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    features: Array2<f64>,
    prices: Vec<f64>,
    datetimes: Vec<NaiveDateTime>,
}

impl FeatureSet {
    pub fn from_series(
        series: &OhlcvSeries,
        sma_short: usize,
        sma_long: usize,
    ) -> Result<Self, FeatureError> {
        if sma_short == 0 || sma_long == 0 {
            return Err(FeatureError::ZeroPeriod {
                short: sma_short,
                long: sma_long,
            });
        }
        let warmup = sma_short.max(sma_long) - 1;
        if series.len() <= warmup {
            return Err(FeatureError::NotEnoughBars {
                required: warmup + 1,
                available: series.len(),
            });
        }

        let closes = series.closes();
        let returns = pct_change(&closes);
        let short = rolling_mean(&closes, sma_short);
        let long = rolling_mean(&closes, sma_long);

        let rows = series.len() - warmup;
        let mut flat = Vec::with_capacity(rows * FEATURE_NAMES.len());
        for (i, bar) in series.iter().enumerate().skip(warmup) {
            flat.extend_from_slice(&[returns[i], short[i], long[i], bar.volume]);
        }
        let features = Array2::from_shape_vec((rows, FEATURE_NAMES.len()), flat)?;

        Ok(Self {
            features,
            prices: closes[warmup..].to_vec(),
            datetimes: series.datetimes()[warmup..].to_vec(),
        })
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    /// Timestamp of each row.
    pub fn datetimes(&self) -> &[NaiveDateTime] {
        &self.datetimes
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn into_parts(self) -> (Array2<f64>, Vec<f64>) {
        (self.features, self.prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MinuteBar;
    use chrono::NaiveDate;

    fn series(closes: &[f64]) -> OhlcvSeries {
        let start = NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        OhlcvSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| MinuteBar {
                    datetime: start + chrono::Duration::minutes(i as i64),
                    open: c,
                    high: c,
                    low: c,
                    close: c,
                    volume: 10.0 * (i + 1) as f64,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn rolling_mean_matches_hand_values() {
        let m = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 2);
        assert!(m[0].is_nan());
        assert_eq!(&m[1..], &[1.5, 2.5, 3.5]);
    }

    #[test]
    fn pct_change_starts_at_zero() {
        assert_eq!(pct_change(&[100.0, 110.0, 99.0]), vec![0.0, 0.1, -0.1]);
        assert!(pct_change(&[]).is_empty());
    }

    #[test]
    fn feature_rows_skip_warmup() {
        let fs = FeatureSet::from_series(&series(&[1.0, 2.0, 3.0, 4.0, 5.0]), 2, 3).unwrap();
        assert_eq!(fs.len(), 3);
        assert_eq!(fs.features().dim(), (3, 4));
        assert_eq!(fs.prices(), &[3.0, 4.0, 5.0]);
        // row for close=3: return 0.5, sma2 2.5, sma3 2.0, volume 30
        assert_eq!(fs.features().row(0).to_vec(), vec![0.5, 2.5, 2.0, 30.0]);
        assert!(fs.features().iter().all(|v| v.is_finite()));
        assert_eq!(fs.datetimes().len(), 3);
    }

    #[test]
    fn too_short_series_is_rejected() {
        assert!(matches!(
            FeatureSet::from_series(&series(&[1.0, 2.0]), 2, 3),
            Err(FeatureError::NotEnoughBars {
                required: 3,
                available: 2
            })
        ));
        assert!(matches!(
            FeatureSet::from_series(&series(&[1.0]), 0, 3),
            Err(FeatureError::ZeroPeriod { .. })
        ));
    }
}
