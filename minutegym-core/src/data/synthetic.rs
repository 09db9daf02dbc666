//! Synthetic minute data for exercising the pipeline without a feed.
//!
//! Closes follow a multiplicative random walk over the session calendar.
//! Shocks are uniform with unit variance; the caller passes the RNG.

use crate::calendar::{CalendarBuilder, CalendarError};
use crate::domain::{MinuteBar, OhlcvSeries, SeriesError};
use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const UNIT_UNIFORM_SCALE: f64 = 1.732_050_807_568_877_2; // sqrt(3)

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticParams {
    pub start_price: f64,
    /// Per-minute relative volatility of the close.
    pub volatility: f64,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            start_price: 100.0,
            volatility: 0.0002,
        }
    }
}

#[derive(Debug, Error)]
pub enum SyntheticError {
    #[error("start price must be positive and finite, got {0}")]
    InvalidStartPrice(f64),

    #[error("volatility must be non-negative and finite, got {0}")]
    InvalidVolatility(f64),

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Series(#[from] SeriesError),
}

fn shock<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    (rng.gen::<f64>() * 2.0 - 1.0) * UNIT_UNIFORM_SCALE
}

/// Random-walk series over `n_days` business-day sessions starting at (or
/// after) `start`.
pub fn generate_sessions<R: Rng + ?Sized>(
    builder: &CalendarBuilder,
    start: NaiveDate,
    n_days: usize,
    params: SyntheticParams,
    rng: &mut R,
) -> Result<OhlcvSeries, SyntheticError> {
    if !(params.start_price.is_finite() && params.start_price > 0.0) {
        return Err(SyntheticError::InvalidStartPrice(params.start_price));
    }
    if !(params.volatility.is_finite() && params.volatility >= 0.0) {
        return Err(SyntheticError::InvalidVolatility(params.volatility));
    }
    if n_days == 0 {
        return Ok(OhlcvSeries::empty());
    }

    let per_session = builder.template().minutes_per_session();
    let calendar = builder.build_at_least(start, start, n_days * per_session)?;
    // build_at_least keeps whole sessions; a business-day start already
    // yields exactly n_days of them
    let calendar = calendar.truncated(n_days * per_session);

    let vol = params.volatility;
    let mut price = params.start_price;
    let mut bars = Vec::with_capacity(calendar.len());
    for ts in &calendar {
        let open = price * (1.0 + 0.25 * vol * shock(rng));
        price *= 1.0 + vol * shock(rng);
        let close = price;
        let wick_up = price * 0.5 * vol * shock(rng).abs();
        let wick_down = price * 0.5 * vol * shock(rng).abs();
        bars.push(MinuteBar {
            datetime: *ts,
            open,
            high: open.max(close) + wick_up,
            low: open.min(close) - wick_down,
            close,
            volume: f64::from(rng.gen_range(100u32..1000)),
        });
    }

    tracing::debug!(
        bars = bars.len(),
        days = calendar.days().len(),
        "synthetic series generated"
    );
    Ok(OhlcvSeries::new(bars)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()
    }

    #[test]
    fn generates_whole_sessions_with_sane_bars() {
        let mut rng = StdRng::seed_from_u64(42);
        let series = generate_sessions(
            &CalendarBuilder::default(),
            start(),
            3,
            SyntheticParams::default(),
            &mut rng,
        )
        .unwrap();

        assert_eq!(series.len(), 3 * 242);
        assert_eq!(series.days().len(), 3);
        assert!(series.iter().all(MinuteBar::is_sane));
        assert!(series.iter().all(|b| (100.0..1000.0).contains(&b.volume)));
    }

    #[test]
    fn same_seed_same_series() {
        let make = || {
            let mut rng = StdRng::seed_from_u64(7);
            generate_sessions(
                &CalendarBuilder::default(),
                start(),
                1,
                SyntheticParams::default(),
                &mut rng,
            )
            .unwrap()
        };
        assert_eq!(make(), make());
    }

    #[test]
    fn weekend_start_rolls_to_monday() {
        let saturday = NaiveDate::from_ymd_opt(2025, 1, 4).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let series = generate_sessions(
            &CalendarBuilder::default(),
            saturday,
            1,
            SyntheticParams::default(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(
            series.days(),
            vec![NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()]
        );
    }

    #[test]
    fn rejects_bad_params() {
        let mut rng = StdRng::seed_from_u64(1);
        let params = SyntheticParams {
            start_price: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            generate_sessions(&CalendarBuilder::default(), start(), 1, params, &mut rng),
            Err(SyntheticError::InvalidStartPrice(_))
        ));
    }
}
