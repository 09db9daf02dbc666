//! Minute-bar aggregation to coarser bars.
//!
//! Buckets are clock-aligned from midnight (`09:30`, `09:35`, ... for five
//! minutes) and labelled by their left edge. Each bucket takes the first
//! open, max high, min low, last close and summed volume. Empty buckets never
//! appear.

use super::canonicalize::{bars_to_frame, frame_to_bars, DATETIME_COL};
use super::provider::DataError;
use crate::domain::OhlcvSeries;
use polars::prelude::*;

const MICROS_PER_MINUTE: i64 = 60_000_000;

/// Aggregate a sorted series into `minutes`-minute bars.
///
/// `minutes == 1` returns the series unchanged.
pub fn resample_minutes(series: &OhlcvSeries, minutes: u32) -> Result<OhlcvSeries, DataError> {
    if minutes == 0 {
        return Err(DataError::Validation(
            "resample interval must be at least one minute".into(),
        ));
    }
    if minutes == 1 || series.is_empty() {
        return Ok(series.clone());
    }

    let width = i64::from(minutes) * MICROS_PER_MINUTE;
    let df = bars_to_frame(series.bars())?
        .lazy()
        .with_column((col(DATETIME_COL) - col(DATETIME_COL) % lit(width)).alias("bucket"))
        .group_by_stable([col("bucket")])
        .agg([
            col("open").first(),
            col("high").max(),
            col("low").min(),
            col("close").last(),
            col("volume").sum(),
        ])
        .select([
            col("bucket").alias(DATETIME_COL),
            col("open"),
            col("high"),
            col("low"),
            col("close"),
            col("volume"),
        ])
        .collect()?;

    let bars = frame_to_bars(&df)?;
    tracing::debug!(
        minutes,
        input = series.len(),
        output = bars.len(),
        "series resampled"
    );
    Ok(OhlcvSeries::new(bars)?)
}
