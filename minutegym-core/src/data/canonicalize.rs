//! Dataframe-backed canonicalization: sort, dedupe, anomaly scan.
//!
//! Bars are moved into a polars frame with `datetime` stored as epoch
//! microseconds (naive wall-clock time treated as UTC), run through a lazy
//! pipeline and read back.

use super::provider::DataError;
use crate::domain::{MinuteBar, OhlcvSeries};
use chrono::DateTime;
use polars::prelude::*;

pub const DATETIME_COL: &str = "datetime";

/// Canonicalizer for minute bar frames.
pub struct Canonicalizer;

impl Canonicalizer {
    /// Stable sort by `datetime`, keep the first row of each duplicate timestamp.
    pub fn canonicalize(df: LazyFrame) -> LazyFrame {
        df.sort(
            [DATETIME_COL],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .unique_stable(Some(vec![DATETIME_COL.into()]), UniqueKeepStrategy::First)
    }

    /// Count zero-volume bars and OHLC envelope violations.
    ///
    /// Nothing is filtered: malformed bars are reported, not dropped.
    pub fn detect_anomalies(df: &DataFrame) -> PolarsResult<Vec<AnomalyReport>> {
        let envelope = col("high")
            .lt(col("open"))
            .or(col("high").lt(col("close")))
            .or(col("low").gt(col("open")))
            .or(col("low").gt(col("close")));

        let counts = df
            .clone()
            .lazy()
            .select([
                col("volume")
                    .eq(lit(0.0))
                    .cast(DataType::UInt64)
                    .sum()
                    .alias("zero_volume"),
                envelope.cast(DataType::UInt64).sum().alias("envelope"),
            ])
            .collect()?;

        let zero_volume = counts.column("zero_volume")?.u64()?.get(0).unwrap_or(0) as usize;
        let envelope = counts.column("envelope")?.u64()?.get(0).unwrap_or(0) as usize;

        let mut anomalies = Vec::new();
        if zero_volume > 0 {
            anomalies.push(AnomalyReport {
                anomaly_type: AnomalyType::ZeroVolume,
                count: zero_volume,
                severity: Severity::Info,
            });
        }
        if envelope > 0 {
            anomalies.push(AnomalyReport {
                anomaly_type: AnomalyType::EnvelopeViolation,
                count: envelope,
                severity: Severity::Warning,
            });
        }
        Ok(anomalies)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnomalyReport {
    pub anomaly_type: AnomalyType,
    pub count: usize,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyType {
    ZeroVolume,
    /// high below open/close, or low above them.
    EnvelopeViolation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
}

pub fn bars_to_frame(bars: &[MinuteBar]) -> PolarsResult<DataFrame> {
    let datetime: Vec<i64> = bars
        .iter()
        .map(|b| b.datetime.and_utc().timestamp_micros())
        .collect();
    let open: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let high: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let low: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let close: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volume: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    df!(
        DATETIME_COL => &datetime,
        "open" => &open,
        "high" => &high,
        "low" => &low,
        "close" => &close,
        "volume" => &volume,
    )
}

pub fn frame_to_bars(df: &DataFrame) -> Result<Vec<MinuteBar>, DataError> {
    let datetime = df.column(DATETIME_COL)?.i64()?;
    let open = df.column("open")?.f64()?;
    let high = df.column("high")?.f64()?;
    let low = df.column("low")?.f64()?;
    let close = df.column("close")?.f64()?;
    let volume = df.column("volume")?.f64()?;

    let mut bars = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let (Some(us), Some(o), Some(h), Some(l), Some(c), Some(v)) = (
            datetime.get(i),
            open.get(i),
            high.get(i),
            low.get(i),
            close.get(i),
            volume.get(i),
        ) else {
            return Err(DataError::Validation(format!("null value in row {i}")));
        };
        let datetime = DateTime::from_timestamp_micros(us)
            .map(|d| d.naive_utc())
            .ok_or_else(|| DataError::Validation(format!("timestamp {us} out of range")))?;
        bars.push(MinuteBar {
            datetime,
            open: o,
            high: h,
            low: l,
            close: c,
            volume: v,
        });
    }
    Ok(bars)
}

/// Sort + dedupe arbitrary bars into a series, warning when rows are dropped.
pub fn canonicalize_bars(bars: Vec<MinuteBar>) -> Result<OhlcvSeries, DataError> {
    if bars.is_empty() {
        return Ok(OhlcvSeries::empty());
    }
    let input = bars.len();
    let df = Canonicalizer::canonicalize(bars_to_frame(&bars)?.lazy()).collect()?;
    let bars = frame_to_bars(&df)?;
    if bars.len() < input {
        tracing::warn!(
            input,
            kept = bars.len(),
            "dropped duplicate timestamps (kept first occurrence)"
        );
    }
    Ok(OhlcvSeries::new(bars)?)
}

/// Anomaly scan over a series; logs each finding.
pub fn anomaly_report(series: &OhlcvSeries) -> Result<Vec<AnomalyReport>, DataError> {
    if series.is_empty() {
        return Ok(Vec::new());
    }
    let anomalies = Canonicalizer::detect_anomalies(&bars_to_frame(series.bars())?)?;
    for a in &anomalies {
        match a.severity {
            Severity::Warning => tracing::warn!(kind = ?a.anomaly_type, count = a.count, "anomaly"),
            Severity::Info => tracing::info!(kind = ?a.anomaly_type, count = a.count, "anomaly"),
        }
    }
    Ok(anomalies)
}
