//! Per-day feed normalization.
//!
//! One raw payload plus the day it was requested for becomes a clean
//! [`OhlcvSeries`] restricted to that day, or no result at all. Time values
//! may be full timestamps, bare times of day, or seconds since midnight;
//! column labels may be English or Chinese.

use super::canonicalize::canonicalize_bars;
use super::columns::{fill_prices, find_time_column, Field, FieldColumns};
use super::provider::DataError;
use super::raw::RawTable;
use crate::domain::{MinuteBar, OhlcvSeries};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use thiserror::Error;

/// Values sampled to decide whether the time column holds full timestamps.
const SAMPLE_SIZE: usize = 5;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%H:%M:%S%.f"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("payload has no rows")]
    EmptyPayload,

    #[error("no time column among headers {0:?}")]
    NoTimeColumn(Vec<String>),

    #[error("no price columns among headers {0:?}")]
    NoPriceColumns(Vec<String>),

    #[error("none of {rows} time values could be parsed")]
    UnparseableTimes { rows: usize },

    #[error("no rows fall on {day}")]
    NoRowsForDay { day: NaiveDate },

    #[error("all {rows} candidate rows have unparseable prices")]
    UnparseablePrices { rows: usize },
}

/// Parse a complete timestamp in any of the accepted layouts.
///
/// A bare date parses as midnight of that date.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse a wall-clock time such as `09:30` or `09:30:00`.
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

/// Float parse that tolerates thousands separators and rejects NaN/inf.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let cleaned: String = s.chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn looks_like_datetime(sample: &[&str]) -> bool {
    sample
        .iter()
        .any(|s| s.contains('-') || s.contains('/') || s.split_whitespace().count() > 1)
}

fn seconds_after_midnight(day: NaiveDate, secs: f64) -> Option<NaiveDateTime> {
    let millis = (secs * 1000.0).round();
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
        return None;
    }
    let offset = TimeDelta::try_milliseconds(millis as i64)?;
    day.and_hms_opt(0, 0, 0)?.checked_add_signed(offset)
}

/// Parse the present price cells of `row` and fill the absent fields.
///
/// Fails with the first present cell that does not parse.
pub(crate) fn row_prices<'a>(
    columns: &FieldColumns,
    table: &'a RawTable,
    row: usize,
) -> Result<[f64; 4], (Field, &'a str)> {
    let mut present = [None; 4];
    for (slot, field) in present.iter_mut().zip(Field::PRICES) {
        if let Some(col) = columns.get(field) {
            let raw = table.cell(row, col);
            *slot = Some(parse_number(raw).ok_or((field, raw))?);
        }
    }
    fill_prices(present).ok_or((Field::Close, ""))
}

fn log_filled_fields(columns: &FieldColumns) {
    let missing = columns.missing_prices();
    if !missing.is_empty() {
        let filled: Vec<&str> = missing.into_iter().map(Field::name).collect();
        tracing::debug!(?filled, "price fields absent, filled from present prices");
    }
}

/// Resolve every row's timestamp (None where unparseable).
fn parse_time_column(values: &[&str], day: NaiveDate) -> Vec<Option<NaiveDateTime>> {
    let sample: Vec<&str> = values
        .iter()
        .copied()
        .filter(|v| !v.is_empty())
        .take(SAMPLE_SIZE)
        .collect();

    let mut parsed: Vec<Option<NaiveDateTime>> = if looks_like_datetime(&sample) {
        values.iter().map(|v| parse_datetime(v)).collect()
    } else {
        values
            .iter()
            .map(|v| parse_time_of_day(v).map(|t| day.and_time(t)))
            .collect()
    };

    let failed = parsed.iter().filter(|p| p.is_none()).count();
    if failed * 2 > values.len() {
        let numbers: Vec<Option<f64>> = values.iter().map(|v| parse_number(v)).collect();
        if numbers.iter().any(Option::is_some) {
            tracing::debug!(
                failed,
                rows = values.len(),
                "time column reinterpreted as seconds after midnight"
            );
            parsed = numbers
                .into_iter()
                .map(|n| n.and_then(|secs| seconds_after_midnight(day, secs)))
                .collect();
        }
    }
    parsed
}

/// Normalize one day's payload, reporting why it was rejected.
#[tracing::instrument(level = "debug", skip(table), fields(rows = table.len()))]
pub fn try_normalize_day(table: &RawTable, day: NaiveDate) -> Result<OhlcvSeries, NormalizeError> {
    if table.is_empty() {
        return Err(NormalizeError::EmptyPayload);
    }
    let headers = table.headers();
    let time_col =
        find_time_column(headers).ok_or_else(|| NormalizeError::NoTimeColumn(headers.to_vec()))?;

    let columns = FieldColumns::detect(headers);
    if !columns.has_price() {
        return Err(NormalizeError::NoPriceColumns(headers.to_vec()));
    }
    log_filled_fields(&columns);

    let time_values: Vec<&str> = table.column(time_col).collect();
    let times = parse_time_column(&time_values, day);
    let parsed_times = times.iter().filter(|t| t.is_some()).count();
    if parsed_times == 0 {
        return Err(NormalizeError::UnparseableTimes { rows: table.len() });
    }

    let mut bars = Vec::with_capacity(parsed_times);
    let mut on_day = 0usize;
    let mut bad_prices = 0usize;
    let mut bad_volume = 0usize;
    for (row, ts) in times.into_iter().enumerate() {
        let Some(datetime) = ts else { continue };
        if datetime.date() != day {
            continue;
        }
        on_day += 1;

        let Ok([open, high, low, close]) = row_prices(&columns, table, row) else {
            bad_prices += 1;
            continue;
        };
        let volume = match columns.get(Field::Volume) {
            Some(col) => parse_number(table.cell(row, col)).unwrap_or_else(|| {
                bad_volume += 1;
                0.0
            }),
            None => 0.0,
        };
        bars.push(MinuteBar {
            datetime,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    if on_day == 0 {
        return Err(NormalizeError::NoRowsForDay { day });
    }
    if bars.is_empty() {
        return Err(NormalizeError::UnparseablePrices { rows: on_day });
    }

    let dropped_times = table.len() - parsed_times;
    if dropped_times > 0 || bad_prices > 0 || bad_volume > 0 {
        tracing::debug!(
            dropped_times,
            off_day = parsed_times - on_day,
            bad_prices,
            bad_volume,
            "rows dropped or patched during normalization"
        );
    }
    if columns.get(Field::Volume).is_none() {
        tracing::debug!("no volume column, volume set to zero");
    }

    bars.sort_by_key(|b| b.datetime);
    bars.dedup_by_key(|b| b.datetime);
    OhlcvSeries::new(bars).map_err(|_| NormalizeError::UnparseableTimes { rows: table.len() })
}

/// Normalize one day's payload; `None` means no usable data.
pub fn normalize_day(table: &RawTable, day: NaiveDate) -> Option<OhlcvSeries> {
    match try_normalize_day(table, day) {
        Ok(series) => Some(series),
        Err(e) => {
            tracing::warn!(%day, error = %e, "day skipped");
            None
        }
    }
}

/// Concatenate per-day series, sort by time and drop duplicate timestamps
/// keeping the first occurrence.
pub fn merge_days<I>(days: I) -> Result<OhlcvSeries, DataError>
where
    I: IntoIterator<Item = OhlcvSeries>,
{
    let bars: Vec<MinuteBar> = days.into_iter().flat_map(OhlcvSeries::into_bars).collect();
    canonicalize_bars(bars)
}

/// Clean a whole multi-day file: map columns, parse full timestamps, sort,
/// and drop duplicate timestamps keeping the first.
///
/// With `fill_gaps`, unparseable cells of a present column take the previous
/// row's value (the first valid value at the head); without it such rows are
/// dropped. Rows whose time does not parse are always dropped.
#[tracing::instrument(level = "debug", skip(table), fields(rows = table.len()))]
pub fn normalize_file(table: &RawTable, fill_gaps: bool) -> Result<OhlcvSeries, DataError> {
    if table.is_empty() {
        return Err(NormalizeError::EmptyPayload.into());
    }
    let headers = table.headers();
    let time_col =
        find_time_column(headers).ok_or_else(|| NormalizeError::NoTimeColumn(headers.to_vec()))?;
    let columns = FieldColumns::detect(headers);
    if !columns.has_price() {
        return Err(NormalizeError::NoPriceColumns(headers.to_vec()).into());
    }
    log_filled_fields(&columns);

    let mut rows: Vec<(NaiveDateTime, [Option<f64>; 5])> = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let Some(datetime) = parse_datetime(table.cell(row, time_col)) else {
            continue;
        };
        let mut cells = [None; 5];
        for (slot, field) in cells.iter_mut().zip(Field::ALL) {
            *slot = columns
                .get(field)
                .and_then(|col| parse_number(table.cell(row, col)));
        }
        rows.push((datetime, cells));
    }
    if rows.is_empty() {
        return Err(NormalizeError::UnparseableTimes { rows: table.len() }.into());
    }
    rows.sort_by_key(|(datetime, _)| *datetime);

    if fill_gaps {
        for (slot, field) in Field::ALL.into_iter().enumerate() {
            if columns.get(field).is_some() {
                fill_slot(&mut rows, slot);
            }
        }
    }

    let candidates = rows.len();
    let bars: Vec<MinuteBar> = rows
        .into_iter()
        .filter_map(|(datetime, [open, high, low, close, volume])| {
            let prices = [open, high, low, close];
            // a present column left empty here held an unparseable cell
            let complete = Field::PRICES
                .into_iter()
                .zip(prices)
                .all(|(field, value)| columns.get(field).is_none() || value.is_some());
            if !complete {
                return None;
            }
            let [open, high, low, close] = fill_prices(prices)?;
            Some(MinuteBar {
                datetime,
                open,
                high,
                low,
                close,
                volume: volume.unwrap_or(0.0),
            })
        })
        .collect();

    if bars.is_empty() {
        return Err(NormalizeError::UnparseablePrices { rows: candidates }.into());
    }
    let dropped = table.len() - bars.len();
    if dropped > 0 {
        tracing::debug!(dropped, fill_gaps, "rows dropped while cleaning file");
    }
    canonicalize_bars(bars)
}

/// Forward fill one cell slot, then back fill the leading gap.
fn fill_slot(rows: &mut [(NaiveDateTime, [Option<f64>; 5])], slot: usize) {
    let mut last = None;
    for (_, cells) in rows.iter_mut() {
        match cells[slot] {
            Some(v) => last = Some(v),
            None => cells[slot] = last,
        }
    }
    let first = rows.iter().find_map(|(_, cells)| cells[slot]);
    for (_, cells) in rows.iter_mut() {
        if cells[slot].is_some() {
            break;
        }
        cells[slot] = first;
    }
}
