//! Counter-axis repair.
//!
//! Some exports lose their time column and replace it with a row counter
//! (`0, 1, 2, ...`). Given a date-range hint, the rows are rebound to real
//! trading-minute timestamps strictly by position. A column that already
//! holds real timestamps is never overwritten.

use crate::calendar::{CalendarBuilder, CalendarError};
use crate::data::columns::{find_time_column, Field, FieldColumns};
use crate::data::normalize::{parse_number, row_prices};
use crate::data::raw::RawTable;
use crate::domain::{BarValues, MinuteBar, OhlcvSeries, SeriesError};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RepairError {
    #[error("row {row}: time value '{value}' is not an integer counter")]
    NotACounter { row: usize, value: String },

    #[error("counter not strictly increasing at row {row}: {previous} then {current}")]
    NotIncreasing {
        row: usize,
        previous: i64,
        current: i64,
    },

    #[error("table has no time column")]
    NoTimeColumn,

    #[error("no price columns among headers {0:?}")]
    NoPriceColumns(Vec<String>),

    #[error("row {row}: unparseable {field} value '{value}'")]
    BadValue {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("calendar produced {produced} timestamps for {required} rows")]
    InsufficientCalendar { required: usize, produced: usize },

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// One row whose time axis is a bare counter.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterRow {
    pub counter: String,
    pub values: BarValues,
}

/// Integer-like: an `i64`, or a finite float with no fractional part (`3.0`).
pub fn parse_counter(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let f = s.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// Check that `values` is an integer counter, strictly increasing.
pub fn detect_counter_axis<S: AsRef<str>>(values: &[S]) -> Result<Vec<i64>, RepairError> {
    let mut counters = Vec::with_capacity(values.len());
    for (row, raw) in values.iter().enumerate() {
        let raw = raw.as_ref();
        let current = parse_counter(raw).ok_or_else(|| RepairError::NotACounter {
            row,
            value: raw.to_string(),
        })?;
        if let Some(&previous) = counters.last() {
            if current <= previous {
                return Err(RepairError::NotIncreasing {
                    row,
                    previous,
                    current,
                });
            }
        }
        counters.push(current);
    }
    Ok(counters)
}

/// Pull counter rows out of a raw table.
///
/// The counter lives in the time column (same aliases the normalizer uses).
/// Every present price must parse and absent price fields are filled from
/// the present ones; a missing or bad volume becomes zero.
pub fn counter_rows_from_table(table: &RawTable) -> Result<Vec<CounterRow>, RepairError> {
    let headers = table.headers();
    let time_col = find_time_column(headers).ok_or(RepairError::NoTimeColumn)?;
    let columns = FieldColumns::detect(headers);
    if !columns.has_price() {
        return Err(RepairError::NoPriceColumns(headers.to_vec()));
    }

    let mut rows = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let [open, high, low, close] =
            row_prices(&columns, table, row).map_err(|(field, raw)| RepairError::BadValue {
                row,
                field: field.name(),
                value: raw.to_string(),
            })?;
        let volume = columns
            .get(Field::Volume)
            .and_then(|c| parse_number(table.cell(row, c)))
            .unwrap_or(0.0);
        rows.push(CounterRow {
            counter: table.cell(row, time_col).to_string(),
            values: BarValues {
                open,
                high,
                low,
                close,
                volume,
            },
        });
    }
    Ok(rows)
}

/// Rebind `rows` onto the first `rows.len()` trading minutes of the range,
/// extending past `end` when the range is too short.
pub fn repair_counter_axis(
    rows: &[CounterRow],
    start: NaiveDate,
    end: NaiveDate,
    builder: &CalendarBuilder,
) -> Result<OhlcvSeries, RepairError> {
    let counters: Vec<&str> = rows.iter().map(|r| r.counter.as_str()).collect();
    detect_counter_axis(&counters)?;

    let required = rows.len();
    let calendar = builder.build_exact(start, end, required)?;
    if calendar.len() < required {
        return Err(RepairError::InsufficientCalendar {
            required,
            produced: calendar.len(),
        });
    }

    let bars: Vec<MinuteBar> = calendar
        .iter()
        .zip(rows)
        .map(|(ts, row)| MinuteBar::from_values(*ts, row.values))
        .collect();

    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        tracing::info!(
            rows = required,
            first = %first.datetime,
            last = %last.datetime,
            "counter axis repaired"
        );
    }
    Ok(OhlcvSeries::new(bars)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn rows(n: usize) -> Vec<CounterRow> {
        (0..n)
            .map(|i| CounterRow {
                counter: i.to_string(),
                values: BarValues {
                    open: i as f64,
                    high: i as f64 + 1.0,
                    low: i as f64 - 1.0,
                    close: i as f64 + 0.5,
                    volume: 10.0,
                },
            })
            .collect()
    }

    #[test]
    fn counter_parsing() {
        assert_eq!(parse_counter("42"), Some(42));
        assert_eq!(parse_counter(" 7.0 "), Some(7));
        assert_eq!(parse_counter("7.5"), None);
        assert_eq!(parse_counter("2025-01-02 09:30:00"), None);
        assert_eq!(parse_counter("inf"), None);
    }

    #[test]
    fn detect_rejects_real_timestamps() {
        let err = detect_counter_axis(&["2025-01-02 09:30:00"]).unwrap_err();
        assert!(matches!(err, RepairError::NotACounter { row: 0, .. }));
    }

    #[test]
    fn detect_rejects_non_increasing() {
        let err = detect_counter_axis(&["0", "1", "1"]).unwrap_err();
        assert_eq!(
            err,
            RepairError::NotIncreasing {
                row: 2,
                previous: 1,
                current: 1
            }
        );
    }

    #[test]
    fn repair_binds_positionally() {
        let input = rows(5);
        let series =
            repair_counter_axis(&input, date(2), date(2), &CalendarBuilder::default()).unwrap();
        assert_eq!(series.len(), 5);
        assert_eq!(series.bars()[0].datetime, date(2).and_hms_opt(9, 30, 0).unwrap());
        assert_eq!(series.bars()[4].datetime, date(2).and_hms_opt(9, 34, 0).unwrap());
        for (bar, row) in series.iter().zip(&input) {
            assert_eq!(bar.values(), row.values);
        }
    }

    #[test]
    fn repair_extends_past_end_when_needed() {
        // Friday only: 300 rows spill into Monday
        let series =
            repair_counter_axis(&rows(300), date(3), date(3), &CalendarBuilder::default())
                .unwrap();
        assert_eq!(series.len(), 300);
        assert_eq!(series.days(), vec![date(3), date(6)]);
    }

    #[test]
    fn repair_of_empty_input_is_empty() {
        let series =
            repair_counter_axis(&[], date(2), date(2), &CalendarBuilder::default()).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn repair_propagates_inverted_range() {
        let err = repair_counter_axis(&rows(1), date(6), date(2), &CalendarBuilder::default())
            .unwrap_err();
        assert!(matches!(
            err,
            RepairError::Calendar(CalendarError::InvalidRange { .. })
        ));
    }

    #[test]
    fn rows_from_table() {
        let table = RawTable::from_csv_str(
            "datetime,open,high,low,close,volume\n0,1,2,0.5,1.5,10\n1,1.5,2,1,1.8,\n",
        )
        .unwrap();
        let rows = counter_rows_from_table(&table).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].counter, "1");
        assert_eq!(rows[1].values.volume, 0.0);
    }

    #[test]
    fn rows_from_table_rejects_bad_price() {
        let table =
            RawTable::from_csv_str("datetime,open,high,low,close\n0,1,2,x,1.5\n").unwrap();
        assert!(matches!(
            counter_rows_from_table(&table),
            Err(RepairError::BadValue { field: "low", .. })
        ));
    }

    #[test]
    fn rows_from_close_only_table() {
        let table = RawTable::from_csv_str("datetime,收盘\n0,10.0\n1,10.2\n").unwrap();
        let rows = counter_rows_from_table(&table).unwrap();
        assert_eq!(
            rows[1].values,
            BarValues {
                open: 10.2,
                high: 10.2,
                low: 10.2,
                close: 10.2,
                volume: 0.0
            }
        );
        assert!(matches!(
            counter_rows_from_table(&RawTable::from_csv_str("datetime,amount\n0,1\n").unwrap()),
            Err(RepairError::NoPriceColumns(_))
        ));
    }
}
