//! Flat-file format for clean series.
//!
//! `datetime,open,high,low,close,volume`, ascending, one row per minute,
//! `datetime` written as `%Y-%m-%d %H:%M:%S`.

use super::canonicalize::canonicalize_bars;
use super::normalize::parse_datetime;
use super::provider::DataError;
use crate::domain::{MinuteBar, OhlcvSeries};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize, Deserialize)]
struct BarRecord {
    datetime: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

impl From<&MinuteBar> for BarRecord {
    fn from(bar: &MinuteBar) -> Self {
        Self {
            datetime: bar.datetime.format(DATETIME_FORMAT).to_string(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }
}

pub fn write_series<W: Write>(series: &OhlcvSeries, writer: W) -> Result<(), DataError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for bar in series {
        wtr.serialize(BarRecord::from(bar))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_series_to_path(series: &OhlcvSeries, path: &Path) -> Result<(), DataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_series(series, std::io::BufWriter::new(file))
}

/// Read a clean series. Header names are matched case-insensitively and the
/// rows are re-sorted and deduplicated on the way in.
pub fn read_series<R: Read>(reader: R) -> Result<OhlcvSeries, DataError> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let lowered: csv::StringRecord = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
        .collect();
    rdr.set_headers(lowered);

    let mut bars = Vec::new();
    for (line, record) in rdr.deserialize::<BarRecord>().enumerate() {
        let record = record?;
        let datetime = parse_datetime(&record.datetime).ok_or_else(|| {
            DataError::Validation(format!(
                "row {}: unparseable datetime '{}'",
                line + 1,
                record.datetime
            ))
        })?;
        bars.push(MinuteBar {
            datetime,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }
    canonicalize_bars(bars)
}

pub fn read_series_from_path(path: &Path) -> Result<OhlcvSeries, DataError> {
    let file = std::fs::File::open(path)?;
    read_series(std::io::BufReader::new(file))
}
