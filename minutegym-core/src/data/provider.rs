//! Minute-data provider trait and structured error types.
//!
//! The MinuteProvider trait abstracts over where raw per-day payloads come
//! from (a directory of CSV dumps, an in-memory fixture) so the collection
//! pipeline can be driven and tested without a network vendor.

use super::normalize::NormalizeError;
use super::raw::RawTable;
use crate::domain::SeriesError;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Structured error types for data operations.
///
/// Displayable as-is in the CLI.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataframe error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("no data for {symbol} on {day}")]
    NoData { symbol: String, day: NaiveDate },

    #[error("no data for {symbol} under any exchange prefix ({tried})")]
    NoDataAnyPrefix { symbol: String, tried: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

/// Source of raw minute payloads, one (symbol, day) at a time.
///
/// `symbol` is the full provider symbol including any exchange prefix
/// (`sh600000`). An empty payload is a valid answer; callers treat it the
/// same as a failed fetch.
pub trait MinuteProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn fetch_day(&self, symbol: &str, day: NaiveDate) -> Result<RawTable, DataError>;
}

/// Reads `{root}/{symbol}/{YYYY-MM-DD}.csv`.
#[derive(Debug, Clone)]
pub struct CsvDirProvider {
    root: PathBuf,
}

impl CsvDirProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn day_path(&self, symbol: &str, day: NaiveDate) -> PathBuf {
        self.root
            .join(symbol)
            .join(format!("{}.csv", day.format("%Y-%m-%d")))
    }
}

impl MinuteProvider for CsvDirProvider {
    fn name(&self) -> &str {
        "csv-dir"
    }

    fn fetch_day(&self, symbol: &str, day: NaiveDate) -> Result<RawTable, DataError> {
        let path = self.day_path(symbol, day);
        if !path.exists() {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
                day,
            });
        }
        Ok(RawTable::from_path(&path)?)
    }
}

/// Fixture provider backed by a map; used by tests and demos.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    payloads: HashMap<(String, NaiveDate), RawTable>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: &str, day: NaiveDate, table: RawTable) {
        self.payloads.insert((symbol.to_string(), day), table);
    }

    pub fn with_day(mut self, symbol: &str, day: NaiveDate, table: RawTable) -> Self {
        self.insert(symbol, day, table);
        self
    }
}

impl MinuteProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn fetch_day(&self, symbol: &str, day: NaiveDate) -> Result<RawTable, DataError> {
        self.payloads
            .get(&(symbol.to_string(), day))
            .cloned()
            .ok_or_else(|| DataError::NoData {
                symbol: symbol.to_string(),
                day,
            })
    }
}

/// Progress callback for multi-day collection.
pub trait CollectProgress: Send {
    /// Called when starting a prefix attempt.
    fn on_prefix(&self, symbol: &str, prefix: &str, days: usize);

    /// Called after each day, with the number of bars kept (`Err` when skipped).
    fn on_day(&self, symbol: &str, day: NaiveDate, result: &Result<usize, String>);

    /// Called when the symbol is finished.
    fn on_complete(&self, symbol: &str, succeeded: usize, failed: usize);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl CollectProgress for StdoutProgress {
    fn on_prefix(&self, symbol: &str, prefix: &str, days: usize) {
        println!("Trying {prefix}{symbol} over {days} business days...");
    }

    fn on_day(&self, symbol: &str, day: NaiveDate, result: &Result<usize, String>) {
        match result {
            Ok(n) => println!("  OK: {symbol} {day} ({n} bars)"),
            Err(e) => println!("  SKIP: {symbol} {day}: {e}"),
        }
    }

    fn on_complete(&self, symbol: &str, succeeded: usize, failed: usize) {
        println!("\nCollection of {symbol} complete: {succeeded} days kept, {failed} skipped");
    }
}

/// Reporter that stays silent; progress is still visible through tracing.
pub struct NullProgress;

impl CollectProgress for NullProgress {
    fn on_prefix(&self, _symbol: &str, _prefix: &str, _days: usize) {}
    fn on_day(&self, _symbol: &str, _day: NaiveDate, _result: &Result<usize, String>) {}
    fn on_complete(&self, _symbol: &str, _succeeded: usize, _failed: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()
    }

    #[test]
    fn csv_dir_provider_reads_day_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvDirProvider::new(dir.path());
        let path = provider.day_path("sh600000", day());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "时间,收盘\n09:30,10.0\n").unwrap();

        let table = provider.fetch_day("sh600000", day()).unwrap();
        assert_eq!(table.len(), 1);
        assert!(path.ends_with("sh600000/2025-01-02.csv"));
    }

    #[test]
    fn csv_dir_provider_missing_file_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvDirProvider::new(dir.path());
        let err = provider.fetch_day("sz000001", day()).unwrap_err();
        assert!(matches!(err, DataError::NoData { .. }));
    }

    #[test]
    fn in_memory_provider_returns_inserted_payload() {
        let table = RawTable::from_csv_str("time,close\n09:30,1\n").unwrap();
        let provider = InMemoryProvider::new().with_day("sh600000", day(), table.clone());
        assert_eq!(provider.fetch_day("sh600000", day()).unwrap(), table);
        assert!(provider.fetch_day("sz600000", day()).is_err());
    }
}
