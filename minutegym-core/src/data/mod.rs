//! Data ingestion: raw payloads, normalization, canonicalization, flat files.

pub mod canonicalize;
pub mod columns;
pub mod csv_io;
pub mod download;
pub mod normalize;
pub mod provider;
pub mod raw;
pub mod resample;
pub mod synthetic;

pub use canonicalize::{anomaly_report, canonicalize_bars, AnomalyReport, Canonicalizer};
pub use download::{collect_days, collect_symbol, exchange_prefixes, CollectSummary, Collected};
pub use normalize::{merge_days, normalize_day, normalize_file, try_normalize_day, NormalizeError};
pub use provider::{
    CollectProgress, CsvDirProvider, DataError, InMemoryProvider, MinuteProvider, NullProgress,
    StdoutProgress,
};
pub use raw::RawTable;
pub use resample::resample_minutes;
pub use synthetic::{generate_sessions, SyntheticParams};
