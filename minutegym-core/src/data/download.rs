//! Collection orchestrator: walks the business days of a range, fetches and
//! normalizes each day, and merges what survives.
//!
//! Failed or empty days are skipped and recorded; the core never retries.

use super::normalize::{merge_days, try_normalize_day};
use super::provider::{CollectProgress, DataError, MinuteProvider};
use crate::calendar::business_days;
use crate::domain::OhlcvSeries;
use chrono::NaiveDate;

/// Exchange prefixes to try, in order. Codes starting with `6` list on
/// Shanghai, everything else is tried on Shenzhen first.
pub fn exchange_prefixes(symbol: &str) -> [&'static str; 2] {
    if symbol.starts_with('6') {
        ["sh", "sz"]
    } else {
        ["sz", "sh"]
    }
}

/// Outcome of collecting one provider symbol over a range.
#[derive(Debug, Clone)]
pub struct CollectSummary {
    pub symbol: String,
    pub days_total: usize,
    pub days_ok: usize,
    pub skipped: Vec<(NaiveDate, String)>,
}

impl CollectSummary {
    pub fn all_succeeded(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Fetch, normalize and merge every business day of `[start, end]` for one
/// fully-qualified provider symbol.
pub fn collect_days(
    provider: &dyn MinuteProvider,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    progress: &dyn CollectProgress,
) -> Result<(OhlcvSeries, CollectSummary), DataError> {
    let days = business_days(start, end);
    let mut frames = Vec::new();
    let mut skipped = Vec::new();

    for day in &days {
        let result = provider
            .fetch_day(symbol, *day)
            .map_err(|e| e.to_string())
            .and_then(|table| try_normalize_day(&table, *day).map_err(|e| e.to_string()));

        progress.on_day(symbol, *day, &result.as_ref().map(|s| s.len()).map_err(Clone::clone));
        match result {
            Ok(series) => frames.push(series),
            Err(reason) => {
                tracing::warn!(symbol, %day, %reason, "day skipped");
                skipped.push((*day, reason));
            }
        }
    }

    let summary = CollectSummary {
        symbol: symbol.to_string(),
        days_total: days.len(),
        days_ok: frames.len(),
        skipped,
    };
    progress.on_complete(symbol, summary.days_ok, summary.skipped.len());
    let merged = merge_days(frames)?;
    tracing::info!(
        symbol,
        provider = provider.name(),
        days_ok = summary.days_ok,
        days_total = summary.days_total,
        bars = merged.len(),
        "collection finished"
    );
    Ok((merged, summary))
}

/// Collected series for a bare exchange code.
#[derive(Debug, Clone)]
pub struct Collected {
    pub prefix: &'static str,
    pub series: OhlcvSeries,
    pub summary: CollectSummary,
}

/// Collect a bare code (`600000`), trying each exchange prefix in turn.
/// The first prefix yielding any data wins.
pub fn collect_symbol(
    provider: &dyn MinuteProvider,
    code: &str,
    start: NaiveDate,
    end: NaiveDate,
    progress: &dyn CollectProgress,
) -> Result<Collected, DataError> {
    if start > end {
        return Err(DataError::Validation(format!(
            "start {start} is after end {end}"
        )));
    }
    let prefixes = exchange_prefixes(code);
    let days = business_days(start, end).len();
    for prefix in prefixes {
        let symbol = format!("{prefix}{code}");
        progress.on_prefix(code, prefix, days);
        let (series, summary) = collect_days(provider, &symbol, start, end, progress)?;
        if !series.is_empty() {
            return Ok(Collected {
                prefix,
                series,
                summary,
            });
        }
        tracing::info!(%symbol, "no data under prefix, trying next");
    }
    Err(DataError::NoDataAnyPrefix {
        symbol: code.to_string(),
        tried: prefixes.join(","),
    })
}

/// Output file name used by the collector: `{code}_{step}m_{prefix}_ts.csv`.
pub fn collected_file_name(code: &str, step_minutes: u32, prefix: &str) -> String {
    format!("{code}_{step_minutes}m_{prefix}_ts.csv")
}
