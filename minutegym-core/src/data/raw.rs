//! Raw per-day payloads: a header row plus untyped string cells.
//!
//! Providers hand back whatever the upstream source produced. Nothing is
//! interpreted here; column detection and parsing happen in
//! [`crate::data::normalize`].

use std::io::Read;
use std::path::Path;

/// Header + string rows, exactly as read.
///
/// Rows may be ragged; [`RawTable::cell`] returns an empty string for a
/// missing trailing cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers = headers.into_iter().map(|h| clean_header(&h)).collect();
        Self { headers, rows }
    }

    /// Parse CSV text with a header row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, csv::Error> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let headers = rdr.headers()?.iter().map(str::to_owned).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_owned).collect());
        }
        Ok(Self::new(headers, rows))
    }

    pub fn from_csv_str(text: &str) -> Result<Self, csv::Error> {
        Self::from_reader(text.as_bytes())
    }

    pub fn from_path(path: &Path) -> Result<Self, csv::Error> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// No data rows (a header alone still counts as empty).
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.trim())
            .unwrap_or("")
    }

    /// All cells of one column, trimmed.
    pub fn column(&self, col: usize) -> impl Iterator<Item = &str> + '_ {
        (0..self.rows.len()).map(move |r| self.cell(r, col))
    }
}

fn clean_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_csv_and_cleans_headers() {
        let table =
            RawTable::from_csv_str("\u{feff} 时间 ,开盘\n09:30, 10.5\n09:31,10.6\n").unwrap();
        assert_eq!(table.headers(), &["时间".to_string(), "开盘".to_string()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 1), "10.5");
    }

    #[test]
    fn ragged_rows_yield_empty_cells() {
        let table = RawTable::from_csv_str("time,open,close\n09:30,1.0\n").unwrap();
        assert_eq!(table.cell(0, 2), "");
        assert_eq!(table.cell(5, 0), "");
        let opens: Vec<&str> = table.column(1).collect();
        assert_eq!(opens, vec!["1.0"]);
    }

    #[test]
    fn header_only_is_empty() {
        let table = RawTable::from_csv_str("time,open\n").unwrap();
        assert!(table.is_empty());
    }
}
