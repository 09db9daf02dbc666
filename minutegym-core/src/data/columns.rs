//! Column-name lookup for heterogeneous minute feeds.
//!
//! Upstream sources label the same fields in English or in Chinese, with any
//! casing. Matching is against a static alias table after lowercasing; the
//! first alias that hits wins.

/// Candidate labels for the time column, highest priority first.
pub const TIME_ALIASES: &[&str] = &["datetime", "time", "时间", "date", "日期"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Open,
        Field::High,
        Field::Low,
        Field::Close,
        Field::Volume,
    ];

    pub const PRICES: [Field; 4] = [Field::Open, Field::High, Field::Low, Field::Close];

    /// Canonical output column name.
    pub fn name(self) -> &'static str {
        match self {
            Field::Open => "open",
            Field::High => "high",
            Field::Low => "low",
            Field::Close => "close",
            Field::Volume => "volume",
        }
    }

    /// Accepted surface forms, already lowercased.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Open => &["open", "开盘", "开盘价"],
            Field::High => &["high", "最高", "最高价"],
            Field::Low => &["low", "最低", "最低价"],
            Field::Close => &["close", "收盘", "收盘价"],
            Field::Volume => &["volume", "成交量", "vol"],
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

fn find_by_aliases(headers: &[String], aliases: &[&str]) -> Option<usize> {
    let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    aliases
        .iter()
        .find_map(|alias| lowered.iter().position(|h| h == alias))
}

/// Index of the time column, if any header matches [`TIME_ALIASES`].
pub fn find_time_column(headers: &[String]) -> Option<usize> {
    find_by_aliases(headers, TIME_ALIASES)
}

/// Where each canonical field lives in a raw header row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldColumns {
    slots: [Option<usize>; 5],
}

impl FieldColumns {
    pub fn detect(headers: &[String]) -> Self {
        let mut slots = [None; 5];
        for field in Field::ALL {
            slots[field.index()] = find_by_aliases(headers, field.aliases());
        }
        Self { slots }
    }

    pub fn get(&self, field: Field) -> Option<usize> {
        self.slots[field.index()]
    }

    /// Price fields with no matching column.
    pub fn missing_prices(&self) -> Vec<Field> {
        Field::PRICES
            .into_iter()
            .filter(|f| self.get(*f).is_none())
            .collect()
    }

    /// At least one price field is present.
    pub fn has_price(&self) -> bool {
        Field::PRICES.into_iter().any(|f| self.get(f).is_some())
    }
}

/// Complete a row's `[open, high, low, close]` from the fields it carries.
///
/// Open and close stand in for each other (then any present price); an
/// absent high or low is the max or min of the present prices, so the
/// envelope holds. `None` when no price is present at all.
pub fn fill_prices(present: [Option<f64>; 4]) -> Option<[f64; 4]> {
    let [open, high, low, close] = present;
    let any = open.or(close).or(high).or(low)?;
    let given = || present.into_iter().flatten();
    let close = close.or(open).unwrap_or(any);
    let open = open.unwrap_or(close);
    let high = high.unwrap_or_else(|| given().fold(f64::NEG_INFINITY, f64::max));
    let low = low.unwrap_or_else(|| given().fold(f64::INFINITY, f64::min));
    Some([open, high, low, close])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn time_column_priority_prefers_datetime() {
        let h = headers(&["date", "Time", "DateTime"]);
        assert_eq!(find_time_column(&h), Some(2));
    }

    #[test]
    fn chinese_time_label_is_found() {
        let h = headers(&["时间", "开盘"]);
        assert_eq!(find_time_column(&h), Some(0));
    }

    #[test]
    fn no_time_column() {
        assert_eq!(find_time_column(&headers(&["open", "close"])), None);
    }

    #[test]
    fn maps_chinese_and_mixed_case_fields() {
        let h = headers(&["时间", "开盘价", "最高", "最低", "Close", "成交量", "成交额"]);
        let cols = FieldColumns::detect(&h);
        assert_eq!(cols.get(Field::Open), Some(1));
        assert_eq!(cols.get(Field::High), Some(2));
        assert_eq!(cols.get(Field::Low), Some(3));
        assert_eq!(cols.get(Field::Close), Some(4));
        assert_eq!(cols.get(Field::Volume), Some(5));
        assert!(cols.missing_prices().is_empty());
    }

    #[test]
    fn close_only_fills_every_price() {
        assert_eq!(
            fill_prices([None, None, None, Some(10.0)]),
            Some([10.0, 10.0, 10.0, 10.0])
        );
    }

    #[test]
    fn absent_high_low_span_present_prices() {
        assert_eq!(
            fill_prices([Some(9.5), None, None, Some(10.0)]),
            Some([9.5, 10.0, 9.5, 10.0])
        );
        assert_eq!(
            fill_prices([Some(9.5), Some(11.0), Some(9.0), None]),
            Some([9.5, 11.0, 9.0, 9.5])
        );
        assert_eq!(fill_prices([None; 4]), None);
    }

    #[test]
    fn reports_missing_price_fields() {
        let cols = FieldColumns::detect(&headers(&["time", "close", "volume"]));
        assert_eq!(
            cols.missing_prices(),
            vec![Field::Open, Field::High, Field::Low]
        );
        assert!(cols.has_price());
        assert!(!FieldColumns::detect(&headers(&["time", "amount"])).has_price());
    }
}
