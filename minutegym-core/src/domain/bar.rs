//! Minute bar and the per-symbol series built from them.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV values without a timestamp.
///
/// Used where the time axis is not yet trustworthy (counter-indexed rows
/// waiting for repair).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarValues {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// OHLCV bar attached to exactly one minute timestamp.
///
/// `high >= max(open, close)` and `low <= min(open, close)` are expected of
/// well-formed input but not enforced here; see [`MinuteBar::is_sane`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinuteBar {
    pub datetime: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl MinuteBar {
    pub fn from_values(datetime: NaiveDateTime, values: BarValues) -> Self {
        Self {
            datetime,
            open: values.open,
            high: values.high,
            low: values.low,
            close: values.close,
            volume: values.volume,
        }
    }

    pub fn values(&self) -> BarValues {
        BarValues {
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.datetime.date()
    }

    /// OHLC envelope holds and volume is non-negative.
    pub fn is_sane(&self) -> bool {
        self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
            && self.high >= self.low
            && self.volume >= 0.0
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SeriesError {
    #[error("timestamps not strictly increasing at index {index}: {previous} then {current}")]
    NotIncreasing {
        index: usize,
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },
}

/// Ordered, duplicate-free minute bars for one symbol.
///
/// Every constructor checks strict ordering; transformations return a new
/// series instead of mutating this one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OhlcvSeries {
    bars: Vec<MinuteBar>,
}

impl OhlcvSeries {
    pub fn new(bars: Vec<MinuteBar>) -> Result<Self, SeriesError> {
        if let Some(i) = bars.windows(2).position(|w| w[0].datetime >= w[1].datetime) {
            return Err(SeriesError::NotIncreasing {
                index: i + 1,
                previous: bars[i].datetime,
                current: bars[i + 1].datetime,
            });
        }
        Ok(Self { bars })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[MinuteBar] {
        &self.bars
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MinuteBar> {
        self.bars.iter()
    }

    pub fn first(&self) -> Option<&MinuteBar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&MinuteBar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn datetimes(&self) -> Vec<NaiveDateTime> {
        self.bars.iter().map(|b| b.datetime).collect()
    }

    /// Distinct calendar days present, ascending.
    pub fn days(&self) -> Vec<NaiveDate> {
        let mut days: Vec<NaiveDate> = self.bars.iter().map(|b| b.date()).collect();
        days.dedup();
        days
    }

    /// Bars falling on `day`, as a new series.
    pub fn on_day(&self, day: NaiveDate) -> Self {
        Self {
            bars: self.bars.iter().filter(|b| b.date() == day).copied().collect(),
        }
    }

    pub fn into_bars(self) -> Vec<MinuteBar> {
        self.bars
    }
}

impl<'a> IntoIterator for &'a OhlcvSeries {
    type Item = &'a MinuteBar;
    type IntoIter = std::slice::Iter<'a, MinuteBar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}
