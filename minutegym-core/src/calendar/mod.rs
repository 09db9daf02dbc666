//! Trading-minute calendar.
//!
//! Turns a date range into the ordered set of intraday minute timestamps of
//! every business day in it, and extends the range forward one business day
//! at a time when a caller needs more timestamps than the range yields.
//! Only weekends are excluded; there is no holiday table.

pub mod session;

pub use session::{session_minutes, SessionTemplate, SessionWindow, TradingSession};

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Weekday};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("no business days between {start} and {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid session template: {0}")]
    InvalidSession(String),

    #[error("calendar cannot be extended past {after}")]
    OutOfRange { after: NaiveDate },
}

/// Monday through Friday.
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// First business day strictly after `date`, or `None` past the last representable date.
pub fn next_business_day(date: NaiveDate) -> Option<NaiveDate> {
    let mut next = date.checked_add_days(Days::new(1))?;
    while !is_business_day(next) {
        next = next.checked_add_days(Days::new(1))?;
    }
    Some(next)
}

/// Business days in `[start, end]`, ascending. Empty when `start > end`.
pub fn business_days(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| is_business_day(*d))
        .collect()
}

/// Ordered minute timestamps spanning one or more sessions.
///
/// Strictly increasing by construction: sessions are appended in ascending
/// day order and each session is itself strictly increasing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MinuteCalendar {
    stamps: Vec<NaiveDateTime>,
    days: Vec<NaiveDate>,
}

impl MinuteCalendar {
    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }

    pub fn as_slice(&self) -> &[NaiveDateTime] {
        &self.stamps
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NaiveDateTime> {
        self.stamps.iter()
    }

    pub fn first(&self) -> Option<NaiveDateTime> {
        self.stamps.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDateTime> {
        self.stamps.last().copied()
    }

    /// Session days that contributed timestamps, ascending.
    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    /// Keep the first `len` timestamps. Session days no longer represented are dropped.
    pub fn truncated(mut self, len: usize) -> Self {
        self.stamps.truncate(len);
        if let Some(last) = self.stamps.last() {
            let last_day = last.date();
            self.days.retain(|d| *d <= last_day);
        } else {
            self.days.clear();
        }
        self
    }

    fn push_session(&mut self, template: &SessionTemplate, day: NaiveDate) {
        template.append_session(day, &mut self.stamps);
        self.days.push(day);
    }
}

impl<'a> IntoIterator for &'a MinuteCalendar {
    type Item = &'a NaiveDateTime;
    type IntoIter = std::slice::Iter<'a, NaiveDateTime>;

    fn into_iter(self) -> Self::IntoIter {
        self.stamps.iter()
    }
}

/// Builds minute calendars from a session template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalendarBuilder {
    template: SessionTemplate,
}

impl CalendarBuilder {
    pub fn new(template: SessionTemplate) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &SessionTemplate {
        &self.template
    }

    fn sessions_for(&self, days: &[NaiveDate]) -> MinuteCalendar {
        let mut calendar = MinuteCalendar {
            stamps: Vec::with_capacity(days.len() * self.template.minutes_per_session()),
            days: Vec::with_capacity(days.len()),
        };
        for day in days {
            calendar.push_session(&self.template, *day);
        }
        calendar
    }

    /// Natural yield of `[start, end]`, no length target.
    ///
    /// Fails with [`CalendarError::EmptyRange`] when the range holds no
    /// business day, since there is nothing to extend from.
    pub fn build_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<MinuteCalendar, CalendarError> {
        if start > end {
            return Err(CalendarError::InvalidRange { start, end });
        }
        let days = business_days(start, end);
        if days.is_empty() {
            return Err(CalendarError::EmptyRange { start, end });
        }
        Ok(self.sessions_for(&days))
    }

    /// At least `required` timestamps: the range's sessions, then whole
    /// business-day sessions after the last day used until the count is met.
    ///
    /// A range without business days is extended from the first business day
    /// after `end`. Every session adds at least one timestamp, so the loop
    /// terminates for any finite `required`.
    pub fn build_at_least(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        required: usize,
    ) -> Result<MinuteCalendar, CalendarError> {
        if start > end {
            return Err(CalendarError::InvalidRange { start, end });
        }
        let mut calendar = self.sessions_for(&business_days(start, end));
        let base_len = calendar.len();

        let mut last = calendar.days.last().copied().unwrap_or(end);
        while calendar.len() < required {
            let next = next_business_day(last).ok_or(CalendarError::OutOfRange { after: last })?;
            calendar.push_session(&self.template, next);
            last = next;
        }

        if calendar.len() > base_len {
            tracing::debug!(
                %start,
                %end,
                required,
                base_len,
                extended_to = %last,
                "calendar extended past requested range"
            );
        }
        Ok(calendar)
    }

    /// Exactly `required` timestamps (extension, then truncation).
    pub fn build_exact(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        required: usize,
    ) -> Result<MinuteCalendar, CalendarError> {
        Ok(self.build_at_least(start, end, required)?.truncated(required))
    }
}
