//! Trading session template: two intraday windows sampled on a fixed minute grid.
//!
//! The default template follows the A-share convention: a morning window
//! 09:30–11:30 and an afternoon window 13:00–15:00, both inclusive, one bar
//! per minute. The lunch break between the windows is never sampled.

use super::CalendarError;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

const fn hm(hour: u32, minute: u32) -> NaiveTime {
    match NaiveTime::from_hms_opt(hour, minute, 0) {
        Some(t) => t,
        None => panic!("invalid session time"),
    }
}

pub const A_SHARE_MORNING_OPEN: NaiveTime = hm(9, 30);
pub const A_SHARE_MORNING_CLOSE: NaiveTime = hm(11, 30);
pub const A_SHARE_AFTERNOON_OPEN: NaiveTime = hm(13, 0);
pub const A_SHARE_AFTERNOON_CLOSE: NaiveTime = hm(15, 0);

/// One contiguous trading window, open and close both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    open: NaiveTime,
    close: NaiveTime,
}

impl SessionWindow {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Result<Self, CalendarError> {
        if open > close {
            return Err(CalendarError::InvalidSession(format!(
                "window opens at {open} after it closes at {close}"
            )));
        }
        Ok(Self { open, close })
    }

    pub fn open(&self) -> NaiveTime {
        self.open
    }

    pub fn close(&self) -> NaiveTime {
        self.close
    }

    /// Whether a wall-clock time falls inside the window (grid alignment not checked).
    pub fn contains(&self, time: NaiveTime) -> bool {
        time >= self.open && time <= self.close
    }

    fn sample_count(&self, step_minutes: u32) -> usize {
        let span = (self.close - self.open).num_minutes();
        (span / i64::from(step_minutes)) as usize + 1
    }

    fn push_samples(&self, date: NaiveDate, step: Duration, out: &mut Vec<NaiveDateTime>) {
        let end = date.and_time(self.close);
        let mut ts = date.and_time(self.open);
        while ts <= end {
            out.push(ts);
            ts += step;
        }
    }
}

/// Morning + afternoon windows sampled every `step_minutes`.
///
/// Construction guarantees each window yields at least one timestamp, so every
/// generated session is non-empty. Calendar extension relies on this to terminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTemplate {
    morning: SessionWindow,
    afternoon: SessionWindow,
    step_minutes: u32,
}

impl SessionTemplate {
    pub fn new(
        morning: SessionWindow,
        afternoon: SessionWindow,
        step_minutes: u32,
    ) -> Result<Self, CalendarError> {
        if step_minutes == 0 {
            return Err(CalendarError::InvalidSession(
                "step must be at least one minute".into(),
            ));
        }
        if morning.close >= afternoon.open {
            return Err(CalendarError::InvalidSession(format!(
                "morning window closes at {} but afternoon opens at {}",
                morning.close, afternoon.open
            )));
        }
        Ok(Self {
            morning,
            afternoon,
            step_minutes,
        })
    }

    /// 09:30–11:30 and 13:00–15:00, one-minute bars.
    pub fn a_share() -> Self {
        Self {
            morning: SessionWindow {
                open: A_SHARE_MORNING_OPEN,
                close: A_SHARE_MORNING_CLOSE,
            },
            afternoon: SessionWindow {
                open: A_SHARE_AFTERNOON_OPEN,
                close: A_SHARE_AFTERNOON_CLOSE,
            },
            step_minutes: 1,
        }
    }

    pub fn morning(&self) -> SessionWindow {
        self.morning
    }

    pub fn afternoon(&self) -> SessionWindow {
        self.afternoon
    }

    pub fn step_minutes(&self) -> u32 {
        self.step_minutes
    }

    /// Number of timestamps one session contributes.
    pub fn minutes_per_session(&self) -> usize {
        self.morning.sample_count(self.step_minutes) + self.afternoon.sample_count(self.step_minutes)
    }

    /// True when `time` lies inside either window.
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.morning.contains(time) || self.afternoon.contains(time)
    }

    pub fn session(&self, date: NaiveDate) -> TradingSession {
        TradingSession {
            date,
            template: *self,
        }
    }

    pub(crate) fn append_session(&self, date: NaiveDate, out: &mut Vec<NaiveDateTime>) {
        let step = Duration::minutes(i64::from(self.step_minutes));
        self.morning.push_samples(date, step, out);
        self.afternoon.push_samples(date, step, out);
    }
}

impl Default for SessionTemplate {
    fn default() -> Self {
        Self::a_share()
    }
}

/// A calendar date bound to a session template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingSession {
    pub date: NaiveDate,
    template: SessionTemplate,
}

impl TradingSession {
    /// All sampled timestamps of the session, in time order.
    pub fn minutes(&self) -> Vec<NaiveDateTime> {
        let mut out = Vec::with_capacity(self.template.minutes_per_session());
        self.template.append_session(self.date, &mut out);
        out
    }

    pub fn first(&self) -> NaiveDateTime {
        self.date.and_time(self.template.morning.open)
    }
}

/// Minutes of one A-share session on `date`.
pub fn session_minutes(date: NaiveDate) -> Vec<NaiveDateTime> {
    SessionTemplate::a_share().session(date).minutes()
}
