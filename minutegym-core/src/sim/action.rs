//! Discrete actions and the positions they target.

use super::SimError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Agent action. Encoded as `0 = hold, 1 = long, 2 = short`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Hold,
    Long,
    Short,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Hold, Action::Long, Action::Short];

    /// Position this action moves to. Hold targets flat.
    pub fn target(self) -> Position {
        match self {
            Action::Hold => Position::Flat,
            Action::Long => Position::Long,
            Action::Short => Position::Short,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Hold => "hold",
            Action::Long => "long",
            Action::Short => "short",
        }
    }
}

impl TryFrom<u8> for Action {
    type Error = SimError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Action::Hold),
            1 => Ok(Action::Long),
            2 => Ok(Action::Short),
            other => Err(SimError::UnknownAction(other)),
        }
    }
}

impl From<Action> for u8 {
    fn from(action: Action) -> Self {
        match action {
            Action::Hold => 0,
            Action::Long => 1,
            Action::Short => 2,
        }
    }
}

impl FromStr for Action {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hold" | "0" => Ok(Action::Hold),
            "long" | "1" => Ok(Action::Long),
            "short" | "2" => Ok(Action::Short),
            _ => Err(SimError::UnknownActionName(s.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Held position, exactly one of short, flat or long one unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i8)]
pub enum Position {
    Short = -1,
    #[default]
    Flat = 0,
    Long = 1,
}

impl Position {
    pub fn as_i8(self) -> i8 {
        self as i8
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.as_i8())
    }

    /// `|to - from|`, in units: 0, 1 or 2.
    pub fn change_magnitude(self, to: Position) -> u8 {
        (to.as_i8() - self.as_i8()).unsigned_abs()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Short => f.write_str("short"),
            Position::Flat => f.write_str("flat"),
            Position::Long => f.write_str("long"),
        }
    }
}
