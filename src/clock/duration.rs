//! Work durations in `HH:MM:SS` form and the three-field elapsed display

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ClockError, ClockResult};

/// Accumulated work time, stored as whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct WorkDuration(u64);

impl WorkDuration {
    pub const ZERO: WorkDuration = WorkDuration(0);

    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Parse `HH:MM:SS`. Hours are unbounded; minutes and seconds must be below 60.
    pub fn parse(input: &str) -> ClockResult<Self> {
        let invalid = || ClockError::InvalidDuration(input.to_string());

        let mut parts = input.trim().split(':');
        let (Some(h), Some(m), Some(s), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let field = |part: &str| -> ClockResult<u64> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse::<u64>().map_err(|_| invalid())
        };

        let (hours, minutes, seconds) = (field(h)?, field(m)?, field(s)?);
        if minutes >= 60 || seconds >= 60 {
            return Err(invalid());
        }

        hours
            .checked_mul(3600)
            .and_then(|secs| secs.checked_add(minutes * 60 + seconds))
            .map(Self)
            .ok_or_else(invalid)
    }

    /// Best-effort parse: empty input is zero, malformed input is zero plus `false`.
    pub fn parse_or_zero(input: &str) -> (Self, bool) {
        if input.trim().is_empty() {
            return (Self::ZERO, true);
        }
        match Self::parse(input) {
            Ok(duration) => (duration, true),
            Err(_) => (Self::ZERO, false),
        }
    }

    pub fn saturating_add_secs(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

impl fmt::Display for WorkDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ElapsedDisplay::from_total_seconds(self.0).fmt(f)
    }
}

/// What the user sees: hours, minutes and seconds of time worked today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElapsedDisplay {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl ElapsedDisplay {
    pub fn from_total_seconds(total: u64) -> Self {
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }

    pub fn total_seconds(&self) -> u64 {
        self.hours * 3600 + self.minutes * 60 + self.seconds
    }
}

impl From<WorkDuration> for ElapsedDisplay {
    fn from(duration: WorkDuration) -> Self {
        Self::from_total_seconds(duration.as_secs())
    }
}

impl fmt::Display for ElapsedDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}
