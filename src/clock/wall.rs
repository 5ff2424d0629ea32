//! Sources of "now" for the clock

use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, Local, Offset, Utc};
use tokio::time::Instant;

use crate::errors::{ClockError, ClockResult};

/// Current date and time in the zone bare session times are read in
pub trait WallClock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// System wall time shifted into a fixed offset
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Use the host's current local offset
    pub fn local() -> Self {
        Self::new(*Local::now().offset())
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

impl WallClock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Wall time sampled once, then advanced by the tokio monotonic clock.
///
/// Unaffected by wall-clock jumps after construction, and follows
/// `tokio::time::pause`/`advance` in tests.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: DateTime<FixedOffset>,
    started: Instant,
}

impl MonotonicClock {
    pub fn starting_at(origin: DateTime<FixedOffset>) -> Self {
        Self {
            origin,
            started: Instant::now(),
        }
    }
}

impl WallClock for MonotonicClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let elapsed = ChronoDuration::from_std(self.started.elapsed()).unwrap_or(ChronoDuration::zero());
        self.origin + elapsed
    }
}

/// Parse `+HH:MM`, `-HHMM`, `Z` or `UTC` into a fixed offset
pub fn parse_utc_offset(input: &str) -> ClockResult<FixedOffset> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    trimmed
        .parse::<FixedOffset>()
        .map_err(|e| ClockError::InvalidOffset(format!("{}: {}", input, e)))
}
