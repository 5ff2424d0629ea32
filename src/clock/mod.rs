//! Elapsed-duration clock
//!
//! Turns a server baseline (`HH:MM:SS` worked before the open session) and
//! the open session's start time into the "time worked today" value. All
//! parsing is best-effort: anything malformed degrades to showing the
//! baseline and is reported as a [`ClockAnomaly`] on the reading.

pub mod activity;
pub mod duration;
pub mod session_start;
pub mod wall;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use activity::Activity;
pub use duration::{ElapsedDisplay, WorkDuration};
pub use session_start::parse_session_start;
pub use wall::{MonotonicClock, SystemClock, WallClock};

/// The three values the clock is driven by
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClockInputs {
    pub activity: Activity,
    #[serde(default)]
    pub session_start: Option<String>,
    #[serde(default)]
    pub baseline: String,
}

impl ClockInputs {
    pub fn inactive(baseline: impl Into<String>) -> Self {
        Self {
            activity: Activity::Inactive,
            session_start: None,
            baseline: baseline.into(),
        }
    }

    pub fn active(baseline: impl Into<String>, session_start: impl Into<String>) -> Self {
        Self {
            activity: Activity::Active,
            session_start: Some(session_start.into()),
            baseline: baseline.into(),
        }
    }
}

/// Why a reading fell back to the baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockAnomaly {
    MalformedBaseline,
    MissingSessionStart,
    MalformedSessionStart,
    SessionStartInFuture,
}

/// One computed value of the clock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockReading {
    pub elapsed: ElapsedDisplay,
    pub total_seconds: u64,
    pub activity: Activity,
    /// Whether the value advances once per second
    pub ticking: bool,
    pub anomaly: Option<ClockAnomaly>,
    pub computed_at: DateTime<FixedOffset>,
    /// Input publication this reading was computed for, set by the timer task
    #[serde(default)]
    pub revision: u64,
}

/// Inputs after parsing: the baseline in seconds and the session anchor
#[derive(Debug, Clone)]
struct Resolved {
    baseline: WorkDuration,
    anchor: Option<DateTime<FixedOffset>>,
    anomaly: Option<ClockAnomaly>,
}

impl Resolved {
    fn from_inputs(inputs: &ClockInputs, now: &DateTime<FixedOffset>) -> Self {
        let (baseline, baseline_ok) = WorkDuration::parse_or_zero(&inputs.baseline);
        let mut anomaly = None;
        if !baseline_ok {
            warn!("Malformed baseline duration {:?}, using 00:00:00", inputs.baseline);
            anomaly = Some(ClockAnomaly::MalformedBaseline);
        }

        if !inputs.activity.is_active() {
            return Self { baseline, anchor: None, anomaly };
        }

        let raw = inputs
            .session_start
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let anchor = match raw {
            None => {
                warn!("Active session without a start time, showing baseline {}", baseline);
                anomaly = Some(ClockAnomaly::MissingSessionStart);
                None
            }
            Some(raw) => match parse_session_start(raw, now) {
                Some(start) => Some(start),
                None => {
                    warn!("Unparseable session start {:?}, showing baseline {}", raw, baseline);
                    anomaly = Some(ClockAnomaly::MalformedSessionStart);
                    None
                }
            },
        };

        Self { baseline, anchor, anomaly }
    }

    fn reading_at(&self, activity: Activity, now: DateTime<FixedOffset>) -> ClockReading {
        let mut anomaly = self.anomaly;
        let session_secs = match self.anchor {
            Some(start) => {
                let millis = (now - start).num_milliseconds();
                if millis < 0 {
                    anomaly = Some(ClockAnomaly::SessionStartInFuture);
                    0
                } else {
                    (millis / 1000) as u64
                }
            }
            // A missing or unparseable start anchors at "now": zero session time
            None => 0,
        };

        let total = self.baseline.saturating_add_secs(session_secs);
        ClockReading {
            elapsed: total.into(),
            total_seconds: total.as_secs(),
            activity,
            ticking: activity.is_active() && self.anchor.is_some(),
            anomaly,
            computed_at: now,
            revision: 0,
        }
    }
}

/// Compute the clock value for `inputs` at `now`.
///
/// Pure in its arguments: identical inputs and `now` give identical readings.
pub fn compute_elapsed(inputs: &ClockInputs, now: DateTime<FixedOffset>) -> ClockReading {
    Resolved::from_inputs(inputs, &now).reading_at(inputs.activity, now)
}

/// Clock state carried between ticks by the timer task
#[derive(Debug, Clone)]
pub struct ElapsedClock {
    inputs: ClockInputs,
    resolved: Resolved,
    last: ClockReading,
    future_start_logged: bool,
}

impl ElapsedClock {
    pub fn new(inputs: ClockInputs, now: DateTime<FixedOffset>) -> Self {
        let resolved = Resolved::from_inputs(&inputs, &now);
        let last = resolved.reading_at(inputs.activity, now);
        let mut clock = Self {
            inputs,
            resolved,
            last,
            future_start_logged: false,
        };
        clock.log_future_start();
        clock
    }

    /// Replace the inputs and recompute from scratch.
    ///
    /// Closing the session without a new baseline keeps the last computed
    /// value on screen. The next update, even with the same inputs, shows the
    /// baseline again.
    pub fn update(&mut self, inputs: ClockInputs, now: DateTime<FixedOffset>) -> &ClockReading {
        let freeze = self.last.ticking
            && !inputs.activity.is_active()
            && inputs.baseline == self.inputs.baseline;

        let resolved = Resolved::from_inputs(&inputs, &now);
        let mut reading = resolved.reading_at(inputs.activity, now);
        if freeze {
            debug!("Session closed with unchanged baseline, freezing at {}", self.last.elapsed);
            reading.elapsed = self.last.elapsed;
            reading.total_seconds = self.last.total_seconds;
        }

        self.inputs = inputs;
        self.resolved = resolved;
        self.last = reading;
        self.future_start_logged = false;
        self.log_future_start();
        &self.last
    }

    /// Advance to `now`. A clock that is not ticking keeps its last value.
    pub fn tick(&mut self, now: DateTime<FixedOffset>) -> &ClockReading {
        if !self.is_ticking() {
            return &self.last;
        }

        let reading = self.resolved.reading_at(self.inputs.activity, now);
        if reading.total_seconds >= self.last.total_seconds {
            self.last = reading;
        } else {
            // Wall clock stepped backwards; hold the value instead of counting down
            self.last.computed_at = now;
        }
        self.log_future_start();
        &self.last
    }

    pub fn is_ticking(&self) -> bool {
        self.inputs.activity.is_active() && self.resolved.anchor.is_some()
    }

    pub fn reading(&self) -> &ClockReading {
        &self.last
    }

    pub fn inputs(&self) -> &ClockInputs {
        &self.inputs
    }

    fn log_future_start(&mut self) {
        if self.last.anomaly == Some(ClockAnomaly::SessionStartInFuture) && !self.future_start_logged {
            warn!(
                "Session start {:?} is after now ({}), clamping session time to zero",
                self.inputs.session_start, self.last.computed_at
            );
            self.future_start_logged = true;
        }
    }
}
