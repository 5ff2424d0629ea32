//! Parsing of the open session's start time.
//!
//! The backend reports the start in one of three shapes. Each shape is a
//! parser attempt returning `Option`; attempts run in a fixed order and the
//! first hit wins. Bare times are placed on the calendar day of `now`, in
//! `now`'s offset.

use chrono::{DateTime, FixedOffset, NaiveDateTime, NaiveTime};

type Attempt = fn(&str, &DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>>;

const ATTEMPTS: &[(&str, Attempt)] = &[
    ("timestamp", full_timestamp),
    ("HH:MM", colon_time),
    ("HH.MM", dotted_time),
];

/// Naive date-time layouts, read in the offset of `now`
const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Resolve `input` to an instant, or `None` when no shape matches
pub fn parse_session_start(input: &str, now: &DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    ATTEMPTS.iter().find_map(|(shape, attempt)| {
        let parsed = attempt(input, now)?;
        tracing::trace!("session start {:?} matched shape {}", input, shape);
        Some(parsed)
    })
}

fn full_timestamp(input: &str, now: &DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt);
    }

    NAIVE_LAYOUTS.iter().find_map(|layout| {
        NaiveDateTime::parse_from_str(input, layout)
            .ok()
            .and_then(|naive| naive.and_local_timezone(*now.offset()).single())
    })
}

fn colon_time(input: &str, now: &DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    bare_time(input, "%H:%M", now)
}

fn dotted_time(input: &str, now: &DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    bare_time(input, "%H.%M", now)
}

fn bare_time(input: &str, layout: &str, now: &DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    let time = NaiveTime::parse_from_str(input, layout).ok()?;
    now.date_naive()
        .and_time(time)
        .and_local_timezone(*now.offset())
        .single()
}
