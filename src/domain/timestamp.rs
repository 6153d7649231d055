// Timestamp codec - parsing and display of upstream time fields
use chrono::{DateTime, FixedOffset, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use serde::Deserialize;
use std::fmt;

/// Upstream marker for "never recorded".
const UNSET_PREFIX: &str = "0000";
const MINUTES_PER_DAY: i64 = 24 * 60;

pub const NOT_AVAILABLE: &str = "N/A";

const NAIVE_INSTANT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Which raw form the `ftime`/`etime` fields use in a given deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampEncoding {
    /// Compact "HHMM" clock time on the current day.
    Clock,
    /// Full ISO date and time.
    Instant,
}

impl TimestampEncoding {
    pub fn parse(&self, raw: Option<&str>, anchor: &DateTime<FixedOffset>) -> Option<Timestamp> {
        match self {
            TimestampEncoding::Clock => parse_clock(raw, anchor),
            TimestampEncoding::Instant => parse_instant(raw, *anchor.offset()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampKind {
    Instant,
    Clock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    at: DateTime<FixedOffset>,
    kind: TimestampKind,
}

impl Timestamp {
    pub fn instant(at: DateTime<FixedOffset>) -> Self {
        Self {
            at,
            kind: TimestampKind::Instant,
        }
    }

    pub fn at(&self) -> DateTime<FixedOffset> {
        self.at
    }

    fn minute_of_day(&self) -> i64 {
        i64::from(self.at.hour()) * 60 + i64::from(self.at.minute())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.at.format("%a, %b %-d, %Y, %I:%M:%S %p"))
    }
}

fn is_unset(raw: &str) -> bool {
    raw.is_empty() || raw.starts_with(UNSET_PREFIX)
}

/// Parse an "HHMM" clock time onto the calendar day of `anchor`.
pub fn parse_clock(raw: Option<&str>, anchor: &DateTime<FixedOffset>) -> Option<Timestamp> {
    let raw = raw?;
    if is_unset(raw) || raw.len() != 4 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let hour: u32 = raw[..2].parse().ok()?;
    let minute: u32 = raw[2..].parse().ok()?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    let local = anchor.date_naive().and_time(time);
    let at = anchor.offset().from_local_datetime(&local).single()?;

    Some(Timestamp {
        at,
        kind: TimestampKind::Clock,
    })
}

/// Parse a full date and time. Strings without an offset are read in `zone`.
pub fn parse_instant(raw: Option<&str>, zone: FixedOffset) -> Option<Timestamp> {
    let raw = raw?.trim();
    if is_unset(raw) {
        return None;
    }

    let at = match DateTime::parse_from_rfc3339(raw) {
        Ok(at) => at.with_timezone(&zone),
        Err(_) => {
            let naive = NAIVE_INSTANT_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())?;
            zone.from_local_datetime(&naive).single()?
        }
    };

    Some(Timestamp::instant(at))
}

pub fn format(ts: Option<&Timestamp>) -> String {
    ts.map(|t| t.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Minutes from `start` to `end` by time of day, wrapping past midnight.
pub fn duration_between_clock_times(start: &Timestamp, end: &Timestamp) -> String {
    let mut minutes = end.minute_of_day() - start.minute_of_day();
    if minutes < 0 {
        minutes += MINUTES_PER_DAY;
    }
    format_hours_minutes(minutes)
}

/// Run time from `start` to `end`. Clock times use the time-of-day rule;
/// instants use the real difference and yield None when `end` precedes `start`.
pub fn duration_between(start: &Timestamp, end: &Timestamp) -> Option<String> {
    match (start.kind, end.kind) {
        (TimestampKind::Clock, TimestampKind::Clock) => {
            Some(duration_between_clock_times(start, end))
        }
        _ => {
            let minutes = (end.at - start.at).num_minutes();
            (minutes >= 0).then(|| format_hours_minutes(minutes))
        }
    }
}

fn format_hours_minutes(minutes: i64) -> String {
    format!("{} hr {} min", minutes / 60, minutes % 60)
}

pub fn duration_since(start: Option<&Timestamp>, now: &DateTime<FixedOffset>) -> Option<String> {
    let start = start?;
    let seconds = (*now - start.at).num_seconds().max(0);
    Some(format_elapsed(seconds))
}

fn format_elapsed(seconds: i64) -> String {
    format!(
        "{}h {}m {}s",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
