//! Time utilities: HH:MM validation, UTC timestamp storage format, local rendering.

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::OnceLock;

/// Canonical storage format for timestamps (always UTC).
pub const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

fn hhmm_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{2}):(\d{2})$").expect("static regex"))
}

/// Strict `HH:MM` parser: two digits each, hour 0–23, minute 0–59.
pub fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    let caps = hhmm_re().captures(s.trim())?;
    let h: u32 = caps[1].parse().ok()?;
    let m: u32 = caps[2].parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    NaiveTime::from_hms_opt(h, m, 0)
}

pub fn validate_hhmm(s: &str) -> AppResult<String> {
    parse_hhmm(s)
        .map(|t| t.format("%H:%M").to_string())
        .ok_or_else(|| AppError::InvalidTime(s.to_string()))
}

pub fn validate_timezone(s: &str) -> AppResult<Tz> {
    s.trim()
        .parse::<Tz>()
        .map_err(|_| AppError::InvalidTimezone(s.to_string()))
}

pub fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// Parse a stored timestamp. Accepts the canonical format and RFC 3339.
pub fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, TS_FORMAT) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Render a UTC timestamp as local `HH:MM:SS` in the given zone.
pub fn local_hms(ts: &DateTime<Utc>, tz: &Tz) -> String {
    ts.with_timezone(tz).format("%H:%M:%S").to_string()
}

/// Truncate to microseconds so that in-memory values compare equal to stored ones.
pub fn storage_precision(ts: DateTime<Utc>) -> DateTime<Utc> {
    parse_ts(&format_ts(&ts)).unwrap_or(ts)
}
