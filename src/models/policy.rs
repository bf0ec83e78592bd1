use crate::utils::time::parse_hhmm;
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_TIMEZONE: &str = "Asia/Jakarta";
pub const DEFAULT_IN_START: &str = "05:00";
pub const DEFAULT_LATE_AFTER: &str = "08:00";
pub const DEFAULT_OUT_START: &str = "15:00";
pub const DEFAULT_COOLDOWN_SECONDS: i64 = 45;
pub const DEFAULT_RETENTION_DAYS: i64 = 60;

/// Raw singleton row of `attendance_policy`, exactly as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRow {
    pub timezone: String,
    pub in_start_time: String,
    pub late_after_time: String,
    pub out_start_time: String,
    pub out_end_time: Option<String>,
    pub cooldown_seconds: i64,
    pub retention_days: i64,
    pub updated_at: String,
}

impl Default for PolicyRow {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_string(),
            in_start_time: DEFAULT_IN_START.to_string(),
            late_after_time: DEFAULT_LATE_AFTER.to_string(),
            out_start_time: DEFAULT_OUT_START.to_string(),
            out_end_time: None,
            cooldown_seconds: DEFAULT_COOLDOWN_SECONDS,
            retention_days: DEFAULT_RETENTION_DAYS,
            updated_at: String::new(),
        }
    }
}

/// Validated policy used by the attendance engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub timezone: Tz,
    pub in_start: NaiveTime,
    pub late_after: NaiveTime,
    pub out_start: NaiveTime,
    pub out_end: Option<NaiveTime>,
    pub cooldown_seconds: i64,
    pub retention_days: i64,
}

impl Default for Policy {
    fn default() -> Self {
        Policy::from_row(&PolicyRow::default())
    }
}

/// Parse a time-of-day field, falling back to `default` (and logging) when invalid.
fn time_or_default(field: &str, raw: &str, default: &str) -> NaiveTime {
    match parse_hhmm(raw) {
        Some(t) => t,
        None => {
            warn!(field, value = raw, fallback = default, "invalid policy time, using default");
            // defaults are compile-time constants in HH:MM form
            parse_hhmm(default).unwrap_or(NaiveTime::MIN)
        }
    }
}

impl Policy {
    /// Build a policy from its stored row. Never fails: invalid values fall
    /// back to the defaults and a warning is emitted.
    pub fn from_row(row: &PolicyRow) -> Self {
        let timezone = match row.timezone.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                warn!(
                    value = %row.timezone,
                    fallback = DEFAULT_TIMEZONE,
                    "invalid policy timezone, using default"
                );
                chrono_tz::Asia::Jakarta
            }
        };

        let out_end = match row.out_end_time.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match parse_hhmm(raw) {
                Some(t) => Some(t),
                None => {
                    warn!(value = raw, "invalid out_end_time, OUT window left unbounded");
                    None
                }
            },
        };

        let cooldown_seconds = if row.cooldown_seconds < 0 {
            warn!(value = row.cooldown_seconds, "negative cooldown, using default");
            DEFAULT_COOLDOWN_SECONDS
        } else {
            row.cooldown_seconds
        };

        let retention_days = if row.retention_days <= 0 {
            warn!(value = row.retention_days, "non-positive retention, using default");
            DEFAULT_RETENTION_DAYS
        } else {
            row.retention_days
        };

        Self {
            timezone,
            in_start: time_or_default("in_start_time", &row.in_start_time, DEFAULT_IN_START),
            late_after: time_or_default("late_after_time", &row.late_after_time, DEFAULT_LATE_AFTER),
            out_start: time_or_default("out_start_time", &row.out_start_time, DEFAULT_OUT_START),
            out_end,
            cooldown_seconds,
            retention_days,
        }
    }
}

/// Partial update of the policy row. `out_end_time: Some(None)` clears the upper bound.
#[derive(Debug, Clone, Default)]
pub struct PolicyPatch {
    pub timezone: Option<String>,
    pub in_start_time: Option<String>,
    pub late_after_time: Option<String>,
    pub out_start_time: Option<String>,
    pub out_end_time: Option<Option<String>>,
    pub cooldown_seconds: Option<i64>,
    pub retention_days: Option<i64>,
}

impl PolicyPatch {
    pub fn is_empty(&self) -> bool {
        self.timezone.is_none()
            && self.in_start_time.is_none()
            && self.late_after_time.is_none()
            && self.out_start_time.is_none()
            && self.out_end_time.is_none()
            && self.cooldown_seconds.is_none()
            && self.retention_days.is_none()
    }
}
