use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Derived one-row-per-(day, person) summary of IN/OUT times.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAttendance {
    pub id: i64, // 0 until persisted
    pub day: NaiveDate,
    pub person_name: String,
    pub in_time: Option<DateTime<Utc>>,
    pub in_is_late: bool,
    pub out_time: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Observable state of a (day, person) key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DayState {
    None,
    InRecorded,
    Complete,
}

impl DailyAttendance {
    pub fn new(day: NaiveDate, person_name: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            day,
            person_name: person_name.to_string(),
            in_time: None,
            in_is_late: false,
            out_time: None,
            updated_at: now,
        }
    }

    pub fn state(&self) -> DayState {
        match (self.in_time, self.out_time) {
            (None, _) => DayState::None,
            (Some(_), None) => DayState::InRecorded,
            (Some(_), Some(_)) => DayState::Complete,
        }
    }

    /// Fold an IN timestamp: the earliest one wins.
    /// Returns true if the aggregate changed.
    pub fn merge_in(&mut self, ts: DateTime<Utc>, is_late: bool) -> bool {
        match self.in_time {
            Some(existing) if existing <= ts => false,
            _ => {
                self.in_time = Some(ts);
                self.in_is_late = is_late;
                true
            }
        }
    }

    /// Fold an OUT timestamp: the latest one wins.
    pub fn merge_out(&mut self, ts: DateTime<Utc>) -> bool {
        match self.out_time {
            Some(existing) if existing >= ts => false,
            _ => {
                self.out_time = Some(ts);
                true
            }
        }
    }
}

/// Filters for the admin daily listing.
#[derive(Debug, Clone, Default)]
pub struct DailyFilter {
    pub day: Option<NaiveDate>,
    pub month: Option<String>, // YYYY-MM
    pub name: Option<String>,
    pub limit: usize,
    pub offset: usize,
}
