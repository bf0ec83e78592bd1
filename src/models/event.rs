use super::{event_type::EventType, status::Status};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// One row of the append-only `attendance_events` log.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceEvent {
    pub id: i64,
    pub day: Option<NaiveDate>,         // ⇔ day (TEXT "YYYY-MM-DD", local to the policy timezone)
    pub ts: DateTime<Utc>,              // ⇔ ts (TEXT, UTC)
    pub device_id: String,              // ⇔ device_id
    pub predicted_name: Option<String>, // ⇔ predicted_name (matcher output)
    pub final_name: Option<String>,     // ⇔ final_name (may diverge after correction)
    pub event_type: Option<EventType>,  // ⇔ event_type ('IN' | 'OUT' | NULL)
    pub is_late: bool,
    pub status: Status,
    pub distance: Option<f32>,
    pub snapshot_path: Option<String>,

    pub edited_by: Option<String>,
    pub edited_at: Option<DateTime<Utc>>,
    pub edit_note: Option<String>,
}

/// Insert payload for a new event (id and audit fields are assigned by storage).
#[derive(Debug, Clone)]
pub struct NewEvent<'a> {
    pub day: NaiveDate,
    pub ts: DateTime<Utc>,
    pub device_id: &'a str,
    pub person: Option<&'a str>,
    pub event_type: Option<EventType>,
    pub is_late: bool,
    pub status: Status,
    pub distance: Option<f32>,
    pub snapshot_path: Option<&'a str>,
}

/// Filters for the admin event listing.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub status: Option<Status>,
    pub name: Option<String>,
    pub day: Option<NaiveDate>,
    pub device_id: Option<String>,
    pub limit: usize,
    pub offset: usize,
}
