//! Per-person-per-day attendance decisions.
//!
//! State per (day, person): NONE → IN_RECORDED → COMPLETE. A decision reads the
//! cooldown window and the daily aggregate, possibly advances the state, and
//! appends exactly one event, all inside one IMMEDIATE transaction taken while
//! holding the key's lock.

use crate::core::locks::KeyLocks;
use crate::db::queries::{get_daily, insert_event, last_attempt_ts, upsert_daily};
use crate::errors::AppResult;
use crate::models::daily::{DailyAttendance, DayState};
use crate::models::event::NewEvent;
use crate::models::event_type::EventType;
use crate::models::policy::Policy;
use crate::models::status::Status;
use crate::utils::time::storage_precision;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Input of one decision, produced by the matcher.
#[derive(Debug, Clone)]
pub struct DecisionRequest<'a> {
    pub person_name: Option<&'a str>,
    pub device_id: &'a str,
    pub distance: Option<f32>,
    pub upstream_status: Status,
    pub snapshot_path: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub status: Status,
    pub event_type: Option<EventType>,
    pub is_late: bool,
    pub audio_text: String,
    pub day: NaiveDate,
    pub event_id: i64,
}

/// Result of applying the state machine to an aggregate, before persistence.
struct Step {
    status: Status,
    event_type: Option<EventType>,
    is_late: bool,
    mutated: bool,
}

impl Step {
    fn rejected(status: Status) -> Self {
        Self {
            status,
            event_type: None,
            is_late: false,
            mutated: false,
        }
    }
}

fn advance(daily: &mut DailyAttendance, policy: &Policy, ts: DateTime<Utc>, tod: NaiveTime) -> Step {
    match daily.state() {
        DayState::None => {
            let is_late = tod > policy.late_after;
            daily.in_time = Some(ts);
            daily.in_is_late = is_late;
            Step {
                status: Status::Ok,
                event_type: Some(EventType::In),
                is_late,
                mutated: true,
            }
        }
        DayState::InRecorded => {
            if tod < policy.out_start {
                return Step::rejected(Status::RejectOutTooEarly);
            }
            if policy.out_end.is_some_and(|end| tod > end) {
                return Step::rejected(Status::RejectOutLate);
            }
            daily.out_time = Some(ts);
            Step {
                status: Status::Ok,
                event_type: Some(EventType::Out),
                is_late: false,
                mutated: true,
            }
        }
        DayState::Complete => Step::rejected(Status::Duplicate),
    }
}

/// Voice feedback for an outcome. Advisory only.
pub fn audio_text(
    status: Status,
    event_type: Option<EventType>,
    is_late: bool,
    name: Option<&str>,
    policy: &Policy,
) -> String {
    let name = name.unwrap_or("there");
    match (status, event_type) {
        (Status::Ok, Some(EventType::In)) if is_late => {
            format!("Hello {}, check-in recorded. You are late.", name)
        }
        (Status::Ok, Some(EventType::In)) => format!("Hello {}, check-in recorded.", name),
        (Status::Ok, _) => format!("Thank you {}, check-out recorded.", name),
        (Status::Cooldown, _) => format!("Hello {}, please wait a moment.", name),
        (Status::RejectOutTooEarly, _) => format!(
            "Hello {}, check-out opens at {}.",
            name,
            policy.out_start.format("%H:%M")
        ),
        (Status::RejectOutLate, _) => format!("Hello {}, check-out is already closed.", name),
        (Status::Duplicate, _) => {
            format!("Hello {}, today's attendance is already complete.", name)
        }
        (Status::Unknown, _) => "Face not recognized.".to_string(),
        (Status::Reject, _) => "Please face the camera and move closer.".to_string(),
        (Status::Error, _) => "Could not process the image.".to_string(),
    }
}

pub struct AttendanceEngine {
    locks: Arc<KeyLocks>,
}

impl AttendanceEngine {
    pub fn new(locks: Arc<KeyLocks>) -> Self {
        Self { locks }
    }

    pub fn locks(&self) -> &Arc<KeyLocks> {
        &self.locks
    }

    /// Decide and record one recognition attempt observed at `now`.
    pub fn decide(
        &self,
        conn: &mut Connection,
        req: &DecisionRequest,
        policy: &Policy,
        now: DateTime<Utc>,
    ) -> AppResult<Decision> {
        let ts = storage_precision(now);
        let local = ts.with_timezone(&policy.timezone);
        let day = local.date_naive();
        let tod = local.time();

        let name = match (req.upstream_status, req.person_name) {
            (Status::Ok, Some(name)) => name,
            (upstream, _) => {
                // an ok verdict without a name cannot be attributed to anyone
                let status = if upstream.is_ok() { Status::Error } else { upstream };
                return self.record_unattributed(conn, req, status, day, ts, policy);
            }
        };

        let _guard = self.locks.lock(day, name);
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let in_cooldown = match last_attempt_ts(&tx, &day, name)? {
            Some(last) => ts - last < Duration::seconds(policy.cooldown_seconds),
            None => false,
        };

        let step = if in_cooldown {
            Step::rejected(Status::Cooldown)
        } else {
            let mut daily =
                get_daily(&tx, &day, name)?.unwrap_or_else(|| DailyAttendance::new(day, name, ts));
            let step = advance(&mut daily, policy, ts, tod);
            if step.mutated {
                daily.updated_at = ts;
                upsert_daily(&tx, &daily)?;
            }
            step
        };

        let event_id = insert_event(
            &tx,
            &NewEvent {
                day,
                ts,
                device_id: req.device_id,
                person: Some(name),
                event_type: step.event_type,
                is_late: step.is_late,
                status: step.status,
                distance: req.distance,
                snapshot_path: req.snapshot_path,
            },
        )?;
        tx.commit()?;

        if step.status.is_ok() {
            info!(
                %day,
                person = name,
                device = req.device_id,
                event_type = ?step.event_type,
                late = step.is_late,
                "attendance recorded"
            );
        } else {
            debug!(%day, person = name, status = %step.status, "attempt not recorded");
        }

        Ok(Decision {
            status: step.status,
            event_type: step.event_type,
            is_late: step.is_late,
            audio_text: audio_text(step.status, step.event_type, step.is_late, Some(name), policy),
            day,
            event_id,
        })
    }

    fn record_unattributed(
        &self,
        conn: &Connection,
        req: &DecisionRequest,
        status: Status,
        day: NaiveDate,
        ts: DateTime<Utc>,
        policy: &Policy,
    ) -> AppResult<Decision> {
        let event_id = insert_event(
            conn,
            &NewEvent {
                day,
                ts,
                device_id: req.device_id,
                person: None,
                event_type: None,
                is_late: false,
                status,
                distance: req.distance,
                snapshot_path: req.snapshot_path,
            },
        )?;
        debug!(%day, device = req.device_id, %status, "unattributed attempt logged");

        Ok(Decision {
            status,
            event_type: None,
            is_late: false,
            audio_text: audio_text(status, None, false, None, policy),
            day,
            event_id,
        })
    }
}
