//! Retroactive re-attribution of an event to another person.

use crate::core::locks::{DayKey, KeyLocks};
use crate::core::retention::fold_events;
use crate::db::log::ttlog;
use crate::db::queries::{
    events_for_day, get_daily, get_event, update_event_correction, upsert_daily,
};
use crate::errors::{AppError, AppResult};
use crate::models::daily::DailyAttendance;
use crate::models::event::AttendanceEvent;
use crate::models::event_type::EventType;
use crate::utils::time::storage_precision;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectionOutcome {
    pub event_id: i64,
    pub day: NaiveDate,
    pub event_type: EventType,
    pub old_final_name: Option<String>,
    pub new_final_name: String,
    pub edited_by: Option<String>,
    pub edited_at: Option<DateTime<Utc>>,
    pub changed: bool,
}

/// Checks run in this order: existence, status, day, event type.
fn validate(ev: &AttendanceEvent) -> AppResult<(NaiveDate, EventType)> {
    if !ev.status.is_correctable() {
        return Err(AppError::InvalidCorrection(format!(
            "event {} has status '{}'",
            ev.id, ev.status
        )));
    }
    let day = ev
        .day
        .ok_or_else(|| AppError::DataIntegrity(format!("event {} has no day", ev.id)))?;
    let event_type = ev.event_type.ok_or_else(|| {
        AppError::InvalidCorrection(format!("event {} is neither IN nor OUT", ev.id))
    })?;
    Ok((day, event_type))
}

fn load_event(conn: &Connection, event_id: i64) -> AppResult<AttendanceEvent> {
    get_event(conn, event_id)?.ok_or(AppError::EventNotFound(event_id))
}

/// Move an event to `new_final_name` and reconcile both affected aggregates.
///
/// The old aggregate is touched only if its IN/OUT was recorded from this very
/// event, and that slot is refolded from the old owner's remaining events. The
/// new aggregate folds the event with earliest-IN / latest-OUT.
pub fn correct_event(
    conn: &mut Connection,
    locks: &KeyLocks,
    event_id: i64,
    new_final_name: &str,
    edit_note: Option<&str>,
    actor: &str,
    now: DateTime<Utc>,
) -> AppResult<CorrectionOutcome> {
    let new_name = new_final_name.trim();
    if new_name.is_empty() {
        return Err(AppError::InvalidName("final name is required".into()));
    }

    for _ in 0..MAX_ATTEMPTS {
        // unlocked read, only to learn which keys to lock
        let seen = load_event(conn, event_id)?;
        let (day, _) = validate(&seen)?;

        let mut keys: Vec<DayKey> = vec![(day, new_name.to_string())];
        if let Some(old) = &seen.final_name {
            keys.push((day, old.clone()));
        }
        let _guard = locks.lock_many(&keys);

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let ev = load_event(&tx, event_id)?;
        if ev.final_name != seen.final_name {
            // corrected concurrently: the locked keys may be the wrong ones
            continue;
        }
        let (day, event_type) = validate(&ev)?;

        if ev.final_name.as_deref() == Some(new_name) {
            return Ok(CorrectionOutcome {
                event_id,
                day,
                event_type,
                old_final_name: ev.final_name,
                new_final_name: new_name.to_string(),
                edited_by: ev.edited_by,
                edited_at: ev.edited_at,
                changed: false,
            });
        }

        let edited_at = storage_precision(now);
        update_event_correction(&tx, event_id, new_name, actor, &edited_at, edit_note)?;

        if let Some(old_name) = &ev.final_name {
            if let Some(mut old) = get_daily(&tx, &day, old_name)? {
                let owned_slot = match event_type {
                    EventType::In => old.in_time == Some(ev.ts),
                    EventType::Out => old.out_time == Some(ev.ts),
                };
                if owned_slot {
                    // earlier corrections may have merged other events into the old owner
                    let remaining = fold_events(
                        &events_for_day(&tx, &day)?,
                        day,
                        edited_at,
                        BTreeMap::new(),
                    )
                    .remove(old_name.as_str());
                    match event_type {
                        EventType::In => {
                            old.in_time = remaining.as_ref().and_then(|r| r.in_time);
                            old.in_is_late = remaining.is_some_and(|r| r.in_is_late);
                        }
                        EventType::Out => old.out_time = remaining.and_then(|r| r.out_time),
                    }
                    old.updated_at = edited_at;
                    upsert_daily(&tx, &old)?;
                }
            }
        }

        let mut new = get_daily(&tx, &day, new_name)?
            .unwrap_or_else(|| DailyAttendance::new(day, new_name, edited_at));
        match event_type {
            EventType::In => new.merge_in(ev.ts, ev.is_late),
            EventType::Out => new.merge_out(ev.ts),
        };
        new.updated_at = edited_at;
        upsert_daily(&tx, &new)?;

        let old_label = ev.final_name.as_deref().unwrap_or("-");
        ttlog(
            &tx,
            "correct",
            &format!("event:{}", event_id),
            &format!("{} {} -> {} by {}", event_type, old_label, new_name, actor),
        )?;
        tx.commit()?;

        info!(event_id, %day, from = old_label, to = new_name, actor, "event corrected");

        return Ok(CorrectionOutcome {
            event_id,
            day,
            event_type,
            old_final_name: ev.final_name,
            new_final_name: new_name.to_string(),
            edited_by: Some(actor.to_string()),
            edited_at: Some(edited_at),
            changed: true,
        });
    }

    Err(AppError::Other(format!(
        "event {} kept changing during correction",
        event_id
    )))
}
