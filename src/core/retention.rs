//! Retention sweep, bulk reset and daily aggregate rebuild.

use crate::core::snapshots::remove_older_than;
use crate::db::log::ttlog;
use crate::db::queries::{
    daily_for_day, delete_before, delete_daily_for_day, events_for_day, reset_attendance,
    snapshot_paths_before, upsert_daily,
};
use crate::errors::AppResult;
use crate::models::daily::DailyAttendance;
use crate::models::event::AttendanceEvent;
use crate::models::event_type::EventType;
use crate::models::policy::Policy;
use chrono::{DateTime, Days, NaiveDate, Utc};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::SystemTime;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub cutoff: NaiveDate,
    pub events: usize,
    pub daily: usize,
    pub snapshots: usize,
}

/// First day that is kept by a sweep run on `today`.
pub fn retention_cutoff(policy: &Policy, today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(policy.retention_days.max(0) as u64))
        .unwrap_or(NaiveDate::MIN)
}

/// Delete events, aggregates and snapshot files older than the retention horizon.
pub fn sweep(
    conn: &mut Connection,
    policy: &Policy,
    today: NaiveDate,
    snapshot_dir: Option<&Path>,
) -> AppResult<SweepReport> {
    let cutoff = retention_cutoff(policy, today);

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let referenced = snapshot_paths_before(&tx, &cutoff)?;
    let (events, daily) = delete_before(&tx, &cutoff)?;
    ttlog(
        &tx,
        "sweep",
        &cutoff.to_string(),
        &format!("{} event(s), {} daily record(s) removed", events, daily),
    )?;
    tx.commit()?;

    // files go after the commit: a failed commit must not lose snapshots
    let mut snapshots = 0;
    for p in referenced {
        match fs::remove_file(&p) {
            Ok(()) => snapshots += 1,
            Err(e) => warn!(path = %p, error = %e, "cannot remove snapshot"),
        }
    }
    if let Some(dir) = snapshot_dir {
        let horizon: SystemTime = cutoff
            .and_hms_opt(0, 0, 0)
            .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).into())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        snapshots += remove_older_than(dir, horizon)?;
    }

    info!(%cutoff, events, daily, snapshots, "retention sweep done");
    Ok(SweepReport {
        cutoff,
        events,
        daily,
        snapshots,
    })
}

/// Delete every event and aggregate. Enrollment and policy are kept.
pub fn reset(conn: &mut Connection) -> AppResult<(usize, usize)> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let (events, daily) = reset_attendance(&tx)?;
    ttlog(
        &tx,
        "reset",
        "attendance",
        &format!("{} event(s), {} daily record(s) removed", events, daily),
    )?;
    tx.commit()?;
    Ok((events, daily))
}

/// Fold the `ok` IN/OUT events of `day` into `folded`, keyed by final name:
/// earliest IN with its lateness, latest OUT.
pub fn fold_events(
    events: &[AttendanceEvent],
    day: NaiveDate,
    now: DateTime<Utc>,
    mut folded: BTreeMap<String, DailyAttendance>,
) -> BTreeMap<String, DailyAttendance> {
    for ev in events {
        if !ev.status.is_ok() {
            continue;
        }
        let (Some(name), Some(event_type)) = (ev.final_name.as_deref(), ev.event_type) else {
            continue;
        };
        let agg = folded
            .entry(name.to_string())
            .or_insert_with(|| DailyAttendance::new(day, name, now));
        match event_type {
            EventType::In => agg.merge_in(ev.ts, ev.is_late),
            EventType::Out => agg.merge_out(ev.ts),
        };
    }
    folded
}

/// Recompute all aggregates of `day` from its `ok` IN/OUT events, attributed by final name.
///
/// Existing keys of the day are kept (possibly emptied) so the result matches
/// what live decisions and corrections leave behind.
pub fn rebuild_daily(
    conn: &mut Connection,
    day: NaiveDate,
    now: DateTime<Utc>,
) -> AppResult<Vec<DailyAttendance>> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let seeded: BTreeMap<String, DailyAttendance> = daily_for_day(&tx, &day)?
        .into_iter()
        .map(|d| {
            let name = d.person_name.clone();
            (name.clone(), DailyAttendance::new(day, &name, now))
        })
        .collect();
    let folded = fold_events(&events_for_day(&tx, &day)?, day, now, seeded);

    delete_daily_for_day(&tx, &day)?;
    let mut out = Vec::with_capacity(folded.len());
    for (_, mut agg) in folded {
        agg.updated_at = now;
        agg.id = upsert_daily(&tx, &agg)?;
        out.push(agg);
    }
    ttlog(
        &tx,
        "rebuild_daily",
        &day.to_string(),
        &format!("{} daily record(s) rebuilt", out.len()),
    )?;
    tx.commit()?;

    info!(%day, records = out.len(), "daily aggregates rebuilt");
    Ok(out)
}
