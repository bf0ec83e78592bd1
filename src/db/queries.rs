use crate::errors::{AppError, AppResult};
use crate::models::daily::{DailyAttendance, DailyFilter};
use crate::models::event::{AttendanceEvent, EventFilter, NewEvent};
use crate::models::event_type::EventType;
use crate::models::status::Status;
use crate::utils::date::format_date;
use crate::utils::time::{format_ts, parse_ts};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params};

const EVENT_COLUMNS: &str = "id, day, ts, device_id, predicted_name, final_name, event_type, \
     is_late, status, distance, snapshot_path, edited_by, edited_at, edit_note";

const DAILY_COLUMNS: &str = "id, day, person_name, in_time, in_is_late, out_time, updated_at";

fn conversion_error(idx: usize, err: AppError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn column_ts(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(&raw).ok_or_else(|| conversion_error(idx, AppError::InvalidTime(raw)))
}

fn column_opt_ts(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        None => Ok(None),
        Some(raw) => parse_ts(&raw)
            .map(Some)
            .ok_or_else(|| conversion_error(idx, AppError::InvalidTime(raw))),
    }
}

fn column_date(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|_| conversion_error(idx, AppError::InvalidDate(raw)))
}

pub fn map_event_row(row: &Row) -> rusqlite::Result<AttendanceEvent> {
    // a missing or malformed day is kept as None: corrections report it as a data integrity issue
    let day = row
        .get::<_, Option<String>>(1)?
        .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok());

    let event_type = match row.get::<_, Option<String>>(6)? {
        None => None,
        Some(raw) => Some(
            EventType::from_db_str(&raw)
                .ok_or_else(|| conversion_error(6, AppError::InvalidEventType(raw)))?,
        ),
    };

    let status_raw: String = row.get(8)?;
    let status = Status::from_db_str(&status_raw)
        .ok_or_else(|| conversion_error(8, AppError::InvalidStatus(status_raw)))?;

    Ok(AttendanceEvent {
        id: row.get(0)?,
        day,
        ts: column_ts(row, 2)?,
        device_id: row.get(3)?,
        predicted_name: row.get(4)?,
        final_name: row.get(5)?,
        event_type,
        is_late: row.get::<_, i64>(7)? != 0,
        status,
        distance: row.get::<_, Option<f64>>(9)?.map(|d| d as f32),
        snapshot_path: row.get(10)?,
        edited_by: row.get(11)?,
        edited_at: column_opt_ts(row, 12)?,
        edit_note: row.get(13)?,
    })
}

pub fn map_daily_row(row: &Row) -> rusqlite::Result<DailyAttendance> {
    Ok(DailyAttendance {
        id: row.get(0)?,
        day: column_date(row, 1)?,
        person_name: row.get(2)?,
        in_time: column_opt_ts(row, 3)?,
        in_is_late: row.get::<_, i64>(4)? != 0,
        out_time: column_opt_ts(row, 5)?,
        updated_at: column_ts(row, 6)?,
    })
}

// ---------------------------
// Events
// ---------------------------

/// Append an event. `person` fills both predicted and final name.
pub fn insert_event(conn: &Connection, ev: &NewEvent) -> AppResult<i64> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO attendance_events
            (day, ts, device_id, predicted_name, final_name, event_type, is_late, status, distance, snapshot_path)
         VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;
    stmt.execute(params![
        format_date(&ev.day),
        format_ts(&ev.ts),
        ev.device_id,
        ev.person,
        ev.event_type.map(|t| t.to_db_str()),
        ev.is_late as i64,
        ev.status.to_db_str(),
        ev.distance.map(f64::from),
        ev.snapshot_path,
    ])?;
    Ok(conn.last_insert_rowid())
}

pub fn get_event(conn: &Connection, id: i64) -> AppResult<Option<AttendanceEvent>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM attendance_events WHERE id = ?1");
    let mut stmt = conn.prepare_cached(&sql)?;
    Ok(stmt.query_row([id], map_event_row).optional()?)
}

/// Timestamp of the most recent cooldown-relevant attempt for (day, person).
pub fn last_attempt_ts(
    conn: &Connection,
    day: &NaiveDate,
    name: &str,
) -> AppResult<Option<DateTime<Utc>>> {
    let placeholders = Status::COOLDOWN_COUNTED
        .iter()
        .map(|s| format!("'{}'", s.to_db_str()))
        .collect::<Vec<_>>()
        .join(",");
    let sql = format!(
        "SELECT ts FROM attendance_events
         WHERE day = ?1 AND final_name = ?2 AND status IN ({placeholders})
         ORDER BY ts DESC
         LIMIT 1"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let raw: Option<String> = stmt
        .query_row(params![format_date(day), name], |r| r.get(0))
        .optional()?;

    match raw {
        None => Ok(None),
        Some(s) => parse_ts(&s)
            .map(Some)
            .ok_or(AppError::InvalidTime(s)),
    }
}

/// Stamp the correction audit fields and the new final name.
pub fn update_event_correction(
    conn: &Connection,
    id: i64,
    final_name: &str,
    edited_by: &str,
    edited_at: &DateTime<Utc>,
    edit_note: Option<&str>,
) -> AppResult<()> {
    conn.execute(
        "UPDATE attendance_events
         SET final_name = ?1, edited_by = ?2, edited_at = ?3, edit_note = ?4
         WHERE id = ?5",
        params![final_name, edited_by, format_ts(edited_at), edit_note, id],
    )?;
    Ok(())
}

pub fn list_events(conn: &Connection, filter: &EventFilter) -> AppResult<Vec<AttendanceEvent>> {
    let mut sql = format!("SELECT {EVENT_COLUMNS} FROM attendance_events");
    let mut conditions: Vec<&str> = Vec::new();
    let mut values: Vec<String> = Vec::new();

    if let Some(st) = filter.status {
        conditions.push("status = ?");
        values.push(st.to_db_str().to_string());
    }
    if let Some(name) = &filter.name {
        conditions.push("final_name = ?");
        values.push(name.clone());
    }
    if let Some(day) = &filter.day {
        conditions.push("day = ?");
        values.push(format_date(day));
    }
    if let Some(dev) = &filter.device_id {
        conditions.push("device_id = ?");
        values.push(dev.clone());
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(&format!(
        " ORDER BY ts DESC, id DESC LIMIT {} OFFSET {}",
        filter.limit, filter.offset
    ));

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn ToSql> = values.iter().map(|s| s as &dyn ToSql).collect();
    let rows = stmt.query_map(param_refs.as_slice(), map_event_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// All events of a day in chronological order.
pub fn events_for_day(conn: &Connection, day: &NaiveDate) -> AppResult<Vec<AttendanceEvent>> {
    let sql = format!(
        "SELECT {EVENT_COLUMNS} FROM attendance_events WHERE day = ?1 ORDER BY ts ASC, id ASC"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map([format_date(day)], map_event_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

// ---------------------------
// Daily aggregates
// ---------------------------

pub fn get_daily(
    conn: &Connection,
    day: &NaiveDate,
    name: &str,
) -> AppResult<Option<DailyAttendance>> {
    let sql = format!(
        "SELECT {DAILY_COLUMNS} FROM daily_attendance WHERE day = ?1 AND person_name = ?2"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    Ok(stmt
        .query_row(params![format_date(day), name], map_daily_row)
        .optional()?)
}

/// Insert or update the aggregate for its (day, person_name) key. Returns the row id.
pub fn upsert_daily(conn: &Connection, d: &DailyAttendance) -> AppResult<i64> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO daily_attendance (day, person_name, in_time, in_is_late, out_time, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(day, person_name) DO UPDATE SET
            in_time = excluded.in_time,
            in_is_late = excluded.in_is_late,
            out_time = excluded.out_time,
            updated_at = excluded.updated_at
         RETURNING id",
    )?;
    let id = stmt.query_row(
        params![
            format_date(&d.day),
            d.person_name,
            d.in_time.as_ref().map(format_ts),
            d.in_is_late as i64,
            d.out_time.as_ref().map(format_ts),
            format_ts(&d.updated_at),
        ],
        |r| r.get(0),
    )?;
    Ok(id)
}

pub fn list_daily(conn: &Connection, filter: &DailyFilter) -> AppResult<Vec<DailyAttendance>> {
    let mut sql = format!("SELECT {DAILY_COLUMNS} FROM daily_attendance");
    let mut conditions: Vec<&str> = Vec::new();
    let mut values: Vec<String> = Vec::new();

    if let Some(day) = &filter.day {
        conditions.push("day = ?");
        values.push(format_date(day));
    }
    if let Some(month) = &filter.month {
        conditions.push("substr(day, 1, 7) = ?");
        values.push(month.clone());
    }
    if let Some(name) = &filter.name {
        conditions.push("person_name = ?");
        values.push(name.clone());
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(&format!(
        " ORDER BY day DESC, person_name ASC LIMIT {} OFFSET {}",
        filter.limit, filter.offset
    ));

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn ToSql> = values.iter().map(|s| s as &dyn ToSql).collect();
    let rows = stmt.query_map(param_refs.as_slice(), map_daily_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn daily_for_day(conn: &Connection, day: &NaiveDate) -> AppResult<Vec<DailyAttendance>> {
    let sql = format!(
        "SELECT {DAILY_COLUMNS} FROM daily_attendance WHERE day = ?1 ORDER BY person_name ASC"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map([format_date(day)], map_daily_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn delete_daily_for_day(conn: &Connection, day: &NaiveDate) -> AppResult<usize> {
    Ok(conn.execute(
        "DELETE FROM daily_attendance WHERE day = ?1",
        [format_date(day)],
    )?)
}

// ---------------------------
// Bulk maintenance
// ---------------------------

/// Delete events and aggregates strictly older than `cutoff`. Returns (events, daily).
pub fn delete_before(conn: &Connection, cutoff: &NaiveDate) -> AppResult<(usize, usize)> {
    let c = format_date(cutoff);
    let events = conn.execute("DELETE FROM attendance_events WHERE day < ?1", [&c])?;
    let daily = conn.execute("DELETE FROM daily_attendance WHERE day < ?1", [&c])?;
    Ok((events, daily))
}

/// Snapshot paths referenced by events older than `cutoff`.
pub fn snapshot_paths_before(conn: &Connection, cutoff: &NaiveDate) -> AppResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT snapshot_path FROM attendance_events
         WHERE day < ?1 AND snapshot_path IS NOT NULL",
    )?;
    let rows = stmt.query_map([format_date(cutoff)], |r| r.get::<_, String>(0))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn reset_attendance(conn: &Connection) -> AppResult<(usize, usize)> {
    let events = conn.execute("DELETE FROM attendance_events", [])?;
    let daily = conn.execute("DELETE FROM daily_attendance", [])?;
    Ok((events, daily))
}
