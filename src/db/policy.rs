use crate::errors::AppResult;
use crate::models::policy::PolicyRow;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

fn read_row(conn: &Connection) -> AppResult<Option<PolicyRow>> {
    let mut stmt = conn.prepare_cached(
        "SELECT timezone, in_start_time, late_after_time, out_start_time, out_end_time,
                cooldown_seconds, retention_days, updated_at
         FROM attendance_policy WHERE id = 1",
    )?;
    Ok(stmt
        .query_row([], |r| {
            Ok(PolicyRow {
                timezone: r.get::<_, Option<String>>(0)?.unwrap_or_default(),
                in_start_time: r.get::<_, Option<String>>(1)?.unwrap_or_default(),
                late_after_time: r.get::<_, Option<String>>(2)?.unwrap_or_default(),
                out_start_time: r.get::<_, Option<String>>(3)?.unwrap_or_default(),
                out_end_time: r.get(4)?,
                cooldown_seconds: r.get(5)?,
                retention_days: r.get(6)?,
                updated_at: r.get(7)?,
            })
        })
        .optional()?)
}

/// Load the singleton policy row, creating it with defaults when missing.
pub fn load_or_create(conn: &Connection) -> AppResult<PolicyRow> {
    if let Some(row) = read_row(conn)? {
        return Ok(row);
    }

    let mut row = PolicyRow::default();
    row.updated_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT OR IGNORE INTO attendance_policy
            (id, timezone, in_start_time, late_after_time, out_start_time, out_end_time,
             cooldown_seconds, retention_days, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            row.timezone,
            row.in_start_time,
            row.late_after_time,
            row.out_start_time,
            row.out_end_time,
            row.cooldown_seconds,
            row.retention_days,
            row.updated_at,
        ],
    )?;

    // another connection may have inserted first
    Ok(read_row(conn)?.unwrap_or(row))
}

pub fn save(conn: &Connection, row: &PolicyRow) -> AppResult<()> {
    conn.execute(
        "UPDATE attendance_policy
         SET timezone = ?1, in_start_time = ?2, late_after_time = ?3, out_start_time = ?4,
             out_end_time = ?5, cooldown_seconds = ?6, retention_days = ?7, updated_at = ?8
         WHERE id = 1",
        params![
            row.timezone,
            row.in_start_time,
            row.late_after_time,
            row.out_start_time,
            row.out_end_time,
            row.cooldown_seconds,
            row.retention_days,
            row.updated_at,
        ],
    )?;
    Ok(())
}
