use rusqlite::{Connection, OptionalExtension, Result};
use tracing::info;

/// Ensure that the `log` table exists. Migrations record themselves there.
fn ensure_log_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn is_applied(conn: &Connection, version: &str) -> Result<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

fn mark_applied(conn: &Connection, version: &str, message: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO log (date, operation, target, message)
         VALUES (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'), 'migration_applied', ?1, ?2)",
        [version, message],
    )?;
    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info('{}')", table))?;
    let cols = stmt.query_map([], |row| row.get::<_, String>(1))?;

    for c in cols {
        if c? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Run `apply` inside a transaction unless `version` is already recorded.
fn apply_once<F>(conn: &Connection, version: &str, message: &str, apply: F) -> Result<()>
where
    F: FnOnce(&Connection) -> Result<()>,
{
    if is_applied(conn, version)? {
        return Ok(());
    }

    // re-check under the write lock: another connection may have won the race
    conn.execute_batch("BEGIN IMMEDIATE;")?;
    let outcome = is_applied(conn, version).and_then(|done| {
        if done {
            return Ok(false);
        }
        apply(conn)?;
        mark_applied(conn, version, message)?;
        Ok(true)
    });
    match outcome {
        Ok(false) => {
            conn.execute_batch("COMMIT;")?;
            Ok(())
        }
        Ok(true) => {
            conn.execute_batch("COMMIT;")?;
            info!(version, "migration applied: {}", message);
            Ok(())
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK;");
            Err(e)
        }
    }
}

/// Feature store, policy, daily aggregates and the event log.
fn create_core_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS persons (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS embeddings (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            person_id   INTEGER NOT NULL REFERENCES persons(id) ON DELETE CASCADE,
            vector      TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_embeddings_person ON embeddings(person_id);

        CREATE TABLE IF NOT EXISTS attendance_policy (
            id              INTEGER PRIMARY KEY CHECK (id = 1),
            timezone        TEXT NOT NULL DEFAULT 'Asia/Jakarta',
            in_start_time   TEXT NOT NULL DEFAULT '05:00',
            late_after_time TEXT NOT NULL DEFAULT '08:00',
            out_start_time  TEXT NOT NULL DEFAULT '15:00',
            retention_days  INTEGER NOT NULL DEFAULT 60,
            updated_at      TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS daily_attendance (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            day         TEXT NOT NULL,
            person_name TEXT NOT NULL,
            in_time     TEXT,
            in_is_late  INTEGER NOT NULL DEFAULT 0,
            out_time    TEXT,
            updated_at  TEXT NOT NULL,
            CONSTRAINT uq_day_person UNIQUE (day, person_name)
        );
        CREATE INDEX IF NOT EXISTS idx_daily_person ON daily_attendance(person_name);

        CREATE TABLE IF NOT EXISTS attendance_events (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            day            TEXT,
            ts             TEXT NOT NULL,
            device_id      TEXT NOT NULL DEFAULT '',
            predicted_name TEXT,
            final_name     TEXT,
            event_type     TEXT CHECK (event_type IS NULL OR event_type IN ('IN','OUT')),
            is_late        INTEGER NOT NULL DEFAULT 0,
            status         TEXT NOT NULL,
            distance       REAL,
            snapshot_path  TEXT,
            edited_by      TEXT,
            edited_at      TEXT,
            edit_note      TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_events_day_name ON attendance_events(day, final_name);
        CREATE INDEX IF NOT EXISTS idx_events_ts ON attendance_events(ts);
        CREATE INDEX IF NOT EXISTS idx_events_device ON attendance_events(device_id);
        "#,
    )
}

/// Upper OUT bound and per-policy cooldown (previously a process setting).
fn add_policy_window_columns(conn: &Connection) -> Result<()> {
    if !has_column(conn, "attendance_policy", "out_end_time")? {
        conn.execute(
            "ALTER TABLE attendance_policy ADD COLUMN out_end_time TEXT",
            [],
        )?;
    }
    if !has_column(conn, "attendance_policy", "cooldown_seconds")? {
        conn.execute(
            "ALTER TABLE attendance_policy ADD COLUMN cooldown_seconds INTEGER NOT NULL DEFAULT 45",
            [],
        )?;
    }
    Ok(())
}

/// Public entry point: run all pending migrations.
pub fn run_pending_migrations(conn: &Connection) -> Result<()> {
    ensure_log_table(conn)?;

    apply_once(
        conn,
        "20250301_0001_core_schema",
        "Created persons, embeddings, policy, daily and event tables",
        create_core_schema,
    )?;

    apply_once(
        conn,
        "20250412_0002_policy_out_end_cooldown",
        "Added out_end_time and cooldown_seconds to attendance_policy",
        add_policy_window_columns,
    )?;

    Ok(())
}
