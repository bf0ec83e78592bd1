use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::policy_store::PolicyStore;
use crate::core::retention;
use crate::db::migrate::run_pending_migrations;
use crate::db::pool::DbPool;
use crate::db::stats;
use crate::errors::{AppError, AppResult};
use crate::utils::colors::{CYAN, GREEN, RED, RESET};
use crate::utils::date::parse_date;
use chrono::Utc;
use std::path::Path;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Db {
        migrate,
        check,
        sweep,
        reset,
        rebuild_daily,
        info,
    } = cmd
    {
        let mut pool = DbPool::new(&cfg.database)?;

        //
        // 1) MIGRATE (always before anything that touches the schema)
        //
        if *migrate || *sweep || *reset || rebuild_daily.is_some() {
            println!("{}▶ Running migrations…{}", CYAN, RESET);
            run_pending_migrations(&pool.conn)?;
            println!("{}✔ Migration completed.{}\n", GREEN, RESET);
        }

        //
        // 2) SWEEP
        //
        if *sweep {
            let policy = PolicyStore::default().get_policy(&pool.conn)?;
            let today = Utc::now().with_timezone(&policy.timezone).date_naive();
            let report = retention::sweep(
                &mut pool.conn,
                &policy,
                today,
                Some(Path::new(&cfg.snapshot_dir)),
            )?;
            println!(
                "{}✔ Sweep before {}:{} {} event(s), {} daily record(s), {} snapshot(s) removed\n",
                GREEN, report.cutoff, RESET, report.events, report.daily, report.snapshots
            );
        }

        //
        // 3) RESET
        //
        if *reset {
            let (events, daily) = retention::reset(&mut pool.conn)?;
            println!(
                "{}✔ Reset:{} {} event(s), {} daily record(s) removed\n",
                GREEN, RESET, events, daily
            );
        }

        //
        // 4) REBUILD DAILY
        //
        if let Some(day) = rebuild_daily {
            let day = parse_date(day).ok_or_else(|| AppError::InvalidDate(day.clone()))?;
            let rows = retention::rebuild_daily(&mut pool.conn, day, Utc::now())?;
            println!(
                "{}✔ Rebuilt {} daily record(s) for {}{}\n",
                GREEN,
                rows.len(),
                day,
                RESET
            );
        }

        //
        // 5) INFO
        //
        if *info {
            stats::print_db_info(&pool, &cfg.database)?;
        }

        //
        // 6) CHECK
        //
        if *check {
            println!("{}▶ Running integrity check…{}", CYAN, RESET);
            let integrity: String = pool
                .conn
                .query_row("PRAGMA integrity_check;", [], |row| row.get(0))?;

            if integrity == "ok" {
                println!("{}✔ Integrity check passed.{}\n", GREEN, RESET);
            } else {
                println!("{}✘ Integrity check failed:{} {}\n", RED, RESET, integrity);
            }
        }
    }

    Ok(())
}
