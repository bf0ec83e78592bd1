pub mod cache;
pub mod config;
pub mod correct;
pub mod daily;
pub mod db;
pub mod events;
pub mod init;
pub mod log;
pub mod person;
pub mod policy;
pub mod recognize;

use crate::config::Config;
use crate::db::initialize::open_initialized;
use crate::db::pool::DbPool;
use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};

/// Open the configured database with the schema brought up to date.
pub(crate) fn open_db(cfg: &Config) -> AppResult<DbPool> {
    open_initialized(&cfg.database)
}

/// `--at` override for the decision clock.
pub(crate) fn parse_at(at: Option<&str>) -> AppResult<DateTime<Utc>> {
    match at {
        None => Ok(Utc::now()),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| AppError::InvalidTime(s.to_string())),
    }
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
