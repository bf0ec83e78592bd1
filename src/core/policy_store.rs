//! Attendance policy with a short-lived read cache.

use crate::db::log::ttlog;
use crate::db::policy;
use crate::errors::{AppError, AppResult};
use crate::models::policy::{Policy, PolicyPatch, PolicyRow};
use crate::utils::time::{validate_hhmm, validate_timezone};
use chrono::Utc;
use rusqlite::{Connection, TransactionBehavior};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

pub const POLICY_TTL: Duration = Duration::from_secs(5);

struct Cached {
    loaded_at: Instant,
    policy: Arc<Policy>,
}

pub struct PolicyStore {
    ttl: Duration,
    cached: RwLock<Option<Cached>>,
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new(POLICY_TTL)
    }
}

impl PolicyStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            cached: RwLock::new(None),
        }
    }

    fn fresh(&self) -> Option<Arc<Policy>> {
        let guard = self
            .cached
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard
            .as_ref()
            .filter(|c| c.loaded_at.elapsed() < self.ttl)
            .map(|c| Arc::clone(&c.policy))
    }

    /// Current policy; reloaded from the database once the cached copy is older than the TTL.
    pub fn get_policy(&self, conn: &Connection) -> AppResult<Arc<Policy>> {
        if let Some(p) = self.fresh() {
            return Ok(p);
        }

        let row = policy::load_or_create(conn)?;
        let loaded = Arc::new(Policy::from_row(&row));
        debug!(timezone = %loaded.timezone, "policy reloaded");

        let mut guard = self
            .cached
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(Cached {
            loaded_at: Instant::now(),
            policy: Arc::clone(&loaded),
        });
        Ok(loaded)
    }

    pub fn invalidate(&self) {
        let mut guard = self
            .cached
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = None;
    }

    /// Raw stored row (creating the default one if needed).
    pub fn get_row(&self, conn: &Connection) -> AppResult<PolicyRow> {
        policy::load_or_create(conn)
    }

    /// Validate and apply a partial update, then drop the cached copy.
    pub fn update_policy(&self, conn: &mut Connection, patch: &PolicyPatch) -> AppResult<Policy> {
        if patch.is_empty() {
            return Err(AppError::Other("nothing to update".into()));
        }

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut row = policy::load_or_create(&tx)?;
        let changes = apply_patch(&mut row, patch)?;
        row.updated_at = Utc::now().to_rfc3339();
        policy::save(&tx, &row)?;
        ttlog(&tx, "policy_update", "attendance_policy", &changes.join(", "))?;
        tx.commit()?;

        self.invalidate();
        Ok(Policy::from_row(&row))
    }
}

/// Strictly validated merge: any invalid field fails the whole update.
fn apply_patch(row: &mut PolicyRow, patch: &PolicyPatch) -> AppResult<Vec<String>> {
    let mut changes = Vec::new();

    if let Some(tz) = &patch.timezone {
        let tz = validate_timezone(tz)?;
        row.timezone = tz.name().to_string();
        changes.push(format!("timezone={}", row.timezone));
    }
    if let Some(t) = &patch.in_start_time {
        row.in_start_time = validate_hhmm(t)?;
        changes.push(format!("in_start_time={}", row.in_start_time));
    }
    if let Some(t) = &patch.late_after_time {
        row.late_after_time = validate_hhmm(t)?;
        changes.push(format!("late_after_time={}", row.late_after_time));
    }
    if let Some(t) = &patch.out_start_time {
        row.out_start_time = validate_hhmm(t)?;
        changes.push(format!("out_start_time={}", row.out_start_time));
    }
    if let Some(end) = &patch.out_end_time {
        row.out_end_time = match end {
            Some(t) => Some(validate_hhmm(t)?),
            None => None,
        };
        changes.push(format!(
            "out_end_time={}",
            row.out_end_time.as_deref().unwrap_or("none")
        ));
    }
    if let Some(c) = patch.cooldown_seconds {
        if c < 0 {
            return Err(AppError::Other(format!("cooldown_seconds must be >= 0, got {}", c)));
        }
        row.cooldown_seconds = c;
        changes.push(format!("cooldown_seconds={}", c));
    }
    if let Some(r) = patch.retention_days {
        if r <= 0 {
            return Err(AppError::Other(format!("retention_days must be > 0, got {}", r)));
        }
        row.retention_days = r;
        changes.push(format!("retention_days={}", r));
    }

    // both are validated HH:MM, so lexical order is time order
    if let Some(end) = &row.out_end_time {
        if end.as_str() < row.out_start_time.as_str() {
            return Err(AppError::InvalidTime(format!(
                "out_end_time {} is before out_start_time {}",
                end, row.out_start_time
            )));
        }
    }

    Ok(changes)
}
