//! Optional on-disk copies of probe images kept for later review.

use crate::config::Config;
use crate::core::matcher::MatchResult;
use crate::errors::AppResult;
use crate::models::status::Status;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SnapshotPolicy {
    pub enabled: bool,
    pub dir: PathBuf,
    pub on_unknown: bool,
    pub on_low_conf: bool,
    pub low_conf_distance: f32,
}

impl SnapshotPolicy {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            enabled: cfg.save_snapshots,
            dir: PathBuf::from(&cfg.snapshot_dir),
            on_unknown: cfg.snapshot_on_unknown,
            on_low_conf: cfg.snapshot_on_low_conf,
            low_conf_distance: cfg.low_conf_distance,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::new(),
            on_unknown: false,
            on_low_conf: false,
            low_conf_distance: f32::INFINITY,
        }
    }

    /// Why this result deserves a snapshot, if it does.
    pub fn reason_for(&self, result: &MatchResult) -> Option<&'static str> {
        if !self.enabled {
            return None;
        }
        match result.status {
            Status::Unknown if self.on_unknown => Some("unknown"),
            Status::Ok
                if self.on_low_conf
                    && result.distance.is_some_and(|d| d > self.low_conf_distance) =>
            {
                Some("lowconf")
            }
            _ => None,
        }
    }
}

fn sanitize(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "device".to_string()
    } else {
        cleaned
    }
}

/// Write `bytes` as `{utc_ts}_{device}_{reason}.bin` under `dir`.
pub fn save_snapshot(
    dir: &Path,
    bytes: &[u8],
    ts: &DateTime<Utc>,
    device_id: &str,
    reason: &str,
) -> AppResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let file = format!(
        "{}_{}_{}.bin",
        ts.format("%Y%m%dT%H%M%S%6fZ"),
        sanitize(device_id),
        reason
    );
    let path = dir.join(file);
    fs::write(&path, bytes)?;
    debug!(path = %path.display(), "snapshot saved");
    Ok(path)
}

/// Remove `.bin` files in `dir` last modified before `cutoff`.
pub fn remove_older_than(dir: &Path, cutoff: SystemTime) -> AppResult<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("bin") {
            continue;
        }
        let modified = fs::metadata(&path)?.modified()?;
        if modified < cutoff {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}
