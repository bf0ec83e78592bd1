#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rfacelog::config::Config;
use rfacelog::core::enroll;
use rfacelog::core::policy_store::PolicyStore;
use rfacelog::db::initialize::open_initialized;
use rfacelog::db::pool::DbPool;
use rfacelog::models::policy::{Policy, PolicyPatch};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const DIM: usize = 4;

pub fn rti() -> Command {
    cargo_bin_cmd!("rfacelog")
}

/// Create a unique test DB path inside the system temp dir and remove any existing file
pub fn setup_test_db(name: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_rfacelog.sqlite", name));
    let db_path = path.to_string_lossy().to_string();
    for suffix in ["", "-wal", "-shm"] {
        fs::remove_file(format!("{}{}", db_path, suffix)).ok();
    }
    db_path
}

/// Fresh, migrated database.
pub fn open_test_db(name: &str) -> (String, DbPool) {
    let path = setup_test_db(name);
    let pool = open_initialized(&path).expect("open test db");
    (path, pool)
}

/// Write `content` to a temp file and return its path.
pub fn temp_file(name: &str, content: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_rfacelog.json", name));
    let p = path.to_string_lossy().to_string();
    fs::write(&p, content).expect("write temp file");
    p
}

pub fn temp_dir(name: &str) -> PathBuf {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_rfacelog_dir", name));
    fs::remove_dir_all(&path).ok();
    path
}

/// Small-dimension config for library tests.
pub fn test_config(db_path: &str) -> Config {
    let mut cfg = Config::with_database(db_path);
    cfg.embedding_dim = DIM;
    cfg.save_snapshots = false;
    cfg
}

/// UTC policy used by the timing scenarios: late after 08:00, OUT from 14:00, 45 s cooldown.
pub fn utc_policy(pool: &mut DbPool) -> Policy {
    let store = PolicyStore::new(Duration::ZERO);
    store
        .update_policy(
            &mut pool.conn,
            &PolicyPatch {
                timezone: Some("UTC".into()),
                late_after_time: Some("08:00".into()),
                out_start_time: Some("14:00".into()),
                out_end_time: Some(None),
                cooldown_seconds: Some(45),
                ..Default::default()
            },
        )
        .expect("update policy")
}

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 14).unwrap()
}

/// UTC instant on the test day.
pub fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 14, h, m, s).unwrap()
}

pub fn on(date: NaiveDate, h: u32, m: u32) -> DateTime<Utc> {
    date.and_hms_opt(h, m, 0).unwrap().and_utc()
}

/// Unit-ish vector along one axis.
pub fn axis(i: usize, scale: f32) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[i] = scale;
    v
}

pub fn enroll_person(pool: &mut DbPool, name: &str, vectors: &[Vec<f32>]) {
    enroll::create_person(&pool.conn, name).expect("create person");
    enroll::add_embeddings(&mut pool.conn, name, vectors, DIM).expect("add embeddings");
}

pub fn probe_bytes(v: &[f32]) -> Vec<u8> {
    serde_json::to_vec(v).unwrap()
}

/// A `dim`-long JSON vector with `value` in slot `i`.
pub fn vector_json(dim: usize, i: usize, value: f32) -> String {
    let mut v = vec![0.0f32; dim];
    v[i] = value;
    serde_json::to_string(&v).unwrap()
}
