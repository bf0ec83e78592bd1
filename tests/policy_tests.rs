use chrono::NaiveTime;
use rfacelog::core::policy_store::PolicyStore;
use rfacelog::db::log::load_log;
use rfacelog::db::policy;
use rfacelog::errors::AppError;
use rfacelog::models::policy::{Policy, PolicyPatch, PolicyRow};
use std::time::Duration;

mod common;
use common::open_test_db;

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

#[test]
fn default_row_is_created_lazily() {
    let (_, pool) = open_test_db("policy_default");
    let p = PolicyStore::default().get_policy(&pool.conn).unwrap();

    assert_eq!(p.timezone, chrono_tz::Asia::Jakarta);
    assert_eq!(p.late_after, hm(8, 0));
    assert_eq!(p.out_start, hm(15, 0));
    assert_eq!(p.out_end, None);
    assert_eq!(p.cooldown_seconds, 45);
    assert_eq!(p.retention_days, 60);
}

#[test]
fn cached_value_is_served_until_invalidated() {
    let (_, pool) = open_test_db("policy_ttl");
    let store = PolicyStore::new(Duration::from_secs(60));
    let before = store.get_policy(&pool.conn).unwrap();

    let mut row = policy::load_or_create(&pool.conn).unwrap();
    row.late_after_time = "09:30".into();
    policy::save(&pool.conn, &row).unwrap();

    assert_eq!(store.get_policy(&pool.conn).unwrap().late_after, before.late_after);

    store.invalidate();
    assert_eq!(store.get_policy(&pool.conn).unwrap().late_after, hm(9, 30));
}

#[test]
fn expired_value_is_reloaded() {
    let (_, pool) = open_test_db("policy_expired");
    let store = PolicyStore::new(Duration::ZERO);
    store.get_policy(&pool.conn).unwrap();

    let mut row = policy::load_or_create(&pool.conn).unwrap();
    row.cooldown_seconds = 10;
    policy::save(&pool.conn, &row).unwrap();

    assert_eq!(store.get_policy(&pool.conn).unwrap().cooldown_seconds, 10);
}

#[test]
fn invalid_stored_values_fall_back_to_defaults() {
    let row = PolicyRow {
        timezone: "Mars/Olympus".into(),
        late_after_time: "99:99".into(),
        out_start_time: "7:5".into(),
        out_end_time: Some("garbage".into()),
        cooldown_seconds: -3,
        ..PolicyRow::default()
    };
    let p = Policy::from_row(&row);

    assert_eq!(p.timezone, chrono_tz::Asia::Jakarta);
    assert_eq!(p.late_after, hm(8, 0));
    assert_eq!(p.out_start, hm(15, 0));
    assert_eq!(p.out_end, None);
    assert_eq!(p.cooldown_seconds, 45);
}

#[test]
fn update_validates_strictly() {
    let (_, mut pool) = open_test_db("policy_update_invalid");
    let store = PolicyStore::default();

    let bad_time = PolicyPatch {
        late_after_time: Some("24:00".into()),
        ..Default::default()
    };
    assert!(matches!(
        store.update_policy(&mut pool.conn, &bad_time),
        Err(AppError::InvalidTime(_))
    ));

    let bad_tz = PolicyPatch {
        timezone: Some("Nowhere/City".into()),
        ..Default::default()
    };
    assert!(matches!(
        store.update_policy(&mut pool.conn, &bad_tz),
        Err(AppError::InvalidTimezone(_))
    ));

    let inverted = PolicyPatch {
        out_start_time: Some("16:00".into()),
        out_end_time: Some(Some("15:00".into())),
        ..Default::default()
    };
    assert!(store.update_policy(&mut pool.conn, &inverted).is_err());

    // nothing was written
    let row = policy::load_or_create(&pool.conn).unwrap();
    assert_eq!(row.late_after_time, "08:00");
    assert_eq!(row.out_end_time, None);
}

#[test]
fn update_invalidates_and_is_logged() {
    let (_, mut pool) = open_test_db("policy_update_ok");
    let store = PolicyStore::new(Duration::from_secs(60));
    store.get_policy(&pool.conn).unwrap();

    store
        .update_policy(
            &mut pool.conn,
            &PolicyPatch {
                out_start_time: Some("14:00".into()),
                out_end_time: Some(Some("16:00".into())),
                ..Default::default()
            },
        )
        .unwrap();

    let p = store.get_policy(&pool.conn).unwrap();
    assert_eq!(p.out_start, hm(14, 0));
    assert_eq!(p.out_end, Some(hm(16, 0)));

    let log = load_log(&pool.conn).unwrap();
    assert!(log.iter().any(|e| e.operation == "policy_update"));
}
