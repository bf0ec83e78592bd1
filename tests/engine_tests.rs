use rfacelog::core::engine::{AttendanceEngine, DecisionRequest};
use rfacelog::core::locks::KeyLocks;
use rfacelog::core::policy_store::PolicyStore;
use rfacelog::db::initialize::open_initialized;
use rfacelog::db::queries::{events_for_day, get_daily};
use rfacelog::models::daily::DayState;
use rfacelog::models::event_type::EventType;
use rfacelog::models::policy::PolicyPatch;
use rfacelog::models::status::Status;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

mod common;
use common::{at, day, open_test_db, utc_policy};

fn engine() -> AttendanceEngine {
    AttendanceEngine::new(Arc::new(KeyLocks::new()))
}

fn ok_for(name: &str) -> DecisionRequest<'_> {
    DecisionRequest {
        person_name: Some(name),
        device_id: "gate-1",
        distance: Some(0.4),
        upstream_status: Status::Ok,
        snapshot_path: None,
    }
}

#[test]
fn full_day_scenario() {
    let (_, mut pool) = open_test_db("engine_scenario");
    let policy = utc_policy(&mut pool);
    let engine = engine();
    let req = ok_for("alice");

    let d = engine.decide(&mut pool.conn, &req, &policy, at(7, 55, 0)).unwrap();
    assert_eq!(d.status, Status::Ok);
    assert_eq!(d.event_type, Some(EventType::In));
    assert!(!d.is_late);

    let d = engine.decide(&mut pool.conn, &req, &policy, at(7, 55, 10)).unwrap();
    assert_eq!(d.status, Status::Cooldown);
    assert_eq!(d.event_type, None);

    let d = engine.decide(&mut pool.conn, &req, &policy, at(13, 50, 0)).unwrap();
    assert_eq!(d.status, Status::RejectOutTooEarly);
    assert!(d.audio_text.contains("14:00"));

    let d = engine.decide(&mut pool.conn, &req, &policy, at(14, 10, 0)).unwrap();
    assert_eq!(d.status, Status::Ok);
    assert_eq!(d.event_type, Some(EventType::Out));

    let d = engine.decide(&mut pool.conn, &req, &policy, at(16, 0, 0)).unwrap();
    assert_eq!(d.status, Status::Duplicate);

    let daily = get_daily(&pool.conn, &day(), "alice").unwrap().unwrap();
    assert_eq!(daily.state(), DayState::Complete);
    assert_eq!(daily.in_time, Some(at(7, 55, 0)));
    assert_eq!(daily.out_time, Some(at(14, 10, 0)));
    assert!(!daily.in_is_late);

    // every attempt is in the audit trail
    let events = events_for_day(&pool.conn, &day()).unwrap();
    assert_eq!(events.len(), 5);
    assert!(events.iter().all(|e| e.final_name.as_deref() == Some("alice")));
}

#[test]
fn late_arrival_is_labelled() {
    let (_, mut pool) = open_test_db("engine_late");
    let policy = utc_policy(&mut pool);

    let d = engine()
        .decide(&mut pool.conn, &ok_for("bob"), &policy, at(8, 0, 1))
        .unwrap();
    assert!(d.is_late);
    assert!(d.audio_text.contains("late"));

    let daily = get_daily(&pool.conn, &day(), "bob").unwrap().unwrap();
    assert!(daily.in_is_late);
}

#[test]
fn attempts_within_cooldown_give_one_ok_and_one_cooldown() {
    let (_, mut pool) = open_test_db("engine_cooldown");
    let policy = utc_policy(&mut pool);
    let engine = engine();

    let a = engine.decide(&mut pool.conn, &ok_for("carol"), &policy, at(9, 0, 0)).unwrap();
    let b = engine.decide(&mut pool.conn, &ok_for("carol"), &policy, at(9, 0, 44)).unwrap();

    let mut statuses = vec![a.status, b.status];
    statuses.sort_by_key(|s| s.to_db_str());
    assert_eq!(statuses, vec![Status::Cooldown, Status::Ok]);
}

#[test]
fn repeated_cooldowns_do_not_extend_the_wait() {
    let (_, mut pool) = open_test_db("engine_cooldown_retry");
    let policy = utc_policy(&mut pool);
    let engine = engine();
    let req = ok_for("dan");

    engine.decide(&mut pool.conn, &req, &policy, at(14, 0, 0)).unwrap();
    let d = engine.decide(&mut pool.conn, &req, &policy, at(14, 0, 30)).unwrap();
    assert_eq!(d.status, Status::Cooldown);

    // 46 s after the IN, only 16 s after the cooldown attempt
    let d = engine.decide(&mut pool.conn, &req, &policy, at(14, 0, 46)).unwrap();
    assert_eq!(d.status, Status::Ok);
    assert_eq!(d.event_type, Some(EventType::Out));
}

#[test]
fn out_after_upper_bound_is_rejected() {
    let (_, mut pool) = open_test_db("engine_out_late");
    utc_policy(&mut pool);
    let policy = PolicyStore::new(Duration::ZERO)
        .update_policy(
            &mut pool.conn,
            &PolicyPatch {
                out_end_time: Some(Some("16:00".into())),
                ..Default::default()
            },
        )
        .unwrap();
    let engine = engine();

    engine.decide(&mut pool.conn, &ok_for("erin"), &policy, at(7, 0, 0)).unwrap();
    let d = engine.decide(&mut pool.conn, &ok_for("erin"), &policy, at(16, 0, 1)).unwrap();
    assert_eq!(d.status, Status::RejectOutLate);

    let daily = get_daily(&pool.conn, &day(), "erin").unwrap().unwrap();
    assert_eq!(daily.state(), DayState::InRecorded);
}

#[test]
fn upstream_failure_is_logged_without_a_name() {
    let (_, mut pool) = open_test_db("engine_unknown");
    let policy = utc_policy(&mut pool);

    let req = DecisionRequest {
        person_name: None,
        device_id: "gate-2",
        distance: Some(1.3),
        upstream_status: Status::Unknown,
        snapshot_path: None,
    };
    let d = engine().decide(&mut pool.conn, &req, &policy, at(9, 0, 0)).unwrap();
    assert_eq!(d.status, Status::Unknown);

    let events = events_for_day(&pool.conn, &day()).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].final_name, None);
    assert_eq!(events[0].event_type, None);
    assert_eq!(events[0].distance, Some(1.3));
}

#[test]
fn day_is_local_to_the_policy_timezone() {
    let (_, mut pool) = open_test_db("engine_tz");
    utc_policy(&mut pool);
    let policy = PolicyStore::new(Duration::ZERO)
        .update_policy(
            &mut pool.conn,
            &PolicyPatch {
                timezone: Some("Asia/Jakarta".into()),
                ..Default::default()
            },
        )
        .unwrap();

    // 23:30 UTC is 06:30 next day in Jakarta
    let d = engine()
        .decide(&mut pool.conn, &ok_for("fay"), &policy, at(23, 30, 0))
        .unwrap();
    assert_eq!(d.day, day().succ_opt().unwrap());
    assert!(!d.is_late);
}

#[test]
fn concurrent_decisions_record_a_single_in() {
    let (path, mut pool) = open_test_db("engine_concurrent");
    utc_policy(&mut pool);
    // no cooldown: only the per-key serialization keeps the IN unique
    let policy = PolicyStore::new(Duration::ZERO)
        .update_policy(
            &mut pool.conn,
            &PolicyPatch {
                cooldown_seconds: Some(0),
                ..Default::default()
            },
        )
        .unwrap();
    let policy = Arc::new(policy);
    let engine = Arc::new(engine());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let path = path.clone();
            let policy = Arc::clone(&policy);
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let mut pool = open_initialized(&path).unwrap();
                engine
                    .decide(&mut pool.conn, &ok_for("gus"), &policy, at(7, 30, 0))
                    .unwrap()
            })
        })
        .collect();

    let decisions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let ins = decisions
        .iter()
        .filter(|d| d.event_type == Some(EventType::In))
        .count();
    assert_eq!(ins, 1);
    assert!(
        decisions
            .iter()
            .filter(|d| d.event_type.is_none())
            .all(|d| d.status == Status::RejectOutTooEarly)
    );

    let events = events_for_day(&pool.conn, &day()).unwrap();
    assert_eq!(events.len(), 8);
}
