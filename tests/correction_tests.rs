use rfacelog::core::correction::{CorrectionOutcome, correct_event};
use rfacelog::core::engine::{AttendanceEngine, DecisionRequest};
use rfacelog::core::locks::KeyLocks;
use rfacelog::core::retention::rebuild_daily;
use rfacelog::db::log::load_log;
use rfacelog::db::pool::DbPool;
use rfacelog::db::queries::{daily_for_day, get_daily, get_event};
use rfacelog::errors::AppError;
use rfacelog::models::policy::Policy;
use rfacelog::models::status::Status;
use std::sync::Arc;

mod common;
use common::{at, day, open_test_db, utc_policy};

struct Fixture {
    pool: DbPool,
    policy: Policy,
    locks: Arc<KeyLocks>,
    engine: AttendanceEngine,
}

fn fixture(name: &str) -> Fixture {
    let (_, mut pool) = open_test_db(name);
    let policy = utc_policy(&mut pool);
    let locks = Arc::new(KeyLocks::new());
    let engine = AttendanceEngine::new(Arc::clone(&locks));
    Fixture {
        pool,
        policy,
        locks,
        engine,
    }
}

impl Fixture {
    fn decide(&mut self, name: &str, h: u32, m: u32) -> (i64, Status) {
        let req = DecisionRequest {
            person_name: Some(name),
            device_id: "gate-1",
            distance: Some(0.3),
            upstream_status: Status::Ok,
            snapshot_path: None,
        };
        let d = self
            .engine
            .decide(&mut self.pool.conn, &req, &self.policy, at(h, m, 0))
            .unwrap();
        (d.event_id, d.status)
    }

    fn correct(&mut self, id: i64, to: &str) -> Result<CorrectionOutcome, AppError> {
        correct_event(
            &mut self.pool.conn,
            &self.locks,
            id,
            to,
            Some("wrong match"),
            "admin",
            at(18, 0, 0),
        )
    }
}

#[test]
fn moving_an_in_clears_the_old_owner_and_fills_the_new_one() {
    let mut f = fixture("correct_move_in");
    let (id, _) = f.decide("alice", 7, 55);

    let out = f.correct(id, "bob").unwrap();
    assert!(out.changed);
    assert_eq!(out.old_final_name.as_deref(), Some("alice"));
    assert_eq!(out.new_final_name, "bob");
    assert_eq!(out.edited_by.as_deref(), Some("admin"));

    let alice = get_daily(&f.pool.conn, &day(), "alice").unwrap().unwrap();
    assert_eq!(alice.in_time, None);

    let bob = get_daily(&f.pool.conn, &day(), "bob").unwrap().unwrap();
    assert_eq!(bob.in_time, Some(at(7, 55, 0)));
    assert!(!bob.in_is_late);

    let ev = get_event(&f.pool.conn, id).unwrap().unwrap();
    assert_eq!(ev.predicted_name.as_deref(), Some("alice"));
    assert_eq!(ev.final_name.as_deref(), Some("bob"));
    assert_eq!(ev.edit_note.as_deref(), Some("wrong match"));
    assert_eq!(ev.edited_at, Some(at(18, 0, 0)));
}

#[test]
fn earliest_in_wins_on_the_new_owner() {
    let mut f = fixture("correct_earliest_in");
    f.decide("bob", 8, 10); // late
    let (early, _) = f.decide("alice", 7, 50);
    let (later, _) = f.decide("carol", 8, 30);

    f.correct(early, "bob").unwrap();
    let bob = get_daily(&f.pool.conn, &day(), "bob").unwrap().unwrap();
    assert_eq!(bob.in_time, Some(at(7, 50, 0)));
    assert!(!bob.in_is_late);

    f.correct(later, "bob").unwrap();
    let bob = get_daily(&f.pool.conn, &day(), "bob").unwrap().unwrap();
    assert_eq!(bob.in_time, Some(at(7, 50, 0)));

    let carol = get_daily(&f.pool.conn, &day(), "carol").unwrap().unwrap();
    assert_eq!(carol.in_time, None);
}

#[test]
fn moving_an_out_uses_latest_out() {
    let mut f = fixture("correct_out");
    f.decide("alice", 7, 0);
    f.decide("bob", 7, 5);
    f.decide("bob", 15, 0);
    let (alice_out, _) = f.decide("alice", 16, 0);

    f.correct(alice_out, "bob").unwrap();

    let alice = get_daily(&f.pool.conn, &day(), "alice").unwrap().unwrap();
    assert_eq!(alice.out_time, None);
    assert!(alice.in_time.is_some());

    let bob = get_daily(&f.pool.conn, &day(), "bob").unwrap().unwrap();
    assert_eq!(bob.out_time, Some(at(16, 0, 0)));
}

#[test]
fn same_name_is_a_no_op() {
    let mut f = fixture("correct_noop");
    let (id, _) = f.decide("alice", 7, 55);

    let out = f.correct(id, "  alice ").unwrap();
    assert!(!out.changed);

    let ev = get_event(&f.pool.conn, id).unwrap().unwrap();
    assert_eq!(ev.edited_by, None);
}

#[test]
fn invalid_requests_are_rejected_without_changes() {
    let mut f = fixture("correct_invalid");
    let (id, _) = f.decide("alice", 7, 55);
    let (cooldown_id, status) = f.decide("alice", 7, 55);
    assert_eq!(status, Status::Cooldown);

    assert!(matches!(f.correct(9999, "bob"), Err(AppError::EventNotFound(9999))));
    assert!(matches!(f.correct(id, "   "), Err(AppError::InvalidName(_))));
    // cooldown attempts carry no IN/OUT
    assert!(matches!(
        f.correct(cooldown_id, "bob"),
        Err(AppError::InvalidCorrection(_))
    ));

    let unknown = DecisionRequest {
        person_name: None,
        device_id: "gate-1",
        distance: Some(1.4),
        upstream_status: Status::Unknown,
        snapshot_path: None,
    };
    let d = f
        .engine
        .decide(&mut f.pool.conn, &unknown, &f.policy, at(9, 0, 0))
        .unwrap();
    assert!(matches!(
        f.correct(d.event_id, "bob"),
        Err(AppError::InvalidCorrection(_))
    ));

    let alice = get_daily(&f.pool.conn, &day(), "alice").unwrap().unwrap();
    assert_eq!(alice.in_time, Some(at(7, 55, 0)));
    assert!(get_daily(&f.pool.conn, &day(), "bob").unwrap().is_none());
}

#[test]
fn event_without_day_is_a_data_integrity_error() {
    let mut f = fixture("correct_no_day");
    f.pool
        .conn
        .execute(
            "INSERT INTO attendance_events (day, ts, device_id, predicted_name, final_name, event_type, is_late, status)
             VALUES (NULL, '2025-04-14T07:00:00.000000Z', 'legacy', 'alice', 'alice', 'IN', 0, 'ok')",
            [],
        )
        .unwrap();
    let id = f.pool.conn.last_insert_rowid();

    assert!(matches!(f.correct(id, "bob"), Err(AppError::DataIntegrity(_))));
}

#[test]
fn applied_corrections_are_logged() {
    let mut f = fixture("correct_logged");
    let (id, _) = f.decide("alice", 7, 55);
    f.correct(id, "bob").unwrap();

    let log = load_log(&f.pool.conn).unwrap();
    assert!(
        log.iter()
            .any(|e| e.operation == "correct" && e.target == format!("event:{}", id))
    );
}

#[test]
fn chained_corrections_refold_the_old_owner() {
    let mut f = fixture("correct_chain");
    let (a, _) = f.decide("alice", 7, 0);
    let (b, _) = f.decide("bob", 7, 30);

    f.correct(b, "alice").unwrap();
    let alice = get_daily(&f.pool.conn, &day(), "alice").unwrap().unwrap();
    assert_eq!(alice.in_time, Some(at(7, 0, 0)));

    // alice still owns the 07:30 IN once her own 07:00 IN moves away
    f.correct(a, "carol").unwrap();
    let alice = get_daily(&f.pool.conn, &day(), "alice").unwrap().unwrap();
    assert_eq!(alice.in_time, Some(at(7, 30, 0)));
    assert!(!alice.in_is_late);

    let live: Vec<_> = daily_for_day(&f.pool.conn, &day())
        .unwrap()
        .into_iter()
        .map(|r| (r.person_name, r.in_time, r.in_is_late, r.out_time))
        .collect();
    rebuild_daily(&mut f.pool.conn, day(), at(19, 0, 0)).unwrap();
    let rebuilt: Vec<_> = daily_for_day(&f.pool.conn, &day())
        .unwrap()
        .into_iter()
        .map(|r| (r.person_name, r.in_time, r.in_is_late, r.out_time))
        .collect();
    assert_eq!(live, rebuilt);
}

#[test]
fn chained_out_corrections_keep_the_latest_remaining_out() {
    let mut f = fixture("correct_chain_out");
    f.decide("alice", 7, 0);
    f.decide("bob", 7, 5);
    let (bob_out, _) = f.decide("bob", 15, 0);
    let (alice_out, _) = f.decide("alice", 16, 0);

    f.correct(bob_out, "alice").unwrap();
    f.correct(alice_out, "dave").unwrap();

    let alice = get_daily(&f.pool.conn, &day(), "alice").unwrap().unwrap();
    assert_eq!(alice.out_time, Some(at(15, 0, 0)));
}
