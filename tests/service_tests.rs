use rfacelog::core::capabilities::{
    CapabilityError, DetectedFace, FaceDetector, JsonVectorEmbedder,
};
use rfacelog::core::enroll;
use rfacelog::core::policy_store::PolicyStore;
use rfacelog::core::service::AttendanceService;
use rfacelog::core::snapshots::SnapshotPolicy;
use rfacelog::db::queries::get_event;
use rfacelog::errors::AppError;
use rfacelog::models::event_type::EventType;
use rfacelog::models::status::Status;
use std::fs;
use std::path::Path;
use std::time::Duration;

mod common;
use common::{DIM, at, axis, enroll_person, open_test_db, probe_bytes, temp_dir, test_config, utc_policy};

fn service(db: &str) -> AttendanceService {
    AttendanceService::with_json_capabilities(test_config(db))
        .with_policy_store(PolicyStore::new(Duration::ZERO))
}

#[test]
fn recognize_records_in_then_out() {
    let (path, mut pool) = open_test_db("service_in_out");
    utc_policy(&mut pool);
    enroll_person(&mut pool, "alice", &[axis(0, 1.0), axis(0, 0.8)]);

    let svc = service(&path);
    let generation = svc.on_enrollment_changed(&pool.conn).unwrap();
    assert_eq!(generation.len(), 1);

    let probe = probe_bytes(&axis(0, 0.9));
    let r = svc
        .recognize_at(&mut pool.conn, &probe, 120, "gate-1", at(7, 55, 0))
        .unwrap();
    assert_eq!(r.status, Status::Ok);
    assert_eq!(r.name.as_deref(), Some("alice"));
    assert_eq!(r.event_type, Some(EventType::In));
    assert!(!r.late);

    let r = svc
        .recognize_at(&mut pool.conn, &probe, 120, "gate-1", at(14, 30, 0))
        .unwrap();
    assert_eq!(r.event_type, Some(EventType::Out));
}

#[test]
fn unknown_face_is_logged_without_name() {
    let (path, mut pool) = open_test_db("service_unknown");
    utc_policy(&mut pool);
    enroll_person(&mut pool, "alice", &[axis(0, 0.0)]);

    let svc = service(&path);
    svc.on_enrollment_changed(&pool.conn).unwrap();

    let r = svc
        .recognize_at(&mut pool.conn, &probe_bytes(&axis(1, 1.3)), 120, "gate-1", at(9, 0, 0))
        .unwrap();
    assert_eq!(r.status, Status::Unknown);
    assert_eq!(r.name, None);
    assert!((r.distance.unwrap() - 1.3).abs() < 1e-6);

    let ev = get_event(&pool.conn, r.event_id).unwrap().unwrap();
    assert_eq!(ev.status, Status::Unknown);
    assert_eq!(ev.final_name, None);
}

#[test]
fn recognition_before_any_rebuild_reports_no_enrolled_faces() {
    let (path, mut pool) = open_test_db("service_cold");
    utc_policy(&mut pool);

    let r = service(&path)
        .recognize_at(&mut pool.conn, &probe_bytes(&axis(0, 1.0)), 120, "gate-1", at(9, 0, 0))
        .unwrap();
    assert_eq!(r.status, Status::Error);
    assert_eq!(r.reason.as_deref(), Some("no_enrolled_faces"));
}

#[test]
fn deleting_a_person_removes_it_from_the_cache() {
    let (path, mut pool) = open_test_db("service_delete");
    enroll_person(&mut pool, "alice", &[axis(0, 1.0)]);
    enroll_person(&mut pool, "bob", &[axis(1, 1.0)]);

    let svc = service(&path);
    assert_eq!(svc.on_enrollment_changed(&pool.conn).unwrap().len(), 2);

    assert_eq!(enroll::delete_person(&mut pool.conn, "alice").unwrap(), 1);
    let generation = svc.on_enrollment_changed(&pool.conn).unwrap();
    assert_eq!(generation.names(), &["bob".to_string()]);
}

#[test]
fn enrollment_skips_unusable_vectors() {
    let (_, mut pool) = open_test_db("service_enroll");
    enroll::create_person(&pool.conn, "alice").unwrap();

    let report = enroll::add_embeddings(
        &mut pool.conn,
        "alice",
        &[axis(0, 1.0), vec![1.0, 2.0], vec![f32::NAN; DIM]],
        DIM,
    )
    .unwrap();
    assert_eq!((report.added, report.skipped), (1, 2));

    assert!(matches!(
        enroll::add_embeddings(&mut pool.conn, "nobody", &[axis(0, 1.0)], DIM),
        Err(AppError::PersonNotFound(_))
    ));
    assert!(matches!(
        enroll::create_person(&pool.conn, "   "),
        Err(AppError::InvalidName(_))
    ));
}

#[test]
fn group_recognition_decides_per_face() {
    let (path, mut pool) = open_test_db("service_group");
    utc_policy(&mut pool);
    enroll_person(&mut pool, "alice", &[axis(0, 1.0)]);
    enroll_person(&mut pool, "bob", &[axis(1, 1.0)]);

    let svc = service(&path);
    svc.on_enrollment_changed(&pool.conn).unwrap();

    let doc = r#"[
        {"bbox": {"x": 400, "y": 10, "w": 120, "h": 120}, "quality": 120, "embedding": [0.0, 1.0, 0.0, 0.0]},
        {"bbox": {"x": 20, "y": 10, "w": 120, "h": 120}, "quality": 120, "embedding": [1.0, 0.0, 0.0, 0.0]},
        {"bbox": {"x": 200, "y": 10, "w": 30, "h": 30}, "quality": 30, "embedding": [1.0, 0.0, 0.0, 0.0]}
    ]"#;
    let g = svc
        .recognize_group_at(&mut pool.conn, doc.as_bytes(), "lobby", at(7, 40, 0))
        .unwrap();

    assert_eq!(g.names, vec!["alice".to_string(), "bob".to_string()]);
    let statuses: Vec<Status> = g.faces.iter().map(|f| f.response.status).collect();
    assert_eq!(statuses, vec![Status::Ok, Status::Reject, Status::Ok]);
    assert!(
        g.faces
            .iter()
            .filter(|f| f.response.status == Status::Ok)
            .all(|f| f.response.event_type == Some(EventType::In))
    );
}

#[test]
fn unknown_faces_are_snapshotted_when_enabled() {
    let (path, mut pool) = open_test_db("service_snapshot");
    utc_policy(&mut pool);
    enroll_person(&mut pool, "alice", &[axis(0, 0.0)]);

    let dir = temp_dir("service_snapshot");
    let snapshots = SnapshotPolicy {
        enabled: true,
        dir: dir.clone(),
        on_unknown: true,
        on_low_conf: false,
        low_conf_distance: 0.8,
    };
    let svc = service(&path).with_snapshots(snapshots);
    svc.on_enrollment_changed(&pool.conn).unwrap();

    let r = svc
        .recognize_at(&mut pool.conn, &probe_bytes(&axis(2, 2.0)), 120, "gate/1", at(9, 0, 0))
        .unwrap();
    let saved = r.snapshot_path.expect("snapshot path");
    assert!(Path::new(&saved).exists());
    assert!(saved.ends_with("_gate_1_unknown.bin"));

    let ev = get_event(&pool.conn, r.event_id).unwrap().unwrap();
    assert_eq!(ev.snapshot_path.as_deref(), Some(saved.as_str()));
}

#[test]
fn service_corrections_go_through_the_shared_locks() {
    let (path, mut pool) = open_test_db("service_correct");
    utc_policy(&mut pool);
    enroll_person(&mut pool, "alice", &[axis(0, 1.0)]);

    let svc = service(&path);
    svc.on_enrollment_changed(&pool.conn).unwrap();
    let r = svc
        .recognize_at(&mut pool.conn, &probe_bytes(&axis(0, 1.0)), 120, "gate-1", at(7, 0, 0))
        .unwrap();

    let out = svc
        .correct(&mut pool.conn, r.event_id, "bob", Some("twin"), "hr")
        .unwrap();
    assert!(out.changed);
    assert_eq!(svc.locks().held(), 0);
}

struct OfflineDetector;

impl FaceDetector for OfflineDetector {
    fn detect_faces(&self, _: &[u8], _: usize) -> Result<Vec<DetectedFace>, CapabilityError> {
        Err(CapabilityError::Unavailable("camera offline".into()))
    }
}

#[test]
fn group_snapshots_hold_the_crop_of_their_own_region() {
    let (path, mut pool) = open_test_db("service_group_snapshot");
    utc_policy(&mut pool);
    enroll_person(&mut pool, "alice", &[axis(0, 1.0)]);

    let dir = temp_dir("service_group_snapshot");
    let snapshots = SnapshotPolicy {
        enabled: true,
        dir,
        on_unknown: true,
        on_low_conf: false,
        low_conf_distance: 0.8,
    };
    let svc = service(&path).with_snapshots(snapshots);
    svc.on_enrollment_changed(&pool.conn).unwrap();

    // the stranger is listed first but stands to the right of alice
    let doc = r#"[
        {"bbox": {"x": 300, "y": 0, "w": 120, "h": 120}, "quality": 120, "embedding": [0.0, 0.0, 9.0, 0.0]},
        {"bbox": {"x": 10, "y": 0, "w": 120, "h": 120}, "quality": 120, "embedding": [1.0, 0.0, 0.0, 0.0]}
    ]"#;
    let g = svc
        .recognize_group_at(&mut pool.conn, doc.as_bytes(), "lobby", at(7, 30, 0))
        .unwrap();

    assert_eq!(g.faces[0].response.status, Status::Ok);
    assert_eq!(g.faces[0].response.snapshot_path, None);
    assert_eq!(g.faces[1].response.status, Status::Unknown);
    let saved = g.faces[1].response.snapshot_path.clone().expect("snapshot path");
    let bytes = fs::read(&saved).unwrap();
    let stored: Vec<f32> = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(stored, vec![0.0, 0.0, 9.0, 0.0]);
}

#[test]
fn failed_detection_is_recorded_as_one_error() {
    let (path, mut pool) = open_test_db("service_group_offline");
    utc_policy(&mut pool);

    let svc = AttendanceService::new(
        test_config(&path),
        Box::new(JsonVectorEmbedder),
        Box::new(OfflineDetector),
    )
    .with_policy_store(PolicyStore::new(Duration::ZERO));

    let g = svc
        .recognize_group_at(&mut pool.conn, b"frame", "lobby", at(9, 0, 0))
        .unwrap();
    assert_eq!(g.faces.len(), 1);
    assert_eq!(g.faces[0].bbox, None);
    assert_eq!(g.faces[0].response.status, Status::Error);
    assert!(
        g.faces[0]
            .response
            .reason
            .as_deref()
            .unwrap()
            .starts_with("detection_failed")
    );

    let ev = get_event(&pool.conn, g.faces[0].response.event_id).unwrap().unwrap();
    assert_eq!(ev.status, Status::Error);
    assert!(g.names.is_empty());
}
