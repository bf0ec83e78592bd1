//! Recognition service: wires matcher, policy store, engine and corrections
//! together behind the operations exposed to calling interfaces.
//!
//! The service is shared across threads; every call takes the caller's own
//! SQLite connection.

use crate::config::Config;
use crate::core::capabilities::{
    BoundingBox, Embedder, FaceDetector, JsonFaceDetector, JsonVectorEmbedder,
};
use crate::core::correction::{CorrectionOutcome, correct_event};
use crate::core::engine::{AttendanceEngine, Decision, DecisionRequest};
use crate::core::identity_cache::{CacheGeneration, IdentityCache};
use crate::core::locks::KeyLocks;
use crate::core::matcher::{MatchResult, MatchSettings, Matcher};
use crate::core::policy_store::PolicyStore;
use crate::core::snapshots::{SnapshotPolicy, save_snapshot};
use crate::db::features::load_feature_snapshot;
use crate::errors::AppResult;
use crate::models::event_type::EventType;
use crate::models::policy::Policy;
use crate::models::status::Status;
use crate::utils::time::storage_precision;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// What a calling interface receives for one recognized face.
#[derive(Debug, Clone, Serialize)]
pub struct RecognitionResponse {
    pub status: Status,
    pub device_id: String,
    pub name: Option<String>,
    pub distance: Option<f32>,
    pub event_type: Option<EventType>,
    pub late: bool,
    pub audio_text: String,
    pub reason: Option<String>,
    pub event_id: i64,
    pub snapshot_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FaceResponse {
    pub index: usize,
    pub bbox: Option<BoundingBox>,
    #[serde(flatten)]
    pub response: RecognitionResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupResponse {
    pub device_id: String,
    pub faces: Vec<FaceResponse>,
    /// Names recognized, in detection order.
    pub names: Vec<String>,
}

pub struct AttendanceService {
    config: Config,
    cache: Arc<IdentityCache>,
    matcher: Matcher,
    policy: PolicyStore,
    engine: AttendanceEngine,
    locks: Arc<KeyLocks>,
    embedder: Box<dyn Embedder>,
    detector: Box<dyn FaceDetector>,
    snapshots: SnapshotPolicy,
}

impl AttendanceService {
    pub fn new(
        config: Config,
        embedder: Box<dyn Embedder>,
        detector: Box<dyn FaceDetector>,
    ) -> Self {
        let cache = Arc::new(IdentityCache::new(config.embedding_dim));
        let locks = Arc::new(KeyLocks::new());
        let matcher = Matcher::new(
            Arc::clone(&cache),
            MatchSettings {
                max_distance: config.max_distance,
                min_face_px: config.min_face_px,
                max_faces: config.max_faces,
            },
        );
        let snapshots = SnapshotPolicy::from_config(&config);

        Self {
            config,
            cache,
            matcher,
            policy: PolicyStore::default(),
            engine: AttendanceEngine::new(Arc::clone(&locks)),
            locks,
            embedder,
            detector,
            snapshots,
        }
    }

    /// Service reading probes as JSON vectors and detection documents.
    pub fn with_json_capabilities(config: Config) -> Self {
        Self::new(
            config,
            Box::new(JsonVectorEmbedder),
            Box::new(JsonFaceDetector),
        )
    }

    /// Replace the policy store (tests use a zero TTL).
    pub fn with_policy_store(mut self, store: PolicyStore) -> Self {
        self.policy = store;
        self
    }

    pub fn with_snapshots(mut self, snapshots: SnapshotPolicy) -> Self {
        self.snapshots = snapshots;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &Arc<IdentityCache> {
        &self.cache
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn policy_store(&self) -> &PolicyStore {
        &self.policy
    }

    pub fn locks(&self) -> &Arc<KeyLocks> {
        &self.locks
    }

    pub fn policy(&self, conn: &Connection) -> AppResult<Arc<Policy>> {
        self.policy.get_policy(conn)
    }

    /// Rebuild the identity cache from the feature store.
    pub fn on_enrollment_changed(&self, conn: &Connection) -> AppResult<Arc<CacheGeneration>> {
        let snapshot = load_feature_snapshot(conn)?;
        Ok(self.cache.rebuild(&snapshot))
    }

    pub fn on_policy_changed(&self) {
        self.policy.invalidate();
    }

    pub fn recognize(
        &self,
        conn: &mut Connection,
        image: &[u8],
        face_quality: u32,
        device_id: &str,
    ) -> AppResult<RecognitionResponse> {
        self.recognize_at(conn, image, face_quality, device_id, Utc::now())
    }

    /// [`recognize`](Self::recognize) with an explicit clock.
    pub fn recognize_at(
        &self,
        conn: &mut Connection,
        image: &[u8],
        face_quality: u32,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<RecognitionResponse> {
        let result = self
            .matcher
            .identify_image(self.embedder.as_ref(), image, face_quality);
        self.decide(conn, result, image, device_id, now)
    }

    pub fn recognize_group(
        &self,
        conn: &mut Connection,
        image: &[u8],
        device_id: &str,
    ) -> AppResult<GroupResponse> {
        self.recognize_group_at(conn, image, device_id, Utc::now())
    }

    pub fn recognize_group_at(
        &self,
        conn: &mut Connection,
        image: &[u8],
        device_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<GroupResponse> {
        let matched = self.matcher.identify_group(
            self.detector.as_ref(),
            self.embedder.as_ref(),
            image,
        );

        let mut out = Vec::with_capacity(matched.results.len());
        for region in matched.results {
            // a failed detection has no crop: the whole frame stands in for it
            let probe: &[u8] = if region.bbox.is_some() {
                &region.crop
            } else {
                image
            };
            let response = self.decide(conn, region.result, probe, device_id, now)?;
            out.push(FaceResponse {
                index: region.index,
                bbox: region.bbox,
                response,
            });
        }

        Ok(GroupResponse {
            device_id: device_id.to_string(),
            faces: out,
            names: matched.names,
        })
    }

    fn decide(
        &self,
        conn: &mut Connection,
        result: MatchResult,
        probe: &[u8],
        device_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<RecognitionResponse> {
        let now = storage_precision(now);
        let policy = self.policy.get_policy(conn)?;

        let snapshot_path = self.snapshots.reason_for(&result).and_then(|reason| {
            match save_snapshot(&self.snapshots.dir, probe, &now, device_id, reason) {
                Ok(p) => Some(p.to_string_lossy().to_string()),
                Err(e) => {
                    warn!(error = %e, "snapshot not saved");
                    None
                }
            }
        });

        let name = if result.status.is_ok() {
            result.name.as_deref()
        } else {
            None
        };
        let req = DecisionRequest {
            person_name: name,
            device_id,
            distance: result.distance,
            upstream_status: result.status,
            snapshot_path: snapshot_path.as_deref(),
        };
        let decision: Decision = self.engine.decide(conn, &req, &policy, now)?;

        Ok(RecognitionResponse {
            status: decision.status,
            device_id: device_id.to_string(),
            name: result.name,
            distance: result.distance,
            event_type: decision.event_type,
            late: decision.is_late,
            audio_text: decision.audio_text,
            reason: result.reason,
            event_id: decision.event_id,
            snapshot_path,
        })
    }

    pub fn correct(
        &self,
        conn: &mut Connection,
        event_id: i64,
        new_final_name: &str,
        edit_note: Option<&str>,
        actor: &str,
    ) -> AppResult<CorrectionOutcome> {
        self.correct_at(conn, event_id, new_final_name, edit_note, actor, Utc::now())
    }

    pub fn correct_at(
        &self,
        conn: &mut Connection,
        event_id: i64,
        new_final_name: &str,
        edit_note: Option<&str>,
        actor: &str,
        now: DateTime<Utc>,
    ) -> AppResult<CorrectionOutcome> {
        correct_event(
            conn,
            &self.locks,
            event_id,
            new_final_name,
            edit_note,
            actor,
            now,
        )
    }
}
