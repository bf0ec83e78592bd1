use crate::core::capabilities::{BoundingBox, DetectedFace, Embedder, FaceDetector};
use crate::core::identity_cache::{CacheGeneration, IdentityCache, QueryError};
use crate::models::status::Status;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

pub const REASON_TOO_SMALL: &str = "face_crop_too_small";
pub const REASON_NO_ENROLLED: &str = "no_enrolled_faces";
pub const REASON_EMBEDDING_FAILED: &str = "embedding_failed";
pub const REASON_DETECTION_FAILED: &str = "detection_failed";

#[derive(Debug, Clone, Copy)]
pub struct MatchSettings {
    pub max_distance: f32,
    pub min_face_px: u32,
    pub max_faces: usize,
}

/// Matcher verdict for one probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub status: Status,
    pub name: Option<String>,
    pub distance: Option<f32>,
    pub reason: Option<String>,
}

impl MatchResult {
    fn failed(status: Status, reason: impl Into<String>) -> Self {
        Self {
            status,
            name: None,
            distance: None,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionMatch {
    pub index: usize,
    pub bbox: Option<BoundingBox>,
    /// Crop the result was computed from; empty when detection failed.
    #[serde(skip)]
    pub crop: Vec<u8>,
    #[serde(flatten)]
    pub result: MatchResult,
}

/// Per-region results plus the recognized names in detection order.
#[derive(Debug, Clone, Serialize)]
pub struct GroupMatch {
    pub results: Vec<RegionMatch>,
    pub names: Vec<String>,
}

pub struct Matcher {
    cache: Arc<IdentityCache>,
    settings: MatchSettings,
}

impl Matcher {
    pub fn new(cache: Arc<IdentityCache>, settings: MatchSettings) -> Self {
        Self { cache, settings }
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    fn classify(&self, generation: &CacheGeneration, probe: &[f32]) -> MatchResult {
        match generation.query(probe) {
            Ok(nearest) if nearest.distance > self.settings.max_distance => MatchResult {
                status: Status::Unknown,
                name: None,
                distance: Some(nearest.distance),
                reason: None,
            },
            Ok(nearest) => MatchResult {
                status: Status::Ok,
                name: Some(nearest.name),
                distance: Some(nearest.distance),
                reason: None,
            },
            Err(QueryError::Empty) => MatchResult::failed(Status::Error, REASON_NO_ENROLLED),
            Err(QueryError::DimensionMismatch { expected, got }) => MatchResult::failed(
                Status::Error,
                format!("dimension_mismatch: expected {}, got {}", expected, got),
            ),
            Err(QueryError::NonFiniteProbe) => {
                MatchResult::failed(Status::Reject, "non_finite_probe")
            }
        }
    }

    /// Classify a probe vector. The quality gate runs before any cache lookup.
    pub fn identify(&self, probe: &[f32], face_quality: u32) -> MatchResult {
        if face_quality < self.settings.min_face_px {
            return MatchResult::failed(Status::Reject, REASON_TOO_SMALL);
        }
        let generation = self.cache.snapshot();
        self.classify(&generation, probe)
    }

    /// Same checks as [`identify`](Self::identify), embedding the crop only
    /// once the quality gate and the empty-cache check have passed.
    pub fn identify_image(
        &self,
        embedder: &dyn Embedder,
        crop: &[u8],
        face_quality: u32,
    ) -> MatchResult {
        if face_quality < self.settings.min_face_px {
            return MatchResult::failed(Status::Reject, REASON_TOO_SMALL);
        }

        let generation = self.cache.snapshot();
        if generation.is_empty() {
            return MatchResult::failed(Status::Error, REASON_NO_ENROLLED);
        }

        let probe = match embedder.embed(crop) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "embedding failed");
                return MatchResult::failed(
                    Status::Error,
                    format!("{}: {}", REASON_EMBEDDING_FAILED, e),
                );
            }
        };

        let result = self.classify(&generation, &probe);
        debug!(
            generation = generation.generation,
            status = %result.status,
            distance = ?result.distance,
            "probe classified"
        );
        result
    }

    /// Run [`identify_image`](Self::identify_image) independently per region.
    pub fn identify_faces(
        &self,
        embedder: &dyn Embedder,
        mut faces: Vec<DetectedFace>,
    ) -> GroupMatch {
        // the association between regions and results relies on left-to-right order
        faces.sort_by_key(|f| f.bbox.x);
        faces.truncate(self.settings.max_faces);

        let results: Vec<RegionMatch> = faces
            .into_iter()
            .enumerate()
            .map(|(index, face)| RegionMatch {
                index,
                bbox: Some(face.bbox),
                result: self.identify_image(embedder, &face.crop, face.quality),
                crop: face.crop,
            })
            .collect();

        let names = results
            .iter()
            .filter(|r| r.result.status.is_ok())
            .filter_map(|r| r.result.name.clone())
            .collect();

        GroupMatch { results, names }
    }

    /// Detect faces in `image` and identify each of them.
    pub fn identify_group(
        &self,
        detector: &dyn FaceDetector,
        embedder: &dyn Embedder,
        image: &[u8],
    ) -> GroupMatch {
        match detector.detect_faces(image, self.settings.max_faces) {
            Ok(faces) => self.identify_faces(embedder, faces),
            Err(e) => {
                warn!(error = %e, "face detection failed");
                GroupMatch {
                    results: vec![RegionMatch {
                        index: 0,
                        bbox: None,
                        crop: Vec::new(),
                        result: MatchResult::failed(
                            Status::Error,
                            format!("{}: {}", REASON_DETECTION_FAILED, e),
                        ),
                    }],
                    names: Vec::new(),
                }
            }
        }
    }
}
