//! Seams to the external embedding model and face detector.
//!
//! The recognizer never decodes images itself. Production deployments plug a
//! model-backed adapter behind these traits; the CLI ships adapters that read
//! precomputed vectors from JSON documents.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("capability unavailable: {0}")]
    Unavailable(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// `image → fixed-length vector`.
pub trait Embedder: Send + Sync {
    fn embed(&self, image: &[u8]) -> Result<Vec<f32>, CapabilityError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

/// One detected region, already cropped and aligned.
#[derive(Debug, Clone)]
pub struct DetectedFace {
    pub crop: Vec<u8>,
    /// Minimum crop side in pixels.
    pub quality: u32,
    pub bbox: BoundingBox,
}

/// `image, max_count → faces ordered left-to-right`.
pub trait FaceDetector: Send + Sync {
    fn detect_faces(&self, image: &[u8], max_count: usize)
    -> Result<Vec<DetectedFace>, CapabilityError>;
}

/// Treats the "image" as a JSON array of floats produced by an external model.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonVectorEmbedder;

impl Embedder for JsonVectorEmbedder {
    fn embed(&self, image: &[u8]) -> Result<Vec<f32>, CapabilityError> {
        let v: Vec<f32> = serde_json::from_slice(image)
            .map_err(|e| CapabilityError::InvalidInput(format!("probe is not a vector: {}", e)))?;
        if v.is_empty() {
            return Err(CapabilityError::InvalidInput("empty vector".into()));
        }
        Ok(v)
    }
}

#[derive(Debug, Deserialize)]
struct JsonFace {
    bbox: BoundingBox,
    quality: u32,
    embedding: Vec<f32>,
}

/// Reads a detection document: `[{"bbox": {..}, "quality": N, "embedding": [..]}, ..]`.
/// Each crop carries its embedding as JSON so it pairs with [`JsonVectorEmbedder`].
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFaceDetector;

impl FaceDetector for JsonFaceDetector {
    fn detect_faces(
        &self,
        image: &[u8],
        max_count: usize,
    ) -> Result<Vec<DetectedFace>, CapabilityError> {
        let mut faces: Vec<JsonFace> = serde_json::from_slice(image).map_err(|e| {
            CapabilityError::InvalidInput(format!("invalid detection document: {}", e))
        })?;
        faces.sort_by_key(|f| f.bbox.x);
        faces.truncate(max_count);

        faces
            .into_iter()
            .map(|f| {
                let crop = serde_json::to_vec(&f.embedding)
                    .map_err(|e| CapabilityError::InvalidInput(e.to_string()))?;
                Ok(DetectedFace {
                    crop,
                    quality: f.quality,
                    bbox: f.bbox,
                })
            })
            .collect()
    }
}
