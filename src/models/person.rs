use serde::Serialize;

/// An enrolled identity as listed by the admin views.
#[derive(Debug, Clone, Serialize)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub embeddings: usize,
    pub created_at: String,
}

/// Per-person feature vectors, in enrollment order.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub name: String,
    pub vectors: Vec<Vec<f32>>,
}

/// Point-in-time copy of the feature store, persons ordered by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSnapshot {
    pub identities: Vec<Identity>,
}
