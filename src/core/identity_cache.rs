//! In-memory nearest-neighbor index over enrolled identities.
//!
//! Each identity is reduced to the arithmetic mean of its feature vectors.
//! A rebuild produces a brand-new immutable [`CacheGeneration`] and publishes
//! it with a single atomic pointer swap; queries hold an `Arc` to the
//! generation they started on and are never affected by later rebuilds.

use crate::models::person::FeatureSnapshot;
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Nearest identity for a probe.
#[derive(Debug, Clone, PartialEq)]
pub struct Nearest {
    pub name: String,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryError {
    /// No identity with at least one vector is enrolled.
    Empty,
    DimensionMismatch { expected: usize, got: usize },
    NonFiniteProbe,
}

/// One immutable published state of the cache.
#[derive(Debug)]
pub struct CacheGeneration {
    pub generation: u64,
    pub built_at: DateTime<Utc>,
    dim: usize,
    names: Vec<String>,
    means: Vec<Vec<f32>>,
}

fn mean_vector(vectors: &[&Vec<f32>], dim: usize) -> Vec<f32> {
    let mut acc = vec![0f64; dim];
    for v in vectors {
        for (a, x) in acc.iter_mut().zip(v.iter()) {
            *a += f64::from(*x);
        }
    }
    let n = vectors.len() as f64;
    acc.into_iter().map(|a| (a / n) as f32).collect()
}

pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum::<f64>()
        .sqrt() as f32
}

impl CacheGeneration {
    pub fn empty(dim: usize) -> Self {
        Self {
            generation: 0,
            built_at: Utc::now(),
            dim,
            names: Vec::new(),
            means: Vec::new(),
        }
    }

    /// Reduce a feature store snapshot to one mean vector per identity.
    /// Identities without usable vectors are left out.
    pub fn build(snapshot: &FeatureSnapshot, dim: usize, generation: u64) -> Self {
        let mut names = Vec::with_capacity(snapshot.identities.len());
        let mut means = Vec::with_capacity(snapshot.identities.len());

        for identity in &snapshot.identities {
            let usable: Vec<&Vec<f32>> = identity
                .vectors
                .iter()
                .filter(|v| v.len() == dim)
                .collect();

            let skipped = identity.vectors.len() - usable.len();
            if skipped > 0 {
                warn!(
                    name = %identity.name,
                    skipped,
                    expected_dim = dim,
                    "ignoring stored vectors with wrong dimension"
                );
            }
            if usable.is_empty() {
                debug!(name = %identity.name, "identity has no vectors, not indexed");
                continue;
            }

            names.push(identity.name.clone());
            means.push(mean_vector(&usable, dim));
        }

        Self {
            generation,
            built_at: Utc::now(),
            dim,
            names,
            means,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in insertion order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Representative vector of an identity.
    pub fn representative(&self, name: &str) -> Option<&[f32]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.means[i].as_slice())
    }

    /// Full linear scan; ties keep the first identity encountered.
    pub fn query(&self, probe: &[f32]) -> Result<Nearest, QueryError> {
        if self.is_empty() {
            return Err(QueryError::Empty);
        }
        if probe.len() != self.dim {
            return Err(QueryError::DimensionMismatch {
                expected: self.dim,
                got: probe.len(),
            });
        }
        if probe.iter().any(|x| !x.is_finite()) {
            return Err(QueryError::NonFiniteProbe);
        }

        let mut best_idx = 0usize;
        let mut best = f32::INFINITY;
        for (i, mean) in self.means.iter().enumerate() {
            let d = euclidean(mean, probe);
            if d < best {
                best = d;
                best_idx = i;
            }
        }

        Ok(Nearest {
            name: self.names[best_idx].clone(),
            distance: best,
        })
    }
}

/// Owner of the currently published generation.
pub struct IdentityCache {
    current: ArcSwap<CacheGeneration>,
    rebuild_lock: Mutex<()>,
    dim: usize,
}

impl IdentityCache {
    pub fn new(dim: usize) -> Self {
        Self {
            current: ArcSwap::from_pointee(CacheGeneration::empty(dim)),
            rebuild_lock: Mutex::new(()),
            dim,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The generation current at call time.
    pub fn snapshot(&self) -> Arc<CacheGeneration> {
        self.current.load_full()
    }

    /// Build a new generation from `snapshot` and publish it.
    ///
    /// Rebuilds are serialized with each other so generation numbers only grow;
    /// queries are never blocked.
    pub fn rebuild(&self, snapshot: &FeatureSnapshot) -> Arc<CacheGeneration> {
        let _guard = self
            .rebuild_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let next = self.current.load().generation + 1;
        let generation = Arc::new(CacheGeneration::build(snapshot, self.dim, next));
        self.current.store(Arc::clone(&generation));

        info!(
            generation = generation.generation,
            identities = generation.len(),
            "identity cache rebuilt"
        );
        generation
    }

    pub fn query(&self, probe: &[f32]) -> Result<Nearest, QueryError> {
        self.snapshot().query(probe)
    }
}
