use rfacelog::core::identity_cache::{CacheGeneration, IdentityCache, QueryError, euclidean};
use rfacelog::models::person::{FeatureSnapshot, Identity};

mod common;
use common::DIM;

fn identity(name: &str, vectors: Vec<Vec<f32>>) -> Identity {
    Identity {
        name: name.to_string(),
        vectors,
    }
}

fn store() -> FeatureSnapshot {
    FeatureSnapshot {
        identities: vec![
            identity("alice", vec![vec![1.0, 0.0, 0.0, 0.0], vec![0.8, 0.2, 0.0, 0.0]]),
            identity("bob", vec![vec![0.0, 1.0, 0.0, 0.0]]),
            identity("carol", vec![vec![0.0, 0.0, 1.0, 0.0], vec![0.0, 0.0, 0.6, 0.4]]),
        ],
    }
}

/// Nearest identity computed the slow way over the published representatives.
fn brute_force(generation: &CacheGeneration, probe: &[f32]) -> (String, f32) {
    let mut best: Option<(String, f32)> = None;
    for name in generation.names() {
        let d = euclidean(generation.representative(name).unwrap(), probe);
        if best.as_ref().map(|(_, b)| d < *b).unwrap_or(true) {
            best = Some((name.clone(), d));
        }
    }
    best.unwrap()
}

#[test]
fn representative_is_the_mean() {
    let g = CacheGeneration::build(&store(), DIM, 1);
    let alice = g.representative("alice").unwrap();
    assert!((alice[0] - 0.9).abs() < 1e-6);
    assert!((alice[1] - 0.1).abs() < 1e-6);
}

#[test]
fn query_agrees_with_brute_force() {
    let g = CacheGeneration::build(&store(), DIM, 1);
    let probes = [
        vec![0.9, 0.1, 0.0, 0.0],
        vec![0.1, 0.9, 0.1, 0.0],
        vec![0.0, 0.2, 0.7, 0.3],
        vec![0.5, 0.5, 0.5, 0.5],
        vec![-1.0, 0.0, 0.0, 2.0],
    ];
    for p in &probes {
        let got = g.query(p).unwrap();
        let (name, d) = brute_force(&g, p);
        assert_eq!(got.name, name);
        assert!((got.distance - d).abs() < 1e-6);
    }
}

#[test]
fn rebuild_is_idempotent() {
    let cache = IdentityCache::new(DIM);
    let first = cache.rebuild(&store());
    let second = cache.rebuild(&store());

    assert_eq!(first.generation, 1);
    assert_eq!(second.generation, 2);
    assert_eq!(first.names(), second.names());
    for name in first.names() {
        assert_eq!(first.representative(name), second.representative(name));
    }
}

#[test]
fn ties_keep_the_first_identity() {
    let snapshot = FeatureSnapshot {
        identities: vec![
            identity("first", vec![vec![1.0, 0.0, 0.0, 0.0]]),
            identity("second", vec![vec![1.0, 0.0, 0.0, 0.0]]),
        ],
    };
    let g = CacheGeneration::build(&snapshot, DIM, 1);
    assert_eq!(g.query(&[1.0, 0.0, 0.0, 0.0]).unwrap().name, "first");
}

#[test]
fn identities_without_vectors_are_excluded() {
    let snapshot = FeatureSnapshot {
        identities: vec![
            identity("empty", vec![]),
            identity("bob", vec![vec![0.0, 1.0, 0.0, 0.0]]),
        ],
    };
    let g = CacheGeneration::build(&snapshot, DIM, 1);
    assert_eq!(g.len(), 1);
    assert!(g.representative("empty").is_none());
}

#[test]
fn wrong_dimension_vectors_are_skipped() {
    let snapshot = FeatureSnapshot {
        identities: vec![identity(
            "dave",
            vec![vec![1.0, 1.0], vec![0.0, 0.0, 0.0, 2.0]],
        )],
    };
    let g = CacheGeneration::build(&snapshot, DIM, 1);
    assert_eq!(g.representative("dave").unwrap(), &[0.0, 0.0, 0.0, 2.0]);
}

#[test]
fn empty_cache_is_distinguished() {
    let cache = IdentityCache::new(DIM);
    assert_eq!(cache.query(&[0.0; DIM]), Err(QueryError::Empty));

    let g = cache.rebuild(&FeatureSnapshot::default());
    assert!(g.is_empty());
    assert_eq!(cache.query(&[0.0; DIM]), Err(QueryError::Empty));
}

#[test]
fn probe_with_wrong_dimension_is_rejected() {
    let cache = IdentityCache::new(DIM);
    cache.rebuild(&store());
    assert_eq!(
        cache.query(&[1.0, 0.0]),
        Err(QueryError::DimensionMismatch {
            expected: DIM,
            got: 2
        })
    );
}

#[test]
fn query_on_held_generation_ignores_later_rebuilds() {
    let cache = IdentityCache::new(DIM);
    cache.rebuild(&store());
    let held = cache.snapshot();

    cache.rebuild(&FeatureSnapshot {
        identities: vec![identity("erin", vec![vec![1.0, 0.0, 0.0, 0.0]])],
    });

    assert_eq!(held.query(&[1.0, 0.0, 0.0, 0.0]).unwrap().name, "alice");
    assert_eq!(cache.query(&[1.0, 0.0, 0.0, 0.0]).unwrap().name, "erin");
    assert_eq!(cache.snapshot().generation, held.generation + 1);
}
