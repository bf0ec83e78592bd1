//! Per-(day, person) serialization of daily aggregate mutations.
//!
//! A key is "held" while it sits in the `held` set. Multi-key acquisition is
//! all-or-nothing under the registry mutex, so two corrections touching the
//! same pair of keys cannot deadlock each other.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard};
use tracing::trace;

pub type DayKey = (NaiveDate, String);

#[derive(Default)]
pub struct KeyLocks {
    held: Mutex<HashSet<DayKey>>,
    released: Condvar,
}

/// Releases its keys on drop.
pub struct KeyGuard<'a> {
    owner: &'a KeyLocks,
    keys: Vec<DayKey>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.owner.held_set();
        for k in &self.keys {
            held.remove(k);
        }
        drop(held);
        self.owner.released.notify_all();
    }
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn held_set(&self) -> MutexGuard<'_, HashSet<DayKey>> {
        self.held
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Block until none of `keys` is held, then take all of them.
    pub fn lock_many(&self, keys: &[DayKey]) -> KeyGuard<'_> {
        let mut wanted: Vec<DayKey> = keys.to_vec();
        wanted.sort();
        wanted.dedup();

        let mut held = self.held_set();
        while wanted.iter().any(|k| held.contains(k)) {
            trace!(keys = wanted.len(), "waiting for per-key lock");
            held = self
                .released
                .wait(held)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        for k in &wanted {
            held.insert(k.clone());
        }

        KeyGuard {
            owner: self,
            keys: wanted,
        }
    }

    pub fn lock(&self, day: NaiveDate, name: &str) -> KeyGuard<'_> {
        self.lock_many(&[(day, name.to_string())])
    }

    /// Number of keys currently held.
    pub fn held(&self) -> usize {
        self.held_set().len()
    }
}
