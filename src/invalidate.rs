//! # Selective cache invalidation
//!
//! When an underlying fact changes, [`Database::invalidate_literal`] unifies
//! the changed literal against every recorded witness, then evicts the
//! transitive closure of cached subgoals that depended on the matches. The
//! changed literal's own cache entry is evicted as well, since it may have
//! no dependents at all.

use std::collections::VecDeque;

use log::debug;

use crate::database::{Database, ResultCache};
use crate::env::{unify, Env};
use crate::fingerprint::Fingerprint;
use crate::term::Literal;

/// What an invalidation pass cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvalidationReport {
    /// Number of cached subgoal entries removed.
    pub results_cleared: usize,
}

impl InvalidationReport {
    fn merge(&mut self, other: InvalidationReport) {
        self.results_cleared += other.results_cleared;
    }
}

/// Evict one subgoal entry and everything transitively depending on it.
fn evict(cache: &mut ResultCache, start: Fingerprint) -> InvalidationReport {
    let mut report = InvalidationReport::default();
    let mut queue = VecDeque::from([start]);
    while let Some(id) = queue.pop_front() {
        // Removing the index entry as we go doubles as the visited set, so
        // cyclic dependency edges cannot loop.
        if let Some(entry) = cache.invalidations.remove(&id) {
            queue.extend(entry.dependents);
        }
        if let Some(results) = cache.results.remove(&id) {
            report.results_cleared += 1;
            for r in &results {
                cache.proofs.remove(&r.literal.fingerprint());
            }
        }
    }
    report
}

impl Database {
    /// Drop every cached result that may have depended on `literal`, plus
    /// the literal's own cache entry. Subsequent queries re-derive.
    pub fn invalidate_literal(&self, literal: &Literal) -> InvalidationReport {
        let mut cache = self.cache.write().expect("lock poisoned");
        let mut report = InvalidationReport::default();

        let matching: Vec<Fingerprint> = cache
            .invalidations
            .iter()
            .filter(|(_, entry)| {
                let mut env = Env::new();
                unify(&entry.witness, literal, &mut env)
            })
            .map(|(&fp, _)| fp)
            .collect();
        for fp in matching {
            report.merge(evict(&mut cache, fp));
        }

        // Clear the literal's direct entry; it might have no dependents.
        let direct = literal.fingerprint();
        if let Some(results) = cache.results.remove(&direct) {
            report.results_cleared += 1;
            for r in &results {
                cache.proofs.remove(&r.literal.fingerprint());
            }
        }

        debug!(
            "invalidated {}: cleared {} cached subgoals",
            literal, report.results_cleared
        );
        report
    }
}
