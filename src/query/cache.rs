//! Memoized ranked results per raw query string.
//!
//! Weight accounting follows result counts against a fixed budget; entries
//! expire on a sliding window, and the whole cache is discarded wholesale
//! whenever a new catalog is published.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::engine::{RankedResult, empty_results};

/// Total result weight the cache may hold once eviction settles.
const WEIGHT_BUDGET: usize = 1560;

/// Sliding expiry window, refreshed on every hit.
const SLIDING_EXPIRY: Duration = Duration::from_secs(8 * 60 * 60);

struct CacheEntry {
    results: Arc<Vec<RankedResult>>,
    weight: usize,
    last_access: Instant,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    total_weight: usize,
}

/// Query-string keyed result cache. The inner map is the only state and is
/// replaced wholesale on invalidation; the lock guards lookups and inserts,
/// never result computation.
pub struct QueryCache {
    inner: Mutex<CacheInner>,
    budget: usize,
    expiry: Duration,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::with_limits(WEIGHT_BUDGET, SLIDING_EXPIRY)
    }

    pub fn with_limits(budget: usize, expiry: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            budget,
            expiry,
        }
    }

    /// Cached results for `query`, or whatever `compute` produces.
    ///
    /// A hit refreshes the sliding expiry. The computation runs outside the
    /// lock; its error is returned untouched and nothing is cached.
    pub fn get_or_compute<E>(
        &self,
        query: &str,
        compute: impl FnOnce() -> Result<Arc<Vec<RankedResult>>, E>,
    ) -> Result<Arc<Vec<RankedResult>>, E> {
        if let Some(hit) = self.lookup(query) {
            return Ok(hit);
        }

        let results = compute()?;
        self.insert(query, results.clone());
        Ok(results)
    }

    fn lookup(&self, query: &str) -> Option<Arc<Vec<RankedResult>>> {
        let mut inner = self.inner.lock();

        let expired = match inner.entries.get_mut(query) {
            Some(entry) => {
                if entry.last_access.elapsed() < self.expiry {
                    entry.last_access = Instant::now();
                    return Some(entry.results.clone());
                }
                true
            }
            None => false,
        };

        if expired {
            if let Some(entry) = inner.entries.remove(query) {
                inner.total_weight -= entry.weight;
            }
        }
        None
    }

    fn insert(&self, query: &str, results: Arc<Vec<RankedResult>>) {
        // Every empty result set shares one allocation, so a burst of
        // no-match queries costs the cache nothing.
        let results = if results.is_empty() {
            empty_results()
        } else {
            results
        };
        let weight = results.len();

        let mut inner = self.inner.lock();
        if let Some(old) = inner.entries.insert(
            query.to_string(),
            CacheEntry {
                results,
                weight,
                last_access: Instant::now(),
            },
        ) {
            inner.total_weight -= old.weight;
        }
        inner.total_weight += weight;

        // Least-recently-accessed entries go first; the entry just inserted
        // is the most recent and falls out last.
        while inner.total_weight > self.budget {
            let Some(oldest) = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(query, _)| query.clone())
            else {
                break;
            };
            if let Some(evicted) = inner.entries.remove(&oldest) {
                inner.total_weight -= evicted.weight;
            }
        }
    }

    /// Discard everything in O(1). Called on every catalog publish so no
    /// result computed against a superseded snapshot can be served.
    pub fn invalidate_all(&self) {
        *self.inner.lock() = CacheInner::default();
    }

    pub fn total_weight(&self) -> usize {
        self.inner.lock().total_weight
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LaunchAction;
    use std::convert::Infallible;

    fn results(count: usize) -> Arc<Vec<RankedResult>> {
        Arc::new(
            (0..count)
                .map(|i| RankedResult {
                    title: format!("app {i}"),
                    subtitle: String::new(),
                    icon_path: String::new(),
                    score: 10,
                    match_positions: Vec::new(),
                    launch: LaunchAction {
                        target: format!("/apps/{i}"),
                        working_directory: "/apps".to_string(),
                    },
                    unique_identifier: format!("/apps/{i}"),
                })
                .collect(),
        )
    }

    fn compute(count: usize) -> impl FnOnce() -> Result<Arc<Vec<RankedResult>>, Infallible> {
        move || Ok(results(count))
    }

    #[test]
    fn test_hit_skips_recomputation() {
        let cache = QueryCache::new();
        let mut calls = 0;

        for _ in 0..3 {
            let got: Result<_, Infallible> = cache.get_or_compute("fire", || {
                calls += 1;
                Ok(results(2))
            });
            assert_eq!(got.unwrap().len(), 2);
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_invalidate_all_forces_recomputation() {
        let cache = QueryCache::new();

        cache.get_or_compute("fire", compute(2)).unwrap();
        assert_eq!(cache.len(), 1);

        cache.invalidate_all();
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.total_weight(), 0);

        let mut recomputed = false;
        let _: Result<_, Infallible> = cache.get_or_compute("fire", || {
            recomputed = true;
            Ok(results(2))
        });
        assert!(recomputed);
    }

    #[test]
    fn test_weight_never_exceeds_budget_after_settling() {
        let cache = QueryCache::with_limits(50, SLIDING_EXPIRY);

        for i in 0..40 {
            cache.get_or_compute(&format!("query {i}"), compute(7)).unwrap();
            assert!(cache.total_weight() <= 50);
        }
        assert!(cache.total_weight() <= 50);
        assert!(cache.len() <= 7);
    }

    #[test]
    fn test_single_oversized_entry_is_evicted() {
        let cache = QueryCache::with_limits(10, SLIDING_EXPIRY);
        cache.get_or_compute("huge", compute(25)).unwrap();
        assert_eq!(cache.total_weight(), 0);
    }

    #[test]
    fn test_empty_results_share_the_sentinel() {
        let cache = QueryCache::new();

        let a = cache.get_or_compute("nothing a", compute(0)).unwrap();
        let b = cache.get_or_compute("nothing b", compute(0)).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.total_weight(), 0);
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = QueryCache::with_limits(WEIGHT_BUDGET, Duration::from_millis(20));

        cache.get_or_compute("fire", compute(3)).unwrap();
        std::thread::sleep(Duration::from_millis(40));

        let mut recomputed = false;
        let _: Result<_, Infallible> = cache.get_or_compute("fire", || {
            recomputed = true;
            Ok(results(3))
        });
        assert!(recomputed);
    }

    #[test]
    fn test_compute_error_is_not_cached() {
        let cache = QueryCache::new();

        let failed: Result<_, &str> = cache.get_or_compute("fire", || Err("scorer exploded"));
        assert!(failed.is_err());
        assert!(cache.is_empty());

        let ok: Result<_, &str> = cache.get_or_compute("fire", || Ok(results(1)));
        assert_eq!(ok.unwrap().len(), 1);
    }
}
