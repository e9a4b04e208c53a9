// src/crawl/dedup.rs
// =============================================================================
// A "have I seen this before?" filter that many tasks can hit at once.
//
// The crawler keeps one of these per discovery category (visited URLs,
// forms, upload forms, scripts, subdomains, buckets). Each one only ever
// grows during a run.
//
// Rust concepts:
// - DashSet: a HashSet split into shards, each behind its own lock
// - Interior mutability: check_and_mark takes &self, not &mut self
// =============================================================================

use dashmap::DashSet;

/// Concurrency-safe seen-set for one discovery category.
#[derive(Debug, Default)]
pub struct DedupFilter {
    seen: DashSet<String>,
}

impl DedupFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `key` was new, marking it seen in the same step.
    ///
    /// The insert holds the shard lock, so of N racing callers with the same
    /// key exactly one gets `true`.
    pub fn check_and_mark(&self, key: &str) -> bool {
        // contains() first so repeat sightings don't allocate a String
        if self.seen.contains(key) {
            return false;
        }
        self.seen.insert(key.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Event filters for one crawl run. Visited-URL filters live in each
/// Scheduler.
#[derive(Debug, Default)]
pub struct DedupSets {
    pub forms: DedupFilter,
    pub upload_forms: DedupFilter,
    pub assets: DedupFilter,
    pub subdomains: DedupFilter,
    pub buckets: DedupFilter,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_first_sighting_then_duplicate() {
        let filter = DedupFilter::new();
        assert!(filter.check_and_mark("https://example.com/"));
        assert!(!filter.check_and_mark("https://example.com/"));
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let filter = DedupFilter::new();
        assert!(filter.check_and_mark("a"));
        assert!(filter.check_and_mark("b"));
        assert!(!filter.check_and_mark("a"));
    }

    #[test]
    fn test_only_one_racer_wins() {
        let filter = Arc::new(DedupFilter::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let filter = filter.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .filter(|i| filter.check_and_mark(&format!("key-{}", i)))
                        .count()
                })
            })
            .collect();

        let wins: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(wins, 100);
        assert_eq!(filter.len(), 100);
    }
}
