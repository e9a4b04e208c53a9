// src/crawl/frontier.rs
// =============================================================================
// Frontier requests and the gate every discovered URL passes through before
// it's queued.
//
// There are two schedulers per run, both of this one type:
// - the page scheduler has a Scope, so it stays inside the target domain
// - the asset collector has none, so it can pull scripts from any CDN
// Both honour the denylist, the depth bound and their own visited set.
// Scripts, and the URLs mined out of them, are fresh requests at
// START_DEPTH, so page depth never keeps a script from being fetched.
//
// Rust concepts:
// - Option<Arc<Scope>>: "no scope" is a value, not a second struct
// - DashMap of Semaphores: one concurrency budget per domain
// =============================================================================

use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;
use url::Url;

use super::dedup::DedupFilter;
use super::scope::{Denylist, Scope};

/// Depth of the seed and of every fresh request (assets, mined URLs).
pub const START_DEPTH: usize = 1;

/// Which scheduler a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Page crawler: scope-restricted, runs the HTML extractors
    Primary,
    /// Asset collector: any host, runs the script-path extractor
    Asset,
}

/// One queued fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierRequest {
    pub url: Url,
    /// Hops from the seed; the seed is 1
    pub depth: usize,
    pub origin: Origin,
    /// The page or script this URL was found on
    pub referer: Option<Url>,
}

/// Why a URL didn't make it into the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TooDeep,
    OutOfScope,
    Denied,
    AlreadySeen,
}

/// Admission gate for one origin.
#[derive(Debug)]
pub struct Scheduler {
    origin: Origin,
    scope: Option<Arc<Scope>>,
    denylist: Arc<Denylist>,
    max_depth: usize,
    visited: DedupFilter,
}

impl Scheduler {
    /// `scope: None` builds an unrestricted scheduler. `max_depth: 0` means
    /// no depth limit.
    pub fn new(
        origin: Origin,
        scope: Option<Arc<Scope>>,
        denylist: Arc<Denylist>,
        max_depth: usize,
    ) -> Self {
        Self {
            origin,
            scope,
            denylist,
            max_depth,
            visited: DedupFilter::new(),
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn is_restricted(&self) -> bool {
        self.scope.is_some()
    }

    /// Runs depth, scope, denylist and dedup checks, in that order.
    ///
    /// Dedup goes last so a URL rejected for another reason never burns its
    /// visited key.
    pub fn admit(
        &self,
        url: Url,
        depth: usize,
        referer: Option<&Url>,
    ) -> Result<FrontierRequest, Rejection> {
        if self.max_depth > 0 && depth > self.max_depth {
            return Err(Rejection::TooDeep);
        }
        if let Some(scope) = &self.scope {
            if !scope.in_scope(&url) {
                return Err(Rejection::OutOfScope);
            }
        }
        if self.denylist.is_denied(&url) {
            return Err(Rejection::Denied);
        }
        if !self.visited.check_and_mark(url.as_str()) {
            return Err(Rejection::AlreadySeen);
        }

        Ok(FrontierRequest {
            url,
            depth,
            origin: self.origin,
            referer: referer.cloned(),
        })
    }

    /// The seed skips every check except being marked visited.
    pub fn admit_seed(&self, url: Url) -> FrontierRequest {
        self.visited.check_and_mark(url.as_str());
        FrontierRequest {
            url,
            depth: START_DEPTH,
            origin: self.origin,
            referer: None,
        }
    }

    /// Marks a URL reached some other way (a followed redirect) as visited.
    /// Returns `true` if it hadn't been seen.
    pub fn mark_visited(&self, url: &Url) -> bool {
        self.visited.check_and_mark(url.as_str())
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

/// Per-domain parallelism plus the politeness pause between dispatches.
#[derive(Debug)]
pub struct Throttle {
    parallelism: usize,
    delay: Duration,
    random_delay: Duration,
    domains: DashMap<String, Arc<Semaphore>>,
}

impl Throttle {
    pub fn new(parallelism: usize, delay: Duration, random_delay: Duration) -> Self {
        Self {
            parallelism: parallelism.max(1),
            delay,
            random_delay,
            domains: DashMap::new(),
        }
    }

    /// Waits for a free slot for `domain`. Hold the permit through the fetch
    /// and the pause that follows it.
    pub async fn acquire(&self, domain: &str) -> Option<OwnedSemaphorePermit> {
        let semaphore = self
            .domains
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.parallelism)))
            .clone();
        // Only fails if the semaphore is closed, which we never do
        semaphore.acquire_owned().await.ok()
    }

    /// The delay plus a random slice of random_delay.
    pub fn next_pause(&self) -> Duration {
        let jitter_ms = self.random_delay.as_millis() as u64;
        let jitter = if jitter_ms > 0 {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        } else {
            Duration::ZERO
        };
        self.delay + jitter
    }

    pub async fn pause(&self) {
        let pause = self.next_pause();
        if !pause.is_zero() {
            debug!("Politeness pause: {:?}", pause);
            tokio::time::sleep(pause).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn primary(max_depth: usize) -> Scheduler {
        Scheduler::new(
            Origin::Primary,
            Some(Arc::new(Scope::new("example.com").unwrap())),
            Arc::new(Denylist::new(None).unwrap()),
            max_depth,
        )
    }

    #[test]
    fn test_admit_in_scope_once() {
        let scheduler = primary(3);
        let first = scheduler.admit(url("https://example.com/a"), 2, None).unwrap();
        assert_eq!(first.depth, 2);
        assert_eq!(first.origin, Origin::Primary);
        assert_eq!(
            scheduler.admit(url("https://example.com/a"), 2, None),
            Err(Rejection::AlreadySeen)
        );
    }

    #[test]
    fn test_depth_bound() {
        let scheduler = primary(2);
        assert_eq!(
            scheduler.admit(url("https://example.com/deep"), 3, None),
            Err(Rejection::TooDeep)
        );
        // A too-deep sighting doesn't use up the visited key
        assert!(scheduler.admit(url("https://example.com/deep"), 2, None).is_ok());
    }

    #[test]
    fn test_zero_depth_is_unlimited() {
        let scheduler = primary(0);
        assert!(scheduler.admit(url("https://example.com/x"), 500, None).is_ok());
    }

    #[test]
    fn test_scope_and_denylist() {
        let scheduler = primary(0);
        assert_eq!(
            scheduler.admit(url("https://other.com/"), 1, None),
            Err(Rejection::OutOfScope)
        );
        assert_eq!(
            scheduler.admit(url("https://example.com/logo.png"), 1, None),
            Err(Rejection::Denied)
        );
    }

    #[test]
    fn test_unrestricted_scheduler_still_denies() {
        let assets = Scheduler::new(
            Origin::Asset,
            None,
            Arc::new(Denylist::new(None).unwrap()),
            0,
        );
        assert!(!assets.is_restricted());
        assert!(assets.admit(url("https://cdn.other.net/app.js"), 2, None).is_ok());
        assert_eq!(
            assets.admit(url("https://cdn.other.net/app.css"), 2, None),
            Err(Rejection::Denied)
        );
    }

    #[test]
    fn test_seed_skips_scope() {
        let scheduler = primary(1);
        let seed = scheduler.admit_seed(url("https://elsewhere.org/"));
        assert_eq!(seed.depth, 1);
        assert_eq!(scheduler.visited_count(), 1);
    }

    #[test]
    fn test_redirect_target_marked_visited() {
        let scheduler = primary(0);
        assert!(scheduler.mark_visited(&url("https://example.com/moved")));
        assert!(!scheduler.mark_visited(&url("https://example.com/moved")));
        assert_eq!(
            scheduler.admit(url("https://example.com/moved"), 2, None),
            Err(Rejection::AlreadySeen)
        );
    }

    #[test]
    fn test_referer_carried() {
        let scheduler = primary(0);
        let parent = url("https://example.com/");
        let request = scheduler.admit(url("https://example.com/child"), 2, Some(&parent)).unwrap();
        assert_eq!(request.referer, Some(parent));
    }

    #[test]
    fn test_pause_within_bounds() {
        let throttle = Throttle::new(2, Duration::from_millis(100), Duration::from_millis(50));
        for _ in 0..20 {
            let pause = throttle.next_pause();
            assert!(pause >= Duration::from_millis(100));
            assert!(pause <= Duration::from_millis(150));
        }
        assert_eq!(Throttle::new(1, Duration::ZERO, Duration::ZERO).next_pause(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_parallelism_per_domain() {
        let throttle = Throttle::new(1, Duration::ZERO, Duration::ZERO);
        let held = throttle.acquire("example.com").await.unwrap();

        // Another domain has its own budget
        assert!(throttle.acquire("other.net").await.is_some());

        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            throttle.acquire("example.com"),
        )
        .await;
        assert!(blocked.is_err());

        drop(held);
        assert!(throttle.acquire("example.com").await.is_some());
    }
}
