// src/crawl/mod.rs
// =============================================================================
// This module handles the crawl itself.
//
// Submodules:
// - dedup: concurrent "seen before?" filters
// - scope: target domain matching and the URL denylist
// - normalize: relative reference resolution
// - client: the shared HTTP client and the fetch stage
// - frontier: frontier requests, schedulers and the per-domain throttle
// - engine: the run context that ties it all together
// =============================================================================

mod client;
mod dedup;
mod engine;
mod frontier;
mod normalize;
mod scope;

pub use client::{FetchOutcome, HttpClient};
pub use dedup::{DedupFilter, DedupSets};
pub use engine::{classify, CrawlStats, Crawler, StatusClass};
pub use frontier::{FrontierRequest, Origin, Rejection, Scheduler, Throttle, START_DEPTH};
pub use normalize::resolve;
pub use scope::{target_domain, Denylist, Scope};
