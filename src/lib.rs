// src/lib.rs
// =============================================================================
// scope-spider: a web spider that stays inside one domain.
//
// Give it a seed URL and it maps the site: pages, forms, upload forms and
// scripts, plus subdomains and S3 buckets leaked in response bodies. Script
// bodies are mined for more paths, which feed back into the crawl.
//
// Modules:
// - config: the options record and its file-based inputs
// - crawl: scope, dedup, frontier and the engine
// - extract: HTML and pattern extractors
// - sink: discovery events and where they're written
// =============================================================================

pub mod config;
pub mod crawl;
pub mod extract;
pub mod sink;

pub use config::CrawlOptions;
pub use crawl::{CrawlStats, Crawler};
pub use sink::{Category, DiscoveryEvent, EventSink};
