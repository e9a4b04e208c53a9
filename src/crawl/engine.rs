// src/crawl/engine.rs
// =============================================================================
// The crawl engine: one run context, one frontier, two schedulers.
//
// How a run works:
// 1. The seed goes straight into the frontier (no scope check)
// 2. run() spawns a task per frontier request, bounded by the per-domain
//    throttle, until the frontier is empty and nothing is in flight
// 3. Each task goes fetch -> classify -> extract -> dispatch:
//    - pages: links go back to the page scheduler, scripts go to the asset
//      collector, forms/subdomains/buckets become events
//    - assets: quoted paths are resolved against the seed site and against
//      the script's own URL, and offered back to the page scheduler
// 4. Scripts and URLs mined from them start over at START_DEPTH; only page
//    links inherit their parent's depth + 1
// 5. Events name the URL a response came from after redirects
//
// Everything shared lives in RunContext behind an Arc. There is no global
// state, so two crawls in one process don't see each other.
// =============================================================================

use anyhow::{anyhow, Context, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

use super::client::{FetchOutcome, HttpClient};
use super::dedup::DedupSets;
use super::frontier::{FrontierRequest, Origin, Rejection, Scheduler, Throttle, START_DEPTH};
use super::normalize::resolve;
use super::scope::{Denylist, Scope};
use crate::config::CrawlOptions;
use crate::extract::{decode_chars, unminified, DefaultPatterns, HtmlSignals, PatternSet};
use crate::sink::{DiscoveryEvent, EventSink};

/// What a status code means for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx: extract and keep crawling
    Success,
    /// Any other code worth a [url] line
    Reported,
    /// 404, 429, 5xx and "no response" (< 100): expected noise, stay quiet
    Suppressed,
}

pub fn classify(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        404 | 429 => StatusClass::Suppressed,
        s if !(100..500).contains(&s) => StatusClass::Suppressed,
        _ => StatusClass::Reported,
    }
}

/// Counters returned when a run finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Pages that came back 2xx (errors and suppressed statuses not counted)
    pub pages_fetched: usize,
    /// Assets that came back 200 and were mined
    pub assets_fetched: usize,
}

struct RunContext {
    site: Url,
    scope: Arc<Scope>,
    client: HttpClient,
    pages: Scheduler,
    assets: Scheduler,
    seen: DedupSets,
    patterns: Arc<dyn PatternSet>,
    sink: Arc<dyn EventSink>,
    throttle: Throttle,
    queue: mpsc::UnboundedSender<FrontierRequest>,
    pages_fetched: AtomicUsize,
    assets_fetched: AtomicUsize,
}

/// A crawl of one seed URL, ready to run.
pub struct Crawler {
    ctx: Arc<RunContext>,
    frontier: mpsc::UnboundedReceiver<FrontierRequest>,
}

impl Crawler {
    pub fn new(seed: &str, options: &CrawlOptions, sink: Arc<dyn EventSink>) -> Result<Self> {
        Self::with_patterns(seed, options, sink, Arc::new(DefaultPatterns::new()))
    }

    /// Like [`Crawler::new`] with custom subdomain/bucket/script-path rules.
    pub fn with_patterns(
        seed: &str,
        options: &CrawlOptions,
        sink: Arc<dyn EventSink>,
        patterns: Arc<dyn PatternSet>,
    ) -> Result<Self> {
        let site = Url::parse(seed.trim()).map_err(|e| anyhow!("Invalid URL '{}': {}", seed, e))?;
        if !matches!(site.scheme(), "http" | "https") {
            return Err(anyhow!("Seed must be an http or https URL: {}", site));
        }

        let scope = Arc::new(Scope::for_seed(&site)?);
        let denylist = Arc::new(Denylist::new(options.blacklist_pattern.as_deref())?);
        let site_host = site.host_str().unwrap_or(scope.domain()).to_string();
        let client = HttpClient::new(options, &site_host)
            .with_context(|| format!("Failed to set up HTTP client for {}", site))?;

        let pages = Scheduler::new(
            Origin::Primary,
            Some(scope.clone()),
            denylist.clone(),
            options.max_depth,
        );
        let assets = Scheduler::new(Origin::Asset, None, denylist, options.max_depth);

        let (queue, frontier) = mpsc::unbounded_channel();
        let ctx = RunContext {
            site,
            scope,
            client,
            pages,
            assets,
            seen: DedupSets::default(),
            patterns,
            sink,
            throttle: Throttle::new(options.parallelism, options.delay, options.random_delay),
            queue,
            pages_fetched: AtomicUsize::new(0),
            assets_fetched: AtomicUsize::new(0),
        };

        Ok(Self {
            ctx: Arc::new(ctx),
            frontier,
        })
    }

    pub fn site(&self) -> &Url {
        &self.ctx.site
    }

    pub fn domain(&self) -> &str {
        self.ctx.scope.domain()
    }

    /// Crawls until the frontier is exhausted.
    pub async fn run(self) -> CrawlStats {
        let Crawler { ctx, mut frontier } = self;
        info!("Crawling site: {} (scope: {})", ctx.site, ctx.scope.domain());

        let mut in_flight = JoinSet::new();
        let seed = ctx.pages.admit_seed(ctx.site.clone());
        in_flight.spawn(ctx.clone().process(seed));

        loop {
            while let Ok(request) = frontier.try_recv() {
                in_flight.spawn(ctx.clone().process(request));
            }
            // Children are queued before their parent task finishes, so an
            // empty queue with nothing in flight means we're done.
            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                Some(request) = frontier.recv() => {
                    in_flight.spawn(ctx.clone().process(request));
                }
                Some(joined) = in_flight.join_next() => {
                    if let Err(e) = joined {
                        warn!("Fetch task failed: {}", e);
                    }
                }
                else => break,
            }
        }

        let stats = CrawlStats {
            pages_fetched: ctx.pages_fetched.load(Ordering::Relaxed),
            assets_fetched: ctx.assets_fetched.load(Ordering::Relaxed),
        };
        info!(
            "Finished {}: {} page(s), {} asset(s)",
            ctx.site, stats.pages_fetched, stats.assets_fetched
        );
        stats
    }
}

impl RunContext {
    async fn process(self: Arc<Self>, request: FrontierRequest) {
        let domain = self.throttle_domain(&request.url);
        let _permit = self.throttle.acquire(&domain).await;

        debug!("Fetching [depth {}] {}", request.depth, request.url);
        let outcome = self.client.fetch(&request.url, request.referer.as_ref()).await;

        match request.origin {
            Origin::Primary => self.on_page(&request, outcome),
            Origin::Asset => self.on_asset(&request, outcome),
        }

        // Still holding the permit: this is the gap before the next dispatch
        self.throttle.pause().await;
    }

    // In-scope hosts share the target domain's budget; CDNs get their own
    fn throttle_domain(&self, url: &Url) -> String {
        if self.scope.in_scope(url) {
            self.scope.domain().to_string()
        } else {
            url.host_str().unwrap_or_default().to_lowercase()
        }
    }

    fn on_page(&self, request: &FrontierRequest, outcome: FetchOutcome) {
        let (status, final_url, body) = match outcome {
            FetchOutcome::Response {
                status,
                final_url,
                body,
            } => (status, final_url, body),
            FetchOutcome::Failed { error } => {
                debug!("Error request: {} - {}", request.url, error);
                return;
            }
        };

        // Events and dedup keys use where the redirects ended up
        if final_url != request.url {
            self.pages.mark_visited(&final_url);
        }
        let page = final_url.as_str();

        match classify(status) {
            StatusClass::Success => {}
            StatusClass::Reported => {
                self.emit(DiscoveryEvent::url(page, status, None));
                return;
            }
            StatusClass::Suppressed => {
                debug!("Suppressed status {} for {}", status, page);
                return;
            }
        }
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);

        let decoded = decode_chars(&body);
        self.mine_leaks(page, &decoded);
        self.emit(DiscoveryEvent::url(page, status, Some(decoded.len())));

        let signals = HtmlSignals::parse(&body);
        self.dispatch_page(request.depth + 1, &final_url, &signals);
    }

    fn dispatch_page(&self, child_depth: usize, page_url: &Url, signals: &HtmlSignals) {
        let page = page_url.as_str();

        for href in &signals.hyperlinks {
            if let Some(url) = resolve(href, page_url) {
                self.submit(Origin::Primary, url, child_depth, page_url);
            }
        }

        if signals.has_form() && self.seen.forms.check_and_mark(page) {
            self.emit(DiscoveryEvent::form(page));
        }

        if signals.has_upload && self.seen.upload_forms.check_and_mark(page) {
            self.emit(DiscoveryEvent::upload_form(page));
        }

        // Scripts are fresh requests, not children of the page
        for src in &signals.asset_refs {
            let Some(asset) = resolve(src, page_url) else {
                continue;
            };
            if !self.seen.assets.check_and_mark(asset.as_str()) {
                continue;
            }
            self.emit(DiscoveryEvent::asset(page, asset.as_str()));

            // Try the unminified source too, it mines far better
            if let Some(original) = unminified(asset.as_str()).and_then(|u| Url::parse(&u).ok()) {
                self.submit(Origin::Asset, original, START_DEPTH, page_url);
            }
            self.submit(Origin::Asset, asset, START_DEPTH, page_url);
        }
    }

    fn on_asset(&self, request: &FrontierRequest, outcome: FetchOutcome) {
        let (final_url, body) = match outcome {
            FetchOutcome::Response {
                status: 200,
                final_url,
                body,
            } => (final_url, body),
            other => {
                debug!("Skipping asset {} (status {})", request.url, other.status());
                return;
            }
        };
        self.assets_fetched.fetch_add(1, Ordering::Relaxed);

        if final_url != request.url {
            self.assets.mark_visited(&final_url);
        }
        let asset = final_url.as_str();

        self.mine_leaks(asset, &decode_chars(&body));

        for path in self.patterns.script_paths(&body) {
            self.emit(DiscoveryEvent::extracted_link(asset, &path));

            // Once against the seed site, once against where the script lives.
            // The page scheduler's scope check filters both.
            if let Some(url) = resolve(&path, &self.site) {
                self.submit(Origin::Primary, url, START_DEPTH, &final_url);
            }
            if let Some(url) = resolve(&path, &final_url) {
                self.submit(Origin::Primary, url, START_DEPTH, &final_url);
            }
        }
    }

    fn mine_leaks(&self, source: &str, body: &str) {
        for subdomain in self.patterns.subdomains(body, self.scope.domain()) {
            if self.seen.subdomains.check_and_mark(&subdomain) {
                self.emit(DiscoveryEvent::subdomain(source, &subdomain));
            }
        }

        for bucket in self.patterns.buckets(body) {
            if self.seen.buckets.check_and_mark(&bucket) {
                self.emit(DiscoveryEvent::bucket(source, &bucket));
            }
        }
    }

    fn submit(&self, origin: Origin, url: Url, depth: usize, referer: &Url) {
        let scheduler = match origin {
            Origin::Primary => &self.pages,
            Origin::Asset => &self.assets,
        };

        match scheduler.admit(url, depth, Some(referer)) {
            Ok(request) => {
                if self.queue.send(request).is_err() {
                    debug!("Frontier closed, dropping request");
                }
            }
            Err(Rejection::AlreadySeen) => {}
            Err(reason) => debug!("Not queued ({:?}) from {}", reason, referer),
        }
    }

    fn emit(&self, event: DiscoveryEvent) {
        self.sink.emit(&event);
    }
}
