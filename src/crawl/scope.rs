// src/crawl/scope.rs
// =============================================================================
// Decides which URLs the crawler is allowed to touch.
//
// Two separate questions:
// - Scope: is the host the target domain or one of its subdomains?
// - Denylist: is this a static asset (image, stylesheet, font) or something
//   the user blacklisted?
//
// The page crawler asks both. The asset collector only asks the second one,
// because scripts are often served from CDNs outside the target domain.
// =============================================================================

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::net::IpAddr;
use url::Url;

// Static formats nobody wants to spider. Matched against the whole URL so
// "style.css?v=3" is caught too.
const DISALLOWED_EXTENSIONS: &str =
    r"(?i)\.(jpg|jpeg|gif|css|tif|tiff|png|ttf|woff|woff2|ico)(?:\?|#|$)";

/// Works out the domain a seed URL is scoped to.
///
/// "www.example.com" scopes to "example.com" so sibling subdomains count as
/// in scope. IP addresses and single-label hosts ("localhost") are kept
/// as they are.
pub fn target_domain(seed: &Url) -> Result<String> {
    let host = seed
        .host_str()
        .ok_or_else(|| anyhow!("URL has no host: {}", seed))?
        .trim_end_matches('.')
        .to_lowercase();

    if host.is_empty() {
        return Err(anyhow!("URL has an empty host: {}", seed));
    }

    // IPv6 hosts come back bracketed from host_str()
    if host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>().is_ok() {
        return Ok(host);
    }

    match host.strip_prefix("www.") {
        Some(rest) if rest.contains('.') => Ok(rest.to_string()),
        _ => Ok(host),
    }
}

/// Target domain plus a compiled "equal to or subdomain of" matcher.
#[derive(Debug, Clone)]
pub struct Scope {
    domain: String,
    host_matcher: Regex,
}

impl Scope {
    pub fn new(domain: &str) -> Result<Self> {
        let domain = domain.trim().trim_end_matches('.').to_lowercase();
        if domain.is_empty() {
            return Err(anyhow!("Target domain is empty"));
        }

        // Anchored on both ends: "evil-example.com" and
        // "example.com.evil.net" must not match "example.com".
        let pattern = format!(r"^(?:[a-z0-9_-]+\.)*{}$", regex::escape(&domain));
        let host_matcher = Regex::new(&pattern)
            .with_context(|| format!("Failed to build scope matcher for {}", domain))?;

        Ok(Self { domain, host_matcher })
    }

    pub fn for_seed(seed: &Url) -> Result<Self> {
        Self::new(&target_domain(seed)?)
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn in_scope(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        match url.host_str() {
            Some(host) => self.host_matcher.is_match(&host.to_lowercase()),
            None => false,
        }
    }
}

/// Built-in static-asset filter plus the optional --blacklist pattern.
#[derive(Debug, Clone)]
pub struct Denylist {
    patterns: Vec<Regex>,
}

impl Denylist {
    pub fn new(user_pattern: Option<&str>) -> Result<Self> {
        let mut patterns = vec![Regex::new(DISALLOWED_EXTENSIONS)?];

        if let Some(pattern) = user_pattern.filter(|p| !p.is_empty()) {
            let compiled = Regex::new(pattern)
                .with_context(|| format!("Invalid blacklist pattern '{}'", pattern))?;
            patterns.push(compiled);
        }

        Ok(Self { patterns })
    }

    pub fn is_denied(&self, url: &Url) -> bool {
        let url = url.as_str();
        self.patterns.iter().any(|p| p.is_match(url))
    }
}
