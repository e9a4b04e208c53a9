// src/extract/patterns.rs
// Regex-driven extractors: leaked subdomains, S3 bucket references and
// "linkfinder" path candidates inside JavaScript.
//
// The crawl engine only talks to the PatternSet trait, so the matching
// rules can be swapped without touching the scheduler.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::warn;

use super::decode::decode_chars;

static BUCKET: Lazy<Regex> = Lazy::new(|| {
    // One alternation so a single reference can't match twice
    Regex::new(concat!(
        r"(?i)(?:",
        r"[a-z0-9.\-_]+\.s3(?:[.\-][a-z0-9\-]+)?\.amazonaws\.com",
        r"|s3://[a-z0-9.\-_]+",
        r"|s3-[a-z0-9\-]+\.amazonaws\.com/[a-z0-9.\-_]+",
        r"|s3\.amazonaws\.com/[a-z0-9.\-_]+",
        r"|s3\.console\.aws\.amazon\.com/s3/buckets/[a-z0-9.\-_]+",
        r")"
    ))
    .unwrap()
});

static LINK_FINDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"(?:"|')("#,
        // full URLs and protocol-relative references
        r#"(?:(?:[a-zA-Z]{1,10}://|//)[^"'/]{1,}\.[a-zA-Z]{2,}[^"']{0,})"#,
        // absolute or dot-relative paths
        r#"|(?:(?:/|\.\./|\./)[^"'><,;| *()(%$^/\\\[\]][^"'><,;|()]{1,})"#,
        // relative paths ending in a short extension
        r#"|(?:[a-zA-Z0-9_\-/]{1,}/[a-zA-Z0-9_\-/]{1,}\.(?:[a-zA-Z]{1,4}|action)(?:[\?|#][^"|']{0,}|))"#,
        // relative REST-style paths
        r#"|(?:[a-zA-Z0-9_\-/]{1,}/[a-zA-Z0-9_\-/]{3,}(?:[\?|#][^"|']{0,}|))"#,
        // bare filenames with interesting extensions
        r#"|(?:[a-zA-Z0-9_\-]{1,}\.(?:php|asp|aspx|jsp|json|action|html|js|txt|xml)(?:[\?|#][^"|']{0,}|))"#,
        r#")(?:"|')"#
    ))
    .unwrap()
});

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\t\r\n]+").unwrap());

// Minified bundles are often one giant line; past this size we break them up
// so the quoted-string pattern has shorter lines to scan.
const LARGE_SCRIPT_BYTES: usize = 1_000_000;

/// Pattern-matching strategy behind the subdomain, bucket and script-path
/// extractors.
pub trait PatternSet: Send + Sync {
    /// Hostnames under `domain` mentioned anywhere in `body`.
    fn subdomains(&self, body: &str, domain: &str) -> Vec<String>;

    /// Cloud-storage bucket references.
    fn buckets(&self, body: &str) -> Vec<String>;

    /// Quoted strings in a script that look like URLs or paths.
    fn script_paths(&self, body: &str) -> Vec<String>;
}

/// The built-in rules.
#[derive(Debug, Default)]
pub struct DefaultPatterns {
    // One compiled subdomain pattern per target domain
    subdomain_patterns: DashMap<String, Regex>,
}

impl DefaultPatterns {
    pub fn new() -> Self {
        Self::default()
    }

    fn subdomain_pattern(&self, domain: &str) -> Option<Regex> {
        if let Some(pattern) = self.subdomain_patterns.get(domain) {
            return Some(pattern.clone());
        }

        let source = format!(
            r"(?i)(?:[a-z0-9](?:[a-z0-9\-]{{0,61}}[a-z0-9])?\.)+{}",
            regex::escape(domain)
        );
        match Regex::new(&source) {
            Ok(pattern) => {
                self.subdomain_patterns.insert(domain.to_string(), pattern.clone());
                Some(pattern)
            }
            Err(e) => {
                warn!("Failed to build subdomain pattern for {}: {}", domain, e);
                None
            }
        }
    }
}

impl PatternSet for DefaultPatterns {
    fn subdomains(&self, body: &str, domain: &str) -> Vec<String> {
        let Some(pattern) = self.subdomain_pattern(domain) else {
            return Vec::new();
        };

        let found = pattern.find_iter(body).filter_map(|m| {
            // "api.example.community" is not a subdomain of example.com
            let next = body[m.end()..].chars().next();
            if matches!(next, Some(c) if c.is_ascii_alphanumeric() || c == '-') {
                return None;
            }
            Some(m.as_str().trim_start_matches('.').to_lowercase())
        });
        unique(found)
    }

    fn buckets(&self, body: &str) -> Vec<String> {
        unique(BUCKET.find_iter(body).map(|m| m.as_str().to_string()))
    }

    fn script_paths(&self, body: &str) -> Vec<String> {
        let mut source = if body.len() > LARGE_SCRIPT_BYTES {
            body.replace(';', ";\r\n").replace(',', ",\r\n")
        } else {
            body.to_string()
        };
        source = decode_chars(&source);

        let found = LINK_FINDER
            .captures_iter(&source)
            .filter_map(|caps| caps.get(1))
            .map(|m| WHITESPACE_RUN.replace_all(m.as_str(), " ").trim().to_string())
            .filter(|path| !path.is_empty());
        unique(found)
    }
}

// Order-preserving dedup within one body; cross-page dedup is the engine's job
fn unique(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}

/// Every `<label>.<domain>` mentioned in `body`.
pub fn extract_subdomains(body: &str, domain: &str) -> Vec<String> {
    DefaultPatterns::new().subdomains(body, domain)
}

/// Every S3 bucket reference in `body`.
pub fn extract_bucket_names(body: &str) -> Vec<String> {
    DefaultPatterns::new().buckets(body)
}

/// Candidate URLs and paths quoted inside a script body.
pub fn extract_script_paths(script_body: &str) -> Vec<String> {
    DefaultPatterns::new().script_paths(script_body)
}
