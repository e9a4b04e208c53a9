// src/crawl/normalize.rs
// =============================================================================
// Turns raw href/src/script strings into absolute, fetchable URLs.
//
// What gets dropped (returns None, never an error):
// - empty strings and bare fragments ("#top")
// - javascript:, mailto:, tel: and data: references
// - anything that doesn't resolve to http or https
// - anything the url crate can't parse
//
// Fragments are stripped so "/page#a" and "/page#b" dedup to one URL.
// =============================================================================

use url::Url;

const IGNORED_PREFIXES: [&str; 4] = ["javascript:", "mailto:", "tel:", "data:"];

/// Resolves `reference` against `base` the way a browser would.
///
/// Examples:
///   resolve("/a/b", "https://example.com/x/")        -> https://example.com/a/b
///   resolve("https://other.com/c", any base)          -> https://other.com/c
///   resolve("javascript:void(0)", any base)           -> None
pub fn resolve(reference: &str, base: &Url) -> Option<Url> {
    let reference = reference.trim();

    if reference.is_empty() || reference.starts_with('#') {
        return None;
    }

    let lowered = reference.to_ascii_lowercase();
    if IGNORED_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return None;
    }

    // join() handles absolute references too: they replace the base entirely
    let mut url = base.join(reference).ok()?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }

    url.set_fragment(None);
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_resolve_root_relative() {
        let url = resolve("/a/b", &base("https://example.com/x/")).unwrap();
        assert_eq!(url.as_str(), "https://example.com/a/b");
    }

    #[test]
    fn test_resolve_path_relative() {
        let url = resolve("../about", &base("https://example.com/docs/page/")).unwrap();
        assert_eq!(url.as_str(), "https://example.com/docs/about");
    }

    #[test]
    fn test_absolute_is_not_rebased() {
        let url = resolve("https://other.com/c", &base("https://example.com/")).unwrap();
        assert_eq!(url.as_str(), "https://other.com/c");
    }

    #[test]
    fn test_protocol_relative() {
        let url = resolve("//cdn.example.net/app.js", &base("https://example.com/")).unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.net/app.js");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let b = base("https://example.com/x/");
        let once = resolve("page?q=1#frag", &b).unwrap();
        let twice = resolve(once.as_str(), &base("https://elsewhere.org/")).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.as_str(), "https://example.com/x/page?q=1");
    }

    #[test]
    fn test_skip_pseudo_schemes() {
        let b = base("https://example.com/");
        assert_eq!(resolve("javascript:void(0)", &b), None);
        assert_eq!(resolve("JavaScript:alert(1)", &b), None);
        assert_eq!(resolve("mailto:test@example.com", &b), None);
        assert_eq!(resolve("tel:+100000", &b), None);
        assert_eq!(resolve("data:text/plain,hi", &b), None);
    }

    #[test]
    fn test_skip_empty_and_fragment() {
        let b = base("https://example.com/");
        assert_eq!(resolve("", &b), None);
        assert_eq!(resolve("   ", &b), None);
        assert_eq!(resolve("#section", &b), None);
    }

    #[test]
    fn test_non_http_scheme_dropped() {
        assert_eq!(resolve("ftp://example.com/file", &base("https://example.com/")), None);
    }
}
