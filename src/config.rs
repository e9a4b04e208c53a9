// src/config.rs
// =============================================================================
// The immutable options record one crawl run is built from.
//
// The CLI (src/cli.rs) fills this in, but nothing here knows about clap, so
// library users and tests can build options directly.
//
// Also here:
// - "Name: value" header parsing
// - importing headers and cookies from a raw HTTP request file (the kind you
//   save from an intercepting proxy like Burp)
// - reading a seed list file
// - user agent selection
// =============================================================================

use anyhow::{anyhow, Context, Result};
use rand::seq::SliceRandom;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const DESKTOP_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];

const MOBILE_AGENTS: &[&str] = &[
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 13; SM-S911B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (iPad; CPU OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Android 14; Mobile; rv:125.0) Gecko/125.0 Firefox/125.0",
];

/// How the User-Agent header is chosen for each request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UserAgentMode {
    /// A random desktop browser per request ("web")
    #[default]
    RandomDesktop,
    /// A random mobile browser per request ("mobi")
    RandomMobile,
    Fixed(String),
}

impl UserAgentMode {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "web" => UserAgentMode::RandomDesktop,
            "mobi" => UserAgentMode::RandomMobile,
            _ => UserAgentMode::Fixed(value.to_string()),
        }
    }

    pub fn pick(&self) -> &str {
        let pool = match self {
            UserAgentMode::Fixed(agent) => return agent,
            UserAgentMode::RandomDesktop => DESKTOP_AGENTS,
            UserAgentMode::RandomMobile => MOBILE_AGENTS,
        };
        pool.choose(&mut rand::thread_rng()).copied().unwrap_or(DESKTOP_AGENTS[0])
    }
}

/// Everything a crawl run needs besides the seed URL.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Deepest hop to fetch. The seed is depth 1; 0 means no limit.
    pub max_depth: usize,
    /// Concurrent fetches per target domain
    pub parallelism: usize,
    /// Fixed pause after each fetch, per domain
    pub delay: Duration,
    /// Upper bound of the random extra pause added to `delay`
    pub random_delay: Duration,
    pub request_timeout: Duration,
    /// Refuse redirects that leave the target host
    pub no_redirect: bool,
    pub proxy_url: Option<String>,
    pub extra_headers: Vec<(String, String)>,
    pub cookie: Option<String>,
    pub user_agent: UserAgentMode,
    pub blacklist_pattern: Option<String>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_depth: 1,
            parallelism: 5,
            delay: Duration::ZERO,
            random_delay: Duration::ZERO,
            request_timeout: DEFAULT_TIMEOUT,
            no_redirect: false,
            proxy_url: None,
            extra_headers: Vec::new(),
            cookie: None,
            user_agent: UserAgentMode::default(),
            blacklist_pattern: None,
        }
    }
}

impl CrawlOptions {
    /// Builds the timeout from the CLI's seconds value. 0 falls back to the
    /// 10 second default.
    pub fn timeout_from_secs(secs: u64) -> Duration {
        if secs == 0 {
            info!("Timeout of 0 given, using {} seconds", DEFAULT_TIMEOUT.as_secs());
            DEFAULT_TIMEOUT
        } else {
            Duration::from_secs(secs)
        }
    }

    /// Replaces headers and cookie with the ones from a raw request.
    pub fn apply_raw_request(&mut self, raw: RawRequest) {
        self.extra_headers = raw.headers;
        self.cookie = raw.cookie;
    }
}

/// Parses a "Name: value" header. Whitespace around both parts is trimmed.
pub fn parse_header(header: &str) -> Result<(String, String)> {
    let (name, value) = header
        .split_once(':')
        .ok_or_else(|| anyhow!("Invalid header '{}', expected 'Name: value'", header))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("Invalid header '{}', name is empty", header));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Headers and cookie lifted from a saved HTTP request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRequest {
    pub headers: Vec<(String, String)>,
    pub cookie: Option<String>,
}

// Per-connection headers that must come from our own client, not the file
const SKIPPED_RAW_HEADERS: [&str; 4] = ["host", "content-length", "connection", "accept-encoding"];

impl RawRequest {
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();

        let request_line = lines
            .by_ref()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| anyhow!("Raw request is empty"))?;
        if request_line.split_whitespace().count() < 2 {
            return Err(anyhow!("Invalid request line '{}'", request_line));
        }

        let mut request = RawRequest::default();
        for line in lines.take_while(|line| !line.trim().is_empty()) {
            let (name, value) = parse_header(line)?;
            let lowered = name.to_lowercase();
            if lowered == "cookie" {
                request.cookie = Some(value);
            } else if !SKIPPED_RAW_HEADERS.contains(&lowered.as_str()) {
                request.headers.push((name, value));
            }
        }
        Ok(request)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to open raw request file {}", path.display()))?;
        Self::parse(&text)
            .with_context(|| format!("Failed to parse raw request in {}", path.display()))
    }
}

/// Reads one seed URL per line, skipping blanks and # comments.
pub fn read_seed_list(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed list {}", path.display()))?;

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_modes() {
        assert_eq!(UserAgentMode::parse("web"), UserAgentMode::RandomDesktop);
        assert_eq!(UserAgentMode::parse("MOBI"), UserAgentMode::RandomMobile);
        assert_eq!(
            UserAgentMode::parse("my-agent/1.0"),
            UserAgentMode::Fixed("my-agent/1.0".to_string())
        );

        assert_eq!(UserAgentMode::Fixed("x".to_string()).pick(), "x");
        assert!(MOBILE_AGENTS.contains(&UserAgentMode::RandomMobile.pick()));
        assert!(DESKTOP_AGENTS.contains(&UserAgentMode::RandomDesktop.pick()));
    }

    #[test]
    fn test_zero_timeout_uses_default() {
        assert_eq!(CrawlOptions::timeout_from_secs(0), DEFAULT_TIMEOUT);
        assert_eq!(CrawlOptions::timeout_from_secs(3), Duration::from_secs(3));
    }

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header(" X-Api-Key :  abc:def ").unwrap(),
            ("X-Api-Key".to_string(), "abc:def".to_string())
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_parse_raw_request() {
        let raw = "GET /account HTTP/1.1\r\n\
                   Host: example.com\r\n\
                   Authorization: Bearer t0ken\r\n\
                   Cookie: session=abc; theme=dark\r\n\
                   Content-Length: 0\r\n\
                   \r\n\
                   ignored body: yes\r\n";
        let request = RawRequest::parse(raw).unwrap();
        assert_eq!(
            request.headers,
            vec![("Authorization".to_string(), "Bearer t0ken".to_string())]
        );
        assert_eq!(request.cookie.as_deref(), Some("session=abc; theme=dark"));

        let mut options = CrawlOptions {
            extra_headers: vec![("X-Old".to_string(), "1".to_string())],
            ..CrawlOptions::default()
        };
        options.apply_raw_request(request);
        assert_eq!(options.extra_headers.len(), 1);
        assert_eq!(options.extra_headers[0].0, "Authorization");
    }

    #[test]
    fn test_raw_request_errors() {
        assert!(RawRequest::parse("").is_err());
        assert!(RawRequest::parse("GARBAGE").is_err());
        assert!(RawRequest::load(Path::new("/definitely/not/here.txt")).is_err());
    }

    #[test]
    fn test_read_seed_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seeds.txt");
        fs::write(&path, "https://a.example.com\n\n# comment\n  https://b.example.com  \n").unwrap();
        assert_eq!(
            read_seed_list(&path).unwrap(),
            vec!["https://a.example.com", "https://b.example.com"]
        );
    }
}
