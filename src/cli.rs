// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API: the Cli struct below IS the argument list, and
// clap generates the parser, --help and --version from it.
//
// Durations are whole seconds on the command line and become
// std::time::Duration in CrawlOptions.
// =============================================================================

use anyhow::Result;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use std::time::Duration;

use scope_spider::config::{self, CrawlOptions, RawRequest, UserAgentMode};

#[derive(Parser, Debug)]
#[command(
    name = "scope-spider",
    version = "0.1.0",
    about = "Crawl a domain and mine it for links, forms, scripts, subdomains and S3 buckets",
    long_about = "scope-spider crawls a site without leaving its domain (subdomains included). \
                  Every page is mined for links, forms, upload forms and scripts; every script \
                  is mined for more paths, which are fed back into the crawl."
)]
#[command(group(ArgGroup::new("seeds").required(true).multiple(true).args(["site", "sites"])))]
pub struct Cli {
    /// Site to crawl (e.g. https://example.com)
    #[arg(short = 's', long)]
    pub site: Option<String>,

    /// File with one site per line
    #[arg(short = 'S', long)]
    pub sites: Option<PathBuf>,

    /// Maximum crawl depth (the seed is depth 1, 0 = no limit)
    #[arg(short = 'd', long, default_value_t = 1)]
    pub depth: usize,

    /// Concurrent requests per domain
    #[arg(short = 'c', long, default_value_t = 5)]
    pub concurrent: usize,

    /// Delay in seconds after each request to a domain
    #[arg(short = 'k', long, default_value_t = 0)]
    pub delay: u64,

    /// Extra random delay in seconds, added on top of --delay
    #[arg(short = 'K', long, default_value_t = 0)]
    pub random_delay: u64,

    /// Request timeout in seconds (0 = default of 10)
    #[arg(short = 'm', long, default_value_t = 10)]
    pub timeout: u64,

    /// Only follow redirects that stay on the target host
    #[arg(long)]
    pub no_redirect: bool,

    /// Proxy URL (http://, https:// or socks5://)
    #[arg(short = 'p', long)]
    pub proxy: Option<String>,

    /// Extra header, "Name: value" (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Cookie header value
    #[arg(long)]
    pub cookie: Option<String>,

    /// Raw HTTP request file to take headers and cookie from
    ///
    /// Overrides --header and --cookie.
    #[arg(long)]
    pub burp: Option<PathBuf>,

    /// User agent: "web" (random desktop), "mobi" (random mobile) or a literal string
    #[arg(short = 'u', long, default_value = "web")]
    pub user_agent: String,

    /// Regex of URLs never to request
    #[arg(long)]
    pub blacklist: Option<String>,

    /// Folder to also write results to, one file per site
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Number of sites crawled at the same time (with --sites)
    #[arg(short = 't', long, default_value_t = 1)]
    pub threads: usize,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Debug logging
    #[arg(short = 'v', long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Cli {
    /// Seeds from --site and/or --sites, in that order.
    pub fn seeds(&self) -> Result<Vec<String>> {
        let mut seeds = Vec::new();
        if let Some(site) = &self.site {
            seeds.push(site.clone());
        }
        if let Some(path) = &self.sites {
            seeds.extend(config::read_seed_list(path)?);
        }
        Ok(seeds)
    }

    pub fn crawl_options(&self) -> Result<CrawlOptions> {
        let mut options = CrawlOptions {
            max_depth: self.depth,
            parallelism: self.concurrent,
            delay: Duration::from_secs(self.delay),
            random_delay: Duration::from_secs(self.random_delay),
            request_timeout: CrawlOptions::timeout_from_secs(self.timeout),
            no_redirect: self.no_redirect,
            proxy_url: self.proxy.clone(),
            extra_headers: self
                .headers
                .iter()
                .map(|h| config::parse_header(h))
                .collect::<Result<_>>()?,
            cookie: self.cookie.clone(),
            user_agent: UserAgentMode::parse(&self.user_agent),
            blacklist_pattern: self.blacklist.clone(),
        };

        if let Some(path) = &self.burp {
            options.apply_raw_request(RawRequest::load(path)?);
        }
        Ok(options)
    }

    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "scope_spider=debug"
        } else if self.quiet {
            "scope_spider=warn"
        } else {
            "scope_spider=info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["scope-spider", "-s", "https://example.com"]).unwrap();
        let options = cli.crawl_options().unwrap();
        assert_eq!(options.max_depth, 1);
        assert_eq!(options.parallelism, 5);
        assert_eq!(options.request_timeout, Duration::from_secs(10));
        assert_eq!(options.user_agent, UserAgentMode::RandomDesktop);
        assert_eq!(cli.seeds().unwrap(), vec!["https://example.com"]);
        assert_eq!(cli.log_filter(), "scope_spider=info");
    }

    #[test]
    fn test_seed_is_required() {
        assert!(Cli::try_parse_from(["scope-spider", "-d", "2"]).is_err());
    }

    #[test]
    fn test_flags_map_to_options() {
        let cli = Cli::try_parse_from([
            "scope-spider",
            "--site",
            "https://example.com",
            "-d",
            "3",
            "-c",
            "10",
            "-k",
            "1",
            "-K",
            "2",
            "-m",
            "0",
            "--no-redirect",
            "-H",
            "X-Test: yes",
            "-H",
            "Accept: */*",
            "-u",
            "mobi",
            "--blacklist",
            "logout",
            "-v",
        ])
        .unwrap();

        let options = cli.crawl_options().unwrap();
        assert_eq!(options.max_depth, 3);
        assert_eq!(options.parallelism, 10);
        assert_eq!(options.delay, Duration::from_secs(1));
        assert_eq!(options.random_delay, Duration::from_secs(2));
        assert_eq!(options.request_timeout, Duration::from_secs(10));
        assert!(options.no_redirect);
        assert_eq!(options.extra_headers.len(), 2);
        assert_eq!(options.user_agent, UserAgentMode::RandomMobile);
        assert_eq!(options.blacklist_pattern.as_deref(), Some("logout"));
        assert_eq!(cli.log_filter(), "scope_spider=debug");
    }

    #[test]
    fn test_bad_header_rejected() {
        let cli = Cli::try_parse_from(["scope-spider", "-s", "https://example.com", "-H", "oops"]).unwrap();
        assert!(cli.crawl_options().is_err());
    }
}
