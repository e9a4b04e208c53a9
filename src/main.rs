// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (stderr) so stdout carries only discovery events
// 3. Build the crawl options once, then crawl each seed
// 4. Exit with proper code (0 = success, 1 = configuration error)
//
// Rust concepts used:
// - async/await: every fetch is a network request
// - buffer_unordered: crawl several seeds at once without spawning them all
// - Arc<dyn EventSink>: one sink shared by every fetch task
// =============================================================================

mod cli;

use anyhow::{anyhow, Result};
use clap::Parser;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

use cli::Cli;
use scope_spider::config::CrawlOptions;
use scope_spider::sink::{EventSink, FileSink, OutputFormat, StdoutSink, TeeSink};
use scope_spider::Crawler;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_filter());

    let seeds = cli.seeds()?;
    if seeds.is_empty() {
        info!("No sites to crawl");
        return Ok(());
    }
    let options = cli.crawl_options()?;

    // Build every crawler up front: a bad seed or option stops us before
    // the first request goes out.
    let format = if cli.json { OutputFormat::Json } else { OutputFormat::Text };
    let stdout: Arc<dyn EventSink> = Arc::new(StdoutSink::new(format));
    let crawlers = seeds
        .iter()
        .map(|seed| build_crawler(seed, &options, &cli, stdout.clone(), format))
        .collect::<Result<Vec<_>>>()?;

    stream::iter(crawlers)
        .map(|crawler| crawler.run())
        .buffer_unordered(cli.threads.max(1))
        .collect::<Vec<_>>()
        .await;

    Ok(())
}

fn build_crawler(
    seed: &str,
    options: &CrawlOptions,
    cli: &Cli,
    stdout: Arc<dyn EventSink>,
    format: OutputFormat,
) -> Result<Crawler> {
    let Some(folder) = &cli.output else {
        return Crawler::new(seed, options, stdout);
    };

    // The output file is named after the seed's host
    let site = Url::parse(seed.trim()).map_err(|e| anyhow!("Invalid URL '{}': {}", seed, e))?;
    let host = site
        .host_str()
        .ok_or_else(|| anyhow!("URL has no host: {}", site))?;
    let file: Arc<dyn EventSink> = Arc::new(FileSink::create(folder, host, format)?);

    let sink: Arc<dyn EventSink> = Arc::new(TeeSink::new().with(stdout).with(file));
    Crawler::new(seed, options, sink)
}

fn init_logging(default_filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
