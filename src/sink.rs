// src/sink.rs
// =============================================================================
// Discovery events and the places they get written to.
//
// Every finding the crawler makes (a live URL, a form, a script, a leaked
// subdomain...) becomes one DiscoveryEvent. The engine hands events to an
// EventSink and forgets about them. Sinks never fail the crawl: write errors
// are logged and the event is dropped.
//
// Text shape (downstream tooling greps for these tags):
//   [url] - [code-200] - [length-1234] - https://example.com/
//   [url] - [code-403] - https://example.com/admin
//   [form] - https://example.com/login
//   [upload-form] - https://example.com/profile
//   [javascript] - https://example.com/app.js
//   [subdomains] - api.example.com
//   [aws-s3] - assets.s3.amazonaws.com
//   [linkfinder] - [from: https://example.com/app.js] - /api/v1/users
// =============================================================================

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// What kind of thing an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    #[serde(rename = "url")]
    Url,
    #[serde(rename = "form")]
    Form,
    #[serde(rename = "upload-form")]
    UploadForm,
    #[serde(rename = "javascript")]
    Asset,
    #[serde(rename = "subdomains")]
    Subdomain,
    #[serde(rename = "aws-s3")]
    Bucket,
    #[serde(rename = "linkfinder")]
    ExtractedLink,
}

impl Category {
    pub fn tag(&self) -> &'static str {
        match self {
            Category::Url => "url",
            Category::Form => "form",
            Category::UploadForm => "upload-form",
            Category::Asset => "javascript",
            Category::Subdomain => "subdomains",
            Category::Bucket => "aws-s3",
            Category::ExtractedLink => "linkfinder",
        }
    }
}

/// One immutable finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveryEvent {
    #[serde(rename = "type")]
    pub category: Category,
    /// Where it was found
    pub source: String,
    /// The discovered string itself
    pub payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
}

impl DiscoveryEvent {
    fn new(category: Category, source: &str, payload: &str) -> Self {
        Self {
            category,
            source: source.to_string(),
            payload: payload.to_string(),
            status: None,
            length: None,
        }
    }

    /// A fetched page. `length` is None for error responses.
    pub fn url(url: &str, status: u16, length: Option<usize>) -> Self {
        Self {
            status: Some(status),
            length,
            ..Self::new(Category::Url, url, url)
        }
    }

    pub fn form(page: &str) -> Self {
        Self::new(Category::Form, page, page)
    }

    pub fn upload_form(page: &str) -> Self {
        Self::new(Category::UploadForm, page, page)
    }

    pub fn asset(page: &str, asset_url: &str) -> Self {
        Self::new(Category::Asset, page, asset_url)
    }

    pub fn subdomain(page: &str, subdomain: &str) -> Self {
        Self::new(Category::Subdomain, page, subdomain)
    }

    pub fn bucket(page: &str, bucket: &str) -> Self {
        Self::new(Category::Bucket, page, bucket)
    }

    pub fn extracted_link(asset_url: &str, path: &str) -> Self {
        Self::new(Category::ExtractedLink, asset_url, path)
    }
}

impl fmt::Display for DiscoveryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] - ", self.category.tag())?;
        match self.category {
            Category::Url => {
                if let Some(status) = self.status {
                    write!(f, "[code-{}] - ", status)?;
                }
                if let Some(length) = self.length {
                    write!(f, "[length-{}] - ", length)?;
                }
            }
            Category::ExtractedLink => write!(f, "[from: {}] - ", self.source)?,
            _ => {}
        }
        write!(f, "{}", self.payload)
    }
}

/// Receives events from every fetch worker at once.
///
/// emit() must return quickly and must not panic on I/O trouble.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &DiscoveryEvent);
}

/// Line format for sinks that write text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    fn render(&self, event: &DiscoveryEvent) -> String {
        match self {
            OutputFormat::Text => event.to_string(),
            OutputFormat::Json => match serde_json::to_string(event) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to serialize event: {}", e);
                    event.to_string()
                }
            },
        }
    }
}

/// Prints each event as one line on stdout.
#[derive(Debug, Default)]
pub struct StdoutSink {
    format: OutputFormat,
}

impl StdoutSink {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl EventSink for StdoutSink {
    fn emit(&self, event: &DiscoveryEvent) {
        let line = self.format.render(event);
        // Locking stdout keeps lines from different workers from interleaving
        let mut out = io::stdout().lock();
        if let Err(e) = writeln!(out, "{}", line) {
            warn!("Failed to write event to stdout: {}", e);
        }
    }
}

/// Appends event lines to `<folder>/<host_with_underscores>`.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    format: OutputFormat,
    file: Mutex<File>,
}

impl FileSink {
    pub fn create(folder: &Path, host: &str, format: OutputFormat) -> Result<Self> {
        fs::create_dir_all(folder)
            .with_context(|| format!("Failed to create output folder {}", folder.display()))?;

        let path = folder.join(host.replace('.', "_"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open output file {}", path.display()))?;

        Ok(Self {
            path,
            format,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for FileSink {
    fn emit(&self, event: &DiscoveryEvent) {
        let line = self.format.render(event);
        let mut file = match self.file.lock() {
            Ok(guard) => guard,
            // A panicked writer can't leave a half-line behind, keep going
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(file, "{}", line) {
            warn!("Failed to write event to {}: {}", self.path.display(), e);
        }
    }
}

/// Collects events in memory. Used by tests and by library callers that
/// want the results as a Vec.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<DiscoveryEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiscoveryEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn of(&self, category: Category) -> Vec<DiscoveryEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.category == category)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &DiscoveryEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

/// Forwards every event to several sinks (stdout + file, usually).
#[derive(Default)]
pub struct TeeSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl TeeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for TeeSink {
    fn emit(&self, event: &DiscoveryEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_line_shapes() {
        let ok = DiscoveryEvent::url("https://example.com/", 200, Some(1234));
        assert_eq!(ok.to_string(), "[url] - [code-200] - [length-1234] - https://example.com/");

        let err = DiscoveryEvent::url("https://example.com/admin", 403, None);
        assert_eq!(err.to_string(), "[url] - [code-403] - https://example.com/admin");
    }

    #[test]
    fn test_category_tags() {
        let page = "https://example.com/login";
        assert_eq!(DiscoveryEvent::form(page).to_string(), "[form] - https://example.com/login");
        assert_eq!(
            DiscoveryEvent::upload_form(page).to_string(),
            "[upload-form] - https://example.com/login"
        );
        assert_eq!(
            DiscoveryEvent::asset(page, "https://example.com/app.js").to_string(),
            "[javascript] - https://example.com/app.js"
        );
        assert_eq!(
            DiscoveryEvent::subdomain(page, "api.example.com").to_string(),
            "[subdomains] - api.example.com"
        );
        assert_eq!(
            DiscoveryEvent::bucket(page, "b.s3.amazonaws.com").to_string(),
            "[aws-s3] - b.s3.amazonaws.com"
        );
    }

    #[test]
    fn test_linkfinder_line() {
        let e = DiscoveryEvent::extracted_link("https://example.com/app.js", "/api/users");
        assert_eq!(e.to_string(), "[linkfinder] - [from: https://example.com/app.js] - /api/users");
    }

    #[test]
    fn test_json_render() {
        let e = DiscoveryEvent::url("https://example.com/", 200, Some(5));
        let line = OutputFormat::Json.render(&e);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "url");
        assert_eq!(value["status"], 200);
        assert_eq!(value["length"], 5);

        let sub = OutputFormat::Json.render(&DiscoveryEvent::subdomain("p", "a.example.com"));
        assert!(!sub.contains("status"));
    }

    #[test]
    fn test_file_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::create(dir.path(), "www.example.com", OutputFormat::Text).unwrap();
        sink.emit(&DiscoveryEvent::form("https://www.example.com/"));
        sink.emit(&DiscoveryEvent::subdomain("https://www.example.com/", "a.example.com"));

        assert!(sink.path().ends_with("www_example_com"));
        let written = fs::read_to_string(sink.path()).unwrap();
        assert_eq!(
            written,
            "[form] - https://www.example.com/\n[subdomains] - a.example.com\n"
        );
    }

    #[test]
    fn test_tee_forwards_to_all() {
        let a = Arc::new(MemorySink::new());
        let b = Arc::new(MemorySink::new());
        let tee = TeeSink::new().with(a.clone()).with(b.clone());
        tee.emit(&DiscoveryEvent::form("https://example.com/"));
        assert_eq!(a.events().len(), 1);
        assert_eq!(b.of(Category::Form).len(), 1);
    }
}
