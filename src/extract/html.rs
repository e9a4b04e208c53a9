// src/extract/html.rs
// =============================================================================
// Pulls crawl signals out of an HTML page.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM, tolerating broken or partial markup
// - Supports CSS selectors for finding elements
//
// Everything returned here is RAW: attribute values exactly as written in
// the page. Resolving them against the page URL happens in the crawl engine.
// =============================================================================

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

// Selector::parse only fails on invalid CSS, and these are constants
static HREF: Lazy<Selector> = Lazy::new(|| Selector::parse("[href]").unwrap());
static FORM_ACTION: Lazy<Selector> = Lazy::new(|| Selector::parse("form[action]").unwrap());
static FILE_INPUT: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"input[type="file"]"#).unwrap());
static SRC: Lazy<Selector> = Lazy::new(|| Selector::parse("[src]").unwrap());

// Extensions worth sending to the asset collector
const ASSET_EXTENSIONS: [&str; 3] = ["js", "xml", "json"];

/// Everything one page yields, from a single parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlSignals {
    pub hyperlinks: Vec<String>,
    pub form_actions: Vec<String>,
    pub has_upload: bool,
    pub asset_refs: Vec<String>,
}

impl HtmlSignals {
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);

        let attr_values = |selector: &Selector, attr: &str| -> Vec<String> {
            document
                .select(selector)
                .filter_map(|element| element.value().attr(attr))
                .map(|value| value.to_string())
                .collect()
        };

        let hyperlinks = attr_values(&HREF, "href");
        let form_actions = attr_values(&FORM_ACTION, "action");
        let has_upload = document.select(&FILE_INPUT).next().is_some();
        let asset_refs = attr_values(&SRC, "src")
            .into_iter()
            .filter(|src| is_asset_path(src))
            .collect();

        Self {
            hyperlinks,
            form_actions,
            has_upload,
            asset_refs,
        }
    }

    /// The page gets one [form] event no matter how many forms it holds.
    pub fn has_form(&self) -> bool {
        !self.form_actions.is_empty()
    }
}

/// Every href attribute value on the page.
pub fn extract_hyperlinks(html: &str) -> Vec<String> {
    HtmlSignals::parse(html).hyperlinks
}

/// Action values of every <form action=...> on the page.
pub fn extract_form_actions(html: &str) -> Vec<String> {
    HtmlSignals::parse(html).form_actions
}

/// Whether the page has an <input type="file">.
pub fn extract_upload_markers(html: &str) -> bool {
    HtmlSignals::parse(html).has_upload
}

/// src values pointing at .js, .xml or .json files.
pub fn extract_asset_refs(html: &str) -> Vec<String> {
    HtmlSignals::parse(html).asset_refs
}

/// Extension of the last path segment, ignoring query and fragment.
///
/// "/static/app.min.js?v=2" -> Some("js"), "/about" -> None
pub fn path_extension(reference: &str) -> Option<String> {
    let path = reference.split(['?', '#']).next().unwrap_or("");
    let last_segment = path.rsplit('/').next().unwrap_or("");
    let (stem, ext) = last_segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn is_asset_path(reference: &str) -> bool {
    path_extension(reference)
        .map(|ext| ASSET_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// The unminified sibling of a "*.min.js" URL, if it has one.
pub fn unminified(asset_url: &str) -> Option<String> {
    if asset_url.contains(".min.js") {
        Some(asset_url.replace(".min.js", ".js"))
    } else {
        None
    }
}
