// src/extract/mod.rs
// =============================================================================
// Content extractors: pure functions from a response body to raw findings.
//
// Submodules:
// - html: hyperlinks, forms, upload inputs and script references (scraper)
// - patterns: subdomains, S3 buckets and script paths (regex, swappable)
// - decode: undoes \uXXXX escaping before pattern matching
//
// None of these can fail. Garbage in gives an empty Vec out.
// =============================================================================

mod decode;
mod html;
mod patterns;

pub use decode::decode_chars;
pub use html::{
    extract_asset_refs, extract_form_actions, extract_hyperlinks, extract_upload_markers,
    is_asset_path, path_extension, unminified, HtmlSignals,
};
pub use patterns::{
    extract_bucket_names, extract_script_paths, extract_subdomains, DefaultPatterns, PatternSet,
};
