//! Main-content extraction.
//!
//! Parses fetched HTML into a detached document tree, locates the main
//! content region by a fixed priority-ordered selector search, and bundles
//! all styling (inline `<style>` blocks plus one `@import` per stylesheet
//! link) into a single CSS string. Extraction is deterministic: the same
//! input yields byte-identical output.

use log::debug;
use scraper::{Html, Selector};
use url::Url;

use crate::{Error, Result};

/// Which candidate container produced the content markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRegion {
    Main,
    MainClass,
    ContentId,
    ContentClass,
    Body,
}

impl ContentRegion {
    /// The CSS selector this candidate matches on.
    pub fn selector(&self) -> &'static str {
        match self {
            ContentRegion::Main => "main",
            ContentRegion::MainClass => ".main",
            ContentRegion::ContentId => "#content",
            ContentRegion::ContentClass => ".content",
            ContentRegion::Body => "body",
        }
    }
}

/// Fixed priority order for the content-region search. The first candidate
/// with a match wins; candidates are never merged. The `body` fallback
/// makes "no content found" effectively unreachable for well-formed HTML,
/// but the failure path exists.
const CANDIDATES: [ContentRegion; 5] = [
    ContentRegion::Main,
    ContentRegion::MainClass,
    ContentRegion::ContentId,
    ContentRegion::ContentClass,
    ContentRegion::Body,
];

/// The main-content markup of a page paired with its style bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    /// Inner markup of the matched container, verbatim
    pub content_markup: String,
    /// Concatenated inline styles plus one `@import` per stylesheet link
    pub style_bundle: String,
    /// The candidate that matched
    pub matched: ContentRegion,
}

/// Extract the main-content region and style bundle from raw HTML.
///
/// `base_url` resolves relative stylesheet hrefs so they survive being
/// lifted out of their origin document; pass `None` to keep them as
/// written.
pub fn extract(html: &str, base_url: Option<&Url>) -> Result<ExtractedContent> {
    let document = Html::parse_document(html);

    let mut matched = None;
    for candidate in CANDIDATES {
        let selector = Selector::parse(candidate.selector()).unwrap();
        if let Some(node) = document.select(&selector).next() {
            matched = Some((candidate, node.inner_html()));
            break;
        }
    }

    let (region, content_markup) =
        matched.ok_or_else(|| Error::Extraction("no main content found".into()))?;

    let style_bundle = bundle_styles(&document, base_url);

    debug!(
        "extracted {} bytes of content from '{}' plus {} bytes of styles",
        content_markup.len(),
        region.selector(),
        style_bundle.len()
    );

    Ok(ExtractedContent {
        content_markup,
        style_bundle,
        matched: region,
    })
}

/// Collect all styling into one bundle, independent of which container
/// matched. Order-preserving and lossless: inline `<style>` text first in
/// document order, then one `@import` per `<link rel="stylesheet">`. A
/// page with zero style sources yields an empty bundle.
fn bundle_styles(document: &Html, base_url: Option<&Url>) -> String {
    let style_sel = Selector::parse("style").unwrap();
    let link_sel = Selector::parse("link[rel=\"stylesheet\"]").unwrap();

    let mut bundle = String::new();

    for node in document.select(&style_sel) {
        let text = node.text().collect::<String>();
        if !text.trim().is_empty() {
            bundle.push_str(&text);
            bundle.push('\n');
        }
    }

    for node in document.select(&link_sel) {
        if let Some(href) = node.value().attr("href") {
            let resolved = match base_url {
                Some(base) => base
                    .join(href)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| href.to_string()),
                None => href.to_string(),
            };
            bundle.push_str(&format!("@import url(\"{}\");\n", resolved));
        }
    }

    bundle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_wins_over_content_siblings() {
        let html = "<html><body>\
                    <div class=\"content\">sidebar</div>\
                    <main><p>The article</p></main>\
                    <div id=\"content\">footer</div>\
                    </body></html>";
        let extracted = extract(html, None).unwrap();
        assert_eq!(extracted.matched, ContentRegion::Main);
        assert_eq!(extracted.content_markup, "<p>The article</p>");
        assert!(!extracted.content_markup.contains("sidebar"));
    }

    #[test]
    fn test_priority_order_within_fallbacks() {
        let html = "<html><body>\
                    <div class=\"content\">low</div>\
                    <div id=\"content\">high</div>\
                    </body></html>";
        let extracted = extract(html, None).unwrap();
        assert_eq!(extracted.matched, ContentRegion::ContentId);
        assert_eq!(extracted.content_markup, "high");
    }

    #[test]
    fn test_body_fallback() {
        let html = "<html><body><p>plain page</p></body></html>";
        let extracted = extract(html, None).unwrap();
        assert_eq!(extracted.matched, ContentRegion::Body);
        assert_eq!(extracted.content_markup, "<p>plain page</p>");
    }

    #[test]
    fn test_style_bundle_order_and_imports() {
        let html = "<html><head>\
                    <style>body{color:red}</style>\
                    <link rel=\"stylesheet\" href=\"https://cdn.example.com/a.css\">\
                    <style>p{margin:0}</style>\
                    <link rel=\"stylesheet\" href=\"/b.css\">\
                    </head><body><main>x</main></body></html>";
        let base = Url::parse("https://example.com/page").unwrap();
        let extracted = extract(html, Some(&base)).unwrap();

        let red = extracted.style_bundle.find("body{color:red}").unwrap();
        let margin = extracted.style_bundle.find("p{margin:0}").unwrap();
        let a = extracted
            .style_bundle
            .find("@import url(\"https://cdn.example.com/a.css\");")
            .unwrap();
        let b = extracted
            .style_bundle
            .find("@import url(\"https://example.com/b.css\");")
            .unwrap();
        // Inline styles in document order, then one @import per link.
        assert!(red < margin && margin < a && a < b);
    }

    #[test]
    fn test_relative_hrefs_kept_without_base() {
        let html = "<html><head><link rel=\"stylesheet\" href=\"x/y.css\"></head>\
                    <body><main>m</main></body></html>";
        let extracted = extract(html, None).unwrap();
        assert!(extracted.style_bundle.contains("@import url(\"x/y.css\");"));
    }

    #[test]
    fn test_zero_style_sources_yield_empty_bundle() {
        let html = "<html><body><main>bare</main></body></html>";
        let extracted = extract(html, None).unwrap();
        assert!(extracted.style_bundle.is_empty());
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let html = "<html><head><style>a{display:none}</style></head>\
                    <body><main><h1>T</h1><p>body text</p></main></body></html>";
        let first = extract(html, None).unwrap();
        let second = extract(html, None).unwrap();
        assert_eq!(first, second);
    }
}
