//! Print-safe page composition.
//!
//! Builds the standalone printable document handed to the raster engine: a
//! fixed-width container with auto height, preceded by a print-safety
//! stylesheet that forces color reproduction, constrains images to the
//! container, and wraps preformatted text. The composed page is the
//! scratch resource of exactly one rasterization and is dropped afterwards
//! regardless of outcome.

use crate::extract::ExtractedContent;
use crate::raster::RasterOptions;

/// A standalone printable HTML document, scoped to one rasterization.
#[derive(Debug)]
pub struct ComposedPage {
    html: String,
}

impl ComposedPage {
    pub fn as_html(&self) -> &str {
        &self.html
    }
}

/// Print-safety overrides injected as the first stylesheet, ahead of any
/// page-supplied styles. Page geometry travels in the `@page` rule.
fn print_safety_css(page_width: u32, options: &RasterOptions) -> String {
    let [top, right, bottom, left] = options.margins_pt;
    format!(
        "@page {{ size: {} {}; margin: {}pt {}pt {}pt {}pt; }}\n\
         * {{ -webkit-print-color-adjust: exact; print-color-adjust: exact; }}\n\
         .urlpress-page {{ width: {}px; height: auto; }}\n\
         .urlpress-page img {{ max-width: 100%; height: auto; display: block; }}\n\
         .urlpress-page pre, .urlpress-page code {{ white-space: pre-wrap; word-wrap: break-word; padding: 8px; }}\n",
        options.page_format.css_name(),
        options.orientation.css_name(),
        top,
        right,
        bottom,
        left,
        page_width,
    )
}

/// Compose the printable document for the given content.
///
/// Content source policy (cached extraction vs. fresh fetch) is decided by
/// the pipeline; composition itself is pure.
pub fn compose(content: &ExtractedContent, page_width: u32, options: &RasterOptions) -> ComposedPage {
    let safety = print_safety_css(page_width, options);
    let mut html = String::with_capacity(
        safety.len() + content.style_bundle.len() + content.content_markup.len() + 256,
    );

    html.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
    html.push_str("<style>\n");
    html.push_str(&safety);
    html.push_str("</style>\n<style>\n");
    html.push_str(&content.style_bundle);
    html.push_str("</style></head><body>");
    html.push_str("<div class=\"urlpress-page\">");
    html.push_str(&content.content_markup);
    html.push_str("</div></body></html>");

    ComposedPage { html }
}
