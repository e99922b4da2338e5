//! Preview fragment rendering.
//!
//! Pure function from extracted content to a single self-contained markup
//! string: a `<style>` block (the style bundle plus fixed scoping rules)
//! followed by the content inside a scoping container. No I/O, no state.
//! Sanitization of the embedded remote markup is the responsibility of
//! whatever surface displays the fragment.

use crate::extract::ExtractedContent;

/// Fixed scoping rules applied to every preview: bounded height with
/// scroll overflow, responsive image sizing, preformatted-text wrapping.
const PREVIEW_RULES: &str = "\
.urlpress-preview { max-height: 600px; overflow-y: auto; }\n\
.urlpress-preview img { max-width: 100%; height: auto; }\n\
.urlpress-preview pre { white-space: pre-wrap; word-wrap: break-word; }\n";

/// A rendering-ready composite of style bundle and content markup.
///
/// Recomputed on every successful extraction; a stale fragment must not
/// survive a fetch failure (the pipeline clears its cache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewFragment(String);

impl PreviewFragment {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Render a preview fragment for the given content.
pub fn render(content: &ExtractedContent) -> PreviewFragment {
    let mut out = String::with_capacity(
        content.style_bundle.len() + content.content_markup.len() + PREVIEW_RULES.len() + 64,
    );
    out.push_str("<style>\n");
    out.push_str(&content.style_bundle);
    out.push_str(PREVIEW_RULES);
    out.push_str("</style>\n");
    out.push_str("<div class=\"urlpress-preview\">\n");
    out.push_str(&content.content_markup);
    out.push_str("\n</div>\n");
    PreviewFragment(out)
}
