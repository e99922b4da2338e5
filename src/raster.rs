//! Rasterization/pagination bridge.
//!
//! Drives the external raster-to-document engine with page geometry, scale
//! and cross-origin settings, gating on the image settlement join before
//! anything is captured: every `<img>` in the composed document must reach
//! a terminal state (loaded or errored) first, because a premature capture
//! silently omits images. The gate itself never fails.

use std::collections::BTreeMap;

use base64::Engine as _;
use log::{debug, warn};
use scraper::{Html, Selector};
use url::Url;

use crate::compose::ComposedPage;
use crate::fetch::Fetcher;
use crate::{Error, Result};

/// Page format understood by the raster engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFormat {
    A4,
}

impl PageFormat {
    pub fn css_name(&self) -> &'static str {
        match self {
            PageFormat::A4 => "A4",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
}

impl Orientation {
    pub fn css_name(&self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
        }
    }
}

/// Raster engine configuration.
///
/// Defaults match the delivery target: A4 portrait pages in pt units with
/// 40pt margins, compression on, raster scale 2 (values below 2 produce
/// illegible text), cross-origin image reads allowed, engine logging off,
/// subpixel-accurate text rendering on.
#[derive(Debug, Clone)]
pub struct RasterOptions {
    pub scale: u32,
    pub page_format: PageFormat,
    pub orientation: Orientation,
    /// Margins in pt: top, right, bottom, left
    pub margins_pt: [u32; 4],
    pub compress: bool,
    pub use_cors: bool,
    pub allow_taint: bool,
    pub letter_rendering: bool,
    pub verbose_logging: bool,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 2,
            page_format: PageFormat::A4,
            orientation: Orientation::Portrait,
            margins_pt: [40, 40, 40, 40],
            compress: true,
            use_cors: true,
            allow_taint: true,
            letter_rendering: true,
            verbose_logging: false,
        }
    }
}

/// Binary output of rasterization: an ordered sequence of fixed-size pages
/// forming one document artifact. Transient; either handed to encryption
/// or delivered directly.
#[derive(Debug, Clone)]
pub struct PaginatedDocument {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

/// Raster-to-document engine collaborator.
///
/// Consumes a composed HTML document whose images have already settled and
/// produces the paginated binary artifact.
pub trait RasterEngine {
    fn render(&self, document_html: &str, options: &RasterOptions) -> Result<PaginatedDocument>;
}

/// Terminal state of one embedded image at the settlement gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageState {
    Loaded { src: String },
    Errored { src: String },
}

/// Settle every embedded image, then drive the engine.
///
/// `base_url` resolves relative image sources against the page they were
/// extracted from. Engine failure propagates as a conversion error.
pub fn rasterize(
    page: &ComposedPage,
    fetcher: &Fetcher,
    engine: &dyn RasterEngine,
    options: &RasterOptions,
    base_url: Option<&Url>,
) -> Result<PaginatedDocument> {
    let (settled_html, states) = settle_images(page.as_html(), fetcher, base_url);

    let errored = states
        .iter()
        .filter(|s| matches!(s, ImageState::Errored { .. }))
        .count();
    debug!(
        "image settlement complete: {} images, {} errored",
        states.len(),
        errored
    );

    engine.render(&settled_html, options)
}

/// Join over the per-image completion outcomes.
///
/// Never fails: each image ends either `Loaded` (its bytes are inlined as
/// a data URI so the engine needs no network access) or `Errored` (logged,
/// source left as written). Capture must not proceed before this returns.
pub fn settle_images(
    html: &str,
    fetcher: &Fetcher,
    base_url: Option<&Url>,
) -> (String, Vec<ImageState>) {
    let document = Html::parse_document(html);
    let img_sel = Selector::parse("img").unwrap();

    let mut out = html.to_string();
    let mut states = Vec::new();

    for node in document.select(&img_sel) {
        let Some(src) = node.value().attr("src") else {
            continue;
        };
        if src.starts_with("data:") {
            // Already terminal; nothing to fetch.
            states.push(ImageState::Loaded {
                src: src.to_string(),
            });
            continue;
        }

        let resolved = match base_url {
            Some(base) => base
                .join(src)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| src.to_string()),
            None => src.to_string(),
        };

        match fetcher.fetch_bytes(&resolved) {
            Ok((bytes, content_type)) => {
                let mime = content_type.unwrap_or_else(|| guess_mime(&resolved).to_string());
                let data_uri = format!(
                    "data:{};base64,{}",
                    mime,
                    base64::engine::general_purpose::STANDARD.encode(&bytes)
                );
                // Loaded is only recorded once the source was actually
                // rewritten; an image the engine would still have to fetch
                // itself has not settled.
                match inline_src(&out, src, &data_uri) {
                    Some(rewritten) => {
                        out = rewritten;
                        states.push(ImageState::Loaded {
                            src: src.to_string(),
                        });
                    }
                    None => {
                        warn!("image {} fetched but its source could not be rewritten", src);
                        states.push(ImageState::Errored {
                            src: src.to_string(),
                        });
                    }
                }
            }
            Err(e) => {
                warn!("image {} failed to load: {}", resolved, e);
                states.push(ImageState::Errored {
                    src: src.to_string(),
                });
            }
        }
    }

    (out, states)
}

/// Replace one occurrence of an image src attribute with its settled
/// value, or `None` if the attribute was not found.
///
/// The parsed attribute value is entity-decoded, while the serialized
/// markup may carry the escaped form (`&` as `&amp;` in query strings),
/// so both spellings are searched.
fn inline_src(html: &str, src: &str, data_uri: &str) -> Option<String> {
    let escaped = escape_attr(src);
    let needles = [
        format!("src=\"{}\"", src),
        format!("src=\"{}\"", escaped),
        format!("src='{}'", src),
        format!("src='{}'", escaped),
    ];
    for needle in &needles {
        if html.contains(needle.as_str()) {
            return Some(html.replacen(needle.as_str(), &format!("src=\"{}\"", data_uri), 1));
        }
    }
    None
}

/// Escape an attribute value the way the HTML serializer writes it.
fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn guess_mime(src: &str) -> &'static str {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    match path.rsplit('.').next().map(|e| e.to_ascii_lowercase()) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "gif" => "image/gif",
        Some(ext) if ext == "webp" => "image/webp",
        Some(ext) if ext == "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Map the engine-facing switches onto `printpdf`'s save options.
///
/// Only `compress` has a serializer-side counterpart. The canvas switches
/// (`scale`, `use_cors`, `allow_taint`, `letter_rendering`) configure a
/// raster capture stage that a vector renderer does not have; they are
/// kept on `RasterOptions` for engines that do rasterize.
fn save_options(options: &RasterOptions) -> printpdf::PdfSaveOptions {
    printpdf::PdfSaveOptions {
        optimize: options.compress,
        ..Default::default()
    }
}

/// Raster engine backed by `printpdf`'s HTML renderer.
///
/// Page geometry travels in the composed document's `@page` rule; images
/// arrive pre-inlined as data URIs from the settlement gate, so the engine
/// is handed empty image and font maps. Of the raster switches, only
/// `compress` and `verbose_logging` apply here; the canvas-capture ones
/// are inert for a vector renderer.
#[derive(Debug, Default)]
pub struct PrintPdfEngine;

impl RasterEngine for PrintPdfEngine {
    fn render(&self, document_html: &str, options: &RasterOptions) -> Result<PaginatedDocument> {
        let mut warnings = Vec::new();
        let doc = printpdf::PdfDocument::from_html(
            document_html,
            &BTreeMap::new(),
            &BTreeMap::new(),
            &printpdf::GeneratePdfOptions::default(),
            &mut warnings,
        )
        .map_err(|e| Error::Conversion(format!("Raster engine failed: {}", e)))?;

        let pages = doc.pages.len();
        let bytes = doc.save(&save_options(options), &mut warnings);

        if options.verbose_logging {
            for w in &warnings {
                debug!("raster engine: {:?}", w);
            }
        }

        Ok(PaginatedDocument { bytes, pages })
    }
}
