//! urlpress
//!
//! Fetches a publicly reachable web page through a cross-origin relay,
//! isolates its main-content region, normalizes it into a print-safe
//! document with inlined styling, rasterizes it into fixed-size pages, and
//! optionally encrypts the resulting PDF with a user-supplied passkey.
//!
//! The pipeline runs strictly sequentially within one request:
//! fetch → extract → compose → rasterize → (encrypt) → deliver.
//!
//! # Example
//!
//! ```no_run
//! use urlpress::{ConvertConfig, Passkey, Pipeline};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut pipeline = Pipeline::new(ConvertConfig::default())?;
//! let report = pipeline.convert("https://example.com", &Passkey::new("hunter2"))?;
//! println!("wrote {} ({} pages)", report.output.display(), report.pages);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod error;
pub use error::{Error, Result};

pub mod compose;
pub mod deliver;
pub mod encrypt;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod preview;
pub mod raster;

pub use encrypt::Passkey;
pub use extract::{ContentRegion, ExtractedContent};
pub use pipeline::{ConversionReport, Pipeline};
pub use preview::PreviewFragment;
pub use raster::{PaginatedDocument, PrintPdfEngine, RasterEngine, RasterOptions};

/// Default cross-origin relay endpoint. The target URL travels as the
/// relay's `url` query parameter and the response body is the raw HTML of
/// the target page.
pub const DEFAULT_RELAY: &str = "https://api.allorigins.win/raw";

/// Configuration for a conversion pipeline.
///
/// The defaults match the intended output: a 10 second fetch limit, an
/// 800-unit-wide composed page, and A4 portrait pages at raster scale 2.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Cross-origin relay endpoint; see [`DEFAULT_RELAY`]
    pub relay_base: String,
    /// Fetch the target URL directly, bypassing the relay
    pub direct: bool,
    /// Hard limit for the page fetch in milliseconds
    pub timeout_ms: u64,
    /// User agent sent with every request
    pub user_agent: String,
    /// Fixed logical width of the composed page container
    pub page_width: u32,
    /// Raster engine configuration
    pub raster: RasterOptions,
    /// Directory the delivered document is written to
    pub out_dir: PathBuf,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            relay_base: DEFAULT_RELAY.to_string(),
            direct: false,
            timeout_ms: 10_000,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) urlpress/0.1".to_string(),
            page_width: 800,
            raster: RasterOptions::default(),
            out_dir: PathBuf::from("."),
        }
    }
}

/// A validated absolute http(s) URL.
///
/// Construction is the validation boundary: a `SourceUrl` exists only if
/// the input parsed as an absolute URL with a host, and no network call is
/// made before one exists. The hostname doubles as the basis for the
/// output filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrl(url::Url);

impl SourceUrl {
    /// Parse and validate user input into a `SourceUrl`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation("please enter a URL".into()));
        }
        let parsed = url::Url::parse(trimmed)
            .map_err(|e| Error::Validation(format!("{}: {}", trimmed, e)))?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::Validation(format!(
                    "unsupported scheme '{}': {}",
                    other, trimmed
                )))
            }
        }
        if parsed.host_str().is_none() {
            return Err(Error::Validation(format!("missing host: {}", trimmed)));
        }
        Ok(Self(parsed))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn url(&self) -> &url::Url {
        &self.0
    }

    /// Hostname used to derive the output filename.
    pub fn hostname(&self) -> &str {
        // A host is required at construction, so this cannot be empty.
        self.0.host_str().unwrap_or("document")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConvertConfig::default();
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.page_width, 800);
        assert!(!config.direct);
        assert_eq!(config.relay_base, DEFAULT_RELAY);
    }

    #[test]
    fn test_source_url_accepts_absolute_http() {
        let url = SourceUrl::parse("https://example.com/articles/1").unwrap();
        assert_eq!(url.hostname(), "example.com");
        assert_eq!(url.as_str(), "https://example.com/articles/1");
    }

    #[test]
    fn test_source_url_rejects_garbage() {
        for bad in ["", "   ", "not a url", "example.com", "ftp://example.com"] {
            let err = SourceUrl::parse(bad).unwrap_err();
            assert_eq!(err.stage(), "validation", "input {:?}", bad);
        }
    }
}
