//! Conversion pipeline orchestration.
//!
//! Runs the stage machine for one request: idle → fetching/extracting →
//! compositing → rasterizing → (encrypting) → delivering → idle. Stages
//! execute strictly sequentially; any failure returns the pipeline to idle
//! with the tagged error and no partial artifact persists. A request
//! issued while another is in flight is rejected outright.

use std::path::PathBuf;

use log::debug;
use serde::Serialize;

use crate::compose;
use crate::deliver;
use crate::encrypt::{self, Passkey};
use crate::extract::{self, ExtractedContent};
use crate::fetch::Fetcher;
use crate::preview::{self, PreviewFragment};
use crate::raster::{self, PrintPdfEngine, RasterEngine};
use crate::{ConvertConfig, Error, Result, SourceUrl};

/// Summary of one completed conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub url: String,
    /// Selector of the content region that matched
    pub matched_region: String,
    pub pages: usize,
    pub encrypted: bool,
    pub output: PathBuf,
    pub bytes: usize,
}

/// The conversion pipeline.
///
/// Generic over the raster engine so tests can substitute a recording
/// double; production code uses [`PrintPdfEngine`].
pub struct Pipeline<E = PrintPdfEngine> {
    config: ConvertConfig,
    fetcher: Fetcher,
    engine: E,
    /// Single-entry cache of the most recent successful extraction, keyed
    /// by its source URL: overwritten on any new success, cleared on any
    /// fetch or extraction error.
    cached: Option<(SourceUrl, ExtractedContent)>,
    in_flight: bool,
}

impl Pipeline<PrintPdfEngine> {
    pub fn new(config: ConvertConfig) -> Result<Self> {
        Self::with_engine(config, PrintPdfEngine)
    }
}

impl<E: RasterEngine> Pipeline<E> {
    pub fn with_engine(config: ConvertConfig, engine: E) -> Result<Self> {
        let fetcher = Fetcher::new(&config)?;
        Ok(Self {
            config,
            fetcher,
            engine,
            cached: None,
            in_flight: false,
        })
    }

    /// Fetch and extract the page, updating the cache, and render the
    /// preview fragment without converting.
    pub fn preview(&mut self, raw_url: &str) -> Result<PreviewFragment> {
        let url = SourceUrl::parse(raw_url)?;
        let content = self.fetch_and_extract(&url)?;
        Ok(preview::render(&content))
    }

    /// Run one full conversion and deliver the resulting document.
    ///
    /// Reentrancy: a second request while one is in flight fails with
    /// [`Error::Busy`] rather than queueing or running concurrently.
    pub fn convert(&mut self, raw_url: &str, passkey: &Passkey) -> Result<ConversionReport> {
        if self.in_flight {
            return Err(Error::Busy);
        }
        self.in_flight = true;
        let result = self.convert_inner(raw_url, passkey);
        self.in_flight = false;
        result
    }

    fn convert_inner(&mut self, raw_url: &str, passkey: &Passkey) -> Result<ConversionReport> {
        // Validation happens before any network traffic.
        let url = SourceUrl::parse(raw_url)?;

        // Content source policy: reuse the cached extraction from a prior
        // pass over the same URL, otherwise fetch and extract inline.
        let cached = self
            .cached
            .as_ref()
            .and_then(|(cached_url, content)| (cached_url == &url).then(|| content.clone()));
        let content = match cached {
            Some(content) => {
                debug!("reusing cached extraction for {}", url.as_str());
                content
            }
            None => self.fetch_and_extract(&url)?,
        };

        let page = compose::compose(&content, self.config.page_width, &self.config.raster);
        let document = raster::rasterize(
            &page,
            &self.fetcher,
            &self.engine,
            &self.config.raster,
            Some(url.url()),
        )?;
        // The composed page was scoped to that one rasterization.
        drop(page);

        let encrypted = passkey.is_set();
        let pages = document.pages;
        let bytes = if encrypted {
            encrypt::encrypt(&document, passkey)?
        } else {
            document.bytes
        };

        let filename = deliver::output_filename(&url, encrypted);
        let output = deliver::deliver(&self.config.out_dir, &filename, &bytes)?;

        Ok(ConversionReport {
            url: url.as_str().to_string(),
            matched_region: content.matched.selector().to_string(),
            pages,
            encrypted,
            output,
            bytes: bytes.len(),
        })
    }

    fn fetch_and_extract(&mut self, url: &SourceUrl) -> Result<ExtractedContent> {
        let result = self
            .fetcher
            .fetch(url)
            .and_then(|doc| extract::extract(&doc.html, Some(url.url())));

        match result {
            Ok(content) => {
                self.cached = Some((url.clone(), content.clone()));
                Ok(content)
            }
            Err(e) => {
                // A stale extraction must not survive a failed fetch.
                self.cached = None;
                Err(e)
            }
        }
    }

    /// The most recent successful extraction, if any.
    pub fn cached_extraction(&self) -> Option<&ExtractedContent> {
        self.cached.as_ref().map(|(_, content)| content)
    }
}
