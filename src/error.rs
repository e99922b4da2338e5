//! Error types for the conversion pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while converting a page.
///
/// Each variant corresponds to one pipeline stage. Tags are preserved all
/// the way up; only the outermost caller (the CLI) reduces an error to its
/// display string.
#[derive(Error, Debug)]
pub enum Error {
    /// The input URL was empty or malformed (checked before any network call)
    #[error("Invalid URL: {0}")]
    Validation(String),

    /// The relay request failed, returned a non-success status, or produced
    /// an empty body
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// The fetch did not complete within the configured hard limit
    #[error("Fetch timed out after {0}ms")]
    FetchTimeout(u64),

    /// No content region could be located in the fetched document
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// The raster engine failed to produce a paginated document
    #[error("Conversion failed: {0}")]
    Conversion(String),

    /// The encryption primitive rejected the document or failed outright
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// The final artifact could not be written out
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// A conversion is already in flight on this pipeline
    #[error("A conversion is already in progress")]
    Busy,
}

impl Error {
    /// The stage this error originated from, for logging and tests.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Fetch(_) | Error::FetchTimeout(_) => "fetch",
            Error::Extraction(_) => "extraction",
            Error::Conversion(_) => "conversion",
            Error::Encryption(_) => "encryption",
            Error::Delivery(_) => "delivery",
            Error::Busy => "busy",
        }
    }
}
