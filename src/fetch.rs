//! Relay-backed page fetcher.
//!
//! Performs exactly one outbound HTTP GET per call, either through a
//! cross-origin relay endpoint that wraps the target URL as a query
//! parameter, or directly against the target when the relay is bypassed.
//! No retries happen at this layer: a failed fetch is surfaced immediately
//! and retry policy belongs to the caller (none by default).

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;

use crate::{ConvertConfig, Error, Result, SourceUrl};

/// Raw HTML for a target URL, as produced by one fetch.
///
/// Ephemeral: owned by the call that produced it and consumed by
/// extraction.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub html: String,
    pub url: SourceUrl,
}

pub struct Fetcher {
    client: Client,
    relay_base: String,
    direct: bool,
    timeout_ms: u64,
    user_agent: String,
}

impl Fetcher {
    pub fn new(config: &ConvertConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::Fetch(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            relay_base: config.relay_base.clone(),
            direct: config.direct,
            timeout_ms: config.timeout_ms,
            user_agent: config.user_agent.clone(),
        })
    }

    /// Fetch the page once. Timeouts, non-success statuses, and empty
    /// bodies all fail; the caller owns any retry policy.
    pub fn fetch(&self, url: &SourceUrl) -> Result<FetchedDocument> {
        let request = if self.direct {
            self.client.get(url.as_str())
        } else {
            // The relay percent-encodes the target into its `url` parameter.
            self.client
                .get(&self.relay_base)
                .query(&[("url", url.as_str())])
        };

        debug!("fetching {} (direct={})", url.as_str(), self.direct);

        let response = request
            .header("Accept", "text/html")
            .header("User-Agent", self.user_agent.clone())
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    Error::FetchTimeout(self.timeout_ms)
                } else {
                    Error::Fetch(format!("Failed to fetch {}: {}", url.as_str(), e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!(
                "Relay returned {} for {}",
                status,
                url.as_str()
            )));
        }

        let body = response
            .text()
            .map_err(|e| Error::Fetch(format!("Failed to read response body: {}", e)))?;

        if body.trim().is_empty() {
            return Err(Error::Fetch(format!(
                "Empty response body for {}",
                url.as_str()
            )));
        }

        Ok(FetchedDocument {
            html: body,
            url: url.clone(),
        })
    }

    /// Fetch an arbitrary subresource (an embedded image) directly, not
    /// through the relay. Returns the bytes and the declared content type.
    pub fn fetch_bytes(&self, target: &str) -> Result<(Vec<u8>, Option<String>)> {
        let response = self
            .client
            .get(target)
            .header("User-Agent", self.user_agent.clone())
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    Error::FetchTimeout(self.timeout_ms)
                } else {
                    Error::Fetch(format!("Failed to fetch {}: {}", target, e))
                }
            })?;

        if !response.status().is_success() {
            return Err(Error::Fetch(format!(
                "{} returned {}",
                target,
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response
            .bytes()
            .map_err(|e| Error::Fetch(format!("Failed to read body of {}: {}", target, e)))?
            .to_vec();

        Ok((bytes, content_type))
    }
}
