//! Remote image retrieval
//!
//! Plain HTTP GET. Any non-success status or network error surfaces as
//! `CodecError::Fetch`, uniformly.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use tryon_config::Config;
use tryon_utils::error::CodecError;
use tryon_utils::redaction::redact_error_message;

/// Bytes retrieved from a remote reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    /// `Content-Type` header as sent by the server, if any
    pub content_type: Option<String>,
}

/// Trait for remote image sources
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// # Errors
    ///
    /// Returns `CodecError::Fetch` if the resource is unreachable, access is
    /// denied, or the body exceeds the configured size cap.
    async fn fetch(&self, url: &str) -> Result<FetchedImage, CodecError>;
}

/// `reqwest`-backed fetcher with a timeout and a body size cap
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    max_bytes: u64,
}

impl HttpFetcher {
    /// # Errors
    ///
    /// Returns `CodecError::Fetch` if the HTTP client cannot be constructed.
    pub fn new(timeout: Duration, max_bytes: u64) -> Result<Self, CodecError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| CodecError::Fetch {
                url: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            timeout,
            max_bytes,
        })
    }

    /// # Errors
    ///
    /// Returns `CodecError::Fetch` if the HTTP client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self, CodecError> {
        Self::new(config.fetch_timeout(), config.fetch_max_bytes())
    }

    fn fetch_error(url: &str, reason: impl AsRef<str>) -> CodecError {
        CodecError::Fetch {
            url: redact_error_message(url),
            reason: redact_error_message(reason.as_ref()),
        }
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, CodecError> {
        debug!(timeout_secs = self.timeout.as_secs(), "Fetching remote image");

        let mut response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Self::fetch_error(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::fetch_error(url, format!("server returned {status}")));
        }

        if let Some(length) = response.content_length()
            && length > self.max_bytes
        {
            return Err(Self::fetch_error(
                url,
                format!("image is {length} bytes, limit is {}", self.max_bytes),
            ));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Self::fetch_error(url, e.to_string()))?
        {
            bytes.extend_from_slice(&chunk);
            if bytes.len() as u64 > self.max_bytes {
                return Err(Self::fetch_error(
                    url,
                    format!("image exceeds limit of {} bytes", self.max_bytes),
                ));
            }
        }

        debug!(bytes = bytes.len(), content_type = ?content_type, "Fetched remote image");

        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }
}
