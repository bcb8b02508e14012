//! Shared HTTP client for HTTP-based image providers
//!
//! One `reqwest::Client` per backend, reused across calls. Each call makes a
//! single attempt; failures are classified by status and surfaced immediately.

use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use tryon_utils::error::ProviderError;
use tryon_utils::redaction::redact_error_message;

/// Upper bound on any single provider call (10 minutes)
const DEFAULT_MAX_HTTP_TIMEOUT: Duration = Duration::from_secs(600);

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub(crate) struct HttpClient {
    client: Arc<Client>,
    max_timeout: Duration,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns `ProviderError::Misconfiguration` if the client cannot be constructed
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_max_timeout(DEFAULT_MAX_HTTP_TIMEOUT)
    }

    /// # Errors
    ///
    /// Returns `ProviderError::Misconfiguration` if the client cannot be constructed
    pub fn with_max_timeout(max_timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| {
                ProviderError::Misconfiguration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client: Arc::new(client),
            max_timeout,
        })
    }

    pub fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client.post(url)
    }

    /// Execute an HTTP request once with a per-request timeout
    ///
    /// The effective timeout is `min(request_timeout, max_timeout)`.
    ///
    /// # Errors
    ///
    /// - `ProviderError::Auth` for 401/403
    /// - `ProviderError::Quota` for 429
    /// - `ProviderError::Outage` for 5xx
    /// - `ProviderError::Timeout` when the deadline passes
    /// - `ProviderError::Transport` for other 4xx and network errors
    pub async fn execute(
        &self,
        request_builder: reqwest::RequestBuilder,
        request_timeout: Duration,
        provider_name: &str,
    ) -> Result<Response, ProviderError> {
        let effective_timeout = request_timeout.min(self.max_timeout);

        let request = request_builder
            .timeout(effective_timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("Failed to build request: {e}")))?;

        debug!(
            provider = provider_name,
            timeout_secs = effective_timeout.as_secs(),
            "Executing HTTP request"
        );

        match self.client.execute(request).await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    Ok(response)
                } else {
                    Err(map_status(status, provider_name))
                }
            }
            Err(e) if e.is_timeout() => Err(ProviderError::Timeout {
                duration: effective_timeout,
            }),
            Err(e) => Err(ProviderError::Transport(format!(
                "{} request failed: {}",
                provider_name,
                redact_error_message(&e.to_string())
            ))),
        }
    }
}

/// Map non-success HTTP status codes to `ProviderError` variants
fn map_status(status: StatusCode, provider_name: &str) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::Auth(format!("{provider_name} authentication failed: {status}"))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            ProviderError::Quota(format!("{provider_name} rate limit exceeded: {status}"))
        }
        s if s.is_server_error() => {
            ProviderError::Outage(format!("{provider_name} returned server error: {status}"))
        }
        _ => ProviderError::Transport(format!(
            "{provider_name} returned unexpected status: {status}"
        )),
    }
}
