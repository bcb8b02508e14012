//! Scripted collaborators for engine tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::fetch::{FetchedImage, ImageFetcher};
use tryon_provider::{GenerationRequest, GenerationResponse, ImageBackend, Part};
use tryon_utils::error::{CodecError, ProviderError};

/// Fetcher that returns fixed bytes (or a fixed failure) and counts calls
pub(crate) struct MockFetcher {
    bytes: Vec<u8>,
    content_type: Option<String>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: None,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, CodecError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Suspend so concurrent callers genuinely overlap.
        tokio::task::yield_now().await;

        match &self.failure {
            Some(reason) => Err(CodecError::Fetch {
                url: url.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(FetchedImage {
                bytes: self.bytes.clone(),
                content_type: self.content_type.clone(),
            }),
        }
    }
}

/// Backend that replays scripted responses in order and records requests
pub(crate) struct MockBackend {
    responses: Mutex<VecDeque<Result<GenerationResponse, ProviderError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockBackend {
    pub fn new(responses: Vec<Result<GenerationResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Response carrying a single generated image
    pub fn image(media_type: &str, data: &str) -> Result<GenerationResponse, ProviderError> {
        Ok(GenerationResponse::from_parts(vec![
            Part::text("Here is the image you asked for."),
            Part::image(media_type, data),
        ]))
    }

    /// Response with text but no image part
    pub fn text_only() -> Result<GenerationResponse, ProviderError> {
        Ok(GenerationResponse::from_parts(vec![Part::text(
            "I can't help with that request.",
        )]))
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        tokio::task::yield_now().await;

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Transport("no scripted response".to_string())))
    }
}
