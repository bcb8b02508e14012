//! Core types for the image-generation boundary

use async_trait::async_trait;
use std::time::Duration;

use tryon_utils::error::ProviderError;

/// Base64 image payload tagged with its media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 (standard alphabet, padded) image bytes
    pub data: String,
}

impl InlineImage {
    #[must_use]
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

/// One element of a multimodal request or response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    InlineImage(InlineImage),
}

impl Part {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    #[must_use]
    pub fn image(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::InlineImage(InlineImage::new(mime_type, data))
    }
}

/// Input to a single provider call
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub timeout: Duration,
    /// Ordered parts; image parts are referenced by position in the prompt text
    pub parts: Vec<Part>,
    /// Output aspect-ratio hint, `W:H`
    pub aspect_ratio: Option<String>,
}

impl GenerationRequest {
    #[must_use]
    pub fn new(model: impl Into<String>, timeout: Duration, parts: Vec<Part>) -> Self {
        Self {
            model: model.into(),
            timeout,
            parts,
            aspect_ratio: None,
        }
    }

    #[must_use]
    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(aspect_ratio.into());
        self
    }
}

/// A single alternative produced by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    pub parts: Vec<Part>,
}

/// Output of a provider call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResponse {
    pub candidates: Vec<Candidate>,
}

impl GenerationResponse {
    /// Response with one candidate holding the given parts
    #[must_use]
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self {
            candidates: vec![Candidate { parts }],
        }
    }

    /// First inline image of the first candidate, in part order.
    ///
    /// Text parts are skipped. Later candidates are never consulted.
    #[must_use]
    pub fn first_image(&self) -> Option<&InlineImage> {
        self.candidates
            .first()?
            .parts
            .iter()
            .find_map(|part| match part {
                Part::InlineImage(image) => Some(image),
                Part::Text(_) => None,
            })
    }
}

/// Trait for image-generation backends
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &str;

    /// Send one request to the provider. Exactly one attempt is made.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` for transport failures, rejected credentials,
    /// quota, outages, timeouts, and unparseable responses.
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError>;
}
