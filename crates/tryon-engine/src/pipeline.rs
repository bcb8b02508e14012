//! Garment synthesis and try-on composition
//!
//! Each operation is one provider round trip. Only the first inline image of
//! the first candidate is used; accompanying text is discarded.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::codec::EncodedImage;
use tryon_config::Config;
use tryon_provider::{GenerationRequest, ImageBackend, Part};
use tryon_utils::error::{GenerationError, ProviderError};

const GARMENT_OPERATION: &str = "garment synthesis";
const TRY_ON_OPERATION: &str = "try-on composition";

const TRY_ON_INSTRUCTION: &str = "Generate a realistic full-body photo of the person from the first image wearing the clothing from the second image. Maintain the person's exact pose, facial features, body shape, and the background. Ensure the clothing fits naturally with realistic lighting and shadows. High quality, photorealistic.";

/// A garment description that is known to be non-blank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GarmentPrompt(String);

impl GarmentPrompt {
    /// Trimmed prompt, or `None` if nothing but whitespace was given
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn garment_instruction(prompt: &GarmentPrompt) -> String {
    format!(
        "Generate a high-quality, standalone image of a clothing item: {}. The clothing should be on a plain white or neutral background, suitable for a virtual try-on application. Flat lay or mannequin style.",
        prompt.as_str()
    )
}

/// Model and per-operation settings
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub model: String,
    pub timeout: Duration,
    pub garment_aspect_ratio: String,
    pub try_on_aspect_ratio: String,
    /// Used when the provider returns an image without a media type
    pub fallback_media_type: String,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            model: config.model().to_string(),
            timeout: config.provider_timeout(),
            garment_aspect_ratio: config.garment_aspect_ratio().to_string(),
            try_on_aspect_ratio: config.try_on_aspect_ratio().to_string(),
            fallback_media_type: config.result_media_type().to_string(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Two-operation facade over an image backend
#[derive(Clone)]
pub struct GenerationPipeline {
    backend: Arc<dyn ImageBackend>,
    settings: PipelineSettings,
}

impl GenerationPipeline {
    #[must_use]
    pub fn new(backend: Arc<dyn ImageBackend>, settings: PipelineSettings) -> Self {
        Self { backend, settings }
    }

    /// Build the configured backend and wrap it
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the backend cannot be constructed (unknown
    /// provider, missing API key).
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        Ok(Self::new(
            tryon_provider::from_config(config)?,
            PipelineSettings::from(config),
        ))
    }

    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Synthesize a standalone garment image on a neutral background
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::Provider` if the call fails and
    /// `GenerationError::NoImageProduced` if the response holds no image.
    pub async fn generate_garment(
        &self,
        prompt: &GarmentPrompt,
    ) -> Result<EncodedImage, GenerationError> {
        let parts = vec![Part::text(garment_instruction(prompt))];
        self.run(
            GARMENT_OPERATION,
            parts,
            &self.settings.garment_aspect_ratio,
        )
        .await
    }

    /// Dress the person from `person` in the garment from `garment`
    ///
    /// Image order matters: the instruction refers to the first and second image.
    ///
    /// # Errors
    ///
    /// Same as [`Self::generate_garment`].
    pub async fn compose_try_on(
        &self,
        person: &EncodedImage,
        garment: &EncodedImage,
    ) -> Result<EncodedImage, GenerationError> {
        let parts = vec![
            Part::image(person.media_type.clone(), person.data.clone()),
            Part::image(garment.media_type.clone(), garment.data.clone()),
            Part::text(TRY_ON_INSTRUCTION),
        ];
        self.run(TRY_ON_OPERATION, parts, &self.settings.try_on_aspect_ratio)
            .await
    }

    async fn run(
        &self,
        operation: &str,
        parts: Vec<Part>,
        aspect_ratio: &str,
    ) -> Result<EncodedImage, GenerationError> {
        let started = Instant::now();
        let request = GenerationRequest::new(&self.settings.model, self.settings.timeout, parts)
            .with_aspect_ratio(aspect_ratio);

        debug!(
            operation,
            provider = self.backend.name(),
            model = %self.settings.model,
            aspect_ratio,
            "Sending generation request"
        );

        let response = self.backend.generate(request).await?;

        let image = response
            .first_image()
            .ok_or_else(|| GenerationError::NoImageProduced {
                operation: operation.to_string(),
            })?;

        let media_type = if image.mime_type.is_empty() {
            self.settings.fallback_media_type.clone()
        } else {
            image.mime_type.clone()
        };

        info!(
            operation,
            media_type = %media_type,
            duration_ms = started.elapsed().as_millis() as u64,
            "Generation produced an image"
        );

        Ok(EncodedImage::new(media_type, image.data.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockBackend;

    fn pipeline(backend: Arc<MockBackend>) -> GenerationPipeline {
        GenerationPipeline::new(backend, PipelineSettings::default())
    }

    #[test]
    fn test_garment_prompt_parse() {
        assert_eq!(
            GarmentPrompt::parse("  red silk jacket \n").map(|p| p.as_str().to_string()),
            Some("red silk jacket".to_string())
        );
        assert!(GarmentPrompt::parse("").is_none());
        assert!(GarmentPrompt::parse(" \t\n").is_none());
    }

    #[tokio::test]
    async fn test_generate_garment_sends_square_text_request() {
        let backend = Arc::new(MockBackend::new(vec![MockBackend::image(
            "image/png",
            "R0FSTUVOVA==",
        )]));
        let prompt = GarmentPrompt::parse("red silk jacket").unwrap();

        let garment = pipeline(backend.clone())
            .generate_garment(&prompt)
            .await
            .unwrap();

        assert_eq!(garment, EncodedImage::new("image/png", "R0FSTUVOVA=="));
        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].aspect_ratio.as_deref(), Some("1:1"));
        match requests[0].parts.as_slice() {
            [Part::Text(text)] => {
                assert!(text.contains("clothing item: red silk jacket."));
                assert!(text.contains("neutral background"));
            }
            other => panic!("expected a single text part, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_compose_try_on_orders_person_then_garment() {
        let backend = Arc::new(MockBackend::new(vec![MockBackend::image(
            "image/jpeg",
            "UkVTVUxU",
        )]));
        let person = EncodedImage::new("image/jpeg", "UEVSU09O");
        let garment = EncodedImage::new("image/png", "R0FSTUVOVA==");

        let result = pipeline(backend.clone())
            .compose_try_on(&person, &garment)
            .await
            .unwrap();

        assert_eq!(result, EncodedImage::new("image/jpeg", "UkVTVUxU"));
        let request = &backend.requests()[0];
        assert_eq!(request.aspect_ratio.as_deref(), Some("3:4"));
        assert_eq!(request.parts[0], Part::image("image/jpeg", "UEVSU09O"));
        assert_eq!(request.parts[1], Part::image("image/png", "R0FSTUVOVA=="));
        assert!(matches!(&request.parts[2], Part::Text(t) if t.contains("exact pose")));
    }

    #[tokio::test]
    async fn test_text_only_response_is_no_image_produced() {
        let backend = Arc::new(MockBackend::new(vec![MockBackend::text_only()]));
        let prompt = GarmentPrompt::parse("denim overalls").unwrap();

        let err = pipeline(backend).generate_garment(&prompt).await.unwrap_err();

        assert_eq!(
            err,
            GenerationError::NoImageProduced {
                operation: GARMENT_OPERATION.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_provider_failure_is_propagated() {
        let backend = Arc::new(MockBackend::new(vec![Err(ProviderError::Quota(
            "gemini rate limit exceeded: 429".to_string(),
        ))]));
        let person = EncodedImage::new("image/png", "AA==");

        let err = pipeline(backend)
            .compose_try_on(&person, &person)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GenerationError::Provider(ProviderError::Quota(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_media_type_uses_fallback() {
        let backend = Arc::new(MockBackend::new(vec![MockBackend::image("", "AA==")]));
        let prompt = GarmentPrompt::parse("scarf").unwrap();

        let garment = pipeline(backend).generate_garment(&prompt).await.unwrap();

        assert_eq!(garment.media_type, "image/png");
    }
}
