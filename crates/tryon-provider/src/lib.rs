//! Image-generation provider abstraction
//!
//! Providers implement the `ImageBackend` trait: a request made of ordered text
//! and inline-image parts goes out, a response whose parts may include generated
//! images comes back. The generation pipeline only sees this trait.

mod gemini_backend;
pub(crate) mod http_client;
mod types;

pub use gemini_backend::GeminiBackend;
pub use tryon_utils::error::ProviderError;
pub use types::{Candidate, GenerationRequest, GenerationResponse, ImageBackend, InlineImage, Part};

use std::sync::Arc;
use tryon_config::Config;

/// Create an image backend from configuration.
///
/// # Errors
///
/// Returns `ProviderError::Unsupported` if the provider is unknown.
/// Returns `ProviderError::Misconfiguration` if the API key is missing or the
/// HTTP client cannot be constructed.
pub fn from_config(config: &Config) -> Result<Arc<dyn ImageBackend>, ProviderError> {
    match config.provider_name() {
        "gemini" => Ok(Arc::new(GeminiBackend::new_from_config(config)?)),
        unknown => Err(ProviderError::Unsupported(format!(
            "Unknown image provider '{unknown}'. Supported providers: gemini."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_is_unsupported() {
        let mut config = Config::default();
        config.provider.name = Some("stable-diffusion".to_string());

        match from_config(&config) {
            Err(ProviderError::Unsupported(msg)) => assert!(msg.contains("stable-diffusion")),
            Err(other) => panic!("expected Unsupported, got {other:?}"),
            Ok(_) => panic!("expected Unsupported, got a backend"),
        }
    }
}
