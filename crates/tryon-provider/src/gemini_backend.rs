//! Gemini HTTP backend implementation
//!
//! Talks to the `models/{model}:generateContent` endpoint of the Generative
//! Language API. Requests carry ordered text and inline-image parts plus an
//! aspect-ratio hint; responses are scanned for inline image data.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http_client::HttpClient;
use crate::types::{Candidate, GenerationRequest, GenerationResponse, ImageBackend, InlineImage, Part};
use tryon_config::Config;
use tryon_utils::error::ProviderError;

const PROVIDER_NAME: &str = "gemini";

/// Checked when the configured key variable is unset
const FALLBACK_API_KEY_ENV: &str = "API_KEY";

/// Gemini backend configuration
#[derive(Clone)]
pub struct GeminiBackend {
    client: HttpClient,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiBackend {
    /// Create a new Gemini backend
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Misconfiguration` if the HTTP client cannot be constructed
    pub fn new(api_key: String, base_url: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: HttpClient::new()?,
            base_url: base_url.into(),
            api_key,
        })
    }

    /// Create a new Gemini backend from configuration
    ///
    /// The key is read from the variable named by `provider.api_key_env`,
    /// falling back to `API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Misconfiguration` if:
    /// - Neither environment variable holds a key
    /// - The HTTP client cannot be constructed
    pub fn new_from_config(config: &Config) -> Result<Self, ProviderError> {
        let api_key_env = config.api_key_env();
        let api_key = [api_key_env, FALLBACK_API_KEY_ENV]
            .into_iter()
            .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
            .ok_or_else(|| {
                ProviderError::Misconfiguration(format!(
                    "Gemini API key not found in environment variable '{api_key_env}' \
                     (or '{FALLBACK_API_KEY_ENV}'). Please set this variable or configure \
                     a different api_key_env in [provider]."
                ))
            })?;

        Self::new(api_key, config.base_url())
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }

    fn build_request(request: &GenerationRequest) -> GeminiRequest {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => GeminiPart {
                    text: Some(text.clone()),
                    inline_data: None,
                },
                Part::InlineImage(image) => GeminiPart {
                    text: None,
                    inline_data: Some(GeminiInlineData {
                        mime_type: Some(image.mime_type.clone()),
                        data: image.data.clone(),
                    }),
                },
            })
            .collect();

        GeminiRequest {
            contents: vec![GeminiContent { parts }],
            generation_config: request.aspect_ratio.as_ref().map(|ratio| GenerationConfig {
                image_config: ImageConfig {
                    aspect_ratio: ratio.clone(),
                },
            }),
        }
    }

    fn convert_response(body: GeminiResponse) -> GenerationResponse {
        let candidates = body
            .candidates
            .into_iter()
            .map(|candidate| Candidate {
                parts: candidate
                    .content
                    .map(|content| content.parts)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|part| match (part.inline_data, part.text) {
                        (Some(inline), _) => Some(Part::InlineImage(InlineImage {
                            mime_type: inline.mime_type.unwrap_or_default(),
                            data: inline.data,
                        })),
                        (None, Some(text)) => Some(Part::Text(text)),
                        (None, None) => None,
                    })
                    .collect(),
            })
            .collect();

        GenerationResponse { candidates }
    }
}

#[async_trait]
impl ImageBackend for GeminiBackend {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        debug!(
            provider = PROVIDER_NAME,
            model = %request.model,
            parts = request.parts.len(),
            aspect_ratio = ?request.aspect_ratio,
            timeout_secs = request.timeout.as_secs(),
            "Invoking Gemini backend"
        );

        let body = Self::build_request(&request);
        let http_request = self
            .client
            .post(&self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body);

        let response = self
            .client
            .execute(http_request, request.timeout, PROVIDER_NAME)
            .await?;

        let response_body: GeminiResponse = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("Failed to parse Gemini response: {e}"))
        })?;

        let result = Self::convert_response(response_body);

        debug!(
            provider = PROVIDER_NAME,
            candidates = result.candidates.len(),
            has_image = result.first_image().is_some(),
            "Gemini invocation completed"
        );

        Ok(result)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    image_config: ImageConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n")
    }

    /// Accept one connection, reply with `status_line` and `body`, return the raw request.
    async fn serve_once(
        status_line: &'static str,
        body: String,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 8192];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = header_end(&buf) {
                    let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                    let content_length = headers
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&buf).into_owned()
        });

        (format!("http://{addr}"), handle)
    }

    fn try_on_request() -> GenerationRequest {
        GenerationRequest::new(
            "gemini-2.5-flash-image",
            Duration::from_secs(10),
            vec![
                Part::image("image/jpeg", "UEVSU09O"),
                Part::image("image/png", "R0FSTUVOVA=="),
                Part::text("Generate a realistic full-body photo"),
            ],
        )
        .with_aspect_ratio("3:4")
    }

    #[test]
    fn test_build_request_wire_format() {
        let body = GeminiBackend::build_request(&try_on_request());
        let json = serde_json::to_value(&body).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "UEVSU09O");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[2]["text"], "Generate a realistic full-body photo");
        assert!(parts[2].get("inlineData").is_none());
        assert_eq!(json["generationConfig"]["imageConfig"]["aspectRatio"], "3:4");
    }

    #[test]
    fn test_build_request_without_aspect_ratio() {
        let request = GenerationRequest::new("m", Duration::from_secs(1), vec![Part::text("hi")]);
        let json = serde_json::to_value(GeminiBackend::build_request(&request)).unwrap();
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_convert_response_keeps_part_order() {
        let body: GeminiResponse = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [
                            {"text": "Here you go"},
                            {"inlineData": {"mimeType": "image/png", "data": "aW1n"}}
                        ]
                    },
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"promptTokenCount": 12}
            }"#,
        )
        .unwrap();

        let response = GeminiBackend::convert_response(body);
        assert_eq!(response.candidates[0].parts.len(), 2);
        assert_eq!(
            response.first_image(),
            Some(&InlineImage::new("image/png", "aW1n"))
        );
    }

    #[test]
    fn test_convert_response_blocked_prompt_has_no_image() {
        let body: GeminiResponse = serde_json::from_str(
            r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#,
        )
        .unwrap();

        let response = GeminiBackend::convert_response(body);
        assert!(response.candidates.is_empty());
        assert!(response.first_image().is_none());
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let backend = GeminiBackend::new("k".to_string(), "https://host/v1beta/").unwrap();
        assert_eq!(
            backend.endpoint("gemini-2.5-flash-image"),
            "https://host/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
    }

    #[test]
    fn test_debug_does_not_print_api_key() {
        let backend = GeminiBackend::new("super-secret".to_string(), "https://host").unwrap();
        assert!(!format!("{backend:?}").contains("super-secret"));
    }

    #[tokio::test]
    async fn test_generate_round_trip_against_local_server() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"image/png","data":"UkVTVUxU"}}]}}]}"#
                .to_string(),
        )
        .await;

        let backend = GeminiBackend::new("test-key".to_string(), base_url).unwrap();
        let response = backend.generate(try_on_request()).await.unwrap();

        assert_eq!(
            response.first_image(),
            Some(&InlineImage::new("image/png", "UkVTVUxU"))
        );

        let raw_request = server.await.unwrap();
        assert!(raw_request.starts_with("POST /models/gemini-2.5-flash-image:generateContent"));
        assert!(raw_request.to_lowercase().contains("x-goog-api-key: test-key"));
        assert!(raw_request.contains(r#""aspectRatio":"3:4""#));
    }

    #[tokio::test]
    async fn test_generate_maps_auth_failure() {
        let (base_url, server) = serve_once("403 Forbidden", "{}".to_string()).await;

        let backend = GeminiBackend::new("bad-key".to_string(), base_url).unwrap();
        let result = backend.generate(try_on_request()).await;

        assert!(matches!(result, Err(ProviderError::Auth(_))));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_generate_rejects_unparseable_body() {
        let (base_url, server) = serve_once("200 OK", "not json".to_string()).await;

        let backend = GeminiBackend::new("test-key".to_string(), base_url).unwrap();
        let result = backend.generate(try_on_request()).await;

        assert!(matches!(result, Err(ProviderError::MalformedResponse(_))));
        server.await.unwrap();
    }

    #[test]
    #[serial]
    fn test_new_from_config_missing_api_key() {
        let test_env_var = "TRYON_TEST_GEMINI_KEY_MISSING";
        // SAFETY: serialized with other env-mutating tests.
        unsafe {
            std::env::remove_var(test_env_var);
            std::env::remove_var(FALLBACK_API_KEY_ENV);
        }

        let mut config = Config::default();
        config.provider.api_key_env = Some(test_env_var.to_string());

        match GeminiBackend::new_from_config(&config) {
            Err(ProviderError::Misconfiguration(msg)) => {
                assert!(msg.contains(test_env_var), "got: {msg}");
                assert!(msg.contains("not found"), "got: {msg}");
            }
            other => panic!("Expected Misconfiguration for missing API key, got {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn test_new_from_config_falls_back_to_api_key() {
        let test_env_var = "TRYON_TEST_GEMINI_KEY_UNSET";
        // SAFETY: serialized with other env-mutating tests.
        unsafe {
            std::env::remove_var(test_env_var);
            std::env::set_var(FALLBACK_API_KEY_ENV, "fallback-key");
        }

        let mut config = Config::default();
        config.provider.api_key_env = Some(test_env_var.to_string());

        let backend = GeminiBackend::new_from_config(&config).unwrap();
        assert_eq!(backend.api_key, "fallback-key");

        unsafe {
            std::env::remove_var(FALLBACK_API_KEY_ENV);
        }
    }
}
