use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::exit_codes::ExitCode;

/// Library-level error type with rich context and user-friendly reporting.
///
/// `TryOnError` is the error type returned by tryon library operations that sit
/// outside the session boundary (configuration discovery, backend construction,
/// CLI input handling). Inside a session every failure is converted into
/// `lastError` text instead of propagating.
///
/// # Error Categories
///
/// | Category | Description |
/// |----------|-------------|
/// | `Config` | Configuration file, environment, or CLI argument errors |
/// | `Asset` | Asset creation or selection failures |
/// | `Codec` | Remote fetch failures and malformed payloads |
/// | `Generation` | Provider failures and empty provider responses |
/// | `Io` | Local filesystem failures |
///
/// # Exit Code Mapping
///
/// Use [`to_exit_code()`](Self::to_exit_code) to map errors to CLI exit codes:
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 2 | Configuration/CLI argument errors, provider misconfiguration |
/// | 3 | Asset creation, selection, and fetch errors |
/// | 10 | Provider timeout |
/// | 70 | Provider failure or no image produced |
/// | 1 | Other errors |
///
/// # Example
///
/// ```rust
/// use tryon_utils::error::{ConfigError, TryOnError};
/// use tryon_utils::exit_codes::ExitCode;
///
/// let err = TryOnError::Config(ConfigError::MissingRequired("provider.model".to_string()));
/// assert_eq!(err.to_exit_code(), ExitCode::CLI_ARGS);
/// ```
#[derive(Error, Debug)]
pub enum TryOnError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<ProviderError> for TryOnError {
    fn from(err: ProviderError) -> Self {
        Self::Generation(GenerationError::Provider(err))
    }
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Assets,
    Network,
    Provider,
    FileSystem,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Assets => write!(f, "Assets"),
            Self::Network => write!(f, "Network"),
            Self::Provider => write!(f, "Provider"),
            Self::FileSystem => write!(f, "File System"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::MissingRequired(key) => {
                format!("Required configuration '{key}' is missing")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::DiscoveryFailed { reason } => {
                format!("Failed to discover configuration: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files must be valid TOML with [provider], [generation], [fetch] and [presets] sections."
                    .to_string(),
            ),
            Self::MissingRequired(_) => None,
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' configuration option has specific format requirements."
            )),
            Self::DiscoveryFailed { .. } => Some(
                "tryon searches for .tryon/config.toml starting from the current directory upward."
                    .to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax using a TOML validator".to_string(),
                "Compare with the example configuration in the README".to_string(),
            ],
            Self::MissingRequired(key) => vec![format!(
                "Add '{key}' to .tryon/config.toml or pass it as a CLI flag"
            )],
            Self::InvalidValue { key, .. } => match key.as_str() {
                "garment_aspect_ratio" | "try_on_aspect_ratio" => vec![
                    "Use the form W:H with positive integers, e.g. \"1:1\" or \"3:4\"".to_string(),
                ],
                "provider" => vec!["Use 'gemini' as the provider name".to_string()],
                _ => vec![
                    "Check the documentation for valid values for this option".to_string(),
                    "Remove the option to use the default value".to_string(),
                ],
            },
            Self::DiscoveryFailed { .. } => vec![
                "Check file permissions in the current directory and parent directories"
                    .to_string(),
                "Use --config <path> to specify a configuration file explicitly".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Asset registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// Input bytes or payload could not be turned into an asset
    #[error("Asset creation failed: {reason}")]
    Creation { reason: String },

    /// A selection referenced an id that is not in the collection
    #[error("Asset '{id}' not found in {collection} collection")]
    NotFound { collection: String, id: String },
}

impl UserFriendlyError for AssetError {
    fn user_message(&self) -> String {
        match self {
            Self::Creation { reason } => format!("Failed to add image: {reason}"),
            Self::NotFound { collection, id } => {
                format!("The selected {collection} image '{id}' is no longer available")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Creation { .. } => Some(
                "Uploaded files must be PNG, JPEG, WebP or GIF images; encoded payloads must be valid base64."
                    .to_string(),
            ),
            Self::NotFound { .. } => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Creation { .. } => vec![
                "Check that the file is a supported image format".to_string(),
                "Try exporting the image again from your editor".to_string(),
            ],
            Self::NotFound { .. } => vec!["Pick an image from the list again".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Assets
    }
}

/// Codec and remote fetch errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Remote retrieval failed: non-success status, network error, or access denied
    #[error("Failed to fetch image from {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Payload was not valid base64 or not a valid data URL
    #[error("Failed to decode image payload: {0}")]
    Decode(String),
}

impl UserFriendlyError for CodecError {
    fn user_message(&self) -> String {
        match self {
            Self::Fetch { url, reason } => {
                format!("Could not download the image at {url}: {reason}")
            }
            Self::Decode(reason) => format!("Image data is corrupted: {reason}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Fetch { .. } => Some(
                "Preset and remote images are downloaded the first time they are used in a try-on."
                    .to_string(),
            ),
            Self::Decode(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Fetch { .. } => vec![
                "Check network connectivity".to_string(),
                "Verify the image URL is reachable and publicly accessible".to_string(),
                "Upload the image from a local file instead".to_string(),
            ],
            Self::Decode(_) => vec!["Upload the image again".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch { .. } => ErrorCategory::Network,
            Self::Decode(_) => ErrorCategory::Assets,
        }
    }
}

/// Errors from the external image-generation provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Transport-level failure (HTTP connectivity, unexpected 4xx)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider authentication failure (401, 403, missing API key)
    #[error("Provider authentication error: {0}")]
    Auth(String),

    /// Provider quota/rate limit exceeded (429)
    #[error("Provider quota exceeded: {0}")]
    Quota(String),

    /// Provider service outage (5xx errors)
    #[error("Provider outage: {0}")]
    Outage(String),

    /// Invocation timed out
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Configuration error
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Unsupported provider
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Response body could not be parsed
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl UserFriendlyError for ProviderError {
    fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("Could not reach the image provider: {msg}"),
            Self::Auth(msg) => format!("Image provider rejected the API key: {msg}"),
            Self::Quota(msg) => format!("Image provider quota exceeded: {msg}"),
            Self::Outage(msg) => format!("Image provider is unavailable: {msg}"),
            Self::Timeout { duration } => {
                format!("Image generation timed out after {duration:?}")
            }
            Self::Misconfiguration(msg) => format!("Image provider is misconfigured: {msg}"),
            Self::Unsupported(msg) => format!("Image provider not supported: {msg}"),
            Self::MalformedResponse(msg) => {
                format!("Image provider returned an unreadable response: {msg}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Auth(_) | Self::Misconfiguration(_) => Some(
                "The API key is read from the environment variable named by provider.api_key_env."
                    .to_string(),
            ),
            Self::Quota(_) => Some(
                "Quota errors occur when rate limits or usage limits are exceeded.".to_string(),
            ),
            Self::Outage(_) => {
                Some("Provider outages are temporary service disruptions.".to_string())
            }
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Auth(_) | Self::Misconfiguration(_) => vec![
                "Set GEMINI_API_KEY (or the variable named in provider.api_key_env)".to_string(),
                "Verify the key has access to the configured model".to_string(),
            ],
            Self::Quota(_) | Self::Outage(_) => {
                vec!["Wait a moment and start the generation again".to_string()]
            }
            Self::Timeout { .. } => {
                vec!["Increase provider.timeout_secs in .tryon/config.toml".to_string()]
            }
            Self::Transport(_) => vec!["Check network connectivity".to_string()],
            Self::Unsupported(_) => vec!["Use provider.name = \"gemini\"".to_string()],
            Self::MalformedResponse(_) => {
                vec!["Check that provider.base_url points at a compatible API".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Misconfiguration(_) | Self::Unsupported(_) => ErrorCategory::Configuration,
            _ => ErrorCategory::Provider,
        }
    }
}

/// Errors from a single generation round trip
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The provider call itself failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The call succeeded but the response carried no image part
    #[error("No image produced by {operation}")]
    NoImageProduced { operation: String },
}

impl UserFriendlyError for GenerationError {
    fn user_message(&self) -> String {
        match self {
            Self::Provider(err) => err.user_message(),
            Self::NoImageProduced { operation } => {
                format!("The provider finished {operation} but returned no image")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Provider(err) => err.context(),
            Self::NoImageProduced { .. } => Some(
                "Providers sometimes answer with text only, for example when a request is declined."
                    .to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Provider(err) => err.suggestions(),
            Self::NoImageProduced { .. } => vec![
                "Try again with a different garment or description".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Provider(err) => err.category(),
            Self::NoImageProduced { .. } => ErrorCategory::Provider,
        }
    }
}

impl UserFriendlyError for TryOnError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.user_message(),
            Self::Asset(err) => err.user_message(),
            Self::Codec(err) => err.user_message(),
            Self::Generation(err) => err.user_message(),
            Self::Io(err) => format!("File system operation failed: {err}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(err) => err.context(),
            Self::Asset(err) => err.context(),
            Self::Codec(err) => err.context(),
            Self::Generation(err) => err.context(),
            Self::Io(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(err) => err.suggestions(),
            Self::Asset(err) => err.suggestions(),
            Self::Codec(err) => err.suggestions(),
            Self::Generation(err) => err.suggestions(),
            Self::Io(_) => vec!["Check file permissions and available disk space".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(err) => err.category(),
            Self::Asset(err) => err.category(),
            Self::Codec(err) => err.category(),
            Self::Generation(err) => err.category(),
            Self::Io(_) => ErrorCategory::FileSystem,
        }
    }
}

impl TryOnError {
    /// Map the error to a CLI exit code
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => ExitCode::CLI_ARGS,
            Self::Asset(_) | Self::Codec(_) => ExitCode::INPUT_FAILURE,
            Self::Generation(GenerationError::Provider(err)) => match err {
                ProviderError::Timeout { .. } => ExitCode::GENERATION_TIMEOUT,
                ProviderError::Misconfiguration(_) | ProviderError::Unsupported(_) => {
                    ExitCode::CLI_ARGS
                }
                _ => ExitCode::PROVIDER_FAILURE,
            },
            Self::Generation(GenerationError::NoImageProduced { .. }) => {
                ExitCode::PROVIDER_FAILURE
            }
            Self::Io(_) => ExitCode::INTERNAL,
        }
    }

    /// Render the error with context and suggestions for terminal output
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut out = format!("✗ {}", self.user_message());
        if let Some(context) = self.context() {
            out.push_str(&format!("\n\n  {context}"));
        }
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push_str("\n\n  Suggestions:");
            for suggestion in suggestions {
                out.push_str(&format!("\n    • {suggestion}"));
            }
        }
        out
    }
}
