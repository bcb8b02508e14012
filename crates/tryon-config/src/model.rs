use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default provider name
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Default environment variable holding the provider API key
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default provider endpoint root
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default image-capable model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

/// Default provider timeout in seconds
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 120;

/// Default remote fetch timeout in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default cap on fetched image size (20 MiB)
pub const DEFAULT_FETCH_MAX_BYTES: u64 = 20 * 1024 * 1024;

/// Where a configuration value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Cli,
    Env,
    ConfigFile(PathBuf),
    Defaults,
}

/// Configuration for a tryon session.
///
/// `Config` provides hierarchical configuration with discovery and precedence:
/// CLI arguments > environment > config file > built-in defaults.
///
/// # Discovery
///
/// Use [`Config::discover()`] for CLI-like behavior that searches for
/// `.tryon/config.toml` upward from the current directory, stopping at a
/// repository root.
///
/// # Configuration File Format
///
/// ```toml
/// [provider]
/// name = "gemini"
/// api_key_env = "GEMINI_API_KEY"
/// model = "gemini-2.5-flash-image"
/// timeout_secs = 120
///
/// [generation]
/// garment_aspect_ratio = "1:1"
/// try_on_aspect_ratio = "3:4"
///
/// [fetch]
/// timeout_secs = 30
///
/// [[presets.persons]]
/// id = "model-1"
/// url = "https://example.com/model-1.jpg"
/// ```
///
/// The API key itself is never part of `Config`; only the name of the
/// environment variable that holds it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Image-generation provider settings.
    pub provider: ProviderConfig,
    /// Per-operation generation settings.
    pub generation: GenerationConfig,
    /// Remote image fetch settings.
    pub fetch: FetchConfig,
    /// Built-in person and garment assets seeded at session start.
    pub presets: PresetsConfig,
    /// Source attribution for each setting (for `tryon config`).
    pub source_attribution: HashMap<String, ConfigSource>,
}

/// Provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    pub name: Option<String>,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Generation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// Aspect-ratio hint for garment synthesis
    pub garment_aspect_ratio: Option<String>,
    /// Aspect-ratio hint for try-on composition
    pub try_on_aspect_ratio: Option<String>,
    /// Media type assumed when the provider omits one
    pub result_media_type: Option<String>,
}

/// Remote fetch configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchConfig {
    pub timeout_secs: Option<u64>,
    pub max_bytes: Option<u64>,
}

/// A single preset asset
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PresetEntry {
    pub id: String,
    pub url: String,
}

impl PresetEntry {
    #[must_use]
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

/// Preset assets, one list per collection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PresetsConfig {
    #[serde(default)]
    pub persons: Vec<PresetEntry>,
    #[serde(default)]
    pub garments: Vec<PresetEntry>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: Some(DEFAULT_PROVIDER.to_string()),
            api_key_env: Some(DEFAULT_API_KEY_ENV.to_string()),
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            model: Some(DEFAULT_MODEL.to_string()),
            timeout_secs: Some(DEFAULT_PROVIDER_TIMEOUT_SECS),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            garment_aspect_ratio: Some("1:1".to_string()),
            try_on_aspect_ratio: Some("3:4".to_string()),
            result_media_type: Some("image/png".to_string()),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Some(DEFAULT_FETCH_TIMEOUT_SECS),
            max_bytes: Some(DEFAULT_FETCH_MAX_BYTES),
        }
    }
}

impl Default for PresetsConfig {
    // Placeholder hosts; real deployments list their own presets in config.toml.
    fn default() -> Self {
        Self {
            persons: vec![
                PresetEntry::new("model-1", "https://example.com/tryon/presets/model-1.jpg"),
                PresetEntry::new("model-2", "https://example.com/tryon/presets/model-2.jpg"),
                PresetEntry::new("model-3", "https://example.com/tryon/presets/model-3.jpg"),
            ],
            garments: vec![
                PresetEntry::new("garment-1", "https://example.com/tryon/presets/garment-1.jpg"),
                PresetEntry::new("garment-2", "https://example.com/tryon/presets/garment-2.jpg"),
                PresetEntry::new("garment-3", "https://example.com/tryon/presets/garment-3.jpg"),
            ],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            generation: GenerationConfig::default(),
            fetch: FetchConfig::default(),
            presets: PresetsConfig::default(),
            source_attribution: HashMap::new(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name.as_deref().unwrap_or(DEFAULT_PROVIDER)
    }

    #[must_use]
    pub fn api_key_env(&self) -> &str {
        self.provider
            .api_key_env
            .as_deref()
            .unwrap_or(DEFAULT_API_KEY_ENV)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.provider.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    #[must_use]
    pub fn model(&self) -> &str {
        self.provider.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    #[must_use]
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(
            self.provider
                .timeout_secs
                .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn garment_aspect_ratio(&self) -> &str {
        self.generation
            .garment_aspect_ratio
            .as_deref()
            .unwrap_or("1:1")
    }

    #[must_use]
    pub fn try_on_aspect_ratio(&self) -> &str {
        self.generation
            .try_on_aspect_ratio
            .as_deref()
            .unwrap_or("3:4")
    }

    #[must_use]
    pub fn result_media_type(&self) -> &str {
        self.generation
            .result_media_type
            .as_deref()
            .unwrap_or("image/png")
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_secs.unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS))
    }

    #[must_use]
    pub fn fetch_max_bytes(&self) -> u64 {
        self.fetch.max_bytes.unwrap_or(DEFAULT_FETCH_MAX_BYTES)
    }
}
