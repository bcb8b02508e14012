use std::collections::HashSet;

use tryon_utils::error::ConfigError;

use super::{Config, PresetEntry};

const KNOWN_PROVIDERS: &[&str] = &["gemini"];
const MAX_TIMEOUT_SECS: u64 = 3600;
const MAX_FETCH_BYTES: u64 = 100 * 1024 * 1024;

fn invalid(key: &str, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    }
}

fn validate_timeout(key: &str, secs: Option<u64>) -> Result<(), ConfigError> {
    if let Some(secs) = secs {
        if secs == 0 {
            return Err(invalid(key, "must be greater than 0"));
        }
        if secs > MAX_TIMEOUT_SECS {
            return Err(invalid(
                key,
                format!("exceeds maximum limit of {MAX_TIMEOUT_SECS} seconds"),
            ));
        }
    }
    Ok(())
}

/// Aspect ratios are `W:H` with both sides positive integers.
fn is_aspect_ratio(value: &str) -> bool {
    match value.split_once(':') {
        Some((w, h)) => matches!(
            (w.parse::<u32>(), h.parse::<u32>()),
            (Ok(w), Ok(h)) if w > 0 && h > 0
        ),
        None => false,
    }
}

fn is_preset_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://") || url.starts_with("data:image/")
}

fn validate_presets(key: &str, entries: &[PresetEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for entry in entries {
        if entry.id.trim().is_empty() {
            return Err(invalid(key, "preset id must not be empty"));
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(invalid(key, format!("duplicate preset id '{}'", entry.id)));
        }
        if !is_preset_url(&entry.url) {
            return Err(invalid(
                key,
                format!(
                    "preset '{}' must use an http(s) or data:image URL, got '{}'",
                    entry.id, entry.url
                ),
            ));
        }
    }
    Ok(())
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let provider = self.provider_name();
        if !KNOWN_PROVIDERS.contains(&provider) {
            return Err(invalid(
                "provider",
                format!(
                    "unknown provider '{provider}', expected one of: {}",
                    KNOWN_PROVIDERS.join(", ")
                ),
            ));
        }

        if self.model().trim().is_empty() {
            return Err(ConfigError::MissingRequired("model".to_string()));
        }

        if self.api_key_env().trim().is_empty() {
            return Err(ConfigError::MissingRequired("api_key_env".to_string()));
        }

        validate_timeout("provider_timeout_secs", self.provider.timeout_secs)?;
        validate_timeout("fetch_timeout_secs", self.fetch.timeout_secs)?;

        for (key, value) in [
            ("garment_aspect_ratio", self.garment_aspect_ratio()),
            ("try_on_aspect_ratio", self.try_on_aspect_ratio()),
        ] {
            if !is_aspect_ratio(value) {
                return Err(invalid(key, format!("'{value}' is not of the form W:H")));
            }
        }

        if !self.result_media_type().starts_with("image/") {
            return Err(invalid(
                "result_media_type",
                format!("'{}' is not an image media type", self.result_media_type()),
            ));
        }

        if let Some(max_bytes) = self.fetch.max_bytes {
            if max_bytes == 0 {
                return Err(invalid("fetch_max_bytes", "must be greater than 0"));
            }
            if max_bytes > MAX_FETCH_BYTES {
                return Err(invalid("fetch_max_bytes", "exceeds maximum limit of 100MB"));
            }
        }

        validate_presets("presets.persons", &self.presets.persons)?;
        validate_presets("presets.garments", &self.presets.garments)?;

        Ok(())
    }
}
