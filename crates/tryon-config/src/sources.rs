use std::collections::BTreeMap;

use super::{Config, ConfigSource};

fn source_label(source: Option<&ConfigSource>) -> &'static str {
    match source {
        Some(ConfigSource::Cli) => "cli",
        Some(ConfigSource::Env) => "env",
        Some(ConfigSource::ConfigFile(_)) => "config",
        Some(ConfigSource::Defaults) | None => "default",
    }
}

impl Config {
    /// Get effective configuration as key-value pairs with source attribution
    ///
    /// Keys are sorted so `tryon config` output is stable.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        let mut add_config = |key: &str, value: String| {
            let source = source_label(self.source_attribution.get(key));
            config.insert(key.to_string(), (value, source.to_string()));
        };

        add_config("provider", self.provider_name().to_string());
        add_config("api_key_env", self.api_key_env().to_string());
        add_config("base_url", self.base_url().to_string());
        add_config("model", self.model().to_string());
        add_config(
            "provider_timeout_secs",
            self.provider_timeout().as_secs().to_string(),
        );
        add_config(
            "garment_aspect_ratio",
            self.garment_aspect_ratio().to_string(),
        );
        add_config("try_on_aspect_ratio", self.try_on_aspect_ratio().to_string());
        add_config("result_media_type", self.result_media_type().to_string());
        add_config("fetch_timeout_secs", self.fetch_timeout().as_secs().to_string());
        add_config("fetch_max_bytes", self.fetch_max_bytes().to_string());
        add_config("preset_persons", self.presets.persons.len().to_string());
        add_config("preset_garments", self.presets.garments.len().to_string());

        config
    }
}
