use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use super::{
    CliArgs, Config, ConfigSource, FetchConfig, GenerationConfig, PresetsConfig, ProviderConfig,
};
use tryon_utils::error::ConfigError;

/// Environment variable overriding the provider name
pub const ENV_PROVIDER: &str = "TRYON_PROVIDER";

/// Environment variable overriding the model
pub const ENV_MODEL: &str = "TRYON_MODEL";

const CONFIG_DIR: &str = ".tryon";
const CONFIG_FILE: &str = "config.toml";

/// Sections may be partial; missing keys keep their defaults.
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    provider: Option<TomlProvider>,
    generation: Option<TomlGeneration>,
    fetch: Option<TomlFetch>,
    presets: Option<PresetsConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlProvider {
    name: Option<String>,
    api_key_env: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlGeneration {
    garment_aspect_ratio: Option<String>,
    try_on_aspect_ratio: Option<String>,
    result_media_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlFetch {
    timeout_secs: Option<u64>,
    max_bytes: Option<u64>,
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Overwrite `target` when `value` is set, recording where it came from.
fn apply<T>(
    target: &mut Option<T>,
    value: Option<T>,
    key: &str,
    source: &ConfigSource,
    attribution: &mut HashMap<String, ConfigSource>,
) {
    if let Some(value) = value {
        *target = Some(value);
        attribution.insert(key.to_string(), source.clone());
    }
}

impl Config {
    /// Discover and load configuration with precedence: CLI > env > file > defaults
    ///
    /// Uses the current working directory for config file discovery when no
    /// explicit path is provided in `cli_args`.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        let mut attribution = HashMap::new();

        let mut provider = ProviderConfig::default();
        let mut generation = GenerationConfig::default();
        let mut fetch = FetchConfig::default();
        let mut presets = PresetsConfig::default();

        for key in [
            "provider",
            "api_key_env",
            "base_url",
            "model",
            "provider_timeout_secs",
            "garment_aspect_ratio",
            "try_on_aspect_ratio",
            "result_media_type",
            "fetch_timeout_secs",
            "fetch_max_bytes",
            "preset_persons",
            "preset_garments",
        ] {
            attribution.insert(key.to_string(), ConfigSource::Defaults);
        }

        let config_path = match &cli_args.config_path {
            Some(explicit_path) => Some(explicit_path.clone()),
            None => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            let source = ConfigSource::ConfigFile(path.clone());

            if let Some(file_provider) = file_config.provider {
                apply(&mut provider.name, file_provider.name, "provider", &source, &mut attribution);
                apply(
                    &mut provider.api_key_env,
                    file_provider.api_key_env,
                    "api_key_env",
                    &source,
                    &mut attribution,
                );
                apply(
                    &mut provider.base_url,
                    file_provider.base_url,
                    "base_url",
                    &source,
                    &mut attribution,
                );
                apply(&mut provider.model, file_provider.model, "model", &source, &mut attribution);
                apply(
                    &mut provider.timeout_secs,
                    file_provider.timeout_secs,
                    "provider_timeout_secs",
                    &source,
                    &mut attribution,
                );
            }

            if let Some(file_generation) = file_config.generation {
                apply(
                    &mut generation.garment_aspect_ratio,
                    file_generation.garment_aspect_ratio,
                    "garment_aspect_ratio",
                    &source,
                    &mut attribution,
                );
                apply(
                    &mut generation.try_on_aspect_ratio,
                    file_generation.try_on_aspect_ratio,
                    "try_on_aspect_ratio",
                    &source,
                    &mut attribution,
                );
                apply(
                    &mut generation.result_media_type,
                    file_generation.result_media_type,
                    "result_media_type",
                    &source,
                    &mut attribution,
                );
            }

            if let Some(file_fetch) = file_config.fetch {
                apply(
                    &mut fetch.timeout_secs,
                    file_fetch.timeout_secs,
                    "fetch_timeout_secs",
                    &source,
                    &mut attribution,
                );
                apply(
                    &mut fetch.max_bytes,
                    file_fetch.max_bytes,
                    "fetch_max_bytes",
                    &source,
                    &mut attribution,
                );
            }

            // A listed collection replaces the built-in presets for that collection only.
            if let Some(file_presets) = file_config.presets {
                if !file_presets.persons.is_empty() {
                    presets.persons = file_presets.persons;
                    attribution.insert("preset_persons".to_string(), source.clone());
                }
                if !file_presets.garments.is_empty() {
                    presets.garments = file_presets.garments;
                    attribution.insert("preset_garments".to_string(), source.clone());
                }
            }
        }

        apply(
            &mut provider.name,
            non_empty_env(ENV_PROVIDER),
            "provider",
            &ConfigSource::Env,
            &mut attribution,
        );
        apply(
            &mut provider.model,
            non_empty_env(ENV_MODEL),
            "model",
            &ConfigSource::Env,
            &mut attribution,
        );

        apply(
            &mut provider.name,
            cli_args.provider.clone(),
            "provider",
            &ConfigSource::Cli,
            &mut attribution,
        );
        apply(
            &mut provider.model,
            cli_args.model.clone(),
            "model",
            &ConfigSource::Cli,
            &mut attribution,
        );
        apply(
            &mut provider.timeout_secs,
            cli_args.provider_timeout_secs,
            "provider_timeout_secs",
            &ConfigSource::Cli,
            &mut attribution,
        );

        let config = Self {
            provider,
            generation,
            fetch,
            presets,
            source_attribution: attribution,
        };

        config.validate()?;

        Ok(config)
    }

    /// Discover config file by searching upward from a given directory
    ///
    /// Walks up the directory tree looking for `.tryon/config.toml`, stopping
    /// at repository root markers (.git, .hg, .svn) or filesystem root.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current_dir = Some(start_dir);

        while let Some(dir) = current_dir {
            let config_path = dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            if dir.join(".git").exists() || dir.join(".hg").exists() || dir.join(".svn").exists()
            {
                break;
            }

            current_dir = dir.parent();
        }

        None
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ConfigError::InvalidFile(format!("{}: {}", path.display(), e.to_string().trim()))
                    .into()
            }),
            // An explicit path that does not exist falls back to defaults.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TomlConfig::default()),
            Err(e) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            )),
        }
    }
}
