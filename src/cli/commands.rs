//! Command implementations
//!
//! Each command drives a [`Session`] the same way an interactive client
//! would: select or add a person, select, add or generate a garment, then
//! start the try-on and save the result.

use chrono::Utc;
use serde_json::json;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::codec;
use crate::{
    AssetError, AssetId, AssetInput, AssetKind, Config, ConfigError, DisplayRef, Outcome,
    Provenance, Session, Step, TryOnError,
};
use tryon_utils::atomic_write::write_bytes_atomic;

/// Where the garment for a composition comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GarmentSource {
    /// Preset id, URL, or file path
    Existing(String),
    /// Text description to synthesize from
    Prompt(String),
}

/// `tryon presets`
pub(crate) fn list_presets(config: &Config, json: bool) -> Result<(), TryOnError> {
    let presets = &config.presets;

    if json {
        let value = json!({
            "persons": presets.persons,
            "garments": presets.garments,
        });
        println!("{}", to_pretty_json(&value)?);
        return Ok(());
    }

    for (title, entries) in [("Persons", &presets.persons), ("Garments", &presets.garments)] {
        println!("{title}:");
        if entries.is_empty() {
            println!("  (none)");
        }
        for entry in entries {
            println!("  {:<16} {}", entry.id, entry.url);
        }
    }
    Ok(())
}

/// `tryon config`
pub(crate) fn show_config(config: &Config, json: bool) -> Result<(), TryOnError> {
    let effective = config.effective_config();

    if json {
        let value: serde_json::Map<String, serde_json::Value> = effective
            .into_iter()
            .map(|(key, (value, source))| (key, json!({ "value": value, "source": source })))
            .collect();
        println!("{}", to_pretty_json(&value)?);
        return Ok(());
    }

    println!("Effective configuration:");
    for (key, (value, source)) in &effective {
        println!("  {key} = {value} ({source})");
    }
    Ok(())
}

/// `tryon compose`
pub(crate) async fn compose(
    session: &Session,
    person: &str,
    garment: GarmentSource,
    output: Option<PathBuf>,
) -> Result<(), TryOnError> {
    add_or_select(session, AssetKind::Person, person)?;
    session.go_to_step(Step::ChoosingGarment);

    match garment {
        GarmentSource::Existing(source) => {
            add_or_select(session, AssetKind::Garment, &source)?;
        }
        GarmentSource::Prompt(prompt) => {
            let asset = run_outcome(session.generate_garment_from_prompt(&prompt).await, || {
                blank_prompt("--garment-prompt")
            })?;
            println!("✓ Generated garment {}", asset.id());
        }
    }

    let result = run_outcome(session.start_try_on().await, || missing_selection(session))?;

    let path = save_display_ref(&result, output, "try-on")?;
    println!("✓ Saved try-on result to {}", path.display());
    Ok(())
}

/// `tryon garment`
pub(crate) async fn generate_garment(
    session: &Session,
    prompt: &str,
    output: Option<PathBuf>,
) -> Result<(), TryOnError> {
    let asset = run_outcome(session.generate_garment_from_prompt(prompt).await, || {
        blank_prompt("--prompt")
    })?;

    let path = save_display_ref(asset.display_ref(), output, "garment")?;
    println!("✓ Saved garment {} to {}", asset.id(), path.display());
    Ok(())
}

fn run_outcome<T>(
    outcome: Outcome<T>,
    on_skipped: impl FnOnce() -> TryOnError,
) -> Result<T, TryOnError> {
    match outcome {
        Outcome::Done(value) => Ok(value),
        Outcome::Failed(err) => Err(err),
        Outcome::Skipped => Err(on_skipped()),
    }
}

fn blank_prompt(flag: &str) -> TryOnError {
    TryOnError::Config(ConfigError::InvalidValue {
        key: flag.to_string(),
        value: "garment description must not be blank".to_string(),
    })
}

fn missing_selection(session: &Session) -> TryOnError {
    let kind = if session.selected(AssetKind::Person).is_none() {
        AssetKind::Person
    } else {
        AssetKind::Garment
    };
    TryOnError::Asset(AssetError::NotFound {
        collection: kind.to_string(),
        id: "(none selected)".to_string(),
    })
}

fn is_url(source: &str) -> bool {
    ["http://", "https://", "data:"]
        .iter()
        .any(|scheme| source.starts_with(scheme))
}

/// Resolve a source argument to a selected asset: URL, then preset id, then file path
fn add_or_select(session: &Session, kind: AssetKind, source: &str) -> Result<AssetId, TryOnError> {
    if is_url(source) {
        let asset = session.add_asset(
            kind,
            AssetInput::Remote {
                url: source.to_string(),
            },
            Provenance::Uploaded,
        )?;
        return Ok(asset.id().clone());
    }

    let id = AssetId::new(source);
    if session.with_registry(|registry| registry.collection(kind).contains(&id)) {
        session.select(kind, &id)?;
        return Ok(id);
    }

    let path = Path::new(source);
    if path.is_file() {
        debug!(kind = %kind, path = %path.display(), "Reading image file");
        let bytes = fs::read(path)?;
        let asset = session.add_asset(
            kind,
            AssetInput::Upload {
                bytes,
                display_ref: None,
            },
            Provenance::Uploaded,
        )?;
        return Ok(asset.id().clone());
    }

    Err(TryOnError::Asset(AssetError::NotFound {
        collection: kind.to_string(),
        id: source.to_string(),
    }))
}

/// Decode an image display reference and write it atomically
fn save_display_ref(
    display_ref: &DisplayRef,
    output: Option<PathBuf>,
    prefix: &str,
) -> Result<PathBuf, TryOnError> {
    let (media_type, bytes) = codec::from_display_ref(display_ref)?;
    let path = output.unwrap_or_else(|| default_output_path(prefix, &media_type));

    write_bytes_atomic(&path, &bytes).map_err(|e| io::Error::other(format!("{e:#}")))?;
    Ok(path)
}

fn default_output_path(prefix: &str, media_type: &str) -> PathBuf {
    PathBuf::from(format!(
        "{prefix}-{}.{}",
        Utc::now().timestamp_millis(),
        codec::extension_for(media_type)
    ))
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String, TryOnError> {
    serde_json::to_string_pretty(value).map_err(|e| TryOnError::Io(io::Error::other(e)))
}
