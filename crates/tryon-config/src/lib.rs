//! Configuration management for tryon
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > environment > file > defaults. Configuration files are TOML with
//! `[provider]`, `[generation]`, `[fetch]` and `[presets]` sections.

mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

pub use cli_args::CliArgs;
pub use discovery::{ENV_MODEL, ENV_PROVIDER};
pub use model::*;
pub use tryon_utils::error::ConfigError;
