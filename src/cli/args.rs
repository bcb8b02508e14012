//! CLI argument definitions and parsing structures

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tryon - guided virtual try-on
#[derive(Parser, Debug)]
#[command(name = "tryon")]
#[command(about = "Compose a person image with a garment image using an image-generation provider")]
#[command(long_about = r#"
tryon walks through a three-step try-on: choose a person, choose or generate
a garment, then compose an image of the person wearing the garment.

EXAMPLES:
  # List built-in presets
  tryon presets

  # Compose a preset person with a local garment image
  tryon compose --person model-1 --garment ./jacket.png

  # Generate the garment from a description first
  tryon compose --person ./me.jpg --garment-prompt "red silk jacket" --output look.png

  # Generate a garment image only
  tryon garment --prompt "navy wool overcoat"

SOURCES:
  --person and --garment accept a preset id, an http(s) or data: URL, or a
  local image file (PNG, JPEG, WebP or GIF).

CONFIGURATION:
  Precedence: CLI flags > environment (TRYON_PROVIDER, TRYON_MODEL) > config file > defaults
  The config file is discovered by searching upward from CWD for .tryon/config.toml
  The API key is read from GEMINI_API_KEY (or the variable named by provider.api_key_env)
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Image-generation model
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Image-generation provider
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Provider call timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compose a person with a garment and save the result
    Compose {
        /// Person image: preset id, URL, or file path
        #[arg(long, value_name = "SRC")]
        person: String,

        /// Garment image: preset id, URL, or file path
        #[arg(
            long,
            value_name = "SRC",
            required_unless_present = "garment_prompt",
            conflicts_with = "garment_prompt"
        )]
        garment: Option<String>,

        /// Generate the garment from this description instead
        #[arg(long, value_name = "TEXT")]
        garment_prompt: Option<String>,

        /// Output file (default: try-on-<unix-millis>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a standalone garment image from a description
    Garment {
        /// Garment description
        #[arg(long, value_name = "TEXT")]
        prompt: String,

        /// Output file (default: garment-<unix-millis>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List preset person and garment images
    Presets {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show effective configuration and where each value came from
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
