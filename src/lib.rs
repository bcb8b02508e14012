//! tryon - guided virtual try-on
//!
//! Choose a person image, choose or generate a garment image, and compose an
//! image of the person wearing the garment through an image-generation
//! provider.
//!
//! tryon can be used in two ways:
//! - **CLI**: `tryon compose --person model-1 --garment-prompt "red silk jacket"`
//! - **Library**: drive a [`Session`] directly
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! export GEMINI_API_KEY=...
//!
//! # List the built-in person and garment presets
//! tryon presets
//!
//! # Compose a preset person with a local garment photo
//! tryon compose --person model-1 --garment ./jacket.png --output result.png
//!
//! # Generate a garment from a description, then compose
//! tryon compose --person ./me.jpg --garment-prompt "red silk jacket"
//!
//! # Show the effective configuration and where each value came from
//! tryon config
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use tryon::{AssetId, AssetKind, CliArgs, Config, Outcome, Session};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::discover(&CliArgs::default())?;
//! let session = Session::from_config(&config)?;
//!
//! session.select(AssetKind::Person, &AssetId::new("model-1"))?;
//! if let Outcome::Done(garment) = session.generate_garment_from_prompt("red silk jacket").await {
//!     println!("generated {}", garment.id());
//! }
//! if let Outcome::Done(result) = session.start_try_on().await {
//!     println!("result: {result}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Crate Layout
//!
//! | Crate | Contents |
//! |-------|----------|
//! | `tryon-utils` | errors, exit codes, redaction, logging, atomic writes |
//! | `tryon-config` | `.tryon/config.toml` discovery and precedence |
//! | `tryon-provider` | `ImageBackend` trait and the Gemini backend |
//! | `tryon-engine` | codec, asset registry, generation pipeline, session |

pub mod cli;

pub use tryon_config::{CliArgs, Config, ConfigSource, PresetEntry, PresetsConfig};
pub use tryon_engine::codec;
pub use tryon_engine::{
    AssetCollection, AssetId, AssetInput, AssetKind, AssetRegistry, DisplayRef, EncodedImage,
    FetchedImage, GarmentPrompt, GenerationPipeline, HttpFetcher, ImageAsset, ImageFetcher,
    Outcome, PipelineSettings, Provenance, Session, SessionState, Step,
};
pub use tryon_provider::{GeminiBackend, GenerationRequest, GenerationResponse, ImageBackend};
pub use tryon_utils::error::{
    AssetError, CodecError, ConfigError, GenerationError, ProviderError, TryOnError,
    UserFriendlyError,
};
pub use tryon_utils::exit_codes::ExitCode;
