//! Session orchestration engine for guided virtual try-on
//!
//! Leaf-first:
//! - [`codec`]: raw bytes ⇄ base64 payloads, data-URL display references
//! - [`fetch`]: remote image retrieval behind the `ImageFetcher` trait
//! - [`registry`]: person and garment collections with lazily cached encodings
//! - [`pipeline`]: garment synthesis and try-on composition over an `ImageBackend`
//! - [`session`]: the three-step wizard, generation slots, history and error state

pub mod codec;
pub mod fetch;
pub mod pipeline;
pub mod registry;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use codec::{DisplayRef, EncodedImage};
pub use fetch::{FetchedImage, HttpFetcher, ImageFetcher};
pub use pipeline::{GarmentPrompt, GenerationPipeline, PipelineSettings};
pub use registry::{
    AssetCollection, AssetId, AssetInput, AssetKind, AssetRegistry, ImageAsset, Provenance,
};
pub use session::{Outcome, Session, SessionState, Step};
