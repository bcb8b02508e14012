//! Person and garment collections
//!
//! Each collection is an ordered list of immutable assets plus at most one
//! selection. New assets are prepended and become the selection. The only
//! state an asset ever gains after creation is its encoding, filled in once
//! by [`ImageAsset::resolve_encoding`] and shared by every clone of the asset.

use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::codec::{self, DisplayRef, EncodedImage};
use crate::fetch::ImageFetcher;
use tryon_config::{PresetEntry, PresetsConfig};
use tryon_utils::error::{AssetError, CodecError};

/// Opaque asset identifier, unique within its collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(String);

impl AssetId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which collection an asset belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Person,
    Garment,
}

impl AssetKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Person => "person",
            AssetKind::Garment => "garment",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an asset came from. Set once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    Preset,
    Uploaded,
    Generated,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Provenance::Preset => "preset",
            Provenance::Uploaded => "uploaded",
            Provenance::Generated => "generated",
        })
    }
}

/// Raw material for a new asset
#[derive(Debug, Clone)]
pub enum AssetInput {
    /// Raw file bytes, optionally with a display handle from the file picker
    Upload {
        bytes: Vec<u8>,
        display_ref: Option<DisplayRef>,
    },
    /// A base64 payload (bare or as a data URL), e.g. a generated image
    Encoded {
        data: String,
        media_type: Option<String>,
    },
    /// A remote reference, encoded on first use
    Remote { url: String },
}

/// A person or garment image
#[derive(Debug, Clone)]
pub struct ImageAsset {
    id: AssetId,
    display_ref: DisplayRef,
    provenance: Provenance,
    encoding: Arc<OnceCell<EncodedImage>>,
}

impl ImageAsset {
    fn new(
        id: AssetId,
        display_ref: DisplayRef,
        provenance: Provenance,
        encoding: Option<EncodedImage>,
    ) -> Self {
        Self {
            id,
            display_ref,
            provenance,
            encoding: Arc::new(OnceCell::new_with(encoding)),
        }
    }

    #[must_use]
    pub fn id(&self) -> &AssetId {
        &self.id
    }

    #[must_use]
    pub fn display_ref(&self) -> &DisplayRef {
        &self.display_ref
    }

    #[must_use]
    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// The encoding, if it has been materialized
    #[must_use]
    pub fn cached_encoding(&self) -> Option<&EncodedImage> {
        self.encoding.get()
    }

    /// Return the cached encoding, fetching and caching it on first use.
    ///
    /// Concurrent callers for the same asset wait on a single fetch. A failed
    /// fetch is not cached; the next call tries again.
    ///
    /// # Errors
    ///
    /// Returns `CodecError` if the display reference cannot be fetched or decoded.
    pub async fn resolve_encoding(
        &self,
        fetcher: &dyn ImageFetcher,
    ) -> Result<EncodedImage, CodecError> {
        self.encoding
            .get_or_try_init(|| codec::fetch_and_encode(fetcher, self.display_ref.as_str()))
            .await
            .cloned()
    }
}

/// Ordered assets of one kind plus the current selection
#[derive(Debug, Clone)]
pub struct AssetCollection {
    kind: AssetKind,
    assets: Vec<ImageAsset>,
    selected: Option<AssetId>,
}

impl AssetCollection {
    fn new(kind: AssetKind) -> Self {
        Self {
            kind,
            assets: Vec::new(),
            selected: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    /// Assets, newest first, presets last
    #[must_use]
    pub fn assets(&self) -> &[ImageAsset] {
        &self.assets
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &AssetId) -> Option<&ImageAsset> {
        self.assets.iter().find(|asset| &asset.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &AssetId) -> bool {
        self.get(id).is_some()
    }

    #[must_use]
    pub fn selected_id(&self) -> Option<&AssetId> {
        self.selected.as_ref()
    }

    #[must_use]
    pub fn selected(&self) -> Option<&ImageAsset> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    /// Select an asset by id. Re-selecting the current selection is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `AssetError::NotFound` if `id` is not in this collection.
    pub fn select(&mut self, id: &AssetId) -> Result<(), AssetError> {
        if !self.contains(id) {
            return Err(AssetError::NotFound {
                collection: self.kind.to_string(),
                id: id.to_string(),
            });
        }
        self.selected = Some(id.clone());
        Ok(())
    }

    fn prepend(&mut self, asset: ImageAsset) {
        self.selected = Some(asset.id.clone());
        self.assets.insert(0, asset);
    }
}

/// Both collections plus the id allocator
#[derive(Debug, Clone)]
pub struct AssetRegistry {
    persons: AssetCollection,
    garments: AssetCollection,
    next_id: u64,
}

impl Default for AssetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetRegistry {
    /// Empty registry with no presets
    #[must_use]
    pub fn new() -> Self {
        Self {
            persons: AssetCollection::new(AssetKind::Person),
            garments: AssetCollection::new(AssetKind::Garment),
            next_id: 1,
        }
    }

    /// Registry seeded with preset assets in configuration order; nothing selected
    #[must_use]
    pub fn with_presets(presets: &PresetsConfig) -> Self {
        let mut registry = Self::new();
        registry.seed(AssetKind::Person, &presets.persons);
        registry.seed(AssetKind::Garment, &presets.garments);
        registry
    }

    fn seed(&mut self, kind: AssetKind, entries: &[PresetEntry]) {
        let collection = self.collection_mut(kind);
        for entry in entries {
            let id = AssetId::new(entry.id.clone());
            if collection.contains(&id) {
                continue;
            }
            collection.assets.push(ImageAsset::new(
                id,
                DisplayRef::new(entry.url.clone()),
                Provenance::Preset,
                None,
            ));
        }
    }

    #[must_use]
    pub fn collection(&self, kind: AssetKind) -> &AssetCollection {
        match kind {
            AssetKind::Person => &self.persons,
            AssetKind::Garment => &self.garments,
        }
    }

    fn collection_mut(&mut self, kind: AssetKind) -> &mut AssetCollection {
        match kind {
            AssetKind::Person => &mut self.persons,
            AssetKind::Garment => &mut self.garments,
        }
    }

    /// Selected asset of a collection, if any
    #[must_use]
    pub fn selected(&self, kind: AssetKind) -> Option<&ImageAsset> {
        self.collection(kind).selected()
    }

    /// # Errors
    ///
    /// Returns `AssetError::NotFound` if `id` is not in the collection.
    pub fn select(&mut self, kind: AssetKind, id: &AssetId) -> Result<(), AssetError> {
        self.collection_mut(kind).select(id)
    }

    /// Create an asset, prepend it to its collection and select it
    ///
    /// # Errors
    ///
    /// Returns `AssetError::Creation` for empty upload bytes, malformed base64,
    /// or an unusable remote reference. Upload bytes of an unrecognised format
    /// are kept and labelled with the default media type.
    pub fn add_asset(
        &mut self,
        kind: AssetKind,
        input: AssetInput,
        provenance: Provenance,
    ) -> Result<ImageAsset, AssetError> {
        let (display_ref, encoding) = Self::materialize(input)?;
        let id = self.allocate_id(kind);
        let asset = ImageAsset::new(id, display_ref, provenance, encoding);
        self.collection_mut(kind).prepend(asset.clone());
        Ok(asset)
    }

    fn materialize(input: AssetInput) -> Result<(DisplayRef, Option<EncodedImage>), AssetError> {
        match input {
            AssetInput::Upload { bytes, display_ref } => {
                if bytes.is_empty() {
                    return Err(creation("uploaded file is empty"));
                }
                let media_type =
                    codec::sniff_media_type(&bytes).unwrap_or(codec::DEFAULT_MEDIA_TYPE);
                let encoding = EncodedImage::new(media_type, codec::encode(&bytes));
                let display_ref = display_ref.unwrap_or_else(|| encoding.to_display_ref());
                Ok((display_ref, Some(encoding)))
            }
            AssetInput::Encoded { data, media_type } => {
                let declared = codec::split_data_url(&data).map(|(ty, _)| ty.to_string());
                let payload = codec::strip_data_url_prefix(&data).trim();
                let bytes = codec::decode(payload).map_err(|e| creation(e.to_string()))?;
                if bytes.is_empty() {
                    return Err(creation("encoded payload is empty"));
                }
                let media_type = media_type
                    .filter(|ty| !ty.is_empty())
                    .or(declared.filter(|ty| !ty.is_empty()))
                    .or_else(|| codec::sniff_media_type(&bytes).map(str::to_string))
                    .unwrap_or_else(|| codec::DEFAULT_MEDIA_TYPE.to_string());
                let encoding = EncodedImage::new(media_type, payload);
                Ok((encoding.to_display_ref(), Some(encoding)))
            }
            AssetInput::Remote { url } => {
                let url = url.trim();
                if !(url.starts_with("https://")
                    || url.starts_with("http://")
                    || url.starts_with("data:"))
                {
                    return Err(creation(format!(
                        "'{url}' is not an http(s) or data URL"
                    )));
                }
                Ok((DisplayRef::new(url), None))
            }
        }
    }

    /// Next counter-based id not already used by the collection (presets carry their own ids)
    fn allocate_id(&mut self, kind: AssetKind) -> AssetId {
        loop {
            let candidate = AssetId::new(format!("{}-{}", kind.as_str(), self.next_id));
            self.next_id += 1;
            if !self.collection(kind).contains(&candidate) {
                return candidate;
            }
        }
    }
}

fn creation(reason: impl Into<String>) -> AssetError {
    AssetError::Creation {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockFetcher;
    use proptest::prelude::*;
    use std::collections::HashSet;

    const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    fn presets() -> PresetsConfig {
        PresetsConfig {
            persons: vec![
                PresetEntry::new("person-1", "https://example.com/p1.jpg"),
                PresetEntry::new("person-2", "https://example.com/p2.jpg"),
            ],
            garments: vec![PresetEntry::new("garment-1", "https://example.com/g1.jpg")],
        }
    }

    fn remote(n: usize) -> AssetInput {
        AssetInput::Remote {
            url: format!("https://example.com/{n}.png"),
        }
    }

    #[test]
    fn test_presets_seeded_in_order_without_selection() {
        let registry = AssetRegistry::with_presets(&presets());
        let persons = registry.collection(AssetKind::Person);

        let ids: Vec<_> = persons.assets().iter().map(|a| a.id().as_str()).collect();
        assert_eq!(ids, ["person-1", "person-2"]);
        assert!(persons.selected_id().is_none());
        assert!(persons
            .assets()
            .iter()
            .all(|a| a.provenance() == Provenance::Preset && a.cached_encoding().is_none()));
    }

    #[test]
    fn test_add_asset_prepends_and_selects() {
        let mut registry = AssetRegistry::with_presets(&presets());
        registry
            .select(AssetKind::Garment, &AssetId::new("garment-1"))
            .unwrap();

        let asset = registry
            .add_asset(AssetKind::Garment, remote(1), Provenance::Uploaded)
            .unwrap();

        let garments = registry.collection(AssetKind::Garment);
        assert_eq!(garments.assets()[0].id(), asset.id());
        assert_eq!(garments.selected_id(), Some(asset.id()));
        assert_eq!(garments.len(), 2);
        // The other collection is untouched.
        assert!(registry.collection(AssetKind::Person).selected_id().is_none());
    }

    #[test]
    fn test_allocated_ids_skip_preset_ids() {
        let mut registry = AssetRegistry::with_presets(&PresetsConfig {
            persons: vec![PresetEntry::new("person-1", "https://example.com/p.jpg")],
            garments: Vec::new(),
        });

        let asset = registry
            .add_asset(AssetKind::Person, remote(1), Provenance::Uploaded)
            .unwrap();

        assert_ne!(asset.id().as_str(), "person-1");
    }

    #[test]
    fn test_upload_caches_encoding_and_sniffs_media_type() {
        let mut registry = AssetRegistry::new();
        let asset = registry
            .add_asset(
                AssetKind::Person,
                AssetInput::Upload {
                    bytes: PNG_SIGNATURE.to_vec(),
                    display_ref: Some(DisplayRef::new("blob:local/42")),
                },
                Provenance::Uploaded,
            )
            .unwrap();

        assert_eq!(asset.display_ref().as_str(), "blob:local/42");
        let encoding = asset.cached_encoding().unwrap();
        assert_eq!(encoding.media_type, "image/png");
        assert_eq!(encoding.data, codec::encode(PNG_SIGNATURE));
    }

    fn upload(bytes: &[u8]) -> AssetInput {
        AssetInput::Upload {
            bytes: bytes.to_vec(),
            display_ref: None,
        }
    }

    #[test]
    fn test_upload_rejects_only_empty_bytes() {
        let mut registry = AssetRegistry::new();

        let result = registry.add_asset(AssetKind::Person, upload(&[]), Provenance::Uploaded);
        assert!(matches!(result, Err(AssetError::Creation { .. })));
        assert!(registry.collection(AssetKind::Person).is_empty());

        let asset = registry
            .add_asset(AssetKind::Person, upload(b"just some text"), Provenance::Uploaded)
            .unwrap();
        assert_eq!(
            asset.cached_encoding().map(|e| e.media_type.as_str()),
            Some(codec::DEFAULT_MEDIA_TYPE)
        );
    }

    #[test]
    fn test_upload_accepts_heic_and_svg() {
        let mut registry = AssetRegistry::new();
        let mut heic = vec![0, 0, 0, 0x18];
        heic.extend_from_slice(b"ftypheic");
        heic.extend_from_slice(&[0; 16]);

        let photo = registry
            .add_asset(AssetKind::Person, upload(&heic), Provenance::Uploaded)
            .unwrap();
        let encoding = photo.cached_encoding().unwrap();
        assert_eq!(encoding.media_type, "image/heic");
        assert_eq!(encoding.data, codec::encode(&heic));
        assert!(photo.display_ref().as_str().starts_with("data:image/heic;base64,"));

        let drawing = registry
            .add_asset(
                AssetKind::Garment,
                upload(b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>"),
                Provenance::Uploaded,
            )
            .unwrap();
        assert_eq!(
            drawing.cached_encoding().map(|e| e.media_type.as_str()),
            Some("image/svg+xml")
        );
    }

    #[test]
    fn test_encoded_input_accepts_data_url_and_rejects_bad_base64() {
        let mut registry = AssetRegistry::new();
        let asset = registry
            .add_asset(
                AssetKind::Garment,
                AssetInput::Encoded {
                    data: "data:image/webp;base64,QUJDRA==".to_string(),
                    media_type: None,
                },
                Provenance::Generated,
            )
            .unwrap();
        assert_eq!(
            asset.cached_encoding(),
            Some(&EncodedImage::new("image/webp", "QUJDRA=="))
        );
        assert_eq!(
            asset.display_ref().as_str(),
            "data:image/webp;base64,QUJDRA=="
        );

        let result = registry.add_asset(
            AssetKind::Garment,
            AssetInput::Encoded {
                data: "not base64 at all!".to_string(),
                media_type: Some("image/png".to_string()),
            },
            Provenance::Generated,
        );
        assert!(matches!(result, Err(AssetError::Creation { .. })));
        assert_eq!(registry.collection(AssetKind::Garment).len(), 1);
    }

    #[test]
    fn test_remote_input_rejects_other_schemes() {
        let mut registry = AssetRegistry::new();
        let result = registry.add_asset(
            AssetKind::Person,
            AssetInput::Remote {
                url: "file:///etc/passwd".to_string(),
            },
            Provenance::Uploaded,
        );
        assert!(matches!(result, Err(AssetError::Creation { .. })));
    }

    #[test]
    fn test_select_fails_iff_absent() {
        let mut registry = AssetRegistry::with_presets(&presets());

        registry
            .select(AssetKind::Person, &AssetId::new("person-2"))
            .unwrap();
        // Idempotent re-selection.
        registry
            .select(AssetKind::Person, &AssetId::new("person-2"))
            .unwrap();
        assert_eq!(
            registry.selected(AssetKind::Person).map(|a| a.id().as_str()),
            Some("person-2")
        );

        // Ids from the other collection are not present here.
        let err = registry
            .select(AssetKind::Person, &AssetId::new("garment-1"))
            .unwrap_err();
        assert_eq!(
            err,
            AssetError::NotFound {
                collection: "person".to_string(),
                id: "garment-1".to_string(),
            }
        );
        // Failed selection leaves the previous one in place.
        assert_eq!(
            registry.selected(AssetKind::Person).map(|a| a.id().as_str()),
            Some("person-2")
        );
    }

    #[tokio::test]
    async fn test_resolve_encoding_fetches_once() {
        let registry = AssetRegistry::with_presets(&presets());
        let fetcher = MockFetcher::new(PNG_SIGNATURE.to_vec());
        let asset = registry.collection(AssetKind::Person).assets()[0].clone();

        let first = asset.resolve_encoding(&fetcher).await.unwrap();
        let second = asset.resolve_encoding(&fetcher).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fetcher.calls(), 1);
        // The registry's copy shares the cache with the clone.
        let stored = &registry.collection(AssetKind::Person).assets()[0];
        assert_eq!(stored.cached_encoding(), Some(&first));
    }

    #[tokio::test]
    async fn test_concurrent_resolve_collapses_to_one_fetch() {
        let registry = AssetRegistry::with_presets(&presets());
        let fetcher = MockFetcher::new(PNG_SIGNATURE.to_vec());
        let asset = registry.collection(AssetKind::Garment).assets()[0].clone();
        let other_handle = asset.clone();

        let (a, b) = tokio::join!(
            asset.resolve_encoding(&fetcher),
            other_handle.resolve_encoding(&fetcher)
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_resolve_is_not_cached() {
        let registry = AssetRegistry::with_presets(&presets());
        let asset = registry.collection(AssetKind::Person).assets()[0].clone();

        let failing = MockFetcher::failing("connection refused");
        assert!(asset.resolve_encoding(&failing).await.is_err());
        assert!(asset.cached_encoding().is_none());

        let working = MockFetcher::new(PNG_SIGNATURE.to_vec());
        assert!(asset.resolve_encoding(&working).await.is_ok());
        assert_eq!(working.calls(), 1);
    }

    proptest! {
        #[test]
        fn prop_add_asset_prepends_with_unique_ids(kinds in prop::collection::vec(any::<bool>(), 0..40)) {
            let mut registry = AssetRegistry::with_presets(&presets());
            let mut added = vec![Vec::new(), Vec::new()];

            for (n, is_person) in kinds.iter().enumerate() {
                let kind = if *is_person { AssetKind::Person } else { AssetKind::Garment };
                let asset = registry.add_asset(kind, remote(n), Provenance::Uploaded).unwrap();
                prop_assert_eq!(registry.collection(kind).assets()[0].id(), asset.id());
                prop_assert_eq!(registry.collection(kind).selected_id(), Some(asset.id()));
                added[usize::from(*is_person)].push(asset.id().clone());
            }

            for (kind, idx) in [(AssetKind::Garment, 0), (AssetKind::Person, 1)] {
                let collection = registry.collection(kind);
                let ids: Vec<AssetId> = collection.assets().iter().map(|a| a.id().clone()).collect();

                // Newest first, then the presets in their original order.
                let newest_first: Vec<AssetId> = added[idx].iter().rev().cloned().collect();
                prop_assert_eq!(&ids[..newest_first.len()], &newest_first[..]);

                let unique: HashSet<&AssetId> = ids.iter().collect();
                prop_assert_eq!(unique.len(), ids.len());
            }
        }
    }
}
