//! Conversion between raw image bytes, base64 payloads and display references
//!
//! Payloads are standard-alphabet, padded base64 with no container prefix, so
//! they can be handed to the provider as inline data unchanged. Display
//! references are either remote URLs (presets, remote assets) or
//! `data:<media-type>;base64,<payload>` URLs built here.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;

use crate::fetch::ImageFetcher;
use tryon_utils::error::CodecError;

const DATA_URL_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// Media type used when neither the source nor the bytes say otherwise
pub const DEFAULT_MEDIA_TYPE: &str = "image/png";

/// Opaque handle a renderer can use to show an image
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayRef(String);

impl DisplayRef {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_data_url(&self) -> bool {
        self.0.starts_with(DATA_URL_PREFIX)
    }
}

impl fmt::Display for DisplayRef {
    /// Data URLs are abbreviated so logs and listings stay readable.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_data_url() {
            let head = self.0.split(',').next().unwrap_or(DATA_URL_PREFIX);
            write!(f, "{head},…({} bytes)", self.0.len())
        } else {
            f.write_str(&self.0)
        }
    }
}

/// A base64 payload together with the media type it was produced or fetched as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub media_type: String,
    pub data: String,
}

impl EncodedImage {
    #[must_use]
    pub fn new(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    /// Encode raw bytes, sniffing the media type from their signature
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(
            sniff_media_type(bytes).unwrap_or(DEFAULT_MEDIA_TYPE),
            encode(bytes),
        )
    }

    #[must_use]
    pub fn to_display_ref(&self) -> DisplayRef {
        to_display_ref(&self.data, &self.media_type)
    }
}

/// Lossless, deterministic base64 encoding of arbitrary bytes
#[must_use]
pub fn encode(raw_bytes: &[u8]) -> String {
    STANDARD.encode(raw_bytes)
}

/// Decode a bare base64 payload
///
/// # Errors
///
/// Returns `CodecError::Decode` if the payload is not valid base64.
pub fn decode(payload: &str) -> Result<Vec<u8>, CodecError> {
    STANDARD
        .decode(payload.trim())
        .map_err(|e| CodecError::Decode(format!("invalid base64 payload: {e}")))
}

/// Build a renderable data URL from a payload and media type. Pure and total.
#[must_use]
pub fn to_display_ref(payload: &str, media_type: &str) -> DisplayRef {
    DisplayRef(format!("{DATA_URL_PREFIX}{media_type}{BASE64_MARKER}{payload}"))
}

/// Split a base64 data URL into its media type and payload, without decoding
///
/// Returns `None` for anything that is not a `data:<type>;base64,` URL.
#[must_use]
pub fn split_data_url(value: &str) -> Option<(&str, &str)> {
    let rest = value.strip_prefix(DATA_URL_PREFIX)?;
    let (media_type, payload) = rest.split_once(BASE64_MARKER)?;
    Some((media_type, payload))
}

/// Remove a `data:<type>;base64,` prefix if present, leaving the bare payload
#[must_use]
pub fn strip_data_url_prefix(value: &str) -> &str {
    split_data_url(value).map_or(value, |(_, payload)| payload)
}

/// Decode a data-URL display reference back to `(media type, bytes)`
///
/// # Errors
///
/// Returns `CodecError::Decode` if the reference is not a base64 data URL or
/// the payload is malformed.
pub fn from_display_ref(display_ref: &DisplayRef) -> Result<(String, Vec<u8>), CodecError> {
    let (media_type, payload) = split_data_url(display_ref.as_str()).ok_or_else(|| {
        CodecError::Decode(format!("not a base64 data URL: {display_ref}"))
    })?;
    let media_type = if media_type.is_empty() {
        DEFAULT_MEDIA_TYPE
    } else {
        media_type
    };
    Ok((media_type.to_string(), decode(payload)?))
}

/// Identify an image media type from its leading bytes
///
/// Anything `image` can decode is recognised by signature. HEIF-family
/// containers are recognised by their `ftyp` brand and SVG by its root element.
#[must_use]
pub fn sniff_media_type(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes)
        .ok()
        .map(|format| format.to_mime_type())
        .or_else(|| sniff_iso_bmff(bytes))
        .or_else(|| sniff_svg(bytes))
}

fn sniff_iso_bmff(bytes: &[u8]) -> Option<&'static str> {
    if bytes.get(4..8)? != b"ftyp" {
        return None;
    }
    match bytes.get(8..12)? {
        b"heic" | b"heix" | b"heim" | b"heis" => Some("image/heic"),
        b"hevc" | b"hevx" => Some("image/heic-sequence"),
        b"mif1" | b"msf1" | b"heif" => Some("image/heif"),
        b"avif" | b"avis" => Some("image/avif"),
        _ => None,
    }
}

fn sniff_svg(bytes: &[u8]) -> Option<&'static str> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(1024)]);
    let head = head.trim_start_matches('\u{feff}').trim_start();
    let is_svg = head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg"));
    is_svg.then_some("image/svg+xml")
}

/// File extension conventionally used for a media type
#[must_use]
pub fn extension_for(media_type: &str) -> &'static str {
    match media_type {
        "image/heic" | "image/heic-sequence" => "heic",
        "image/heif" => "heif",
        "image/svg+xml" => "svg",
        _ => image::ImageFormat::from_mime_type(media_type)
            .and_then(|format| format.extensions_str().first().copied())
            .unwrap_or("png"),
    }
}

/// Retrieve a remote reference and encode it
///
/// Data URLs are decoded locally; anything else goes through `fetcher`. The
/// media type comes from the data URL, the response `Content-Type`, or the
/// bytes' signature, in that order.
///
/// # Errors
///
/// Returns `CodecError::Fetch` if the resource is unreachable or access is
/// denied, and `CodecError::Decode` for a malformed data URL.
pub async fn fetch_and_encode(
    fetcher: &dyn ImageFetcher,
    url: &str,
) -> Result<EncodedImage, CodecError> {
    if url.starts_with(DATA_URL_PREFIX) {
        let (media_type, bytes) = from_display_ref(&DisplayRef::new(url))?;
        return Ok(EncodedImage::new(media_type, encode(&bytes)));
    }

    let fetched = fetcher.fetch(url).await?;
    let media_type = fetched
        .content_type
        .as_deref()
        .map(|value| value.split(';').next().unwrap_or(value).trim())
        .filter(|value| value.starts_with("image/"))
        .or_else(|| sniff_media_type(&fetched.bytes))
        .unwrap_or(DEFAULT_MEDIA_TYPE)
        .to_string();

    Ok(EncodedImage::new(media_type, encode(&fetched.bytes)))
}
