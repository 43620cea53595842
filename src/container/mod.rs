//! Container reading: locate metadata chunks without interpreting them.
//!
//! [`read_chunks`] sniffs the magic number, then hands the buffer to the
//! PNG, JPEG or WebP reader. Each reader fills a [`RawChunkSet`]:
//!
//! | Container | Text | EXIF | XMP | C2PA |
//! |-----------|------|------|-----|------|
//! | PNG  | `tEXt`, `zTXt`, `iTXt` | `eXIf` | iTXt `XML:com.adobe.xmp` | `caBX` |
//! | JPEG | `COM` | APP1 `Exif` (all segments) | APP1 XMP + ExtendedXMP | APP11 JUMBF |
//! | WebP | none | `EXIF` | `XMP ` | none |

mod jpeg;
mod png;
mod webp;

use once_cell::sync::OnceCell;
use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::error::{MetadataError, Result};
use crate::exif::{ExifData, read_exif};
use crate::xmp::XmpPacket;

/// The image container a buffer was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ContainerKind {
    Png,
    Jpeg,
    WebP,
}

impl ContainerKind {
    /// Recognize a container from its leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
        const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

        if bytes.starts_with(PNG_MAGIC) {
            Some(Self::Png)
        } else if bytes.starts_with(JPEG_MAGIC) {
            Some(Self::Jpeg)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::WebP)
        } else {
            None
        }
    }

    /// Guess the container from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::WebP => "WebP",
        })
    }
}

/// Where a text chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextOrigin {
    /// PNG `tEXt`
    PngText,
    /// PNG `zTXt`
    PngCompressedText,
    /// PNG `iTXt`
    PngInternationalText,
    /// JPEG `COM` segment
    JpegComment,
}

/// One keyword/value text chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub keyword: String,
    pub value: String,
    pub origin: TextOrigin,
}

/// Metadata payloads found in one image container.
///
/// Text chunks keep file order and duplicate keywords are all retained.
#[derive(Debug, Clone)]
pub struct RawChunkSet {
    pub container: ContainerKind,
    pub text: Vec<TextChunk>,
    /// EXIF as a TIFF structure (the `Exif\0\0` header is already stripped).
    pub exif: Option<Vec<u8>>,
    pub xmp: Option<XmpPacket>,
    /// C2PA manifest store as a JUMBF box.
    pub c2pa: Option<Vec<u8>>,
    parsed_exif: OnceCell<ExifData>,
}

impl RawChunkSet {
    pub fn new(container: ContainerKind) -> Self {
        Self {
            container,
            text: Vec::new(),
            exif: None,
            xmp: None,
            c2pa: None,
            parsed_exif: OnceCell::new(),
        }
    }

    pub(crate) fn push_text(&mut self, keyword: impl Into<String>, value: String, origin: TextOrigin) {
        self.text.push(TextChunk {
            keyword: keyword.into(),
            value,
            origin,
        });
    }

    /// First text value for `keyword`.
    pub fn first(&self, keyword: &str) -> Option<&str> {
        self.text
            .iter()
            .find(|c| c.keyword == keyword)
            .map(|c| c.value.as_str())
    }

    /// Every text value for `keyword`, in file order.
    pub fn all<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.text
            .iter()
            .filter(move |c| c.keyword == keyword)
            .map(|c| c.value.as_str())
    }

    /// The EXIF block, parsed on first use and cached.
    ///
    /// Set [`exif`](Self::exif) before the first call; later edits are not seen.
    pub fn exif_data(&self) -> Option<&ExifData> {
        let block = self.exif.as_deref()?;
        Some(self.parsed_exif.get_or_init(|| {
            read_exif(block).unwrap_or_else(|e| {
                log::warn!("Skipping unreadable EXIF block: {e:#}");
                ExifData::default()
            })
        }))
    }

    /// EXIF `UserComment`, decoded. The WebUI stores its text block here in JPEG/WebP output.
    pub fn user_comment(&self) -> Option<String> {
        self.exif_data()?.user_comment.clone()
    }

    /// Whether any camera-style metadata (EXIF or XMP) is present.
    pub fn has_photo_metadata(&self) -> bool {
        self.exif.as_ref().is_some_and(|e| !e.is_empty()) || self.xmp.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && !self.has_photo_metadata() && self.c2pa.is_none()
    }
}

/// Read every metadata chunk from an in-memory PNG, JPEG or WebP image.
///
/// An image without metadata yields an empty set. Fails with
/// [`MetadataError::UnsupportedContainer`] on an unknown signature and
/// [`MetadataError::CorruptContainer`] when chunk lengths do not fit the buffer.
pub fn read_chunks(bytes: &[u8]) -> Result<RawChunkSet> {
    let kind = ContainerKind::sniff(bytes).ok_or_else(|| {
        let shown = bytes.len().min(8);
        MetadataError::UnsupportedContainer(format!(
            "unrecognized signature {:02X?}",
            &bytes[..shown]
        ))
    })?;

    let set = match kind {
        ContainerKind::Png => png::read(bytes)?,
        ContainerKind::Jpeg => jpeg::read(bytes)?,
        ContainerKind::WebP => webp::read(bytes)?,
    };

    log::debug!(
        "{kind}: {} text chunk(s), exif={}, xmp={}, c2pa={}",
        set.text.len(),
        set.exif.is_some(),
        set.xmp.is_some(),
        set.c2pa.is_some()
    );

    Ok(set)
}

/// Decode text that is usually UTF-8 but may be Latin-1 (PNG `tEXt`).
pub(crate) fn decode_latin1_or_utf8(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
