//! Format detection over a [`RawChunkSet`].
//!
//! Detection is a fixed, ordered rule table. The first rule whose predicate
//! matches decides the format, so a file carrying both a generator payload and
//! camera EXIF is always reported as the generator.

use serde::Serialize;
use std::fmt;

use crate::container::RawChunkSet;
use crate::parsers::{c2pa, comfyui, gemini, novelai, webui};

/// The metadata convention a file was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DetectedFormat {
    AutomaticWebUI,
    ComfyUI,
    NovelAI,
    OpenAIC2PA,
    GoogleGeminiXMP,
    GenericPhoto,
    Unknown,
}

impl DetectedFormat {
    /// Whether this format comes from an image generator (and may carry a prompt).
    pub fn is_ai_generator(self) -> bool {
        !matches!(self, Self::GenericPhoto | Self::Unknown)
    }

    /// Default source label, refined by the parsers.
    pub fn label(self) -> &'static str {
        match self {
            Self::AutomaticWebUI => "AUTOMATIC1111 / Stable Diffusion WebUI",
            Self::ComfyUI => "ComfyUI",
            Self::NovelAI => "NovelAI",
            Self::OpenAIC2PA => "OpenAI (C2PA)",
            Self::GoogleGeminiXMP => "Google Gemini (XMP)",
            Self::GenericPhoto => "Photo",
            Self::Unknown => "No metadata",
        }
    }
}

impl fmt::Display for DetectedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AutomaticWebUI => "WebUI",
            Self::ComfyUI => "ComfyUI",
            Self::NovelAI => "NovelAI",
            Self::OpenAIC2PA => "C2PA",
            Self::GoogleGeminiXMP => "Gemini XMP",
            Self::GenericPhoto => "photo",
            Self::Unknown => "unknown",
        })
    }
}

type Predicate = fn(&RawChunkSet) -> bool;

/// Detection rules in priority order.
pub const RULES: &[(DetectedFormat, Predicate)] = &[
    (DetectedFormat::ComfyUI, comfyui::is_present),
    (DetectedFormat::AutomaticWebUI, webui::is_present),
    (DetectedFormat::NovelAI, novelai::is_present),
    (DetectedFormat::OpenAIC2PA, c2pa::is_present),
    (DetectedFormat::GoogleGeminiXMP, gemini::is_present),
    (DetectedFormat::GenericPhoto, RawChunkSet::has_photo_metadata),
];

/// Pick the format for a chunk set. Never fails.
pub fn detect(raw: &RawChunkSet) -> DetectedFormat {
    RULES
        .iter()
        .find(|(_, matches)| matches(raw))
        .map(|(format, _)| *format)
        .unwrap_or(DetectedFormat::Unknown)
}
