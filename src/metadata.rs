//! Normalized output record handed to the presentation layer.
//!
//! A [`NormalizedMetadata`] carries enough structure to drive the Formatted,
//! Raw Data and Tags views without re-parsing anything.

use serde::Serialize;
use std::path::PathBuf;

use crate::architecture::ModelArchitecture;
use crate::container::ContainerKind;
use crate::detect::DetectedFormat;
use crate::exif::EditingSoftware;

/// A single generation parameter, kept in producer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub key: String,
    pub value: String,
}

/// Ordered key-value generation parameters.
///
/// Keys are not required to be unique; lookups return the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Parameters(Vec<Parameter>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair. Empty values are dropped.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            return;
        }
        self.0.push(Parameter {
            key: key.into(),
            value,
        });
    }

    /// Case-insensitive lookup of the first value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|p| p.key.eq_ignore_ascii_case(key))
            .map(|p| p.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for (k, v) in iter {
            params.push(k, v);
        }
        params
    }
}

/// A GPS position in signed decimal degrees (south and west are negative).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpsCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Camera, exposure and authorship fields from EXIF/XMP.
///
/// Every field is optional: `None` means the tag was absent, which is
/// different from a tag that was present but empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CameraInfo {
    pub make: Option<String>,
    pub model: Option<String>,
    pub lens: Option<String>,
    /// Human form, e.g. `1/250 s` or `2.5 s`.
    pub shutter_speed: Option<String>,
    /// The f-number, e.g. `2.8`.
    pub aperture: Option<f64>,
    pub iso: Option<u32>,
    /// Millimetres.
    pub focal_length: Option<f64>,
    pub flash: Option<String>,
    pub white_balance: Option<String>,
    pub color_space: Option<String>,
    pub gps: Option<GpsCoordinate>,
    pub date_taken: Option<String>,
    pub artist: Option<String>,
    pub copyright: Option<String>,
    pub software: Option<String>,
}

impl CameraInfo {
    pub fn is_empty(&self) -> bool {
        *self == CameraInfo::default()
    }

    /// Display form of the aperture, e.g. `f/2.8`.
    pub fn f_stop(&self) -> Option<String> {
        self.aperture.map(|f| format!("f/{}", trim_float(f)))
    }

    /// Display rows in a stable order, skipping absent fields.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = Vec::new();
        let mut add = |label: &'static str, value: Option<String>| {
            if let Some(v) = value {
                rows.push((label, v));
            }
        };
        add("Make", self.make.clone());
        add("Model", self.model.clone());
        add("Lens", self.lens.clone());
        add("Shutter speed", self.shutter_speed.clone());
        add("Aperture", self.f_stop());
        add("ISO", self.iso.map(|i| i.to_string()));
        add(
            "Focal length",
            self.focal_length.map(|f| format!("{} mm", trim_float(f))),
        );
        add("Flash", self.flash.clone());
        add("White balance", self.white_balance.clone());
        add("Color space", self.color_space.clone());
        add(
            "GPS",
            self.gps
                .map(|g| format!("{:.6}, {:.6}", g.latitude, g.longitude)),
        );
        add("Date taken", self.date_taken.clone());
        add("Artist", self.artist.clone());
        add("Copyright", self.copyright.clone());
        add("Software", self.software.clone());
        rows
    }
}

/// One entry of the Raw Data view: a text chunk, XMP packet or EXIF summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawEntry {
    pub key: String,
    pub value: String,
}

/// File facts added by [`extract_path`](crate::pipeline::extract_path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub file_name: String,
    pub path: PathBuf,
    pub byte_size: u64,
    pub container: ContainerKind,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// The result of one extraction call.
///
/// `prompt` is only ever set when `source_format` is an AI generator format.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedMetadata {
    pub source_format: DetectedFormat,
    /// Human label, e.g. `AUTOMATIC1111 / SDXL` or `ComfyUI (z-image)`.
    pub source_label: String,
    pub prompt: Option<String>,
    pub negative_prompt: Option<String>,
    pub parameters: Parameters,
    pub architecture: Option<ModelArchitecture>,
    /// Generator label for provenance-only formats (C2PA, XMP).
    pub generator: Option<String>,
    pub camera: Option<CameraInfo>,
    pub editing_software: Option<EditingSoftware>,
    /// The text the selected parser consumed, verbatim.
    pub raw_text: Option<String>,
    pub raw_entries: Vec<RawEntry>,
    pub file_info: Option<FileInfo>,
    /// Set when the detected format's payload could not be parsed.
    pub parse_error: Option<String>,
}

impl NormalizedMetadata {
    /// An empty record for the given format.
    pub fn empty(source_format: DetectedFormat) -> Self {
        Self {
            source_format,
            source_label: source_format.label().to_string(),
            prompt: None,
            negative_prompt: None,
            parameters: Parameters::new(),
            architecture: None,
            generator: None,
            camera: None,
            editing_software: None,
            raw_text: None,
            raw_entries: Vec::new(),
            file_info: None,
            parse_error: None,
        }
    }

    /// `false` for the "no metadata" outcome.
    pub fn has_metadata(&self) -> bool {
        self.source_format != DetectedFormat::Unknown
    }

    /// Prompt split into tags for the Tags view.
    pub fn prompt_tags(&self) -> Vec<String> {
        self.prompt.as_deref().map(split_tags).unwrap_or_default()
    }

    /// Negative prompt split into tags for the Tags view.
    pub fn negative_tags(&self) -> Vec<String> {
        self.negative_prompt
            .as_deref()
            .map(split_tags)
            .unwrap_or_default()
    }

    /// `key: value` lines for the Formatted view.
    pub fn formatted_parameters(&self) -> String {
        self.parameters
            .iter()
            .map(|p| format!("{}: {}", p.key, p.value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The "copy all" text: prompt, negative prompt and parameter sections.
    pub fn summary_text(&self) -> String {
        let mut parts = Vec::new();
        if let Some(ref prompt) = self.prompt {
            parts.push(format!("Prompt:\n{prompt}"));
        }
        if let Some(ref negative) = self.negative_prompt {
            parts.push(format!("\nNegative Prompt:\n{negative}"));
        }
        if !self.parameters.is_empty() {
            parts.push(format!("\nParameters:\n{}", self.formatted_parameters()));
        }
        parts.join("\n")
    }
}

/// Split prompt text on top-level commas and newlines.
///
/// Commas inside `()`, `[]`, `{}` and `<>` stay with their tag, so
/// `(subject:1.2), city` yields two tags.
pub fn split_tags(text: &str) -> Vec<String> {
    crate::parsers::split_top_level(text, &[',', '\n'])
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Format a float without trailing zeros (`2.80` -> `2.8`, `50.0` -> `50`).
pub(crate) fn trim_float(value: f64) -> String {
    let s = format!("{value:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}
