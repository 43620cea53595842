//! Per-format parsers.
//!
//! Each parser turns the chunks its detector matched into a
//! [`ParsedGeneration`]. [`parse`] dispatches on the detected format, runs the
//! architecture classifier where it applies and builds the source label.

pub mod c2pa;
pub mod comfyui;
pub mod gemini;
pub mod novelai;
pub mod webui;

use crate::architecture::{self, ModelArchitecture};
use crate::container::RawChunkSet;
use crate::detect::DetectedFormat;
use crate::error::Result;
use crate::metadata::{NormalizedMetadata, Parameters};

/// Generator label used when a provenance record names no known generator.
pub const UNIDENTIFIED: &str = "AI-generated, unidentified";

/// What a format parser extracted, before classification.
#[derive(Debug, Clone, Default)]
pub struct ParsedGeneration {
    pub prompt: Option<String>,
    pub negative_prompt: Option<String>,
    pub parameters: Parameters,
    /// Checkpoint / UNet names.
    pub models: Vec<String>,
    pub loras: Vec<String>,
    pub text_encoders: Vec<String>,
    /// ComfyUI node class types, in graph order.
    pub node_types: Vec<String>,
    /// Producer variant, e.g. `z-image`.
    pub variant: Option<String>,
    /// Generator label for provenance formats.
    pub generator: Option<String>,
    /// The text the parser consumed, verbatim.
    pub raw_text: Option<String>,
}

/// Run the parser for `format` over `raw`.
///
/// `GenericPhoto` and `Unknown` have no parser and yield an empty record.
pub fn parse(raw: &RawChunkSet, format: DetectedFormat) -> Result<NormalizedMetadata> {
    let parsed = match format {
        DetectedFormat::AutomaticWebUI => webui::parse(raw)?,
        DetectedFormat::ComfyUI => comfyui::parse(raw)?,
        DetectedFormat::NovelAI => novelai::parse(raw)?,
        DetectedFormat::OpenAIC2PA => c2pa::parse(raw)?,
        DetectedFormat::GoogleGeminiXMP => gemini::parse(raw)?,
        DetectedFormat::GenericPhoto | DetectedFormat::Unknown => {
            return Ok(NormalizedMetadata::empty(format));
        }
    };
    Ok(parsed.into_metadata(format))
}

/// The text a format's parser reads, for partial records after a parse failure.
pub fn source_text(raw: &RawChunkSet, format: DetectedFormat) -> Option<String> {
    match format {
        DetectedFormat::AutomaticWebUI => webui::locate(raw),
        DetectedFormat::ComfyUI => comfyui::locate(raw).map(|(_, text)| text),
        DetectedFormat::NovelAI => raw.first("Comment").map(str::to_string),
        DetectedFormat::OpenAIC2PA => raw.c2pa.as_deref().map(c2pa::printable_summary),
        DetectedFormat::GoogleGeminiXMP => raw.xmp.as_ref().map(|x| x.xml.clone()),
        DetectedFormat::GenericPhoto | DetectedFormat::Unknown => None,
    }
}

impl ParsedGeneration {
    fn into_metadata(self, format: DetectedFormat) -> NormalizedMetadata {
        let architecture = match format {
            DetectedFormat::AutomaticWebUI | DetectedFormat::ComfyUI | DetectedFormat::NovelAI => {
                Some(architecture::classify(&self))
            }
            _ => None,
        };
        let source_label = source_label(format, architecture, &self);
        log::debug!("Parsed {format}: {source_label}, {} parameter(s)", self.parameters.len());

        let mut meta = NormalizedMetadata::empty(format);
        meta.source_label = source_label;
        meta.prompt = self.prompt.filter(|p| !p.trim().is_empty());
        meta.negative_prompt = self.negative_prompt.filter(|p| !p.trim().is_empty());
        meta.parameters = self.parameters;
        meta.architecture = architecture;
        meta.generator = self.generator;
        meta.raw_text = self.raw_text;
        meta
    }
}

fn source_label(
    format: DetectedFormat,
    architecture: Option<ModelArchitecture>,
    parsed: &ParsedGeneration,
) -> String {
    let known = architecture.filter(|a| *a != ModelArchitecture::Unknown);
    match format {
        DetectedFormat::AutomaticWebUI => match known {
            Some(arch) => format!("AUTOMATIC1111 / {arch}"),
            None => format.label().to_string(),
        },
        DetectedFormat::ComfyUI | DetectedFormat::NovelAI => {
            let mut label = if format == DetectedFormat::ComfyUI { "ComfyUI" } else { "NovelAI" }
                .to_string();
            if let Some(arch) = known {
                label.push_str(" / ");
                label.push_str(arch.label());
            }
            if let Some(ref variant) = parsed.variant {
                label.push_str(&format!(" ({variant})"));
            }
            label
        }
        DetectedFormat::OpenAIC2PA | DetectedFormat::GoogleGeminiXMP => {
            let vendor = if format == DetectedFormat::OpenAIC2PA { "OpenAI" } else { "Google" };
            match parsed.generator.as_deref() {
                Some(UNIDENTIFIED) | None => format!("{} / {UNIDENTIFIED}", format.label()),
                Some(generator) if generator == vendor => vendor.to_string(),
                Some(generator) => format!("{vendor} / {generator}"),
            }
        }
        DetectedFormat::GenericPhoto | DetectedFormat::Unknown => format.label().to_string(),
    }
}

/// Split on `separators` outside `()`, `[]`, `{}` and `<>`.
///
/// A backslash escapes the next character, so `\(` does not open a group.
pub(crate) fn split_top_level<'a>(text: &'a str, separators: &[char]) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut escaped = false;
    let mut start = 0;

    for (idx, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth = depth.saturating_sub(1),
            c if depth == 0 && separators.contains(&c) => {
                parts.push(&text[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Render a JSON scalar as display text. Arrays and objects yield `None`.
pub(crate) fn scalar_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Push unique, non-empty names.
pub(crate) fn push_unique(list: &mut Vec<String>, name: &str) {
    let name = name.trim();
    if !name.is_empty() && !list.iter().any(|n| n == name) {
        list.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_top_level_brackets_and_escapes() {
        let parts = split_top_level(r"a, (b, c:1.2), \(d, e\)", &[',']);
        assert_eq!(parts, ["a", " (b, c:1.2)", r" \(d", r" e\)"]);
    }

    #[test]
    fn split_top_level_unbalanced_close() {
        let parts = split_top_level("a), b", &[',']);
        assert_eq!(parts, ["a)", " b"]);
    }

    #[test]
    fn webui_label_with_architecture() {
        let parsed = ParsedGeneration::default();
        let label = source_label(
            DetectedFormat::AutomaticWebUI,
            Some(ModelArchitecture::Sdxl),
            &parsed,
        );
        assert_eq!(label, "AUTOMATIC1111 / SDXL");
        let label = source_label(
            DetectedFormat::AutomaticWebUI,
            Some(ModelArchitecture::Unknown),
            &parsed,
        );
        assert_eq!(label, "AUTOMATIC1111 / Stable Diffusion WebUI");
    }

    #[test]
    fn comfyui_label_with_variant() {
        let parsed = ParsedGeneration {
            variant: Some("z-image".into()),
            ..Default::default()
        };
        let label = source_label(DetectedFormat::ComfyUI, Some(ModelArchitecture::ZImage), &parsed);
        assert_eq!(label, "ComfyUI / Z-Image (z-image)");
        let label = source_label(DetectedFormat::ComfyUI, Some(ModelArchitecture::Unknown), &parsed);
        assert_eq!(label, "ComfyUI (z-image)");
    }

    #[test]
    fn provenance_labels() {
        let named = ParsedGeneration {
            generator: Some("ChatGPT".into()),
            ..Default::default()
        };
        assert_eq!(
            source_label(DetectedFormat::OpenAIC2PA, None, &named),
            "OpenAI / ChatGPT"
        );
        let unnamed = ParsedGeneration {
            generator: Some(UNIDENTIFIED.into()),
            ..Default::default()
        };
        assert_eq!(
            source_label(DetectedFormat::GoogleGeminiXMP, None, &unnamed),
            "Google Gemini (XMP) / AI-generated, unidentified"
        );
    }

    #[test]
    fn photo_formats_have_no_parser() {
        let raw = RawChunkSet::new(crate::container::ContainerKind::Png);
        let meta = parse(&raw, DetectedFormat::GenericPhoto).unwrap();
        assert!(meta.prompt.is_none());
        assert_eq!(meta.source_label, "Photo");
    }
}
