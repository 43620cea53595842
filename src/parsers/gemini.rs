//! Google generators that mark their output with XMP properties.
//!
//! Gemini and Imagen images carry no prompt. The XMP packet names the tool
//! (`xmp:CreatorTool`, `photoshop:Credit`, ...) and usually declares an IPTC
//! digital source type of `trainedAlgorithmicMedia`.

use super::{ParsedGeneration, UNIDENTIFIED};
use crate::container::RawChunkSet;
use crate::detect::DetectedFormat;
use crate::error::{MetadataError, Result};
use crate::xmp::XmpPacket;

/// XMP properties that may name the generator.
const GENERATOR_FIELDS: &[&str] = &[
    "xmp:CreatorTool",
    "photoshop:Credit",
    "dc:creator",
    "tiff:Software",
    "Iptc4xmpExt:AIModel",
    "Iptc4xmpExt:AISystemUsed",
];

/// Lowercase needle -> generator label. First match wins.
const GENERATORS: &[(&str, &str)] = &[
    ("gemini", "Gemini"),
    ("nano banana", "Gemini"),
    ("imagen", "Imagen"),
    ("made with google ai", "Google AI"),
    ("google ai", "Google AI"),
];

const SOURCE_TYPE_FIELD: &str = "Iptc4xmpExt:DigitalSourceType";

fn identify(value: &str) -> Option<&'static str> {
    let lower = value.to_lowercase();
    GENERATORS
        .iter()
        .find(|(needle, _)| lower.contains(*needle))
        .map(|(_, label)| *label)
}

fn generator_values(xmp: &XmpPacket) -> impl Iterator<Item = &str> {
    GENERATOR_FIELDS.iter().flat_map(move |f| xmp.values(*f))
}

pub fn is_present(raw: &RawChunkSet) -> bool {
    raw.xmp
        .as_ref()
        .is_some_and(|xmp| generator_values(xmp).any(|v| identify(v).is_some()))
}

pub fn parse(raw: &RawChunkSet) -> Result<ParsedGeneration> {
    let xmp = raw.xmp.as_ref().ok_or_else(|| {
        MetadataError::malformed(DetectedFormat::GoogleGeminiXMP, "no XMP packet")
    })?;

    let generator = generator_values(xmp)
        .find_map(identify)
        .unwrap_or(UNIDENTIFIED);

    let mut parsed = ParsedGeneration {
        generator: Some(generator.to_string()),
        raw_text: Some(xmp.xml.clone()),
        ..Default::default()
    };

    parsed.parameters.push("Generator", generator);
    if let Some(tool) = xmp.get("xmp:CreatorTool") {
        parsed.parameters.push("Creator tool", tool);
    }
    if let Some(credit) = xmp.get("photoshop:Credit") {
        parsed.parameters.push("Credit", credit);
    }
    if let Some(source_type) = xmp.get(SOURCE_TYPE_FIELD) {
        let short = source_type.rsplit('/').next().unwrap_or(source_type);
        parsed.parameters.push("Digital source type", short);
    }
    if let Some(created) = xmp.find(&["xmp:CreateDate", "photoshop:DateCreated"]) {
        parsed.parameters.push("Created", created);
    }

    Ok(parsed)
}
