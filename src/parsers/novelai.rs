//! NovelAI PNG text chunks.
//!
//! NovelAI writes `Description` (the prompt), `Software` (`NovelAI`),
//! `Source` (the model name) and `Comment`, a JSON object with the full
//! request: `prompt`, `uc` (negative prompt), `steps`, `scale`, `seed`,
//! `sampler`, `strength`, `noise` and, for V4 models, `v4_prompt` captions.

use serde_json::{Map, Value};

use super::{ParsedGeneration, push_unique, scalar_text};
use crate::container::RawChunkSet;
use crate::detect::DetectedFormat;
use crate::error::{MetadataError, Result};

const SIGNATURE_KEYS: &[&str] = &[
    "uc", "sm", "sm_dyn", "noise_schedule", "uncond_scale", "cfg_rescale", "v4_prompt",
    "v4_negative_prompt", "request_type",
];

/// Display key for each `Comment` field, in display order.
const PARAMETER_KEYS: &[(&str, &str)] = &[
    ("steps", "Steps"),
    ("sampler", "Sampler"),
    ("scale", "CFG scale"),
    ("seed", "Seed"),
    ("strength", "Strength"),
    ("noise", "Noise"),
    ("noise_schedule", "Noise schedule"),
    ("cfg_rescale", "CFG rescale"),
    ("uncond_scale", "Uncond scale"),
    ("sm", "SMEA"),
    ("sm_dyn", "SMEA DYN"),
    ("request_type", "Request type"),
];

fn software_is_novelai(raw: &RawChunkSet) -> bool {
    raw.all("Software").any(|s| s.contains("NovelAI"))
}

fn comment_object(raw: &RawChunkSet) -> Option<Map<String, Value>> {
    let comment = raw.first("Comment")?;
    match serde_json::from_str::<Value>(comment) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

pub fn is_present(raw: &RawChunkSet) -> bool {
    if software_is_novelai(raw) && (raw.first("Comment").is_some() || raw.first("Description").is_some()) {
        return true;
    }
    let has_context = raw.first("Description").is_some() || raw.first("Software").is_some();
    has_context
        && comment_object(raw)
            .is_some_and(|map| SIGNATURE_KEYS.iter().any(|k| map.contains_key(*k)))
}

pub fn parse(raw: &RawChunkSet) -> Result<ParsedGeneration> {
    let comment = match raw.first("Comment") {
        Some(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Some((text, map)),
            Ok(_) => {
                return Err(MetadataError::malformed(
                    DetectedFormat::NovelAI,
                    "Comment is not a JSON object",
                ));
            }
            Err(e) => {
                return Err(MetadataError::malformed(
                    DetectedFormat::NovelAI,
                    format!("Comment is not JSON: {e}"),
                ));
            }
        },
        None => None,
    };

    let mut parsed = ParsedGeneration {
        prompt: raw.first("Description").map(str::to_string),
        ..Default::default()
    };

    if let Some((text, map)) = comment {
        parsed.raw_text = Some(text.to_string());
        if let Some(prompt) = string_field(&map, "prompt").or_else(|| caption(&map, "v4_prompt")) {
            parsed.prompt = Some(prompt);
        }
        parsed.negative_prompt = string_field(&map, "uc").or_else(|| caption(&map, "v4_negative_prompt"));

        for (field, label) in PARAMETER_KEYS {
            if let Some(value) = map.get(*field).and_then(scalar_text) {
                parsed.parameters.push(*label, value);
            }
        }
        if let (Some(w), Some(h)) = (
            map.get("width").and_then(scalar_text),
            map.get("height").and_then(scalar_text),
        ) {
            parsed.parameters.push("Size", format!("{w}x{h}"));
        }
    } else {
        parsed.raw_text = parsed.prompt.clone();
    }

    if let Some(source) = raw.first("Source") {
        parsed.parameters.push("Source", source);
        push_unique(&mut parsed.models, source);
    }
    if let Some(software) = raw.first("Software") {
        parsed.parameters.push("Software", software);
    }

    Ok(parsed)
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// `v4_prompt.caption.base_caption`
fn caption(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)?
        .get("caption")?
        .get("base_caption")?
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}
