//! AUTOMATIC1111 / Forge "parameters" text.
//!
//! ```text
//! a cat, (detailed:1.2) <lora:film:0.6>
//! Negative prompt: blurry, lowres
//! Steps: 20, Sampler: Euler a, CFG scale: 7, Seed: 42, Lora hashes: "film: 1a2b3c"
//! ```
//!
//! The parameter line is split at top-level commas that start a new `Key:`,
//! so quoted values with embedded commas stay whole.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{ParsedGeneration, push_unique};
use crate::container::RawChunkSet;
use crate::detect::DetectedFormat;
use crate::error::{MetadataError, Result};

const NEGATIVE_MARKER: &str = "Negative prompt:";
/// Keys that can open the parameter line.
const PARAMETER_LINE_KEYS: &[&str] = &["Steps:", "Size:", "Seed:", "Model:", "Sampler:"];

static LORA_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(?:lora|lyco):([^:>]+)(?::[^>]*)?>").expect("valid LoRA tag pattern"));

pub fn is_present(raw: &RawChunkSet) -> bool {
    locate(raw).is_some()
}

/// Find the WebUI text block: the `parameters` chunk, any other text chunk
/// shaped like one, or the EXIF `UserComment` of JPEG/WebP output.
pub fn locate(raw: &RawChunkSet) -> Option<String> {
    if let Some(text) = raw.first("parameters").filter(|t| !t.trim().is_empty()) {
        return Some(text.to_string());
    }
    if let Some(chunk) = raw.text.iter().find(|c| looks_like_block(&c.value)) {
        return Some(chunk.value.clone());
    }
    raw.user_comment().filter(|c| looks_like_block(c))
}

fn looks_like_block(text: &str) -> bool {
    parameter_line_start(text).is_some()
}

pub fn parse(raw: &RawChunkSet) -> Result<ParsedGeneration> {
    let text = locate(raw).ok_or_else(|| {
        MetadataError::malformed(DetectedFormat::AutomaticWebUI, "no parameters text found")
    })?;
    parse_text(&text)
}

/// Parse one WebUI text block.
pub fn parse_text(text: &str) -> Result<ParsedGeneration> {
    let (body, parameter_block) = match parameter_line_start(text) {
        Some(start) => (&text[..start], Some(&text[start..])),
        None => (text, None),
    };

    let (prompt, negative) = match negative_marker_start(body) {
        Some(at) => (&body[..at], Some(&body[at + NEGATIVE_MARKER.len()..])),
        None => (body, None),
    };

    let mut parsed = ParsedGeneration {
        prompt: Some(prompt.trim().to_string()),
        negative_prompt: negative.map(|n| n.trim().to_string()),
        raw_text: Some(text.to_string()),
        ..Default::default()
    };

    if let Some(block) = parameter_block {
        for line in block.lines().filter(|l| !l.trim().is_empty()) {
            for (key, value) in parse_parameter_line(line)? {
                parsed.parameters.push(key, value);
            }
        }
    }

    collect_models(&mut parsed);
    Ok(parsed)
}

/// Byte offset of the last line that opens with one of [`PARAMETER_LINE_KEYS`].
fn parameter_line_start(text: &str) -> Option<usize> {
    let mut offset = 0;
    let mut found = None;
    for line in text.split_inclusive('\n') {
        let line_start = line.trim_start();
        if PARAMETER_LINE_KEYS.iter().any(|key| line_start.starts_with(key)) {
            found = Some(offset);
        }
        offset += line.len();
    }
    found
}

/// Prefer a marker at the start of a line; fall back to the first occurrence.
fn negative_marker_start(body: &str) -> Option<usize> {
    let mut occurrences = body.match_indices(NEGATIVE_MARKER).map(|(i, _)| i);
    let first = occurrences.next()?;
    let at_line_start = |i: usize| i == 0 || body[..i].ends_with('\n');
    if at_line_start(first) {
        return Some(first);
    }
    Some(occurrences.find(|&i| at_line_start(i)).unwrap_or(first))
}

fn parse_parameter_line(line: &str) -> Result<Vec<(String, String)>> {
    let mut pairs: Vec<(String, String)> = Vec::new();

    for segment in split_parameter_pairs(line)? {
        match segment.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() => {
                pairs.push((key.trim().to_string(), unquote(value.trim())));
            }
            _ => match pairs.last_mut() {
                Some((_, value)) => {
                    value.push_str(", ");
                    value.push_str(segment);
                }
                None => {
                    return Err(MetadataError::malformed(
                        DetectedFormat::AutomaticWebUI,
                        format!("parameter line does not start with a key: {segment:?}"),
                    ));
                }
            },
        }
    }

    Ok(pairs)
}

/// Split at top-level commas outside quotes that are followed by a `Key:`.
fn split_parameter_pairs(line: &str) -> Result<Vec<&str>> {
    let mut pairs = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;

    for (idx, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '(' | '[' | '{' | '<' if !in_quotes => depth += 1,
            ')' | ']' | '}' | '>' if !in_quotes => depth = depth.saturating_sub(1),
            ',' if !in_quotes && depth == 0 && is_key_boundary(&line[idx + 1..]) => {
                let segment = line[start..idx].trim();
                if !segment.is_empty() {
                    pairs.push(segment);
                }
                start = idx + 1;
            }
            _ => {}
        }
    }

    if in_quotes {
        return Err(MetadataError::malformed(
            DetectedFormat::AutomaticWebUI,
            "unterminated quote in parameter line",
        ));
    }

    let tail = line[start..].trim();
    if !tail.is_empty() {
        pairs.push(tail);
    }
    Ok(pairs)
}

/// Whether `rest` (the text after a comma) opens a new `Key:` pair.
fn is_key_boundary(rest: &str) -> bool {
    let rest = rest.trim_start();
    if !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return false;
    }
    for (idx, b) in rest.bytes().enumerate() {
        match b {
            b':' => return idx > 0,
            b',' | b'\n' | b'\r' => return false,
            b if b.is_ascii_alphanumeric() || matches!(b, b' ' | b'_' | b'-' | b'/' | b'.' | b'(' | b')') => {}
            _ => return false,
        }
    }
    false
}

fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        serde_json::from_str::<String>(value).unwrap_or_else(|_| value[1..value.len() - 1].to_string())
    } else {
        value.to_string()
    }
}

fn collect_models(parsed: &mut ParsedGeneration) {
    for key in ["Model", "Refiner"] {
        if let Some(model) = parsed.parameters.get(key) {
            push_unique(&mut parsed.models, model);
        }
    }

    for key in ["Module 1", "Module 2", "Module 3"] {
        if let Some(module) = parsed.parameters.get(key) {
            push_unique(&mut parsed.text_encoders, module);
        }
    }

    if let Some(hashes) = parsed.parameters.get("Lora hashes") {
        let names: Vec<String> = hashes
            .split(',')
            .filter_map(|pair| pair.split_once(':'))
            .map(|(name, _)| name.trim().to_string())
            .collect();
        for name in names {
            push_unique(&mut parsed.loras, &name);
        }
    }

    if let Some(ref prompt) = parsed.prompt {
        for cap in LORA_TAG.captures_iter(prompt) {
            push_unique(&mut parsed.loras, &cap[1]);
        }
    }
}
