//! C2PA manifest stores (JUMBF) from OpenAI image generators.
//!
//! The store is not validated or fully decoded. The claim's CBOR text values
//! for `claim_generator`, `claim_generator_info.name` and `softwareAgent` are
//! read in place and matched against a table of known OpenAI products.

use super::{ParsedGeneration, UNIDENTIFIED};
use crate::container::RawChunkSet;
use crate::detect::DetectedFormat;
use crate::error::{MetadataError, Result};

/// Lowercase needle in a generator claim -> display label. First match wins.
const GENERATORS: &[(&str, &str)] = &[
    ("gpt-image", "GPT Image"),
    ("gpt-4o", "ChatGPT (GPT-4o)"),
    ("chatgpt", "ChatGPT"),
    ("dall·e", "DALL-E"),
    ("dall-e", "DALL-E"),
    ("sora", "Sora"),
    ("openai", "OpenAI"),
];

const STORE_NEEDLES: &[&[u8]] = &[b"OpenAI", b"ChatGPT", b"DALL", b"gpt-image", b"GPT-4o"];

const ACTIONS: &[&str] = &[
    "c2pa.created",
    "c2pa.opened",
    "c2pa.edited",
    "c2pa.converted",
    "c2pa.resized",
    "c2pa.placed",
];

const TRAINED_MEDIA: &str = "trainedAlgorithmicMedia";

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find_all(haystack, needle).next().is_some()
}

fn find_all<'a>(haystack: &'a [u8], needle: &'a [u8]) -> impl Iterator<Item = usize> + 'a {
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(move |(_, w)| *w == needle)
        .map(|(i, _)| i)
}

pub fn is_present(raw: &RawChunkSet) -> bool {
    raw.c2pa.as_deref().is_some_and(|store| {
        generator_claims(store).iter().any(|c| identify(c).is_some())
            || STORE_NEEDLES.iter().any(|n| contains(store, n))
    })
}

pub fn parse(raw: &RawChunkSet) -> Result<ParsedGeneration> {
    let store = raw.c2pa.as_deref().ok_or_else(|| {
        MetadataError::malformed(DetectedFormat::OpenAIC2PA, "no JUMBF manifest store")
    })?;
    if !contains(store, b"c2pa") {
        return Err(MetadataError::malformed(
            DetectedFormat::OpenAIC2PA,
            "JUMBF box has no c2pa manifest store label",
        ));
    }

    let claims = generator_claims(store);
    let generator = claims
        .iter()
        .find_map(|c| identify(c))
        .unwrap_or(UNIDENTIFIED);

    let mut parsed = ParsedGeneration {
        generator: Some(generator.to_string()),
        raw_text: Some(printable_summary(store)),
        ..Default::default()
    };

    parsed.parameters.push("Generator", generator);
    if let Some(claim) = claims.first() {
        parsed.parameters.push("Claim generator", claim.as_str());
    }
    if contains(store, TRAINED_MEDIA.as_bytes()) {
        parsed.parameters.push("Digital source type", TRAINED_MEDIA);
    }
    let actions: Vec<&str> = ACTIONS
        .iter()
        .copied()
        .filter(|a| contains(store, a.as_bytes()))
        .collect();
    if !actions.is_empty() {
        parsed.parameters.push("Actions", actions.join(", "));
    }

    Ok(parsed)
}

fn identify(claim: &str) -> Option<&'static str> {
    let lower = claim.to_lowercase();
    GENERATORS
        .iter()
        .find(|(needle, _)| lower.contains(*needle))
        .map(|(_, label)| *label)
}

/// Generator strings named in the claim, in store order, without duplicates.
pub(crate) fn generator_claims(store: &[u8]) -> Vec<String> {
    let mut claims: Vec<String> = Vec::new();
    let mut add = |s: String| {
        if !s.trim().is_empty() && !claims.contains(&s) {
            claims.push(s);
        }
    };

    for key in ["claim_generator", "softwareAgent"] {
        for at in find_all(store, key.as_bytes()) {
            if let Some(text) = cbor_text_at(store, at + key.len()) {
                add(text);
            }
        }
    }

    // claim_generator_info: [{ "name": ..., "version": ... }], v2 softwareAgent: { "name": ... }
    for key in ["claim_generator_info", "softwareAgent"] {
        for at in find_all(store, key.as_bytes()) {
            let window_end = (at + key.len() + 48).min(store.len());
            let window = &store[at + key.len()..window_end];
            if let Some(name_at) = find_all(window, b"name").next() {
                if let Some(text) = cbor_text_at(store, at + key.len() + name_at + 4) {
                    add(text);
                }
            }
        }
    }

    claims
}

/// Decode a CBOR text string (major type 3) starting at `at`.
fn cbor_text_at(bytes: &[u8], at: usize) -> Option<String> {
    let head = *bytes.get(at)?;
    let (len, start) = match head {
        0x60..=0x77 => ((head - 0x60) as usize, at + 1),
        0x78 => (*bytes.get(at + 1)? as usize, at + 2),
        0x79 => {
            let len = u16::from_be_bytes([*bytes.get(at + 1)?, *bytes.get(at + 2)?]);
            (len as usize, at + 3)
        }
        _ => return None,
    };
    let text = bytes.get(start..start + len)?;
    std::str::from_utf8(text).ok().map(str::to_string)
}

/// Printable runs of the store, one per line, for the Raw Data view.
pub fn printable_summary(store: &[u8]) -> String {
    const MIN_RUN: usize = 4;
    let mut lines = Vec::new();
    let mut run = Vec::new();
    for &b in store.iter().chain(std::iter::once(&0u8)) {
        if b.is_ascii_graphic() || b == b' ' {
            run.push(b);
        } else {
            if run.len() >= MIN_RUN {
                lines.push(String::from_utf8_lossy(&run).to_string());
            }
            run.clear();
        }
    }
    lines.join("\n")
}
