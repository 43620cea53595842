//! Model family classification.
//!
//! Three ordered tables are consulted in turn, and within each the first
//! matching row wins:
//!
//! 1. known checkpoint hashes (`Model hash` parameter),
//! 2. name signatures over model, LoRA and text-encoder file names,
//! 3. ComfyUI node class types.
//!
//! Rows are ordered specific-before-general: `flux.*dev` precedes `flux`, and
//! Pony/Illustrious precede plain SDXL.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::fmt;

use crate::parsers::ParsedGeneration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModelArchitecture {
    ZImage,
    FluxDev,
    FluxSchnell,
    Flux,
    Pony,
    Illustrious,
    Sdxl,
    Sd15,
    Sd21,
    Sd3,
    Cascade,
    Playground,
    PixArt,
    Kandinsky,
    Midjourney,
    DallE,
    AuraFlow,
    Unknown,
}

impl ModelArchitecture {
    pub fn label(self) -> &'static str {
        match self {
            Self::ZImage => "Z-Image",
            Self::FluxDev => "Flux.1 Dev",
            Self::FluxSchnell => "Flux.1 Schnell",
            Self::Flux => "Flux",
            Self::Pony => "Pony Diffusion",
            Self::Illustrious => "Illustrious XL",
            Self::Sdxl => "SDXL",
            Self::Sd15 => "SD 1.5",
            Self::Sd21 => "SD 2.1",
            Self::Sd3 => "SD 3",
            Self::Cascade => "Cascade",
            Self::Playground => "Playground",
            Self::PixArt => "PixArt",
            Self::Kandinsky => "Kandinsky",
            Self::Midjourney => "Midjourney",
            Self::DallE => "DALL-E",
            Self::AuraFlow => "AuraFlow",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ModelArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Short (AUTOV2) checkpoint hashes of base models.
const MODEL_HASHES: &[(&str, ModelArchitecture)] = &[
    ("31e35c80fc", ModelArchitecture::Sdxl),
    ("7440042bbd", ModelArchitecture::Sdxl),
    ("6ce0161689", ModelArchitecture::Sd15),
];

const NAME_SIGNATURES: &[(ModelArchitecture, &[&str])] = &[
    (ModelArchitecture::ZImage, &[r"z[-_ ]?image"]),
    (ModelArchitecture::FluxDev, &[r"flux.*dev", r"flux1.*dev"]),
    (ModelArchitecture::FluxSchnell, &[r"flux.*schnell"]),
    (ModelArchitecture::Flux, &[r"flux"]),
    (ModelArchitecture::Pony, &[r"pony", r"pdxl"]),
    (ModelArchitecture::Illustrious, &[r"illustrious", r"noobai"]),
    (
        ModelArchitecture::Sdxl,
        &[
            r"sdxl", r"sd_xl", r"stable.*diffusion.*xl", r"juggernaut.*xl", r"realvis.*xl",
            r"dreamshaper.*xl", r"animagine.*xl",
        ],
    ),
    (
        ModelArchitecture::Sd15,
        &[
            r"sd.*1\.5", r"sd15", r"v1-5", r"stable.*diffusion.*1\.5", r"dreamshaper",
            r"realistic.*vision", r"deliberate",
        ],
    ),
    (ModelArchitecture::Sd21, &[r"sd.*2\.1", r"sd21", r"v2-1", r"stable.*diffusion.*2"]),
    (ModelArchitecture::Sd3, &[r"sd3", r"sd_3", r"stable.*diffusion.*3"]),
    (ModelArchitecture::Cascade, &[r"cascade"]),
    (ModelArchitecture::Playground, &[r"playground"]),
    (ModelArchitecture::PixArt, &[r"pixart"]),
    (ModelArchitecture::Kandinsky, &[r"kandinsky"]),
    (ModelArchitecture::Midjourney, &[r"midjourney", r"\bmj(v\d+)?\b"]),
    (ModelArchitecture::DallE, &[r"dall-?e"]),
    (ModelArchitecture::AuraFlow, &[r"auraflow"]),
];

const NODE_SIGNATURES: &[(&str, ModelArchitecture)] = &[
    ("Flux", ModelArchitecture::Flux),
    ("FLUX", ModelArchitecture::Flux),
    ("SDXL", ModelArchitecture::Sdxl),
    ("SD3", ModelArchitecture::Sd3),
    ("Cascade", ModelArchitecture::Cascade),
];

static COMPILED_SIGNATURES: Lazy<Vec<(ModelArchitecture, Vec<Regex>)>> = Lazy::new(|| {
    NAME_SIGNATURES
        .iter()
        .map(|(arch, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| {
                    RegexBuilder::new(p)
                        .case_insensitive(true)
                        .build()
                        .expect("valid architecture signature")
                })
                .collect();
            (*arch, compiled)
        })
        .collect()
});

/// Classify the model family behind a parsed generation.
pub fn classify(parsed: &ParsedGeneration) -> ModelArchitecture {
    if let Some(arch) = parsed.parameters.get("Model hash").and_then(from_hash) {
        return arch;
    }

    let names: Vec<&str> = parsed
        .models
        .iter()
        .chain(&parsed.loras)
        .chain(&parsed.text_encoders)
        .map(String::as_str)
        .collect();
    if let Some(arch) = from_names(&names) {
        return arch;
    }

    NODE_SIGNATURES
        .iter()
        .find(|(needle, _)| parsed.node_types.iter().any(|t| t.contains(*needle)))
        .map(|(_, arch)| *arch)
        .unwrap_or(ModelArchitecture::Unknown)
}

fn from_hash(hash: &str) -> Option<ModelArchitecture> {
    let hash = hash.trim().to_lowercase();
    if hash.len() < 8 {
        return None;
    }
    MODEL_HASHES
        .iter()
        .find(|(known, _)| known.starts_with(hash.as_str()) || hash.starts_with(*known))
        .map(|(_, arch)| *arch)
}

fn from_names(names: &[&str]) -> Option<ModelArchitecture> {
    COMPILED_SIGNATURES
        .iter()
        .find(|(_, patterns)| {
            patterns
                .iter()
                .any(|re| names.iter().any(|name| re.is_match(name)))
        })
        .map(|(arch, _)| *arch)
}
