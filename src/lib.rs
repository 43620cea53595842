//! # sd-metaview
//!
//! Read the prompts, generation parameters and camera data embedded in PNG,
//! JPEG and WebP images: AUTOMATIC1111/Forge WebUI, ComfyUI, NovelAI, OpenAI
//! C2PA manifests, Google Gemini XMP, and plain camera EXIF.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sd_metaview::config::ExtractionConfig;
//! use sd_metaview::pipeline::{collect_images, extract_path};
//! use std::path::PathBuf;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ExtractionConfig::default();
//!
//!     for path in collect_images(&[PathBuf::from("./outputs")]) {
//!         match extract_path(&path, &config) {
//!             Ok(meta) => {
//!                 println!("{}: {}", path.display(), meta.source_label);
//!                 if let Some(ref prompt) = meta.prompt {
//!                     println!("  prompt: {prompt}");
//!                 }
//!                 println!("{}", meta.formatted_parameters());
//!             }
//!             Err(e) => eprintln!("{}: {e}", path.display()),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! Each stage can be called on its own:
//!
//! ```rust,no_run
//! use sd_metaview::{container, detect, exif, parsers};
//!
//! # fn main() -> sd_metaview::Result<()> {
//! let bytes = std::fs::read("image.png")?;
//!
//! // 1. Raw chunks (tEXt/iTXt/zTXt, EXIF, XMP, C2PA)
//! let raw = container::read_chunks(&bytes)?;
//!
//! // 2. Which producer wrote them
//! let format = detect::detect(&raw);
//!
//! // 3. Prompt and parameters
//! let meta = parsers::parse(&raw, format)?;
//! println!("{:?}", meta.architecture);
//!
//! // 4. Camera data
//! let (camera, editor) = exif::normalize(&raw);
//! println!("{:?} {:?}", camera.make, editor);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`container`]: PNG/JPEG/WebP chunk reading
//! - [`detect`]: ordered format detection rules
//! - [`parsers`]: per-producer parsers
//! - [`architecture`]: model family classification
//! - [`exif`]: EXIF/XMP camera data normalization
//! - [`pipeline`]: extraction entry points and file collection
//! - [`config`]: configuration types and loading/saving

pub mod architecture;
pub mod config;
pub mod container;
pub mod detect;
pub mod error;
pub mod exif;
pub mod metadata;
pub mod parsers;
pub mod pipeline;
pub mod xmp;

#[cfg(test)]
mod testutil;

pub use detect::DetectedFormat;
pub use error::{MetadataError, Result};
pub use metadata::NormalizedMetadata;
pub use pipeline::{extract, extract_path, extract_with};
