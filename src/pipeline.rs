use std::io::Cursor;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ExtractionConfig;
use crate::container::{self, ContainerKind, RawChunkSet};
use crate::detect::{self, DetectedFormat};
use crate::error::{MetadataError, Result};
use crate::exif;
use crate::metadata::{FileInfo, NormalizedMetadata, RawEntry};
use crate::parsers;

/// Extract metadata from an in-memory image with the default settings.
///
/// # Example
///
/// ```rust,no_run
/// use sd_metaview::pipeline::extract;
///
/// let bytes = std::fs::read("00012-1234.png").unwrap();
/// let meta = extract(&bytes).unwrap();
/// println!("{}", meta.source_label);
/// if let Some(ref prompt) = meta.prompt {
///     println!("Prompt: {prompt}");
/// }
/// ```
pub fn extract(bytes: &[u8]) -> Result<NormalizedMetadata> {
    extract_with(bytes, &ExtractionConfig::default())
}

/// Extract metadata from an in-memory image.
///
/// The container is read, the format detected, and the matching parser run.
/// Camera data comes from the EXIF/XMP normalizer: always for photos, and for
/// AI images when `config.camera_for_ai_images` is set. An image without
/// metadata yields a "no metadata" record ([`NormalizedMetadata::has_metadata`]
/// is `false`), not an error.
///
/// Only [`MetadataError::UnsupportedContainer`] and
/// [`MetadataError::CorruptContainer`] are returned. A payload that does not
/// parse is kept as a partial record with `parse_error` set.
pub fn extract_with(bytes: &[u8], config: &ExtractionConfig) -> Result<NormalizedMetadata> {
    let raw = container::read_chunks(bytes)?;
    let format = detect::detect(&raw);
    log::debug!("Detected {format} in {} container", raw.container);

    let mut meta = match parsers::parse(&raw, format) {
        Ok(meta) => meta,
        Err(e) if !e.is_fatal() => {
            log::warn!("{e}; keeping the raw text");
            partial_record(&raw, format, &e)
        }
        Err(e) => return Err(e),
    };

    let wants_camera = match format {
        DetectedFormat::GenericPhoto => true,
        f if f.is_ai_generator() => config.camera_for_ai_images,
        _ => false,
    };
    if wants_camera {
        let (camera, editor) = exif::normalize(&raw);
        if !camera.is_empty() {
            meta.camera = Some(camera);
        }
        meta.editing_software = editor;
    }

    if format == DetectedFormat::Unknown && !raw.text.is_empty() {
        let text: Vec<&str> = raw.text.iter().map(|c| c.value.as_str()).collect();
        meta.raw_text = Some(text.join("\n\n"));
    }
    meta.raw_entries = raw_entries(&raw);

    Ok(meta)
}

/// Read and extract an image file, adding [`FileInfo`].
pub fn extract_path(path: &Path, config: &ExtractionConfig) -> Result<NormalizedMetadata> {
    let bytes = std::fs::read(path)?;
    let mut meta = extract_with(&bytes, config)?;

    let container = ContainerKind::sniff(&bytes)
        .ok_or_else(|| MetadataError::UnsupportedContainer(path.display().to_string()))?;
    let (width, height) = if config.read_dimensions {
        match dimensions(&bytes) {
            Some((w, h)) => (Some(w), Some(h)),
            None => (None, None),
        }
    } else {
        (None, None)
    };

    meta.file_info = Some(FileInfo {
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        path: path.to_path_buf(),
        byte_size: bytes.len() as u64,
        container,
        width,
        height,
    });
    Ok(meta)
}

/// Pixel dimensions from the image header, without decoding pixels.
fn dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    match reader.into_dimensions() {
        Ok(dims) => Some(dims),
        Err(e) => {
            log::debug!("Could not read image dimensions: {e}");
            None
        }
    }
}

fn partial_record(raw: &RawChunkSet, format: DetectedFormat, err: &MetadataError) -> NormalizedMetadata {
    let mut meta = NormalizedMetadata::empty(format);
    meta.raw_text = parsers::source_text(raw, format);
    meta.parse_error = Some(err.to_string());
    meta
}

/// Everything the container held, for the Raw Data view.
fn raw_entries(raw: &RawChunkSet) -> Vec<RawEntry> {
    let mut entries: Vec<RawEntry> = raw
        .text
        .iter()
        .map(|c| RawEntry {
            key: c.keyword.clone(),
            value: c.value.clone(),
        })
        .collect();

    if let Some(ref block) = raw.exif {
        entries.push(RawEntry {
            key: "EXIF".into(),
            value: format!("{} bytes", block.len()),
        });
        if let Some(comment) = raw.user_comment() {
            entries.push(RawEntry {
                key: "UserComment".into(),
                value: comment,
            });
        }
    }
    if let Some(ref xmp) = raw.xmp {
        entries.push(RawEntry {
            key: "XMP".into(),
            value: xmp.xml.clone(),
        });
    }
    if let Some(ref store) = raw.c2pa {
        entries.push(RawEntry {
            key: "C2PA".into(),
            value: parsers::c2pa::printable_summary(store),
        });
    }
    entries
}

/// Collect supported image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks). Only `.png`, `.jpg`, `.jpeg` and `.webp`
/// files are included.
///
/// # Example
///
/// ```rust,no_run
/// use sd_metaview::pipeline::collect_images;
/// use std::path::PathBuf;
///
/// let images = collect_images(&[
///     PathBuf::from("00012-1234.png"),   // single file
///     PathBuf::from("./outputs/"),       // entire directory
/// ]);
/// println!("Found {} images", images.len());
/// ```
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if ContainerKind::from_path(path).is_some() {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && ContainerKind::from_path(p).is_some() {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Entry, jpeg_with_exif, png_with_chunks, png_with_text, tiff};
    use std::fs;
    use tempfile::TempDir;

    // ── end-to-end scenarios ─────────────────────────────────────────

    #[test]
    fn webui_png() {
        let png = png_with_text(&[(
            "parameters",
            "a cat, masterpiece\nNegative prompt: blurry\nSteps: 20, Sampler: Euler, CFG scale: 7",
        )]);
        let meta = extract(&png).unwrap();
        assert_eq!(meta.source_format, DetectedFormat::AutomaticWebUI);
        assert_eq!(meta.prompt.as_deref(), Some("a cat, masterpiece"));
        assert_eq!(meta.negative_prompt.as_deref(), Some("blurry"));
        let params: Vec<_> = meta
            .parameters
            .iter()
            .map(|p| (p.key.as_str(), p.value.as_str()))
            .collect();
        assert_eq!(params, [("Steps", "20"), ("Sampler", "Euler"), ("CFG scale", "7")]);
        assert!(meta.has_metadata());
        assert!(meta.camera.is_none());
        assert_eq!(meta.raw_entries[0].key, "parameters");
    }

    #[test]
    fn webui_user_comment_in_small_jpeg_exif() {
        let block = tiff(
            vec![],
            vec![Entry::undefined(0x9286, b"ASCII\0\0\0a fox\nSteps: 20, Seed: 1")],
            vec![],
        );
        let meta = extract(&jpeg_with_exif(&block)).unwrap();
        assert_eq!(meta.source_format, DetectedFormat::AutomaticWebUI);
        assert_eq!(meta.prompt.as_deref(), Some("a fox"));
        assert_eq!(meta.parameters.get("Seed"), Some("1"));
        assert!(meta.raw_entries.iter().any(|e| e.key == "UserComment"));
    }

    #[test]
    fn camera_jpeg() {
        let block = tiff(
            vec![Entry::ascii(0x010F, "Canon"), Entry::ascii(0x0110, "Canon EOS 5D")],
            vec![Entry::rational(0x829D, &[(28, 10)])],
            vec![
                Entry::ascii(0x0001, "S"),
                Entry::rational(0x0002, &[(33, 1), (52, 1), (0, 1)]),
                Entry::ascii(0x0003, "W"),
                Entry::rational(0x0004, &[(151, 1), (12, 1), (0, 1)]),
            ],
        );
        let meta = extract(&jpeg_with_exif(&block)).unwrap();
        assert_eq!(meta.source_format, DetectedFormat::GenericPhoto);
        assert!(meta.prompt.is_none());
        assert!(meta.architecture.is_none());

        let camera = meta.camera.unwrap();
        assert_eq!(camera.make.as_deref(), Some("Canon"));
        assert_eq!(camera.model.as_deref(), Some("Canon EOS 5D"));
        assert_eq!(camera.aperture, Some(2.8));
        let gps = camera.gps.unwrap();
        assert!((gps.latitude + 33.866_666).abs() < 1e-4);
        assert!((gps.longitude + 151.2).abs() < 1e-4);
    }

    #[test]
    fn copyright_only_png() {
        let png = png_with_text(&[("Copyright", "(c) 2024 Jane Doe")]);
        let meta = extract(&png).unwrap();
        assert_eq!(meta.source_format, DetectedFormat::Unknown);
        assert!(!meta.has_metadata());
        assert!(meta.prompt.is_none());
        assert!(meta.negative_prompt.is_none());
        assert!(meta.parameters.is_empty());
        assert!(meta.architecture.is_none());
        assert!(meta.camera.is_none());
        assert_eq!(meta.raw_text.as_deref(), Some("(c) 2024 Jane Doe"));
        assert_eq!(
            meta.raw_entries,
            [RawEntry { key: "Copyright".into(), value: "(c) 2024 Jane Doe".into() }]
        );
    }

    // ── outcomes ─────────────────────────────────────────────────────

    #[test]
    fn bare_image_is_no_metadata() {
        let meta = extract(&png_with_text(&[])).unwrap();
        assert_eq!(meta.source_format, DetectedFormat::Unknown);
        assert_eq!(meta.source_label, "No metadata");
        assert!(meta.raw_entries.is_empty());
        assert!(meta.raw_text.is_none());
    }

    #[test]
    fn unknown_signature_is_fatal() {
        let err = extract(b"GIF89a\x01\x00\x01\x00").unwrap_err();
        assert!(matches!(err, MetadataError::UnsupportedContainer(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn malformed_payload_becomes_partial_record() {
        let png = png_with_text(&[
            ("Software", "NovelAI"),
            ("Description", "a fox"),
            ("Comment", "{\"steps\": 28,"),
        ]);
        let meta = extract(&png).unwrap();
        assert_eq!(meta.source_format, DetectedFormat::NovelAI);
        assert!(meta.prompt.is_none());
        assert!(meta.parameters.is_empty());
        assert_eq!(meta.raw_text.as_deref(), Some("{\"steps\": 28,"));
        assert!(meta.parse_error.unwrap().contains("NovelAI"));
    }

    #[test]
    fn camera_for_ai_images_toggle() {
        let block = tiff(vec![Entry::ascii(0x010F, "Canon")], vec![], vec![]);
        let png = png_with_chunks(&[
            (*b"tEXt", b"parameters\0a cat\nSteps: 20, Sampler: Euler".to_vec()),
            (*b"eXIf", block),
        ]);

        let with_camera = extract(&png).unwrap();
        assert_eq!(with_camera.source_format, DetectedFormat::AutomaticWebUI);
        assert_eq!(
            with_camera.camera.and_then(|c| c.make).as_deref(),
            Some("Canon")
        );

        let config = ExtractionConfig {
            camera_for_ai_images: false,
            ..Default::default()
        };
        let without = extract_with(&png, &config).unwrap();
        assert_eq!(without.prompt.as_deref(), Some("a cat"));
        assert!(without.camera.is_none());
    }

    #[test]
    fn repeated_extraction_is_deterministic() {
        let png = png_with_text(&[("parameters", "a cat\nSteps: 20")]);
        let a = extract(&png).unwrap();
        let b = extract(&png).unwrap();
        assert_eq!(a.source_format, b.source_format);
        assert_eq!(a.prompt, b.prompt);
        assert_eq!(a.parameters, b.parameters);
    }

    #[test]
    fn parallel_callers_need_no_locking() {
        let images: Vec<Vec<u8>> = (0..8)
            .map(|i| {
                let text = format!("prompt {i}\nSteps: {}", 10 + i);
                png_with_text(&[("parameters", text.as_str())])
            })
            .collect();

        std::thread::scope(|s| {
            let handles: Vec<_> = images
                .iter()
                .map(|bytes| s.spawn(move || extract(bytes).unwrap()))
                .collect();
            for (i, handle) in handles.into_iter().enumerate() {
                let meta = handle.join().unwrap();
                assert_eq!(meta.prompt, Some(format!("prompt {i}")));
                assert_eq!(meta.parameters.get("Steps"), Some((10 + i).to_string().as_str()));
            }
        });
    }

    // ── extract_path ─────────────────────────────────────────────────

    #[test]
    fn extract_path_adds_file_info() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("00001-42.png");
        fs::write(&path, png_with_text(&[("parameters", "a cat\nSteps: 20")])).unwrap();

        let meta = extract_path(&path, &ExtractionConfig::default()).unwrap();
        let info = meta.file_info.unwrap();
        assert_eq!(info.file_name, "00001-42.png");
        assert_eq!(info.container, ContainerKind::Png);
        assert_eq!(info.byte_size, fs::metadata(&path).unwrap().len());
        assert_eq!((info.width, info.height), (Some(4), Some(3)));
    }

    #[test]
    fn extract_path_without_dimensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.png");
        fs::write(&path, png_with_text(&[])).unwrap();

        let config = ExtractionConfig {
            read_dimensions: false,
            ..Default::default()
        };
        let info = extract_path(&path, &config).unwrap().file_info.unwrap();
        assert_eq!(info.width, None);
    }

    #[test]
    fn extract_path_missing_file_is_io_error() {
        let err = extract_path(Path::new("/nonexistent/image.png"), &ExtractionConfig::default())
            .unwrap_err();
        assert!(matches!(err, MetadataError::Io(_)));
    }

    // ── collect_images ───────────────────────────────────────────────

    #[test]
    fn collect_images_single_file() {
        let dir = TempDir::new().unwrap();
        let png = dir.path().join("test.png");
        fs::write(&png, b"fake").unwrap();

        let images = collect_images(&[png.clone()]);
        assert_eq!(images, [png]);
    }

    #[test]
    fn collect_images_skips_unsupported() {
        let dir = TempDir::new().unwrap();
        let txt = dir.path().join("readme.txt");
        fs::write(&txt, b"hello").unwrap();
        let heic = dir.path().join("photo.heic");
        fs::write(&heic, b"hello").unwrap();

        assert!(collect_images(&[txt, heic]).is_empty());
    }

    #[test]
    fn collect_images_directory_recursive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        fs::write(dir.path().join("a.jpg"), b"fake").unwrap();
        fs::write(sub.join("b.PNG"), b"fake").unwrap();
        fs::write(sub.join("c.webp"), b"fake").unwrap();
        fs::write(sub.join("d.txt"), b"fake").unwrap();

        let images = collect_images(&[dir.path().to_path_buf()]);
        assert_eq!(images.len(), 3);
    }

    #[test]
    fn collect_images_nonexistent_path() {
        let images = collect_images(&[PathBuf::from("/nonexistent/path")]);
        assert!(images.is_empty());
    }
}
