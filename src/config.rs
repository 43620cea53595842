use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for sd-metaview.
///
/// Controls what the extraction core reads and how the CLI presents it.
/// Every field has a default, so a partial (or empty) JSON file is valid.
///
/// # Loading
///
/// ```rust,no_run
/// use sd_metaview::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("sd-metaview.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.extraction.camera_for_ai_images = false;
/// config.output.raw_value_limit = 2000;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// What the extraction core reads.
    pub extraction: ExtractionConfig,
    /// How results are shown.
    pub output: OutputConfig,
}

/// Extraction behavior.
///
/// # Example
///
/// ```rust
/// use sd_metaview::config::ExtractionConfig;
///
/// let extraction = ExtractionConfig {
///     camera_for_ai_images: false, // don't attach EXIF camera data to generator output
///     read_dimensions: true,
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Also run the EXIF/XMP normalizer on AI-generated images.
    pub camera_for_ai_images: bool,
    /// Probe pixel dimensions when extracting from a path.
    pub read_dimensions: bool,
}

/// Which view the CLI prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Formatted,
    Raw,
    Tags,
    Json,
}

/// Output and presentation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// View used when no view flag is given.
    pub view: View,
    /// Raw values longer than this many characters are truncated in the Raw view.
    pub raw_value_limit: usize,
    /// Use ANSI colors on a terminal.
    pub color: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            camera_for_ai_images: true,
            read_dimensions: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            view: View::Formatted,
            raw_value_limit: 5000,
            color: true,
        }
    }
}

impl Config {
    /// Resolve the config file path (next to the executable).
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("sd-metaview.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}
