//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione del packager.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di packaging
//! - Registri tipizzati per tool, profili di ottimizzazione e profili di compressione
//! - Validazione al caricamento: ogni chiave referenziata deve esistere
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//! - Deriva per ogni cartella una copia `FolderSettings` (mai mutare la config base)
//!
//! ## Parametri principali:
//! - `width` / `height`: Box di destinazione per cover e collage (default: 1920x1080)
//! - `aspect_mode`: Origine dell'aspect ratio (fixed, first_candidate, first_folder_image, manual)
//! - `fit_mode`: Come adattare il box all'aspect ratio
//! - `cover` / `collage`: Abilitano le due immagini composite
//! - `missing_policy` / `abort_incomplete`: Policy per set di candidate vuoti o incompleti
//! - `batch_mode`: La cartella base contiene esattamente una sottocartella di immagini
//! - `compression_profiles`: Partecipanti al torneo di archiviazione, in ordine di dichiarazione
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     width: 1600,
//!     height: 1200,
//!     collage: false,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::compositor::{fit_dimensions, parse_ratio, MAX_DIMENSION, MAX_PIXELS};
use crate::utils::{INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Where the target aspect ratio comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AspectMode {
    /// Use the configured width/height as they are
    #[default]
    Fixed,
    /// Adopt the ratio of the first candidate image
    FirstCandidate,
    /// Adopt the ratio of the first image of the folder being archived
    FirstFolderImage,
    /// Parse `manual_ratio` ("W:H"), falling back to `Fixed`
    Manual,
}

/// How the configured box is adapted to the target ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Keep the height, derive the width
    WidthFromHeight,
    /// Keep the width, derive the height
    HeightFromWidth,
    /// Shrink whichever side overflows the ratio
    #[default]
    FitWithin,
}

/// What to do when no numbered candidate image exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Fail the folder
    Abort,
    /// Archive the folder without cover or collage
    FolderOnly,
    /// Pick four images spread over the folder
    #[default]
    AutoSelect,
}

/// One external optimization tool
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    /// Executable path or bare name resolved through PATH
    pub path: String,
    /// Argument template with `{input}` and optionally `{output}`
    pub params: Vec<String>,
}

impl ToolSpec {
    /// An entry without path or parameters is skipped
    pub fn is_configured(&self) -> bool {
        !self.path.trim().is_empty() && !self.params.is_empty()
    }
}

/// One participant of the archive tournament
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompressionProfile {
    pub name: String,
    /// Archiver executable
    pub tool: String,
    /// Ordered argument fragments with `{output}` and `{input}` placeholders
    pub args: Vec<String>,
    /// Declared output extension, without the leading dot
    pub extension: String,
}

/// Configuration for folder packaging
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target box width in pixels
    pub width: u32,
    /// Target box height in pixels
    pub height: u32,
    pub aspect_mode: AspectMode,
    /// Manual ratio in "W:H" form, used with `AspectMode::Manual`
    pub manual_ratio: Option<String>,
    pub fit_mode: FitMode,
    /// Produce a padded cover image
    pub cover: bool,
    /// Produce a 2x2 collage
    pub collage: bool,
    pub missing_policy: MissingPolicy,
    /// Fail the folder when only 1-3 candidates exist (otherwise cover-only)
    pub abort_incomplete: bool,
    /// Base folders contain exactly one image subfolder
    pub batch_mode: bool,
    /// Tool registry: key -> tool
    pub tools: BTreeMap<String, ToolSpec>,
    /// Optimization profiles: name -> ordered tool keys
    pub optimization_profiles: BTreeMap<String, Vec<String>>,
    /// Profile applied to the staged folder images
    pub folder_profile: Option<String>,
    /// Profile applied to cover and collage images
    pub composite_profile: Option<String>,
    /// Tournament participants in declaration order
    pub compression_profiles: Vec<CompressionProfile>,
    /// Profile name -> extension replacing the declared one on commit
    pub extension_overrides: BTreeMap<String, String>,
    /// Directory receiving the committed archives
    pub output_folder: PathBuf,
    /// Preferred staging directory
    pub temp_folder: Option<PathBuf>,
    /// Remove the per-run temp directory when a folder is done
    pub empty_temp: bool,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        let mut tools = BTreeMap::new();
        tools.insert(
            "jpegoptim".to_string(),
            ToolSpec {
                path: "jpegoptim".to_string(),
                params: crate::args!["--strip-all", "--all-progressive", "--quiet", "{input}"],
            },
        );
        tools.insert(
            "guetzli".to_string(),
            ToolSpec {
                path: "guetzli".to_string(),
                params: crate::args!["--quality", 90, "{input}", "{output}"],
            },
        );

        let mut optimization_profiles = BTreeMap::new();
        optimization_profiles.insert("folder".to_string(), vec!["jpegoptim".to_string()]);
        optimization_profiles.insert(
            "composite".to_string(),
            vec!["guetzli".to_string(), "jpegoptim".to_string()],
        );

        Self {
            width: 1920,
            height: 1080,
            aspect_mode: AspectMode::Fixed,
            manual_ratio: None,
            fit_mode: FitMode::FitWithin,
            cover: true,
            collage: true,
            missing_policy: MissingPolicy::AutoSelect,
            abort_incomplete: false,
            batch_mode: true,
            tools,
            optimization_profiles,
            folder_profile: Some("folder".to_string()),
            composite_profile: Some("composite".to_string()),
            compression_profiles: vec![
                CompressionProfile {
                    name: "7z_lzma2".to_string(),
                    tool: "7z".to_string(),
                    args: crate::args!["a", "-t7z", "-mx=9", "-m0=lzma2", "{output}", "{input}"],
                    extension: "7z".to_string(),
                },
                CompressionProfile {
                    name: "7z_ppmd".to_string(),
                    tool: "7z".to_string(),
                    args: crate::args!["a", "-t7z", "-mx=9", "-m0=PPMd", "{output}", "{input}"],
                    extension: "7z".to_string(),
                },
                CompressionProfile {
                    name: "zip".to_string(),
                    tool: "zip".to_string(),
                    args: crate::args!["-r", "-9", "-q", "{output}", "{input}"],
                    extension: "zip".to_string(),
                },
            ],
            extension_overrides: BTreeMap::new(),
            output_folder: PathBuf::from("output"),
            temp_folder: None,
            empty_temp: true,
            json_output: false,
        }
    }
}

/// Per-folder switches derived from the base configuration.
///
/// Selection outcomes narrow these for one folder only; the base `Config`
/// stays untouched for the next folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FolderSettings {
    pub cover: bool,
    pub collage: bool,
}

impl FolderSettings {
    pub fn without_collage(self) -> Self {
        Self { collage: false, ..self }
    }

    pub fn without_composites(self) -> Self {
        Self { cover: false, collage: false }
    }

    pub fn composes_anything(&self) -> bool {
        self.cover || self.collage
    }
}

/// Usable as part of a single file name
fn is_plain_file_component(value: &str) -> bool {
    !value.trim().is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\'])
}

impl Config {
    /// Fresh per-folder settings
    pub fn folder_settings(&self) -> FolderSettings {
        FolderSettings {
            cover: self.cover,
            collage: self.collage,
        }
    }

    /// Ordered tool list of a named optimization profile
    pub fn profile_tools(&self, profile: &str) -> Option<Vec<(&str, &ToolSpec)>> {
        let keys = self.optimization_profiles.get(profile)?;
        Some(
            keys.iter()
                .filter_map(|key| self.tools.get(key).map(|tool| (key.as_str(), tool)))
                .collect(),
        )
    }

    /// Final extension for a profile, honoring the override table
    pub fn archive_extension<'a>(&'a self, profile: &'a CompressionProfile) -> &'a str {
        self.extension_overrides
            .get(&profile.name)
            .map(String::as_str)
            .unwrap_or(&profile.extension)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(anyhow::anyhow!("Target width and height must be greater than 0"));
        }

        if self.collage && (self.width < 2 || self.height < 2) {
            return Err(anyhow::anyhow!("Collage needs a target of at least 2x2 pixels"));
        }

        for (profile, keys) in &self.optimization_profiles {
            for key in keys {
                if !self.tools.contains_key(key) {
                    return Err(anyhow::anyhow!(
                        "Optimization profile '{}' references unknown tool '{}'",
                        profile,
                        key
                    ));
                }
            }
        }

        for profile in [&self.folder_profile, &self.composite_profile].into_iter().flatten() {
            if !self.optimization_profiles.contains_key(profile) {
                return Err(anyhow::anyhow!("Unknown optimization profile: {}", profile));
            }
        }

        if self.compression_profiles.is_empty() {
            return Err(anyhow::anyhow!("At least one compression profile is required"));
        }

        let mut names = HashSet::new();
        for profile in &self.compression_profiles {
            if !names.insert(profile.name.as_str()) {
                return Err(anyhow::anyhow!("Duplicate compression profile: {}", profile.name));
            }
            if !is_plain_file_component(&profile.name) {
                return Err(anyhow::anyhow!(
                    "Compression profile name {:?} must be a plain name without path separators",
                    profile.name
                ));
            }
            if profile.tool.trim().is_empty() {
                return Err(anyhow::anyhow!("Compression profile '{}' has no tool", profile.name));
            }
            if !profile.args.iter().any(|a| a.contains(OUTPUT_PLACEHOLDER)) {
                return Err(anyhow::anyhow!(
                    "Compression profile '{}' has no {} fragment",
                    profile.name,
                    OUTPUT_PLACEHOLDER
                ));
            }
            if !profile.args.iter().any(|a| a.contains(INPUT_PLACEHOLDER)) {
                return Err(anyhow::anyhow!(
                    "Compression profile '{}' has no {} fragment",
                    profile.name,
                    INPUT_PLACEHOLDER
                ));
            }
            let extension = self.archive_extension(profile).trim_matches('.');
            if extension.is_empty() {
                return Err(anyhow::anyhow!("Compression profile '{}' has no extension", profile.name));
            }
            if !is_plain_file_component(extension) {
                return Err(anyhow::anyhow!(
                    "Compression profile '{}' has an extension with path separators: {}",
                    profile.name,
                    extension
                ));
            }
        }

        for name in self.extension_overrides.keys() {
            if !names.contains(name.as_str()) {
                warn!("Extension override for unknown compression profile: {}", name);
            }
        }

        let fixed_ratio = self.width as f64 / self.height as f64;
        let mut known_ratios = vec![fixed_ratio];
        if self.aspect_mode == AspectMode::Manual {
            match self.manual_ratio.as_deref().and_then(parse_ratio) {
                Some(ratio) => known_ratios.push(ratio),
                None => warn!(
                    "Manual ratio {:?} is not a valid W:H value, falling back to fixed size",
                    self.manual_ratio
                ),
            }
        }
        for ratio in known_ratios {
            if fit_dimensions(self.width, self.height, ratio, self.fit_mode, self.collage).is_none() {
                return Err(anyhow::anyhow!(
                    "Target {}x{} at ratio {:.4} exceeds {} px per side or {} px in total",
                    self.width,
                    self.height,
                    ratio,
                    MAX_DIMENSION,
                    MAX_PIXELS
                ));
            }
        }

        Ok(())
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.width, 1920);
        assert_eq!(config.height, 1080);
        assert!(config.cover);
        assert!(config.collage);
        assert_eq!(config.missing_policy, MissingPolicy::AutoSelect);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config
            .optimization_profiles
            .insert("broken".to_string(), vec!["missing-tool".to_string()]);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.folder_profile = Some("nope".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.compression_profiles.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.compression_profiles[0].args.retain(|a| a != "{input}");
        assert!(config.validate().is_err());

        let mut config = Config::default();
        let duplicate = config.compression_profiles[0].clone();
        config.compression_profiles.push(duplicate);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_profile_names_must_stay_inside_candidate_dir() {
        for bad in ["../escape", "sub/zip", "win\\zip", "..", ""] {
            let mut config = Config::default();
            config.compression_profiles[2].name = bad.to_string();
            assert!(config.validate().is_err(), "{:?} accepted", bad);
        }

        let mut config = Config::default();
        config.extension_overrides.insert("zip".to_string(), "../zip".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.compression_profiles[2].name = "zip.max".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_oversized_target_is_rejected() {
        let config = Config {
            aspect_mode: AspectMode::Manual,
            manual_ratio: Some("100000000:1".to_string()),
            fit_mode: FitMode::WidthFromHeight,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            width: 70_000,
            height: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            aspect_mode: AspectMode::Manual,
            manual_ratio: Some("21:9".to_string()),
            fit_mode: FitMode::WidthFromHeight,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unparsable_manual_ratio_is_not_fatal() {
        let config = Config {
            aspect_mode: AspectMode::Manual,
            manual_ratio: Some("wide".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_folder_settings_do_not_touch_base() {
        let config = Config::default();
        let narrowed = config.folder_settings().without_collage();
        assert!(narrowed.cover);
        assert!(!narrowed.collage);
        assert!(config.collage);
        assert_eq!(config.folder_settings(), FolderSettings { cover: true, collage: true });
        assert!(!config.folder_settings().without_composites().composes_anything());
    }

    #[test]
    fn test_archive_extension_override() {
        let mut config = Config::default();
        config
            .extension_overrides
            .insert("zip".to_string(), "cbz".to_string());
        let zip = config.compression_profiles[2].clone();
        let lzma = config.compression_profiles[0].clone();
        assert_eq!(config.archive_extension(&zip), "cbz");
        assert_eq!(config.archive_extension(&lzma), "7z");
    }

    #[test]
    fn test_profile_tools_keeps_declared_order() {
        let config = Config::default();
        let tools = config.profile_tools("composite").unwrap();
        let keys: Vec<&str> = tools.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec!["guetzli", "jpegoptim"]);
        assert!(config.profile_tools("unknown").is_none());
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let original_config = Config {
            width: 1200,
            height: 800,
            collage: false,
            abort_incomplete: true,
            missing_policy: MissingPolicy::FolderOnly,
            ..Default::default()
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.width, 1200);
        assert_eq!(loaded_config.height, 800);
        assert!(!loaded_config.collage);
        assert!(loaded_config.abort_incomplete);
        assert_eq!(loaded_config.missing_policy, MissingPolicy::FolderOnly);
        assert_eq!(loaded_config.compression_profiles, original_config.compression_profiles);
    }

    #[tokio::test]
    async fn test_partial_config_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        tokio::fs::write(&config_path, r#"{ "width": 800, "aspect_mode": "manual", "manual_ratio": "4:3" }"#)
            .await
            .unwrap();

        let loaded = Config::from_file(&config_path).await.unwrap();
        assert_eq!(loaded.width, 800);
        assert_eq!(loaded.height, 1080);
        assert_eq!(loaded.aspect_mode, AspectMode::Manual);
        assert_eq!(loaded.compression_profiles.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_config_file_gives_default() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = Config::from_file(&temp_dir.path().join("absent.json")).await.unwrap();
        assert_eq!(loaded.width, Config::default().width);
    }
}
