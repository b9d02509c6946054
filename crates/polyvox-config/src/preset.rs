//! Preset file format and operations.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use polyvox_synth::SynthPatch;

use crate::error::ConfigError;

/// Preset file encodings, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetFormat {
    /// `.toml`
    Toml,
    /// `.json`
    Json,
}

impl PresetFormat {
    /// Format for a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(Self::Toml),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Json),
            _ => Err(ConfigError::UnknownFormat(path.to_path_buf())),
        }
    }
}

/// Broad sound family, for browsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetCategory {
    /// Starting points and test sounds.
    #[default]
    Init,
    /// Bass.
    Bass,
    /// Lead.
    Lead,
    /// Pad.
    Pad,
    /// Plucked or percussive.
    Pluck,
    /// Keys.
    Keys,
    /// Rhythmic or evolving textures.
    Texture,
}

impl PresetCategory {
    /// Lowercase name as stored in preset files.
    pub fn name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Bass => "bass",
            Self::Lead => "lead",
            Self::Pad => "pad",
            Self::Pluck => "pluck",
            Self::Keys => "keys",
            Self::Texture => "texture",
        }
    }
}

/// A named [`SynthPatch`] with browsing metadata.
///
/// Every patch field is optional in the file; missing fields take the
/// [`SynthPatch::default`] value. Modulation slots are a sparse list.
///
/// # TOML Format
///
/// ```toml
/// name = "Soft Pad"
/// description = "Slow strings"
/// category = "pad"
///
/// [patch]
/// polyphony = 8
///
/// [patch.osc1]
/// waveform = "saw"
///
/// [patch.amp_env]
/// attack_s = 0.8
/// release_s = 1.5
///
/// [[patch.mod_slots]]
/// slot = 0
/// source = "lfo1"
/// destination = "filter_cutoff"
/// depth = 0.2
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preset {
    /// Name of the preset.
    pub name: String,

    /// Optional description of the preset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Optional author credit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Sound family.
    #[serde(default)]
    pub category: PresetCategory,

    /// The sound itself.
    #[serde(default)]
    pub patch: SynthPatch,
}

impl Preset {
    /// Create a preset holding the default patch.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            author: None,
            category: PresetCategory::default(),
            patch: SynthPatch::default(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: PresetCategory) -> Self {
        self.category = category;
        self
    }

    /// Replace the patch.
    pub fn with_patch(mut self, patch: SynthPatch) -> Self {
        self.patch = patch;
        self
    }

    /// Load a preset, picking TOML or JSON from the extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = PresetFormat::from_path(path)?;
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        match format {
            PresetFormat::Toml => Self::from_toml(&content),
            PresetFormat::Json => Self::from_json(&content),
        }
    }

    /// Save the preset, picking TOML or JSON from the extension.
    ///
    /// Missing parent directories are created.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = match PresetFormat::from_path(path)? {
            PresetFormat::Toml => self.to_toml()?,
            PresetFormat::Json => self.to_json()?,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
            }
        }

        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Parse a preset from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Convert the preset to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Parse a preset from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Convert the preset to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Load every `.toml` / `.json` preset in `dir` (not recursive), sorted by
/// file name.
///
/// Files that fail to parse are returned as errors alongside their path so
/// one bad file does not hide the rest.
pub fn load_presets_in(
    dir: impl AsRef<Path>,
) -> Result<Vec<(PathBuf, Result<Preset, ConfigError>)>, ConfigError> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir).map_err(|e| ConfigError::read_file(dir, e))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && PresetFormat::from_path(path).is_ok())
        .collect();
    paths.sort();
    Ok(paths
        .into_iter()
        .map(|path| {
            let preset = Preset::load(&path);
            (path, preset)
        })
        .collect())
}
