//! Preset files and factory sounds for the polyvox synthesizer.
//!
//! A [`Preset`] wraps a [`SynthPatch`](polyvox_synth::SynthPatch) with a
//! name and browsing metadata, and reads or writes it as TOML or JSON.
//!
//! # Features
//!
//! - **Preset files**: TOML or JSON, chosen by extension, with every patch
//!   field optional and modulation slots stored as a sparse list
//! - **Validation**: collect every problem with a preset, not just the first
//! - **Factory presets**: built-in sounds covering unison, glide, tempo-synced
//!   LFOs and the step sequencer
//!
//! # Example
//!
//! ```rust,no_run
//! use polyvox_config::{Preset, PresetCategory, get_factory_preset, validate_preset};
//!
//! // Start from a factory sound and tweak it
//! let mut preset = get_factory_preset("warm_pad").unwrap();
//! preset.name = "Darker Pad".to_string();
//! preset.patch.filter.cutoff_hz = 900.0;
//! validate_preset(&preset).unwrap();
//!
//! // Save and reload
//! preset.save("presets/darker_pad.toml").unwrap();
//! let loaded = Preset::load("presets/darker_pad.toml").unwrap();
//! assert_eq!(loaded.category, PresetCategory::Pad);
//! ```

mod error;
mod preset;

/// Preset and patch validation.
pub mod validation;

/// Factory presets bundled with the library.
pub mod factory_presets;

pub use error::ConfigError;
pub use factory_presets::{
    FACTORY_PRESET_NAMES, factory_preset_names, factory_presets, get_factory_preset,
    is_factory_preset,
};
pub use preset::{Preset, PresetCategory, PresetFormat, load_presets_in};
pub use validation::{
    ValidationError, ValidationResult, patch_issues, preset_issues, validate_patch,
    validate_preset,
};

/// Re-export of the patch type presets carry.
pub use polyvox_synth::SynthPatch;
