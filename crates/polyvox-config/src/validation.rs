//! Preset and patch validation.
//!
//! Unlike [`SynthPatch::validate`], which stops at the first problem, these
//! functions collect every issue so a preset editor can show them all at
//! once.
//!
//! # Example
//!
//! ```rust
//! use polyvox_config::{Preset, ValidationError, validate_preset};
//!
//! let mut preset = Preset::new("");
//! preset.patch.master_gain = 9.0;
//! preset.patch.filter.resonance = f32::NAN;
//!
//! match validate_preset(&preset) {
//!     Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 3),
//!     other => panic!("expected three errors, got {other:?}"),
//! }
//! ```

use polyvox_synth::{PatchError, SynthPatch};
use thiserror::Error;

use crate::Preset;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The preset has no name.
    #[error("preset name is empty")]
    EmptyName,

    /// A patch field or slot is invalid.
    #[error("{0}")]
    Patch(#[from] PatchError),

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Every problem with a patch, in field order.
pub fn patch_issues(patch: &SynthPatch) -> Vec<ValidationError> {
    let mut issues = Vec::new();
    patch.for_each_issue(|e| issues.push(ValidationError::Patch(e)));
    issues
}

/// Every problem with a preset: metadata first, then the patch.
pub fn preset_issues(preset: &Preset) -> Vec<ValidationError> {
    let mut issues = Vec::new();
    if preset.name.trim().is_empty() {
        issues.push(ValidationError::EmptyName);
    }
    issues.extend(patch_issues(&preset.patch));
    issues
}

/// Validate a patch, reporting all problems.
pub fn validate_patch(patch: &SynthPatch) -> ValidationResult<()> {
    collapse(patch_issues(patch))
}

/// Validate a preset, reporting all problems.
pub fn validate_preset(preset: &Preset) -> ValidationResult<()> {
    collapse(preset_issues(preset))
}

fn collapse(mut issues: Vec<ValidationError>) -> ValidationResult<()> {
    match issues.len() {
        0 => Ok(()),
        1 => Err(issues.remove(0)),
        _ => Err(ValidationError::Multiple(issues)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyvox_synth::{ModDestination, ModSource, ModulationSlot};

    #[test]
    fn default_preset_is_valid() {
        assert!(validate_preset(&Preset::default()).is_ok());
        assert!(validate_patch(&SynthPatch::default()).is_ok());
    }

    #[test]
    fn single_issue_is_not_wrapped() {
        let mut patch = SynthPatch::default();
        patch.polyphony = 0;
        let err = validate_patch(&patch).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Patch(PatchError::OutOfRange {
                field: "polyphony",
                ..
            })
        ));
    }

    #[test]
    fn empty_name_reported() {
        let preset = Preset::new("   ");
        assert_eq!(validate_preset(&preset), Err(ValidationError::EmptyName));
    }

    #[test]
    fn all_issues_collected_in_order() {
        let mut preset = Preset::new("");
        preset.patch.osc_mix = 2.0;
        preset.patch.mod_slots[3] = ModulationSlot {
            depth: 4.0,
            ..ModulationSlot::new(ModSource::Lfo1, ModDestination::Pitch, 0.0)
        };
        let issues = preset_issues(&preset);
        assert_eq!(issues.len(), 3);
        assert_eq!(issues[0], ValidationError::EmptyName);
        assert!(matches!(
            issues[1],
            ValidationError::Patch(PatchError::OutOfRange {
                field: "osc_mix",
                ..
            })
        ));
        assert!(matches!(
            issues[2],
            ValidationError::Patch(PatchError::InvalidSlot { index: 3, .. })
        ));
    }

    #[test]
    fn multiple_display_joins_messages() {
        let err = ValidationError::Multiple(vec![
            ValidationError::EmptyName,
            ValidationError::Patch(PatchError::NonFinite { field: "pan" }),
        ]);
        assert_eq!(
            err.to_string(),
            "multiple validation errors: preset name is empty; pan is not a finite number"
        );
    }
}
