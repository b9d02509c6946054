//! Selectable saturation stages.
//!
//! [`SaturationType`] picks one of the waveshapers from [`crate::math`];
//! [`Saturator`] adds a drive amount with small-signal gain compensation so
//! that engaging drive changes timbre more than level.

use core::str::FromStr;

use crate::error::ParseError;
use crate::math::{hard_clip, soft_clip, tape_clip, tube_clip};

/// Waveshaping curve used by a saturation stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SaturationType {
    /// tanh soft clipping.
    #[default]
    Soft,
    /// Clamp to [-1, 1].
    Hard,
    /// Asymmetric tanh with different positive/negative coefficients.
    Tube,
    /// Linear below 0.5 magnitude, compressed above, hard-clamped.
    Tape,
}

impl SaturationType {
    /// All saturation types, in declaration order.
    pub const ALL: [Self; 4] = [Self::Soft, Self::Hard, Self::Tube, Self::Tape];

    /// Apply this curve to one sample.
    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Self::Soft => soft_clip(x),
            Self::Hard => hard_clip(x),
            Self::Tube => tube_clip(x),
            Self::Tape => tape_clip(x),
        }
    }

    /// Lowercase name as used in presets.
    pub fn name(self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Hard => "hard",
            Self::Tube => "tube",
            Self::Tape => "tape",
        }
    }
}

impl FromStr for SaturationType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or(ParseError::new("saturation type"))
    }
}

/// Drive stage: gain into a [`SaturationType`] curve.
///
/// ## Parameters
/// - `drive`: 0.0 (bypass) to 1.0, mapped to a pre-gain of 1× to 8×.
/// - `kind`: curve selection (default [`SaturationType::Soft`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Saturator {
    drive: f32,
    pre_gain: f32,
    kind: SaturationType,
}

impl Default for Saturator {
    fn default() -> Self {
        Self::new(SaturationType::Soft, 0.0)
    }
}

impl Saturator {
    /// Maximum pre-gain reached at `drive = 1.0`.
    pub const MAX_PRE_GAIN: f32 = 8.0;

    /// Create a saturator with the given curve and drive.
    pub fn new(kind: SaturationType, drive: f32) -> Self {
        let mut sat = Self {
            drive: 0.0,
            pre_gain: 1.0,
            kind,
        };
        sat.set_drive(drive);
        sat
    }

    /// Set drive amount (clamped to 0.0–1.0).
    pub fn set_drive(&mut self, drive: f32) {
        self.drive = drive.clamp(0.0, 1.0);
        self.pre_gain = 1.0 + self.drive * (Self::MAX_PRE_GAIN - 1.0);
    }

    /// Current drive amount.
    pub fn drive(&self) -> f32 {
        self.drive
    }

    /// Set the curve.
    pub fn set_kind(&mut self, kind: SaturationType) {
        self.kind = kind;
    }

    /// Current curve.
    pub fn kind(&self) -> SaturationType {
        self.kind
    }

    /// Whether the stage alters the signal at all.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.drive > 0.0
    }

    /// Process one sample. Identity when drive is zero.
    #[inline]
    pub fn process(&self, x: f32) -> f32 {
        if !self.is_active() {
            return x;
        }
        // Dividing by sqrt(pre_gain) keeps loud drive settings from jumping
        // far above the dry level while still pushing into the curve.
        self.kind.apply(x * self.pre_gain) / libm::sqrtf(self.pre_gain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_drive_is_identity() {
        let sat = Saturator::new(SaturationType::Hard, 0.0);
        assert_eq!(sat.process(3.0), 3.0);
        assert!(!sat.is_active());
    }

    #[test]
    fn test_hard_clamps() {
        assert_eq!(SaturationType::Hard.apply(2.5), 1.0);
        assert_eq!(SaturationType::Hard.apply(-2.5), -1.0);
    }

    #[test]
    fn test_drive_output_bounded() {
        for kind in SaturationType::ALL {
            let sat = Saturator::new(kind, 1.0);
            for i in -50..=50 {
                let y = sat.process(i as f32 * 0.2);
                assert!(y.is_finite());
                assert!(y.abs() <= 1.0, "{kind:?} produced {y}");
            }
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("tube".parse::<SaturationType>(), Ok(SaturationType::Tube));
        assert_eq!(" Tape ".parse::<SaturationType>(), Ok(SaturationType::Tape));
        assert!("fuzz".parse::<SaturationType>().is_err());
    }
}
