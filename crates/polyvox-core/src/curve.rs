//! Response curves for modulation shaping.
//!
//! A curve reshapes a normalized value while preserving its sign, so the
//! same curve works for bipolar (-1 to 1) and unipolar (0 to 1) signals.

use core::str::FromStr;

use crate::error::ParseError;

/// Shape applied to a modulation value before depth scaling.
///
/// | Curve | Magnitude mapping |
/// |-------|-------------------|
/// | `Linear` | `x` |
/// | `Exponential` | `x²` |
/// | `Logarithmic` | `√x` |
/// | `SCurve` | smoothstep around the midpoint of [-1, 1] |
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ResponseCurve {
    /// Identity.
    #[default]
    Linear,
    /// Slow start, fast finish.
    Exponential,
    /// Fast start, slow finish.
    Logarithmic,
    /// Flattened near the extremes, steep through the center.
    SCurve,
}

impl ResponseCurve {
    /// All curves, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Linear,
        Self::Exponential,
        Self::Logarithmic,
        Self::SCurve,
    ];

    /// Apply the curve. Input is clamped to [-1, 1].
    ///
    /// ```rust
    /// use polyvox_core::ResponseCurve;
    ///
    /// assert_eq!(ResponseCurve::Exponential.apply(-0.5), -0.25);
    /// assert_eq!(ResponseCurve::Logarithmic.apply(0.25), 0.5);
    /// ```
    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        let x = x.clamp(-1.0, 1.0);
        match self {
            Self::Linear => x,
            Self::Exponential => x * x.abs(),
            Self::Logarithmic => libm::sqrtf(x.abs()) * x.signum(),
            Self::SCurve => {
                // Map to [0, 1], smoothstep, map back. Odd-symmetric around 0.
                let u = (x + 1.0) * 0.5;
                let s = u * u * (3.0 - 2.0 * u);
                s * 2.0 - 1.0
            }
        }
    }

    /// Lowercase name as used in presets.
    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Exponential => "exponential",
            Self::Logarithmic => "logarithmic",
            Self::SCurve => "s_curve",
        }
    }
}

const ALIASES: [(&str, ResponseCurve); 9] = [
    ("linear", ResponseCurve::Linear),
    ("lin", ResponseCurve::Linear),
    ("exponential", ResponseCurve::Exponential),
    ("exp", ResponseCurve::Exponential),
    ("logarithmic", ResponseCurve::Logarithmic),
    ("log", ResponseCurve::Logarithmic),
    ("s_curve", ResponseCurve::SCurve),
    ("s-curve", ResponseCurve::SCurve),
    ("scurve", ResponseCurve::SCurve),
];

impl FromStr for ResponseCurve {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(s))
            .map(|&(_, curve)| curve)
            .ok_or(ParseError::new("response curve"))
    }
}
