//! Modulation source abstraction and polarity mapping.
//!
//! Sources report whether they are bipolar (-1 to 1, e.g. an LFO) or
//! unipolar (0 to 1, e.g. an envelope). Routing slots declare the polarity
//! they want and [`Polarity::convert`] maps between the two, so a
//! destination never needs to know which kind of source drives it.

use crate::envelope::AdsrEnvelope;
use crate::lfo::Lfo;

/// Value range of a modulation signal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Polarity {
    /// -1.0 to 1.0.
    #[default]
    Bipolar,
    /// 0.0 to 1.0.
    Unipolar,
}

impl Polarity {
    /// Polarity for a `bipolar` flag.
    pub const fn from_bipolar(bipolar: bool) -> Self {
        if bipolar { Self::Bipolar } else { Self::Unipolar }
    }

    /// Map `value`, produced with polarity `from`, into `self`.
    ///
    /// Unipolar → bipolar is `2v − 1`; bipolar → unipolar is `(v + 1) / 2`.
    ///
    /// ```rust
    /// use polyvox_core::Polarity;
    ///
    /// assert_eq!(Polarity::Bipolar.convert(0.75, Polarity::Unipolar), 0.5);
    /// assert_eq!(Polarity::Unipolar.convert(-1.0, Polarity::Bipolar), 0.0);
    /// assert_eq!(Polarity::Bipolar.convert(-0.3, Polarity::Bipolar), -0.3);
    /// ```
    #[inline]
    pub fn convert(self, value: f32, from: Polarity) -> f32 {
        match (from, self) {
            (Self::Unipolar, Self::Bipolar) => value * 2.0 - 1.0,
            (Self::Bipolar, Self::Unipolar) => (value + 1.0) * 0.5,
            _ => value,
        }
    }
}

/// Trait for anything that can generate modulation signals.
///
/// # Example
///
/// ```rust
/// use polyvox_core::{Lfo, LfoConfig, ModulationSource};
///
/// let mut lfo = Lfo::new(48000.0, LfoConfig::default().with_rate(2.0));
/// let value = lfo.mod_advance();
/// assert!((-1.0..=1.0).contains(&value));
/// assert!(lfo.is_bipolar());
/// ```
pub trait ModulationSource {
    /// Get the next modulation value.
    fn mod_advance(&mut self) -> f32;

    /// Check if this source is bipolar (-1 to 1) or unipolar (0 to 1).
    fn is_bipolar(&self) -> bool;

    /// Reset the modulation source to its initial state.
    fn mod_reset(&mut self);

    /// Get the current value without advancing.
    fn mod_value(&self) -> f32;

    /// Native polarity of this source.
    fn polarity(&self) -> Polarity {
        Polarity::from_bipolar(self.is_bipolar())
    }

    /// Convert to unipolar (0 to 1) regardless of source type.
    fn mod_advance_unipolar(&mut self) -> f32 {
        let value = self.mod_advance();
        Polarity::Unipolar.convert(value, self.polarity())
    }

    /// Convert to bipolar (-1 to 1) regardless of source type.
    fn mod_advance_bipolar(&mut self) -> f32 {
        let value = self.mod_advance();
        Polarity::Bipolar.convert(value, self.polarity())
    }
}

impl ModulationSource for Lfo {
    fn mod_advance(&mut self) -> f32 {
        self.advance()
    }

    fn is_bipolar(&self) -> bool {
        true
    }

    fn mod_reset(&mut self) {
        self.reset();
    }

    fn mod_value(&self) -> f32 {
        self.value()
    }
}

impl ModulationSource for AdsrEnvelope {
    fn mod_advance(&mut self) -> f32 {
        self.advance()
    }

    fn is_bipolar(&self) -> bool {
        false
    }

    fn mod_reset(&mut self) {
        self.reset();
    }

    fn mod_value(&self) -> f32 {
        self.level()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EnvelopeConfig, LfoConfig};

    #[test]
    fn test_lfo_unipolar_conversion() {
        let mut lfo = Lfo::new(48000.0, LfoConfig::default().with_rate(10.0));
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for _ in 0..10_000 {
            let value = lfo.mod_advance_unipolar();
            min = min.min(value);
            max = max.max(value);
        }
        assert!(min >= 0.0 && max <= 1.0);
        assert!(min < 0.1, "min {min} should be near 0");
        assert!(max > 0.9, "max {max} should be near 1");
    }

    #[test]
    fn test_envelope_is_unipolar_source() {
        let mut env = AdsrEnvelope::new(48000.0, EnvelopeConfig::adsr(0.0, 0.0, 1.0, 0.1));
        assert_eq!(env.polarity(), Polarity::Unipolar);
        assert_eq!(env.mod_advance_bipolar(), -1.0);
        env.gate_on(1.0);
        assert_eq!(env.mod_advance_bipolar(), 1.0);
        env.mod_reset();
        assert_eq!(env.mod_value(), 0.0);
    }

    #[test]
    fn test_convert_is_identity_for_matching_polarity() {
        for v in [-1.0, -0.2, 0.0, 0.4, 1.0] {
            assert_eq!(Polarity::Bipolar.convert(v, Polarity::Bipolar), v);
            assert_eq!(Polarity::Unipolar.convert(v, Polarity::Unipolar), v);
        }
    }
}
