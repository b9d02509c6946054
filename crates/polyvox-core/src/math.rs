//! Mathematical utility functions for synthesis DSP.
//!
//! All functions are allocation-free and suitable for `no_std`.
//!
//! # Pitch Conversions
//!
//! - [`midi_to_freq`] / [`freq_to_midi`] - MIDI note number ↔ Hz (A4 = 440 Hz)
//! - [`cents_to_ratio`] / [`semitones_to_ratio`] - Interval to frequency ratio
//!
//! # Level Conversions
//!
//! - [`db_to_linear`] / [`linear_to_db`]
//!
//! # Waveshaping
//!
//! | Function | Character | Harmonics |
//! |----------|-----------|-----------|
//! | [`soft_clip`] | Smooth, warm | Odd |
//! | [`hard_clip`] | Harsh, buzzy | Odd (many) |
//! | [`tube_clip`] | Asymmetric, tube-like | Even + Odd |
//! | [`tape_clip`] | Transparent below 0.5, compressed above | Odd |

use libm::{expf, log2f, logf, powf, tanhf};

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use polyvox_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels.
///
/// Input is floored at 1e-10 so silence maps to -200 dB instead of -inf.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Convert a MIDI note number to frequency in Hz.
///
/// Uses standard tuning: A4 (note 69) = 440 Hz. Accepts fractional notes so
/// pitch bend and glide can be expressed in note space.
///
/// ```rust
/// use polyvox_core::midi_to_freq;
///
/// assert!((midi_to_freq(69.0) - 440.0).abs() < 0.01);
/// assert!((midi_to_freq(60.0) - 261.63).abs() < 0.01);
/// ```
#[inline]
pub fn midi_to_freq(note: f32) -> f32 {
    440.0 * powf(2.0, (note - 69.0) / 12.0)
}

/// Convert frequency in Hz to a (fractional) MIDI note number.
#[inline]
pub fn freq_to_midi(freq: f32) -> f32 {
    69.0 + 12.0 * log2f(freq.max(1e-6) / 440.0)
}

/// Convert cents to frequency ratio. 100 cents = 1 semitone.
#[inline]
pub fn cents_to_ratio(cents: f32) -> f32 {
    powf(2.0, cents / 1200.0)
}

/// Convert semitones to frequency ratio.
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    powf(2.0, semitones / 12.0)
}

/// Soft clip using hyperbolic tangent.
///
/// Approaches ±1 asymptotically.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    tanhf(x)
}

/// Hard clip to the ±1 range.
#[inline]
pub fn hard_clip(x: f32) -> f32 {
    x.clamp(-1.0, 1.0)
}

/// Asymmetric tanh saturation.
///
/// Positive excursions saturate gently, negative excursions are driven
/// harder and reach a lower ceiling. The asymmetry adds even harmonics.
#[inline]
pub fn tube_clip(x: f32) -> f32 {
    if x >= 0.0 {
        tanhf(x * 0.9) / 0.9 * 0.95
    } else {
        tanhf(x * 1.4) / 1.4 * 0.8
    }
}

/// Tape-style saturation.
///
/// Linear below 0.5 magnitude, compressed above, then hard-clamped to ±1.
/// The curve is continuous at the knee.
#[inline]
pub fn tape_clip(x: f32) -> f32 {
    const KNEE: f32 = 0.5;
    let magnitude = x.abs();
    let shaped = if magnitude <= KNEE {
        magnitude
    } else {
        let excess = magnitude - KNEE;
        KNEE + excess / (1.0 + excess * 2.0)
    };
    (shaped * x.signum()).clamp(-1.0, 1.0)
}

/// Linear interpolation between `a` (t = 0) and `b` (t = 1).
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Convert seconds to samples.
#[inline]
pub fn seconds_to_samples(seconds: f32, sample_rate: f32) -> f32 {
    seconds * sample_rate
}

/// Flush subnormal (denormalized) floats to zero.
///
/// Subnormal floats cause severe CPU slowdowns on most architectures.
/// Use this on integrator and feedback state that can decay toward zero.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Constant-power pan law.
///
/// `pan` is in [-1, 1] (left to right). Returns `(left_gain, right_gain)`,
/// both `√½` at center.
#[inline]
pub fn constant_power_pan(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * core::f32::consts::FRAC_PI_4;
    let (sin_a, cos_a) = libm::sincosf(angle);
    (cos_a, sin_a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_linear_roundtrip() {
        let original = 0.5;
        let back = db_to_linear(linear_to_db(original));
        assert!((original - back).abs() < 1e-5);
    }

    #[test]
    fn test_midi_to_freq_reference_points() {
        assert!((midi_to_freq(69.0) - 440.0).abs() < 0.01);
        assert!((midi_to_freq(81.0) - 880.0).abs() < 0.01);
        assert!((freq_to_midi(440.0) - 69.0).abs() < 0.001);
    }

    #[test]
    fn test_cents_to_ratio() {
        assert!((cents_to_ratio(1200.0) - 2.0).abs() < 0.001);
        assert!((cents_to_ratio(0.0) - 1.0).abs() < 1e-6);
        assert!((semitones_to_ratio(-12.0) - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_clippers_bounded() {
        for i in -100..=100 {
            let x = i as f32 * 0.1;
            assert!(soft_clip(x).abs() <= 1.0);
            assert!(hard_clip(x).abs() <= 1.0);
            assert!(tube_clip(x).abs() <= 1.0);
            assert!(tape_clip(x).abs() <= 1.0);
        }
    }

    #[test]
    fn test_tape_linear_below_knee() {
        assert_eq!(tape_clip(0.3), 0.3);
        assert_eq!(tape_clip(-0.5), -0.5);
        assert!(tape_clip(0.9) < 0.9);
        assert_eq!(tape_clip(50.0), 1.0);
    }

    #[test]
    fn test_tube_is_asymmetric() {
        assert!((tube_clip(2.0) + tube_clip(-2.0)).abs() > 0.05);
    }

    #[test]
    fn test_constant_power_pan() {
        let (l, r) = constant_power_pan(0.0);
        assert!((l - r).abs() < 1e-6);
        assert!((l * l + r * r - 1.0).abs() < 1e-5);

        let (l, r) = constant_power_pan(-1.0);
        assert!((l - 1.0).abs() < 1e-6);
        assert!(r.abs() < 1e-6);
    }
}
