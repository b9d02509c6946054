//! Time-based ADSR envelope generator.
//!
//! Each timed stage runs for exactly its configured duration, rounded to
//! whole samples, and interpolates between fixed endpoints:
//!
//! | Stage | From | To | Length |
//! |-------|------|----|--------|
//! | Attack | 0 | 1 | `attack_s` |
//! | Decay | 1 | sustain | `decay_s` |
//! | Sustain | sustain | sustain | until gate off |
//! | Release | value at gate off | 0 | `release_s` |
//!
//! Zero-length stages complete on the next sample. The normalized value
//! ([`AdsrEnvelope::value`]) is scaled by a velocity-dependent peak to give
//! [`AdsrEnvelope::level`].

use core::str::FromStr;

use crate::error::ParseError;

/// Interpolation shape for timed stages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EnvelopeCurve {
    /// Straight line between endpoints.
    #[default]
    Linear,
    /// RC-style: moves quickly at first, then eases into the endpoint.
    Exponential,
}

impl EnvelopeCurve {
    /// Map stage progress `t` in [0, 1] to interpolation weight in [0, 1].
    ///
    /// Both shapes are monotonic with `f(0) = 0` and `f(1) = 1`.
    #[inline]
    pub fn progress(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::Exponential => {
                let r = 1.0 - t;
                1.0 - r * r * r
            }
        }
    }

    /// Lowercase name as used in presets.
    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Exponential => "exponential",
        }
    }
}

impl FromStr for EnvelopeCurve {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("linear") || s.eq_ignore_ascii_case("lin") {
            Ok(Self::Linear)
        } else if s.eq_ignore_ascii_case("exponential") || s.eq_ignore_ascii_case("exp") {
            Ok(Self::Exponential)
        } else {
            Err(ParseError::new("envelope curve"))
        }
    }
}

/// ADSR envelope states
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeState {
    /// Inactive; output is zero.
    #[default]
    Idle,
    /// Rising from 0 to 1.
    Attack,
    /// Falling from 1 to the sustain level.
    Decay,
    /// Holding at the sustain level while the gate is held.
    Sustain,
    /// Falling to zero after gate off.
    Release,
}

/// ADSR timing and shape.
///
/// Times are in seconds and clamped to ≥ 0 before use; `sustain` and
/// `velocity_sensitivity` are clamped to [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EnvelopeConfig {
    /// Attack time in seconds.
    pub attack_s: f32,
    /// Decay time in seconds.
    pub decay_s: f32,
    /// Sustain level.
    pub sustain: f32,
    /// Release time in seconds.
    pub release_s: f32,
    /// Stage interpolation shape.
    pub curve: EnvelopeCurve,
    /// 0 ignores velocity, 1 scales the peak fully by velocity.
    pub velocity_sensitivity: f32,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self::adsr(0.01, 0.1, 0.7, 0.3)
    }
}

impl EnvelopeConfig {
    /// Linear envelope with full velocity sensitivity.
    pub const fn adsr(attack_s: f32, decay_s: f32, sustain: f32, release_s: f32) -> Self {
        Self {
            attack_s,
            decay_s,
            sustain,
            release_s,
            curve: EnvelopeCurve::Linear,
            velocity_sensitivity: 1.0,
        }
    }

    /// Set the interpolation curve.
    pub fn with_curve(mut self, curve: EnvelopeCurve) -> Self {
        self.curve = curve;
        self
    }

    /// Set velocity sensitivity.
    pub fn with_velocity_sensitivity(mut self, sensitivity: f32) -> Self {
        self.velocity_sensitivity = sensitivity;
        self
    }

    /// Peak level for a velocity: `1 − s + s·velocity`.
    pub fn peak_for_velocity(&self, velocity: f32) -> f32 {
        let s = self.velocity_sensitivity.clamp(0.0, 1.0);
        1.0 - s + s * velocity.clamp(0.0, 1.0)
    }
}

/// ADSR envelope generator.
///
/// # Example
///
/// ```rust
/// use polyvox_core::{AdsrEnvelope, EnvelopeConfig, EnvelopeState};
///
/// let mut env = AdsrEnvelope::new(48000.0, EnvelopeConfig::adsr(0.001, 0.01, 0.5, 0.02));
/// env.gate_on(1.0);
/// for _ in 0..48 {
///     env.advance();
/// }
/// assert_eq!(env.value(), 1.0);
/// assert_eq!(env.state(), EnvelopeState::Decay);
///
/// env.gate_off();
/// for _ in 0..960 {
///     env.advance();
/// }
/// assert!(!env.is_active());
/// ```
#[derive(Debug, Clone)]
pub struct AdsrEnvelope {
    config: EnvelopeConfig,
    sample_rate: f32,
    state: EnvelopeState,
    /// Normalized output, 0 to 1.
    value: f32,
    peak: f32,
    /// Samples spent in the current stage.
    elapsed: u32,
    /// Value at the start of the current stage.
    start: f32,
    attack_len: u32,
    decay_len: u32,
    release_len: u32,
    sustain: f32,
}

impl Default for AdsrEnvelope {
    fn default() -> Self {
        Self::new(48000.0, EnvelopeConfig::default())
    }
}

impl AdsrEnvelope {
    /// Create an idle envelope.
    pub fn new(sample_rate: f32, config: EnvelopeConfig) -> Self {
        let mut env = Self {
            config,
            sample_rate: sample_rate.max(1.0),
            state: EnvelopeState::Idle,
            value: 0.0,
            peak: 1.0,
            elapsed: 0,
            start: 0.0,
            attack_len: 0,
            decay_len: 0,
            release_len: 0,
            sustain: 0.0,
        };
        env.recalculate();
        env
    }

    /// Replace the configuration.
    ///
    /// A running stage keeps its elapsed time; its end point moves to the new
    /// length, so a shortened stage may finish on the next sample.
    pub fn update_config(&mut self, config: EnvelopeConfig) {
        self.config = config;
        self.recalculate();
        if self.state == EnvelopeState::Sustain {
            self.value = self.sustain;
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &EnvelopeConfig {
        &self.config
    }

    /// Update the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        self.recalculate();
    }

    /// Trigger (note on). Value restarts from 0.
    pub fn gate_on(&mut self, velocity: f32) {
        self.peak = self.config.peak_for_velocity(velocity);
        self.value = 0.0;
        self.enter(EnvelopeState::Attack);
    }

    /// Release (note off). Captures the current value as the release start.
    pub fn gate_off(&mut self) {
        if self.state != EnvelopeState::Idle && self.state != EnvelopeState::Release {
            self.enter(EnvelopeState::Release);
        }
    }

    /// Force to idle.
    pub fn reset(&mut self) {
        self.state = EnvelopeState::Idle;
        self.value = 0.0;
        self.elapsed = 0;
        self.start = 0.0;
    }

    /// Current state.
    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    /// Normalized value, 0 to 1, without advancing.
    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Output level (value × velocity peak) without advancing.
    #[inline]
    pub fn level(&self) -> f32 {
        self.value * self.peak
    }

    /// Velocity-scaled peak for the current note.
    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Whether the envelope is producing output (not idle).
    #[inline]
    pub fn is_active(&self) -> bool {
        self.state != EnvelopeState::Idle
    }

    /// Whether the gate has been released.
    #[inline]
    pub fn is_releasing(&self) -> bool {
        self.state == EnvelopeState::Release
    }

    /// Advance one sample and return the output level.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.advance_by(1)
    }

    /// Advance `samples` at once and return the output level.
    ///
    /// Crosses as many stage boundaries as the span covers; the result
    /// equals calling [`advance`](Self::advance) `samples` times.
    pub fn advance_by(&mut self, samples: usize) -> f32 {
        let mut remaining = samples.min(u32::MAX as usize) as u32;
        while remaining > 0 {
            let Some((len, end)) = self.stage_target() else {
                // Idle or sustain: nothing moves.
                break;
            };
            let step = remaining.min(len.saturating_sub(self.elapsed)).max(1);
            self.elapsed = self.elapsed.saturating_add(step);
            remaining -= step;

            if self.elapsed >= len {
                self.value = end;
                let next = match self.state {
                    EnvelopeState::Attack => EnvelopeState::Decay,
                    EnvelopeState::Decay => EnvelopeState::Sustain,
                    _ => EnvelopeState::Idle,
                };
                self.enter(next);
            } else {
                let t = self.elapsed as f32 / len as f32;
                let w = self.config.curve.progress(t);
                self.value = self.start + (end - self.start) * w;
            }
        }
        self.level()
    }

    /// Length and end value of the current timed stage.
    fn stage_target(&self) -> Option<(u32, f32)> {
        match self.state {
            EnvelopeState::Attack => Some((self.attack_len, 1.0)),
            EnvelopeState::Decay => Some((self.decay_len, self.sustain)),
            EnvelopeState::Release => Some((self.release_len, 0.0)),
            EnvelopeState::Idle | EnvelopeState::Sustain => None,
        }
    }

    fn enter(&mut self, state: EnvelopeState) {
        self.state = state;
        self.elapsed = 0;
        self.start = self.value;
        match state {
            EnvelopeState::Sustain => self.value = self.sustain,
            EnvelopeState::Idle => self.value = 0.0,
            _ => {}
        }
    }

    fn recalculate(&mut self) {
        let sr = self.sample_rate;
        let samples = |secs: f32| (secs.max(0.0) * sr + 0.5) as u32;
        self.attack_len = samples(self.config.attack_s);
        self.decay_len = samples(self.config.decay_s);
        self.release_len = samples(self.config.release_s);
        self.sustain = self.config.sustain.clamp(0.0, 1.0);
    }
}
