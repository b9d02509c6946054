//! Analog-modeled state-variable filter with drive.
//!
//! # Topology
//!
//! Two integrators in the classic Chamberlin arrangement, evaluated once per
//! sample:
//!
//! ```text
//! hp = x − lp − k·bp
//! bp = bp + g·hp
//! lp = lp + g·bp
//! ```
//!
//! with `g = π·cutoff / sample_rate` and `k = 2·resonance`. The mode only
//! selects which value is read: lowpass reads `lp`, highpass reads `hp`,
//! bandpass reads `bp`. The recurrence itself never changes.
//!
//! `k` is a damping term, so lower `resonance` values ring longer; `0.707`
//! gives a maximally flat response.
//!
//! # Stability
//!
//! The update matrix has determinant `1 − g·k` and trace `2 − g² − g·k`.
//! Both poles stay inside the unit circle while `k > 0` and
//! `g < √(k² + 4) − k`. Cutoff is clamped to (0, Nyquist) first, then `g` is
//! held below that bound with a small margin, and resonance never reaches 0.
//!
//! # Drive
//!
//! A [`Saturator`] sits either before the integrators (driving the filter
//! input) or after the output tap.

use core::f32::consts::PI;

use libm::{exp2f, sqrtf};

use crate::math::{flush_denormal, semitones_to_ratio};
use crate::saturation::{SaturationType, Saturator};

/// Lowest cutoff the filter will run at, in Hz.
pub const MIN_CUTOFF_HZ: f32 = 5.0;
/// Lowest resonance (damping) value; `k = 0` would never decay.
pub const MIN_RESONANCE: f32 = 0.01;
/// Octaves of cutoff sweep per unit of router modulation.
pub const CUTOFF_MOD_OCTAVES: f32 = 5.0;
/// MIDI note where key tracking has no effect.
pub const KEYTRACK_REFERENCE_NOTE: f32 = 60.0;

/// Fraction of the stability bound `g` may reach.
const G_MARGIN: f32 = 0.98;

/// Which integrator output the filter reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FilterMode {
    /// Second integrator.
    #[default]
    Lowpass,
    /// Error term.
    Highpass,
    /// First integrator.
    Bandpass,
}

/// Where the drive stage sits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DrivePosition {
    /// Saturate the input before filtering.
    #[default]
    Pre,
    /// Saturate the selected output.
    Post,
}

/// Filter settings. Replaced as a whole via
/// [`StateVariableFilter::update_config`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FilterConfig {
    /// Output tap.
    pub mode: FilterMode,
    /// Base cutoff in Hz.
    pub cutoff_hz: f32,
    /// Damping, mapped to `k = 2·resonance`. 0.707 is flat.
    pub resonance: f32,
    /// Drive amount, 0.0 to 1.0.
    pub drive: f32,
    /// Saturation curve for the drive stage.
    pub saturation: SaturationType,
    /// Pre- or post-filter drive.
    pub drive_position: DrivePosition,
    /// Hz added at full filter envelope.
    pub env_amount_hz: f32,
    /// Hz added at full LFO swing.
    pub lfo_amount_hz: f32,
    /// 0 = fixed cutoff, 1 = cutoff follows the note pitch.
    pub keytrack: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            mode: FilterMode::Lowpass,
            cutoff_hz: 2000.0,
            resonance: 0.707,
            drive: 0.0,
            saturation: SaturationType::Soft,
            drive_position: DrivePosition::Pre,
            env_amount_hz: 0.0,
            lfo_amount_hz: 0.0,
            keytrack: 0.0,
        }
    }
}

impl FilterConfig {
    /// Cutoff in Hz for a block, before clamping.
    ///
    /// `base + keytrack + env_amount·env + lfo_amount·lfo`, then scaled by
    /// the router's cutoff contribution in units of [`CUTOFF_MOD_OCTAVES`].
    pub fn modulated_cutoff(&self, m: &FilterModulation) -> f32 {
        let keytrack = self.keytrack.clamp(0.0, 1.0);
        let key_ratio = semitones_to_ratio(m.note - KEYTRACK_REFERENCE_NOTE);
        let key_term = self.cutoff_hz * (key_ratio - 1.0) * keytrack;
        let linear = self.cutoff_hz
            + key_term
            + self.env_amount_hz * m.envelope
            + self.lfo_amount_hz * m.lfo;
        linear * exp2f(m.cutoff * CUTOFF_MOD_OCTAVES)
    }
}

/// Block-rate modulation inputs for one filter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterModulation {
    /// MIDI note (fractional) for key tracking.
    pub note: f32,
    /// Filter envelope level, 0 to 1.
    pub envelope: f32,
    /// LFO value, -1 to 1.
    pub lfo: f32,
    /// Router cutoff contribution.
    pub cutoff: f32,
    /// Router resonance offset.
    pub resonance: f32,
    /// Router drive offset.
    pub drive: f32,
}

impl Default for FilterModulation {
    fn default() -> Self {
        Self {
            note: KEYTRACK_REFERENCE_NOTE,
            envelope: 0.0,
            lfo: 0.0,
            cutoff: 0.0,
            resonance: 0.0,
            drive: 0.0,
        }
    }
}

/// Two-integrator state-variable filter.
///
/// ## Parameters
///
/// - `cutoff`: Hz, clamped to [`MIN_CUTOFF_HZ`] up to just below Nyquist
/// - `resonance`: damping, [`MIN_RESONANCE`] to 1.0 (default 0.707)
/// - `drive`: 0.0 to 1.0 (default 0.0)
///
/// # Example
///
/// ```rust
/// use polyvox_core::{FilterConfig, FilterMode, StateVariableFilter};
///
/// let mut filter = StateVariableFilter::new(48000.0, FilterConfig {
///     mode: FilterMode::Lowpass,
///     cutoff_hz: 800.0,
///     ..FilterConfig::default()
/// });
///
/// let mut y = 0.0;
/// for _ in 0..4800 {
///     y = filter.process_sample(0.5);
/// }
/// assert!((y - 0.5).abs() < 0.01);
/// ```
#[derive(Debug, Clone)]
pub struct StateVariableFilter {
    sample_rate: f32,
    config: FilterConfig,
    saturator: Saturator,
    cutoff: f32,
    resonance: f32,
    g: f32,
    k: f32,
    lp: f32,
    bp: f32,
}

impl Default for StateVariableFilter {
    fn default() -> Self {
        Self::new(48000.0, FilterConfig::default())
    }
}

impl StateVariableFilter {
    /// Create a filter with zeroed state.
    pub fn new(sample_rate: f32, config: FilterConfig) -> Self {
        let mut filter = Self {
            sample_rate: sample_rate.max(1.0),
            config,
            saturator: Saturator::new(config.saturation, config.drive),
            cutoff: config.cutoff_hz,
            resonance: config.resonance,
            g: 0.0,
            k: 0.0,
            lp: 0.0,
            bp: 0.0,
        };
        filter.apply(config.cutoff_hz, config.resonance, config.drive);
        filter
    }

    /// Replace the configuration. Integrator state is kept.
    pub fn update_config(&mut self, config: FilterConfig) {
        self.config = config;
        self.saturator.set_kind(config.saturation);
        self.apply(config.cutoff_hz, config.resonance, config.drive);
    }

    /// Current configuration.
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Update the sample rate and recompute coefficients.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        self.apply(self.cutoff, self.resonance, self.saturator.drive());
        #[cfg(feature = "tracing")]
        tracing::trace!(
            sample_rate = self.sample_rate,
            cutoff = self.cutoff,
            "svf sample rate changed"
        );
    }

    /// Recompute cutoff, resonance and drive for the next block.
    pub fn set_modulation(&mut self, m: &FilterModulation) {
        let cutoff = self.config.modulated_cutoff(m);
        self.apply(
            cutoff,
            self.config.resonance + m.resonance,
            self.config.drive + m.drive,
        );
    }

    /// Set the effective cutoff directly (clamped).
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.apply(cutoff_hz, self.resonance, self.saturator.drive());
    }

    /// Effective cutoff in Hz after clamping.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Effective resonance after clamping.
    pub fn resonance(&self) -> f32 {
        self.resonance
    }

    /// Integrator coefficient `g` in use.
    pub fn g(&self) -> f32 {
        self.g
    }

    /// Damping coefficient `k` in use.
    pub fn k(&self) -> f32 {
        self.k
    }

    /// Process one sample through the configured mode.
    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let x = match self.config.drive_position {
            DrivePosition::Pre => self.saturator.process(input),
            DrivePosition::Post => input,
        };
        let (lp, hp, bp) = self.tick(x);
        let y = match self.config.mode {
            FilterMode::Lowpass => lp,
            FilterMode::Highpass => hp,
            FilterMode::Bandpass => bp,
        };
        match self.config.drive_position {
            DrivePosition::Pre => y,
            DrivePosition::Post => self.saturator.process(y),
        }
    }

    /// Process one sample and return `(lowpass, highpass, bandpass)`.
    ///
    /// Bypasses the drive stage.
    #[inline]
    pub fn process_all(&mut self, input: f32) -> (f32, f32, f32) {
        self.tick(input)
    }

    /// Zero both integrators.
    pub fn reset(&mut self) {
        self.lp = 0.0;
        self.bp = 0.0;
    }

    #[inline]
    fn tick(&mut self, x: f32) -> (f32, f32, f32) {
        let hp = x - self.lp - self.k * self.bp;
        self.bp = flush_denormal(self.bp + self.g * hp);
        self.lp = flush_denormal(self.lp + self.g * self.bp);
        (self.lp, hp, self.bp)
    }

    fn apply(&mut self, cutoff_hz: f32, resonance: f32, drive: f32) {
        let nyquist = self.sample_rate * 0.5;
        let cutoff = if cutoff_hz.is_finite() {
            cutoff_hz.clamp(MIN_CUTOFF_HZ.min(nyquist * 0.5), nyquist * 0.999)
        } else {
            nyquist * 0.999
        };
        let resonance = if resonance.is_finite() {
            resonance.clamp(MIN_RESONANCE, 1.0)
        } else {
            MIN_RESONANCE
        };
        let k = 2.0 * resonance;
        let bound = sqrtf(k * k + 4.0) - k;
        self.g = (PI * cutoff / self.sample_rate).min(bound * G_MARGIN);
        self.k = k;
        self.cutoff = cutoff;
        self.resonance = resonance;
        self.saturator.set_drive(drive);
    }
}
