//! Low Frequency Oscillator for modulation routing.
//!
//! Free-running or tempo-synced, with a phase offset and a delay/fade-in
//! that shape the output after a trigger. Phase keeps advancing through the
//! delay, so the waveform enters at whatever point it has reached rather
//! than jumping when the fade starts.

use core::f32::consts::TAU;
use core::str::FromStr;

use libm::{exp2f, floorf, sinf};

use crate::error::ParseError;
use crate::random::XorShift32;
use crate::tempo::SyncDivision;

/// Highest free-running LFO rate in Hz.
pub const MAX_LFO_RATE_HZ: f32 = 100.0;

/// LFO waveform type
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LfoWaveform {
    /// Sine wave.
    #[default]
    Sine,
    /// Linear up/down ramp.
    Triangle,
    /// +1 for the first half-cycle, -1 for the second.
    Square,
    /// Rising ramp.
    Saw,
    /// Random stepped value, redrawn once per cycle.
    SampleAndHold,
}

impl LfoWaveform {
    /// All waveforms, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Sine,
        Self::Triangle,
        Self::Square,
        Self::Saw,
        Self::SampleAndHold,
    ];

    /// Lowercase name as used in presets.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Triangle => "triangle",
            Self::Square => "square",
            Self::Saw => "saw",
            Self::SampleAndHold => "sample_and_hold",
        }
    }
}

const ALIASES: [(&str, LfoWaveform); 11] = [
    ("sine", LfoWaveform::Sine),
    ("sin", LfoWaveform::Sine),
    ("triangle", LfoWaveform::Triangle),
    ("tri", LfoWaveform::Triangle),
    ("square", LfoWaveform::Square),
    ("saw", LfoWaveform::Saw),
    ("sawtooth", LfoWaveform::Saw),
    ("sample_and_hold", LfoWaveform::SampleAndHold),
    ("s&h", LfoWaveform::SampleAndHold),
    ("sh", LfoWaveform::SampleAndHold),
    ("random", LfoWaveform::SampleAndHold),
];

impl FromStr for LfoWaveform {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(s))
            .map(|&(_, waveform)| waveform)
            .ok_or(ParseError::new("LFO waveform"))
    }
}

/// LFO settings. Replaced as a whole via [`Lfo::update_config`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LfoConfig {
    /// Output shape.
    pub waveform: LfoWaveform,
    /// Free-running rate in Hz. Ignored while `sync` is set.
    pub rate_hz: f32,
    /// Tempo-sync division; `None` runs free.
    pub sync: Option<SyncDivision>,
    /// Start phase in cycles (0.0 to 1.0).
    pub phase_offset: f32,
    /// Seconds of silence after a trigger.
    pub delay_s: f32,
    /// Seconds to ramp from 0 to full depth once the delay has elapsed.
    pub fade_in_s: f32,
    /// Restart the phase on every trigger.
    pub retrigger: bool,
}

impl Default for LfoConfig {
    fn default() -> Self {
        Self {
            waveform: LfoWaveform::Sine,
            rate_hz: 1.0,
            sync: None,
            phase_offset: 0.0,
            delay_s: 0.0,
            fade_in_s: 0.0,
            retrigger: false,
        }
    }
}

impl LfoConfig {
    /// Set the waveform.
    pub fn with_waveform(mut self, waveform: LfoWaveform) -> Self {
        self.waveform = waveform;
        self
    }

    /// Set the free-running rate.
    pub fn with_rate(mut self, rate_hz: f32) -> Self {
        self.rate_hz = rate_hz;
        self
    }

    /// Lock the rate to a tempo division.
    pub fn with_sync(mut self, division: SyncDivision) -> Self {
        self.sync = Some(division);
        self
    }

    /// Set delay and fade-in times.
    pub fn with_delay(mut self, delay_s: f32, fade_in_s: f32) -> Self {
        self.delay_s = delay_s;
        self.fade_in_s = fade_in_s;
        self
    }

    /// Enable or disable phase restart on trigger.
    pub fn with_retrigger(mut self, retrigger: bool) -> Self {
        self.retrigger = retrigger;
        self
    }

    /// Effective rate in Hz at the given tempo.
    pub fn effective_rate(&self, bpm: f32) -> f32 {
        match self.sync {
            Some(division) => division.to_hz(bpm),
            None => self.rate_hz.clamp(0.0, MAX_LFO_RATE_HZ),
        }
    }
}

/// Low Frequency Oscillator.
///
/// Output is bipolar, -1.0 to 1.0. The delay/fade-in envelope restarts on
/// [`trigger`](Self::trigger); the phase restarts there only when
/// [`LfoConfig::retrigger`] is set.
///
/// # Example
///
/// ```rust
/// use polyvox_core::{Lfo, LfoConfig, SyncDivision};
///
/// let mut lfo = Lfo::new(48000.0, LfoConfig::default().with_sync(SyncDivision::QUARTER));
/// lfo.set_bpm(120.0);
/// assert!((lfo.rate_hz() - 0.5).abs() < 1e-6);
///
/// let v = lfo.advance();
/// assert!((-1.0..=1.0).contains(&v));
/// ```
#[derive(Debug, Clone)]
pub struct Lfo {
    config: LfoConfig,
    sample_rate: f32,
    bpm: f32,
    /// Rate multiplier in octaves, from modulation.
    rate_octaves: f32,
    /// Accumulated phase [0.0, 1.0), excluding `phase_offset`.
    phase: f32,
    phase_inc: f32,
    /// Samples since the last trigger, saturating.
    elapsed: u32,
    delay_samples: f32,
    fade_samples: f32,
    held: f32,
    rng: XorShift32,
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(48000.0, LfoConfig::default())
    }
}

impl Lfo {
    /// Create an LFO.
    pub fn new(sample_rate: f32, config: LfoConfig) -> Self {
        let mut rng = XorShift32::default();
        let held = rng.next_bipolar();
        let mut lfo = Self {
            config,
            sample_rate: sample_rate.max(1.0),
            bpm: 120.0,
            rate_octaves: 0.0,
            phase: 0.0,
            phase_inc: 0.0,
            // Free-running LFOs start past any delay.
            elapsed: u32::MAX,
            delay_samples: 0.0,
            fade_samples: 0.0,
            held,
            rng,
        };
        lfo.recalculate();
        lfo
    }

    /// Replace the configuration. Phase is kept.
    pub fn update_config(&mut self, config: LfoConfig) {
        self.config = config;
        self.recalculate();
    }

    /// Current configuration.
    pub fn config(&self) -> &LfoConfig {
        &self.config
    }

    /// Update the tempo used by synced divisions.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm;
        self.recalculate();
    }

    /// Update the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        self.recalculate();
    }

    /// Scale the rate by `2^octaves` (block-rate modulation).
    pub fn set_rate_modulation(&mut self, octaves: f32) {
        let octaves = octaves.clamp(-8.0, 8.0);
        if octaves != self.rate_octaves {
            self.rate_octaves = octaves;
            self.recalculate();
        }
    }

    /// Reseed the sample-and-hold generator.
    pub fn set_seed(&mut self, seed: u32) {
        self.rng.reseed(seed);
        self.held = self.rng.next_bipolar();
    }

    /// Effective rate in Hz, after sync and rate modulation.
    pub fn rate_hz(&self) -> f32 {
        self.phase_inc * self.sample_rate
    }

    /// Zero the phase. Configuration and the delay envelope are untouched.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Note-on: restart delay/fade-in, and the phase if retrigger is enabled.
    pub fn trigger(&mut self) {
        self.elapsed = 0;
        if self.config.retrigger {
            self.phase = 0.0;
        }
    }

    /// Adopt another LFO's phase and held value.
    ///
    /// Lets per-voice LFOs without retrigger stay in step with one shared
    /// free-running clock.
    pub fn follow(&mut self, clock: &Lfo) {
        self.phase = clock.phase;
        self.held = clock.held;
    }

    /// Phase including the configured offset, [0.0, 1.0).
    pub fn phase(&self) -> f32 {
        wrap_phase(self.phase + self.config.phase_offset)
    }

    /// Current output, including the delay/fade gain.
    #[inline]
    pub fn value(&self) -> f32 {
        self.shape() * self.depth_gain()
    }

    /// Return the current value and advance one sample.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        let out = self.value();
        self.step(1);
        out
    }

    /// Advance `samples` at once and return the new value.
    ///
    /// Sample-and-hold draws at most one new value per call, which is the
    /// block-rate behaviour the modulation router expects.
    pub fn advance_by(&mut self, samples: usize) -> f32 {
        self.step(samples as u32);
        self.value()
    }

    fn step(&mut self, samples: u32) {
        if samples == 0 {
            return;
        }
        let next = self.phase + self.phase_inc * samples as f32;
        let wrapped = next >= 1.0;
        self.phase = next - floorf(next);
        if wrapped && self.config.waveform == LfoWaveform::SampleAndHold {
            self.held = self.rng.next_bipolar();
        }
        self.elapsed = self.elapsed.saturating_add(samples);
    }

    fn shape(&self) -> f32 {
        let p = self.phase();
        match self.config.waveform {
            LfoWaveform::Sine => sinf(p * TAU),
            LfoWaveform::Triangle => {
                if p < 0.5 {
                    4.0 * p - 1.0
                } else {
                    3.0 - 4.0 * p
                }
            }
            LfoWaveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoWaveform::Saw => 2.0 * p - 1.0,
            LfoWaveform::SampleAndHold => self.held,
        }
    }

    fn depth_gain(&self) -> f32 {
        let t = self.elapsed as f32;
        if t < self.delay_samples {
            0.0
        } else if self.fade_samples > 0.0 {
            ((t - self.delay_samples) / self.fade_samples).min(1.0)
        } else {
            1.0
        }
    }

    fn recalculate(&mut self) {
        let rate = self.config.effective_rate(self.bpm) * exp2f(self.rate_octaves);
        self.phase_inc = (rate / self.sample_rate).clamp(0.0, 0.5);
        self.delay_samples = self.config.delay_s.max(0.0) * self.sample_rate;
        self.fade_samples = self.config.fade_in_s.max(0.0) * self.sample_rate;
    }
}

fn wrap_phase(p: f32) -> f32 {
    let p = p - floorf(p);
    if p >= 1.0 { 0.0 } else { p }
}
