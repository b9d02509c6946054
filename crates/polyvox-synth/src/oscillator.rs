//! Audio-rate oscillators with anti-aliasing.
//!
//! Band-limited oscillators using PolyBLEP (Polynomial Band-Limited Step)
//! to suppress aliasing at waveform discontinuities.

use core::f32::consts::PI;
use core::str::FromStr;

use libm::{exp2f, floorf, sinf};
use polyvox_core::{ParseError, XorShift32};

/// Narrowest/widest pulse duty cycle.
pub const PULSE_WIDTH_RANGE: (f32, f32) = (0.01, 0.99);

/// Euclidean remainder for f32, compatible with no_std.
#[inline]
fn rem_euclid_f32(a: f32, b: f32) -> f32 {
    let r = a - b * floorf(a / b);
    if r < 0.0 { r + b } else { r }
}

/// Oscillator waveform types
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OscillatorWaveform {
    /// Sine waveform, pure fundamental.
    #[default]
    Sine,
    /// Triangle waveform, odd harmonics, softer than saw.
    Triangle,
    /// Sawtooth waveform, all harmonics.
    Saw,
    /// Square waveform (50% duty cycle).
    Square,
    /// Pulse with variable duty cycle (see [`OscillatorConfig::pulse_width`]).
    Pulse,
    /// White noise.
    Noise,
}

impl OscillatorWaveform {
    /// All waveforms, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Sine,
        Self::Triangle,
        Self::Saw,
        Self::Square,
        Self::Pulse,
        Self::Noise,
    ];

    /// Lowercase name as used in presets.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Triangle => "triangle",
            Self::Saw => "saw",
            Self::Square => "square",
            Self::Pulse => "pulse",
            Self::Noise => "noise",
        }
    }
}

const ALIASES: [(&str, OscillatorWaveform); 10] = [
    ("sine", OscillatorWaveform::Sine),
    ("sin", OscillatorWaveform::Sine),
    ("triangle", OscillatorWaveform::Triangle),
    ("tri", OscillatorWaveform::Triangle),
    ("saw", OscillatorWaveform::Saw),
    ("sawtooth", OscillatorWaveform::Saw),
    ("square", OscillatorWaveform::Square),
    ("pulse", OscillatorWaveform::Pulse),
    ("noise", OscillatorWaveform::Noise),
    ("white", OscillatorWaveform::Noise),
];

impl FromStr for OscillatorWaveform {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(s))
            .map(|&(_, waveform)| waveform)
            .ok_or(ParseError::new("oscillator waveform"))
    }
}

/// Per-oscillator patch settings.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OscillatorConfig {
    /// Waveform.
    pub waveform: OscillatorWaveform,
    /// Octave offset, -4 to 4.
    pub octave: i8,
    /// Semitone offset, -12 to 12.
    pub semitone: i8,
    /// Fine tune in cents, -100 to 100.
    pub fine_cents: f32,
    /// Output level, 0.0 to 1.0.
    pub level: f32,
    /// Duty cycle for [`OscillatorWaveform::Pulse`].
    pub pulse_width: f32,
}

impl Default for OscillatorConfig {
    fn default() -> Self {
        Self {
            waveform: OscillatorWaveform::Sine,
            octave: 0,
            semitone: 0,
            fine_cents: 0.0,
            level: 1.0,
            pulse_width: 0.5,
        }
    }
}

impl OscillatorConfig {
    /// Config with the given waveform and default tuning.
    pub fn with_waveform(waveform: OscillatorWaveform) -> Self {
        Self {
            waveform,
            ..Self::default()
        }
    }

    /// Total offset from the played note in semitones.
    pub fn pitch_offset_semitones(&self) -> f32 {
        f32::from(self.octave.clamp(-4, 4)) * 12.0
            + f32::from(self.semitone.clamp(-12, 12))
            + self.fine_cents.clamp(-100.0, 100.0) / 100.0
    }

    /// Frequency ratio for [`pitch_offset_semitones`](Self::pitch_offset_semitones).
    pub fn pitch_ratio(&self) -> f32 {
        exp2f(self.pitch_offset_semitones() / 12.0)
    }
}

/// Audio-rate oscillator with PolyBLEP anti-aliasing.
///
/// # Example
///
/// ```rust
/// use polyvox_synth::{Oscillator, OscillatorWaveform};
///
/// let mut osc = Oscillator::new(48000.0);
/// osc.set_frequency(440.0);
/// osc.set_waveform(OscillatorWaveform::Saw);
///
/// let sample = osc.advance();
/// assert!(sample.abs() <= 1.1);
/// ```
#[derive(Debug, Clone)]
pub struct Oscillator {
    /// Current phase position [0.0, 1.0)
    phase: f32,
    /// Phase increment per sample
    phase_inc: f32,
    sample_rate: f32,
    frequency: f32,
    waveform: OscillatorWaveform,
    pulse_width: f32,
    noise: XorShift32,
    /// Leaky integrator state for triangle
    integrator: f32,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl Oscillator {
    /// Create a new oscillator with the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        let sample_rate = sample_rate.max(1.0);
        Self {
            phase: 0.0,
            phase_inc: 440.0 / sample_rate,
            sample_rate,
            frequency: 440.0,
            waveform: OscillatorWaveform::Sine,
            pulse_width: 0.5,
            noise: XorShift32::default(),
            integrator: naive_triangle(0.0),
        }
    }

    /// Set frequency in Hz, clamped to [0, Nyquist).
    #[inline]
    pub fn set_frequency(&mut self, freq_hz: f32) {
        let nyquist = self.sample_rate * 0.5;
        self.frequency = if freq_hz.is_finite() {
            freq_hz.clamp(0.0, nyquist * 0.999)
        } else {
            0.0
        };
        self.phase_inc = self.frequency / self.sample_rate;
    }

    /// Current frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Set waveform type.
    pub fn set_waveform(&mut self, waveform: OscillatorWaveform) {
        self.waveform = waveform;
    }

    /// Current waveform.
    pub fn waveform(&self) -> OscillatorWaveform {
        self.waveform
    }

    /// Set the pulse duty cycle (clamped to [`PULSE_WIDTH_RANGE`]).
    #[inline]
    pub fn set_pulse_width(&mut self, width: f32) {
        self.pulse_width = width.clamp(PULSE_WIDTH_RANGE.0, PULSE_WIDTH_RANGE.1);
    }

    /// Reseed the noise generator.
    pub fn set_noise_seed(&mut self, seed: u32) {
        self.noise.reseed(seed);
    }

    /// Set sample rate and recalculate phase increment.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        self.set_frequency(self.frequency);
    }

    /// Restart at the given phase (0.0 to 1.0).
    pub fn reset(&mut self, phase: f32) {
        self.phase = rem_euclid_f32(phase, 1.0);
        self.integrator = naive_triangle(self.phase);
    }

    /// Current phase.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Generate the next sample.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        let output = self.generate(self.phase, self.phase_inc);
        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        output
    }

    /// Each waveform uses a different anti-aliasing strategy:
    /// - **Sine**: single harmonic, `sinf` directly.
    /// - **Saw**: naive ramp with PolyBLEP at the wrap.
    /// - **Square/Pulse**: PolyBLEP at both edges.
    /// - **Triangle**: leaky integration of a PolyBLEP square, since the
    ///   triangle's discontinuity is in the slope rather than the value.
    /// - **Noise**: xorshift, broadband by construction.
    #[inline]
    fn generate(&mut self, phase: f32, dt: f32) -> f32 {
        match self.waveform {
            OscillatorWaveform::Sine => sinf(phase * 2.0 * PI),
            OscillatorWaveform::Saw => 2.0 * phase - 1.0 - poly_blep(phase, dt),
            OscillatorWaveform::Square => pulse(phase, 0.5, dt),
            OscillatorWaveform::Pulse => pulse(phase, self.pulse_width, dt),
            OscillatorWaveform::Triangle => {
                let square = pulse(phase, 0.5, dt);
                // Leak tracks frequency so DC stays bounded across the range.
                let leak = 1.0 - dt.min(0.1);
                self.integrator = leak * self.integrator + square * dt * 4.0;
                self.integrator
            }
            OscillatorWaveform::Noise => self.noise.next_bipolar(),
        }
    }
}

/// Triangle value at `phase`, used to seed the integrator without a DC step.
fn naive_triangle(phase: f32) -> f32 {
    if phase < 0.5 {
        4.0 * phase - 1.0
    } else {
        3.0 - 4.0 * phase
    }
}

#[inline]
fn pulse(phase: f32, duty: f32, dt: f32) -> f32 {
    let naive = if phase < duty { 1.0 } else { -1.0 };
    let rising = poly_blep(phase, dt);
    let falling = poly_blep(rem_euclid_f32(phase - duty + 1.0, 1.0), dt);
    naive + rising - falling
}

/// 4th-order PolyBLEP correction.
///
/// A C²-continuous degree-4 piecewise polynomial fitted to the ideal BLEP
/// residual, spanning two samples either side of the discontinuity
/// (roughly 50 dB of alias suppression).
///
/// Reference: Välimäki et al., "Antialiasing Oscillators", IEEE Signal
/// Processing Magazine, 2010.
#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    //   p₁(n) = A₄·n⁴ + A₃·n³ + A₂·n² + A₀   for n ∈ [0,1)
    //   p₂(n) = C·(2-n)⁴                      for n ∈ [1,2)
    const A4: f32 = -43.0 / 48.0;
    const A3: f32 = 7.0 / 6.0;
    const A2: f32 = 0.5;
    const A0: f32 = -1.0;
    const C: f32 = -11.0 / 48.0;

    if dt <= 0.0 {
        return 0.0;
    }
    let segment = |n: f32| {
        if n < 1.0 {
            let n2 = n * n;
            A4 * n2 * n2 + A3 * n2 * n + A2 * n2 + A0
        } else {
            let u = 2.0 - n;
            let u2 = u * u;
            C * u2 * u2
        }
    };

    let dt2 = 2.0 * dt;
    if t < dt2 {
        segment(t / dt)
    } else if t > 1.0 - dt2 {
        -segment((1.0 - t) / dt)
    } else {
        0.0
    }
}
