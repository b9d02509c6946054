//! Unison stacking: detune, pan and gain per oscillator instance.
//!
//! The layout is a pure function of [`UnisonConfig`]. For `n` instances the
//! positions are spread evenly across [-1, 1]:
//!
//! ```text
//! t_i    = 2i / (n − 1) − 1
//! detune = t_i · spread / 2        (cents)
//! pan    = t_i · stereo_spread
//! gain   = 1 / √n, side instances × blend
//! ```
//!
//! Odd counts have an exact-center instance; even counts have two inner
//! instances straddling the center. Inner instances always keep full gain,
//! so `blend = 0` leaves only the center of the stack audible.

/// Maximum instances per oscillator.
pub const MAX_UNISON: usize = 8;
/// Minimum instances when unison is enabled.
pub const MIN_UNISON: usize = 2;

/// Unison settings.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct UnisonConfig {
    /// Stack instances; when false a single centered instance plays.
    pub enabled: bool,
    /// Instance count, clamped to 2–8 when enabled.
    pub voices: u8,
    /// Total detune spread in cents (outermost pair is ±spread/2).
    pub detune_cents: f32,
    /// Stereo width, 0.0 (mono) to 1.0 (hard left/right).
    pub stereo_spread: f32,
    /// Level of the side instances relative to the inner ones, 0.0 to 1.0.
    pub blend: f32,
}

impl Default for UnisonConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            voices: 4,
            detune_cents: 20.0,
            stereo_spread: 0.5,
            blend: 1.0,
        }
    }
}

impl UnisonConfig {
    /// Enabled stack with the given count and spread.
    pub fn stack(voices: u8, detune_cents: f32) -> Self {
        Self {
            enabled: true,
            voices,
            detune_cents,
            ..Self::default()
        }
    }

    /// Number of instances this config produces.
    pub fn instance_count(&self) -> usize {
        if self.enabled {
            usize::from(self.voices).clamp(MIN_UNISON, MAX_UNISON)
        } else {
            1
        }
    }
}

/// One instance of a unison stack.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UnisonVoice {
    /// Pitch offset in cents.
    pub detune_cents: f32,
    /// Pan position, -1.0 (left) to 1.0 (right).
    pub pan: f32,
    /// Linear gain.
    pub gain: f32,
}

/// Fixed-capacity list of instances produced by [`UnisonProcessor`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnisonLayout {
    voices: [UnisonVoice; MAX_UNISON],
    len: usize,
}

impl Default for UnisonLayout {
    fn default() -> Self {
        UnisonProcessor::layout(&UnisonConfig::default())
    }
}

impl UnisonLayout {
    /// Active instances.
    pub fn as_slice(&self) -> &[UnisonVoice] {
        &self.voices[..self.len]
    }

    /// Number of active instances.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Never true; a layout always holds at least one instance.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether any instance is panned off center.
    pub fn is_stereo(&self) -> bool {
        self.as_slice().iter().any(|v| v.pan != 0.0)
    }
}

/// Computes unison layouts.
///
/// # Example
///
/// ```rust
/// use polyvox_synth::{UnisonConfig, UnisonProcessor};
///
/// let layout = UnisonProcessor::layout(&UnisonConfig::stack(3, 20.0));
/// let detunes: Vec<f32> = layout.as_slice().iter().map(|v| v.detune_cents).collect();
/// assert_eq!(detunes, vec![-10.0, 0.0, 10.0]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct UnisonProcessor;

impl UnisonProcessor {
    /// Derive the per-instance (detune, pan, gain) triples.
    pub fn layout(config: &UnisonConfig) -> UnisonLayout {
        Self::layout_with_spread(config, config.detune_cents)
    }

    /// As [`layout`](Self::layout), with the detune spread overridden
    /// (used when the spread is modulated).
    pub fn layout_with_spread(config: &UnisonConfig, detune_cents: f32) -> UnisonLayout {
        let mut layout = UnisonLayout {
            voices: [UnisonVoice::default(); MAX_UNISON],
            len: config.instance_count(),
        };
        let n = layout.len;
        if n == 1 {
            layout.voices[0] = UnisonVoice {
                detune_cents: 0.0,
                pan: 0.0,
                gain: 1.0,
            };
            return layout;
        }

        let spread = if detune_cents.is_finite() {
            detune_cents.max(0.0)
        } else {
            0.0
        };
        let stereo = config.stereo_spread.clamp(0.0, 1.0);
        let blend = config.blend.clamp(0.0, 1.0);
        let base_gain = 1.0 / libm::sqrtf(n as f32);
        let last = (n - 1) as f32;

        for (i, voice) in layout.voices[..n].iter_mut().enumerate() {
            // Symmetric by construction: t_i = -t_(n-1-i).
            let t = 2.0 * i as f32 / last - 1.0;
            let inner = if n % 2 == 1 {
                i == n / 2
            } else {
                i == n / 2 || i + 1 == n / 2
            };
            *voice = UnisonVoice {
                detune_cents: t * spread * 0.5,
                pan: t * stereo,
                gain: if inner { base_gain } else { base_gain * blend },
            };
        }
        layout
    }
}
