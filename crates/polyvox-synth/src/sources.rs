//! Modulation sources readable by the router.
//!
//! Sources come in two groups. Per-voice sources (LFOs, envelopes,
//! velocity, key tracking) live on each [`Voice`](crate::Voice). Global
//! sources (MIDI CCs, pitch bend, aftertouch, the random generator and the
//! step sequencer) live on the engine and are shared by every voice. Both
//! are gathered into a [`SourceValues`] snapshot once per block before the
//! router runs.

use core::str::FromStr;

use libm::floorf;
use polyvox_core::{
    ModulationSource, ParseError, Polarity, XorShift32, svf::KEYTRACK_REFERENCE_NOTE,
};

/// Number of MIDI continuous controllers.
pub const CC_COUNT: usize = 128;
/// Controller number of the mod wheel.
pub const MOD_WHEEL_CC: u8 = 1;
/// Maximum steps in the step sequencer.
pub const MAX_STEPS: usize = 16;

/// Modulation source identifiers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ModSource {
    /// LFO 1
    #[default]
    Lfo1,
    /// LFO 2
    Lfo2,
    /// Amplitude envelope
    AmpEnvelope,
    /// Filter envelope
    FilterEnvelope,
    /// Modulation envelope
    ModEnvelope,
    /// Note-on velocity
    Velocity,
    /// Note number, centered at middle C
    KeyTrack,
    /// Channel pressure
    Aftertouch,
    /// Mod wheel (CC1)
    ModWheel,
    /// Pitch bend wheel
    PitchBend,
    /// Any MIDI continuous controller
    MidiCc(u8),
    /// Seeded random generator
    Random,
    /// Step sequencer
    StepSequencer,
    /// Always 1.0
    Constant,
}

impl ModSource {
    /// Sources without a payload, in display order.
    pub const FIXED: [Self; 13] = [
        Self::Lfo1,
        Self::Lfo2,
        Self::AmpEnvelope,
        Self::FilterEnvelope,
        Self::ModEnvelope,
        Self::Velocity,
        Self::KeyTrack,
        Self::Aftertouch,
        Self::ModWheel,
        Self::PitchBend,
        Self::Random,
        Self::StepSequencer,
        Self::Constant,
    ];

    /// Native value range of this source.
    pub fn polarity(self) -> Polarity {
        match self {
            Self::Lfo1
            | Self::Lfo2
            | Self::KeyTrack
            | Self::PitchBend
            | Self::Random
            | Self::StepSequencer => Polarity::Bipolar,
            Self::AmpEnvelope
            | Self::FilterEnvelope
            | Self::ModEnvelope
            | Self::Velocity
            | Self::Aftertouch
            | Self::ModWheel
            | Self::MidiCc(_)
            | Self::Constant => Polarity::Unipolar,
        }
    }

    /// Identifier used in preset files. `MidiCc` is written as `cc<n>`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Lfo1 => "lfo1",
            Self::Lfo2 => "lfo2",
            Self::AmpEnvelope => "amp_envelope",
            Self::FilterEnvelope => "filter_envelope",
            Self::ModEnvelope => "mod_envelope",
            Self::Velocity => "velocity",
            Self::KeyTrack => "key_track",
            Self::Aftertouch => "aftertouch",
            Self::ModWheel => "mod_wheel",
            Self::PitchBend => "pitch_bend",
            Self::MidiCc(_) => "cc",
            Self::Random => "random",
            Self::StepSequencer => "step_sequencer",
            Self::Constant => "constant",
        }
    }
}

impl core::fmt::Display for ModSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MidiCc(cc) => write!(f, "cc{cc}"),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for ModSource {
    type Err = ParseError;

    /// Accepts the names from [`ModSource::name`] plus `cc<n>` / `cc:<n>`
    /// for controllers 0–127.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(found) = Self::FIXED
            .iter()
            .find(|source| source.name().eq_ignore_ascii_case(s))
        {
            return Ok(*found);
        }
        let prefix = s.get(..2).unwrap_or("");
        if prefix.eq_ignore_ascii_case("cc") {
            let number = s[2..].trim_start_matches(':');
            if let Ok(cc) = number.parse::<u8>() {
                if usize::from(cc) < CC_COUNT {
                    return Ok(Self::MidiCc(cc));
                }
            }
        }
        Err(ParseError::new("modulation source"))
    }
}

/// Normalized values for all 128 MIDI controllers.
#[derive(Clone, Debug, PartialEq)]
pub struct CcTable([f32; CC_COUNT]);

impl Default for CcTable {
    fn default() -> Self {
        Self([0.0; CC_COUNT])
    }
}

impl CcTable {
    /// Set controller `cc` to `value`, clamped to [0, 1].
    ///
    /// Controllers above 127 are ignored.
    pub fn set(&mut self, cc: u8, value: f32) {
        if let Some(slot) = self.0.get_mut(usize::from(cc)) {
            *slot = if value.is_finite() {
                value.clamp(0.0, 1.0)
            } else {
                0.0
            };
        }
    }

    /// Set controller `cc` from a 7-bit MIDI value.
    pub fn set_midi(&mut self, cc: u8, value: u8) {
        self.set(cc, f32::from(value.min(127)) / 127.0);
    }

    /// Current value of controller `cc`; 0.0 for out-of-range numbers.
    pub fn get(&self, cc: u8) -> f32 {
        self.0.get(usize::from(cc)).copied().unwrap_or(0.0)
    }

    /// Return every controller to 0.
    pub fn clear(&mut self) {
        self.0 = [0.0; CC_COUNT];
    }
}

/// Key tracking value for a (fractional) MIDI note.
///
/// 0.0 at middle C, ±1.0 at 64 semitones away.
#[inline]
pub fn key_track(note: f32) -> f32 {
    ((note - KEYTRACK_REFERENCE_NOTE) / 64.0).clamp(-1.0, 1.0)
}

/// Block-rate snapshot of every source, for one voice.
#[derive(Clone, Copy, Debug)]
pub struct SourceValues<'a> {
    /// LFO 1, -1 to 1.
    pub lfo1: f32,
    /// LFO 2, -1 to 1.
    pub lfo2: f32,
    /// Amplitude envelope, 0 to 1.
    pub amp_envelope: f32,
    /// Filter envelope, 0 to 1.
    pub filter_envelope: f32,
    /// Modulation envelope, 0 to 1.
    pub mod_envelope: f32,
    /// Velocity, 0 to 1.
    pub velocity: f32,
    /// Key tracking, -1 to 1.
    pub key_track: f32,
    /// Aftertouch, 0 to 1.
    pub aftertouch: f32,
    /// Pitch bend, -1 to 1.
    pub pitch_bend: f32,
    /// Random generator, -1 to 1.
    pub random: f32,
    /// Step sequencer, -1 to 1.
    pub step_sequencer: f32,
    /// Controller table (mod wheel and `MidiCc`).
    pub cc: &'a CcTable,
}

impl<'a> SourceValues<'a> {
    /// Snapshot with every source at rest.
    pub fn new(cc: &'a CcTable) -> Self {
        Self {
            lfo1: 0.0,
            lfo2: 0.0,
            amp_envelope: 0.0,
            filter_envelope: 0.0,
            mod_envelope: 0.0,
            velocity: 0.0,
            key_track: 0.0,
            aftertouch: 0.0,
            pitch_bend: 0.0,
            random: 0.0,
            step_sequencer: 0.0,
            cc,
        }
    }

    /// Value of `source` in its native polarity.
    #[inline]
    pub fn get(&self, source: ModSource) -> f32 {
        match source {
            ModSource::Lfo1 => self.lfo1,
            ModSource::Lfo2 => self.lfo2,
            ModSource::AmpEnvelope => self.amp_envelope,
            ModSource::FilterEnvelope => self.filter_envelope,
            ModSource::ModEnvelope => self.mod_envelope,
            ModSource::Velocity => self.velocity,
            ModSource::KeyTrack => self.key_track,
            ModSource::Aftertouch => self.aftertouch,
            ModSource::ModWheel => self.cc.get(MOD_WHEEL_CC),
            ModSource::PitchBend => self.pitch_bend,
            ModSource::MidiCc(cc) => self.cc.get(cc),
            ModSource::Random => self.random,
            ModSource::StepSequencer => self.step_sequencer,
            ModSource::Constant => 1.0,
        }
    }
}

/// Random source settings.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RandomConfig {
    /// New values per second.
    pub rate_hz: f32,
    /// Glide linearly between values instead of stepping.
    pub smooth: bool,
    /// PRNG seed; the same seed always yields the same sequence.
    pub seed: u32,
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            rate_hz: 4.0,
            smooth: false,
            seed: 0x5EED_1234,
        }
    }
}

/// Stepped or smoothed random modulation, -1.0 to 1.0.
///
/// # Example
///
/// ```rust
/// use polyvox_synth::{RandomConfig, RandomSource};
///
/// let config = RandomConfig { rate_hz: 10.0, ..RandomConfig::default() };
/// let mut a = RandomSource::new(48000.0, config);
/// let mut b = RandomSource::new(48000.0, config);
/// for _ in 0..100 {
///     assert_eq!(a.advance_by(256), b.advance_by(256));
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RandomSource {
    config: RandomConfig,
    sample_rate: f32,
    rng: XorShift32,
    phase: f32,
    phase_inc: f32,
    previous: f32,
    target: f32,
}

impl RandomSource {
    /// Create a random source. The first value is drawn immediately.
    pub fn new(sample_rate: f32, config: RandomConfig) -> Self {
        let mut source = Self {
            config,
            sample_rate: sample_rate.max(1.0),
            rng: XorShift32::new(config.seed),
            phase: 0.0,
            phase_inc: 0.0,
            previous: 0.0,
            target: 0.0,
        };
        source.recalculate();
        source.reset();
        source
    }

    /// Replace the configuration and reseed.
    pub fn update_config(&mut self, config: RandomConfig) {
        self.config = config;
        self.recalculate();
        self.reset();
    }

    /// Current configuration.
    pub fn config(&self) -> &RandomConfig {
        &self.config
    }

    /// Update the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        self.recalculate();
    }

    /// Restart the sequence from the seed.
    pub fn reset(&mut self) {
        self.rng.reseed(self.config.seed);
        self.phase = 0.0;
        self.previous = 0.0;
        self.target = self.rng.next_bipolar();
    }

    /// Current value.
    #[inline]
    pub fn value(&self) -> f32 {
        if self.config.smooth {
            self.previous + (self.target - self.previous) * self.phase
        } else {
            self.target
        }
    }

    /// Advance `samples` and return the new value.
    ///
    /// At most one new value is drawn per call.
    pub fn advance_by(&mut self, samples: usize) -> f32 {
        let next = self.phase + self.phase_inc * samples as f32;
        if next >= 1.0 {
            self.previous = self.target;
            self.target = self.rng.next_bipolar();
            self.phase = next - floorf(next);
        } else {
            self.phase = next;
        }
        self.value()
    }

    fn recalculate(&mut self) {
        let rate = if self.config.rate_hz.is_finite() {
            self.config.rate_hz.clamp(0.0, self.sample_rate * 0.5)
        } else {
            0.0
        };
        self.phase_inc = rate / self.sample_rate;
    }
}

impl ModulationSource for RandomSource {
    fn mod_advance(&mut self) -> f32 {
        let out = self.value();
        self.advance_by(1);
        out
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

/// Step sequencer settings.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StepSequencerConfig {
    /// Step values, -1.0 to 1.0.
    pub steps: [f32; MAX_STEPS],
    /// Loop length in steps, 1 to 16.
    pub length: u8,
    /// Steps per beat (4 = sixteenth notes).
    pub steps_per_beat: u8,
}

impl Default for StepSequencerConfig {
    fn default() -> Self {
        Self {
            steps: [0.0; MAX_STEPS],
            length: MAX_STEPS as u8,
            steps_per_beat: 4,
        }
    }
}

impl StepSequencerConfig {
    /// Sequence of the given values; length follows the slice.
    pub fn from_values(values: &[f32]) -> Self {
        let mut config = Self::default();
        let len = values.len().clamp(1, MAX_STEPS);
        for (dst, &src) in config.steps.iter_mut().zip(values) {
            *dst = src;
        }
        config.length = len as u8;
        config
    }

    /// Loop length clamped to 1–16.
    pub fn loop_length(&self) -> usize {
        usize::from(self.length).clamp(1, MAX_STEPS)
    }
}

/// Tempo-synced step sequencer, -1.0 to 1.0.
///
/// # Example
///
/// ```rust
/// use polyvox_synth::{StepSequencer, StepSequencerConfig};
///
/// let config = StepSequencerConfig::from_values(&[1.0, -1.0]);
/// let mut seq = StepSequencer::new(48000.0, config);
/// seq.set_bpm(120.0);
/// assert_eq!(seq.value(), 1.0);
/// // 4 steps per beat at 120 BPM: 6000 samples per step
/// assert_eq!(seq.advance_by(6100), -1.0);
/// ```
#[derive(Debug, Clone)]
pub struct StepSequencer {
    config: StepSequencerConfig,
    sample_rate: f32,
    bpm: f32,
    /// Position in steps, [0, length).
    position: f32,
    steps_per_sample: f32,
}

impl StepSequencer {
    /// Create a sequencer at 120 BPM.
    pub fn new(sample_rate: f32, config: StepSequencerConfig) -> Self {
        let mut seq = Self {
            config,
            sample_rate: sample_rate.max(1.0),
            bpm: 120.0,
            position: 0.0,
            steps_per_sample: 0.0,
        };
        seq.recalculate();
        seq
    }

    /// Replace the configuration. Position is kept, wrapped to the new length.
    pub fn update_config(&mut self, config: StepSequencerConfig) {
        self.config = config;
        self.position %= config.loop_length() as f32;
        self.recalculate();
    }

    /// Current configuration.
    pub fn config(&self) -> &StepSequencerConfig {
        &self.config
    }

    /// Set tempo (clamped to the supported BPM range).
    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm.clamp(polyvox_core::MIN_BPM, polyvox_core::MAX_BPM);
        self.recalculate();
    }

    /// Update the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        self.recalculate();
    }

    /// Restart at step 0.
    pub fn reset(&mut self) {
        self.position = 0.0;
    }

    /// Index of the current step.
    pub fn current_step(&self) -> usize {
        (self.position as usize).min(self.config.loop_length() - 1)
    }

    /// Current step value.
    #[inline]
    pub fn value(&self) -> f32 {
        self.config.steps[self.current_step()].clamp(-1.0, 1.0)
    }

    /// Advance `samples` and return the new step value.
    pub fn advance_by(&mut self, samples: usize) -> f32 {
        let len = self.config.loop_length() as f32;
        let next = self.position + self.steps_per_sample * samples as f32;
        self.position = next - floorf(next / len) * len;
        self.value()
    }

    fn recalculate(&mut self) {
        let steps_per_beat = f32::from(self.config.steps_per_beat.max(1));
        self.steps_per_sample = self.bpm / 60.0 * steps_per_beat / self.sample_rate;
    }
}

impl ModulationSource for StepSequencer {
    fn mod_advance(&mut self) -> f32 {
        let out = self.value();
        self.advance_by(1);
        out
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

#[cfg(test)]
mod tests {
    extern crate alloc;

    use super::*;

    #[test]
    fn test_parse_sources() {
        assert_eq!("lfo1".parse::<ModSource>().unwrap(), ModSource::Lfo1);
        assert_eq!(
            "Filter_Envelope".parse::<ModSource>().unwrap(),
            ModSource::FilterEnvelope
        );
        assert_eq!("cc74".parse::<ModSource>().unwrap(), ModSource::MidiCc(74));
        assert_eq!("cc:11".parse::<ModSource>().unwrap(), ModSource::MidiCc(11));
        assert!("cc128".parse::<ModSource>().is_err());
        assert!("wobble".parse::<ModSource>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for source in ModSource::FIXED.into_iter().chain([ModSource::MidiCc(7)]) {
            let text = alloc::format!("{source}");
            assert_eq!(text.parse::<ModSource>().unwrap(), source);
        }
    }

    #[test]
    fn test_polarity() {
        assert_eq!(ModSource::Lfo1.polarity(), Polarity::Bipolar);
        assert_eq!(ModSource::AmpEnvelope.polarity(), Polarity::Unipolar);
        assert_eq!(ModSource::MidiCc(3).polarity(), Polarity::Unipolar);
        assert_eq!(ModSource::PitchBend.polarity(), Polarity::Bipolar);
    }

    #[test]
    fn test_source_values_lookup() {
        let mut cc = CcTable::default();
        cc.set(1, 0.25);
        cc.set_midi(74, 127);
        let mut values = SourceValues::new(&cc);
        values.velocity = 0.8;

        assert_eq!(values.get(ModSource::ModWheel), 0.25);
        assert_eq!(values.get(ModSource::MidiCc(74)), 1.0);
        assert_eq!(values.get(ModSource::Velocity), 0.8);
        assert_eq!(values.get(ModSource::Constant), 1.0);
    }

    #[test]
    fn test_cc_table_clamps() {
        let mut cc = CcTable::default();
        cc.set(10, 3.0);
        cc.set(11, f32::NAN);
        cc.set(200, 1.0);
        assert_eq!(cc.get(10), 1.0);
        assert_eq!(cc.get(11), 0.0);
        assert_eq!(cc.get(200), 0.0);
    }

    #[test]
    fn test_key_track() {
        assert_eq!(key_track(60.0), 0.0);
        assert!((key_track(72.0) - 0.1875).abs() < 1e-6);
        assert_eq!(key_track(127.0 + 64.0), 1.0);
        assert!(key_track(48.0) < 0.0);
    }

    #[test]
    fn test_random_stepped_holds_between_draws() {
        let config = RandomConfig {
            rate_hz: 10.0,
            ..RandomConfig::default()
        };
        let mut random = RandomSource::new(48000.0, config);
        let first = random.value();
        // 4800 samples per value; 4 blocks of 1000 stay on the first draw
        for _ in 0..4 {
            assert_eq!(random.advance_by(1000), first);
        }
        let second = random.advance_by(1000);
        assert_ne!(second, first);
        assert!((-1.0..=1.0).contains(&second));
    }

    #[test]
    fn test_random_smooth_interpolates() {
        let config = RandomConfig {
            rate_hz: 10.0,
            smooth: true,
            ..RandomConfig::default()
        };
        let mut random = RandomSource::new(48000.0, config);
        let stepped = RandomSource::new(
            48000.0,
            RandomConfig {
                smooth: false,
                ..config
            },
        );
        // Glides from 0 toward the first draw over 4800 samples
        assert_eq!(random.value(), 0.0);
        let mid = random.advance_by(2400);
        assert!((mid - stepped.value() * 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_random_reset_repeats_sequence() {
        let mut random = RandomSource::new(48000.0, RandomConfig::default());
        let a: alloc::vec::Vec<f32> = (0..20).map(|_| random.advance_by(12000)).collect();
        random.reset();
        let b: alloc::vec::Vec<f32> = (0..20).map(|_| random.advance_by(12000)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_step_sequencer_wraps() {
        let config = StepSequencerConfig::from_values(&[0.1, 0.2, 0.3]);
        let mut seq = StepSequencer::new(48000.0, config);
        seq.set_bpm(120.0);
        assert_eq!(seq.current_step(), 0);
        seq.advance_by(6100);
        assert_eq!(seq.current_step(), 1);
        seq.advance_by(12000);
        assert_eq!(seq.current_step(), 0);
        assert_eq!(seq.value(), 0.1);
    }

    #[test]
    fn test_step_sequencer_tempo() {
        let config = StepSequencerConfig::from_values(&[1.0, -1.0]);
        let mut seq = StepSequencer::new(48000.0, config);
        seq.set_bpm(60.0);
        // 4 steps per second at 60 BPM
        assert_eq!(seq.advance_by(11900), 1.0);
        assert_eq!(seq.advance_by(200), -1.0);
    }

    #[test]
    fn test_sources_implement_trait() {
        let mut seq = StepSequencer::new(48000.0, StepSequencerConfig::from_values(&[0.5]));
        assert!(seq.is_bipolar());
        assert_eq!(seq.mod_advance(), 0.5);
        assert_eq!(seq.mod_advance_unipolar(), 0.75);

        let mut random = RandomSource::new(48000.0, RandomConfig::default());
        let v = random.mod_value();
        random.mod_reset();
        assert_eq!(random.mod_value(), v);
    }
}
