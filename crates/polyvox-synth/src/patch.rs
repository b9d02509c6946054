//! The engine's complete, serializable configuration.
//!
//! A [`SynthPatch`] is replaced as a whole: the engine validates it on the
//! control path and applies it at a block boundary, so the audio path never
//! sees a half-edited patch.

use polyvox_core::{
    EnvelopeConfig, FilterConfig, LfoConfig, LfoWaveform, MAX_LFO_RATE_HZ, MIN_CUTOFF_HZ,
    MIN_RESONANCE,
};
use thiserror::Error;

use crate::mod_matrix::{MOD_SLOTS, ModulationSlot};
use crate::oscillator::{OscillatorConfig, OscillatorWaveform, PULSE_WIDTH_RANGE};
use crate::sources::{CC_COUNT, ModSource, RandomConfig, StepSequencerConfig};
use crate::unison::{MAX_UNISON, MIN_UNISON, UnisonConfig};
use crate::voice::VoiceMode;
use crate::voice_manager::MAX_VOICES;

/// Longest envelope stage, LFO delay or fade, in seconds.
pub const MAX_STAGE_SECONDS: f32 = 30.0;
/// Highest base cutoff a patch may store, in Hz.
pub const MAX_CUTOFF_HZ: f32 = 20000.0;
/// Largest filter envelope / LFO amount, in Hz either way.
pub const MAX_FILTER_MOD_HZ: f32 = 20000.0;
/// Longest portamento time, in seconds.
pub const MAX_GLIDE_SECONDS: f32 = 10.0;
/// Widest pitch-bend range, in semitones.
pub const MAX_PITCH_BEND_SEMITONES: f32 = 48.0;
/// Largest master gain.
pub const MAX_MASTER_GAIN: f32 = 2.0;
/// Widest unison spread, in cents.
pub const MAX_UNISON_DETUNE_CENTS: f32 = 100.0;

/// Why a patch was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PatchError {
    /// A field holds NaN or infinity.
    #[error("{field} is not a finite number")]
    NonFinite {
        /// Dotted field path.
        field: &'static str,
    },
    /// A field is outside its allowed range.
    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        /// Dotted field path.
        field: &'static str,
        /// Offending value.
        value: f32,
        /// Lowest allowed value.
        min: f32,
        /// Highest allowed value.
        max: f32,
    },
    /// A modulation slot cannot be evaluated.
    #[error("modulation slot {index}: {reason}")]
    InvalidSlot {
        /// Slot index.
        index: usize,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Everything needed to reproduce a sound.
///
/// # Example
///
/// ```rust
/// use polyvox_synth::{ModDestination, ModSource, ModulationSlot, SynthPatch};
///
/// let patch = SynthPatch::default().with_slot(
///     0,
///     ModulationSlot::new(ModSource::Lfo1, ModDestination::Pitch, 0.02),
/// );
/// assert!(patch.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SynthPatch {
    /// Oscillator 1.
    pub osc1: OscillatorConfig,
    /// Oscillator 2.
    pub osc2: OscillatorConfig,
    /// 0 = oscillator 1 only, 1 = oscillator 2 only.
    pub osc_mix: f32,
    /// Filter.
    pub filter: FilterConfig,
    /// Amplitude envelope.
    pub amp_env: EnvelopeConfig,
    /// Filter envelope (drives `filter.env_amount_hz`).
    pub filter_env: EnvelopeConfig,
    /// Free modulation envelope.
    pub mod_env: EnvelopeConfig,
    /// LFO 1 (also drives `filter.lfo_amount_hz`).
    pub lfo1: LfoConfig,
    /// LFO 2.
    pub lfo2: LfoConfig,
    /// Modulation routing. Serialized as a sparse list of `{ slot = i, .. }`
    /// entries; slots left out stay empty.
    #[cfg_attr(feature = "serde", serde(with = "slot_list"))]
    pub mod_slots: [ModulationSlot; MOD_SLOTS],
    /// Unison stacking.
    pub unison: UnisonConfig,
    /// Poly, mono or legato.
    pub voice_mode: VoiceMode,
    /// Maximum simultaneous voices.
    pub polyphony: u8,
    /// Portamento time in seconds; 0 disables.
    pub glide_s: f32,
    /// Pitch-bend range in semitones.
    pub pitch_bend_range: f32,
    /// Output gain.
    pub master_gain: f32,
    /// Voice pan, -1 (left) to 1 (right).
    pub pan: f32,
    /// Random modulation source.
    pub random: RandomConfig,
    /// Step sequencer modulation source.
    pub step_sequencer: StepSequencerConfig,
}

impl Default for SynthPatch {
    fn default() -> Self {
        Self {
            osc1: OscillatorConfig::with_waveform(OscillatorWaveform::Saw),
            osc2: OscillatorConfig {
                octave: -1,
                ..OscillatorConfig::with_waveform(OscillatorWaveform::Square)
            },
            osc_mix: 0.0,
            filter: FilterConfig {
                cutoff_hz: 4000.0,
                ..FilterConfig::default()
            },
            amp_env: EnvelopeConfig::default(),
            filter_env: EnvelopeConfig::adsr(0.005, 0.3, 0.0, 0.3),
            mod_env: EnvelopeConfig::adsr(0.5, 0.5, 0.5, 0.5),
            lfo1: LfoConfig::default()
                .with_waveform(LfoWaveform::Triangle)
                .with_rate(5.0),
            lfo2: LfoConfig::default().with_rate(0.5),
            mod_slots: [ModulationSlot::default(); MOD_SLOTS],
            unison: UnisonConfig::default(),
            voice_mode: VoiceMode::Poly,
            polyphony: 8,
            glide_s: 0.0,
            pitch_bend_range: 2.0,
            master_gain: 0.5,
            pan: 0.0,
            random: RandomConfig::default(),
            step_sequencer: StepSequencerConfig::default(),
        }
    }
}

impl SynthPatch {
    /// Replace slot `index` (ignored when out of range).
    pub fn with_slot(mut self, index: usize, slot: ModulationSlot) -> Self {
        if let Some(dst) = self.mod_slots.get_mut(index) {
            *dst = slot;
        }
        self
    }

    /// Number of enabled modulation slots.
    pub fn active_slot_count(&self) -> usize {
        self.mod_slots.iter().filter(|s| s.enabled).count()
    }

    /// Check every field; returns the first problem found.
    pub fn validate(&self) -> Result<(), PatchError> {
        let mut first = None;
        self.for_each_issue(|err| {
            if first.is_none() {
                first = Some(err);
            }
        });
        first.map_or(Ok(()), Err)
    }

    /// Report every problem, in field order.
    pub fn for_each_issue(&self, mut report: impl FnMut(PatchError)) {
        let r = &mut report;

        check_oscillator(r, &self.osc1, OSC1_FIELDS);
        check_oscillator(r, &self.osc2, OSC2_FIELDS);
        range(r, "osc_mix", self.osc_mix, 0.0, 1.0);

        let f = &self.filter;
        range(r, "filter.cutoff_hz", f.cutoff_hz, MIN_CUTOFF_HZ, MAX_CUTOFF_HZ);
        range(r, "filter.resonance", f.resonance, MIN_RESONANCE, 1.0);
        range(r, "filter.drive", f.drive, 0.0, 1.0);
        range(
            r,
            "filter.env_amount_hz",
            f.env_amount_hz,
            -MAX_FILTER_MOD_HZ,
            MAX_FILTER_MOD_HZ,
        );
        range(
            r,
            "filter.lfo_amount_hz",
            f.lfo_amount_hz,
            -MAX_FILTER_MOD_HZ,
            MAX_FILTER_MOD_HZ,
        );
        range(r, "filter.keytrack", f.keytrack, 0.0, 1.0);

        check_envelope(r, &self.amp_env, AMP_ENV_FIELDS);
        check_envelope(r, &self.filter_env, FILTER_ENV_FIELDS);
        check_envelope(r, &self.mod_env, MOD_ENV_FIELDS);

        check_lfo(r, &self.lfo1, LFO1_FIELDS);
        check_lfo(r, &self.lfo2, LFO2_FIELDS);

        for (index, slot) in self.mod_slots.iter().enumerate() {
            if !slot.enabled {
                continue;
            }
            if !slot.depth.is_finite() || !(-1.0..=1.0).contains(&slot.depth) {
                r(PatchError::InvalidSlot {
                    index,
                    reason: "depth must be within -1..=1",
                });
            }
            if let ModSource::MidiCc(cc) = slot.source {
                if usize::from(cc) >= CC_COUNT {
                    r(PatchError::InvalidSlot {
                        index,
                        reason: "controller number above 127",
                    });
                }
            }
        }

        let u = &self.unison;
        range(
            r,
            "unison.voices",
            f32::from(u.voices),
            MIN_UNISON as f32,
            MAX_UNISON as f32,
        );
        range(
            r,
            "unison.detune_cents",
            u.detune_cents,
            0.0,
            MAX_UNISON_DETUNE_CENTS,
        );
        range(r, "unison.stereo_spread", u.stereo_spread, 0.0, 1.0);
        range(r, "unison.blend", u.blend, 0.0, 1.0);

        range(
            r,
            "polyphony",
            f32::from(self.polyphony),
            1.0,
            MAX_VOICES as f32,
        );
        range(r, "glide_s", self.glide_s, 0.0, MAX_GLIDE_SECONDS);
        range(
            r,
            "pitch_bend_range",
            self.pitch_bend_range,
            0.0,
            MAX_PITCH_BEND_SEMITONES,
        );
        range(r, "master_gain", self.master_gain, 0.0, MAX_MASTER_GAIN);
        range(r, "pan", self.pan, -1.0, 1.0);

        range(r, "random.rate_hz", self.random.rate_hz, 0.0, MAX_LFO_RATE_HZ);

        let seq = &self.step_sequencer;
        range(
            r,
            "step_sequencer.length",
            f32::from(seq.length),
            1.0,
            seq.steps.len() as f32,
        );
        range(
            r,
            "step_sequencer.steps_per_beat",
            f32::from(seq.steps_per_beat),
            1.0,
            16.0,
        );
        for &step in &seq.steps {
            range(r, "step_sequencer.steps", step, -1.0, 1.0);
        }
    }
}

fn range(report: &mut impl FnMut(PatchError), field: &'static str, value: f32, min: f32, max: f32) {
    if !value.is_finite() {
        report(PatchError::NonFinite { field });
    } else if value < min || value > max {
        report(PatchError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
}

struct OscillatorFields {
    octave: &'static str,
    semitone: &'static str,
    fine_cents: &'static str,
    level: &'static str,
    pulse_width: &'static str,
}

const OSC1_FIELDS: OscillatorFields = OscillatorFields {
    octave: "osc1.octave",
    semitone: "osc1.semitone",
    fine_cents: "osc1.fine_cents",
    level: "osc1.level",
    pulse_width: "osc1.pulse_width",
};

const OSC2_FIELDS: OscillatorFields = OscillatorFields {
    octave: "osc2.octave",
    semitone: "osc2.semitone",
    fine_cents: "osc2.fine_cents",
    level: "osc2.level",
    pulse_width: "osc2.pulse_width",
};

fn check_oscillator(
    r: &mut impl FnMut(PatchError),
    osc: &OscillatorConfig,
    names: OscillatorFields,
) {
    range(r, names.octave, f32::from(osc.octave), -4.0, 4.0);
    range(r, names.semitone, f32::from(osc.semitone), -12.0, 12.0);
    range(r, names.fine_cents, osc.fine_cents, -100.0, 100.0);
    range(r, names.level, osc.level, 0.0, 1.0);
    range(
        r,
        names.pulse_width,
        osc.pulse_width,
        PULSE_WIDTH_RANGE.0,
        PULSE_WIDTH_RANGE.1,
    );
}

struct EnvelopeFields {
    attack: &'static str,
    decay: &'static str,
    sustain: &'static str,
    release: &'static str,
    velocity: &'static str,
}

const AMP_ENV_FIELDS: EnvelopeFields = EnvelopeFields {
    attack: "amp_env.attack_s",
    decay: "amp_env.decay_s",
    sustain: "amp_env.sustain",
    release: "amp_env.release_s",
    velocity: "amp_env.velocity_sensitivity",
};

const FILTER_ENV_FIELDS: EnvelopeFields = EnvelopeFields {
    attack: "filter_env.attack_s",
    decay: "filter_env.decay_s",
    sustain: "filter_env.sustain",
    release: "filter_env.release_s",
    velocity: "filter_env.velocity_sensitivity",
};

const MOD_ENV_FIELDS: EnvelopeFields = EnvelopeFields {
    attack: "mod_env.attack_s",
    decay: "mod_env.decay_s",
    sustain: "mod_env.sustain",
    release: "mod_env.release_s",
    velocity: "mod_env.velocity_sensitivity",
};

fn check_envelope(r: &mut impl FnMut(PatchError), env: &EnvelopeConfig, names: EnvelopeFields) {
    range(r, names.attack, env.attack_s, 0.0, MAX_STAGE_SECONDS);
    range(r, names.decay, env.decay_s, 0.0, MAX_STAGE_SECONDS);
    range(r, names.sustain, env.sustain, 0.0, 1.0);
    range(r, names.release, env.release_s, 0.0, MAX_STAGE_SECONDS);
    range(r, names.velocity, env.velocity_sensitivity, 0.0, 1.0);
}

struct LfoFields {
    rate: &'static str,
    phase: &'static str,
    delay: &'static str,
    fade: &'static str,
}

const LFO1_FIELDS: LfoFields = LfoFields {
    rate: "lfo1.rate_hz",
    phase: "lfo1.phase_offset",
    delay: "lfo1.delay_s",
    fade: "lfo1.fade_in_s",
};

const LFO2_FIELDS: LfoFields = LfoFields {
    rate: "lfo2.rate_hz",
    phase: "lfo2.phase_offset",
    delay: "lfo2.delay_s",
    fade: "lfo2.fade_in_s",
};

fn check_lfo(r: &mut impl FnMut(PatchError), lfo: &LfoConfig, names: LfoFields) {
    range(r, names.rate, lfo.rate_hz, 0.0, MAX_LFO_RATE_HZ);
    range(r, names.phase, lfo.phase_offset, 0.0, 1.0);
    range(r, names.delay, lfo.delay_s, 0.0, MAX_STAGE_SECONDS);
    range(r, names.fade, lfo.fade_in_s, 0.0, MAX_STAGE_SECONDS);
}

#[cfg(feature = "serde")]
mod slot_list {
    use core::fmt;

    use polyvox_core::{Polarity, ResponseCurve};
    use serde::de::{Error, SeqAccess, Visitor};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::mod_matrix::{MOD_SLOTS, ModDestination, ModulationSlot};
    use crate::sources::ModSource;

    fn enabled() -> bool {
        true
    }

    #[derive(Serialize, Deserialize)]
    struct Entry {
        slot: usize,
        #[serde(default = "enabled")]
        enabled: bool,
        source: ModSource,
        destination: ModDestination,
        depth: f32,
        /// Omitted: the source's native polarity.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bipolar: Option<bool>,
        #[serde(default)]
        curve: ResponseCurve,
    }

    impl Entry {
        fn from_slot(slot: usize, s: &ModulationSlot) -> Self {
            Self {
                slot,
                enabled: s.enabled,
                source: s.source,
                destination: s.destination,
                depth: s.depth,
                bipolar: Some(s.bipolar),
                curve: s.curve,
            }
        }

        fn into_slot(self) -> ModulationSlot {
            ModulationSlot {
                enabled: self.enabled,
                source: self.source,
                destination: self.destination,
                depth: self.depth,
                bipolar: self
                    .bipolar
                    .unwrap_or(self.source.polarity() == Polarity::Bipolar),
                curve: self.curve,
            }
        }
    }

    pub(super) fn serialize<S: Serializer>(
        slots: &[ModulationSlot; MOD_SLOTS],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let empty = ModulationSlot::default();
        serializer.collect_seq(
            slots
                .iter()
                .enumerate()
                .filter(|(_, s)| **s != empty)
                .map(|(i, s)| Entry::from_slot(i, s)),
        )
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[ModulationSlot; MOD_SLOTS], D::Error> {
        deserializer.deserialize_seq(SlotsVisitor)
    }

    struct SlotsVisitor;

    impl<'de> Visitor<'de> for SlotsVisitor {
        type Value = [ModulationSlot; MOD_SLOTS];

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a list of modulation slot entries")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut slots = [ModulationSlot::default(); MOD_SLOTS];
            while let Some(entry) = seq.next_element::<Entry>()? {
                let Some(dst) = slots.get_mut(entry.slot) else {
                    return Err(A::Error::custom("modulation slot index above 15"));
                };
                *dst = entry.into_slot();
            }
            Ok(slots)
        }
    }
}
