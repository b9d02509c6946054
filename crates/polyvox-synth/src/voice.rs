//! A single synthesizer voice.
//!
//! Each voice exclusively owns its oscillators (two per unison instance),
//! a stereo pair of filters, three envelopes and two LFOs. Nothing is shared
//! between voices, so one note's filter ring can never leak into another.
//!
//! ## Per-block flow
//!
//! ```text
//! sources ─► router ─► pitch / pulse width / mix / cutoff / amp / pan
//!                                  │
//!  unison oscillators ─► filter ─► amp envelope × amp ramp ─► pan ─► out
//! ```
//!
//! Modulation is evaluated once per block. Amplitude and pan are ramped
//! across the block; pitch, pulse width and cutoff are applied directly.

use polyvox_core::{
    AdsrEnvelope, BlockRamp, Lfo, SmoothedParam, StateVariableFilter, cents_to_ratio,
    constant_power_pan, freq_to_midi, midi_to_freq,
};

use crate::mod_matrix::{
    DestinationValues, LFO_RATE_MOD_OCTAVES, ModDestination, ModulationRouter, PULSE_WIDTH_MOD,
};
use crate::oscillator::{Oscillator, OscillatorConfig};
use crate::patch::SynthPatch;
use crate::sources::{CcTable, SourceValues, key_track};
use crate::unison::{MAX_UNISON, UnisonConfig, UnisonLayout, UnisonProcessor};

/// Opaque voice identity. Ids are never reused within one manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub(crate) u64);

impl VoiceId {
    /// Raw id value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for VoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "voice#{}", self.0)
    }
}

/// How note-ons map onto voices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum VoiceMode {
    /// One voice per note, up to the polyphony limit.
    #[default]
    Poly,
    /// One voice; every note-on retriggers the envelopes.
    Mono,
    /// One voice; overlapping notes glide without retriggering.
    Legato,
}

impl VoiceMode {
    /// Whether at most one voice sounds.
    pub fn is_monophonic(self) -> bool {
        !matches!(self, Self::Poly)
    }

    /// Lowercase name as used in presets.
    pub fn name(self) -> &'static str {
        match self {
            Self::Poly => "poly",
            Self::Mono => "mono",
            Self::Legato => "legato",
        }
    }
}

impl core::str::FromStr for VoiceMode {
    type Err = polyvox_core::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Poly, Self::Mono, Self::Legato]
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(s.trim()))
            .ok_or(polyvox_core::ParseError::new("voice mode"))
    }
}

/// Engine-wide sources shared by every voice for one block.
#[derive(Debug, Clone, Copy)]
pub struct GlobalSources<'a> {
    /// Free-running LFO 1 clock.
    pub lfo1: &'a Lfo,
    /// Free-running LFO 2 clock.
    pub lfo2: &'a Lfo,
    /// Random generator output.
    pub random: f32,
    /// Step sequencer output.
    pub step_sequencer: f32,
    /// Pitch bend, -1 to 1.
    pub pitch_bend: f32,
    /// Channel aftertouch, 0 to 1.
    pub aftertouch: f32,
    /// MIDI controllers.
    pub cc: &'a CcTable,
}

/// One unison instance: an oscillator pair.
#[derive(Debug, Clone)]
struct UnisonOscillators {
    osc1: Oscillator,
    osc2: Oscillator,
}

impl UnisonOscillators {
    fn new(sample_rate: f32, index: usize) -> Self {
        let mut pair = Self {
            osc1: Oscillator::new(sample_rate),
            osc2: Oscillator::new(sample_rate),
        };
        let seed = 0x2545_F491_u32.wrapping_mul(index as u32 + 1);
        pair.osc1.set_noise_seed(seed);
        pair.osc2.set_noise_seed(seed.rotate_left(13));
        pair
    }

    #[inline]
    fn advance(&mut self, g1: f32, g2: f32) -> f32 {
        let s1 = self.osc1.advance();
        let s2 = self.osc2.advance();
        s1 * g1 + s2 * g2
    }
}

/// Per-voice copy of the patch fields the audio path reads.
#[derive(Debug, Clone, Copy)]
struct VoiceParams {
    osc1: OscillatorConfig,
    osc2: OscillatorConfig,
    osc_mix: f32,
    unison: UnisonConfig,
    pitch_bend_range: f32,
    pan: f32,
}

impl From<&SynthPatch> for VoiceParams {
    fn from(patch: &SynthPatch) -> Self {
        Self {
            osc1: patch.osc1,
            osc2: patch.osc2,
            osc_mix: patch.osc_mix,
            unison: patch.unison,
            pitch_bend_range: patch.pitch_bend_range,
            pan: patch.pan,
        }
    }
}

/// A single synthesizer voice.
///
/// Voices are created up front by the [`VoiceManager`](crate::VoiceManager)
/// and recycled; [`start`](Self::start) hard-resets all DSP state.
#[derive(Debug, Clone)]
pub struct Voice {
    sample_rate: f32,
    params: VoiceParams,
    layout: UnisonLayout,
    oscillators: [UnisonOscillators; MAX_UNISON],
    filter_l: StateVariableFilter,
    filter_r: StateVariableFilter,
    amp_env: AdsrEnvelope,
    filter_env: AdsrEnvelope,
    mod_env: AdsrEnvelope,
    lfo1: Lfo,
    lfo2: Lfo,
    /// Portamento in the MIDI-note domain.
    glide: SmoothedParam,
    amp: BlockRamp,
    pan: BlockRamp,

    id: VoiceId,
    active: bool,
    gate: bool,
    note: u8,
    velocity: f32,
    trigger_time: u64,
    release_time: Option<u64>,
    sequence: u64,
    mode: VoiceMode,
}

impl Voice {
    /// Create an idle voice configured from `patch`.
    pub fn new(sample_rate: f32, patch: &SynthPatch) -> Self {
        let sample_rate = sample_rate.max(1.0);
        let mut voice = Self {
            sample_rate,
            params: VoiceParams::from(patch),
            layout: UnisonProcessor::layout(&patch.unison),
            oscillators: core::array::from_fn(|i| UnisonOscillators::new(sample_rate, i)),
            filter_l: StateVariableFilter::new(sample_rate, patch.filter),
            filter_r: StateVariableFilter::new(sample_rate, patch.filter),
            amp_env: AdsrEnvelope::new(sample_rate, patch.amp_env),
            filter_env: AdsrEnvelope::new(sample_rate, patch.filter_env),
            mod_env: AdsrEnvelope::new(sample_rate, patch.mod_env),
            lfo1: Lfo::new(sample_rate, patch.lfo1),
            lfo2: Lfo::new(sample_rate, patch.lfo2),
            glide: SmoothedParam::with_config(60.0, sample_rate, patch.glide_s * 1000.0),
            amp: BlockRamp::new(1.0),
            pan: BlockRamp::new(patch.pan),
            id: VoiceId(0),
            active: false,
            gate: false,
            note: 0,
            velocity: 0.0,
            trigger_time: 0,
            release_time: None,
            sequence: 0,
            mode: patch.voice_mode,
        };
        voice.apply_oscillator_configs();
        voice
    }

    /// Apply a new patch without interrupting the note.
    pub fn apply_patch(&mut self, patch: &SynthPatch) {
        self.params = VoiceParams::from(patch);
        self.layout = UnisonProcessor::layout(&patch.unison);
        self.filter_l.update_config(patch.filter);
        self.filter_r.update_config(patch.filter);
        self.amp_env.update_config(patch.amp_env);
        self.filter_env.update_config(patch.filter_env);
        self.mod_env.update_config(patch.mod_env);
        self.lfo1.update_config(patch.lfo1);
        self.lfo2.update_config(patch.lfo2);
        self.glide.set_smoothing_time_ms(patch.glide_s.max(0.0) * 1000.0);
        self.mode = patch.voice_mode;
        self.apply_oscillator_configs();
    }

    /// Update the sample rate of every component.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        for pair in &mut self.oscillators {
            pair.osc1.set_sample_rate(self.sample_rate);
            pair.osc2.set_sample_rate(self.sample_rate);
        }
        self.filter_l.set_sample_rate(self.sample_rate);
        self.filter_r.set_sample_rate(self.sample_rate);
        self.amp_env.set_sample_rate(self.sample_rate);
        self.filter_env.set_sample_rate(self.sample_rate);
        self.mod_env.set_sample_rate(self.sample_rate);
        self.lfo1.set_sample_rate(self.sample_rate);
        self.lfo2.set_sample_rate(self.sample_rate);
        self.glide.set_sample_rate(self.sample_rate);
    }

    /// Propagate tempo to tempo-synced per-voice LFOs.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.lfo1.set_bpm(bpm);
        self.lfo2.set_bpm(bpm);
    }

    /// Begin a new note, hard-resetting all DSP state.
    ///
    /// Filters are zeroed and oscillator phases restart at `i / n` across
    /// the unison stack, so output depends only on the patch and the note.
    pub(crate) fn start(
        &mut self,
        id: VoiceId,
        note: u8,
        frequency: f32,
        velocity: f32,
        time: u64,
        sequence: u64,
    ) {
        self.id = id;
        self.active = true;
        self.gate = true;
        self.note = note;
        self.velocity = clamp_velocity(velocity);
        self.trigger_time = time;
        self.release_time = None;
        self.sequence = sequence;

        let n = self.layout.len().max(1);
        for (i, pair) in self.oscillators.iter_mut().enumerate() {
            let phase = (i % n) as f32 / n as f32;
            pair.osc1.reset(phase);
            pair.osc2.reset(phase);
        }
        self.filter_l.reset();
        self.filter_r.reset();
        self.glide.set_immediate(note_of(frequency));
        self.amp.reset(1.0);
        self.pan.reset(self.params.pan);
        self.trigger_envelopes();
    }

    /// Move to a new pitch on the sounding voice (mono / legato).
    ///
    /// With `retrigger` the envelopes and LFOs restart; otherwise they carry
    /// on and only the pitch moves (gliding if portamento is set).
    pub(crate) fn retune(
        &mut self,
        note: u8,
        frequency: f32,
        velocity: f32,
        time: u64,
        retrigger: bool,
    ) {
        self.note = note;
        self.gate = true;
        self.release_time = None;
        self.trigger_time = time;
        if self.glide.smoothing_time_ms() > 0.0 {
            self.glide.set_target(note_of(frequency));
        } else {
            self.glide.set_immediate(note_of(frequency));
        }
        if retrigger {
            self.velocity = clamp_velocity(velocity);
            self.trigger_envelopes();
        }
    }

    /// Gate off: envelopes enter release. The voice keeps sounding until
    /// the amplitude envelope reaches idle.
    pub(crate) fn release(&mut self, time: u64) {
        if self.gate {
            self.gate = false;
            self.release_time = Some(time);
            self.amp_env.gate_off();
            self.filter_env.gate_off();
            self.mod_env.gate_off();
        }
    }

    /// Silence immediately.
    pub(crate) fn kill(&mut self) {
        self.active = false;
        self.gate = false;
        self.amp_env.reset();
        self.filter_env.reset();
        self.mod_env.reset();
    }

    /// Whether the voice is producing sound.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active && self.amp_env.is_active()
    }

    /// Whether the gate is held.
    pub fn is_gated(&self) -> bool {
        self.active && self.gate
    }

    /// Whether the amplitude envelope is in its release stage.
    pub fn is_releasing(&self) -> bool {
        self.is_active() && self.amp_env.is_releasing()
    }

    /// Identity of the current note.
    pub fn id(&self) -> VoiceId {
        self.id
    }

    /// Current MIDI note.
    pub fn note(&self) -> u8 {
        self.note
    }

    /// Trigger velocity, 0 to 1.
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Timestamp of the last trigger or retune.
    pub fn trigger_time(&self) -> u64 {
        self.trigger_time
    }

    /// Timestamp of the note-off, if released.
    pub fn release_time(&self) -> Option<u64> {
        self.release_time
    }

    /// Allocation order; larger is newer.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Mode the voice was configured with.
    pub fn mode(&self) -> VoiceMode {
        self.mode
    }

    /// Amplitude envelope output level.
    pub fn envelope_value(&self) -> f32 {
        self.amp_env.level()
    }

    /// Amplitude envelope, for inspection.
    pub fn amp_envelope(&self) -> &AdsrEnvelope {
        &self.amp_env
    }

    /// Current (possibly gliding) pitch as a fractional MIDI note.
    pub fn current_note(&self) -> f32 {
        self.glide.get()
    }

    /// Effective filter cutoff of the last block.
    pub fn filter_cutoff(&self) -> f32 {
        self.filter_l.cutoff()
    }

    /// Active unison layout.
    pub fn unison_layout(&self) -> &UnisonLayout {
        &self.layout
    }

    /// Render one block, accumulating into `left` / `right`.
    ///
    /// Both slices must have the same length (the block length).
    pub fn render(
        &mut self,
        globals: &GlobalSources<'_>,
        router: &ModulationRouter,
        left: &mut [f32],
        right: &mut [f32],
    ) {
        if !self.is_active() {
            self.active = false;
            return;
        }
        let len = left.len().min(right.len());
        if len == 0 {
            return;
        }

        if !self.lfo1.config().retrigger {
            self.lfo1.follow(globals.lfo1);
        }
        if !self.lfo2.config().retrigger {
            self.lfo2.follow(globals.lfo2);
        }

        let mut sources = SourceValues::new(globals.cc);
        sources.lfo1 = self.lfo1.value();
        sources.lfo2 = self.lfo2.value();
        sources.amp_envelope = self.amp_env.level();
        sources.filter_envelope = self.filter_env.level();
        sources.mod_envelope = self.mod_env.level();
        sources.velocity = self.velocity;
        sources.key_track = key_track(self.glide.get());
        sources.aftertouch = globals.aftertouch;
        sources.pitch_bend = globals.pitch_bend;
        sources.random = globals.random;
        sources.step_sequencer = globals.step_sequencer;

        let dest = router.process(&sources);
        let (g1, g2) = self.prepare_block(
            &dest,
            globals.pitch_bend,
            sources.lfo1,
            sources.filter_envelope,
        );

        self.amp.begin_block(dest.amplitude_factor(), len);
        let pan_target = (self.params.pan + dest.get(ModDestination::Pan)).clamp(-1.0, 1.0);
        self.pan.begin_block(pan_target, len);

        let count = self.layout.len();
        if self.layout.is_stereo() {
            let mut instance_gains = [(0.0f32, 0.0f32); MAX_UNISON];
            for (gains, inst) in instance_gains.iter_mut().zip(self.layout.as_slice()) {
                let (l, r) = constant_power_pan(inst.pan);
                *gains = (l * inst.gain, r * inst.gain);
            }
            for (out_l, out_r) in left[..len].iter_mut().zip(right[..len].iter_mut()) {
                let mut l = 0.0;
                let mut r = 0.0;
                for (pair, &(gl, gr)) in self.oscillators[..count].iter_mut().zip(&instance_gains)
                {
                    let s = pair.advance(g1, g2);
                    l += s * gl;
                    r += s * gr;
                }
                let l = self.filter_l.process_sample(l);
                let r = self.filter_r.process_sample(r);
                let amp = self.amp_env.advance() * self.amp.advance();
                let (bal_l, bal_r) = balance(self.pan.advance());
                *out_l += l * amp * bal_l;
                *out_r += r * amp * bal_r;
            }
        } else {
            for (out_l, out_r) in left[..len].iter_mut().zip(right[..len].iter_mut()) {
                let mut mono = 0.0;
                for (pair, inst) in self.oscillators[..count]
                    .iter_mut()
                    .zip(self.layout.as_slice())
                {
                    mono += pair.advance(g1, g2) * inst.gain;
                }
                let y = self.filter_l.process_sample(mono);
                let amp = self.amp_env.advance() * self.amp.advance();
                let (pl, pr) = constant_power_pan(self.pan.advance());
                *out_l += y * amp * pl;
                *out_r += y * amp * pr;
            }
        }

        self.filter_env.advance_by(len);
        self.mod_env.advance_by(len);
        self.lfo1.advance_by(len);
        self.lfo2.advance_by(len);
        self.glide.advance_by(len);

        if !self.amp_env.is_active() {
            self.active = false;
        }
    }

    /// Set oscillator pitch, pulse width, LFO rates and filter for the
    /// block. Returns the per-oscillator gains.
    fn prepare_block(
        &mut self,
        dest: &DestinationValues,
        pitch_bend: f32,
        lfo1: f32,
        filter_envelope: f32,
    ) -> (f32, f32) {
        let p = &self.params;
        let note = self.glide.get() + pitch_bend.clamp(-1.0, 1.0) * p.pitch_bend_range;
        let f1 = midi_to_freq(note + p.osc1.pitch_offset_semitones() + dest.osc1_semitones());
        let f2 = midi_to_freq(note + p.osc2.pitch_offset_semitones() + dest.osc2_semitones());

        self.layout = UnisonProcessor::layout_with_spread(
            &p.unison,
            p.unison.detune_cents * dest.unison_detune_factor(),
        );

        let pw_mod = dest.get(ModDestination::PulseWidth) * PULSE_WIDTH_MOD;
        let pw1 = p.osc1.pulse_width + pw_mod;
        let pw2 = p.osc2.pulse_width + pw_mod;
        for (pair, inst) in self.oscillators.iter_mut().zip(self.layout.as_slice()) {
            let ratio = cents_to_ratio(inst.detune_cents);
            pair.osc1.set_frequency(f1 * ratio);
            pair.osc2.set_frequency(f2 * ratio);
            pair.osc1.set_pulse_width(pw1);
            pair.osc2.set_pulse_width(pw2);
        }

        self.lfo1
            .set_rate_modulation(dest.get(ModDestination::Lfo1Rate) * LFO_RATE_MOD_OCTAVES);
        self.lfo2
            .set_rate_modulation(dest.get(ModDestination::Lfo2Rate) * LFO_RATE_MOD_OCTAVES);

        let filter_mod = polyvox_core::FilterModulation {
            note,
            envelope: filter_envelope,
            lfo: lfo1,
            cutoff: dest.get(ModDestination::FilterCutoff),
            resonance: dest.get(ModDestination::FilterResonance),
            drive: dest.get(ModDestination::FilterDrive),
        };
        self.filter_l.set_modulation(&filter_mod);
        self.filter_r.set_modulation(&filter_mod);

        let mix = (p.osc_mix + dest.get(ModDestination::OscMix)).clamp(0.0, 1.0);
        (
            (1.0 - mix) * p.osc1.level.clamp(0.0, 1.0),
            mix * p.osc2.level.clamp(0.0, 1.0),
        )
    }

    fn apply_oscillator_configs(&mut self) {
        let p = self.params;
        for pair in &mut self.oscillators {
            pair.osc1.set_waveform(p.osc1.waveform);
            pair.osc2.set_waveform(p.osc2.waveform);
            pair.osc1.set_pulse_width(p.osc1.pulse_width);
            pair.osc2.set_pulse_width(p.osc2.pulse_width);
        }
    }

    fn trigger_envelopes(&mut self) {
        self.amp_env.gate_on(self.velocity);
        self.filter_env.gate_on(self.velocity);
        self.mod_env.gate_on(self.velocity);
        self.lfo1.trigger();
        self.lfo2.trigger();
    }
}

fn clamp_velocity(velocity: f32) -> f32 {
    if velocity.is_finite() {
        velocity.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Fractional MIDI note for a frequency; non-positive input maps to note 0.
fn note_of(frequency: f32) -> f32 {
    if frequency.is_finite() && frequency > 0.0 {
        freq_to_midi(frequency)
    } else {
        0.0
    }
}

/// Balance law for already-panned stereo material: unity at center, the
/// far side fades linearly.
#[inline]
fn balance(pan: f32) -> (f32, f32) {
    ((1.0 - pan).min(1.0), (1.0 + pan).min(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mod_matrix::ModulationSlot;
    use crate::oscillator::OscillatorWaveform;
    use crate::sources::ModSource;
    use polyvox_core::{EnvelopeState, LfoConfig};

    const SR: f32 = 48000.0;

    fn sine_patch() -> SynthPatch {
        SynthPatch {
            osc1: OscillatorConfig::with_waveform(OscillatorWaveform::Sine),
            filter: polyvox_core::FilterConfig {
                cutoff_hz: 18000.0,
                ..polyvox_core::FilterConfig::default()
            },
            ..SynthPatch::default()
        }
    }

    fn render_blocks(
        voice: &mut Voice,
        router: &ModulationRouter,
        blocks: usize,
    ) -> (f32, f32) {
        let lfo = Lfo::default();
        let cc = CcTable::default();
        let globals = GlobalSources {
            lfo1: &lfo,
            lfo2: &lfo,
            random: 0.0,
            step_sequencer: 0.0,
            pitch_bend: 0.0,
            aftertouch: 0.0,
            cc: &cc,
        };
        let mut energy_l = 0.0;
        let mut energy_r = 0.0;
        for _ in 0..blocks {
            let mut l = [0.0f32; 128];
            let mut r = [0.0f32; 128];
            voice.render(&globals, router, &mut l, &mut r);
            energy_l += l.iter().map(|s| s * s).sum::<f32>();
            energy_r += r.iter().map(|s| s * s).sum::<f32>();
        }
        (energy_l, energy_r)
    }

    #[test]
    fn test_idle_voice_is_silent() {
        let mut voice = Voice::new(SR, &sine_patch());
        assert!(!voice.is_active());
        let (l, r) = render_blocks(&mut voice, &ModulationRouter::new(), 4);
        assert_eq!((l, r), (0.0, 0.0));
    }

    #[test]
    fn test_start_and_release() {
        let mut voice = Voice::new(SR, &sine_patch());
        voice.start(VoiceId(1), 69, 440.0, 0.8, 0, 1);
        assert!(voice.is_active());
        assert!(voice.is_gated());

        // Past attack + decay (5280 samples)
        let (l, r) = render_blocks(&mut voice, &ModulationRouter::new(), 50);
        assert!(l > 0.0 && (l - r).abs() < l * 1e-3, "centered: {l} vs {r}");
        assert_eq!(voice.amp_envelope().state(), EnvelopeState::Sustain);

        voice.release(6400);
        assert!(voice.is_releasing());
        assert_eq!(voice.release_time(), Some(6400));
        // 0.3 s release at 48 kHz = 14400 samples < 113 blocks of 128
        render_blocks(&mut voice, &ModulationRouter::new(), 113);
        assert!(!voice.is_active());
    }

    #[test]
    fn test_retune_without_retrigger_keeps_envelope() {
        let mut voice = Voice::new(SR, &sine_patch());
        voice.start(VoiceId(1), 60, midi_to_freq(60.0), 1.0, 0, 1);
        render_blocks(&mut voice, &ModulationRouter::new(), 60);
        let before = voice.envelope_value();

        voice.retune(64, midi_to_freq(64.0), 1.0, 100, false);
        assert_eq!(voice.amp_envelope().state(), EnvelopeState::Sustain);
        assert_eq!(voice.envelope_value(), before);
        assert!((voice.current_note() - 64.0).abs() < 1e-3);

        voice.retune(67, midi_to_freq(67.0), 1.0, 200, true);
        assert_eq!(voice.amp_envelope().state(), EnvelopeState::Attack);
    }

    #[test]
    fn test_glide_moves_gradually() {
        let mut patch = sine_patch();
        patch.glide_s = 0.1;
        let mut voice = Voice::new(SR, &patch);
        voice.start(VoiceId(1), 60, midi_to_freq(60.0), 1.0, 0, 1);
        voice.retune(72, midi_to_freq(72.0), 1.0, 0, false);
        render_blocks(&mut voice, &ModulationRouter::new(), 4);
        let mid = voice.current_note();
        assert!(mid > 60.0 && mid < 72.0, "gliding, got {mid}");
        render_blocks(&mut voice, &ModulationRouter::new(), 400);
        assert!((voice.current_note() - 72.0).abs() < 0.01);
    }

    #[test]
    fn test_pan_modulation_moves_output() {
        let mut router = ModulationRouter::new();
        router.set_slot(
            0,
            ModulationSlot::new(ModSource::Constant, ModDestination::Pan, 1.0),
        );
        let mut voice = Voice::new(SR, &sine_patch());
        voice.start(VoiceId(1), 69, 440.0, 1.0, 0, 1);
        render_blocks(&mut voice, &router, 2);
        let (l, r) = render_blocks(&mut voice, &router, 10);
        assert!(r > 0.0);
        assert!(l < r * 1e-6, "hard right: {l} vs {r}");
    }

    #[test]
    fn test_amplitude_modulation_can_mute() {
        let mut router = ModulationRouter::new();
        router.set_slot(
            0,
            ModulationSlot::new(ModSource::Constant, ModDestination::Amplitude, -1.0),
        );
        let mut voice = Voice::new(SR, &sine_patch());
        voice.start(VoiceId(1), 69, 440.0, 1.0, 0, 1);
        render_blocks(&mut voice, &router, 1);
        let (l, r) = render_blocks(&mut voice, &router, 4);
        assert_eq!((l, r), (0.0, 0.0));
    }

    #[test]
    fn test_stereo_unison_spreads() {
        let mut patch = sine_patch();
        patch.unison = UnisonConfig {
            stereo_spread: 1.0,
            ..UnisonConfig::stack(4, 20.0)
        };
        let mut voice = Voice::new(SR, &patch);
        voice.start(VoiceId(1), 57, 220.0, 1.0, 0, 1);
        assert!(voice.unison_layout().is_stereo());
        let (l, r) = render_blocks(&mut voice, &ModulationRouter::new(), 40);
        assert!(l > 0.0 && r > 0.0);
        assert!(l.is_finite() && r.is_finite());
    }

    fn detunes(voice: &Voice) -> Vec<f32> {
        voice
            .unison_layout()
            .as_slice()
            .iter()
            .map(|v| v.detune_cents)
            .collect()
    }

    fn render_with_wheel(voice: &mut Voice, router: &ModulationRouter, wheel: f32) {
        let lfo = Lfo::default();
        let mut cc = CcTable::default();
        cc.set(crate::sources::MOD_WHEEL_CC, wheel);
        let globals = GlobalSources {
            lfo1: &lfo,
            lfo2: &lfo,
            random: 0.0,
            step_sequencer: 0.0,
            pitch_bend: 0.0,
            aftertouch: 0.0,
            cc: &cc,
        };
        let mut l = [0.0f32; 128];
        let mut r = [0.0f32; 128];
        voice.render(&globals, router, &mut l, &mut r);
    }

    #[test]
    fn test_unison_detune_follows_mod_wheel_back_to_rest() {
        let mut patch = sine_patch();
        patch.unison = UnisonConfig::stack(4, 20.0);
        let mut router = ModulationRouter::new();
        router.set_slot(
            0,
            ModulationSlot::new(ModSource::ModWheel, ModDestination::UnisonDetune, 1.0),
        );
        let mut voice = Voice::new(SR, &patch);
        voice.start(VoiceId(1), 57, 220.0, 1.0, 0, 1);

        render_with_wheel(&mut voice, &router, 0.0);
        let base = detunes(&voice);
        assert!((base[3] - 10.0).abs() < 1e-4);

        render_with_wheel(&mut voice, &router, 1.0);
        let wide = detunes(&voice);
        assert!((wide[3] - 20.0).abs() < 1e-4);
        assert!((wide[0] + 20.0).abs() < 1e-4);

        render_with_wheel(&mut voice, &router, 0.0);
        assert_eq!(detunes(&voice), base);
    }

    #[test]
    fn test_start_resets_filter_state() {
        let mut patch = sine_patch();
        patch.osc1 = OscillatorConfig::with_waveform(OscillatorWaveform::Saw);
        patch.filter.resonance = 0.05;
        patch.filter.cutoff_hz = 800.0;
        let mut a = Voice::new(SR, &patch);
        let mut b = Voice::new(SR, &patch);

        a.start(VoiceId(1), 40, midi_to_freq(40.0), 1.0, 0, 1);
        render_blocks(&mut a, &ModulationRouter::new(), 30);
        a.start(VoiceId(2), 60, midi_to_freq(60.0), 1.0, 0, 2);
        b.start(VoiceId(3), 60, midi_to_freq(60.0), 1.0, 0, 3);

        // A recycled voice renders exactly like a fresh one.
        let ea = render_blocks(&mut a, &ModulationRouter::new(), 5);
        let eb = render_blocks(&mut b, &ModulationRouter::new(), 5);
        assert_eq!(ea, eb);
    }

    #[test]
    fn test_retriggered_lfo_runs_per_voice() {
        let mut patch = sine_patch();
        patch.lfo1 = LfoConfig::default().with_rate(2.0).with_retrigger(true);
        let mut voice = Voice::new(SR, &patch);
        voice.start(VoiceId(1), 60, midi_to_freq(60.0), 1.0, 0, 1);
        render_blocks(&mut voice, &ModulationRouter::new(), 10);
        // 1280 samples at 2 Hz
        let expected = 1280.0 * 2.0 / SR;
        assert!((voice.lfo1.phase() - expected).abs() < 1e-4);
    }

    #[test]
    fn test_voice_mode_parse() {
        assert_eq!("legato".parse::<VoiceMode>().unwrap(), VoiceMode::Legato);
        assert!("MONO".parse::<VoiceMode>().unwrap().is_monophonic());
        assert!("duo".parse::<VoiceMode>().is_err());
    }
}
