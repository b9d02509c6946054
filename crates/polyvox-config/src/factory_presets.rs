//! Factory presets bundled with the polyvox library.
//!
//! These presets are always available without external files. They cover
//! the engine's main features (unison, mono/legato with glide, tempo-synced
//! LFOs, the step sequencer and the modulation router) and serve as
//! starting points for users.

use crate::Preset;

/// Array of factory preset names for external access.
pub static FACTORY_PRESET_NAMES: &[&str] = &[
    "init",
    "warm_pad",
    "acid_bass",
    "super_saw",
    "glass_pluck",
    "legato_lead",
    "wobble",
    "step_gate",
];

/// TOML content for factory presets.
///
/// These are embedded at compile time and always available.
static FACTORY_PRESETS_TOML: &[(&str, &str)] = &[
    ("init", INIT_PRESET),
    ("warm_pad", WARM_PAD_PRESET),
    ("acid_bass", ACID_BASS_PRESET),
    ("super_saw", SUPER_SAW_PRESET),
    ("glass_pluck", GLASS_PLUCK_PRESET),
    ("legato_lead", LEGATO_LEAD_PRESET),
    ("wobble", WOBBLE_PRESET),
    ("step_gate", STEP_GATE_PRESET),
];

/// Initialization preset - one saw through an open filter.
const INIT_PRESET: &str = r#"
name = "Init"
description = "Single saw oscillator, open filter, no modulation"
category = "init"

[patch.osc1]
waveform = "saw"

[patch.filter]
cutoff_hz = 12000.0
"#;

const WARM_PAD_PRESET: &str = r#"
name = "Warm Pad"
description = "Slow detuned saws with a breathing filter"
category = "pad"

[patch]
osc_mix = 0.4
master_gain = 0.4

[patch.osc1]
waveform = "saw"

[patch.osc2]
waveform = "saw"
fine_cents = 7.0

[patch.filter]
cutoff_hz = 1800.0
resonance = 0.6
keytrack = 0.5

[patch.amp_env]
attack_s = 0.9
decay_s = 1.0
sustain = 0.8
release_s = 2.0
velocity_sensitivity = 0.3

[patch.lfo1]
waveform = "sine"
rate_hz = 0.2
fade_in_s = 1.5

[patch.unison]
enabled = true
voices = 4
detune_cents = 18.0
stereo_spread = 0.8
blend = 0.8

[[patch.mod_slots]]
slot = 0
source = "lfo1"
destination = "filter_cutoff"
depth = 0.15

[[patch.mod_slots]]
slot = 1
source = "aftertouch"
destination = "filter_cutoff"
depth = 0.3
"#;

const ACID_BASS_PRESET: &str = r#"
name = "Acid Bass"
description = "Resonant square bass with a snappy filter envelope and slide"
category = "bass"

[patch]
voice_mode = "legato"
glide_s = 0.06
polyphony = 1

[patch.osc1]
waveform = "square"
octave = -1

[patch.filter]
cutoff_hz = 320.0
resonance = 0.12
drive = 0.5
saturation = "tube"
env_amount_hz = 2800.0

[patch.amp_env]
attack_s = 0.002
decay_s = 0.2
sustain = 0.6
release_s = 0.08

[patch.filter_env]
attack_s = 0.001
decay_s = 0.18
sustain = 0.0
release_s = 0.1

[[patch.mod_slots]]
slot = 0
source = "velocity"
destination = "filter_resonance"
depth = -0.3
"#;

const SUPER_SAW_PRESET: &str = r#"
name = "Super Saw"
description = "Eight-voice unison stack, wide and bright"
category = "lead"

[patch]
master_gain = 0.35

[patch.osc1]
waveform = "saw"

[patch.filter]
cutoff_hz = 6000.0

[patch.amp_env]
attack_s = 0.01
decay_s = 0.3
sustain = 0.9
release_s = 0.4

[patch.unison]
enabled = true
voices = 8
detune_cents = 35.0
stereo_spread = 1.0
blend = 0.7

[[patch.mod_slots]]
slot = 0
source = "mod_wheel"
destination = "unison_detune"
depth = 0.8
"#;

const GLASS_PLUCK_PRESET: &str = r#"
name = "Glass Pluck"
description = "Sine and triangle with a short decay and keyboard-tracked brightness"
category = "pluck"

[patch]
osc_mix = 0.5

[patch.osc1]
waveform = "sine"

[patch.osc2]
waveform = "triangle"
octave = 1

[patch.filter]
cutoff_hz = 2500.0
keytrack = 1.0
env_amount_hz = 3000.0

[patch.amp_env]
attack_s = 0.001
decay_s = 0.45
sustain = 0.0
release_s = 0.3
curve = "exponential"

[patch.filter_env]
attack_s = 0.0
decay_s = 0.25
sustain = 0.0
release_s = 0.2

[[patch.mod_slots]]
slot = 0
source = "key_track"
destination = "amplitude"
depth = -0.2
"#;

const LEGATO_LEAD_PRESET: &str = r#"
name = "Legato Lead"
description = "Mono pulse lead with glide and delayed vibrato"
category = "lead"

[patch]
voice_mode = "legato"
glide_s = 0.12
pitch_bend_range = 12.0

[patch.osc1]
waveform = "pulse"
pulse_width = 0.35

[patch.filter]
cutoff_hz = 3200.0
resonance = 0.4

[patch.amp_env]
attack_s = 0.02
decay_s = 0.2
sustain = 0.85
release_s = 0.25

[patch.lfo1]
waveform = "sine"
rate_hz = 5.5
delay_s = 0.4
fade_in_s = 0.6
retrigger = true

[[patch.mod_slots]]
slot = 0
source = "lfo1"
destination = "pitch"
depth = 0.02

[[patch.mod_slots]]
slot = 1
source = "lfo2"
destination = "pulse_width"
depth = 0.3
"#;

const WOBBLE_PRESET: &str = r#"
name = "Wobble"
description = "Tempo-synced LFO sweeping a low-pass filter, eighth-note triplets"
category = "bass"

[patch]
osc_mix = 0.5

[patch.osc1]
waveform = "saw"
octave = -1

[patch.osc2]
waveform = "square"
octave = -1
fine_cents = -6.0

[patch.filter]
cutoff_hz = 400.0
resonance = 0.25
drive = 0.4

[patch.lfo1]
waveform = "triangle"
sync = { cycles = 1, beats = 2, modifier = "triplet" }

[[patch.mod_slots]]
slot = 0
source = "lfo1"
destination = "filter_cutoff"
depth = 0.6
bipolar = false
curve = "exponential"
"#;

const STEP_GATE_PRESET: &str = r#"
name = "Step Gate"
description = "Step sequencer chopping a pad into sixteenth-note rhythms"
category = "texture"

[patch]
master_gain = 0.45

[patch.osc1]
waveform = "saw"

[patch.osc2]
waveform = "saw"
semitone = 7

[patch.amp_env]
attack_s = 0.05
sustain = 1.0
release_s = 0.5

[patch.step_sequencer]
steps = [0.0, -1.0, -0.4, -1.0, 0.0, 0.0, -1.0, -0.7, 0.0, -1.0, -0.4, -1.0, 0.0, -1.0, -0.2, -0.8]
length = 16
steps_per_beat = 4

[patch.random]
rate_hz = 2.0
smooth = true

[[patch.mod_slots]]
slot = 0
source = "step_sequencer"
destination = "amplitude"
depth = 1.0
bipolar = true

[[patch.mod_slots]]
slot = 1
source = "random"
destination = "pan"
depth = 0.4
"#;

/// Get all factory presets.
///
/// # Example
///
/// ```rust
/// use polyvox_config::factory_presets;
///
/// let presets = factory_presets();
/// for preset in &presets {
///     println!("{}: {:?}", preset.name, preset.description);
/// }
/// ```
pub fn factory_presets() -> Vec<Preset> {
    FACTORY_PRESETS_TOML
        .iter()
        .filter_map(|(_, toml)| Preset::from_toml(toml).ok())
        .collect()
}

/// Get a factory preset by name.
///
/// Matches the internal name (`"acid_bass"`) or the display name
/// (`"Acid Bass"`), case-insensitively.
///
/// # Example
///
/// ```rust
/// use polyvox_config::get_factory_preset;
///
/// let preset = get_factory_preset("acid_bass").unwrap();
/// assert_eq!(preset.name, "Acid Bass");
/// ```
pub fn get_factory_preset(name: &str) -> Option<Preset> {
    FACTORY_PRESETS_TOML
        .iter()
        .find(|(id, _)| id.eq_ignore_ascii_case(name))
        .and_then(|(_, toml)| Preset::from_toml(toml).ok())
        .or_else(|| {
            factory_presets()
                .into_iter()
                .find(|p| p.name.eq_ignore_ascii_case(name))
        })
}

/// Get the internal names of all factory presets.
pub fn factory_preset_names() -> Vec<&'static str> {
    FACTORY_PRESETS_TOML.iter().map(|(name, _)| *name).collect()
}

/// Check if a name refers to a factory preset (case-insensitive).
///
/// # Example
///
/// ```rust
/// use polyvox_config::is_factory_preset;
///
/// assert!(is_factory_preset("wobble"));
/// assert!(is_factory_preset("Super Saw"));
/// assert!(!is_factory_preset("my_custom"));
/// ```
pub fn is_factory_preset(name: &str) -> bool {
    get_factory_preset(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PresetCategory;
    use crate::validation::validate_preset;
    use polyvox_synth::{ModSource, SyncDivision, VoiceMode};

    #[test]
    fn test_all_factory_presets_valid() {
        for (name, toml) in FACTORY_PRESETS_TOML {
            let result = Preset::from_toml(toml);
            assert!(result.is_ok(), "factory preset '{}' should parse: {:?}", name, result);

            let preset = result.unwrap();
            assert!(preset.description.is_some(), "preset '{}' should have a description", name);
            assert_eq!(validate_preset(&preset), Ok(()), "preset '{}'", name);
        }
        assert_eq!(factory_presets().len(), FACTORY_PRESET_NAMES.len());
    }

    #[test]
    fn test_names_match_table() {
        assert_eq!(factory_preset_names(), FACTORY_PRESET_NAMES.to_vec());
    }

    #[test]
    fn test_get_factory_preset() {
        let preset = get_factory_preset("ACID_BASS").expect("acid_bass should exist");
        assert_eq!(preset.name, "Acid Bass");
        assert_eq!(preset.category, PresetCategory::Bass);
        assert_eq!(preset.patch.voice_mode, VoiceMode::Legato);

        let preset = get_factory_preset("legato lead").expect("display name lookup");
        assert_eq!(preset.patch.glide_s, 0.12);

        assert!(get_factory_preset("nonexistent").is_none());
    }

    #[test]
    fn test_wobble_is_tempo_synced() {
        let preset = get_factory_preset("wobble").unwrap();
        let sync = preset.patch.lfo1.sync.expect("synced");
        assert_eq!(sync, "1/2t".parse::<SyncDivision>().unwrap());
    }

    #[test]
    fn test_step_gate_routes_sequencer() {
        let patch = get_factory_preset("step_gate").unwrap().patch;
        assert_eq!(patch.mod_slots[0].source, ModSource::StepSequencer);
        assert!(patch.mod_slots[0].bipolar);
        assert_eq!(patch.step_sequencer.steps[1], -1.0);
    }
}
