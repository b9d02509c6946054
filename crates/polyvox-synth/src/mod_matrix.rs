//! Modulation matrix for flexible parameter routing.
//!
//! A fixed array of [`MOD_SLOTS`] slots maps sources to destinations. Each
//! block the [`ModulationRouter`] reads every enabled slot's source from a
//! [`SourceValues`] snapshot, maps it to the slot's polarity, shapes it with
//! the slot's [`ResponseCurve`], scales it by depth and sums it into the
//! destination. Slots are independent: several may target one destination.
//!
//! Destination values are unitless sums in roughly [-1, 1]. The voice
//! scales them into parameter units:
//!
//! | destination | unit of 1.0 |
//! |---|---|
//! | `Pitch`, `Osc1Pitch`, `Osc2Pitch` | [`PITCH_MOD_SEMITONES`] semitones |
//! | `PulseWidth` | [`PULSE_WIDTH_MOD`] of duty cycle |
//! | `FilterCutoff` | [`CUTOFF_MOD_OCTAVES`] octaves |
//! | `Lfo1Rate`, `Lfo2Rate` | [`LFO_RATE_MOD_OCTAVES`] octaves |
//! | `Amplitude`, `UnisonDetune` | gain factor `1 + v` |
//! | `OscMix`, `FilterResonance`, `FilterDrive`, `Pan` | added to the base value |

use core::str::FromStr;

pub use polyvox_core::svf::CUTOFF_MOD_OCTAVES;
use polyvox_core::{ParseError, Polarity, ResponseCurve};

use crate::sources::{ModSource, SourceValues};

/// Number of routing slots.
pub const MOD_SLOTS: usize = 16;
/// Semitones of pitch per unit of pitch modulation.
pub const PITCH_MOD_SEMITONES: f32 = 12.0;
/// Duty-cycle change per unit of pulse-width modulation.
pub const PULSE_WIDTH_MOD: f32 = 0.5;
/// Octaves of LFO rate per unit of rate modulation.
pub const LFO_RATE_MOD_OCTAVES: f32 = 4.0;

/// Modulation destination identifiers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ModDestination {
    /// Both oscillators' pitch
    #[default]
    Pitch,
    /// Oscillator 1 pitch
    Osc1Pitch,
    /// Oscillator 2 pitch
    Osc2Pitch,
    /// Pulse width of both oscillators
    PulseWidth,
    /// Oscillator mix
    OscMix,
    /// Filter cutoff frequency
    FilterCutoff,
    /// Filter resonance
    FilterResonance,
    /// Filter drive
    FilterDrive,
    /// Amplitude / VCA level
    Amplitude,
    /// Pan position
    Pan,
    /// LFO 1 rate
    Lfo1Rate,
    /// LFO 2 rate
    Lfo2Rate,
    /// Unison detune spread
    UnisonDetune,
}

impl ModDestination {
    /// Number of destinations.
    pub const COUNT: usize = 13;

    /// All destinations, in index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Pitch,
        Self::Osc1Pitch,
        Self::Osc2Pitch,
        Self::PulseWidth,
        Self::OscMix,
        Self::FilterCutoff,
        Self::FilterResonance,
        Self::FilterDrive,
        Self::Amplitude,
        Self::Pan,
        Self::Lfo1Rate,
        Self::Lfo2Rate,
        Self::UnisonDetune,
    ];

    /// Position in [`ALL`](Self::ALL).
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Identifier used in preset files.
    pub fn name(self) -> &'static str {
        match self {
            Self::Pitch => "pitch",
            Self::Osc1Pitch => "osc1_pitch",
            Self::Osc2Pitch => "osc2_pitch",
            Self::PulseWidth => "pulse_width",
            Self::OscMix => "osc_mix",
            Self::FilterCutoff => "filter_cutoff",
            Self::FilterResonance => "filter_resonance",
            Self::FilterDrive => "filter_drive",
            Self::Amplitude => "amplitude",
            Self::Pan => "pan",
            Self::Lfo1Rate => "lfo1_rate",
            Self::Lfo2Rate => "lfo2_rate",
            Self::UnisonDetune => "unison_detune",
        }
    }
}

impl core::fmt::Display for ModDestination {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

const ALIASES: [(&str, ModDestination); 4] = [
    ("cutoff", ModDestination::FilterCutoff),
    ("resonance", ModDestination::FilterResonance),
    ("amp", ModDestination::Amplitude),
    ("volume", ModDestination::Amplitude),
];

impl FromStr for ModDestination {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .map(|&dest| (dest.name(), dest))
            .chain(ALIASES)
            .find(|(alias, _)| alias.eq_ignore_ascii_case(s))
            .map(|(_, dest)| dest)
            .ok_or(ParseError::new("modulation destination"))
    }
}

/// A single routing entry.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ModulationSlot {
    /// Disabled slots are skipped.
    pub enabled: bool,
    /// Where the signal comes from.
    pub source: ModSource,
    /// What it modulates.
    pub destination: ModDestination,
    /// Scale, -1.0 to 1.0; negative inverts.
    pub depth: f32,
    /// Map the source to -1..1 (true) or 0..1 (false) before shaping.
    pub bipolar: bool,
    /// Shaping applied before depth.
    pub curve: ResponseCurve,
}

impl Default for ModulationSlot {
    fn default() -> Self {
        Self {
            enabled: false,
            source: ModSource::Lfo1,
            destination: ModDestination::Pitch,
            depth: 0.0,
            bipolar: true,
            curve: ResponseCurve::Linear,
        }
    }
}

impl ModulationSlot {
    /// Enabled slot that keeps the source's native polarity.
    pub fn new(source: ModSource, destination: ModDestination, depth: f32) -> Self {
        Self {
            enabled: true,
            source,
            destination,
            depth: clamp_depth(depth),
            bipolar: source.polarity() == Polarity::Bipolar,
            curve: ResponseCurve::Linear,
        }
    }

    /// Force bipolar (`true`) or unipolar (`false`) mapping.
    pub fn with_bipolar(mut self, bipolar: bool) -> Self {
        self.bipolar = bipolar;
        self
    }

    /// Set the response curve.
    pub fn with_curve(mut self, curve: ResponseCurve) -> Self {
        self.curve = curve;
        self
    }

    /// Polarity requested by this slot.
    pub fn polarity(&self) -> Polarity {
        Polarity::from_bipolar(self.bipolar)
    }

    /// Whether the slot contributes anything.
    pub fn is_active(&self) -> bool {
        self.enabled && self.depth != 0.0
    }

    /// Contribution of this slot for the given snapshot.
    #[inline]
    pub fn contribution(&self, sources: &SourceValues<'_>) -> f32 {
        let raw = sources.get(self.source);
        let mapped = self.polarity().convert(raw, self.source.polarity());
        self.curve.apply(mapped) * clamp_depth(self.depth)
    }
}

fn clamp_depth(depth: f32) -> f32 {
    if depth.is_finite() {
        depth.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Per-destination sums produced by [`ModulationRouter::process`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DestinationValues([f32; ModDestination::COUNT]);

impl DestinationValues {
    /// Summed modulation for `destination`.
    #[inline]
    pub fn get(&self, destination: ModDestination) -> f32 {
        self.0[destination.index()]
    }

    /// Add `amount` to `destination`.
    #[inline]
    pub fn add(&mut self, destination: ModDestination, amount: f32) {
        self.0[destination.index()] += amount;
    }

    /// Pitch offset for oscillator 1 in semitones.
    pub fn osc1_semitones(&self) -> f32 {
        (self.get(ModDestination::Pitch) + self.get(ModDestination::Osc1Pitch))
            * PITCH_MOD_SEMITONES
    }

    /// Pitch offset for oscillator 2 in semitones.
    pub fn osc2_semitones(&self) -> f32 {
        (self.get(ModDestination::Pitch) + self.get(ModDestination::Osc2Pitch))
            * PITCH_MOD_SEMITONES
    }

    /// Amplitude factor, never negative.
    pub fn amplitude_factor(&self) -> f32 {
        (1.0 + self.get(ModDestination::Amplitude)).max(0.0)
    }

    /// Unison spread factor, never negative.
    pub fn unison_detune_factor(&self) -> f32 {
        (1.0 + self.get(ModDestination::UnisonDetune)).max(0.0)
    }

    /// Whether every destination is zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }
}

/// Modulation router with [`MOD_SLOTS`] fixed slots.
///
/// # Example
///
/// ```rust
/// use polyvox_synth::{CcTable, ModDestination, ModSource, ModulationRouter, ModulationSlot, SourceValues};
///
/// let mut router = ModulationRouter::new();
/// router.set_slot(0, ModulationSlot::new(ModSource::Lfo1, ModDestination::FilterCutoff, 0.5));
/// router.set_slot(1, ModulationSlot::new(ModSource::FilterEnvelope, ModDestination::FilterCutoff, 0.3));
///
/// let cc = CcTable::default();
/// let mut sources = SourceValues::new(&cc);
/// sources.lfo1 = 1.0;
/// sources.filter_envelope = 0.5;
///
/// let out = router.process(&sources);
/// assert!((out.get(ModDestination::FilterCutoff) - 0.65).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModulationRouter {
    slots: [ModulationSlot; MOD_SLOTS],
}

impl ModulationRouter {
    /// Create a router with every slot disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Router pre-loaded with `slots`.
    pub fn from_slots(slots: [ModulationSlot; MOD_SLOTS]) -> Self {
        Self { slots }
    }

    /// Write slot `index`. Out-of-range indices are ignored.
    pub fn set_slot(&mut self, index: usize, slot: ModulationSlot) {
        if let Some(dst) = self.slots.get_mut(index) {
            *dst = ModulationSlot {
                depth: clamp_depth(slot.depth),
                ..slot
            };
        }
    }

    /// Read slot `index`.
    pub fn slot(&self, index: usize) -> Option<&ModulationSlot> {
        self.slots.get(index)
    }

    /// All slots, enabled or not.
    pub fn slots(&self) -> &[ModulationSlot; MOD_SLOTS] {
        &self.slots
    }

    /// Reset slot `index` to the disabled default.
    pub fn clear_slot(&mut self, index: usize) {
        self.set_slot(index, ModulationSlot::default());
    }

    /// Disable every slot.
    pub fn clear_all(&mut self) {
        self.slots = [ModulationSlot::default(); MOD_SLOTS];
    }

    /// Number of enabled slots.
    pub fn active_slot_count(&self) -> usize {
        self.slots.iter().filter(|s| s.enabled).count()
    }

    /// Evaluate every enabled slot and sum per destination.
    #[inline]
    pub fn process(&self, sources: &SourceValues<'_>) -> DestinationValues {
        let mut out = DestinationValues::default();
        for slot in self.slots.iter().filter(|s| s.enabled) {
            out.add(slot.destination, slot.contribution(sources));
        }
        out
    }

    /// Summed modulation for a single destination.
    pub fn modulation(&self, destination: ModDestination, sources: &SourceValues<'_>) -> f32 {
        self.slots
            .iter()
            .filter(|s| s.enabled && s.destination == destination)
            .map(|s| s.contribution(sources))
            .sum()
    }
}
