//! Tempo-sync divisions for LFOs and other clocked modulators.
//!
//! A division label `"n/d"` reads as **n cycles every d beats**. At 120 BPM
//! (2 beats per second) `"1/4"` completes one cycle every four beats, i.e.
//! 0.5 Hz, and `"1/1"` completes one cycle per beat, i.e. 2 Hz.
//!
//! Modifiers stretch the cycle length:
//!
//! | Suffix | Cycle length |
//! |--------|--------------|
//! | none | `d / n` beats |
//! | `d`, `.`, ` dotted` | `d / n × 3/2` beats |
//! | `t`, ` triplet` | `d / n × 2/3` beats |
//!
//! The rate follows directly: `rate_hz = (bpm / 60) / beats_per_cycle`.

use core::str::FromStr;

use crate::error::ParseError;

/// Lowest tempo accepted by [`SyncDivision::to_hz`] and friends.
pub const MIN_BPM: f32 = 1.0;
/// Highest tempo accepted by [`SyncDivision::to_hz`] and friends.
pub const MAX_BPM: f32 = 999.0;

/// Rhythmic modifier applied to a division's cycle length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DivisionModifier {
    /// Plain division.
    #[default]
    Straight,
    /// Cycle is 3/2 as long.
    Dotted,
    /// Cycle is 2/3 as long.
    Triplet,
}

impl DivisionModifier {
    /// Multiplier applied to the straight cycle length in beats.
    pub fn length_factor(self) -> f32 {
        match self {
            Self::Straight => 1.0,
            Self::Dotted => 3.0 / 2.0,
            Self::Triplet => 2.0 / 3.0,
        }
    }
}

/// A tempo-sync division such as `"1/4"`, `"1/8 dotted"` or `"1/16t"`.
///
/// # Example
///
/// ```rust
/// use polyvox_core::SyncDivision;
///
/// let quarter: SyncDivision = "1/4".parse().unwrap();
/// assert!((quarter.to_hz(120.0) - 0.5).abs() < 1e-6);
///
/// let dotted: SyncDivision = "1/8 dotted".parse().unwrap();
/// assert!((dotted.beats_per_cycle() - 12.0).abs() < 1e-6);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SyncDivision {
    /// Cycles per group (the `n` in `n/d`). Never zero.
    pub cycles: u8,
    /// Beats per group (the `d` in `n/d`). Never zero.
    pub beats: u8,
    /// Dotted / triplet modifier.
    #[cfg_attr(feature = "serde", serde(default))]
    pub modifier: DivisionModifier,
}

impl Default for SyncDivision {
    fn default() -> Self {
        Self::ONE_BEAT
    }
}

impl SyncDivision {
    /// `"1/1"`: one cycle per beat.
    pub const ONE_BEAT: Self = Self::straight(1, 1);
    /// `"1/4"`: one cycle every four beats.
    pub const QUARTER: Self = Self::straight(1, 4);

    /// Labels offered to UIs, slowest first.
    pub const LABELS: [&'static str; 16] = [
        "1/32", "1/16", "1/16d", "1/8", "1/8d", "1/8t", "1/4", "1/4d", "1/4t", "1/2", "1/2d",
        "1/2t", "1/1", "1/1t", "2/1", "4/1",
    ];

    /// Build a straight division. Zero components are raised to 1.
    pub const fn straight(cycles: u8, beats: u8) -> Self {
        Self {
            cycles: if cycles == 0 { 1 } else { cycles },
            beats: if beats == 0 { 1 } else { beats },
            modifier: DivisionModifier::Straight,
        }
    }

    /// Same division with a different modifier.
    pub const fn with_modifier(mut self, modifier: DivisionModifier) -> Self {
        self.modifier = modifier;
        self
    }

    /// Length of one cycle in beats.
    pub fn beats_per_cycle(&self) -> f32 {
        let cycles = self.cycles.max(1) as f32;
        let beats = self.beats.max(1) as f32;
        beats / cycles * self.modifier.length_factor()
    }

    /// Rate in Hz at the given tempo: `(bpm / 60) / beats_per_cycle`.
    ///
    /// BPM is clamped to [`MIN_BPM`]..=[`MAX_BPM`].
    pub fn to_hz(&self, bpm: f32) -> f32 {
        let beats_per_second = bpm.clamp(MIN_BPM, MAX_BPM) / 60.0;
        beats_per_second / self.beats_per_cycle()
    }

    /// Cycle length in seconds at the given tempo.
    pub fn to_seconds(&self, bpm: f32) -> f32 {
        1.0 / self.to_hz(bpm)
    }
}

impl FromStr for SyncDivision {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ERR: ParseError = ParseError::new("tempo division");

        let s = s.trim();
        let (body, modifier) = split_modifier(s);
        let (n, d) = body.split_once('/').ok_or(ERR)?;
        let cycles: u8 = n.trim().parse().map_err(|_| ERR)?;
        let beats: u8 = d.trim().parse().map_err(|_| ERR)?;
        if cycles == 0 || beats == 0 {
            return Err(ERR);
        }
        Ok(Self::straight(cycles, beats).with_modifier(modifier))
    }
}

fn split_modifier(s: &str) -> (&str, DivisionModifier) {
    const WORDS: [(&str, DivisionModifier); 2] = [
        ("dotted", DivisionModifier::Dotted),
        ("triplet", DivisionModifier::Triplet),
    ];
    for (word, modifier) in WORDS {
        let Some(at) = s.len().checked_sub(word.len()).filter(|at| *at > 0) else {
            continue;
        };
        if let (Some(head), Some(tail)) = (s.get(..at), s.get(at..))
            && tail.eq_ignore_ascii_case(word)
        {
            return (head.trim_end(), modifier);
        }
    }
    match s.as_bytes().last() {
        Some(b'd' | b'D' | b'.') => (&s[..s.len() - 1], DivisionModifier::Dotted),
        Some(b't' | b'T') => (&s[..s.len() - 1], DivisionModifier::Triplet),
        _ => (s, DivisionModifier::Straight),
    }
}

impl core::fmt::Display for SyncDivision {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.cycles, self.beats)?;
        match self.modifier {
            DivisionModifier::Straight => Ok(()),
            DivisionModifier::Dotted => f.write_str("d"),
            DivisionModifier::Triplet => f.write_str("t"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_at_120_is_half_hertz() {
        let div: SyncDivision = "1/4".parse().unwrap();
        assert_eq!(div, SyncDivision::QUARTER);
        assert!((div.to_hz(120.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_one_cycle_per_beat() {
        assert!((SyncDivision::ONE_BEAT.to_hz(120.0) - 2.0).abs() < 1e-6);
        assert!((SyncDivision::ONE_BEAT.to_hz(60.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dotted_and_triplet_lengths() {
        let dotted: SyncDivision = "1/8 dotted".parse().unwrap();
        assert_eq!(dotted.modifier, DivisionModifier::Dotted);
        assert!((dotted.beats_per_cycle() - 12.0).abs() < 1e-6);

        let triplet: SyncDivision = "1/4t".parse().unwrap();
        assert!((triplet.beats_per_cycle() - 8.0 / 3.0).abs() < 1e-6);
        assert!((triplet.to_hz(120.0) - 0.75).abs() < 1e-6);

        let dot: SyncDivision = "1/2.".parse().unwrap();
        assert_eq!(dot.modifier, DivisionModifier::Dotted);
    }

    #[test]
    fn test_multi_cycle_divisions() {
        let fast: SyncDivision = "4/1".parse().unwrap();
        assert!((fast.to_hz(120.0) - 8.0).abs() < 1e-5);
    }

    #[test]
    fn test_all_labels_parse_and_display() {
        for label in SyncDivision::LABELS {
            let div: SyncDivision = label.parse().unwrap();
            let mut buf = [0u8; 8];
            let written = {
                use core::fmt::Write;
                let mut w = SliceWriter { buf: &mut buf, len: 0 };
                write!(w, "{div}").unwrap();
                w.len
            };
            assert_eq!(core::str::from_utf8(&buf[..written]).unwrap(), label);
        }
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("quarter".parse::<SyncDivision>().is_err());
        assert!("0/4".parse::<SyncDivision>().is_err());
        assert!("1/".parse::<SyncDivision>().is_err());
    }

    #[test]
    fn test_multibyte_labels_are_errors() {
        assert!("aé12345".parse::<SyncDivision>().is_err());
        assert!("1/4é".parse::<SyncDivision>().is_err());
        assert!("ééé dotted".parse::<SyncDivision>().is_err());
        assert!("é".parse::<SyncDivision>().is_err());
    }

    #[test]
    fn test_bpm_clamped() {
        assert!(SyncDivision::ONE_BEAT.to_hz(0.0) > 0.0);
    }

    struct SliceWriter<'a> {
        buf: &'a mut [u8],
        len: usize,
    }

    impl core::fmt::Write for SliceWriter<'_> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            let end = self.len + s.len();
            if end > self.buf.len() {
                return Err(core::fmt::Error);
            }
            self.buf[self.len..end].copy_from_slice(s.as_bytes());
            self.len = end;
            Ok(())
        }
    }
}
