//! Error type for configuration-path string parsing.
//!
//! The audio path never returns errors (invalid values are clamped); this
//! type only surfaces when a host parses user-facing names such as waveform
//! or tempo-division labels.

/// A user-facing name could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError {
    /// What was being parsed (e.g. `"LFO waveform"`).
    pub expected: &'static str,
}

impl ParseError {
    /// Create a parse error for the given kind of value.
    pub const fn new(expected: &'static str) -> Self {
        Self { expected }
    }
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unrecognized {}", self.expected)
    }
}

impl core::error::Error for ParseError {}
