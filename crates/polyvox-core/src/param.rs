//! Parameter smoothing for zipper-free changes.
//!
//! Modulation is evaluated once per block; consumers that would click on a
//! step change (amplitude, pan) ramp between block values with
//! [`BlockRamp`]. [`SmoothedParam`] provides the one-pole glide used for
//! portamento.
//!
//! ```rust
//! use polyvox_core::SmoothedParam;
//!
//! let mut glide = SmoothedParam::with_config(220.0, 48000.0, 50.0);
//! glide.set_target(440.0);
//! let first = glide.advance();
//! assert!(first > 220.0 && first < 440.0);
//! ```

use libm::expf;

/// One-pole (exponential) parameter smoother.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    /// 1.0 = instant
    coeff: f32,
    sample_rate: f32,
    smoothing_time_ms: f32,
}

impl Default for SmoothedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl SmoothedParam {
    /// Create an unsmoothed parameter (changes apply instantly).
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: 1.0,
            sample_rate: 48000.0,
            smoothing_time_ms: 0.0,
        }
    }

    /// Create a parameter with a sample rate and time constant.
    pub fn with_config(initial: f32, sample_rate: f32, smoothing_time_ms: f32) -> Self {
        let mut param = Self::new(initial);
        param.sample_rate = sample_rate;
        param.smoothing_time_ms = smoothing_time_ms;
        param.recalculate_coeff();
        param
    }

    /// Set the value to smooth toward.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jump to a value with no smoothing.
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// Update the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeff();
    }

    /// Set the time constant in milliseconds (0 = instant).
    pub fn set_smoothing_time_ms(&mut self, time_ms: f32) {
        self.smoothing_time_ms = time_ms.max(0.0);
        self.recalculate_coeff();
    }

    /// Time constant in milliseconds.
    pub fn smoothing_time_ms(&self) -> f32 {
        self.smoothing_time_ms
    }

    /// Advance by one sample and return the smoothed value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Advance by `samples` at once.
    ///
    /// Equivalent to calling [`advance`](Self::advance) `samples` times.
    pub fn advance_by(&mut self, samples: usize) -> f32 {
        if self.coeff >= 1.0 || samples == 0 {
            if samples > 0 {
                self.current = self.target;
            }
            return self.current;
        }
        let remaining = libm::powf(1.0 - self.coeff, samples as f32);
        self.current = self.target + (self.current - self.target) * remaining;
        self.current
    }

    /// Current value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Whether the value has reached its target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        (self.current - self.target).abs() < 1e-6
    }

    fn recalculate_coeff(&mut self) {
        if self.smoothing_time_ms <= 0.0 || self.sample_rate <= 0.0 {
            self.coeff = 1.0;
        } else {
            let samples = self.smoothing_time_ms / 1000.0 * self.sample_rate;
            self.coeff = 1.0 - expf(-1.0 / samples);
        }
    }
}

/// Linear ramp between successive block-rate values.
///
/// Call [`begin_block`](Self::begin_block) with the new target and the block
/// length, then [`advance`](Self::advance) once per sample. The final sample
/// of the block lands exactly on the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockRamp {
    current: f32,
    target: f32,
    step: f32,
    remaining: usize,
}

impl Default for BlockRamp {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl BlockRamp {
    /// Create a ramp resting at `value`.
    pub const fn new(value: f32) -> Self {
        Self {
            current: value,
            target: value,
            step: 0.0,
            remaining: 0,
        }
    }

    /// Start ramping toward `target` over `len` samples.
    pub fn begin_block(&mut self, target: f32, len: usize) {
        self.target = target;
        if len == 0 {
            self.current = target;
            self.step = 0.0;
            self.remaining = 0;
        } else {
            self.step = (target - self.current) / len as f32;
            self.remaining = len;
        }
    }

    /// Jump straight to `value`.
    pub fn reset(&mut self, value: f32) {
        *self = Self::new(value);
    }

    /// Next sample of the ramp.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        if self.remaining > 1 {
            self.current += self.step;
            self.remaining -= 1;
        } else {
            self.current = self.target;
            self.remaining = 0;
        }
        self.current
    }

    /// Current value.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_is_instant() {
        let mut p = SmoothedParam::new(0.0);
        p.set_target(1.0);
        assert_eq!(p.advance(), 1.0);
    }

    #[test]
    fn test_smoothing_converges() {
        let mut p = SmoothedParam::with_config(0.0, 48000.0, 10.0);
        p.set_target(1.0);
        for _ in 0..4800 {
            p.advance();
        }
        assert!(p.is_settled() || (p.get() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_advance_by_matches_loop() {
        let mut a = SmoothedParam::with_config(0.0, 48000.0, 5.0);
        let mut b = a.clone();
        a.set_target(1.0);
        b.set_target(1.0);
        for _ in 0..64 {
            a.advance();
        }
        b.advance_by(64);
        assert!((a.get() - b.get()).abs() < 1e-4);
    }

    #[test]
    fn test_block_ramp_lands_on_target() {
        let mut ramp = BlockRamp::new(0.0);
        ramp.begin_block(1.0, 4);
        let values: [f32; 4] = core::array::from_fn(|_| ramp.advance());
        assert!((values[0] - 0.25).abs() < 1e-6);
        assert_eq!(values[3], 1.0);
        assert_eq!(ramp.advance(), 1.0);
    }
}
