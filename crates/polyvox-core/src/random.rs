//! Deterministic pseudo-random generator for modulation and noise.
//!
//! Marsaglia xorshift32. Cheap, allocation-free, and reproducible from a
//! seed, which keeps renders bit-identical between runs.

/// Xorshift32 generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorShift32 {
    state: u32,
}

impl Default for XorShift32 {
    fn default() -> Self {
        Self::new(0x1234_5678)
    }
}

impl XorShift32 {
    /// Create a generator. A zero seed is replaced by a fixed non-zero one
    /// (xorshift has an all-zero fixed point).
    pub const fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9 } else { seed },
        }
    }

    /// Reseed the generator.
    pub fn reseed(&mut self, seed: u32) {
        *self = Self::new(seed);
    }

    /// Next raw 32-bit value.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform value in [0, 1).
    #[inline]
    pub fn next_unipolar(&mut self) -> f32 {
        // Top 24 bits give an exactly representable f32 mantissa.
        (self.next_u32() >> 8) as f32 / 16_777_216.0
    }

    /// Uniform value in [-1, 1).
    #[inline]
    pub fn next_bipolar(&mut self) -> f32 {
        self.next_unipolar() * 2.0 - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = XorShift32::new(42);
        let mut b = XorShift32::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn test_ranges() {
        let mut rng = XorShift32::default();
        for _ in 0..10_000 {
            let u = rng.next_unipolar();
            assert!((0.0..1.0).contains(&u));
            let b = rng.next_bipolar();
            assert!((-1.0..1.0).contains(&b));
        }
    }

    #[test]
    fn test_zero_seed_not_stuck() {
        let mut rng = XorShift32::new(0);
        assert_ne!(rng.next_u32(), 0);
    }
}
