//! Common types shared by the per-entity energy models.

use rand::Rng;

/// Multiplicative random factor applied to demand for realism.
///
/// The factor is drawn uniformly from `[low, high]` using a caller-supplied
/// random source, so a seeded `StdRng` makes runs reproducible. Equal bounds
/// disable sampling entirely and always return `low`.
///
/// # Examples
///
/// ```
/// use p2p_energy_sim::devices::types::Jitter;
/// use rand::{SeedableRng, rngs::StdRng};
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let f = Jitter::new(0.8, 1.2).sample(&mut rng);
/// assert!((0.8..=1.2).contains(&f));
/// assert_eq!(Jitter::NONE.sample(&mut rng), 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jitter {
    low: f64,
    high: f64,
}

impl Jitter {
    /// No jitter: always a factor of 1.0.
    pub const NONE: Jitter = Jitter {
        low: 1.0,
        high: 1.0,
    };

    /// Creates a jitter range `[low, high]`.
    ///
    /// # Panics
    ///
    /// Panics if `low` is negative or `low > high`.
    pub fn new(low: f64, high: f64) -> Self {
        assert!(low >= 0.0 && low <= high, "jitter range must satisfy 0 <= low <= high");
        Self { low, high }
    }

    /// Draws one factor. Consumes no randomness when the range is degenerate.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.low == self.high {
            return self.low;
        }
        rng.random_range(self.low..=self.high)
    }
}

impl Default for Jitter {
    fn default() -> Self {
        Self::new(0.8, 1.2)
    }
}
