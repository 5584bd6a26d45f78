//! Deterministic random number generation for seeded deals.
//!
//! Same seed, same shuffle sequence.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Deterministic RNG used for shuffling the deck.
///
/// Uses ChaCha8 for speed while keeping high-quality randomness.
#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha8Rng,
}

impl GameRng {
    /// Create a new RNG with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        use rand::seq::SliceRandom;
        slice.shuffle(&mut self.inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let mut a = GameRng::new(42);
        let mut b = GameRng::new(42);

        let mut xs = vec![1, 2, 3, 4, 5, 6, 7, 8];
        let mut ys = xs.clone();
        a.shuffle(&mut xs);
        b.shuffle(&mut ys);

        assert_eq!(xs, ys);
    }

    #[test]
    fn test_different_seeds() {
        let mut a = GameRng::new(1);
        let mut b = GameRng::new(2);

        let mut xs: Vec<u32> = (0..32).collect();
        let mut ys = xs.clone();
        a.shuffle(&mut xs);
        b.shuffle(&mut ys);

        assert_ne!(xs, ys);
    }
}
