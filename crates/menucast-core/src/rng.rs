//! Splittable RNG keys for shuffling timestamps.
//!
//! A run owns one root key. Each epoch gets its own key via [`RngKey::split`],
//! and each epoch key splits again into a training and an evaluation key, so a
//! seeded run replays the same visiting orders while an unseeded run draws its
//! root from OS entropy.

use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// An RNG key for deterministic random number generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RngKey(pub u64);

impl RngKey {
    pub fn new(seed: u64) -> Self {
        RngKey(seed)
    }

    /// Draw a fresh root key from OS entropy.
    pub fn from_entropy() -> Self {
        RngKey(ChaCha8Rng::from_entropy().next_u64())
    }

    /// Seeded key when `seed` is set, entropy otherwise.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::new)
    }

    /// Split this key into `n` independent keys.
    pub fn split(self, n: usize) -> Vec<RngKey> {
        if n == 0 {
            return Vec::new();
        }
        if n == 1 {
            return vec![self];
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.0);
        (0..n).map(|_| RngKey(rng.next_u64())).collect()
    }

    pub fn split_two(self) -> (RngKey, RngKey) {
        let keys = self.split(2);
        (keys[0], keys[1])
    }

    /// Uniform random permutation of `0..n`.
    pub fn permutation(self, n: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut ChaCha8Rng::seed_from_u64(self.0));
        order
    }

    pub fn seed(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_key_split() {
        let keys = RngKey::new(42).split(5);
        assert_eq!(keys.len(), 5);

        for i in 0..keys.len() {
            for j in (i + 1)..keys.len() {
                assert_ne!(keys[i].0, keys[j].0, "Keys should be unique");
            }
        }
    }

    #[test]
    fn test_seeded_epoch_orders_repeat() {
        // the chain the trainer walks: split off an epoch key, permute with it
        fn epoch_orders(mut key: RngKey) -> Vec<Vec<usize>> {
            (0..3)
                .map(|_| {
                    let (next, epoch) = key.split_two();
                    key = next;
                    epoch.permutation(8)
                })
                .collect()
        }

        assert_eq!(RngKey::from_optional_seed(Some(9)), RngKey::new(9));
        let first = epoch_orders(RngKey::from_optional_seed(Some(9)));
        assert_eq!(first, epoch_orders(RngKey::from_optional_seed(Some(9))));
        assert_ne!(first[0], first[1]);
    }

    #[test]
    fn test_permutation_covers_every_index() {
        let mut order = RngKey::new(7).permutation(50);
        assert_eq!(order.len(), 50);
        order.sort_unstable();
        assert_eq!(order, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_permutation_is_reproducible() {
        assert_eq!(RngKey::new(3).permutation(20), RngKey::new(3).permutation(20));
        assert!(RngKey::new(3).permutation(0).is_empty());
    }
}
