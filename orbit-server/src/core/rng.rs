//! Deterministic Random Number Generator
//!
//! Linear congruential generator shared by client and server.
//! Given the same seed, both sides draw the identical sequence.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

/// Multiplier of the generator.
const LCG_MULTIPLIER: u64 = 1_103_515_245;

/// Increment of the generator.
const LCG_INCREMENT: u64 = 12_345;

/// Modulus of the generator (2^32).
const LCG_MODULUS: u64 = 0x1_0000_0000;

/// Deterministic PRNG: `state = (1103515245 * state + 12345) mod 2^32`.
///
/// # Determinism Guarantee
///
/// Only integer arithmetic is used to advance the state, so the sequence is
/// identical on every platform.
///
/// # Example
///
/// ```
/// use orbit::core::rng::DeterministicRng;
///
/// let mut rng = DeterministicRng::new(0);
/// assert_eq!(rng.next_u32(), 12345);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: u32,
}

impl DeterministicRng {
    /// Create a new RNG from a seed. Only the low 32 bits are used.
    pub fn new(seed: u64) -> Self {
        Self { state: seed as u32 }
    }

    /// Create RNG from match parameters.
    ///
    /// The seed is derived from the match id and the sorted player ids, so
    /// every participant computes the same one.
    pub fn from_match_params(match_id: &[u8; 16], player_ids: &[u32]) -> Self {
        Self::new(derive_match_seed(match_id, player_ids))
    }

    /// Advance and return the raw 32-bit state.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let next = (LCG_MULTIPLIER * self.state as u64 + LCG_INCREMENT) % LCG_MODULUS;
        self.state = next as u32;
        self.state
    }

    /// Uniform value in `[0, 1)`.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / LCG_MODULUS as f64
    }

    /// Random integer in `[0, max)`.
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        (self.next_f64() * max as f64) as u32
    }

    /// Random integer in `[min, max]`.
    #[inline]
    pub fn next_int_range(&mut self, min: i32, max: i32) -> i32 {
        if min >= max {
            return min;
        }
        let range = (max - min + 1) as u32;
        min + self.next_int(range) as i32
    }

    /// Shuffle a slice in place using Fisher-Yates.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        let len = slice.len();
        for i in (1..len).rev() {
            let j = self.next_int((i + 1) as u32) as usize;
            slice.swap(i, j);
        }
    }

    /// Select a random element from a slice.
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            None
        } else {
            let idx = self.next_int(slice.len() as u32) as usize;
            slice.get(idx)
        }
    }

    /// Get current state (for checkpointing/hashing).
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Restore from saved state.
    pub fn set_state(&mut self, state: u32) {
        self.state = state;
    }
}

/// Derive a match seed from the match id and player ids.
///
/// `player_ids` MUST be sorted by the caller.
pub fn derive_match_seed(match_id: &[u8; 16], player_ids: &[u32]) -> u64 {
    let mut hasher = Sha256::new();

    // Domain separator
    hasher.update(b"ORBIT_SEED_V1");
    hasher.update(match_id);
    for pid in player_ids {
        hasher.update(pid.to_le_bytes());
    }

    let hash = hasher.finalize();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash[0..8]);
    u64::from_le_bytes(seed)
}

// =============================================================================
// TESTS
// =============================================================================
