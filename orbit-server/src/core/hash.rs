//! Divergence Fingerprints
//!
//! SHA-256 digests over ships, planets and factories. Server and replicas
//! compare them per tick; any mismatch means the two sides disagree.

use sha2::{Sha256, Digest};
use super::angle::Centi;
use super::geometry::Point;

/// 32-byte SHA-256 digest.
pub type StateHash = [u8; 32];

/// Feeds fixed-width little-endian fields into SHA-256.
///
/// Two digests only match if fields were fed in the same sequence.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Start a digest tagged with `domain`.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Start a digest for a [`Simulation`](crate::game::state::Simulation).
    pub fn for_simulation() -> Self {
        Self::new(b"ORBIT_STATE_V1")
    }

    /// Single byte.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Ids and ticks.
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Seeds and float bits.
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Health and signed counters.
    #[inline]
    pub fn update_i32(&mut self, value: i32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Angles and other hundredths.
    #[inline]
    pub fn update_centi(&mut self, value: Centi) {
        self.update_i32(value);
    }

    /// Floats go in by bit pattern, so `-0.0` and `0.0` differ.
    #[inline]
    pub fn update_f64(&mut self, value: f64) {
        self.update_u64(value.to_bits());
    }

    /// Both coordinates, x first.
    #[inline]
    pub fn update_point(&mut self, value: Point) {
        self.update_f64(value.x);
        self.update_f64(value.y);
    }

    /// One byte, 0 or 1.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Presence byte, then the id if any.
    #[inline]
    pub fn update_opt_u32(&mut self, value: Option<u32>) {
        match value {
            Some(v) => {
                self.update_u8(1);
                self.update_u32(v);
            }
            None => self.update_u8(0),
        }
    }

    /// Consume the hasher.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Digest of one tick: tick number and seed, then whatever `add_entities`
/// feeds in.
pub fn compute_state_hash<F>(tick: u32, rng_seed: u64, add_entities: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_simulation();
    hasher.update_u32(tick);
    hasher.update_u64(rng_seed);
    add_entities(&mut hasher);
    hasher.finalize()
}

// =============================================================================
// TESTS
// =============================================================================
