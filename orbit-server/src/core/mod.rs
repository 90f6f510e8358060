//! Core deterministic primitives.
//!
//! Shared by the authoritative simulation and the client replica; every
//! function here must give identical results on both sides.

pub mod angle;
pub mod geometry;
pub mod rng;
pub mod hash;

// Re-export core types
pub use angle::{Centi, CENTI_ONE, FULL_TURN, HALF_TURN};
pub use geometry::Point;
pub use rng::DeterministicRng;
pub use hash::{StateHash, compute_state_hash};
