//! State Synchronization
//!
//! Incremental per-tick ship records from the authoritative simulation to
//! its receivers.
//!
//! ## Module Structure
//!
//! - `protocol`: Record flags, patch variants, compact and serde encodings
//! - `encoder`: Builds payloads from the simulation's per-tick flags
//! - `replica`: Receiver-side mirror that applies payloads

pub mod protocol;
pub mod encoder;
pub mod replica;

// Re-export key types
pub use protocol::{ShipPatch, ShipRecord, TickPayload, DecodeError};
pub use encoder::SyncEncoder;
pub use replica::{Replica, ReplicaError};
