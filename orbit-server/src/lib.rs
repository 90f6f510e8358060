//! # Orbit Simulation Server
//!
//! Deterministic simulation core for Orbit: planets, ships, combat and the
//! incremental state sync that keeps clients in step with the server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ORBIT SERVER                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── angle.rs    - Hundredth-degree angle arithmetic         │
//! │  ├── geometry.rs - Planet positions and distances            │
//! │  ├── rng.rs      - Deterministic LCG                         │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── graph.rs    - Map data, planet graph, router            │
//! │  ├── ship.rs     - Ship state machine                        │
//! │  ├── combat.rs   - Per-planet combat                         │
//! │  ├── state.rs    - Simulation context                        │
//! │  └── tick.rs     - Authoritative simulation loop             │
//! │                                                              │
//! │  sync/           - Delta protocol (deterministic)            │
//! │  ├── protocol.rs - Ship records and payloads                 │
//! │  ├── encoder.rs  - Per-tick payload encoder                  │
//! │  └── replica.rs  - Receiver-side mirror                      │
//! │                                                              │
//! │  network/        - Runtime (non-deterministic)               │
//! │  └── session.rs  - Match session loop                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/`, `game/` and `sync/` modules are deterministic:
//! - Angles, orbits and speeds are integer hundredths
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - All randomness from the seeded match LCG
//! - Travel is scheduled by absolute tick
//!
//! Given identical map, seed and commands, the simulation produces
//! **identical results** and identical payloads on every run.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod sync;
pub mod network;

// Re-export commonly used types
pub use crate::core::angle::{Centi, CENTI_ONE, FULL_TURN};
pub use crate::core::rng::DeterministicRng;
pub use crate::game::config::{GameConfig, ShipKind};
pub use crate::game::state::{Simulation, PlanetId, ShipId, PlayerId};
pub use crate::game::command::Command;
pub use crate::sync::protocol::TickPayload;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 20;
