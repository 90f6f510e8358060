//! Game Logic Module
//!
//! All game simulation code. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `config`: Ship types, per-type stats, tunables
//! - `planet`: Planets, occupancy and factories
//! - `graph`: Map data, planet graph and router
//! - `state`: Simulation context, ids, players
//! - `ship`: Ship state machine
//! - `combat`: Per-planet combat resolution
//! - `command`: Player commands and rejection reasons
//! - `tick`: Authoritative simulation loop
//! - `events`: Game events for replay/verification

pub mod config;
pub mod planet;
pub mod graph;
pub mod state;
pub mod ship;
pub mod combat;
pub mod command;
pub mod tick;
pub mod events;

// Re-export key types
pub use config::{GameConfig, ShipKind, ShipStats};
pub use graph::{MapData, MapError, PlanetGraph};
pub use state::{Simulation, PlanetId, ShipId, PlayerId, FactoryId};
pub use ship::{Ship, ShipSnapshot, ShipState};
pub use command::{Command, RejectReason};
pub use tick::{tick, TickResult};
pub use events::{GameEvent, GameEventData};
