//! Game Constants and Configuration
//!
//! Ship types form a closed, ranked set. Their per-type constants live in a
//! fixed-size table indexed by the type tag.

use serde::{Serialize, Deserialize};

use crate::core::angle::Centi;

/// Number of ship types.
pub const SHIP_KIND_COUNT: usize = 3;

/// Combat reach, in multiples of the attacker's angular speed.
pub const COMBAT_RANGE_FACTOR: i32 = 6;

/// Departure window, as a fraction of the angular speed (3/4).
pub const DEPARTURE_WINDOW: (i32, i32) = (3, 4);

/// Ship type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ShipKind {
    /// Fighter
    Fight = 0,
    /// Bomber
    Bomb = 1,
    /// Defender
    Def = 2,
}

impl ShipKind {
    /// All kinds in rank order.
    pub const ALL: [ShipKind; SHIP_KIND_COUNT] = [ShipKind::Fight, ShipKind::Bomb, ShipKind::Def];

    /// Table index / wire id.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Get kind from wire id.
    pub fn from_index(index: u8) -> Option<ShipKind> {
        match index {
            0 => Some(ShipKind::Fight),
            1 => Some(ShipKind::Bomb),
            2 => Some(ShipKind::Def),
            _ => None,
        }
    }
}

/// Constants for one ship type.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShipStats {
    /// Health removed from the target per attack
    pub damage: i32,
    /// Health at spawn
    pub health: i32,
    /// Base rotation speed, scaled by `π / planet size`
    pub speed: f64,
    /// Maximum orbit radius (hundredths)
    pub orbit: Centi,
    /// Orbit gained per tick until the maximum is reached (hundredths)
    pub orbit_speed: Centi,
}

/// Simulation configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Per-type constants, indexed by `ShipKind::index()`
    pub ships: [ShipStats; SHIP_KIND_COUNT],
    /// Health of a factory
    pub factory_health: i32,
    /// Whether planets change hands after combat
    pub capture: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            ships: [
                ShipStats { damage: 2, health: 10, speed: 7.0, orbit: 500, orbit_speed: 50 },
                ShipStats { damage: 5, health: 15, speed: 5.0, orbit: 700, orbit_speed: 35 },
                ShipStats { damage: 1, health: 25, speed: 6.0, orbit: 300, orbit_speed: 60 },
            ],
            factory_health: 50,
            capture: true,
        }
    }
}

impl GameConfig {
    /// Constants for a ship type.
    #[inline]
    pub fn stats(&self, kind: ShipKind) -> &ShipStats {
        &self.ships[kind.index()]
    }

    /// Load from JSON, falling back to defaults for missing fields.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
