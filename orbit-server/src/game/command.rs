//! Player Commands
//!
//! Commands arrive from the input layer between ticks. They are queued on the
//! simulation and validated against ownership when the next tick applies them,
//! so a command never takes effect retroactively.

use serde::{Serialize, Deserialize};

use crate::game::config::ShipKind;
use crate::game::state::{PlanetId, PlayerId, ShipId};

// =============================================================================
// COMMANDS
// =============================================================================

/// A move or stop order issued by a player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Send explicit ships towards a planet
    Send {
        player: PlayerId,
        ships: Vec<ShipId>,
        target: PlanetId,
    },

    /// Send the first `count` ships of one type at a planet (selection group)
    SendGroup {
        player: PlayerId,
        from: PlanetId,
        kind: ShipKind,
        count: u32,
        target: PlanetId,
    },

    /// Clear the move orders of explicit ships
    Stop {
        player: PlayerId,
        ships: Vec<ShipId>,
    },
}

impl Command {
    /// Issuing player.
    pub fn player(&self) -> PlayerId {
        match self {
            Command::Send { player, .. }
            | Command::SendGroup { player, .. }
            | Command::Stop { player, .. } => *player,
        }
    }

    /// Parse from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Why a command (or part of one) was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Ship id not in the registry
    UnknownShip,
    /// Ship was destroyed
    ShipDestroyed,
    /// Ship belongs to another player
    NotOwner,
    /// Planet id not in the graph
    UnknownPlanet,
    /// Player not registered in the match
    UnknownPlayer,
    /// No route within the player's accessible territory
    NoRoute,
    /// Ship is between planets and cannot be re-routed
    InTransit,
    /// Selection matched no ships
    EmptySelection,
}
