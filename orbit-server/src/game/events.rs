//! Game Events
//!
//! Events generated during simulation for logging, replay and verification.

use serde::{Serialize, Deserialize};

use crate::core::angle::Centi;
use crate::game::command::RejectReason;
use crate::game::config::ShipKind;
use crate::game::state::{FactoryId, PlanetId, PlayerId, ShipId};

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Ship created at a planet
    ShipSpawned {
        ship_id: ShipId,
        owner: PlayerId,
        kind: ShipKind,
        planet: PlanetId,
    },

    /// Ship accepted a move order
    ShipSent {
        ship_id: ShipId,
        owner: PlayerId,
        target: PlanetId,
        next: PlanetId,
    },

    /// A command was dropped
    CommandRejected {
        player_id: PlayerId,
        ship_id: Option<ShipId>,
        reason: RejectReason,
    },

    /// Ship cleared its move order
    ShipStopped {
        ship_id: ShipId,
        owner: PlayerId,
    },

    /// Ship left its planet
    ShipDeparted {
        ship_id: ShipId,
        owner: PlayerId,
        from: PlanetId,
        to: PlanetId,
        bearing: Centi,
        arrive_tick: u32,
    },

    /// Ship reached a planet
    ShipArrived {
        ship_id: ShipId,
        owner: PlayerId,
        planet: PlanetId,
    },

    /// Multi-leg move abandoned because no route remained
    RouteAborted {
        ship_id: ShipId,
        owner: PlayerId,
        planet: PlanetId,
        target: PlanetId,
    },

    /// Ship health dropped to zero
    ShipDestroyed {
        ship_id: ShipId,
        owner: PlayerId,
        planet: PlanetId,
    },

    /// Factory health dropped to zero
    FactoryDestroyed {
        factory_id: FactoryId,
        owner: PlayerId,
        planet: PlanetId,
    },

    /// Planet changed hands
    PlanetCaptured {
        planet: PlanetId,
        old_owner: Option<PlayerId>,
        new_owner: PlayerId,
    },
}

/// A game event with timing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u32,

    /// Player involved
    pub player_id: Option<PlayerId>,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u32, data: GameEventData) -> Self {
        let player_id = match &data {
            GameEventData::ShipSpawned { owner, .. }
            | GameEventData::ShipSent { owner, .. }
            | GameEventData::ShipStopped { owner, .. }
            | GameEventData::ShipDeparted { owner, .. }
            | GameEventData::ShipArrived { owner, .. }
            | GameEventData::RouteAborted { owner, .. }
            | GameEventData::ShipDestroyed { owner, .. }
            | GameEventData::FactoryDestroyed { owner, .. } => Some(*owner),
            GameEventData::CommandRejected { player_id, .. } => Some(*player_id),
            GameEventData::PlanetCaptured { new_owner, .. } => Some(*new_owner),
        };

        Self { tick, player_id, data }
    }

    /// Create command rejected event.
    pub fn command_rejected(
        tick: u32,
        player_id: PlayerId,
        ship_id: Option<ShipId>,
        reason: RejectReason,
    ) -> Self {
        Self::new(tick, GameEventData::CommandRejected { player_id, ship_id, reason })
    }

    /// Create ship destroyed event.
    pub fn ship_destroyed(tick: u32, ship_id: ShipId, owner: PlayerId, planet: PlanetId) -> Self {
        Self::new(tick, GameEventData::ShipDestroyed { ship_id, owner, planet })
    }

    /// Create planet captured event.
    pub fn planet_captured(
        tick: u32,
        planet: PlanetId,
        old_owner: Option<PlayerId>,
        new_owner: PlayerId,
    ) -> Self {
        Self::new(tick, GameEventData::PlanetCaptured { planet, old_owner, new_owner })
    }

    /// Ship the event is about, if any.
    pub fn ship_id(&self) -> Option<ShipId> {
        match &self.data {
            GameEventData::ShipSpawned { ship_id, .. }
            | GameEventData::ShipSent { ship_id, .. }
            | GameEventData::ShipStopped { ship_id, .. }
            | GameEventData::ShipDeparted { ship_id, .. }
            | GameEventData::ShipArrived { ship_id, .. }
            | GameEventData::RouteAborted { ship_id, .. }
            | GameEventData::ShipDestroyed { ship_id, .. } => Some(*ship_id),
            GameEventData::CommandRejected { ship_id, .. } => *ship_id,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_is_derived_from_data() {
        let event = GameEvent::ship_destroyed(4, ShipId(7), PlayerId(2), PlanetId(1));
        assert_eq!(event.player_id, Some(PlayerId(2)));
        assert_eq!(event.ship_id(), Some(ShipId(7)));

        let captured = GameEvent::planet_captured(9, PlanetId(3), None, PlayerId(5));
        assert_eq!(captured.player_id, Some(PlayerId(5)));
        assert_eq!(captured.ship_id(), None);
    }

    #[test]
    fn test_event_json() {
        let event = GameEvent::command_rejected(1, PlayerId(1), Some(ShipId(3)), RejectReason::NotOwner);
        let json = serde_json::to_string(&event).unwrap();
        let back: GameEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
