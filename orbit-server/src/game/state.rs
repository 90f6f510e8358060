//! Simulation State
//!
//! The single simulation context: tick counter, RNG, planet graph and the
//! ship and player registries. Every component receives it explicitly.
//! Uses BTreeMap for deterministic iteration order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::core::angle::{Centi, degrees};
use crate::core::hash::{StateHash, compute_state_hash};
use crate::core::rng::DeterministicRng;
use crate::game::command::Command;
use crate::game::config::{GameConfig, ShipKind};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::graph::{MapData, MapError, PlanetGraph};
use crate::game::planet::Factory;
use crate::game::ship::Ship;

// =============================================================================
// IDS
// =============================================================================

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Raw id as an index.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

id_type!(
    /// Planet identifier, equal to its index in the graph.
    PlanetId, "P"
);
id_type!(
    /// Ship identifier, allocated monotonically per match.
    ShipId, "S"
);
id_type!(
    /// Player identifier.
    ///
    /// Implements Ord for deterministic BTreeMap ordering.
    PlayerId, "#"
);
id_type!(
    /// Factory identifier, allocated monotonically per match.
    FactoryId, "F"
);

// =============================================================================
// PLAYER
// =============================================================================

/// A participant of the match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Player id
    pub id: PlayerId,
    /// Display color index
    pub color: u8,
    /// Live ships owned
    pub ship_count: u32,
}

// =============================================================================
// SIMULATION
// =============================================================================

/// Complete state of a match.
#[derive(Clone, Debug)]
pub struct Simulation {
    /// Current tick, 0 before the first tick runs
    pub tick: u32,

    /// RNG seed (for verification)
    pub rng_seed: u64,

    /// Deterministic RNG state
    pub rng: DeterministicRng,

    /// Ship and factory constants
    pub config: GameConfig,

    /// Planets and their adjacency
    pub graph: PlanetGraph,

    /// All ships, including those destroyed during the current tick
    pub ships: BTreeMap<ShipId, Ship>,

    /// All players
    pub players: BTreeMap<PlayerId, Player>,

    /// Commands waiting for the next tick
    pub pending_commands: Vec<Command>,

    /// Events generated since the last tick result
    pub pending_events: Vec<GameEvent>,

    /// Ships spawned since the last encoded payload
    pub created: BTreeSet<ShipId>,

    next_ship_id: u32,
    next_factory_id: u32,
}

impl Simulation {
    /// Create a simulation over a validated graph.
    pub fn new(graph: PlanetGraph, config: GameConfig, rng_seed: u64) -> Self {
        Self {
            tick: 0,
            rng_seed,
            rng: DeterministicRng::new(rng_seed),
            config,
            graph,
            ships: BTreeMap::new(),
            players: BTreeMap::new(),
            pending_commands: Vec::new(),
            pending_events: Vec::new(),
            created: BTreeSet::new(),
            next_ship_id: 0,
            next_factory_id: 0,
        }
    }

    /// Validate map data and create a simulation with its players.
    pub fn from_map(map: &MapData, config: GameConfig, rng_seed: u64) -> Result<Self, MapError> {
        let graph = PlanetGraph::from_map(map)?;
        let mut sim = Self::new(graph, config, rng_seed);
        for player in &map.players {
            sim.add_player(PlayerId(player.id), player.color);
        }
        debug!(
            planets = sim.graph.len(),
            players = sim.players.len(),
            seed = rng_seed,
            "Simulation created"
        );
        Ok(sim)
    }

    // =========================================================================
    // Players
    // =========================================================================

    /// Register a player. Re-adding keeps the existing ship count.
    pub fn add_player(&mut self, id: PlayerId, color: u8) {
        self.players
            .entry(id)
            .and_modify(|p| p.color = color)
            .or_insert(Player { id, color, ship_count: 0 });
    }

    /// Get a player by ID.
    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    // =========================================================================
    // Ships
    // =========================================================================

    /// Spawn a ship at a planet at full health.
    ///
    /// With `orbit` the ship starts at its maximum orbit, otherwise it spirals
    /// out from the surface. Returns `None` for an unknown planet or player.
    pub fn spawn_ship(
        &mut self,
        kind: ShipKind,
        planet: PlanetId,
        owner: PlayerId,
        r: Centi,
        orbit: bool,
    ) -> Option<ShipId> {
        if !self.players.contains_key(&owner) {
            warn!(?owner, "Spawn for unknown player");
            return None;
        }
        let Some(size) = self.graph.get(planet).map(|p| p.size) else {
            warn!(?planet, "Spawn at unknown planet");
            return None;
        };

        let id = ShipId(self.next_ship_id);
        self.next_ship_id += 1;

        let direction = self.preferred_direction(planet, owner, kind);
        let ship = Ship::new(id, kind, planet, owner, self.config.stats(kind), size, r, orbit, direction, self.tick);

        if let Some(p) = self.graph.get_mut(planet) {
            p.add_ship(owner, kind, id);
        }
        if let Some(player) = self.players.get_mut(&owner) {
            player.ship_count += 1;
        }
        self.ships.insert(id, ship);
        self.created.insert(id);

        self.pending_events.push(GameEvent::new(
            self.tick,
            GameEventData::ShipSpawned { ship_id: id, owner, kind, planet },
        ));
        Some(id)
    }

    /// Spawn a ship at a random whole-degree angle drawn from the match RNG.
    pub fn spawn_ship_random_angle(
        &mut self,
        kind: ShipKind,
        planet: PlanetId,
        owner: PlayerId,
        orbit: bool,
    ) -> Option<ShipId> {
        let r = degrees(self.rng.next_int(360) as i32);
        self.spawn_ship(kind, planet, owner, r, orbit)
    }

    /// Get a ship by ID.
    pub fn get_ship(&self, id: ShipId) -> Option<&Ship> {
        self.ships.get(&id)
    }

    /// Get a ship mutably by ID.
    pub fn get_ship_mut(&mut self, id: ShipId) -> Option<&mut Ship> {
        self.ships.get_mut(&id)
    }

    /// Live ships in id order.
    pub fn live_ships(&self) -> impl Iterator<Item = &Ship> {
        self.ships.values().filter(|s| !s.destroyed)
    }

    /// Rotation direction for a ship joining a planet.
    ///
    /// Ships of one player and type share a rotation at a planet: the first
    /// one present sets it. With none present the parity of the planet,
    /// player and type ids decides, so every side computes the same value.
    pub fn preferred_direction(&self, planet: PlanetId, owner: PlayerId, kind: ShipKind) -> i32 {
        let existing = self
            .graph
            .get(planet)
            .and_then(|p| p.ships_of(owner, kind).first())
            .and_then(|id| self.ships.get(id));

        match existing {
            Some(ship) => ship.direction,
            None if (planet.0 + owner.0 + kind as u32) % 2 == 0 => 1,
            None => -1,
        }
    }

    /// Destroy a ship: remove it from its planet and its owner's count.
    ///
    /// Idempotent; returns false if the ship was unknown or already destroyed.
    pub fn destroy_ship(&mut self, id: ShipId) -> bool {
        let Some(ship) = self.ships.get_mut(&id) else {
            return false;
        };
        if ship.destroyed {
            return false;
        }

        ship.destroyed = true;
        ship.health = 0;
        ship.dirty = true;

        let (owner, kind, planet) = (ship.owner, ship.kind, ship.planet);
        if !ship.is_traveling() {
            if let Some(p) = self.graph.get_mut(planet) {
                p.remove_ship(owner, kind, id);
            }
        }
        if let Some(player) = self.players.get_mut(&owner) {
            player.ship_count = player.ship_count.saturating_sub(1);
        }

        self.pending_events.push(GameEvent::ship_destroyed(self.tick, id, owner, planet));
        true
    }

    // =========================================================================
    // Planets
    // =========================================================================

    /// Build a factory on a planet.
    pub fn add_factory(&mut self, planet: PlanetId, owner: PlayerId, r: Centi, built: bool) -> Option<FactoryId> {
        let health = self.config.factory_health;
        let p = self.graph.get_mut(planet)?;
        let id = FactoryId(self.next_factory_id);
        self.next_factory_id += 1;
        p.add_factory(Factory { id, owner, r, health, built });
        Some(id)
    }

    /// Change a planet's owner (setup and capture).
    pub fn set_planet_owner(&mut self, planet: PlanetId, owner: Option<PlayerId>) -> bool {
        match self.graph.get_mut(planet) {
            Some(p) => {
                p.owner = owner;
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Commands & events
    // =========================================================================

    /// Queue a command for the next tick.
    pub fn queue_command(&mut self, command: Command) {
        self.pending_commands.push(command);
    }

    /// Take and clear pending events.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Clear per-tick flags and drop destroyed ships.
    ///
    /// Runs after the tick's payload has been encoded.
    pub fn end_tick(&mut self) {
        self.ships.retain(|_, ship| !ship.destroyed);
        for ship in self.ships.values_mut() {
            ship.dirty = false;
            ship.just_arrived = false;
        }
        self.created.clear();
    }

    // =========================================================================
    // Verification
    // =========================================================================

    /// Compute hash of current state for verification.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.rng_seed, |hasher| {
            hasher.update_u32(self.rng.state());

            for planet in self.graph.iter() {
                hasher.update_u32(planet.id.0);
                hasher.update_opt_u32(planet.owner.map(|o| o.0));
                hasher.update_u32(planet.ship_count());
                for factory in planet.factories() {
                    hasher.update_u32(factory.id.0);
                    hasher.update_u32(factory.owner.0);
                    hasher.update_centi(factory.r);
                    hasher.update_i32(factory.health);
                    hasher.update_bool(factory.built);
                }
            }

            for ship in self.ships.values() {
                ship.hash_into(hasher);
            }

            for player in self.players.values() {
                hasher.update_u32(player.id.0);
                hasher.update_u32(player.ship_count);
            }
        })
    }
}

/// Hash helper shared by tests and tooling.
pub fn hash_hex(hash: &StateHash) -> String {
    hex::encode(hash)
}

// =============================================================================
// TESTS
// =============================================================================
