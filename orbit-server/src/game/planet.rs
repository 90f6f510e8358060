//! Planets and Factories
//!
//! A planet stores the ids of the ships currently at it, grouped by owner and
//! ship type. Ship data itself lives in the simulation's registry.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::core::angle::{Centi, angular_speed};
use crate::core::geometry::{Point, orbit_distance, surface_distance};
use crate::game::config::{ShipKind, SHIP_KIND_COUNT};
use crate::game::state::{FactoryId, PlanetId, PlayerId, ShipId};

/// Ships of one player at a planet, one list per ship type.
type ShipGroups = [Vec<ShipId>; SHIP_KIND_COUNT];

/// A factory built on a planet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Factory {
    /// Factory id (unique per match)
    pub id: FactoryId,
    /// Owning player
    pub owner: PlayerId,
    /// Angular position on the planet rim
    pub r: Centi,
    /// Remaining health
    pub health: i32,
    /// Construction finished
    pub built: bool,
}

/// A planet node of the star map.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Planet {
    /// Planet id (index into the graph)
    pub id: PlanetId,
    /// Center position
    pub position: Point,
    /// Radius
    pub size: f64,
    /// Owning player, `None` for neutral planets
    pub owner: Option<PlayerId>,
    /// Adjacent planets
    pub nodes: Vec<PlanetId>,
    /// Resource multiplier
    pub resources: f64,
    /// Maximum number of ships the planet supports
    pub capacity: u32,
    ships: BTreeMap<PlayerId, ShipGroups>,
    ship_count: u32,
    factories: BTreeMap<FactoryId, Factory>,
}

impl Planet {
    /// Create an empty planet.
    pub fn new(id: PlanetId, position: Point, size: f64, owner: Option<PlayerId>) -> Self {
        Self {
            id,
            position,
            size,
            owner,
            nodes: Vec::new(),
            resources: 1.0,
            capacity: 0,
            ships: BTreeMap::new(),
            ship_count: 0,
            factories: BTreeMap::new(),
        }
    }

    // =========================================================================
    // Ships
    // =========================================================================

    /// Register a ship. Returns false if it is already present.
    pub fn add_ship(&mut self, owner: PlayerId, kind: ShipKind, id: ShipId) -> bool {
        let group = &mut self.ships.entry(owner).or_default()[kind.index()];
        if group.contains(&id) {
            return false;
        }
        group.push(id);
        self.ship_count += 1;
        true
    }

    /// Unregister a ship. Returns false if it was not present.
    pub fn remove_ship(&mut self, owner: PlayerId, kind: ShipKind, id: ShipId) -> bool {
        let Some(groups) = self.ships.get_mut(&owner) else {
            return false;
        };
        let group = &mut groups[kind.index()];
        match group.iter().position(|s| *s == id) {
            Some(index) => {
                group.remove(index);
                self.ship_count -= 1;
                true
            }
            None => false,
        }
    }

    /// Total number of ships at this planet.
    #[inline]
    pub fn ship_count(&self) -> u32 {
        self.ship_count
    }

    /// Does the planet host this ship?
    pub fn has_ship(&self, owner: PlayerId, kind: ShipKind, id: ShipId) -> bool {
        self.ships_of(owner, kind).contains(&id)
    }

    /// Ships of one player and type, in arrival order.
    pub fn ships_of(&self, owner: PlayerId, kind: ShipKind) -> &[ShipId] {
        self.ships
            .get(&owner)
            .map(|groups| groups[kind.index()].as_slice())
            .unwrap_or(&[])
    }

    /// Number of ships a player has here.
    pub fn player_ship_count(&self, owner: PlayerId) -> usize {
        self.ships
            .get(&owner)
            .map(|groups| groups.iter().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// All ship ids, by owner, then type, then arrival order.
    pub fn occupants(&self) -> impl Iterator<Item = ShipId> + '_ {
        self.ships
            .values()
            .flat_map(|groups| groups.iter().flatten().copied())
    }

    /// Players with at least one ship here.
    pub fn present_players(&self) -> Vec<PlayerId> {
        self.ships
            .iter()
            .filter(|(_, groups)| groups.iter().any(|g| !g.is_empty()))
            .map(|(owner, _)| *owner)
            .collect()
    }

    // =========================================================================
    // Factories
    // =========================================================================

    /// Attach a factory.
    pub fn add_factory(&mut self, factory: Factory) {
        self.factories.insert(factory.id, factory);
    }

    /// Detach a factory.
    pub fn remove_factory(&mut self, id: FactoryId) -> Option<Factory> {
        self.factories.remove(&id)
    }

    /// Factories in id order.
    pub fn factories(&self) -> impl Iterator<Item = &Factory> {
        self.factories.values()
    }

    /// Mutable factory access.
    pub fn factory_mut(&mut self, id: FactoryId) -> Option<&mut Factory> {
        self.factories.get_mut(&id)
    }

    /// Number of factories a player owns here.
    pub fn player_factory_count(&self, owner: PlayerId) -> usize {
        self.factories.values().filter(|f| f.owner == owner).count()
    }

    /// Number of factories whose construction is finished.
    pub fn complete_factory_count(&self) -> usize {
        self.factories.values().filter(|f| f.built).count()
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    /// Center-to-center distance.
    #[inline]
    pub fn distance(&self, other: &Planet) -> f64 {
        self.position.distance(other.position)
    }

    /// Surface-to-surface distance.
    #[inline]
    pub fn surface_distance(&self, other: &Planet) -> f64 {
        surface_distance(self.position, self.size, other.position, other.size)
    }

    /// Orbit-to-orbit distance for a ship at the given orbit radius.
    #[inline]
    pub fn orbit_distance(&self, other: &Planet, orbit: f64) -> f64 {
        orbit_distance(self.position, self.size, other.position, other.size, orbit)
    }

    /// Whole-degree bearing towards another planet.
    #[inline]
    pub fn bearing_to(&self, other: &Planet) -> Centi {
        self.position.bearing_to(other.position)
    }

    /// Angular speed of a ship with the given base speed around this planet.
    #[inline]
    pub fn angular_speed(&self, speed: f64) -> Centi {
        angular_speed(self.size, speed)
    }
}
