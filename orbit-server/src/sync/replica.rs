//! Receiver-side Mirror
//!
//! Applies tick payloads on top of locally simulated orbit motion. After
//! every payload the mirror holds, for each live ship, exactly the
//! [`ShipSnapshot`] the authoritative simulation reports.

use std::collections::BTreeMap;
use tracing::debug;

use crate::core::angle::angular_speed;
use crate::game::config::GameConfig;
use crate::game::graph::PlanetGraph;
use crate::game::ship::{orbit_step, rotate, ShipSnapshot};
use crate::game::state::{PlanetId, ShipId};
use crate::sync::protocol::{flags, ShipPatch, ShipRecord, TickPayload};

/// Replica errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplicaError {
    /// Update for a ship the replica never saw created.
    #[error("Unknown ship {0}")]
    UnknownShip(ShipId),

    /// Create for a ship that already exists.
    #[error("Ship {0} created twice")]
    DuplicateShip(ShipId),

    /// Record references a planet missing from the map.
    #[error("Unknown planet {0}")]
    UnknownPlanet(PlanetId),

    /// Payload does not follow the last applied tick.
    #[error("Expected tick {expected}, got {got}")]
    OutOfOrder { expected: u32, got: u32 },
}

/// Mirror of the ship state of one match.
#[derive(Debug, Clone)]
pub struct Replica {
    /// Last applied tick
    tick: u32,
    /// Planet sizes by id, for angular speed
    sizes: BTreeMap<PlanetId, f64>,
    /// Per-type constants
    config: GameConfig,
    /// Mirrored ships
    ships: BTreeMap<ShipId, ShipSnapshot>,
}

impl Replica {
    /// Empty replica at tick 0 for a match on `graph`.
    pub fn new(graph: &PlanetGraph, config: GameConfig) -> Self {
        Self {
            tick: 0,
            sizes: graph.iter().map(|p| (p.id, p.size)).collect(),
            config,
            ships: BTreeMap::new(),
        }
    }

    /// Last applied tick.
    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// Mirrored ship.
    pub fn get(&self, id: ShipId) -> Option<&ShipSnapshot> {
        self.ships.get(&id)
    }

    /// All mirrored ships in id order.
    pub fn ships(&self) -> impl Iterator<Item = &ShipSnapshot> {
        self.ships.values()
    }

    /// Number of mirrored ships.
    pub fn len(&self) -> usize {
        self.ships.len()
    }

    /// No ships mirrored?
    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }

    /// Replace everything with a full-state payload (late join).
    pub fn load(&mut self, payload: &TickPayload) -> Result<(), ReplicaError> {
        self.ships.clear();
        self.tick = payload.tick;
        for record in &payload.records {
            self.apply_record(record)?;
        }
        debug!(tick = self.tick, ships = self.ships.len(), "Replica loaded");
        Ok(())
    }

    /// Apply the payload of the next tick.
    pub fn apply(&mut self, payload: &TickPayload) -> Result<(), ReplicaError> {
        let expected = self.tick + 1;
        if payload.tick != expected {
            return Err(ReplicaError::OutOfOrder { expected, got: payload.tick });
        }
        self.tick = payload.tick;

        self.advance()?;
        for record in &payload.records {
            self.apply_record(record)?;
        }
        Ok(())
    }

    /// Local orbit climb and rotation of every ship at a planet.
    fn advance(&mut self) -> Result<(), ReplicaError> {
        for ship in self.ships.values_mut() {
            if ship.traveling {
                continue;
            }
            let stats = self.config.stats(ship.kind);
            let size = *self.sizes.get(&ship.planet).ok_or(ReplicaError::UnknownPlanet(ship.planet))?;

            if ship.orbit < stats.orbit {
                ship.orbit = orbit_step(ship.orbit, stats);
                if ship.orbit >= stats.orbit {
                    ship.in_orbit = true;
                }
            }
            ship.r = rotate(ship.r, ship.direction, angular_speed(size, stats.speed));
        }
        Ok(())
    }

    fn apply_record(&mut self, record: &ShipRecord) -> Result<(), ReplicaError> {
        match &record.patch {
            ShipPatch::Create { kind, planet, owner, tick_init, r, next, travel } => {
                if self.ships.contains_key(&record.id) {
                    return Err(ReplicaError::DuplicateShip(record.id));
                }
                if !self.sizes.contains_key(planet) {
                    return Err(ReplicaError::UnknownPlanet(*planet));
                }
                let stats = self.config.stats(*kind);
                let orbit = if record.has(flags::IN_ORBIT) || record.has(flags::TRAVELING) {
                    stats.orbit
                } else {
                    let climbed = self.tick.saturating_sub(*tick_init) as i64 * stats.orbit_speed as i64;
                    climbed.min(stats.orbit as i64) as i32
                };
                self.ships.insert(
                    record.id,
                    ShipSnapshot {
                        id: record.id,
                        kind: *kind,
                        owner: *owner,
                        planet: *planet,
                        r: *r,
                        orbit,
                        direction: record.direction(),
                        in_orbit: record.has(flags::IN_ORBIT),
                        traveling: record.has(flags::TRAVELING),
                        next: *next,
                        arrive_tick: travel.map(|(arrive, _)| arrive),
                        travel_ticks: travel.map(|(_, ticks)| ticks),
                    },
                );
            }

            ShipPatch::Destroyed => {
                self.ships.remove(&record.id);
            }

            patch => {
                let ship = self.ships.get_mut(&record.id).ok_or(ReplicaError::UnknownShip(record.id))?;
                ship.in_orbit = record.has(flags::IN_ORBIT);
                ship.traveling = record.has(flags::TRAVELING);
                ship.direction = record.direction();

                match *patch {
                    ShipPatch::Sent { next, arrival } => {
                        ship.next = Some(next);
                        if let Some((planet, r)) = arrival {
                            ship.planet = planet;
                            ship.r = r;
                            ship.arrive_tick = None;
                            ship.travel_ticks = None;
                        }
                    }
                    ShipPatch::Departed { next, r, arrive_tick, travel_ticks } => {
                        ship.next = Some(next);
                        ship.r = r;
                        ship.arrive_tick = Some(arrive_tick);
                        ship.travel_ticks = Some(travel_ticks);
                    }
                    ShipPatch::Settled { planet, r } => {
                        ship.planet = planet;
                        ship.r = r;
                        ship.next = None;
                        ship.arrive_tick = None;
                        ship.travel_ticks = None;
                    }
                    ShipPatch::Angle { r } => ship.r = r,
                    ShipPatch::Create { .. } | ShipPatch::Destroyed => {}
                }
            }
        }
        Ok(())
    }
}
