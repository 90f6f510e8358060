//! Ship State Machine
//!
//! A ship spirals out to its maximum orbit, rotates around its planet and,
//! once armed with a destination, waits until it faces the next planet before
//! committing to a scheduled flight.
//!
//! ```text
//! Orbiting ──(orbit reaches max)──► InOrbitIdle ◄──(stop / course done)──┐
//!                                      │ send                             │
//!                                      ▼                                  │
//!                                 InOrbitArmed ──(faces bearing)──► Traveling
//!                                      ▲                                  │
//!                                      └────(arrival, more legs)──────────┘
//! ```
//!
//! The transitions that touch planets live in the tick scheduler; this module
//! owns the per-ship data and the pure parts of each transition.

use serde::{Serialize, Deserialize};

use crate::core::angle::{Centi, angle_difference, angular_speed, flip, wrap_angle, within_ratio};
use crate::core::hash::StateHasher;
use crate::game::config::{ShipKind, ShipStats, DEPARTURE_WINDOW};
use crate::game::graph::PlanetGraph;
use crate::game::planet::Planet;
use crate::game::state::{PlanetId, PlayerId, ShipId};

// =============================================================================
// TYPES
// =============================================================================

/// Movement phase of a ship.
///
/// `Traveling` excludes being in orbit by construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipPhase {
    /// Still climbing to the maximum orbit
    Orbiting,
    /// At the maximum orbit
    InOrbit,
    /// Between planets
    Traveling {
        /// Absolute tick of arrival
        arrive_tick: u32,
        /// Flight duration
        travel_ticks: u32,
    },
}

/// Coarse state, as seen by commands and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipState {
    /// Climbing to orbit
    Orbiting,
    /// In orbit without destination
    InOrbitIdle,
    /// In orbit, waiting to face the next planet
    InOrbitArmed,
    /// Between planets
    Traveling,
}

/// An accepted move order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Final destination
    pub target: PlanetId,
    /// Next hop
    pub next: PlanetId,
    /// Whole-degree bearing towards `next`
    pub bearing: Centi,
}

/// A ship.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    /// Ship id
    pub id: ShipId,
    /// Owning player
    pub owner: PlayerId,
    /// Ship type
    pub kind: ShipKind,
    /// Remaining health
    pub health: i32,
    /// Tick of creation
    pub tick_init: u32,

    /// Angular position
    pub r: Centi,
    /// Angular speed around the current planet
    pub rs: Centi,
    /// Orbit progress, up to the type's maximum
    pub orbit: Centi,
    /// Rotation direction, +1 or -1
    pub direction: i32,

    /// Current planet, or origin while traveling
    pub planet: PlanetId,
    /// Movement phase
    pub phase: ShipPhase,
    /// Move order
    pub course: Option<Course>,

    /// Changed this tick, include in the next delta
    pub dirty: bool,
    /// Arrived at a planet this tick
    pub just_arrived: bool,
    /// Health reached zero
    pub destroyed: bool,
}

impl Ship {
    /// Create a ship at a planet.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ShipId,
        kind: ShipKind,
        planet: PlanetId,
        owner: PlayerId,
        stats: &ShipStats,
        planet_size: f64,
        r: Centi,
        in_orbit: bool,
        direction: i32,
        tick: u32,
    ) -> Self {
        Self {
            id,
            owner,
            kind,
            health: stats.health,
            tick_init: tick,
            r: wrap_angle(r),
            rs: angular_speed(planet_size, stats.speed),
            orbit: if in_orbit { stats.orbit } else { 0 },
            direction: if direction < 0 { -1 } else { 1 },
            planet,
            phase: if in_orbit { ShipPhase::InOrbit } else { ShipPhase::Orbiting },
            course: None,
            dirty: false,
            just_arrived: false,
            destroyed: false,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Between planets?
    #[inline]
    pub fn is_traveling(&self) -> bool {
        matches!(self.phase, ShipPhase::Traveling { .. })
    }

    /// At maximum orbit and not traveling?
    #[inline]
    pub fn is_in_orbit(&self) -> bool {
        self.phase == ShipPhase::InOrbit
    }

    /// Has a move order?
    #[inline]
    pub fn is_armed(&self) -> bool {
        self.course.is_some()
    }

    /// Arrival tick while traveling.
    pub fn arrive_tick(&self) -> Option<u32> {
        match self.phase {
            ShipPhase::Traveling { arrive_tick, .. } => Some(arrive_tick),
            _ => None,
        }
    }

    /// Flight duration while traveling.
    pub fn travel_ticks(&self) -> Option<u32> {
        match self.phase {
            ShipPhase::Traveling { travel_ticks, .. } => Some(travel_ticks),
            _ => None,
        }
    }

    /// Next hop, if armed.
    pub fn next_planet(&self) -> Option<PlanetId> {
        self.course.map(|c| c.next)
    }

    /// Final destination, if armed.
    pub fn target_planet(&self) -> Option<PlanetId> {
        self.course.map(|c| c.target)
    }

    /// Coarse state.
    pub fn state(&self) -> ShipState {
        match self.phase {
            ShipPhase::Traveling { .. } => ShipState::Traveling,
            ShipPhase::Orbiting => ShipState::Orbiting,
            ShipPhase::InOrbit if self.course.is_some() => ShipState::InOrbitArmed,
            ShipPhase::InOrbit => ShipState::InOrbitIdle,
        }
    }

    /// Synchronized view of this ship.
    pub fn snapshot(&self) -> ShipSnapshot {
        ShipSnapshot {
            id: self.id,
            kind: self.kind,
            owner: self.owner,
            planet: self.planet,
            r: self.r,
            orbit: self.orbit,
            direction: self.direction,
            in_orbit: self.is_in_orbit(),
            traveling: self.is_traveling(),
            next: self.next_planet(),
            arrive_tick: self.arrive_tick(),
            travel_ticks: self.travel_ticks(),
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Route towards `target` and arm the ship.
    ///
    /// On an empty route the move order is cleared and false is returned.
    pub fn send(&mut self, graph: &PlanetGraph, target: PlanetId) -> bool {
        let path = graph.find_path(self.planet, target, self.owner);
        let course = match (path.first(), path.last()) {
            (Some(&next), Some(&target)) => graph
                .bearing(self.planet, next)
                .map(|bearing| Course { target, next, bearing }),
            _ => None,
        };

        match course {
            Some(course) => {
                self.course = Some(course);
                self.dirty = true;
                true
            }
            None => {
                if self.course.take().is_some() {
                    self.dirty = true;
                }
                false
            }
        }
    }

    /// Clear the move order.
    ///
    /// A ship already between planets keeps flying and idles on arrival.
    /// Without a move order this is a no-op. Returns whether anything changed.
    pub fn stop(&mut self) -> bool {
        let Some(course) = self.course else {
            return false;
        };
        if self.is_traveling() {
            if course.target == course.next {
                return false;
            }
            self.course = Some(Course { target: course.next, ..course });
        } else {
            self.course = None;
        }
        self.dirty = true;
        true
    }

    /// Apply an attacker's damage. Returns true if this drops health to zero.
    ///
    /// Destroyed ships take no further damage.
    pub fn take_damage(&mut self, damage: i32) -> bool {
        if self.destroyed || self.health <= 0 {
            return false;
        }
        self.health -= damage;
        self.health <= 0
    }

    // =========================================================================
    // Tick transitions
    // =========================================================================

    /// Climb towards the maximum orbit and rotate around the planet.
    ///
    /// Does nothing while traveling.
    pub fn advance(&mut self, planet_size: f64, stats: &ShipStats) {
        if self.is_traveling() {
            return;
        }
        if self.orbit < stats.orbit {
            self.orbit = orbit_step(self.orbit, stats);
            if self.orbit >= stats.orbit {
                self.phase = ShipPhase::InOrbit;
            }
        }
        self.rs = angular_speed(planet_size, stats.speed);
        self.r = rotate(self.r, self.direction, self.rs);
    }

    /// In orbit, armed, and facing the next planet closely enough to leave.
    pub fn ready_to_depart(&self) -> bool {
        let Some(course) = self.course else {
            return false;
        };
        let (num, den) = DEPARTURE_WINDOW;
        self.is_in_orbit() && within_ratio(angle_difference(self.r, course.bearing), self.rs, num, den)
    }

    /// Commit to the flight: snap to the bearing and schedule arrival.
    pub fn depart(&mut self, tick: u32, travel_ticks: u32) {
        if let Some(course) = self.course {
            self.r = course.bearing;
        }
        self.phase = ShipPhase::Traveling {
            arrive_tick: tick + travel_ticks,
            travel_ticks,
        };
        self.dirty = true;
    }

    /// Traveling and due this tick?
    pub fn has_arrived(&self, tick: u32) -> bool {
        self.arrive_tick() == Some(tick)
    }

    /// Land at the next planet, facing outward.
    ///
    /// Returns the planet landed on. The caller re-routes multi-leg courses.
    pub fn arrive(&mut self, planet: &Planet, stats: &ShipStats, direction: i32) -> PlanetId {
        self.phase = ShipPhase::InOrbit;
        self.planet = planet.id;
        self.r = flip(self.r);
        self.rs = angular_speed(planet.size, stats.speed);
        self.direction = if direction < 0 { -1 } else { 1 };
        self.just_arrived = true;
        self.dirty = true;
        planet.id
    }

    /// Turn towards the current bearing along the shorter way.
    pub fn face_bearing(&mut self) {
        if let Some(course) = self.course {
            self.direction = if angle_difference(self.r, course.bearing) >= 0 { 1 } else { -1 };
        }
    }

    /// Add this ship's state to a hasher.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.id.0);
        hasher.update_u32(self.owner.0);
        hasher.update_u8(self.kind as u8);
        hasher.update_i32(self.health);
        hasher.update_u32(self.planet.0);
        hasher.update_centi(self.r);
        hasher.update_centi(self.rs);
        hasher.update_centi(self.orbit);
        hasher.update_i32(self.direction);
        hasher.update_bool(self.is_in_orbit());
        hasher.update_bool(self.is_traveling());
        hasher.update_opt_u32(self.target_planet().map(|p| p.0));
        hasher.update_opt_u32(self.next_planet().map(|p| p.0));
        hasher.update_opt_u32(self.arrive_tick());
        hasher.update_bool(self.destroyed);
    }
}

// =============================================================================
// SHARED MOTION RULES
// =============================================================================

/// Orbit after one tick of climbing, capped at the maximum.
#[inline]
pub fn orbit_step(orbit: Centi, stats: &ShipStats) -> Centi {
    (orbit + stats.orbit_speed).min(stats.orbit)
}

/// Angle after one tick of rotation.
#[inline]
pub fn rotate(r: Centi, direction: i32, rs: Centi) -> Centi {
    wrap_angle(r + direction * rs)
}

/// Whole ticks needed to fly between two planets at the given orbit.
///
/// Overlapping orbits still take one tick.
pub fn travel_ticks(from: &Planet, to: &Planet, orbit: Centi) -> u32 {
    let distance = from.orbit_distance(to, crate::core::angle::to_float(orbit));
    distance.ceil().max(1.0) as u32
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// The synchronized fields of a ship.
///
/// A receiver that applied every payload holds a snapshot equal to the live
/// ship's at the same tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipSnapshot {
    /// Ship id
    pub id: ShipId,
    /// Ship type
    pub kind: ShipKind,
    /// Owning player
    pub owner: PlayerId,
    /// Current planet, or origin while traveling
    pub planet: PlanetId,
    /// Angular position
    pub r: Centi,
    /// Orbit progress
    pub orbit: Centi,
    /// Rotation direction
    pub direction: i32,
    /// At maximum orbit
    pub in_orbit: bool,
    /// Between planets
    pub traveling: bool,
    /// Next hop
    pub next: Option<PlanetId>,
    /// Arrival tick while traveling
    pub arrive_tick: Option<u32>,
    /// Flight duration while traveling
    pub travel_ticks: Option<u32>,
}

// =============================================================================
// TESTS
// =============================================================================
