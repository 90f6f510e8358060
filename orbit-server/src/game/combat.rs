//! Combat Resolution
//!
//! Ships sharing a planet fight by angular proximity. Every tick each ship in
//! orbit picks at most one target by scanning forward through the occupants
//! sorted by angle; all damage of the tick is then applied at once, and only
//! afterwards are ships and factories at zero health destroyed.

use std::collections::BTreeMap;
use tracing::trace;

use crate::core::angle::{Centi, angle_distance};
use crate::game::config::COMBAT_RANGE_FACTOR;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::planet::Planet;
use crate::game::ship::Ship;
use crate::game::state::{FactoryId, PlanetId, ShipId, Simulation};

/// What an attacker hits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombatTarget {
    /// A hostile ship
    Ship(ShipId),
    /// A hostile factory
    Factory(FactoryId),
}

/// One attacker's choice for this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Engagement {
    /// Attacking ship
    pub attacker: ShipId,
    /// Chosen target
    pub target: CombatTarget,
    /// Damage dealt
    pub damage: i32,
}

/// Is `b` within combat reach of an attacker at `a` rotating at `rs`?
#[inline]
pub fn in_range(a: Centi, b: Centi, rs: Centi) -> bool {
    angle_distance(a, b) <= rs * COMBAT_RANGE_FACTOR
}

/// Live ships at a planet, sorted by angle, then id.
pub fn sorted_occupants<'a>(planet: &Planet, ships: &'a BTreeMap<ShipId, Ship>) -> Vec<&'a Ship> {
    let mut occupants: Vec<&Ship> = planet
        .occupants()
        .filter_map(|id| ships.get(&id))
        .filter(|s| !s.destroyed && !s.is_traveling())
        .collect();
    occupants.sort_by_key(|s| (s.r, s.id));
    occupants
}

/// Pick each attacker's target at a planet.
///
/// The scan from an attacker moves forward through the sorted occupants,
/// wrapping around. Friendly ships within reach are passed over; the scan
/// ends at the first hostile ship within reach (engaged), at the first ship
/// out of reach, or when it wraps back to the attacker. Without an engaged
/// ship, the nearest hostile factory within reach is attacked instead.
pub fn select_targets(
    planet: &Planet,
    ships: &BTreeMap<ShipId, Ship>,
    damage_of: impl Fn(&Ship) -> i32,
) -> Vec<Engagement> {
    let occupants = sorted_occupants(planet, ships);
    let count = occupants.len();
    let mut engagements = Vec::new();

    for (index, attacker) in occupants.iter().enumerate() {
        if !attacker.is_in_orbit() {
            continue;
        }

        let mut engaged = None;
        let mut cursor = (index + 1) % count;
        while cursor != index {
            let other = occupants[cursor];
            if !in_range(attacker.r, other.r, attacker.rs) {
                break;
            }
            if other.owner != attacker.owner {
                engaged = Some(CombatTarget::Ship(other.id));
                break;
            }
            cursor = (cursor + 1) % count;
        }

        let target = engaged.or_else(|| {
            planet
                .factories()
                .filter(|f| f.owner != attacker.owner && f.health > 0)
                .filter(|f| in_range(attacker.r, f.r, attacker.rs))
                .min_by_key(|f| (angle_distance(attacker.r, f.r), f.id))
                .map(|f| CombatTarget::Factory(f.id))
        });

        if let Some(target) = target {
            engagements.push(Engagement {
                attacker: attacker.id,
                target,
                damage: damage_of(attacker),
            });
        }
    }

    engagements
}

/// Run combat at one planet. Returns the number of engagements.
pub fn resolve_planet(sim: &mut Simulation, planet_id: PlanetId) -> usize {
    let engagements = {
        let Some(planet) = sim.graph.get(planet_id) else {
            return 0;
        };
        if planet.ship_count() == 0 {
            return 0;
        }
        let config = &sim.config;
        select_targets(planet, &sim.ships, |ship| config.stats(ship.kind).damage)
    };

    // Apply all damage before checking destruction
    let mut dead_ships = Vec::new();
    let mut dead_factories = Vec::new();
    for engagement in &engagements {
        match engagement.target {
            CombatTarget::Ship(id) => {
                if let Some(target) = sim.ships.get_mut(&id) {
                    if target.take_damage(engagement.damage) {
                        dead_ships.push(id);
                    }
                }
            }
            CombatTarget::Factory(id) => {
                let factory = sim.graph.get_mut(planet_id).and_then(|p| p.factory_mut(id));
                if let Some(factory) = factory {
                    if factory.health > 0 {
                        factory.health -= engagement.damage;
                        if factory.health <= 0 {
                            dead_factories.push(id);
                        }
                    }
                }
            }
        }
    }

    for id in dead_ships {
        sim.destroy_ship(id);
    }

    for id in dead_factories {
        let removed = sim.graph.get_mut(planet_id).and_then(|p| p.remove_factory(id));
        if let Some(factory) = removed {
            sim.pending_events.push(GameEvent::new(
                sim.tick,
                GameEventData::FactoryDestroyed { factory_id: id, owner: factory.owner, planet: planet_id },
            ));
        }
    }

    if !engagements.is_empty() {
        trace!(planet = ?planet_id, engagements = engagements.len(), "Combat resolved");
    }
    engagements.len()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Point;
    use crate::game::config::{GameConfig, ShipKind};
    use crate::game::graph::PlanetGraph;
    use crate::game::state::PlayerId;

    const RED: PlayerId = PlayerId(1);
    const BLUE: PlayerId = PlayerId(2);

    fn sim() -> Simulation {
        let planet = Planet::new(PlanetId(0), Point::ZERO, 10.0, None);
        let mut sim = Simulation::new(PlanetGraph::from_planets(vec![planet]), GameConfig::default(), 1);
        sim.add_player(RED, 0);
        sim.add_player(BLUE, 1);
        sim
    }

    fn spawn(sim: &mut Simulation, owner: PlayerId, r: Centi) -> ShipId {
        sim.spawn_ship(ShipKind::Fight, PlanetId(0), owner, r, true).unwrap()
    }

    fn health(sim: &Simulation, id: ShipId) -> i32 {
        sim.get_ship(id).unwrap().health
    }

    #[test]
    fn test_in_range_wraps() {
        assert!(in_range(35900, 100, 100));
        assert!(in_range(0, 600, 100));
        assert!(!in_range(0, 601, 100));
    }

    #[test]
    fn test_hostile_pair_trades_one_hit_each() {
        let mut sim = sim();
        let a = spawn(&mut sim, RED, 0);
        let b = spawn(&mut sim, BLUE, 300);
        let damage = sim.config.stats(ShipKind::Fight).damage;
        let full = sim.config.stats(ShipKind::Fight).health;

        assert_eq!(resolve_planet(&mut sim, PlanetId(0)), 2);
        assert_eq!(health(&sim, a), full - damage);
        assert_eq!(health(&sim, b), full - damage);
    }

    #[test]
    fn test_out_of_range_no_fight() {
        let mut sim = sim();
        let a = spawn(&mut sim, RED, 0);
        let b = spawn(&mut sim, BLUE, 18000);
        assert_eq!(resolve_planet(&mut sim, PlanetId(0)), 0);
        assert_eq!(health(&sim, a), health(&sim, b));
    }

    fn targets(sim: &Simulation) -> Vec<Engagement> {
        let config = sim.config.clone();
        select_targets(sim.graph.get(PlanetId(0)).unwrap(), &sim.ships, |s| config.stats(s.kind).damage)
    }

    fn targets_of(engagements: &[Engagement], attacker: ShipId) -> Vec<CombatTarget> {
        engagements.iter().filter(|e| e.attacker == attacker).map(|e| e.target).collect()
    }

    #[test]
    fn test_friendly_ship_ahead_is_passed_over() {
        let mut sim = sim();
        let a = spawn(&mut sim, RED, 0);
        let friend = spawn(&mut sim, RED, 100);
        let enemy = spawn(&mut sim, BLUE, 200);
        let engagements = targets(&sim);

        assert_eq!(targets_of(&engagements, a), vec![CombatTarget::Ship(enemy)]);
        assert_eq!(targets_of(&engagements, friend), vec![CombatTarget::Ship(enemy)]);
        assert_eq!(targets_of(&engagements, enemy), vec![CombatTarget::Ship(a)]);
    }

    #[test]
    fn test_out_of_range_ship_ahead_ends_scan() {
        let mut sim = sim();
        let enemy = spawn(&mut sim, BLUE, 35900);
        let a = spawn(&mut sim, RED, 0);
        let far = spawn(&mut sim, RED, 9000);
        let engagements = targets(&sim);

        // The enemy just behind `a` is never reached by wrapping around
        assert!(targets_of(&engagements, a).is_empty());
        assert!(targets_of(&engagements, far).is_empty());
        assert_eq!(targets_of(&engagements, enemy), vec![CombatTarget::Ship(a)]);
    }

    #[test]
    fn test_one_opponent_per_tick_in_scan_order() {
        let mut sim = sim();
        let behind = spawn(&mut sim, BLUE, 900);
        let a = spawn(&mut sim, RED, 1000);
        let ahead = spawn(&mut sim, BLUE, 1900);
        let engagements = targets(&sim);

        // `behind` is closer, but the scan only moves forward
        assert_eq!(targets_of(&engagements, a), vec![CombatTarget::Ship(ahead)]);
        assert_eq!(targets_of(&engagements, behind), vec![CombatTarget::Ship(a)]);
        assert_eq!(targets_of(&engagements, ahead), vec![CombatTarget::Ship(a)]);

        let full = sim.config.stats(ShipKind::Fight).health;
        let damage = sim.config.stats(ShipKind::Fight).damage;
        assert_eq!(resolve_planet(&mut sim, PlanetId(0)), 3);
        assert_eq!(health(&sim, a), full - 2 * damage);
        assert_eq!(health(&sim, ahead), full - damage);
        assert_eq!(health(&sim, behind), full);
    }

    #[test]
    fn test_lone_ship_scan_wraps_to_itself() {
        let mut sim = sim();
        let a = spawn(&mut sim, RED, 0);
        assert!(targets(&sim).is_empty());

        sim.add_factory(PlanetId(0), RED, 300, true).unwrap();
        assert!(targets(&sim).is_empty());

        let hostile = sim.add_factory(PlanetId(0), BLUE, 300, true).unwrap();
        let engagements = targets(&sim);
        assert_eq!(engagements.len(), 1);
        assert_eq!(targets_of(&engagements, a), vec![CombatTarget::Factory(hostile)]);
    }

    #[test]
    fn test_orbiting_ships_do_not_attack() {
        let mut sim = sim();
        let climbing = sim.spawn_ship(ShipKind::Fight, PlanetId(0), RED, 0, false).unwrap();
        let enemy = spawn(&mut sim, BLUE, 100);
        resolve_planet(&mut sim, PlanetId(0));
        // Only the enemy in orbit attacks
        assert!(health(&sim, climbing) < health(&sim, enemy));
    }

    #[test]
    fn test_destroyed_ship_is_never_targeted_again() {
        let mut sim = sim();
        let a = spawn(&mut sim, RED, 0);
        let b = spawn(&mut sim, BLUE, 100);
        sim.get_ship_mut(b).unwrap().health = 1;

        resolve_planet(&mut sim, PlanetId(0));
        assert!(sim.get_ship(b).unwrap().destroyed);
        // b still struck back in the tick it died
        let full = sim.config.stats(ShipKind::Fight).health;
        let damage = sim.config.stats(ShipKind::Fight).damage;
        assert_eq!(health(&sim, a), full - damage);

        // Next tick nobody is left to fight
        assert_eq!(resolve_planet(&mut sim, PlanetId(0)), 0);
        assert_eq!(health(&sim, a), full - damage);
        assert_eq!(sim.get_player(BLUE).unwrap().ship_count, 0);
    }

    #[test]
    fn test_factory_attacked_without_ship_target() {
        let mut sim = sim();
        let a = spawn(&mut sim, RED, 0);
        let near = sim.add_factory(PlanetId(0), BLUE, 300, true).unwrap();
        let far = sim.add_factory(PlanetId(0), BLUE, 500, true).unwrap();
        let own = sim.add_factory(PlanetId(0), RED, 100, true).unwrap();

        resolve_planet(&mut sim, PlanetId(0));
        let planet = sim.graph.get(PlanetId(0)).unwrap();
        let health_of = |id| planet.factories().find(|f| f.id == id).unwrap().health;
        let full = sim.config.factory_health;
        let damage = sim.config.stats(ShipKind::Fight).damage;
        assert_eq!(health_of(near), full - damage);
        assert_eq!(health_of(far), full);
        assert_eq!(health_of(own), full);
        assert_eq!(health(&sim, a), sim.config.stats(ShipKind::Fight).health);
    }

    #[test]
    fn test_factory_destruction() {
        let mut sim = sim();
        spawn(&mut sim, RED, 0);
        let factory = sim.add_factory(PlanetId(0), BLUE, 0, false).unwrap();
        sim.graph.get_mut(PlanetId(0)).unwrap().factory_mut(factory).unwrap().health = 1;
        sim.take_events();

        resolve_planet(&mut sim, PlanetId(0));
        assert_eq!(sim.graph.get(PlanetId(0)).unwrap().factories().count(), 0);
        let events = sim.take_events();
        assert!(matches!(
            events[0].data,
            GameEventData::FactoryDestroyed { owner: BLUE, .. }
        ));
    }
}
