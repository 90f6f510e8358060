//! Authoritative Simulation Tick
//!
//! The core game loop that must be 100% deterministic: client and server run
//! it on identical inputs and must reach identical states.

use tracing::{debug, info, trace};

use crate::core::hash::StateHash;
use crate::game::combat::resolve_planet;
use crate::game::command::{Command, RejectReason};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::ship::travel_ticks;
use crate::game::state::{PlanetId, PlayerId, ShipId, Simulation};
use crate::sync::encoder::SyncEncoder;
use crate::sync::protocol::TickPayload;

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Tick that just ran
    pub tick: u32,
    /// Events generated this tick (and by spawns since the last tick)
    pub events: Vec<GameEvent>,
    /// Delta records for the receivers
    pub payload: TickPayload,
}

/// Run one simulation tick.
///
/// # Order
///
/// 1. Advance the tick counter
/// 2. Apply queued commands
/// 3. Update every ship, in id order
/// 4. Resolve combat, per planet in id order
/// 5. Transfer abandoned planets
/// 6. Encode the payload
/// 7. Clear per-tick flags
///
/// # Determinism
///
/// Iteration uses BTreeMap/Vec order only, randomness comes from `sim.rng`,
/// and travel is scheduled by absolute tick, so replays are exact.
pub fn tick(sim: &mut Simulation) -> TickResult {
    // 1. Advance tick counter
    sim.tick += 1;

    // 2. Apply player commands
    apply_commands(sim);

    // 3. Move ships
    update_ships(sim);

    // 4. Combat
    let planets: Vec<PlanetId> = sim.graph.ids().collect();
    for planet in &planets {
        resolve_planet(sim, *planet);
    }

    // 5. Capture
    if sim.config.capture {
        process_captures(sim);
    }

    // 6. Deltas
    let payload = SyncEncoder::encode(sim);

    #[cfg(feature = "debug-tracing")]
    trace!(tick = sim.tick, records = payload.records.len(), hash = %hex::encode(sim.compute_hash()), "Tick complete");

    // 7. Reset per-tick flags
    sim.end_tick();

    TickResult {
        tick: sim.tick,
        events: sim.take_events(),
        payload,
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Apply all queued commands in arrival order.
fn apply_commands(sim: &mut Simulation) {
    let commands = std::mem::take(&mut sim.pending_commands);
    for command in commands {
        apply_command(sim, command);
    }
}

fn apply_command(sim: &mut Simulation, command: Command) {
    let player = command.player();
    if !sim.players.contains_key(&player) {
        reject(sim, player, None, RejectReason::UnknownPlayer);
        return;
    }

    match command {
        Command::Send { ships, target, .. } => {
            if sim.graph.get(target).is_none() {
                reject(sim, player, None, RejectReason::UnknownPlanet);
                return;
            }
            for id in ships {
                send_ship(sim, player, id, target);
            }
        }
        Command::SendGroup { from, kind, count, target, .. } => {
            if sim.graph.get(target).is_none() {
                reject(sim, player, None, RejectReason::UnknownPlanet);
                return;
            }
            let Some(planet) = sim.graph.get(from) else {
                reject(sim, player, None, RejectReason::UnknownPlanet);
                return;
            };
            let selection: Vec<ShipId> = planet
                .ships_of(player, kind)
                .iter()
                .take(count as usize)
                .copied()
                .collect();
            if selection.is_empty() {
                reject(sim, player, None, RejectReason::EmptySelection);
                return;
            }
            for id in selection {
                send_ship(sim, player, id, target);
            }
        }
        Command::Stop { ships, .. } => {
            for id in ships {
                if let Err(reason) = validate_ship(sim, player, id) {
                    reject(sim, player, Some(id), reason);
                    continue;
                }
                let stopped = sim.ships.get_mut(&id).is_some_and(|ship| ship.stop());
                if stopped {
                    let event = GameEvent::new(sim.tick, GameEventData::ShipStopped { ship_id: id, owner: player });
                    sim.pending_events.push(event);
                }
            }
        }
    }
}

/// Check that a ship exists, is alive and belongs to the player.
fn validate_ship(sim: &Simulation, player: PlayerId, id: ShipId) -> Result<(), RejectReason> {
    let ship = sim.ships.get(&id).ok_or(RejectReason::UnknownShip)?;
    if ship.destroyed {
        return Err(RejectReason::ShipDestroyed);
    }
    if ship.owner != player {
        return Err(RejectReason::NotOwner);
    }
    Ok(())
}

fn send_ship(sim: &mut Simulation, player: PlayerId, id: ShipId, target: PlanetId) {
    if let Err(reason) = validate_ship(sim, player, id) {
        reject(sim, player, Some(id), reason);
        return;
    }

    let Some(ship) = sim.ships.get_mut(&id) else {
        return;
    };
    if ship.is_traveling() {
        reject(sim, player, Some(id), RejectReason::InTransit);
        return;
    }

    if ship.send(&sim.graph, target) {
        let next = ship.next_planet().unwrap_or(target);
        sim.pending_events.push(GameEvent::new(
            sim.tick,
            GameEventData::ShipSent { ship_id: id, owner: player, target, next },
        ));
    } else {
        reject(sim, player, Some(id), RejectReason::NoRoute);
    }
}

fn reject(sim: &mut Simulation, player: PlayerId, ship: Option<ShipId>, reason: RejectReason) {
    debug!(?player, ?ship, ?reason, tick = sim.tick, "Command rejected");
    sim.pending_events.push(GameEvent::command_rejected(sim.tick, player, ship, reason));
}

// =============================================================================
// SHIPS
// =============================================================================

/// Advance every live ship through orbit, departure and arrival.
fn update_ships(sim: &mut Simulation) {
    let ids: Vec<ShipId> = sim.ships.keys().copied().collect();
    for id in ids {
        update_ship(sim, id);
    }
}

fn update_ship(sim: &mut Simulation, id: ShipId) {
    let tick = sim.tick;

    // Take the ship out of the registry so planets and other ships stay readable
    let Some(mut ship) = sim.ships.remove(&id) else {
        return;
    };
    if ship.destroyed {
        sim.ships.insert(id, ship);
        return;
    }
    let stats = *sim.config.stats(ship.kind);

    // Orbit & angle
    if let Some(planet) = sim.graph.get(ship.planet) {
        ship.advance(planet.size, &stats);
    }

    // Start traveling
    if ship.ready_to_depart() {
        if let Some(course) = ship.course {
            let ticks = match (sim.graph.get(ship.planet), sim.graph.get(course.next)) {
                (Some(from), Some(to)) => Some(travel_ticks(from, to, ship.orbit)),
                _ => None,
            };
            if let Some(ticks) = ticks {
                let from = ship.planet;
                if let Some(planet) = sim.graph.get_mut(from) {
                    planet.remove_ship(ship.owner, ship.kind, id);
                }
                ship.depart(tick, ticks);
                trace!(ship = ?id, ?from, to = ?course.next, ticks, "Ship departed");
                sim.pending_events.push(GameEvent::new(
                    tick,
                    GameEventData::ShipDeparted {
                        ship_id: id,
                        owner: ship.owner,
                        from,
                        to: course.next,
                        bearing: course.bearing,
                        arrive_tick: tick + ticks,
                    },
                ));
            }
        }
    }

    // Finish traveling
    if ship.has_arrived(tick) {
        if let Some(course) = ship.course {
            let direction = sim.preferred_direction(course.next, ship.owner, ship.kind);
            if let Some(planet) = sim.graph.get_mut(course.next) {
                ship.arrive(planet, &stats, direction);
                planet.add_ship(ship.owner, ship.kind, id);
            }
            sim.pending_events.push(GameEvent::new(
                tick,
                GameEventData::ShipArrived { ship_id: id, owner: ship.owner, planet: course.next },
            ));

            if course.next == course.target {
                ship.course = None;
            } else if ship.send(&sim.graph, course.target) {
                ship.face_bearing();
            } else {
                debug!(ship = ?id, planet = ?course.next, target = ?course.target, "Route aborted");
                sim.pending_events.push(GameEvent::new(
                    tick,
                    GameEventData::RouteAborted {
                        ship_id: id,
                        owner: ship.owner,
                        planet: course.next,
                        target: course.target,
                    },
                ));
            }
        }
    }

    sim.ships.insert(id, ship);
}

// =============================================================================
// CAPTURE
// =============================================================================

/// Hand abandoned planets to a sole occupier.
///
/// A planet changes owner when its owner has neither ships nor factories on
/// it and exactly one other player has ships in orbit there.
fn process_captures(sim: &mut Simulation) {
    let mut captures = Vec::new();

    for planet in sim.graph.iter() {
        if let Some(owner) = planet.owner {
            if planet.player_ship_count(owner) > 0 || planet.player_factory_count(owner) > 0 {
                continue;
            }
        }

        let mut occupiers: Vec<PlayerId> = planet
            .occupants()
            .filter_map(|id| sim.ships.get(&id))
            .filter(|s| !s.destroyed && s.is_in_orbit())
            .map(|s| s.owner)
            .collect();
        occupiers.dedup();

        if let [new_owner] = occupiers.as_slice() {
            if planet.owner != Some(*new_owner) {
                captures.push((planet.id, planet.owner, *new_owner));
            }
        }
    }

    for (planet, old_owner, new_owner) in captures {
        sim.set_planet_owner(planet, Some(new_owner));
        info!(?planet, ?old_owner, ?new_owner, tick = sim.tick, "Planet captured");
        sim.pending_events.push(GameEvent::planet_captured(sim.tick, planet, old_owner, new_owner));
    }
}

// =============================================================================
// REPLAY
// =============================================================================

/// Replay a match from recorded commands.
///
/// `commands[i]` is queued before tick `i + 1`. Returns the state hash after
/// every tick and all events.
pub fn replay_match(
    mut sim: Simulation,
    commands: &[Vec<Command>],
    tick_count: u32,
) -> (Simulation, Vec<StateHash>, Vec<GameEvent>) {
    let mut hashes = Vec::with_capacity(tick_count as usize);
    let mut all_events = Vec::new();

    for t in 0..tick_count {
        if let Some(batch) = commands.get(t as usize) {
            for command in batch {
                sim.queue_command(command.clone());
            }
        }
        let result = tick(&mut sim);
        hashes.push(sim.compute_hash());
        all_events.extend(result.events);
    }

    (sim, hashes, all_events)
}

// =============================================================================
// TESTS
// =============================================================================
