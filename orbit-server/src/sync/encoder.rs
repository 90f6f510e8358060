//! Delta Encoder
//!
//! Turns the per-tick flags of the simulation into a [`TickPayload`].
//! Receivers rebuild orbit climb and rotation locally, so a ship that only
//! moved along its orbit produces no record at all.

use crate::game::ship::Ship;
use crate::game::state::Simulation;
use crate::sync::protocol::{flags, ShipPatch, ShipRecord, TickPayload};

/// Builds tick payloads from simulation state.
pub struct SyncEncoder;

impl SyncEncoder {
    /// Encode the changes of the tick that just ran.
    ///
    /// Must run before [`Simulation::end_tick`] clears the per-tick flags.
    pub fn encode(sim: &Simulation) -> TickPayload {
        let records = sim
            .ships
            .values()
            .filter_map(|ship| Self::record(sim, ship))
            .collect();

        TickPayload { tick: sim.tick, records }
    }

    /// Add angle corrections for every ship in orbit around a planet that has
    /// no record yet in `payload`.
    pub fn angle_refresh(sim: &Simulation, payload: &mut TickPayload) -> usize {
        let refreshed: Vec<ShipRecord> = sim
            .live_ships()
            .filter(|ship| !ship.is_traveling() && !payload.contains(ship.id))
            .map(|ship| ShipRecord {
                flags: Self::state_flags(ship),
                id: ship.id,
                patch: ShipPatch::Angle { r: ship.r },
            })
            .collect();

        let count = refreshed.len();
        if count > 0 {
            payload.records.extend(refreshed);
            payload.records.sort_by_key(|record| record.id);
        }
        count
    }

    /// Create records for every ship, for a receiver joining mid-match.
    ///
    /// Ships spawned since the last tick are left out: they arrive with the
    /// next payload.
    pub fn full_state(sim: &Simulation) -> TickPayload {
        let records = sim
            .live_ships()
            .filter(|ship| !sim.created.contains(&ship.id))
            .map(Self::create_record)
            .collect();

        TickPayload { tick: sim.tick, records }
    }

    fn record(sim: &Simulation, ship: &Ship) -> Option<ShipRecord> {
        let created = sim.created.contains(&ship.id);

        if ship.destroyed {
            // Never seen by a receiver
            if created {
                return None;
            }
            return Some(ShipRecord {
                flags: Self::state_flags(ship) | flags::UPDATED | flags::DESTROYED,
                id: ship.id,
                patch: ShipPatch::Destroyed,
            });
        }

        if created {
            return Some(Self::create_record(ship));
        }

        if !ship.dirty {
            return None;
        }

        let patch = match ship.course {
            Some(course) if !ship.is_traveling() => ShipPatch::Sent {
                next: course.next,
                arrival: ship.just_arrived.then_some((ship.planet, ship.r)),
            },
            Some(course) => ShipPatch::Departed {
                next: course.next,
                r: ship.r,
                arrive_tick: ship.arrive_tick().unwrap_or_default(),
                travel_ticks: ship.travel_ticks().unwrap_or_default(),
            },
            None => ShipPatch::Settled { planet: ship.planet, r: ship.r },
        };

        Some(ShipRecord {
            flags: Self::state_flags(ship) | flags::UPDATED,
            id: ship.id,
            patch,
        })
    }

    fn create_record(ship: &Ship) -> ShipRecord {
        let travel = ship.arrive_tick().zip(ship.travel_ticks());
        ShipRecord {
            flags: Self::state_flags(ship) | flags::CREATE,
            id: ship.id,
            patch: ShipPatch::Create {
                kind: ship.kind,
                planet: ship.planet,
                owner: ship.owner,
                tick_init: ship.tick_init,
                r: ship.r,
                next: ship.next_planet(),
                travel,
            },
        }
    }

    /// Flags describing the ship's current state.
    fn state_flags(ship: &Ship) -> u8 {
        let mut bits = 0;
        if ship.is_traveling() {
            bits |= flags::TRAVELING;
        }
        if ship.is_in_orbit() {
            bits |= flags::IN_ORBIT;
        }
        if ship.course.is_some() {
            bits |= flags::HAS_NEXT;
        }
        if ship.just_arrived {
            bits |= flags::JUST_ARRIVED;
        }
        if ship.direction > 0 {
            bits |= flags::DIRECTION_POSITIVE;
        }
        bits
    }
}
