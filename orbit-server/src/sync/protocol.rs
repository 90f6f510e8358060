//! Delta Protocol
//!
//! Per-tick ship records. Each record is a flag bitmask, the ship id and
//! exactly the fields of the transition that happened, nothing more.
//!
//! ## Compact Form
//!
//! ```text
//! ┌──────────────┬──────────────────────────────────────────────────────────┐
//! │ Shape        │ Fields after [flags, id]                                 │
//! ├──────────────┼──────────────────────────────────────────────────────────┤
//! │ create       │ kind, planet, owner, tick_init, r                        │
//! │   + sent     │   next                                                   │
//! │   + en route │   next, arrive_tick, travel_ticks                        │
//! │ sent         │ next  (+ planet, r when it has just arrived)             │
//! │ departed     │ next, r, arrive_tick, travel_ticks                       │
//! │ settled      │ planet, r                                                │
//! │ angle        │ r                                                        │
//! │ destroyed    │ (none)                                                   │
//! └──────────────┴──────────────────────────────────────────────────────────┘
//! ```
//!
//! The flag bits select the shape on decode, so field order is fixed per shape.
//! Structured serialization (JSON, bincode) carries the same records as
//! tagged variants.

use serde::{Serialize, Deserialize};

use crate::core::angle::Centi;
use crate::game::config::ShipKind;
use crate::game::state::{PlanetId, PlayerId, ShipId};

// =============================================================================
// FLAGS
// =============================================================================

/// Record flag bits.
pub mod flags {
    /// Record creates the ship
    pub const CREATE: u8 = 1;
    /// Ship is between planets
    pub const TRAVELING: u8 = 2;
    /// Ship is at its maximum orbit
    pub const IN_ORBIT: u8 = 4;
    /// Ship changed this tick
    pub const UPDATED: u8 = 8;
    /// Ship has a next planet
    pub const HAS_NEXT: u8 = 16;
    /// Ship arrived this tick
    pub const JUST_ARRIVED: u8 = 32;
    /// Ship rotates in the positive direction
    pub const DIRECTION_POSITIVE: u8 = 64;
    /// Ship was destroyed this tick
    pub const DESTROYED: u8 = 128;
}

// =============================================================================
// RECORDS
// =============================================================================

/// Transition-specific contents of a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipPatch {
    /// Ship seen for the first time
    Create {
        kind: ShipKind,
        planet: PlanetId,
        owner: PlayerId,
        tick_init: u32,
        r: Centi,
        /// Next planet, if already sent
        next: Option<PlanetId>,
        /// `(arrive_tick, travel_ticks)`, if already traveling
        travel: Option<(u32, u32)>,
    },

    /// Ship armed with a (new) next planet
    Sent {
        next: PlanetId,
        /// `(planet, r)` when re-routed on arrival
        arrival: Option<(PlanetId, Centi)>,
    },

    /// Ship left its planet
    Departed {
        next: PlanetId,
        r: Centi,
        arrive_tick: u32,
        travel_ticks: u32,
    },

    /// Ship at a planet without a next planet (arrived, stopped)
    Settled {
        planet: PlanetId,
        r: Centi,
    },

    /// Angle refresh of an unchanged ship
    Angle {
        r: Centi,
    },

    /// Ship removed
    Destroyed,
}

/// One ship's entry in a tick payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipRecord {
    /// Flag bitmask
    pub flags: u8,
    /// Ship id
    pub id: ShipId,
    /// Transition contents
    pub patch: ShipPatch,
}

impl ShipRecord {
    /// Is a flag bit set?
    #[inline]
    pub fn has(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    /// Rotation direction carried by the flags.
    #[inline]
    pub fn direction(&self) -> i32 {
        if self.has(flags::DIRECTION_POSITIVE) { 1 } else { -1 }
    }

    /// Encode as an ordered field list.
    pub fn to_fields(&self) -> Vec<i64> {
        let mut out = vec![self.flags as i64, self.id.0 as i64];
        match &self.patch {
            ShipPatch::Create { kind, planet, owner, tick_init, r, next, travel } => {
                out.extend([*kind as i64, planet.0 as i64, owner.0 as i64, *tick_init as i64, *r as i64]);
                if let Some(next) = next {
                    out.push(next.0 as i64);
                    if let Some((arrive_tick, travel_ticks)) = travel {
                        out.extend([*arrive_tick as i64, *travel_ticks as i64]);
                    }
                }
            }
            ShipPatch::Sent { next, arrival } => {
                out.push(next.0 as i64);
                if let Some((planet, r)) = arrival {
                    out.extend([planet.0 as i64, *r as i64]);
                }
            }
            ShipPatch::Departed { next, r, arrive_tick, travel_ticks } => {
                out.extend([next.0 as i64, *r as i64, *arrive_tick as i64, *travel_ticks as i64]);
            }
            ShipPatch::Settled { planet, r } => {
                out.extend([planet.0 as i64, *r as i64]);
            }
            ShipPatch::Angle { r } => out.push(*r as i64),
            ShipPatch::Destroyed => {}
        }
        out
    }

    /// Decode from an ordered field list, using the flags to pick the shape.
    pub fn from_fields(fields: &[i64]) -> Result<Self, DecodeError> {
        let mut reader = FieldReader { fields, pos: 0 };
        let flags = reader.read::<u8>("flags")?;
        let id = ShipId(reader.read("id")?);
        let has = |flag: u8| flags & flag != 0;

        let patch = if has(flags::DESTROYED) {
            ShipPatch::Destroyed
        } else if has(flags::CREATE) {
            let kind_index = reader.read::<u8>("kind")?;
            let kind = ShipKind::from_index(kind_index).ok_or(DecodeError::UnknownKind(kind_index))?;
            let planet = PlanetId(reader.read("planet")?);
            let owner = PlayerId(reader.read("owner")?);
            let tick_init = reader.read("tick_init")?;
            let r = reader.read("r")?;
            let next = if has(flags::HAS_NEXT) { Some(PlanetId(reader.read("next")?)) } else { None };
            let travel = if has(flags::HAS_NEXT) && has(flags::TRAVELING) {
                Some((reader.read("arrive_tick")?, reader.read("travel_ticks")?))
            } else {
                None
            };
            ShipPatch::Create { kind, planet, owner, tick_init, r, next, travel }
        } else if has(flags::UPDATED) {
            if has(flags::HAS_NEXT) && !has(flags::TRAVELING) {
                let next = PlanetId(reader.read("next")?);
                let arrival = if has(flags::JUST_ARRIVED) {
                    Some((PlanetId(reader.read("planet")?), reader.read("r")?))
                } else {
                    None
                };
                ShipPatch::Sent { next, arrival }
            } else if has(flags::HAS_NEXT) {
                ShipPatch::Departed {
                    next: PlanetId(reader.read("next")?),
                    r: reader.read("r")?,
                    arrive_tick: reader.read("arrive_tick")?,
                    travel_ticks: reader.read("travel_ticks")?,
                }
            } else {
                ShipPatch::Settled {
                    planet: PlanetId(reader.read("planet")?),
                    r: reader.read("r")?,
                }
            }
        } else {
            ShipPatch::Angle { r: reader.read("r")? }
        };

        reader.finish()?;
        Ok(Self { flags, id, patch })
    }
}

/// Sequential reader over a field list.
struct FieldReader<'a> {
    fields: &'a [i64],
    pos: usize,
}

impl FieldReader<'_> {
    fn read<T: TryFrom<i64>>(&mut self, field: &'static str) -> Result<T, DecodeError> {
        let value = *self.fields.get(self.pos).ok_or(DecodeError::Truncated(field))?;
        self.pos += 1;
        T::try_from(value).map_err(|_| DecodeError::OutOfRange { field, value })
    }

    fn finish(&self) -> Result<(), DecodeError> {
        match self.fields.len() - self.pos {
            0 => Ok(()),
            extra => Err(DecodeError::TrailingFields(extra)),
        }
    }
}

/// Malformed record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Record ended before a required field.
    #[error("Record truncated before field `{0}`")]
    Truncated(&'static str),

    /// Field value does not fit its type.
    #[error("Field `{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: i64 },

    /// Unknown ship type tag.
    #[error("Unknown ship kind {0}")]
    UnknownKind(u8),

    /// Extra fields after the record shape ended.
    #[error("{0} unexpected trailing fields")]
    TrailingFields(usize),
}

// =============================================================================
// PAYLOAD
// =============================================================================

/// Everything a receiver needs for one tick.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickPayload {
    /// Tick the records belong to
    pub tick: u32,
    /// Ship records, by ship id
    pub records: Vec<ShipRecord>,
}

impl TickPayload {
    /// Nothing changed this tick?
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Is there already a record for this ship?
    pub fn contains(&self, id: ShipId) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    /// Encode every record as a field list.
    pub fn to_fields(&self) -> Vec<Vec<i64>> {
        self.records.iter().map(ShipRecord::to_fields).collect()
    }

    /// Decode field lists.
    pub fn from_fields(tick: u32, records: &[Vec<i64>]) -> Result<Self, DecodeError> {
        let records = records
            .iter()
            .map(|fields| ShipRecord::from_fields(fields))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { tick, records })
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::flags::*;

    #[test]
    fn test_create_en_route_fields() {
        let record = ShipRecord {
            flags: CREATE | TRAVELING | HAS_NEXT | DIRECTION_POSITIVE,
            id: ShipId(9),
            patch: ShipPatch::Create {
                kind: ShipKind::Bomb,
                planet: PlanetId(2),
                owner: PlayerId(1),
                tick_init: 40,
                r: 9000,
                next: Some(PlanetId(3)),
                travel: Some((120, 75)),
            },
        };
        let fields = record.to_fields();
        assert_eq!(fields, vec![83, 9, 1, 2, 1, 40, 9000, 3, 120, 75]);
        assert_eq!(ShipRecord::from_fields(&fields).unwrap(), record);
    }

    #[test]
    fn test_update_shapes_have_only_their_fields() {
        let sent = ShipRecord { flags: UPDATED | HAS_NEXT, id: ShipId(1), patch: ShipPatch::Sent { next: PlanetId(4), arrival: None } };
        assert_eq!(sent.to_fields(), vec![24, 1, 4]);

        let rerouted = ShipRecord {
            flags: UPDATED | HAS_NEXT | IN_ORBIT | JUST_ARRIVED,
            id: ShipId(1),
            patch: ShipPatch::Sent { next: PlanetId(4), arrival: Some((PlanetId(3), 18000)) },
        };
        assert_eq!(rerouted.to_fields().len(), 5);
        assert_eq!(ShipRecord::from_fields(&rerouted.to_fields()).unwrap(), rerouted);

        let departed = ShipRecord {
            flags: UPDATED | HAS_NEXT | TRAVELING,
            id: ShipId(1),
            patch: ShipPatch::Departed { next: PlanetId(4), r: 4500, arrive_tick: 90, travel_ticks: 30 },
        };
        assert_eq!(departed.to_fields().len(), 6);
        assert_eq!(ShipRecord::from_fields(&departed.to_fields()).unwrap(), departed);

        let settled = ShipRecord { flags: UPDATED | IN_ORBIT, id: ShipId(1), patch: ShipPatch::Settled { planet: PlanetId(4), r: 100 } };
        assert_eq!(ShipRecord::from_fields(&settled.to_fields()).unwrap(), settled);

        let angle = ShipRecord { flags: IN_ORBIT, id: ShipId(1), patch: ShipPatch::Angle { r: 100 } };
        assert_eq!(angle.to_fields(), vec![4, 1, 100]);

        let destroyed = ShipRecord { flags: DESTROYED | UPDATED, id: ShipId(1), patch: ShipPatch::Destroyed };
        assert_eq!(destroyed.to_fields(), vec![136, 1]);
        assert_eq!(ShipRecord::from_fields(&[136, 1]).unwrap(), destroyed);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(ShipRecord::from_fields(&[]), Err(DecodeError::Truncated("flags")));
        assert_eq!(ShipRecord::from_fields(&[24, 1]), Err(DecodeError::Truncated("next")));
        assert_eq!(ShipRecord::from_fields(&[4, 1, 100, 7]), Err(DecodeError::TrailingFields(1)));
        assert_eq!(
            ShipRecord::from_fields(&[300, 1]),
            Err(DecodeError::OutOfRange { field: "flags", value: 300 })
        );
        assert_eq!(
            ShipRecord::from_fields(&[1, 1, 7, 0, 0, 0, 0]),
            Err(DecodeError::UnknownKind(7))
        );
    }

    #[test]
    fn test_direction_flag() {
        let positive = ShipRecord { flags: DIRECTION_POSITIVE, id: ShipId(0), patch: ShipPatch::Angle { r: 0 } };
        let negative = ShipRecord { flags: 0, id: ShipId(0), patch: ShipPatch::Angle { r: 0 } };
        assert_eq!(positive.direction(), 1);
        assert_eq!(negative.direction(), -1);
    }

    #[test]
    fn test_payload_json_and_binary() {
        let payload = TickPayload {
            tick: 12,
            records: vec![
                ShipRecord { flags: UPDATED | IN_ORBIT, id: ShipId(3), patch: ShipPatch::Settled { planet: PlanetId(1), r: 500 } },
                ShipRecord { flags: DESTROYED, id: ShipId(4), patch: ShipPatch::Destroyed },
            ],
        };

        let json = payload.to_json().unwrap();
        assert_eq!(TickPayload::from_json(&json).unwrap(), payload);

        let bytes = payload.to_bytes().unwrap();
        assert_eq!(TickPayload::from_bytes(&bytes).unwrap(), payload);

        let fields = payload.to_fields();
        assert_eq!(TickPayload::from_fields(12, &fields).unwrap(), payload);
        assert!(payload.contains(ShipId(4)));
        assert!(!payload.contains(ShipId(5)));
    }
}
