//! Planet Graph and Router
//!
//! The star map is a fixed set of planets connected by traversal edges. It is
//! supplied once at match setup and only planet ownership changes afterwards.
//!
//! Routing is a Dijkstra search restricted to the requesting player's
//! accessible sub-graph: an edge may only be crossed if at least one of its
//! endpoints belongs to that player.

use serde::{Serialize, Deserialize};

use crate::core::geometry::Point;
use crate::game::planet::Planet;
use crate::game::state::{PlanetId, PlayerId};

// =============================================================================
// MAP DATA
// =============================================================================

/// Planet description as supplied by the map loader.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanetData {
    /// Planet id, must equal its index in `MapData::planets`
    pub id: u32,
    /// Center X
    pub x: f64,
    /// Center Y
    pub y: f64,
    /// Radius
    pub size: f64,
    /// Initial owner
    #[serde(default)]
    pub owner: Option<u32>,
    /// Adjacent planet ids
    #[serde(default)]
    pub nodes: Vec<u32>,
    /// Resource multiplier
    #[serde(default = "default_resources")]
    pub resources: f64,
    /// Ship capacity
    #[serde(default)]
    pub capacity: u32,
}

fn default_resources() -> f64 {
    1.0
}

/// Player description as supplied by the map loader.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerData {
    /// Player id
    pub id: u32,
    /// Display color index
    #[serde(default)]
    pub color: u8,
}

/// A complete match map.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MapData {
    /// Planets, indexed by id
    pub planets: Vec<PlanetData>,
    /// Participating players
    #[serde(default)]
    pub players: Vec<PlayerData>,
}

impl MapData {
    /// Parse from JSON.
    pub fn from_json(s: &str) -> Result<Self, MapError> {
        serde_json::from_str(s).map_err(|e| MapError::Parse(e.to_string()))
    }
}

/// Map validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MapError {
    /// Map could not be parsed.
    #[error("Failed to parse map: {0}")]
    Parse(String),

    /// Map has no planets.
    #[error("Map has no planets")]
    Empty,

    /// Planet id does not match its position.
    #[error("Planet at index {index} has id {id}")]
    IdMismatch { index: usize, id: u32 },

    /// Planet radius is not positive.
    #[error("Planet {0} has invalid size")]
    InvalidSize(u32),

    /// Edge points at a planet that does not exist.
    #[error("Planet {from} links to unknown planet {to}")]
    UnknownPlanet { from: u32, to: u32 },

    /// Edge points back at its own planet.
    #[error("Planet {0} links to itself")]
    SelfLoop(u32),

    /// Owner is not a declared player.
    #[error("Planet {planet} is owned by unknown player {player}")]
    UnknownOwner { planet: u32, player: u32 },
}

// =============================================================================
// PLANET GRAPH
// =============================================================================

/// All planets of a match, indexed by `PlanetId`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PlanetGraph {
    planets: Vec<Planet>,
}

impl PlanetGraph {
    /// Build and validate a graph from map data.
    ///
    /// Edges are made symmetric; duplicates are dropped.
    pub fn from_map(map: &MapData) -> Result<Self, MapError> {
        if map.planets.is_empty() {
            return Err(MapError::Empty);
        }

        let count = map.planets.len() as u32;
        let mut planets = Vec::with_capacity(map.planets.len());

        for (index, data) in map.planets.iter().enumerate() {
            if data.id as usize != index {
                return Err(MapError::IdMismatch { index, id: data.id });
            }
            if !(data.size > 0.0) {
                return Err(MapError::InvalidSize(data.id));
            }
            if let Some(owner) = data.owner {
                if !map.players.iter().any(|p| p.id == owner) {
                    return Err(MapError::UnknownOwner { planet: data.id, player: owner });
                }
            }

            let mut planet = Planet::new(
                PlanetId(data.id),
                Point::new(data.x, data.y),
                data.size,
                data.owner.map(PlayerId),
            );
            planet.resources = data.resources;
            planet.capacity = data.capacity;
            planets.push(planet);
        }

        for data in &map.planets {
            for &to in &data.nodes {
                if to >= count {
                    return Err(MapError::UnknownPlanet { from: data.id, to });
                }
                if to == data.id {
                    return Err(MapError::SelfLoop(data.id));
                }
                link(&mut planets, data.id as usize, to as usize);
                link(&mut planets, to as usize, data.id as usize);
            }
        }

        Ok(Self { planets })
    }

    /// Build from ready planets (test and tooling helper).
    ///
    /// Ids are reassigned to indices and edges made symmetric.
    pub fn from_planets(mut planets: Vec<Planet>) -> Self {
        for (index, planet) in planets.iter_mut().enumerate() {
            planet.id = PlanetId(index as u32);
        }
        let edges: Vec<(usize, usize)> = planets
            .iter()
            .enumerate()
            .flat_map(|(i, p)| p.nodes.iter().map(move |n| (i, n.index())))
            .collect();
        for (a, b) in edges {
            if a != b && b < planets.len() {
                link(&mut planets, a, b);
                link(&mut planets, b, a);
            }
        }
        Self { planets }
    }

    /// Number of planets.
    #[inline]
    pub fn len(&self) -> usize {
        self.planets.len()
    }

    /// True if the graph has no planets.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.planets.is_empty()
    }

    /// Get a planet.
    #[inline]
    pub fn get(&self, id: PlanetId) -> Option<&Planet> {
        self.planets.get(id.index())
    }

    /// Get a planet mutably.
    #[inline]
    pub fn get_mut(&mut self, id: PlanetId) -> Option<&mut Planet> {
        self.planets.get_mut(id.index())
    }

    /// Iterate planets in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Planet> {
        self.planets.iter()
    }

    /// Iterate planets mutably in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Planet> {
        self.planets.iter_mut()
    }

    /// Planet ids in order.
    pub fn ids(&self) -> impl Iterator<Item = PlanetId> + '_ {
        self.planets.iter().map(|p| p.id)
    }

    /// Is `(a, b)` an edge?
    pub fn are_adjacent(&self, a: PlanetId, b: PlanetId) -> bool {
        self.get(a).is_some_and(|p| p.nodes.contains(&b))
    }

    /// Center distance between two planets, if both exist.
    pub fn distance(&self, a: PlanetId, b: PlanetId) -> Option<f64> {
        Some(self.get(a)?.distance(self.get(b)?))
    }

    /// Whole-degree bearing from one planet to another.
    pub fn bearing(&self, from: PlanetId, to: PlanetId) -> Option<i32> {
        Some(self.get(from)?.bearing_to(self.get(to)?))
    }

    /// Shortest path for `player` from `origin` to `destination`.
    ///
    /// The result excludes `origin` and ends with `destination`. It is empty
    /// when the destination is unreachable through the player's accessible
    /// sub-graph, or when `origin == destination`.
    ///
    /// # Determinism
    ///
    /// Among equally distant pending planets, the lowest id is settled first,
    /// and a tentative distance is only replaced by a strictly shorter one.
    pub fn find_path(
        &self,
        origin: PlanetId,
        destination: PlanetId,
        player: PlayerId,
    ) -> Vec<PlanetId> {
        let count = self.planets.len();
        if origin.index() >= count || destination.index() >= count {
            return Vec::new();
        }

        let mut distance: Vec<Option<f64>> = vec![None; count];
        let mut previous: Vec<Option<usize>> = vec![None; count];
        let mut pending = vec![true; count];
        distance[origin.index()] = Some(0.0);

        loop {
            // Lowest pending distance; strict comparison keeps the lowest index on ties
            let mut next: Option<(usize, f64)> = None;
            for (index, dist) in distance.iter().enumerate() {
                if !pending[index] {
                    continue;
                }
                if let Some(d) = *dist {
                    if next.map_or(true, |(_, best)| d < best) {
                        next = Some((index, d));
                    }
                }
            }

            let Some((u, dist_u)) = next else {
                return Vec::new();
            };
            pending[u] = false;

            if u == destination.index() {
                let mut path = Vec::new();
                let mut cursor = u;
                while let Some(prev) = previous[cursor] {
                    path.push(PlanetId(cursor as u32));
                    cursor = prev;
                }
                path.reverse();
                return path;
            }

            let from = &self.planets[u];
            for &node in &from.nodes {
                let v = node.index();
                if !pending[v] {
                    continue;
                }
                let to = &self.planets[v];
                if from.owner != Some(player) && to.owner != Some(player) {
                    continue;
                }
                let alt = dist_u + from.distance(to);
                if distance[v].map_or(true, |d| alt < d) {
                    distance[v] = Some(alt);
                    previous[v] = Some(u);
                }
            }
        }
    }

    /// Sum of edge lengths along `origin` followed by `path`.
    pub fn path_length(&self, origin: PlanetId, path: &[PlanetId]) -> f64 {
        let mut total = 0.0;
        let mut from = origin;
        for &to in path {
            total += self.distance(from, to).unwrap_or(f64::INFINITY);
            from = to;
        }
        total
    }
}

fn link(planets: &mut [Planet], from: usize, to: usize) {
    let target = PlanetId(to as u32);
    if !planets[from].nodes.contains(&target) {
        planets[from].nodes.push(target);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ME: PlayerId = PlayerId(1);
    const ENEMY: PlayerId = PlayerId(2);

    fn planet(id: u32, x: f64, y: f64, owner: Option<u32>, nodes: &[u32]) -> PlanetData {
        PlanetData {
            id,
            x,
            y,
            size: 10.0,
            owner,
            nodes: nodes.to_vec(),
            resources: 1.0,
            capacity: 10,
        }
    }

    fn players() -> Vec<PlayerData> {
        vec![PlayerData { id: 1, color: 0 }, PlayerData { id: 2, color: 1 }]
    }

    /// Square 0-1-2-3 with a long diagonal 0-2.
    fn square(owners: [Option<u32>; 4]) -> PlanetGraph {
        let map = MapData {
            planets: vec![
                planet(0, 0.0, 0.0, owners[0], &[1, 3, 2]),
                planet(1, 100.0, 0.0, owners[1], &[2]),
                planet(2, 100.0, 100.0, owners[2], &[3]),
                planet(3, 0.0, 100.0, owners[3], &[]),
            ],
            players: players(),
        };
        PlanetGraph::from_map(&map).unwrap()
    }

    #[test]
    fn test_edges_are_symmetric() {
        let graph = square([None; 4]);
        assert!(graph.are_adjacent(PlanetId(1), PlanetId(0)));
        assert!(graph.are_adjacent(PlanetId(2), PlanetId(0)));
        assert!(!graph.are_adjacent(PlanetId(1), PlanetId(3)));
    }

    #[test]
    fn test_direct_path() {
        let graph = square([Some(1), None, None, None]);
        assert_eq!(graph.find_path(PlanetId(0), PlanetId(1), ME), vec![PlanetId(1)]);
    }

    #[test]
    fn test_diagonal_beats_two_hops() {
        let graph = square([Some(1), None, None, None]);
        // 0->2 diagonal is ~141, 0->1->2 is 200
        assert_eq!(graph.find_path(PlanetId(0), PlanetId(2), ME), vec![PlanetId(2)]);
    }

    #[test]
    fn test_route_through_own_territory() {
        let graph = square([Some(1), Some(1), None, None]);
        let map = MapData {
            planets: vec![
                planet(0, 0.0, 0.0, Some(1), &[1]),
                planet(1, 100.0, 0.0, Some(1), &[2]),
                planet(2, 200.0, 0.0, None, &[]),
            ],
            players: players(),
        };
        let line = PlanetGraph::from_map(&map).unwrap();
        assert_eq!(
            line.find_path(PlanetId(0), PlanetId(2), ME),
            vec![PlanetId(1), PlanetId(2)]
        );
        assert_eq!(graph.find_path(PlanetId(1), PlanetId(3), ME).last(), Some(&PlanetId(3)));
    }

    #[test]
    fn test_enemy_space_blocks_route() {
        // 0(me) - 1(enemy) - 2(neutral): edge 1-2 touches no planet of mine
        let map = MapData {
            planets: vec![
                planet(0, 0.0, 0.0, Some(1), &[1]),
                planet(1, 100.0, 0.0, Some(2), &[2]),
                planet(2, 200.0, 0.0, None, &[]),
            ],
            players: players(),
        };
        let graph = PlanetGraph::from_map(&map).unwrap();
        assert_eq!(graph.find_path(PlanetId(0), PlanetId(1), ME), vec![PlanetId(1)]);
        assert!(graph.find_path(PlanetId(0), PlanetId(2), ME).is_empty());
        // The enemy can go anywhere it touches
        assert_eq!(graph.find_path(PlanetId(1), PlanetId(2), ENEMY), vec![PlanetId(2)]);
    }

    #[test]
    fn test_same_planet_is_empty() {
        let graph = square([Some(1), None, None, None]);
        assert!(graph.find_path(PlanetId(0), PlanetId(0), ME).is_empty());
    }

    #[test]
    fn test_unknown_planet_is_empty() {
        let graph = square([Some(1), None, None, None]);
        assert!(graph.find_path(PlanetId(0), PlanetId(42), ME).is_empty());
    }

    #[test]
    fn test_tie_break_prefers_lowest_index() {
        // Two equal routes 0->1->3 and 0->2->3; planet 1 is settled first.
        let map = MapData {
            planets: vec![
                planet(0, 0.0, 0.0, Some(1), &[1, 2]),
                planet(1, 100.0, 100.0, Some(1), &[3]),
                planet(2, 100.0, -100.0, Some(1), &[3]),
                planet(3, 200.0, 0.0, None, &[]),
            ],
            players: players(),
        };
        let graph = PlanetGraph::from_map(&map).unwrap();
        for _ in 0..10 {
            assert_eq!(
                graph.find_path(PlanetId(0), PlanetId(3), ME),
                vec![PlanetId(1), PlanetId(3)]
            );
        }
    }

    #[test]
    fn test_map_validation() {
        assert_eq!(PlanetGraph::from_map(&MapData::default()).unwrap_err(), MapError::Empty);

        let bad_link = MapData { planets: vec![planet(0, 0.0, 0.0, None, &[5])], players: players() };
        assert_eq!(
            PlanetGraph::from_map(&bad_link).unwrap_err(),
            MapError::UnknownPlanet { from: 0, to: 5 }
        );

        let self_loop = MapData { planets: vec![planet(0, 0.0, 0.0, None, &[0])], players: players() };
        assert_eq!(PlanetGraph::from_map(&self_loop).unwrap_err(), MapError::SelfLoop(0));

        let bad_id = MapData { planets: vec![planet(3, 0.0, 0.0, None, &[])], players: players() };
        assert_eq!(
            PlanetGraph::from_map(&bad_id).unwrap_err(),
            MapError::IdMismatch { index: 0, id: 3 }
        );

        let bad_owner = MapData { planets: vec![planet(0, 0.0, 0.0, Some(9), &[])], players: players() };
        assert_eq!(
            PlanetGraph::from_map(&bad_owner).unwrap_err(),
            MapError::UnknownOwner { planet: 0, player: 9 }
        );
    }

    #[test]
    fn test_map_from_json() {
        let json = r#"{
            "planets": [
                { "id": 0, "x": 0, "y": 0, "size": 12, "owner": 1, "nodes": [1] },
                { "id": 1, "x": 50, "y": 0, "size": 8 }
            ],
            "players": [ { "id": 1, "color": 3 } ]
        }"#;
        let map = MapData::from_json(json).unwrap();
        let graph = PlanetGraph::from_map(&map).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.get(PlanetId(0)).unwrap().owner, Some(PlayerId(1)));
        assert!(graph.are_adjacent(PlanetId(1), PlanetId(0)));
        assert!(matches!(MapData::from_json("{"), Err(MapError::Parse(_))));
    }

    /// Reference shortest distance (Bellman-Ford over accessible edges).
    fn reference_distance(graph: &PlanetGraph, origin: PlanetId, player: PlayerId) -> Vec<f64> {
        let mut dist = vec![f64::INFINITY; graph.len()];
        dist[origin.index()] = 0.0;
        for _ in 0..graph.len() {
            for p in graph.iter() {
                for &n in &p.nodes {
                    let q = graph.get(n).unwrap();
                    if p.owner != Some(player) && q.owner != Some(player) {
                        continue;
                    }
                    let alt = dist[p.id.index()] + p.distance(q);
                    if alt < dist[n.index()] {
                        dist[n.index()] = alt;
                    }
                }
            }
        }
        dist
    }

    proptest! {
        #[test]
        fn prop_path_is_shortest(
            coords in proptest::collection::vec((0u32..1000, 0u32..1000, 0u8..3), 2..9),
            edges in proptest::collection::vec((0usize..9, 0usize..9), 0..20),
        ) {
            let n = coords.len();
            let planets: Vec<PlanetData> = coords
                .iter()
                .enumerate()
                .map(|(i, (x, y, owner))| PlanetData {
                    id: i as u32,
                    x: *x as f64,
                    y: *y as f64,
                    size: 5.0,
                    owner: match owner { 0 => None, o => Some(*o as u32) },
                    nodes: edges
                        .iter()
                        .filter(|(a, b)| *a == i && *b < n && *b != i)
                        .map(|(_, b)| *b as u32)
                        .collect(),
                    resources: 1.0,
                    capacity: 0,
                })
                .collect();
            let graph = PlanetGraph::from_map(&MapData { planets, players: players() }).unwrap();
            let reference = reference_distance(&graph, PlanetId(0), ME);

            for target in 1..n {
                let path = graph.find_path(PlanetId(0), PlanetId(target as u32), ME);
                if reference[target].is_finite() {
                    prop_assert_eq!(path.last(), Some(&PlanetId(target as u32)));
                    let length = graph.path_length(PlanetId(0), &path);
                    prop_assert!((length - reference[target]).abs() < 1e-6);
                } else {
                    prop_assert!(path.is_empty());
                }
            }
        }
    }
}
