//! Orbit Simulation Server
//!
//! Runs a scripted demo match, mirrors it through the delta protocol and
//! replays it to verify determinism.

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use orbit::{
    TICK_RATE, VERSION,
    game::{
        command::Command,
        config::{GameConfig, ShipKind},
        events::GameEventData,
        graph::{MapData, PlanetData, PlayerData},
        state::{hash_hex, PlanetId, PlayerId, Simulation},
        tick::{replay_match, tick},
    },
    sync::{encoder::SyncEncoder, replica::Replica},
};

const DEMO_TICKS: u32 = 1200;
const DEMO_SEED: u64 = 12345;
const RED: PlayerId = PlayerId(1);
const BLUE: PlayerId = PlayerId(2);

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Orbit Server v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    demo_match()
}

/// Five planets in a ring with a shortcut through the middle.
fn demo_map() -> MapData {
    let planet = |id: u32, x: f64, y: f64, size: f64, owner: Option<u32>, nodes: Vec<u32>| PlanetData {
        id,
        x,
        y,
        size,
        owner,
        nodes,
        resources: 1.0,
        capacity: 50,
    };

    MapData {
        planets: vec![
            planet(0, 0.0, 0.0, 20.0, Some(1), vec![1, 2]),
            planet(1, 300.0, -150.0, 12.0, None, vec![3]),
            planet(2, 150.0, 0.0, 15.0, None, vec![3]),
            planet(3, 300.0, 150.0, 12.0, None, vec![4]),
            planet(4, 450.0, 0.0, 20.0, Some(2), vec![1]),
        ],
        players: vec![PlayerData { id: 1, color: 0 }, PlayerData { id: 2, color: 1 }],
    }
}

fn setup(map: &MapData) -> Result<Simulation> {
    let mut sim = Simulation::from_map(map, GameConfig::default(), DEMO_SEED).context("invalid demo map")?;
    for kind in ShipKind::ALL {
        for _ in 0..4 {
            sim.spawn_ship_random_angle(kind, PlanetId(0), RED, false);
            sim.spawn_ship_random_angle(kind, PlanetId(4), BLUE, false);
        }
    }
    sim.add_factory(PlanetId(0), RED, 0, true);
    sim.add_factory(PlanetId(4), BLUE, 18000, true);
    Ok(sim)
}

/// Commands queued before each tick.
fn script() -> Vec<Vec<Command>> {
    let mut commands = vec![Vec::new(); DEMO_TICKS as usize];
    let group = |player, from, kind, target| Command::SendGroup { player, from, kind, count: 3, target };

    commands[20] = vec![
        group(RED, PlanetId(0), ShipKind::Fight, PlanetId(2)),
        group(BLUE, PlanetId(4), ShipKind::Bomb, PlanetId(1)),
    ];
    commands[200] = vec![
        group(RED, PlanetId(0), ShipKind::Bomb, PlanetId(3)),
        group(BLUE, PlanetId(4), ShipKind::Fight, PlanetId(3)),
    ];
    commands[500] = vec![
        group(RED, PlanetId(2), ShipKind::Fight, PlanetId(3)),
        group(BLUE, PlanetId(1), ShipKind::Bomb, PlanetId(0)),
        group(RED, PlanetId(0), ShipKind::Def, PlanetId(1)),
    ];
    commands[800] = vec![group(BLUE, PlanetId(4), ShipKind::Def, PlanetId(3))];
    commands
}

/// Demo function to exercise the simulation.
fn demo_match() -> Result<()> {
    info!("=== Starting Demo Match ===");

    let map = demo_map();
    let mut sim = setup(&map)?;
    let commands = script();
    let mut replica = Replica::new(&sim.graph, sim.config.clone());

    info!("RNG Seed: {}", DEMO_SEED);
    info!("Planets: {}, ships: {}", sim.graph.len(), sim.ships.len());

    let mut hashes = Vec::with_capacity(DEMO_TICKS as usize);
    let mut total_events = 0;
    let mut total_records = 0;

    for batch in &commands {
        for command in batch {
            sim.queue_command(command.clone());
        }

        let mut result = tick(&mut sim);
        if result.tick % 100 == 0 {
            SyncEncoder::angle_refresh(&sim, &mut result.payload);
        }
        total_events += result.events.len();
        total_records += result.payload.records.len();
        hashes.push(sim.compute_hash());

        replica.apply(&result.payload).context("replica rejected payload")?;

        // Log important events
        for event in &result.events {
            match &event.data {
                GameEventData::PlanetCaptured { planet, old_owner, new_owner } => {
                    info!("Tick {}: {:?} captured by {:?} (was {:?})", event.tick, planet, new_owner, old_owner);
                }
                GameEventData::FactoryDestroyed { factory_id, planet, .. } => {
                    info!("Tick {}: factory {:?} on {:?} destroyed", event.tick, factory_id, planet);
                }
                GameEventData::RouteAborted { ship_id, planet, .. } => {
                    warn!("Tick {}: {:?} stranded at {:?}", event.tick, ship_id, planet);
                }
                _ => {}
            }
        }

        if result.tick % 200 == 0 {
            let red = sim.get_player(RED).map_or(0, |p| p.ship_count);
            let blue = sim.get_player(BLUE).map_or(0, |p| p.ship_count);
            info!("Tick {}: red {} ships, blue {} ships, {} events so far", result.tick, red, blue, total_events);
        }
    }

    // Mirror check
    let live: Vec<_> = sim.live_ships().map(|s| s.snapshot()).collect();
    let mirrored: Vec<_> = replica.ships().copied().collect();
    if live != mirrored {
        bail!("replica diverged at tick {}", sim.tick);
    }
    info!("Replica in sync: {} ships from {} records", mirrored.len(), total_records);

    // Print final results
    info!("=== Match Results ===");
    let hash = sim.compute_hash();
    info!("Final State Hash: {}", hash_hex(&hash));
    for planet in sim.graph.iter() {
        info!("{:?}: owner {:?}, {} ships", planet.id, planet.owner, planet.ship_count());
    }
    info!("Total events: {}", total_events);

    // Verify determinism by replaying
    info!("=== Verifying Determinism ===");
    let (replay_final, replay_hashes, _) = replay_match(setup(&map)?, &commands, DEMO_TICKS);
    let replay_hash = replay_final.compute_hash();
    info!("Replay State Hash: {}", hash_hex(&replay_hash));

    if let Some(index) = hashes.iter().zip(&replay_hashes).position(|(a, b)| a != b) {
        bail!("DETERMINISM FAILURE: hashes differ at tick {}", index + 1);
    }
    info!("DETERMINISM VERIFIED: Hashes match!");
    Ok(())
}
