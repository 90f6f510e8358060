//! Match Session Management
//!
//! Drives one simulation at a fixed tick rate. Commands arrive over an mpsc
//! channel and are queued for the next tick; every tick payload is broadcast
//! to all subscribers. Transport framing lives outside this crate.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::hash::StateHash;
use crate::core::rng::derive_match_seed;
use crate::game::command::Command;
use crate::game::config::GameConfig;
use crate::game::events::GameEvent;
use crate::game::graph::{MapData, MapError};
use crate::game::state::{hash_hex, Simulation};
use crate::game::tick::{tick, TickResult};
use crate::sync::encoder::SyncEncoder;
use crate::sync::protocol::TickPayload;

/// Unique session identifier.
pub type SessionId = Uuid;

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, not ticking yet.
    Lobby,
    /// Tick loop running.
    Playing,
    /// Tick limit reached or shut down.
    Ended,
}

/// Configuration for a match session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Ticks per second.
    pub tick_rate: u32,
    /// Buffered payloads per subscriber before it starts lagging.
    pub payload_capacity: usize,
    /// Buffered commands before senders wait.
    pub command_capacity: usize,
    /// Ticks between angle refreshes (0 disables them).
    pub angle_refresh_interval: u32,
    /// Stop after this many ticks (0 runs until shutdown).
    pub max_ticks: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_rate: crate::TICK_RATE,
            payload_capacity: 256,
            command_capacity: 1024,
            angle_refresh_interval: 100,
            max_ticks: 0,
        }
    }
}

impl SessionConfig {
    /// Wall-clock duration of one tick.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.tick_rate.max(1) as u64)
    }
}

/// Session errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// Tick loop already started.
    #[error("Match already started")]
    AlreadyStarted,

    /// Session is not ticking.
    #[error("Match not in progress")]
    MatchNotInProgress,

    /// Match has ended.
    #[error("Match ended")]
    MatchEnded,

    /// Command channel closed.
    #[error("Command channel closed")]
    ChannelClosed,

    /// Session id not registered.
    #[error("Session not found")]
    SessionNotFound,

    /// Map rejected at setup.
    #[error("Invalid map: {0}")]
    Map(#[from] MapError),
}

/// Summary of a finished match.
#[derive(Debug, Clone)]
pub struct MatchSummary {
    /// Session identifier.
    pub id: SessionId,
    /// Last tick run.
    pub end_tick: u32,
    /// Final state hash.
    pub final_hash: StateHash,
    /// When ticking started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the match ended.
    pub ended_at: DateTime<Utc>,
}

/// A match session.
pub struct MatchSession {
    /// Unique session identifier.
    pub id: SessionId,
    /// Current state.
    pub state: SessionState,
    /// Session configuration.
    pub config: SessionConfig,
    /// Authoritative simulation.
    sim: Simulation,
    /// Command intake.
    command_tx: mpsc::Sender<Command>,
    command_rx: mpsc::Receiver<Command>,
    /// Payload fan-out.
    payload_tx: broadcast::Sender<TickPayload>,
    /// Event fan-out.
    event_tx: broadcast::Sender<GameEvent>,
    /// When session was created.
    created_at: DateTime<Utc>,
    /// When match started (if started).
    started_at: Option<DateTime<Utc>>,
}

impl MatchSession {
    /// Create a session around a prepared simulation.
    pub fn new(id: SessionId, sim: Simulation, config: SessionConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity.max(1));
        let (payload_tx, _) = broadcast::channel(config.payload_capacity.max(1));
        let (event_tx, _) = broadcast::channel(config.payload_capacity.max(1));

        Self {
            id,
            state: SessionState::Lobby,
            config,
            sim,
            command_tx,
            command_rx,
            payload_tx,
            event_tx,
            created_at: Utc::now(),
            started_at: None,
        }
    }

    /// Create a session from map data, seeding the RNG from the session id
    /// and the declared players.
    pub fn from_map(
        id: SessionId,
        map: &MapData,
        game_config: GameConfig,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let player_ids: Vec<u32> = map.players.iter().map(|p| p.id).collect();
        let seed = derive_match_seed(id.as_bytes(), &player_ids);
        let sim = Simulation::from_map(map, game_config, seed)?;
        Ok(Self::new(id, sim, config))
    }

    /// Handle for submitting commands.
    pub fn command_sender(&self) -> mpsc::Sender<Command> {
        self.command_tx.clone()
    }

    /// Subscribe to tick payloads.
    pub fn subscribe(&self) -> broadcast::Receiver<TickPayload> {
        self.payload_tx.subscribe()
    }

    /// Subscribe to game events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<GameEvent> {
        self.event_tx.subscribe()
    }

    /// Creation records for every ship, for a subscriber joining late.
    pub fn full_state(&self) -> TickPayload {
        SyncEncoder::full_state(&self.sim)
    }

    /// Read access to the simulation.
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Setup access to the simulation (spawns, factories) before start.
    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }

    /// Get current tick.
    pub fn current_tick(&self) -> u32 {
        self.sim.tick
    }

    /// When the session was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Start ticking.
    pub fn begin_playing(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Lobby => {
                self.state = SessionState::Playing;
                self.started_at = Some(Utc::now());
                info!(session = %self.id, seed = self.sim.rng_seed, "Match started");
                Ok(())
            }
            SessionState::Playing => Err(SessionError::AlreadyStarted),
            SessionState::Ended => Err(SessionError::MatchEnded),
        }
    }

    /// Run a single game tick.
    ///
    /// Drains the command channel, ticks, adds angle refreshes on their
    /// interval and broadcasts the payload and events.
    pub fn run_tick(&mut self) -> Result<TickResult, SessionError> {
        match self.state {
            SessionState::Playing => {}
            SessionState::Lobby => return Err(SessionError::MatchNotInProgress),
            SessionState::Ended => return Err(SessionError::MatchEnded),
        }

        while let Ok(command) = self.command_rx.try_recv() {
            self.sim.queue_command(command);
        }

        let mut result = tick(&mut self.sim);

        let every = self.config.angle_refresh_interval;
        if every > 0 && result.tick % every == 0 {
            let refreshed = SyncEncoder::angle_refresh(&self.sim, &mut result.payload);
            debug!(tick = result.tick, refreshed, "Angle refresh");
        }

        // No subscribers is not an error
        if !result.payload.is_empty() {
            let _ = self.payload_tx.send(result.payload.clone());
        }
        for event in &result.events {
            let _ = self.event_tx.send(event.clone());
        }

        if self.config.max_ticks > 0 && result.tick >= self.config.max_ticks {
            self.state = SessionState::Ended;
        }

        Ok(result)
    }

    /// End the match and summarize it.
    pub fn finalize(&mut self) -> MatchSummary {
        self.state = SessionState::Ended;
        let final_hash = self.sim.compute_hash();
        info!(
            session = %self.id,
            tick = self.sim.tick,
            hash = %hash_hex(&final_hash),
            "Match ended"
        );
        MatchSummary {
            id: self.id,
            end_tick: self.sim.tick,
            final_hash,
            started_at: self.started_at,
            ended_at: Utc::now(),
        }
    }

    /// Get session state.
    pub fn get_state(&self) -> SessionState {
        self.state
    }
}

/// Run a session's tick loop until it ends or `shutdown` flips to true.
pub async fn run_session(
    session: Arc<RwLock<MatchSession>>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<MatchSummary, SessionError> {
    let tick_duration = {
        let mut s = session.write().await;
        s.begin_playing()?;
        s.config.tick_duration()
    };

    let mut tick_interval = interval(tick_duration);
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                let mut s = session.write().await;
                if s.get_state() != SessionState::Playing {
                    break;
                }
                s.run_tick()?;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("Session shutdown requested");
                    break;
                }
            }
        }
    }

    let summary = session.write().await.finalize();
    Ok(summary)
}

/// Session manager.
pub struct SessionManager {
    sessions: RwLock<BTreeMap<SessionId, Arc<RwLock<MatchSession>>>>,
}

impl SessionManager {
    /// Create new session manager.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a new session for a prepared simulation.
    pub async fn create_session(&self, sim: Simulation, config: SessionConfig) -> SessionId {
        let id = Uuid::new_v4();
        let session = MatchSession::new(id, sim, config);
        self.sessions.write().await.insert(id, Arc::new(RwLock::new(session)));
        id
    }

    /// Create a new session from map data.
    pub async fn create_from_map(
        &self,
        map: &MapData,
        game_config: GameConfig,
        config: SessionConfig,
    ) -> Result<SessionId, SessionError> {
        let id = Uuid::new_v4();
        let session = MatchSession::from_map(id, map, game_config, config)?;
        self.sessions.write().await.insert(id, Arc::new(RwLock::new(session)));
        Ok(id)
    }

    /// Get session by ID.
    pub async fn get_session(&self, id: &SessionId) -> Option<Arc<RwLock<MatchSession>>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Submit a command to a session.
    pub async fn submit(&self, id: &SessionId, command: Command) -> Result<(), SessionError> {
        let sender = {
            let session = self.get_session(id).await.ok_or(SessionError::SessionNotFound)?;
            let s = session.read().await;
            if s.get_state() == SessionState::Ended {
                return Err(SessionError::MatchEnded);
            }
            s.command_sender()
        };
        sender.send(command).await.map_err(|_| SessionError::ChannelClosed)
    }

    /// Remove session.
    pub async fn remove_session(&self, id: &SessionId) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Get active session count.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop ended sessions. Returns how many were removed.
    pub async fn cleanup(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let mut to_remove = Vec::new();

        for (id, session) in sessions.iter() {
            if session.read().await.get_state() == SessionState::Ended {
                to_remove.push(*id);
            }
        }

        for id in &to_remove {
            sessions.remove(id);
        }
        if !to_remove.is_empty() {
            warn!(removed = to_remove.len(), "Removed ended sessions");
        }
        to_remove.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::config::ShipKind;
    use crate::game::graph::{PlanetData, PlayerData};
    use crate::game::state::{PlanetId, PlayerId};
    use crate::sync::replica::Replica;

    const ME: PlayerId = PlayerId(1);
    const FOE: PlayerId = PlayerId(2);

    fn map() -> MapData {
        MapData {
            planets: vec![
                PlanetData { id: 0, x: 0.0, y: 0.0, size: 12.0, owner: Some(1), nodes: vec![1], resources: 1.0, capacity: 10 },
                PlanetData { id: 1, x: 120.0, y: 0.0, size: 10.0, owner: None, nodes: vec![2], resources: 1.0, capacity: 10 },
                PlanetData { id: 2, x: 240.0, y: 0.0, size: 12.0, owner: Some(2), nodes: vec![], resources: 1.0, capacity: 10 },
            ],
            players: vec![PlayerData { id: 1, color: 0 }, PlayerData { id: 2, color: 1 }],
        }
    }

    fn fast(max_ticks: u32) -> SessionConfig {
        SessionConfig { tick_rate: 1000, max_ticks, angle_refresh_interval: 5, ..Default::default() }
    }

    fn create_test_session(max_ticks: u32) -> MatchSession {
        let mut session = MatchSession::from_map(Uuid::new_v4(), &map(), GameConfig::default(), fast(max_ticks)).unwrap();
        let sim = session.simulation_mut();
        sim.spawn_ship(ShipKind::Fight, PlanetId(0), ME, 0, true).unwrap();
        sim.spawn_ship(ShipKind::Bomb, PlanetId(2), FOE, 9000, false).unwrap();
        session
    }

    #[tokio::test]
    async fn test_tick_requires_playing() {
        let mut session = create_test_session(0);
        assert!(matches!(session.run_tick(), Err(SessionError::MatchNotInProgress)));
        session.begin_playing().unwrap();
        assert!(matches!(session.begin_playing(), Err(SessionError::AlreadyStarted)));
        assert_eq!(session.run_tick().unwrap().tick, 1);
        assert_eq!(session.current_tick(), 1);
    }

    #[tokio::test]
    async fn test_commands_reach_simulation() {
        let mut session = create_test_session(0);
        session.begin_playing().unwrap();
        let mut events = session.subscribe_events();

        let sender = session.command_sender();
        sender
            .send(Command::SendGroup { player: ME, from: PlanetId(0), kind: ShipKind::Fight, count: 1, target: PlanetId(1) })
            .await
            .unwrap();
        session.run_tick().unwrap();

        let mut sent = false;
        while let Ok(event) = events.try_recv() {
            sent |= matches!(event.data, crate::game::events::GameEventData::ShipSent { .. });
        }
        assert!(sent);
    }

    #[tokio::test]
    async fn test_max_ticks_ends_match() {
        let mut session = create_test_session(3);
        session.begin_playing().unwrap();
        for _ in 0..3 {
            session.run_tick().unwrap();
        }
        assert_eq!(session.get_state(), SessionState::Ended);
        assert!(matches!(session.run_tick(), Err(SessionError::MatchEnded)));
        assert_eq!(session.finalize().end_tick, 3);
    }

    #[tokio::test]
    async fn test_run_session_broadcasts_to_replica() {
        let session = create_test_session(30);
        let mut payloads = session.subscribe();
        let mut replica = Replica::new(&session.simulation().graph, session.simulation().config.clone());
        let session = Arc::new(RwLock::new(session));

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let summary = run_session(session.clone(), shutdown_rx).await.unwrap();
        assert_eq!(summary.end_tick, 30);
        assert!(summary.started_at.is_some());

        // Quiet ticks have no payload; fill the gaps before applying
        let mut received = 0;
        while let Ok(payload) = payloads.try_recv() {
            while replica.tick() + 1 < payload.tick {
                let gap = TickPayload { tick: replica.tick() + 1, records: vec![] };
                replica.apply(&gap).unwrap();
            }
            replica.apply(&payload).unwrap();
            received += 1;
        }
        assert!(received > 0);
        while replica.tick() < summary.end_tick {
            let gap = TickPayload { tick: replica.tick() + 1, records: vec![] };
            replica.apply(&gap).unwrap();
        }

        let s = session.read().await;
        let live: Vec<_> = s.simulation().live_ships().map(|ship| ship.snapshot()).collect();
        let mirrored: Vec<_> = replica.ships().copied().collect();
        assert_eq!(mirrored, live);
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let session = Arc::new(RwLock::new(create_test_session(0)));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_session(session.clone(), shutdown_rx));

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown_tx.send(true).unwrap();
        let summary = handle.await.unwrap().unwrap();
        assert_eq!(session.read().await.get_state(), SessionState::Ended);
        assert_eq!(summary.end_tick, session.read().await.current_tick());
    }

    #[tokio::test]
    async fn test_session_manager() {
        let manager = SessionManager::new();
        let id = manager.create_from_map(&map(), GameConfig::default(), fast(1)).await.unwrap();
        assert_eq!(manager.session_count().await, 1);

        manager.submit(&id, Command::Stop { player: ME, ships: vec![] }).await.unwrap();
        assert!(matches!(
            manager.submit(&Uuid::new_v4(), Command::Stop { player: ME, ships: vec![] }).await,
            Err(SessionError::SessionNotFound)
        ));

        let session = manager.get_session(&id).await.unwrap();
        {
            let mut s = session.write().await;
            s.begin_playing().unwrap();
            s.run_tick().unwrap();
        }
        assert_eq!(manager.cleanup().await, 1);
        assert_eq!(manager.session_count().await, 0);
        assert!(!manager.remove_session(&id).await);
    }

    #[tokio::test]
    async fn test_invalid_map_rejected() {
        let mut bad = map();
        bad.planets[1].nodes.push(7);
        let manager = SessionManager::new();
        let result = manager.create_from_map(&bad, GameConfig::default(), fast(1)).await;
        assert!(matches!(result, Err(SessionError::Map(_))));
    }
}
