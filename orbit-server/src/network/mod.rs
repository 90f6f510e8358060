//! Network Layer
//!
//! Match session runtime: tick pacing, command intake and payload fan-out.
//! This layer is **non-deterministic** - all game logic runs through `game/`.

pub mod session;

pub use session::{
    MatchSession, MatchSummary, SessionConfig, SessionError, SessionId, SessionManager,
    SessionState, run_session,
};
