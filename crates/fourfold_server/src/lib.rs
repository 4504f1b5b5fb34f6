//! Fourfold - Connect Four matchmaking server
//!
//! Pairs players over WebSocket, falls back to a heuristic bot when nobody
//! else shows up, holds seats open across short disconnects, and records
//! finished games in SQLite.
//!
//! # Architecture
//!
//! - **Registry**: [`Matchmaker`] owns the queue, sessions and every timer
//! - **Session**: [`GameSession`] wraps one [`fourfold_board::Game`] and its two seats
//! - **Protocol**: [`ServerMessage`] / [`ClientMessage`] JSON frames
//! - **Collaborators**: [`GameRecorder`] for persistence, [`EventPublisher`] for analytics
//! - **Transport**: axum router exposing `/ws`, `/leaderboard` and `/health`
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fourfold_server::{Matchmaker, NullRecorder, Timings, TracingPublisher};
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let matchmaker = Matchmaker::new(
//!     Timings::default(),
//!     "Bot",
//!     Arc::new(NullRecorder),
//!     Arc::new(TracingPublisher),
//! );
//!
//! let (handle, mut inbox) = mpsc::unbounded_channel();
//! matchmaker.enqueue("alice", handle)?;
//! while let Some(message) = inbox.recv().await {
//!     println!("{:?}", message);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod db;
mod error;
mod events;
mod protocol;
mod recorder;
mod registry;
mod session;
mod transport;

// Crate-level exports - Configuration
pub use config::{ConfigError, ServerConfig, Timings};

// Crate-level exports - Persistence
pub use db::{
    AggregatedStats, DbError, GAME_TYPE, GameOutcome, GameRepository, GameStat, LeaderboardEntry,
    NewGameStat, User,
};
pub use recorder::{CompletedGame, GameRecorder, NullRecorder};

// Crate-level exports - Analytics
pub use events::{DRAW_SENTINEL, EventPublisher, GameEvent, PublishError, TracingPublisher};

// Crate-level exports - Matchmaking
pub use error::Rejection;
pub use protocol::{ClientMessage, PlayerHandle, ServerMessage, SessionId};
pub use registry::Matchmaker;
pub use session::{GameSession, Seat, SessionSnapshot};

// Crate-level exports - Transport
pub use transport::{AppState, DEFAULT_LEADERBOARD_LIMIT, router};
