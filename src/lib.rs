//! # Scoreboard
//!
//! A multiplayer scoreboard engine with:
//! - Games, users, matches and per-user cumulative stats
//! - Sorted leaderboards per (game, ranked attribute)
//! - Denormalized views kept consistent through atomic multi-record commits
//! - Optimistic concurrency with automatic conflict retry
//! - Write-Ahead Logging (WAL) and snapshots for durability
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Services (orchestrators)                     │
//! │         GameService · MatchService · UserService             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  one Transaction per operation
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Repositories                             │
//! │   Game · User · Match · GameStat · Leaderboard (rank keys)   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  Record <-> struct (codec)
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  RecordStore (trait)                         │
//! │     get · prefix query · transact (conditional, atomic)      │
//! └──────────┬─────────────────────────────────┬────────────────┘
//!            │                                 │
//!            ▼                                 ▼
//!   ┌─────────────────┐              ┌──────────────────┐
//!   │   MemoryStore   │              │   DurableStore   │
//!   │ (ordered table) │              │ table + WAL +    │
//!   └─────────────────┘              │ snapshot         │
//!                                    └──────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod store;
pub mod model;
pub mod codec;
pub mod repository;
pub mod service;
pub mod scoreboard;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{EntityKind, Result, ScoreboardError};
pub use config::{Config, GameDeletePolicy, WalSyncStrategy};
pub use model::{BoundedLeaderboard, Game, GameStat, Leaderboard, LeaderboardEntry, Match, User, UserBasic};
pub use scoreboard::Scoreboard;
pub use store::{DurableStore, MemoryStore, RecordStore, Transaction};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the scoreboard engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
