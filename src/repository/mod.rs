//! Repositories
//!
//! One repository per entity type; the only code that touches the store.
//!
//! ## Responsibilities
//! - Translate entity operations into keyed store reads and writes
//! - Append writes to a caller's `Transaction`, or execute them immediately
//!   when none is given (the caller that created a transaction commits it)
//! - Wrap store failures with the entity kind and operation name
//!
//! ```text
//!   Service ──► Repository ──► Transaction? ──► RecordStore::transact
//!                   │                 (Some: append, None: execute now)
//!                   └── EntityCodec (Record <-> struct)
//! ```

mod game;
mod game_match;
mod leaderboard;
mod stat;
mod user;

use std::sync::Arc;

use crate::codec::{EntityCodec, RankKeyEncoder};
use crate::error::{RepositoryContext, Result, ScoreboardError};
use crate::store::{execute_or_append, Condition, RecordKey, RecordStore, Transaction, WriteOp};

pub use game::GameRepository;
pub use game_match::MatchRepository;
pub use leaderboard::LeaderboardRepository;
pub use stat::GameStatRepository;
pub use user::UserRepository;

/// An entity together with the store version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

/// Every repository over one shared store
#[derive(Clone)]
pub struct Repositories {
    pub games: GameRepository,
    pub users: UserRepository,
    pub matches: MatchRepository,
    pub stats: GameStatRepository,
    pub leaderboards: LeaderboardRepository,
}

impl Repositories {
    pub fn new(store: Arc<dyn RecordStore>, encoder: RankKeyEncoder) -> Self {
        Self {
            games: GameRepository::new(Arc::clone(&store)),
            users: UserRepository::new(Arc::clone(&store)),
            matches: MatchRepository::new(Arc::clone(&store)),
            stats: GameStatRepository::new(Arc::clone(&store)),
            leaderboards: LeaderboardRepository::new(store, encoder),
        }
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Point read and decode
fn find_versioned<T: EntityCodec>(
    store: &dyn RecordStore,
    key: &RecordKey,
    operation: &'static str,
) -> Result<Option<Versioned<T>>> {
    let Some(record) = store.get(key).context(T::KIND, operation)? else {
        return Ok(None);
    };
    let value = T::from_record(&record).context(T::KIND, operation)?;
    Ok(Some(Versioned {
        value,
        version: record.version,
    }))
}

/// Point read that fails with `NotFound` on a miss
fn get_existing<T: EntityCodec>(store: &dyn RecordStore, key: &RecordKey, operation: &'static str) -> Result<T> {
    find_versioned(store, key, operation)?
        .map(|found| found.value)
        .ok_or_else(|| ScoreboardError::not_found(T::KIND, key.to_string()))
}

/// Write an entity under `condition`
///
/// Executed immediately (no caller transaction), a failed `Absent` reports
/// `AlreadyExists` and a failed `Exists` reports `NotFound`. Inside a
/// transaction the condition is only evaluated at commit.
fn write_entity<T: EntityCodec>(
    store: &dyn RecordStore,
    tx: Option<&mut Transaction>,
    op: WriteOp,
    operation: &'static str,
) -> Result<()> {
    let immediate = tx.is_none();
    let key = op.key().to_string();
    let condition = op.condition();

    match execute_or_append(store, tx, op) {
        Err(err) if immediate && err.is_conflict() => Err(match condition {
            Condition::Absent => ScoreboardError::AlreadyExists { entity: T::KIND, key },
            Condition::Exists => ScoreboardError::not_found(T::KIND, key),
            _ => err,
        }),
        other => other,
    }
    .context(T::KIND, operation)
}
