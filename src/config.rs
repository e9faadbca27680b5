//! Configuration for the scoreboard engine
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, ScoreboardError};

/// Widest rank key that still fits every non-negative `i64`
pub const MAX_RANK_KEY_WIDTH: usize = 19;

/// Main configuration for a scoreboard instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log          (write-ahead log)
    ///     └── snapshot.bin     (compacted record table)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    /// Number of WAL entries after which the table is snapshotted and the
    /// WAL truncated
    pub compaction_threshold: u64,

    // -------------------------------------------------------------------------
    // Transaction Configuration
    // -------------------------------------------------------------------------
    /// Chunk size of batched bulk cleanups (game edits and deletes);
    /// match transactions are committed whole
    pub max_transaction_ops: usize,

    /// How many times an orchestration is re-run after an optimistic
    /// condition failure
    pub max_conflict_retries: u32,

    // -------------------------------------------------------------------------
    // Leaderboard Configuration
    // -------------------------------------------------------------------------
    /// Digits used to zero-pad values inside leaderboard sort keys.
    /// Changing it on an existing data directory orphans old entries.
    pub rank_key_width: usize,

    /// What happens to matches and stats when their game is deleted
    pub game_delete_policy: GameDeletePolicy,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

/// Cascade policy applied by `GameService::delete_game`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameDeletePolicy {
    /// Remove the game and its leaderboard entries; matches and stats outlive it
    #[default]
    RetainHistory,

    /// Also remove every match of the game and the stats of every player
    Purge,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./scoreboard_data"),
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            compaction_threshold: 10_000,
            max_transaction_ops: 100,
            max_conflict_retries: 3,
            rank_key_width: 10,
            game_delete_policy: GameDeletePolicy::RetainHistory,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<()> {
        if self.rank_key_width == 0 || self.rank_key_width > MAX_RANK_KEY_WIDTH {
            return Err(ScoreboardError::Config(format!(
                "rank_key_width must be in 1..={}, got {}",
                MAX_RANK_KEY_WIDTH, self.rank_key_width
            )));
        }
        if self.max_transaction_ops < 2 {
            return Err(ScoreboardError::Config(format!(
                "max_transaction_ops must be at least 2, got {}",
                self.max_transaction_ops
            )));
        }
        if self.compaction_threshold == 0 {
            return Err(ScoreboardError::Config(
                "compaction_threshold must be positive".to_string(),
            ));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(ScoreboardError::Config(
                "WAL sync count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the number of WAL entries that triggers compaction
    pub fn compaction_threshold(mut self, entries: u64) -> Self {
        self.config.compaction_threshold = entries;
        self
    }

    /// Set the bulk cleanup chunk size
    pub fn max_transaction_ops(mut self, count: usize) -> Self {
        self.config.max_transaction_ops = count;
        self
    }

    /// Set the number of retries after a condition failure
    pub fn max_conflict_retries(mut self, retries: u32) -> Self {
        self.config.max_conflict_retries = retries;
        self
    }

    /// Set the zero-padding width of leaderboard values
    pub fn rank_key_width(mut self, width: usize) -> Self {
        self.config.rank_key_width = width;
        self
    }

    /// Set the cascade policy for game deletion
    pub fn game_delete_policy(mut self, policy: GameDeletePolicy) -> Self {
        self.config.game_delete_policy = policy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
