//! Scoreboard facade
//!
//! Wires one record store to the three services.

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::service::{GameService, MatchService, UserService};
use crate::store::{DurableStore, MemoryStore, RecordStore};

/// Entry point of the crate
///
/// All services share the same store; each operation is independent and
/// coordinates only through store transactions.
pub struct Scoreboard {
    store: Arc<dyn RecordStore>,
    games: GameService,
    matches: MatchService,
    users: UserService,
}

impl Scoreboard {
    /// Open (or create) a durable scoreboard in `config.data_dir`
    pub fn open(config: Config) -> Result<Self> {
        let store = DurableStore::open(config.clone())?;
        tracing::info!("Scoreboard opened at {}", config.data_dir.display());
        Self::with_store(Arc::new(store), &config)
    }

    /// A volatile scoreboard (nothing touches the disk)
    pub fn in_memory(config: &Config) -> Result<Self> {
        config.validate()?;
        let store = MemoryStore::with_max_transaction_ops(config.max_transaction_ops);
        Self::with_store(Arc::new(store), config)
    }

    /// Run the services over any store implementation
    pub fn with_store(store: Arc<dyn RecordStore>, config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            games: GameService::new(Arc::clone(&store), config)?,
            matches: MatchService::new(Arc::clone(&store), config)?,
            users: UserService::new(Arc::clone(&store), config)?,
            store,
        })
    }

    pub fn games(&self) -> &GameService {
        &self.games
    }

    pub fn matches(&self) -> &MatchService {
        &self.matches
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Flush the store and drop the scoreboard
    pub fn close(self) -> Result<()> {
        self.store.sync()
    }
}
