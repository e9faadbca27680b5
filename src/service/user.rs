use std::sync::Arc;

use crate::codec::{game_stat_key, RankKeyEncoder};
use crate::config::Config;
use crate::error::{EntityKind, Result, ScoreboardError};
use crate::model::{GameStat, User, UserBasic};
use crate::repository::Repositories;
use crate::store::{Condition, RecordStore, Transaction};

use super::with_conflict_retry;

/// User profiles and per-user stats
pub struct UserService {
    store: Arc<dyn RecordStore>,
    repos: Repositories,
    max_conflict_retries: u32,
}

impl UserService {
    pub fn new(store: Arc<dyn RecordStore>, config: &Config) -> Result<Self> {
        let encoder = RankKeyEncoder::new(config.rank_key_width)?;
        Ok(Self {
            repos: Repositories::new(Arc::clone(&store), encoder),
            store,
            max_conflict_retries: config.max_conflict_retries,
        })
    }

    pub fn get_user(&self, user_id: &str) -> Result<User> {
        self.repos.users.get(user_id)
    }

    pub fn get_user_basics_by_prefix(&self, prefix: &str) -> Result<Vec<UserBasic>> {
        self.repos.users.get_basics_by_prefix(prefix)
    }

    pub fn get_game_stat(&self, user_id: &str, game_id: &str) -> Result<GameStat> {
        self.repos.stats.get(user_id, game_id)
    }

    pub fn create_user(&self, user: &User) -> Result<()> {
        self.repos.users.create(user, None)?;
        tracing::info!("Created user {}", user.id);
        Ok(())
    }

    pub fn update_user(&self, user: &User) -> Result<()> {
        self.repos.users.update(user, None)
    }

    pub fn delete_user(&self, user_id: &str) -> Result<()> {
        self.repos.users.delete(user_id, None)?;
        tracing::info!("Deleted user {}", user_id);
        Ok(())
    }

    /// Forget a user's history in one game
    ///
    /// Deletes the stat and every leaderboard entry of (game, user) in one
    /// transaction. Matches are left untouched.
    pub fn reset_game_stat(&self, user_id: &str, game_id: &str) -> Result<()> {
        with_conflict_retry("reset_game_stat", self.max_conflict_retries, || {
            let stat = self
                .repos
                .stats
                .find_versioned(user_id, game_id)?
                .ok_or_else(|| {
                    ScoreboardError::not_found(EntityKind::GameStat, game_stat_key(user_id, game_id).to_string())
                })?;

            let mut tx = Transaction::new();
            let entries = self
                .repos
                .leaderboards
                .delete_all_for_game_and_user(game_id, user_id, Some(&mut tx))?;
            self.repos
                .stats
                .delete(user_id, game_id, Condition::Version(stat.version), Some(&mut tx))?;

            tx.commit(self.store.as_ref())?;
            tracing::info!("Reset stat {}/{} ({} leaderboard entries)", user_id, game_id, entries);
            Ok(())
        })
    }
}
