//! Game orchestration
//!
//! Game definitions own the set of ranked attributes, so editing or
//! deleting a game rewrites whole slices of the leaderboard index. Those
//! bulk writes may exceed one store transaction and are committed in
//! batches, with the game record itself in the last batch.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::codec::{game_stat_key, RankKeyEncoder};
use crate::config::{Config, GameDeletePolicy};
use crate::error::{EntityKind, Result, ScoreboardError};
use crate::model::{BoundedLeaderboard, Game, Leaderboard, LeaderboardEntry, UserId};
use crate::repository::Repositories;
use crate::store::{Condition, RecordStore, Transaction, WriteOp};

use super::with_conflict_retry;

pub struct GameService {
    store: Arc<dyn RecordStore>,
    repos: Repositories,
    max_conflict_retries: u32,
    delete_policy: GameDeletePolicy,
}

impl GameService {
    pub fn new(store: Arc<dyn RecordStore>, config: &Config) -> Result<Self> {
        let encoder = RankKeyEncoder::new(config.rank_key_width)?;
        Ok(Self {
            repos: Repositories::new(Arc::clone(&store), encoder),
            store,
            max_conflict_retries: config.max_conflict_retries,
            delete_policy: config.game_delete_policy,
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn get_game(&self, game_id: &str) -> Result<Game> {
        self.repos.games.get(game_id)
    }

    pub fn get_leaderboard(&self, game_id: &str, attribute: &str) -> Result<Leaderboard> {
        self.require_ranked(game_id, attribute)?;
        self.repos.leaderboards.get(game_id, attribute)
    }

    pub fn get_bounded_leaderboard(&self, game_id: &str, attribute: &str, limit: usize) -> Result<BoundedLeaderboard> {
        self.require_ranked(game_id, attribute)?;
        self.repos.leaderboards.get_bounded(game_id, attribute, limit)
    }

    /// Leaderboard with the value each user is ranked by
    pub fn get_leaderboard_entries(
        &self,
        game_id: &str,
        attribute: &str,
        limit: Option<usize>,
    ) -> Result<Vec<LeaderboardEntry>> {
        self.require_ranked(game_id, attribute)?;
        self.repos.leaderboards.entries(game_id, attribute, limit)
    }

    fn require_ranked(&self, game_id: &str, attribute: &str) -> Result<()> {
        let game = self.repos.games.get(game_id)?;
        if !game.is_ranked(attribute) {
            return Err(ScoreboardError::validation(format!(
                "attribute '{}' is not ranked in game '{}'",
                attribute, game_id
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert a new game (`AlreadyExists` if the id is taken)
    pub fn create_game(&self, game: &Game) -> Result<()> {
        self.repos.games.create(game, None)?;
        tracing::info!("Created game {}", game.id);
        Ok(())
    }

    /// Replace a game definition
    ///
    /// Steps:
    /// 1. Load the current definition (`NotFound`)
    /// 2. Drop the leaderboard of every attribute no longer ranked
    /// 3. Backfill the leaderboard of every newly ranked attribute
    /// 4. Persist the game (last batch)
    pub fn update_game(&self, game: &Game) -> Result<()> {
        game.validate()?;

        with_conflict_retry("update_game", self.max_conflict_retries, || {
            // Step 1: Current definition
            let old = self
                .repos
                .games
                .find_versioned(&game.id)?
                .ok_or_else(|| ScoreboardError::not_found(EntityKind::Game, game.id.clone()))?;

            let mut tx = Transaction::new();

            // Step 2: Unranked attributes
            let mut removed = 0;
            for attribute in old.value.ranked_not_in(game) {
                removed += self
                    .repos
                    .leaderboards
                    .delete_all_for_game_and_attribute(&game.id, attribute, Some(&mut tx))?;
            }

            // Step 3: Newly ranked attributes
            let added: Vec<&String> = game.ranked_not_in(&old.value).collect();
            let backfilled = if added.is_empty() {
                0
            } else {
                let participants = self.participants(&game.id)?;
                self.backfill(&game.id, &added, &participants, &mut tx)?
            };

            // Step 4: Game record
            self.repos
                .games
                .update(game, Condition::Version(old.version), Some(&mut tx))?;

            let batches = tx.commit_in_batches(self.store.as_ref(), "update_game")?;
            tracing::info!(
                "Updated game {}: {} entries removed, {} backfilled, {} batches",
                game.id,
                removed,
                backfilled,
                batches
            );
            Ok(())
        })
    }

    /// Delete a game and its leaderboards
    ///
    /// Under `GameDeletePolicy::Purge` every match of the game and the stat
    /// of every player of those matches go too.
    pub fn delete_game(&self, game_id: &str) -> Result<()> {
        with_conflict_retry("delete_game", self.max_conflict_retries, || {
            let existing = self
                .repos
                .games
                .find_versioned(game_id)?
                .ok_or_else(|| ScoreboardError::not_found(EntityKind::Game, game_id))?;

            let mut tx = Transaction::new();
            let entries = self.repos.leaderboards.delete_all_for_game(game_id, Some(&mut tx))?;

            if self.delete_policy == GameDeletePolicy::Purge {
                self.purge_history(game_id, &mut tx)?;
            }

            self.repos
                .games
                .delete(game_id, Condition::Version(existing.version), Some(&mut tx))?;

            let batches = tx.commit_in_batches(self.store.as_ref(), "delete_game")?;
            tracing::info!(
                "Deleted game {} ({} leaderboard entries, policy {:?}, {} batches)",
                game_id,
                entries,
                self.delete_policy,
                batches
            );
            Ok(())
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Every user with reported deltas in some match of the game
    fn participants(&self, game_id: &str) -> Result<BTreeSet<UserId>> {
        Ok(self
            .repos
            .matches
            .list_for_game(game_id)?
            .iter()
            .flat_map(|game_match| game_match.participants().cloned())
            .collect())
    }

    /// Insert an entry for every participant with a positive sum in each
    /// of `attributes`
    ///
    /// The entries of one user commit only if the stat they were computed
    /// from is still at the version read here.
    fn backfill(
        &self,
        game_id: &str,
        attributes: &[&String],
        participants: &BTreeSet<UserId>,
        tx: &mut Transaction,
    ) -> Result<usize> {
        let mut added = 0;
        for user_id in participants {
            let Some(stat) = self.repos.stats.find_versioned(user_id, game_id)? else {
                continue;
            };
            let positive: Vec<(&String, i64)> = attributes
                .iter()
                .map(|attribute| (*attribute, stat.value.value(attribute)))
                .filter(|(_, value)| *value > 0)
                .collect();
            if positive.is_empty() {
                continue;
            }

            tx.push(WriteOp::check(
                game_stat_key(user_id, game_id),
                Condition::Version(stat.version),
            ));
            for (attribute, value) in positive {
                self.repos
                    .leaderboards
                    .add(game_id, user_id, attribute, value, Some(&mut *tx))?;
                added += 1;
            }
        }
        tracing::debug!("Backfilled {} entries for {} over {:?}", added, game_id, attributes);
        Ok(added)
    }

    /// Queue the removal of every match of the game and its players' stats
    fn purge_history(&self, game_id: &str, tx: &mut Transaction) -> Result<()> {
        let matches = self.repos.matches.list_for_game(game_id)?;
        let mut players = BTreeSet::new();

        for game_match in &matches {
            self.repos.matches.delete(
                game_id,
                &game_match.date,
                &game_match.id,
                Condition::Always,
                Some(&mut *tx),
            )?;
            players.extend(game_match.participants().cloned());
        }

        let mut stats = 0;
        for user_id in &players {
            if self.repos.stats.find_versioned(user_id, game_id)?.is_some() {
                self.repos
                    .stats
                    .delete(user_id, game_id, Condition::Always, Some(&mut *tx))?;
                stats += 1;
            }
        }

        tracing::debug!(
            "Purging game {}: {} matches, {} stats",
            game_id,
            matches.len(),
            stats
        );
        Ok(())
    }
}
