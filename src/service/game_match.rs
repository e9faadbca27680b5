//! Match orchestration
//!
//! Keeps three denormalized views in lockstep with the match records:
//!
//! ```text
//!   Match (deltas) ──► GameStat (sum of deltas per user)
//!                          └──► Leaderboard entry (sum of each ranked attribute)
//! ```
//!
//! - create: add every player's deltas
//! - update: add `new - old` per (player, attribute) over both matches
//! - delete: subtract every player's deltas

use std::sync::Arc;

use crate::codec::{game_key, match_key, RankKeyEncoder};
use crate::config::Config;
use crate::error::{EntityKind, Result, ScoreboardError};
use crate::model::{diff, AttributeMap, Game, GameStat, Match};
use crate::repository::{Repositories, Versioned};
use crate::store::{Condition, RecordStore, Transaction, WriteOp};

use super::with_conflict_retry;

pub struct MatchService {
    store: Arc<dyn RecordStore>,
    repos: Repositories,
    max_conflict_retries: u32,
}

impl MatchService {
    pub fn new(store: Arc<dyn RecordStore>, config: &Config) -> Result<Self> {
        let encoder = RankKeyEncoder::new(config.rank_key_width)?;
        Ok(Self {
            repos: Repositories::new(Arc::clone(&store), encoder),
            store,
            max_conflict_retries: config.max_conflict_retries,
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn get_match(&self, game_id: &str, date: &str, match_id: &str) -> Result<Match> {
        self.repos.matches.get(game_id, date, match_id)
    }

    pub fn get_matches_by_game_and_date(&self, game_id: &str, date: &str) -> Result<Vec<Match>> {
        self.repos.matches.get_by_game_and_date(game_id, date)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Record a new match and add its deltas
    ///
    /// Steps:
    /// 1. Load the game; the commit re-checks its version
    /// 2. Persist the match (must not exist yet)
    /// 3. Per player: lazily load the stat, move ranked leaderboard entries
    ///    from the old sum to the new one, add the deltas
    /// 4. Commit
    pub fn create_match(&self, game_match: &Match) -> Result<()> {
        game_match.validate()?;

        with_conflict_retry("create_match", self.max_conflict_retries, || {
            // Step 1: Game
            let game = self.load_game(&game_match.game_id)?;

            // Step 2: Match record
            let key = match_key(&game_match.game_id, &game_match.date, &game_match.id);
            if self
                .repos
                .matches
                .find_versioned(&game_match.game_id, &game_match.date, &game_match.id)?
                .is_some()
            {
                return Err(ScoreboardError::AlreadyExists {
                    entity: EntityKind::Match,
                    key: key.to_string(),
                });
            }
            let mut tx = Transaction::new();
            guard_game(&game, &mut tx);
            self.repos.matches.create(game_match, Some(&mut tx))?;

            // Step 3: Contributions
            for (user_id, deltas) in &game_match.player_attributes {
                self.apply_contribution(&game.value, user_id, deltas, &mut tx)?;
            }

            // Step 4: Commit
            tracing::debug!("create_match {}: committing {} ops", key, tx.len());
            tx.commit(self.store.as_ref())
        })
    }

    /// Replace a match and apply the difference of its deltas
    ///
    /// Every player and attribute of either version is visited, so a player
    /// removed by the edit has its old contribution reverted.
    pub fn update_match(&self, game_match: &Match) -> Result<()> {
        game_match.validate()?;

        with_conflict_retry("update_match", self.max_conflict_retries, || {
            let old = self
                .repos
                .matches
                .find_versioned(&game_match.game_id, &game_match.date, &game_match.id)?
                .ok_or_else(|| {
                    ScoreboardError::not_found(
                        EntityKind::Match,
                        match_key(&game_match.game_id, &game_match.date, &game_match.id).to_string(),
                    )
                })?;
            let game = self.load_game(&game_match.game_id)?;

            let mut tx = Transaction::new();
            guard_game(&game, &mut tx);
            self.repos
                .matches
                .update(game_match, Condition::Version(old.version), Some(&mut tx))?;

            let none = AttributeMap::new();
            for user_id in game_match.participants_union(&old.value) {
                let before = old.value.player_deltas(user_id).unwrap_or(&none);
                let after = game_match.player_deltas(user_id).unwrap_or(&none);
                let delta = diff(before, after);
                if delta.is_empty() {
                    continue;
                }
                self.apply_contribution(&game.value, user_id, &delta, &mut tx)?;
            }

            tracing::debug!("update_match {}: committing {} ops", game_match.id, tx.len());
            tx.commit(self.store.as_ref())
        })
    }

    /// Delete a match and subtract its deltas
    pub fn delete_match(&self, game_id: &str, match_id: &str, date: &str) -> Result<()> {
        with_conflict_retry("delete_match", self.max_conflict_retries, || {
            let old = self
                .repos
                .matches
                .find_versioned(game_id, date, match_id)?
                .ok_or_else(|| {
                    ScoreboardError::not_found(EntityKind::Match, match_key(game_id, date, match_id).to_string())
                })?;
            let game = self.load_game(game_id)?;

            let mut tx = Transaction::new();
            guard_game(&game, &mut tx);
            for (user_id, deltas) in &old.value.player_attributes {
                let negated: AttributeMap = deltas.iter().map(|(name, value)| (name.clone(), -value)).collect();
                self.apply_contribution(&game.value, user_id, &negated, &mut tx)?;
            }
            self.repos
                .matches
                .delete(game_id, date, match_id, Condition::Version(old.version), Some(&mut tx))?;

            tracing::debug!("delete_match {}: committing {} ops", match_id, tx.len());
            tx.commit(self.store.as_ref())
        })
    }

    fn load_game(&self, game_id: &str) -> Result<Versioned<Game>> {
        self.repos
            .games
            .find_versioned(game_id)?
            .ok_or_else(|| ScoreboardError::not_found(EntityKind::Game, game_key(game_id).to_string()))
    }

    /// Fold signed deltas of one player into their stat and leaderboard entries
    ///
    /// The leaderboard moves from the pre-mutation sum to the new one; an
    /// absent stat starts from zero for every game attribute. A sum that
    /// would go negative rejects the whole orchestration.
    fn apply_contribution(&self, game: &Game, user_id: &str, deltas: &AttributeMap, tx: &mut Transaction) -> Result<()> {
        let (mut stat, condition) = match self.repos.stats.find_versioned(user_id, &game.id)? {
            Some(found) => (found.value, Condition::Version(found.version)),
            None => (GameStat::zeroed(user_id, game), Condition::Absent),
        };

        for (attribute, delta) in deltas {
            let old = stat.value(attribute);
            let new = stat.apply_delta(attribute, *delta)?;
            if game.is_ranked(attribute) {
                self.repos
                    .leaderboards
                    .update(&game.id, user_id, attribute, new, old, Some(&mut *tx))?;
            }
        }

        self.repos.stats.upsert_if(&stat, condition, Some(tx))
    }
}

/// Fail the commit if the game definition changed since it was read
///
/// Which attributes get leaderboard writes depends on the ranked set, so a
/// concurrent `update_game` or `delete_game` forces a re-run.
fn guard_game(game: &Versioned<Game>, tx: &mut Transaction) {
    tx.push(WriteOp::check(game_key(&game.value.id), Condition::Version(game.version)));
}
