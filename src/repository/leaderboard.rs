//! Leaderboard index
//!
//! One record per (game, ranked attribute, user) with a non-zero value.
//! The value is embedded in the sort key, so a descending prefix scan of
//! `attribute.` is the leaderboard:
//!
//! ```text
//!   partition Leaderboard.soccer
//!   ├── elo.0000000003.u2
//!   ├── elo.0000000005.u1     ▲ descending scan, limit pushed to the store
//!   ├── elo.0000000005.u3     │
//!   └── goals.0000000001.u1
//! ```
//!
//! Entries with equal values are ordered by user id ascending.

use std::sync::Arc;

use crate::codec::{leaderboard_item, leaderboard_partition, RankKeyEncoder};
use crate::error::{EntityKind, RepositoryContext, Result, ScoreboardError};
use crate::model::{AttributeStat, BoundedLeaderboard, Leaderboard, LeaderboardEntry};
use crate::store::{execute_or_append, Condition, Query, Record, RecordKey, RecordStore, Transaction, WriteOp};

const KIND: EntityKind = EntityKind::LeaderboardEntry;

#[derive(Clone)]
pub struct LeaderboardRepository {
    store: Arc<dyn RecordStore>,
    encoder: RankKeyEncoder,
}

impl LeaderboardRepository {
    pub fn new(store: Arc<dyn RecordStore>, encoder: RankKeyEncoder) -> Self {
        Self { store, encoder }
    }

    pub fn encoder(&self) -> &RankKeyEncoder {
        &self.encoder
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Every ranked user, highest value first
    pub fn get(&self, game_id: &str, attribute: &str) -> Result<Leaderboard> {
        let entries = self.entries(game_id, attribute, None)?;
        Ok(Leaderboard {
            game_id: game_id.to_string(),
            attribute: attribute.to_string(),
            user_ids: entries.into_iter().map(|entry| entry.user_id).collect(),
        })
    }

    /// The top `limit` users (`limit >= 1`)
    pub fn get_bounded(&self, game_id: &str, attribute: &str, limit: usize) -> Result<BoundedLeaderboard> {
        let entries = self.entries(game_id, attribute, Some(limit))?;
        Ok(BoundedLeaderboard {
            leaderboard: Leaderboard {
                game_id: game_id.to_string(),
                attribute: attribute.to_string(),
                user_ids: entries.into_iter().map(|entry| entry.user_id).collect(),
            },
            limit,
        })
    }

    /// Ranked (user, value) pairs, optionally capped
    ///
    /// Steps:
    /// 1. Descending scan of `attribute.` with the limit pushed to the store
    /// 2. If the page is full, re-read the whole group of the last value
    ///    (a tie may straddle the cut)
    /// 3. Order by value descending, user ascending, and cap
    pub fn entries(&self, game_id: &str, attribute: &str, limit: Option<usize>) -> Result<Vec<LeaderboardEntry>> {
        if limit == Some(0) {
            return Err(ScoreboardError::validation("leaderboard limit must be at least 1"));
        }

        // Step 1: Top of the index
        let partition = leaderboard_partition(game_id);
        let mut query = Query::partition(partition.as_str())
            .prefix(RankKeyEncoder::attribute_prefix(attribute))
            .descending();
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        let records = self.store.query(&query).context(KIND, "query")?;
        let mut entries = self.decode_entries(&records)?;

        // Step 2: Complete the boundary tie group
        if let Some(limit) = limit {
            if entries.len() == limit {
                if let Some(boundary) = entries.last().map(|entry| entry.value) {
                    let group_query = Query::partition(partition.as_str())
                        .prefix(self.encoder.value_prefix(attribute, boundary)?);
                    let group = self.store.query(&group_query).context(KIND, "query")?;

                    entries.retain(|entry| entry.value != boundary);
                    entries.extend(self.decode_entries(&group)?);
                }
            }
        }

        // Step 3: Final order
        entries.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.user_id.cmp(&b.user_id)));
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert an entry; `value` must be positive
    pub fn add(
        &self,
        game_id: &str,
        user_id: &str,
        attribute: &str,
        value: AttributeStat,
        tx: Option<&mut Transaction>,
    ) -> Result<()> {
        if value == 0 {
            return Err(ScoreboardError::validation(format!(
                "leaderboard value for '{}' must be positive",
                attribute
            )));
        }
        let key = self.entry_key(game_id, user_id, attribute, value)?;
        let op = WriteOp::put_if(Record::new(key, leaderboard_item(user_id)), Condition::Absent);
        execute_or_append(self.store.as_ref(), tx, op).context(KIND, "add")
    }

    /// Move an entry from `old_value` to `new_value`
    ///
    /// A zero value means "no entry": zero old skips the delete, zero new
    /// skips the insert. Equal values are a no-op. Without a caller
    /// transaction the delete and insert still commit together.
    pub fn update(
        &self,
        game_id: &str,
        user_id: &str,
        attribute: &str,
        new_value: AttributeStat,
        old_value: AttributeStat,
        tx: Option<&mut Transaction>,
    ) -> Result<()> {
        if new_value == old_value {
            return Ok(());
        }
        // Range-check the target before queueing anything
        self.encoder.value_prefix(attribute, new_value)?;

        match tx {
            Some(tx) => self.update_in(game_id, user_id, attribute, new_value, old_value, tx),
            None => {
                let mut local = Transaction::new();
                self.update_in(game_id, user_id, attribute, new_value, old_value, &mut local)?;
                local.commit(self.store.as_ref()).context(KIND, "update")
            }
        }
    }

    fn update_in(
        &self,
        game_id: &str,
        user_id: &str,
        attribute: &str,
        new_value: AttributeStat,
        old_value: AttributeStat,
        tx: &mut Transaction,
    ) -> Result<()> {
        if old_value > 0 {
            self.delete(game_id, user_id, attribute, old_value, Some(&mut *tx))?;
        }
        if new_value > 0 {
            self.add(game_id, user_id, attribute, new_value, Some(tx))?;
        }
        Ok(())
    }

    /// Remove an entry; a missing entry is not an error
    ///
    /// The delete is guarded by the version just read, so a concurrent
    /// rewrite of the same entry fails the commit instead of being lost.
    pub fn delete(
        &self,
        game_id: &str,
        user_id: &str,
        attribute: &str,
        value: AttributeStat,
        tx: Option<&mut Transaction>,
    ) -> Result<()> {
        let key = self.entry_key(game_id, user_id, attribute, value)?;
        let Some(existing) = self.store.get(&key).context(KIND, "delete")? else {
            return Ok(());
        };
        if tx.as_deref().is_some_and(|tx| tx.touches(&key)) {
            return Ok(());
        }

        let op = WriteOp::delete_if(key, Condition::Version(existing.version));
        execute_or_append(self.store.as_ref(), tx, op).context(KIND, "delete")
    }

    /// Remove every entry of a game; returns the number removed
    pub fn delete_all_for_game(&self, game_id: &str, tx: Option<&mut Transaction>) -> Result<usize> {
        let query = Query::partition(leaderboard_partition(game_id));
        self.delete_matching(query, None, tx, "delete_all_for_game")
    }

    /// Remove every entry of one user in a game
    pub fn delete_all_for_game_and_user(
        &self,
        game_id: &str,
        user_id: &str,
        tx: Option<&mut Transaction>,
    ) -> Result<usize> {
        let query = Query::partition(leaderboard_partition(game_id));
        self.delete_matching(query, Some(user_id), tx, "delete_all_for_game_and_user")
    }

    /// Remove every entry of one attribute in a game
    pub fn delete_all_for_game_and_attribute(
        &self,
        game_id: &str,
        attribute: &str,
        tx: Option<&mut Transaction>,
    ) -> Result<usize> {
        let query = Query::partition(leaderboard_partition(game_id)).prefix(RankKeyEncoder::attribute_prefix(attribute));
        self.delete_matching(query, None, tx, "delete_all_for_game_and_attribute")
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn entry_key(&self, game_id: &str, user_id: &str, attribute: &str, value: AttributeStat) -> Result<RecordKey> {
        let sort = self.encoder.encode(attribute, value, user_id)?;
        Ok(RecordKey::new(leaderboard_partition(game_id), sort))
    }

    fn decode_entries(&self, records: &[Record]) -> Result<Vec<LeaderboardEntry>> {
        records
            .iter()
            .map(|record| {
                let key = self.encoder.decode(&record.key.sort).context(KIND, "query")?;
                Ok(LeaderboardEntry {
                    user_id: key.user_id,
                    value: key.value,
                })
            })
            .collect()
    }

    /// Scan + per-item delete
    ///
    /// Bulk cleanups are unconditional. Run on their own they are committed
    /// in store-sized batches.
    fn delete_matching(
        &self,
        query: Query,
        user_id: Option<&str>,
        tx: Option<&mut Transaction>,
        operation: &'static str,
    ) -> Result<usize> {
        let records = self.store.query(&query).context(KIND, operation)?;

        let immediate = tx.is_none();
        let mut owned = Transaction::new();
        let target = match tx {
            Some(tx) => tx,
            None => &mut owned,
        };

        let mut removed = 0;
        for record in records {
            if let Some(user_id) = user_id {
                if self.encoder.decode_user(&record.key.sort).context(KIND, operation)? != user_id {
                    continue;
                }
            }
            if target.touches(&record.key) {
                continue;
            }
            target.push(WriteOp::delete(record.key));
            removed += 1;
        }

        if immediate {
            owned.commit_in_batches(self.store.as_ref(), operation)?;
        }
        tracing::debug!("{}: {} leaderboard entries removed", operation, removed);
        Ok(removed)
    }
}
