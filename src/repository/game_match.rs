use std::sync::Arc;

use crate::codec::{match_date_prefix, match_key, match_partition, EntityCodec};
use crate::error::{EntityKind, RepositoryContext, Result};
use crate::model::Match;
use crate::store::{Condition, Query, RecordStore, Transaction, WriteOp};

use super::{find_versioned, get_existing, write_entity, Versioned};

/// Matches, one partition per game, sorted by `<date>.<match>`
#[derive(Clone)]
pub struct MatchRepository {
    store: Arc<dyn RecordStore>,
}

impl MatchRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn get(&self, game_id: &str, date: &str, match_id: &str) -> Result<Match> {
        get_existing(self.store.as_ref(), &match_key(game_id, date, match_id), "get")
    }

    pub fn find_versioned(&self, game_id: &str, date: &str, match_id: &str) -> Result<Option<Versioned<Match>>> {
        find_versioned(self.store.as_ref(), &match_key(game_id, date, match_id), "get")
    }

    /// Every match of a game on one date, ordered by match id
    pub fn get_by_game_and_date(&self, game_id: &str, date: &str) -> Result<Vec<Match>> {
        self.scan(Query::partition(match_partition(game_id)).prefix(match_date_prefix(date)))
    }

    /// Every match of a game, ordered by (date, match id)
    pub fn list_for_game(&self, game_id: &str) -> Result<Vec<Match>> {
        self.scan(Query::partition(match_partition(game_id)))
    }

    /// Insert a new match (`AlreadyExists` if (game, date, id) is taken)
    pub fn create(&self, game_match: &Match, tx: Option<&mut Transaction>) -> Result<()> {
        game_match.validate()?;
        let op = WriteOp::put_if(game_match.to_record(), Condition::Absent);
        write_entity::<Match>(self.store.as_ref(), tx, op, "create")
    }

    pub fn update(&self, game_match: &Match, condition: Condition, tx: Option<&mut Transaction>) -> Result<()> {
        game_match.validate()?;
        let op = WriteOp::put_if(game_match.to_record(), condition);
        write_entity::<Match>(self.store.as_ref(), tx, op, "update")
    }

    pub fn delete(
        &self,
        game_id: &str,
        date: &str,
        match_id: &str,
        condition: Condition,
        tx: Option<&mut Transaction>,
    ) -> Result<()> {
        let op = WriteOp::delete_if(match_key(game_id, date, match_id), condition);
        write_entity::<Match>(self.store.as_ref(), tx, op, "delete")
    }

    fn scan(&self, query: Query) -> Result<Vec<Match>> {
        self.store
            .query(&query)
            .context(EntityKind::Match, "query")?
            .iter()
            .map(|record| Match::from_record(record).context(EntityKind::Match, "query"))
            .collect()
    }
}
