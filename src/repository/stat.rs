use std::sync::Arc;

use crate::codec::{game_stat_key, EntityCodec};
use crate::error::Result;
use crate::model::GameStat;
use crate::store::{Condition, RecordStore, Transaction, WriteOp};

use super::{find_versioned, get_existing, write_entity, Versioned};

/// Per-(user, game) aggregates
///
/// Absent means "all zero"; the services materialize a stat on its first
/// write and never on read.
#[derive(Clone)]
pub struct GameStatRepository {
    store: Arc<dyn RecordStore>,
}

impl GameStatRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn get(&self, user_id: &str, game_id: &str) -> Result<GameStat> {
        get_existing(self.store.as_ref(), &game_stat_key(user_id, game_id), "get")
    }

    pub fn find_versioned(&self, user_id: &str, game_id: &str) -> Result<Option<Versioned<GameStat>>> {
        find_versioned(self.store.as_ref(), &game_stat_key(user_id, game_id), "get")
    }

    /// Unconditional full write; rejected in full if any value is negative
    pub fn upsert(&self, stat: &GameStat, tx: Option<&mut Transaction>) -> Result<()> {
        self.upsert_if(stat, Condition::Always, tx)
    }

    /// Full write guarded by `condition` (`Absent` or the version read)
    pub fn upsert_if(&self, stat: &GameStat, condition: Condition, tx: Option<&mut Transaction>) -> Result<()> {
        stat.validate()?;
        let op = WriteOp::put_if(stat.to_record(), condition);
        write_entity::<GameStat>(self.store.as_ref(), tx, op, "upsert")
    }

    pub fn delete(&self, user_id: &str, game_id: &str, condition: Condition, tx: Option<&mut Transaction>) -> Result<()> {
        let op = WriteOp::delete_if(game_stat_key(user_id, game_id), condition);
        write_entity::<GameStat>(self.store.as_ref(), tx, op, "delete")
    }
}
