use std::sync::Arc;

use crate::codec::{game_key, EntityCodec};
use crate::error::Result;
use crate::model::Game;
use crate::store::{Condition, RecordStore, Transaction, WriteOp};

use super::{find_versioned, get_existing, write_entity, Versioned};

/// Game definitions, all in the `GAME_INFO` partition
#[derive(Clone)]
pub struct GameRepository {
    store: Arc<dyn RecordStore>,
}

impl GameRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn get(&self, game_id: &str) -> Result<Game> {
        get_existing(self.store.as_ref(), &game_key(game_id), "get")
    }

    pub fn find_versioned(&self, game_id: &str) -> Result<Option<Versioned<Game>>> {
        find_versioned(self.store.as_ref(), &game_key(game_id), "get")
    }

    /// Insert a new game (`AlreadyExists` if the id is taken)
    pub fn create(&self, game: &Game, tx: Option<&mut Transaction>) -> Result<()> {
        game.validate()?;
        let op = WriteOp::put_if(game.to_record(), Condition::Absent);
        write_entity::<Game>(self.store.as_ref(), tx, op, "create")
    }

    /// Overwrite an existing game
    ///
    /// `condition` is `Exists` or the `Version` the caller read.
    pub fn update(&self, game: &Game, condition: Condition, tx: Option<&mut Transaction>) -> Result<()> {
        game.validate()?;
        let op = WriteOp::put_if(game.to_record(), condition);
        write_entity::<Game>(self.store.as_ref(), tx, op, "update")
    }

    pub fn delete(&self, game_id: &str, condition: Condition, tx: Option<&mut Transaction>) -> Result<()> {
        let op = WriteOp::delete_if(game_key(game_id), condition);
        write_entity::<Game>(self.store.as_ref(), tx, op, "delete")
    }
}
