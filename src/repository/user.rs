use std::sync::Arc;

use crate::codec::{user_basic_from_record, user_key, user_partition, EntityCodec};
use crate::error::{EntityKind, RepositoryContext, Result, ScoreboardError};
use crate::model::{User, UserBasic};
use crate::store::{Condition, Query, RecordStore, Transaction, WriteOp};

use super::{get_existing, write_entity};

/// User profiles, spread over partitions by first id character
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn RecordStore>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn get(&self, user_id: &str) -> Result<User> {
        get_existing(self.store.as_ref(), &user_key(user_id), "get")
    }

    /// Id + name of every user whose id starts with `prefix`
    ///
    /// All matches share the partition of the prefix's first character, so
    /// this is a single prefix scan.
    pub fn get_basics_by_prefix(&self, prefix: &str) -> Result<Vec<UserBasic>> {
        if prefix.is_empty() {
            return Err(ScoreboardError::validation("user id prefix cannot be empty"));
        }

        let query = Query::partition(user_partition(prefix)).prefix(prefix);
        self.store
            .query(&query)
            .context(EntityKind::User, "get_basics_by_prefix")?
            .iter()
            .map(|record| user_basic_from_record(record).context(EntityKind::User, "get_basics_by_prefix"))
            .collect()
    }

    pub fn create(&self, user: &User, tx: Option<&mut Transaction>) -> Result<()> {
        user.validate()?;
        let op = WriteOp::put_if(user.to_record(), Condition::Absent);
        write_entity::<User>(self.store.as_ref(), tx, op, "create")
    }

    pub fn update(&self, user: &User, tx: Option<&mut Transaction>) -> Result<()> {
        user.validate()?;
        let op = WriteOp::put_if(user.to_record(), Condition::Exists);
        write_entity::<User>(self.store.as_ref(), tx, op, "update")
    }

    pub fn delete(&self, user_id: &str, tx: Option<&mut Transaction>) -> Result<()> {
        let op = WriteOp::delete_if(user_key(user_id), Condition::Exists);
        write_entity::<User>(self.store.as_ref(), tx, op, "delete")
    }
}
