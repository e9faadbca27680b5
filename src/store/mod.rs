//! Record Store Module
//!
//! The flat key-value capability every repository is written against.
//!
//! ## Responsibilities
//! - Point get/put/delete addressed by (partition, sort) keys
//! - Prefix range queries inside one partition, either direction, with limit
//! - All-or-nothing multi-item commits across partitions
//! - Optimistic conditions on every write (absent / exists / exact version)
//!
//! ## Key Space
//! ```text
//! ┌──────────────────────┬───────────────────────────────┬──────────────┐
//! │ Partition            │ Sort                          │ Item         │
//! ├──────────────────────┼───────────────────────────────┼──────────────┤
//! │ GAME_INFO            │ soccer                        │ {attrs...}   │
//! │ Leaderboard.soccer   │ goals.0000000007.alice        │ {UserId}     │
//! │ Leaderboard.soccer   │ goals.0000000012.bob          │ {UserId}     │
//! └──────────────────────┴───────────────────────────────┴──────────────┘
//!   ordered by (partition, sort) so a sort-key prefix is a contiguous range
//! ```
//!
//! Two implementations live here: `MemoryStore` (ordered table only) and
//! `DurableStore` (ordered table + WAL + snapshot).

mod durable;
mod memory;
mod snapshot;
mod table;
mod transaction;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::wal::Operation;

pub use durable::DurableStore;
pub use memory::MemoryStore;
pub use snapshot::{Snapshot, SNAPSHOT_MAGIC};
pub use table::{RecordTable, StoredItem};
pub use transaction::{execute_or_append, Transaction};

// =============================================================================
// Keys and Records
// =============================================================================

/// Composite primary key of a record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    /// Grouping key; point lookups and queries are addressed by it
    pub partition: String,

    /// Ordering key inside the partition
    pub sort: String,
}

impl RecordKey {
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition, self.sort)
    }
}

/// A schemaless attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String
    S(String),

    /// Integer
    N(i64),

    /// Ordered list
    L(Vec<AttributeValue>),

    /// Nested map
    M(BTreeMap<String, AttributeValue>),
}

/// Flat attribute record body
pub type Item = BTreeMap<String, AttributeValue>;

/// A record as read from (or written to) the store
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub key: RecordKey,
    pub item: Item,

    /// Store-assigned version of the last write; ignored on write
    pub version: u64,
}

impl Record {
    /// Build an unversioned record for writing
    pub fn new(key: RecordKey, item: Item) -> Self {
        Self {
            key,
            item,
            version: 0,
        }
    }
}

// =============================================================================
// Write Operations
// =============================================================================

/// Precondition evaluated against committed state when a write commits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Condition {
    /// Unconditional
    #[default]
    Always,

    /// The key must not exist
    Absent,

    /// The key must exist (any version)
    Exists,

    /// The key must exist at exactly this version
    Version(u64),
}

/// A single write inside a transaction
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Full overwrite of a record
    Put { record: Record, condition: Condition },

    /// Removal of a record (idempotent unless conditioned)
    Delete { key: RecordKey, condition: Condition },

    /// Condition on a record the transaction only read; writes nothing
    Check { key: RecordKey, condition: Condition },
}

impl WriteOp {
    pub fn put(record: Record) -> Self {
        Self::put_if(record, Condition::Always)
    }

    pub fn put_if(record: Record, condition: Condition) -> Self {
        WriteOp::Put { record, condition }
    }

    pub fn delete(key: RecordKey) -> Self {
        Self::delete_if(key, Condition::Always)
    }

    pub fn delete_if(key: RecordKey, condition: Condition) -> Self {
        WriteOp::Delete { key, condition }
    }

    /// Guard a read record: the commit fails unless `condition` still holds
    pub fn check(key: RecordKey, condition: Condition) -> Self {
        WriteOp::Check { key, condition }
    }

    /// The key this op writes (or checks)
    pub fn key(&self) -> &RecordKey {
        match self {
            WriteOp::Put { record, .. } => &record.key,
            WriteOp::Delete { key, .. } | WriteOp::Check { key, .. } => key,
        }
    }

    pub fn condition(&self) -> Condition {
        match self {
            WriteOp::Put { condition, .. }
            | WriteOp::Delete { condition, .. }
            | WriteOp::Check { condition, .. } => *condition,
        }
    }

    pub fn is_check(&self) -> bool {
        matches!(self, WriteOp::Check { .. })
    }

    /// The loggable mutation, `None` for check-only ops
    pub fn into_operation(self) -> Option<Operation> {
        match self {
            WriteOp::Put { record, .. } => Some(Operation::Put {
                key: record.key,
                item: record.item,
            }),
            WriteOp::Delete { key, .. } => Some(Operation::Delete { key }),
            WriteOp::Check { .. } => None,
        }
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Prefix range query inside one partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub partition: String,
    pub sort_prefix: String,
    pub descending: bool,
    pub limit: Option<usize>,
}

impl Query {
    /// Every record of a partition, ascending
    pub fn partition(partition: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort_prefix: String::new(),
            descending: false,
            limit: None,
        }
    }

    /// Restrict to sort keys starting with `prefix`
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.sort_prefix = prefix.into();
        self
    }

    /// Scan from the largest sort key down
    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    /// Cap the number of returned records
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

// =============================================================================
// Store Contract
// =============================================================================

/// Abstract key-value backend consumed by the repositories
///
/// Implementations must make `transact` all-or-nothing: either every
/// condition holds and every op is applied under a single new version, or
/// nothing changes.
pub trait RecordStore: Send + Sync {
    /// Point lookup
    fn get(&self, key: &RecordKey) -> Result<Option<Record>>;

    /// Ordered prefix scan inside one partition
    fn query(&self, query: &Query) -> Result<Vec<Record>>;

    /// Atomic multi-op commit of any size
    fn transact(&self, ops: Vec<WriteOp>) -> Result<()>;

    /// Chunk size used when bulk cleanups are committed in batches
    fn max_transaction_ops(&self) -> usize;

    /// Unconditional full overwrite
    fn put(&self, record: Record) -> Result<()> {
        self.transact(vec![WriteOp::put(record)])
    }

    /// Unconditional, idempotent delete
    fn delete(&self, key: &RecordKey) -> Result<()> {
        self.transact(vec![WriteOp::delete(key.clone())])
    }

    /// Make every acknowledged commit durable (no-op for volatile stores)
    fn sync(&self) -> Result<()> {
        Ok(())
    }
}
