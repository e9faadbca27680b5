//! In-memory record store
//!
//! Ordered table without durability. Used by tests and embedders that
//! bring their own persistence.

use parking_lot::Mutex;

use crate::error::Result;
use crate::wal::Operation;

use super::{Query, Record, RecordKey, RecordStore, RecordTable, WriteOp};

/// Default chunk size for batched bulk commits
const DEFAULT_MAX_TRANSACTION_OPS: usize = 100;

/// Volatile `RecordStore`
pub struct MemoryStore {
    table: RecordTable,

    /// Serializes commits; holds the last assigned version
    last_version: Mutex<u64>,

    max_transaction_ops: usize,
}

impl MemoryStore {
    /// Create an empty store with the default chunk size
    pub fn new() -> Self {
        Self::with_max_transaction_ops(DEFAULT_MAX_TRANSACTION_OPS)
    }

    /// Create an empty store with a custom chunk size
    pub fn with_max_transaction_ops(max_transaction_ops: usize) -> Self {
        Self {
            table: RecordTable::new(),
            last_version: Mutex::new(0),
            max_transaction_ops,
        }
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, key: &RecordKey) -> Result<Option<Record>> {
        Ok(self.table.get(key))
    }

    fn query(&self, query: &Query) -> Result<Vec<Record>> {
        Ok(self.table.query(query))
    }

    fn transact(&self, ops: Vec<WriteOp>) -> Result<()> {
        let mut last_version = self.last_version.lock();

        self.table.check(&ops)?;

        let operations: Vec<Operation> = ops.into_iter().filter_map(WriteOp::into_operation).collect();
        if operations.is_empty() {
            return Ok(());
        }
        *last_version += 1;
        self.table.apply(operations, *last_version);

        Ok(())
    }

    fn max_transaction_ops(&self) -> usize {
        self.max_transaction_ops
    }
}
