//! Transaction handle
//!
//! A caller-owned accumulator of pending writes. Repositories either append
//! to a handle they were given or execute immediately; only the code that
//! created the handle commits it.

use crate::error::{Result, ScoreboardError};

use super::{RecordKey, RecordStore, WriteOp};

/// Pending writes, committed together
#[derive(Debug, Default)]
pub struct Transaction {
    ops: Vec<WriteOp>,
}

impl Transaction {
    /// Create an empty transaction
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a write
    pub fn push(&mut self, op: WriteOp) {
        self.ops.push(op);
    }

    /// Number of pending writes
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Pending writes, in order
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Whether some pending write targets `key`
    pub fn touches(&self, key: &RecordKey) -> bool {
        self.ops.iter().any(|op| op.key() == key)
    }

    /// Commit every pending write atomically
    pub fn commit(self, store: &dyn RecordStore) -> Result<()> {
        if self.ops.is_empty() {
            return Ok(());
        }
        tracing::debug!("Committing transaction with {} ops", self.ops.len());
        store.transact(self.ops)
    }

    /// Commit in store-sized chunks, preserving order
    ///
    /// Used for bulk cleanups whose size is unbounded. Each chunk is atomic;
    /// if a chunk fails after an earlier one committed, the error is
    /// reported as a partial application. A check op never ends a chunk, so
    /// it always commits together with the write that follows it.
    ///
    /// Returns the number of chunks committed.
    pub fn commit_in_batches(self, store: &dyn RecordStore, operation: &'static str) -> Result<usize> {
        let batch_size = store.max_transaction_ops().max(1);
        let mut committed = 0;

        let mut ops = self.ops;
        while !ops.is_empty() {
            let mut end = batch_size.min(ops.len());
            // Keep a trailing check with the write it guards
            while end > 1 && end < ops.len() && ops[end - 1].is_check() {
                end -= 1;
            }
            let rest = ops.split_off(end);
            let batch = std::mem::replace(&mut ops, rest);
            let batch_len = batch.len();

            if let Err(err) = store.transact(batch) {
                if committed == 0 {
                    return Err(err);
                }
                tracing::warn!(
                    "{} failed after {} committed batches: {}",
                    operation,
                    committed,
                    err
                );
                return Err(ScoreboardError::PartialApplication {
                    operation,
                    committed,
                    source: Box::new(err),
                });
            }

            committed += 1;
            tracing::debug!("{}: committed batch {} ({} ops)", operation, committed, batch_len);
        }

        Ok(committed)
    }
}

/// Append `op` to the caller's transaction, or execute it right away
pub fn execute_or_append(store: &dyn RecordStore, tx: Option<&mut Transaction>, op: WriteOp) -> Result<()> {
    match tx {
        Some(tx) => {
            tx.push(op);
            Ok(())
        }
        None => store.transact(vec![op]),
    }
}
