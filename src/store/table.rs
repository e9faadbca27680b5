//! Record table implementation
//!
//! BTreeMap-based ordered table with RwLock for concurrency.

use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoreboardError};
use crate::wal::Operation;

use super::{Condition, Item, Query, Record, RecordKey, WriteOp};

/// A live item plus the version that wrote it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    pub item: Item,
    pub version: u64,
}

/// In-memory ordered table of records
///
/// ## Concurrency:
/// - Readers take the read lock (many at once)
/// - `apply` takes the write lock once per batch, so a batch becomes
///   visible all at once
/// - Callers serialize `check` + `apply` themselves (single writer)
pub struct RecordTable {
    data: RwLock<BTreeMap<RecordKey, StoredItem>>,
}

impl RecordTable {
    /// Create a new empty table
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
        }
    }

    /// Get a record by key (read lock)
    pub fn get(&self, key: &RecordKey) -> Option<Record> {
        let data = self.data.read();
        data.get(key).map(|stored| Record {
            key: key.clone(),
            item: stored.item.clone(),
            version: stored.version,
        })
    }

    /// Run a prefix query (read lock)
    ///
    /// The scanned window is `[partition/prefix, partition/successor(prefix))`,
    /// which holds exactly the sort keys starting with `prefix`.
    pub fn query(&self, query: &Query) -> Vec<Record> {
        let data = self.data.read();

        let start = RecordKey::new(query.partition.clone(), query.sort_prefix.clone());
        let end = match prefix_successor(&query.sort_prefix) {
            Some(upper) => RecordKey::new(query.partition.clone(), upper),
            // Empty (or all-max) prefix: stop at the next partition
            None => RecordKey::new(format!("{}\0", query.partition), String::new()),
        };

        let range = data
            .range((Bound::Included(start), Bound::Excluded(end)))
            .filter(|(key, _)| key.sort.starts_with(&query.sort_prefix));
        let limit = query.limit.unwrap_or(usize::MAX);

        let to_record = |(key, stored): (&RecordKey, &StoredItem)| Record {
            key: key.clone(),
            item: stored.item.clone(),
            version: stored.version,
        };

        if query.descending {
            range.rev().take(limit).map(to_record).collect()
        } else {
            range.take(limit).map(to_record).collect()
        }
    }

    /// Validate a batch against committed state without applying it
    ///
    /// Rejects:
    /// - batches touching the same key twice
    /// - any op whose condition does not hold
    pub fn check(&self, ops: &[WriteOp]) -> Result<()> {
        let mut seen = HashSet::with_capacity(ops.len());
        for op in ops {
            if !seen.insert(op.key()) {
                return Err(ScoreboardError::validation(format!(
                    "transaction touches {} more than once",
                    op.key()
                )));
            }
        }

        let data = self.data.read();
        for op in ops {
            let current = data.get(op.key()).map(|stored| stored.version);
            let holds = match (op.condition(), current) {
                (Condition::Always, _) => true,
                (Condition::Absent, current) => current.is_none(),
                (Condition::Exists, current) => current.is_some(),
                (Condition::Version(expected), Some(actual)) => expected == actual,
                (Condition::Version(_), None) => false,
            };
            if !holds {
                return Err(ScoreboardError::ConditionFailed {
                    key: op.key().to_string(),
                });
            }
        }

        Ok(())
    }

    /// Apply a batch under one version (write lock)
    pub fn apply(&self, operations: Vec<Operation>, version: u64) {
        let mut data = self.data.write();
        for operation in operations {
            match operation {
                Operation::Put { key, item } => {
                    data.insert(key, StoredItem { item, version });
                }
                Operation::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
    }

    /// Copy out every entry in key order (for snapshots)
    pub fn entries(&self) -> Vec<(RecordKey, StoredItem)> {
        let data = self.data.read();
        data.iter()
            .map(|(key, stored)| (key.clone(), stored.clone()))
            .collect()
    }

    /// Replace the whole table (after loading a snapshot)
    pub fn load(&self, entries: Vec<(RecordKey, StoredItem)>) {
        let mut data = self.data.write();
        *data = entries.into_iter().collect();
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Highest version stored in the table (0 when empty)
    pub fn max_version(&self) -> u64 {
        self.data
            .read()
            .values()
            .map(|stored| stored.version)
            .max()
            .unwrap_or(0)
    }
}

impl Default for RecordTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Smallest string greater than every string starting with `prefix`.
///
/// UTF-8 byte order equals code point order, so bumping the last bumpable
/// char gives the bound. `None` when no such string exists.
fn prefix_successor(prefix: &str) -> Option<String> {
    let mut chars: Vec<char> = prefix.chars().collect();
    while let Some(last) = chars.pop() {
        let mut next = last as u32 + 1;
        while next <= char::MAX as u32 {
            if let Some(c) = char::from_u32(next) {
                chars.push(c);
                return Some(chars.into_iter().collect());
            }
            // Skip the surrogate gap
            next += 1;
        }
    }
    None
}
