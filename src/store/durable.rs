//! Durable record store
//!
//! Coordinates the WAL, the ordered record table and snapshots.
//!
//! ## Responsibilities
//! - Check transaction conditions and log the batch before applying it
//! - Serve reads from the in-memory table
//! - Snapshot the table and truncate the WAL when it grows too long
//! - Recover snapshot + WAL on startup

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;
use crate::wal::{Operation, WalRecovery, WalWriter};

use super::{Query, Record, RecordKey, RecordStore, RecordTable, Snapshot, WriteOp};

/// Single-node durable `RecordStore`
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (transact/compact): serialized by the `wal` mutex
///   - check conditions → append WAL entry → apply to table
///   - the WAL LSN of the entry becomes the version of every record it wrote
///
/// - **Reads** (get/query): only take the table's read lock
///   - a batch is applied under one table write lock, so readers never see
///     half a transaction
pub struct DurableStore {
    /// Store configuration
    config: Config,

    /// Snapshot file location
    snapshot_path: PathBuf,

    /// Write-ahead log; its mutex is the write lock
    wal: Mutex<WalWriter>,

    /// Current state of every record
    table: RecordTable,
}

impl DurableStore {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";
    const SNAPSHOT_FILENAME: &'static str = "snapshot.bin";

    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Validate config, create data directory
    /// 2. Load the snapshot if one exists
    /// 3. Recover the WAL and replay entries newer than the snapshot
    /// 4. Snapshot recovered entries and truncate the WAL
    pub fn open(config: Config) -> Result<Self> {
        // Step 1: Config and directory
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let wal_path = config.data_dir.join(Self::WAL_FILENAME);
        let snapshot_path = config.data_dir.join(Self::SNAPSHOT_FILENAME);

        // Step 2: Snapshot
        let table = RecordTable::new();
        let snapshot_lsn = if snapshot_path.exists() {
            let snapshot = Snapshot::load(&snapshot_path)?;
            tracing::info!(
                "Loaded snapshot: {} records, lsn={}",
                snapshot.entries.len(),
                snapshot.lsn
            );
            let lsn = snapshot.lsn;
            table.load(snapshot.entries);
            lsn
        } else {
            0
        };

        // Step 3: WAL replay
        let mut replayed = 0u64;
        let mut last_lsn = snapshot_lsn;
        if wal_path.exists() {
            let (entries, recovery) = WalRecovery::recover(&wal_path)?;

            if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
                tracing::info!(
                    "WAL recovery: {} entries recovered, {} corrupted, last_lsn={}",
                    recovery.entries_recovered,
                    recovery.entries_corrupted,
                    recovery.last_lsn
                );
            }

            for entry in entries {
                // Already reflected in the snapshot
                if entry.lsn <= snapshot_lsn {
                    continue;
                }
                last_lsn = entry.lsn;
                table.apply(entry.operations, entry.lsn);
                replayed += 1;
            }
        }

        let mut wal = WalWriter::open(&wal_path, config.wal_sync_strategy)?;
        wal.advance_lsn(last_lsn.max(table.max_version()) + 1);

        // Step 4: Make recovered state durable in the snapshot, then drop the log
        if replayed > 0 {
            tracing::info!("Snapshotting {} replayed WAL entries", replayed);
            Snapshot::write(&snapshot_path, last_lsn, &table.entries())?;
            wal.truncate()?;
        }

        Ok(Self {
            config,
            snapshot_path,
            wal: Mutex::new(wal),
            table,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Snapshot the table and truncate the WAL (public API)
    pub fn compact(&self) -> Result<()> {
        let mut wal = self.wal.lock();
        self.compact_locked(&mut wal)
    }

    /// Internal compaction (called with the WAL lock held)
    fn compact_locked(&self, wal: &mut WalWriter) -> Result<()> {
        if wal.entry_count() == 0 {
            return Ok(());
        }

        let lsn = wal.current_lsn() - 1;
        Snapshot::write(&self.snapshot_path, lsn, &self.table.entries())?;
        wal.truncate()?;

        tracing::info!("Compacted store at lsn={} ({} records)", lsn, self.table.len());
        Ok(())
    }

    /// Close the store gracefully
    ///
    /// Syncs the WAL so every acknowledged commit is on disk
    pub fn close(self) -> Result<()> {
        let mut wal = self.wal.lock();
        wal.sync()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Number of live records
    pub fn record_count(&self) -> usize {
        self.table.len()
    }

    /// Entries currently in the WAL file
    pub fn wal_entry_count(&self) -> u64 {
        self.wal.lock().entry_count()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl RecordStore for DurableStore {
    fn get(&self, key: &RecordKey) -> Result<Option<Record>> {
        Ok(self.table.get(key))
    }

    fn query(&self, query: &Query) -> Result<Vec<Record>> {
        Ok(self.table.query(query))
    }

    /// Commit a batch
    ///
    /// Steps:
    /// 1. Acquire the WAL (write) lock
    /// 2. Check duplicate keys and conditions
    /// 3. Append one WAL entry for the batch (durability); check-only
    ///    batches stop here
    /// 4. Apply to the table under the entry's LSN
    /// 5. Compact if the WAL is over threshold
    fn transact(&self, ops: Vec<WriteOp>) -> Result<()> {
        let mut wal = self.wal.lock();

        self.table.check(&ops)?;

        let operations: Vec<Operation> = ops.into_iter().filter_map(WriteOp::into_operation).collect();
        if operations.is_empty() {
            return Ok(());
        }
        let entry = wal.append(operations)?;
        tracing::trace!("Logged lsn={} ({} ops)", entry.lsn, entry.operations.len());

        self.table.apply(entry.operations, entry.lsn);

        if wal.entry_count() >= self.config.compaction_threshold {
            self.compact_locked(&mut wal)?;
        }

        Ok(())
    }

    fn max_transaction_ops(&self) -> usize {
        self.config.max_transaction_ops
    }

    fn sync(&self) -> Result<()> {
        self.wal.lock().sync()
    }
}
