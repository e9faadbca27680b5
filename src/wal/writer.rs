//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::Result;

use super::{Operation, WalEntry, WalReader, WalRecord};

/// Writes entries to the WAL file
pub struct WalWriter {
    /// Buffered handle opened in append mode
    writer: BufWriter<File>,

    /// Path of the log (for diagnostics)
    path: PathBuf,

    /// LSN the next append will receive
    next_lsn: u64,

    /// How often appends are fsynced
    sync_strategy: WalSyncStrategy,

    /// Appends since the last fsync
    unsynced: usize,

    /// Entries currently in the file
    entry_count: u64,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// An existing file is scanned so LSNs continue where it left off.
    /// Damaged tails must already have been removed by `WalRecovery`.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let mut last_lsn = 0;
        let mut entry_count = 0;

        if path.exists() {
            let mut reader = WalReader::open(path)?;
            while let WalRecord::Entry(entry) = reader.read_record()? {
                last_lsn = entry.lsn;
                entry_count += 1;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            next_lsn: last_lsn + 1,
            sync_strategy,
            unsynced: 0,
            entry_count,
        })
    }

    /// Append one transaction to the WAL
    ///
    /// Returns the written entry so the caller can apply its operations
    /// under the assigned LSN without cloning them.
    pub fn append(&mut self, operations: Vec<Operation>) -> Result<WalEntry> {
        let entry = WalEntry::new(self.next_lsn, operations);
        let frame = entry.serialize()?;

        self.writer.write_all(&frame)?;
        // Hand the frame to the OS on every append; fsync per strategy
        self.writer.flush()?;

        self.next_lsn += 1;
        self.entry_count += 1;
        self.unsynced += 1;

        let should_sync = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if should_sync {
            self.sync()?;
        }

        Ok(entry)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Drop every entry (after a snapshot made them redundant)
    ///
    /// LSNs keep increasing across truncation.
    pub fn truncate(&mut self) -> Result<()> {
        self.writer.flush()?;
        let file = self.writer.get_ref();
        file.set_len(0)?;
        file.sync_all()?;
        self.entry_count = 0;
        self.unsynced = 0;
        tracing::debug!("Truncated WAL {}", self.path.display());
        Ok(())
    }

    /// Get the LSN the next append will receive
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Make sure the next LSN is at least `next_lsn`
    pub fn advance_lsn(&mut self, next_lsn: u64) {
        if next_lsn > self.next_lsn {
            self.next_lsn = next_lsn;
        }
    }

    /// Entries currently in the log file
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }
}
