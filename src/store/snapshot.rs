//! Table snapshot
//!
//! Point-in-time image of the record table, written when the WAL is
//! compacted.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (34 bytes)                                       │
//! │   Magic: "SCBS" (4) | Version: u16 (2) | LSN: u64 (8)   │
//! │   Count: u64 (8) | PayloadLen: u64 (8) | CRC: u32 (4)   │
//! ├─────────────────────────────────────────────────────────┤
//! │ Payload (bincode)                                       │
//! │   Vec<(RecordKey, StoredItem)> in key order             │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Written to `<path>.tmp` and renamed into place, so a crash leaves either
//! the old snapshot or the new one.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{Result, ScoreboardError};

use super::{RecordKey, StoredItem};

/// Magic bytes identifying a snapshot file
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"SCBS";

/// Current snapshot format version
const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + LSN (8) + Count (8) + Len (8) + CRC (4)
const HEADER_SIZE: usize = 34;

/// A decoded snapshot
#[derive(Debug)]
pub struct Snapshot {
    /// Every WAL entry up to and including this LSN is reflected
    pub lsn: u64,

    /// Table contents in key order
    pub entries: Vec<(RecordKey, StoredItem)>,
}

impl Snapshot {
    /// Write a snapshot atomically
    pub fn write(path: &Path, lsn: u64, entries: &[(RecordKey, StoredItem)]) -> Result<()> {
        let payload = bincode::serialize(entries)?;
        let crc = crc32fast::hash(&payload);

        let tmp_path = path.with_extension("tmp");
        {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            let mut writer = BufWriter::new(file);

            writer.write_all(SNAPSHOT_MAGIC)?;
            writer.write_all(&VERSION.to_le_bytes())?;
            writer.write_all(&lsn.to_le_bytes())?;
            writer.write_all(&(entries.len() as u64).to_le_bytes())?;
            writer.write_all(&(payload.len() as u64).to_le_bytes())?;
            writer.write_all(&crc.to_le_bytes())?;
            writer.write_all(&payload)?;

            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, path)?;

        tracing::debug!(
            "Wrote snapshot {} ({} records, lsn={})",
            path.display(),
            entries.len(),
            lsn
        );
        Ok(())
    }

    /// Load and verify a snapshot
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);

        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header).map_err(|e| {
            ScoreboardError::SnapshotCorruption(format!("short header: {}", e))
        })?;

        if &header[0..4] != SNAPSHOT_MAGIC {
            return Err(ScoreboardError::SnapshotCorruption("bad magic".to_string()));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(ScoreboardError::SnapshotCorruption(format!(
                "unsupported version {}",
                version
            )));
        }

        let lsn = read_u64(&header[6..14]);
        let count = read_u64(&header[14..22]);
        let payload_len = read_u64(&header[22..30]);
        let crc = u32::from_le_bytes([header[30], header[31], header[32], header[33]]);

        let mut payload = Vec::new();
        reader.read_to_end(&mut payload)?;
        if payload.len() as u64 != payload_len {
            return Err(ScoreboardError::SnapshotCorruption(format!(
                "payload length {} does not match header {}",
                payload.len(),
                payload_len
            )));
        }
        if crc32fast::hash(&payload) != crc {
            return Err(ScoreboardError::SnapshotCorruption("CRC mismatch".to_string()));
        }

        let entries: Vec<(RecordKey, StoredItem)> = bincode::deserialize(&payload)?;
        if entries.len() as u64 != count {
            return Err(ScoreboardError::SnapshotCorruption(format!(
                "record count {} does not match header {}",
                entries.len(),
                count
            )));
        }

        Ok(Self { lsn, entries })
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}
