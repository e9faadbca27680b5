//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{Result, ScoreboardError};

use super::entry::{HEADER_SIZE, MAX_ENTRY_SIZE};
use super::WalEntry;

/// Outcome of reading one frame
#[derive(Debug)]
pub enum WalRecord {
    /// A complete, verified entry
    Entry(WalEntry),

    /// The file ends inside a frame (partial write)
    Torn { offset: u64 },

    /// A complete frame that fails verification
    Corrupt { offset: u64, reason: String },

    /// Clean end of file
    End,
}

/// Reads entries from the WAL file
pub struct WalReader {
    reader: BufReader<File>,

    /// Byte offset of the next frame
    position: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Byte offset of the next unread frame
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read the next frame, classifying damage instead of failing on it
    ///
    /// Only I/O errors are returned as `Err`.
    pub fn read_record(&mut self) -> Result<WalRecord> {
        let offset = self.position;

        // Step 1: Header
        let mut header = [0u8; HEADER_SIZE];
        let read = read_fully(&mut self.reader, &mut header)?;
        if read == 0 {
            return Ok(WalRecord::End);
        }
        if read < HEADER_SIZE {
            return Ok(WalRecord::Torn { offset });
        }

        let lsn = u64::from_le_bytes([
            header[0], header[1], header[2], header[3], header[4], header[5], header[6], header[7],
        ]);
        let crc = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);
        let len = u32::from_le_bytes([header[12], header[13], header[14], header[15]]);

        if len > MAX_ENTRY_SIZE {
            return Ok(WalRecord::Corrupt {
                offset,
                reason: format!("entry length {} exceeds max {}", len, MAX_ENTRY_SIZE),
            });
        }

        // Step 2: Payload
        let mut payload = vec![0u8; len as usize];
        let read = read_fully(&mut self.reader, &mut payload)?;
        if read < payload.len() {
            return Ok(WalRecord::Torn { offset });
        }

        self.position += (HEADER_SIZE + payload.len()) as u64;

        // Step 3: Verify
        match WalEntry::deserialize(lsn, crc, &payload) {
            Ok(entry) => Ok(WalRecord::Entry(entry)),
            Err(ScoreboardError::WalCorruption(reason)) => Ok(WalRecord::Corrupt { offset, reason }),
            Err(e) => Err(e),
        }
    }

    /// Read the next entry from the WAL
    ///
    /// Damage of any kind is reported as `WalCorruption`.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        match self.read_record()? {
            WalRecord::Entry(entry) => Ok(Some(entry)),
            WalRecord::End => Ok(None),
            WalRecord::Torn { offset } => Err(ScoreboardError::WalCorruption(format!(
                "partial entry at offset {}",
                offset
            ))),
            WalRecord::Corrupt { offset, reason } => Err(ScoreboardError::WalCorruption(format!(
                "offset {}: {}",
                offset, reason
            ))),
        }
    }

    /// Iterate over all entries until the end or the first damaged frame
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over WAL entries
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Read until `buf` is full or EOF; returns bytes read
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
