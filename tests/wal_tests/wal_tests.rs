//! Tests for WAL entries, writer and reader
//!
//! These tests verify:
//! - Frame layout and CRC verification of entries
//! - Writer LSN assignment, reopen and truncation
//! - Reader classification of clean, torn and corrupt frames
//! - Transactions round-trip as a single entry

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use scoreboard::config::WalSyncStrategy;
use scoreboard::store::{AttributeValue, Condition, Record, RecordKey, WriteOp};
use scoreboard::wal::{Operation, WalEntry, WalReader, WalRecord, WalWriter, HEADER_SIZE};
use scoreboard::ScoreboardError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn put(partition: &str, sort: &str, value: i64) -> Operation {
    let mut item = BTreeMap::new();
    item.insert("Value".to_string(), AttributeValue::N(value));
    Operation::Put {
        key: RecordKey::new(partition, sort),
        item,
    }
}

fn write_entries(path: &Path, count: usize) {
    let mut writer = WalWriter::open(path, WalSyncStrategy::EveryWrite).unwrap();
    for i in 0..count {
        writer.append(vec![put("p", &format!("k{}", i), i as i64)]).unwrap();
    }
}

// =============================================================================
// Entry Tests
// =============================================================================

#[test]
fn test_entry_frame_header_layout() {
    let entry = WalEntry::new(7, vec![put("p", "a", 1)]);
    let frame = entry.serialize().unwrap();

    let lsn = u64::from_le_bytes(frame[0..8].try_into().unwrap());
    let crc = u32::from_le_bytes(frame[8..12].try_into().unwrap());
    let len = u32::from_le_bytes(frame[12..16].try_into().unwrap()) as usize;

    assert_eq!(lsn, 7);
    assert_eq!(len, frame.len() - HEADER_SIZE);
    assert_eq!(crc, WalEntry::compute_crc(7, &frame[HEADER_SIZE..]));
}

#[test]
fn test_entry_deserialize_verifies_crc() {
    let entry = WalEntry::new(1, vec![put("p", "a", 1)]);
    let frame = entry.serialize().unwrap();
    let crc = u32::from_le_bytes(frame[8..12].try_into().unwrap());

    let mut payload = frame[HEADER_SIZE..].to_vec();
    let decoded = WalEntry::deserialize(1, crc, &payload).unwrap();
    assert_eq!(decoded, entry);

    payload[0] ^= 0xFF;
    let err = WalEntry::deserialize(1, crc, &payload).unwrap_err();
    assert!(matches!(err, ScoreboardError::WalCorruption(_)));
}

#[test]
fn test_entry_rejects_mismatched_lsn() {
    let entry = WalEntry::new(3, vec![put("p", "a", 1)]);
    let frame = entry.serialize().unwrap();
    let payload = &frame[HEADER_SIZE..];

    // Valid CRC for LSN 4, but the payload says 3
    let crc = WalEntry::compute_crc(4, payload);
    assert!(WalEntry::deserialize(4, crc, payload).is_err());
}

#[test]
fn test_operation_from_write_op_drops_condition() {
    let record = Record::new(RecordKey::new("p", "s"), BTreeMap::new());
    let op = WriteOp::put_if(record, Condition::Absent);

    assert_eq!(
        op.into_operation(),
        Some(Operation::Put {
            key: RecordKey::new("p", "s"),
            item: BTreeMap::new(),
        })
    );
    assert_eq!(
        WriteOp::delete_if(RecordKey::new("p", "s"), Condition::Version(3)).into_operation(),
        Some(Operation::Delete {
            key: RecordKey::new("p", "s")
        })
    );
}

#[test]
fn test_check_op_is_not_logged() {
    let op = WriteOp::check(RecordKey::new("GAME_INFO", "chess"), Condition::Version(7));

    assert!(op.is_check());
    assert_eq!(op.into_operation(), None);
}

// =============================================================================
// Writer Tests
// =============================================================================

#[test]
fn test_writer_assigns_increasing_lsns() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    let first = writer.append(vec![put("p", "a", 1)]).unwrap();
    let second = writer.append(vec![put("p", "b", 2)]).unwrap();

    assert_eq!(first.lsn, 1);
    assert_eq!(second.lsn, 2);
    assert_eq!(writer.current_lsn(), 3);
    assert_eq!(writer.entry_count(), 2);
}

#[test]
fn test_writer_reopen_continues_lsn() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries(&wal_path, 3);

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(writer.entry_count(), 3);

    let entry = writer.append(vec![put("p", "d", 4)]).unwrap();
    assert_eq!(entry.lsn, 4);
}

#[test]
fn test_writer_truncate_keeps_lsn_increasing() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryNEntries { count: 10 }).unwrap();

    writer.append(vec![put("p", "a", 1)]).unwrap();
    writer.append(vec![put("p", "b", 2)]).unwrap();
    writer.truncate().unwrap();

    assert_eq!(writer.entry_count(), 0);
    assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), 0);

    let entry = writer.append(vec![put("p", "c", 3)]).unwrap();
    assert_eq!(entry.lsn, 3);
}

#[test]
fn test_writer_advance_lsn_only_moves_forward() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    writer.advance_lsn(10);
    writer.advance_lsn(5);

    assert_eq!(writer.current_lsn(), 10);
    assert_eq!(writer.append(vec![put("p", "a", 1)]).unwrap().lsn, 10);
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_reader_reads_transaction_as_one_entry() {
    let (_temp, wal_path) = setup_temp_wal();
    let ops = vec![
        put("GAME_INFO", "soccer", 1),
        put("Leaderboard.soccer", "elo.0000000002.u1", 2),
        Operation::Delete {
            key: RecordKey::new("Leaderboard.soccer", "elo.0000000001.u1"),
        },
    ];
    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(ops.clone()).unwrap();
    }

    let entries: Vec<WalEntry> = WalReader::open(&wal_path)
        .unwrap()
        .entries()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].operations, ops);
}

#[test]
fn test_reader_empty_file_ends_immediately() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(matches!(reader.read_record().unwrap(), WalRecord::End));
}

#[test]
fn test_reader_reports_torn_tail() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries(&wal_path, 1);

    let mut partial = WalEntry::new(2, vec![put("p", "b", 2)]).serialize().unwrap();
    partial.truncate(HEADER_SIZE + 2);
    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&partial).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(matches!(reader.read_record().unwrap(), WalRecord::Entry(_)));
    let good_len = reader.position();

    match reader.read_record().unwrap() {
        WalRecord::Torn { offset } => assert_eq!(offset, good_len),
        other => panic!("expected torn frame, got {:?}", other),
    }
}

#[test]
fn test_reader_next_entry_fails_on_corruption() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut bytes = WalEntry::new(1, vec![put("p", "a", 1)]).serialize().unwrap();
    if let Some(byte) = bytes.last_mut() {
        *byte ^= 0xFF;
    }
    std::fs::write(&wal_path, &bytes).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    let err = reader.next_entry().unwrap_err();
    assert!(matches!(err, ScoreboardError::WalCorruption(_)));
}
