//! Entity Codecs
//!
//! Pure mapping between domain structs and flat store records.
//!
//! ## Key Scheme
//! ```text
//! ┌──────────────────┬──────────────────────────────┬──────────────────────────────┐
//! │ Entity           │ Partition                    │ Sort                         │
//! ├──────────────────┼──────────────────────────────┼──────────────────────────────┤
//! │ Game             │ GAME_INFO                    │ <game>                       │
//! │ User             │ USER_INFO-prefix:<1st char>  │ <user>                       │
//! │ GameStat         │ GameStat.<user>              │ <game>                       │
//! │ Match            │ MATCH_INFO.<game>            │ <date>.<match>               │
//! │ LeaderboardEntry │ Leaderboard.<game>           │ <attr>.<padded value>.<user> │
//! └──────────────────┴──────────────────────────────┴──────────────────────────────┘
//! ```
//!
//! Date ids and attribute names never contain `.`, so every sort key splits
//! unambiguously from the left.

mod entity;
mod rank_key;

use std::collections::BTreeMap;

use crate::error::{EntityKind, Result, ScoreboardError};
use crate::store::{AttributeValue, Item, Record, RecordKey};

pub use entity::{leaderboard_item, user_basic_from_record};
pub use rank_key::{RankKey, RankKeyEncoder, DEFAULT_RANK_KEY_WIDTH};

/// Separator between key segments
pub const KEY_SEPARATOR: char = '.';

pub const GAME_PARTITION: &str = "GAME_INFO";
pub const USER_PARTITION_PREFIX: &str = "USER_INFO-prefix:";
pub const GAME_STAT_PARTITION_PREFIX: &str = "GameStat.";
pub const MATCH_PARTITION_PREFIX: &str = "MATCH_INFO.";
pub const LEADERBOARD_PARTITION_PREFIX: &str = "Leaderboard.";

// =============================================================================
// Keys
// =============================================================================

pub fn game_key(game_id: &str) -> RecordKey {
    RecordKey::new(GAME_PARTITION, game_id)
}

/// Users are spread over partitions by the first character of their id
///
/// Also used for prefix search, so `id_or_prefix` only needs its first char.
pub fn user_partition(id_or_prefix: &str) -> String {
    let first: String = id_or_prefix.chars().take(1).collect();
    format!("{}{}", USER_PARTITION_PREFIX, first)
}

pub fn user_key(user_id: &str) -> RecordKey {
    RecordKey::new(user_partition(user_id), user_id)
}

pub fn game_stat_key(user_id: &str, game_id: &str) -> RecordKey {
    RecordKey::new(format!("{}{}", GAME_STAT_PARTITION_PREFIX, user_id), game_id)
}

pub fn match_partition(game_id: &str) -> String {
    format!("{}{}", MATCH_PARTITION_PREFIX, game_id)
}

pub fn match_key(game_id: &str, date: &str, match_id: &str) -> RecordKey {
    RecordKey::new(
        match_partition(game_id),
        format!("{}{}{}", date, KEY_SEPARATOR, match_id),
    )
}

/// Sort prefix selecting every match of one date
pub fn match_date_prefix(date: &str) -> String {
    format!("{}{}", date, KEY_SEPARATOR)
}

pub fn leaderboard_partition(game_id: &str) -> String {
    format!("{}{}", LEADERBOARD_PARTITION_PREFIX, game_id)
}

// =============================================================================
// Entity <-> Record
// =============================================================================

/// Encoding of one entity type into a store record
pub trait EntityCodec: Sized {
    const KIND: EntityKind;

    /// Primary key of this entity
    fn key(&self) -> RecordKey;

    /// Attribute body (the key is not repeated inside it)
    fn to_item(&self) -> Item;

    /// Rebuild the entity from a stored record
    fn from_record(record: &Record) -> Result<Self>;

    fn to_record(&self) -> Record {
        Record::new(self.key(), self.to_item())
    }
}

/// Strip a known partition prefix, or fail as a malformed record
pub(crate) fn strip_partition<'a>(entity: EntityKind, partition: &'a str, prefix: &str) -> Result<&'a str> {
    partition
        .strip_prefix(prefix)
        .filter(|rest| !rest.is_empty())
        .ok_or_else(|| ScoreboardError::Codec {
            entity,
            reason: format!("partition '{}' does not start with '{}'", partition, prefix),
        })
}

/// Typed access to the attributes of one stored item
pub(crate) struct ItemReader<'a> {
    entity: EntityKind,
    item: &'a Item,
}

impl<'a> ItemReader<'a> {
    pub fn new(entity: EntityKind, item: &'a Item) -> Self {
        Self { entity, item }
    }

    fn malformed(&self, reason: String) -> ScoreboardError {
        ScoreboardError::Codec {
            entity: self.entity,
            reason,
        }
    }

    fn required(&self, name: &str) -> Result<&'a AttributeValue> {
        self.item
            .get(name)
            .ok_or_else(|| self.malformed(format!("missing attribute '{}'", name)))
    }

    pub fn string(&self, name: &str) -> Result<String> {
        match self.required(name)? {
            AttributeValue::S(value) => Ok(value.clone()),
            other => Err(self.malformed(format!("'{}' is not a string: {:?}", name, other))),
        }
    }

    /// List of strings; an absent attribute reads as empty
    pub fn string_list(&self, name: &str) -> Result<Vec<String>> {
        match self.item.get(name) {
            None => Ok(Vec::new()),
            Some(value) => self.strings_of(name, value),
        }
    }

    pub fn number_list(&self, name: &str) -> Result<Vec<i64>> {
        self.list(name)?
            .iter()
            .map(|value| match value {
                AttributeValue::N(n) => Ok(*n),
                other => Err(self.malformed(format!("'{}' holds a non-number: {:?}", name, other))),
            })
            .collect()
    }

    /// List of lists of strings
    pub fn nested_string_list(&self, name: &str) -> Result<Vec<Vec<String>>> {
        self.list(name)?
            .iter()
            .map(|value| self.strings_of(name, value))
            .collect()
    }

    /// Map of numbers; an absent attribute reads as empty
    pub fn number_map(&self, name: &str) -> Result<BTreeMap<String, i64>> {
        match self.item.get(name) {
            None => Ok(BTreeMap::new()),
            Some(value) => self.numbers_of(name, value),
        }
    }

    /// Map of maps of numbers; an absent attribute reads as empty
    pub fn nested_number_map(&self, name: &str) -> Result<BTreeMap<String, BTreeMap<String, i64>>> {
        match self.item.get(name) {
            None => Ok(BTreeMap::new()),
            Some(AttributeValue::M(outer)) => outer
                .iter()
                .map(|(key, value)| Ok((key.clone(), self.numbers_of(name, value)?)))
                .collect(),
            Some(other) => Err(self.malformed(format!("'{}' is not a map: {:?}", name, other))),
        }
    }

    fn list(&self, name: &str) -> Result<&'a [AttributeValue]> {
        match self.required(name)? {
            AttributeValue::L(values) => Ok(values),
            other => Err(self.malformed(format!("'{}' is not a list: {:?}", name, other))),
        }
    }

    fn strings_of(&self, name: &str, value: &AttributeValue) -> Result<Vec<String>> {
        match value {
            AttributeValue::L(values) => values
                .iter()
                .map(|value| match value {
                    AttributeValue::S(s) => Ok(s.clone()),
                    other => Err(self.malformed(format!("'{}' holds a non-string: {:?}", name, other))),
                })
                .collect(),
            other => Err(self.malformed(format!("'{}' is not a list: {:?}", name, other))),
        }
    }

    fn numbers_of(&self, name: &str, value: &AttributeValue) -> Result<BTreeMap<String, i64>> {
        match value {
            AttributeValue::M(map) => map
                .iter()
                .map(|(key, value)| match value {
                    AttributeValue::N(n) => Ok((key.clone(), *n)),
                    other => Err(self.malformed(format!("'{}.{}' is not a number: {:?}", name, key, other))),
                })
                .collect(),
            other => Err(self.malformed(format!("'{}' is not a map: {:?}", name, other))),
        }
    }
}

// =============================================================================
// Value builders
// =============================================================================

pub(crate) fn string_list<'a>(values: impl IntoIterator<Item = &'a String>) -> AttributeValue {
    AttributeValue::L(values.into_iter().map(|s| AttributeValue::S(s.clone())).collect())
}

pub(crate) fn number_map<'a>(values: impl IntoIterator<Item = (&'a String, &'a i64)>) -> AttributeValue {
    AttributeValue::M(
        values
            .into_iter()
            .map(|(key, value)| (key.clone(), AttributeValue::N(*value)))
            .collect(),
    )
}
