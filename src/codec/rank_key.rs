//! Rank key encoding
//!
//! Leaderboard sort keys embed the ranked value as fixed-width zero-padded
//! decimal, so bytewise key order equals numeric order:
//!
//! ```text
//!   goals.0000000007.alice
//!   goals.0000000012.bob      <- descending scan starts here
//!   └─┬─┘ └───┬────┘ └┬┘
//!   attr   value    user id (may itself contain '.')
//! ```
//!
//! Representable values are `[0, 10^width - 1]`, capped at `i64::MAX`.

use crate::config::MAX_RANK_KEY_WIDTH;
use crate::error::{EntityKind, Result, ScoreboardError};
use crate::model::{AttributeName, AttributeStat, UserId};

use super::KEY_SEPARATOR;

/// Default number of digits
pub const DEFAULT_RANK_KEY_WIDTH: usize = 10;

/// A decoded leaderboard sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankKey {
    pub attribute: AttributeName,
    pub value: AttributeStat,
    pub user_id: UserId,
}

/// Encoder for a fixed digit width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankKeyEncoder {
    width: usize,
    max_value: i64,
}

impl RankKeyEncoder {
    /// Create an encoder; `width` must be in `1..=19`
    pub fn new(width: usize) -> Result<Self> {
        if width == 0 || width > MAX_RANK_KEY_WIDTH {
            return Err(ScoreboardError::Config(format!(
                "rank key width must be in 1..={}, got {}",
                MAX_RANK_KEY_WIDTH, width
            )));
        }
        let max_value = (10u128.pow(width as u32) - 1).min(i64::MAX as u128) as i64;
        Ok(Self { width, max_value })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Largest encodable value
    pub fn max_value(&self) -> i64 {
        self.max_value
    }

    /// Build the sort key `attribute.<padded value>.user`
    pub fn encode(&self, attribute: &str, value: AttributeStat, user_id: &str) -> Result<String> {
        let mut key = self.value_prefix(attribute, value)?;
        key.push_str(user_id);
        Ok(key)
    }

    /// Prefix selecting every entry of one attribute
    pub fn attribute_prefix(attribute: &str) -> String {
        format!("{}{}", attribute, KEY_SEPARATOR)
    }

    /// Prefix selecting every entry of one attribute with exactly `value`
    pub fn value_prefix(&self, attribute: &str, value: AttributeStat) -> Result<String> {
        self.check_value(value)?;
        Ok(format!(
            "{}{:0width$}{}",
            Self::attribute_prefix(attribute),
            value,
            KEY_SEPARATOR,
            width = self.width
        ))
    }

    /// Split a sort key back into (attribute, value, user)
    pub fn decode(&self, sort_key: &str) -> Result<RankKey> {
        let mut parts = sort_key.splitn(3, KEY_SEPARATOR);
        let (attribute, digits, user_id) = match (parts.next(), parts.next(), parts.next()) {
            (Some(attribute), Some(digits), Some(user_id))
                if !attribute.is_empty() && !user_id.is_empty() =>
            {
                (attribute, digits, user_id)
            }
            _ => return Err(malformed(sort_key, "expected attribute.value.user")),
        };

        if digits.len() != self.width || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed(
                sort_key,
                &format!("value segment is not {} digits", self.width),
            ));
        }
        let value: i64 = digits
            .parse()
            .map_err(|_| malformed(sort_key, "value segment overflows i64"))?;

        Ok(RankKey {
            attribute: attribute.to_string(),
            value,
            user_id: user_id.to_string(),
        })
    }

    /// User id embedded in a sort key
    pub fn decode_user(&self, sort_key: &str) -> Result<UserId> {
        self.decode(sort_key).map(|key| key.user_id)
    }

    fn check_value(&self, value: AttributeStat) -> Result<()> {
        if value < 0 || value > self.max_value {
            return Err(ScoreboardError::RankValueOutOfRange {
                value,
                max: self.max_value,
            });
        }
        Ok(())
    }
}

impl Default for RankKeyEncoder {
    fn default() -> Self {
        Self {
            width: DEFAULT_RANK_KEY_WIDTH,
            max_value: 9_999_999_999,
        }
    }
}

fn malformed(sort_key: &str, reason: &str) -> ScoreboardError {
    ScoreboardError::Codec {
        entity: EntityKind::LeaderboardEntry,
        reason: format!("sort key '{}': {}", sort_key, reason),
    }
}
