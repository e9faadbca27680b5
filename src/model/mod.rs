//! Domain Model
//!
//! Plain data carried between the services and the repositories.
//!
//! ## Entities
//! - `Game`: attribute schema, some attributes ranked
//! - `Match`: one played match, keyed by (game, date, id)
//! - `GameStat`: cumulative per-(user, game) sums of match deltas
//! - `User` / `UserBasic`: player profile and its search projection
//! - `Leaderboard`: users of one (game, ranked attribute), best first
//!
//! Relationships are by identifier only. Constructors validate; structs
//! deserialized from outside go through `validate()` before any write.

mod game;
mod game_match;
mod leaderboard;
mod stat;
mod user;

use std::collections::BTreeMap;

use crate::codec::KEY_SEPARATOR;
use crate::error::{Result, ScoreboardError};

pub use game::Game;
pub use game_match::Match;
pub use leaderboard::{BoundedLeaderboard, Leaderboard, LeaderboardEntry};
pub use stat::{diff, GameStat};
pub use user::{User, UserBasic};

pub type GameId = String;
pub type UserId = String;
pub type DateId = String;
pub type MatchId = String;
pub type AttributeName = String;

/// Value of one attribute (a delta inside a match, a sum inside a stat)
pub type AttributeStat = i64;

/// Attribute name → value
pub type AttributeMap = BTreeMap<AttributeName, AttributeStat>;

/// Reject empty identifiers
pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ScoreboardError::validation(format!("{} cannot be empty", field)));
    }
    Ok(())
}

/// Identifiers that become a delimited segment of a sort key must not
/// contain the separator
pub(crate) fn require_key_segment(field: &str, value: &str) -> Result<()> {
    require_non_empty(field, value)?;
    if value.contains(KEY_SEPARATOR) {
        return Err(ScoreboardError::validation(format!(
            "{} '{}' cannot contain '{}'",
            field, value, KEY_SEPARATOR
        )));
    }
    Ok(())
}

/// Reject negative values in an attribute map
pub(crate) fn require_non_negative(field: &str, attributes: &AttributeMap) -> Result<()> {
    if let Some((name, value)) = attributes.iter().find(|(_, value)| **value < 0) {
        return Err(ScoreboardError::validation(format!(
            "{} '{}' cannot be negative (got {})",
            field, name, value
        )));
    }
    Ok(())
}
