use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoreboardError};

use super::{require_non_empty, require_non_negative, AttributeMap, AttributeStat, Game, GameId, UserId};

/// Cumulative per-(user, game) sums
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStat {
    pub user_id: UserId,
    pub game_id: GameId,
    pub attributes: AttributeMap,
}

impl GameStat {
    /// Build and validate a stat
    pub fn new(user_id: impl Into<UserId>, game_id: impl Into<GameId>, attributes: AttributeMap) -> Result<Self> {
        let stat = Self {
            user_id: user_id.into(),
            game_id: game_id.into(),
            attributes,
        };
        stat.validate()?;
        Ok(stat)
    }

    /// The implicit stat of a user who has not played `game` yet
    pub fn zeroed(user_id: impl Into<UserId>, game: &Game) -> Self {
        Self {
            user_id: user_id.into(),
            game_id: game.id.clone(),
            attributes: game.zero_stats(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_non_empty("user id", &self.user_id)?;
        require_non_empty("game id", &self.game_id)?;
        require_non_negative("game stat", &self.attributes)
    }

    /// Current sum of `attribute` (absent counts as zero)
    pub fn value(&self, attribute: &str) -> AttributeStat {
        self.attributes.get(attribute).copied().unwrap_or(0)
    }

    /// Add a signed delta to one attribute and return the new sum
    ///
    /// A sum that would go below zero is a `Validation` error and leaves the
    /// stat unchanged.
    pub fn apply_delta(&mut self, attribute: &str, delta: AttributeStat) -> Result<AttributeStat> {
        let old = self.value(attribute);
        let new = old.checked_add(delta).ok_or_else(|| {
            ScoreboardError::validation(format!(
                "game stat {}/{}: '{}' overflows ({} + {})",
                self.user_id, self.game_id, attribute, old, delta
            ))
        })?;
        if new < 0 {
            return Err(ScoreboardError::validation(format!(
                "game stat {}/{}: '{}' would become negative ({} + {})",
                self.user_id, self.game_id, attribute, old, delta
            )));
        }
        self.attributes.insert(attribute.to_string(), new);
        Ok(new)
    }

    /// Add every delta of a match contribution
    pub fn add(&mut self, deltas: &AttributeMap) -> Result<()> {
        for (attribute, delta) in deltas {
            self.apply_delta(attribute, *delta)?;
        }
        Ok(())
    }

    /// Revert every delta of a match contribution
    pub fn subtract(&mut self, deltas: &AttributeMap) -> Result<()> {
        for (attribute, delta) in deltas {
            self.apply_delta(attribute, -*delta)?;
        }
        Ok(())
    }
}

/// Per-attribute `new - old` over both key sets, zero entries omitted
///
/// An attribute missing on one side counts as zero there, so an attribute
/// dropped by an edit yields its negated old value.
pub fn diff(old: &AttributeMap, new: &AttributeMap) -> AttributeMap {
    old.keys()
        .chain(new.keys())
        .filter_map(|attribute| {
            let before = old.get(attribute).copied().unwrap_or(0);
            let after = new.get(attribute).copied().unwrap_or(0);
            let delta = after - before;
            (delta != 0).then(|| (attribute.clone(), delta))
        })
        .collect()
}
