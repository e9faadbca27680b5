use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoreboardError};

use super::{
    require_key_segment, require_non_empty, require_non_negative, AttributeMap, DateId, GameId,
    MatchId, UserId,
};

/// One played match
///
/// Identified by (game, date, id). `player_attributes` holds the
/// non-negative per-attribute contribution of every player; those deltas are
/// what the services fold into `GameStat` sums.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub date: DateId,
    pub game_id: GameId,
    pub team_names: Vec<String>,
    pub team_scores: Vec<i64>,
    pub team_members: Vec<Vec<UserId>>,

    #[serde(default)]
    pub player_attributes: BTreeMap<UserId, AttributeMap>,
}

impl Match {
    /// Build and validate a match
    pub fn new(
        id: impl Into<MatchId>,
        date: impl Into<DateId>,
        game_id: impl Into<GameId>,
        team_names: Vec<String>,
        team_scores: Vec<i64>,
        team_members: Vec<Vec<UserId>>,
        player_attributes: BTreeMap<UserId, AttributeMap>,
    ) -> Result<Self> {
        let game_match = Self {
            id: id.into(),
            date: date.into(),
            game_id: game_id.into(),
            team_names,
            team_scores,
            team_members,
            player_attributes,
        };
        game_match.validate()?;
        Ok(game_match)
    }

    pub fn validate(&self) -> Result<()> {
        require_non_empty("match id", &self.id)?;
        require_key_segment("date id", &self.date)?;
        require_non_empty("game id", &self.game_id)?;

        if self.team_names.is_empty() {
            return Err(ScoreboardError::validation("team names list cannot be empty"));
        }
        if self.team_scores.is_empty() {
            return Err(ScoreboardError::validation("team scores list cannot be empty"));
        }
        if self.team_members.len() != self.team_scores.len() {
            return Err(ScoreboardError::validation(format!(
                "team members list ({}) and team scores list ({}) must have the same length",
                self.team_members.len(),
                self.team_scores.len()
            )));
        }

        for (user, deltas) in &self.player_attributes {
            require_non_empty("player id", user)?;
            for attribute in deltas.keys() {
                require_key_segment("attribute name", attribute)?;
            }
            require_non_negative("match attribute", deltas)?;
        }
        Ok(())
    }

    /// Deltas reported for `user`
    pub fn player_deltas(&self, user: &str) -> Option<&AttributeMap> {
        self.player_attributes.get(user)
    }

    /// Every user with reported deltas
    pub fn participants(&self) -> impl Iterator<Item = &UserId> {
        self.player_attributes.keys()
    }

    /// Users reported in either match, each once
    pub fn participants_union<'a>(&'a self, other: &'a Match) -> BTreeSet<&'a UserId> {
        self.participants().chain(other.participants()).collect()
    }
}
