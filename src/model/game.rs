use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoreboardError};

use super::{require_key_segment, require_non_empty, AttributeMap, AttributeName, GameId};

/// A game definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,

    #[serde(default)]
    pub description: String,

    /// Every attribute a match may report
    #[serde(default)]
    pub attributes: BTreeSet<AttributeName>,

    /// Attributes with a leaderboard; always a subset of `attributes`
    #[serde(default)]
    pub ranked_attributes: BTreeSet<AttributeName>,
}

impl Game {
    /// Build and validate a game
    pub fn new<A, R>(
        id: impl Into<GameId>,
        description: impl Into<String>,
        attributes: A,
        ranked_attributes: R,
    ) -> Result<Self>
    where
        A: IntoIterator,
        A::Item: Into<AttributeName>,
        R: IntoIterator,
        R::Item: Into<AttributeName>,
    {
        let game = Self {
            id: id.into(),
            description: description.into(),
            attributes: attributes.into_iter().map(Into::into).collect(),
            ranked_attributes: ranked_attributes.into_iter().map(Into::into).collect(),
        };
        game.validate()?;
        Ok(game)
    }

    pub fn validate(&self) -> Result<()> {
        require_non_empty("game id", &self.id)?;
        for attribute in &self.attributes {
            require_key_segment("attribute name", attribute)?;
        }
        if let Some(stray) = self.ranked_attributes.difference(&self.attributes).next() {
            return Err(ScoreboardError::validation(format!(
                "ranked attribute '{}' is not an attribute of game '{}'",
                stray, self.id
            )));
        }
        Ok(())
    }

    pub fn is_ranked(&self, attribute: &str) -> bool {
        self.ranked_attributes.contains(attribute)
    }

    /// Every attribute of the game at zero
    pub fn zero_stats(&self) -> AttributeMap {
        self.attributes.iter().map(|name| (name.clone(), 0)).collect()
    }

    /// Ranked attributes this game has and `other` does not
    pub fn ranked_not_in<'a>(&'a self, other: &'a Game) -> impl Iterator<Item = &'a AttributeName> {
        self.ranked_attributes.difference(&other.ranked_attributes)
    }
}
