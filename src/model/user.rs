use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::{require_non_empty, GameId, UserId};

/// Search projection of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBasic {
    pub id: UserId,
    pub username: String,
}

/// A player profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,

    #[serde(default)]
    pub games_played: Vec<GameId>,
}

impl User {
    /// Build and validate a user
    pub fn new(
        id: impl Into<UserId>,
        username: impl Into<String>,
        email: impl Into<String>,
        games_played: Vec<GameId>,
    ) -> Result<Self> {
        let user = Self {
            id: id.into(),
            username: username.into(),
            email: email.into(),
            games_played,
        };
        user.validate()?;
        Ok(user)
    }

    pub fn validate(&self) -> Result<()> {
        require_non_empty("user id", &self.id)?;
        require_non_empty("username", &self.username)?;
        require_non_empty("email", &self.email)
    }

    pub fn basic(&self) -> UserBasic {
        UserBasic {
            id: self.id.clone(),
            username: self.username.clone(),
        }
    }
}
