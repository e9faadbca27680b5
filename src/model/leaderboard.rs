use serde::{Deserialize, Serialize};

use super::{AttributeName, AttributeStat, GameId, UserId};

/// Users of one (game, ranked attribute), highest value first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub game_id: GameId,
    pub attribute: AttributeName,
    pub user_ids: Vec<UserId>,
}

/// Top `limit` users of a leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundedLeaderboard {
    #[serde(flatten)]
    pub leaderboard: Leaderboard,
    pub limit: usize,
}

/// One ranked user with the value it is ranked by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub value: AttributeStat,
}
