//! Record layouts of the primary entities

use crate::error::{EntityKind, Result, ScoreboardError};
use crate::model::{Game, GameStat, Match, User, UserBasic};
use crate::store::{AttributeValue, Item, Record, RecordKey};

use super::{
    game_key, game_stat_key, match_key, number_map, string_list, strip_partition, user_key,
    EntityCodec, ItemReader, GAME_STAT_PARTITION_PREFIX, KEY_SEPARATOR, MATCH_PARTITION_PREFIX,
};

// Attribute names
const DESCRIPTION: &str = "Description";
const ATTRIBUTES: &str = "Attributes";
const RANKED_ATTRIBUTES: &str = "RankedAttributes";
const USERNAME: &str = "Username";
const EMAIL: &str = "Email";
const GAMES_PLAYED: &str = "GamesPlayed";
const TEAM_NAMES: &str = "TeamNames";
const TEAM_SCORES: &str = "TeamScores";
const TEAM_MEMBERS: &str = "TeamMembers";
const PLAYER_ATTRIBUTES: &str = "PlayerAttributes";
const LEADERBOARD_USER_ID: &str = "UserId";

// =============================================================================
// Game
// =============================================================================

impl EntityCodec for Game {
    const KIND: EntityKind = EntityKind::Game;

    fn key(&self) -> RecordKey {
        game_key(&self.id)
    }

    fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert(DESCRIPTION.to_string(), AttributeValue::S(self.description.clone()));
        item.insert(ATTRIBUTES.to_string(), string_list(&self.attributes));
        item.insert(RANKED_ATTRIBUTES.to_string(), string_list(&self.ranked_attributes));
        item
    }

    fn from_record(record: &Record) -> Result<Self> {
        let reader = ItemReader::new(Self::KIND, &record.item);
        Ok(Game {
            id: record.key.sort.clone(),
            description: reader.string(DESCRIPTION)?,
            attributes: reader.string_list(ATTRIBUTES)?.into_iter().collect(),
            ranked_attributes: reader.string_list(RANKED_ATTRIBUTES)?.into_iter().collect(),
        })
    }
}

// =============================================================================
// User
// =============================================================================

impl EntityCodec for User {
    const KIND: EntityKind = EntityKind::User;

    fn key(&self) -> RecordKey {
        user_key(&self.id)
    }

    fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert(USERNAME.to_string(), AttributeValue::S(self.username.clone()));
        item.insert(EMAIL.to_string(), AttributeValue::S(self.email.clone()));
        item.insert(GAMES_PLAYED.to_string(), string_list(&self.games_played));
        item
    }

    fn from_record(record: &Record) -> Result<Self> {
        let reader = ItemReader::new(Self::KIND, &record.item);
        Ok(User {
            id: record.key.sort.clone(),
            username: reader.string(USERNAME)?,
            email: reader.string(EMAIL)?,
            games_played: reader.string_list(GAMES_PLAYED)?,
        })
    }
}

/// Decode only the search projection of a user record
pub fn user_basic_from_record(record: &Record) -> Result<UserBasic> {
    let reader = ItemReader::new(EntityKind::User, &record.item);
    Ok(UserBasic {
        id: record.key.sort.clone(),
        username: reader.string(USERNAME)?,
    })
}

// =============================================================================
// Match
// =============================================================================

impl EntityCodec for Match {
    const KIND: EntityKind = EntityKind::Match;

    fn key(&self) -> RecordKey {
        match_key(&self.game_id, &self.date, &self.id)
    }

    fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert(TEAM_NAMES.to_string(), string_list(&self.team_names));
        item.insert(
            TEAM_SCORES.to_string(),
            AttributeValue::L(self.team_scores.iter().map(|s| AttributeValue::N(*s)).collect()),
        );
        item.insert(
            TEAM_MEMBERS.to_string(),
            AttributeValue::L(self.team_members.iter().map(|team| string_list(team)).collect()),
        );
        item.insert(
            PLAYER_ATTRIBUTES.to_string(),
            AttributeValue::M(
                self.player_attributes
                    .iter()
                    .map(|(user, deltas)| (user.clone(), number_map(deltas)))
                    .collect(),
            ),
        );
        item
    }

    fn from_record(record: &Record) -> Result<Self> {
        let game_id = strip_partition(Self::KIND, &record.key.partition, MATCH_PARTITION_PREFIX)?;
        let (date, match_id) = record
            .key
            .sort
            .split_once(KEY_SEPARATOR)
            .filter(|(date, id)| !date.is_empty() && !id.is_empty())
            .ok_or_else(|| ScoreboardError::Codec {
                entity: Self::KIND,
                reason: format!("sort key '{}' is not <date>.<match>", record.key.sort),
            })?;

        let reader = ItemReader::new(Self::KIND, &record.item);
        Ok(Match {
            id: match_id.to_string(),
            date: date.to_string(),
            game_id: game_id.to_string(),
            team_names: reader.string_list(TEAM_NAMES)?,
            team_scores: reader.number_list(TEAM_SCORES)?,
            team_members: reader.nested_string_list(TEAM_MEMBERS)?,
            player_attributes: reader.nested_number_map(PLAYER_ATTRIBUTES)?,
        })
    }
}

// =============================================================================
// GameStat
// =============================================================================

impl EntityCodec for GameStat {
    const KIND: EntityKind = EntityKind::GameStat;

    fn key(&self) -> RecordKey {
        game_stat_key(&self.user_id, &self.game_id)
    }

    fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert(ATTRIBUTES.to_string(), number_map(&self.attributes));
        item
    }

    fn from_record(record: &Record) -> Result<Self> {
        let user_id = strip_partition(Self::KIND, &record.key.partition, GAME_STAT_PARTITION_PREFIX)?;
        let reader = ItemReader::new(Self::KIND, &record.item);
        Ok(GameStat {
            user_id: user_id.to_string(),
            game_id: record.key.sort.clone(),
            attributes: reader.number_map(ATTRIBUTES)?,
        })
    }
}

// =============================================================================
// Leaderboard entry
// =============================================================================

/// Body of a leaderboard entry; the value lives in the sort key
pub fn leaderboard_item(user_id: &str) -> Item {
    let mut item = Item::new();
    item.insert(LEADERBOARD_USER_ID.to_string(), AttributeValue::S(user_id.to_string()));
    item
}
