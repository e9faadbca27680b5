//! Tests for the entity repositories
//!
//! These tests verify:
//! - Create/get/update/delete per entity and the errors they map to
//! - Prefix search over user partitions
//! - Match listing by game and date
//! - Deferred writes when a transaction is passed in

use std::collections::BTreeMap;
use std::sync::Arc;

use scoreboard::codec::RankKeyEncoder;
use scoreboard::repository::Repositories;
use scoreboard::store::{Condition, MemoryStore, Transaction};
use scoreboard::{EntityKind, Game, GameStat, Match, ScoreboardError, User};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (Arc<MemoryStore>, Repositories) {
    let store = Arc::new(MemoryStore::new());
    let repos = Repositories::new(store.clone(), RankKeyEncoder::default());
    (store, repos)
}

fn user(id: &str, username: &str) -> User {
    User::new(id, username, format!("{}@example.com", id), vec![]).unwrap()
}

fn game_match(id: &str, date: &str) -> Match {
    Match::new(
        id,
        date,
        "chess",
        vec!["White".to_string(), "Black".to_string()],
        vec![1, 0],
        vec![vec!["u1".to_string()], vec!["u2".to_string()]],
        BTreeMap::new(),
    )
    .unwrap()
}

// =============================================================================
// Game Repository Tests
// =============================================================================

#[test]
fn test_game_create_get() {
    let (_store, repos) = setup();
    let game = Game::new("chess", "Chess", ["elo", "wins"], ["elo"]).unwrap();

    repos.games.create(&game, None).unwrap();

    assert_eq!(repos.games.get("chess").unwrap(), game);
}

#[test]
fn test_game_create_duplicate() {
    let (_store, repos) = setup();
    let game = Game::new("chess", "Chess", ["elo"], ["elo"]).unwrap();
    repos.games.create(&game, None).unwrap();

    match repos.games.create(&game, None).unwrap_err() {
        ScoreboardError::AlreadyExists { entity, key } => {
            assert_eq!(entity, EntityKind::Game);
            assert_eq!(key, "GAME_INFO/chess");
        }
        other => panic!("expected already exists, got {:?}", other),
    }
}

#[test]
fn test_game_get_missing() {
    let (_store, repos) = setup();

    let err = repos.games.get("nope").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_game_invalid_is_rejected_before_write() {
    let (store, repos) = setup();
    let mut game = Game::new("chess", "Chess", ["elo"], ["elo"]).unwrap();
    game.ranked_attributes.insert("wins".to_string());

    assert!(repos.games.create(&game, None).unwrap_err().is_validation());
    assert!(store.is_empty());
}

#[test]
fn test_game_update_with_stale_version() {
    let (_store, repos) = setup();
    let game = Game::new("chess", "Chess", ["elo"], ["elo"]).unwrap();
    repos.games.create(&game, None).unwrap();
    let read = repos.games.find_versioned("chess").unwrap().unwrap();

    let mut renamed = game.clone();
    renamed.description = "Classical chess".to_string();
    repos.games.update(&renamed, Condition::Version(read.version), None).unwrap();

    // Second writer still holds the old version
    let err = repos
        .games
        .update(&game, Condition::Version(read.version), None)
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(repos.games.get("chess").unwrap().description, "Classical chess");
}

#[test]
fn test_game_delete_missing_with_exists() {
    let (_store, repos) = setup();

    let err = repos.games.delete("nope", Condition::Exists, None).unwrap_err();
    assert!(err.is_not_found());
}

// =============================================================================
// User Repository Tests
// =============================================================================

#[test]
fn test_user_crud() {
    let (_store, repos) = setup();
    let mut alice = user("alice", "Alice");

    repos.users.create(&alice, None).unwrap();
    assert_eq!(repos.users.get("alice").unwrap(), alice);

    alice.username = "Alice L.".to_string();
    repos.users.update(&alice, None).unwrap();
    assert_eq!(repos.users.get("alice").unwrap().username, "Alice L.");

    repos.users.delete("alice", None).unwrap();
    assert!(repos.users.get("alice").unwrap_err().is_not_found());
}

#[test]
fn test_user_update_and_delete_missing() {
    let (_store, repos) = setup();

    assert!(repos.users.update(&user("ghost", "Ghost"), None).unwrap_err().is_not_found());
    assert!(repos.users.delete("ghost", None).unwrap_err().is_not_found());
}

#[test]
fn test_user_prefix_search() {
    let (_store, repos) = setup();
    for (id, name) in [("alice", "Alice"), ("alex", "Alex"), ("albert", "Albert"), ("bob", "Bob")] {
        repos.users.create(&user(id, name), None).unwrap();
    }

    let found = repos.users.get_basics_by_prefix("al").unwrap();
    let ids: Vec<&str> = found.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["albert", "alex", "alice"]);

    let found = repos.users.get_basics_by_prefix("ale").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].username, "Alex");

    assert!(repos.users.get_basics_by_prefix("z").unwrap().is_empty());
}

#[test]
fn test_user_prefix_search_empty_prefix() {
    let (_store, repos) = setup();
    assert!(repos.users.get_basics_by_prefix("").unwrap_err().is_validation());
}

// =============================================================================
// Match Repository Tests
// =============================================================================

#[test]
fn test_match_listing_by_date() {
    let (_store, repos) = setup();
    repos.matches.create(&game_match("m2", "2024-01-01"), None).unwrap();
    repos.matches.create(&game_match("m1", "2024-01-01"), None).unwrap();
    repos.matches.create(&game_match("m3", "2024-01-02"), None).unwrap();

    let day: Vec<String> = repos
        .matches
        .get_by_game_and_date("chess", "2024-01-01")
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(day, vec!["m1", "m2"]);

    assert_eq!(repos.matches.list_for_game("chess").unwrap().len(), 3);
    assert!(repos.matches.list_for_game("go").unwrap().is_empty());
}

#[test]
fn test_match_create_duplicate() {
    let (_store, repos) = setup();
    let m = game_match("m1", "2024-01-01");
    repos.matches.create(&m, None).unwrap();

    let err = repos.matches.create(&m, None).unwrap_err();
    assert!(matches!(
        err,
        ScoreboardError::AlreadyExists {
            entity: EntityKind::Match,
            ..
        }
    ));
}

#[test]
fn test_match_same_id_on_other_date_is_distinct() {
    let (_store, repos) = setup();
    repos.matches.create(&game_match("m1", "2024-01-01"), None).unwrap();
    repos.matches.create(&game_match("m1", "2024-01-02"), None).unwrap();

    repos
        .matches
        .delete("chess", "2024-01-01", "m1", Condition::Exists, None)
        .unwrap();
    assert!(repos.matches.get("chess", "2024-01-02", "m1").is_ok());
}

// =============================================================================
// GameStat Repository Tests
// =============================================================================

#[test]
fn test_stat_upsert_and_get() {
    let (_store, repos) = setup();
    let stat = GameStat::new("u1", "chess", BTreeMap::from([("elo".to_string(), 1200)])).unwrap();

    repos.stats.upsert(&stat, None).unwrap();
    assert_eq!(repos.stats.get("u1", "chess").unwrap(), stat);

    let err = repos.stats.get("u1", "go").unwrap_err();
    assert!(matches!(
        err,
        ScoreboardError::NotFound {
            entity: EntityKind::GameStat,
            ..
        }
    ));
}

#[test]
fn test_stat_negative_value_is_rejected() {
    let (store, repos) = setup();
    let stat = GameStat {
        user_id: "u1".to_string(),
        game_id: "chess".to_string(),
        attributes: BTreeMap::from([("elo".to_string(), 10), ("wins".to_string(), -1)]),
    };

    assert!(repos.stats.upsert(&stat, None).unwrap_err().is_validation());
    assert!(store.is_empty());
}

#[test]
fn test_stat_absent_guard() {
    let (_store, repos) = setup();
    let stat = GameStat::new("u1", "chess", BTreeMap::new()).unwrap();

    repos.stats.upsert_if(&stat, Condition::Absent, None).unwrap();
    let err = repos.stats.upsert_if(&stat, Condition::Absent, None).unwrap_err();
    assert!(matches!(err, ScoreboardError::AlreadyExists { .. }));
}

// =============================================================================
// Transaction Tests
// =============================================================================

#[test]
fn test_writes_deferred_until_commit() {
    let (store, repos) = setup();
    let game = Game::new("chess", "Chess", ["elo"], ["elo"]).unwrap();
    let stat = GameStat::new("u1", "chess", BTreeMap::from([("elo".to_string(), 3)])).unwrap();

    let mut tx = Transaction::new();
    repos.games.create(&game, Some(&mut tx)).unwrap();
    repos.stats.upsert(&stat, Some(&mut tx)).unwrap();
    repos.leaderboards.add("chess", "u1", "elo", 3, Some(&mut tx)).unwrap();

    assert!(store.is_empty());
    assert_eq!(tx.len(), 3);

    tx.commit(store.as_ref()).unwrap();
    assert_eq!(store.len(), 3);
    assert_eq!(repos.leaderboards.get("chess", "elo").unwrap().user_ids, vec!["u1"]);
}

#[test]
fn test_conflict_inside_transaction_surfaces_at_commit() {
    let (store, repos) = setup();
    let game = Game::new("chess", "Chess", ["elo"], ["elo"]).unwrap();
    repos.games.create(&game, None).unwrap();

    let mut tx = Transaction::new();
    // Queued without error; the Absent check runs at commit
    repos.games.create(&game, Some(&mut tx)).unwrap();
    repos.users.create(&user("u1", "U1"), Some(&mut tx)).unwrap();

    assert!(tx.commit(store.as_ref()).unwrap_err().is_conflict());
    assert!(repos.users.get("u1").unwrap_err().is_not_found());
}
