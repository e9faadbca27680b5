//! Tests for user operations
//!
//! These tests verify:
//! - User CRUD and its NotFound / AlreadyExists mapping
//! - Prefix search
//! - Resetting one game's stat and leaderboard entries

use std::collections::BTreeMap;

use scoreboard::{Config, EntityKind, Game, Match, Scoreboard, ScoreboardError, User};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> Scoreboard {
    let board = Scoreboard::in_memory(&Config::default()).unwrap();
    for id in ["chess", "go"] {
        let game = Game::new(id, "", ["elo", "wins"], ["elo", "wins"]).unwrap();
        board.games().create_game(&game).unwrap();
    }
    board
}

fn user(id: &str) -> User {
    User::new(id, id.to_uppercase(), format!("{}@example.com", id), vec![]).unwrap()
}

fn play(board: &Scoreboard, game_id: &str, match_id: &str, user_id: &str, elo: i64, wins: i64) {
    let deltas = BTreeMap::from([("elo".to_string(), elo), ("wins".to_string(), wins)]);
    let game_match = Match::new(
        match_id,
        "2024-06-01",
        game_id,
        vec!["Solo".to_string()],
        vec![0],
        vec![vec![user_id.to_string()]],
        BTreeMap::from([(user_id.to_string(), deltas)]),
    )
    .unwrap();
    board.matches().create_match(&game_match).unwrap();
}

// =============================================================================
// CRUD Tests
// =============================================================================

#[test]
fn test_user_lifecycle() {
    let board = setup();
    let users = board.users();
    let mut alice = user("alice");

    users.create_user(&alice).unwrap();
    assert_eq!(users.get_user("alice").unwrap(), alice);

    alice.games_played.push("chess".to_string());
    users.update_user(&alice).unwrap();
    assert_eq!(users.get_user("alice").unwrap().games_played, vec!["chess"]);

    users.delete_user("alice").unwrap();
    assert!(users.get_user("alice").unwrap_err().is_not_found());
}

#[test]
fn test_create_duplicate_user() {
    let board = setup();
    board.users().create_user(&user("alice")).unwrap();

    match board.users().create_user(&user("alice")).unwrap_err() {
        ScoreboardError::AlreadyExists { entity, .. } => assert_eq!(entity, EntityKind::User),
        other => panic!("expected already exists, got {:?}", other),
    }
}

#[test]
fn test_missing_user() {
    let board = setup();
    let users = board.users();

    assert!(users.get_user("ghost").unwrap_err().is_not_found());
    assert!(users.update_user(&user("ghost")).unwrap_err().is_not_found());
    assert!(users.delete_user("ghost").unwrap_err().is_not_found());
}

#[test]
fn test_invalid_user_is_rejected() {
    let board = setup();
    let mut bad = user("alice");
    bad.email.clear();

    assert!(board.users().create_user(&bad).unwrap_err().is_validation());
    assert!(board.users().get_user("alice").unwrap_err().is_not_found());
}

#[test]
fn test_prefix_search() {
    let board = setup();
    for id in ["sam", "sasha", "sean", "tom"] {
        board.users().create_user(&user(id)).unwrap();
    }

    let found = board.users().get_user_basics_by_prefix("sa").unwrap();
    let ids: Vec<&str> = found.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["sam", "sasha"]);
    assert_eq!(found[0].username, "SAM");

    assert!(board.users().get_user_basics_by_prefix("").unwrap_err().is_validation());
}

// =============================================================================
// Stat Tests
// =============================================================================

#[test]
fn test_get_game_stat() {
    let board = setup();
    play(&board, "chess", "m1", "alice", 12, 1);

    let stat = board.users().get_game_stat("alice", "chess").unwrap();
    assert_eq!(stat.value("elo"), 12);
    assert_eq!(stat.value("wins"), 1);

    assert!(board.users().get_game_stat("alice", "go").unwrap_err().is_not_found());
}

#[test]
fn test_reset_game_stat() {
    let board = setup();
    play(&board, "chess", "m1", "alice", 12, 1);
    play(&board, "chess", "m2", "bob", 8, 2);
    play(&board, "go", "m1", "alice", 3, 1);

    board.users().reset_game_stat("alice", "chess").unwrap();

    assert!(board.users().get_game_stat("alice", "chess").unwrap_err().is_not_found());
    assert_eq!(board.games().get_leaderboard("chess", "elo").unwrap().user_ids, vec!["bob"]);
    assert_eq!(board.games().get_leaderboard("chess", "wins").unwrap().user_ids, vec!["bob"]);
    // Other games untouched
    assert_eq!(board.games().get_leaderboard("go", "elo").unwrap().user_ids, vec!["alice"]);
    assert_eq!(board.users().get_game_stat("alice", "go").unwrap().value("elo"), 3);
    // Matches are history, not stats
    assert!(board.matches().get_match("chess", "2024-06-01", "m1").is_ok());
}

#[test]
fn test_play_after_reset_starts_from_zero() {
    let board = setup();
    play(&board, "chess", "m1", "alice", 12, 1);
    board.users().reset_game_stat("alice", "chess").unwrap();

    play(&board, "chess", "m2", "alice", 4, 0);

    let entries = board
        .games()
        .get_leaderboard_entries("chess", "elo", None)
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].value, 4);
    assert!(board.games().get_leaderboard("chess", "wins").unwrap().user_ids.is_empty());
}

#[test]
fn test_reset_missing_stat() {
    let board = setup();

    let err = board.users().reset_game_stat("alice", "chess").unwrap_err();
    assert!(matches!(
        err,
        ScoreboardError::NotFound {
            entity: EntityKind::GameStat,
            ..
        }
    ));
}
