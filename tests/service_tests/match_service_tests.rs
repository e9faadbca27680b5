//! Tests for match orchestration
//!
//! These tests verify:
//! - Stats equal the sum of deltas of active matches
//! - Leaderboard entries follow the stat of every ranked attribute
//! - Edits revert players dropped from a match
//! - Large matches commit whole
//! - Errors (including sums going negative) leave every view untouched

use std::collections::BTreeMap;

use scoreboard::{Config, EntityKind, Game, GameStat, LeaderboardEntry, Match, Scoreboard, ScoreboardError};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> Scoreboard {
    let board = Scoreboard::in_memory(&Config::default()).unwrap();
    let soccer = Game::new("soccer", "Association football", ["elo", "goals", "fouls"], ["elo", "goals"]).unwrap();
    board.games().create_game(&soccer).unwrap();
    board
}

fn deltas(pairs: &[(&str, i64)]) -> BTreeMap<String, i64> {
    pairs.iter().map(|(name, value)| (name.to_string(), *value)).collect()
}

fn soccer_match(id: &str, players: &[(&str, &[(&str, i64)])]) -> Match {
    let player_attributes = players
        .iter()
        .map(|(user, pairs)| (user.to_string(), deltas(pairs)))
        .collect();
    Match::new(
        id,
        "2024-05-01",
        "soccer",
        vec!["Home".to_string(), "Away".to_string()],
        vec![1, 0],
        vec![
            players.iter().map(|(user, _)| user.to_string()).collect(),
            vec![],
        ],
        player_attributes,
    )
    .unwrap()
}

fn stat_value(board: &Scoreboard, user: &str, attribute: &str) -> i64 {
    board.users().get_game_stat(user, "soccer").unwrap().value(attribute)
}

fn board_entries(board: &Scoreboard, attribute: &str) -> Vec<LeaderboardEntry> {
    board
        .games()
        .get_leaderboard_entries("soccer", attribute, None)
        .unwrap()
}

fn entry(user_id: &str, value: i64) -> LeaderboardEntry {
    LeaderboardEntry {
        user_id: user_id.to_string(),
        value,
    }
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_create_update_delete_match_scenario() {
    let board = setup();

    board
        .matches()
        .create_match(&soccer_match("m1", &[("u1", &[("elo", 2)])]))
        .unwrap();
    assert_eq!(stat_value(&board, "u1", "elo"), 2);
    assert_eq!(board_entries(&board, "elo"), vec![entry("u1", 2)]);

    board
        .matches()
        .update_match(&soccer_match("m1", &[("u1", &[("elo", 5)])]))
        .unwrap();
    assert_eq!(stat_value(&board, "u1", "elo"), 5);
    assert_eq!(board_entries(&board, "elo"), vec![entry("u1", 5)]);

    board.matches().delete_match("soccer", "m1", "2024-05-01").unwrap();
    assert_eq!(stat_value(&board, "u1", "elo"), 0);
    assert!(board_entries(&board, "elo").is_empty());
    assert!(board
        .matches()
        .get_match("soccer", "2024-05-01", "m1")
        .unwrap_err()
        .is_not_found());
}

#[test]
fn test_first_match_materializes_zeroed_stat() {
    let board = setup();

    board
        .matches()
        .create_match(&soccer_match("m1", &[("u1", &[("goals", 1)])]))
        .unwrap();

    let stat = board.users().get_game_stat("u1", "soccer").unwrap();
    assert_eq!(
        stat,
        GameStat::new("u1", "soccer", deltas(&[("elo", 0), ("fouls", 0), ("goals", 1)])).unwrap()
    );
    // Zero sums have no entry
    assert!(board_entries(&board, "elo").is_empty());
}

#[test]
fn test_stats_sum_over_matches() {
    let board = setup();
    let matches = board.matches();

    matches
        .create_match(&soccer_match("m1", &[("u1", &[("goals", 2), ("fouls", 1)]), ("u2", &[("goals", 1)])]))
        .unwrap();
    matches
        .create_match(&soccer_match("m2", &[("u1", &[("goals", 3)])]))
        .unwrap();
    matches
        .create_match(&soccer_match("m3", &[("u2", &[("goals", 7)])]))
        .unwrap();

    assert_eq!(stat_value(&board, "u1", "goals"), 5);
    assert_eq!(stat_value(&board, "u1", "fouls"), 1);
    assert_eq!(stat_value(&board, "u2", "goals"), 8);
    assert_eq!(board_entries(&board, "goals"), vec![entry("u2", 8), entry("u1", 5)]);

    matches.delete_match("soccer", "m3", "2024-05-01").unwrap();
    assert_eq!(board_entries(&board, "goals"), vec![entry("u1", 5), entry("u2", 1)]);
}

#[test]
fn test_unranked_attribute_has_no_leaderboard() {
    let board = setup();

    board
        .matches()
        .create_match(&soccer_match("m1", &[("u1", &[("fouls", 4)])]))
        .unwrap();

    assert_eq!(stat_value(&board, "u1", "fouls"), 4);
    let err = board
        .games()
        .get_leaderboard_entries("soccer", "fouls", None)
        .unwrap_err();
    assert!(err.is_validation());
}

// =============================================================================
// Update Tests
// =============================================================================

#[test]
fn test_update_reverts_dropped_player() {
    let board = setup();
    board
        .matches()
        .create_match(&soccer_match("m1", &[("u1", &[("elo", 3)]), ("u2", &[("elo", 4)])]))
        .unwrap();

    board
        .matches()
        .update_match(&soccer_match("m1", &[("u1", &[("elo", 3)])]))
        .unwrap();

    assert_eq!(stat_value(&board, "u2", "elo"), 0);
    assert_eq!(board_entries(&board, "elo"), vec![entry("u1", 3)]);
}

#[test]
fn test_update_adds_new_player_and_attribute() {
    let board = setup();
    board
        .matches()
        .create_match(&soccer_match("m1", &[("u1", &[("elo", 3)])]))
        .unwrap();

    board
        .matches()
        .update_match(&soccer_match("m1", &[("u1", &[("elo", 3), ("goals", 2)]), ("u3", &[("elo", 6)])]))
        .unwrap();

    assert_eq!(board_entries(&board, "elo"), vec![entry("u3", 6), entry("u1", 3)]);
    assert_eq!(board_entries(&board, "goals"), vec![entry("u1", 2)]);
}

#[test]
fn test_update_missing_match() {
    let board = setup();

    let err = board
        .matches()
        .update_match(&soccer_match("ghost", &[("u1", &[("elo", 1)])]))
        .unwrap_err();

    assert!(matches!(
        err,
        ScoreboardError::NotFound {
            entity: EntityKind::Match,
            ..
        }
    ));
    assert!(board.users().get_game_stat("u1", "soccer").unwrap_err().is_not_found());
}

#[test]
fn test_large_match_commits_in_one_transaction() {
    let board = setup();
    let players: Vec<String> = (0..40).map(|i| format!("p{:02}", i)).collect();
    let contribution: &[(&str, i64)] = &[("elo", 1), ("goals", 1)];
    let roster: Vec<(&str, &[(&str, i64)])> = players.iter().map(|p| (p.as_str(), contribution)).collect();

    // Second match moves an existing entry per ranked attribute and player
    board.matches().create_match(&soccer_match("a", &roster)).unwrap();
    board.matches().create_match(&soccer_match("b", &roster)).unwrap();

    let elo = board_entries(&board, "elo");
    assert_eq!(elo.len(), 40);
    assert!(elo.iter().all(|e| e.value == 2));
    assert_eq!(board_entries(&board, "goals").len(), 40);

    board.matches().delete_match("soccer", "a", "2024-05-01").unwrap();
    assert!(board_entries(&board, "elo").iter().all(|e| e.value == 1));
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_delete_after_reset_is_rejected() {
    let board = setup();
    board
        .matches()
        .create_match(&soccer_match("m1", &[("u1", &[("elo", 2)])]))
        .unwrap();
    board.users().reset_game_stat("u1", "soccer").unwrap();

    let err = board.matches().delete_match("soccer", "m1", "2024-05-01").unwrap_err();

    assert!(err.is_validation());
    // The match stays and no stat is written
    assert!(board.matches().get_match("soccer", "2024-05-01", "m1").is_ok());
    assert!(board.users().get_game_stat("u1", "soccer").unwrap_err().is_not_found());
    assert!(board_entries(&board, "elo").is_empty());
}

#[test]
fn test_shrinking_update_below_zero_is_rejected() {
    let board = setup();
    board
        .matches()
        .create_match(&soccer_match("m1", &[("u1", &[("elo", 5)])]))
        .unwrap();
    board.users().reset_game_stat("u1", "soccer").unwrap();
    board
        .matches()
        .create_match(&soccer_match("m2", &[("u1", &[("elo", 1)])]))
        .unwrap();

    let err = board
        .matches()
        .update_match(&soccer_match("m1", &[("u1", &[("elo", 2)])]))
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(stat_value(&board, "u1", "elo"), 1);
    assert_eq!(board_entries(&board, "elo"), vec![entry("u1", 1)]);
    let kept = board.matches().get_match("soccer", "2024-05-01", "m1").unwrap();
    assert_eq!(kept.player_deltas("u1").unwrap().get("elo"), Some(&5));
}

#[test]
fn test_create_duplicate_match_changes_nothing() {
    let board = setup();
    let m1 = soccer_match("m1", &[("u1", &[("elo", 2)])]);
    board.matches().create_match(&m1).unwrap();

    let err = board.matches().create_match(&m1).unwrap_err();

    assert!(matches!(err, ScoreboardError::AlreadyExists { .. }));
    assert_eq!(stat_value(&board, "u1", "elo"), 2);
    assert_eq!(board_entries(&board, "elo"), vec![entry("u1", 2)]);
}

#[test]
fn test_create_match_for_missing_game() {
    let board = setup();
    let mut orphan = soccer_match("m1", &[("u1", &[("elo", 2)])]);
    orphan.game_id = "curling".to_string();

    let err = board.matches().create_match(&orphan).unwrap_err();
    assert!(matches!(
        err,
        ScoreboardError::NotFound {
            entity: EntityKind::Game,
            ..
        }
    ));
}

#[test]
fn test_delete_missing_match() {
    let board = setup();
    assert!(board
        .matches()
        .delete_match("soccer", "nope", "2024-05-01")
        .unwrap_err()
        .is_not_found());
}

#[test]
fn test_invalid_match_is_rejected() {
    let board = setup();
    let mut bad = soccer_match("m1", &[("u1", &[("elo", 2)])]);
    bad.team_scores.push(3);

    assert!(board.matches().create_match(&bad).unwrap_err().is_validation());
    assert!(board
        .matches()
        .get_matches_by_game_and_date("soccer", "2024-05-01")
        .unwrap()
        .is_empty());
}

#[test]
fn test_value_beyond_rank_key_range_is_rejected() {
    let config = Config::builder().rank_key_width(2).build();
    let board = Scoreboard::in_memory(&config).unwrap();
    let game = Game::new("soccer", "", ["elo"], ["elo"]).unwrap();
    board.games().create_game(&game).unwrap();

    board
        .matches()
        .create_match(&soccer_match("m1", &[("u1", &[("elo", 99)])]))
        .unwrap();
    let err = board
        .matches()
        .create_match(&soccer_match("m2", &[("u1", &[("elo", 1)])]))
        .unwrap_err();

    assert!(matches!(err, ScoreboardError::RankValueOutOfRange { value: 100, max: 99 }));
    // Nothing from the rejected match was applied
    assert_eq!(stat_value(&board, "u1", "elo"), 99);
    assert!(board
        .matches()
        .get_match("soccer", "2024-05-01", "m2")
        .unwrap_err()
        .is_not_found());
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_matches_keep_views_consistent() {
    use std::sync::Arc;
    use std::thread;

    let config = Config::builder().max_conflict_retries(50).build();
    let board = Arc::new(Scoreboard::in_memory(&config).unwrap());
    let game = Game::new("soccer", "", ["elo"], ["elo"]).unwrap();
    board.games().create_game(&game).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let board = Arc::clone(&board);
            thread::spawn(move || {
                for i in 0..5 {
                    let id = format!("m{}-{}", t, i);
                    board
                        .matches()
                        .create_match(&soccer_match(&id, &[("u1", &[("elo", 1)])]))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(stat_value(&board, "u1", "elo"), 20);
    assert_eq!(board_entries(&board, "elo"), vec![entry("u1", 20)]);
}
