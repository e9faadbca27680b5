//! Scoreboard CLI
//!
//! Runs one scoreboard operation against a data directory and prints the
//! result as JSON. Entity payloads are read from a JSON file (`-` for stdin).
//!
//! Exit status: 0 on success, 2 when the target does not exist, 1 otherwise.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use scoreboard::{Config, Game, GameDeletePolicy, Match, Result, Scoreboard, User, WalSyncStrategy};

/// Scoreboard CLI
#[derive(Parser, Debug)]
#[command(name = "scoreboard")]
#[command(about = "Games, matches, stats and leaderboards over a durable key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, env = "SCOREBOARD_DATA_DIR", default_value = "./scoreboard_data")]
    data_dir: PathBuf,

    /// Digits used to pad leaderboard values (1-19)
    #[arg(long, env = "SCOREBOARD_RANK_KEY_WIDTH", default_value = "10")]
    rank_key_width: usize,

    /// What deleting a game removes
    #[arg(long, env = "SCOREBOARD_DELETE_POLICY", value_enum, default_value = "retain")]
    delete_policy: DeletePolicyArg,

    /// Retries after an optimistic conflict
    #[arg(long, env = "SCOREBOARD_MAX_CONFLICT_RETRIES", default_value = "3")]
    max_conflict_retries: u32,

    /// fsync the WAL after every commit
    #[arg(long, env = "SCOREBOARD_SYNC_EVERY_WRITE")]
    sync_every_write: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DeletePolicyArg {
    Retain,
    Purge,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Game definitions and leaderboards
    #[command(subcommand)]
    Game(GameCommand),

    /// Match records
    #[command(subcommand)]
    Match(MatchCommand),

    /// Users and their stats
    #[command(subcommand)]
    User(UserCommand),
}

#[derive(Subcommand, Debug)]
enum GameCommand {
    /// Show a game
    Get { game_id: String },

    /// Create a game from a JSON file
    Create { file: String },

    /// Replace a game from a JSON file
    Update { file: String },

    /// Delete a game
    Delete { game_id: String },

    /// Show a leaderboard, best first
    Leaderboard {
        game_id: String,
        attribute: String,

        /// Only the top N users
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
enum MatchCommand {
    /// Show a match
    Get {
        game_id: String,
        date: String,
        match_id: String,
    },

    /// List the matches of a game on one date
    List { game_id: String, date: String },

    /// Record a match from a JSON file
    Create { file: String },

    /// Replace a match from a JSON file
    Update { file: String },

    /// Delete a match
    Delete {
        game_id: String,
        date: String,
        match_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Show a user
    Get { user_id: String },

    /// Find users whose id starts with a prefix
    Search { prefix: String },

    /// Create a user from a JSON file
    Create { file: String },

    /// Replace a user from a JSON file
    Update { file: String },

    /// Delete a user
    Delete { user_id: String },

    /// Show a user's stat in one game
    Stat { user_id: String, game_id: String },

    /// Drop a user's stat and leaderboard entries in one game
    ResetStat { user_id: String, game_id: String },
}

fn main() -> ExitCode {
    // Initialize tracing/logging (stderr, so stdout stays JSON)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,scoreboard=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    tracing::debug!("Scoreboard CLI v{}", scoreboard::VERSION);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_not_found() => {
            tracing::error!("{}", e);
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(1)
        }
    }
}

fn run(args: Args) -> Result<()> {
    // Build config from args
    let sync_strategy = if args.sync_every_write {
        WalSyncStrategy::EveryWrite
    } else {
        Config::default().wal_sync_strategy
    };
    let delete_policy = match args.delete_policy {
        DeletePolicyArg::Retain => GameDeletePolicy::RetainHistory,
        DeletePolicyArg::Purge => GameDeletePolicy::Purge,
    };
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .rank_key_width(args.rank_key_width)
        .game_delete_policy(delete_policy)
        .max_conflict_retries(args.max_conflict_retries)
        .wal_sync_strategy(sync_strategy)
        .build();

    let board = Scoreboard::open(config)?;

    match args.command {
        Commands::Game(command) => run_game(&board, command)?,
        Commands::Match(command) => run_match(&board, command)?,
        Commands::User(command) => run_user(&board, command)?,
    }

    board.close()
}

fn run_game(board: &Scoreboard, command: GameCommand) -> Result<()> {
    let games = board.games();
    match command {
        GameCommand::Get { game_id } => print_json(&games.get_game(&game_id)?),
        GameCommand::Create { file } => games.create_game(&read_payload::<Game>(&file)?),
        GameCommand::Update { file } => games.update_game(&read_payload::<Game>(&file)?),
        GameCommand::Delete { game_id } => games.delete_game(&game_id),
        GameCommand::Leaderboard {
            game_id,
            attribute,
            limit,
        } => print_json(&games.get_leaderboard_entries(&game_id, &attribute, limit)?),
    }
}

fn run_match(board: &Scoreboard, command: MatchCommand) -> Result<()> {
    let matches = board.matches();
    match command {
        MatchCommand::Get {
            game_id,
            date,
            match_id,
        } => print_json(&matches.get_match(&game_id, &date, &match_id)?),
        MatchCommand::List { game_id, date } => {
            print_json(&matches.get_matches_by_game_and_date(&game_id, &date)?)
        }
        MatchCommand::Create { file } => matches.create_match(&read_payload::<Match>(&file)?),
        MatchCommand::Update { file } => matches.update_match(&read_payload::<Match>(&file)?),
        MatchCommand::Delete {
            game_id,
            date,
            match_id,
        } => matches.delete_match(&game_id, &match_id, &date),
    }
}

fn run_user(board: &Scoreboard, command: UserCommand) -> Result<()> {
    let users = board.users();
    match command {
        UserCommand::Get { user_id } => print_json(&users.get_user(&user_id)?),
        UserCommand::Search { prefix } => print_json(&users.get_user_basics_by_prefix(&prefix)?),
        UserCommand::Create { file } => users.create_user(&read_payload::<User>(&file)?),
        UserCommand::Update { file } => users.update_user(&read_payload::<User>(&file)?),
        UserCommand::Delete { user_id } => users.delete_user(&user_id),
        UserCommand::Stat { user_id, game_id } => print_json(&users.get_game_stat(&user_id, &game_id)?),
        UserCommand::ResetStat { user_id, game_id } => users.reset_game_stat(&user_id, &game_id),
    }
}

/// Parse a JSON payload from a file, or stdin for `-`
fn read_payload<T: DeserializeOwned>(file: &str) -> Result<T> {
    let text = if file == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        text
    } else {
        fs::read_to_string(file)?
    };
    Ok(serde_json::from_str(&text)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
