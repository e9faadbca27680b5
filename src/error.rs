//! Error types for the scoreboard engine
//!
//! Provides a unified error type for all operations.

use std::fmt;

use thiserror::Error;

/// Result type alias using ScoreboardError
pub type Result<T> = std::result::Result<T, ScoreboardError>;

/// Entity kinds, used to give errors enough context to diagnose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Game,
    User,
    Match,
    GameStat,
    LeaderboardEntry,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Game => "game",
            EntityKind::User => "user",
            EntityKind::Match => "match",
            EntityKind::GameStat => "game stat",
            EntityKind::LeaderboardEntry => "leaderboard entry",
        };
        f.write_str(name)
    }
}

/// Unified error type for scoreboard operations
#[derive(Debug, Error)]
pub enum ScoreboardError {
    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("{entity} not found: {key}")]
    NotFound { entity: EntityKind, key: String },

    #[error("{entity} already exists: {key}")]
    AlreadyExists { entity: EntityKind, key: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rank value {value} is outside the representable range [0, {max}]")]
    RankValueOutOfRange { value: i64, max: i64 },

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("Snapshot corruption detected: {0}")]
    SnapshotCorruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Malformed {entity} record: {reason}")]
    Codec { entity: EntityKind, reason: String },

    #[error("Transaction condition failed on {key}")]
    ConditionFailed { key: String },

    // -------------------------------------------------------------------------
    // Orchestration Errors
    // -------------------------------------------------------------------------
    #[error("{entity} {operation} failed: {source}")]
    Repository {
        entity: EntityKind,
        operation: &'static str,
        #[source]
        source: Box<ScoreboardError>,
    },

    #[error("{operation} partially applied ({committed} batches committed): {source}")]
    PartialApplication {
        operation: &'static str,
        committed: usize,
        #[source]
        source: Box<ScoreboardError>,
    },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScoreboardError {
    /// Shorthand for a not-found error
    pub fn not_found(entity: EntityKind, key: impl Into<String>) -> Self {
        ScoreboardError::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Shorthand for a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        ScoreboardError::Validation(message.into())
    }

    /// Whether this error (or the error it wraps) is a point-lookup miss
    pub fn is_not_found(&self) -> bool {
        match self {
            ScoreboardError::NotFound { .. } => true,
            ScoreboardError::Repository { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Whether this error (or the error it wraps) is an optimistic-check failure
    pub fn is_conflict(&self) -> bool {
        match self {
            ScoreboardError::ConditionFailed { .. } => true,
            ScoreboardError::Repository { source, .. } => source.is_conflict(),
            _ => false,
        }
    }

    /// Whether this error was raised before any write was attempted
    pub fn is_validation(&self) -> bool {
        match self {
            ScoreboardError::Validation(_) | ScoreboardError::RankValueOutOfRange { .. } => true,
            ScoreboardError::Repository { source, .. } => source.is_validation(),
            _ => false,
        }
    }
}

impl From<bincode::Error> for ScoreboardError {
    fn from(err: bincode::Error) -> Self {
        ScoreboardError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for ScoreboardError {
    fn from(err: serde_json::Error) -> Self {
        ScoreboardError::Serialization(err.to_string())
    }
}

/// Attach repository context to store-level failures.
///
/// Domain errors (not found, validation, already exists) already carry their
/// entity and pass through untouched.
pub(crate) trait RepositoryContext<T> {
    fn context(self, entity: EntityKind, operation: &'static str) -> Result<T>;
}

impl<T> RepositoryContext<T> for Result<T> {
    fn context(self, entity: EntityKind, operation: &'static str) -> Result<T> {
        self.map_err(|err| match err {
            ScoreboardError::NotFound { .. }
            | ScoreboardError::AlreadyExists { .. }
            | ScoreboardError::Validation(_)
            | ScoreboardError::RankValueOutOfRange { .. }
            | ScoreboardError::Repository { .. } => err,
            other => ScoreboardError::Repository {
                entity,
                operation,
                source: Box::new(other),
            },
        })
    }
}
