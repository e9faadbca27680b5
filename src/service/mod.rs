//! Mutation Orchestrators
//!
//! The consistency core: every operation reads prior state, computes deltas
//! and queues its writes into one `Transaction`, committed once.
//!
//! ## Concurrency
//! Each orchestration is optimistic. GameStat writes carry the version they
//! were computed from, leaderboard deletes the version of the entry they
//! remove, and inserts require the key to be absent. Records that were only
//! read are guarded with check ops: match writes check the game version,
//! backfilled entries the stat version. If another writer got
//! there first the commit fails with `ConditionFailed`, nothing is applied,
//! and the orchestration re-runs from its reads (up to
//! `max_conflict_retries` times).
//!
//! ```text
//!   read (game, match, stats) ──► compute deltas ──► queue writes ──► commit
//!        ▲                                                             │
//!        └──────────────── ConditionFailed (retry) ◄──────────────────┘
//! ```

mod game;
mod game_match;
mod user;

use crate::error::Result;

pub use game::GameService;
pub use game_match::MatchService;
pub use user::UserService;

/// Run `attempt`, re-running it after optimistic conflicts
pub(crate) fn with_conflict_retry<T>(
    operation: &'static str,
    max_retries: u32,
    mut attempt: impl FnMut() -> Result<T>,
) -> Result<T> {
    let mut retries = 0;
    loop {
        match attempt() {
            Err(err) if err.is_conflict() && retries < max_retries => {
                retries += 1;
                tracing::warn!("{}: conflict ({}), retry {}/{}", operation, err, retries, max_retries);
            }
            result => return result,
        }
    }
}
