pub mod memory;

use crate::model::{
    db_structs::{MatchId, MatchRecord, Player, PlayerId, RatingLedgerEntry, RecordedMatch, Team},
    structures::team_side::TeamSide
};
use chrono::{DateTime, Duration, FixedOffset};
use thiserror::Error;

/// Transient store failure. Propagated to the caller unchanged; never
/// retried inside the engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String)
}

/// Failure modes of the two atomic write primitives.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommitError {
    #[error("match {0} no longer exists")]
    MatchMissing(MatchId),

    #[error("player {0} does not exist")]
    PlayerMissing(PlayerId),

    #[error("rating for player {0} changed since it was read")]
    Conflict(PlayerId),

    #[error(transparent)]
    Store(#[from] StoreError)
}

/// One player's rating write, validated at commit time against the rating
/// the engine read when it computed the delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingMutation {
    pub player_id: PlayerId,
    /// The rating this mutation was computed from. The store rejects the
    /// commit if the live value no longer matches bit-for-bit.
    pub expected_before: f64,
    pub rating_after: f64,
    pub delta: f64
}

/// A validated match awaiting its id, handed to the store for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMatch {
    pub played_at: DateTime<FixedOffset>,
    pub team_one: Team,
    pub team_two: Team,
    pub winner: TeamSide,
    pub notes: Option<String>
}

/// Chronological history filter: optional bounds plus a most-recent limit.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
    pub since: Option<DateTime<FixedOffset>>,
    pub until: Option<DateTime<FixedOffset>>
}

pub trait PlayerStore {
    fn get_player(&self, id: PlayerId) -> Result<Option<Player>, StoreError>;

    /// Matches already on a player's ledger, i.e. not counting any match
    /// currently being recorded. This is the recency input to the formula.
    fn prior_match_count(&self, id: PlayerId) -> Result<u32, StoreError>;

    fn all_players(&self) -> Result<Vec<Player>, StoreError>;
}

pub trait MatchStore {
    fn get_match(&self, id: MatchId) -> Result<Option<MatchRecord>, StoreError>;

    /// All matches, most recent first.
    fn all_matches(&self) -> Result<Vec<MatchRecord>, StoreError>;

    /// Matches involving the player, most recent first.
    fn matches_for_player(&self, id: PlayerId) -> Result<Vec<MatchRecord>, StoreError>;

    /// Timestamp-narrowed candidate set for the duplicate guard, which then
    /// filters by team-assignment equivalence.
    fn find_candidate_duplicates(
        &self,
        played_at: DateTime<FixedOffset>,
        window: Duration
    ) -> Result<Vec<MatchRecord>, StoreError>;
}

pub trait LedgerStore {
    /// A player's entries in chronological order, filtered by the query.
    fn player_history(&self, id: PlayerId, query: &HistoryQuery) -> Result<Vec<RatingLedgerEntry>, StoreError>;

    /// The four entries of one match, in commit order.
    fn match_entries(&self, id: MatchId) -> Result<Vec<RatingLedgerEntry>, StoreError>;
}

/// The full collaborator surface the recorder needs: the read traits plus
/// the two all-or-nothing write primitives.
pub trait EngineStore: PlayerStore + MatchStore + LedgerStore + Send + Sync {
    /// Atomically inserts the match, applies the four rating mutations and
    /// appends the four ledger entries. Nothing is written unless every
    /// mutation passes its staleness check.
    fn commit_recorded(&self, new_match: &NewMatch, mutations: &[RatingMutation])
        -> Result<RecordedMatch, CommitError>;

    /// Atomically applies the reversal mutations, deletes the match's ledger
    /// entries and deletes the match row. Nothing is written if the match is
    /// already gone or any mutation is stale.
    fn revert_recorded(&self, match_id: MatchId, mutations: &[RatingMutation]) -> Result<(), CommitError>;
}
