use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    model::{
        config::EngineConfig,
        constants::MAX_COMMIT_ATTEMPTS,
        db_structs::{MatchId, MatchSubmission, PlayerId, RatingLedgerEntry, RecordedMatch},
        formula::{PlayerSnapshot, RatingFormula, TeamSnapshot},
        guard::DuplicateGuard,
        ledger::{self, TrajectoryPoint},
        structures::team_side::TeamSide
    },
    store::{CommitError, EngineStore, HistoryQuery, NewMatch, RatingMutation, StoreError}
};

/// A structurally invalid submission. Never retried; surfaced verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("player {0} appears more than once in the match")]
    DuplicatePlayer(PlayerId),

    #[error("team {side} has a negative score ({score})")]
    NegativeScore { side: TeamSide, score: i32 },

    #[error("tied score {0}-{0} cannot be recorded")]
    TiedScore(i32),

    #[error("declared winner (team {declared}) does not have the higher score")]
    InconsistentWinner { declared: TeamSide }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecordError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("near-identical match {conflicting} is already recorded")]
    Duplicate { conflicting: MatchId },

    #[error("player {0} is not registered")]
    UnknownPlayer(PlayerId),

    #[error("conflicting concurrent update for player {0}; resubmit to recompute")]
    TransactionConflict(PlayerId),

    #[error(transparent)]
    Store(#[from] StoreError)
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeleteError {
    #[error("match {0} does not exist")]
    NotFound(MatchId),

    #[error("conflicting concurrent update for player {0}; retry the deletion")]
    TransactionConflict(PlayerId),

    #[error(transparent)]
    Store(#[from] StoreError)
}

/// Emitted to observers after a commit has fully succeeded, outside the
/// transactional path.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    MatchRecorded {
        match_id: MatchId,
        entries: Vec<RatingLedgerEntry>
    },
    MatchDeleted {
        match_id: MatchId
    }
}

type Observer = Box<dyn Fn(&EngineEvent) + Send + Sync>;

/// Orchestrates match recording: validation, duplicate check, delta
/// computation and the atomic commit of one match row, four rating writes
/// and four ledger entries.
pub struct MatchRecorder<S> {
    store: Arc<S>,
    formula: RatingFormula,
    guard: DuplicateGuard,
    observers: Mutex<Vec<Observer>>
}

impl<S: EngineStore> MatchRecorder<S> {
    pub fn new(store: Arc<S>) -> MatchRecorder<S> {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: EngineConfig) -> MatchRecorder<S> {
        MatchRecorder {
            store,
            formula: RatingFormula::new(config.rating),
            guard: DuplicateGuard::new(config.duplicate_window()),
            observers: Mutex::new(Vec::new())
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers a callback for post-commit events. Presentation layers
    /// subscribe here instead of polling the store.
    pub fn subscribe(&self, observer: impl Fn(&EngineEvent) + Send + Sync + 'static) {
        match self.observers.lock() {
            Ok(mut observers) => observers.push(Box::new(observer)),
            Err(_) => warn!("observer registry poisoned; subscription dropped")
        }
    }

    pub fn record(&self, submission: MatchSubmission) -> Result<RecordedMatch, RecordError> {
        validate(&submission)?;

        if let Some(conflicting) = self.guard.find_conflict(&submission, self.store.as_ref())? {
            return Err(RecordError::Duplicate { conflicting });
        }

        let new_match = NewMatch {
            played_at: submission.played_at,
            team_one: submission.team_one,
            team_two: submission.team_two,
            winner: submission.winner,
            notes: submission.notes.clone()
        };

        // Deltas are recomputed from fresh reads on every attempt; a stale
        // read is detected by the store at write time.
        let mut conflicting_player = None;
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let mutations = self.plan_mutations(&submission)?;

            match self.store.commit_recorded(&new_match, &mutations) {
                Ok(recorded) => {
                    info!(
                        match_id = recorded.record.id,
                        score_difference = recorded.record.score_difference(),
                        "recorded match"
                    );
                    self.notify(&EngineEvent::MatchRecorded {
                        match_id: recorded.record.id,
                        entries: recorded.entries.clone()
                    });
                    return Ok(recorded);
                }
                Err(CommitError::Conflict(player_id)) => {
                    debug!(player_id, attempt, "rating stale at commit; recomputing deltas");
                    conflicting_player = Some(player_id);
                }
                Err(CommitError::PlayerMissing(player_id)) => return Err(RecordError::UnknownPlayer(player_id)),
                Err(CommitError::MatchMissing(match_id)) => {
                    return Err(StoreError::Unavailable(format!(
                        "store reported missing match {match_id} while inserting"
                    ))
                    .into())
                }
                Err(CommitError::Store(e)) => return Err(e.into())
            }
        }

        Err(RecordError::TransactionConflict(
            conflicting_player.unwrap_or_default()
        ))
    }

    /// Reverses a recorded match: the stored deltas (never a recomputation)
    /// are subtracted from the players' current ratings, and the match plus
    /// its four ledger entries disappear in the same transaction. A missing
    /// match signals `NotFound` and touches no rating.
    pub fn delete_match(&self, match_id: MatchId) -> Result<(), DeleteError> {
        if self.store.get_match(match_id)?.is_none() {
            return Err(DeleteError::NotFound(match_id));
        }

        let mut conflicting_player = None;
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let entries = self.store.match_entries(match_id)?;
            if entries.is_empty() {
                // Lost a race with a concurrent deletion; ratings untouched.
                return Err(DeleteError::NotFound(match_id));
            }

            let mut mutations = Vec::with_capacity(entries.len());
            for entry in &entries {
                let player = match self.store.get_player(entry.player_id)? {
                    Some(player) => player,
                    // Players cannot be removed while a match references them.
                    None => {
                        return Err(StoreError::Unavailable(format!(
                            "player {} missing during reversal of match {match_id}",
                            entry.player_id
                        ))
                        .into())
                    }
                };

                // When this match is still the player's latest rating change,
                // restore the recorded pre-match value exactly; otherwise
                // subtract the stored delta from wherever they are now.
                let rating_after = if player.rating.to_bits() == entry.rating_after.to_bits() {
                    entry.rating_before
                } else {
                    player.rating - entry.rating_delta
                };

                mutations.push(RatingMutation {
                    player_id: entry.player_id,
                    expected_before: player.rating,
                    rating_after,
                    delta: -entry.rating_delta
                });
            }

            match self.store.revert_recorded(match_id, &mutations) {
                Ok(()) => {
                    info!(match_id, "deleted match and reversed its rating effect");
                    self.notify(&EngineEvent::MatchDeleted { match_id });
                    return Ok(());
                }
                Err(CommitError::Conflict(player_id)) => {
                    debug!(player_id, attempt, "rating stale at reversal; re-reading");
                    conflicting_player = Some(player_id);
                }
                Err(CommitError::MatchMissing(_)) => return Err(DeleteError::NotFound(match_id)),
                Err(CommitError::PlayerMissing(player_id)) => {
                    return Err(StoreError::Unavailable(format!(
                        "player {player_id} missing during reversal of match {match_id}"
                    ))
                    .into())
                }
                Err(CommitError::Store(e)) => return Err(e.into())
            }
        }

        Err(DeleteError::TransactionConflict(
            conflicting_player.unwrap_or_default()
        ))
    }

    pub fn rating_history(
        &self,
        player_id: PlayerId,
        query: &HistoryQuery
    ) -> Result<Vec<RatingLedgerEntry>, StoreError> {
        ledger::rating_history(self.store.as_ref(), player_id, query)
    }

    pub fn match_ledger(&self, match_id: MatchId) -> Result<Vec<RatingLedgerEntry>, StoreError> {
        ledger::match_ledger(self.store.as_ref(), match_id)
    }

    pub fn rating_trajectory(&self, player_id: PlayerId) -> Result<Vec<TrajectoryPoint>, StoreError> {
        ledger::rating_trajectory(self.store.as_ref(), player_id)
    }

    /// Reads current rating and ledger count for all four players and turns
    /// the formula output into staleness-checked mutations.
    fn plan_mutations(&self, submission: &MatchSubmission) -> Result<[RatingMutation; 4], RecordError> {
        let ids = submission.player_ids();

        let mut snapshots = [PlayerSnapshot {
            rating: 0.0,
            prior_matches: 0
        }; 4];
        for (i, id) in ids.into_iter().enumerate() {
            let player = self.store.get_player(id)?.ok_or(RecordError::UnknownPlayer(id))?;
            let prior_matches = self.store.prior_match_count(id)?;
            snapshots[i] = PlayerSnapshot {
                rating: player.rating,
                prior_matches
            };
        }

        let deltas = self.formula.compute_deltas(
            TeamSnapshot::new(snapshots[0], snapshots[1]),
            TeamSnapshot::new(snapshots[2], snapshots[3]),
            submission.team_one.score,
            submission.team_two.score
        );
        let flat = [
            deltas.team_one[0],
            deltas.team_one[1],
            deltas.team_two[0],
            deltas.team_two[1]
        ];

        Ok(std::array::from_fn(|i| RatingMutation {
            player_id: ids[i],
            expected_before: snapshots[i].rating,
            rating_after: snapshots[i].rating + flat[i],
            delta: flat[i]
        }))
    }

    fn notify(&self, event: &EngineEvent) {
        match self.observers.lock() {
            Ok(observers) => {
                for observer in observers.iter() {
                    observer(event);
                }
            }
            Err(_) => warn!("observer registry poisoned; notification skipped")
        }
    }
}

fn validate(submission: &MatchSubmission) -> Result<(), ValidationError> {
    let ids = submission.player_ids();
    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            if ids[i] == ids[j] {
                return Err(ValidationError::DuplicatePlayer(ids[i]));
            }
        }
    }

    for side in [TeamSide::One, TeamSide::Two] {
        let score = match side {
            TeamSide::One => submission.team_one.score,
            TeamSide::Two => submission.team_two.score
        };
        if score < 0 {
            return Err(ValidationError::NegativeScore { side, score });
        }
    }

    if submission.team_one.score == submission.team_two.score {
        return Err(ValidationError::TiedScore(submission.team_one.score));
    }

    let actual_winner = if submission.team_one.score > submission.team_two.score {
        TeamSide::One
    } else {
        TeamSide::Two
    };
    if submission.winner != actual_winner {
        return Err(ValidationError::InconsistentWinner {
            declared: submission.winner
        });
    }

    Ok(())
}
