use crate::{
    model::db_structs::{MatchId, MatchRecord, MatchSubmission, Team},
    store::{MatchStore, StoreError}
};
use chrono::Duration;
use tracing::debug;

/// Advisory pre-commit check for resubmissions of the same real-world match.
/// The store narrows by timestamp; the guard decides team-assignment
/// equivalence. It never blocks a commit by itself; the recorder turns a
/// hit into a rejection the caller may override by cancelling or editing.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateGuard {
    window: Duration
}

impl DuplicateGuard {
    pub fn new(window: Duration) -> DuplicateGuard {
        DuplicateGuard { window }
    }

    /// Returns the id of a stored match that duplicates the submission,
    /// if any exists inside the window.
    pub fn find_conflict<S: MatchStore>(
        &self,
        submission: &MatchSubmission,
        store: &S
    ) -> Result<Option<MatchId>, StoreError> {
        let candidates = store.find_candidate_duplicates(submission.played_at, self.window)?;

        let conflict = candidates
            .iter()
            .find(|existing| same_fixture(&submission.team_one, &submission.team_two, existing))
            .map(|existing| existing.id);

        if let Some(match_id) = conflict {
            debug!(match_id, "submission duplicates a stored match");
        }

        Ok(conflict)
    }
}

/// True when the submitted pair assignment equals the stored one under any
/// of the 8 symmetric relabelings: swap within team one, swap within team
/// two, swap which side is team one (2 x 2 x 2).
pub fn same_fixture(team_one: &Team, team_two: &Team, existing: &MatchRecord) -> bool {
    let direct = pair_matches(team_one, &existing.team_one) && pair_matches(team_two, &existing.team_two);
    let crossed = pair_matches(team_one, &existing.team_two) && pair_matches(team_two, &existing.team_one);

    direct || crossed
}

fn pair_matches(a: &Team, b: &Team) -> bool {
    let [a1, a2] = a.players;
    let [b1, b2] = b.players;

    (a1 == b1 && a2 == b2) || (a1 == b2 && a2 == b1)
}
