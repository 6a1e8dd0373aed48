use crate::{
    model::db_structs::{MatchId, PlayerId, RatingLedgerEntry},
    store::{HistoryQuery, LedgerStore, StoreError}
};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// One point of a player's reconstructed rating curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryPoint {
    pub timestamp: DateTime<FixedOffset>,
    pub rating: f64
}

/// A player's ledger entries in chronological order. `query` narrows by
/// date range and keeps the most recent `limit` entries.
pub fn rating_history<S: LedgerStore>(
    store: &S,
    player_id: PlayerId,
    query: &HistoryQuery
) -> Result<Vec<RatingLedgerEntry>, StoreError> {
    store.player_history(player_id, query)
}

/// The four entries written with one match.
pub fn match_ledger<S: LedgerStore>(store: &S, match_id: MatchId) -> Result<Vec<RatingLedgerEntry>, StoreError> {
    store.match_entries(match_id)
}

/// Reconstructs the rating curve from the full ledger. The first point is
/// the rating before the player's first recorded match, so a player with n
/// matches yields n + 1 points.
pub fn rating_trajectory<S: LedgerStore>(
    store: &S,
    player_id: PlayerId
) -> Result<Vec<TrajectoryPoint>, StoreError> {
    let entries = store.player_history(player_id, &HistoryQuery::default())?;

    Ok(trajectory(&entries))
}

pub fn trajectory(entries: &[RatingLedgerEntry]) -> Vec<TrajectoryPoint> {
    let first = match entries.first() {
        Some(first) => first,
        None => return Vec::new()
    };

    let mut points = Vec::with_capacity(entries.len() + 1);
    points.push(TrajectoryPoint {
        timestamp: first.timestamp,
        rating: first.rating_before
    });
    points.extend(entries.iter().map(|e| TrajectoryPoint {
        timestamp: e.timestamp,
        rating: e.rating_after
    }));

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::constants::DEFAULT_RATING,
        utils::test_utils::{base_time, generate_submission, seeded_recorder}
    };
    use chrono::Duration;

    #[test]
    fn test_trajectory_of_unplayed_player_is_empty() {
        let (recorder, players) = seeded_recorder(4);

        let points = recorder.rating_trajectory(players[0].id).unwrap();

        assert!(points.is_empty());
    }

    #[test]
    fn test_trajectory_reconstruction() {
        let (recorder, players) = seeded_recorder(4);
        let ids = [players[0].id, players[1].id, players[2].id, players[3].id];

        recorder.record(generate_submission(ids, 21, 15, base_time())).unwrap();
        recorder
            .record(generate_submission(ids, 17, 21, base_time() + Duration::hours(1)))
            .unwrap();

        let points = recorder.rating_trajectory(ids[0]).unwrap();

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].rating, DEFAULT_RATING);
        assert!(points[1].rating > points[0].rating);
        assert!(points[2].rating < points[1].rating);

        // The curve is continuous: each point starts where the last ended.
        let history = recorder
            .rating_history(ids[0], &crate::store::HistoryQuery::default())
            .unwrap();
        assert_eq!(points[1].rating, history[0].rating_after);
        assert_eq!(points[2].rating, history[1].rating_after);
    }

    #[test]
    fn test_match_ledger_holds_all_four_entries() {
        let (recorder, players) = seeded_recorder(4);
        let ids = [players[0].id, players[1].id, players[2].id, players[3].id];

        let recorded = recorder
            .record(generate_submission(ids, 21, 12, base_time()))
            .unwrap();
        let entries = recorder.match_ledger(recorded.record.id).unwrap();

        assert_eq!(entries.len(), 4);
        let mut entry_players: Vec<_> = entries.iter().map(|e| e.player_id).collect();
        entry_players.sort_unstable();
        let mut expected: Vec<_> = ids.to_vec();
        expected.sort_unstable();
        assert_eq!(entry_players, expected);
    }

    #[test]
    fn test_prior_match_count_excludes_current_match() {
        let (recorder, players) = seeded_recorder(4);
        let ids = [players[0].id, players[1].id, players[2].id, players[3].id];

        // The first match is computed with zero prior matches for everyone:
        // even ratings and full K mean the worked-example delta of 25.6.
        let first = recorder
            .record(generate_submission(ids, 21, 15, base_time()))
            .unwrap();
        approx::assert_abs_diff_eq!(first.delta_for(ids[0]).unwrap(), 25.6, epsilon = 1e-9);

        // Afterwards the ledger count, the next match's recency input, is 1.
        use crate::store::PlayerStore;
        assert_eq!(recorder.store().prior_match_count(ids[0]).unwrap(), 1);
    }
}
