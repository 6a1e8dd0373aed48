use std::collections::HashMap;

use itertools::Itertools;
use serde::Serialize;
use strum::IntoEnumIterator;
use thiserror::Error;

use crate::{
    model::{
        constants::RECENT_MATCHES_LIMIT,
        db_structs::{MatchRecord, Player, PlayerId},
        structures::{skill_level::SkillLevel, team_side::TeamSide}
    },
    store::{MatchStore, PlayerStore, StoreError}
};
use chrono::{DateTime, FixedOffset};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatsError {
    #[error("player {0} is not registered")]
    UnknownPlayer(PlayerId),

    #[error(transparent)]
    Store(#[from] StoreError)
}

/// Aggregated results for one player, derived from stored matches only.
/// No rating math happens here.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatistics {
    pub player: Player,
    pub total_matches: usize,
    pub wins: usize,
    pub losses: usize,
    pub points_scored: i64,
    pub points_conceded: i64,
    pub recent_matches: Vec<MatchRecord>
}

impl PlayerStatistics {
    pub fn win_percentage(&self) -> f64 {
        if self.total_matches == 0 {
            return 0.0;
        }

        self.wins as f64 / self.total_matches as f64 * 100.0
    }

    pub fn average_points_scored(&self) -> f64 {
        if self.total_matches == 0 {
            return 0.0;
        }

        self.points_scored as f64 / self.total_matches as f64
    }

    pub fn average_points_conceded(&self) -> f64 {
        if self.total_matches == 0 {
            return 0.0;
        }

        self.points_conceded as f64 / self.total_matches as f64
    }

    pub fn points_difference(&self) -> i64 {
        self.points_scored - self.points_conceded
    }

    pub fn has_played(&self) -> bool {
        self.total_matches > 0
    }
}

/// Results of one recurring partnership (an unordered pair on the same side).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamCombinationStats {
    pub player_one: Player,
    pub player_two: Player,
    pub matches_played: usize,
    pub wins: usize,
    pub losses: usize,
    pub points_scored: i64,
    pub points_conceded: i64
}

impl TeamCombinationStats {
    pub fn team_name(&self) -> String {
        format!("{} & {}", self.player_one.short_name(), self.player_two.short_name())
    }

    pub fn win_percentage(&self) -> f64 {
        if self.matches_played == 0 {
            return 0.0;
        }

        self.wins as f64 / self.matches_played as f64 * 100.0
    }

    pub fn combined_rating(&self) -> f64 {
        (self.player_one.rating + self.player_two.rating) / 2.0
    }
}

pub fn player_statistics<S: PlayerStore + MatchStore>(
    store: &S,
    player_id: PlayerId,
    range: Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)>
) -> Result<PlayerStatistics, StatsError> {
    let player = store.get_player(player_id)?.ok_or(StatsError::UnknownPlayer(player_id))?;

    let mut matches = store.matches_for_player(player_id)?;
    if let Some((start, end)) = range {
        matches.retain(|m| m.played_at >= start && m.played_at <= end);
    }

    let mut stats = PlayerStatistics {
        player,
        total_matches: matches.len(),
        wins: 0,
        losses: 0,
        points_scored: 0,
        points_conceded: 0,
        recent_matches: matches.iter().take(RECENT_MATCHES_LIMIT).cloned().collect()
    };

    for m in &matches {
        let side = match m.side_of(player_id) {
            Some(side) => side,
            None => continue
        };

        stats.points_scored += m.team(side).score as i64;
        stats.points_conceded += m.team(side.other()).score as i64;
        if m.winner == side {
            stats.wins += 1;
        } else {
            stats.losses += 1;
        }
    }

    Ok(stats)
}

pub fn team_combination_stats<S: PlayerStore + MatchStore>(
    store: &S,
    player_one_id: PlayerId,
    player_two_id: PlayerId
) -> Result<TeamCombinationStats, StatsError> {
    let player_one = store
        .get_player(player_one_id)?
        .ok_or(StatsError::UnknownPlayer(player_one_id))?;
    let player_two = store
        .get_player(player_two_id)?
        .ok_or(StatsError::UnknownPlayer(player_two_id))?;

    let mut stats = TeamCombinationStats {
        player_one,
        player_two,
        matches_played: 0,
        wins: 0,
        losses: 0,
        points_scored: 0,
        points_conceded: 0
    };

    for m in store.matches_for_player(player_one_id)? {
        let side = match partnership_side(&m, player_one_id, player_two_id) {
            Some(side) => side,
            None => continue
        };

        stats.matches_played += 1;
        stats.points_scored += m.team(side).score as i64;
        stats.points_conceded += m.team(side.other()).score as i64;
        if m.winner == side {
            stats.wins += 1;
        } else {
            stats.losses += 1;
        }
    }

    Ok(stats)
}

/// Every partnership that has played at least once, busiest first.
pub fn all_team_combinations<S: PlayerStore + MatchStore>(
    store: &S
) -> Result<Vec<TeamCombinationStats>, StatsError> {
    let mut tallies: HashMap<(PlayerId, PlayerId), (usize, usize, i64, i64)> = HashMap::new();

    for m in store.all_matches()? {
        for side in [TeamSide::One, TeamSide::Two] {
            let team = m.team(side);
            let opponents = m.team(side.other());
            let key = normalized_pair(team.players[0], team.players[1]);

            let tally = tallies.entry(key).or_default();
            tally.0 += 1;
            if m.winner == side {
                tally.1 += 1;
            }
            tally.2 += team.score as i64;
            tally.3 += opponents.score as i64;
        }
    }

    let mut combinations = Vec::with_capacity(tallies.len());
    for ((id_one, id_two), (matches_played, wins, scored, conceded)) in tallies {
        let player_one = store.get_player(id_one)?.ok_or(StatsError::UnknownPlayer(id_one))?;
        let player_two = store.get_player(id_two)?.ok_or(StatsError::UnknownPlayer(id_two))?;

        combinations.push(TeamCombinationStats {
            player_one,
            player_two,
            matches_played,
            wins,
            losses: matches_played - wins,
            points_scored: scored,
            points_conceded: conceded
        });
    }

    Ok(combinations
        .into_iter()
        .sorted_by(|a, b| b.matches_played.cmp(&a.matches_played))
        .collect())
}

/// Active players by rating, optionally narrowed to one skill level.
pub fn leaderboard<S: PlayerStore>(
    store: &S,
    skill_level: Option<SkillLevel>,
    limit: usize
) -> Result<Vec<Player>, StoreError> {
    Ok(store
        .all_players()?
        .into_iter()
        .filter(|p| p.is_active)
        .filter(|p| skill_level.is_none_or(|level| p.skill_level == level))
        .sorted_by(|a, b| b.rating.total_cmp(&a.rating))
        .take(limit)
        .collect())
}

/// Active-player counts per skill level, in declaration order.
pub fn skill_level_breakdown<S: PlayerStore>(store: &S) -> Result<Vec<(SkillLevel, usize)>, StoreError> {
    let players = store.all_players()?;

    Ok(SkillLevel::iter()
        .map(|level| {
            let count = players.iter().filter(|p| p.is_active && p.skill_level == level).count();
            (level, count)
        })
        .collect())
}

/// The side the two players shared in this match, if they were partners.
fn partnership_side(m: &MatchRecord, player_one_id: PlayerId, player_two_id: PlayerId) -> Option<TeamSide> {
    match (m.side_of(player_one_id), m.side_of(player_two_id)) {
        (Some(a), Some(b)) if a == b => Some(a),
        _ => None
    }
}

fn normalized_pair(a: PlayerId, b: PlayerId) -> (PlayerId, PlayerId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{base_time, generate_submission, seeded_recorder};
    use approx::assert_abs_diff_eq;
    use chrono::Duration;

    #[test]
    fn test_player_statistics_totals() {
        let (recorder, players) = seeded_recorder(4);
        let [a, b, c, d] = [players[0].id, players[1].id, players[2].id, players[3].id];

        recorder.record(generate_submission([a, b, c, d], 21, 15, base_time())).unwrap();
        recorder
            .record(generate_submission([a, b, c, d], 18, 21, base_time() + Duration::hours(1)))
            .unwrap();
        recorder
            .record(generate_submission([a, c, b, d], 21, 10, base_time() + Duration::hours(2)))
            .unwrap();

        let stats = player_statistics(recorder.store(), a, None).unwrap();

        assert_eq!(stats.total_matches, 3);
        assert_eq!(stats.wins, 2);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.points_scored, 21 + 18 + 21);
        assert_eq!(stats.points_conceded, 15 + 21 + 10);
        assert_eq!(stats.points_difference(), 14);
        assert_abs_diff_eq!(stats.win_percentage(), 200.0 / 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(stats.average_points_scored(), 20.0, epsilon = 1e-9);
        assert!(stats.has_played());
        assert_eq!(stats.recent_matches.len(), 3);
        // Most recent first.
        assert_eq!(stats.recent_matches[0].played_at, base_time() + Duration::hours(2));
    }

    #[test]
    fn test_player_statistics_empty() {
        let (recorder, players) = seeded_recorder(4);

        let stats = player_statistics(recorder.store(), players[0].id, None).unwrap();

        assert!(!stats.has_played());
        assert_eq!(stats.win_percentage(), 0.0);
        assert_eq!(stats.average_points_scored(), 0.0);
        assert_eq!(stats.average_points_conceded(), 0.0);
    }

    #[test]
    fn test_player_statistics_date_range() {
        let (recorder, players) = seeded_recorder(4);
        let ids = [players[0].id, players[1].id, players[2].id, players[3].id];

        recorder.record(generate_submission(ids, 21, 15, base_time())).unwrap();
        recorder
            .record(generate_submission(ids, 21, 17, base_time() + Duration::days(2)))
            .unwrap();

        let range = Some((base_time() + Duration::days(1), base_time() + Duration::days(3)));
        let stats = player_statistics(recorder.store(), ids[0], range).unwrap();

        assert_eq!(stats.total_matches, 1);
        assert_eq!(stats.points_conceded, 17);
    }

    #[test]
    fn test_player_statistics_unknown_player() {
        let (recorder, _) = seeded_recorder(4);

        let result = player_statistics(recorder.store(), 99, None);

        assert_eq!(result.unwrap_err(), StatsError::UnknownPlayer(99));
    }

    #[test]
    fn test_team_combination_stats_ignores_opposing_pairings() {
        let (recorder, players) = seeded_recorder(4);
        let [a, b, c, d] = [players[0].id, players[1].id, players[2].id, players[3].id];

        // a & b partners twice, then a plays against b.
        recorder.record(generate_submission([a, b, c, d], 21, 15, base_time())).unwrap();
        recorder
            .record(generate_submission([b, a, c, d], 19, 21, base_time() + Duration::hours(1)))
            .unwrap();
        recorder
            .record(generate_submission([a, c, b, d], 21, 10, base_time() + Duration::hours(2)))
            .unwrap();

        let stats = team_combination_stats(recorder.store(), a, b).unwrap();

        assert_eq!(stats.matches_played, 2);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.points_scored, 21 + 19);
        assert_eq!(stats.points_conceded, 15 + 21);
        assert_abs_diff_eq!(stats.win_percentage(), 50.0);
    }

    #[test]
    fn test_all_team_combinations() {
        let (recorder, players) = seeded_recorder(4);
        let [a, b, c, d] = [players[0].id, players[1].id, players[2].id, players[3].id];

        recorder.record(generate_submission([a, b, c, d], 21, 15, base_time())).unwrap();
        recorder
            .record(generate_submission([b, a, c, d], 21, 19, base_time() + Duration::hours(1)))
            .unwrap();
        recorder
            .record(generate_submission([a, c, b, d], 21, 10, base_time() + Duration::hours(2)))
            .unwrap();

        let combinations = all_team_combinations(recorder.store()).unwrap();

        // {a,b}, {c,d} (twice each), {a,c}, {b,d} (once each).
        assert_eq!(combinations.len(), 4);
        assert_eq!(combinations[0].matches_played, 2);
        assert_eq!(combinations[1].matches_played, 2);
        assert_eq!(combinations[2].matches_played, 1);

        let ab = combinations
            .iter()
            .find(|s| s.player_one.id == a && s.player_two.id == b)
            .unwrap();
        assert_eq!(ab.wins, 2);
        assert_eq!(ab.team_name(), "Player 1 & Player 2");
    }

    #[test]
    fn test_leaderboard_orders_and_filters() {
        let (recorder, players) = seeded_recorder(4);
        let [a, b, c, d] = [players[0].id, players[1].id, players[2].id, players[3].id];

        recorder.record(generate_submission([a, b, c, d], 21, 15, base_time())).unwrap();

        let top = leaderboard(recorder.store(), None, 2).unwrap();
        assert_eq!(top.len(), 2);
        assert!(top[0].rating >= top[1].rating);
        assert!(top.iter().all(|p| [a, b].contains(&p.id)));

        // Deactivated players drop off the board.
        let store = recorder.store();
        store.set_player_active(a, false).unwrap();
        let remaining = leaderboard(store, None, 10).unwrap();
        assert_eq!(remaining.len(), 3);
        assert!(remaining.iter().all(|p| p.id != a));
    }

    #[test]
    fn test_skill_level_breakdown() {
        let (recorder, players) = seeded_recorder(4);
        let store = recorder.store();
        store
            .update_profile(
                players[0].id,
                players[0].name.clone(),
                None,
                SkillLevel::Advanced
            )
            .unwrap();

        let breakdown = skill_level_breakdown(store).unwrap();
        let total: usize = breakdown.iter().map(|(_, count)| count).sum();

        assert_eq!(total, 4);
        assert_eq!(breakdown.len(), SkillLevel::iter().count());
        assert_eq!(
            breakdown.iter().find(|(level, _)| *level == SkillLevel::Advanced).unwrap().1,
            1
        );
    }
}
