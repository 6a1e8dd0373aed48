use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    model::{
        constants::DEFAULT_RATING,
        db_structs::{MatchId, MatchRecord, MatchSubmission, Player, PlayerId, Team},
        recorder::MatchRecorder,
        structures::{skill_level::SkillLevel, team_side::TeamSide}
    },
    store::{
        memory::{MemoryStore, NewPlayer},
        NewMatch, RatingMutation
    }
};

/// Fixed reference instant so generated data is reproducible.
pub fn base_time() -> DateTime<FixedOffset> {
    Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap().fixed_offset()
}

pub fn generate_new_player(n: u32) -> NewPlayer {
    NewPlayer {
        name: format!("Player {}", n),
        nickname: None,
        skill_level: SkillLevel::Novice,
        joined_at: base_time() - Duration::days(n as i64)
    }
}

/// A standalone player value for tests that do not involve a store.
pub fn generate_player(id: PlayerId, name: &str) -> Player {
    Player {
        id,
        name: name.to_string(),
        nickname: None,
        skill_level: SkillLevel::Intermediate,
        joined_at: base_time(),
        rating: DEFAULT_RATING,
        is_active: true,
        created_at: base_time(),
        updated_at: base_time()
    }
}

fn winner_of(score_one: i32, score_two: i32) -> TeamSide {
    if score_one > score_two {
        TeamSide::One
    } else {
        TeamSide::Two
    }
}

pub fn generate_match_record(
    id: MatchId,
    [a1, a2, b1, b2]: [PlayerId; 4],
    score_one: i32,
    score_two: i32
) -> MatchRecord {
    MatchRecord {
        id,
        played_at: base_time(),
        team_one: Team::new(a1, a2, score_one),
        team_two: Team::new(b1, b2, score_two),
        winner: winner_of(score_one, score_two),
        notes: None,
        created_at: base_time()
    }
}

pub fn generate_submission(
    [a1, a2, b1, b2]: [PlayerId; 4],
    score_one: i32,
    score_two: i32,
    played_at: DateTime<FixedOffset>
) -> MatchSubmission {
    MatchSubmission {
        played_at,
        team_one: Team::new(a1, a2, score_one),
        team_two: Team::new(b1, b2, score_two),
        winner: winner_of(score_one, score_two),
        notes: None
    }
}

pub fn new_match_between([a1, a2, b1, b2]: [PlayerId; 4], score_one: i32, score_two: i32) -> NewMatch {
    NewMatch {
        played_at: base_time(),
        team_one: Team::new(a1, a2, score_one),
        team_two: Team::new(b1, b2, score_two),
        winner: winner_of(score_one, score_two),
        notes: None
    }
}

pub fn rating_mutation(player_id: PlayerId, rating_before: f64, delta: f64) -> RatingMutation {
    RatingMutation {
        player_id,
        expected_before: rating_before,
        rating_after: rating_before + delta,
        delta
    }
}

pub fn seeded_store(count: u32) -> (MemoryStore, Vec<Player>) {
    let store = MemoryStore::new();
    let players = (1..=count)
        .map(|n| {
            store
                .add_player(generate_new_player(n))
                .expect("generated players have unique names")
        })
        .collect();

    (store, players)
}

pub fn seeded_recorder(count: u32) -> (MatchRecorder<MemoryStore>, Vec<Player>) {
    let (store, players) = seeded_store(count);

    (MatchRecorder::new(Arc::new(store)), players)
}

/// A reproducible sequence of valid submissions among the given players:
/// random pairings, random non-tied scores, spaced beyond the duplicate
/// window.
pub fn generate_match_schedule(player_ids: &[PlayerId], rounds: usize) -> Vec<MatchSubmission> {
    assert!(player_ids.len() >= 4, "a doubles schedule needs at least 4 players");

    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut schedule = Vec::with_capacity(rounds);

    for round in 0..rounds {
        let mut pool = player_ids.to_vec();
        for i in 0..4 {
            let j = rng.random_range(i..pool.len());
            pool.swap(i, j);
        }

        let losing_score = rng.random_range(0..=19);
        let (score_one, score_two) = if rng.random_range(0..2) == 0 {
            (21, losing_score)
        } else {
            (losing_score, 21)
        };

        schedule.push(generate_submission(
            [pool[0], pool[1], pool[2], pool[3]],
            score_one,
            score_two,
            base_time() + Duration::hours(round as i64)
        ));
    }

    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LedgerStore, PlayerStore};

    #[test]
    fn test_generated_schedule_is_valid_and_recordable() {
        let (recorder, players) = seeded_recorder(6);
        let ids: Vec<PlayerId> = players.iter().map(|p| p.id).collect();

        let schedule = generate_match_schedule(&ids, 12);
        assert_eq!(schedule.len(), 12);

        for submission in &schedule {
            let mut match_ids = submission.player_ids().to_vec();
            match_ids.sort_unstable();
            match_ids.dedup();
            assert_eq!(match_ids.len(), 4, "pairings must be distinct");
            assert_ne!(submission.team_one.score, submission.team_two.score);
        }

        for submission in schedule {
            recorder.record(submission).unwrap();
        }

        // Every match leaves exactly four entries, and each player's ledger
        // count equals their appearances.
        let total_entries: u32 = ids
            .iter()
            .map(|&id| recorder.store().prior_match_count(id).unwrap())
            .sum();
        assert_eq!(total_entries, 48);

        for m in 1..=12 {
            assert_eq!(recorder.store().match_entries(m).unwrap().len(), 4);
        }
    }

    #[test]
    fn test_schedule_is_reproducible() {
        let ids = [1, 2, 3, 4, 5, 6];

        let first = generate_match_schedule(&ids, 5);
        let second = generate_match_schedule(&ids, 5);

        assert_eq!(first, second);
    }
}
