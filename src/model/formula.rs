use crate::model::config::RatingConfig;

/// What the formula needs to know about one participant: the rating read in
/// the current transaction attempt and the ledger count as of before this
/// match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSnapshot {
    pub rating: f64,
    pub prior_matches: u32
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamSnapshot {
    pub members: [PlayerSnapshot; 2]
}

impl TeamSnapshot {
    pub fn new(member_one: PlayerSnapshot, member_two: PlayerSnapshot) -> TeamSnapshot {
        TeamSnapshot {
            members: [member_one, member_two]
        }
    }

    /// Team strength is the arithmetic mean of the member ratings.
    pub fn strength(&self) -> f64 {
        (self.members[0].rating + self.members[1].rating) / 2.0
    }
}

/// The four signed deltas of one match, in submission order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchDeltas {
    pub team_one: [f64; 2],
    pub team_two: [f64; 2]
}

/// Pure Elo-family delta computation. No I/O, no state beyond the config.
///
/// Deltas do not sum to zero across the four players: each player's K-factor
/// decays with their own match count, so an established player paired with a
/// newcomer moves less than the newcomer does.
#[derive(Debug, Clone, Copy, Default)]
pub struct RatingFormula {
    config: RatingConfig
}

impl RatingFormula {
    pub fn new(config: RatingConfig) -> RatingFormula {
        RatingFormula { config }
    }

    /// Computes the four per-player deltas for a finished match.
    /// Callers must have rejected ties; a tie here is a logic error upstream.
    pub fn compute_deltas(
        &self,
        team_one: TeamSnapshot,
        team_two: TeamSnapshot,
        score_one: i32,
        score_two: i32
    ) -> MatchDeltas {
        debug_assert_ne!(score_one, score_two, "tied scores must be rejected before delta computation");

        let expected_one = expected_outcome(team_one.strength(), team_two.strength());
        let expected_two = 1.0 - expected_one;

        let (actual_one, actual_two) = if score_one > score_two { (1.0, 0.0) } else { (0.0, 1.0) };

        let margin = self.margin_scale((score_one - score_two).abs());

        MatchDeltas {
            team_one: team_one
                .members
                .map(|m| self.effective_k(m.prior_matches) * (actual_one - expected_one) * margin),
            team_two: team_two
                .members
                .map(|m| self.effective_k(m.prior_matches) * (actual_two - expected_two) * margin)
        }
    }

    /// Full K below the recency horizon, then geometric decay per match
    /// beyond it, clamped to the configured floor.
    pub fn effective_k(&self, prior_matches: u32) -> f64 {
        if prior_matches < self.config.recency_horizon {
            return self.config.k_base;
        }

        let beyond_horizon = (prior_matches - self.config.recency_horizon) as f64;
        let decayed = self.config.k_base * self.config.recency_decay.powf(beyond_horizon);

        decayed.max(self.config.k_floor)
    }

    pub fn margin_scale(&self, score_difference: i32) -> f64 {
        1.0 + self.config.margin_multiplier * score_difference as f64
    }
}

/// Logistic Elo expectation of the side rated `own` against `opponent`.
pub fn expected_outcome(own: f64, opponent: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - own) / 400.0))
}
