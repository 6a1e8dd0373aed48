use crate::model::structures::{rating_trend::RatingTrend, skill_level::SkillLevel, team_side::TeamSide};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

pub type PlayerId = i64;
pub type MatchId = i64;
pub type LedgerEntryId = i64;

/// A club member. The rating field is mutated only through the recorder's
/// atomic commit; profile fields change through the roster API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub nickname: Option<String>,
    pub skill_level: SkillLevel,
    pub joined_at: DateTime<FixedOffset>,
    pub rating: f64,
    pub is_active: bool,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>
}

impl Player {
    pub fn display_name(&self) -> String {
        match &self.nickname {
            Some(nickname) => format!("{} ({})", self.name, nickname),
            None => self.name.clone()
        }
    }

    pub fn short_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.name)
    }
}

/// One side of a doubles match: a stored-ordered pair of players and their
/// final score. Team identity is order-independent; only storage is ordered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub players: [PlayerId; 2],
    pub score: i32
}

impl Team {
    pub fn new(player_one: PlayerId, player_two: PlayerId, score: i32) -> Team {
        Team {
            players: [player_one, player_two],
            score
        }
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.players.contains(&player_id)
    }

    pub fn partner_of(&self, player_id: PlayerId) -> Option<PlayerId> {
        match self.players {
            [a, b] if a == player_id => Some(b),
            [a, b] if b == player_id => Some(a),
            _ => None
        }
    }
}

/// A recorded match. Immutable after commit; deletion reverses its ledger
/// effect before the row disappears.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub id: MatchId,
    pub played_at: DateTime<FixedOffset>,
    pub team_one: Team,
    pub team_two: Team,
    pub winner: TeamSide,
    pub notes: Option<String>,
    pub created_at: DateTime<FixedOffset>
}

impl MatchRecord {
    pub fn score_difference(&self) -> i32 {
        (self.team_one.score - self.team_two.score).abs()
    }

    pub fn team(&self, side: TeamSide) -> &Team {
        match side {
            TeamSide::One => &self.team_one,
            TeamSide::Two => &self.team_two
        }
    }

    pub fn winning_team(&self) -> &Team {
        self.team(self.winner)
    }

    pub fn losing_team(&self) -> &Team {
        self.team(self.winner.other())
    }

    pub fn player_ids(&self) -> [PlayerId; 4] {
        let [a1, a2] = self.team_one.players;
        let [b1, b2] = self.team_two.players;

        [a1, a2, b1, b2]
    }

    pub fn involves(&self, player_id: PlayerId) -> bool {
        self.team_one.contains(player_id) || self.team_two.contains(player_id)
    }

    pub fn side_of(&self, player_id: PlayerId) -> Option<TeamSide> {
        if self.team_one.contains(player_id) {
            Some(TeamSide::One)
        } else if self.team_two.contains(player_id) {
            Some(TeamSide::Two)
        } else {
            None
        }
    }

    pub fn won_by(&self, player_id: PlayerId) -> bool {
        self.winning_team().contains(player_id)
    }
}

/// One rating transition of one player, caused by one match. Four of these
/// are appended atomically with every recorded match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RatingLedgerEntry {
    pub id: LedgerEntryId,
    pub player_id: PlayerId,
    pub match_id: MatchId,
    pub rating_before: f64,
    pub rating_after: f64,
    pub rating_delta: f64,
    pub timestamp: DateTime<FixedOffset>
}

impl RatingLedgerEntry {
    pub fn trend(&self) -> RatingTrend {
        RatingTrend::from_change(self.rating_delta)
    }
}

/// A candidate match as submitted by the caller, before validation and
/// duplicate checking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchSubmission {
    pub played_at: DateTime<FixedOffset>,
    pub team_one: Team,
    pub team_two: Team,
    pub winner: TeamSide,
    pub notes: Option<String>
}

impl MatchSubmission {
    pub fn player_ids(&self) -> [PlayerId; 4] {
        let [a1, a2] = self.team_one.players;
        let [b1, b2] = self.team_two.players;

        [a1, a2, b1, b2]
    }
}

/// A successfully committed match together with the four ledger entries it
/// produced, returned for immediate display.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordedMatch {
    pub record: MatchRecord,
    pub entries: Vec<RatingLedgerEntry>
}

impl RecordedMatch {
    pub fn delta_for(&self, player_id: PlayerId) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.player_id == player_id)
            .map(|e| e.rating_delta)
    }
}
