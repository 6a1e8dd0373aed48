use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, FixedOffset, Utc};
use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::model::{
    constants::DEFAULT_RATING,
    db_structs::{
        LedgerEntryId, MatchId, MatchRecord, Player, PlayerId, RatingLedgerEntry, RecordedMatch
    },
    structures::skill_level::SkillLevel
};

use super::{
    CommitError, EngineStore, HistoryQuery, LedgerStore, MatchStore, NewMatch, PlayerStore, RatingMutation,
    StoreError
};

/// Roster mutations bypass the recorder, so they carry their own failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RosterError {
    #[error("player name {0:?} is already taken")]
    NameTaken(String),

    #[error("player {0} does not exist")]
    UnknownPlayer(PlayerId),

    #[error("player {0} is referenced by {1} recorded matches")]
    ReferencedByMatches(PlayerId, usize),

    #[error(transparent)]
    Store(#[from] StoreError)
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPlayer {
    pub name: String,
    pub nickname: Option<String>,
    pub skill_level: SkillLevel,
    pub joined_at: DateTime<FixedOffset>
}

#[derive(Default)]
struct Tables {
    players: IndexMap<PlayerId, Player>,
    matches: IndexMap<MatchId, MatchRecord>,
    ledger: Vec<RatingLedgerEntry>,
    next_player_id: PlayerId,
    next_match_id: MatchId,
    next_entry_id: LedgerEntryId
}

/// Reference store: every table behind one `RwLock`, so each commit is a
/// store-level transaction. Rating writes are additionally validated against
/// the value the engine read (bit-level compare) to catch interleaved
/// commits that share a player.
pub struct MemoryStore {
    inner: RwLock<Tables>
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore {
            inner: RwLock::new(Tables {
                next_player_id: 1,
                next_match_id: 1,
                next_entry_id: 1,
                ..Tables::default()
            })
        }
    }

    /// Rebuilds a store from snapshot contents. Ratings and ledger entries
    /// are restored verbatim; id counters resume past the highest seen ids.
    pub(crate) fn from_parts(
        players: Vec<Player>,
        matches: Vec<MatchRecord>,
        ledger: Vec<RatingLedgerEntry>
    ) -> MemoryStore {
        let next_player_id = players.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let next_match_id = matches.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        let next_entry_id = ledger.iter().map(|e| e.id).max().unwrap_or(0) + 1;

        MemoryStore {
            inner: RwLock::new(Tables {
                players: players.into_iter().map(|p| (p.id, p)).collect(),
                matches: matches.into_iter().map(|m| (m.id, m)).collect(),
                ledger,
                next_player_id,
                next_match_id,
                next_entry_id
            })
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    pub fn add_player(&self, new_player: NewPlayer) -> Result<Player, RosterError> {
        let mut tables = self.write()?;

        if tables.players.values().any(|p| p.name == new_player.name) {
            return Err(RosterError::NameTaken(new_player.name));
        }

        let now = Utc::now().fixed_offset();
        let id = tables.next_player_id;
        tables.next_player_id += 1;

        let player = Player {
            id,
            name: new_player.name,
            nickname: new_player.nickname,
            skill_level: new_player.skill_level,
            joined_at: new_player.joined_at,
            rating: DEFAULT_RATING,
            is_active: true,
            created_at: now,
            updated_at: now
        };

        tables.players.insert(id, player.clone());
        debug!(player_id = id, name = %player.name, "added player");

        Ok(player)
    }

    pub fn update_profile(
        &self,
        id: PlayerId,
        name: String,
        nickname: Option<String>,
        skill_level: SkillLevel
    ) -> Result<Player, RosterError> {
        let mut tables = self.write()?;

        if tables.players.values().any(|p| p.name == name && p.id != id) {
            return Err(RosterError::NameTaken(name));
        }

        let player = tables.players.get_mut(&id).ok_or(RosterError::UnknownPlayer(id))?;
        player.name = name;
        player.nickname = nickname;
        player.skill_level = skill_level;
        player.updated_at = Utc::now().fixed_offset();

        Ok(player.clone())
    }

    pub fn set_player_active(&self, id: PlayerId, is_active: bool) -> Result<(), RosterError> {
        let mut tables = self.write()?;

        let player = tables.players.get_mut(&id).ok_or(RosterError::UnknownPlayer(id))?;
        player.is_active = is_active;
        player.updated_at = Utc::now().fixed_offset();

        Ok(())
    }

    /// Hard-deletes a player. Restricted while any match references them;
    /// an unreferenced player has no ledger entries left to cascade.
    pub fn remove_player(&self, id: PlayerId) -> Result<(), RosterError> {
        let mut tables = self.write()?;

        if !tables.players.contains_key(&id) {
            return Err(RosterError::UnknownPlayer(id));
        }

        let referencing = tables.matches.values().filter(|m| m.involves(id)).count();
        if referencing > 0 {
            return Err(RosterError::ReferencedByMatches(id, referencing));
        }

        tables.players.shift_remove(&id);
        tables.ledger.retain(|e| e.player_id != id);

        Ok(())
    }

    pub fn player_count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.players.len())
    }

    pub fn match_count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.matches.len())
    }
}

impl PlayerStore for MemoryStore {
    fn get_player(&self, id: PlayerId) -> Result<Option<Player>, StoreError> {
        Ok(self.read()?.players.get(&id).cloned())
    }

    fn prior_match_count(&self, id: PlayerId) -> Result<u32, StoreError> {
        Ok(self.read()?.ledger.iter().filter(|e| e.player_id == id).count() as u32)
    }

    fn all_players(&self) -> Result<Vec<Player>, StoreError> {
        Ok(self.read()?.players.values().cloned().collect())
    }
}

impl MatchStore for MemoryStore {
    fn get_match(&self, id: MatchId) -> Result<Option<MatchRecord>, StoreError> {
        Ok(self.read()?.matches.get(&id).cloned())
    }

    fn all_matches(&self) -> Result<Vec<MatchRecord>, StoreError> {
        let tables = self.read()?;
        let mut matches: Vec<MatchRecord> = tables.matches.values().cloned().collect();
        matches.sort_by(|a, b| b.played_at.cmp(&a.played_at));

        Ok(matches)
    }

    fn matches_for_player(&self, id: PlayerId) -> Result<Vec<MatchRecord>, StoreError> {
        let tables = self.read()?;
        let mut matches: Vec<MatchRecord> = tables.matches.values().filter(|m| m.involves(id)).cloned().collect();
        matches.sort_by(|a, b| b.played_at.cmp(&a.played_at));

        Ok(matches)
    }

    fn find_candidate_duplicates(
        &self,
        played_at: DateTime<FixedOffset>,
        window: Duration
    ) -> Result<Vec<MatchRecord>, StoreError> {
        let tables = self.read()?;
        let candidates = tables
            .matches
            .values()
            .filter(|m| (m.played_at - played_at).abs() < window)
            .cloned()
            .collect();

        Ok(candidates)
    }
}

impl LedgerStore for MemoryStore {
    fn player_history(&self, id: PlayerId, query: &HistoryQuery) -> Result<Vec<RatingLedgerEntry>, StoreError> {
        let tables = self.read()?;
        let mut entries: Vec<RatingLedgerEntry> = tables
            .ledger
            .iter()
            .filter(|e| e.player_id == id)
            .filter(|e| query.since.is_none_or(|since| e.timestamp >= since))
            .filter(|e| query.until.is_none_or(|until| e.timestamp <= until))
            .cloned()
            .collect();

        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));

        // A limit keeps the most recent entries, still in chronological order.
        if let Some(limit) = query.limit {
            let skip = entries.len().saturating_sub(limit);
            entries.drain(..skip);
        }

        Ok(entries)
    }

    fn match_entries(&self, id: MatchId) -> Result<Vec<RatingLedgerEntry>, StoreError> {
        Ok(self
            .read()?
            .ledger
            .iter()
            .filter(|e| e.match_id == id)
            .cloned()
            .collect())
    }
}

impl EngineStore for MemoryStore {
    fn commit_recorded(
        &self,
        new_match: &NewMatch,
        mutations: &[RatingMutation]
    ) -> Result<RecordedMatch, CommitError> {
        let mut tables = self.write()?;
        let tables = &mut *tables;

        // Validate every write before applying any.
        for mutation in mutations {
            let player = tables
                .players
                .get(&mutation.player_id)
                .ok_or(CommitError::PlayerMissing(mutation.player_id))?;

            if player.rating.to_bits() != mutation.expected_before.to_bits() {
                return Err(CommitError::Conflict(mutation.player_id));
            }
        }

        let now = Utc::now().fixed_offset();
        let match_id = tables.next_match_id;
        tables.next_match_id += 1;

        let record = MatchRecord {
            id: match_id,
            played_at: new_match.played_at,
            team_one: new_match.team_one,
            team_two: new_match.team_two,
            winner: new_match.winner,
            notes: new_match.notes.clone(),
            created_at: now
        };
        tables.matches.insert(match_id, record.clone());

        let mut entries = Vec::with_capacity(mutations.len());
        for mutation in mutations {
            let player = tables
                .players
                .get_mut(&mutation.player_id)
                .expect("player presence was validated above");
            player.rating = mutation.rating_after;
            player.updated_at = now;

            let entry = RatingLedgerEntry {
                id: tables.next_entry_id,
                player_id: mutation.player_id,
                match_id,
                rating_before: mutation.expected_before,
                rating_after: mutation.rating_after,
                rating_delta: mutation.delta,
                timestamp: new_match.played_at
            };
            tables.next_entry_id += 1;

            tables.ledger.push(entry.clone());
            entries.push(entry);
        }

        debug!(match_id, "committed match and {} ledger entries", entries.len());

        Ok(RecordedMatch { record, entries })
    }

    fn revert_recorded(&self, match_id: MatchId, mutations: &[RatingMutation]) -> Result<(), CommitError> {
        let mut tables = self.write()?;
        let tables = &mut *tables;

        if !tables.matches.contains_key(&match_id) {
            return Err(CommitError::MatchMissing(match_id));
        }

        for mutation in mutations {
            let player = tables
                .players
                .get(&mutation.player_id)
                .ok_or(CommitError::PlayerMissing(mutation.player_id))?;

            if player.rating.to_bits() != mutation.expected_before.to_bits() {
                return Err(CommitError::Conflict(mutation.player_id));
            }
        }

        let now = Utc::now().fixed_offset();
        tables.matches.shift_remove(&match_id);
        tables.ledger.retain(|e| e.match_id != match_id);

        for mutation in mutations {
            let player = tables
                .players
                .get_mut(&mutation.player_id)
                .expect("player presence was validated above");
            player.rating = mutation.rating_after;
            player.updated_at = now;
        }

        debug!(match_id, "reverted match and cascaded its ledger entries");

        Ok(())
    }
}
