use std::collections::{HashMap, HashSet};

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{
    model::{
        constants::EXPORT_VERSION,
        db_structs::{MatchId, MatchRecord, Player, PlayerId, RatingLedgerEntry}
    },
    store::{memory::MemoryStore, LedgerStore, MatchStore, PlayerStore, StoreError}
};

/// A full, versioned copy of the club's data. Ratings and ledger entries are
/// carried verbatim; importing never recomputes a delta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: String,
    pub exported_at: DateTime<FixedOffset>,
    pub players: Vec<Player>,
    pub matches: Vec<MatchRecord>,
    pub ledger: Vec<RatingLedgerEntry>
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error)
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unsupported snapshot version {0:?}")]
    UnsupportedVersion(String),

    #[error("failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("match {match_id} references unknown player {player_id}")]
    UnknownMatchPlayer { match_id: MatchId, player_id: PlayerId },

    #[error("ledger entry {entry_id} references unknown match {match_id}")]
    DanglingEntryMatch { entry_id: i64, match_id: MatchId },

    #[error("ledger entry {entry_id} references unknown player {player_id}")]
    DanglingEntryPlayer { entry_id: i64, player_id: PlayerId },

    #[error("match {match_id} has {count} ledger entries, expected 4")]
    WrongEntryCount { match_id: MatchId, count: usize }
}

/// Builds a snapshot through the read accessors only.
pub fn export_snapshot<S: PlayerStore + MatchStore + LedgerStore>(store: &S) -> Result<Snapshot, ExportError> {
    let players = store.all_players()?;
    let matches = store.all_matches()?;

    let mut ledger = Vec::with_capacity(matches.len() * 4);
    for m in &matches {
        ledger.extend(store.match_entries(m.id)?);
    }
    ledger.sort_by_key(|e| e.id);

    Ok(Snapshot {
        version: EXPORT_VERSION.to_string(),
        exported_at: Utc::now().fixed_offset(),
        players,
        matches,
        ledger
    })
}

pub fn to_json(snapshot: &Snapshot) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

pub fn from_json(json: &str) -> Result<MemoryStore, ImportError> {
    restore(serde_json::from_str(json)?)
}

/// Validates the snapshot and rebuilds a store from it. Referential
/// integrity is checked up front so a torn backup is rejected whole instead
/// of half-loaded.
pub fn restore(snapshot: Snapshot) -> Result<MemoryStore, ImportError> {
    if snapshot.version != EXPORT_VERSION {
        return Err(ImportError::UnsupportedVersion(snapshot.version));
    }

    let player_ids: HashSet<PlayerId> = snapshot.players.iter().map(|p| p.id).collect();
    let match_ids: HashSet<MatchId> = snapshot.matches.iter().map(|m| m.id).collect();

    for m in &snapshot.matches {
        for player_id in m.player_ids() {
            if !player_ids.contains(&player_id) {
                return Err(ImportError::UnknownMatchPlayer {
                    match_id: m.id,
                    player_id
                });
            }
        }
    }

    let mut entries_per_match: HashMap<MatchId, usize> = HashMap::new();
    for entry in &snapshot.ledger {
        if !match_ids.contains(&entry.match_id) {
            return Err(ImportError::DanglingEntryMatch {
                entry_id: entry.id,
                match_id: entry.match_id
            });
        }
        if !player_ids.contains(&entry.player_id) {
            return Err(ImportError::DanglingEntryPlayer {
                entry_id: entry.id,
                player_id: entry.player_id
            });
        }
        *entries_per_match.entry(entry.match_id).or_default() += 1;
    }

    for m in &snapshot.matches {
        let count = entries_per_match.get(&m.id).copied().unwrap_or(0);
        if count != 4 {
            return Err(ImportError::WrongEntryCount { match_id: m.id, count });
        }
    }

    info!(
        players = snapshot.players.len(),
        matches = snapshot.matches.len(),
        "restored snapshot"
    );

    Ok(MemoryStore::from_parts(snapshot.players, snapshot.matches, snapshot.ledger))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{base_time, generate_submission, seeded_recorder};
    use chrono::Duration;

    fn populated_snapshot() -> Snapshot {
        let (recorder, players) = seeded_recorder(4);
        let ids = [players[0].id, players[1].id, players[2].id, players[3].id];

        recorder.record(generate_submission(ids, 21, 15, base_time())).unwrap();
        recorder
            .record(generate_submission(ids, 17, 21, base_time() + Duration::hours(1)))
            .unwrap();

        export_snapshot(recorder.store()).unwrap()
    }

    #[test]
    fn test_snapshot_shape() {
        let snapshot = populated_snapshot();

        assert_eq!(snapshot.version, EXPORT_VERSION);
        assert_eq!(snapshot.players.len(), 4);
        assert_eq!(snapshot.matches.len(), 2);
        assert_eq!(snapshot.ledger.len(), 8);
    }

    #[test]
    fn test_json_round_trip_preserves_everything() {
        let snapshot = populated_snapshot();

        let json = to_json(&snapshot).unwrap();
        let restored = from_json(&json).unwrap();
        let round_tripped = export_snapshot(&restored).unwrap();

        assert_eq!(round_tripped.players, snapshot.players);
        assert_eq!(round_tripped.matches, snapshot.matches);
        assert_eq!(round_tripped.ledger, snapshot.ledger);
    }

    #[test]
    fn test_restored_store_keeps_ratings_verbatim() {
        let snapshot = populated_snapshot();
        let expected: Vec<(PlayerId, u64)> = snapshot.players.iter().map(|p| (p.id, p.rating.to_bits())).collect();

        let restored = restore(snapshot).unwrap();

        for (id, bits) in expected {
            assert_eq!(restored.get_player(id).unwrap().unwrap().rating.to_bits(), bits);
        }
    }

    #[test]
    fn test_restore_rejects_unsupported_version() {
        let mut snapshot = populated_snapshot();
        snapshot.version = "2.0".to_string();

        let result = restore(snapshot);

        assert!(matches!(result, Err(ImportError::UnsupportedVersion(v)) if v == "2.0"));
    }

    #[test]
    fn test_restore_rejects_match_with_unknown_player() {
        let mut snapshot = populated_snapshot();
        snapshot.players.retain(|p| p.id != 4);

        let result = restore(snapshot);

        assert!(matches!(
            result,
            Err(ImportError::UnknownMatchPlayer { player_id: 4, .. })
        ));
    }

    #[test]
    fn test_restore_rejects_dangling_ledger_entry() {
        let mut snapshot = populated_snapshot();
        snapshot.ledger[0].match_id = 99;

        let result = restore(snapshot);

        assert!(matches!(
            result,
            Err(ImportError::DanglingEntryMatch { match_id: 99, .. })
        ));
    }

    #[test]
    fn test_restore_rejects_incomplete_match_ledger() {
        let mut snapshot = populated_snapshot();
        let victim = snapshot.matches[0].id;
        let entry_id = snapshot
            .ledger
            .iter()
            .find(|e| e.match_id == victim)
            .map(|e| e.id)
            .unwrap();
        snapshot.ledger.retain(|e| e.id != entry_id);

        let result = restore(snapshot);

        assert!(matches!(
            result,
            Err(ImportError::WrongEntryCount { count: 3, .. })
        ));
    }
}
