//! All-Time Leaderboard
//!
//! One entry per owner key, ranked by cumulative coins and capped at
//! `LEDGER_CAPACITY`. Finished games are folded in with [`ScoreLedger::record_game`].

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::core::constants::LEDGER_CAPACITY;
use crate::game::state::Vehicle;

/// Ledger lookup failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    /// No entry for this owner key.
    #[error("Player not found: {0}")]
    PlayerNotFound(String),
}

/// One owner's standing across all games.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighScoreEntry {
    /// Display name from the owner's first recorded game
    pub player_name: String,
    /// Owner key
    pub owner: String,
    /// Label of the last vehicle that earned coins
    pub vehicle: String,
    /// Cumulative coins
    pub score: u64,
    /// Games won
    pub wins: u32,
    /// Games finished
    pub games_played: u32,
    /// When the last game was recorded
    pub last_game: DateTime<Utc>,
    /// External transaction reference, set once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_chain_tx: Option<String>,
    /// Game id of the last recorded game
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_game_id: Option<String>,
}

impl HighScoreEntry {
    fn from_vehicle(game_id: &str, vehicle: &Vehicle, won: bool, now: DateTime<Utc>) -> Self {
        Self {
            player_name: vehicle.player_name.clone(),
            owner: vehicle.owner.clone(),
            vehicle: vehicle.vehicle_type.label().to_string(),
            score: u64::from(vehicle.coins),
            wins: u32::from(won),
            games_played: 1,
            last_game: now,
            on_chain_tx: None,
            last_game_id: Some(game_id.to_string()),
        }
    }

    fn merge(&mut self, game_id: &str, vehicle: &Vehicle, won: bool, now: DateTime<Utc>) {
        self.score += u64::from(vehicle.coins);
        self.games_played += 1;
        if won {
            self.wins += 1;
        }
        self.last_game = now;
        self.last_game_id = Some(game_id.to_string());
        if vehicle.coins > 0 {
            self.vehicle = vehicle.vehicle_type.label().to_string();
        }
    }
}

/// Ranked leaderboard, highest score first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreLedger {
    entries: Vec<HighScoreEntry>,
}

impl ScoreLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries in rank order.
    pub fn entries(&self) -> &[HighScoreEntry] {
        &self.entries
    }

    /// Number of ranked owners.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No games recorded yet?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fold one finished game into the ledger.
    ///
    /// Every participating vehicle counts, destroyed or not. Equal scores
    /// keep their previous relative order. Returns `false` without touching
    /// anything if `game_id` was already recorded, so a retried merge
    /// cannot count a game twice.
    pub fn record_game(
        &mut self,
        game_id: &str,
        winner_id: &str,
        vehicles: &[Vehicle],
        now: DateTime<Utc>,
    ) -> bool {
        if self.has_recorded(game_id, vehicles) {
            return false;
        }

        for vehicle in vehicles {
            let won = vehicle.id == winner_id;
            match self.entries.iter_mut().find(|e| e.owner == vehicle.owner) {
                Some(entry) => entry.merge(game_id, vehicle, won, now),
                None => self.entries.push(HighScoreEntry::from_vehicle(game_id, vehicle, won, now)),
            }
        }

        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
        self.entries.truncate(LEDGER_CAPACITY);
        true
    }

    /// Did any participant's entry already take this game?
    fn has_recorded(&self, game_id: &str, vehicles: &[Vehicle]) -> bool {
        vehicles.iter().any(|vehicle| {
            self.entries
                .iter()
                .any(|e| e.owner == vehicle.owner && e.last_game_id.as_deref() == Some(game_id))
        })
    }

    /// Entry for an owner key.
    pub fn entry(&self, owner: &str) -> Result<&HighScoreEntry, LedgerError> {
        self.entries
            .iter()
            .find(|e| e.owner == owner)
            .ok_or_else(|| LedgerError::PlayerNotFound(owner.to_string()))
    }

    /// Up to `limit` entries from the top.
    pub fn top(&self, limit: usize) -> &[HighScoreEntry] {
        &self.entries[..limit.min(self.entries.len())]
    }

    /// 1-based rank of an owner key.
    pub fn rank(&self, owner: &str) -> Result<usize, LedgerError> {
        self.entries
            .iter()
            .position(|e| e.owner == owner)
            .map(|i| i + 1)
            .ok_or_else(|| LedgerError::PlayerNotFound(owner.to_string()))
    }

    /// Attach a transaction reference to an entry that has none.
    ///
    /// Returns `false` and leaves the entry untouched if one is already set.
    pub fn record_on_chain_tx(&mut self, owner: &str, tx: &str) -> Result<bool, LedgerError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.owner == owner)
            .ok_or_else(|| LedgerError::PlayerNotFound(owner.to_string()))?;

        if entry.on_chain_tx.is_some() {
            return Ok(false);
        }
        entry.on_chain_tx = Some(tx.to_string());
        Ok(true)
    }

    /// Serialize to JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}
