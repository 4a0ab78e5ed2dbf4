//! Game Service
//!
//! Runs every request through load → apply → persist against the injected
//! store. The engine never sees the store; the store never sees a decoded
//! document.
//!
//! ```text
//!  request ─► load (replace stale/finished) ─► engine ─► compare_and_put
//!                 ▲                                          │
//!                 └────────────── conflict: retry ◄──────────┘
//!                                                            │ ok + finished
//!                                                            ▼
//!                                                   ledger compare_and_put
//!                                                            │
//!                                                            ▼
//!                                                   mark document recorded
//! ```
//!
//! A finished document that has not been marked is never replaced: the
//! next load records it first. The ledger skips game ids it already holds,
//! so recording is safe to repeat.

use std::sync::Arc;
use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Deserialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, instrument, warn};

use crate::core::constants::STALE_AFTER_SECS;
use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::engine::{self, ActionError};
use crate::game::events::GameEvent;
use crate::game::input::Direction;
use crate::game::ledger::{HighScoreEntry, LedgerError, ScoreLedger};
use crate::game::state::{GameDocument, GameStatus, Vehicle, VehicleType};
use crate::store::{DocumentStore, StoreError, GAME_KEY, LEADERBOARD_KEY};

/// Default number of attempts before a contended write gives up.
pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 5;

// =============================================================================
// CONFIG & ERRORS
// =============================================================================

/// Service tuning.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Idle time after which the current game is replaced
    pub stale_after: Duration,
    /// Attempts per write before `WriteConflict`
    pub max_write_attempts: u32,
    /// Token required by `reset`; `None` leaves reset open
    pub admin_token: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::seconds(STALE_AFTER_SECS),
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
            admin_token: None,
        }
    }
}

/// Service errors.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Action rejected by the engine.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// Leaderboard lookup failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Backend failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Stored bytes could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Every attempt lost the compare-and-put race.
    #[error("Write conflict after {attempts} attempts")]
    WriteConflict {
        /// Attempts made
        attempts: u32,
    },

    /// Reset with a missing or wrong admin token.
    #[error("Unauthorized")]
    Unauthorized,
}

// =============================================================================
// CLOCK
// =============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Reply to a join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    /// The new vehicle
    pub vehicle: Vehicle,
    /// Generated display name
    pub player_name: String,
    /// Game joined
    pub game_id: String,
    /// Vehicles now in the game
    pub players_in_game: usize,
}

/// Reply to a move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveResponse {
    /// Position after the move
    pub position: Vec2,
    /// Health after the move
    pub health: f64,
    /// Coins after the move
    pub coins: u32,
    /// Game status after the move
    pub status: GameStatus,
    /// Set once the game is finished
    pub winner: Option<String>,
}

/// Reply to a boost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostResponse {
    /// Position after the boost
    pub position: Vec2,
    /// Booster health
    pub health: f64,
    /// Booster coins
    pub coins: u32,
}

/// One owner's ledger standing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    /// Ledger entry
    pub entry: HighScoreEntry,
    /// 1-based
    pub rank: usize,
}

/// Reply to an etch request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EtchResponse {
    /// Entry after the request
    pub entry: HighScoreEntry,
    /// False if the entry already carried a reference
    pub stored: bool,
}

/// What a load found.
struct Loaded {
    /// Exact stored bytes, the compare-and-put expectation
    current: Option<Vec<u8>>,
    /// Document to act on
    doc: GameDocument,
    /// `doc` is a fresh game, not what was stored
    replaced: bool,
}

// =============================================================================
// SERVICE
// =============================================================================

/// Orchestrates engine actions over a shared store.
pub struct GameService {
    store: Arc<dyn DocumentStore>,
    config: ServiceConfig,
    clock: Arc<dyn Clock>,
    rng: Mutex<DeterministicRng>,
    events: broadcast::Sender<GameEvent>,
}

impl GameService {
    /// Service on the wall clock with an entropy-seeded RNG.
    pub fn new(store: Arc<dyn DocumentStore>, config: ServiceConfig) -> Self {
        Self::with_parts(store, config, Arc::new(SystemClock), DeterministicRng::from_entropy())
    }

    /// Service with an explicit clock and RNG.
    pub fn with_parts(
        store: Arc<dyn DocumentStore>,
        config: ServiceConfig,
        clock: Arc<dyn Clock>,
        rng: DeterministicRng,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            store,
            config,
            clock,
            rng: Mutex::new(rng),
            events,
        }
    }

    /// Receive every event produced by accepted actions.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    /// Join the current game.
    #[instrument(skip(self, proof_seed))]
    pub async fn join(&self, vehicle_type: &str, proof_seed: &str) -> Result<JoinResponse, ServiceError> {
        let vehicle_type: VehicleType = vehicle_type.parse()?;

        let (out, _) = self
            .apply("join", |doc, now, rng| engine::join(doc, vehicle_type, proof_seed, now, rng))
            .await?;

        info!(
            game = %out.game_id,
            vehicle = %out.vehicle.id,
            player = %out.player_name,
            players = out.players_in_game,
            "Vehicle joined"
        );
        self.publish(&out.events);

        Ok(JoinResponse {
            vehicle: out.vehicle,
            player_name: out.player_name,
            game_id: out.game_id,
            players_in_game: out.players_in_game,
        })
    }

    /// Move a vehicle one step.
    #[instrument(skip(self))]
    pub async fn move_vehicle(&self, vehicle_id: &str, direction: &str) -> Result<MoveResponse, ServiceError> {
        let direction: Direction = direction.parse()?;

        let (out, doc) = self
            .apply("move", |doc, now, _| engine::move_vehicle(doc, vehicle_id, direction, now))
            .await?;
        self.publish(&out.events);

        // The finishing write is durable. If recording fails here the
        // document stays unmarked and the next load retries it.
        if let Some(result) = &out.result {
            info!(
                game = %doc.id,
                winner = %result.winner,
                reason = ?result.reason,
                round = doc.round,
                "Game finished"
            );
            if let Err(e) = self.settle(&doc).await {
                warn!(game = %doc.id, "Leaderboard update deferred: {}", e);
            }
        }

        Ok(MoveResponse {
            position: out.position,
            health: out.health,
            coins: out.coins,
            status: out.status,
            winner: out.winner,
        })
    }

    /// Boost a vehicle.
    #[instrument(skip(self))]
    pub async fn boost(&self, vehicle_id: &str, direction: &str) -> Result<BoostResponse, ServiceError> {
        let direction: Direction = direction.parse()?;

        let (out, _) = self
            .apply("boost", |doc, now, _| engine::boost(doc, vehicle_id, direction, now))
            .await?;
        self.publish(&out.events);

        Ok(BoostResponse {
            position: out.position,
            health: out.health,
            coins: out.coins,
        })
    }

    /// Current game, replacing it first if stale, finished or missing.
    #[instrument(skip(self))]
    pub async fn state(&self) -> Result<GameDocument, ServiceError> {
        for attempt in 1..=self.config.max_write_attempts {
            let loaded = self.load_game(self.clock.now()).await?;
            if !loaded.replaced {
                return Ok(loaded.doc);
            }
            let mut doc = loaded.doc;
            if self.persist(&mut doc, loaded.current.as_deref()).await? {
                return Ok(doc);
            }
            warn!(attempt, "Game document changed during replacement, retrying");
        }
        Err(ServiceError::WriteConflict { attempts: self.config.max_write_attempts })
    }

    /// Discard the current game unconditionally.
    ///
    /// When an admin token is configured, `token` must match it.
    #[instrument(skip(self, token))]
    pub async fn reset(&self, token: Option<&str>) -> Result<GameDocument, ServiceError> {
        if let Some(expected) = &self.config.admin_token {
            if token != Some(expected.as_str()) {
                return Err(ServiceError::Unauthorized);
            }
        }

        let now = self.clock.now();
        let previous = match self.store.get(GAME_KEY).await? {
            Some(bytes) => GameDocument::from_bytes(&bytes).ok(),
            None => None,
        };
        let previous_version = previous.as_ref().map(|d| d.version).unwrap_or(0);

        // Reset does not wait on the leaderboard
        if let Some(old) = previous.as_ref().filter(|d| d.awaiting_ledger()) {
            if let Err(e) = self.record_result(old).await {
                error!(game = %old.id, "Dropping unrecorded result on reset: {}", e);
            }
        }

        let mut doc = self.fresh_game(now).await;
        doc.version = previous_version + 1;
        self.store.put(GAME_KEY, doc.to_bytes()?).await?;

        info!(game = %doc.id, "Game reset");
        Ok(doc)
    }

    /// Top of the all-time leaderboard.
    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<HighScoreEntry>, ServiceError> {
        let (ledger, _) = self.load_ledger().await?;
        Ok(ledger.top(limit).to_vec())
    }

    /// Ledger entry and rank for an owner key.
    pub async fn player(&self, owner: &str) -> Result<PlayerResponse, ServiceError> {
        let (ledger, _) = self.load_ledger().await?;
        Ok(PlayerResponse {
            entry: ledger.entry(owner)?.clone(),
            rank: ledger.rank(owner)?,
        })
    }

    /// Attach a transaction reference to an owner's entry, once.
    #[instrument(skip(self))]
    pub async fn etch(&self, owner: &str, tx: &str) -> Result<EtchResponse, ServiceError> {
        let (stored, ledger) = self
            .update_ledger(|ledger| ledger.record_on_chain_tx(owner, tx))
            .await?;
        if stored {
            info!(owner, tx, "Recorded transaction reference");
        }
        Ok(EtchResponse {
            entry: ledger.entry(owner)?.clone(),
            stored,
        })
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Load, act, persist. A conflicting write reruns the whole action on
    /// the newer document. Rejections return before anything is written.
    async fn apply<T, F>(&self, op: &'static str, mut action: F) -> Result<(T, GameDocument), ServiceError>
    where
        F: FnMut(&mut GameDocument, DateTime<Utc>, &mut DeterministicRng) -> Result<T, ActionError>,
    {
        for attempt in 1..=self.config.max_write_attempts {
            let now = self.clock.now();
            let loaded = self.load_game(now).await?;
            let mut doc = loaded.doc;

            let out = {
                let mut rng = self.rng.lock().await;
                action(&mut doc, now, &mut *rng)?
            };

            if self.persist(&mut doc, loaded.current.as_deref()).await? {
                return Ok((out, doc));
            }
            warn!(op, attempt, "Game document changed underneath, retrying");
        }
        Err(ServiceError::WriteConflict { attempts: self.config.max_write_attempts })
    }

    /// Read the current game, substituting a fresh one where needed.
    async fn load_game(&self, now: DateTime<Utc>) -> Result<Loaded, ServiceError> {
        let current = self.store.get(GAME_KEY).await?;

        let stored = match &current {
            Some(bytes) => match GameDocument::from_bytes(bytes) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    warn!("Discarding undecodable game document: {}", e);
                    None
                }
            },
            None => None,
        };

        match stored {
            Some(doc) if !doc.needs_replacement(now, self.config.stale_after) => Ok(Loaded {
                current,
                doc,
                replaced: false,
            }),
            stored => {
                if let Some(old) = stored.as_ref().filter(|d| d.awaiting_ledger()) {
                    if let Err(e) = self.record_result(old).await {
                        error!(game = %old.id, "Finished game not yet recorded: {}", e);
                        return Err(e);
                    }
                }

                let mut doc = self.fresh_game(now).await;
                if let Some(old) = &stored {
                    debug!(old = %old.id, status = %old.status, new = %doc.id, "Replacing game");
                    doc.version = old.version;
                }
                Ok(Loaded { current, doc, replaced: true })
            }
        }
    }

    /// Record a just-finished game and mark the stored document.
    async fn settle(&self, doc: &GameDocument) -> Result<(), ServiceError> {
        self.record_result(doc).await?;

        let expected = doc.to_bytes()?;
        let mut marked = doc.clone();
        marked.ledger_recorded = true;
        if !self.persist(&mut marked, Some(expected.as_slice())).await? {
            // Replaced or marked by someone else; either way it was recorded
            debug!(game = %doc.id, "Finished game changed before marking");
        }
        Ok(())
    }

    /// Fold a finished game into the leaderboard. Repeats are no-ops.
    async fn record_result(&self, doc: &GameDocument) -> Result<(), ServiceError> {
        let Some(winner_id) = doc.winner_id.as_deref() else {
            return Ok(());
        };

        let now = self.clock.now();
        let (merged, _) = self
            .update_ledger(|ledger| Ok(ledger.record_game(&doc.id, winner_id, &doc.vehicles, now)))
            .await?;

        if merged {
            info!(game = %doc.id, players = doc.vehicles.len(), "Recorded finished game");
        } else {
            debug!(game = %doc.id, "Finished game already recorded");
        }
        Ok(())
    }

    async fn fresh_game(&self, now: DateTime<Utc>) -> GameDocument {
        let mut rng = self.rng.lock().await;
        GameDocument::new(now, &mut rng)
    }

    /// Bump the version and write if nobody else has since `expected` was read.
    async fn persist(&self, doc: &mut GameDocument, expected: Option<&[u8]>) -> Result<bool, ServiceError> {
        doc.version += 1;
        let bytes = doc.to_bytes()?;

        #[cfg(feature = "debug-tracing")]
        tracing::trace!(
            game = %doc.id,
            version = doc.version,
            round = doc.round,
            bytes = bytes.len(),
            "Persisting game document"
        );

        Ok(self.store.compare_and_put(GAME_KEY, expected, bytes).await?)
    }

    async fn load_ledger(&self) -> Result<(ScoreLedger, Option<Vec<u8>>), ServiceError> {
        let current = self.store.get(LEADERBOARD_KEY).await?;
        let ledger = match &current {
            Some(bytes) => ScoreLedger::from_bytes(bytes)?,
            None => ScoreLedger::new(),
        };
        Ok((ledger, current))
    }

    /// Read-modify-write on the ledger. Unchanged ledgers are not written.
    async fn update_ledger<T, F>(&self, mut update: F) -> Result<(T, ScoreLedger), ServiceError>
    where
        F: FnMut(&mut ScoreLedger) -> Result<T, LedgerError>,
    {
        for attempt in 1..=self.config.max_write_attempts {
            let (mut ledger, current) = self.load_ledger().await?;
            let out = update(&mut ledger)?;

            let bytes = ledger.to_bytes()?;
            if current.as_deref() == Some(bytes.as_slice()) {
                return Ok((out, ledger));
            }
            if self.store.compare_and_put(LEADERBOARD_KEY, current.as_deref(), bytes).await? {
                return Ok((out, ledger));
            }
            warn!(attempt, "Leaderboard changed underneath, retrying");
        }
        Err(ServiceError::WriteConflict { attempts: self.config.max_write_attempts })
    }

    fn publish(&self, events: &[GameEvent]) {
        for event in events {
            debug!(round = event.round, event = ?event.data, "Game event");
            // No subscribers is fine
            let _ = self.events.send(event.clone());
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
