//! Game State Definitions
//!
//! The game document and everything it holds. The document is a plain
//! value: the engine mutates it in place, the service serializes it to the
//! store as camelCase JSON.

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Deserialize};

use crate::core::constants::{
    ARENA_WIDTH, ARENA_HEIGHT, COIN_MARGIN, INITIAL_COINS, OBSTACLE_LAYOUT,
    COIN_VALUE_LOW, COIN_VALUE_HIGH, COIN_HIGH_CHANCE, OWNER_KEY_LEN,
};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::{Vec2, Rect};
use crate::game::engine::ActionError;

// =============================================================================
// VEHICLE TYPE (Archetype)
// =============================================================================

/// Fixed stats baked into a vehicle at join time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArchetypeStats {
    /// Movement multiplier
    pub speed: f64,
    /// Starting health
    pub max_health: f64,
    /// Ram damage dealt
    pub power: f64,
}

/// Vehicle archetype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    /// Fast and light
    Commando,
    /// Balanced
    Cj2a,
    /// Slow and heavy
    F100,
}

impl VehicleType {
    /// All archetypes.
    pub const ALL: [VehicleType; 3] = [VehicleType::Commando, VehicleType::Cj2a, VehicleType::F100];

    /// Archetype stats.
    pub fn stats(self) -> ArchetypeStats {
        match self {
            VehicleType::Commando => ArchetypeStats { speed: 5.0, max_health: 100.0, power: 15.0 },
            VehicleType::Cj2a => ArchetypeStats { speed: 4.0, max_health: 120.0, power: 12.0 },
            VehicleType::F100 => ArchetypeStats { speed: 3.0, max_health: 150.0, power: 20.0 },
        }
    }

    /// Display label, used in winner strings and the leaderboard.
    pub fn label(self) -> &'static str {
        match self {
            VehicleType::Commando => "Commando",
            VehicleType::Cj2a => "CJ-2A",
            VehicleType::F100 => "F-100",
        }
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            VehicleType::Commando => "commando",
            VehicleType::Cj2a => "cj2a",
            VehicleType::F100 => "f100",
        }
    }
}

impl FromStr for VehicleType {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "commando" => Ok(VehicleType::Commando),
            "cj2a" => Ok(VehicleType::Cj2a),
            "f100" => Ok(VehicleType::F100),
            other => Err(ActionError::InvalidVehicleType(other.to_string())),
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// VEHICLE
// =============================================================================

/// One player's vehicle in one game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    /// Unique vehicle ID (UUID string)
    pub id: String,

    /// Archetype
    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,

    /// Current position
    pub position: Vec2,

    /// Facing angle in radians
    pub angle: f64,

    /// Current health; destroyed at or below zero
    pub health: f64,

    /// Starting health
    pub max_health: f64,

    /// Movement multiplier
    pub speed: f64,

    /// Ram damage dealt
    pub power: f64,

    /// Coins collected this game
    pub coins: u32,

    /// Owner key (proof seed prefix)
    pub owner: String,

    /// Display name derived from the full proof seed
    pub player_name: String,

    /// Last accepted move or boost
    pub last_move: DateTime<Utc>,
}

impl Vehicle {
    /// Create a vehicle with full archetype stats.
    pub fn new(
        id: String,
        vehicle_type: VehicleType,
        position: Vec2,
        angle: f64,
        owner: String,
        player_name: String,
        now: DateTime<Utc>,
    ) -> Self {
        let stats = vehicle_type.stats();
        Self {
            id,
            vehicle_type,
            position,
            angle,
            health: stats.max_health,
            max_health: stats.max_health,
            speed: stats.speed,
            power: stats.power,
            coins: 0,
            owner,
            player_name,
            last_move: now,
        }
    }

    /// Still in the fight?
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    /// Name shown as the game winner.
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.player_name, self.vehicle_type.label())
    }
}

/// Owner key for a proof seed: its first `OWNER_KEY_LEN` characters.
pub fn owner_key(proof_seed: &str) -> String {
    proof_seed.chars().take(OWNER_KEY_LEN).collect()
}

// =============================================================================
// COINS & OBSTACLES
// =============================================================================

/// A collectible coin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    /// Position in arena
    pub position: Vec2,
    /// Value (5 or 10)
    pub value: u32,
}

impl Coin {
    /// Roll a coin at a random position inside the coin margin.
    pub fn random(rng: &mut DeterministicRng) -> Self {
        let position = rng.random_position(COIN_MARGIN);
        let value = if rng.next_bool(COIN_HIGH_CHANCE) {
            COIN_VALUE_HIGH
        } else {
            COIN_VALUE_LOW
        };
        Self { position, value }
    }
}

/// Static obstacle.
pub type Obstacle = Rect;

/// The obstacle layout every game starts with.
pub fn default_obstacles() -> Vec<Obstacle> {
    OBSTACLE_LAYOUT
        .iter()
        .map(|&(x, y, w, h)| Rect::new(x, y, w, h))
        .collect()
}

// =============================================================================
// GAME STATUS
// =============================================================================

/// Lifecycle of a game document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Fewer than two vehicles
    #[default]
    Waiting,
    /// In play
    Active,
    /// A termination condition fired
    Finished,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GameStatus::Waiting => "waiting",
            GameStatus::Active => "active",
            GameStatus::Finished => "finished",
        })
    }
}

/// Arena dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    /// Width in world units
    pub width: f64,
    /// Height in world units
    pub height: f64,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            width: ARENA_WIDTH,
            height: ARENA_HEIGHT,
        }
    }
}

// =============================================================================
// GAME DOCUMENT
// =============================================================================

/// Complete state of one game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDocument {
    /// Short game identifier
    pub id: String,

    /// Lifecycle status
    pub status: GameStatus,

    /// Vehicles in join order
    pub vehicles: Vec<Vehicle>,

    /// Coins still on the field
    pub coins: Vec<Coin>,

    /// Static obstacles
    pub obstacles: Vec<Obstacle>,

    /// Arena dimensions
    pub arena: Arena,

    /// Accepted moves so far
    pub round: u32,

    /// Winner display name once finished
    pub winner: Option<String>,

    /// Winning vehicle ID once finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<String>,

    /// Finished result has been folded into the leaderboard
    #[serde(default)]
    pub ledger_recorded: bool,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last accepted action
    pub last_update: DateTime<Utc>,

    /// Optimistic concurrency token, bumped on every persisted write
    #[serde(default)]
    pub version: u64,
}

impl GameDocument {
    /// Create a fresh game: random coin layout, fixed obstacles, no vehicles.
    pub fn new(now: DateTime<Utc>, rng: &mut DeterministicRng) -> Self {
        let id = hex::encode(rng.next_bytes::<4>());
        let coins = (0..INITIAL_COINS).map(|_| Coin::random(rng)).collect();

        Self {
            id,
            status: GameStatus::Waiting,
            vehicles: Vec::new(),
            coins,
            obstacles: default_obstacles(),
            arena: Arena::default(),
            round: 0,
            winner: None,
            winner_id: None,
            ledger_recorded: false,
            created_at: now,
            last_update: now,
            version: 0,
        }
    }

    /// Get a vehicle by ID.
    pub fn vehicle(&self, id: &str) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    /// Index of a vehicle by ID.
    pub fn vehicle_index(&self, id: &str) -> Option<usize> {
        self.vehicles.iter().position(|v| v.id == id)
    }

    /// Count of vehicles with health above zero.
    pub fn alive_count(&self) -> usize {
        self.vehicles.iter().filter(|v| v.is_alive()).count()
    }

    /// Check if the game has ended.
    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Finished
    }

    /// Has this document gone without an update for longer than `window`?
    pub fn is_stale(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now.signed_duration_since(self.last_update) > window
    }

    /// Finished, with a result the leaderboard has not taken yet?
    ///
    /// The document must not be replaced while this holds.
    pub fn awaiting_ledger(&self) -> bool {
        self.is_finished() && !self.ledger_recorded && self.winner_id.is_some()
    }

    /// Should the next read discard this document and start a new game?
    pub fn needs_replacement(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.is_finished() || self.is_stale(now, window)
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

// =============================================================================
// TESTS
// =============================================================================
