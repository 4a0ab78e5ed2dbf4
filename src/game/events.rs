//! Game Events
//!
//! What happened during an action, for logging and client notification.
//! Events never carry state the document does not already hold.

use serde::{Serialize, Deserialize};

use crate::core::vec2::Vec2;
use crate::game::state::VehicleType;

/// Why a game ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Exactly one vehicle left with health
    LastSurvivor,
    /// Round cap reached
    RoundLimit,
    /// Every coin collected
    CoinsExhausted,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameEventData {
    /// A vehicle joined the game
    VehicleJoined {
        /// New vehicle
        vehicle_id: String,
        /// Archetype
        vehicle_type: VehicleType,
        /// Generated display name
        player_name: String,
        /// Spawn point
        position: Vec2,
    },

    /// Second vehicle arrived; play begins
    GameStarted {
        /// Vehicles in the game
        players: usize,
    },

    /// A vehicle picked up a coin
    CoinCollected {
        /// Collector
        vehicle_id: String,
        /// Coin value
        value: u32,
        /// Where the coin lay
        position: Vec2,
        /// Collector's coins afterwards
        new_total: u32,
    },

    /// A move rammed another vehicle
    VehicleCollision {
        /// Moving vehicle
        attacker_id: String,
        /// Vehicle that was rammed
        target_id: String,
        /// Damage to the target
        damage_dealt: f64,
        /// Recoil damage to the mover
        damage_taken: f64,
    },

    /// A boost clipped another vehicle
    BoostHit {
        /// Boosting vehicle
        attacker_id: String,
        /// Vehicle hit
        target_id: String,
        /// Damage to the target
        damage: f64,
    },

    /// A vehicle bounced off an obstacle
    ObstacleHit {
        /// Vehicle that bounced
        vehicle_id: String,
        /// Index into the document's obstacles
        obstacle_index: usize,
        /// Penalty applied
        damage: f64,
    },

    /// A vehicle's health dropped to zero or below
    VehicleDestroyed {
        /// Destroyed vehicle
        vehicle_id: String,
    },

    /// The game finished
    GameEnded {
        /// Winning vehicle
        winner_id: String,
        /// Winner display string
        winner: String,
        /// Which condition fired
        reason: EndReason,
    },
}

/// A game event with the round it happened in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Document round when the event was produced
    pub round: u32,
    /// Event payload
    pub data: GameEventData,
}

impl GameEvent {
    /// Wrap event data with its round.
    pub fn new(round: u32, data: GameEventData) -> Self {
        Self { round, data }
    }

    /// Is this the end-of-game event?
    pub fn is_game_end(&self) -> bool {
        matches!(self.data, GameEventData::GameEnded { .. })
    }
}
