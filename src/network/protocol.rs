//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket. Every
//! message is a JSON object tagged by `"type"`. Each request gets exactly
//! one reply; `event` and `shutdown` arrive unprompted.

use serde::{Serialize, Deserialize};

use crate::game::engine::ActionError;
use crate::game::events::GameEvent;
use crate::game::ledger::{HighScoreEntry, LedgerError};
use crate::game::state::GameDocument;
use crate::network::service::{
    ServiceError, JoinResponse, MoveResponse, BoostResponse, PlayerResponse, EtchResponse,
};

/// Entries returned by `leaderboard` when no limit is given.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Add a vehicle to the current game.
    Join {
        /// `commando`, `cj2a` or `f100`
        vehicle_type: String,
        /// Opaque payment proof; names the driver
        proof_seed: String,
    },

    /// Step a vehicle.
    Move {
        /// Vehicle to move
        vehicle_id: String,
        /// `up`, `down`, `left` or `right`
        direction: String,
    },

    /// Dash a vehicle.
    Boost {
        /// Vehicle to boost
        vehicle_id: String,
        /// `up`, `down`, `left` or `right`
        direction: String,
    },

    /// Fetch the current game document.
    GetState,

    /// Replace the current game (admin).
    Reset {
        /// Admin token, if the server has one configured
        #[serde(default)]
        token: Option<String>,
    },

    /// Fetch the top of the leaderboard.
    Leaderboard {
        /// Maximum entries; defaults to `DEFAULT_LEADERBOARD_LIMIT`
        #[serde(default)]
        limit: Option<usize>,
    },

    /// Fetch one owner's ledger standing.
    Player {
        /// Owner key
        owner: String,
    },

    /// Attach a transaction reference to an owner's entry.
    Etch {
        /// Owner key
        owner: String,
        /// Transaction reference
        tx: String,
    },

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp, echoed back
        timestamp: u64,
    },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Join accepted.
    Joined(JoinResponse),

    /// Move accepted.
    Moved(MoveResponse),

    /// Boost accepted.
    Boosted(BoostResponse),

    /// Current game document.
    State(GameDocument),

    /// Top leaderboard entries.
    Leaderboard {
        /// Entries in rank order
        entries: Vec<HighScoreEntry>,
    },

    /// One owner's standing.
    Player(PlayerResponse),

    /// Etch result.
    Etched(EtchResponse),

    /// Something happened in the current game.
    Event(GameEvent),

    /// Pong response.
    Pong {
        /// Echoed client timestamp
        timestamp: u64,
        /// Server time in milliseconds since the Unix epoch
        server_time: u64,
    },

    /// Request failed.
    Error(ServerError),

    /// Server is going away.
    Shutdown {
        /// Why the server is stopping
        reason: String,
    },
}

/// Error payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    /// Machine-readable code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Message did not parse.
    InvalidMessage,
    /// Unknown vehicle type.
    InvalidVehicleType,
    /// Game already has six vehicles.
    GameFull,
    /// Vehicle not in the current game.
    VehicleNotFound,
    /// Vehicle has no health left.
    VehicleDestroyed,
    /// Unknown direction.
    InvalidDirection,
    /// Action not allowed in this game status.
    GameNotActive,
    /// No ledger entry for this owner.
    PlayerNotFound,
    /// Too much contention; try again.
    WriteConflict,
    /// Admin token missing or wrong.
    Unauthorized,
    /// Internal error.
    InternalError,
}

impl ServerError {
    /// Error with an explicit code.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl From<&ServiceError> for ServerError {
    fn from(err: &ServiceError) -> Self {
        let code = match err {
            ServiceError::Action(action) => match action {
                ActionError::InvalidVehicleType(_) => ErrorCode::InvalidVehicleType,
                ActionError::GameFull { .. } => ErrorCode::GameFull,
                ActionError::VehicleNotFound(_) => ErrorCode::VehicleNotFound,
                ActionError::VehicleDestroyed(_) => ErrorCode::VehicleDestroyed,
                ActionError::InvalidDirection(_) => ErrorCode::InvalidDirection,
                ActionError::GameNotActive { .. } => ErrorCode::GameNotActive,
            },
            ServiceError::Ledger(LedgerError::PlayerNotFound(_)) => ErrorCode::PlayerNotFound,
            ServiceError::WriteConflict { .. } => ErrorCode::WriteConflict,
            ServiceError::Unauthorized => ErrorCode::Unauthorized,
            // Backend details stay in the server log
            ServiceError::Store(_) | ServiceError::Codec(_) => {
                return Self::new(ErrorCode::InternalError, "Internal error");
            }
        };
        Self::new(code, err.to_string())
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Join { .. } => "join",
            ClientMessage::Move { .. } => "move",
            ClientMessage::Boost { .. } => "boost",
            ClientMessage::GetState => "get_state",
            ClientMessage::Reset { .. } => "reset",
            ClientMessage::Leaderboard { .. } => "leaderboard",
            ClientMessage::Player { .. } => "player",
            ClientMessage::Etch { .. } => "etch",
            ClientMessage::Ping { .. } => "ping",
        }
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
