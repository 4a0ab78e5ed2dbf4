//! Game Logic Module
//!
//! Everything that turns an action into a new game document. Pure over its
//! inputs: the caller supplies the document, the clock reading and the RNG.
//!
//! ## Module Structure
//!
//! - `input`: Steering directions
//! - `state`: Game document, vehicles, coins, obstacles
//! - `collision`: Proximity queries
//! - `engine`: Join, move, boost and termination
//! - `events`: What an action did, for logs and clients
//! - `ledger`: All-time leaderboard

pub mod input;
pub mod state;
pub mod collision;
pub mod engine;
pub mod events;
pub mod ledger;

// Re-export key types
pub use input::Direction;
pub use state::{GameDocument, GameStatus, Vehicle, VehicleType, Coin, Obstacle};
pub use engine::{ActionError, GameResult, JoinOutcome, MoveOutcome, BoostOutcome};
pub use events::{GameEvent, GameEventData, EndReason};
pub use ledger::{ScoreLedger, HighScoreEntry, LedgerError};
