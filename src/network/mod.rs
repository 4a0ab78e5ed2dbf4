//! Network Layer
//!
//! Request orchestration and the WebSocket transport. Everything that
//! touches the store, the clock or a socket lives here; `game/` stays pure.

pub mod service;
pub mod protocol;
pub mod server;

pub use service::{
    GameService, ServiceConfig, ServiceError, Clock, SystemClock,
    JoinResponse, MoveResponse, BoostResponse, PlayerResponse, EtchResponse,
};
pub use protocol::{ClientMessage, ServerMessage, ServerError, ErrorCode};
pub use server::{GameServer, ServerConfig, GameServerError, handle_message};
