//! # Coin Arena Server
//!
//! Turn-based multiplayer vehicle arena: up to six vehicles drive around a
//! walled field, grab coins, ram each other and bounce off obstacles. Each
//! finished game is folded into an all-time leaderboard.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     COIN ARENA SERVER                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── constants.rs- Arena tuning                              │
//! │  ├── vec2.rs     - 2D vector and rectangle                   │
//! │  ├── rng.rs      - Seeded Xorshift128+ PRNG                  │
//! │  └── names.rs    - Seed → display name                       │
//! │                                                              │
//! │  game/           - Rules (pure)                              │
//! │  ├── input.rs    - Steering directions                       │
//! │  ├── state.rs    - Game document and vehicles                │
//! │  ├── collision.rs- Proximity queries                         │
//! │  ├── engine.rs   - Join / move / boost / termination         │
//! │  ├── events.rs   - What an action did                        │
//! │  └── ledger.rs   - All-time leaderboard                      │
//! │                                                              │
//! │  store/          - Byte store with compare-and-put           │
//! │  ├── memory.rs   - In-process                                │
//! │  └── sled_store.rs - Embedded on-disk                        │
//! │                                                              │
//! │  network/        - Orchestration and transport               │
//! │  ├── service.rs  - Load → apply → persist → ledger           │
//! │  ├── protocol.rs - Message types                             │
//! │  └── server.rs   - WebSocket server                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! There is one shared game document. Every write is a compare-and-put
//! against the exact bytes that were read; a lost race reruns the action
//! on the newer document. A finished game is merged into the leaderboard
//! only after its final write has landed.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod store;
pub mod network;

// Re-export commonly used types
pub use core::vec2::{Vec2, Rect};
pub use core::rng::DeterministicRng;
pub use core::names::generate_name;
pub use game::state::{GameDocument, GameStatus, Vehicle, VehicleType};
pub use game::input::Direction;
pub use game::ledger::{ScoreLedger, HighScoreEntry};
pub use store::{DocumentStore, MemoryStore, SledStore};
pub use network::{GameService, GameServer, ServerConfig, ServiceConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
