//! Arena Constants
//!
//! Fixed tuning values for the arena. Every game is played with these;
//! changing any of them changes the outcome of recorded games.
//!
//! ```text
//! ┌──────────────────────────── 400 ────────────────────────────┐
//! │  (20,20)                                                     │
//! │     ┌────────── movement area (inset 20) ──────────┐         │
//! │     │                                 ┌──┐          │        300
//! │     │                 ┌──┐            │  │          │         │
//! │     │   ┌───┐         │  │            └──┘          │         │
//! │     │   └───┘         └──┘                          │         │
//! │     └───────────────────────────────── (380,280) ───┘         │
//! └──────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// ARENA
// =============================================================================

/// Arena width in world units
pub const ARENA_WIDTH: f64 = 400.0;

/// Arena height in world units
pub const ARENA_HEIGHT: f64 = 300.0;

/// Vehicles are kept this far from every arena edge
pub const ARENA_INSET: f64 = 20.0;

/// Vehicles spawn at least this far from every arena edge
pub const SPAWN_MARGIN: f64 = 50.0;

/// Coins are placed at least this far from every arena edge
pub const COIN_MARGIN: f64 = 40.0;

// =============================================================================
// GAME LIMITS
// =============================================================================

/// Maximum vehicles in one game
pub const MAX_VEHICLES: usize = 6;

/// Game ends once the round counter reaches this value
pub const MAX_ROUNDS: u32 = 100;

/// Coins placed when a game is created
pub const INITIAL_COINS: usize = 15;

/// Documents idle for longer than this are replaced on next access
pub const STALE_AFTER_SECS: i64 = 300;

/// Number of leading proof-seed characters that form the owner key
pub const OWNER_KEY_LEN: usize = 16;

// =============================================================================
// COINS
// =============================================================================

/// Common coin denomination
pub const COIN_VALUE_LOW: u32 = 5;

/// Rare coin denomination
pub const COIN_VALUE_HIGH: u32 = 10;

/// Probability that a new coin is the rare denomination
pub const COIN_HIGH_CHANCE: f64 = 0.3;

/// A coin is collected when the vehicle centre is closer than this
pub const COIN_PICKUP_RADIUS: f64 = 20.0;

// =============================================================================
// MOVEMENT & COMBAT
// =============================================================================

/// Move displacement = speed * MOVE_STEP
pub const MOVE_STEP: f64 = 5.0;

/// Boost displacement = speed * BOOST_STEP
pub const BOOST_STEP: f64 = 10.0;

/// Vehicles closer than this collide on a move
pub const RAM_RADIUS: f64 = 30.0;

/// Vehicles closer than this are hit by a boost
pub const BOOST_RADIUS: f64 = 35.0;

/// Fraction of the target's power the mover takes as recoil
pub const RECOIL_FACTOR: f64 = 0.5;

/// Boost damage = mover power * BOOST_DAMAGE_FACTOR
pub const BOOST_DAMAGE_FACTOR: f64 = 2.0;

/// Distance a rammed vehicle is shoved away from the mover
pub const RAM_PUSHBACK: f64 = 15.0;

/// Obstacles are inflated by this much on each side for hit testing
pub const OBSTACLE_PADDING: f64 = 15.0;

/// Health lost per obstacle hit
pub const OBSTACLE_PENALTY: f64 = 5.0;

/// Bounce-back distance = move magnitude * OBSTACLE_BOUNCE
pub const OBSTACLE_BOUNCE: f64 = 1.5;

/// Obstacle layout shared by every game: (x, y, width, height)
pub const OBSTACLE_LAYOUT: [(f64, f64, f64, f64); 3] = [
    (60.0, 180.0, 50.0, 30.0),
    (180.0, 120.0, 40.0, 60.0),
    (300.0, 50.0, 30.0, 70.0),
];

// =============================================================================
// LEDGER
// =============================================================================

/// Leaderboard keeps only this many entries
pub const LEDGER_CAPACITY: usize = 100;
