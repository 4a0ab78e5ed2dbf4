//! Core primitives.
//!
//! Arena constants, geometry, the seeded RNG and name generation.
//! Nothing in here knows about games or vehicles.

pub mod constants;
pub mod vec2;
pub mod rng;
pub mod names;

// Re-export core types
pub use vec2::{Vec2, Rect};
pub use rng::DeterministicRng;
pub use names::generate_name;
