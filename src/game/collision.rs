//! Collision Detection
//!
//! Proximity queries for vehicles, coins and obstacles. Everything here is
//! read-only; the engine decides what a hit does.

use crate::core::constants::{COIN_PICKUP_RADIUS, OBSTACLE_PADDING};
use crate::core::vec2::Vec2;
use crate::game::state::{Coin, Obstacle, Vehicle};

/// Check if two points are strictly closer than `radius`.
#[inline]
pub fn within(a: Vec2, b: Vec2, radius: f64) -> bool {
    a.distance(b) < radius
}

/// Indices of coins a vehicle at `position` picks up, highest index first
/// so they can be removed in order without shifting the rest.
pub fn coins_in_reach(coins: &[Coin], position: Vec2) -> Vec<usize> {
    (0..coins.len())
        .rev()
        .filter(|&i| within(coins[i].position, position, COIN_PICKUP_RADIUS))
        .collect()
}

/// Indices of vehicles, other than `mover`, closer than `radius` to it.
///
/// Destroyed vehicles are included: wrecks still take hits.
pub fn vehicles_in_range(vehicles: &[Vehicle], mover: usize, radius: f64) -> Vec<usize> {
    let origin = vehicles[mover].position;
    vehicles
        .iter()
        .enumerate()
        .filter(|(i, v)| *i != mover && within(origin, v.position, radius))
        .map(|(i, _)| i)
        .collect()
}

/// Unit vector pointing from `from` to `to`.
///
/// Coincident points have no defined line between them; `fallback` is used
/// instead.
pub fn push_direction(from: Vec2, to: Vec2, fallback: Vec2) -> Vec2 {
    let dir = (to - from).normalize();
    if dir == Vec2::ZERO {
        fallback
    } else {
        dir
    }
}

/// Check if a point hits an obstacle's padded bounding box.
#[inline]
pub fn hits_obstacle(obstacle: &Obstacle, position: Vec2) -> bool {
    obstacle.inflate(OBSTACLE_PADDING).contains(position)
}

/// Indices of obstacles whose padded bounding box contains `position`.
pub fn obstacles_hit(obstacles: &[Obstacle], position: Vec2) -> Vec<usize> {
    obstacles
        .iter()
        .enumerate()
        .filter(|(_, o)| hits_obstacle(o, position))
        .map(|(i, _)| i)
        .collect()
}
