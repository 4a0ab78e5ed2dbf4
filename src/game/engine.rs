//! Simulation Engine
//!
//! Turns an action plus the current game document into the next document.
//! Every action validates first and mutates second: a rejected action
//! leaves the document exactly as it was.
//!
//! ```text
//!   join ──► waiting ──(2nd vehicle)──► active ──(termination)──► finished
//!                                        ▲   │
//!                                 move ──┘   └── boost
//! ```
//!
//! There is no clock-driven loop: rounds advance only on accepted moves.

use chrono::{DateTime, Utc};

use crate::core::constants::{
    MAX_VEHICLES, MAX_ROUNDS, SPAWN_MARGIN, MOVE_STEP, BOOST_STEP,
    RAM_RADIUS, BOOST_RADIUS, RECOIL_FACTOR, BOOST_DAMAGE_FACTOR, RAM_PUSHBACK,
    OBSTACLE_PENALTY, OBSTACLE_BOUNCE,
};
use crate::core::names::generate_name;
use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::collision::{coins_in_reach, vehicles_in_range, push_direction, obstacles_hit};
use crate::game::events::{GameEvent, GameEventData, EndReason};
use crate::game::input::Direction;
use crate::game::state::{GameDocument, GameStatus, Vehicle, VehicleType, owner_key};

// =============================================================================
// ERRORS
// =============================================================================

/// Reasons an action is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    /// Unknown archetype name.
    #[error("Invalid vehicle type: {0}")]
    InvalidVehicleType(String),

    /// No room for another vehicle.
    #[error("Game is full ({max} vehicles)")]
    GameFull {
        /// Vehicle cap
        max: usize,
    },

    /// No vehicle with this ID in the current game.
    #[error("Vehicle not found: {0}")]
    VehicleNotFound(String),

    /// Vehicle has no health left.
    #[error("Vehicle destroyed: {0}")]
    VehicleDestroyed(String),

    /// Unknown direction name.
    #[error("Invalid direction: {0}")]
    InvalidDirection(String),

    /// Action not allowed in the current game status.
    #[error("Game is not active (status: {status})")]
    GameNotActive {
        /// Status at the time of the action
        status: GameStatus,
    },
}

// =============================================================================
// OUTCOMES
// =============================================================================

/// How a finished game ended.
#[derive(Debug, Clone, PartialEq)]
pub struct GameResult {
    /// Winning vehicle ID
    pub winner_id: String,
    /// Winner display name, as stored on the document
    pub winner: String,
    /// Which termination condition fired
    pub reason: EndReason,
}

/// Result of a successful join.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// The new vehicle
    pub vehicle: Vehicle,
    /// Generated display name
    pub player_name: String,
    /// Game the vehicle joined
    pub game_id: String,
    /// Vehicles in the game after joining
    pub players_in_game: usize,
    /// Events produced
    pub events: Vec<GameEvent>,
}

/// Result of a successful move.
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    /// Mover position after the move
    pub position: Vec2,
    /// Mover health after the move
    pub health: f64,
    /// Mover coin count after the move
    pub coins: u32,
    /// Document status after the move
    pub status: GameStatus,
    /// Winner display name if the game finished
    pub winner: Option<String>,
    /// Set only on the move that finished the game
    pub result: Option<GameResult>,
    /// Events produced
    pub events: Vec<GameEvent>,
}

/// Result of a successful boost.
#[derive(Debug, Clone)]
pub struct BoostOutcome {
    /// Booster position after the boost
    pub position: Vec2,
    /// Booster health (never changed by its own boost)
    pub health: f64,
    /// Booster coin count
    pub coins: u32,
    /// Events produced
    pub events: Vec<GameEvent>,
}

// =============================================================================
// ACTIONS
// =============================================================================

/// Add a vehicle for the holder of `proof_seed`.
///
/// The seed is never validated; it only feeds the owner key and the name.
pub fn join(
    doc: &mut GameDocument,
    vehicle_type: VehicleType,
    proof_seed: &str,
    now: DateTime<Utc>,
    rng: &mut DeterministicRng,
) -> Result<JoinOutcome, ActionError> {
    if doc.is_finished() {
        return Err(ActionError::GameNotActive { status: doc.status });
    }
    if doc.vehicles.len() >= MAX_VEHICLES {
        return Err(ActionError::GameFull { max: MAX_VEHICLES });
    }

    let id = uuid::Builder::from_random_bytes(rng.next_bytes::<16>())
        .into_uuid()
        .to_string();
    let position = rng.random_position(SPAWN_MARGIN);
    let angle = rng.random_angle();
    let player_name = generate_name(proof_seed);

    let vehicle = Vehicle::new(
        id,
        vehicle_type,
        position,
        angle,
        owner_key(proof_seed),
        player_name.clone(),
        now,
    );

    let mut events = vec![GameEvent::new(
        doc.round,
        GameEventData::VehicleJoined {
            vehicle_id: vehicle.id.clone(),
            vehicle_type,
            player_name: player_name.clone(),
            position,
        },
    )];

    doc.vehicles.push(vehicle.clone());
    doc.last_update = now;

    if doc.status == GameStatus::Waiting && doc.vehicles.len() >= 2 {
        doc.status = GameStatus::Active;
        events.push(GameEvent::new(
            doc.round,
            GameEventData::GameStarted { players: doc.vehicles.len() },
        ));
    }

    Ok(JoinOutcome {
        vehicle,
        player_name,
        game_id: doc.id.clone(),
        players_in_game: doc.vehicles.len(),
        events,
    })
}

/// Drive a vehicle one step, then resolve pickups, rams and obstacles.
///
/// Resolution order: coins, vehicles, obstacles, round, termination.
pub fn move_vehicle(
    doc: &mut GameDocument,
    vehicle_id: &str,
    direction: Direction,
    now: DateTime<Utc>,
) -> Result<MoveOutcome, ActionError> {
    let idx = doc
        .vehicle_index(vehicle_id)
        .ok_or_else(|| ActionError::VehicleNotFound(vehicle_id.to_string()))?;
    ensure_active(doc)?;
    if !doc.vehicles[idx].is_alive() {
        return Err(ActionError::VehicleDestroyed(vehicle_id.to_string()));
    }

    let round = doc.round + 1;
    let alive_before: Vec<bool> = doc.vehicles.iter().map(Vehicle::is_alive).collect();
    let mut events = Vec::new();

    let unit = direction.unit();
    let magnitude = doc.vehicles[idx].speed * MOVE_STEP;
    step(&mut doc.vehicles[idx], direction, magnitude);
    let position = doc.vehicles[idx].position;

    // 1. Coins
    for coin_idx in coins_in_reach(&doc.coins, position) {
        let coin = doc.coins.remove(coin_idx);
        let mover = &mut doc.vehicles[idx];
        mover.coins += coin.value;
        events.push(GameEvent::new(
            round,
            GameEventData::CoinCollected {
                vehicle_id: mover.id.clone(),
                value: coin.value,
                position: coin.position,
                new_total: mover.coins,
            },
        ));
    }

    // 2. Vehicles: target takes full power, mover takes half the target's
    let attacker_power = doc.vehicles[idx].power;
    for other in vehicles_in_range(&doc.vehicles, idx, RAM_RADIUS) {
        let recoil = doc.vehicles[other].power * RECOIL_FACTOR;
        let push = push_direction(position, doc.vehicles[other].position, unit);

        let target = &mut doc.vehicles[other];
        target.health -= attacker_power;
        target.position = (target.position + push.scale(RAM_PUSHBACK)).clamp_to_arena();
        let target_id = target.id.clone();

        doc.vehicles[idx].health -= recoil;

        events.push(GameEvent::new(
            round,
            GameEventData::VehicleCollision {
                attacker_id: vehicle_id.to_string(),
                target_id,
                damage_dealt: attacker_power,
                damage_taken: recoil,
            },
        ));
    }

    // 3. Obstacles: one penalty and bounce per overlapping obstacle
    for obstacle_index in obstacles_hit(&doc.obstacles, position) {
        let mover = &mut doc.vehicles[idx];
        mover.health -= OBSTACLE_PENALTY;
        mover.position = (mover.position - unit.scale(magnitude * OBSTACLE_BOUNCE)).clamp_to_arena();
        events.push(GameEvent::new(
            round,
            GameEventData::ObstacleHit {
                vehicle_id: vehicle_id.to_string(),
                obstacle_index,
                damage: OBSTACLE_PENALTY,
            },
        ));
    }

    push_destroyed_events(doc, &alive_before, round, &mut events);

    doc.round = round;
    doc.vehicles[idx].last_move = now;
    doc.last_update = now;

    // 4. Termination
    let result = check_termination(doc).and_then(|reason| finish(doc, reason));
    if let Some(ref result) = result {
        events.push(GameEvent::new(
            round,
            GameEventData::GameEnded {
                winner_id: result.winner_id.clone(),
                winner: result.winner.clone(),
                reason: result.reason,
            },
        ));
    }

    let mover = &doc.vehicles[idx];
    Ok(MoveOutcome {
        position: mover.position,
        health: mover.health,
        coins: mover.coins,
        status: doc.status,
        winner: doc.winner.clone(),
        result,
        events,
    })
}

/// Double-length dash that hits every vehicle near the landing point.
///
/// Unlike a move, a boost is accepted for a destroyed vehicle, deals
/// one-sided damage with no push, and ignores coins, obstacles, the round
/// counter and the termination check.
pub fn boost(
    doc: &mut GameDocument,
    vehicle_id: &str,
    direction: Direction,
    now: DateTime<Utc>,
) -> Result<BoostOutcome, ActionError> {
    let idx = doc
        .vehicle_index(vehicle_id)
        .ok_or_else(|| ActionError::VehicleNotFound(vehicle_id.to_string()))?;
    ensure_active(doc)?;

    let alive_before: Vec<bool> = doc.vehicles.iter().map(Vehicle::is_alive).collect();
    let mut events = Vec::new();

    let magnitude = doc.vehicles[idx].speed * BOOST_STEP;
    step(&mut doc.vehicles[idx], direction, magnitude);

    let damage = doc.vehicles[idx].power * BOOST_DAMAGE_FACTOR;
    for other in vehicles_in_range(&doc.vehicles, idx, BOOST_RADIUS) {
        let target = &mut doc.vehicles[other];
        target.health -= damage;
        events.push(GameEvent::new(
            doc.round,
            GameEventData::BoostHit {
                attacker_id: vehicle_id.to_string(),
                target_id: target.id.clone(),
                damage,
            },
        ));
    }

    push_destroyed_events(doc, &alive_before, doc.round, &mut events);

    doc.vehicles[idx].last_move = now;
    doc.last_update = now;

    let booster = &doc.vehicles[idx];
    Ok(BoostOutcome {
        position: booster.position,
        health: booster.health,
        coins: booster.coins,
        events,
    })
}

// =============================================================================
// TERMINATION
// =============================================================================

/// Which termination condition holds, if any.
///
/// Checked in order: single survivor, round cap, empty coin field.
pub fn check_termination(doc: &GameDocument) -> Option<EndReason> {
    if doc.alive_count() == 1 {
        Some(EndReason::LastSurvivor)
    } else if doc.round >= MAX_ROUNDS {
        Some(EndReason::RoundLimit)
    } else if doc.coins.is_empty() {
        Some(EndReason::CoinsExhausted)
    } else {
        None
    }
}

/// Index of the winning vehicle.
///
/// A lone survivor wins outright. Otherwise the most coins wins, and ties
/// go to whoever joined first.
pub fn select_winner(doc: &GameDocument) -> Option<usize> {
    let mut survivors = doc.vehicles.iter().enumerate().filter(|(_, v)| v.is_alive());
    if let (Some((idx, _)), None) = (survivors.next(), survivors.next()) {
        return Some(idx);
    }

    let mut best: Option<usize> = None;
    for (idx, vehicle) in doc.vehicles.iter().enumerate() {
        match best {
            Some(b) if doc.vehicles[b].coins >= vehicle.coins => {}
            _ => best = Some(idx),
        }
    }
    best
}

/// Mark the document finished and record the winner.
fn finish(doc: &mut GameDocument, reason: EndReason) -> Option<GameResult> {
    let winner_idx = select_winner(doc)?;
    let winner = &doc.vehicles[winner_idx];
    let result = GameResult {
        winner_id: winner.id.clone(),
        winner: winner.display_name(),
        reason,
    };

    doc.status = GameStatus::Finished;
    doc.winner = Some(result.winner.clone());
    doc.winner_id = Some(result.winner_id.clone());
    Some(result)
}

// =============================================================================
// HELPERS
// =============================================================================

fn ensure_active(doc: &GameDocument) -> Result<(), ActionError> {
    if doc.status != GameStatus::Active {
        return Err(ActionError::GameNotActive { status: doc.status });
    }
    Ok(())
}

/// Displace, clamp and turn to face the direction of travel.
fn step(vehicle: &mut Vehicle, direction: Direction, magnitude: f64) {
    vehicle.position = (vehicle.position + direction.unit().scale(magnitude)).clamp_to_arena();
    vehicle.angle = direction.angle();
}

fn push_destroyed_events(
    doc: &GameDocument,
    alive_before: &[bool],
    round: u32,
    events: &mut Vec<GameEvent>,
) {
    for (vehicle, was_alive) in doc.vehicles.iter().zip(alive_before) {
        if *was_alive && !vehicle.is_alive() {
            events.push(GameEvent::new(
                round,
                GameEventData::VehicleDestroyed { vehicle_id: vehicle.id.clone() },
            ));
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use crate::core::vec2::Rect;
    use crate::game::state::Coin;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z").unwrap().with_timezone(&Utc)
    }

    /// Active game with no obstacles and one unreachable coin.
    fn arena() -> GameDocument {
        let mut doc = GameDocument::new(now(), &mut DeterministicRng::new(1));
        doc.coins = vec![Coin { position: Vec2::new(380.0, 20.0), value: 5 }];
        doc.obstacles.clear();
        doc.status = GameStatus::Active;
        doc
    }

    fn place(doc: &mut GameDocument, id: &str, vehicle_type: VehicleType, x: f64, y: f64) {
        doc.vehicles.push(Vehicle::new(
            id.into(),
            vehicle_type,
            Vec2::new(x, y),
            0.0,
            format!("owner-{}", id),
            format!("Driver {}", id),
            now(),
        ));
    }

    fn vehicle<'a>(doc: &'a GameDocument, id: &str) -> &'a Vehicle {
        doc.vehicle(id).unwrap()
    }

    // -------------------------------------------------------------------------
    // join
    // -------------------------------------------------------------------------

    #[test]
    fn test_join_first_vehicle_waits() {
        let mut rng = DeterministicRng::new(42);
        let mut doc = GameDocument::new(now(), &mut rng);

        let out = join(&mut doc, VehicleType::Cj2a, "0123456789abcdefTAIL", now(), &mut rng).unwrap();

        assert_eq!(doc.status, GameStatus::Waiting);
        assert_eq!(out.players_in_game, 1);
        assert_eq!(out.game_id, doc.id);
        assert_eq!(out.vehicle.owner, "0123456789abcdef");
        assert_eq!(out.player_name, generate_name("0123456789abcdefTAIL"));
        assert_eq!(out.vehicle.health, 120.0);
        assert_eq!(out.vehicle.speed, 4.0);
        assert_eq!(out.vehicle.power, 12.0);
        assert!(uuid::Uuid::parse_str(&out.vehicle.id).is_ok());

        let pos = out.vehicle.position;
        assert!(pos.x >= SPAWN_MARGIN && pos.x <= 400.0 - SPAWN_MARGIN);
        assert!(pos.y >= SPAWN_MARGIN && pos.y <= 300.0 - SPAWN_MARGIN);
        assert!((0.0..std::f64::consts::TAU).contains(&out.vehicle.angle));
    }

    #[test]
    fn test_second_join_activates() {
        let mut rng = DeterministicRng::new(42);
        let mut doc = GameDocument::new(now(), &mut rng);

        join(&mut doc, VehicleType::Commando, "alice", now(), &mut rng).unwrap();
        let out = join(&mut doc, VehicleType::F100, "bob", now(), &mut rng).unwrap();

        assert_eq!(doc.status, GameStatus::Active);
        assert_eq!(out.players_in_game, 2);
        assert!(out.events.iter().any(|e| matches!(e.data, GameEventData::GameStarted { players: 2 })));
        // Join order preserved
        assert_eq!(doc.vehicles[0].owner, "alice");
        assert_eq!(doc.vehicles[1].owner, "bob");
    }

    #[test]
    fn test_seventh_join_is_rejected() {
        let mut rng = DeterministicRng::new(7);
        let mut doc = GameDocument::new(now(), &mut rng);

        for i in 0..6 {
            join(&mut doc, VehicleType::Commando, &format!("seed-{}", i), now(), &mut rng).unwrap();
        }
        let before = doc.clone();

        let err = join(&mut doc, VehicleType::Commando, "seed-6", now(), &mut rng).unwrap_err();
        assert_eq!(err, ActionError::GameFull { max: 6 });
        assert_eq!(doc, before);
        assert_eq!(doc.vehicles.len(), 6);
    }

    #[test]
    fn test_join_finished_game_rejected() {
        let mut rng = DeterministicRng::new(7);
        let mut doc = arena();
        doc.status = GameStatus::Finished;
        let before = doc.clone();

        let err = join(&mut doc, VehicleType::Commando, "late", now(), &mut rng).unwrap_err();
        assert_eq!(err, ActionError::GameNotActive { status: GameStatus::Finished });
        assert_eq!(doc, before);
    }

    // -------------------------------------------------------------------------
    // move
    // -------------------------------------------------------------------------

    #[test]
    fn test_move_right_open_field() {
        let mut doc = arena();
        place(&mut doc, "a", VehicleType::Commando, 100.0, 100.0);
        place(&mut doc, "b", VehicleType::Cj2a, 300.0, 250.0);

        let later = now() + chrono::Duration::seconds(3);
        let out = move_vehicle(&mut doc, "a", Direction::Right, later).unwrap();

        assert_eq!(out.position, Vec2::new(125.0, 100.0));
        assert_eq!(out.health, 100.0);
        assert_eq!(out.coins, 0);
        assert_eq!(out.status, GameStatus::Active);
        assert!(out.winner.is_none());
        assert!(out.result.is_none());

        let a = vehicle(&doc, "a");
        assert_eq!(a.angle, 0.0);
        assert_eq!(a.last_move, later);
        assert_eq!(doc.round, 1);
        assert_eq!(doc.last_update, later);
    }

    #[test]
    fn test_move_sets_canonical_angles() {
        let mut doc = arena();
        place(&mut doc, "a", VehicleType::F100, 200.0, 150.0);
        place(&mut doc, "b", VehicleType::F100, 20.0, 280.0);

        let expected = [
            (Direction::Up, Vec2::new(200.0, 135.0), -std::f64::consts::FRAC_PI_2),
            (Direction::Left, Vec2::new(185.0, 135.0), std::f64::consts::PI),
            (Direction::Down, Vec2::new(185.0, 150.0), std::f64::consts::FRAC_PI_2),
            (Direction::Right, Vec2::new(200.0, 150.0), 0.0),
        ];
        for (dir, pos, angle) in expected {
            let out = move_vehicle(&mut doc, "a", dir, now()).unwrap();
            assert_eq!(out.position, pos);
            assert_eq!(vehicle(&doc, "a").angle, angle);
        }
        assert_eq!(doc.round, 4);
    }

    #[test]
    fn test_move_clamps_to_arena() {
        let mut doc = arena();
        // Keep the corner clear so the game stays active
        doc.coins = vec![Coin { position: Vec2::new(200.0, 280.0), value: 5 }];
        place(&mut doc, "a", VehicleType::Commando, 370.0, 25.0);
        place(&mut doc, "b", VehicleType::Commando, 100.0, 150.0);

        let out = move_vehicle(&mut doc, "a", Direction::Right, now()).unwrap();
        assert_eq!(out.position, Vec2::new(380.0, 25.0));
        assert_eq!(out.status, GameStatus::Active);

        let out = move_vehicle(&mut doc, "a", Direction::Up, now()).unwrap();
        assert_eq!(out.position, Vec2::new(380.0, 20.0));
        assert_eq!(out.coins, 0);
    }

    #[test]
    fn test_move_collects_every_coin_in_reach() {
        let mut doc = arena();
        doc.coins.push(Coin { position: Vec2::new(125.0, 100.0), value: 5 });
        doc.coins.push(Coin { position: Vec2::new(200.0, 200.0), value: 10 });
        doc.coins.push(Coin { position: Vec2::new(130.0, 110.0), value: 10 });
        place(&mut doc, "a", VehicleType::Commando, 100.0, 100.0);
        place(&mut doc, "b", VehicleType::Commando, 300.0, 250.0);

        let out = move_vehicle(&mut doc, "a", Direction::Right, now()).unwrap();

        assert_eq!(out.coins, 15);
        assert_eq!(doc.coins.len(), 2);
        assert!(doc.coins.iter().all(|c| c.position != Vec2::new(125.0, 100.0)));
        let pickups = out.events.iter()
            .filter(|e| matches!(e.data, GameEventData::CoinCollected { .. }))
            .count();
        assert_eq!(pickups, 2);
    }

    #[test]
    fn test_move_ram_damage_and_push() {
        let mut doc = arena();
        place(&mut doc, "a", VehicleType::Commando, 100.0, 100.0);
        place(&mut doc, "b", VehicleType::F100, 140.0, 100.0);

        let out = move_vehicle(&mut doc, "a", Direction::Right, now()).unwrap();

        // Attacker favoured: full power out, half the target's power back
        assert_eq!(out.health, 90.0);
        let b = vehicle(&doc, "b");
        assert_eq!(b.health, 135.0);
        assert_eq!(b.position, Vec2::new(155.0, 100.0));
        assert!(out.events.iter().any(|e| matches!(
            e.data,
            GameEventData::VehicleCollision { damage_dealt, damage_taken, .. }
                if damage_dealt == 15.0 && damage_taken == 10.0
        )));
    }

    #[test]
    fn test_move_ram_fractional_recoil() {
        let mut doc = arena();
        place(&mut doc, "a", VehicleType::F100, 100.0, 100.0);
        place(&mut doc, "b", VehicleType::Commando, 120.0, 100.0);

        let out = move_vehicle(&mut doc, "a", Direction::Right, now()).unwrap();
        assert_eq!(out.health, 142.5);
        assert_eq!(vehicle(&doc, "b").health, 80.0);
    }

    #[test]
    fn test_move_ram_hits_every_vehicle_in_range() {
        let mut doc = arena();
        place(&mut doc, "a", VehicleType::Commando, 100.0, 100.0);
        place(&mut doc, "b", VehicleType::Cj2a, 125.0, 120.0);
        place(&mut doc, "c", VehicleType::Cj2a, 125.0, 80.0);
        place(&mut doc, "d", VehicleType::Cj2a, 250.0, 250.0);

        let out = move_vehicle(&mut doc, "a", Direction::Right, now()).unwrap();

        assert_eq!(out.health, 100.0 - 6.0 - 6.0);
        assert_eq!(vehicle(&doc, "b").health, 105.0);
        assert_eq!(vehicle(&doc, "c").health, 105.0);
        assert_eq!(vehicle(&doc, "d").health, 120.0);
        // Pushed straight away from the mover's centre
        assert_eq!(vehicle(&doc, "b").position, Vec2::new(125.0, 135.0));
        assert_eq!(vehicle(&doc, "c").position, Vec2::new(125.0, 65.0));
    }

    #[test]
    fn test_move_ram_coincident_pushes_along_travel() {
        let mut doc = arena();
        place(&mut doc, "a", VehicleType::Commando, 100.0, 100.0);
        place(&mut doc, "b", VehicleType::Commando, 125.0, 100.0);

        move_vehicle(&mut doc, "a", Direction::Right, now()).unwrap();
        assert_eq!(vehicle(&doc, "b").position, Vec2::new(140.0, 100.0));
    }

    #[test]
    fn test_move_ram_hits_wrecks() {
        let mut doc = arena();
        place(&mut doc, "a", VehicleType::Commando, 100.0, 100.0);
        place(&mut doc, "b", VehicleType::Commando, 300.0, 250.0);
        place(&mut doc, "wreck", VehicleType::Commando, 130.0, 100.0);
        doc.vehicles[2].health = -5.0;

        let out = move_vehicle(&mut doc, "a", Direction::Right, now()).unwrap();
        assert_eq!(vehicle(&doc, "wreck").health, -20.0);
        assert_eq!(out.health, 92.5);
    }

    #[test]
    fn test_move_obstacle_penalty_and_bounce() {
        let mut doc = arena();
        doc.obstacles = vec![Rect::new(130.0, 90.0, 20.0, 20.0)];
        place(&mut doc, "a", VehicleType::Commando, 100.0, 100.0);
        place(&mut doc, "b", VehicleType::Commando, 300.0, 250.0);

        let out = move_vehicle(&mut doc, "a", Direction::Right, now()).unwrap();

        // Landed at 125 inside the padded box, bounced back 1.5 * 25
        assert_eq!(out.health, 95.0);
        assert_eq!(out.position, Vec2::new(87.5, 100.0));
        assert_eq!(doc.round, 1);
    }

    #[test]
    fn test_move_overlapping_obstacles_stack() {
        let mut doc = arena();
        doc.obstacles = vec![
            Rect::new(130.0, 90.0, 20.0, 20.0),
            Rect::new(120.0, 80.0, 10.0, 10.0),
        ];
        place(&mut doc, "a", VehicleType::Commando, 100.0, 100.0);
        place(&mut doc, "b", VehicleType::Commando, 300.0, 250.0);

        let out = move_vehicle(&mut doc, "a", Direction::Right, now()).unwrap();

        assert_eq!(out.health, 90.0);
        assert_eq!(out.position, Vec2::new(50.0, 100.0));
    }

    #[test]
    fn test_move_unknown_vehicle_changes_nothing() {
        let mut doc = arena();
        doc.coins.push(Coin { position: Vec2::new(150.0, 150.0), value: 10 });
        place(&mut doc, "a", VehicleType::Commando, 100.0, 100.0);
        place(&mut doc, "b", VehicleType::Commando, 300.0, 250.0);
        let before = doc.clone();

        let err = move_vehicle(&mut doc, "nope", Direction::Up, now()).unwrap_err();
        assert_eq!(err, ActionError::VehicleNotFound("nope".into()));
        assert_eq!(doc, before);
        assert_eq!(doc.to_bytes().unwrap(), before.to_bytes().unwrap());
    }

    #[test]
    fn test_move_destroyed_vehicle_rejected() {
        let mut doc = arena();
        place(&mut doc, "a", VehicleType::Commando, 100.0, 100.0);
        place(&mut doc, "b", VehicleType::Commando, 300.0, 250.0);
        place(&mut doc, "c", VehicleType::Commando, 300.0, 50.0);
        doc.vehicles[0].health = 0.0;
        let before = doc.clone();

        let err = move_vehicle(&mut doc, "a", Direction::Up, now()).unwrap_err();
        assert_eq!(err, ActionError::VehicleDestroyed("a".into()));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_move_requires_active_game() {
        let mut doc = arena();
        place(&mut doc, "a", VehicleType::Commando, 100.0, 100.0);

        doc.status = GameStatus::Waiting;
        let err = move_vehicle(&mut doc, "a", Direction::Up, now()).unwrap_err();
        assert_eq!(err, ActionError::GameNotActive { status: GameStatus::Waiting });

        doc.status = GameStatus::Finished;
        let before = doc.clone();
        let err = move_vehicle(&mut doc, "a", Direction::Up, now()).unwrap_err();
        assert_eq!(err, ActionError::GameNotActive { status: GameStatus::Finished });
        assert_eq!(doc, before);
    }

    // -------------------------------------------------------------------------
    // termination
    // -------------------------------------------------------------------------

    #[test]
    fn test_last_survivor_wins() {
        let mut doc = arena();
        place(&mut doc, "a", VehicleType::Commando, 100.0, 100.0);
        place(&mut doc, "b", VehicleType::Commando, 160.0, 100.0);
        place(&mut doc, "c", VehicleType::Commando, 150.0, 175.0);
        doc.vehicles[1].health = 30.0;
        doc.vehicles[2].health = 30.0;

        // Two boosts take both opponents out; boosts never end the game
        boost(&mut doc, "a", Direction::Right, now()).unwrap();
        assert!(!vehicle(&doc, "b").is_alive());
        boost(&mut doc, "a", Direction::Down, now()).unwrap();
        assert!(!vehicle(&doc, "c").is_alive());
        assert_eq!(doc.status, GameStatus::Active);

        // The next move notices
        let out = move_vehicle(&mut doc, "a", Direction::Left, now()).unwrap();
        let expected = vehicle(&doc, "a").display_name();

        assert_eq!(out.status, GameStatus::Finished);
        assert_eq!(out.winner.as_deref(), Some(expected.as_str()));
        assert_eq!(doc.winner.as_deref(), Some("Driver a (Commando)"));
        assert_eq!(doc.winner_id.as_deref(), Some("a"));
        assert!(doc.awaiting_ledger());
        let result = out.result.unwrap();
        assert_eq!(result.winner_id, "a");
        assert_eq!(result.reason, EndReason::LastSurvivor);
        assert!(out.events.last().unwrap().is_game_end());
    }

    #[test]
    fn test_ram_can_finish_game() {
        let mut doc = arena();
        place(&mut doc, "a", VehicleType::F100, 100.0, 100.0);
        place(&mut doc, "b", VehicleType::Commando, 120.0, 100.0);
        doc.vehicles[1].health = 20.0;

        let out = move_vehicle(&mut doc, "a", Direction::Right, now()).unwrap();

        assert_eq!(out.status, GameStatus::Finished);
        assert_eq!(out.result.unwrap().reason, EndReason::LastSurvivor);
        assert!(out.events.iter().any(|e| matches!(
            e.data,
            GameEventData::VehicleDestroyed { ref vehicle_id } if vehicle_id == "b"
        )));
    }

    #[test]
    fn test_coins_exhausted_most_coins_wins() {
        let mut doc = arena();
        doc.coins = vec![Coin { position: Vec2::new(125.0, 100.0), value: 10 }];
        place(&mut doc, "a", VehicleType::Commando, 300.0, 250.0);
        place(&mut doc, "b", VehicleType::Commando, 100.0, 100.0);
        place(&mut doc, "c", VehicleType::Commando, 50.0, 250.0);
        doc.vehicles[0].coins = 15;
        doc.vehicles[1].coins = 10;

        let out = move_vehicle(&mut doc, "b", Direction::Right, now()).unwrap();

        assert!(doc.coins.is_empty());
        assert_eq!(doc.alive_count(), 3);
        assert_eq!(out.status, GameStatus::Finished);
        let result = out.result.unwrap();
        assert_eq!(result.reason, EndReason::CoinsExhausted);
        assert_eq!(result.winner_id, "b");
    }

    #[test]
    fn test_coin_tie_goes_to_first_joined() {
        let mut doc = arena();
        doc.coins = vec![Coin { position: Vec2::new(125.0, 100.0), value: 5 }];
        place(&mut doc, "first", VehicleType::Cj2a, 300.0, 250.0);
        place(&mut doc, "mover", VehicleType::Commando, 100.0, 100.0);
        doc.vehicles[0].coins = 20;
        doc.vehicles[1].coins = 15;

        let out = move_vehicle(&mut doc, "mover", Direction::Right, now()).unwrap();

        assert_eq!(out.coins, 20);
        assert_eq!(out.result.unwrap().winner_id, "first");
        assert_eq!(doc.winner.as_deref(), Some("Driver first (CJ-2A)"));
    }

    #[test]
    fn test_round_limit() {
        let mut doc = arena();
        place(&mut doc, "a", VehicleType::Commando, 100.0, 100.0);
        place(&mut doc, "b", VehicleType::Commando, 300.0, 250.0);
        doc.vehicles[1].coins = 5;
        doc.round = MAX_ROUNDS - 2;

        let out = move_vehicle(&mut doc, "a", Direction::Down, now()).unwrap();
        assert_eq!(out.status, GameStatus::Active);

        let out = move_vehicle(&mut doc, "a", Direction::Down, now()).unwrap();
        assert_eq!(doc.round, MAX_ROUNDS);
        assert_eq!(out.status, GameStatus::Finished);
        let result = out.result.unwrap();
        assert_eq!(result.reason, EndReason::RoundLimit);
        assert_eq!(result.winner_id, "b");
    }

    #[test]
    fn test_select_winner_all_destroyed() {
        let mut doc = arena();
        place(&mut doc, "a", VehicleType::Commando, 100.0, 100.0);
        place(&mut doc, "b", VehicleType::Commando, 200.0, 100.0);
        doc.vehicles[0].health = -1.0;
        doc.vehicles[1].health = 0.0;
        doc.vehicles[1].coins = 1;

        assert_eq!(check_termination(&doc), None);
        assert_eq!(select_winner(&doc), Some(1));
    }

    // -------------------------------------------------------------------------
    // boost
    // -------------------------------------------------------------------------

    #[test]
    fn test_boost_one_sided() {
        let mut doc = arena();
        doc.coins.push(Coin { position: Vec2::new(150.0, 100.0), value: 10 });
        doc.obstacles = vec![Rect::new(140.0, 90.0, 20.0, 20.0)];
        place(&mut doc, "a", VehicleType::Commando, 100.0, 100.0);
        place(&mut doc, "b", VehicleType::F100, 175.0, 110.0);
        let coins_before = doc.coins.clone();

        let out = boost(&mut doc, "a", Direction::Right, now()).unwrap();

        // Double-length step, facing updated
        assert_eq!(out.position, Vec2::new(150.0, 100.0));
        assert_eq!(vehicle(&doc, "a").angle, 0.0);
        // No recoil, no obstacle penalty, no pickup
        assert_eq!(out.health, 100.0);
        assert_eq!(out.coins, 0);
        assert_eq!(doc.coins, coins_before);
        // Target hit for twice the power, not pushed
        let b = vehicle(&doc, "b");
        assert_eq!(b.health, 120.0);
        assert_eq!(b.position, Vec2::new(175.0, 110.0));
        // No round advance
        assert_eq!(doc.round, 0);
    }

    #[test]
    fn test_boost_allowed_for_destroyed_vehicle() {
        let mut doc = arena();
        place(&mut doc, "a", VehicleType::Commando, 100.0, 100.0);
        place(&mut doc, "b", VehicleType::Commando, 300.0, 250.0);
        place(&mut doc, "c", VehicleType::Commando, 50.0, 250.0);
        doc.vehicles[0].health = -10.0;

        let out = boost(&mut doc, "a", Direction::Down, now()).unwrap();
        assert_eq!(out.position, Vec2::new(100.0, 150.0));
        assert_eq!(out.health, -10.0);
    }

    #[test]
    fn test_boost_never_terminates() {
        let mut doc = arena();
        doc.coins.clear();
        doc.round = MAX_ROUNDS;
        place(&mut doc, "a", VehicleType::Commando, 100.0, 100.0);
        place(&mut doc, "b", VehicleType::Commando, 140.0, 100.0);
        doc.vehicles[1].health = 10.0;

        let out = boost(&mut doc, "a", Direction::Right, now()).unwrap();

        assert_eq!(doc.status, GameStatus::Active);
        assert!(doc.winner.is_none());
        assert!(out.events.iter().all(|e| !e.is_game_end()));
        assert!(!vehicle(&doc, "b").is_alive());
    }

    #[test]
    fn test_boost_unknown_vehicle_changes_nothing() {
        let mut doc = arena();
        place(&mut doc, "a", VehicleType::Commando, 100.0, 100.0);
        place(&mut doc, "b", VehicleType::Commando, 300.0, 250.0);
        let before = doc.clone();

        let err = boost(&mut doc, "ghost", Direction::Left, now()).unwrap_err();
        assert_eq!(err, ActionError::VehicleNotFound("ghost".into()));
        assert_eq!(doc, before);
    }

    // -------------------------------------------------------------------------
    // properties
    // -------------------------------------------------------------------------

    fn any_direction() -> impl Strategy<Value = Direction> {
        prop::sample::select(Direction::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_positions_stay_in_arena(
            seed in any::<u64>(),
            actions in prop::collection::vec((0usize..4, any_direction(), any::<bool>()), 1..60),
        ) {
            let mut rng = DeterministicRng::new(seed);
            let mut doc = GameDocument::new(now(), &mut rng);
            let mut ids = Vec::new();
            for (i, vt) in VehicleType::ALL.iter().cycle().take(4).enumerate() {
                let out = join(&mut doc, *vt, &format!("p{}", i), now(), &mut rng).unwrap();
                ids.push(out.vehicle.id);
            }

            for (who, dir, is_boost) in actions {
                let rounds_before = doc.round;
                let coins_before = doc.coins.len();
                let res = if is_boost {
                    boost(&mut doc, &ids[who], dir, now()).map(|_| ())
                } else {
                    move_vehicle(&mut doc, &ids[who], dir, now()).map(|_| ())
                };
                if res.is_err() {
                    prop_assert_eq!(doc.round, rounds_before);
                    continue;
                }
                for v in &doc.vehicles {
                    prop_assert!(v.position.is_in_arena(), "{:?} left the arena", v.position);
                }
                prop_assert!(doc.round >= rounds_before);
                prop_assert!(doc.coins.len() <= coins_before);
                if doc.is_finished() {
                    prop_assert!(doc.winner.is_some());
                    break;
                }
            }
        }
    }
}
