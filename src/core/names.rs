//! Display Names
//!
//! Maps an opaque proof seed to a stable, human-readable driver name.
//!
//! The hash is the classic `h = h * 31 + c` fold over UTF-16 code units
//! with 32-bit wraparound. Names already stored in the leaderboard were
//! produced by it, so the arithmetic must stay bit-for-bit identical.

/// Adjectives, indexed by `|hash| % 16`.
pub const ADJECTIVES: [&str; 16] = [
    "Swift", "Rusty", "Iron", "Turbo", "Dusty", "Rapid", "Savage", "Mighty",
    "Silent", "Blazing", "Crimson", "Golden", "Shadow", "Thunder", "Wild", "Steel",
];

/// Nouns, indexed by `(|hash| >> 8) % 16`.
pub const NOUNS: [&str; 16] = [
    "Driver", "Racer", "Jeep", "Raider", "Ranger", "Hunter", "Rider", "Trucker",
    "Scout", "Marauder", "Bandit", "Nomad", "Wrangler", "Outlaw", "Pilot", "Warrior",
];

/// Fold a seed into a signed 32-bit hash.
#[inline]
pub fn seed_hash(seed: &str) -> i32 {
    seed.encode_utf16()
        .fold(0i32, |acc, unit| acc.wrapping_mul(31).wrapping_add(unit as i32))
}

/// Generate the display name for a proof seed.
///
/// ```
/// use coin_arena::core::names::generate_name;
///
/// assert_eq!(generate_name("abc"), "Iron Scout #28");
/// assert_eq!(generate_name("abc"), generate_name("abc"));
/// ```
pub fn generate_name(seed: &str) -> String {
    // i32::MIN has no positive i32 counterpart; unsigned_abs gives 2^31.
    let hash = seed_hash(seed).unsigned_abs();

    let adjective = ADJECTIVES[(hash % ADJECTIVES.len() as u32) as usize];
    let noun = NOUNS[((hash >> 8) % NOUNS.len() as u32) as usize];
    let suffix = hash % 99 + 1;

    format!("{} {} #{}", adjective, noun, suffix)
}
