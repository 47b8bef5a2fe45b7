//! Game tuning values shared by server simulation and client prediction.
//!
//! Both sides must be constructed from the same `GameConfig` or their
//! movement resolution diverges on the first tick.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Side length of a (square) tile in world units.
    pub tile_size: f32,
    /// Server physics tick period in milliseconds.
    pub physics_tick_ms: u64,
    /// Server broadcast tick period in milliseconds.
    pub broadcast_tick_ms: u64,
    /// Visibility radius in tiles (diamond-shaped, Manhattan-bounded).
    pub fog_radius: u32,
    /// Base movement speed in world units per second.
    pub base_speed: f32,
    /// Multiplicative speed penalty applied per sprung trap.
    pub trap_speed_penalty: f32,
    /// Multiplicative speed factor while a speed burst is active.
    pub burst_speed_factor: f32,
    /// Duration of the trap slow debuff in milliseconds.
    pub trap_duration_ms: u64,
    /// Jail time after being caught, in milliseconds.
    pub jail_duration_ms: u64,
    /// Duration of a speed burst in milliseconds.
    pub burst_duration_ms: u64,
    /// Cooldown between speed bursts in milliseconds.
    pub burst_cooldown_ms: u64,
    /// Trap inventory a seeker starts the match with.
    pub seeker_traps: u32,
    /// Total gold to harvest before the match ends.
    pub total_gold: u32,
    /// Number of gold tiles kept on the map at any time.
    pub concurrent_gold: u32,
    /// Minimum tile distance between two gold spawns.
    pub gold_spacing: u32,
    /// Score awarded for harvesting one gold.
    pub score_gold: u32,
    /// Score awarded for catching a hider.
    pub score_catch: u32,
    /// Score removed from a hider on being caught (floored at zero).
    pub score_caught: u32,
    /// Match duration in milliseconds.
    pub match_duration_ms: u64,
    /// Pre-match countdown in milliseconds.
    pub countdown_ms: u64,
    /// Maximum roster size per match.
    pub max_players: usize,
    /// Upper bound on retained unacknowledged input commands client-side.
    pub max_predicted_inputs: usize,
    /// When true a match will not start without at least one player per team.
    pub require_balanced_teams: bool,
}

impl GameConfig {
    /// Hitbox side length of a player (half a tile).
    pub fn player_extent(&self) -> f32 {
        self.tile_size / 2.0
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tile_size: 40.0,
            physics_tick_ms: 45,
            broadcast_tick_ms: 100,
            fog_radius: 3,
            base_speed: 75.0,
            trap_speed_penalty: 0.75,
            burst_speed_factor: 1.5,
            trap_duration_ms: 10_000,
            jail_duration_ms: 20_000,
            burst_duration_ms: 10_000,
            burst_cooldown_ms: 40_000,
            seeker_traps: 5,
            total_gold: 20,
            concurrent_gold: 4,
            gold_spacing: 7,
            score_gold: 1,
            score_catch: 1,
            score_caught: 2,
            match_duration_ms: 300_000,
            countdown_ms: 6_000,
            max_players: 10,
            max_predicted_inputs: 100,
            require_balanced_teams: false,
        }
    }
}
