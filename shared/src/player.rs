//! Player data shared between server simulation and client prediction.

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::world::Vec2;

/// The two teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Hider,
    Seeker,
}

/// Lifecycle state of a player within a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    /// Connected to the server, not yet in a match.
    Connected,
    /// In a match roster, waiting for the match to start.
    Pending,
    /// Declared ready to start.
    Ready,
    /// Playing and free to move.
    InGame,
    /// Caught and held at the jail tile.
    Jailed,
    Disconnected,
}

/// One-shot gameplay event, reset after each broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerEvent {
    #[default]
    None,
    GrabGold,
    Run,
    Trapped,
    PlantTrap,
    Catch,
    Caught,
}

/// Facing direction, updated from the last movement key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    #[serde(rename = "u")]
    Up,
    #[default]
    #[serde(rename = "d")]
    Down,
    #[serde(rename = "l")]
    Left,
    #[serde(rename = "r")]
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    /// Points from the team objective (gold harvested or hiders caught).
    pub team_points: u32,
    pub times_caught: u32,
    /// Overall score, floored at zero.
    pub total: u32,
}

/// Countdown timers in milliseconds, ticked by the server broadcast loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerTimers {
    /// Remaining slow debuff from a sprung trap.
    pub trap: u64,
    /// Remaining jail time.
    pub jail: u64,
    /// Remaining speed burst.
    pub burst: u64,
    /// Remaining speed burst cooldown.
    pub burst_cooldown: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub client_id: u64,
    pub name: String,
    pub team: Team,
    /// Top-left corner of the hitbox in world units.
    pub position: Vec2,
    /// Hitbox side length.
    pub extent: f32,
    /// Current movement speed in world units per second.
    pub speed: f32,
    pub state: PlayerState,
    pub event: PlayerEvent,
    pub score: Score,
    pub timers: PlayerTimers,
    /// Traps a seeker can still plant.
    pub traps_left: u32,
    pub facing: Facing,
    /// Sequence of the last input applied by the server.
    pub acked_input: u32,
}

impl Player {
    pub fn new(client_id: u64, name: String, team: Team, cfg: &GameConfig) -> Self {
        Self {
            client_id,
            name,
            team,
            position: Vec2::default(),
            extent: cfg.player_extent(),
            speed: cfg.base_speed,
            state: PlayerState::Pending,
            event: PlayerEvent::None,
            score: Score::default(),
            timers: PlayerTimers::default(),
            traps_left: if team == Team::Seeker {
                cfg.seeker_traps
            } else {
                0
            },
            facing: Facing::default(),
            acked_input: 0,
        }
    }

    /// Advances the per-player countdown timers by `elapsed` milliseconds
    /// and undoes their effects on expiry.
    ///
    /// Returns true when the jail timer just ran out and the player should
    /// be respawned by the caller.
    pub fn tick_timers(&mut self, elapsed: u64, cfg: &GameConfig) -> bool {
        if self.timers.burst_cooldown > 0 {
            self.timers.burst_cooldown = self.timers.burst_cooldown.saturating_sub(elapsed);
        }

        if self.timers.burst > 0 {
            self.timers.burst = self.timers.burst.saturating_sub(elapsed);
            if self.timers.burst == 0 && self.speed > cfg.base_speed {
                self.speed /= cfg.burst_speed_factor;
            }
        }

        if self.timers.trap > 0 {
            self.timers.trap = self.timers.trap.saturating_sub(elapsed);
            if self.timers.trap == 0 {
                self.speed = cfg.base_speed;
            }
        }

        if self.state == PlayerState::Jailed {
            self.timers.jail = self.timers.jail.saturating_sub(elapsed);
            if self.timers.jail == 0 {
                self.state = PlayerState::InGame;
                return true;
            }
        }

        false
    }

    pub fn is_in_game(&self) -> bool {
        self.state == PlayerState::InGame
    }
}
