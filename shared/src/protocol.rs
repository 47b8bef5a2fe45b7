//! Wire protocol: every datagram carries one JSON document tagged by its
//! `header` field.

use serde::{Deserialize, Serialize};

use crate::input::InputCommand;
use crate::player::{Facing, PlayerEvent, PlayerState, PlayerTimers, Score, Team};
use crate::world::{Cell, Vec2};

/// Match lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    Created,
    Countdown,
    Running,
    Over,
}

/// Match clocks in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchTimer {
    /// Remaining pre-match countdown.
    pub countdown_ms: u64,
    /// Remaining match time.
    pub remaining_ms: u64,
}

/// The grid as one player is allowed to see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldView {
    pub rows: usize,
    pub cols: usize,
    pub grid: Vec<Vec<Cell>>,
}

/// One player as seen by the snapshot recipient. Simulation fields are
/// absent for players hidden by fog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub client_id: u64,
    pub name: String,
    pub team: Team,
    pub state: PlayerState,
    pub score: Score,
    pub fogged: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub position: Option<Vec2>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_position: Option<Vec2>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub acked_input: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub event: Option<PlayerEvent>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timers: Option<PlayerTimers>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub traps_left: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub facing: Option<Facing>,
}

/// Per-recipient state broadcast, already filtered by fog of war.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub match_id: u64,
    pub phase: MatchPhase,
    /// Server clock in seconds.
    pub server_time: f64,
    /// Absent outside the running phase.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub world: Option<WorldView>,
    pub timer: MatchTimer,
    pub players: Vec<PlayerView>,
    /// Gold harvested so far.
    pub harvested: u32,
}

/// Every message exchanged between client and server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "header", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Packet {
    /// Client requests to join a match.
    Join { name: String },
    /// Server reply with the assigned ids.
    Joined {
        client_id: u64,
        match_id: u64,
        team: Team,
    },
    /// Client declares itself ready to start.
    Ready { match_id: u64, client_id: u64 },
    /// Client asks to join `team` while the match has not started.
    ChangeTeam {
        match_id: u64,
        client_id: u64,
        team: Team,
    },
    /// Chat relay. `team` of `None` reaches the whole match.
    Chat {
        match_id: u64,
        client_id: u64,
        team: Option<Team>,
        text: String,
    },
    /// Sequenced input batch.
    Input {
        match_id: u64,
        client_id: u64,
        command: InputCommand,
    },
    /// Liveness probe, answered with `Pong`.
    Ping,
    Pong {
        connected_clients: usize,
        running_matches: usize,
    },
    /// Regular state broadcast.
    Update(Snapshot),
    /// Final broadcast of a finished match.
    #[serde(rename = "GAMEOVER")]
    GameOver(Snapshot),
}

impl Packet {
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> serde_json::Result<Packet> {
        serde_json::from_slice(bytes)
    }
}
