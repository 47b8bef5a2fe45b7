//! Simulation core shared by server and client.
//!
//! The server resolves inputs through [`rules::apply_command`] and clients
//! run the exact same code for prediction, so a reconciliation replay of
//! unacknowledged inputs reproduces the server's positions bit for bit.

pub mod config;
pub mod input;
pub mod player;
pub mod protocol;
pub mod rules;
pub mod world;

pub use config::GameConfig;
pub use input::{InputCommand, Symbol};
pub use player::{Facing, Player, PlayerEvent, PlayerState, PlayerTimers, Score, Team};
pub use protocol::{MatchPhase, MatchTimer, Packet, PlayerView, Snapshot, WorldView};
pub use rules::{apply_command, quantize, tile_walkable, OtherPlayer, SideEffect};
pub use world::{Cell, Tile, TileWorld, Vec2};
