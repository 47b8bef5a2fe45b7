//! Sequenced input commands sent from clients and replayed during
//! reconciliation.

use serde::{Deserialize, Serialize};

/// One pressed key within an input command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Symbol {
    #[serde(rename = "l")]
    Left,
    #[serde(rename = "r")]
    Right,
    #[serde(rename = "u")]
    Up,
    #[serde(rename = "d")]
    Down,
    /// Team special: speed burst for hiders, trap planting for seekers.
    #[serde(rename = "s")]
    Special,
}

impl Symbol {
    /// Unit direction for movement symbols, none for specials.
    pub fn direction(&self) -> Option<(f32, f32)> {
        match self {
            Symbol::Left => Some((-1.0, 0.0)),
            Symbol::Right => Some((1.0, 0.0)),
            Symbol::Up => Some((0.0, -1.0)),
            Symbol::Down => Some((0.0, 1.0)),
            Symbol::Special => None,
        }
    }
}

/// A batch of keys sampled during one client frame.
///
/// `dt` is the frame duration in seconds and `speed` the movement speed the
/// client predicted with. The server resolves movement with its own
/// authoritative speed; the captured value is only used when the client
/// replays the command after a reconciliation rebase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputCommand {
    pub sequence: u32,
    pub dt: f32,
    pub speed: f32,
    pub symbols: Vec<Symbol>,
}
