//! # Game Client Library
//!
//! Client-side implementation for the hide and seek game: input
//! sequencing, prediction, reconciliation and a headless bot driver.
//!
//! ## Architecture Overview
//!
//! ### Client-Side Prediction
//! The client keeps a predicted copy of its own player and the tile grid
//! and resolves every command locally through the same shared engine the
//! server runs, so movement never waits on the network.
//!
//! ### Server Reconciliation
//! Snapshots carry the last acknowledged input sequence. Confirmed
//! commands are dropped from the prediction buffer, the player is rebased
//! onto the authoritative position, and the unconfirmed tail is replayed
//! on top.
//!
//! ### Fog of War
//! Snapshots arrive already filtered: enemies out of sight come as stubs
//! without positions, and hiders receive a grid with traps masked out.
//!
//! ## Module Organization
//!
//! - [`game`]: predicted state, reconciliation, remote interpolation
//! - [`input`]: sequence numbering for outgoing commands
//! - [`path`]: tile pathfinding for point-and-click style movement
//! - [`network`]: the connection and the bot's main loop

pub mod game;
pub mod input;
pub mod network;
pub mod path;
