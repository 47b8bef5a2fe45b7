//! # Game Server Library
//!
//! Authoritative server for a two-team, top-down hide and seek game. The
//! server owns every match: it resolves client inputs against the tile
//! world, enforces the team rules (gold, traps, catches, jail) and
//! broadcasts fog-filtered snapshots that clients reconcile against.
//!
//! ## Architecture
//!
//! A single-threaded event loop drives everything. Async tasks feed it:
//! - **Network Receiver**: continuously listens for incoming datagrams
//! - **Network Sender**: drains the outgoing packet queue, optionally
//!   delaying each packet to simulate lag
//! - **Timeout Checker**: reaps sessions that have gone silent
//!
//! The loop itself multiplexes incoming packets with two clocks: a physics
//! tick that resolves buffered inputs in sequence order, and a slower
//! broadcast tick that advances match timers and sends per-recipient
//! snapshots. Inputs are acknowledged by sequence number so clients can
//! discard confirmed predictions.
//!
//! ## Module Organization
//!
//! - [`session`]: client session registry, input buffering and timeouts
//! - [`game`]: matches, rosters, the authoritative simulation
//! - [`view`]: fog of war and per-recipient snapshot construction
//! - [`network`]: UDP plumbing and the main loop

pub mod game;
pub mod network;
pub mod session;
pub mod view;
