//! Client session management and input queuing.
//!
//! Sessions track connected clients (address, match membership, liveness)
//! and buffer their sequenced inputs until the physics tick drains them.
//! Inputs are kept sorted by sequence so out-of-order datagrams are applied
//! in the order the client produced them, and stale sequences are refused
//! at the door.

use log::info;
use shared::InputCommand;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

const SESSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Most inputs one session may hold between drains. Matches the client's
/// prediction buffer, so anything past it could never be acknowledged
/// anyway.
const MAX_PENDING_INPUTS: usize = 100;

/// One connected client.
#[derive(Debug)]
pub struct Session {
    pub client_id: u64,
    pub addr: SocketAddr,
    /// Match the client joined, zero until assigned.
    pub match_id: u64,
    /// Last time any packet arrived from this client.
    pub last_seen: Instant,
    /// Highest input sequence the simulation has applied.
    pub last_applied_input: u32,
    /// Buffered inputs waiting for the next physics tick, sorted by sequence.
    pub pending_inputs: Vec<InputCommand>,
}

impl Session {
    pub fn new(client_id: u64, addr: SocketAddr) -> Self {
        Self {
            client_id,
            addr,
            match_id: 0,
            last_seen: Instant::now(),
            last_applied_input: 0,
            pending_inputs: Vec::new(),
        }
    }

    /// Buffers an input unless its sequence was already applied or is
    /// already buffered (UDP can duplicate datagrams). The buffer is
    /// bounded: past the cap the oldest command is evicted.
    pub fn queue_input(&mut self, command: InputCommand) {
        self.last_seen = Instant::now();
        if command.sequence <= self.last_applied_input {
            return;
        }
        if self
            .pending_inputs
            .iter()
            .any(|c| c.sequence == command.sequence)
        {
            return;
        }
        self.pending_inputs.push(command);
        // Sort by sequence to handle out-of-order datagram delivery.
        self.pending_inputs.sort_by_key(|c| c.sequence);
        if self.pending_inputs.len() > MAX_PENDING_INPUTS {
            self.pending_inputs.remove(0);
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// All connected clients, indexed by id.
pub struct SessionManager {
    sessions: HashMap<u64, Session>,
    next_client_id: u64,
    max_sessions: usize,
}

impl SessionManager {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            next_client_id: 1,
            max_sessions,
        }
    }

    /// Registers a new client. Returns its id, or `None` at capacity.
    pub fn add_session(&mut self, addr: SocketAddr) -> Option<u64> {
        if self.sessions.len() >= self.max_sessions {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("client {} connected from {}", client_id, addr);
        self.sessions.insert(client_id, Session::new(client_id, addr));
        Some(client_id)
    }

    pub fn remove_session(&mut self, client_id: u64) -> bool {
        if let Some(session) = self.sessions.remove(&client_id) {
            info!("client {} disconnected", session.client_id);
            true
        } else {
            false
        }
    }

    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<u64> {
        self.sessions
            .iter()
            .find(|(_, s)| s.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn addr_of(&self, client_id: u64) -> Option<SocketAddr> {
        self.sessions.get(&client_id).map(|s| s.addr)
    }

    pub fn match_of(&self, client_id: u64) -> Option<u64> {
        self.sessions.get(&client_id).map(|s| s.match_id)
    }

    pub fn set_match(&mut self, client_id: u64, match_id: u64) {
        if let Some(session) = self.sessions.get_mut(&client_id) {
            session.match_id = match_id;
        }
    }

    /// Marks the client alive without queueing anything.
    pub fn touch(&mut self, client_id: u64) {
        if let Some(session) = self.sessions.get_mut(&client_id) {
            session.last_seen = Instant::now();
        }
    }

    /// Buffers an input for the client. Returns false for unknown ids.
    pub fn queue_input(&mut self, client_id: u64, command: InputCommand) -> bool {
        if let Some(session) = self.sessions.get_mut(&client_id) {
            session.queue_input(command);
            true
        } else {
            false
        }
    }

    /// Drains the client's buffered inputs in sequence order.
    pub fn take_inputs(&mut self, client_id: u64) -> Vec<InputCommand> {
        self.sessions
            .get_mut(&client_id)
            .map(|s| std::mem::take(&mut s.pending_inputs))
            .unwrap_or_default()
    }

    /// Records that the simulation applied everything up to `sequence`.
    pub fn mark_applied(&mut self, client_id: u64, sequence: u32) {
        if let Some(session) = self.sessions.get_mut(&client_id) {
            session.last_applied_input = session.last_applied_input.max(sequence);
        }
    }

    pub fn last_applied(&self, client_id: u64) -> u32 {
        self.sessions
            .get(&client_id)
            .map(|s| s.last_applied_input)
            .unwrap_or(0)
    }

    /// Removes sessions that went silent, returning their ids.
    pub fn check_timeouts(&mut self) -> Vec<u64> {
        let timed_out: Vec<u64> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.is_timed_out(SESSION_TIMEOUT))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            self.remove_session(*client_id);
        }
        timed_out
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
