//! Authoritative match simulation.
//!
//! `GameServer` owns every match on the server. The physics tick drains
//! buffered inputs through the shared engine and post-processes the side
//! effects only the server may apply (scores, jailing, gold respawn). The
//! broadcast tick advances the clocks and produces per-recipient snapshots.

use log::{debug, info};
use rand::Rng;
use shared::{
    apply_command, Cell, GameConfig, MatchPhase, MatchTimer, OtherPlayer, Packet, Player,
    PlayerEvent, PlayerState, SideEffect, Team, Tile, TileWorld, Vec2,
};
use std::collections::HashMap;

use crate::session::SessionManager;
use crate::view::build_snapshot;

/// One match and everything it simulates.
pub struct Match {
    pub match_id: u64,
    pub phase: MatchPhase,
    pub world: TileWorld,
    pub players: Vec<Player>,
    pub harvested: u32,
    pub timer: MatchTimer,
    /// Positions at the previous broadcast, for client-side interpolation.
    pub last_positions: HashMap<u64, Vec2>,
}

impl Match {
    fn new(match_id: u64, cfg: &GameConfig) -> Self {
        Self {
            match_id,
            phase: MatchPhase::Created,
            world: TileWorld::standard(cfg.tile_size),
            players: Vec::new(),
            harvested: 0,
            timer: MatchTimer {
                countdown_ms: 0,
                remaining_ms: cfg.match_duration_ms,
            },
            last_positions: HashMap::new(),
        }
    }

    pub fn player(&self, client_id: u64) -> Option<&Player> {
        self.players.iter().find(|p| p.client_id == client_id)
    }

    pub fn player_mut(&mut self, client_id: u64) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.client_id == client_id)
    }

    fn count_team(&self, team: Team) -> usize {
        self.players.iter().filter(|p| p.team == team).count()
    }

    /// Teleports a hider to the jail tile and starts their jail time.
    fn jail(&mut self, client_id: u64, cfg: &GameConfig) {
        let jail_center = self
            .world
            .jail_tile()
            .map(|t| self.world.tile_center(t))
            .unwrap_or_default();

        if let Some(hider) = self.player_mut(client_id) {
            if hider.state == PlayerState::Jailed {
                return;
            }
            hider.position = Vec2::new(
                jail_center.x - hider.extent / 2.0,
                jail_center.y - hider.extent / 2.0,
            );
            hider.score.total = hider.score.total.saturating_sub(cfg.score_caught);
            hider.score.times_caught += 1;
            hider.timers.jail = cfg.jail_duration_ms;
            hider.state = PlayerState::Jailed;
        }
    }

    /// Awards the catch to a seeker.
    fn reward_catch(&mut self, client_id: u64, cfg: &GameConfig) {
        if let Some(seeker) = self.player_mut(client_id) {
            seeker.score.team_points += 1;
            seeker.score.total += cfg.score_catch;
        }
    }

    /// Applies the server-only consequences of one resolved command.
    fn apply_effects(&mut self, mover_idx: usize, effects: Vec<SideEffect>, cfg: &GameConfig) {
        for effect in effects {
            match effect {
                SideEffect::GoldGrabbed { .. } => {
                    let mover = &mut self.players[mover_idx];
                    mover.score.team_points += cfg.score_gold;
                    mover.score.total += cfg.score_gold;
                    self.harvested += 1;
                    if self.harvested <= cfg.total_gold - cfg.concurrent_gold {
                        spawn_gold(&mut self.world, cfg);
                    }
                }
                SideEffect::CaughtHider { hider } => {
                    let catcher = self.players[mover_idx].client_id;
                    self.jail(hider, cfg);
                    self.reward_catch(catcher, cfg);
                }
                SideEffect::CaughtBySeeker { seeker } => {
                    let me = self.players[mover_idx].client_id;
                    self.jail(me, cfg);
                    self.reward_catch(seeker, cfg);
                }
                // Already applied in place by the shared engine.
                SideEffect::TrapSprung { .. }
                | SideEffect::TrapPlanted { .. }
                | SideEffect::SpeedBurst => {}
            }
        }
    }

    fn is_over(&self, cfg: &GameConfig) -> bool {
        self.phase == MatchPhase::Running
            && (self.harvested >= cfg.total_gold || self.timer.remaining_ms == 0)
    }
}

/// Places one gold on a random empty tile, keeping a clearance window free
/// of other gold. Gives up on the clearance after a bounded number of tries
/// and places anyway.
fn spawn_gold(world: &mut TileWorld, cfg: &GameConfig) {
    let empty = world.tiles_with(Cell::Empty);
    if empty.is_empty() {
        return;
    }

    let mut rng = rand::thread_rng();
    let mut choice = empty[rng.gen_range(0..empty.len())];
    for _ in 0..1000 {
        choice = empty[rng.gen_range(0..empty.len())];
        if gold_clear_around(world, choice, cfg.gold_spacing) {
            break;
        }
    }
    world.set_cell(choice, Cell::Gold);
}

fn gold_clear_around(world: &TileWorld, tile: Tile, spacing: u32) -> bool {
    let spacing = spacing as usize;
    let row_end = (tile.row + spacing).min(world.rows - 1);
    let col_end = (tile.col + spacing).min(world.cols - 1);
    for row in tile.row.saturating_sub(spacing)..=row_end {
        for col in tile.col.saturating_sub(spacing)..=col_end {
            if world.cell(Tile::new(row, col)) == Cell::Gold {
                return false;
            }
        }
    }
    true
}

/// Spawn point by team: hiders appear in a random cave, seekers at the
/// fixed tile next to the top-left corner.
fn spawn_position(world: &TileWorld, team: Team) -> Vec2 {
    let seeker_spawn = Vec2::new(world.tile_size + 5.0, world.tile_size + 5.0);
    match team {
        Team::Hider => {
            let caves = world.tiles_with(Cell::Cave);
            if caves.is_empty() {
                return seeker_spawn;
            }
            let tile = caves[rand::thread_rng().gen_range(0..caves.len())];
            let origin = world.tile_origin(tile);
            Vec2::new(origin.x + 5.0, origin.y + 5.0)
        }
        Team::Seeker => seeker_spawn,
    }
}

/// All matches hosted by this server.
pub struct GameServer {
    cfg: GameConfig,
    pub matches: Vec<Match>,
    next_match_id: u64,
    /// Server clock in seconds, advanced by the broadcast tick.
    pub local_time: f64,
}

impl GameServer {
    pub fn new(cfg: GameConfig) -> Self {
        Self {
            cfg,
            matches: Vec::new(),
            next_match_id: 1,
            local_time: 0.0,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.cfg
    }

    pub fn find_match(&self, match_id: u64) -> Option<&Match> {
        self.matches.iter().find(|m| m.match_id == match_id)
    }

    pub fn find_match_mut(&mut self, match_id: u64) -> Option<&mut Match> {
        self.matches.iter_mut().find(|m| m.match_id == match_id)
    }

    pub fn running_matches(&self) -> usize {
        self.matches
            .iter()
            .filter(|m| m.phase == MatchPhase::Running)
            .count()
    }

    /// Puts a player into the first open match, creating one if needed.
    /// The thinner team gets the newcomer, hiders first on a tie.
    pub fn add_player(&mut self, client_id: u64, name: String) -> (u64, Team) {
        let cfg = self.cfg.clone();
        let max_players = cfg.max_players;

        let has_open = self
            .matches
            .iter()
            .any(|m| m.phase == MatchPhase::Created && m.players.len() < max_players);
        if !has_open {
            let match_id = self.next_match_id;
            self.next_match_id += 1;
            info!("match {} created", match_id);
            self.matches.push(Match::new(match_id, &cfg));
        }

        let m = self
            .matches
            .iter_mut()
            .find(|m| m.phase == MatchPhase::Created && m.players.len() < max_players)
            .unwrap_or_else(|| unreachable!("an open match exists"));

        let team = if m.count_team(Team::Hider) <= m.count_team(Team::Seeker) {
            Team::Hider
        } else {
            Team::Seeker
        };

        info!(
            "player {} ({}) joins match {} as {:?}",
            client_id, name, m.match_id, team
        );
        m.players.push(Player::new(client_id, name, team, &cfg));
        (m.match_id, team)
    }

    /// Removes a player from whichever match holds them. An emptied match
    /// is marked over and reaped at the next broadcast.
    pub fn remove_player(&mut self, client_id: u64) {
        for m in &mut self.matches {
            let before = m.players.len();
            m.players.retain(|p| p.client_id != client_id);
            if m.players.len() < before {
                m.last_positions.remove(&client_id);
                info!("player {} removed from match {}", client_id, m.match_id);
                if m.players.is_empty() {
                    m.phase = MatchPhase::Over;
                }
                return;
            }
        }
    }

    pub fn set_ready(&mut self, match_id: u64, client_id: u64) {
        if let Some(player) = self
            .find_match_mut(match_id)
            .and_then(|m| m.player_mut(client_id))
        {
            if player.state == PlayerState::Pending {
                player.state = PlayerState::Ready;
            }
        }
    }

    /// Moves the player to the requested team. Honored only before
    /// readying up and while that side has room; asking for the current
    /// team is a no-op, so duplicated datagrams are harmless.
    pub fn change_team(&mut self, match_id: u64, client_id: u64, target: Team) {
        let cfg = self.cfg.clone();
        let Some(m) = self.find_match_mut(match_id) else {
            return;
        };
        if m.phase != MatchPhase::Created {
            return;
        }
        let Some(player) = m.player(client_id) else {
            return;
        };
        if player.state != PlayerState::Pending || player.team == target {
            return;
        }
        if m.count_team(target) >= cfg.max_players / 2 {
            return;
        }
        if let Some(player) = m.player_mut(client_id) {
            player.team = target;
            player.traps_left = if target == Team::Seeker {
                cfg.seeker_traps
            } else {
                0
            };
        }
    }

    fn ready_to_start(&self, m: &Match) -> bool {
        if m.players.is_empty() {
            return false;
        }
        if !m.players.iter().all(|p| p.state == PlayerState::Ready) {
            return false;
        }
        if self.cfg.require_balanced_teams
            && (m.count_team(Team::Hider) == 0 || m.count_team(Team::Seeker) == 0)
        {
            return false;
        }
        true
    }

    fn begin_running(m: &mut Match, cfg: &GameConfig) {
        for player in &mut m.players {
            player.state = PlayerState::InGame;
            player.position = spawn_position(&m.world, player.team);
            player.speed = cfg.base_speed;
            player.timers = Default::default();
            player.event = PlayerEvent::None;
            m.last_positions.insert(player.client_id, player.position);
        }
        for _ in 0..cfg.concurrent_gold {
            spawn_gold(&mut m.world, cfg);
        }
        m.timer.remaining_ms = cfg.match_duration_ms;
        m.phase = MatchPhase::Running;
        info!("match {} running", m.match_id);
    }

    /// Drains and resolves the buffered inputs of every running match.
    ///
    /// Inputs from players who are not in game (jailed, still pending) are
    /// discarded without acknowledgement, so their clients keep no illusion
    /// of those inputs ever having been applied.
    pub fn physics_tick(&mut self, sessions: &mut SessionManager) {
        for m in &mut self.matches {
            if m.phase != MatchPhase::Running {
                continue;
            }

            for idx in 0..m.players.len() {
                let client_id = m.players[idx].client_id;
                let commands = sessions.take_inputs(client_id);
                if commands.is_empty() {
                    continue;
                }

                let others: Vec<OtherPlayer> = m
                    .players
                    .iter()
                    .enumerate()
                    .filter(|(j, p)| *j != idx && p.is_in_game())
                    .map(|(_, p)| OtherPlayer {
                        client_id: p.client_id,
                        team: p.team,
                        position: p.position,
                        extent: p.extent,
                    })
                    .collect();

                for command in commands {
                    if !m.players[idx].is_in_game() {
                        debug!(
                            "dropping input {} from player {} (not in game)",
                            command.sequence, client_id
                        );
                        continue;
                    }

                    let sequence = command.sequence;
                    let effects = apply_command(
                        &mut m.world,
                        &others,
                        &mut m.players[idx],
                        &command,
                        &self.cfg,
                    );
                    m.players[idx].acked_input = sequence;
                    sessions.mark_applied(client_id, sequence);
                    m.apply_effects(idx, effects, &self.cfg);
                }
            }
        }
    }

    /// Advances clocks and timers by `elapsed_ms` and builds the outgoing
    /// packets for every match member. Finished matches emit their final
    /// game-over snapshot and are removed.
    pub fn broadcast_tick(&mut self, elapsed_ms: u64) -> Vec<(u64, Packet)> {
        self.local_time += elapsed_ms as f64 / 1000.0;
        let cfg = self.cfg.clone();
        let server_time = self.local_time;
        let mut out = Vec::new();

        let start_countdown: Vec<u64> = self
            .matches
            .iter()
            .filter(|m| m.phase == MatchPhase::Created && self.ready_to_start(m))
            .map(|m| m.match_id)
            .collect();

        for m in &mut self.matches {
            if m.players.is_empty() {
                continue;
            }

            match m.phase {
                MatchPhase::Created => {
                    if start_countdown.contains(&m.match_id) {
                        m.phase = MatchPhase::Countdown;
                        m.timer.countdown_ms = cfg.countdown_ms;
                        info!("match {} countdown started", m.match_id);
                    }
                }
                MatchPhase::Countdown => {
                    let before_secs = m.timer.countdown_ms.div_ceil(1000);
                    m.timer.countdown_ms = m.timer.countdown_ms.saturating_sub(elapsed_ms);
                    let after_secs = m.timer.countdown_ms.div_ceil(1000);

                    if after_secs < before_secs && after_secs > 0 {
                        // One chat line per crossed second boundary.
                        let announce = Packet::Chat {
                            match_id: m.match_id,
                            client_id: 0,
                            team: None,
                            text: format!("Game starts in {}", after_secs),
                        };
                        for p in &m.players {
                            out.push((p.client_id, announce.clone()));
                        }
                    }

                    if m.timer.countdown_ms == 0 {
                        Self::begin_running(m, &cfg);
                    }
                }
                MatchPhase::Running => {
                    m.timer.remaining_ms = m.timer.remaining_ms.saturating_sub(elapsed_ms);

                    let mut released = Vec::new();
                    for player in &mut m.players {
                        if player.tick_timers(elapsed_ms, &cfg) {
                            released.push((player.client_id, player.team));
                        }
                    }
                    for (client_id, team) in released {
                        let position = spawn_position(&m.world, team);
                        if let Some(player) = m.player_mut(client_id) {
                            player.position = position;
                        }
                    }
                }
                MatchPhase::Over => {}
            }

            let over = m.is_over(&cfg);
            if over {
                m.phase = MatchPhase::Over;
                info!("match {} over", m.match_id);
            }

            for viewer in &m.players {
                let snapshot = build_snapshot(m, viewer, &cfg, server_time);
                let packet = if over {
                    Packet::GameOver(snapshot)
                } else {
                    Packet::Update(snapshot)
                };
                out.push((viewer.client_id, packet));
            }

            let positions: Vec<(u64, Vec2)> = m
                .players
                .iter()
                .map(|p| (p.client_id, p.position))
                .collect();
            for (client_id, position) in positions {
                m.last_positions.insert(client_id, position);
            }
            for player in &mut m.players {
                player.event = PlayerEvent::None;
            }
        }

        self.matches.retain(|m| m.phase != MatchPhase::Over);
        out
    }
}
