//! Client-side game state: prediction, reconciliation and interpolation.
//!
//! The local player is simulated through the same engine the server runs.
//! Every sent command is buffered until the server acknowledges its
//! sequence; on each snapshot the confirmed commands are dropped, the
//! player is rebased onto the authoritative position and the still
//! unconfirmed commands are replayed on top. Remote players are drawn
//! interpolated between their two most recent broadcast positions.

use log::debug;
use shared::{
    apply_command, GameConfig, InputCommand, MatchPhase, MatchTimer, OtherPlayer, Player,
    PlayerState, PlayerView, Snapshot, Team, TileWorld, Vec2,
};

/// Another match member as last broadcast, with interpolation support.
#[derive(Debug, Clone)]
pub struct RemotePlayer {
    pub view: PlayerView,
}

impl RemotePlayer {
    /// Position to draw at, `alpha` fractions of a broadcast interval past
    /// the previous one. `None` while fogged.
    pub fn render_position(&self, alpha: f32) -> Option<Vec2> {
        let current = self.view.position?;
        match self.view.last_position {
            Some(prev) => {
                let a = alpha.clamp(0.0, 1.0);
                Some(Vec2::new(
                    prev.x + (current.x - prev.x) * a,
                    prev.y + (current.y - prev.y) * a,
                ))
            }
            None => Some(current),
        }
    }
}

/// Everything the client knows about its match.
pub struct ClientGame {
    cfg: GameConfig,
    pub client_id: u64,
    pub match_id: u64,
    pub team: Team,
    pub phase: MatchPhase,
    /// Predicted copy of the grid; rebased to the server's whenever every
    /// sent input has been confirmed.
    pub world: Option<TileWorld>,
    /// Predicted local player.
    pub me: Option<Player>,
    /// Commands sent but not yet acknowledged.
    pub pending: Vec<InputCommand>,
    pub remotes: Vec<RemotePlayer>,
    pub timer: MatchTimer,
    pub harvested: u32,
    pub server_time: f64,
}

impl ClientGame {
    pub fn new(client_id: u64, match_id: u64, team: Team, cfg: GameConfig) -> Self {
        Self {
            cfg,
            client_id,
            match_id,
            team,
            phase: MatchPhase::Created,
            world: None,
            me: None,
            pending: Vec::new(),
            remotes: Vec::new(),
            timer: MatchTimer::default(),
            harvested: 0,
            server_time: 0.0,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.cfg
    }

    pub fn is_running(&self) -> bool {
        self.phase == MatchPhase::Running
    }

    fn others(&self) -> Vec<OtherPlayer> {
        self.remotes
            .iter()
            .filter(|r| r.view.state == PlayerState::InGame)
            .filter_map(|r| {
                Some(OtherPlayer {
                    client_id: r.view.client_id,
                    team: r.view.team,
                    position: r.view.position?,
                    extent: self.cfg.player_extent(),
                })
            })
            .collect()
    }

    /// Applies one command locally and buffers it for reconciliation.
    pub fn predict(&mut self, command: InputCommand) {
        if self.phase != MatchPhase::Running {
            return;
        }
        let others = self.others();
        let (Some(world), Some(me)) = (self.world.as_mut(), self.me.as_mut()) else {
            return;
        };
        if me.state != PlayerState::InGame {
            return;
        }

        if self.pending.len() >= self.cfg.max_predicted_inputs {
            self.pending.remove(0);
        }
        self.pending.push(command.clone());

        // Contact effects are the server's to judge, so they are dropped.
        apply_command(world, &others, me, &command, &self.cfg);
    }

    /// Folds one server snapshot into the local state.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.phase = snapshot.phase;
        self.timer = snapshot.timer;
        self.harvested = snapshot.harvested;
        self.server_time = snapshot.server_time;

        let mut own_view = None;
        self.remotes.clear();
        for view in snapshot.players {
            if view.client_id == self.client_id {
                own_view = Some(view);
            } else {
                self.remotes.push(RemotePlayer { view });
            }
        }
        let Some(view) = own_view else {
            return;
        };
        self.team = view.team;

        if self.phase != MatchPhase::Running && self.phase != MatchPhase::Over {
            return;
        }

        let acked = view.acked_input.unwrap_or(0);
        self.pending.retain(|c| c.sequence > acked);

        let me = self
            .me
            .get_or_insert_with(|| Player::new(self.client_id, view.name.clone(), view.team, &self.cfg));

        // Authoritative fields always win.
        me.team = view.team;
        me.state = view.state;
        me.score = view.score;
        me.acked_input = acked;
        if let Some(position) = view.position {
            me.position = position;
        }
        if let Some(speed) = view.speed {
            me.speed = speed;
        }
        if let Some(timers) = view.timers {
            me.timers = timers;
        }
        if let Some(traps_left) = view.traps_left {
            me.traps_left = traps_left;
        }
        if let Some(facing) = view.facing {
            me.facing = facing;
        }

        if self.pending.is_empty() {
            // Fully confirmed, the server's grid becomes ours.
            if let Some(world_view) = snapshot.world {
                self.world = Some(TileWorld {
                    rows: world_view.rows,
                    cols: world_view.cols,
                    tile_size: self.cfg.tile_size,
                    grid: world_view.grid,
                });
            }
            return;
        }

        // Replay the unconfirmed tail on top of the rebased position, each
        // command at the speed it was predicted with.
        debug!(
            "replaying {} unconfirmed inputs after ack {}",
            self.pending.len(),
            acked
        );
        let others = self
            .remotes
            .iter()
            .filter(|r| r.view.state == PlayerState::InGame)
            .filter_map(|r| {
                Some(OtherPlayer {
                    client_id: r.view.client_id,
                    team: r.view.team,
                    position: r.view.position?,
                    extent: self.cfg.player_extent(),
                })
            })
            .collect::<Vec<_>>();

        if let (Some(world), Some(me)) = (self.world.as_mut(), self.me.as_mut()) {
            for command in &self.pending {
                me.speed = command.speed;
                apply_command(world, &others, me, command, &self.cfg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::{Cell, Score, Symbol, WorldView};

    fn cmd(sequence: u32, symbols: Vec<Symbol>) -> InputCommand {
        InputCommand {
            sequence,
            dt: 0.045,
            speed: 75.0,
            symbols,
        }
    }

    fn own_view(position: Vec2, acked: u32) -> PlayerView {
        PlayerView {
            client_id: 1,
            name: "me".into(),
            team: Team::Hider,
            state: PlayerState::InGame,
            score: Score::default(),
            fogged: false,
            position: Some(position),
            last_position: Some(position),
            acked_input: Some(acked),
            event: None,
            speed: Some(75.0),
            timers: Some(Default::default()),
            traps_left: Some(0),
            facing: None,
        }
    }

    fn running_snapshot(position: Vec2, acked: u32) -> Snapshot {
        let world = TileWorld::standard(40.0);
        Snapshot {
            match_id: 1,
            phase: MatchPhase::Running,
            server_time: 1.0,
            world: Some(WorldView {
                rows: world.rows,
                cols: world.cols,
                grid: world.grid,
            }),
            timer: MatchTimer {
                countdown_ms: 0,
                remaining_ms: 300_000,
            },
            players: vec![own_view(position, acked)],
            harvested: 0,
        }
    }

    fn running_game() -> ClientGame {
        let mut game = ClientGame::new(1, 1, Team::Hider, GameConfig::default());
        game.apply_snapshot(running_snapshot(Vec2::new(45.0, 45.0), 0));
        game
    }

    #[test]
    fn first_running_snapshot_initializes_player_and_world() {
        let game = running_game();
        assert!(game.is_running());
        let me = game.me.as_ref().unwrap();
        assert_eq!(me.state, PlayerState::InGame);
        assert_approx_eq!(me.position.x, 45.0);
        assert!(game.world.is_some());
    }

    #[test]
    fn prediction_moves_locally_and_buffers() {
        let mut game = running_game();
        game.predict(cmd(1, vec![Symbol::Down]));
        game.predict(cmd(2, vec![Symbol::Down]));

        let me = game.me.as_ref().unwrap();
        assert!(me.position.y > 45.0);
        assert_eq!(game.pending.len(), 2);
    }

    #[test]
    fn no_prediction_outside_running_phase() {
        let mut game = ClientGame::new(1, 1, Team::Hider, GameConfig::default());
        game.predict(cmd(1, vec![Symbol::Down]));
        assert!(game.pending.is_empty());
        assert!(game.me.is_none());
    }

    #[test]
    fn full_ack_clears_buffer_and_adopts_world() {
        let mut game = running_game();
        game.predict(cmd(1, vec![Symbol::Down]));
        let predicted = game.me.as_ref().unwrap().position;

        // Server confirms the command and agrees on the position.
        let mut snapshot = running_snapshot(predicted, 1);
        if let Some(world) = &mut snapshot.world {
            world.grid[1][2] = Cell::Gold;
        }
        game.apply_snapshot(snapshot);

        assert!(game.pending.is_empty());
        assert_eq!(
            game.world.as_ref().unwrap().cell(shared::Tile::new(1, 2)),
            Cell::Gold
        );
        assert_eq!(game.me.as_ref().unwrap().position, predicted);
    }

    #[test]
    fn partial_ack_replays_unconfirmed_tail() {
        let mut game = running_game();
        game.predict(cmd(1, vec![Symbol::Down]));
        let after_first = game.me.as_ref().unwrap().position;
        game.predict(cmd(2, vec![Symbol::Down]));
        game.predict(cmd(3, vec![Symbol::Right]));
        let predicted = game.me.as_ref().unwrap().position;

        // Only the first command is confirmed; the server position matches
        // what prediction produced for it, so replay must converge.
        game.apply_snapshot(running_snapshot(after_first, 1));

        assert_eq!(game.pending.len(), 2);
        assert_eq!(game.me.as_ref().unwrap().position, predicted);
    }

    #[test]
    fn correction_rebases_then_replays() {
        let mut game = running_game();
        game.predict(cmd(1, vec![Symbol::Down]));
        game.predict(cmd(2, vec![Symbol::Down]));

        // Server disagrees about where command 1 ended up.
        let corrected = Vec2::new(45.0, 50.0);
        game.apply_snapshot(running_snapshot(corrected, 1));

        // One replayed down step on top of the corrected base.
        let me = game.me.as_ref().unwrap();
        assert_approx_eq!(me.position.x, 45.0);
        assert_approx_eq!(me.position.y, 50.0 + 75.0 * 0.045, 0.001);
    }

    #[test]
    fn pending_buffer_is_capped() {
        let mut game = running_game();
        let cap = game.config().max_predicted_inputs;
        for seq in 1..=(cap as u32 + 10) {
            game.predict(cmd(seq, vec![]));
        }
        assert_eq!(game.pending.len(), cap);
        // Oldest commands were evicted first.
        assert_eq!(game.pending[0].sequence, 11);
    }

    #[test]
    fn remote_interpolation_lerps_between_broadcasts() {
        let remote = RemotePlayer {
            view: PlayerView {
                client_id: 2,
                name: "other".into(),
                team: Team::Seeker,
                state: PlayerState::InGame,
                score: Score::default(),
                fogged: false,
                position: Some(Vec2::new(100.0, 40.0)),
                last_position: Some(Vec2::new(80.0, 40.0)),
                acked_input: None,
                event: None,
                speed: None,
                timers: None,
                traps_left: None,
                facing: None,
            },
        };

        let mid = remote.render_position(0.5).unwrap();
        assert_approx_eq!(mid.x, 90.0);
        assert_approx_eq!(mid.y, 40.0);
        let end = remote.render_position(2.0).unwrap();
        assert_approx_eq!(end.x, 100.0);
    }

    #[test]
    fn fogged_remote_has_no_render_position() {
        let remote = RemotePlayer {
            view: PlayerView {
                client_id: 2,
                name: "hidden".into(),
                team: Team::Hider,
                state: PlayerState::InGame,
                score: Score::default(),
                fogged: true,
                position: None,
                last_position: None,
                acked_input: None,
                event: None,
                speed: None,
                timers: None,
                traps_left: None,
                facing: None,
            },
        };
        assert!(remote.render_position(0.5).is_none());
    }
}
