//! Per-recipient snapshot construction and fog of war.
//!
//! Every broadcast builds one snapshot for each match member. Outside the
//! running phase, only the roster and scores go out. While running, the
//! recipient gets the full simulation fields for themselves, their team and
//! any enemy their team can see; everyone else is reduced to a fogged stub.

use shared::{
    Cell, GameConfig, MatchPhase, Player, PlayerView, Snapshot, Team, TileWorld, WorldView,
};

use crate::game::Match;

/// Builds the snapshot one viewer receives.
pub fn build_snapshot(m: &Match, viewer: &Player, cfg: &GameConfig, server_time: f64) -> Snapshot {
    let running = m.phase == MatchPhase::Running || m.phase == MatchPhase::Over;

    let world = if running {
        Some(world_view(&m.world, viewer.team))
    } else {
        None
    };

    let players = m
        .players
        .iter()
        .map(|p| {
            if running && visible_to(m, viewer, p, cfg) {
                full_view(m, p)
            } else {
                minimal_view(p, running)
            }
        })
        .collect();

    Snapshot {
        match_id: m.match_id,
        phase: m.phase,
        server_time,
        world,
        timer: m.timer,
        players,
        harvested: m.harvested,
    }
}

/// The grid as `team` is allowed to see it. Hiders see planted traps as
/// plain floor.
fn world_view(world: &TileWorld, team: Team) -> WorldView {
    let mut grid = world.grid.clone();
    if team == Team::Hider {
        for row in &mut grid {
            for cell in row {
                if *cell == Cell::Trap {
                    *cell = Cell::Empty;
                }
            }
        }
    }
    WorldView {
        rows: world.rows,
        cols: world.cols,
        grid,
    }
}

/// Whether `target` is visible to `viewer` or any in-game teammate.
fn visible_to(m: &Match, viewer: &Player, target: &Player, cfg: &GameConfig) -> bool {
    if target.team == viewer.team {
        return true;
    }
    // A hider standing in a sprung trap is revealed to everyone.
    if target.team == Team::Hider && target.timers.trap > 0 {
        return true;
    }

    // The viewer's own eye always counts; teammates contribute only while
    // in game.
    let target_tile = m.world.center_tile(target.position, target.extent);
    m.players
        .iter()
        .filter(|p| {
            p.client_id == viewer.client_id || (p.team == viewer.team && p.is_in_game())
        })
        .any(|p| {
            let eye = m.world.center_tile(p.position, p.extent);
            !m.world.in_fog(eye, target_tile, cfg.fog_radius)
        })
}

fn full_view(m: &Match, p: &Player) -> PlayerView {
    PlayerView {
        client_id: p.client_id,
        name: p.name.clone(),
        team: p.team,
        state: p.state,
        score: p.score,
        fogged: false,
        position: Some(p.position),
        last_position: m.last_positions.get(&p.client_id).copied(),
        acked_input: Some(p.acked_input),
        event: Some(p.event),
        speed: Some(p.speed),
        timers: Some(p.timers),
        traps_left: Some(p.traps_left),
        facing: Some(p.facing),
    }
}

fn minimal_view(p: &Player, fogged: bool) -> PlayerView {
    PlayerView {
        client_id: p.client_id,
        name: p.name.clone(),
        team: p.team,
        state: p.state,
        score: p.score,
        fogged,
        position: None,
        last_position: None,
        acked_input: None,
        event: None,
        speed: None,
        timers: None,
        traps_left: None,
        facing: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameServer;
    use shared::{PlayerState, Tile, Vec2};

    fn running_pair() -> (GameServer, u64) {
        let mut game = GameServer::new(GameConfig::default());
        let (match_id, _) = game.add_player(1, "hider".into());
        game.add_player(2, "seeker".into());
        game.set_ready(match_id, 1);
        game.set_ready(match_id, 2);
        game.broadcast_tick(100);
        game.broadcast_tick(GameConfig::default().countdown_ms);
        (game, match_id)
    }

    fn place(game: &mut GameServer, match_id: u64, client_id: u64, tile: Tile) {
        let m = game.find_match_mut(match_id).unwrap();
        let origin = m.world.tile_origin(tile);
        m.player_mut(client_id).unwrap().position = Vec2::new(origin.x + 5.0, origin.y + 5.0);
    }

    fn view_of(snapshot: &Snapshot, client_id: u64) -> &PlayerView {
        snapshot
            .players
            .iter()
            .find(|p| p.client_id == client_id)
            .unwrap()
    }

    #[test]
    fn lobby_snapshot_has_no_world_or_positions() {
        let mut game = GameServer::new(GameConfig::default());
        let (match_id, _) = game.add_player(1, "a".into());
        game.add_player(2, "b".into());

        let cfg = GameConfig::default();
        let m = game.find_match(match_id).unwrap();
        let snapshot = build_snapshot(m, m.player(1).unwrap(), &cfg, 0.0);

        assert_eq!(snapshot.phase, MatchPhase::Created);
        assert!(snapshot.world.is_none());
        for p in &snapshot.players {
            assert!(!p.fogged);
            assert!(p.position.is_none());
            assert_eq!(p.state, PlayerState::Pending);
        }
    }

    #[test]
    fn hiders_see_traps_as_floor() {
        let cfg = GameConfig::default();
        let (mut game, match_id) = running_pair();
        let trap = Tile::new(2, 2);
        game.find_match_mut(match_id)
            .unwrap()
            .world
            .set_cell(trap, Cell::Trap);

        let m = game.find_match(match_id).unwrap();
        let hider_view = build_snapshot(m, m.player(1).unwrap(), &cfg, 0.0);
        let seeker_view = build_snapshot(m, m.player(2).unwrap(), &cfg, 0.0);

        assert_eq!(hider_view.world.unwrap().grid[2][2], Cell::Empty);
        assert_eq!(seeker_view.world.unwrap().grid[2][2], Cell::Trap);
    }

    #[test]
    fn enemy_beyond_fog_radius_is_stubbed() {
        let cfg = GameConfig::default();
        let (mut game, match_id) = running_pair();
        place(&mut game, match_id, 1, Tile::new(12, 20));
        place(&mut game, match_id, 2, Tile::new(1, 1));

        let m = game.find_match(match_id).unwrap();
        let snapshot = build_snapshot(m, m.player(2).unwrap(), &cfg, 0.0);
        let hider = view_of(&snapshot, 1);

        assert!(hider.fogged);
        assert!(hider.position.is_none());
        assert!(hider.speed.is_none());
        assert!(hider.timers.is_none());
        // Identity and score still go out.
        assert_eq!(hider.name, "hider");
    }

    #[test]
    fn fog_boundary_is_a_diamond() {
        let cfg = GameConfig::default();
        let (mut game, match_id) = running_pair();
        place(&mut game, match_id, 2, Tile::new(10, 10));

        // Distance 2 + 1 = 3 sits on the boundary and is visible.
        place(&mut game, match_id, 1, Tile::new(12, 11));
        let m = game.find_match(match_id).unwrap();
        let snapshot = build_snapshot(m, m.player(2).unwrap(), &cfg, 0.0);
        assert!(!view_of(&snapshot, 1).fogged);

        // Distance 2 + 2 = 4 is past it even though both axes are within 3.
        place(&mut game, match_id, 1, Tile::new(12, 12));
        let m = game.find_match(match_id).unwrap();
        let snapshot = build_snapshot(m, m.player(2).unwrap(), &cfg, 0.0);
        assert!(view_of(&snapshot, 1).fogged);
    }

    #[test]
    fn teammate_extends_vision() {
        let cfg = GameConfig::default();
        let mut game = GameServer::new(GameConfig::default());
        let (match_id, _) = game.add_player(1, "h".into());
        game.add_player(2, "s1".into());
        game.add_player(3, "h2".into());
        game.add_player(4, "s2".into());
        for id in 1..=4 {
            game.set_ready(match_id, id);
        }
        game.broadcast_tick(100);
        game.broadcast_tick(cfg.countdown_ms);

        place(&mut game, match_id, 1, Tile::new(10, 10));
        place(&mut game, match_id, 2, Tile::new(1, 1));
        place(&mut game, match_id, 4, Tile::new(10, 12));

        let m = game.find_match(match_id).unwrap();
        let snapshot = build_snapshot(m, m.player(2).unwrap(), &cfg, 0.0);
        // The far seeker cannot see the hider, but their teammate can.
        assert!(!view_of(&snapshot, 1).fogged);
    }

    #[test]
    fn trapped_hider_is_always_revealed() {
        let cfg = GameConfig::default();
        let (mut game, match_id) = running_pair();
        place(&mut game, match_id, 1, Tile::new(12, 20));
        place(&mut game, match_id, 2, Tile::new(1, 1));
        game.find_match_mut(match_id)
            .unwrap()
            .player_mut(1)
            .unwrap()
            .timers
            .trap = 5_000;

        let m = game.find_match(match_id).unwrap();
        let snapshot = build_snapshot(m, m.player(2).unwrap(), &cfg, 0.0);
        let hider = view_of(&snapshot, 1);
        assert!(!hider.fogged);
        assert!(hider.position.is_some());
    }

    #[test]
    fn jailed_viewer_keeps_own_vision() {
        let cfg = GameConfig::default();
        let (mut game, match_id) = running_pair();
        place(&mut game, match_id, 1, Tile::new(10, 14));
        place(&mut game, match_id, 2, Tile::new(10, 16));
        game.find_match_mut(match_id)
            .unwrap()
            .player_mut(1)
            .unwrap()
            .state = PlayerState::Jailed;

        let m = game.find_match(match_id).unwrap();
        let snapshot = build_snapshot(m, m.player(1).unwrap(), &cfg, 0.0);
        let seeker = view_of(&snapshot, 2);
        assert!(!seeker.fogged);
        assert!(seeker.position.is_some());
    }

    #[test]
    fn teammates_always_fully_visible() {
        let cfg = GameConfig::default();
        let mut game = GameServer::new(GameConfig::default());
        let (match_id, _) = game.add_player(1, "h1".into());
        game.add_player(2, "s".into());
        game.add_player(3, "h2".into());
        for id in 1..=3 {
            game.set_ready(match_id, id);
        }
        game.broadcast_tick(100);
        game.broadcast_tick(cfg.countdown_ms);

        place(&mut game, match_id, 1, Tile::new(1, 1));
        place(&mut game, match_id, 3, Tile::new(18, 28));

        let m = game.find_match(match_id).unwrap();
        let snapshot = build_snapshot(m, m.player(1).unwrap(), &cfg, 0.0);
        let mate = view_of(&snapshot, 3);
        assert!(!mate.fogged);
        assert!(mate.position.is_some());
        assert!(mate.timers.is_some());
    }
}
