//! The deterministic movement and gameplay engine.
//!
//! The server resolves authoritative inputs through [`apply_command`] and the
//! client runs the exact same function for prediction and reconciliation
//! replay. All arithmetic is quantized to three decimals so both sides land
//! on bit-identical positions.

use crate::config::GameConfig;
use crate::input::{InputCommand, Symbol};
use crate::player::{Facing, Player, PlayerEvent, Team};
use crate::world::{Cell, Tile, TileWorld, Vec2};

/// Position snapshot of another player, for contact checks.
#[derive(Debug, Clone)]
pub struct OtherPlayer {
    pub client_id: u64,
    pub team: Team,
    pub position: Vec2,
    pub extent: f32,
}

/// Something the moving player would overlap at its next position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Collision {
    Tile { cell: Cell, tile: Tile },
    Player { team: Team, client_id: u64 },
}

/// Gameplay consequence of a resolved input, beyond the deterministic tile
/// and timer changes applied in place.
///
/// The server post-processes these (scores, jailing, gold respawn); the
/// client ignores the player-contact variants since it never predicts them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SideEffect {
    GoldGrabbed { tile: Tile },
    TrapSprung { tile: Tile },
    TrapPlanted { tile: Tile },
    SpeedBurst,
    CaughtHider { hider: u64 },
    CaughtBySeeker { seeker: u64 },
}

/// Rounds to three decimals, the shared fixed-point of the simulation.
pub fn quantize(v: f32) -> f32 {
    (v * 1000.0).round() / 1000.0
}

fn vec_add(a: Vec2, b: Vec2) -> Vec2 {
    Vec2::new(quantize(a.x + b.x), quantize(a.y + b.y))
}

/// Quantized displacement for one key held over one frame.
pub fn movement_vector(dir: (f32, f32), speed: f32, dt: f32) -> Vec2 {
    Vec2::new(quantize(dir.0 * speed * dt), quantize(dir.1 * speed * dt))
}

/// Whether a team may stand on a cell at all (spawning, pathing).
pub fn tile_walkable(team: Team, cell: Cell) -> bool {
    match team {
        Team::Hider => !matches!(cell, Cell::Wall | Cell::Jail),
        Team::Seeker => !matches!(cell, Cell::Wall | Cell::Cave | Cell::Jail),
    }
}

/// Collects every tile and player the box at `next` would overlap.
pub fn collisions_at(
    world: &TileWorld,
    others: &[OtherPlayer],
    me: &Player,
    next: Vec2,
) -> Vec<Collision> {
    let mut collisions = Vec::new();

    for tile in world.corner_tiles(next, me.extent) {
        let cell = world.cell(tile);
        if cell != Cell::Empty {
            collisions.push(Collision::Tile { cell, tile });
        }
    }

    let corners = [
        next,
        Vec2::new(next.x + me.extent, next.y),
        Vec2::new(next.x, next.y + me.extent),
        Vec2::new(next.x + me.extent, next.y + me.extent),
    ];
    for other in others {
        if other.client_id == me.client_id {
            continue;
        }
        let hit = corners.iter().any(|c| {
            c.x >= other.position.x
                && c.x <= other.position.x + other.extent
                && c.y >= other.position.y
                && c.y <= other.position.y + other.extent
        });
        if hit {
            collisions.push(Collision::Player {
                team: other.team,
                client_id: other.client_id,
            });
        }
    }

    collisions
}

/// Drops the collisions a team is allowed to pass through: hiders walk
/// through caves and each other, seekers walk over gold and traps and
/// through each other.
pub fn remove_team_legal(team: Team, collisions: &mut Vec<Collision>) {
    collisions.retain(|c| match (team, c) {
        (Team::Hider, Collision::Tile { cell: Cell::Cave, .. }) => false,
        (Team::Hider, Collision::Player { team: Team::Hider, .. }) => false,
        (Team::Seeker, Collision::Tile { cell: Cell::Gold, .. }) => false,
        (Team::Seeker, Collision::Tile { cell: Cell::Trap, .. }) => false,
        (Team::Seeker, Collision::Player { team: Team::Seeker, .. }) => false,
        _ => true,
    });
}

/// Resolves one input command against the world, moving `me` and applying
/// the deterministic consequences (tile clears, slow debuff, specials).
///
/// Each movement key is resolved independently: a key whose destination
/// still overlaps a blocking tile after the team filter is reverted, the
/// other keys of the same command still apply. Player-contact consequences
/// are only reported, never applied here.
pub fn apply_command(
    world: &mut TileWorld,
    others: &[OtherPlayer],
    me: &mut Player,
    cmd: &InputCommand,
    cfg: &GameConfig,
) -> Vec<SideEffect> {
    let mut effects = Vec::new();
    let mut special = false;

    if let Some(sym) = cmd.symbols.iter().rev().find(|s| s.direction().is_some()) {
        me.facing = match sym {
            Symbol::Left => Facing::Left,
            Symbol::Right => Facing::Right,
            Symbol::Up => Facing::Up,
            _ => Facing::Down,
        };
    }

    for &sym in &cmd.symbols {
        let dir = match sym.direction() {
            Some(dir) => dir,
            None => {
                special = true;
                continue;
            }
        };

        let step = movement_vector(dir, me.speed, cmd.dt);
        let next = vec_add(me.position, step);
        let mut collisions = collisions_at(world, others, me, next);
        remove_team_legal(me.team, &mut collisions);

        let blocked = collisions.iter().any(|c| {
            matches!(
                c,
                Collision::Tile {
                    cell: Cell::Wall | Cell::Cave,
                    ..
                }
            )
        });
        if blocked {
            continue;
        }

        for collision in collisions {
            match collision {
                Collision::Tile {
                    cell: Cell::Gold,
                    tile,
                } => {
                    world.clear_cell(tile);
                    me.event = PlayerEvent::GrabGold;
                    effects.push(SideEffect::GoldGrabbed { tile });
                }
                Collision::Tile {
                    cell: Cell::Trap,
                    tile,
                } => {
                    world.clear_cell(tile);
                    me.speed *= cfg.trap_speed_penalty;
                    me.timers.trap += cfg.trap_duration_ms;
                    me.event = PlayerEvent::Trapped;
                    effects.push(SideEffect::TrapSprung { tile });
                }
                Collision::Player {
                    team: Team::Hider,
                    client_id,
                } => {
                    me.event = PlayerEvent::Catch;
                    effects.push(SideEffect::CaughtHider { hider: client_id });
                }
                Collision::Player {
                    team: Team::Seeker,
                    client_id,
                } => {
                    me.event = PlayerEvent::Caught;
                    effects.push(SideEffect::CaughtBySeeker { seeker: client_id });
                }
                // The jail tile is walkable and has no contact effect.
                Collision::Tile { .. } => {}
            }
        }

        me.position = next;
    }

    if special {
        trigger_special(world, me, cfg, &mut effects);
    }

    effects
}

/// The team special: speed burst for hiders, trap planting for seekers.
pub fn trigger_special(
    world: &mut TileWorld,
    me: &mut Player,
    cfg: &GameConfig,
    effects: &mut Vec<SideEffect>,
) {
    match me.team {
        Team::Hider => {
            if me.timers.burst_cooldown == 0 {
                me.timers.burst_cooldown = cfg.burst_cooldown_ms;
                me.timers.burst = cfg.burst_duration_ms;
                me.speed *= cfg.burst_speed_factor;
                me.event = PlayerEvent::Run;
                effects.push(SideEffect::SpeedBurst);
            }
        }
        Team::Seeker => {
            if me.traps_left > 0 {
                let tile = world.center_tile(me.position, me.extent);
                if world.cell(tile) == Cell::Empty {
                    world.set_cell(tile, Cell::Trap);
                    me.traps_left -= 1;
                    me.event = PlayerEvent::PlantTrap;
                    effects.push(SideEffect::TrapPlanted { tile });
                }
            }
        }
    }
}
