//! Tile pathfinding for point-and-click movement.

use shared::{tile_walkable, Symbol, Team, Tile, TileWorld};
use std::collections::VecDeque;

/// Shortest tile path from `start` to `goal` over the cells `team` may
/// stand on, endpoints included. `None` when the goal is unreachable or
/// not walkable.
pub fn find_path(world: &TileWorld, team: Team, start: Tile, goal: Tile) -> Option<Vec<Tile>> {
    if !tile_walkable(team, world.cell(goal)) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let mut came_from: Vec<Vec<Option<Tile>>> = vec![vec![None; world.cols]; world.rows];
    let mut queue = VecDeque::new();
    came_from[start.row][start.col] = Some(start);
    queue.push_back(start);

    while let Some(tile) = queue.pop_front() {
        if tile == goal {
            let mut path = vec![goal];
            let mut current = goal;
            while current != start {
                current = came_from[current.row][current.col]?;
                path.push(current);
            }
            path.reverse();
            return Some(path);
        }
        for next in neighbors(world, tile) {
            if came_from[next.row][next.col].is_none()
                && tile_walkable(team, world.cell(next))
            {
                came_from[next.row][next.col] = Some(tile);
                queue.push_back(next);
            }
        }
    }
    None
}

fn neighbors(world: &TileWorld, tile: Tile) -> Vec<Tile> {
    let mut out = Vec::with_capacity(4);
    if tile.row > 0 {
        out.push(Tile::new(tile.row - 1, tile.col));
    }
    if tile.row + 1 < world.rows {
        out.push(Tile::new(tile.row + 1, tile.col));
    }
    if tile.col > 0 {
        out.push(Tile::new(tile.row, tile.col - 1));
    }
    if tile.col + 1 < world.cols {
        out.push(Tile::new(tile.row, tile.col + 1));
    }
    out
}

/// The key to hold to step from one tile onto an adjacent one.
pub fn step_symbol(from: Tile, to: Tile) -> Option<Symbol> {
    if to.row + 1 == from.row && to.col == from.col {
        Some(Symbol::Up)
    } else if to.row == from.row + 1 && to.col == from.col {
        Some(Symbol::Down)
    } else if to.col + 1 == from.col && to.row == from.row {
        Some(Symbol::Left)
    } else if to.col == from.col + 1 && to.row == from.row {
        Some(Symbol::Right)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Cell;

    #[test]
    fn direct_path_on_open_floor() {
        let world = TileWorld::standard(40.0);
        let path = find_path(&world, Team::Hider, Tile::new(1, 1), Tile::new(1, 4)).unwrap();
        assert_eq!(path.first(), Some(&Tile::new(1, 1)));
        assert_eq!(path.last(), Some(&Tile::new(1, 4)));
        // Straight corridor, one tile per step.
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn path_routes_around_walls() {
        let world = TileWorld::standard(40.0);
        let path = find_path(&world, Team::Seeker, Tile::new(1, 1), Tile::new(18, 28)).unwrap();
        for tile in &path {
            assert!(tile_walkable(Team::Seeker, world.cell(*tile)));
        }
        for pair in path.windows(2) {
            assert_eq!(pair[0].distance(&pair[1]), 1);
        }
    }

    #[test]
    fn unwalkable_goal_has_no_path() {
        let world = TileWorld::standard(40.0);
        // Border tile is a wall for everyone.
        assert!(find_path(&world, Team::Hider, Tile::new(1, 1), Tile::new(0, 0)).is_none());
        // Caves are off limits to seekers but fine for hiders.
        let cave = world.tiles_with(Cell::Cave)[0];
        assert!(find_path(&world, Team::Seeker, Tile::new(1, 1), cave).is_none());
        assert!(find_path(&world, Team::Hider, Tile::new(1, 1), cave).is_some());
    }

    #[test]
    fn start_equals_goal() {
        let world = TileWorld::standard(40.0);
        let path = find_path(&world, Team::Hider, Tile::new(1, 1), Tile::new(1, 1)).unwrap();
        assert_eq!(path, vec![Tile::new(1, 1)]);
    }

    #[test]
    fn step_symbols_match_directions() {
        let from = Tile::new(5, 5);
        assert_eq!(step_symbol(from, Tile::new(4, 5)), Some(Symbol::Up));
        assert_eq!(step_symbol(from, Tile::new(6, 5)), Some(Symbol::Down));
        assert_eq!(step_symbol(from, Tile::new(5, 4)), Some(Symbol::Left));
        assert_eq!(step_symbol(from, Tile::new(5, 6)), Some(Symbol::Right));
        assert_eq!(step_symbol(from, Tile::new(4, 4)), None);
    }
}
