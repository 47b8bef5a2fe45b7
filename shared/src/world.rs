//! Tile world: the grid both sides simulate against, plus the cartesian
//! helpers that map player positions onto tiles.

use serde::{Deserialize, Serialize};

/// 2D position or movement vector in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Grid coordinate (row-major).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub row: usize,
    pub col: usize,
}

impl Tile {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Manhattan distance to another tile.
    pub fn distance(&self, other: &Tile) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

/// Static or dynamic content of one grid cell.
///
/// Serialized as its numeric code so a full grid stays compact on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Cell {
    Empty,
    Wall,
    Cave,
    Trap,
    Gold,
    Jail,
}

impl From<Cell> for u8 {
    fn from(cell: Cell) -> u8 {
        match cell {
            Cell::Empty => 0,
            Cell::Wall => 1,
            Cell::Cave => 2,
            Cell::Trap => 3,
            Cell::Gold => 4,
            Cell::Jail => 5,
        }
    }
}

impl TryFrom<u8> for Cell {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Cell::Empty),
            1 => Ok(Cell::Wall),
            2 => Ok(Cell::Cave),
            3 => Ok(Cell::Trap),
            4 => Ok(Cell::Gold),
            5 => Ok(Cell::Jail),
            other => Err(format!("invalid cell code {}", other)),
        }
    }
}

/// The playfield grid. Rows are indexed top to bottom, columns left to right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileWorld {
    pub rows: usize,
    pub cols: usize,
    pub tile_size: f32,
    pub grid: Vec<Vec<Cell>>,
}

/// The standard map layout (30 columns by 20 rows).
///
/// 0 = empty, 1 = wall, 2 = cave, 3 = trap, 5 = jail.
const STANDARD_MAP: [[u8; 30]; 20] = [
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 1],
    [1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 0, 0, 0, 1, 1, 1, 0, 1, 1, 1, 1, 0, 0, 0, 0, 1, 0, 1],
    [1, 0, 1, 1, 1, 2, 1, 1, 1, 0, 0, 0, 0, 0, 0, 1, 1, 1, 0, 1, 1, 1, 1, 0, 0, 0, 0, 1, 0, 1],
    [1, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 1, 1, 1, 1, 0, 0, 1, 0, 1, 1, 1, 1, 0, 1, 1, 1, 0, 1, 0, 0, 0, 0, 1, 1, 1, 1, 0, 1],
    [1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 1, 1, 1, 1, 0, 1, 1, 1, 0, 1, 0, 1, 1, 0, 1, 1, 1, 1, 0, 1],
    [1, 0, 1, 1, 1, 1, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 2, 0, 0, 0, 1],
    [1, 0, 1, 1, 1, 1, 0, 0, 1, 3, 1, 1, 0, 1, 1, 1, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 0, 1, 1, 1],
    [1, 0, 1, 1, 1, 1, 0, 0, 1, 0, 1, 1, 0, 1, 5, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1],
    [1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 1, 1, 0, 1, 1, 1, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 0, 1, 1, 1],
    [1, 0, 1, 1, 0, 1, 1, 0, 1, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 0, 1, 1, 1],
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 1, 1, 1, 1, 0, 1],
    [1, 0, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 1, 1, 1, 1, 0, 1],
    [1, 0, 1, 1, 1, 1, 0, 1, 1, 1, 1, 0, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 1, 1, 1, 1, 0, 1],
    [1, 0, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 1],
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
];

impl TileWorld {
    /// Builds the standard map.
    pub fn standard(tile_size: f32) -> Self {
        let grid = STANDARD_MAP
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&code| Cell::try_from(code).unwrap_or(Cell::Wall))
                    .collect()
            })
            .collect();

        Self {
            rows: 20,
            cols: 30,
            tile_size,
            grid,
        }
    }

    /// World width in world units.
    pub fn width(&self) -> f32 {
        self.cols as f32 * self.tile_size
    }

    /// World height in world units.
    pub fn height(&self) -> f32 {
        self.rows as f32 * self.tile_size
    }

    fn clamp_tile(&self, row: usize, col: usize) -> Tile {
        debug_assert!(
            row < self.rows && col < self.cols,
            "tile ({}, {}) out of bounds",
            row,
            col
        );
        Tile::new(row.min(self.rows - 1), col.min(self.cols - 1))
    }

    /// Tile containing the given world position, clamped to the map edge.
    pub fn tile_at(&self, pos: Vec2) -> Tile {
        let row = (pos.y.max(0.0) / self.tile_size) as usize;
        let col = (pos.x.max(0.0) / self.tile_size) as usize;
        self.clamp_tile(row, col)
    }

    /// Content of a tile.
    pub fn cell(&self, tile: Tile) -> Cell {
        let tile = self.clamp_tile(tile.row, tile.col);
        self.grid[tile.row][tile.col]
    }

    pub fn set_cell(&mut self, tile: Tile, cell: Cell) {
        let tile = self.clamp_tile(tile.row, tile.col);
        self.grid[tile.row][tile.col] = cell;
    }

    /// Resets a tile to empty.
    pub fn clear_cell(&mut self, tile: Tile) {
        self.set_cell(tile, Cell::Empty);
    }

    /// World position of the top-left corner of a tile.
    pub fn tile_origin(&self, tile: Tile) -> Vec2 {
        Vec2::new(
            tile.col as f32 * self.tile_size,
            tile.row as f32 * self.tile_size,
        )
    }

    /// World position of the center of a tile.
    pub fn tile_center(&self, tile: Tile) -> Vec2 {
        let origin = self.tile_origin(tile);
        Vec2::new(
            origin.x + self.tile_size / 2.0,
            origin.y + self.tile_size / 2.0,
        )
    }

    /// Tile under the center of a box at `pos` with the given extent.
    pub fn center_tile(&self, pos: Vec2, extent: f32) -> Tile {
        self.tile_at(Vec2::new(pos.x + extent / 2.0, pos.y + extent / 2.0))
    }

    /// Distinct tiles touched by the four corners of a box at `pos`.
    pub fn corner_tiles(&self, pos: Vec2, extent: f32) -> Vec<Tile> {
        let corners = [
            self.tile_at(pos),
            self.tile_at(Vec2::new(pos.x + extent, pos.y)),
            self.tile_at(Vec2::new(pos.x, pos.y + extent)),
            self.tile_at(Vec2::new(pos.x + extent, pos.y + extent)),
        ];

        let mut tiles: Vec<Tile> = Vec::with_capacity(4);
        for tile in corners {
            if !tiles.contains(&tile) {
                tiles.push(tile);
            }
        }
        tiles
    }

    /// All tiles holding the given cell value.
    pub fn tiles_with(&self, cell: Cell) -> Vec<Tile> {
        let mut tiles = Vec::new();
        for (row, line) in self.grid.iter().enumerate() {
            for (col, &c) in line.iter().enumerate() {
                if c == cell {
                    tiles.push(Tile::new(row, col));
                }
            }
        }
        tiles
    }

    /// The jail tile. The standard map has exactly one.
    pub fn jail_tile(&self) -> Option<Tile> {
        self.tiles_with(Cell::Jail).into_iter().next()
    }

    /// Whether `tile` lies inside the diamond fog window centered on
    /// `center`: both axis deltas and their sum bounded by `radius`.
    pub fn in_fog(&self, center: Tile, tile: Tile, radius: u32) -> bool {
        let dr = center.row.abs_diff(tile.row);
        let dc = center.col.abs_diff(tile.col);
        let radius = radius as usize;
        !(dr <= radius && dc <= radius && dr + dc <= radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> TileWorld {
        TileWorld::standard(40.0)
    }

    #[test]
    fn standard_map_dimensions() {
        let w = world();
        assert_eq!(w.rows, 20);
        assert_eq!(w.cols, 30);
        assert_eq!(w.width(), 1200.0);
        assert_eq!(w.height(), 800.0);
    }

    #[test]
    fn map_is_walled_in() {
        let w = world();
        for col in 0..w.cols {
            assert_eq!(w.cell(Tile::new(0, col)), Cell::Wall);
            assert_eq!(w.cell(Tile::new(w.rows - 1, col)), Cell::Wall);
        }
        for row in 0..w.rows {
            assert_eq!(w.cell(Tile::new(row, 0)), Cell::Wall);
            assert_eq!(w.cell(Tile::new(row, w.cols - 1)), Cell::Wall);
        }
    }

    #[test]
    fn jail_tile_found() {
        let w = world();
        assert_eq!(w.jail_tile(), Some(Tile::new(10, 14)));
    }

    #[test]
    fn tile_at_maps_positions() {
        let w = world();
        assert_eq!(w.tile_at(Vec2::new(0.0, 0.0)), Tile::new(0, 0));
        assert_eq!(w.tile_at(Vec2::new(39.9, 39.9)), Tile::new(0, 0));
        assert_eq!(w.tile_at(Vec2::new(40.0, 40.0)), Tile::new(1, 1));
        assert_eq!(w.tile_at(Vec2::new(85.0, 125.0)), Tile::new(3, 2));
    }

    #[test]
    fn corner_tiles_deduplicates() {
        let w = world();
        // Box entirely inside one tile.
        let tiles = w.corner_tiles(Vec2::new(45.0, 45.0), 20.0);
        assert_eq!(tiles, vec![Tile::new(1, 1)]);

        // Box straddling a vertical tile border.
        let tiles = w.corner_tiles(Vec2::new(70.0, 45.0), 20.0);
        assert_eq!(tiles.len(), 2);
        assert!(tiles.contains(&Tile::new(1, 1)));
        assert!(tiles.contains(&Tile::new(1, 2)));
    }

    #[test]
    fn fog_is_a_diamond() {
        let w = world();
        let center = Tile::new(10, 10);
        // Inside: axis-aligned at radius.
        assert!(!w.in_fog(center, Tile::new(10, 13), 3));
        assert!(!w.in_fog(center, Tile::new(7, 10), 3));
        // Inside: diagonal within Manhattan bound.
        assert!(!w.in_fog(center, Tile::new(11, 12), 3));
        // Outside: diagonal corner of the square window.
        assert!(w.in_fog(center, Tile::new(13, 13), 3));
        // Outside: beyond axis radius.
        assert!(w.in_fog(center, Tile::new(10, 14), 3));
    }

    #[test]
    fn cell_codes_round_trip() {
        for code in 0u8..=5 {
            let cell = Cell::try_from(code).unwrap();
            assert_eq!(u8::from(cell), code);
        }
        assert!(Cell::try_from(9).is_err());
    }

    #[test]
    fn set_and_clear_cell() {
        let mut w = world();
        let tile = Tile::new(1, 1);
        assert_eq!(w.cell(tile), Cell::Empty);
        w.set_cell(tile, Cell::Gold);
        assert_eq!(w.cell(tile), Cell::Gold);
        w.clear_cell(tile);
        assert_eq!(w.cell(tile), Cell::Empty);
    }
}
