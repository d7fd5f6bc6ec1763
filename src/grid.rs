//! Tile grid and ring adjacency for the collapse algorithms.
//!
//! Tiles live in a flat arena owned by the [`Grid`], addressed either by
//! `(x, y)` or by flat index. Adjacency caches hold flat indices rather than
//! tile references, so cloning a grid yields a fully independent snapshot.

/// Flat index into a grid's tile arena.
pub type TileIndex = usize;

/// Tile position in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TilePos {
    pub x: u32,
    pub y: u32,
}

/// A single grid cell.
///
/// `value` is `None` while the tile is still in superposition and `Some`
/// once it has been collapsed. On the landmass grid resolved values are
/// water/land; on the heatmap grid they are climate classes.
#[derive(Debug, Clone)]
pub struct Tile {
    pos: TilePos,
    pub value: Option<u8>,
    pub has_collapsed_adjacent: bool,
    adjacent: Vec<Vec<TileIndex>>,
}

impl Tile {
    fn new(pos: TilePos, value: Option<u8>) -> Self {
        Self {
            pos,
            value,
            has_collapsed_adjacent: false,
            adjacent: Vec::new(),
        }
    }

    pub fn pos(&self) -> TilePos {
        self.pos
    }

    pub fn x(&self) -> u32 {
        self.pos.x
    }

    pub fn y(&self) -> u32 {
        self.pos.y
    }

    /// Cached adjacency rings, innermost first. Empty until the grid has
    /// loaded adjacency for this tile.
    pub fn rings(&self) -> &[Vec<TileIndex>] {
        &self.adjacent
    }

    /// Cached ring at the given zero-based depth (depth 0 is the immediate
    /// eight-neighbor ring).
    pub fn ring(&self, depth: usize) -> &[TileIndex] {
        self.adjacent.get(depth).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Column-major 2D container of tiles.
///
/// Dimensions are fixed at construction; only tile values and adjacency
/// caches change afterwards.
#[derive(Debug, Clone)]
pub struct Grid {
    height: u32,
    width: u32,
    tiles: Vec<Tile>,
}

impl Grid {
    /// Creates a grid of unresolved tiles.
    pub fn new(height: u32, width: u32) -> Self {
        Self::with_value(height, width, None)
    }

    /// Creates a grid with every tile pre-resolved to `value`.
    pub fn filled(height: u32, width: u32, value: u8) -> Self {
        Self::with_value(height, width, Some(value))
    }

    fn with_value(height: u32, width: u32, value: Option<u8>) -> Self {
        let mut tiles = Vec::with_capacity((width as usize) * (height as usize));
        for x in 0..width {
            for y in 0..height {
                tiles.push(Tile::new(TilePos { x, y }, value));
            }
        }
        Self {
            height,
            width,
            tiles,
        }
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Flat index of `(x, y)`.
    pub fn index(&self, x: u32, y: u32) -> TileIndex {
        debug_assert!(x < self.width && y < self.height);
        (x as usize) * (self.height as usize) + y as usize
    }

    pub fn get(&self, index: TileIndex) -> &Tile {
        &self.tiles[index]
    }

    pub fn get_mut(&mut self, index: TileIndex) -> &mut Tile {
        &mut self.tiles[index]
    }

    pub fn tile(&self, x: u32, y: u32) -> &Tile {
        &self.tiles[self.index(x, y)]
    }

    pub fn tile_mut(&mut self, x: u32, y: u32) -> &mut Tile {
        let index = self.index(x, y);
        &mut self.tiles[index]
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Flat indices in column-major order (x outer, y inner).
    pub fn indices(&self) -> std::ops::Range<TileIndex> {
        0..self.tiles.len()
    }

    /// Tiles at Chebyshev distance `radius` from the tile at `index`.
    ///
    /// Walks the square border in a fixed rotational order: top edge left to
    /// right, right edge top to bottom, bottom edge right to left, left edge
    /// bottom to top. Coordinates outside the grid are skipped, never
    /// wrapped, so rings near a border come back shorter.
    pub fn ring_at(&self, index: TileIndex, radius: u32) -> Vec<TileIndex> {
        let TilePos { x, y } = self.tiles[index].pos;
        let (x, y) = (x as i64, y as i64);
        let r = radius as i64;
        let width = self.width as i64;
        let height = self.height as i64;
        let mut out = Vec::new();

        if y - r >= 0 {
            for off in -r..r {
                if x + off >= 0 && x + off < width {
                    out.push(self.index((x + off) as u32, (y - r) as u32));
                }
            }
        }
        if x + r < width {
            for off in -r..r {
                if y + off >= 0 && y + off < height {
                    out.push(self.index((x + r) as u32, (y + off) as u32));
                }
            }
        }
        if y + r < height {
            for off in (-r + 1..=r).rev() {
                if x + off >= 0 && x + off < width {
                    out.push(self.index((x + off) as u32, (y + r) as u32));
                }
            }
        }
        if x - r >= 0 {
            for off in (-r + 1..=r).rev() {
                if y + off >= 0 && y + off < height {
                    out.push(self.index((x - r) as u32, (y + off) as u32));
                }
            }
        }
        out
    }

    /// Computes and caches the adjacency rings `1..=layers` for one tile.
    ///
    /// Replaces any previous cache; there is no incremental update when the
    /// layer count changes.
    pub fn load_adjacent(&mut self, index: TileIndex, layers: u32) {
        let rings = (1..=layers).map(|r| self.ring_at(index, r)).collect();
        self.tiles[index].adjacent = rings;
    }

    /// Immediate-ring neighbors, preferring the cached ring when adjacency
    /// has been loaded.
    pub fn neighbors(&self, index: TileIndex) -> Vec<TileIndex> {
        match self.tiles[index].adjacent.first() {
            Some(ring) => ring.clone(),
            None => self.ring_at(index, 1),
        }
    }

    /// Resolves a tile to its final value and flags every immediate-ring
    /// neighbor as frontier.
    pub fn collapse(&mut self, index: TileIndex, value: u8) {
        self.tiles[index].value = Some(value);
        for neighbor in self.neighbors(index) {
            self.tiles[neighbor].has_collapsed_adjacent = true;
        }
    }

    /// Removes and returns the next tile to collapse from the working pool.
    ///
    /// The first pool entry already touching a resolved tile wins, which
    /// makes resolution spread outward from seed points; when no tile has
    /// been influenced yet the last entry is taken arbitrarily.
    pub fn find_next(&self, pool: &mut Vec<TileIndex>) -> Option<TileIndex> {
        if let Some(slot) = pool
            .iter()
            .position(|&index| self.tiles[index].has_collapsed_adjacent)
        {
            return Some(pool.remove(slot));
        }
        pool.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(grid: &Grid, indices: &[TileIndex]) -> Vec<(u32, u32)> {
        indices
            .iter()
            .map(|&i| (grid.get(i).x(), grid.get(i).y()))
            .collect()
    }

    #[test]
    fn ring_walk_order_is_rotational() {
        let grid = Grid::new(5, 5);
        let center = grid.index(2, 2);
        let ring = grid.ring_at(center, 1);
        assert_eq!(
            positions(&grid, &ring),
            vec![
                (1, 1),
                (2, 1),
                (3, 1),
                (3, 2),
                (3, 3),
                (2, 3),
                (1, 3),
                (1, 2),
            ]
        );
    }

    #[test]
    fn interior_ring_sizes_are_unclipped() {
        let grid = Grid::new(9, 9);
        let center = grid.index(4, 4);
        for radius in 1..=4 {
            assert_eq!(grid.ring_at(center, radius).len(), 8 * radius as usize);
        }
    }

    #[test]
    fn corner_ring_is_clipped() {
        let grid = Grid::new(4, 4);
        let corner = grid.index(0, 0);
        let ring = grid.ring_at(corner, 1);
        assert_eq!(positions(&grid, &ring), vec![(1, 0), (1, 1), (0, 1)]);
    }

    #[test]
    fn rings_never_leave_the_grid() {
        let grid = Grid::new(6, 4);
        for index in grid.indices() {
            for radius in 1..=3 {
                for neighbor in grid.ring_at(index, radius) {
                    let tile = grid.get(neighbor);
                    assert!(tile.x() < 4 && tile.y() < 6);
                }
            }
        }
    }

    #[test]
    fn collapse_marks_immediate_neighbors() {
        let mut grid = Grid::new(3, 3);
        for index in grid.indices() {
            grid.load_adjacent(index, 2);
        }
        let center = grid.index(1, 1);
        grid.collapse(center, 1);
        assert_eq!(grid.get(center).value, Some(1));
        for index in grid.indices() {
            let expected = index != center;
            assert_eq!(grid.get(index).has_collapsed_adjacent, expected);
        }
    }

    #[test]
    fn find_next_prefers_frontier_tiles() {
        let mut grid = Grid::new(1, 4);
        for index in grid.indices() {
            grid.load_adjacent(index, 1);
        }
        grid.collapse(grid.index(3, 0), 0);

        let mut pool = vec![grid.index(0, 0), grid.index(2, 0), grid.index(1, 0)];
        // (2, 0) touches the collapsed tile and comes before (1, 0) in pool
        // order even though (1, 0) would be the arbitrary pop.
        let next = grid.find_next(&mut pool);
        assert_eq!(next, Some(grid.index(2, 0)));
        assert_eq!(pool, vec![grid.index(0, 0), grid.index(1, 0)]);
    }

    #[test]
    fn find_next_falls_back_to_last_entry() {
        let grid = Grid::new(2, 2);
        let mut pool = vec![grid.index(0, 0), grid.index(1, 1)];
        assert_eq!(grid.find_next(&mut pool), Some(grid.index(1, 1)));
        assert_eq!(grid.find_next(&mut pool), Some(grid.index(0, 0)));
        assert_eq!(grid.find_next(&mut pool), None);
    }

    #[test]
    fn clones_are_independent() {
        let mut grid = Grid::new(3, 3);
        for index in grid.indices() {
            grid.load_adjacent(index, 1);
        }
        let copy = grid.clone();
        grid.collapse(grid.index(1, 1), 1);
        assert_eq!(copy.tile(1, 1).value, None);
        assert!(!copy.tile(0, 0).has_collapsed_adjacent);
    }
}
