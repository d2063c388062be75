use crate::grid::cell::{CellKind, Direction, Position};
use crate::grid::rotary::RotaryRing;
use indexmap::IndexMap;
use std::fmt;

/// Smallest lattice edge the builder accepts.
pub const MIN_GRID_SIZE: usize = 10;
/// Smallest block size the builder accepts. Blocks must also be even.
pub const MIN_BLOCK_SIZE: usize = 4;

/// Custom error type for lattice construction.
#[derive(Debug, Clone)]
pub enum GeometryError {
    /// The requested size/block combination cannot form a closed toroidal street lattice.
    BadGeometry {
        size: usize,
        block: usize,
        reason: &'static str,
    },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::BadGeometry { size, block, reason } => {
                write!(
                    f,
                    "bad geometry for size={} block={}: {}",
                    size, block, reason
                )
            }
        }
    }
}

impl std::error::Error for GeometryError {}

/// The static city lattice plus its current occupancy.
///
/// `CityGrid` holds two same-shaped layers:
///
/// - `layout` — the immutable background written once by [`CityGrid::build`]:
///   blocks, directional lanes and rotary cells. It never changes afterwards.
/// - `dynamic` — the live layer: identical to `layout` except that cells
///   occupied by a car read [`CellKind::CarHead`].
///
/// # Street plan
///
/// Vertical roads run at every column `c` with `c % block == block / 2`, two
/// lanes wide; the lower-index lane travels south ([`CellKind::VDown`]), the
/// higher-index lane north ([`CellKind::VUp`]). Horizontal roads run at the
/// analogous rows; the lower-index lane travels west ([`CellKind::HLeft`]),
/// the higher-index lane east ([`CellKind::HRight`]). Where two roads cross,
/// the 2×2 overlap becomes a rotary ring. With this lane assignment every
/// approach lane feeds exactly the ring cell whose circulation direction
/// matches the approach direction.
///
/// All movement and neighbor queries wrap toroidally.
///
/// # Examples
/// ```
/// use city_traffic_sim_core::grid::lattice::CityGrid;
///
/// let grid = CityGrid::build(40, 10, 2).unwrap();
/// assert_eq!(grid.size(), 40);
/// assert_eq!(grid.rings().len(), 16); // 4 vertical x 4 horizontal roads
/// ```
#[derive(Debug, Clone)]
pub struct CityGrid {
    /// Lattice edge length; the grid is `size × size`.
    size: usize,
    /// Common speed ceiling for compliant cars.
    max_speed: i32,
    /// Immutable background, row-major.
    layout: Vec<CellKind>,
    /// Current cell codes including car heads, row-major.
    dynamic: Vec<CellKind>,
    /// All rotary rings, in construction order (row-major over crossings).
    rings: Vec<RotaryRing>,
    /// O(1) lookup from a rotary cell to the index of its ring in `rings`.
    ring_index: IndexMap<Position, usize>,
    /// Number of directional road cells, fixed at construction.
    n_road_cells: usize,
    /// Number of rotary cells, fixed at construction.
    n_intersection_cells: usize,
}

impl CityGrid {
    /// Constructs the street lattice.
    ///
    /// # Arguments
    /// * `size` - Lattice edge length `N`; the grid is `N × N`.
    /// * `block` - Block size `B`: the period of the street pattern.
    /// * `max_speed` - Common speed ceiling; compliant cars adopt it.
    ///
    /// # Preconditions
    /// * `size ≥ 10` and `size ≥ B + B/2` (at least one full road per axis),
    /// * `B` even and `≥ 4`,
    /// * `size % B ∈ {0, B/2}`, so that every road keeps its spacing across
    ///   the toroidal seam.
    ///
    /// Violations fail with [`GeometryError::BadGeometry`].
    ///
    /// # Example
    /// ```
    /// use city_traffic_sim_core::grid::lattice::CityGrid;
    ///
    /// assert!(CityGrid::build(40, 10, 2).is_ok());
    /// assert!(CityGrid::build(15, 10, 1).is_ok());  // 15 % 10 == 5 == 10/2
    /// assert!(CityGrid::build(12, 7, 2).is_err());  // odd block
    /// ```
    pub fn build(size: usize, block: usize, max_speed: i32) -> Result<CityGrid, GeometryError> {
        let bad = |reason: &'static str| GeometryError::BadGeometry { size, block, reason };

        if size < MIN_GRID_SIZE {
            return Err(bad("grid size below minimum"));
        }
        if block < MIN_BLOCK_SIZE || block % 2 != 0 {
            return Err(bad("block size must be even and at least 4"));
        }
        if size < block + block / 2 {
            return Err(bad("grid too small to hold one full road per axis"));
        }
        let rem = size % block;
        if rem != 0 && rem != block / 2 {
            return Err(bad("size must be a multiple of block, or leave a half-block remainder"));
        }
        if max_speed < 1 {
            return Err(bad("max speed must be at least 1"));
        }

        let half = block / 2;
        let mut layout = vec![CellKind::Block; size * size];

        // Lane origins: each road is two adjacent lanes starting at k*block + block/2.
        let origins: Vec<usize> = (half..size.saturating_sub(1)).step_by(block).collect();

        for &c0 in &origins {
            for row in 0..size {
                layout[row * size + c0] = CellKind::VDown;
                layout[row * size + c0 + 1] = CellKind::VUp;
            }
        }
        for &r0 in &origins {
            for col in 0..size {
                if layout[r0 * size + col] == CellKind::Block {
                    layout[r0 * size + col] = CellKind::HLeft;
                }
                if layout[(r0 + 1) * size + col] == CellKind::Block {
                    layout[(r0 + 1) * size + col] = CellKind::HRight;
                }
            }
        }

        // The 2x2 overlap of every crossing becomes a rotary ring.
        let mut rings = Vec::with_capacity(origins.len() * origins.len());
        let mut ring_index = IndexMap::new();
        for &r0 in &origins {
            for &c0 in &origins {
                let ring = RotaryRing::at(Position::new(r0, c0));
                for &cell in ring.cells() {
                    layout[cell.row * size + cell.col] = CellKind::Intersection;
                    ring_index.insert(cell, rings.len());
                }
                rings.push(ring);
            }
        }

        let n_road_cells = layout.iter().filter(|k| k.is_road()).count();
        let n_intersection_cells = layout.iter().filter(|k| k.is_intersection()).count();

        Ok(CityGrid {
            size,
            max_speed,
            dynamic: layout.clone(),
            layout,
            rings,
            ring_index,
            n_road_cells,
            n_intersection_cells,
        })
    }

    fn idx(&self, pos: Position) -> usize {
        pos.row * self.size + pos.col
    }

    /// Lattice edge length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Common speed ceiling for compliant cars.
    pub fn max_speed(&self) -> i32 {
        self.max_speed
    }

    /// The immutable background kind at `pos`.
    pub fn layout(&self, pos: Position) -> CellKind {
        self.layout[self.idx(pos)]
    }

    /// The current kind at `pos`, [`CellKind::CarHead`] when occupied.
    pub fn dynamic(&self, pos: Position) -> CellKind {
        self.dynamic[self.idx(pos)]
    }

    /// Number of directional road cells.
    pub fn n_road_cells(&self) -> usize {
        self.n_road_cells
    }

    /// Number of rotary cells.
    pub fn n_intersection_cells(&self) -> usize {
        self.n_intersection_cells
    }

    /// Number of cells a car may occupy.
    pub fn n_drivable_cells(&self) -> usize {
        self.n_road_cells + self.n_intersection_cells
    }

    /// All rotary rings in construction order.
    pub fn rings(&self) -> &[RotaryRing] {
        &self.rings
    }

    /// The ring owning `pos`, if `pos` is a rotary cell.
    pub fn ring_of(&self, pos: Position) -> Option<&RotaryRing> {
        self.ring_index.get(&pos).map(|&i| &self.rings[i])
    }

    /// The toroidal neighbor of `pos` one step in `dir`.
    pub fn neighbor(&self, pos: Position, dir: Direction) -> Position {
        let (dr, dc) = dir.offset();
        let n = self.size as isize;
        Position::new(
            (pos.row as isize + dr).rem_euclid(n) as usize,
            (pos.col as isize + dc).rem_euclid(n) as usize,
        )
    }

    /// All drivable positions in row-major order.
    pub fn drivable_positions(&self) -> Vec<Position> {
        let mut spots = Vec::with_capacity(self.n_drivable_cells());
        for row in 0..self.size {
            for col in 0..self.size {
                let pos = Position::new(row, col);
                if self.layout(pos).is_drivable() {
                    spots.push(pos);
                }
            }
        }
        spots
    }

    /// Number of cells currently occupied by a car head.
    pub fn car_head_count(&self) -> usize {
        self.dynamic
            .iter()
            .filter(|&&k| k == CellKind::CarHead)
            .count()
    }

    /// Marks `pos` as occupied by a car head.
    pub(crate) fn place_head(&mut self, pos: Position) {
        let i = self.idx(pos);
        self.dynamic[i] = CellKind::CarHead;
    }

    /// Restores `pos` to its background kind.
    pub(crate) fn clear_head(&mut self, pos: Position) {
        let i = self.idx(pos);
        self.dynamic[i] = self.layout[i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_rejects_bad_geometry() {
        assert!(CityGrid::build(8, 4, 1).is_err(), "grid below minimum size");
        assert!(CityGrid::build(20, 7, 1).is_err(), "odd block");
        assert!(CityGrid::build(20, 2, 1).is_err(), "block below minimum");
        assert!(CityGrid::build(22, 8, 1).is_err(), "22 % 8 == 6, not 0 or 4");
        assert!(CityGrid::build(20, 10, 0).is_err(), "zero max speed");
        assert!(CityGrid::build(13, 10, 1).is_err(), "no room for a full road");
    }

    #[test]
    fn test_build_half_block_remainder() {
        // 15 % 10 == 5 == 10/2: a single road per axis, valid under wrap.
        let grid = CityGrid::build(15, 10, 1).unwrap();
        assert_eq!(grid.rings().len(), 1);
        assert_eq!(grid.layout(Position::new(0, 5)), CellKind::VDown);
        assert_eq!(grid.layout(Position::new(0, 6)), CellKind::VUp);
        assert_eq!(grid.layout(Position::new(5, 0)), CellKind::HLeft);
        assert_eq!(grid.layout(Position::new(6, 0)), CellKind::HRight);
        for &cell in grid.rings()[0].cells() {
            assert_eq!(grid.layout(cell), CellKind::Intersection);
        }
    }

    #[test]
    fn test_lane_convention_feeds_matching_ring_cells() {
        let grid = CityGrid::build(40, 10, 2).unwrap();
        for ring in grid.rings() {
            for &cell in ring.cells() {
                let dir = ring.step_direction(cell).unwrap();
                // The lane one step behind the ring cell, against the circulation
                // direction, must be a lane travelling in that direction (or
                // another rotary cell on degenerate geometries).
                let behind = grid.neighbor(cell, dir.clockwise().clockwise());
                let kind = grid.layout(behind);
                if kind.is_road() {
                    assert_eq!(kind.direction(), Some(dir), "lane into ring cell {}", cell);
                }
            }
        }
    }

    #[test]
    fn test_cell_counts_are_memoized_consistently() {
        let grid = CityGrid::build(40, 10, 2).unwrap();
        let road = (0..40 * 40)
            .filter(|i| {
                grid.layout(Position::new(i / 40, i % 40)).is_road()
            })
            .count();
        assert_eq!(grid.n_road_cells(), road);
        // 16 rings of 4 cells each.
        assert_eq!(grid.n_intersection_cells(), 64);
        assert_eq!(grid.n_drivable_cells(), road + 64);
    }

    #[test]
    fn test_build_is_idempotent() {
        let a = CityGrid::build(30, 10, 3).unwrap();
        let b = CityGrid::build(30, 10, 3).unwrap();
        for row in 0..30 {
            for col in 0..30 {
                let p = Position::new(row, col);
                assert_eq!(a.layout(p), b.layout(p));
            }
        }
        assert_eq!(a.rings(), b.rings());
    }

    #[test]
    fn test_neighbor_wraps_toroidally() {
        let grid = CityGrid::build(20, 10, 1).unwrap();
        assert_eq!(
            grid.neighbor(Position::new(0, 3), Direction::North),
            Position::new(19, 3)
        );
        assert_eq!(
            grid.neighbor(Position::new(19, 3), Direction::South),
            Position::new(0, 3)
        );
        assert_eq!(
            grid.neighbor(Position::new(4, 0), Direction::West),
            Position::new(4, 19)
        );
        assert_eq!(
            grid.neighbor(Position::new(4, 19), Direction::East),
            Position::new(4, 0)
        );
    }
}
