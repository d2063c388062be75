use std::fmt;

/// Represents the possible kinds of a lattice cell.
///
/// `CellKind` is a closed taxonomy: every cell of the city lattice is exactly one
/// of these variants. The four directional road kinds carry the travel direction
/// of their lane; [`CellKind::Intersection`] marks a cell belonging to the 2×2
/// ring of a rotary; [`CellKind::CarHead`] marks a cell currently occupied by a
/// car. Direction, drivability and turn geometry are derived by pattern matching,
/// never by comparing raw integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    /// Non-drivable building block.
    Block,
    /// Vertical lane, travel towards decreasing rows.
    VUp,
    /// Vertical lane, travel towards increasing rows.
    VDown,
    /// Horizontal lane, travel towards decreasing columns.
    HLeft,
    /// Horizontal lane, travel towards increasing columns.
    HRight,
    /// A cell of a 2×2 rotary ring.
    Intersection,
    /// A cell occupied by the head of a car.
    CarHead,
}

impl CellKind {
    /// The four directional road kinds, in a fixed canonical order.
    pub const ROAD_KINDS: [CellKind; 4] =
        [CellKind::VUp, CellKind::VDown, CellKind::HLeft, CellKind::HRight];

    /// Returns `true` for the four directional road kinds.
    ///
    /// # Examples
    /// ```
    /// use city_traffic_sim_core::grid::cell::CellKind;
    ///
    /// assert!(CellKind::VUp.is_road());
    /// assert!(!CellKind::Intersection.is_road());
    /// assert!(!CellKind::CarHead.is_road());
    /// ```
    pub fn is_road(self) -> bool {
        matches!(
            self,
            CellKind::VUp | CellKind::VDown | CellKind::HLeft | CellKind::HRight
        )
    }

    /// Returns `true` iff the cell belongs to a rotary ring.
    pub fn is_intersection(self) -> bool {
        self == CellKind::Intersection
    }

    /// Returns `true` for cells a car may occupy: roads and rotary cells.
    pub fn is_drivable(self) -> bool {
        self.is_road() || self.is_intersection()
    }

    /// The travel direction implied by a directional road kind.
    ///
    /// Returns `None` for `Block`, `Intersection` and `CarHead`.
    ///
    /// # Examples
    /// ```
    /// use city_traffic_sim_core::grid::cell::{CellKind, Direction};
    ///
    /// assert_eq!(CellKind::VUp.direction(), Some(Direction::North));
    /// assert_eq!(CellKind::HLeft.direction(), Some(Direction::West));
    /// assert_eq!(CellKind::Block.direction(), None);
    /// ```
    pub fn direction(self) -> Option<Direction> {
        match self {
            CellKind::VUp => Some(Direction::North),
            CellKind::VDown => Some(Direction::South),
            CellKind::HRight => Some(Direction::East),
            CellKind::HLeft => Some(Direction::West),
            CellKind::Block | CellKind::Intersection | CellKind::CarHead => None,
        }
    }
}

impl fmt::Display for CellKind {
    /// Formats the cell kind for display.
    ///
    /// Returns a short, lowercase string representation suitable for
    /// logging, debugging, and user interfaces.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            CellKind::Block => "block",
            CellKind::VUp => "v-up",
            CellKind::VDown => "v-down",
            CellKind::HLeft => "h-left",
            CellKind::HRight => "h-right",
            CellKind::Intersection => "intersection",
            CellKind::CarHead => "car-head",
        };
        write!(f, "{}", s)
    }
}

/// A compass direction on the lattice, in row-major screen coordinates
/// (rows grow downward, columns grow rightward).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// The four directions, matching the order of [`CellKind::ROAD_KINDS`].
    pub const ALL: [Direction; 4] =
        [Direction::North, Direction::South, Direction::West, Direction::East];

    /// The unit `(row, col)` offset of one step in this direction.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::North => (-1, 0),
            Direction::South => (1, 0),
            Direction::East => (0, 1),
            Direction::West => (0, -1),
        }
    }

    /// The direction 90° clockwise in screen coordinates.
    ///
    /// # Examples
    /// ```
    /// use city_traffic_sim_core::grid::cell::Direction;
    ///
    /// assert_eq!(Direction::North.clockwise(), Direction::East);
    /// assert_eq!(Direction::East.clockwise(), Direction::South);
    /// ```
    pub fn clockwise(self) -> Direction {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    /// The direction 90° counterclockwise in screen coordinates.
    pub fn counter_clockwise(self) -> Direction {
        match self {
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
            Direction::East => Direction::North,
        }
    }

    /// The directional road kind whose lanes travel in this direction.
    ///
    /// This is the inverse of [`CellKind::direction`].
    pub fn road_kind(self) -> CellKind {
        match self {
            Direction::North => CellKind::VUp,
            Direction::South => CellKind::VDown,
            Direction::East => CellKind::HRight,
            Direction::West => CellKind::HLeft,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        };
        write!(f, "{}", s)
    }
}

/// A `(row, col)` coordinate on the lattice.
///
/// Positions are plain values; all toroidal wrapping happens in
/// [`CityGrid::neighbor`](crate::grid::lattice::CityGrid::neighbor) so call
/// sites never do modular arithmetic by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_round_trip() {
        for dir in Direction::ALL {
            assert_eq!(dir.road_kind().direction(), Some(dir));
            assert_eq!(dir.clockwise().counter_clockwise(), dir);
            assert_eq!(
                dir.clockwise().clockwise().clockwise().clockwise(),
                dir,
                "four quarter turns should return to {}",
                dir
            );
        }
    }

    #[test]
    fn test_drivable_taxonomy() {
        for kind in CellKind::ROAD_KINDS {
            assert!(kind.is_road());
            assert!(kind.is_drivable());
        }
        assert!(CellKind::Intersection.is_drivable());
        assert!(!CellKind::Block.is_drivable());
        assert!(!CellKind::CarHead.is_drivable());
    }
}
