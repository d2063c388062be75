use crate::grid::cell::{Direction, Position};

/// A 2×2 rotary ring at a street crossing.
///
/// The four cells are stored in circulation order: advancing the index by one
/// is the single legal ring step. The handedness is fixed for the whole crate:
/// circulation is counterclockwise in screen coordinates (rows grow downward),
/// so the stored order is top-left, bottom-left, bottom-right, top-right. A car
/// sitting on a ring cell always travels in the direction of its next ring
/// step and exits 90° clockwise from that direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotaryRing {
    cells: [Position; 4],
}

impl RotaryRing {
    /// Builds the ring for the crossing whose top-left rotary cell is `top_left`.
    pub(crate) fn at(top_left: Position) -> Self {
        let Position { row, col } = top_left;
        RotaryRing {
            cells: [
                Position::new(row, col),
                Position::new(row + 1, col),
                Position::new(row + 1, col + 1),
                Position::new(row, col + 1),
            ],
        }
    }

    /// The four ring cells in circulation order.
    pub fn cells(&self) -> &[Position; 4] {
        &self.cells
    }

    /// Returns `true` iff `pos` is one of the four ring cells.
    pub fn contains(&self, pos: Position) -> bool {
        self.cells.contains(&pos)
    }

    /// The ring cell a car on `pos` circulates to next.
    ///
    /// Returns `None` when `pos` is not part of this ring.
    pub fn next_after(&self, pos: Position) -> Option<Position> {
        let i = self.cells.iter().position(|&c| c == pos)?;
        Some(self.cells[(i + 1) % 4])
    }

    /// The circulation direction at `pos`: the direction of the step from
    /// `pos` to [`next_after`](Self::next_after)`(pos)`.
    pub fn step_direction(&self, pos: Position) -> Option<Direction> {
        let next = self.next_after(pos)?;
        // Ring cells are lattice neighbors, so exactly one coordinate differs by 1.
        let dir = if next.row > pos.row {
            Direction::South
        } else if next.row < pos.row {
            Direction::North
        } else if next.col > pos.col {
            Direction::East
        } else {
            Direction::West
        };
        Some(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_circulates_counterclockwise() {
        let ring = RotaryRing::at(Position::new(5, 5));
        let tl = Position::new(5, 5);
        let bl = Position::new(6, 5);
        let br = Position::new(6, 6);
        let tr = Position::new(5, 6);

        assert_eq!(ring.next_after(tl), Some(bl));
        assert_eq!(ring.next_after(bl), Some(br));
        assert_eq!(ring.next_after(br), Some(tr));
        assert_eq!(ring.next_after(tr), Some(tl));

        assert_eq!(ring.step_direction(tl), Some(Direction::South));
        assert_eq!(ring.step_direction(bl), Some(Direction::East));
        assert_eq!(ring.step_direction(br), Some(Direction::North));
        assert_eq!(ring.step_direction(tr), Some(Direction::West));
    }

    #[test]
    fn test_ring_rejects_foreign_position() {
        let ring = RotaryRing::at(Position::new(0, 0));
        assert!(!ring.contains(Position::new(2, 2)));
        assert_eq!(ring.next_after(Position::new(2, 2)), None);
        assert_eq!(ring.step_direction(Position::new(2, 2)), None);
    }
}
