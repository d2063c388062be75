use crate::grid::cell::{CellKind, Direction, Position};
use crate::grid::lattice::CityGrid;
use rand::Rng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::fmt;

/// Lowest personal speed ceiling a car can be assigned.
pub const MIN_SPEED: i32 = 1;

/// The rotary policy a car follows once it is on a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RotaryDiscipline {
    /// Opportunistic exits: leave through the first free exit, otherwise circulate.
    FreeMovement,
    /// Committed exits: leave only through the exit matching the direction
    /// drawn on entry, otherwise circulate. Elongates rotary residence under load.
    FixedDestination,
}

impl fmt::Display for RotaryDiscipline {
    /// Formats the discipline for display.
    ///
    /// Returns a short, lowercase string representation suitable for
    /// logging, record files, and user interfaces.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RotaryDiscipline::FreeMovement => write!(f, "free-movement"),
            RotaryDiscipline::FixedDestination => write!(f, "fixed-destination"),
        }
    }
}

/// Rotary-action hint carried by a car on a ring.
///
/// Only meaningful under [`RotaryDiscipline::FixedDestination`]: `Exit` means
/// the exit reachable from the current ring cell matches the committed target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotaryAction {
    Stay,
    Exit,
}

/// Represents a single car in the simulation.
///
/// A car occupies exactly one lattice cell with its head. Its `heading` is the
/// direction it is logically travelling in: on a straight lane it equals the
/// lane direction, on a rotary it equals the direction of the next ring step
/// (and therefore determines the exit, which leaves 90° clockwise from it).
///
/// Cars hold no reference to the grid; every update borrows the grid
/// exclusively for its duration.
#[derive(Debug, Clone)]
pub struct Car {
    /// Current head cell.
    pub head: Position,
    /// Current travel direction. The matching lane kind is `heading.road_kind()`.
    pub heading: Direction,
    /// True iff the head is on a rotary cell.
    pub on_rotary: bool,
    /// Rotary-action hint, refreshed on every rotary tick under fixed-destination.
    pub action: RotaryAction,
    /// Personal speed ceiling in cells per tick.
    pub max_speed: i32,
    /// Exit direction committed on rotary entry (fixed-destination only).
    pub target_exit: Option<Direction>,
    /// Rotary policy this car follows.
    pub discipline: RotaryDiscipline,
}

impl Car {
    /// Constructs a new `CarBuilder` for building a `Car` object.
    ///
    /// # Arguments
    /// * `head` - The cell the car starts on.
    ///
    /// # Example
    /// ```
    /// use city_traffic_sim_core::agents::{Car, RotaryDiscipline};
    /// use city_traffic_sim_core::grid::cell::{Direction, Position};
    ///
    /// let car = Car::new(Position::new(8, 6))
    ///     .with_heading(Direction::North)
    ///     .with_max_speed(2)
    ///     .with_discipline(RotaryDiscipline::FreeMovement)
    ///     .build();
    /// assert_eq!(car.max_speed, 2);
    /// ```
    pub fn new(head: Position) -> CarBuilder {
        CarBuilder {
            car: Car {
                head,
                heading: Direction::North,
                on_rotary: false,
                action: RotaryAction::Exit,
                max_speed: MIN_SPEED,
                target_exit: None,
                discipline: RotaryDiscipline::FreeMovement,
            },
        }
    }

    /// The directional road kind matching the car's current heading.
    pub fn road_kind(&self) -> CellKind {
        self.heading.road_kind()
    }

    /// Advances the car by one tick and returns the number of cells moved.
    ///
    /// On a straight lane the car attempts up to `max_speed` unit steps and the
    /// return value is the distance actually covered. Entering a rotary
    /// consumes the remainder of the speed budget and counts as 1. On a rotary
    /// the car first attempts to exit, then to circulate; either counts as 1,
    /// a blocked car counts as 0.
    ///
    /// The update is atomic with respect to the grid: the car's old head is
    /// restored to the background layer and the new head is marked before the
    /// method returns.
    pub fn advance(&mut self, grid: &mut CityGrid, rng: &mut StdRng, indecision: f64) -> usize {
        if self.on_rotary {
            let moved = self.try_exit(grid) || self.circulate(grid);
            if self.on_rotary && self.discipline == RotaryDiscipline::FixedDestination {
                // Driver indecision: occasionally re-draw the committed exit.
                if rng.random::<f64>() < indecision {
                    self.commit_exit(rng);
                }
                self.refresh_action();
            }
            usize::from(moved)
        } else {
            self.advance_straight(grid, rng)
        }
    }

    /// Nagel-Schreckenberg style straight travel, one lane-cell at a time.
    fn advance_straight(&mut self, grid: &mut CityGrid, rng: &mut StdRng) -> usize {
        let dir = self.heading;
        let mut last_open = self.head;
        let mut steps = 0usize;

        for _ in 0..self.max_speed {
            let q = grid.neighbor(last_open, dir);
            if grid.dynamic(q) == CellKind::CarHead {
                break;
            }
            match grid.layout(q) {
                CellKind::Intersection => {
                    // Yield to the ring: the upstream ring cell sits one step
                    // counterclockwise of the travel direction.
                    let diagonal = grid.neighbor(q, dir.counter_clockwise());
                    if grid.dynamic(diagonal) == CellKind::CarHead {
                        break;
                    }
                    self.relocate(grid, q);
                    self.on_rotary = true;
                    if self.discipline == RotaryDiscipline::FixedDestination {
                        self.commit_exit(rng);
                        self.refresh_action();
                    }
                    // Entering the ring consumes the rest of the speed budget.
                    return 1;
                }
                kind if kind.is_road() => {
                    last_open = q;
                    steps += 1;
                }
                _ => break,
            }
        }

        if last_open != self.head {
            self.relocate(grid, last_open);
            steps
        } else {
            0
        }
    }

    /// Attempts to leave the ring through the exit 90° clockwise of the
    /// circulation direction. Returns `true` iff the car moved.
    fn try_exit(&mut self, grid: &mut CityGrid) -> bool {
        let exit_dir = self.heading.clockwise();
        let out = grid.neighbor(self.head, exit_dir);
        if grid.dynamic(out) == CellKind::CarHead {
            return false;
        }
        let out_kind = grid.layout(out);
        if !out_kind.is_drivable() {
            return false;
        }
        if self.discipline == RotaryDiscipline::FixedDestination {
            if let Some(target) = self.target_exit {
                if out_kind != target.road_kind() {
                    return false;
                }
            }
        }

        self.relocate(grid, out);
        self.heading = exit_dir;
        // Two touching rings would hand the car straight to the next ring;
        // only a proper road cell ends the rotary passage.
        if out_kind.is_road() {
            self.on_rotary = false;
            self.target_exit = None;
            self.action = RotaryAction::Exit;
        }
        true
    }

    /// Advances one ring step and turns the heading counterclockwise so it
    /// keeps pointing along the circulation. Returns `true` iff the car moved.
    fn circulate(&mut self, grid: &mut CityGrid) -> bool {
        let next = match grid.ring_of(self.head).and_then(|r| r.next_after(self.head)) {
            Some(next) => next,
            None => return false,
        };
        if grid.dynamic(next) == CellKind::CarHead {
            return false;
        }
        self.relocate(grid, next);
        self.heading = self.heading.counter_clockwise();
        true
    }

    /// Draws a fresh committed exit direction, uniformly over the four lanes.
    pub(crate) fn commit_exit(&mut self, rng: &mut StdRng) {
        let target = Direction::ALL[rng.random_range(0..Direction::ALL.len())];
        self.target_exit = Some(target);
    }

    fn refresh_action(&mut self) {
        let exit_kind = self.heading.clockwise().road_kind();
        self.action = match self.target_exit {
            Some(target) if target.road_kind() != exit_kind => RotaryAction::Stay,
            _ => RotaryAction::Exit,
        };
    }

    fn relocate(&mut self, grid: &mut CityGrid, to: Position) {
        grid.clear_head(self.head);
        grid.place_head(to);
        self.head = to;
    }
}

/// A builder pattern implementation for constructing `Car` objects.
pub struct CarBuilder {
    car: Car,
}

impl CarBuilder {
    /// Sets the travel direction.
    pub fn with_heading(mut self, heading: Direction) -> Self {
        self.car.heading = heading;
        self
    }

    /// Sets the personal speed ceiling.
    pub fn with_max_speed(mut self, max_speed: i32) -> Self {
        self.car.max_speed = max_speed;
        self
    }

    /// Sets the rotary policy.
    pub fn with_discipline(mut self, discipline: RotaryDiscipline) -> Self {
        self.car.discipline = discipline;
        self
    }

    /// Marks the car as starting on a rotary cell.
    pub fn on_rotary(mut self) -> Self {
        self.car.on_rotary = true;
        self
    }

    /// Sets a committed exit direction.
    pub fn with_target_exit(mut self, target: Direction) -> Self {
        self.car.target_exit = Some(target);
        self
    }

    /// Builds the final `Car` object with the configured properties.
    pub fn build(self) -> Car {
        self.car
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    /// A single car on an empty lane covers its full speed budget.
    #[test]
    fn test_straight_run_covers_speed_budget() {
        let mut grid = CityGrid::build(40, 10, 3).unwrap();
        let start = Position::new(20, 6); // v-up lane, far from any ring
        let mut car = Car::new(start).with_heading(Direction::North).with_max_speed(3).build();
        grid.place_head(start);

        let moved = car.advance(&mut grid, &mut rng(), 0.0);
        assert_eq!(moved, 3);
        assert_eq!(car.head, Position::new(17, 6));
        assert_eq!(grid.dynamic(start), grid.layout(start));
        assert_eq!(grid.dynamic(car.head), CellKind::CarHead);
    }

    /// A blocked follower stops one cell behind the leader.
    #[test]
    fn test_follower_stops_behind_leader() {
        let mut grid = CityGrid::build(40, 10, 3).unwrap();
        let leader = Position::new(18, 6);
        let follower = Position::new(21, 6);
        grid.place_head(leader);
        grid.place_head(follower);

        let mut car = Car::new(follower).with_heading(Direction::North).with_max_speed(5).build();
        let moved = car.advance(&mut grid, &mut rng(), 0.0);
        assert_eq!(moved, 2);
        assert_eq!(car.head, Position::new(19, 6));
    }

    /// Entering a ring counts as one step and consumes the speed budget.
    #[test]
    fn test_rotary_entry_counts_one_step() {
        let mut grid = CityGrid::build(15, 10, 1).unwrap();
        let start = Position::new(9, 6); // three cells south of the ring
        let mut car = Car::new(start).with_heading(Direction::North).with_max_speed(5).build();
        grid.place_head(start);

        let moved = car.advance(&mut grid, &mut rng(), 0.0);
        assert_eq!(moved, 1, "entry consumes the remaining budget");
        assert!(car.on_rotary);
        assert_eq!(car.head, Position::new(6, 6)); // bottom-right ring cell
        assert_eq!(car.heading, Direction::North);
    }

    /// A car facing a ring whose upstream diagonal is occupied stays put.
    #[test]
    fn test_entry_yields_to_occupied_diagonal() {
        let mut grid = CityGrid::build(15, 10, 1).unwrap();
        let start = Position::new(7, 6);
        let diagonal = Position::new(6, 5); // bottom-left ring cell feeds the entry cell
        grid.place_head(start);
        grid.place_head(diagonal);

        let mut car = Car::new(start).with_heading(Direction::North).with_max_speed(1).build();
        let moved = car.advance(&mut grid, &mut rng(), 0.0);
        assert_eq!(moved, 0);
        assert_eq!(car.head, start);
        assert!(!car.on_rotary);
    }

    /// Free movement exits through the first open exit.
    #[test]
    fn test_free_movement_exits_clockwise_of_heading() {
        let mut grid = CityGrid::build(15, 10, 1).unwrap();
        let entry = Position::new(6, 6);
        grid.place_head(entry);
        let mut car = Car::new(entry)
            .with_heading(Direction::North)
            .with_max_speed(1)
            .on_rotary()
            .build();

        let moved = car.advance(&mut grid, &mut rng(), 0.0);
        assert_eq!(moved, 1);
        assert!(!car.on_rotary);
        assert_eq!(car.head, Position::new(6, 7)); // east onto the h-right lane
        assert_eq!(car.heading, Direction::East);
        assert_eq!(car.road_kind(), CellKind::HRight);
    }

    /// Fixed destination circulates until the committed exit comes around.
    #[test]
    fn test_fixed_destination_waits_for_committed_exit() {
        let mut grid = CityGrid::build(15, 10, 1).unwrap();
        let entry = Position::new(6, 6); // exit from here would be east / h-right
        grid.place_head(entry);
        let mut car = Car::new(entry)
            .with_heading(Direction::North)
            .with_max_speed(1)
            .with_discipline(RotaryDiscipline::FixedDestination)
            .with_target_exit(Direction::North) // v-up: reachable from the top-right cell
            .on_rotary()
            .build();
        let mut r = rng();

        // First tick: exit east does not match, circulate to the top-right cell.
        let moved = car.advance(&mut grid, &mut r, 0.0);
        assert_eq!(moved, 1);
        assert!(car.on_rotary);
        assert_eq!(car.head, Position::new(5, 6));
        assert_eq!(car.heading, Direction::West);

        // Second tick: exit north matches the commitment.
        let moved = car.advance(&mut grid, &mut r, 0.0);
        assert_eq!(moved, 1);
        assert!(!car.on_rotary);
        assert_eq!(car.head, Position::new(4, 6));
        assert_eq!(car.heading, Direction::North);
    }

    /// A fully loaded ring cannot move at all.
    #[test]
    fn test_full_ring_with_blocked_exits_is_stuck() {
        let mut grid = CityGrid::build(15, 10, 1).unwrap();
        let ring = grid.rings()[0].clone();
        let mut cars: Vec<Car> = ring
            .cells()
            .iter()
            .map(|&cell| {
                grid.place_head(cell);
                let dir = ring.step_direction(cell).unwrap();
                Car::new(cell).with_heading(dir).with_max_speed(1).on_rotary().build()
            })
            .collect();
        // Occupy all four exits as well.
        for cell in *ring.cells() {
            let dir = ring.step_direction(cell).unwrap();
            grid.place_head(grid.neighbor(cell, dir.clockwise()));
        }

        let mut r = rng();
        for car in cars.iter_mut() {
            assert_eq!(car.advance(&mut grid, &mut r, 0.0), 0);
        }
    }
}
