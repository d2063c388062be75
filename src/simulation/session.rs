use crate::agents::{Car, MIN_SPEED, RotaryDiscipline};
use crate::grid::cell::{CellKind, Position};
use crate::grid::lattice::CityGrid;
use crate::metrics::clusters::JamField;
use crate::metrics::density::{DensityTracker, TickMetrics};
use crate::verbose::{EVENT_POPULATE, EVENT_STEP};
use crate::{log_additional, log_detailed};
use rand::Rng;
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::fmt;
use std::ops::ControlFlow;

/// Custom error types for `Simulation`.
#[derive(Debug, Clone)]
pub enum SimulationError {
    /// More cars were requested than drivable cells exist.
    OutOfRoadCells { requested: usize, available: usize },
    /// A cell chosen for a car is not free, or not drivable at all.
    CellNotFree { position: Position },
    /// A post-step consistency check failed. Fatal to the run.
    InvariantViolation { tick: u64, reason: String },
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::OutOfRoadCells { requested, available } => {
                write!(
                    f,
                    "requested {} cars but only {} drivable cells are available",
                    requested, available
                )
            }
            SimulationError::CellNotFree { position } => {
                write!(f, "cell {} is not a free drivable cell", position)
            }
            SimulationError::InvariantViolation { tick, reason } => {
                write!(f, "invariant violation at tick {}: {}", tick, reason)
            }
        }
    }
}

impl std::error::Error for SimulationError {}

/// One complete simulation run: a lattice, its cars, and their instrumentation.
///
/// The simulation is a pure function of its construction arguments: two
/// instances built from the same grid parameters, discipline and seed produce
/// bit-identical metric sequences. All randomness flows through the single
/// seeded generator owned here.
///
/// Within a tick the cars update strictly sequentially in insertion order, so
/// an earlier car's new position is visible to every later car of the same
/// tick. Each update borrows the grid exclusively; cars never hold references
/// to it.
pub struct Simulation {
    grid: CityGrid,
    cars: Vec<Car>,
    discipline: RotaryDiscipline,
    indecision: f64,
    rng: StdRng,
    tracker: DensityTracker,
    jam: JamField,
    tick: u64,
}

impl Simulation {
    /// Creates a simulation over a built lattice.
    ///
    /// # Arguments
    /// * `grid` - The lattice produced by [`CityGrid::build`].
    /// * `discipline` - Rotary policy applied to every car.
    /// * `seed` - Seed of the run's single random generator.
    pub fn new(grid: CityGrid, discipline: RotaryDiscipline, seed: u64) -> Self {
        use rand::SeedableRng;
        let size = grid.size();
        Simulation {
            grid,
            cars: Vec::new(),
            discipline,
            indecision: 0.2,
            rng: StdRng::seed_from_u64(seed),
            tracker: DensityTracker::new(),
            jam: JamField::new(size),
            tick: 0,
        }
    }

    /// Overrides the fixed-destination re-commitment probability (default 0.2).
    pub fn with_indecision(mut self, indecision: f64) -> Self {
        self.indecision = indecision;
        self
    }

    /// Places `car_count` cars uniformly without replacement over the drivable
    /// cells.
    ///
    /// The first `car_count * compliance_pct / 100` cars of the (already
    /// random) placement order are compliant and adopt the lattice speed
    /// ceiling; the rest draw a personal ceiling uniformly from
    /// `MIN_SPEED..=max_speed`. Cars landing on a rotary cell start with the
    /// circulation direction of that cell.
    ///
    /// # Errors
    /// [`SimulationError::OutOfRoadCells`] when the lattice cannot hold the
    /// requested number of cars.
    pub fn populate(&mut self, car_count: usize, compliance_pct: u8) -> Result<(), SimulationError> {
        let spots = self.grid.drivable_positions();
        if car_count > spots.len() {
            return Err(SimulationError::OutOfRoadCells {
                requested: car_count,
                available: spots.len(),
            });
        }

        let chosen = rand::seq::index::sample(&mut self.rng, spots.len(), car_count);
        let n_compliant = car_count * compliance_pct as usize / 100;

        for (i, spot) in chosen.iter().enumerate() {
            let pos = spots[spot];
            let max_speed = if i < n_compliant {
                self.grid.max_speed()
            } else {
                self.rng.random_range(MIN_SPEED..=self.grid.max_speed())
            };
            self.spawn_car(pos, max_speed)?;
        }

        log_additional!(
            EVENT_POPULATE,
            "placed cars on the lattice",
            cars = car_count,
            compliant = n_compliant
        );
        Ok(())
    }

    /// Places a single car on a free drivable cell.
    ///
    /// Cars on a lane take the lane direction; cars on a rotary cell take the
    /// circulation direction of that cell and, under fixed-destination, commit
    /// to an exit immediately.
    pub fn spawn_car(&mut self, pos: Position, max_speed: i32) -> Result<(), SimulationError> {
        let kind = self.grid.dynamic(pos);
        if !kind.is_drivable() {
            return Err(SimulationError::CellNotFree { position: pos });
        }

        let mut builder = Car::new(pos)
            .with_max_speed(max_speed)
            .with_discipline(self.discipline);
        match kind.direction() {
            Some(dir) => builder = builder.with_heading(dir),
            None => {
                // Rotary spawn: adopt the ring's circulation direction.
                let dir = self
                    .grid
                    .ring_of(pos)
                    .and_then(|ring| ring.step_direction(pos))
                    .ok_or_else(|| SimulationError::InvariantViolation {
                        tick: self.tick,
                        reason: format!("rotary cell {} belongs to no ring", pos),
                    })?;
                builder = builder.with_heading(dir).on_rotary();
            }
        }

        let mut car = builder.build();
        if car.on_rotary && self.discipline == RotaryDiscipline::FixedDestination {
            car.commit_exit(&mut self.rng);
        }
        self.grid.place_head(pos);
        self.cars.push(car);
        Ok(())
    }

    /// Adds a pre-built car, e.g. a hand-placed scenario car. The target cell
    /// must be free and drivable.
    pub fn add_car(&mut self, car: Car) -> Result<(), SimulationError> {
        if !self.grid.dynamic(car.head).is_drivable() {
            return Err(SimulationError::CellNotFree { position: car.head });
        }
        self.grid.place_head(car.head);
        self.cars.push(car);
        Ok(())
    }

    /// Executes one tick: every car gets exactly one update, in insertion
    /// order, and the metrics for the finished tick are recorded.
    pub fn step(&mut self) -> Result<TickMetrics, SimulationError> {
        let mut moves = Vec::with_capacity(self.cars.len());
        for car in self.cars.iter_mut() {
            moves.push(car.advance(&mut self.grid, &mut self.rng, self.indecision));
        }
        self.tick += 1;
        self.check_cars()?;

        let metrics = self
            .tracker
            .record(self.tick, &self.grid, &self.cars, &moves);
        self.jam.observe(&self.cars, &moves);

        log_detailed!(
            EVENT_STEP,
            "tick finished",
            tick = self.tick,
            moving = metrics.moving_cars,
            cells_moved = metrics.cells_moved
        );
        Ok(metrics)
    }

    /// Runs up to `steps` ticks, invoking `hook` after each one.
    ///
    /// The hook receives the tick number and the fresh metrics record and may
    /// stop the run early with [`ControlFlow::Break`]; experiments use this
    /// for gridlock cutoff, interactive frontends for frame pacing.
    pub fn run<F>(&mut self, steps: u64, mut hook: F) -> Result<(), SimulationError>
    where
        F: FnMut(u64, &TickMetrics) -> ControlFlow<()>,
    {
        for _ in 0..steps {
            let metrics = self.step()?;
            if let ControlFlow::Break(()) = hook(self.tick, &metrics) {
                break;
            }
        }
        Ok(())
    }

    /// The lattice, with current occupancy.
    pub fn grid(&self) -> &CityGrid {
        &self.grid
    }

    /// All cars in scheduler order.
    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    /// The metrics recorded so far.
    pub fn tracker(&self) -> &DensityTracker {
        &self.tracker
    }

    /// Number of ticks executed so far.
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    /// Jam-cluster sizes of the last finished tick, sorted descending.
    pub fn jam_cluster_sizes(&self) -> Vec<usize> {
        self.jam.cluster_sizes()
    }

    /// Size of the largest current jam cluster.
    pub fn largest_jam_cluster(&self) -> usize {
        self.jam.largest_cluster()
    }

    /// Per-car consistency checks, run after every tick.
    fn check_cars(&self) -> Result<(), SimulationError> {
        let mut heads = HashSet::with_capacity(self.cars.len());
        for car in &self.cars {
            if self.grid.dynamic(car.head) != CellKind::CarHead {
                return Err(self.violation(format!("car head at {} is not marked on the lattice", car.head)));
            }
            if !self.grid.layout(car.head).is_drivable() {
                return Err(self.violation(format!("car head at {} sits on a block", car.head)));
            }
            if car.on_rotary != self.grid.layout(car.head).is_intersection() {
                return Err(self.violation(format!("rotary flag out of sync at {}", car.head)));
            }
            if !heads.insert(car.head) {
                return Err(self.violation(format!("two cars share the cell {}", car.head)));
            }
        }
        Ok(())
    }

    /// Full lattice scan validating every reachable-state invariant. Heavier
    /// than the per-tick checks; intended for tests and debugging sessions.
    pub fn validate(&self) -> Result<(), SimulationError> {
        self.check_cars()?;
        if self.grid.car_head_count() != self.cars.len() {
            return Err(self.violation(format!(
                "lattice shows {} car heads but {} cars exist",
                self.grid.car_head_count(),
                self.cars.len()
            )));
        }
        for row in 0..self.grid.size() {
            for col in 0..self.grid.size() {
                let pos = Position::new(row, col);
                let dynamic = self.grid.dynamic(pos);
                if dynamic != CellKind::CarHead && dynamic != self.grid.layout(pos) {
                    return Err(self.violation(format!(
                        "dynamic and layout disagree on unoccupied cell {}",
                        pos
                    )));
                }
            }
        }
        for ring in self.grid.rings() {
            for &cell in ring.cells() {
                if !self.grid.layout(cell).is_intersection() {
                    return Err(self.violation(format!("ring contains non-rotary cell {}", cell)));
                }
            }
        }
        Ok(())
    }

    fn violation(&self, reason: String) -> SimulationError {
        SimulationError::InvariantViolation {
            tick: self.tick,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::cell::Direction;

    fn simulation(seed: u64) -> Simulation {
        let grid = CityGrid::build(40, 10, 2).unwrap();
        Simulation::new(grid, RotaryDiscipline::FreeMovement, seed)
    }

    #[test]
    fn test_populate_respects_capacity() {
        let mut sim = simulation(1);
        let capacity = sim.grid().n_drivable_cells();
        assert!(matches!(
            {
                let mut full = simulation(1);
                full.populate(capacity + 1, 100)
            },
            Err(SimulationError::OutOfRoadCells { .. })
        ));
        sim.populate(capacity, 100).unwrap();
        assert_eq!(sim.cars().len(), capacity);
        sim.validate().unwrap();
    }

    #[test]
    fn test_populate_assigns_compliant_speeds() {
        let mut sim = simulation(7);
        sim.populate(100, 100).unwrap();
        assert!(sim.cars().iter().all(|c| c.max_speed == 2));

        let mut mixed = simulation(7);
        mixed.populate(100, 50).unwrap();
        assert!(mixed.cars()[..50].iter().all(|c| c.max_speed == 2));
        assert!(
            mixed.cars().iter().all(|c| (MIN_SPEED..=2).contains(&c.max_speed)),
            "non-compliant ceilings stay within the global bounds"
        );
    }

    #[test]
    fn test_car_count_is_conserved() {
        let mut sim = simulation(3);
        sim.populate(120, 80).unwrap();
        for _ in 0..50 {
            sim.step().unwrap();
            assert_eq!(sim.grid().car_head_count(), 120);
        }
        sim.validate().unwrap();
    }

    #[test]
    fn test_run_hook_can_stop_early() {
        let mut sim = simulation(3);
        sim.populate(10, 100).unwrap();
        let mut seen = 0u64;
        sim.run(100, |tick, _| {
            seen = tick;
            if tick == 5 { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
        })
        .unwrap();
        assert_eq!(seen, 5);
        assert_eq!(sim.ticks(), 5);
        assert_eq!(sim.tracker().history().len(), 5);
    }

    #[test]
    fn test_add_car_rejects_occupied_cell() {
        let mut sim = simulation(3);
        let pos = Position::new(20, 6);
        sim.add_car(Car::new(pos).with_heading(Direction::North).build()).unwrap();
        let duplicate = Car::new(pos).with_heading(Direction::North).build();
        assert!(matches!(
            sim.add_car(duplicate),
            Err(SimulationError::CellNotFree { .. })
        ));
    }

    #[test]
    fn test_identical_seeds_reproduce_metrics() {
        let runs: Vec<Vec<f64>> = (0..2)
            .map(|_| {
                let mut sim = simulation(99);
                sim.populate(150, 60).unwrap();
                (0..40).map(|_| sim.step().unwrap().average_velocity).collect()
            })
            .collect();
        assert_eq!(runs[0], runs[1]);
    }
}
