//! # city_traffic_sim_core
//!
//! Core library for stochastic cellular automata simulation of city traffic.
//!
//! The city is a toroidal lattice of building blocks crossed by two-lane
//! streets; every crossing is a 2×2 rotary ring. Cars follow a
//! Nagel-Schreckenberg style rule on straight lanes, yield on rotary entry,
//! and leave rings either opportunistically or through a committed exit.
//! The per-tick instrumentation exposes densities, velocities, flow, queue
//! lengths and jam-cluster sizes; the experiment driver sweeps one parameter
//! against a density grid with parallel replicates, confidence intervals and
//! gridlock cutoff.
//!
//! ## Modules
//!
//! - [`grid`] - Cell taxonomy, lattice builder and rotary rings
//! - [`agents`] - The car agent and its movement rule
//! - [`simulation`] - The step scheduler and run session
//! - [`metrics`] - Per-tick observables and jam-cluster analysis
//! - [`experiment`] - Sweep configuration, driver, statistics and writers
//! - [`utils`] - Seeded RNG streams and lattice fixtures
//! - [`verbose`] - Structured logging levels over `tracing`
//!
//! ## Quick start
//!
//! ```rust
//! use city_traffic_sim_core::agents::RotaryDiscipline;
//! use city_traffic_sim_core::grid::lattice::CityGrid;
//! use city_traffic_sim_core::simulation::session::Simulation;
//! use std::ops::ControlFlow;
//!
//! let grid = CityGrid::build(40, 10, 2).unwrap();
//! let mut sim = Simulation::new(grid, RotaryDiscipline::FreeMovement, 42);
//! sim.populate(120, 100).unwrap();
//! sim.run(100, |_, _| ControlFlow::Continue(())).unwrap();
//!
//! let last = sim.tracker().last().unwrap();
//! assert_eq!(last.total_cars, 120);
//! ```

pub mod agents;
pub mod experiment;
pub mod grid;
pub mod metrics;
pub mod simulation;
pub mod utils;
pub mod verbose;

pub use agents::{Car, MIN_SPEED, RotaryAction, RotaryDiscipline};
pub use grid::cell::{CellKind, Direction, Position};
pub use grid::lattice::{CityGrid, GeometryError};
pub use metrics::density::{DensityTracker, TickMetrics};
pub use simulation::session::{Simulation, SimulationError};
