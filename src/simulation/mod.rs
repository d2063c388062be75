//! # Simulation module
//!
//! **Step scheduler and run orchestration** – owns the lattice, the flat list
//! of cars, and the per-run instrumentation.
//!
//! ## Simulation pipeline
//!
//! One call to [`session::Simulation::step`] executes:
//! ```text
//! 1. Update every car once, in insertion order  ← agents module
//! 2. Post-step consistency checks
//! 3. Record tick metrics                        ← metrics module
//! 4. Refresh the jam field                      ← metrics module
//! ```
//!
//! The update is sequential within a tick: a car moved earlier in the tick is
//! visible, at its new position, to every car updated after it. This ordering
//! is part of the crate contract and tests rely on it. Parallelism lives one
//! level up, across independent experiment runs.
//!
//! ## Usage
//!
//! ```rust
//! use city_traffic_sim_core::agents::RotaryDiscipline;
//! use city_traffic_sim_core::grid::lattice::CityGrid;
//! use city_traffic_sim_core::simulation::session::Simulation;
//! use std::ops::ControlFlow;
//!
//! let grid = CityGrid::build(40, 10, 2).unwrap();
//! let mut sim = Simulation::new(grid, RotaryDiscipline::FreeMovement, 42);
//! sim.populate(100, 100).unwrap();
//! sim.run(50, |_tick, _metrics| ControlFlow::Continue(())).unwrap();
//! assert_eq!(sim.tracker().history().len(), 50);
//! ```
//!
//! ## Error handling
//!
//! Configuration problems surface before the first tick
//! ([`session::SimulationError::OutOfRoadCells`]); consistency problems during
//! a run surface as [`session::SimulationError::InvariantViolation`] and abort
//! that run only.
pub mod session;
