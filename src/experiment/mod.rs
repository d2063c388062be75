//! # Experiment Module
//!
//! **Parameter-sweep driver** – turns the single-run simulation into paper-grade
//! measurements: one swept parameter × a density grid × independent replicates,
//! aggregated with confidence intervals and persisted as CSV and JSON.
//!
//! ## Key Components
//!
//! - [`config::SweepConfig`] / [`config::RunConfig`] - Validated experiment descriptions
//! - [`config::SweepAxis`] - The swept parameter: road length, speed ceiling, or compliance
//! - [`driver::run_once`] - One run: build, populate, tick until done or gridlocked
//! - [`driver::run_sweep`] - The full sweep with parallel replicates and density cutoff
//! - [`driver::CancelHandle`] - Best-effort cancellation between runs
//! - [`stats`] - Moments, Student-t confidence intervals, Shapiro-Wilk normality
//! - [`writer`] - CSV table and structured JSON document with metadata
//!
//! ## Execution model
//!
//! Replicates of one sweep point run in parallel on the rayon pool; each run is
//! fully independent, owning its lattice, cars, tracker and seeded generator.
//! Densities are processed in ascending order so that a fully gridlocked
//! density can cut off everything above it. Aggregation is deterministic given
//! the set of finished runs.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use city_traffic_sim_core::experiment::config::{SweepAxis, SweepConfig};
//! use city_traffic_sim_core::experiment::driver::{run_sweep, CancelHandle};
//! use city_traffic_sim_core::experiment::writer::{self, SweepMetadata};
//!
//! let config = SweepConfig {
//!     axis: SweepAxis::RoadLengths(vec![10, 20]),
//!     density_pcts: (5..100).step_by(5).collect(),
//!     ..SweepConfig::default()
//! };
//! let outcome = run_sweep(&config, &CancelHandle::new()).unwrap();
//! let dir = writer::default_output_dir();
//! writer::write_csv(&dir.join("sweep.csv"), &outcome).unwrap();
//! writer::write_json(&dir.join("sweep.json"), &SweepMetadata::for_sweep(&config), &outcome).unwrap();
//! ```
pub mod config;
pub mod driver;
pub mod stats;
pub mod writer;
