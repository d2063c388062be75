//! # Metrics Module
//!
//! Per-tick instrumentation of a running simulation.
//!
//! ## Key Components
//!
//! - [`density::DensityTracker`] - Appends one [`density::TickMetrics`] record
//!   per tick: car counts, queue length, densities, average velocity and flow
//! - [`clusters::JamField`] - Tracks which cells held a stationary car last
//!   tick and extracts jam-cluster sizes for percolation analysis
//!
//! The tracker and the jam field are passive observers: they read the lattice
//! and the per-car step counts after the scheduler finished a tick and never
//! influence the dynamics.

pub mod clusters;
pub mod density;
