//! # Utils Module
//!
//! Utility functions and lattice fixtures for simulation development and testing.
//!
//! ## Key Components
//!
//! ### Test Grids
//! - [`test_grids::single_rotary_grid`] - Smallest lattice with one rotary
//! - [`test_grids::four_rotary_grid`] - Compact lattice with four rotaries
//! - [`test_grids::city_block_grid`] - Mid-size lattice for experiment tests
//!
//! ### Deterministic randomness
//! - [`rand::replicate_rng`] - The single seeded generator of one run
//! - [`rand::replicate_seed`] - The seed recorded on a run configuration

pub mod rand;
pub mod test_grids;
