//! # Grid Module
//!
//! This module provides the static street lattice for the cellular automata
//! traffic simulation: a toroidal `N × N` grid of building blocks crossed by
//! two-lane streets that meet in 2×2 rotary rings.
//!
//! ## Key Components
//!
//! - [`cell::CellKind`] - Closed taxonomy of lattice cells (blocks, lanes, rotary cells, car heads)
//! - [`cell::Direction`] - Compass directions with turn geometry
//! - [`cell::Position`] - Row-major `(row, col)` coordinates
//! - [`lattice::CityGrid`] - The built lattice: immutable layout, live occupancy, rings
//! - [`rotary::RotaryRing`] - A rotary as four cells in circulation order
//!
//! ## Street plan
//!
//! Streets repeat with period `B` (the block size). Each street is two
//! one-way lanes; where a vertical and a horizontal street cross, their 2×2
//! overlap is a rotary:
//!
//! ```text
//!        c0 c0+1
//!         ↓  ↑
//!  r0   ←[TL][TR]←   h-left lane
//!  r0+1 →[BL][BR]→   h-right lane
//!         ↓  ↑
//! ```
//!
//! Circulation inside the ring is counterclockwise in screen coordinates
//! (TL → BL → BR → TR → TL); exits always leave 90° clockwise from the
//! circulation direction, which lands each car on the lane travelling away
//! from the crossing.
//!
//! ## Layers
//!
//! The lattice keeps two layers with the same shape: the immutable `layout`
//! written once at construction, and the `dynamic` layer that replaces
//! occupied cells by [`cell::CellKind::CarHead`]. Every non-occupied cell of
//! `dynamic` always equals its `layout` counterpart.
//!
//! ## Usage
//!
//! ```rust
//! use city_traffic_sim_core::grid::lattice::CityGrid;
//! use city_traffic_sim_core::grid::cell::Position;
//!
//! let grid = CityGrid::build(20, 10, 2).unwrap();
//! assert_eq!(grid.rings().len(), 4);
//! assert!(grid.layout(Position::new(0, 5)).is_road());
//! ```

pub mod cell;
pub mod lattice;
pub mod rotary;
