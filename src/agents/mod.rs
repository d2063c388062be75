// src/agents/mod.rs
//! # Agents Module
//!
//! This module provides the car agent of the traffic simulation, implementing
//! the cellular automata movement rule for straight lanes and rotary rings.
//!
//! ## Key Components
//!
//! - [`Car`] - The agent: one head cell, a heading, a speed ceiling
//! - [`RotaryDiscipline`] - The rotary policy (opportunistic vs committed exits)
//! - [`RotaryAction`] - The per-tick rotary hint under committed exits
//!
//! ## Movement contract
//!
//! Each tick a car gets exactly one update. On a lane it advances up to its
//! personal speed ceiling, stopping early behind other cars; reaching a rotary
//! it yields to ring traffic via the upstream diagonal and, on entry, spends
//! the rest of its budget. On a ring it tries to exit clockwise of its
//! circulation direction, else advances one ring cell. The returned step count
//! feeds the per-tick metrics.
//!
//! ## Usage
//!
//! ```rust
//! use city_traffic_sim_core::agents::{Car, RotaryDiscipline};
//! use city_traffic_sim_core::grid::cell::{Direction, Position};
//!
//! let car = Car::new(Position::new(8, 6))
//!     .with_heading(Direction::North)
//!     .with_max_speed(2)
//!     .with_discipline(RotaryDiscipline::FixedDestination)
//!     .build();
//! assert!(car.target_exit.is_none()); // committed on rotary entry
//! ```
mod car;

pub use self::car::*;
