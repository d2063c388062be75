//! # Verbose Module
//!
//! Structured logging for the simulation and the experiment driver,
//! using the `tracing` crate with JSON output format.
//!
//! The global [`VerboseLevel`] gates what gets emitted: `Main` for lifecycle
//! phases, `Additional` for per-run events, `Detailed` for per-tick events.
//! The [`log_main!`](crate::log_main), [`log_additional!`](crate::log_additional)
//! and [`log_detailed!`](crate::log_detailed) macros pair an event name
//! constant with structured fields.

mod verbose;

pub use self::verbose::*;
