//! Scheduled OSC dispatch.
//!
//! This crate wires decoded packets into pattern dispatch or the
//! timetag-ordered release queue, and drives periodic release on a ticker.

pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod pattern;
pub mod queue;
pub mod runtime;
pub mod server;
pub mod ticker;
