//! `dmg-assess` library crate.
//!
//! The binary (`dmg`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the geo/validation/cost engine can be embedded by a web front end

pub mod app;
pub mod classify;
pub mod cli;
pub mod damage;
pub mod domain;
pub mod error;
pub mod geo;
pub mod io;
pub mod math;
pub mod report;
