//! Damage cost computation.
//!
//! Responsibilities:
//!
//! - unit cost table per severity category (`cost`)
//! - per-tile breakdowns and batch roll-ups (`aggregate`)

pub mod aggregate;
pub mod cost;

pub use aggregate::*;
pub use cost::*;
