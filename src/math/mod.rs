//! Mathematical utilities: affine maps.

pub mod affine;

pub use affine::*;
