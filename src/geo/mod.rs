//! Geotransform evaluation: pixel -> (lat, lon), reference points, grids.

pub mod transform;

pub use transform::*;
