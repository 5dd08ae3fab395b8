//! 2D affine maps.
//!
//! A geotransform is an affine map from pixel space to geographic space:
//!
//! ```text
//! [lon]   [pixel_width  rotation_x  ] [x]   [lon_origin]
//! [lat] = [rotation_y   pixel_height] [y] + [lat_origin]
//! ```
//!
//! The forward direction is evaluated directly from the coefficients by the geo
//! module; this module only provides the inverse, which needs a 2x2 solve.

use nalgebra::{Matrix2, Vector2};

/// `out = linear * input + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine2 {
    pub linear: Matrix2<f64>,
    pub offset: Vector2<f64>,
}

impl Affine2 {
    pub fn new(linear: Matrix2<f64>, offset: Vector2<f64>) -> Self {
        Self { linear, offset }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let out = self.linear * Vector2::new(x, y) + self.offset;
        (out[0], out[1])
    }

    /// Inverse map, or `None` when the linear part is singular.
    pub fn inverse(&self) -> Option<Affine2> {
        let inv = self.linear.try_inverse()?;
        if !inv.iter().all(|v| v.is_finite()) {
            return None;
        }
        Some(Affine2 {
            linear: inv,
            offset: -(inv * self.offset),
        })
    }
}
