//! Pixel -> geographic coordinate conversion.
//!
//! All operations are pure arithmetic over a [`GeoTransform`]; the only failure
//! mode is building a transform from a malformed coefficient list.

use nalgebra::{Matrix2, Vector2};
use serde_json::Value;

use crate::domain::{GeoBounds, GeoGrid, GeoPoint, GeoTransform, ReferencePoints};
use crate::error::BatchError;
use crate::math::Affine2;

/// Number of affine coefficients in a geotransform.
pub const COEFFICIENT_COUNT: usize = 6;

impl GeoTransform {
    /// Build from a GDAL-ordered coefficient slice.
    ///
    /// # Errors
    /// `MalformedTransform` unless there are exactly 6 finite coefficients.
    pub fn from_coefficients(coeffs: &[f64]) -> Result<Self, BatchError> {
        let &[lon_origin, pixel_width, rotation_x, lat_origin, rotation_y, pixel_height] = coeffs else {
            return Err(BatchError::MalformedTransform(format!(
                "expected {COEFFICIENT_COUNT} coefficients, got {}",
                coeffs.len()
            )));
        };
        if let Some(idx) = coeffs.iter().position(|v| !v.is_finite()) {
            return Err(BatchError::MalformedTransform(format!(
                "coefficient {idx} is not finite"
            )));
        }
        Ok(Self {
            lon_origin,
            pixel_width,
            rotation_x,
            lat_origin,
            rotation_y,
            pixel_height,
        })
    }

    /// Build from a decoded JSON coefficient list.
    ///
    /// # Errors
    /// `MalformedTransform` if the value is not a list of exactly 6 finite numbers.
    pub fn from_json(value: &Value) -> Result<Self, BatchError> {
        let list = value
            .as_array()
            .ok_or_else(|| BatchError::MalformedTransform("coefficients must be a list".to_string()))?;
        let coeffs = list
            .iter()
            .enumerate()
            .map(|(idx, v)| {
                v.as_f64().ok_or_else(|| {
                    BatchError::MalformedTransform(format!("coefficient {idx} is not a number: {v}"))
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;
        Self::from_coefficients(&coeffs)
    }

    /// Coefficients in GDAL order.
    pub fn coefficients(&self) -> [f64; COEFFICIENT_COUNT] {
        [
            self.lon_origin,
            self.pixel_width,
            self.rotation_x,
            self.lat_origin,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// True when the raster is not north-up.
    pub fn is_rotated(&self) -> bool {
        self.rotation_x != 0.0 || self.rotation_y != 0.0
    }

    /// Map a pixel coordinate to `(lat, lon)`. Any real pixel position is accepted.
    #[inline]
    pub fn pixel_to_geo(&self, x: f64, y: f64) -> GeoPoint {
        let lon = self.lon_origin + x * self.pixel_width + y * self.rotation_x;
        let lat = self.lat_origin + x * self.rotation_y + y * self.pixel_height;
        GeoPoint { lat, lon }
    }

    /// Map `(lat, lon)` back to a (fractional) pixel coordinate `(x, y)`.
    ///
    /// Returns `None` when the transform is singular.
    pub fn geo_to_pixel(&self, lat: f64, lon: f64) -> Option<(f64, f64)> {
        let inverse = self.as_affine().inverse()?;
        Some(inverse.apply(lon, lat))
    }

    fn as_affine(&self) -> Affine2 {
        Affine2::new(
            Matrix2::new(self.pixel_width, self.rotation_x, self.rotation_y, self.pixel_height),
            Vector2::new(self.lon_origin, self.lat_origin),
        )
    }
}

impl From<GeoTransform> for [f64; COEFFICIENT_COUNT] {
    fn from(value: GeoTransform) -> Self {
        value.coefficients()
    }
}

impl TryFrom<Vec<f64>> for GeoTransform {
    type Error = BatchError;

    fn try_from(value: Vec<f64>) -> Result<Self, Self::Error> {
        GeoTransform::from_coefficients(&value)
    }
}

/// Free-function form of [`GeoTransform::pixel_to_geo`].
#[inline]
pub fn pixel_to_geo(x: f64, y: f64, transform: &GeoTransform) -> GeoPoint {
    transform.pixel_to_geo(x, y)
}

/// Geographic coordinate of every pixel, indexed `[row][col]`.
///
/// O(width x height); use [`reference_points`] when only a few points are needed.
pub fn full_grid(width: usize, height: usize, transform: &GeoTransform) -> GeoGrid {
    let points = (0..height)
        .map(|row| {
            (0..width)
                .map(|col| transform.pixel_to_geo(col as f64, row as f64))
                .collect()
        })
        .collect();
    let center = transform.pixel_to_geo((width / 2) as f64, (height / 2) as f64);
    GeoGrid {
        width,
        height,
        points,
        center,
    }
}

/// The four corners and the center pixel of a `width x height` tile.
///
/// Corners use the last valid pixel index (`width - 1`, `height - 1`); a zero
/// dimension collapses onto pixel 0.
pub fn reference_points(width: usize, height: usize, transform: &GeoTransform) -> ReferencePoints {
    let right = width.saturating_sub(1) as f64;
    let bottom = height.saturating_sub(1) as f64;
    ReferencePoints {
        top_left: transform.pixel_to_geo(0.0, 0.0),
        top_right: transform.pixel_to_geo(right, 0.0),
        center: transform.pixel_to_geo((width / 2) as f64, (height / 2) as f64),
        bottom_left: transform.pixel_to_geo(0.0, bottom),
        bottom_right: transform.pixel_to_geo(right, bottom),
    }
}

/// Bounding box of a set of reference points.
pub fn bounds(points: &ReferencePoints) -> GeoBounds {
    let mut out = GeoBounds {
        min_lat: f64::INFINITY,
        max_lat: f64::NEG_INFINITY,
        min_lon: f64::INFINITY,
        max_lon: f64::NEG_INFINITY,
    };
    for (_, p) in points.named() {
        out.min_lat = out.min_lat.min(p.lat);
        out.max_lat = out.max_lat.max(p.lat);
        out.min_lon = out.min_lon.min(p.lon);
        out.max_lon = out.max_lon.max(p.lon);
    }
    out
}
