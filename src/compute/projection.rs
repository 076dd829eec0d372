//! Spherical Web-Mercator projection into the unit square.
//!
//! Longitude maps to `x ∈ [0, 1]` west to east, latitude to `y ∈ [0, 1]` north
//! to south. At zoom `z` with tile extent `e` the pixel space is this square
//! scaled by `e * 2^z`, so a pixel radius `r` becomes `r / (e * 2^z)` here.

use std::f64::consts::PI;

/// Project a longitude in degrees.
#[inline]
pub fn longitude_to_x(longitude: f64) -> f64 {
    longitude / 360.0 + 0.5
}

/// Project a latitude in degrees, clamped to the square at the poles.
#[inline]
pub fn latitude_to_y(latitude: f64) -> f64 {
    let sin = (latitude * PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    // NaN only appears for |sin| == 1 after rounding; those are the poles.
    if y.is_nan() {
        return if latitude > 0.0 { 0.0 } else { 1.0 };
    }
    y.clamp(0.0, 1.0)
}

#[inline]
pub fn x_to_longitude(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

#[inline]
pub fn y_to_latitude(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0) * PI / 180.0;
    360.0 * y2.exp().atan() / PI - 90.0
}

/// Radius in unit-square units for a pixel radius at `zoom`.
#[inline]
pub fn radius_at_zoom(radius_px: f64, tile_extent_px: f64, zoom: u8) -> f64 {
    radius_px / (tile_extent_px * 2f64.powi(i32::from(zoom)))
}

/// Interleave the quantized coordinates of a projected point (Z-order).
///
/// Nearby points get nearby keys, which gives the clustering pass a stable
/// spatially coherent order.
pub fn morton_key(x: f64, y: f64) -> u64 {
    let qx = quantize(x);
    let qy = quantize(y);
    spread_bits(qx) | (spread_bits(qy) << 1)
}

fn quantize(value: f64) -> u32 {
    (value.clamp(0.0, 1.0) * f64::from(u32::MAX)) as u32
}

fn spread_bits(value: u32) -> u64 {
    let mut v = u64::from(value);
    v = (v | (v << 16)) & 0x0000_FFFF_0000_FFFF;
    v = (v | (v << 8)) & 0x00FF_00FF_00FF_00FF;
    v = (v | (v << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    v = (v | (v << 2)) & 0x3333_3333_3333_3333;
    v = (v | (v << 1)) & 0x5555_5555_5555_5555;
    v
}
