//! Validation for geographic coordinates, viewports and zoom levels.

use crate::error::{ClusterError, Result};
use geo::Point;
use geocluster_types::bbox::BoundingBox;
use geocluster_types::point::GeoPoint;

/// Validates a 2D point has valid longitude and latitude.
///
/// Longitude: [-180.0, 180.0], Latitude: [-90.0, 90.0]
///
/// # Examples
///
/// ```
/// use geocluster::compute::validation::validate_geographic_point;
/// use geo::Point;
///
/// let nairobi = Point::new(36.8219, -1.2921);
/// assert!(validate_geographic_point(&nairobi).is_ok());
///
/// let invalid = Point::new(200.0, 40.0);
/// assert!(validate_geographic_point(&invalid).is_err());
/// ```
pub fn validate_geographic_point(point: &Point) -> Result<()> {
    let (x, y) = (point.x(), point.y());

    if !x.is_finite() {
        return Err(ClusterError::InvalidInput(format!(
            "Longitude must be finite, got: {}",
            x
        )));
    }

    if !y.is_finite() {
        return Err(ClusterError::InvalidInput(format!(
            "Latitude must be finite, got: {}",
            y
        )));
    }

    if !(-180.0..=180.0).contains(&x) {
        return Err(ClusterError::InvalidInput(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            x
        )));
    }

    if !(-90.0..=90.0).contains(&y) {
        return Err(ClusterError::InvalidInput(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            y
        )));
    }

    Ok(())
}

/// Validates the location of every record, naming the first offender.
pub fn validate_points(points: &[GeoPoint]) -> Result<()> {
    for (idx, point) in points.iter().enumerate() {
        validate_geographic_point(&point.location).map_err(|e| {
            ClusterError::InvalidInput(format!("Point '{}' at index {}: {}", point.id, idx, e))
        })?;
    }
    Ok(())
}

/// Validates a query viewport.
///
/// All four values must be finite and `south <= north`. `west > east` is a
/// valid antimeridian-crossing box, not an error.
///
/// # Examples
///
/// ```
/// use geocluster::compute::validation::validate_bbox;
/// use geocluster_types::bbox::BoundingBox;
///
/// assert!(validate_bbox(&BoundingBox::new(170.0, -10.0, -170.0, 10.0)).is_ok());
/// assert!(validate_bbox(&BoundingBox::new(0.0, 10.0, 10.0, -10.0)).is_err());
/// ```
pub fn validate_bbox(bbox: &BoundingBox) -> Result<()> {
    if !bbox.to_array().iter().all(|v| v.is_finite()) {
        return Err(ClusterError::InvalidInput(format!(
            "Bounding box coordinates must be finite, got: {:?}",
            bbox.to_array()
        )));
    }

    if bbox.south > bbox.north {
        return Err(ClusterError::InvalidInput(format!(
            "Bounding box south ({}) is above north ({})",
            bbox.south, bbox.north
        )));
    }

    Ok(())
}

/// Validates a requested zoom and narrows it to `u8`.
///
/// Zooms above the materialized range are fine (the index clamps them); only
/// negative values are rejected.
pub fn validate_zoom(zoom: i32) -> Result<u8> {
    if zoom < 0 {
        return Err(ClusterError::InvalidInput(format!(
            "Zoom must be non-negative, got: {}",
            zoom
        )));
    }
    Ok(u8::try_from(zoom).unwrap_or(u8::MAX))
}
