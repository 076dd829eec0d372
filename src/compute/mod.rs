//! Compute layer for projection, input validation and output rendering.
//!
//! This module keeps the pure numeric helpers apart from the cluster index
//! and the cache:
//! - Web-Mercator projection into the normalized world square
//! - Morton keys for deterministic processing order
//! - Validation of coordinates, viewports and zoom levels
//! - GeoJSON rendering of query results (`geojson` feature)

#[cfg(feature = "geojson")]
pub mod geojson;
pub mod projection;
pub mod validation;

pub use projection::{latitude_to_y, longitude_to_x, morton_key, x_to_longitude, y_to_latitude};
pub use validation::{validate_bbox, validate_geographic_point, validate_points, validate_zoom};

#[cfg(feature = "geojson")]
pub use self::geojson::{feature_to_geojson, features_to_geojson, features_to_geojson_string};
