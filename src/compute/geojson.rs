//! GeoJSON rendering of query results.

use crate::error::{ClusterError, Result};
use crate::query::{ClusterFeature, ClusterSummary, PointFeature};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};

fn point_geometry(longitude: f64, latitude: f64) -> Geometry {
    Geometry::new(Value::Point(vec![longitude, latitude]))
}

fn cluster_properties(summary: &ClusterSummary) -> JsonObject {
    let mut properties = JsonObject::new();
    properties.insert("cluster".to_string(), JsonValue::Bool(true));
    properties.insert(
        "cluster_id".to_string(),
        JsonValue::String(summary.id.to_string()),
    );
    properties.insert("point_count".to_string(), summary.point_count.into());
    properties.insert(
        "point_count_abbreviated".to_string(),
        summary.point_count.into(),
    );
    properties.insert(
        "expansion_zoom".to_string(),
        summary.expansion_zoom.map_or(JsonValue::Null, JsonValue::from),
    );
    properties
}

fn point_properties(point: &PointFeature) -> Result<JsonObject> {
    let mut properties = JsonObject::new();
    for (name, value) in &point.attributes {
        let value = serde_json::to_value(value).map_err(|e| {
            ClusterError::InvalidInput(format!("Attribute '{}' is not serializable: {}", name, e))
        })?;
        properties.insert(name.clone(), value);
    }
    properties.insert("id".to_string(), JsonValue::String(point.id.clone()));
    Ok(properties)
}

/// Converts one feature to a GeoJSON `Feature`.
///
/// Clusters carry `cluster`, `cluster_id`, `point_count`,
/// `point_count_abbreviated` and `expansion_zoom`; points carry their
/// attributes and `id`.
pub fn feature_to_geojson(feature: &ClusterFeature) -> Result<Feature> {
    let (geometry, properties) = match feature {
        ClusterFeature::Cluster(summary) => (
            point_geometry(summary.longitude, summary.latitude),
            cluster_properties(summary),
        ),
        ClusterFeature::Point(point) => (
            point_geometry(point.longitude, point.latitude),
            point_properties(point)?,
        ),
    };

    Ok(Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

/// Converts a query response to a `FeatureCollection`.
pub fn features_to_geojson(features: &[ClusterFeature]) -> Result<FeatureCollection> {
    let features = features
        .iter()
        .map(feature_to_geojson)
        .collect::<Result<Vec<_>>>()?;
    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// Converts a query response to a GeoJSON string.
pub fn features_to_geojson_string(features: &[ClusterFeature]) -> Result<String> {
    let collection = features_to_geojson(features)?;
    serde_json::to_string(&collection).map_err(|e| {
        ClusterError::InvalidInput(format!("Failed to serialize feature collection: {}", e))
    })
}
