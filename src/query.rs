//! Viewport queries over the cache.
//!
//! [`QueryEngine`] resolves a request's filters to a cached index, queries it,
//! and maps leaf results back to the original records.

use crate::cache::{CacheEntry, CacheStats, IndexCache};
use crate::cluster::{ClusterId, ClusterRecord};
use crate::compute::validation::{validate_bbox, validate_zoom};
use crate::error::Result;
use crate::filter::FilterPredicate;
use geocluster_types::bbox::BoundingBox;
use geocluster_types::point::{AttributeValue, GeoPoint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// A viewport query.
///
/// ```rust
/// use geocluster::ClusterRequest;
///
/// let request: ClusterRequest = serde_json::from_str(
///     r#"{"bbox": [-20, -35, 55, 38], "zoom": 3, "filters": {"gender": "female", "is_graduate": 1}}"#,
/// ).unwrap();
/// assert_eq!(request.filters.signature().as_str(), "gender=female_is_graduate=1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRequest {
    /// `[west, south, east, north]` in degrees
    pub bbox: [f64; 4],
    pub zoom: i32,
    #[serde(default)]
    pub filters: FilterPredicate,
}

impl ClusterRequest {
    pub fn new(bbox: [f64; 4], zoom: i32) -> Self {
        Self {
            bbox,
            zoom,
            filters: FilterPredicate::new(),
        }
    }

    pub fn with_filters(mut self, filters: FilterPredicate) -> Self {
        self.filters = filters;
        self
    }
}

/// Summary of an aggregate cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub is_cluster: bool,
    pub id: ClusterId,
    pub point_count: u32,
    pub longitude: f64,
    pub latitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expansion_zoom: Option<u8>,
}

/// An unmerged point with its full attribute set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointFeature {
    pub id: String,
    pub longitude: f64,
    pub latitude: f64,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl From<&GeoPoint> for PointFeature {
    fn from(point: &GeoPoint) -> Self {
        Self {
            id: point.id.clone(),
            longitude: point.longitude(),
            latitude: point.latitude(),
            attributes: point.attributes.clone(),
        }
    }
}

/// One element of a query response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClusterFeature {
    Cluster(ClusterSummary),
    Point(PointFeature),
}

impl ClusterFeature {
    pub fn is_cluster(&self) -> bool {
        matches!(self, ClusterFeature::Cluster(_))
    }

    /// Number of original points this feature stands for.
    pub fn point_count(&self) -> usize {
        match self {
            ClusterFeature::Cluster(summary) => summary.point_count as usize,
            ClusterFeature::Point(_) => 1,
        }
    }

    pub fn longitude(&self) -> f64 {
        match self {
            ClusterFeature::Cluster(summary) => summary.longitude,
            ClusterFeature::Point(point) => point.longitude,
        }
    }

    pub fn latitude(&self) -> f64 {
        match self {
            ClusterFeature::Cluster(summary) => summary.latitude,
            ClusterFeature::Point(point) => point.latitude,
        }
    }

    pub fn as_point(&self) -> Option<&PointFeature> {
        match self {
            ClusterFeature::Point(point) => Some(point),
            ClusterFeature::Cluster(_) => None,
        }
    }

    fn from_record(record: ClusterRecord, records: &[GeoPoint]) -> Self {
        match record {
            ClusterRecord::Cluster {
                id,
                point_count,
                longitude,
                latitude,
                expansion_zoom,
            } => ClusterFeature::Cluster(ClusterSummary {
                is_cluster: true,
                id,
                point_count,
                longitude,
                latitude,
                expansion_zoom,
            }),
            ClusterRecord::Point {
                id,
                longitude,
                latitude,
            } => match record_at(records, id) {
                Some(point) => ClusterFeature::Point(PointFeature::from(point)),
                None => {
                    log::warn!("Leaf {} has no retained record", id);
                    ClusterFeature::Point(PointFeature {
                        id: id.to_string(),
                        longitude,
                        latitude,
                        attributes: BTreeMap::new(),
                    })
                }
            },
        }
    }
}

#[cfg(feature = "geojson")]
impl ClusterFeature {
    /// Render as a GeoJSON `Feature`.
    pub fn to_geojson(&self) -> Result<geojson::Feature> {
        crate::compute::geojson::feature_to_geojson(self)
    }
}

fn record_at(records: &[GeoPoint], id: ClusterId) -> Option<&GeoPoint> {
    usize::try_from(id).ok().and_then(|index| records.get(index))
}

/// Answers viewport and hierarchy queries against a shared [`IndexCache`].
#[derive(Debug, Clone)]
pub struct QueryEngine {
    cache: Arc<IndexCache>,
}

impl QueryEngine {
    pub fn new(cache: Arc<IndexCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<IndexCache> {
        &self.cache
    }

    /// Clusters and points visible in the request's viewport.
    ///
    /// The bbox and zoom are validated before the cache is consulted, so a
    /// malformed request never triggers a build.
    pub fn get_clusters(&self, request: &ClusterRequest) -> Result<Vec<ClusterFeature>> {
        let bbox = BoundingBox::from_array(request.bbox);
        validate_bbox(&bbox)?;
        let zoom = validate_zoom(request.zoom)?;

        let entry = self.cache.get_or_build_entry(&request.filters, false)?;
        let started = Instant::now();
        let features: Vec<ClusterFeature> = entry
            .index()
            .query(&bbox, zoom)
            .into_iter()
            .map(|record| ClusterFeature::from_record(record, entry.records()))
            .collect();

        log::debug!(
            "Query '{}' at zoom {} returned {} features in {:.2?}",
            entry.signature(),
            zoom,
            features.len(),
            started.elapsed()
        );
        Ok(features)
    }

    /// Direct children of an aggregate, as seen at its expansion zoom.
    pub fn children(
        &self,
        filters: &FilterPredicate,
        cluster_id: ClusterId,
    ) -> Result<Vec<ClusterFeature>> {
        let entry = self.resolve(filters)?;
        Ok(entry
            .index()
            .children(cluster_id)?
            .into_iter()
            .map(|record| ClusterFeature::from_record(record, entry.records()))
            .collect())
    }

    /// Original points under an aggregate, paginated.
    pub fn leaves(
        &self,
        filters: &FilterPredicate,
        cluster_id: ClusterId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PointFeature>> {
        let entry = self.resolve(filters)?;
        let leaves = entry.index().leaves(cluster_id, limit, offset)?;
        Ok(leaves
            .into_iter()
            .filter_map(|record| record_at(entry.records(), record.id()))
            .map(PointFeature::from)
            .collect())
    }

    /// Zoom at which an aggregate splits into its children.
    pub fn expansion_zoom(
        &self,
        filters: &FilterPredicate,
        cluster_id: ClusterId,
    ) -> Result<Option<u8>> {
        self.resolve(filters)?.index().expansion_zoom(cluster_id)
    }

    /// Rebuild the index for `filters` from the loader.
    pub fn refresh(&self, filters: &FilterPredicate) -> Result<()> {
        self.cache.get_or_build_entry(filters, true)?;
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    fn resolve(&self, filters: &FilterPredicate) -> Result<Arc<CacheEntry>> {
        self.cache.get_or_build_entry(filters, false)
    }
}
