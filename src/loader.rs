//! Loader abstraction for the source dataset
//!
//! The cache never talks to a database directly. It asks a [`PointLoader`] for
//! the raw rows matching a predicate, one page at a time, and converts them
//! into validated [`GeoPoint`] records.

use crate::compute::validation::validate_geographic_point;
use crate::error::{ClusterError, LoaderError, Result};
use crate::filter::{Attribute, AttributeKind, FilterPredicate, FilterSignature, matches_attributes};
use geo::Point;
use geocluster_types::point::{AttributeValue, GeoPoint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A window into the loader's result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Page {
    pub offset: usize,
    /// Maximum rows to return (None means everything from `offset`)
    pub limit: Option<usize>,
}

impl Page {
    /// The whole result set.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }
}

/// A row as produced by the data source, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: String,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl RawRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            longitude: None,
            latitude: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_location(mut self, longitude: f64, latitude: f64) -> Self {
        self.longitude = Some(longitude);
        self.latitude = Some(latitude);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Convert into a validated record.
    ///
    /// Returns `Ok(None)` when a coordinate is missing and an error when a
    /// coordinate is present but not a valid longitude/latitude. Boolean
    /// attributes are normalized to flags. Attributes named like a top-level
    /// point field are dropped so serialized points carry each key once.
    pub fn into_point(self) -> Result<Option<GeoPoint>> {
        let (Some(longitude), Some(latitude)) = (self.longitude, self.latitude) else {
            return Ok(None);
        };
        validate_geographic_point(&Point::new(longitude, latitude)).map_err(|e| {
            ClusterError::InvalidInput(format!("Record '{}': {}", self.id, e))
        })?;

        let id = self.id;
        let attributes = self
            .attributes
            .into_iter()
            .filter(|(name, _)| {
                let reserved = RESERVED_ATTRIBUTES.contains(&name.as_str());
                if reserved {
                    log::debug!("Dropping attribute '{}' of record '{}'", name, id);
                }
                !reserved
            })
            .map(|(name, value)| {
                let is_flag = Attribute::from_name(&name)
                    .is_some_and(|attribute| attribute.kind() == AttributeKind::Boolean);
                let value = if is_flag {
                    value.normalized_flag()
                } else {
                    value
                };
                (name, value)
            })
            .collect();

        Ok(Some(GeoPoint {
            id,
            location: Point::new(longitude, latitude),
            attributes,
        }))
    }
}

/// Keys a serialized point already uses for its own fields.
const RESERVED_ATTRIBUTES: [&str; 3] = ["id", "longitude", "latitude"];

/// Source of raw rows for a predicate.
///
/// Implementations apply the predicate themselves (typically as a `WHERE`
/// clause) and honour the page window. Closures with the same signature
/// implement this trait.
pub trait PointLoader: Send + Sync {
    fn load(
        &self,
        predicate: &FilterPredicate,
        page: Page,
    ) -> std::result::Result<Vec<RawRecord>, LoaderError>;
}

impl<F> PointLoader for F
where
    F: Fn(&FilterPredicate, Page) -> std::result::Result<Vec<RawRecord>, LoaderError>
        + Send
        + Sync,
{
    fn load(
        &self,
        predicate: &FilterPredicate,
        page: Page,
    ) -> std::result::Result<Vec<RawRecord>, LoaderError> {
        self(predicate, page)
    }
}

/// In-memory loader over a fixed set of rows.
///
/// Counts invocations so callers can observe how often the cache went to
/// the source.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    records: Vec<RawRecord>,
    calls: AtomicUsize,
}

impl MemoryLoader {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self {
            records,
            calls: AtomicUsize::new(0),
        }
    }

    /// Build from already-validated records.
    pub fn from_points(points: impl IntoIterator<Item = GeoPoint>) -> Self {
        let records = points
            .into_iter()
            .map(|point| RawRecord {
                longitude: Some(point.longitude()),
                latitude: Some(point.latitude()),
                id: point.id,
                attributes: point.attributes,
            })
            .collect();
        Self::new(records)
    }

    /// Number of `load` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl PointLoader for MemoryLoader {
    fn load(
        &self,
        predicate: &FilterPredicate,
        page: Page,
    ) -> std::result::Result<Vec<RawRecord>, LoaderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .records
            .iter()
            .filter(|record| matches_attributes(&record.attributes, predicate))
            .skip(page.offset)
            .take(page.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

/// Convert a batch of rows, dropping rows without coordinates and rejecting
/// rows with invalid ones.
pub fn convert_records(records: Vec<RawRecord>) -> Vec<GeoPoint> {
    let total = records.len();
    let mut missing = 0usize;
    let mut points = Vec::with_capacity(total);

    for record in records {
        match record.into_point() {
            Ok(Some(point)) => points.push(point),
            Ok(None) => missing += 1,
            Err(e) => log::warn!("Dropping record with invalid coordinates: {}", e),
        }
    }

    if missing > 0 {
        log::debug!("Skipped {} of {} records without coordinates", missing, total);
    }
    points
}

/// Pull every page for `predicate` and convert the rows.
///
/// With no `page_size` the loader is called once for the full set. With a page
/// size, pages are requested until one comes back short. `max_records` caps the
/// number of raw rows requested.
pub(crate) fn load_points(
    loader: &dyn PointLoader,
    predicate: &FilterPredicate,
    signature: &FilterSignature,
    page_size: Option<usize>,
    max_records: Option<usize>,
) -> Result<Vec<GeoPoint>> {
    let mut points = Vec::new();
    let mut fetched = 0usize;

    loop {
        let remaining = max_records.map(|max| max.saturating_sub(fetched));
        let limit = match (page_size, remaining) {
            (Some(size), Some(remaining)) => Some(size.min(remaining)),
            (size, remaining) => size.or(remaining),
        };
        if limit == Some(0) {
            break;
        }

        let batch = loader
            .load(predicate, Page { offset: fetched, limit })
            .map_err(|source| ClusterError::LoadFailure {
                signature: signature.clone(),
                source,
            })?;

        let received = batch.len();
        fetched += received;
        points.extend(convert_records(batch));

        let short_page = limit.is_none_or(|limit| received < limit);
        if page_size.is_none() || short_page || received == 0 {
            break;
        }
    }

    log::debug!(
        "Loaded {} rows ({} usable) for '{}'",
        fetched,
        points.len(),
        signature
    );
    Ok(points)
}
