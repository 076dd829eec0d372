use super::record::{ClusterId, ClusterRecord};
use crate::compute::projection::{latitude_to_y, longitude_to_x};
use crate::config::ClusterConfig;
use crate::error::{ClusterError, Result};
use crate::filter::FilterSignature;
use geocluster_types::bbox::BoundingBox;
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};
use smallvec::SmallVec;
use std::fmt;

/// R-tree entry: projected position plus the slot of the member it locates.
pub(crate) type Slot = GeomWithData<[f64; 2], usize>;

/// A cluster or point present at one zoom level.
///
/// `x`/`y` are projected and only used for indexing; `longitude`/`latitude`
/// are the count-weighted geographic centroid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Member {
    pub id: ClusterId,
    pub x: f64,
    pub y: f64,
    pub longitude: f64,
    pub latitude: f64,
    pub count: u32,
}

/// An aggregate created by merging members of the zoom level above.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Aggregate {
    pub longitude: f64,
    pub latitude: f64,
    pub count: u32,
    /// Zoom at which the merge happened
    pub zoom: u8,
    pub children: SmallVec<[ClusterId; 4]>,
}

/// Members of one zoom level and the R-tree over them.
pub(crate) struct ZoomLevel {
    pub zoom: u8,
    pub members: Vec<Member>,
    pub tree: RTree<Slot>,
}

impl ZoomLevel {
    pub fn new(zoom: u8, members: Vec<Member>) -> Self {
        let tree = build_tree(&members);
        Self {
            zoom,
            members,
            tree,
        }
    }

    pub fn point_total(&self) -> u64 {
        self.members.iter().map(|m| u64::from(m.count)).sum()
    }
}

pub(crate) fn build_tree(members: &[Member]) -> RTree<Slot> {
    let slots = members
        .iter()
        .enumerate()
        .map(|(slot, member)| Slot::new([member.x, member.y], slot))
        .collect();
    RTree::bulk_load(slots)
}

/// Multi-zoom cluster hierarchy over one point set.
///
/// Immutable once built and safe to query from many threads at once.
pub struct ClusterIndex {
    signature: FilterSignature,
    config: ClusterConfig,
    /// `levels[i]` holds zoom `config.min_zoom + i`
    levels: Vec<ZoomLevel>,
    /// Aggregate `id` lives at `aggregates[id - leaves.len()]`
    aggregates: Vec<Aggregate>,
    /// Original (longitude, latitude) of every input point
    leaves: Vec<(f64, f64)>,
}

impl ClusterIndex {
    pub(crate) fn from_parts(
        signature: FilterSignature,
        config: ClusterConfig,
        levels: Vec<ZoomLevel>,
        aggregates: Vec<Aggregate>,
        leaves: Vec<(f64, f64)>,
    ) -> Self {
        Self {
            signature,
            config,
            levels,
            aggregates,
            leaves,
        }
    }

    pub fn signature(&self) -> &FilterSignature {
        &self.signature
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn min_zoom(&self) -> u8 {
        self.config.min_zoom
    }

    pub fn max_zoom(&self) -> u8 {
        self.config.max_zoom
    }

    /// Number of input points.
    pub fn num_points(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Number of aggregates created across all zoom levels.
    pub fn num_aggregates(&self) -> usize {
        self.aggregates.len()
    }

    /// Number of records visible at `zoom` over the whole world.
    pub fn len_at_zoom(&self, zoom: u8) -> usize {
        self.level(zoom).members.len()
    }

    /// Clusters and points inside `bbox` at `zoom`.
    ///
    /// `zoom` is clamped to `[min_zoom, max_zoom]`. A box with `west > east`
    /// wraps across the antimeridian. Order of the result is unspecified.
    pub fn query(&self, bbox: &BoundingBox, zoom: u8) -> Vec<ClusterRecord> {
        let level = self.level(zoom);
        if level.members.is_empty() {
            return Vec::new();
        }

        let (south, north) = bbox.latitude_range();
        let (min_y, max_y) = (latitude_to_y(north), latitude_to_y(south));

        let mut records = Vec::new();
        for (west, east) in bbox.longitude_ranges() {
            let envelope =
                AABB::from_corners([longitude_to_x(west), min_y], [longitude_to_x(east), max_y]);
            records.extend(
                level
                    .tree
                    .locate_in_envelope(&envelope)
                    .map(|slot| self.record(level.members[slot.data].id)),
            );
        }
        records
    }

    /// Direct constituents of an aggregate, one zoom level above its own.
    pub fn children(&self, cluster_id: ClusterId) -> Result<Vec<ClusterRecord>> {
        let aggregate = self.aggregate(cluster_id)?;
        Ok(aggregate
            .children
            .iter()
            .map(|&child| self.record(child))
            .collect())
    }

    /// Original points under an aggregate, skipping `offset` and returning at
    /// most `limit`. Order is depth-first over the merge hierarchy.
    pub fn leaves(
        &self,
        cluster_id: ClusterId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ClusterRecord>> {
        let aggregate = self.aggregate(cluster_id)?;
        let wanted = offset.saturating_add(limit);

        let mut found = Vec::new();
        let mut stack: Vec<ClusterId> = aggregate.children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if found.len() >= wanted {
                break;
            }
            match self.aggregate_at(id) {
                Some(child) => stack.extend(child.children.iter().rev().copied()),
                None => found.push(id),
            }
        }

        Ok(found
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|id| self.record(id))
            .collect())
    }

    /// Zoom at which an aggregate splits into its children.
    pub fn expansion_zoom(&self, cluster_id: ClusterId) -> Result<Option<u8>> {
        let aggregate = self.aggregate(cluster_id)?;
        Ok(self.expansion_zoom_of(aggregate))
    }

    fn level(&self, zoom: u8) -> &ZoomLevel {
        let zoom = self.config.clamp_zoom(zoom);
        &self.levels[usize::from(zoom - self.config.min_zoom)]
    }

    fn aggregate_at(&self, id: ClusterId) -> Option<&Aggregate> {
        let offset = id.checked_sub(self.leaves.len() as u64)?;
        self.aggregates.get(usize::try_from(offset).ok()?)
    }

    fn aggregate(&self, id: ClusterId) -> Result<&Aggregate> {
        self.aggregate_at(id).ok_or(ClusterError::ClusterNotFound(id))
    }

    fn expansion_zoom_of(&self, aggregate: &Aggregate) -> Option<u8> {
        (aggregate.zoom < self.config.max_zoom).then(|| aggregate.zoom + 1)
    }

    fn record(&self, id: ClusterId) -> ClusterRecord {
        match self.aggregate_at(id) {
            Some(aggregate) => ClusterRecord::Cluster {
                id,
                point_count: aggregate.count,
                longitude: aggregate.longitude,
                latitude: aggregate.latitude,
                expansion_zoom: self.expansion_zoom_of(aggregate),
            },
            None => {
                let (longitude, latitude) = self.leaves[id as usize];
                ClusterRecord::Point {
                    id,
                    longitude,
                    latitude,
                }
            }
        }
    }
}

impl fmt::Debug for ClusterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterIndex")
            .field("signature", &self.signature)
            .field("min_zoom", &self.config.min_zoom)
            .field("max_zoom", &self.config.max_zoom)
            .field("points", &self.leaves.len())
            .field("aggregates", &self.aggregates.len())
            .finish()
    }
}
