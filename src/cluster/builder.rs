//! Bottom-up construction of a [`ClusterIndex`].
//!
//! The working set starts as one member per input point. For every zoom from
//! `max_zoom` down to `min_zoom` the members of the level above are visited in
//! Morton order; each unabsorbed member gathers the unabsorbed members within
//! the zoom's radius and, when that yields at least `min_points` points, they
//! are replaced by a single count-weighted aggregate. Members that find no
//! partner pass through unchanged.

use super::index::{Aggregate, ClusterIndex, Member, Slot, ZoomLevel, build_tree};
use crate::compute::projection::{latitude_to_y, longitude_to_x, morton_key, radius_at_zoom};
use crate::compute::validation::validate_points;
use crate::config::ClusterConfig;
use crate::error::{ClusterError, Result};
use crate::filter::FilterSignature;
use geocluster_types::point::GeoPoint;
use rstar::RTree;
use smallvec::SmallVec;
use std::time::Instant;

/// Builder for [`ClusterIndex`] values.
///
/// # Examples
///
/// ```rust
/// use geocluster::{ClusterConfig, ClusterIndexBuilder};
/// use geocluster_types::bbox::BoundingBox;
/// use geocluster_types::point::GeoPoint;
///
/// let points = vec![
///     GeoPoint::new("a", 36.8219, 1.2921),
///     GeoPoint::new("b", 8.6753, 9.0820),
/// ];
/// let index = ClusterIndexBuilder::new()
///     .config(ClusterConfig::default().with_radius(100.0))
///     .build(&points)?;
///
/// assert_eq!(index.query(&BoundingBox::world(), 0).len(), 1);
/// assert_eq!(index.query(&BoundingBox::world(), 16).len(), 2);
/// # Ok::<(), geocluster::ClusterError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ClusterIndexBuilder {
    config: ClusterConfig,
    signature: FilterSignature,
}

impl ClusterIndexBuilder {
    /// Create a builder with the default configuration for the unfiltered set.
    pub fn new() -> Self {
        Self {
            config: ClusterConfig::default(),
            signature: FilterSignature::all(),
        }
    }

    /// Set the clustering parameters.
    pub fn config(mut self, config: ClusterConfig) -> Self {
        self.config = config;
        self
    }

    /// Label the index with the signature of the point set it is built from.
    pub fn signature(mut self, signature: FilterSignature) -> Self {
        self.signature = signature;
        self
    }

    /// Cluster `points` into a new index.
    pub fn build(&self, points: &[GeoPoint]) -> Result<ClusterIndex> {
        self.config.validate().map_err(ClusterError::InvalidInput)?;
        validate_points(points)?;

        if u32::try_from(points.len()).is_err() {
            return Err(ClusterError::build_failure(
                &self.signature,
                format!("{} points exceed the supported maximum", points.len()),
            ));
        }
        if points.is_empty() {
            log::warn!("Building cluster index '{}' with no points", self.signature);
        }

        let started = Instant::now();
        let leaves: Vec<(f64, f64)> = points
            .iter()
            .map(|point| (point.longitude(), point.latitude()))
            .collect();
        let leaf_members: Vec<Member> = leaves
            .iter()
            .enumerate()
            .map(|(id, &(longitude, latitude))| Member {
                id: id as u64,
                x: longitude_to_x(longitude),
                y: latitude_to_y(latitude),
                longitude,
                latitude,
                count: 1,
            })
            .collect();
        let leaf_tree = build_tree(&leaf_members);

        let mut aggregates = Vec::new();
        let mut levels: Vec<ZoomLevel> = Vec::with_capacity(self.config.level_count());
        for zoom in (self.config.min_zoom..=self.config.max_zoom).rev() {
            let (members, tree) = match levels.last() {
                Some(above) => (&above.members, &above.tree),
                None => (&leaf_members, &leaf_tree),
            };
            let merged = self.cluster_level(members, tree, zoom, leaves.len(), &mut aggregates);
            levels.push(ZoomLevel::new(zoom, merged));
        }
        levels.reverse();

        self.check_levels(&levels, points.len())?;

        log::info!(
            "Built cluster index '{}': {} points, {} aggregates, zooms {}..={} in {:.2?}",
            self.signature,
            points.len(),
            aggregates.len(),
            self.config.min_zoom,
            self.config.max_zoom,
            started.elapsed()
        );

        Ok(ClusterIndex::from_parts(
            self.signature.clone(),
            self.config.clone(),
            levels,
            aggregates,
            leaves,
        ))
    }

    /// Merge the members of the level above into the members of `zoom`.
    fn cluster_level(
        &self,
        members: &[Member],
        tree: &RTree<Slot>,
        zoom: u8,
        leaf_count: usize,
        aggregates: &mut Vec<Aggregate>,
    ) -> Vec<Member> {
        let radius = radius_at_zoom(self.config.radius_px, self.config.tile_extent_px, zoom);
        let radius_squared = radius * radius;

        let mut order: Vec<usize> = (0..members.len()).collect();
        order.sort_by_key(|&slot| {
            let member = &members[slot];
            (morton_key(member.x, member.y), member.id)
        });

        let mut absorbed = vec![false; members.len()];
        let mut next = Vec::with_capacity(members.len());

        for slot in order {
            if absorbed[slot] {
                continue;
            }
            absorbed[slot] = true;
            let origin = members[slot];

            let mut neighbors: Vec<usize> = tree
                .locate_within_distance([origin.x, origin.y], radius_squared)
                .map(|found| found.data)
                .filter(|&other| !absorbed[other])
                .collect();
            neighbors.sort_unstable();

            let count = neighbors
                .iter()
                .fold(origin.count, |sum, &other| sum + members[other].count);

            if neighbors.is_empty() || (count as usize) < self.config.min_points {
                next.push(origin);
                // Neighbours too few to merge still stay put at this zoom.
                for other in neighbors {
                    absorbed[other] = true;
                    next.push(members[other]);
                }
                continue;
            }

            let mut centroid = Centroid::default();
            centroid.add(&origin);
            let mut children: SmallVec<[u64; 4]> = SmallVec::with_capacity(neighbors.len() + 1);
            children.push(origin.id);
            for other in neighbors {
                absorbed[other] = true;
                let member = &members[other];
                centroid.add(member);
                children.push(member.id);
            }

            let id = (leaf_count + aggregates.len()) as u64;
            let merged = centroid.into_member(id, count);
            aggregates.push(Aggregate {
                longitude: merged.longitude,
                latitude: merged.latitude,
                count,
                zoom,
                children,
            });
            next.push(merged);
        }

        next
    }

    /// Every level must account for every point exactly once.
    fn check_levels(&self, levels: &[ZoomLevel], point_count: usize) -> Result<()> {
        for level in levels {
            let total = level.point_total();
            if total != point_count as u64 {
                return Err(ClusterError::build_failure(
                    &self.signature,
                    format!(
                        "zoom {} holds {} points, expected {}",
                        level.zoom, total, point_count
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Count-weighted sums of member positions.
///
/// Projected sums place the merged member in the R-tree; geographic sums give
/// the reported centroid, which stays within the constituents' bounds even
/// where the projection clamps near the poles.
#[derive(Default)]
struct Centroid {
    x: f64,
    y: f64,
    longitude: f64,
    latitude: f64,
}

impl Centroid {
    fn add(&mut self, member: &Member) {
        let weight = f64::from(member.count);
        self.x += member.x * weight;
        self.y += member.y * weight;
        self.longitude += member.longitude * weight;
        self.latitude += member.latitude * weight;
    }

    fn into_member(self, id: u64, count: u32) -> Member {
        let total = f64::from(count);
        Member {
            id,
            x: self.x / total,
            y: self.y / total,
            longitude: self.longitude / total,
            latitude: self.latitude / total,
            count,
        }
    }
}

impl Default for ClusterIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}
