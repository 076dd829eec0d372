use serde::{Deserialize, Serialize};

/// Id of a cluster or point within one [`ClusterIndex`](super::ClusterIndex).
///
/// Ids below the index's point count are leaf positions in the point slice the
/// index was built from; larger ids name aggregates.
pub type ClusterId = u64;

/// One entry of a viewport query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClusterRecord {
    /// Several points merged at this zoom.
    Cluster {
        id: ClusterId,
        point_count: u32,
        longitude: f64,
        latitude: f64,
        /// Zoom at which the aggregate splits; absent when that would be
        /// beyond the index's `max_zoom`.
        expansion_zoom: Option<u8>,
    },
    /// A single input point, passed through unmerged.
    Point {
        id: ClusterId,
        longitude: f64,
        latitude: f64,
    },
}

impl ClusterRecord {
    pub fn id(&self) -> ClusterId {
        match self {
            ClusterRecord::Cluster { id, .. } | ClusterRecord::Point { id, .. } => *id,
        }
    }

    /// Number of input points this record stands for.
    pub fn point_count(&self) -> usize {
        match self {
            ClusterRecord::Cluster { point_count, .. } => *point_count as usize,
            ClusterRecord::Point { .. } => 1,
        }
    }

    pub fn longitude(&self) -> f64 {
        match self {
            ClusterRecord::Cluster { longitude, .. } | ClusterRecord::Point { longitude, .. } => {
                *longitude
            }
        }
    }

    pub fn latitude(&self) -> f64 {
        match self {
            ClusterRecord::Cluster { latitude, .. } | ClusterRecord::Point { latitude, .. } => {
                *latitude
            }
        }
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self, ClusterRecord::Cluster { .. })
    }

    pub fn expansion_zoom(&self) -> Option<u8> {
        match self {
            ClusterRecord::Cluster { expansion_zoom, .. } => *expansion_zoom,
            ClusterRecord::Point { .. } => None,
        }
    }

    /// Position of the underlying point in the indexed slice, for leaves.
    pub fn leaf_index(&self) -> Option<usize> {
        match self {
            ClusterRecord::Point { id, .. } => usize::try_from(*id).ok(),
            ClusterRecord::Cluster { .. } => None,
        }
    }
}
