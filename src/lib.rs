//! Filter-keyed cache of multi-zoom point cluster indexes for map viewports.
//!
//! ```rust
//! use geocluster::{CacheBuilder, ClusterRequest, FilterPredicate, MemoryLoader, QueryEngine};
//! use geocluster_types::point::GeoPoint;
//! use std::sync::Arc;
//!
//! let loader = MemoryLoader::from_points(vec![
//!     GeoPoint::new("nairobi", 36.8219, -1.2921).with_attribute("gender", "female".into()),
//!     GeoPoint::new("abuja", 7.4951, 9.0765).with_attribute("gender", "male".into()),
//! ]);
//! let engine = QueryEngine::new(Arc::new(CacheBuilder::new(loader).build()?));
//!
//! let request = ClusterRequest::new([-180.0, -85.0, 180.0, 85.0], 4)
//!     .with_filters(FilterPredicate::new().with_gender("female"));
//! let features = engine.get_clusters(&request)?;
//! assert_eq!(features.len(), 1);
//! # Ok::<(), geocluster::ClusterError>(())
//! ```

pub mod builder;
pub mod cache;
pub mod cluster;
pub mod compute;
pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod query;

pub use builder::CacheBuilder;
pub use cache::{CacheEntry, CacheStats, IndexCache};
pub use cluster::{ClusterId, ClusterIndex, ClusterIndexBuilder, ClusterRecord};
pub use config::{CacheConfig, ClusterConfig};
pub use error::{ClusterError, LoaderError, Result};
pub use filter::{Attribute, AttributeKind, FilterPredicate, FilterSignature, FilterValue};
pub use loader::{MemoryLoader, Page, PointLoader, RawRecord};
pub use query::{ClusterFeature, ClusterRequest, ClusterSummary, PointFeature, QueryEngine};

pub use geocluster_types::bbox::BoundingBox;
pub use geocluster_types::point::{AttributeValue, GeoPoint};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{CacheBuilder, ClusterError, QueryEngine, Result};

    pub use crate::{CacheConfig, ClusterConfig};

    pub use crate::{ClusterFeature, ClusterRequest, FilterPredicate, FilterSignature};

    pub use crate::{ClusterIndex, ClusterIndexBuilder, ClusterRecord};

    pub use crate::{MemoryLoader, PointLoader};

    pub use crate::{BoundingBox, GeoPoint};
}
