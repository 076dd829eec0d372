//! Cache builder for flexible configuration
//!
//! This module provides a builder pattern for creating an [`IndexCache`] from
//! a point loader and clustering, paging and eviction settings.

use crate::cache::IndexCache;
use crate::config::{CacheConfig, ClusterConfig};
use crate::error::Result;
use crate::filter::FilterPredicate;
use crate::loader::PointLoader;
use std::fmt;
use std::sync::Arc;

/// Builder for [`IndexCache`] with a loader and optional settings.
///
/// # Examples
///
/// ```rust
/// use geocluster::{CacheBuilder, ClusterConfig, FilterPredicate, MemoryLoader};
/// use geocluster_types::point::GeoPoint;
///
/// let loader = MemoryLoader::from_points(vec![
///     GeoPoint::new("a", 36.8219, 1.2921),
///     GeoPoint::new("b", 8.6753, 9.0820),
/// ]);
/// let cache = CacheBuilder::new(loader)
///     .cluster_config(ClusterConfig::default().with_radius(60.0))
///     .page_size(500)
///     .build()?;
///
/// let (signature, index) = cache.get_or_build(&FilterPredicate::new(), false)?;
/// assert_eq!(signature.as_str(), "all");
/// assert_eq!(index.num_points(), 2);
/// # Ok::<(), geocluster::ClusterError>(())
/// ```
pub struct CacheBuilder {
    loader: Arc<dyn PointLoader>,
    config: CacheConfig,
    preload: bool,
}

impl CacheBuilder {
    /// Create a builder with default configuration.
    pub fn new(loader: impl PointLoader + 'static) -> Self {
        Self::from_shared(Arc::new(loader))
    }

    /// Create a builder over a loader that is also used elsewhere.
    pub fn from_shared(loader: Arc<dyn PointLoader>) -> Self {
        Self {
            loader,
            config: CacheConfig::default(),
            preload: false,
        }
    }

    /// Replace the whole cache configuration.
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the clustering parameters used for every index.
    pub fn cluster_config(mut self, cluster: ClusterConfig) -> Self {
        self.config.cluster = cluster;
        self
    }

    /// Bound the number of cached indexes, evicting least recently used first.
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.config.max_entries = Some(max_entries);
        self
    }

    /// Request rows from the loader in pages of `page_size`.
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.config.load_page_size = Some(page_size);
        self
    }

    /// Cap the number of rows requested per signature.
    pub fn max_records(mut self, max_records: usize) -> Self {
        self.config.max_records = Some(max_records);
        self
    }

    /// Build the unfiltered index while constructing the cache.
    pub fn preload_all(mut self, preload: bool) -> Self {
        self.preload = preload;
        self
    }

    /// Validate the configuration and create the cache.
    pub fn build(self) -> Result<IndexCache> {
        let cache = IndexCache::new(self.loader, self.config)?;
        if self.preload {
            let (_, index) = cache.get_or_build(&FilterPredicate::new(), false)?;
            log::info!("Preloaded unfiltered index with {} points", index.num_points());
        }
        Ok(cache)
    }
}

impl fmt::Debug for CacheBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheBuilder")
            .field("config", &self.config)
            .field("preload", &self.preload)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClusterError;
    use crate::filter::FilterSignature;
    use crate::loader::MemoryLoader;
    use geocluster_types::point::GeoPoint;

    fn loader() -> MemoryLoader {
        MemoryLoader::from_points((0..5).map(|i| GeoPoint::new(format!("p{}", i), i as f64, 0.0)))
    }

    #[test]
    fn test_builder_applies_settings() {
        let cache = CacheBuilder::new(loader())
            .cluster_config(ClusterConfig::default().with_zoom_range(2, 10))
            .max_entries(4)
            .page_size(2)
            .max_records(3)
            .build()
            .unwrap();

        let config = cache.config();
        assert_eq!(config.cluster.min_zoom, 2);
        assert_eq!(config.cluster.max_zoom, 10);
        assert_eq!(config.max_entries, Some(4));
        assert_eq!(config.load_page_size, Some(2));
        assert_eq!(config.max_records, Some(3));

        let (_, index) = cache.get_or_build(&FilterPredicate::new(), false).unwrap();
        assert_eq!(index.num_points(), 3);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = CacheBuilder::new(loader()).page_size(0).build();
        assert!(matches!(result, Err(ClusterError::InvalidInput(_))));

        let result = CacheBuilder::new(loader())
            .cluster_config(ClusterConfig::default().with_zoom_range(8, 4))
            .build();
        assert!(matches!(result, Err(ClusterError::InvalidInput(_))));
    }

    #[test]
    fn test_preload_builds_unfiltered_index() {
        let shared = Arc::new(loader());
        let cache = CacheBuilder::from_shared(shared.clone())
            .preload_all(true)
            .build()
            .unwrap();

        assert!(cache.contains(&FilterSignature::all()));
        assert_eq!(shared.calls(), 1);
        assert_eq!(cache.stats().cache_misses, 1);
    }
}
