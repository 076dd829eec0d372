//! Clustering and cache configuration.
//!
//! Both types are plain serde structs so they can be loaded from JSON or, with
//! the `toml` feature, from TOML files shipped next to the service.
use serde::de::Error;
use serde::{Deserialize, Serialize};

/// Highest zoom level an index may materialize.
pub const MAX_SUPPORTED_ZOOM: u8 = 30;

/// Parameters of the hierarchical clustering.
///
/// # Example
///
/// ```rust
/// use geocluster::ClusterConfig;
///
/// let config = ClusterConfig::default();
/// assert_eq!(config.max_zoom, 16);
///
/// let json = r#"{ "radius_px": 60, "max_zoom": 14 }"#;
/// let config = ClusterConfig::from_json(json).unwrap();
/// assert_eq!(config.radius_px, 60.0);
/// assert_eq!(config.tile_extent_px, 512.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Lowest zoom level that gets its own cluster level
    #[serde(default)]
    pub min_zoom: u8,

    /// Highest zoom level that gets its own cluster level
    #[serde(default = "ClusterConfig::default_max_zoom")]
    pub max_zoom: u8,

    /// Merge radius in pixels of the zoom's tile space
    #[serde(default = "ClusterConfig::default_radius_px")]
    pub radius_px: f64,

    /// Tile width in pixels; the radius is relative to it
    #[serde(default = "ClusterConfig::default_tile_extent_px")]
    pub tile_extent_px: f64,

    /// Minimum number of points an aggregate must hold
    #[serde(default = "ClusterConfig::default_min_points")]
    pub min_points: usize,
}

impl ClusterConfig {
    const fn default_max_zoom() -> u8 {
        16
    }

    const fn default_radius_px() -> f64 {
        40.0
    }

    const fn default_tile_extent_px() -> f64 {
        512.0
    }

    const fn default_min_points() -> usize {
        2
    }

    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_radius(mut self, radius_px: f64) -> Self {
        self.radius_px = radius_px;
        self
    }

    pub fn with_tile_extent(mut self, tile_extent_px: f64) -> Self {
        self.tile_extent_px = tile_extent_px;
        self
    }

    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    /// Clamp a requested zoom into the materialized range.
    pub fn clamp_zoom(&self, zoom: u8) -> u8 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    /// Number of zoom levels an index built with this config holds.
    pub fn level_count(&self) -> usize {
        usize::from(self.max_zoom - self.min_zoom) + 1
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.min_zoom > self.max_zoom {
            return Err(format!(
                "min_zoom ({}) must not exceed max_zoom ({})",
                self.min_zoom, self.max_zoom
            ));
        }

        if self.max_zoom > MAX_SUPPORTED_ZOOM {
            return Err(format!(
                "max_zoom must be at most {}, got {}",
                MAX_SUPPORTED_ZOOM, self.max_zoom
            ));
        }

        if !self.radius_px.is_finite() || self.radius_px <= 0.0 {
            return Err("Cluster radius must be a positive finite number".to_string());
        }

        if !self.tile_extent_px.is_finite() || self.tile_extent_px <= 0.0 {
            return Err("Tile extent must be a positive finite number".to_string());
        }

        if self.min_points < 2 {
            return Err("min_points must be at least 2".to_string());
        }

        Ok(())
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: ClusterConfig = serde_json::from_str(json)?;
        config.validate().map_err(serde_json::Error::custom)?;
        Ok(config)
    }

    /// Save configuration as JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0,
            max_zoom: Self::default_max_zoom(),
            radius_px: Self::default_radius_px(),
            tile_extent_px: Self::default_tile_extent_px(),
            min_points: Self::default_min_points(),
        }
    }
}

/// Index cache configuration.
///
/// `max_entries` is unset by default: the cache keeps every signature until
/// [`IndexCache::clear`](crate::IndexCache::clear) is called. Setting it
/// enables least-recently-accessed eviction.
///
/// # Example
///
/// ```rust
/// use geocluster::CacheConfig;
///
/// let json = r#"{
///     "cluster": { "radius_px": 80 },
///     "max_entries": 64,
///     "load_page_size": 5000
/// }"#;
/// let config = CacheConfig::from_json(json).unwrap();
/// assert_eq!(config.max_entries, Some(64));
/// assert_eq!(config.cluster.max_zoom, 16);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Parameters used for every index the cache builds
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Upper bound on cached signatures (None means unbounded)
    #[serde(default)]
    pub max_entries: Option<usize>,

    /// Request the loader in pages of this size (None means one request)
    #[serde(default)]
    pub load_page_size: Option<usize>,

    /// Stop loading after this many records (None means no cap)
    #[serde(default)]
    pub max_records: Option<usize>,
}

impl CacheConfig {
    pub fn with_cluster(mut self, cluster: ClusterConfig) -> Self {
        self.cluster = cluster;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.load_page_size = Some(page_size);
        self
    }

    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = Some(max_records);
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        self.cluster.validate()?;

        if self.max_entries == Some(0) {
            return Err("max_entries must be greater than zero".to_string());
        }

        if self.load_page_size == Some(0) {
            return Err("load_page_size must be greater than zero".to_string());
        }

        if self.max_records == Some(0) {
            return Err("max_records must be greater than zero".to_string());
        }

        Ok(())
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: CacheConfig = serde_json::from_str(json)?;
        config.validate().map_err(serde_json::Error::custom)?;
        Ok(config)
    }

    /// Save configuration as JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: CacheConfig = toml::from_str(toml_str)?;
        config.validate().map_err(toml::de::Error::custom)?;
        Ok(config)
    }

    /// Save configuration as TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
