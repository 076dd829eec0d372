use geocluster::{CacheBuilder, CacheConfig, FilterPredicate, MemoryLoader};
use geocluster_types::point::GeoPoint;

#[test]
fn test_toml_config_drives_cache() {
    let toml_str = r#"
        max_entries = 8
        load_page_size = 2

        [cluster]
        max_zoom = 12
        radius_px = 60.0
    "#;
    let config = CacheConfig::from_toml(toml_str).expect("valid config");
    assert_eq!(config.max_entries, Some(8));
    assert_eq!(config.load_page_size, Some(2));
    assert_eq!(config.max_records, None);
    assert_eq!(config.cluster.max_zoom, 12);
    assert_eq!(config.cluster.min_zoom, 0);
    assert_eq!(config.cluster.radius_px, 60.0);
    assert_eq!(config.cluster.tile_extent_px, 512.0);

    let loader = MemoryLoader::from_points((0..5).map(|i| GeoPoint::new(format!("p{}", i), i as f64, 0.0)));
    let cache = CacheBuilder::new(loader).config(config).build().unwrap();
    let (_, index) = cache.get_or_build(&FilterPredicate::new(), false).unwrap();
    assert_eq!(index.num_points(), 5);
    assert_eq!(index.max_zoom(), 12);
}

#[test]
fn test_toml_round_trip() {
    let config = CacheConfig::default().with_max_records(10_000).with_page_size(500);
    let toml_str = config.to_toml().unwrap();
    let parsed = CacheConfig::from_toml(&toml_str).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_invalid_toml_config_rejected() {
    assert!(CacheConfig::from_toml("max_entries = 0").is_err());
    assert!(CacheConfig::from_toml("[cluster]\nmin_zoom = 9\nmax_zoom = 3").is_err());
    assert!(CacheConfig::from_toml("load_page_size = \"many\"").is_err());
}
