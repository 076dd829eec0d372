use geocluster::{
    BoundingBox, CacheBuilder, ClusterConfig, ClusterError, ClusterIndexBuilder, ClusterRequest,
    FilterPredicate, MemoryLoader, QueryEngine, RawRecord,
};
use geocluster_types::point::GeoPoint;
use std::sync::Arc;

fn engine_over(points: Vec<GeoPoint>, config: ClusterConfig) -> QueryEngine {
    let cache = CacheBuilder::new(MemoryLoader::from_points(points))
        .cluster_config(config)
        .build()
        .expect("Failed to build cache");
    QueryEngine::new(Arc::new(cache))
}

/// Test 1: Large dataset stays consistent at every zoom
#[test]
fn test_large_dataset_count_conservation() {
    // 10K points (keeping it reasonable for CI)
    let points: Vec<GeoPoint> = (0..10_000)
        .map(|i| {
            let lat = -60.0 + (i % 120) as f64 + (i as f64 * 0.00001);
            let lon = -170.0 + ((i * 7) % 340) as f64 + (i as f64 * 0.00001);
            GeoPoint::new(format!("p{}", i), lon, lat)
        })
        .collect();
    let index = ClusterIndexBuilder::new()
        .build(&points)
        .expect("Failed to build index");

    for zoom in [0u8, 3, 8, 12, 16] {
        let total: usize = index
            .query(&BoundingBox::world(), zoom)
            .iter()
            .map(|record| record.point_count())
            .sum();
        assert_eq!(total, points.len(), "zoom {}", zoom);
    }
}

/// Test 2: Extreme coordinate values
#[test]
fn test_extreme_coordinates() {
    let points = vec![
        GeoPoint::new("north", 0.0, 90.0),
        GeoPoint::new("south", 0.0, -90.0),
        GeoPoint::new("dateline-east", 180.0, 0.0),
        GeoPoint::new("dateline-west", -180.0, 0.0),
    ];
    let index = ClusterIndexBuilder::new()
        .build(&points)
        .expect("Failed to build index with extreme coordinates");

    let total: usize = index
        .query(&BoundingBox::new(-180.0, -90.0, 180.0, 90.0), 16)
        .iter()
        .map(|record| record.point_count())
        .sum();
    assert_eq!(total, 4);
}

/// Test 3: Viewport crossing the antimeridian
#[test]
fn test_antimeridian_viewport() {
    let points = vec![
        GeoPoint::new("fiji", 178.4, -18.1),
        GeoPoint::new("samoa", -171.8, -13.8),
        GeoPoint::new("lima", -77.0, -12.0),
    ];
    let engine = engine_over(points, ClusterConfig::default());

    let features = engine
        .get_clusters(&ClusterRequest::new([170.0, -30.0, -165.0, 0.0], 10))
        .expect("Query failed");
    let mut ids: Vec<_> = features
        .iter()
        .filter_map(|feature| feature.as_point())
        .map(|point| point.id.clone())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["fiji", "samoa"]);
}

/// Test 4: Malformed requests are rejected before any build
#[test]
fn test_malformed_requests() {
    let engine = engine_over(vec![GeoPoint::new("a", 1.0, 1.0)], ClusterConfig::default());

    let cases = [
        ClusterRequest::new([0.0, 10.0, 10.0, 0.0], 3),
        ClusterRequest::new([0.0, 0.0, f64::INFINITY, 10.0], 3),
        ClusterRequest::new([0.0, 0.0, 10.0, 10.0], -4),
    ];
    for request in &cases {
        assert!(matches!(
            engine.get_clusters(request),
            Err(ClusterError::InvalidInput(_))
        ));
    }
    assert!(engine.cache().is_empty());
}

/// Test 5: Zoom far beyond the configured range clamps to max_zoom
#[test]
fn test_zoom_beyond_range() {
    let engine = engine_over(
        vec![GeoPoint::new("a", 1.0, 1.0), GeoPoint::new("b", 1.0001, 1.0)],
        ClusterConfig::default().with_zoom_range(0, 5),
    );
    let at_max = engine
        .get_clusters(&ClusterRequest::new([-180.0, -85.0, 180.0, 85.0], 5))
        .unwrap();
    let beyond = engine
        .get_clusters(&ClusterRequest::new([-180.0, -85.0, 180.0, 85.0], 400))
        .unwrap();
    assert_eq!(at_max, beyond);
}

/// Test 6: Records without coordinates are skipped, invalid ones dropped
#[test]
fn test_incomplete_source_rows() {
    let rows = vec![
        RawRecord::new("no-location"),
        RawRecord::new("bad-lat").with_location(10.0, 95.0),
        RawRecord::new("ok").with_location(10.0, 45.0),
    ];
    let cache = CacheBuilder::new(MemoryLoader::new(rows))
        .build()
        .expect("Failed to build cache");
    let (_, index) = cache
        .get_or_build(&FilterPredicate::new(), false)
        .expect("Build failed");
    assert_eq!(index.num_points(), 1);
}

/// Test 7: Empty source builds an empty, queryable index
#[test]
fn test_empty_source() {
    let engine = engine_over(Vec::new(), ClusterConfig::default());
    let features = engine
        .get_clusters(&ClusterRequest::new([-180.0, -85.0, 180.0, 85.0], 0))
        .unwrap();
    assert!(features.is_empty());
    assert_eq!(engine.stats().cached_indexes, 1);
}

/// Test 8: Unknown cluster ids
#[test]
fn test_unknown_cluster_ids() {
    let engine = engine_over(
        vec![GeoPoint::new("a", 1.0, 1.0), GeoPoint::new("b", 1.0, 1.0)],
        ClusterConfig::default(),
    );
    let filters = FilterPredicate::new();

    assert!(matches!(
        engine.children(&filters, 999),
        Err(ClusterError::ClusterNotFound(999))
    ));
    // Leaf ids are not aggregates.
    assert!(matches!(
        engine.leaves(&filters, 1, 10, 0),
        Err(ClusterError::ClusterNotFound(1))
    ));
}

/// Test 9: Categorical values containing separators do not collide
#[test]
fn test_signature_collision_resistance() {
    let tricky = FilterPredicate::new().with_gender("a_is_graduate=1");
    let plain = FilterPredicate::new()
        .with_gender("a")
        .with_flag(geocluster::Attribute::IsGraduate, true);
    assert_ne!(tricky.signature(), plain.signature());

    let points = vec![
        GeoPoint::new("x", 0.0, 0.0).with_attribute("gender", "a_is_graduate=1".into()),
        GeoPoint::new("y", 1.0, 1.0)
            .with_attribute("gender", "a".into())
            .with_attribute("is_graduate", true.into()),
    ];
    let cache = CacheBuilder::new(MemoryLoader::from_points(points))
        .build()
        .unwrap();
    let (tricky_sig, _) = cache.get_or_build(&tricky, false).unwrap();
    let (plain_sig, _) = cache.get_or_build(&plain, false).unwrap();

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get_original_records(&tricky_sig)[0].id, "x");
    assert_eq!(cache.get_original_records(&plain_sig)[0].id, "y");
}
