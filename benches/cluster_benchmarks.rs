use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use geocluster::{
    BoundingBox, CacheBuilder, ClusterConfig, ClusterIndexBuilder, ClusterRequest,
    FilterPredicate, MemoryLoader, QueryEngine,
};
use geocluster_types::point::GeoPoint;
use std::sync::Arc;

fn dataset(size: usize) -> Vec<GeoPoint> {
    let genders = ["female", "male"];
    let countries = ["KE", "NG", "GH", "ZA", "EG", "US", "BR"];
    (0..size)
        .map(|i| {
            let lon = -180.0 + ((i * 7919) % 360_000) as f64 * 0.001;
            let lat = -60.0 + ((i * 104_729) % 120_000) as f64 * 0.001;
            GeoPoint::new(format!("p{}", i), lon, lat)
                .with_attribute("gender", genders[i % genders.len()].into())
                .with_attribute("country", countries[i % countries.len()].into())
                .with_attribute("is_graduate", (i % 3 == 0).into())
        })
        .collect()
}

fn benchmark_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");
    group.sample_size(10);

    for size in [1_000, 10_000, 50_000] {
        let points = dataset(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &points, |b, points| {
            b.iter(|| {
                ClusterIndexBuilder::new()
                    .build(black_box(points))
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn benchmark_viewport_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("viewport_queries");
    let index = ClusterIndexBuilder::new().build(&dataset(50_000)).unwrap();

    for zoom in [0u8, 4, 8, 12] {
        group.bench_with_input(BenchmarkId::new("world", zoom), &zoom, |b, &zoom| {
            b.iter(|| index.query(black_box(&BoundingBox::world()), zoom))
        });
    }

    let viewport = BoundingBox::new(-20.0, -35.0, 55.0, 38.0);
    group.bench_function("regional_zoom_6", |b| {
        b.iter(|| index.query(black_box(&viewport), 6))
    });

    let wrapped = BoundingBox::new(150.0, -50.0, -150.0, 10.0);
    group.bench_function("antimeridian_zoom_6", |b| {
        b.iter(|| index.query(black_box(&wrapped), 6))
    });

    group.finish();
}

fn benchmark_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache");
    group.sample_size(10);
    let points = dataset(20_000);

    let engine = QueryEngine::new(Arc::new(
        CacheBuilder::new(MemoryLoader::from_points(points.clone()))
            .cluster_config(ClusterConfig::default())
            .preload_all(true)
            .build()
            .unwrap(),
    ));

    let request = ClusterRequest::new([-180.0, -85.0, 180.0, 85.0], 3);
    group.bench_function("cached_query", |b| {
        b.iter(|| engine.get_clusters(black_box(&request)).unwrap())
    });

    let predicate = FilterPredicate::new().with_gender("female").with_country("NG");
    group.bench_function("filtered_rebuild_from_resident", |b| {
        b.iter(|| engine.cache().get_or_build(black_box(&predicate), true).unwrap())
    });

    let cold = CacheBuilder::new(MemoryLoader::from_points(points))
        .build()
        .unwrap();
    group.bench_function("filtered_rebuild_from_loader", |b| {
        b.iter(|| cold.get_or_build(black_box(&predicate), true).unwrap())
    });

    group.finish();
}

fn benchmark_signatures(c: &mut Criterion) {
    let predicate = FilterPredicate::new()
        .with_gender("female")
        .with_country("KE")
        .with_flag(geocluster::Attribute::IsGraduate, true)
        .with_flag(geocluster::Attribute::HasVideo, false);

    c.bench_function("filter_signature", |b| {
        b.iter(|| black_box(&predicate).signature())
    });
}

criterion_group!(
    benches,
    benchmark_index_build,
    benchmark_viewport_queries,
    benchmark_cache,
    benchmark_signatures
);
criterion_main!(benches);
