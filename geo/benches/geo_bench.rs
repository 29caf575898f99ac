use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn distance_bench(c: &mut Criterion) {
    c.bench_function("haversine_distance_km", |b| {
        b.iter(|| {
            samaritan_geo::distance_km(
                black_box(-33.8688),
                black_box(151.2093),
                black_box(-37.8136),
                black_box(144.9631),
            )
        })
    });
}

fn bearing_bench(c: &mut Criterion) {
    c.bench_function("initial_bearing_degrees", |b| {
        b.iter(|| {
            samaritan_geo::bearing_degrees(
                black_box(51.5074),
                black_box(-0.1278),
                black_box(48.8566),
                black_box(2.3522),
            )
        })
    });
}

fn decimal_places_bench(c: &mut Criterion) {
    c.bench_function("decimal_places", |b| {
        b.iter(|| samaritan_geo::decimal_places(black_box(151.209312)))
    });
}

criterion_group!(benches, distance_bench, bearing_bench, decimal_places_bench);
criterion_main!(benches);
