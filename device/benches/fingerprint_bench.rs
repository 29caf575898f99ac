use criterion::{black_box, criterion_group, criterion_main, Criterion};

use samaritan_device::{compute_fingerprint, DeviceAttributes};

fn sample_attributes() -> DeviceAttributes {
    DeviceAttributes {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                     Chrome/124.0.0.0 Safari/537.36"
            .into(),
        screen: "1920x1080".into(),
        timezone: "Europe/Berlin".into(),
        language: "de-DE".into(),
        platform: "Linux x86_64".into(),
        color_depth: 24,
        pixel_ratio: 1.25,
        touch_support: false,
        device_memory_gb: Some(8.0),
        hardware_concurrency: Some(12),
    }
}

fn fingerprint_bench(c: &mut Criterion) {
    let attrs = sample_attributes();
    c.bench_function("compute_fingerprint", |b| {
        b.iter(|| compute_fingerprint(black_box(&attrs)))
    });
}

fn fingerprint_sparse_bench(c: &mut Criterion) {
    let attrs = DeviceAttributes {
        device_memory_gb: None,
        hardware_concurrency: None,
        ..sample_attributes()
    };
    c.bench_function("compute_fingerprint_unknown_hardware", |b| {
        b.iter(|| compute_fingerprint(black_box(&attrs)))
    });
}

fn canonical_bench(c: &mut Criterion) {
    let attrs = sample_attributes();
    c.bench_function("canonical_preimage", |b| {
        b.iter(|| black_box(&attrs).canonical())
    });
}

criterion_group!(benches, fingerprint_bench, fingerprint_sparse_bench, canonical_bench);
criterion_main!(benches);
