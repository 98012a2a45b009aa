use criterion::{black_box, criterion_group, criterion_main, Criterion};

use furlong::cache::{fingerprint, FactorCache, Param};
use furlong::factor::FactorKind;

fn criterion_benchmark(c: &mut Criterion) {
    let past_race_ids: Vec<String> = (0..20).map(|i| format!("20240506{i:04}")).collect();
    let params = [
        ("target_surface", Param::Str("turf")),
        ("target_distance", Param::U32(1600)),
    ];

    c.bench_function("cri_cache_fingerprint", |b| {
        b.iter(|| {
            black_box(fingerprint(
                FactorKind::CourseFit,
                "2019104123",
                &past_race_ids,
                &params,
            ))
        });
    });

    fn bench_cycle(c: &mut Criterion, capacity: usize, keys: u64) {
        let mut cache = FactorCache::new(capacity).unwrap();
        c.bench_function(&format!("cri_cache_cycle_{capacity}cap_{keys}keys"), |b| {
            b.iter(|| {
                for key in 0..keys {
                    if cache.get(key).is_none() {
                        cache.insert(key, Some(key as f64));
                    }
                }
            });
        });
    }
    // All-hit and constantly-evicting regimes.
    bench_cycle(c, 10_000, 1_000);
    bench_cycle(c, 1_000, 10_000);
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
