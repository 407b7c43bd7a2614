use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use emraster_core::config::EngineConfig;
use emraster_core::geometry::Geometry;
use emraster_exec::{Engine, Operand};
use emraster_io::Raster;

fn make_raster(nrow: usize, ncol: usize, nlyr: usize) -> Raster {
    let values = (0..nrow * ncol * nlyr)
        .map(|i| if i % 97 == 0 { f64::NAN } else { (i % 13) as f64 })
        .collect();
    Raster::from_values(Geometry::grid(nrow, ncol), nlyr, values).unwrap()
}

fn bench_arith(c: &mut Criterion) {
    let a = make_raster(512, 256, 3);
    let b = make_raster(512, 256, 1);
    let mut group = c.benchmark_group("arith");

    // 256 KiB cap forces many blocks on a 3 MiB grid.
    for cap in [256 * 1024, 64 * 1024 * 1024] {
        let engine = Engine::new(EngineConfig {
            mem_cap_bytes: cap,
            ..Default::default()
        });
        group.bench_with_input(BenchmarkId::new("scalar", cap), &cap, |bench, _| {
            bench.iter(|| {
                let out = engine.arith_scalar(&a, 2.5, "*", false);
                assert!(out.error().is_none());
            })
        });
        group.bench_with_input(BenchmarkId::new("vector", cap), &cap, |bench, _| {
            bench.iter(|| {
                let out = engine.arith(&a, Operand::PerLayer(vec![1.0, 2.0]), "^", true);
                assert!(out.error().is_none());
            })
        });
        group.bench_with_input(BenchmarkId::new("raster", cap), &cap, |bench, _| {
            bench.iter(|| {
                let out = engine.arith_raster(&a, &b, ">=");
                assert!(out.error().is_none());
            })
        });
    }
    group.finish();
}

criterion_group!(arith, bench_arith);
criterion_main!(arith);
