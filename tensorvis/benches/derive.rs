use criterion::{
    BenchmarkId, Criterion, black_box, criterion_group, criterion_main,
};
use nalgebra::Matrix3;
use std::sync::Arc;
use tensorvis::{
    CancelToken, DeriveConfig, MetaData, NalgebraEigenSolver, TensorField3D,
    ThreadPool,
};

/// Symmetric tensors with a smoothly varying spectrum
fn tensors(n: usize) -> Arc<Vec<Matrix3<f32>>> {
    let v = (0..n * n * n)
        .map(|i| {
            let s = (i as f32 * 0.01).sin();
            let c = (i as f32 * 0.013).cos();
            Matrix3::new(
                2.0 + s, c, 0.1, //
                c, 1.0 - s, 0.5 * s, //
                0.1, 0.5 * s, -1.0 + c,
            )
        })
        .collect();
    Arc::new(v)
}

pub fn derive_thread_sweep(c: &mut Criterion) {
    const N: usize = 32;
    let data = tensors(N);

    let mut group = c.benchmark_group("speed vs threads (derive) (32^3)");
    for threads in [1, 2, 4, 8] {
        let pool = &ThreadPool::Custom(
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap(),
        );
        let data = data.clone();
        group.bench_function(BenchmarkId::new("nalgebra", threads), move |b| {
            b.iter(|| {
                let cfg = DeriveConfig {
                    threads: Some(pool),
                    cancel: CancelToken::new(),
                };
                black_box(
                    TensorField3D::with_config(
                        [N; 3],
                        data.clone(),
                        Arc::new(MetaData::new()),
                        &NalgebraEigenSolver,
                        &cfg,
                    )
                    .unwrap(),
                )
            })
        });
    }
}

pub fn data_maps(c: &mut Criterion) {
    let field = TensorField3D::from_shared([32; 3], tensors(32)).unwrap();
    c.bench_function("compute_data_maps (32^3)", move |b| {
        b.iter(|| {
            let mut f = field.clone();
            f.compute_data_maps().unwrap();
            black_box(f)
        })
    });
}

criterion_group!(benches, derive_thread_sweep, data_maps);
criterion_main!(benches);
