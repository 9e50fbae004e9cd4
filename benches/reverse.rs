use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use exprtape::grad;

#[path = "common/mod.rs"]
mod common;
use common::*;

fn bench_reverse_gradient(c: &mut Criterion) {
    let mut group = c.benchmark_group("reverse_gradient");
    for n in [2, 10, 100, 1000] {
        let x = make_input(n);

        group.bench_with_input(BenchmarkId::new("f64_eval", n), &x, |b, x| {
            b.iter(|| black_box(rosenbrock_f64(black_box(x))))
        });

        group.bench_with_input(BenchmarkId::new("rosenbrock_jacobian", n), &x, |b, x| {
            b.iter(|| black_box(grad(|v| rosenbrock_jacobian(v), black_box(x))))
        });

        group.bench_with_input(BenchmarkId::new("rosenbrock_primal", n), &x, |b, x| {
            b.iter(|| black_box(grad(|v| rosenbrock_primal(v), black_box(x))))
        });

        group.bench_with_input(BenchmarkId::new("rosenbrock_fd", n), &x, |b, x| {
            b.iter(|| black_box(finite_diff_gradient(rosenbrock_f64, x, 1e-7)))
        });

        group.bench_with_input(BenchmarkId::new("two_argument_jacobian", n), &x, |b, x| {
            b.iter(|| black_box(grad(|v| two_argument_jacobian(v), black_box(x))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_reverse_gradient);
criterion_main!(benches);
