use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use exprtape::functions::{atan2, pow};
use exprtape::{record, Expression, ReplayRecord, Slot};

#[path = "common/mod.rs"]
mod common;
use common::*;

fn bench_primal_tape(c: &mut Criterion) {
    let mut group = c.benchmark_group("primal_tape");
    for n in [10, 100, 1000] {
        let x = make_input(n);

        group.bench_with_input(BenchmarkId::new("forward", n), &x, |b, x| {
            let (mut tape, _) = record(|v| rosenbrock_primal(v), x);
            b.iter(|| {
                tape.forward(black_box(x));
                black_box(tape.output_value())
            })
        });

        group.bench_with_input(BenchmarkId::new("gradient", n), &x, |b, x| {
            let (mut tape, _) = record(|v| rosenbrock_primal(v), x);
            b.iter(|| black_box(tape.gradient(black_box(x))))
        });

        group.bench_with_input(BenchmarkId::new("two_argument_gradient", n), &x, |b, x| {
            let (mut tape, _) = record(|v| two_argument_primal(v), x);
            b.iter(|| black_box(tape.gradient(black_box(x))))
        });
    }
    group.finish();
}

fn replay<E: Expression<f64>>(expr: &E) -> (f64, Vec<f64>) {
    let record = ReplayRecord::capture(expr);
    (
        record.value::<E>().unwrap_or(f64::NAN),
        record.adjoint::<E>(1.0).unwrap_or_default(),
    )
}

fn bench_capture_replay(c: &mut Criterion) {
    let x = Slot::new(0.7_f64, 0);
    let y = Slot::new(1.3_f64, 1);

    c.bench_function("capture_and_replay", |b| {
        b.iter(|| {
            let (x, y) = (black_box(x), black_box(y));
            black_box(replay(&(x / y + pow(x, y) - atan2(x, y) * 5.0_f64)))
        })
    });
}

criterion_group!(benches, bench_primal_tape, bench_capture_replay);
criterion_main!(benches);
