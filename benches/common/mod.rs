#![allow(dead_code)]

use exprtape::{ExprExt, JacobianReal64, PrimalReal64};

// ─── Rosenbrock ────────────────────────────────────────────────────────────

/// Rosenbrock over an active type; one recorded statement per term.
macro_rules! rosenbrock_active {
    ($name:ident, $active:ty) => {
        pub fn $name(x: &[$active]) -> $active {
            let mut sum = <$active>::constant(0.0);
            for i in 0..x.len() - 1 {
                let t1 = 1.0_f64 - x[i];
                let t2 = x[i + 1] - x[i] * x[i];
                sum += t1 * t1 + 100.0_f64 * t2 * t2;
            }
            sum
        }
    };
}

rosenbrock_active!(rosenbrock_jacobian, JacobianReal64);
rosenbrock_active!(rosenbrock_primal, PrimalReal64);

pub fn rosenbrock_f64(x: &[f64]) -> f64 {
    let mut sum = 0.0;
    for i in 0..x.len() - 1 {
        let t1 = 1.0 - x[i];
        let t2 = x[i + 1] - x[i] * x[i];
        sum += t1 * t1 + 100.0 * t2 * t2;
    }
    sum
}

// ─── Two-argument transcendental ───────────────────────────────────────────
// f(x) = Σ [x_i / x_{i+1} + pow(x_i, x_{i+1}) + atan2(x_i, x_{i+1})]

macro_rules! two_argument_active {
    ($name:ident, $active:ty) => {
        pub fn $name(x: &[$active]) -> $active {
            let mut sum = <$active>::constant(0.0);
            for i in 0..x.len() - 1 {
                sum += x[i] / x[i + 1] + x[i].powf(x[i + 1]) + x[i].atan2(x[i + 1]);
            }
            sum
        }
    };
}

two_argument_active!(two_argument_jacobian, JacobianReal64);
two_argument_active!(two_argument_primal, PrimalReal64);

// ─── Helpers ───────────────────────────────────────────────────────────────

pub fn make_input(n: usize) -> Vec<f64> {
    (0..n).map(|i| 0.5 + 0.01 * i as f64).collect()
}

pub fn finite_diff_gradient(f: fn(&[f64]) -> f64, x: &[f64], h: f64) -> Vec<f64> {
    let mut xp = x.to_vec();
    let mut xm = x.to_vec();
    (0..x.len())
        .map(|i| {
            xp[i] = x[i] + h;
            xm[i] = x[i] - h;
            let d = (f(&xp) - f(&xm)) / (2.0 * h);
            xp[i] = x[i];
            xm[i] = x[i];
            d
        })
        .collect()
}
