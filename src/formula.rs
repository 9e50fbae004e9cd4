//! Primal functions paired with their partial derivatives.
//!
//! Every elementary operation is a zero-sized type implementing [`UnaryOp`] or
//! [`BinaryOp`]. The same formula functions drive the live expression tree
//! ([`crate::UnaryExpr`], [`crate::BinaryExpr`]) and the offline replay path,
//! so the two can never drift apart.
//!
//! Derivatives take the operand value(s) together with the already-computed
//! result. No domain checks are made: undefined points produce IEEE `NaN` or
//! `Inf`, exactly as the primal does.

use std::fmt::Debug;

use crate::float::Float;

/// A differentiable function of one argument.
pub trait UnaryOp: Copy + Debug + Default + 'static {
    /// Name used in diagnostics.
    const NAME: &'static str;

    /// `f(a)`.
    fn primal<F: Float>(a: F) -> F;

    /// `df/da` evaluated at `a`, where `result == f(a)`.
    fn derivative<F: Float>(a: F, result: F) -> F;
}

/// A differentiable function of two arguments.
pub trait BinaryOp: Copy + Debug + Default + 'static {
    /// Name used in diagnostics.
    const NAME: &'static str;

    /// `f(a, b)`.
    fn primal<F: Float>(a: F, b: F) -> F;

    /// `∂f/∂a` evaluated at `(a, b)`, where `result == f(a, b)`.
    fn derivative_a<F: Float>(a: F, b: F, result: F) -> F;

    /// `∂f/∂b` evaluated at `(a, b)`, where `result == f(a, b)`.
    fn derivative_b<F: Float>(a: F, b: F, result: F) -> F;
}

macro_rules! unary_op {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal, $F:ident;
        primal($a:ident) = $primal:expr;
        derivative($da:ident, $r:ident) = $deriv:expr;
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        pub struct $name;

        impl UnaryOp for $name {
            const NAME: &'static str = $label;

            #[inline]
            fn primal<$F: Float>($a: $F) -> $F {
                $primal
            }

            #[inline]
            #[allow(unused_variables)]
            fn derivative<$F: Float>($da: $F, $r: $F) -> $F {
                $deriv
            }
        }
    };
}

macro_rules! binary_op {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal, $F:ident;
        primal($pa:ident, $pb:ident) = $primal:expr;
        derivative_a($aa:ident, $ab:ident, $ar:ident) = $deriv_a:expr;
        derivative_b($ba:ident, $bb:ident, $br:ident) = $deriv_b:expr;
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
        pub struct $name;

        impl BinaryOp for $name {
            const NAME: &'static str = $label;

            #[inline]
            fn primal<$F: Float>($pa: $F, $pb: $F) -> $F {
                $primal
            }

            #[inline]
            #[allow(unused_variables)]
            fn derivative_a<$F: Float>($aa: $F, $ab: $F, $ar: $F) -> $F {
                $deriv_a
            }

            #[inline]
            #[allow(unused_variables)]
            fn derivative_b<$F: Float>($ba: $F, $bb: $F, $br: $F) -> $F {
                $deriv_b
            }
        }
    };
}

// ── Binary arithmetic ──

binary_op! {
    AddOp, "add", F;
    primal(a, b) = a + b;
    derivative_a(a, b, r) = F::one();
    derivative_b(a, b, r) = F::one();
}

binary_op! {
    SubOp, "sub", F;
    primal(a, b) = a - b;
    derivative_a(a, b, r) = F::one();
    derivative_b(a, b, r) = -F::one();
}

binary_op! {
    MulOp, "mul", F;
    primal(a, b) = a * b;
    derivative_a(a, b, r) = b;
    derivative_b(a, b, r) = a;
}

binary_op! {
    DivOp, "div", F;
    primal(a, b) = a / b;
    derivative_a(a, b, r) = F::one() / b;
    derivative_b(a, b, r) = -a / (b * b);
}

binary_op! {
    /// Truncated remainder; `∂/∂b = -trunc(a/b)`.
    RemOp, "rem", F;
    primal(a, b) = a % b;
    derivative_a(a, b, r) = F::one();
    derivative_b(a, b, r) = -(a / b).trunc();
}

// ── Binary functions ──

binary_op! {
    /// `a^b`. The `b` partial is `NaN` for non-positive `a`.
    Pow, "pow", F;
    primal(a, b) = a.powf(b);
    derivative_a(a, b, r) = b * a.powf(b - F::one());
    derivative_b(a, b, r) = r * a.ln();
}

binary_op! {
    /// `atan2(a, b)`; both partials are `NaN` at the origin.
    Atan2, "atan2", F;
    primal(a, b) = a.atan2(b);
    derivative_a(a, b, r) = b / (a * a + b * b);
    derivative_b(a, b, r) = -a / (a * a + b * b);
}

binary_op! {
    Hypot, "hypot", F;
    primal(a, b) = a.hypot(b);
    derivative_a(a, b, r) = a / r;
    derivative_b(a, b, r) = b / r;
}

binary_op! {
    /// Ties pick the first argument. A `NaN` on either side gives `NaN`
    /// for the result and both partials.
    Max, "max", F;
    primal(a, b) = if a.is_nan() || b.is_nan() { F::nan() } else if a >= b { a } else { b };
    derivative_a(a, b, r) = if r.is_nan() { r } else if a >= b { F::one() } else { F::zero() };
    derivative_b(a, b, r) = if r.is_nan() { r } else if a >= b { F::zero() } else { F::one() };
}

binary_op! {
    /// Ties pick the first argument. A `NaN` on either side gives `NaN`
    /// for the result and both partials.
    Min, "min", F;
    primal(a, b) = if a.is_nan() || b.is_nan() { F::nan() } else if a <= b { a } else { b };
    derivative_a(a, b, r) = if r.is_nan() { r } else if a <= b { F::one() } else { F::zero() };
    derivative_b(a, b, r) = if r.is_nan() { r } else if a <= b { F::zero() } else { F::one() };
}

// ── Unary ──

unary_op! {
    NegOp, "neg", F;
    primal(a) = -a;
    derivative(a, r) = -F::one();
}

unary_op! {
    /// Derivative is `signum(a)`, so `+1` at `+0`.
    Abs, "abs", F;
    primal(a) = a.abs();
    derivative(a, r) = a.signum();
}

unary_op! {
    Recip, "recip", F;
    primal(a) = a.recip();
    derivative(a, r) = -r * r;
}

unary_op! {
    Sqrt, "sqrt", F;
    primal(a) = a.sqrt();
    derivative(a, r) = F::one() / (r + r);
}

unary_op! {
    Cbrt, "cbrt", F;
    primal(a) = a.cbrt();
    derivative(a, r) = F::one() / ((F::one() + F::one() + F::one()) * r * r);
}

// ── Exp / Log ──

unary_op! {
    Exp, "exp", F;
    primal(a) = a.exp();
    derivative(a, r) = r;
}

unary_op! {
    Exp2, "exp2", F;
    primal(a) = a.exp2();
    derivative(a, r) = r * F::LN_2();
}

unary_op! {
    ExpM1, "exp_m1", F;
    primal(a) = a.exp_m1();
    derivative(a, r) = r + F::one();
}

unary_op! {
    Ln, "ln", F;
    primal(a) = a.ln();
    derivative(a, r) = F::one() / a;
}

unary_op! {
    Log2, "log2", F;
    primal(a) = a.log2();
    derivative(a, r) = F::one() / (a * F::LN_2());
}

unary_op! {
    Log10, "log10", F;
    primal(a) = a.log10();
    derivative(a, r) = F::one() / (a * F::LN_10());
}

unary_op! {
    Ln1p, "ln_1p", F;
    primal(a) = a.ln_1p();
    derivative(a, r) = F::one() / (F::one() + a);
}

// ── Trig ──

unary_op! {
    Sin, "sin", F;
    primal(a) = a.sin();
    derivative(a, r) = a.cos();
}

unary_op! {
    Cos, "cos", F;
    primal(a) = a.cos();
    derivative(a, r) = -a.sin();
}

unary_op! {
    Tan, "tan", F;
    primal(a) = a.tan();
    derivative(a, r) = {
        let c = a.cos();
        F::one() / (c * c)
    };
}

unary_op! {
    Asin, "asin", F;
    primal(a) = a.asin();
    derivative(a, r) = F::one() / (F::one() - a * a).sqrt();
}

unary_op! {
    Acos, "acos", F;
    primal(a) = a.acos();
    derivative(a, r) = -F::one() / (F::one() - a * a).sqrt();
}

unary_op! {
    Atan, "atan", F;
    primal(a) = a.atan();
    derivative(a, r) = F::one() / (F::one() + a * a);
}

// ── Hyperbolic ──

unary_op! {
    Sinh, "sinh", F;
    primal(a) = a.sinh();
    derivative(a, r) = a.cosh();
}

unary_op! {
    Cosh, "cosh", F;
    primal(a) = a.cosh();
    derivative(a, r) = a.sinh();
}

unary_op! {
    Tanh, "tanh", F;
    primal(a) = a.tanh();
    derivative(a, r) = F::one() - r * r;
}

unary_op! {
    Asinh, "asinh", F;
    primal(a) = a.asinh();
    derivative(a, r) = F::one() / (a * a + F::one()).sqrt();
}

unary_op! {
    Acosh, "acosh", F;
    primal(a) = a.acosh();
    derivative(a, r) = F::one() / (a * a - F::one()).sqrt();
}

unary_op! {
    Atanh, "atanh", F;
    primal(a) = a.atanh();
    derivative(a, r) = F::one() / (F::one() - a * a);
}
