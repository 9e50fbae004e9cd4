//! Elementary functions on expressions.
//!
//! Two spellings are offered. [`ExprExt`] gives every expression the method
//! surface of a float (`x.sin()`, `x.powf(y)`, `x.atan2(2.0)`), and the free
//! functions here mirror the usual math-library names (`pow(x, y)`,
//! `atan2(2.0, x)`). Either operand of a binary function may be a plain
//! literal, which becomes a [`Passive`](crate::Passive) leaf.

use crate::binary::BinaryExpr;
use crate::expr::{Expression, IntoExpr};
use crate::float::Float;
use crate::formula::{
    Abs, Acos, Acosh, Asin, Asinh, Atan, Atan2, Atanh, Cbrt, Cos, Cosh, Exp, Exp2, ExpM1, Hypot,
    Ln, Ln1p, Log10, Log2, Max, Min, Pow, Recip, Sin, Sinh, Sqrt, Tan, Tanh,
};
use crate::leaf::Passive;
use crate::unary::UnaryExpr;

macro_rules! ext_unary {
    ($($method:ident => $op:ident),* $(,)?) => {
        $(
            #[inline]
            fn $method(self) -> UnaryExpr<F, $op, Self> {
                UnaryExpr::new(self)
            }
        )*
    };
}

macro_rules! ext_binary {
    ($($method:ident => $op:ident),* $(,)?) => {
        $(
            #[inline]
            fn $method<B: IntoExpr<F>>(self, other: B) -> BinaryExpr<F, $op, Self, B::Expr> {
                BinaryExpr::new(self, other.into_expr())
            }
        )*
    };
}

/// Float-like method surface for every [`Expression`].
pub trait ExprExt<F: Float>: Expression<F> {
    ext_unary! {
        abs => Abs,
        recip => Recip,
        sqrt => Sqrt,
        cbrt => Cbrt,
        exp => Exp,
        exp2 => Exp2,
        exp_m1 => ExpM1,
        ln => Ln,
        log2 => Log2,
        log10 => Log10,
        ln_1p => Ln1p,
        sin => Sin,
        cos => Cos,
        tan => Tan,
        asin => Asin,
        acos => Acos,
        atan => Atan,
        sinh => Sinh,
        cosh => Cosh,
        tanh => Tanh,
        asinh => Asinh,
        acosh => Acosh,
        atanh => Atanh,
    }

    ext_binary! {
        powf => Pow,
        atan2 => Atan2,
        hypot => Hypot,
        max => Max,
        min => Min,
    }

    /// `self^n` with a passive integer exponent.
    #[inline]
    fn powi(self, n: i32) -> BinaryExpr<F, Pow, Self, Passive<F>> {
        BinaryExpr::new(self, Passive::new(F::from_i32(n).unwrap_or_else(F::nan)))
    }
}

impl<F: Float, E: Expression<F>> ExprExt<F> for E {}

macro_rules! free_unary {
    ($($(#[$meta:meta])* $name:ident => $op:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[inline]
            pub fn $name<F: Float, A: Expression<F>>(a: A) -> UnaryExpr<F, $op, A> {
                UnaryExpr::new(a)
            }
        )*
    };
}

macro_rules! free_binary {
    ($($(#[$meta:meta])* $name:ident => $op:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[inline]
            pub fn $name<F: Float, A: IntoExpr<F>, B: IntoExpr<F>>(
                a: A,
                b: B,
            ) -> BinaryExpr<F, $op, A::Expr, B::Expr> {
                BinaryExpr::new(a.into_expr(), b.into_expr())
            }
        )*
    };
}

free_binary! {
    /// `a^b`.
    pow => Pow,
    /// Four-quadrant arctangent of `a / b`.
    atan2 => Atan2,
    hypot => Hypot,
    max => Max,
    min => Min,
}

free_unary! {
    abs => Abs,
    sqrt => Sqrt,
    cbrt => Cbrt,
    exp => Exp,
    exp2 => Exp2,
    ln => Ln,
    /// Natural logarithm, under its C name.
    log => Ln,
    log2 => Log2,
    log10 => Log10,
    sin => Sin,
    cos => Cos,
    tan => Tan,
    asin => Asin,
    acos => Acos,
    atan => Atan,
    sinh => Sinh,
    cosh => Cosh,
    tanh => Tanh,
}
