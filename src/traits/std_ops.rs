use std::ops::{
    Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, RemAssign, Sub, SubAssign,
};

use crate::active::Active;
use crate::binary::BinaryExpr;
use crate::expr::Expression;
use crate::float::Float;
use crate::formula::{AddOp, BinaryOp, DivOp, MulOp, NegOp, RemOp, SubOp, UnaryOp};
use crate::leaf::{Passive, Slot};
use crate::primal_tape::PrimalTape;
use crate::tape::JacobianTape;
use crate::unary::UnaryExpr;

// ──────────────────────────────────────────────
//  Expression ⊕ expression
// ──────────────────────────────────────────────

// Every operator builds a node and nothing else; recording happens on
// assignment (`Active::record`, compound assignment).
macro_rules! impl_expr_ops {
    (impl[$($gen:tt)*] $ty:ty, real = $real:ty) => {
        impl<$($gen)* Rhs: Expression<$real>> Add<Rhs> for $ty {
            type Output = BinaryExpr<$real, AddOp, Self, Rhs>;
            #[inline]
            fn add(self, rhs: Rhs) -> Self::Output {
                BinaryExpr::new(self, rhs)
            }
        }

        impl<$($gen)* Rhs: Expression<$real>> Sub<Rhs> for $ty {
            type Output = BinaryExpr<$real, SubOp, Self, Rhs>;
            #[inline]
            fn sub(self, rhs: Rhs) -> Self::Output {
                BinaryExpr::new(self, rhs)
            }
        }

        impl<$($gen)* Rhs: Expression<$real>> Mul<Rhs> for $ty {
            type Output = BinaryExpr<$real, MulOp, Self, Rhs>;
            #[inline]
            fn mul(self, rhs: Rhs) -> Self::Output {
                BinaryExpr::new(self, rhs)
            }
        }

        impl<$($gen)* Rhs: Expression<$real>> Div<Rhs> for $ty {
            type Output = BinaryExpr<$real, DivOp, Self, Rhs>;
            #[inline]
            fn div(self, rhs: Rhs) -> Self::Output {
                BinaryExpr::new(self, rhs)
            }
        }

        impl<$($gen)* Rhs: Expression<$real>> Rem<Rhs> for $ty {
            type Output = BinaryExpr<$real, RemOp, Self, Rhs>;
            #[inline]
            fn rem(self, rhs: Rhs) -> Self::Output {
                BinaryExpr::new(self, rhs)
            }
        }

        impl<$($gen)*> Neg for $ty {
            type Output = UnaryExpr<$real, NegOp, Self>;
            #[inline]
            fn neg(self) -> Self::Output {
                UnaryExpr::new(self)
            }
        }
    };
}

// `Active` ops are generated per concrete tape: a blanket over `T: Tape`
// would name the scalar through `T::Real`, which coherence cannot separate
// from the literal impls below.
impl_expr_ops!(impl[] Active<JacobianTape<f32>>, real = f32);
impl_expr_ops!(impl[] Active<JacobianTape<f64>>, real = f64);
impl_expr_ops!(impl[] Active<PrimalTape<f32>>, real = f32);
impl_expr_ops!(impl[] Active<PrimalTape<f64>>, real = f64);
impl_expr_ops!(impl[F: Float,] Slot<F>, real = F);
impl_expr_ops!(impl[F: Float, O: UnaryOp, A: Expression<F>,] UnaryExpr<F, O, A>, real = F);
impl_expr_ops!(
    impl[F: Float, O: BinaryOp, A: Expression<F>, B: Expression<F>,] BinaryExpr<F, O, A, B>,
    real = F
);

// ──────────────────────────────────────────────
//  Mixed ops with primitive floats
// ──────────────────────────────────────────────

// The literal becomes a `Passive` leaf on whichever side it appears.
// Generated per float type, as coherence needs a concrete scalar here.
macro_rules! impl_expr_scalar_op {
    ($f:ty, [$($gen:tt)*] $ty:ty, $trait:ident, $method:ident, $op:ty) => {
        impl<$($gen)*> $trait<$f> for $ty {
            type Output = BinaryExpr<$f, $op, Self, Passive<$f>>;
            #[inline]
            fn $method(self, rhs: $f) -> Self::Output {
                BinaryExpr::new(self, Passive::new(rhs))
            }
        }

        impl<$($gen)*> $trait<$ty> for $f {
            type Output = BinaryExpr<$f, $op, Passive<$f>, $ty>;
            #[inline]
            fn $method(self, rhs: $ty) -> Self::Output {
                BinaryExpr::new(Passive::new(self), rhs)
            }
        }
    };
}

macro_rules! impl_expr_scalar_ops {
    ($f:ty, [$($gen:tt)*] $ty:ty) => {
        impl_expr_scalar_op!($f, [$($gen)*] $ty, Add, add, AddOp);
        impl_expr_scalar_op!($f, [$($gen)*] $ty, Sub, sub, SubOp);
        impl_expr_scalar_op!($f, [$($gen)*] $ty, Mul, mul, MulOp);
        impl_expr_scalar_op!($f, [$($gen)*] $ty, Div, div, DivOp);
        impl_expr_scalar_op!($f, [$($gen)*] $ty, Rem, rem, RemOp);
    };
}

macro_rules! impl_all_scalar_ops {
    ($f:ty) => {
        impl_expr_scalar_ops!($f, [] Active<JacobianTape<$f>>);
        impl_expr_scalar_ops!($f, [] Active<PrimalTape<$f>>);
        impl_expr_scalar_ops!($f, [] Slot<$f>);
        impl_expr_scalar_ops!($f, [O: UnaryOp, A: Expression<$f>] UnaryExpr<$f, O, A>);
        impl_expr_scalar_ops!(
            $f,
            [O: BinaryOp, A: Expression<$f>, B: Expression<$f>] BinaryExpr<$f, O, A, B>
        );
    };
}

impl_all_scalar_ops!(f32);
impl_all_scalar_ops!(f64);

// ──────────────────────────────────────────────
//  Compound assignment on Active<T>
// ──────────────────────────────────────────────

macro_rules! impl_active_assign {
    ($tape:ty, $f:ty; $($trait:ident, $method:ident, $op:tt;)*) => {$(
        impl<Rhs: Expression<$f>> $trait<Rhs> for Active<$tape> {
            #[inline]
            fn $method(&mut self, rhs: Rhs) {
                *self = Active::record(*self $op rhs);
            }
        }

        impl $trait<$f> for Active<$tape> {
            #[inline]
            fn $method(&mut self, rhs: $f) {
                *self = Active::record(*self $op rhs);
            }
        }
    )*};
}

macro_rules! impl_active_assign_all {
    ($($tape:ty, $f:ty;)*) => {$(
        impl_active_assign!($tape, $f;
            AddAssign, add_assign, +;
            SubAssign, sub_assign, -;
            MulAssign, mul_assign, *;
            DivAssign, div_assign, /;
            RemAssign, rem_assign, %;
        );
    )*};
}

impl_active_assign_all! {
    JacobianTape<f32>, f32;
    JacobianTape<f64>, f64;
    PrimalTape<f32>, f32;
    PrimalTape<f64>, f64;
}
