//! The binary node family: `f(a, b)` for two operands.
//!
//! Either operand may be a full expression, an active leaf or a
//! [`Passive`](crate::Passive) constant. A constant operand has nothing
//! upstream to receive a gradient, so its partial is skipped; the check is on
//! [`Expression::ACTIVE`] and folds away at compile time.

use std::marker::PhantomData;

use crate::expr::{ActiveExchange, Expression, GradientSink, ReplaySink};
use crate::float::Float;
use crate::formula::BinaryOp;

/// Expression node for `O(lhs, rhs)`.
///
/// The result is computed once in [`new`](Self::new) and never changes.
#[derive(Clone, Copy, Debug)]
pub struct BinaryExpr<F: Float, O: BinaryOp, A: Expression<F>, B: Expression<F>> {
    lhs: A,
    rhs: B,
    result: F,
    _op: PhantomData<O>,
}

impl<F: Float, O: BinaryOp, A: Expression<F>, B: Expression<F>> BinaryExpr<F, O, A, B> {
    #[inline]
    pub fn new(lhs: A, rhs: B) -> Self {
        let result = O::primal(lhs.value(), rhs.value());
        BinaryExpr {
            lhs,
            rhs,
            result,
            _op: PhantomData,
        }
    }

    /// The first operand.
    #[inline]
    pub fn lhs(&self) -> &A {
        &self.lhs
    }

    /// The second operand.
    #[inline]
    pub fn rhs(&self) -> &B {
        &self.rhs
    }
}

impl<F: Float, O: BinaryOp, A: Expression<F>, B: Expression<F>> Expression<F>
    for BinaryExpr<F, O, A, B>
{
    const ACTIVE_COUNT: usize = A::ACTIVE_COUNT + B::ACTIVE_COUNT;
    const PASSIVE_COUNT: usize = A::PASSIVE_COUNT + B::PASSIVE_COUNT;
    const ACTIVE: bool = A::ACTIVE || B::ACTIVE;

    type Exchanged<X: ActiveExchange<F>> = BinaryExpr<X::Real, O, A::Exchanged<X>, B::Exchanged<X>>;

    #[inline]
    fn value(&self) -> F {
        self.result
    }

    #[inline]
    fn calc_gradient<S: GradientSink<F> + ?Sized>(&self, sink: &mut S, multiplier: F) {
        let a = self.lhs.value();
        let b = self.rhs.value();
        if A::ACTIVE {
            let jacobian = O::derivative_a(a, b, self.result);
            self.lhs.calc_gradient(sink, multiplier * jacobian);
        }
        if B::ACTIVE {
            let jacobian = O::derivative_b(a, b, self.result);
            self.rhs.calc_gradient(sink, multiplier * jacobian);
        }
    }

    #[inline]
    fn calc_gradient_unit<S: GradientSink<F> + ?Sized>(&self, sink: &mut S) {
        let a = self.lhs.value();
        let b = self.rhs.value();
        if A::ACTIVE {
            self.lhs
                .calc_gradient(sink, O::derivative_a(a, b, self.result));
        }
        if B::ACTIVE {
            self.rhs
                .calc_gradient(sink, O::derivative_b(a, b, self.result));
        }
    }

    #[inline]
    fn push_passive<S: ReplaySink<F> + ?Sized>(&self, sink: &mut S) {
        self.lhs.push_passive(sink);
        self.rhs.push_passive(sink);
    }

    #[inline]
    fn push_indices<S: ReplaySink<F> + ?Sized>(&self, sink: &mut S) {
        self.lhs.push_indices(sink);
        self.rhs.push_indices(sink);
    }

    #[inline]
    fn get_value_offline(
        indices: &[u32],
        passives: &[F],
        primals: &[F],
        offset: usize,
        passive_offset: usize,
    ) -> F {
        let a = A::get_value_offline(indices, passives, primals, offset, passive_offset);
        let b = B::get_value_offline(
            indices,
            passives,
            primals,
            offset + A::ACTIVE_COUNT,
            passive_offset + A::PASSIVE_COUNT,
        );
        O::primal(a, b)
    }

    #[inline]
    fn eval_adjoint_offset(
        seed: F,
        indices: &[u32],
        passives: &[F],
        primals: &[F],
        adjoints: &mut [F],
        offset: usize,
        passive_offset: usize,
    ) {
        let b_offset = offset + A::ACTIVE_COUNT;
        let b_passive_offset = passive_offset + A::PASSIVE_COUNT;
        let a = A::get_value_offline(indices, passives, primals, offset, passive_offset);
        let b = B::get_value_offline(indices, passives, primals, b_offset, b_passive_offset);
        let result = O::primal(a, b);
        if A::ACTIVE {
            let jacobian = O::derivative_a(a, b, result);
            A::eval_adjoint_offset(
                seed * jacobian,
                indices,
                passives,
                primals,
                adjoints,
                offset,
                passive_offset,
            );
        }
        if B::ACTIVE {
            let jacobian = O::derivative_b(a, b, result);
            B::eval_adjoint_offset(
                seed * jacobian,
                indices,
                passives,
                primals,
                adjoints,
                b_offset,
                b_passive_offset,
            );
        }
    }

    #[inline]
    fn exchange_active_type<X: ActiveExchange<F>>(&self, exchange: &mut X) -> Self::Exchanged<X> {
        let lhs = self.lhs.exchange_active_type(exchange);
        let rhs = self.rhs.exchange_active_type(exchange);
        BinaryExpr::new(lhs, rhs)
    }
}
