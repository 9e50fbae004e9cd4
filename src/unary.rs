//! The unary node family: `f(a)` for one operand.

use std::marker::PhantomData;

use crate::expr::{ActiveExchange, Expression, GradientSink, ReplaySink};
use crate::float::Float;
use crate::formula::UnaryOp;

/// Expression node for `O(arg)`.
///
/// The result is computed once in [`new`](Self::new) and never changes.
#[derive(Clone, Copy, Debug)]
pub struct UnaryExpr<F: Float, O: UnaryOp, A: Expression<F>> {
    arg: A,
    result: F,
    _op: PhantomData<O>,
}

impl<F: Float, O: UnaryOp, A: Expression<F>> UnaryExpr<F, O, A> {
    #[inline]
    pub fn new(arg: A) -> Self {
        let result = O::primal(arg.value());
        UnaryExpr {
            arg,
            result,
            _op: PhantomData,
        }
    }

    /// The operand.
    #[inline]
    pub fn arg(&self) -> &A {
        &self.arg
    }
}

impl<F: Float, O: UnaryOp, A: Expression<F>> Expression<F> for UnaryExpr<F, O, A> {
    const ACTIVE_COUNT: usize = A::ACTIVE_COUNT;
    const PASSIVE_COUNT: usize = A::PASSIVE_COUNT;
    const ACTIVE: bool = A::ACTIVE;

    type Exchanged<X: ActiveExchange<F>> = UnaryExpr<X::Real, O, A::Exchanged<X>>;

    #[inline]
    fn value(&self) -> F {
        self.result
    }

    #[inline]
    fn calc_gradient<S: GradientSink<F> + ?Sized>(&self, sink: &mut S, multiplier: F) {
        let jacobian = O::derivative(self.arg.value(), self.result);
        self.arg.calc_gradient(sink, multiplier * jacobian);
    }

    #[inline]
    fn calc_gradient_unit<S: GradientSink<F> + ?Sized>(&self, sink: &mut S) {
        let jacobian = O::derivative(self.arg.value(), self.result);
        self.arg.calc_gradient(sink, jacobian);
    }

    #[inline]
    fn push_passive<S: ReplaySink<F> + ?Sized>(&self, sink: &mut S) {
        self.arg.push_passive(sink);
    }

    #[inline]
    fn push_indices<S: ReplaySink<F> + ?Sized>(&self, sink: &mut S) {
        self.arg.push_indices(sink);
    }

    #[inline]
    fn get_value_offline(
        indices: &[u32],
        passives: &[F],
        primals: &[F],
        offset: usize,
        passive_offset: usize,
    ) -> F {
        O::primal(A::get_value_offline(
            indices,
            passives,
            primals,
            offset,
            passive_offset,
        ))
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
        let a = A::get_value_offline(indices, passives, primals, offset, passive_offset);
        let jacobian = O::derivative(a, O::primal(a));
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

    #[inline]
    fn exchange_active_type<X: ActiveExchange<F>>(&self, exchange: &mut X) -> Self::Exchanged<X> {
        UnaryExpr::new(self.arg.exchange_active_type(exchange))
    }
}
