//! The expression node contract.
//!
//! Every operator applied to an active value or to another expression produces
//! a new, statically-typed node ([`UnaryExpr`](crate::UnaryExpr),
//! [`BinaryExpr`](crate::BinaryExpr)). Nodes own their operands by value and
//! cache their primal result at construction, so a whole statement such as
//! `x0 / x1 + x0.sin()` compiles down to straight-line arithmetic plus one
//! call into the tape per leaf.
//!
//! Two evaluation paths share the formulas in [`crate::formula`]:
//!
//! - the **live** path works on node values: [`Expression::value`],
//!   [`Expression::calc_gradient`];
//! - the **offline** path works on the node *type* and three flat buffers
//!   (operand indices, passive values, primal values):
//!   [`Expression::get_value_offline`], [`Expression::eval_adjoint_offset`].
//!
//! The offline buffers are laid out in the order produced by
//! [`Expression::push_indices`] and [`Expression::push_passive`]: depth-first,
//! left operand before right operand. A node's right operand starts
//! [`ACTIVE_COUNT`](Expression::ACTIVE_COUNT) /
//! [`PASSIVE_COUNT`](Expression::PASSIVE_COUNT) entries after its left one.

use crate::float::Float;
use crate::leaf::Passive;

/// Receives the Jacobian entries of a statement during [`Expression::calc_gradient`].
///
/// Called once per active leaf reached. The same index may arrive more than
/// once (a variable used twice in one statement); implementations must
/// accumulate, never overwrite.
pub trait GradientSink<F: Float> {
    /// Record `∂statement/∂variable[index] = jacobian`.
    fn push_jacobian(&mut self, index: u32, jacobian: F);
}

/// Receives the serialized form of an expression for offline replay.
pub trait ReplaySink<F: Float> {
    /// An active leaf: its tape index and current primal value. Untracked
    /// leaves arrive with [`CONSTANT`](crate::CONSTANT); the sink assigns
    /// them a primal slot before the buffers are replayed.
    fn push_index(&mut self, index: u32, value: F);
    /// A passive (constant) leaf.
    fn push_passive(&mut self, value: F);
}

/// Maps the leaves of an expression onto another active type.
///
/// Used by [`Expression::exchange_active_type`] to re-host a tree with the
/// same topology over a different scalar, leaf or tape.
pub trait ActiveExchange<F: Float> {
    /// Scalar of the rebuilt tree.
    type Real: Float;
    /// Leaf type replacing each active leaf.
    type Leaf: Expression<Self::Real>;

    /// Replace the active leaf `(value, index)`.
    fn exchange_leaf(&mut self, value: F, index: u32) -> Self::Leaf;
    /// Replace a passive constant.
    fn exchange_passive(&mut self, value: F) -> Self::Real;
}

/// A node in a statically-typed expression tree.
pub trait Expression<F: Float>: Sized {
    /// Number of active leaves, i.e. entries this tree occupies in the index buffer.
    const ACTIVE_COUNT: usize;
    /// Number of passive leaves, i.e. entries this tree occupies in the passive buffer.
    const PASSIVE_COUNT: usize;
    /// `false` only for trees without any active leaf. Binary nodes use this
    /// to skip the partial of a constant operand at compile time.
    const ACTIVE: bool;

    /// The same tree rebuilt through an [`ActiveExchange`].
    type Exchanged<X: ActiveExchange<F>>: Expression<X::Real>;

    /// The cached primal result.
    fn value(&self) -> F;

    /// Propagate `multiplier * ∂self/∂operand` into every operand; leaves
    /// deposit their contribution into `sink`.
    fn calc_gradient<S: GradientSink<F> + ?Sized>(&self, sink: &mut S, multiplier: F);

    /// [`calc_gradient`](Self::calc_gradient) with a multiplier of one.
    #[inline]
    fn calc_gradient_unit<S: GradientSink<F> + ?Sized>(&self, sink: &mut S) {
        self.calc_gradient(sink, F::one());
    }

    /// Forward every passive value of the tree to `sink`, left to right.
    fn push_passive<S: ReplaySink<F> + ?Sized>(&self, sink: &mut S);

    /// Forward every active leaf of the tree to `sink`, left to right.
    fn push_indices<S: ReplaySink<F> + ?Sized>(&self, sink: &mut S);

    /// Recompute the primal result from serialized buffers.
    ///
    /// `offset` / `passive_offset` are the positions of this tree's first
    /// entries in `indices` / `passives`. Bit-identical to [`value`](Self::value)
    /// for the same leaf primals.
    ///
    /// Every entry of `indices` must name a slot of `primals`. [`CONSTANT`](crate::CONSTANT)
    /// leaves are given a slot of their own before replay, as
    /// [`ReplayRecord::capture`](crate::ReplayRecord::capture) does.
    fn get_value_offline(
        indices: &[u32],
        passives: &[F],
        primals: &[F],
        offset: usize,
        passive_offset: usize,
    ) -> F;

    /// [`eval_adjoint_offset`](Self::eval_adjoint_offset) for a tree stored at
    /// the start of the buffers.
    #[inline]
    fn eval_adjoint(seed: F, indices: &[u32], passives: &[F], primals: &[F], adjoints: &mut [F]) {
        Self::eval_adjoint_offset(seed, indices, passives, primals, adjoints, 0, 0);
    }

    /// Offline counterpart of [`calc_gradient`](Self::calc_gradient): active
    /// leaves accumulate `adjoints[indices[offset]] += seed * (local Jacobian)`.
    ///
    /// Same slot contract as [`get_value_offline`](Self::get_value_offline);
    /// a constant leaf's slot receives its partial like any other.
    fn eval_adjoint_offset(
        seed: F,
        indices: &[u32],
        passives: &[F],
        primals: &[F],
        adjoints: &mut [F],
        offset: usize,
        passive_offset: usize,
    );

    /// Rebuild this tree with every leaf mapped through `exchange`.
    ///
    /// Leaves are visited in buffer order; node results are recomputed.
    fn exchange_active_type<X: ActiveExchange<F>>(&self, exchange: &mut X) -> Self::Exchanged<X>;
}

/// Conversion into an expression operand.
///
/// Lets free functions such as [`pow`](crate::functions::pow) accept either
/// an expression or a plain literal, which becomes a [`Passive`] leaf.
pub trait IntoExpr<F: Float> {
    /// The resulting operand type.
    type Expr: Expression<F>;

    fn into_expr(self) -> Self::Expr;
}

impl<F: Float, E: Expression<F>> IntoExpr<F> for E {
    type Expr = E;

    #[inline]
    fn into_expr(self) -> E {
        self
    }
}

impl IntoExpr<f64> for f64 {
    type Expr = Passive<f64>;

    #[inline]
    fn into_expr(self) -> Passive<f64> {
        Passive::new(self)
    }
}

impl IntoExpr<f32> for f32 {
    type Expr = Passive<f32>;

    #[inline]
    fn into_expr(self) -> Passive<f32> {
        Passive::new(self)
    }
}
