//! Tape-free leaves: passive constants and index-only slots.

use std::fmt::{self, Display};
use std::marker::PhantomData;

use num_traits::NumCast;

use crate::expr::{ActiveExchange, Expression, GradientSink, ReplaySink};
use crate::float::Float;

/// Index marking a leaf that is not tracked on any tape.
pub const CONSTANT: u32 = u32::MAX;

/// A compile-time known constant operand such as the `5.0` in `x / 5.0`.
///
/// Takes part in the primal but never in a derivative. On the offline path it
/// is read from the passive buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Passive<F: Float> {
    value: F,
}

impl<F: Float> Passive<F> {
    #[inline]
    pub fn new(value: F) -> Self {
        Passive { value }
    }
}

impl<F: Float> Display for Passive<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<F: Float> Expression<F> for Passive<F> {
    const ACTIVE_COUNT: usize = 0;
    const PASSIVE_COUNT: usize = 1;
    const ACTIVE: bool = false;

    type Exchanged<X: ActiveExchange<F>> = Passive<X::Real>;

    #[inline]
    fn value(&self) -> F {
        self.value
    }

    #[inline]
    fn calc_gradient<S: GradientSink<F> + ?Sized>(&self, _sink: &mut S, _multiplier: F) {}

    #[inline]
    fn push_passive<S: ReplaySink<F> + ?Sized>(&self, sink: &mut S) {
        sink.push_passive(self.value);
    }

    #[inline]
    fn push_indices<S: ReplaySink<F> + ?Sized>(&self, _sink: &mut S) {}

    #[inline]
    fn get_value_offline(
        _indices: &[u32],
        passives: &[F],
        _primals: &[F],
        _offset: usize,
        passive_offset: usize,
    ) -> F {
        passives[passive_offset]
    }

    #[inline]
    fn eval_adjoint_offset(
        _seed: F,
        _indices: &[u32],
        _passives: &[F],
        _primals: &[F],
        _adjoints: &mut [F],
        _offset: usize,
        _passive_offset: usize,
    ) {
    }

    #[inline]
    fn exchange_active_type<X: ActiveExchange<F>>(&self, exchange: &mut X) -> Passive<X::Real> {
        Passive::new(exchange.exchange_passive(self.value))
    }
}

/// An active leaf that carries only a value and an index, with no tape attached.
///
/// This is the canonical leaf of exchanged trees: the primal value tape stores
/// the offline functions of `E::Exchanged<SlotExchange<F>>`, so every
/// statement shape is instantiated once regardless of which leaf types it was
/// built from.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Slot<F: Float> {
    value: F,
    index: u32,
}

impl<F: Float> Slot<F> {
    #[inline]
    pub fn new(value: F, index: u32) -> Self {
        Slot { value, index }
    }

    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl<F: Float> Expression<F> for Slot<F> {
    const ACTIVE_COUNT: usize = 1;
    const PASSIVE_COUNT: usize = 0;
    const ACTIVE: bool = true;

    type Exchanged<X: ActiveExchange<F>> = X::Leaf;

    #[inline]
    fn value(&self) -> F {
        self.value
    }

    #[inline]
    fn calc_gradient<S: GradientSink<F> + ?Sized>(&self, sink: &mut S, multiplier: F) {
        leaf_gradient(self.index, sink, multiplier);
    }

    #[inline]
    fn push_passive<S: ReplaySink<F> + ?Sized>(&self, _sink: &mut S) {}

    #[inline]
    fn push_indices<S: ReplaySink<F> + ?Sized>(&self, sink: &mut S) {
        sink.push_index(self.index, self.value);
    }

    #[inline]
    fn get_value_offline(
        indices: &[u32],
        _passives: &[F],
        primals: &[F],
        offset: usize,
        _passive_offset: usize,
    ) -> F {
        leaf_value_offline(indices, primals, offset)
    }

    #[inline]
    fn eval_adjoint_offset(
        seed: F,
        indices: &[u32],
        _passives: &[F],
        _primals: &[F],
        adjoints: &mut [F],
        offset: usize,
        _passive_offset: usize,
    ) {
        leaf_adjoint_offline(seed, indices, adjoints, offset);
    }

    #[inline]
    fn exchange_active_type<X: ActiveExchange<F>>(&self, exchange: &mut X) -> X::Leaf {
        exchange.exchange_leaf(self.value, self.index)
    }
}

// Shared leaf behaviour for `Slot` and `Active`.

#[inline]
pub(crate) fn leaf_gradient<F: Float, S: GradientSink<F> + ?Sized>(
    index: u32,
    sink: &mut S,
    multiplier: F,
) {
    if index != CONSTANT {
        sink.push_jacobian(index, multiplier);
    }
}

#[inline]
pub(crate) fn leaf_value_offline<F: Float>(indices: &[u32], primals: &[F], offset: usize) -> F {
    primals[indices[offset] as usize]
}

#[inline]
pub(crate) fn leaf_adjoint_offline<F: Float>(
    seed: F,
    indices: &[u32],
    adjoints: &mut [F],
    offset: usize,
) {
    let slot = &mut adjoints[indices[offset] as usize];
    *slot = *slot + seed;
}

/// Cast between float types; values that do not fit become `NaN`.
#[inline]
pub(crate) fn cast<F: Float, G: Float>(value: F) -> G {
    <G as NumCast>::from(value).unwrap_or_else(G::nan)
}

/// Exchanges every active leaf for a [`Slot`] over `G`, keeping its index.
///
/// Passives are cast to `G`. With `G` equal to the source scalar this is the
/// canonical re-hosting used by [`PrimalTape`](crate::PrimalTape); with a
/// different `G` it replays a recorded shape at another precision.
#[derive(Clone, Copy, Debug, Default)]
pub struct SlotExchange<G: Float> {
    _real: PhantomData<G>,
}

impl<G: Float> SlotExchange<G> {
    pub fn new() -> Self {
        SlotExchange { _real: PhantomData }
    }
}

impl<F: Float, G: Float> ActiveExchange<F> for SlotExchange<G> {
    type Real = G;
    type Leaf = Slot<G>;

    #[inline]
    fn exchange_leaf(&mut self, value: F, index: u32) -> Slot<G> {
        Slot::new(cast(value), index)
    }

    #[inline]
    fn exchange_passive(&mut self, value: F) -> G {
        cast(value)
    }
}
