use std::fmt::{self, Debug, Display};
use std::marker::PhantomData;

use crate::expr::{ActiveExchange, Expression, GradientSink, ReplaySink};
use crate::leaf::{self, CONSTANT};
use crate::tape::{self, Tape};

/// Reverse-mode active value: the leaf of every expression tree.
///
/// Just a value and a tape index, 12 bytes for `f64`. `Copy` because the tape
/// lives in a thread-local, not inside this struct; the type parameter only
/// names which tape the index refers to.
pub struct Active<T: Tape> {
    pub(crate) value: T::Real,
    pub(crate) index: u32,
    _tape: PhantomData<fn() -> T>,
}

impl<T: Tape> Active<T> {
    /// Create a constant (not tracked on tape).
    #[inline]
    pub fn constant(value: T::Real) -> Self {
        Active::from_tape(value, CONSTANT)
    }

    /// Create an active value from a tape allocation.
    /// Typically only used internally by the API layer and tests.
    #[inline]
    pub fn from_tape(value: T::Real, index: u32) -> Self {
        Active {
            value,
            index,
            _tape: PhantomData,
        }
    }

    /// Register `value` as a new independent variable on the active tape.
    #[inline]
    pub fn new_input(value: T::Real) -> Self {
        let index = tape::with_active_tape(|t: &mut T| t.new_input(value));
        Active::from_tape(value, index)
    }

    /// Store `expr` on the active tape and return the resulting active value.
    #[inline]
    pub fn record<E: Expression<T::Real>>(expr: E) -> Self {
        let index = tape::with_active_tape(|t: &mut T| t.store(&expr));
        Active::from_tape(expr.value(), index)
    }

    /// Overwrite `self` with the result of `expr`.
    #[inline]
    pub fn assign<E: Expression<T::Real>>(&mut self, expr: E) {
        *self = Active::record(expr);
    }

    /// Get the tape index (for advanced usage / testing).
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// `true` if this value is tracked on a tape.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.index != CONSTANT
    }
}

impl<T: Tape> Expression<T::Real> for Active<T> {
    const ACTIVE_COUNT: usize = 1;
    const PASSIVE_COUNT: usize = 0;
    const ACTIVE: bool = true;

    type Exchanged<X: ActiveExchange<T::Real>> = X::Leaf;

    #[inline]
    fn value(&self) -> T::Real {
        self.value
    }

    #[inline]
    fn calc_gradient<S: GradientSink<T::Real> + ?Sized>(&self, sink: &mut S, multiplier: T::Real) {
        leaf::leaf_gradient(self.index, sink, multiplier);
    }

    #[inline]
    fn push_passive<S: ReplaySink<T::Real> + ?Sized>(&self, _sink: &mut S) {}

    #[inline]
    fn push_indices<S: ReplaySink<T::Real> + ?Sized>(&self, sink: &mut S) {
        sink.push_index(self.index, self.value);
    }

    #[inline]
    fn get_value_offline(
        indices: &[u32],
        _passives: &[T::Real],
        primals: &[T::Real],
        offset: usize,
        _passive_offset: usize,
    ) -> T::Real {
        leaf::leaf_value_offline(indices, primals, offset)
    }

    #[inline]
    fn eval_adjoint_offset(
        seed: T::Real,
        indices: &[u32],
        _passives: &[T::Real],
        _primals: &[T::Real],
        adjoints: &mut [T::Real],
        offset: usize,
        _passive_offset: usize,
    ) {
        leaf::leaf_adjoint_offline(seed, indices, adjoints, offset);
    }

    #[inline]
    fn exchange_active_type<X: ActiveExchange<T::Real>>(&self, exchange: &mut X) -> X::Leaf {
        exchange.exchange_leaf(self.value, self.index)
    }
}

impl<T: Tape> Clone for Active<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Tape> Copy for Active<T> {}

impl<T: Tape> Debug for Active<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Active")
            .field("value", &self.value)
            .field("index", &self.index)
            .finish()
    }
}

impl<T: Tape> Display for Active<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T: Tape> Default for Active<T> {
    fn default() -> Self {
        Active::constant(<T::Real as Default>::default())
    }
}

impl<T: Tape> PartialEq for Active<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Tape> PartialOrd for Active<T> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.value.partial_cmp(&other.value)
    }
}
