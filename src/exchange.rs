//! Re-hosting expressions onto another tape.

use std::collections::HashMap;

use crate::active::Active;
use crate::expr::ActiveExchange;
use crate::float::Float;
use crate::leaf::cast;
use crate::tape::Tape;

/// Exchanges active leaves for [`Active<T>`] values on another tape.
///
/// Each source index is looked up in the bindings; a leaf without a binding
/// (or a [`CONSTANT`](crate::CONSTANT) one) becomes an untracked constant on
/// the target side. Values and passives are cast to `T::Real`.
///
/// ```
/// use exprtape::{Active, ExprExt, Expression, JacobianTape, PrimalTape, TapeExchange, TapeGuard};
///
/// let mut jt = JacobianTape::<f64>::new();
/// let mut pt = PrimalTape::<f64>::new();
/// let xj = Active::<JacobianTape<f64>>::from_tape(0.5, jt.new_input(0.5));
/// let xp = Active::<PrimalTape<f64>>::from_tape(0.5, pt.new_input(0.5));
///
/// let expr = xj.sin() * 2.0_f64;
/// let mut exchange = TapeExchange::new();
/// exchange.bind(xj.index(), xp);
/// let y = {
///     let _guard = TapeGuard::new(&mut pt);
///     Active::<PrimalTape<f64>>::record(expr.exchange_active_type(&mut exchange))
/// };
/// assert_eq!(y.value(), expr.value());
/// ```
pub struct TapeExchange<T: Tape> {
    bindings: HashMap<u32, Active<T>>,
}

impl<T: Tape> Default for TapeExchange<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Tape> TapeExchange<T> {
    pub fn new() -> Self {
        TapeExchange {
            bindings: HashMap::new(),
        }
    }

    /// Map the source leaf `index` to `target`.
    pub fn bind(&mut self, index: u32, target: Active<T>) -> &mut Self {
        self.bindings.insert(index, target);
        self
    }

    /// Number of bound leaves.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<F: Float, T: Tape> ActiveExchange<F> for TapeExchange<T> {
    type Real = T::Real;
    type Leaf = Active<T>;

    #[inline]
    fn exchange_leaf(&mut self, value: F, index: u32) -> Active<T> {
        self.bindings
            .get(&index)
            .copied()
            .unwrap_or_else(|| Active::constant(cast(value)))
    }

    #[inline]
    fn exchange_passive(&mut self, value: F) -> T::Real {
        cast(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Expression, JacobianTape, PrimalTape, CONSTANT};

    #[test]
    fn unbound_leaf_becomes_constant() {
        let x = Active::<JacobianTape<f64>>::from_tape(1.25, 4);
        let mut exchange = TapeExchange::<PrimalTape<f32>>::new();
        let y = (x * 2.0_f64).exchange_active_type(&mut exchange);
        assert_eq!(y.lhs().index(), CONSTANT);
        assert_eq!(y.value(), 2.5_f32);
    }
}
