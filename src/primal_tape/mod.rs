//! Primal value tape for re-evaluable reverse-mode AD.
//!
//! Unlike the [`JacobianTape`](crate::JacobianTape), this tape does not store
//! Jacobian entries. Each statement keeps its serialized operands (indices
//! into the primal vector plus passive values) and a [`StatementHandle`]
//! holding the offline functions of its expression type. The tape can
//! therefore be re-evaluated at new inputs without re-recording, and the
//! reverse sweep recomputes every local partial from the stored primals.
//!
//! # Limitations
//!
//! The tape records one execution path. If the recorded function contains
//! branches (`if x > 0 { ... } else { ... }`), re-evaluating at inputs that
//! take a different branch produces incorrect results.

use std::fmt;

use crate::expr::{Expression, ReplaySink};
use crate::float::Float;
use crate::leaf::{SlotExchange, CONSTANT};
use crate::replay::{ReplayError, ReplayRecord};
use crate::tape::impl_tape;

mod forward;
mod reverse;

type ValueFn<F> = fn(&[u32], &[F], &[F], usize, usize) -> F;
type AdjointFn<F> = fn(F, &[u32], &[F], &[F], &mut [F], usize, usize);

/// The offline functions of one statement shape.
///
/// Built from `E::Exchanged<SlotExchange<F>>`, so every expression with the
/// same operators and operand layout shares one instantiation whatever its
/// leaf types were.
pub struct StatementHandle<F: Float> {
    active_count: usize,
    passive_count: usize,
    value: ValueFn<F>,
    adjoint: AdjointFn<F>,
}

impl<F: Float> StatementHandle<F> {
    /// The handle for expression type `E`.
    pub fn of<E: Expression<F>>() -> Self {
        StatementHandle {
            active_count: E::ACTIVE_COUNT,
            passive_count: E::PASSIVE_COUNT,
            value: <E::Exchanged<SlotExchange<F>> as Expression<F>>::get_value_offline,
            adjoint: <E::Exchanged<SlotExchange<F>> as Expression<F>>::eval_adjoint_offset,
        }
    }

    /// Number of operand indices the statement reads.
    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Number of passive values the statement reads.
    pub fn passive_count(&self) -> usize {
        self.passive_count
    }

    /// Replay `record` through this handle.
    pub fn value(&self, record: &ReplayRecord<F>) -> Result<F, ReplayError> {
        record.check_counts(self.active_count, self.passive_count)?;
        Ok((self.value)(
            &record.indices,
            &record.passives,
            &record.primals,
            0,
            0,
        ))
    }

    /// Propagate `seed` through `record`; one adjoint per primal slot.
    pub fn adjoint(&self, record: &ReplayRecord<F>, seed: F) -> Result<Vec<F>, ReplayError> {
        record.check_counts(self.active_count, self.passive_count)?;
        let mut adjoints = vec![F::zero(); record.primals.len()];
        (self.adjoint)(
            seed,
            &record.indices,
            &record.passives,
            &record.primals,
            &mut adjoints,
            0,
            0,
        );
        Ok(adjoints)
    }
}

impl<F: Float> Clone for StatementHandle<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: Float> Copy for StatementHandle<F> {}

impl<F: Float> fmt::Debug for StatementHandle<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementHandle")
            .field("active_count", &self.active_count)
            .field("passive_count", &self.passive_count)
            .finish()
    }
}

/// A recorded statement: the result goes to `lhs_index`; operands start at
/// `index_start` in the index buffer and `passive_start` in the passive buffer.
#[derive(Clone, Copy, Debug)]
struct Statement<F: Float> {
    lhs_index: u32,
    index_start: u32,
    passive_start: u32,
    handle: StatementHandle<F>,
}

/// A tape of serialized statements that can be re-evaluated at new inputs.
///
/// Created via [`crate::api::record`], or by activating it with a
/// [`TapeGuard`](crate::TapeGuard) and assigning
/// [`Active<PrimalTape<F>>`](crate::Active) values. After recording, call
/// [`forward`](Self::forward) to re-evaluate and [`reverse`](Self::reverse)
/// to compute adjoints.
pub struct PrimalTape<F: Float> {
    statements: Vec<Statement<F>>,
    indices: Vec<u32>,
    passives: Vec<F>,
    primals: Vec<F>,
    inputs: Vec<u32>,
    output_index: u32,
}

impl<F: Float> Default for PrimalTape<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> PrimalTape<F> {
    /// Create an empty tape.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a tape with pre-allocated capacity.
    pub fn with_capacity(est_ops: usize) -> Self {
        PrimalTape {
            statements: Vec::with_capacity(est_ops),
            indices: Vec::with_capacity(est_ops * 2),
            passives: Vec::new(),
            primals: Vec::with_capacity(est_ops),
            inputs: Vec::new(),
            output_index: CONSTANT,
        }
    }

    /// Register a new input variable. Returns its index.
    #[inline]
    pub fn new_input(&mut self, value: F) -> u32 {
        let idx = self.primals.len() as u32;
        self.primals.push(value);
        self.inputs.push(idx);
        idx
    }

    /// Register a constant variable. Returns its index.
    ///
    /// Constants keep their value across [`forward`](Self::forward) and collect
    /// adjoints like any other variable.
    #[inline]
    pub fn push_const(&mut self, value: F) -> u32 {
        let idx = self.primals.len() as u32;
        self.primals.push(value);
        idx
    }

    /// Record `lhs = expr`. Returns the index of `lhs`, or [`CONSTANT`] if no
    /// leaf of `expr` is tracked on this tape.
    ///
    /// Untracked active leaves are given a constant slot so the statement can
    /// be replayed; those slots are rolled back when nothing was tracked.
    pub fn store<E: Expression<F>>(&mut self, expr: &E) -> u32 {
        let index_start = self.indices.len();
        let passive_start = self.passives.len();
        let primal_len = self.primals.len();

        let mut writer = StatementWriter {
            tape: self,
            any_active: false,
        };
        expr.push_indices(&mut writer);
        expr.push_passive(&mut writer);
        if !writer.any_active {
            self.indices.truncate(index_start);
            self.passives.truncate(passive_start);
            self.primals.truncate(primal_len);
            return CONSTANT;
        }

        let lhs_index = self.primals.len() as u32;
        self.primals.push(expr.value());
        self.statements.push(Statement {
            lhs_index,
            index_start: index_start as u32,
            passive_start: passive_start as u32,
            handle: StatementHandle::of::<E>(),
        });
        lhs_index
    }

    /// Mark the output variable.
    #[inline]
    pub fn set_output(&mut self, index: u32) {
        self.output_index = index;
    }

    /// The output variable's index, [`CONSTANT`] if none was set.
    #[inline]
    pub fn output_index(&self) -> u32 {
        self.output_index
    }

    /// Get the output value (available after `forward()` or initial recording).
    #[inline]
    pub fn output_value(&self) -> F {
        self.value(self.output_index)
    }

    /// The current primal of variable `index`. Panics on [`CONSTANT`].
    #[inline]
    pub fn value(&self, index: u32) -> F {
        assert!(index != CONSTANT, "no variable at CONSTANT index");
        self.primals[index as usize]
    }

    /// Number of input variables.
    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Number of variables (inputs, constant slots and statement results).
    #[inline]
    pub fn num_variables(&self) -> usize {
        self.primals.len()
    }

    /// Number of recorded statements.
    #[inline]
    pub fn num_statements(&self) -> usize {
        self.statements.len()
    }

    /// The handle of statement `i`.
    pub fn statement_handle(&self, i: usize) -> &StatementHandle<F> {
        &self.statements[i].handle
    }

    /// Statement `i` as a self-contained [`ReplayRecord`] at the current primals.
    pub fn statement_record(&self, i: usize) -> ReplayRecord<F> {
        let stmt = &self.statements[i];
        let start = stmt.index_start as usize;
        let passive_start = stmt.passive_start as usize;
        ReplayRecord::from_tape_slices(
            &self.indices[start..start + stmt.handle.active_count],
            &self.passives[passive_start..passive_start + stmt.handle.passive_count],
            &self.primals,
        )
    }

    /// Drop every statement and variable, keeping the allocations.
    pub fn clear(&mut self) {
        self.statements.clear();
        self.indices.clear();
        self.passives.clear();
        self.primals.clear();
        self.inputs.clear();
        self.output_index = CONSTANT;
    }
}

/// Appends a statement's operands to the tape buffers.
struct StatementWriter<'a, F: Float> {
    tape: &'a mut PrimalTape<F>,
    any_active: bool,
}

impl<F: Float> ReplaySink<F> for StatementWriter<'_, F> {
    #[inline]
    fn push_index(&mut self, index: u32, value: F) {
        let index = if index == CONSTANT {
            self.tape.push_const(value)
        } else {
            self.any_active = true;
            index
        };
        self.tape.indices.push(index);
    }

    #[inline]
    fn push_passive(&mut self, value: F) {
        self.tape.passives.push(value);
    }
}

impl_tape!(PrimalTape, f32, PRIMAL_TAPE_F32);
impl_tape!(PrimalTape, f64, PRIMAL_TAPE_F64);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Active, TapeGuard};

    type P = Active<PrimalTape<f64>>;

    #[test]
    fn statement_without_tracked_leaf_rolls_back() {
        let mut tape = PrimalTape::<f64>::new();
        let x = tape.new_input(1.0);
        let before = tape.num_variables();
        let c = P::constant(2.0);
        {
            let _guard = TapeGuard::new(&mut tape);
            let y = P::record(c * c + 1.0_f64);
            assert_eq!(y.index(), CONSTANT);
        }
        assert_eq!(tape.num_variables(), before);
        assert_eq!(tape.num_statements(), 0);
        assert_eq!(x, 0);
    }

    #[test]
    fn untracked_leaf_gets_constant_slot() {
        let mut tape = PrimalTape::<f64>::new();
        let xi = tape.new_input(3.0);
        let x = P::from_tape(3.0, xi);
        let c = P::constant(2.0);
        let y = {
            let _guard = TapeGuard::new(&mut tape);
            P::record(x * c)
        };
        // input, constant slot, result
        assert_eq!(tape.num_variables(), 3);
        assert_eq!(y.index(), 2);
        assert_eq!(tape.value(1), 2.0);
        let record = tape.statement_record(0);
        assert_eq!(record.leaves, vec![xi, 1]);
        assert_eq!(record.primals, vec![3.0, 2.0]);
    }
}
