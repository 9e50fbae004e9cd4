//! Tapes and the thread-local active tape.
//!
//! [`Tape`] is the recording backend an [`Active`](crate::Active) value
//! writes to when an expression is assigned. Two backends are provided:
//!
//! - [`JacobianTape`]: stores the statement's Jacobian entries produced by
//!   [`Expression::calc_gradient`]. The reverse sweep is a single
//!   multiply-accumulate loop with zero-adjoint skipping.
//! - [`PrimalTape`](crate::PrimalTape): stores the serialized expression and
//!   replays it offline, so it can be re-evaluated at new inputs.
//!
//! The active tape is reached through a thread-local pointer installed by a
//! [`TapeGuard`]. There is one cell per concrete tape type.

use std::cell::Cell;
use std::thread::LocalKey;

use tracing::trace;

use crate::expr::{Expression, GradientSink};
use crate::float::Float;
use crate::leaf::CONSTANT;

/// A recording backend for reverse-mode AD.
pub trait Tape: Sized + 'static {
    /// The primal scalar stored on this tape.
    type Real: Float;

    /// The thread-local cell holding the active tape of this type.
    fn active_cell() -> &'static LocalKey<Cell<*mut Self>>;

    /// Create an empty tape with room for about `est_ops` statements.
    fn with_capacity(est_ops: usize) -> Self;

    /// Register a new independent variable. Returns its index.
    fn new_input(&mut self, value: Self::Real) -> u32;

    /// Record the statement `lhs = expr`. Returns the index of `lhs`, or
    /// [`CONSTANT`] if `expr` has no active leaf.
    fn store<E: Expression<Self::Real>>(&mut self, expr: &E) -> u32;

    /// Number of registered inputs.
    fn num_inputs(&self) -> usize;

    /// Number of variables (inputs, statements and constant slots).
    fn num_variables(&self) -> usize;

    /// Run the reverse sweep with custom adjoint seeds.
    /// Returns the full adjoint vector.
    fn reverse_seeded(&self, seeds: &[(u32, Self::Real)]) -> Vec<Self::Real>;

    /// Run the reverse sweep, seeding the adjoint of `seed_index` with 1.
    /// Returns the full adjoint vector.
    fn reverse(&self, seed_index: u32) -> Vec<Self::Real> {
        self.reverse_seeded(&[(seed_index, <Self::Real as num_traits::One>::one())])
    }
}

/// Access the active tape of type `T` for the current thread. Panics if no
/// tape is active.
#[inline]
pub fn with_active_tape<T: Tape, R>(f: impl FnOnce(&mut T) -> R) -> R {
    T::active_cell().with(|cell| {
        let ptr = cell.get();
        assert!(
            !ptr.is_null(),
            "No active tape. Activate one with TapeGuard or use exprtape::grad()."
        );
        // SAFETY: The TapeGuard guarantees the pointer is valid for the
        // duration of its scope, and only one mutable reference exists at a
        // time (single-threaded access via thread-local).
        let tape = unsafe { &mut *ptr };
        f(tape)
    })
}

/// RAII guard that sets a tape as the thread-local active tape and restores
/// the previous one on drop.
pub struct TapeGuard<T: Tape> {
    prev: *mut T,
}

impl<T: Tape> TapeGuard<T> {
    /// Activate `tape` as the thread-local tape. Returns a guard that restores
    /// the previous tape on drop.
    pub fn new(tape: &mut T) -> Self {
        let prev = T::active_cell().with(|cell| {
            let prev = cell.get();
            cell.set(tape as *mut T);
            prev
        });
        TapeGuard { prev }
    }
}

impl<T: Tape> Drop for TapeGuard<T> {
    fn drop(&mut self) {
        T::active_cell().with(|cell| {
            cell.set(self.prev);
        });
    }
}

/// Implements [`Tape`] for a concrete `$tape<$f>` by forwarding to its
/// inherent methods and binding it to the thread-local `$cell`.
macro_rules! impl_tape {
    ($tape:ident, $f:ty, $cell:ident) => {
        thread_local! {
            static $cell: ::std::cell::Cell<*mut $tape<$f>> =
                const { ::std::cell::Cell::new(::std::ptr::null_mut()) };
        }

        impl $crate::tape::Tape for $tape<$f> {
            type Real = $f;

            fn active_cell() -> &'static ::std::thread::LocalKey<::std::cell::Cell<*mut Self>> {
                &$cell
            }

            fn with_capacity(est_ops: usize) -> Self {
                <$tape<$f>>::with_capacity(est_ops)
            }

            #[inline]
            fn new_input(&mut self, value: $f) -> u32 {
                <$tape<$f>>::new_input(self, value)
            }

            #[inline]
            fn store<E: $crate::expr::Expression<$f>>(&mut self, expr: &E) -> u32 {
                <$tape<$f>>::store(self, expr)
            }

            fn num_inputs(&self) -> usize {
                <$tape<$f>>::num_inputs(self)
            }

            fn num_variables(&self) -> usize {
                <$tape<$f>>::num_variables(self)
            }

            fn reverse_seeded(&self, seeds: &[(u32, $f)]) -> Vec<$f> {
                <$tape<$f>>::reverse_seeded(self, seeds)
            }
        }
    };
}

pub(crate) use impl_tape;

/// A recorded statement: its result lives at `lhs_index`, and its
/// Jacobian entries span `[prev.end_plus_one .. self.end_plus_one)`.
#[derive(Clone, Copy, Debug)]
struct Statement {
    lhs_index: u32,
    end_plus_one: u32,
}

/// Two-stack Jacobian tape.
///
/// Storing a statement runs [`Expression::calc_gradient_unit`] against the
/// tape, which collects one `(index, jacobian)` pair per active leaf. The
/// reverse sweep is a single multiply-accumulate loop with zero-adjoint
/// skipping, no per-operation dispatch.
pub struct JacobianTape<F: Float> {
    statements: Vec<Statement>,
    jacobians: Vec<F>,
    indices: Vec<u32>,
    num_inputs: u32,
    num_variables: u32,
}

impl<F: Float> Default for JacobianTape<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float> JacobianTape<F> {
    /// Create an empty tape.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a tape with pre-allocated capacity.
    pub fn with_capacity(est_ops: usize) -> Self {
        let mut tape = JacobianTape {
            statements: Vec::with_capacity(est_ops + 1),
            jacobians: Vec::with_capacity(est_ops * 2),
            indices: Vec::with_capacity(est_ops * 2),
            num_inputs: 0,
            num_variables: 0,
        };
        // Sentinel statement at index 0 so that `statements[i-1].end_plus_one`
        // is always valid for i >= 1.
        tape.statements.push(Statement {
            lhs_index: 0,
            end_plus_one: 0,
        });
        tape
    }

    /// Register a new independent variable. Returns its index.
    ///
    /// No statement is pushed for input variables: they are leaf nodes whose
    /// adjoints must not be zeroed during the reverse sweep.
    #[inline]
    pub fn new_input(&mut self, _value: F) -> u32 {
        let idx = self.num_variables;
        self.num_variables += 1;
        self.num_inputs += 1;
        idx
    }

    /// Record `lhs = expr`. Returns the index of `lhs`, or [`CONSTANT`] when no
    /// Jacobian entry was produced.
    #[inline]
    pub fn store<E: Expression<F>>(&mut self, expr: &E) -> u32 {
        let start = self.jacobians.len();
        expr.calc_gradient_unit(self);
        if self.jacobians.len() == start {
            return CONSTANT;
        }

        let lhs_index = self.num_variables;
        self.num_variables += 1;
        self.statements.push(Statement {
            lhs_index,
            end_plus_one: self.jacobians.len() as u32,
        });
        lhs_index
    }

    /// Number of registered inputs.
    pub fn num_inputs(&self) -> usize {
        self.num_inputs as usize
    }

    /// Number of variables (inputs and statement results).
    pub fn num_variables(&self) -> usize {
        self.num_variables as usize
    }

    /// Number of recorded statements.
    pub fn num_statements(&self) -> usize {
        self.statements.len() - 1
    }

    /// Number of stored Jacobian entries.
    pub fn num_jacobians(&self) -> usize {
        self.jacobians.len()
    }

    /// Drop every statement and variable, keeping the allocations.
    pub fn clear(&mut self) {
        self.statements.truncate(1);
        self.jacobians.clear();
        self.indices.clear();
        self.num_inputs = 0;
        self.num_variables = 0;
    }

    /// Run the reverse sweep, seeding the adjoint of `seed_index` with 1.
    /// Returns the full adjoint vector.
    pub fn reverse(&self, seed_index: u32) -> Vec<F> {
        self.reverse_seeded(&[(seed_index, F::one())])
    }

    /// Run the reverse sweep with custom adjoint seeds. Seeds on
    /// [`CONSTANT`] are ignored.
    pub fn reverse_seeded(&self, seeds: &[(u32, F)]) -> Vec<F> {
        let mut adjoints = vec![F::zero(); self.num_variables as usize];
        for &(idx, seed) in seeds {
            if idx != CONSTANT {
                adjoints[idx as usize] = adjoints[idx as usize] + seed;
            }
        }
        self.reverse_sweep(&mut adjoints);
        adjoints
    }

    /// Core reverse sweep on a caller-seeded adjoint vector.
    pub fn reverse_sweep(&self, adjoints: &mut [F]) {
        assert_eq!(
            adjoints.len(),
            self.num_variables as usize,
            "adjoint vector has wrong length"
        );
        trace!(
            statements = self.num_statements(),
            jacobians = self.jacobians.len(),
            "jacobian tape reverse sweep"
        );

        for i in (1..self.statements.len()).rev() {
            let stmt = self.statements[i];
            let a = adjoints[stmt.lhs_index as usize];
            if a != F::zero() {
                adjoints[stmt.lhs_index as usize] = F::zero();
                let start = self.statements[i - 1].end_plus_one as usize;
                let end = stmt.end_plus_one as usize;
                for j in start..end {
                    adjoints[self.indices[j] as usize] =
                        adjoints[self.indices[j] as usize] + self.jacobians[j] * a;
                }
            }
        }
    }
}

impl<F: Float> GradientSink<F> for JacobianTape<F> {
    #[inline]
    fn push_jacobian(&mut self, index: u32, jacobian: F) {
        self.jacobians.push(jacobian);
        self.indices.push(index);
    }
}

impl_tape!(JacobianTape, f32, JACOBIAN_TAPE_F32);
impl_tape!(JacobianTape, f64, JACOBIAN_TAPE_F64);
