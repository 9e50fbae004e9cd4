//! Self-contained serialized statements.
//!
//! A [`ReplayRecord`] holds the three buffers the offline path of an
//! [`Expression`] type reads: operand indices, passive values and primal
//! values. Records can be detached from any tape, stored, sent elsewhere
//! (with the `serde` feature) and replayed against the expression type that
//! produced them.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::expr::{Expression, ReplaySink};
use crate::float::Float;
use crate::leaf::CONSTANT;

/// Why a [`ReplayRecord`] cannot be replayed as a given expression type.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ReplayError {
    /// The index buffer is shorter or longer than the expression's active
    /// leaf count.
    #[error("record has {found} operand indices, expression expects {expected}")]
    IndexCountMismatch {
        /// `E::ACTIVE_COUNT`.
        expected: usize,
        /// Length of `indices`.
        found: usize,
    },

    /// The passive buffer is shorter or longer than the expression's passive
    /// leaf count.
    #[error("record has {found} passive values, expression expects {expected}")]
    PassiveCountMismatch {
        /// `E::PASSIVE_COUNT`.
        expected: usize,
        /// Length of `passives`.
        found: usize,
    },

    /// `leaves` does not name exactly one tape index per primal slot.
    #[error("record has {primals} primal slots but {leaves} leaf indices")]
    LeafCountMismatch {
        /// Length of `primals`.
        primals: usize,
        /// Length of `leaves`.
        leaves: usize,
    },

    /// An operand names a slot past the end of `primals`.
    #[error("operand {position} refers to slot {index}, but only {len} primals are stored")]
    IndexOutOfRange {
        /// Position of the operand in `indices`.
        position: usize,
        /// The slot it names.
        index: u32,
        /// Length of `primals`.
        len: usize,
    },
}

/// One statement in serialized form.
///
/// Active leaves are compacted into local slots: `indices[k]` names the slot
/// of the `k`-th active leaf (depth-first, left to right) and
/// `primals[slot]` its value. A leaf that occurs twice shares one slot, so
/// its adjoint comes back accumulated. `leaves[slot]` keeps the
/// tape index of each slot ([`CONSTANT`] for untracked leaves).
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReplayRecord<F> {
    pub indices: Vec<u32>,
    pub passives: Vec<F>,
    pub primals: Vec<F>,
    pub leaves: Vec<u32>,
}

impl<F: Float> ReplayRecord<F> {
    /// Serialize `expr` at its current leaf values.
    pub fn capture<E: Expression<F>>(expr: &E) -> Self {
        let mut builder = RecordBuilder::default();
        expr.push_indices(&mut builder);
        expr.push_passive(&mut builder);
        builder.record
    }

    /// Build a record from tape-level buffers: `indices` name entries of
    /// `values`, which are compacted into local slots.
    pub(crate) fn from_tape_slices(indices: &[u32], passives: &[F], values: &[F]) -> Self {
        let mut builder = RecordBuilder::default();
        for &index in indices {
            builder.push_index(index, values[index as usize]);
        }
        builder.record.passives.extend_from_slice(passives);
        builder.record
    }

    /// Check that this record has the layout `E` reads.
    pub fn check_layout<E: Expression<F>>(&self) -> Result<(), ReplayError> {
        self.check_counts(E::ACTIVE_COUNT, E::PASSIVE_COUNT)
    }

    pub(crate) fn check_counts(
        &self,
        active_count: usize,
        passive_count: usize,
    ) -> Result<(), ReplayError> {
        let result = self.validate(active_count, passive_count);
        if let Err(ref err) = result {
            debug!(%err, "replay record rejected");
        }
        result
    }

    fn validate(&self, active_count: usize, passive_count: usize) -> Result<(), ReplayError> {
        if self.indices.len() != active_count {
            return Err(ReplayError::IndexCountMismatch {
                expected: active_count,
                found: self.indices.len(),
            });
        }
        if self.passives.len() != passive_count {
            return Err(ReplayError::PassiveCountMismatch {
                expected: passive_count,
                found: self.passives.len(),
            });
        }
        let len = self.primals.len();
        if self.leaves.len() != len {
            return Err(ReplayError::LeafCountMismatch {
                primals: len,
                leaves: self.leaves.len(),
            });
        }
        match self
            .indices
            .iter()
            .position(|&index| index as usize >= len)
        {
            Some(position) => Err(ReplayError::IndexOutOfRange {
                position,
                index: self.indices[position],
                len,
            }),
            None => Ok(()),
        }
    }

    /// Recompute the statement's primal result as expression type `E`.
    pub fn value<E: Expression<F>>(&self) -> Result<F, ReplayError> {
        self.check_layout::<E>()?;
        Ok(E::get_value_offline(
            &self.indices,
            &self.passives,
            &self.primals,
            0,
            0,
        ))
    }

    /// Propagate `seed` through the statement as expression type `E`.
    /// Returns one adjoint per primal slot.
    pub fn adjoint<E: Expression<F>>(&self, seed: F) -> Result<Vec<F>, ReplayError> {
        self.check_layout::<E>()?;
        let mut adjoints = vec![F::zero(); self.primals.len()];
        E::eval_adjoint(
            seed,
            &self.indices,
            &self.passives,
            &self.primals,
            &mut adjoints,
        );
        Ok(adjoints)
    }

    /// Replace the primal of every slot that came from tape variable `index`.
    /// Leaves without a primal slot are skipped.
    pub fn set_leaf_value(&mut self, index: u32, value: F) {
        if index == CONSTANT {
            return;
        }
        for (primal, &leaf) in self.primals.iter_mut().zip(&self.leaves) {
            if leaf == index {
                *primal = value;
            }
        }
    }
}

#[derive(Default)]
struct RecordBuilder<F> {
    record: ReplayRecord<F>,
    slots: HashMap<u32, u32>,
}

impl<F: Float> ReplaySink<F> for RecordBuilder<F> {
    fn push_index(&mut self, index: u32, value: F) {
        let next = self.record.primals.len() as u32;
        let slot = if index == CONSTANT {
            None
        } else {
            self.slots.get(&index).copied()
        };
        let slot = slot.unwrap_or_else(|| {
            if index != CONSTANT {
                self.slots.insert(index, next);
            }
            self.record.primals.push(value);
            self.record.leaves.push(index);
            next
        });
        self.record.indices.push(slot);
    }

    fn push_passive(&mut self, value: F) {
        self.record.passives.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Passive, Slot};

    #[test]
    fn capture_shares_slot_for_repeated_leaf() {
        let x = Slot::new(2.0_f64, 7);
        let y = Slot::new(5.0_f64, 3);
        let record = ReplayRecord::capture(&(x * y + x));
        assert_eq!(record.indices, vec![0, 1, 0]);
        assert_eq!(record.primals, vec![2.0, 5.0]);
        assert_eq!(record.leaves, vec![7, 3]);
        assert!(record.passives.is_empty());
    }

    #[test]
    fn constant_leaves_get_their_own_slots() {
        let c = Slot::new(1.5_f64, CONSTANT);
        let d = Slot::new(2.5_f64, CONSTANT);
        let record = ReplayRecord::capture(&(c + d));
        assert_eq!(record.indices, vec![0, 1]);
        assert_eq!(record.leaves, vec![CONSTANT, CONSTANT]);
    }

    #[test]
    fn layout_mismatch_is_reported() {
        let x = Slot::new(2.0_f64, 0);
        let record = ReplayRecord::capture(&(x * 3.0_f64));
        type Shape = crate::BinaryExpr<f64, crate::formula::MulOp, Slot<f64>, Slot<f64>>;
        assert_eq!(
            record.check_layout::<Shape>(),
            Err(ReplayError::IndexCountMismatch {
                expected: 2,
                found: 1
            })
        );
        type PassiveShape =
            crate::BinaryExpr<f64, crate::formula::MulOp, Slot<f64>, Passive<f64>>;
        assert_eq!(record.value::<PassiveShape>(), Ok(6.0));
    }

    #[test]
    fn out_of_range_slot_is_reported() {
        let record = ReplayRecord {
            indices: vec![0, 4],
            passives: vec![],
            primals: vec![1.0_f64, 2.0],
            leaves: vec![0, 1],
        };
        type Shape = crate::BinaryExpr<f64, crate::formula::AddOp, Slot<f64>, Slot<f64>>;
        assert_eq!(
            record.value::<Shape>(),
            Err(ReplayError::IndexOutOfRange {
                position: 1,
                index: 4,
                len: 2
            })
        );
    }

    #[test]
    fn leaf_count_mismatch_is_reported() {
        let mut record = ReplayRecord {
            indices: vec![0, 0],
            passives: vec![],
            primals: vec![1.0_f64],
            leaves: vec![9, 3],
        };
        type Shape = crate::BinaryExpr<f64, crate::formula::AddOp, Slot<f64>, Slot<f64>>;
        assert_eq!(
            record.value::<Shape>(),
            Err(ReplayError::LeafCountMismatch {
                primals: 1,
                leaves: 2
            })
        );

        // Editing a malformed record never writes past `primals`.
        record.set_leaf_value(3, 5.0);
        record.set_leaf_value(9, 4.0);
        assert_eq!(record.primals, vec![4.0]);
    }

    #[test]
    fn surplus_entries_are_reported() {
        let x = Slot::new(2.0_f64, 0);
        let mut record = ReplayRecord::capture(&(x * 3.0_f64));
        record.passives.push(1.0);
        type Shape = crate::BinaryExpr<f64, crate::formula::MulOp, Slot<f64>, Passive<f64>>;
        assert_eq!(
            record.check_layout::<Shape>(),
            Err(ReplayError::PassiveCountMismatch {
                expected: 1,
                found: 2
            })
        );
    }

    #[derive(Default)]
    struct RawBuffers {
        indices: Vec<u32>,
    }

    impl ReplaySink<f64> for RawBuffers {
        fn push_index(&mut self, index: u32, _value: f64) {
            self.indices.push(index);
        }

        fn push_passive(&mut self, _value: f64) {}
    }

    #[test]
    fn constant_leaf_replays_through_its_slot() {
        let x = Slot::new(2.0_f64, 0);
        let c = Slot::new(3.0_f64, CONSTANT);
        let expr = x * c;

        let mut raw = RawBuffers::default();
        expr.push_indices(&mut raw);
        assert_eq!(raw.indices, vec![0, CONSTANT]);

        let record = ReplayRecord::capture(&expr);
        assert_eq!(record.indices, vec![0, 1]);
        assert_eq!(record.leaves, vec![0, CONSTANT]);

        fn replay_as<E: Expression<f64>>(_: &E, record: &ReplayRecord<f64>) -> (f64, Vec<f64>) {
            (record.value::<E>().unwrap(), record.adjoint::<E>(1.0).unwrap())
        }
        let (value, adjoints) = replay_as(&expr, &record);
        assert_eq!(value, 6.0);
        // The constant's slot holds its partial; no tape variable receives it.
        assert_eq!(adjoints, vec![3.0, 2.0]);
    }
}
