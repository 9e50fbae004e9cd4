use tracing::trace;

use crate::float::Float;

impl<F: Float> super::PrimalTape<F> {
    /// Re-evaluate the tape at new inputs (forward sweep).
    ///
    /// Overwrites the stored primals in-place; constant slots keep their value.
    pub fn forward(&mut self, inputs: &[F]) {
        assert_eq!(
            inputs.len(),
            self.inputs.len(),
            "wrong number of inputs"
        );
        trace!(statements = self.statements.len(), "primal tape forward sweep");

        for (&idx, &v) in self.inputs.iter().zip(inputs) {
            self.primals[idx as usize] = v;
        }

        for stmt in &self.statements {
            let value = (stmt.handle.value)(
                &self.indices,
                &self.passives,
                &self.primals,
                stmt.index_start as usize,
                stmt.passive_start as usize,
            );
            self.primals[stmt.lhs_index as usize] = value;
        }
    }
}
