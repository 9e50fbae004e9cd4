use tracing::trace;

use crate::float::Float;
use crate::leaf::CONSTANT;

impl<F: Float> super::PrimalTape<F> {
    /// Run the reverse sweep, seeding the adjoint of `seed_index` with 1.
    /// Returns the full adjoint vector.
    pub fn reverse(&self, seed_index: u32) -> Vec<F> {
        self.reverse_seeded(&[(seed_index, F::one())])
    }

    /// Run the reverse sweep with custom adjoint seeds. Seeds on
    /// [`CONSTANT`] are ignored.
    pub fn reverse_seeded(&self, seeds: &[(u32, F)]) -> Vec<F> {
        let mut adjoints = vec![F::zero(); self.primals.len()];
        for &(idx, seed) in seeds {
            if idx != CONSTANT {
                adjoints[idx as usize] = adjoints[idx as usize] + seed;
            }
        }
        self.reverse_sweep(&mut adjoints);
        adjoints
    }

    /// Core reverse sweep on a caller-seeded adjoint vector.
    ///
    /// Each statement replays its local partials from the stored primals, so
    /// call [`forward`](Self::forward) first when the inputs changed.
    pub fn reverse_sweep(&self, adjoints: &mut [F]) {
        assert_eq!(
            adjoints.len(),
            self.primals.len(),
            "adjoint vector has wrong length"
        );
        trace!(
            statements = self.statements.len(),
            operands = self.indices.len(),
            "primal tape reverse sweep"
        );

        for stmt in self.statements.iter().rev() {
            let lhs = stmt.lhs_index as usize;
            let a = adjoints[lhs];
            if a == F::zero() {
                continue;
            }
            adjoints[lhs] = F::zero();
            (stmt.handle.adjoint)(
                a,
                &self.indices,
                &self.passives,
                &self.primals,
                adjoints,
                stmt.index_start as usize,
                stmt.passive_start as usize,
            );
        }
    }

    /// Adjoints of the inputs, in registration order, from a full adjoint vector.
    pub fn input_adjoints(&self, adjoints: &[F]) -> Vec<F> {
        self.inputs.iter().map(|&i| adjoints[i as usize]).collect()
    }

    /// Re-evaluate at `inputs` and return the gradient of the output.
    ///
    /// A constant output (no statement depends on an input) has a zero gradient.
    pub fn gradient(&mut self, inputs: &[F]) -> Vec<F> {
        self.forward(inputs);
        let adjoints = self.reverse(self.output_index);
        self.input_adjoints(&adjoints)
    }
}
