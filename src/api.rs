use crate::active::Active;
use crate::float::Float;
use crate::leaf::CONSTANT;
use crate::primal_tape::PrimalTape;
use crate::tape::{Tape, TapeGuard};

/// Register `x` as inputs on `tape`.
fn new_inputs<T: Tape>(tape: &mut T, x: &[T::Real]) -> Vec<Active<T>> {
    x.iter()
        .map(|&val| Active::from_tape(val, tape.new_input(val)))
        .collect()
}

/// Compute the gradient of a scalar function `f : R^n → R` using reverse mode.
///
/// ```
/// use exprtape::JacobianReal64;
///
/// let g = exprtape::grad(|x: &[JacobianReal64]| {
///     JacobianReal64::record(x[0] * x[0] + x[1] * x[1])
/// }, &[3.0, 4.0]);
/// assert!((g[0] - 6.0).abs() < 1e-10);
/// assert!((g[1] - 8.0).abs() < 1e-10);
/// ```
pub fn grad<T: Tape>(f: impl FnOnce(&[Active<T>]) -> Active<T>, x: &[T::Real]) -> Vec<T::Real> {
    let mut tape = T::with_capacity(x.len() * 10);
    let inputs = new_inputs(&mut tape, x);

    let output = {
        let _guard = TapeGuard::new(&mut tape);
        f(&inputs)
    };

    // A constant output leaves every adjoint at zero.
    let adjoints = tape.reverse(output.index());
    inputs
        .iter()
        .map(|input| adjoints[input.index() as usize])
        .collect()
}

/// Vector-Jacobian product (reverse mode): `(f(x), wᵀ·J)`.
///
/// Evaluates `f` at `x` and computes the adjoint product with weights `w`.
pub fn vjp<T: Tape>(
    f: impl FnOnce(&[Active<T>]) -> Vec<Active<T>>,
    x: &[T::Real],
    w: &[T::Real],
) -> (Vec<T::Real>, Vec<T::Real>) {
    let mut tape = T::with_capacity(x.len() * 10);
    let inputs = new_inputs(&mut tape, x);

    let outputs = {
        let _guard = TapeGuard::new(&mut tape);
        f(&inputs)
    };

    assert_eq!(
        outputs.len(),
        w.len(),
        "output length must match weight vector length"
    );

    let values = outputs.iter().map(|r| r.value).collect();

    // Seed adjoints with weights.
    let seeds: Vec<(u32, T::Real)> = outputs
        .iter()
        .zip(w.iter())
        .filter(|(r, _)| r.index != CONSTANT)
        .map(|(r, &wi)| (r.index, wi))
        .collect();
    let adjoints = tape.reverse_seeded(&seeds);

    let grad = inputs
        .iter()
        .map(|input| adjoints[input.index() as usize])
        .collect();
    (values, grad)
}

/// Record a function into a [`PrimalTape`] that can be re-evaluated at
/// different inputs without re-recording.
///
/// Returns the tape and the output value from the recording pass.
///
/// # Limitations
///
/// The tape records one execution path. If `f` contains branches
/// (`if x > 0 { ... } else { ... }`), re-evaluating at inputs that take a
/// different branch produces **incorrect results**.
///
/// # Example
///
/// ```
/// use exprtape::PrimalReal64;
///
/// let (mut tape, val) = exprtape::record(
///     |x: &[PrimalReal64]| PrimalReal64::record(x[0] * x[0] + x[1] * x[1]),
///     &[3.0, 4.0],
/// );
/// assert!((val - 25.0).abs() < 1e-10);
///
/// let g = tape.gradient(&[1.0, 2.0]);
/// assert!((g[0] - 2.0).abs() < 1e-10);
/// assert!((g[1] - 4.0).abs() < 1e-10);
/// ```
pub fn record<F: Float>(
    f: impl FnOnce(&[Active<PrimalTape<F>>]) -> Active<PrimalTape<F>>,
    x: &[F],
) -> (PrimalTape<F>, F)
where
    PrimalTape<F>: Tape<Real = F>,
{
    let mut tape = PrimalTape::with_capacity(x.len() * 10);
    let inputs = new_inputs(&mut tape, x);

    let output = {
        let _guard = TapeGuard::new(&mut tape);
        f(&inputs)
    };

    let index = if output.is_active() {
        output.index()
    } else {
        tape.push_const(output.value)
    };
    tape.set_output(index);
    (tape, output.value)
}
