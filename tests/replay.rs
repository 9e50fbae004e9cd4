use approx::assert_relative_eq;
use exprtape::functions::{atan2, pow};
use exprtape::{
    Active, ExprExt, Expression, JacobianReal32, JacobianReal64, JacobianTape, PrimalReal64,
    PrimalTape, ReplayError, ReplayRecord, Slot, SlotExchange, TapeExchange, TapeGuard, CONSTANT,
};

fn rosenbrock(x: &[PrimalReal64]) -> PrimalReal64 {
    let dx = PrimalReal64::record(x[0] - 1.0_f64);
    let t = PrimalReal64::record(x[1] - x[0] * x[0]);
    PrimalReal64::record(dx * dx + 100.0_f64 * t * t)
}

fn rosenbrock_grad(x: [f64; 2]) -> [f64; 2] {
    let t = x[1] - x[0] * x[0];
    [2.0 * (x[0] - 1.0) - 400.0 * x[0] * t, 200.0 * t]
}

/// Replay `expr` from a captured record and return `(value, adjoint per leaf index)`.
fn replay<E: Expression<f64>>(expr: &E, num_leaves: usize) -> (f64, Vec<f64>) {
    let record = ReplayRecord::capture(expr);
    let value = record.value::<E>().unwrap();
    let slots = record.adjoint::<E>(1.0).unwrap();
    let mut grad = vec![0.0; num_leaves];
    for (slot, &leaf) in record.leaves.iter().enumerate() {
        if leaf != CONSTANT {
            grad[leaf as usize] += slots[slot];
        }
    }
    (value, grad)
}

#[test]
fn captured_record_replays_live_gradient() {
    let mut tape = JacobianTape::<f64>::new();
    let xi = [tape.new_input(0.7), tape.new_input(-1.3)];
    let x = [
        JacobianReal64::from_tape(0.7, xi[0]),
        JacobianReal64::from_tape(-1.3, xi[1]),
    ];
    let expr = x[0].sin() * x[1] + pow(x[0], 2.0_f64) / x[1].exp() - atan2(x[1], x[0]);

    let (value, grad) = replay(&expr, 2);
    assert_eq!(value, expr.value());

    let y = {
        let _guard = TapeGuard::new(&mut tape);
        JacobianReal64::record(expr)
    };
    let adjoints = tape.reverse(y.index());
    assert_relative_eq!(grad[0], adjoints[xi[0] as usize], max_relative = 1e-14);
    assert_relative_eq!(grad[1], adjoints[xi[1] as usize], max_relative = 1e-14);
}

#[test]
fn repeated_leaf_accumulates_offline() {
    let x = Slot::new(3.0_f64, 0);
    let expr = x * x * x;
    let (value, grad) = replay(&expr, 1);
    assert_eq!(value, 27.0);
    assert_relative_eq!(grad[0], 27.0, max_relative = 1e-14);
}

#[test]
fn record_layout_is_checked() {
    let x = Slot::new(2.0_f64, 0);
    let y = Slot::new(0.5_f64, 1);

    let record = ReplayRecord::capture(&(x * y));
    fn layout_of<E: Expression<f64>>(_: &E, record: &ReplayRecord<f64>) -> Result<(), ReplayError> {
        record.check_layout::<E>()
    }

    // Same shape: accepted.
    assert_eq!(layout_of(&(x * y), &record), Ok(()));
    // One passive instead of an operand.
    assert_eq!(
        layout_of(&(x * 2.0_f64), &record),
        Err(ReplayError::IndexCountMismatch {
            expected: 1,
            found: 2
        })
    );
    // Three operands.
    assert_eq!(
        layout_of(&(x * y + x), &record),
        Err(ReplayError::IndexCountMismatch {
            expected: 3,
            found: 2
        })
    );

    let passive = ReplayRecord::capture(&(x / 4.0_f64));
    assert_eq!(
        layout_of(&(x.sin()), &passive),
        Err(ReplayError::PassiveCountMismatch {
            expected: 0,
            found: 1
        })
    );
}

#[test]
fn replay_error_messages() {
    let err = ReplayError::IndexOutOfRange {
        position: 1,
        index: 9,
        len: 2,
    };
    assert_eq!(
        err.to_string(),
        "operand 1 refers to slot 9, but only 2 primals are stored"
    );
}

#[test]
fn edited_record_replays_new_point() {
    let x = Slot::new(1.0_f64, 4);
    let y = Slot::new(2.0_f64, 6);
    let expr = x / y;
    let mut record = ReplayRecord::capture(&expr);
    record.set_leaf_value(4, 3.0);
    record.set_leaf_value(6, 4.0);

    fn replay_as<E: Expression<f64>>(_: &E, record: &ReplayRecord<f64>) -> (f64, Vec<f64>) {
        (record.value::<E>().unwrap(), record.adjoint::<E>(2.0).unwrap())
    }
    let (value, adjoints) = replay_as(&expr, &record);
    assert_eq!(value, 0.75);
    assert_relative_eq!(adjoints[0], 2.0 / 4.0, max_relative = 1e-14);
    assert_relative_eq!(adjoints[1], -2.0 * 3.0 / 16.0, max_relative = 1e-14);
}

// ── Primal tape ──

#[test]
fn primal_tape_gradient_at_new_points() {
    let (mut tape, value) = exprtape::record(rosenbrock, &[1.5, 2.5]);
    assert_relative_eq!(value, 0.25 + 100.0 * 0.0625, max_relative = 1e-14);
    assert_eq!(tape.num_inputs(), 2);

    for x in [[1.5, 2.5], [0.0, 0.0], [-1.2, 1.0], [2.0, 3.0]] {
        let g = tape.gradient(&x);
        let expected = rosenbrock_grad(x);
        assert_relative_eq!(g[0], expected[0], epsilon = 1e-12, max_relative = 1e-12);
        assert_relative_eq!(g[1], expected[1], epsilon = 1e-12, max_relative = 1e-12);
    }
}

#[test]
fn primal_tape_matches_jacobian_tape() {
    let x = [0.3, 1.7];
    let f_primal = |v: &[PrimalReal64]| PrimalReal64::record(v[0].exp() * v[1].cos() + v[0] / v[1]);
    let f_jacobian =
        |v: &[JacobianReal64]| JacobianReal64::record(v[0].exp() * v[1].cos() + v[0] / v[1]);

    let (mut tape, _) = exprtape::record(f_primal, &x);
    let from_primal = tape.gradient(&x);
    let from_jacobian = exprtape::grad(f_jacobian, &x);
    assert_relative_eq!(from_primal[0], from_jacobian[0], max_relative = 1e-14);
    assert_relative_eq!(from_primal[1], from_jacobian[1], max_relative = 1e-14);
}

#[test]
fn forward_updates_output_value() {
    let (mut tape, value) = exprtape::record(
        |v: &[PrimalReal64]| PrimalReal64::record(v[0] * v[1] + 1.0_f64),
        &[2.0, 3.0],
    );
    assert_eq!(value, 7.0);
    tape.forward(&[4.0, 5.0]);
    assert_eq!(tape.output_value(), 21.0);
}

#[test]
fn constant_output_records_constant_slot() {
    let (mut tape, value) = exprtape::record(|_v: &[PrimalReal64]| PrimalReal64::constant(4.0), &[1.0]);
    assert_eq!(value, 4.0);
    assert_ne!(tape.output_index(), CONSTANT);
    assert_eq!(tape.gradient(&[2.0]), vec![0.0]);
    assert_eq!(tape.output_value(), 4.0);
}

#[test]
#[should_panic(expected = "wrong number of inputs")]
fn forward_rejects_wrong_input_count() {
    let (mut tape, _) = exprtape::record(
        |v: &[PrimalReal64]| PrimalReal64::record(v[0] * v[1]),
        &[2.0, 3.0],
    );
    tape.forward(&[1.0]);
}

#[test]
fn statement_record_replays_through_handle() {
    let (tape, _) = exprtape::record(
        |v: &[PrimalReal64]| PrimalReal64::record(pow(v[0], 3.0_f64) * v[1] + v[0]),
        &[2.0, 5.0],
    );
    assert_eq!(tape.num_statements(), 1);

    let record = tape.statement_record(0);
    assert_eq!(record.indices, vec![0, 1, 0]);
    assert_eq!(record.passives, vec![3.0]);
    assert_eq!(record.leaves, vec![0, 1]);

    let handle = tape.statement_handle(0);
    assert_eq!(handle.active_count(), 3);
    assert_eq!(handle.passive_count(), 1);
    assert_eq!(handle.value(&record), Ok(42.0));

    let adjoints = handle.adjoint(&record, 1.0).unwrap();
    // d/dx0 = 3 x0² x1 + 1, d/dx1 = x0³
    assert_relative_eq!(adjoints[0], 61.0, max_relative = 1e-14);
    assert_relative_eq!(adjoints[1], 8.0, max_relative = 1e-14);

    let mut short = record.clone();
    short.passives.clear();
    assert_eq!(
        handle.value(&short),
        Err(ReplayError::PassiveCountMismatch {
            expected: 1,
            found: 0
        })
    );
}

// ── Exchange ──

#[test]
fn exchange_to_f32_slots() {
    let x = Slot::new(0.25_f64, 0);
    let y = Slot::new(4.0_f64, 1);
    let expr = x.atan2(y) * 3.0_f64 + y.sqrt();

    let narrow = expr.exchange_active_type(&mut SlotExchange::<f32>::new());
    assert_relative_eq!(narrow.value(), expr.value() as f32, max_relative = 1e-6);

    let record = ReplayRecord::capture(&narrow);
    fn adjoint_of<E: Expression<f32>>(_: &E, record: &ReplayRecord<f32>) -> Vec<f32> {
        record.adjoint::<E>(1.0).unwrap()
    }
    let adjoints = adjoint_of(&narrow, &record);
    let (_, wide) = replay(&expr, 2);
    assert_relative_eq!(adjoints[0], wide[0] as f32, max_relative = 1e-5);
    assert_relative_eq!(adjoints[1], wide[1] as f32, max_relative = 1e-5);
}

#[test]
fn rehost_jacobian_expression_on_primal_tape() {
    let mut jt = JacobianTape::<f64>::new();
    let mut pt = PrimalTape::<f64>::new();
    let j = [
        JacobianReal64::from_tape(1.2, jt.new_input(1.2)),
        JacobianReal64::from_tape(0.4, jt.new_input(0.4)),
    ];
    let p = [
        PrimalReal64::from_tape(1.2, pt.new_input(1.2)),
        PrimalReal64::from_tape(0.4, pt.new_input(0.4)),
    ];

    let expr = j[0].ln() * j[1] - 2.0_f64 / j[0];
    let mut exchange = TapeExchange::new();
    exchange.bind(j[0].index(), p[0]).bind(j[1].index(), p[1]);
    assert_eq!(exchange.len(), 2);

    let rehosted = expr.exchange_active_type(&mut exchange);
    let y = {
        let _guard = TapeGuard::new(&mut pt);
        Active::<PrimalTape<f64>>::record(rehosted)
    };
    pt.set_output(y.index());
    assert_eq!(y.value(), expr.value());

    let g = pt.gradient(&[1.2, 0.4]);
    assert_relative_eq!(g[0], 0.4 / 1.2 + 2.0 / (1.2 * 1.2), max_relative = 1e-14);
    assert_relative_eq!(g[1], 1.2_f64.ln(), max_relative = 1e-14);
}

#[test]
fn rehost_onto_f32_jacobian_tape() {
    let mut wide = JacobianTape::<f64>::new();
    let mut narrow = JacobianTape::<f32>::new();
    let x = JacobianReal64::from_tape(2.0, wide.new_input(2.0));
    let xn = narrow.new_input(2.0);

    let expr = x * x.sqrt();
    let mut exchange = TapeExchange::new();
    exchange.bind(x.index(), JacobianReal32::from_tape(2.0, xn));
    let y = {
        let _guard = TapeGuard::new(&mut narrow);
        JacobianReal32::record(expr.exchange_active_type(&mut exchange))
    };
    let adjoints = narrow.reverse(y.index());
    // d(x^1.5)/dx = 1.5 sqrt(x)
    assert_relative_eq!(adjoints[xn as usize], 1.5 * 2.0_f32.sqrt(), max_relative = 1e-6);
}
