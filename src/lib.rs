//! Reverse-mode automatic differentiation on expression templates.
//!
//! Arithmetic on [`Active`] values builds statically-typed expression trees
//! ([`UnaryExpr`], [`BinaryExpr`]). Assigning a tree to an `Active` records
//! it on the thread's active [`Tape`] as one statement: the
//! [`JacobianTape`] keeps the statement's Jacobian entries, the
//! [`PrimalTape`] keeps its serialized operands and replays it offline.
//!
//! ```
//! use exprtape::{ExprExt, JacobianReal64};
//!
//! let g = exprtape::grad(
//!     |x: &[JacobianReal64]| JacobianReal64::record(x[0].powf(x[1]) + x[0].atan2(2.0_f64)),
//!     &[1.5, 2.0],
//! );
//! assert!((g[1] - 1.5_f64.powf(2.0) * 1.5_f64.ln()).abs() < 1e-12);
//! ```

pub mod active;
pub mod api;
pub mod binary;
pub mod exchange;
pub mod expr;
pub mod float;
pub mod formula;
pub mod functions;
pub mod leaf;
pub mod primal_tape;
pub mod replay;
pub mod tape;
pub mod unary;
mod traits;

pub use active::Active;
pub use api::{grad, record, vjp};
pub use binary::BinaryExpr;
pub use exchange::TapeExchange;
pub use expr::{ActiveExchange, Expression, GradientSink, IntoExpr, ReplaySink};
pub use float::Float;
pub use functions::ExprExt;
pub use leaf::{Passive, Slot, SlotExchange, CONSTANT};
pub use primal_tape::{PrimalTape, StatementHandle};
pub use replay::{ReplayError, ReplayRecord};
pub use tape::{with_active_tape, JacobianTape, Tape, TapeGuard};
pub use unary::UnaryExpr;

/// Active value on a [`JacobianTape`] over `f64`.
pub type JacobianReal64 = Active<JacobianTape<f64>>;
/// Active value on a [`JacobianTape`] over `f32`.
pub type JacobianReal32 = Active<JacobianTape<f32>>;
/// Active value on a [`PrimalTape`] over `f64`.
pub type PrimalReal64 = Active<PrimalTape<f64>>;
/// Active value on a [`PrimalTape`] over `f32`.
pub type PrimalReal32 = Active<PrimalTape<f32>>;
