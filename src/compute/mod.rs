//! Evaluates formula trees at sample points.
pub mod engine;
pub mod kernel;
pub mod ledger;

pub use engine::{evaluate, evaluate_all};
pub use ledger::{ComputationError, Ledger, Value};
