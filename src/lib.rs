// Library facade. The formula tree model, its mutation engine and the evaluator
// are plain Rust; the `python` feature adds the `_core` extension module on top.

pub mod analysis;
pub mod compute;
pub mod display;
pub mod edit;
pub mod store;

#[cfg(feature = "python")]
pub mod bindings;

pub use compute::{ComputationError, Ledger, Value};
pub use edit::{EditError, EditStatus};
pub use store::{FormulaStore, FormulaTree, NodeId, Operation, OperatorNode, Registry};

#[cfg(feature = "python")]
use pyo3::prelude::*;

// --- Module Definition ---
/// This function defines the `calc_builder._core` Python module.
#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<bindings::python::PyFormulaStore>()?;
    m.add_function(wrap_pyfunction!(bindings::python::core_version, m)?)?;
    Ok(())
}
