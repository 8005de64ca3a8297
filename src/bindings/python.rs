use crate::compute::ComputationError;
use crate::display::trace;
use crate::edit::{EditError, EditStatus};
use crate::store::{ConfigError, FormulaStore, FormulaTree, NodeId, Registry};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::sync::Arc;

fn edit_err(e: EditError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn config_err(e: ConfigError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// A simple function to confirm the Rust core is callable from Python.
#[pyfunction]
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[pyclass(name = "_FormulaStore")]
#[derive(Debug, Clone)]
pub struct PyFormulaStore {
    inner: FormulaStore,
}

#[pymethods]
impl PyFormulaStore {
    #[new]
    pub fn new(registry_json: &str) -> PyResult<Self> {
        let registry = Registry::from_json(registry_json).map_err(config_err)?;
        Ok(Self { inner: FormulaStore::new(Arc::new(registry)) })
    }

    #[staticmethod]
    pub fn from_file(path: String) -> PyResult<Self> {
        let registry = Registry::load(path).map_err(config_err)?;
        Ok(Self { inner: FormulaStore::new(Arc::new(registry)) })
    }

    /// Resumes a store from a snapshot produced by `snapshot_json`.
    #[staticmethod]
    pub fn restore(registry_json: &str, snapshot_json: &str) -> PyResult<Self> {
        let registry = Registry::from_json(registry_json).map_err(config_err)?;
        let tree: FormulaTree = serde_json::from_str(snapshot_json).map_err(|e| PyValueError::new_err(e.to_string()))?;
        let inner = FormulaStore::with_tree(Arc::new(registry), tree).map_err(|errs| {
            let reasons: Vec<String> = errs.iter().map(ToString::to_string).collect();
            PyValueError::new_err(reasons.join("; "))
        })?;
        Ok(Self { inner })
    }

    pub fn sample_points(&self) -> Vec<String> {
        self.inner.registry().sample_points().to_vec()
    }

    pub fn add_constant(&mut self, label: &str, value: f64) -> PyResult<String> {
        let constant = self.inner.registry_mut().add_constant(label, value).map_err(config_err)?;
        Ok(constant.id.clone())
    }

    pub fn add_root(&mut self, symbol: &str) -> PyResult<u64> {
        self.inner.add_root(symbol).map(|id| id.raw()).map_err(edit_err)
    }

    pub fn drop_root(&mut self, payload: &str) -> PyResult<u64> {
        self.inner.drop_root(payload).map(|id| id.raw()).map_err(edit_err)
    }

    /// Returns `False` when no node carries `node_id`.
    pub fn drop_into_slot(&mut self, node_id: u64, slot: usize, payload: &str) -> PyResult<bool> {
        let status = self.inner.drop_into_slot(NodeId::new(node_id), slot, payload).map_err(edit_err)?;
        Ok(status == EditStatus::Applied)
    }

    pub fn clear_slot(&mut self, node_id: u64, slot: usize) -> PyResult<bool> {
        let status = self.inner.clear_slot(NodeId::new(node_id), slot).map_err(edit_err)?;
        Ok(status == EditStatus::Applied)
    }

    pub fn remove_root(&mut self, node_id: u64) -> bool {
        self.inner.remove_root(NodeId::new(node_id)) == EditStatus::Applied
    }

    /// `None` when there is no formula; otherwise `(sample_point, value)` pairs in order.
    pub fn evaluate_all(&self) -> PyResult<Option<Vec<(String, Option<f64>)>>> {
        match self.inner.evaluate_all() {
            Ok(ledger) => Ok(Some(ledger.iter().map(|(p, v)| (p.to_string(), v.as_number())).collect())),
            Err(ComputationError::NoFormula) => Ok(None),
            Err(e) => Err(PyRuntimeError::new_err(e.to_string())),
        }
    }

    pub fn snapshot_json(&self) -> PyResult<String> {
        serde_json::to_string(self.inner.tree()).map_err(|e| PyRuntimeError::new_err(e.to_string()))
    }

    #[pyo3(signature = (sample_point=None))]
    pub fn trace(&self, sample_point: Option<&str>) -> String {
        trace::format_tree(self.inner.tree(), sample_point)
    }

    pub fn results_text(&self) -> String {
        trace::format_results(&self.inner.evaluate_all())
    }

    pub fn root_count(&self) -> usize { self.inner.tree().len() }
}
