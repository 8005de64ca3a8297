//! The leaf registry: the catalog of series, constants and operators the formula is
//! assembled from, plus the ordered sample points evaluation runs over.

use super::types::{Constant, LeafValue, Operation, TimeSeries};
use crate::edit::EditError;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub use self::error::ConfigError;
mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum ConfigError {
        #[error("Failed to read registry config: {0}")]
        Io(#[from] std::io::Error),
        #[error("Failed to parse registry config: {0}")]
        Parse(#[from] serde_json::Error),
        #[error("Invalid registry: {0}")]
        Invalid(String),
    }
}

/// On-disk shape of a registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub sample_points: Vec<String>,
    #[serde(default)]
    pub time_series: Vec<SeriesConfig>,
    #[serde(default)]
    pub constants: Vec<Constant>,
    /// Operator symbols or catalog ids. All operators when absent.
    #[serde(default)]
    pub operators: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesConfig {
    pub id: String,
    pub name: String,
    pub values: HashMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct Registry {
    sample_points: Vec<String>,
    time_series: Vec<TimeSeries>,
    constants: Vec<Constant>,
    operators: Vec<Operation>,

    // Leaf ids already handed out, across both series and constants.
    used_ids: HashSet<String>,
    next_constant: u32,
}

impl Registry {
    /// An empty catalog offering every operator.
    pub fn new(sample_points: Vec<String>) -> Result<Self, ConfigError> {
        if sample_points.is_empty() {
            return Err(ConfigError::Invalid("at least one sample point is required".into()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = sample_points.iter().find(|p| !seen.insert(p.as_str())) {
            return Err(ConfigError::Invalid(format!("duplicate sample point '{}'", dup)));
        }
        Ok(Self {
            sample_points,
            time_series: Vec::new(),
            constants: Vec::new(),
            operators: Operation::ALL.to_vec(),
            used_ids: HashSet::new(),
            next_constant: 0,
        })
    }

    pub fn from_config(config: RegistryConfig) -> Result<Self, ConfigError> {
        let mut registry = Self::new(config.sample_points)?;

        if let Some(symbols) = config.operators {
            registry.operators = symbols
                .iter()
                .map(|s| s.parse::<Operation>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        for series in config.time_series {
            registry.add_time_series(TimeSeries::new(series.id, series.name, series.values))?;
        }
        for constant in config.constants {
            registry.insert_constant(constant)?;
        }
        Ok(registry)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RegistryConfig = serde_json::from_str(json)?;
        Self::from_config(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let registry = Self::from_json(&std::fs::read_to_string(path)?)?;
        info!(
            "loaded registry from {}: {} sample points, {} series, {} constants",
            path.display(),
            registry.sample_points.len(),
            registry.time_series.len(),
            registry.constants.len()
        );
        Ok(registry)
    }

    // --- Catalog edits ---

    pub fn add_time_series(&mut self, series: TimeSeries) -> Result<(), ConfigError> {
        self.claim_id(&series.id)?;
        self.time_series.push(series);
        Ok(())
    }

    /// Adds a user-defined constant under a generated `const_{n}` id.
    pub fn add_constant(&mut self, label: &str, value: f64) -> Result<&Constant, ConfigError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(ConfigError::Invalid("constant label must not be empty".into()));
        }
        if !value.is_finite() {
            return Err(ConfigError::Invalid(format!("constant '{}' must be finite", label)));
        }
        let mut id = format!("const_{}", self.next_constant);
        while self.used_ids.contains(&id) {
            self.next_constant += 1;
            id = format!("const_{}", self.next_constant);
        }
        self.next_constant += 1;
        self.insert_constant(Constant { id, name: label.to_string(), value })?;
        Ok(&self.constants[self.constants.len() - 1])
    }

    /// Changes the catalog value. Leaves already placed in a tree keep the value they were copied with.
    pub fn update_constant(&mut self, id: &str, value: f64) -> Result<(), ConfigError> {
        if !value.is_finite() {
            return Err(ConfigError::Invalid(format!("constant '{}' must be finite", id)));
        }
        let constant = self
            .constants
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown constant '{}'", id)))?;
        constant.value = value;
        Ok(())
    }

    fn insert_constant(&mut self, constant: Constant) -> Result<(), ConfigError> {
        if !constant.value.is_finite() {
            return Err(ConfigError::Invalid(format!("constant '{}' must be finite", constant.id)));
        }
        self.claim_id(&constant.id)?;
        self.constants.push(constant);
        Ok(())
    }

    fn claim_id(&mut self, id: &str) -> Result<(), ConfigError> {
        if !self.used_ids.insert(id.to_string()) {
            return Err(ConfigError::Invalid(format!("duplicate leaf id '{}'", id)));
        }
        Ok(())
    }

    // --- Lookups ---

    pub fn sample_points(&self) -> &[String] { &self.sample_points }
    pub fn all_time_series(&self) -> &[TimeSeries] { &self.time_series }
    pub fn constants(&self) -> &[Constant] { &self.constants }
    pub fn operators(&self) -> &[Operation] { &self.operators }

    pub fn time_series(&self, id: &str) -> Option<&TimeSeries> {
        self.time_series.iter().find(|s| s.id == id)
    }

    pub fn constant(&self, id: &str) -> Option<&Constant> {
        self.constants.iter().find(|c| c.id == id)
    }

    /// Resolves a symbol or catalog id against the operators this registry offers.
    pub fn operator(&self, symbol: &str) -> Result<Operation, EditError> {
        let op: Operation = symbol.parse()?;
        if self.operators.contains(&op) {
            Ok(op)
        } else {
            Err(EditError::UnknownOperator(symbol.to_string()))
        }
    }

    /// A leaf ready to be placed: series are shared, constants are copied as of now.
    pub fn leaf(&self, id: &str) -> Option<LeafValue> {
        self.time_series(id)
            .cloned()
            .map(LeafValue::TimeSeries)
            .or_else(|| self.constant(id).cloned().map(LeafValue::Constant))
    }
}
