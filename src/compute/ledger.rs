//! ledger.rs
//! Evaluation results: a number-or-missing `Value` per sample point, kept in sample order.

use crate::store::NodeId;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

pub use self::error::ComputationError;
mod error {
    use super::*;
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum ComputationError {
        #[error("No formula to calculate")]
        NoFormula,
        #[error("No root with id {0}")]
        RootNotFound(NodeId),
    }
}

/// The outcome of evaluating a node at one sample point.
///
/// `Missing` is data, not a failure: it flows through the combining rules and is
/// excluded from an operator's operand list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Number(f64),
    Missing,
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Missing => None,
        }
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Value::Missing, Value::Number)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Missing => serializer.serialize_none(),
        }
    }
}

/// Sample point -> value, in the order the sample points were supplied.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<(String, Value)>,
    // Position of each point in `entries`.
    index: HashMap<String, usize>,
}

impl Ledger {
    pub fn new() -> Self { Self::default() }

    pub fn with_capacity(size: usize) -> Self {
        Self { entries: Vec::with_capacity(size), index: HashMap::with_capacity(size) }
    }

    /// Records `value` for `point`, replacing an earlier entry for the same point in place.
    pub fn insert(&mut self, point: impl Into<String>, value: Value) {
        let point = point.into();
        match self.index.get(&point) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.index.insert(point.clone(), self.entries.len());
                self.entries.push((point, value));
            }
        }
    }

    pub fn get(&self, point: &str) -> Option<Value> {
        self.index.get(point).map(|&pos| self.entries[pos].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Value)> + '_ {
        self.entries.iter().map(|(p, v)| (p.as_str(), *v))
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// The index is derived from `entries`.
impl PartialEq for Ledger {
    fn eq(&self, other: &Self) -> bool { self.entries == other.entries }
}

impl Serialize for Ledger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (point, value) in &self.entries {
            map.serialize_entry(point, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_keeps_sample_order() {
        let mut ledger = Ledger::new();
        ledger.insert("01/10/23", Value::Number(2.0));
        ledger.insert("01/01/23", Value::Missing);
        ledger.insert("01/10/23", Value::Number(3.0));

        let points: Vec<&str> = ledger.iter().map(|(p, _)| p).collect();
        assert_eq!(points, vec!["01/10/23", "01/01/23"]);
        assert_eq!(ledger.get("01/10/23"), Some(Value::Number(3.0)));
        assert_eq!(ledger.get("nope"), None);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_ledger_lookup_over_many_points() {
        let mut ledger = Ledger::with_capacity(1000);
        for i in 0..1000 {
            ledger.insert(format!("p{}", i), Value::Number(i as f64));
        }
        ledger.insert("p500", Value::Missing);

        assert_eq!(ledger.len(), 1000);
        assert_eq!(ledger.get("p999"), Some(Value::Number(999.0)));
        assert_eq!(ledger.get("p500"), Some(Value::Missing));
        assert_eq!(ledger.iter().nth(500), Some(("p500", Value::Missing)));
    }

    #[test]
    fn test_ledger_json_maps_missing_to_null() {
        let mut ledger = Ledger::new();
        ledger.insert("b", Value::Number(1.5));
        ledger.insert("a", Value::Missing);
        assert_eq!(ledger.to_json().unwrap(), r#"{"b":1.5,"a":null}"#);
    }
}
