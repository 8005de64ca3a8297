//! Inbound descriptors handed over by the host when the user drops an item.
//!
//! The wire shape is a flat JSON object. A `symbol` field marks an operator; anything
//! else must carry `type: "timeseries" | "constant"`. Unrecognised fields (icons, labels
//! for display) are ignored.

use super::error::EditError;
use crate::store::{Constant, IdGenerator, Input, LeafValue, OperatorNode, Registry};
use log::warn;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
struct RawPayload {
    #[serde(rename = "type")]
    kind: Option<String>,
    symbol: Option<String>,
    id: Option<String>,
    name: Option<String>,
    value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Operator { symbol: String },
    TimeSeries { id: String },
    Constant { id: String, name: Option<String>, value: Option<f64> },
}

impl Payload {
    pub fn decode(json: &str) -> Result<Self, EditError> {
        let raw: RawPayload = serde_json::from_str(json).map_err(|e| {
            warn!("rejected payload: {}", e);
            EditError::InvalidPayload(e.to_string())
        })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawPayload) -> Result<Self, EditError> {
        if let Some(symbol) = raw.symbol {
            return Ok(Payload::Operator { symbol });
        }
        let missing_id = || EditError::InvalidPayload("leaf payload without 'id'".into());
        match raw.kind.as_deref() {
            Some("timeseries") => Ok(Payload::TimeSeries { id: raw.id.ok_or_else(missing_id)? }),
            Some("constant") => Ok(Payload::Constant {
                id: raw.id.ok_or_else(missing_id)?,
                name: raw.name,
                value: raw.value,
            }),
            Some(other) => Err(EditError::InvalidPayload(format!("unknown leaf type '{}'", other))),
            None => Err(EditError::InvalidPayload("payload has neither 'symbol' nor 'type'".into())),
        }
    }

    /// Turns the descriptor into a slot occupant.
    ///
    /// Operators always become a fresh node with empty slots. Series are looked up in
    /// the registry. Constants are copied: the value carried by the payload wins, the
    /// registry's current value is the fallback.
    pub fn resolve(&self, registry: &Registry, ids: &IdGenerator) -> Result<Input, EditError> {
        match self {
            Payload::Operator { symbol } => {
                let op = registry.operator(symbol)?;
                Ok(Input::Operator(Arc::new(OperatorNode::new(ids.next_id(), op))))
            }
            Payload::TimeSeries { id } => registry
                .time_series(id)
                .cloned()
                .map(|s| Input::Leaf(LeafValue::TimeSeries(s)))
                .ok_or_else(|| EditError::InvalidPayload(format!("unknown time series '{}'", id))),
            Payload::Constant { id, name, value } => {
                let known = registry.constant(id);
                let value = value
                    .or(known.map(|c| c.value))
                    .ok_or_else(|| EditError::InvalidPayload(format!("constant '{}' has no value", id)))?;
                let name = name
                    .clone()
                    .or_else(|| known.map(|c| c.name.clone()))
                    .unwrap_or_else(|| id.clone());
                Ok(Input::Leaf(LeafValue::Constant(Constant { id: id.clone(), name, value })))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Operation, TimeSeries};
    use rstest::rstest;

    fn registry() -> Registry {
        let mut reg = Registry::new(vec!["01/01/23".into()]).unwrap();
        reg.add_time_series(TimeSeries::new("series_a", "A", [("01/01/23", 23.0)])).unwrap();
        reg.add_constant("K", 2.0).unwrap();
        reg
    }

    #[test]
    fn test_decode_discriminants() {
        assert_eq!(
            Payload::decode(r#"{"id": "multiply", "symbol": "×", "maxInputs": 2, "Icon": "Plus"}"#).unwrap(),
            Payload::Operator { symbol: "×".into() }
        );
        assert_eq!(
            Payload::decode(r#"{"id": "series_a", "name": "A", "type": "timeseries", "Icon": "Box"}"#).unwrap(),
            Payload::TimeSeries { id: "series_a".into() }
        );
        assert_eq!(
            Payload::decode(r#"{"id": "constant_0", "name": "K", "type": "constant", "value": 2}"#).unwrap(),
            Payload::Constant { id: "constant_0".into(), name: Some("K".into()), value: Some(2.0) }
        );
    }

    #[rstest]
    #[case("not json")]
    #[case(r#"{"name": "A"}"#)]
    #[case(r#"{"type": "timeseries"}"#)]
    #[case(r#"{"type": "volume", "id": "actual_volume"}"#)]
    #[case(r#"{"symbol": 42}"#)]
    fn test_malformed_payloads_are_rejected(#[case] json: &str) {
        assert!(matches!(Payload::decode(json), Err(EditError::InvalidPayload(_))), "Should fail: '{}'", json);
    }

    #[test]
    fn test_resolve_operator_creates_fresh_empty_node() {
        let reg = registry();
        let ids = IdGenerator::new();
        let payload = Payload::decode(r#"{"symbol": "Σ", "id": "sum"}"#).unwrap();

        let first = payload.resolve(&reg, &ids).unwrap();
        let second = payload.resolve(&reg, &ids).unwrap();
        match (first, second) {
            (Input::Operator(a), Input::Operator(b)) => {
                assert_eq!(a.op(), Operation::Sum);
                assert_eq!(a.inputs().len(), 4);
                assert_ne!(a.id(), b.id());
            }
            other => panic!("expected operators, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_unknown_leaves() {
        let reg = registry();
        let ids = IdGenerator::new();
        let series = Payload::TimeSeries { id: "series_z".into() };
        assert!(matches!(series.resolve(&reg, &ids), Err(EditError::InvalidPayload(_))));

        let constant = Payload::Constant { id: "nope".into(), name: None, value: None };
        assert!(matches!(constant.resolve(&reg, &ids), Err(EditError::InvalidPayload(_))));

        let op = Payload::Operator { symbol: "^".into() };
        assert_eq!(op.resolve(&reg, &ids), Err(EditError::UnknownOperator("^".into())));
    }

    #[test]
    fn test_resolve_constant_falls_back_to_registry_value() {
        let reg = registry();
        let ids = IdGenerator::new();
        let id = reg.constants()[0].id.clone();
        let payload = Payload::Constant { id: id.clone(), name: None, value: None };

        match payload.resolve(&reg, &ids).unwrap() {
            Input::Leaf(LeafValue::Constant(c)) => {
                assert_eq!(c.value, 2.0);
                assert_eq!(c.name, "K");
            }
            other => panic!("expected constant, got {:?}", other),
        }
    }
}
