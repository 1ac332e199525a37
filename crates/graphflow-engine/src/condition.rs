//! Edge condition evaluation.
//!
//! Walks an edge's clause list against a session's resolved outputs and
//! combines the per-clause results with the edge's boolean operator to
//! decide whether the edge fires.

use std::collections::BTreeMap;

use graphflow_model::{Edge, Operator, Value};
use thiserror::Error;

use crate::expr::{Outputs, resolve_value};

#[derive(Error, Debug)]
pub enum ConditionError {
    #[error("malformed condition clause: {0}")]
    Malformed(String),
}

/// Evaluate whether `edge` fires given the session's current outputs.
///
/// Required references inside a condition that are still unresolved count
/// as falsy rather than failing the whole evaluation — a condition is
/// allowed to probe for a value that hasn't arrived yet.
pub fn evaluate(edge: &Edge, outputs: &Outputs) -> Result<bool, ConditionError> {
    let Some(condition) = &edge.condition else {
        return Ok(true);
    };
    let clauses = match condition {
        Value::List(items) if items.is_empty() => return Ok(true),
        Value::List(items) => items.clone(),
        other => vec![other.clone()],
    };

    let results = clauses
        .iter()
        .map(|clause| evaluate_clause(clause, outputs))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(combine(&results, edge.operator))
}

fn combine(results: &[bool], operator: Operator) -> bool {
    match operator {
        Operator::And => results.iter().all(|b| *b),
        Operator::Or => results.iter().any(|b| *b),
    }
}

fn evaluate_clause(clause: &Value, outputs: &Outputs) -> Result<bool, ConditionError> {
    match clause {
        // Bare reference string, or a raw comparison sentinel.
        Value::String(s) => Ok(evaluate_ref_or_sentinel(s, outputs)),
        Value::Map(fields) => evaluate_mapping_clause(fields, outputs),
        other => Err(ConditionError::Malformed(format!(
            "clause must be a string or object, got {other:?}"
        ))),
    }
}

fn evaluate_mapping_clause(
    fields: &BTreeMap<String, Value>,
    outputs: &Outputs,
) -> Result<bool, ConditionError> {
    let operator = match fields.get("operator") {
        Some(Value::String(s)) if s.eq_ignore_ascii_case("OR") => Operator::Or,
        _ => Operator::And,
    };

    let mut results = Vec::new();
    if let Some(true_refs) = fields.get("true") {
        for r in as_ref_list(true_refs) {
            results.push(evaluate_ref_or_sentinel(&r, outputs));
        }
    }
    if let Some(false_refs) = fields.get("false") {
        for r in as_ref_list(false_refs) {
            results.push(!evaluate_ref_or_sentinel(&r, outputs));
        }
    }

    if results.is_empty() {
        return Err(ConditionError::Malformed(
            "clause object has no \"true\" or \"false\" key".to_string(),
        ));
    }
    Ok(combine(&results, operator))
}

fn as_ref_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::List(items) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        _ => Vec::new(),
    }
}

/// A reference resolves to its value's truthiness; an unresolved reference
/// is falsy; `"1==1"`/`"1==0"` are manual-override sentinels.
fn evaluate_ref_or_sentinel(text: &str, outputs: &Outputs) -> bool {
    match text {
        "1==1" => return true,
        "1==0" => return false,
        _ => {}
    }
    resolve_value(&Value::String(text.to_string()), outputs)
        .map(|v| v.truthy())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphflow_model::Edge;

    fn outputs_with(step: &str, value: Value) -> Outputs {
        let mut outputs = Outputs::new();
        outputs.insert(step.to_string(), vec![value]);
        outputs
    }

    #[test]
    fn unconditional_edge_always_fires() {
        let edge = Edge::new("a", "b");
        assert!(evaluate(&edge, &Outputs::new()).unwrap());
    }

    #[test]
    fn bare_reference_clause_checks_truthiness() {
        let mut edge = Edge::new("a", "b");
        edge.condition = Some(Value::List(vec![Value::String(
            "@{SESSION_ID}.check.ok".to_string(),
        )]));
        let outputs = outputs_with(
            "check",
            Value::Map(BTreeMap::from([("ok".to_string(), Value::Bool(true))])),
        );
        assert!(evaluate(&edge, &outputs).unwrap());
    }

    #[test]
    fn false_key_negates_truthiness() {
        let mut edge = Edge::new("a", "b");
        edge.condition = Some(Value::List(vec![Value::Map(BTreeMap::from([(
            "false".to_string(),
            Value::String("@{SESSION_ID}.check.ok".to_string()),
        )]))]));
        let outputs = outputs_with(
            "check",
            Value::Map(BTreeMap::from([("ok".to_string(), Value::Bool(false))])),
        );
        assert!(evaluate(&edge, &outputs).unwrap());
    }

    #[test]
    fn unresolved_reference_is_falsy_not_an_error() {
        let mut edge = Edge::new("a", "b");
        edge.condition = Some(Value::List(vec![Value::String(
            "@{SESSION_ID}.missing.field".to_string(),
        )]));
        assert!(!evaluate(&edge, &Outputs::new()).unwrap());
    }

    #[test]
    fn sentinel_overrides_are_honored() {
        let mut edge = Edge::new("a", "b");
        edge.condition = Some(Value::List(vec![Value::String("1==0".to_string())]));
        assert!(!evaluate(&edge, &Outputs::new()).unwrap());
    }

    #[test]
    fn or_operator_requires_only_one_clause() {
        let mut edge = Edge::new("a", "b");
        edge.operator = Operator::Or;
        edge.condition = Some(Value::List(vec![
            Value::String("1==0".to_string()),
            Value::String("1==1".to_string()),
        ]));
        assert!(evaluate(&edge, &Outputs::new()).unwrap());
    }
}
