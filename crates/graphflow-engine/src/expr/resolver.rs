//! Resolves parsed references against a session's output window.
//!
//! No operator precedence to walk, just path descent into a step's rolling
//! output window.

use std::collections::BTreeMap;

use graphflow_model::Value;

use super::parser::{PathSegment, Reference, TemplatePart, parse_template};

pub type Outputs = BTreeMap<String, Vec<Value>>;

/// Signals that a required reference has no value yet. Not an error: the
/// caller treats this as "this step's inputs aren't ready".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unresolved;

/// Resolve every reference reachable from `value`, recursing into maps and
/// lists. All-or-nothing: the first unresolved required reference anywhere
/// in the structure fails the whole resolution.
pub fn resolve_value(value: &Value, outputs: &Outputs) -> Result<Value, Unresolved> {
    match value {
        Value::String(s) => resolve_string(s, outputs),
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(resolve_value(item, outputs)?);
            }
            Ok(Value::List(out))
        }
        Value::Map(map) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                out.insert(k.clone(), resolve_value(v, outputs)?);
            }
            Ok(Value::Map(out))
        }
        other => Ok(other.clone()),
    }
}

fn resolve_string(s: &str, outputs: &Outputs) -> Result<Value, Unresolved> {
    let parts = parse_template(s);

    if parts.iter().all(|p| matches!(p, TemplatePart::Literal(_))) {
        return Ok(Value::String(s.to_string()));
    }

    // A string that's nothing but a single reference resolves to the
    // referenced value's native type rather than a stringified copy.
    if let [TemplatePart::Ref(reference)] = parts.as_slice() {
        return resolve_reference(reference, outputs);
    }

    let mut out = String::new();
    for part in &parts {
        match part {
            TemplatePart::Literal(text) => out.push_str(text),
            TemplatePart::Ref(reference) => {
                let resolved = resolve_reference(reference, outputs)?;
                out.push_str(&stringify(&resolved));
            }
        }
    }
    Ok(Value::String(out))
}

fn resolve_reference(reference: &Reference, outputs: &Outputs) -> Result<Value, Unresolved> {
    match resolve_path(outputs, &reference.segments) {
        Some(value) => Ok(value),
        None => match &reference.default {
            Some(default_text) => Ok(Value::String(default_text.clone())),
            None => Err(Unresolved),
        },
    }
}

fn resolve_path(outputs: &Outputs, segments: &[PathSegment]) -> Option<Value> {
    let (first, rest) = segments.split_first()?;
    let series = outputs.get(&first.name)?;
    let mut current = index_series(series, first.index.unwrap_or(-1))?.clone();
    for segment in rest {
        current = current.get(&segment.name)?.clone();
        if let Some(idx) = segment.index {
            current = current.index(idx)?.clone();
        }
    }
    Some(current)
}

fn index_series(series: &[Value], idx: i64) -> Option<&Value> {
    let len = series.len() as i64;
    let real = if idx < 0 { len + idx } else { idx };
    if real < 0 || real >= len {
        return None;
    }
    series.get(real as usize)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        composite => serde_json::to_string(&composite.to_json()).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outputs_with(step: &str, values: Vec<Value>) -> Outputs {
        let mut outputs = Outputs::new();
        outputs.insert(step.to_string(), values);
        outputs
    }

    #[test]
    fn bare_reference_preserves_native_type() {
        let outputs = outputs_with("fetch", vec![Value::Map(BTreeMap::from([(
            "count".to_string(),
            Value::from(3i64),
        )]))]);
        let template = Value::from("@{SESSION_ID}.fetch.count");
        assert_eq!(resolve_value(&template, &outputs), Ok(Value::from(3i64)));
    }

    #[test]
    fn unresolved_reference_without_default_fails() {
        let outputs = Outputs::new();
        let template = Value::from("@{SESSION_ID}.missing.field");
        assert_eq!(resolve_value(&template, &outputs), Err(Unresolved));
    }

    #[test]
    fn default_is_used_when_absent() {
        let outputs = Outputs::new();
        let template = Value::from("@{SESSION_ID}.missing.field|fallback");
        assert_eq!(
            resolve_value(&template, &outputs),
            Ok(Value::String("fallback".to_string()))
        );
    }

    #[test]
    fn mixed_text_stringifies_composite_values() {
        let outputs = outputs_with("fetch", vec![Value::List(vec![Value::from(1i64), Value::from(2i64)])]);
        let template = Value::from("items: @{SESSION_ID}.fetch");
        assert_eq!(
            resolve_value(&template, &outputs),
            Ok(Value::String("items: [1,2]".to_string()))
        );
    }

    #[test]
    fn unindexed_access_selects_last_entry() {
        let outputs = outputs_with("fetch", vec![Value::from(1i64), Value::from(2i64), Value::from(3i64)]);
        let template = Value::from("@{SESSION_ID}.fetch");
        assert_eq!(resolve_value(&template, &outputs), Ok(Value::from(3i64)));
    }

    #[test]
    fn recurses_into_maps_and_lists() {
        let outputs = outputs_with("fetch", vec![Value::from("bob")]);
        let mut template_map = BTreeMap::new();
        template_map.insert("name".to_string(), Value::from("@{SESSION_ID}.fetch"));
        template_map.insert("items".to_string(), Value::List(vec![Value::from("@{SESSION_ID}.fetch")]));
        let template = Value::Map(template_map);

        let resolved = resolve_value(&template, &outputs).unwrap();
        let map = resolved.as_map().unwrap();
        assert_eq!(map.get("name"), Some(&Value::from("bob")));
        assert_eq!(map.get("items"), Some(&Value::List(vec![Value::from("bob")])));
    }
}
