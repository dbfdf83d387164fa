//! Step 1: `type`, `enum` and `const`.

use super::{ItemSession, under_property_names};
use crate::pointer;
use crate::synth;
use schemafix_types::repair::ActionKind;
use schemafix_types::validation::{Keyword, ValidationError};
use serde_json::{Value, json};

pub(super) fn repair(session: &mut ItemSession<'_>, working: &mut Value, err: &ValidationError) -> bool {
    if under_property_names(&err.schema_path) {
        return false;
    }
    let Some(at) = session.locate(&err.schema_path, None) else {
        return false;
    };
    let Some(current) = pointer::get(working, &err.instance_path).cloned() else {
        return false;
    };
    let root = session.env.schema;

    let (kind, next, details) = match err.kind() {
        Keyword::Type => {
            let types = synth::declared_types(at.node);
            if types.iter().any(|t| type_matches(t, &current)) {
                return false;
            }
            let next = coerce(&current, &types).unwrap_or_else(|| {
                if at.node.get("enum").is_some() || at.node.get("const").is_some() {
                    synth::minimal_value(root, at.node)
                } else {
                    let first = types.first().map(String::as_str).unwrap_or("null");
                    synth::default_for_type(root, at.node, first)
                }
            });
            let details = json!({"from": type_name(&current), "to": type_name(&next)});
            (ActionKind::CoerceType, next, details)
        }
        Keyword::Enum => {
            let Some(allowed) = at.node.get("enum").and_then(Value::as_array) else {
                return false;
            };
            if allowed.iter().any(|v| synth::json_equal(v, &current)) {
                return false;
            }
            let Some(first) = allowed.first() else {
                return false;
            };
            (ActionKind::SnapEnum, first.clone(), json!({"value": first}))
        }
        Keyword::Const => {
            let Some(expected) = at.node.get("const") else {
                return false;
            };
            if synth::json_equal(expected, &current) {
                return false;
            }
            (ActionKind::SetConst, expected.clone(), json!({"value": expected}))
        }
        _ => return false,
    };

    if !pointer::replace(working, &err.instance_path, next) {
        return false;
    }
    session.record(kind, &at, &err.instance_path, details);
    true
}

fn type_matches(ty: &str, value: &Value) -> bool {
    match (ty, value) {
        ("null", Value::Null)
        | ("boolean", Value::Bool(_))
        | ("string", Value::String(_))
        | ("array", Value::Array(_))
        | ("object", Value::Object(_))
        | ("number", Value::Number(_)) => true,
        ("integer", Value::Number(n)) => n.as_f64().is_some_and(|f| f.fract() == 0.0),
        _ => false,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Lossless conversion into the first declared type that accepts the value.
fn coerce(value: &Value, types: &[String]) -> Option<Value> {
    types.iter().find_map(|ty| match (ty.as_str(), value) {
        ("integer", Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| synth::number_value(f, true)),
        ("integer", Value::Number(n)) => n
            .as_f64()
            .filter(|f| f.fract() == 0.0)
            .map(|f| synth::number_value(f, true)),
        ("number", Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| synth::number_value(f, false)),
        ("string", Value::Number(n)) => Some(Value::String(n.to_string())),
        ("string", Value::Bool(b)) => Some(Value::String(b.to_string())),
        ("boolean", Value::String(s)) => match s.as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        ("array", other) if !other.is_null() => Some(Value::Array(vec![other.clone()])),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::super::testkit::Fixture;
    use super::*;

    fn run(schema: Value, mut item: Value) -> (Value, Vec<ActionKind>) {
        let fx = Fixture::new(schema);
        let env = fx.env();
        let mut session = ItemSession::new(&env, 0);
        for err in fx.errors(&item) {
            repair(&mut session, &mut item, &err);
        }
        (item, session.actions.iter().map(|a| a.action).collect())
    }

    #[test]
    fn numeric_strings_coerce_losslessly() {
        let (item, actions) = run(
            json!({"properties": {"n": {"type": "integer"}}}),
            json!({"n": "42"}),
        );
        assert_eq!(item, json!({"n": 42}));
        assert_eq!(actions, vec![ActionKind::CoerceType]);
    }

    #[test]
    fn unconvertible_values_fall_back_to_type_default() {
        let (item, _) = run(
            json!({"properties": {"s": {"type": "string", "minLength": 2}}}),
            json!({"s": null}),
        );
        assert_eq!(item, json!({"s": "aa"}));
    }

    #[test]
    fn enum_snaps_to_first_value() {
        let (item, actions) = run(
            json!({"properties": {"c": {"enum": ["red", "green"]}}}),
            json!({"c": "blue"}),
        );
        assert_eq!(item, json!({"c": "red"}));
        assert_eq!(actions, vec![ActionKind::SnapEnum]);
    }

    #[test]
    fn const_is_set() {
        let (item, actions) = run(json!({"const": {"v": 1}}), json!({"v": 2}));
        assert_eq!(item, json!({"v": 1}));
        assert_eq!(actions, vec![ActionKind::SetConst]);
    }

    #[test]
    fn coerce_prefers_declared_order() {
        let types = vec!["boolean".to_string(), "number".to_string()];
        assert_eq!(coerce(&json!("true"), &types), Some(json!(true)));
        assert_eq!(coerce(&json!("1.5"), &types), Some(json!(1.5)));
        assert_eq!(coerce(&json!("x"), &types), None);
    }
}
