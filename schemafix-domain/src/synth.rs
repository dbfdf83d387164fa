//! Pure helpers that produce minimal values for sub-schemas and compare values structurally.

use crate::pattern;
use crate::pointer;
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

const MAX_DEPTH: usize = 8;
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Types listed by `type`, in declaration order.
pub fn declared_types(node: &Value) -> Vec<String> {
    match node.get("type") {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(list)) => list
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// True when the schema only admits integers.
pub fn requires_integer(node: &Value) -> bool {
    let types = declared_types(node);
    types.iter().any(|t| t == "integer") && !types.iter().any(|t| t == "number")
}

/// `default` when declared, otherwise [`minimal_value`].
pub fn default_or_minimal(root: &Value, node: &Value) -> Value {
    let node = pointer::deref(root, node);
    match node.get("default") {
        Some(d) => d.clone(),
        None => minimal_value(root, node),
    }
}

/// `enum[0]`, then `const`, then the default for the declared (or inferred) type.
pub fn minimal_value(root: &Value, node: &Value) -> Value {
    minimal_at_depth(root, node, 0)
}

fn minimal_at_depth(root: &Value, node: &Value, depth: usize) -> Value {
    let node = pointer::deref(root, node);
    if let Some(first) = node.get("enum").and_then(Value::as_array).and_then(|e| e.first()) {
        return first.clone();
    }
    if let Some(c) = node.get("const") {
        return c.clone();
    }
    let ty = declared_types(node)
        .into_iter()
        .next()
        .or_else(|| infer_type(node).map(str::to_string));
    match ty {
        Some(ty) => default_for_type_at(root, node, &ty, depth),
        None => Value::Null,
    }
}

/// Minimal representative of `ty` that also honours the node's simple bounds.
pub fn default_for_type(root: &Value, node: &Value, ty: &str) -> Value {
    default_for_type_at(root, node, ty, 0)
}

fn default_for_type_at(root: &Value, node: &Value, ty: &str, depth: usize) -> Value {
    match ty {
        "null" => Value::Null,
        "boolean" => Value::Bool(false),
        "integer" => minimal_number(node, true),
        "number" => minimal_number(node, requires_integer(node)),
        "string" => minimal_string(node),
        "array" => minimal_array(root, node, depth),
        "object" => minimal_object(root, node, depth),
        _ => Value::Null,
    }
}

fn infer_type(node: &Value) -> Option<&'static str> {
    let has = |k: &str| node.get(k).is_some();
    if has("properties") || has("required") || has("additionalProperties") || has("propertyNames")
    {
        Some("object")
    } else if has("items") || has("prefixItems") || has("contains") || has("minItems") {
        Some("array")
    } else if has("minLength") || has("maxLength") || has("pattern") {
        Some("string")
    } else if has("minimum")
        || has("maximum")
        || has("exclusiveMinimum")
        || has("exclusiveMaximum")
        || has("multipleOf")
    {
        Some("number")
    } else {
        None
    }
}

fn minimal_number(node: &Value, integer: bool) -> Value {
    let num = |k: &str| node.get(k).and_then(Value::as_f64);
    let step = if integer { 1.0 } else { 0.5 };

    let mut value = 0.0f64;
    if let Some(min) = num("minimum") {
        value = value.max(min);
    }
    if let Some(ex) = num("exclusiveMinimum")
        && value <= ex
    {
        value = ex + step;
    }
    if let Some(max) = num("maximum") {
        value = value.min(max);
    }
    if let Some(ex) = num("exclusiveMaximum")
        && value >= ex
    {
        value = ex - step;
    }
    if let Some(m) = num("multipleOf")
        && m > 0.0
    {
        value = (value / m).ceil() * m;
    }
    if integer {
        value = value.ceil();
    }
    number_value(value, integer)
}

fn minimal_string(node: &Value) -> Value {
    if let Some(p) = node.get("pattern").and_then(Value::as_str)
        && let Some(lit) = pattern::literal_for_pattern(p)
    {
        return Value::String(lit);
    }
    let min = node.get("minLength").and_then(Value::as_u64).unwrap_or(0) as usize;
    Value::String("a".repeat(min))
}

fn minimal_array(root: &Value, node: &Value, depth: usize) -> Value {
    if depth >= MAX_DEPTH {
        return Value::Array(Vec::new());
    }
    let mut out = Vec::new();
    if let Some(contains) = node.get("contains") {
        let need = node.get("minContains").and_then(Value::as_u64).unwrap_or(1);
        for _ in 0..need {
            out.push(minimal_at_depth(root, contains, depth + 1));
        }
    }
    let min = node.get("minItems").and_then(Value::as_u64).unwrap_or(0) as usize;
    while out.len() < min {
        let idx = out.len();
        let item = match item_schema(node, idx) {
            Some(s) => minimal_at_depth(root, s, depth + 1),
            None => Value::Null,
        };
        out.push(item);
    }
    Value::Array(out)
}

fn minimal_object(root: &Value, node: &Value, depth: usize) -> Value {
    let mut out = Map::new();
    if depth >= MAX_DEPTH {
        return Value::Object(out);
    }
    let required = node
        .get("required")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for name in required.iter().filter_map(Value::as_str) {
        let value = match property_schema(node, name) {
            Some(sub) => {
                let sub = pointer::deref(root, sub);
                match sub.get("default") {
                    Some(d) => d.clone(),
                    None => minimal_at_depth(root, sub, depth + 1),
                }
            }
            None => Value::Null,
        };
        out.insert(name.to_string(), value);
    }
    Value::Object(out)
}

/// Schema governing array slot `idx`: tuple position first, then the general item schema.
pub fn item_schema(node: &Value, idx: usize) -> Option<&Value> {
    if let Some(prefix) = node.get("prefixItems").and_then(Value::as_array) {
        if let Some(s) = prefix.get(idx) {
            return Some(s);
        }
        return node.get("items").filter(|v| !v.is_array());
    }
    match node.get("items") {
        Some(Value::Array(tuple)) => tuple.get(idx).or_else(|| node.get("additionalItems")),
        Some(other) => Some(other),
        None => None,
    }
}

/// Schema governing property `name`: `properties`, then `additionalProperties` when it is a schema.
pub fn property_schema<'a>(node: &'a Value, name: &str) -> Option<&'a Value> {
    if let Some(s) = node.get("properties").and_then(|p| p.get(name)) {
        return Some(s);
    }
    node.get("additionalProperties").filter(|v| v.is_object())
}

/// A JSON number, rendered as an integer when `integer` is set or the value is integral.
pub fn number_value(x: f64, integer: bool) -> Value {
    let x = if integer { x.trunc() } else { x };
    if x.fract() == 0.0 && x.abs() <= MAX_SAFE_INTEGER {
        return Value::Number(Number::from(x as i64));
    }
    Number::from_f64(x).map(Value::Number).unwrap_or(Value::Null)
}

/// Hex SHA-256 of a canonical rendering; equal values always share a bucket.
pub fn structural_hash(value: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(value, &mut canonical);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, k) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(&map[k], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
                out.push_str(&(f as i64).to_string())
            }
            _ => out.push_str(&n.to_string()),
        },
        other => out.push_str(&other.to_string()),
    }
}

/// JSON Schema equality: numbers by value, objects by key set and member equality.
pub fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => i == j,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| json_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| json_equal(v, w)))
        }
        _ => a == b,
    }
}

/// Number of Unicode scalar values.
pub fn code_point_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_prefers_enum_then_const() {
        let root = json!({});
        assert_eq!(minimal_value(&root, &json!({"enum": ["x", "y"], "const": "z"})), json!("x"));
        assert_eq!(minimal_value(&root, &json!({"const": 7})), json!(7));
        assert_eq!(minimal_value(&root, &json!({"type": "boolean"})), json!(false));
        assert_eq!(minimal_value(&root, &json!({})), Value::Null);
    }

    #[test]
    fn minimal_numbers_respect_bounds() {
        let root = json!({});
        assert_eq!(minimal_value(&root, &json!({"type": "integer", "minimum": 3})), json!(3));
        assert_eq!(
            minimal_value(&root, &json!({"type": "integer", "exclusiveMinimum": 0})),
            json!(1)
        );
        assert_eq!(
            minimal_value(&root, &json!({"type": "number", "minimum": 1.5})),
            json!(1.5)
        );
        assert_eq!(
            minimal_value(&root, &json!({"type": "integer", "minimum": 4, "multipleOf": 3})),
            json!(6)
        );
    }

    #[test]
    fn minimal_string_uses_pattern_or_padding() {
        let root = json!({});
        assert_eq!(
            minimal_value(&root, &json!({"type": "string", "minLength": 3})),
            json!("aaa")
        );
        assert_eq!(
            minimal_value(&root, &json!({"type": "string", "pattern": "^id-[0-9]+$"})),
            json!("id-0")
        );
    }

    #[test]
    fn minimal_object_fills_required_with_defaults() {
        let root = json!({"$defs": {"flag": {"type": "boolean", "default": true}}});
        let node = json!({
            "type": "object",
            "required": ["flag", "n"],
            "properties": {
                "flag": {"$ref": "#/$defs/flag"},
                "n": {"type": "integer", "minimum": 2}
            }
        });
        assert_eq!(minimal_value(&root, &node), json!({"flag": true, "n": 2}));
    }

    #[test]
    fn minimal_array_uses_tuple_positions() {
        let root = json!({});
        let node = json!({
            "type": "array",
            "minItems": 3,
            "prefixItems": [{"const": "head"}],
            "items": {"type": "integer"}
        });
        assert_eq!(minimal_value(&root, &node), json!(["head", 0, 0]));
    }

    #[test]
    fn structural_hash_ignores_key_order_and_number_form() {
        let a = json!({"a": 1, "b": [1.0, {"c": null}]});
        let b = json!({"b": [1, {"c": null}], "a": 1.0});
        assert_eq!(structural_hash(&a), structural_hash(&b));
        assert!(json_equal(&a, &b));
        assert_ne!(structural_hash(&json!("1")), structural_hash(&json!(1)));
        assert!(!json_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
    }

    #[test]
    fn number_value_renders_integers() {
        assert_eq!(number_value(3.0, false), json!(3));
        assert_eq!(number_value(3.7, true), json!(3));
        assert_eq!(number_value(0.25, false), json!(0.25));
    }

    #[test]
    fn code_points_not_bytes() {
        assert_eq!(code_point_len("héllo"), 5);
        assert_eq!(code_point_len("😀"), 1);
    }
}
