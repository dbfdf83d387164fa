//! Step 4: `uniqueItems`, `maxItems`, `minItems`.

use super::{ItemSession, limit};
use crate::pointer;
use crate::synth::{self, json_equal, structural_hash};
use schemafix_types::repair::ActionKind;
use schemafix_types::validation::{Keyword, ValidationError};
use serde_json::{Value, json};
use std::collections::HashMap;

/// Attempts at making a synthesized element distinct before giving up.
const MAX_VARIANTS: usize = 32;

pub(super) fn repair(session: &mut ItemSession<'_>, working: &mut Value, err: &ValidationError) -> bool {
    let Some(items) = pointer::get(working, &err.instance_path).and_then(Value::as_array) else {
        return false;
    };
    let items = items.clone();
    let Some(at) = session.locate(&err.schema_path, None) else {
        return false;
    };

    let (kind, next, details) = match err.kind() {
        Keyword::UniqueItems => {
            let kept = dedupe(&items);
            if kept.len() == items.len() {
                return false;
            }
            let removed = items.len() - kept.len();
            (ActionKind::DedupeArray, kept, json!({"removed": removed}))
        }
        Keyword::MaxItems => {
            let Some(max) = limit(at.node, "maxItems", err).map(|l| l as usize) else {
                return false;
            };
            if items.len() <= max {
                return false;
            }
            let mut next = items.clone();
            next.truncate(max);
            (ActionKind::TruncateArray, next, json!({"from": items.len(), "to": max}))
        }
        Keyword::MinItems => {
            let Some(min) = limit(at.node, "minItems", err).map(|l| l as usize) else {
                return false;
            };
            if items.len() >= min {
                return false;
            }
            let unique = at.node.get("uniqueItems") == Some(&Value::Bool(true));
            let mut next = items.clone();
            while next.len() < min {
                let idx = next.len();
                let mut value = match synth::item_schema(at.node, idx) {
                    Some(sub) => synth::default_or_minimal(session.env.schema, sub),
                    None => Value::Null,
                };
                if unique {
                    value = distinct_variant(value, &next);
                }
                next.push(value);
            }
            let added = next.len() - items.len();
            (ActionKind::GrowArray, next, json!({"added": added}))
        }
        _ => return false,
    };

    if !pointer::replace(working, &err.instance_path, Value::Array(next)) {
        return false;
    }
    session.record(kind, &at, &err.instance_path, details);
    true
}

/// First occurrence per structural-hash bucket; collisions resolved by content equality.
fn dedupe(items: &[Value]) -> Vec<Value> {
    let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();
    let mut kept: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        let bucket = buckets.entry(structural_hash(item)).or_default();
        if bucket.iter().any(|&i| json_equal(&kept[i], item)) {
            continue;
        }
        bucket.push(kept.len());
        kept.push(item.clone());
    }
    kept
}

/// Perturb numbers and strings until they differ from every existing element.
fn distinct_variant(value: Value, existing: &[Value]) -> Value {
    let taken = |v: &Value| existing.iter().any(|e| json_equal(e, v));
    if !taken(&value) {
        return value;
    }
    for step in 1..=MAX_VARIANTS {
        let candidate = match &value {
            Value::Number(n) => match n.as_f64() {
                Some(f) => synth::number_value(f + step as f64, n.is_i64() || n.is_u64()),
                None => return value,
            },
            Value::String(s) => Value::String(format!("{}{}", s, step)),
            _ => return value,
        };
        if !taken(&candidate) {
            return candidate;
        }
    }
    value
}
