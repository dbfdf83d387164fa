//! Step 7: `pattern` literals and `multipleOf` rounding.

use super::ItemSession;
use crate::pattern;
use crate::pointer;
use crate::synth::{number_value, requires_integer};
use schemafix_types::repair::ActionKind;
use schemafix_types::validation::{Keyword, ValidationError};
use serde_json::{Value, json};

/// Multiples tried on either side when an integral multiple is required.
const MAX_INTEGRAL_PROBE: i64 = 64;

pub(super) fn repair(session: &mut ItemSession<'_>, working: &mut Value, err: &ValidationError) -> bool {
    let Some(current) = pointer::get(working, &err.instance_path).cloned() else {
        return false;
    };
    let Some(at) = session.locate(&err.schema_path, None) else {
        return false;
    };

    let (kind, next, details) = match err.kind() {
        Keyword::Pattern => {
            let Some(source) = at.node.get("pattern").and_then(Value::as_str) else {
                return false;
            };
            let Some(text) = current.as_str() else {
                return false;
            };
            if pattern::bounded_regex(source).is_some_and(|re| re.is_match(text)) {
                return false;
            }
            // Patterns above the complexity cap are left alone.
            let Some(literal) = pattern::literal_for_pattern(source) else {
                return false;
            };
            (
                ActionKind::PatternLiteral,
                Value::String(literal),
                json!({"pattern": source}),
            )
        }
        Keyword::MultipleOf => {
            let (Some(x), Some(m)) = (
                current.as_f64(),
                at.node.get("multipleOf").and_then(Value::as_f64),
            ) else {
                return false;
            };
            if m <= 0.0 {
                return false;
            }
            let plan = session.env.plan;
            let (eps, _) = plan.epsilon();
            let integer = requires_integer(at.node);
            let Some(rounded) = round_to_multiple(x, m, eps, integer, plan.decimal_precision) else {
                return false;
            };
            (
                ActionKind::RoundMultipleOf,
                number_value(rounded, integer),
                json!({"multipleOf": m, "from": x}),
            )
        }
        _ => return false,
    };

    if !pointer::replace(working, &err.instance_path, next) {
        return false;
    }
    session.record(kind, &at, &err.instance_path, details);
    true
}

/// Nearest multiple of `m`, or `None` when `x` is already within `eps` of one.
fn round_to_multiple(x: f64, m: f64, eps: f64, integer: bool, precision: u32) -> Option<f64> {
    let q = x / m;
    if (q - q.round()).abs() <= eps {
        return None;
    }
    let k = q.round();
    if integer {
        let k = k as i64;
        return (0..=MAX_INTEGRAL_PROBE)
            .flat_map(|d| [k + d, k - d])
            .map(|k| k as f64 * m)
            .find(|v| v.fract() == 0.0);
    }
    let scale = 10f64.powi(precision.min(15) as i32);
    Some((k * m * scale).round() / scale)
}
