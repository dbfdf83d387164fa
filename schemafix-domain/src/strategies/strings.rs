//! Step 3: `minLength` / `maxLength`, measured in code points.

use super::{ItemSession, limit};
use crate::pointer;
use crate::synth::code_point_len;
use schemafix_types::repair::ActionKind;
use schemafix_types::validation::{Keyword, ValidationError};
use serde_json::{Value, json};

const FILLER: char = 'a';

pub(super) fn repair(session: &mut ItemSession<'_>, working: &mut Value, err: &ValidationError) -> bool {
    let Some(current) = pointer::get(working, &err.instance_path).and_then(Value::as_str) else {
        return false;
    };
    let current = current.to_string();
    let Some(at) = session.locate(&err.schema_path, None) else {
        return false;
    };
    let len = code_point_len(&current);

    let (kind, next, bound) = match err.kind() {
        Keyword::MinLength => {
            let Some(min) = limit(at.node, "minLength", err).map(|l| l as usize) else {
                return false;
            };
            if len >= min {
                return false;
            }
            (ActionKind::PadString, pad(&current, min), min)
        }
        Keyword::MaxLength => {
            let Some(max) = limit(at.node, "maxLength", err).map(|l| l as usize) else {
                return false;
            };
            if len <= max {
                return false;
            }
            (ActionKind::TruncateString, current.chars().take(max).collect(), max)
        }
        _ => return false,
    };

    if !pointer::replace(working, &err.instance_path, Value::String(next)) {
        return false;
    }
    session.record(kind, &at, &err.instance_path, json!({"from": len, "to": bound}));
    true
}

fn pad(s: &str, min: usize) -> String {
    let missing = min.saturating_sub(code_point_len(s));
    let mut out = String::with_capacity(s.len() + missing);
    out.push_str(s);
    out.extend(std::iter::repeat_n(FILLER, missing));
    out
}
