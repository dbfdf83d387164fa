//! Step 5: inclusive clamps and exclusive nudges.

use super::{ItemSession, limit};
use crate::pointer;
use crate::synth::{number_value, requires_integer};
use schemafix_types::repair::ActionKind;
use schemafix_types::validation::{Keyword, ValidationError};
use serde_json::{Value, json};

pub(super) fn repair(session: &mut ItemSession<'_>, working: &mut Value, err: &ValidationError) -> bool {
    let Some(current) = pointer::get(working, &err.instance_path).and_then(Value::as_f64) else {
        return false;
    };
    let Some(at) = session.locate(&err.schema_path, None) else {
        return false;
    };
    let integer = requires_integer(at.node);
    let (eps, eps_label) = session.env.plan.epsilon();
    let kw = err.kind();
    let Some(bound) = limit(at.node, kw.as_str(), err) else {
        return false;
    };

    let (kind, next, details) = match kw {
        Keyword::Minimum if current < bound => {
            let next = if integer { bound.ceil() } else { bound };
            (ActionKind::ClampMinimum, next, json!({"limit": bound}))
        }
        Keyword::Maximum if current > bound => {
            let next = if integer { bound.floor() } else { bound };
            (ActionKind::ClampMaximum, next, json!({"limit": bound}))
        }
        Keyword::ExclusiveMinimum if current <= bound => {
            if integer {
                let next = bound.floor() + 1.0;
                (ActionKind::NudgeExclusiveMinimum, next, json!({"limit": bound, "delta": 1}))
            } else {
                let next = (bound + eps).max(bound.next_up());
                (
                    ActionKind::NudgeExclusiveMinimum,
                    next,
                    json!({"limit": bound, "epsilon": eps_label}),
                )
            }
        }
        Keyword::ExclusiveMaximum if current >= bound => {
            if integer {
                let next = bound.ceil() - 1.0;
                (ActionKind::NudgeExclusiveMaximum, next, json!({"limit": bound, "delta": 1}))
            } else {
                let next = (bound - eps).min(bound.next_down());
                (
                    ActionKind::NudgeExclusiveMaximum,
                    next,
                    json!({"limit": bound, "epsilon": eps_label}),
                )
            }
        }
        _ => return false,
    };

    if !pointer::replace(working, &err.instance_path, number_value(next, integer)) {
        return false;
    }
    session.record(kind, &at, &err.instance_path, details);
    true
}
