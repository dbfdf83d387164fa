//! Step 2: add missing required properties.

use super::ItemSession;
use crate::pointer;
use crate::synth;
use schemafix_types::codes;
use schemafix_types::coverage::CoverageEvent;
use schemafix_types::repair::ActionKind;
use schemafix_types::validation::{Keyword, ValidationError};
use serde_json::{Value, json};
use tracing::debug;

pub(super) fn repair(session: &mut ItemSession<'_>, working: &mut Value, err: &ValidationError) -> bool {
    let Some(name) = err.param_str("missingProperty") else {
        return false;
    };
    let present = pointer::get(working, &err.instance_path)
        .and_then(Value::as_object)
        .map(|obj| obj.contains_key(name));
    if present != Some(false) {
        return false;
    }
    let Some(at) = session.locate(&err.schema_path, Some(name)) else {
        return false;
    };

    let root = session.env.schema;
    let value = match synth::property_schema(at.node, name) {
        Some(sub) => synth::default_or_minimal(root, sub),
        None => Value::Null,
    };

    // Added in place and taken back out if the evaluation guard rejects it.
    insert(working, &err.instance_path, name, value);

    if session.env.unevaluated_closed && rejected_as_unevaluated(session, working, &err.instance_path, name) {
        remove(working, &err.instance_path, name);
        debug!(canon_path = %at.canon, property = name, "required add rejected by evaluation guard");
        session.diagnose(
            codes::REPAIR_EVAL_GUARD_FAIL,
            &at.canon,
            json!({"property": name, "stage": "required"}),
        );
        return false;
    }

    let instance_path = pointer::child(&err.instance_path, name);
    session.record(
        ActionKind::AddRequired,
        &at,
        &instance_path,
        json!({"property": name}),
    );

    if let Some(sink) = session.env.coverage
        && let Err(e) = sink.emit(CoverageEvent::property_present(&at.canon, name))
    {
        debug!(error = %e, "coverage sink rejected event");
    }
    true
}

fn insert(root: &mut Value, object_ptr: &str, name: &str, value: Value) {
    if let Some(Value::Object(obj)) = pointer::get_mut(root, object_ptr) {
        obj.insert(name.to_string(), value);
    }
}

fn remove(root: &mut Value, object_ptr: &str, name: &str) {
    if let Some(Value::Object(obj)) = pointer::get_mut(root, object_ptr) {
        obj.remove(name);
    }
}

/// Draft validation reports `name` as unevaluated (or additional) on the same object.
pub(crate) fn rejected_as_unevaluated(
    session: &ItemSession<'_>,
    draft: &Value,
    object_ptr: &str,
    name: &str,
) -> bool {
    session.env.validator.validate(draft).iter().any(|e| {
        e.instance_path == object_ptr
            && match e.kind() {
                Keyword::UnevaluatedProperties => e.param_str("unevaluatedProperty") == Some(name),
                Keyword::AdditionalProperties => e.param_str("additionalProperty") == Some(name),
                _ => false,
            }
    })
}
