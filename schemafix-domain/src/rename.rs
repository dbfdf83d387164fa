//! Rename Subsystem: move an offending key to a legal, absent name, or delete it.
//!
//! Every candidate rename and every deletion is preflighted on a draft copy. The edit is rejected
//! when the draft shows a dependent-constraint or `oneOf` failure on the object that the pass
//! baseline did not have.

use crate::pattern;
use crate::pointer;
use crate::strategies::{ItemSession, Located};
use schemafix_types::codes;
use schemafix_types::delete_reasons;
use schemafix_types::repair::ActionKind;
use schemafix_types::validation::{ErrorSignature, Keyword, ValidationError};
use serde_json::{Value, json};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Outcome recorded for one `(object pointer, offending name)` within an item session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RenameEntry {
    Renamed { to: String },
    PendingDelete { reason: &'static str },
}

/// Written at most once per `(object pointer, name)`.
#[derive(Debug, Default)]
pub(crate) struct RenameRegistry {
    entries: HashMap<(String, String), RenameEntry>,
}

impl RenameRegistry {
    pub fn get(&self, object_ptr: &str, name: &str) -> Option<&RenameEntry> {
        self.entries.get(&(object_ptr.to_string(), name.to_string()))
    }

    pub fn record(&mut self, object_ptr: &str, name: &str, entry: RenameEntry) {
        self.entries
            .entry((object_ptr.to_string(), name.to_string()))
            .or_insert(entry);
    }
}

/// One offending key, flagged by one or more keywords on its object.
#[derive(Debug, Clone)]
pub(crate) struct Offender {
    pub object_ptr: String,
    /// Schema node of the object, as reported by the oracle.
    pub schema_ptr: String,
    pub name: String,
    pub violates_names: bool,
    pub violates_additional: bool,
    pub violates_unevaluated: bool,
}

enum Attempt {
    Applied,
    Failed { reason: &'static str },
}

pub(crate) fn repair_offender(
    session: &mut ItemSession<'_>,
    working: &mut Value,
    offender: &Offender,
) -> bool {
    let Some(object) = pointer::get(working, &offender.object_ptr).and_then(Value::as_object)
    else {
        return false;
    };
    if !object.contains_key(&offender.name) {
        return false;
    }
    let Some(at) = session.locate_node(&offender.schema_ptr, None) else {
        return false;
    };

    let protected = protected_names(at.node);
    let mut reason = delete_reasons::NO_SAFE_NAME;

    match session.registry.get(&offender.object_ptr, &offender.name).cloned() {
        Some(RenameEntry::Renamed { .. }) => return false,
        Some(RenameEntry::PendingDelete { reason: r }) => reason = r,
        None if offender.violates_names && !protected.contains(&offender.name) => {
            match try_rename(session, working, offender, &at) {
                Attempt::Applied => return true,
                Attempt::Failed { reason: r } => reason = r,
            }
        }
        None => {}
    }

    let deletable = (offender.violates_additional || offender.violates_unevaluated)
        && !undeletable_names(at.node).contains(&offender.name);
    session.registry.record(
        &offender.object_ptr,
        &offender.name,
        RenameEntry::PendingDelete { reason },
    );
    if !deletable {
        return false;
    }

    let mut draft = working.clone();
    let Some(Value::Object(obj)) = pointer::get_mut(&mut draft, &offender.object_ptr) else {
        return false;
    };
    if obj.remove(&offender.name).is_none() {
        return false;
    }
    let draft_errors = session.env.validator.validate(&draft);
    if let Some(kind) = regression(&draft_errors, &offender.object_ptr, &session.baseline) {
        debug!(canon_path = %at.canon, property = %offender.name, reason = kind, "deletion preflight failed");
        session.diagnose(
            codes::REPAIR_RENAME_PREFLIGHT_FAIL,
            &at.canon,
            json!({"from": offender.name, "reason": kind, "stage": "delete"}),
        );
        return false;
    }
    *working = draft;

    let instance_path = pointer::child(&offender.object_ptr, &offender.name);
    session.record(
        ActionKind::DeleteProperty,
        &at,
        &instance_path,
        json!({"property": offender.name, "reason": reason}),
    );
    session.diagnose(
        codes::REPAIR_PROPERTY_DELETED,
        &at.canon,
        json!({"property": offender.name, "reason": reason}),
    );
    true
}

fn try_rename(
    session: &mut ItemSession<'_>,
    working: &mut Value,
    offender: &Offender,
    at: &Located<'_>,
) -> Attempt {
    let Some(object) = pointer::get(working, &offender.object_ptr).and_then(Value::as_object)
    else {
        return Attempt::Failed {
            reason: delete_reasons::NO_SAFE_NAME,
        };
    };
    let mut candidates = legal_names(at.node);
    candidates.retain(|c| !object.contains_key(c));
    if candidates.is_empty() {
        return Attempt::Failed {
            reason: delete_reasons::NO_SAFE_NAME,
        };
    }

    let env = session.env;
    let additional_closed = at.node.get("additionalProperties") == Some(&Value::Bool(false));
    if additional_closed && env.plan.must_cover_guard {
        let Some(entry) = env.compose.coverage_index.get(&at.canon) else {
            debug!(canon_path = %at.canon, "must-cover guard has no coverage entry");
            session.diagnose(
                codes::MUSTCOVER_INDEX_MISSING,
                &at.canon,
                json!({"property": offender.name}),
            );
            return Attempt::Failed {
                reason: delete_reasons::MUST_COVER_REJECTED,
            };
        };
        let patterns: Vec<regex::Regex> = entry
            .patterns
            .iter()
            .filter_map(|p| pattern::bounded_regex(p))
            .collect();
        candidates.retain(|c| match &entry.must_cover {
            Some(names) => names.contains(c),
            None => entry.enumerated.contains(c) || patterns.iter().any(|re| re.is_match(c)),
        });
        if candidates.is_empty() {
            return Attempt::Failed {
                reason: delete_reasons::MUST_COVER_REJECTED,
            };
        }
    }

    let unevaluated_closed = at.node.get("unevaluatedProperties") == Some(&Value::Bool(false));

    for candidate in candidates {
        let mut draft = working.clone();
        if !rename_key(&mut draft, &offender.object_ptr, &offender.name, &candidate) {
            continue;
        }
        let draft_errors = env.validator.validate(&draft);

        if unevaluated_closed
            && reported_unevaluated(&draft_errors, &offender.object_ptr, &candidate)
        {
            debug!(canon_path = %at.canon, candidate = %candidate, "rename rejected by evaluation guard");
            session.diagnose(
                codes::REPAIR_EVAL_GUARD_FAIL,
                &at.canon,
                json!({"from": offender.name, "to": candidate, "stage": "rename"}),
            );
            continue;
        }

        if let Some(kind) = regression(&draft_errors, &offender.object_ptr, &session.baseline) {
            debug!(canon_path = %at.canon, candidate = %candidate, reason = kind, "rename preflight failed");
            session.diagnose(
                codes::REPAIR_RENAME_PREFLIGHT_FAIL,
                &at.canon,
                json!({"from": offender.name, "to": candidate, "reason": kind, "stage": "rename"}),
            );
            continue;
        }

        *working = draft;
        session.registry.record(
            &offender.object_ptr,
            &offender.name,
            RenameEntry::Renamed {
                to: candidate.clone(),
            },
        );
        session.record(
            ActionKind::RenameProperty,
            at,
            &pointer::child(&offender.object_ptr, &candidate),
            json!({"from": offender.name, "to": candidate}),
        );
        session.diagnose(
            codes::REPAIR_RENAME_APPLIED,
            &at.canon,
            json!({"from": offender.name, "to": candidate}),
        );
        return Attempt::Applied;
    }

    Attempt::Failed {
        reason: delete_reasons::NO_SAFE_NAME,
    }
}

/// `enum ∪ const ∪ literals(pattern)` of the object's `propertyNames`, in UTF-16 code-unit order.
pub(crate) fn legal_names(object_schema: &Value) -> Vec<String> {
    let Some(names) = object_schema.get("propertyNames") else {
        return Vec::new();
    };
    let mut out: BTreeSet<String> = BTreeSet::new();
    if let Some(list) = names.get("enum").and_then(Value::as_array) {
        out.extend(list.iter().filter_map(Value::as_str).map(str::to_string));
    }
    if let Some(c) = names.get("const").and_then(Value::as_str) {
        out.insert(c.to_string());
    }
    if let Some(p) = names.get("pattern").and_then(Value::as_str)
        && let Some(literals) = pattern::extract_literals(p)
    {
        out.extend(literals);
    }
    let mut sorted: Vec<String> = out.into_iter().collect();
    sorted.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));
    sorted
}

/// Names the object must keep under their own key.
fn protected_names(object_schema: &Value) -> BTreeSet<String> {
    let mut out = required_names(object_schema);
    if let Some(deps) = object_schema
        .get("dependentRequired")
        .or_else(|| object_schema.get("dependencies"))
        .and_then(Value::as_object)
    {
        for (name, targets) in deps {
            out.insert(name.clone());
            if let Some(list) = targets.as_array() {
                out.extend(list.iter().filter_map(Value::as_str).map(str::to_string));
            }
        }
    }
    if let Some(deps) = object_schema.get("dependentSchemas").and_then(Value::as_object) {
        out.extend(deps.keys().cloned());
    }
    out
}

/// Names a deletion must leave in place: required ones and those a dependency points at.
fn undeletable_names(object_schema: &Value) -> BTreeSet<String> {
    let mut out = required_names(object_schema);
    if let Some(deps) = object_schema
        .get("dependentRequired")
        .or_else(|| object_schema.get("dependencies"))
        .and_then(Value::as_object)
    {
        for targets in deps.values().filter_map(Value::as_array) {
            out.extend(targets.iter().filter_map(Value::as_str).map(str::to_string));
        }
    }
    if let Some(deps) = object_schema.get("dependentSchemas").and_then(Value::as_object) {
        out.extend(deps.keys().cloned());
    }
    out
}

fn required_names(object_schema: &Value) -> BTreeSet<String> {
    object_schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

fn rename_key(root: &mut Value, object_ptr: &str, from: &str, to: &str) -> bool {
    let Some(Value::Object(obj)) = pointer::get_mut(root, object_ptr) else {
        return false;
    };
    if obj.contains_key(to) {
        return false;
    }
    let Some(value) = obj.remove(from) else {
        return false;
    };
    obj.insert(to.to_string(), value);
    true
}

fn reported_unevaluated(errors: &[ValidationError], object_ptr: &str, name: &str) -> bool {
    errors.iter().any(|e| {
        e.instance_path == object_ptr
            && e.kind() == Keyword::UnevaluatedProperties
            && e.param_str("unevaluatedProperty") == Some(name)
    })
}

/// `"dependent"` or `"branch"` when the draft has a failure on the object absent from the baseline.
fn regression(
    errors: &[ValidationError],
    object_ptr: &str,
    baseline: &BTreeSet<ErrorSignature>,
) -> Option<&'static str> {
    errors
        .iter()
        .filter(|e| e.instance_path == object_ptr)
        .filter(|e| !baseline.contains(&e.signature()))
        .find_map(|e| {
            let kind = e.kind();
            if kind.is_dependent() {
                Some("dependent")
            } else if kind == Keyword::OneOf {
                Some("branch")
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testkit::Fixture;
    use schemafix_types::compose::CoverageEntry;
    use schemafix_types::options::PlanOptions;

    fn offender(name: &str, names: bool, additional: bool) -> Offender {
        Offender {
            object_ptr: String::new(),
            schema_ptr: String::new(),
            name: name.to_string(),
            violates_names: names,
            violates_additional: additional,
            violates_unevaluated: false,
        }
    }

    #[test]
    fn legal_names_merge_enum_const_and_pattern_literals() {
        let schema = json!({"propertyNames": {"enum": ["b", "a"], "pattern": "^(c|a)$"}});
        assert_eq!(legal_names(&schema), vec!["a", "b", "c"]);
        assert!(legal_names(&json!({})).is_empty());
    }

    #[test]
    fn renames_to_smallest_absent_candidate() {
        let fx = Fixture::new(json!({
            "type": "object",
            "propertyNames": {"enum": ["a", "b", "c"]},
            "additionalProperties": false
        }));
        let env = fx.env();
        let mut session = crate::strategies::ItemSession::new(&env, 0);
        let mut item = json!({"z": 1});
        assert!(repair_offender(&mut session, &mut item, &offender("z", true, true)));
        assert_eq!(item, json!({"a": 1}));
        assert_eq!(session.actions[0].action, ActionKind::RenameProperty);
        assert_eq!(session.actions[0].details, Some(json!({"from": "z", "to": "a"})));
        assert_eq!(
            session.registry.get("", "z"),
            Some(&RenameEntry::Renamed { to: "a".to_string() })
        );
    }

    #[test]
    fn present_names_are_not_candidates() {
        let fx = Fixture::new(json!({"propertyNames": {"enum": ["a", "b"]}}));
        let env = fx.env();
        let mut session = crate::strategies::ItemSession::new(&env, 0);
        let mut item = json!({"a": 0, "q": 1});
        assert!(repair_offender(&mut session, &mut item, &offender("q", true, false)));
        assert_eq!(item, json!({"a": 0, "b": 1}));
    }

    #[test]
    fn required_names_are_never_renamed_or_deleted() {
        let fx = Fixture::new(json!({
            "required": ["q"],
            "propertyNames": {"enum": ["a"]},
            "additionalProperties": false
        }));
        let env = fx.env();
        let mut session = crate::strategies::ItemSession::new(&env, 0);
        let mut item = json!({"q": 1});
        assert!(!repair_offender(&mut session, &mut item, &offender("q", true, true)));
        assert_eq!(item, json!({"q": 1}));
    }

    #[test]
    fn preflight_rejects_dependent_regressions() {
        let fx = Fixture::new(json!({
            "type": "object",
            "propertyNames": {"enum": ["a", "b"]},
            "dependentRequired": {"a": ["zz"]},
            "additionalProperties": false,
            "properties": {"a": {}, "b": {}, "zz": {}}
        }));
        let env = fx.env();
        let mut session = crate::strategies::ItemSession::new(&env, 0);
        let mut item = json!({"q": 1});
        assert!(repair_offender(&mut session, &mut item, &offender("q", true, true)));
        // "a" would trigger dependentRequired; "b" is taken instead.
        assert_eq!(item, json!({"b": 1}));
        let codes_seen: Vec<&str> = session.diagnostics.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(
            codes_seen,
            vec![codes::REPAIR_RENAME_PREFLIGHT_FAIL, codes::REPAIR_RENAME_APPLIED]
        );
        assert_eq!(session.diagnostics[0].details["reason"], json!("dependent"));
    }

    fn session_offender(name: &str, names: bool, additional: bool, unevaluated: bool) -> Offender {
        Offender {
            violates_unevaluated: unevaluated,
            ..offender(name, names, additional)
        }
    }

    #[test]
    fn preflight_rejects_branch_regressions() {
        let fx = Fixture::new(json!({
            "type": "object",
            "propertyNames": {"enum": ["a", "b"]},
            "oneOf": [{"required": ["b"]}, {"required": ["q"]}]
        }));
        let env = fx.env();
        let mut session = crate::strategies::ItemSession::new(&env, 0);
        let mut item = json!({"q": 1});
        assert!(repair_offender(&mut session, &mut item, &offender("q", true, false)));
        // {"a": 1} matches neither branch; {"b": 1} matches the first.
        assert_eq!(item, json!({"b": 1}));
        assert_eq!(session.diagnostics[0].code, codes::REPAIR_RENAME_PREFLIGHT_FAIL);
        assert_eq!(
            session.diagnostics[0].details,
            json!({"from": "q", "to": "a", "reason": "branch", "stage": "rename"})
        );
        assert_eq!(session.diagnostics[1].code, codes::REPAIR_RENAME_APPLIED);
    }

    #[test]
    fn evaluation_guard_skips_unevaluated_candidates() {
        let fx = Fixture::new(json!({
            "type": "object",
            "propertyNames": {"enum": ["a", "b"]},
            "properties": {"b": {}},
            "unevaluatedProperties": false
        }));
        let env = fx.env();
        let mut session = crate::strategies::ItemSession::new(&env, 0);
        let mut item = json!({"z": 1});
        assert!(repair_offender(
            &mut session,
            &mut item,
            &session_offender("z", true, false, true)
        ));
        assert_eq!(item, json!({"b": 1}));
        assert_eq!(session.diagnostics[0].code, codes::REPAIR_EVAL_GUARD_FAIL);
        assert_eq!(
            session.diagnostics[0].details,
            json!({"from": "z", "to": "a", "stage": "rename"})
        );
        assert_eq!(session.diagnostics[1].code, codes::REPAIR_RENAME_APPLIED);
    }

    #[test]
    fn deletion_that_breaks_one_of_is_rejected() {
        let fx = Fixture::new(json!({
            "type": "object",
            "properties": {"kind": {}},
            "additionalProperties": false,
            "oneOf": [{"required": ["kind"]}, {"required": ["extra"]}]
        }));
        let env = fx.env();
        let mut session = crate::strategies::ItemSession::new(&env, 0);
        let mut item = json!({"extra": 1});
        assert!(!repair_offender(&mut session, &mut item, &offender("extra", false, true)));
        assert_eq!(item, json!({"extra": 1}));
        assert!(session.actions.is_empty());
        assert_eq!(session.diagnostics.len(), 1);
        assert_eq!(session.diagnostics[0].code, codes::REPAIR_RENAME_PREFLIGHT_FAIL);
        assert_eq!(
            session.diagnostics[0].details,
            json!({"from": "extra", "reason": "branch", "stage": "delete"})
        );
    }

    #[test]
    fn dependency_targets_are_not_deleted() {
        let fx = Fixture::new(json!({
            "type": "object",
            "properties": {"a": {}},
            "dependentRequired": {"a": ["z"]},
            "additionalProperties": false
        }));
        let env = fx.env();
        let mut session = crate::strategies::ItemSession::new(&env, 0);
        let mut item = json!({"a": 1, "z": 1});
        assert!(!repair_offender(&mut session, &mut item, &offender("z", false, true)));
        assert_eq!(item, json!({"a": 1, "z": 1}));
        assert!(session.actions.is_empty());
    }

    #[test]
    fn deletion_without_regression_is_applied() {
        let fx = Fixture::new(json!({
            "type": "object",
            "properties": {"kind": {}},
            "additionalProperties": false,
            "oneOf": [{"required": ["kind"]}, {"required": ["other"]}]
        }));
        let env = fx.env();
        let mut session = crate::strategies::ItemSession::new(&env, 0);
        let mut item = json!({"kind": 1, "extra": 1});
        assert!(repair_offender(&mut session, &mut item, &offender("extra", false, true)));
        assert_eq!(item, json!({"kind": 1}));
        assert_eq!(session.diagnostics[0].code, codes::REPAIR_PROPERTY_DELETED);
    }

    #[test]
    fn must_cover_without_index_entry_falls_back_to_delete() {
        let plan = PlanOptions {
            must_cover_guard: true,
            ..Default::default()
        };
        let fx = Fixture::with_plan(
            json!({"propertyNames": {"enum": ["a"]}, "additionalProperties": false}),
            plan,
        );
        let env = fx.env();
        let mut session = crate::strategies::ItemSession::new(&env, 0);
        let mut item = json!({"z": 1});
        assert!(repair_offender(&mut session, &mut item, &offender("z", true, true)));
        assert_eq!(item, json!({}));
        assert_eq!(session.diagnostics[0].code, codes::MUSTCOVER_INDEX_MISSING);
        assert_eq!(
            session.actions[0].details,
            Some(json!({"property": "z", "reason": delete_reasons::MUST_COVER_REJECTED}))
        );
    }

    #[test]
    fn must_cover_filters_candidates() {
        let plan = PlanOptions {
            must_cover_guard: true,
            ..Default::default()
        };
        let mut fx = Fixture::with_plan(
            json!({"propertyNames": {"enum": ["a", "b"]}, "additionalProperties": false}),
            plan,
        );
        fx.compose.coverage_index.insert(
            String::new(),
            CoverageEntry {
                must_cover: Some(vec!["b".to_string()]),
                ..Default::default()
            },
        );
        let env = fx.env();
        let mut session = crate::strategies::ItemSession::new(&env, 0);
        let mut item = json!({"z": 1});
        assert!(repair_offender(&mut session, &mut item, &offender("z", true, true)));
        assert_eq!(item, json!({"b": 1}));
    }

    #[test]
    fn names_only_violation_without_candidates_stays_pending() {
        let fx = Fixture::new(json!({"propertyNames": {"maxLength": 1}}));
        let env = fx.env();
        let mut session = crate::strategies::ItemSession::new(&env, 0);
        let mut item = json!({"long": 1});
        assert!(!repair_offender(&mut session, &mut item, &offender("long", true, false)));
        assert_eq!(item, json!({"long": 1}));
        assert_eq!(
            session.registry.get("", "long"),
            Some(&RenameEntry::PendingDelete {
                reason: delete_reasons::NO_SAFE_NAME
            })
        );
    }

    #[test]
    fn registry_keeps_first_entry() {
        let mut reg = RenameRegistry::default();
        reg.record("", "x", RenameEntry::Renamed { to: "a".into() });
        reg.record("", "x", RenameEntry::PendingDelete { reason: "later" });
        assert_eq!(reg.get("", "x"), Some(&RenameEntry::Renamed { to: "a".into() }));
    }
}
