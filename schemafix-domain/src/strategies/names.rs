//! Step 8: `propertyNames` / `additionalProperties` / `unevaluatedProperties`.
//!
//! Offending names are grouped by enclosing object and handed to the rename subsystem in a
//! stable order, independent of the oracle's error ordering.

use super::ItemSession;
use crate::pointer;
use crate::rename::{self, Offender};
use schemafix_types::validation::{Keyword, ValidationError};
use serde_json::Value;
use std::collections::BTreeMap;

pub(super) fn repair(
    session: &mut ItemSession<'_>,
    working: &mut Value,
    errors: &[&ValidationError],
) -> usize {
    let mut edits = 0;
    for offender in collect(errors) {
        edits += usize::from(rename::repair_offender(session, working, &offender));
    }
    edits
}

/// Merge per-keyword errors into one offender per `(object, name)`, sorted by object pointer,
/// parent schema pointer, then name.
fn collect(errors: &[&ValidationError]) -> Vec<Offender> {
    let mut merged: BTreeMap<(String, String, String), Offender> = BTreeMap::new();
    for err in errors {
        let (name, kind) = match err.kind() {
            Keyword::PropertyNames => (err.param_str("propertyName"), Keyword::PropertyNames),
            Keyword::AdditionalProperties => {
                (err.param_str("additionalProperty"), Keyword::AdditionalProperties)
            }
            Keyword::UnevaluatedProperties => {
                (err.param_str("unevaluatedProperty"), Keyword::UnevaluatedProperties)
            }
            _ => continue,
        };
        let Some(name) = name else {
            continue;
        };
        let Some((schema_ptr, _)) = pointer::parent(&err.schema_path) else {
            continue;
        };

        // A name flagged by several keywords on the same object is one offender.
        let key = merged
            .keys()
            .find(|(obj, _, n)| obj == &err.instance_path && n == name)
            .cloned()
            .unwrap_or_else(|| (err.instance_path.clone(), schema_ptr.clone(), name.to_string()));
        let offender = merged.entry(key).or_insert_with(|| Offender {
            object_ptr: err.instance_path.clone(),
            schema_ptr: schema_ptr.clone(),
            name: name.to_string(),
            violates_names: false,
            violates_additional: false,
            violates_unevaluated: false,
        });
        match kind {
            Keyword::PropertyNames => offender.violates_names = true,
            Keyword::AdditionalProperties => offender.violates_additional = true,
            _ => offender.violates_unevaluated = true,
        }
    }
    merged.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn offenders_merge_and_sort_stably() {
        let errors = [
            ValidationError::new("additionalProperties", "/b", "/properties/b/additionalProperties")
                .with_param("additionalProperty", json!("z")),
            ValidationError::new("propertyNames", "", "/propertyNames")
                .with_param("propertyName", json!("y")),
            ValidationError::new("additionalProperties", "", "/additionalProperties")
                .with_param("additionalProperty", json!("y")),
            ValidationError::new("propertyNames", "", "/propertyNames")
                .with_param("propertyName", json!("x")),
        ];
        let refs: Vec<&ValidationError> = errors.iter().collect();
        let out = collect(&refs);
        let keys: Vec<(&str, &str)> = out
            .iter()
            .map(|o| (o.object_ptr.as_str(), o.name.as_str()))
            .collect();
        assert_eq!(keys, vec![("", "x"), ("", "y"), ("/b", "z")]);
        assert!(out[1].violates_names && out[1].violates_additional);
        assert!(!out[0].violates_additional);
    }
}
