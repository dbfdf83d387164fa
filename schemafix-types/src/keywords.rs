//! Where sub-schemas sit inside a schema object.

use serde_json::Value;

/// Keywords whose value maps names to sub-schemas.
pub const SUBSCHEMA_MAPS: &[&str] = &[
    "properties",
    "patternProperties",
    "$defs",
    "definitions",
    "dependentSchemas",
    "dependencies",
];

/// Keywords whose value is a list of sub-schemas.
pub const SUBSCHEMA_LISTS: &[&str] = &["allOf", "anyOf", "oneOf", "prefixItems"];

/// Keywords whose value is one sub-schema.
pub const SUBSCHEMA_SINGLES: &[&str] = &[
    "not",
    "if",
    "then",
    "else",
    "contains",
    "additionalItems",
    "additionalProperties",
    "unevaluatedItems",
    "unevaluatedProperties",
    "propertyNames",
];

/// One sub-schema, or a positional list of them in older drafts.
pub const ITEMS: &str = "items";

/// RFC 6901 token escaping.
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn is_schema(value: &Value) -> bool {
    value.is_object() || value.is_boolean()
}

/// Visit every direct sub-schema of `node` with its escaped relative pointer.
///
/// Values in map positions that are not schemas (the name lists of `dependencies`) are skipped.
pub fn for_each_subschema<'a>(node: &'a Value, mut visit: impl FnMut(String, &'a Value)) {
    let Some(obj) = node.as_object() else {
        return;
    };
    for key in SUBSCHEMA_MAPS {
        if let Some(map) = obj.get(*key).and_then(Value::as_object) {
            for (name, child) in map.iter().filter(|(_, c)| is_schema(c)) {
                visit(format!("/{}/{}", key, escape_token(name)), child);
            }
        }
    }
    for key in SUBSCHEMA_LISTS {
        if let Some(list) = obj.get(*key).and_then(Value::as_array) {
            for (i, child) in list.iter().enumerate().filter(|(_, c)| is_schema(c)) {
                visit(format!("/{}/{}", key, i), child);
            }
        }
    }
    match obj.get(ITEMS) {
        Some(Value::Array(list)) => {
            for (i, child) in list.iter().enumerate().filter(|(_, c)| is_schema(c)) {
                visit(format!("/{}/{}", ITEMS, i), child);
            }
        }
        Some(child) if is_schema(child) => visit(format!("/{}", ITEMS), child),
        _ => {}
    }
    for key in SUBSCHEMA_SINGLES {
        if let Some(child) = obj.get(*key).filter(|c| is_schema(c)) {
            visit(format!("/{}", key), child);
        }
    }
}
