//! JSON Pointer helpers for instances and schemas.
//!
//! Schema pointers may carry a leading `#` (Ajv style); instance pointers never do.

use schemafix_types::keywords::{
    ITEMS, SUBSCHEMA_LISTS, SUBSCHEMA_MAPS, SUBSCHEMA_SINGLES, escape_token,
};
use serde_json::Value;

const MAX_REF_DEPTH: usize = 32;

/// Decode a pointer into unescaped tokens. `""` and `"#"` are the root.
pub fn split(ptr: &str) -> Vec<String> {
    let ptr = ptr.strip_prefix('#').unwrap_or(ptr);
    if ptr.is_empty() {
        return Vec::new();
    }
    ptr.strip_prefix('/')
        .unwrap_or(ptr)
        .split('/')
        .map(unescape)
        .collect()
}

pub fn join<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut out = String::new();
    for t in tokens {
        out.push('/');
        out.push_str(&escape(t.as_ref()));
    }
    out
}

/// Strip a leading `#` so schema pointers compare as plain pointers.
pub fn normalize(ptr: &str) -> String {
    join(&split(ptr))
}

pub fn child(ptr: &str, token: &str) -> String {
    format!("{}/{}", normalize(ptr), escape(token))
}

/// Parent pointer and the decoded last token.
pub fn parent(ptr: &str) -> Option<(String, String)> {
    let mut tokens = split(ptr);
    let last = tokens.pop()?;
    Some((join(&tokens), last))
}

pub fn escape(token: &str) -> String {
    escape_token(token)
}

pub fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// True when `suffix` tokens are a trailing run of `full` tokens.
pub fn is_suffix(full: &[String], suffix: &[String]) -> bool {
    suffix.len() <= full.len() && full[full.len() - suffix.len()..] == *suffix
}

pub fn get<'a>(root: &'a Value, ptr: &str) -> Option<&'a Value> {
    root.pointer(&normalize(ptr))
}

pub fn get_mut<'a>(root: &'a mut Value, ptr: &str) -> Option<&'a mut Value> {
    root.pointer_mut(&normalize(ptr))
}

/// Replace the value at `ptr`. The root pointer replaces the whole document.
///
/// Returns `false` when the path does not exist or the value is unchanged.
pub fn replace(root: &mut Value, ptr: &str, value: Value) -> bool {
    let Some(slot) = get_mut(root, ptr) else {
        return false;
    };
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// Walk a schema pointer, following local `$ref` segments.
///
/// Returns the node and the effective origin pointer after ref-following.
pub fn resolve_schema<'a>(root: &'a Value, ptr: &str) -> Option<(&'a Value, String)> {
    resolve_schema_depth(root, ptr, 0)
}

fn resolve_schema_depth<'a>(
    root: &'a Value,
    ptr: &str,
    depth: usize,
) -> Option<(&'a Value, String)> {
    if depth > MAX_REF_DEPTH {
        return None;
    }
    let mut node = root;
    let mut effective: Vec<String> = Vec::new();
    for token in split(ptr) {
        if token == "$ref"
            && let Some(target) = node.get("$ref").and_then(Value::as_str)
        {
            let local = target.strip_prefix('#')?;
            let (resolved, eff) = resolve_schema_depth(root, local, depth + 1)?;
            node = resolved;
            effective = split(&eff);
            continue;
        }
        node = step(node, &token)?;
        effective.push(token);
    }
    Some((node, join(&effective)))
}

fn step<'a>(node: &'a Value, token: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(token),
        Value::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Follow a bare local `$ref` until a node with its own keywords is reached.
pub fn deref<'a>(root: &'a Value, node: &'a Value) -> &'a Value {
    let mut current = node;
    for _ in 0..MAX_REF_DEPTH {
        let Some(target) = current.get("$ref").and_then(Value::as_str) else {
            return current;
        };
        let has_own_shape = ["type", "enum", "const", "properties", "items"]
            .iter()
            .any(|k| current.get(*k).is_some());
        if has_own_shape {
            return current;
        }
        match target
            .strip_prefix('#')
            .and_then(|local| resolve_schema(root, local))
        {
            Some((next, _)) => current = next,
            None => return current,
        }
    }
    current
}

/// Index of the last token in keyword position.
pub fn keyword_index(tokens: &[String]) -> Option<usize> {
    enum Slot {
        Keyword,
        Name,
        Index,
        ItemsNext,
    }
    let mut slot = Slot::Keyword;
    let mut last = None;
    for (i, token) in tokens.iter().enumerate() {
        slot = match slot {
            Slot::Name | Slot::Index => Slot::Keyword,
            Slot::ItemsNext if token.parse::<usize>().is_ok() => Slot::Keyword,
            Slot::Keyword | Slot::ItemsNext => {
                last = Some(i);
                let t = token.as_str();
                if SUBSCHEMA_MAPS.contains(&t) {
                    Slot::Name
                } else if SUBSCHEMA_LISTS.contains(&t) {
                    Slot::Index
                } else if t == ITEMS {
                    Slot::ItemsNext
                } else if SUBSCHEMA_SINGLES.contains(&t) || t == "$ref" {
                    Slot::Keyword
                } else {
                    return last;
                }
            }
        };
    }
    last
}

/// Index of the last `propertyNames` token in keyword position.
pub fn property_names_index(tokens: &[String]) -> Option<usize> {
    let kw = keyword_index(tokens)?;
    (0..=kw).rev().find(|&i| {
        tokens[i] == "propertyNames" && keyword_index(&tokens[..=i]) == Some(i)
    })
}
