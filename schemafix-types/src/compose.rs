use crate::keywords;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Upstream composition output consumed read-only by the repair engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeResult {
    pub canonical_schema: Value,

    /// Canonical pointer -> origin pointers in the author's schema.
    #[serde(default)]
    pub rev_ptr_map: BTreeMap<String, Vec<String>>,

    /// Canonical array-schema pointer -> contains obligations.
    #[serde(default)]
    pub contains_bag: BTreeMap<String, Vec<ContainsNeed>>,

    /// Canonical object-schema pointer -> property-name coverage.
    #[serde(default)]
    pub coverage_index: BTreeMap<String, CoverageEntry>,
}

/// A `(sub-schema, minCount, maxCount?)` requirement on an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainsNeed {
    pub schema: Value,

    #[serde(default = "default_min")]
    pub min: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
}

fn default_min() -> u64 {
    1
}

/// Property-name membership for one object schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageEntry {
    /// Finite enumeration of names the object can carry.
    #[serde(default)]
    pub enumerated: Vec<String>,

    /// Regex sources whose matches are members.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Names explicitly recorded as semantically required for coverage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub must_cover: Option<Vec<String>>,
}

impl ComposeResult {
    /// Compose result for callers without an upstream canonicaliser.
    ///
    /// The canonical tree is the original schema, every node pointer maps to itself and the
    /// contains bag is derived from the schema's own `contains` keywords.
    pub fn identity(schema: &Value) -> Self {
        let mut pointers = BTreeSet::new();
        let mut contains_bag = BTreeMap::new();
        walk_schema(schema, String::new(), &mut pointers, &mut contains_bag);

        let rev_ptr_map = pointers
            .into_iter()
            .map(|p| (p.clone(), vec![p]))
            .collect();

        Self {
            canonical_schema: schema.clone(),
            rev_ptr_map,
            contains_bag,
            coverage_index: BTreeMap::new(),
        }
    }

    /// Origin pointers recorded for a canonical pointer.
    pub fn origins(&self, canon: &str) -> &[String] {
        self.rev_ptr_map
            .get(canon)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn walk_schema(
    node: &Value,
    ptr: String,
    out: &mut BTreeSet<String>,
    contains_bag: &mut BTreeMap<String, Vec<ContainsNeed>>,
) {
    if let Some(contains) = node.get("contains") {
        let min = node.get("minContains").and_then(Value::as_u64).unwrap_or(1);
        let max = node.get("maxContains").and_then(Value::as_u64);
        contains_bag.entry(ptr.clone()).or_default().push(ContainsNeed {
            schema: contains.clone(),
            min,
            max,
        });
    }

    keywords::for_each_subschema(node, |suffix, child| {
        walk_schema(child, format!("{}{}", ptr, suffix), out, contains_bag);
    });
    out.insert(ptr);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_maps_every_node_to_itself() {
        let schema = json!({
            "type": "object",
            "properties": {
                "a/b": {"type": "string"},
                "list": {"type": "array", "items": {"type": "integer"}}
            }
        });
        let compose = ComposeResult::identity(&schema);
        assert_eq!(compose.origins(""), &["".to_string()]);
        assert_eq!(
            compose.origins("/properties/a~1b"),
            &["/properties/a~1b".to_string()]
        );
        assert!(compose.rev_ptr_map.contains_key("/properties/list/items"));
    }

    #[test]
    fn identity_derives_contains_bag() {
        let schema = json!({
            "type": "array",
            "contains": {"const": "x"},
            "minContains": 2,
            "maxContains": 3
        });
        let compose = ComposeResult::identity(&schema);
        let needs = &compose.contains_bag[""];
        assert_eq!(needs.len(), 1);
        assert_eq!(needs[0].min, 2);
        assert_eq!(needs[0].max, Some(3));
        assert_eq!(needs[0].schema, json!({"const": "x"}));
    }

    #[test]
    fn identity_walks_schema_dependencies_only() {
        let schema = json!({
            "dependencies": {"a": ["b"], "c": {"properties": {"d": {}}}}
        });
        let compose = ComposeResult::identity(&schema);
        assert!(compose.rev_ptr_map.contains_key("/dependencies/c/properties/d"));
        assert!(!compose.rev_ptr_map.contains_key("/dependencies/a"));
    }

    #[test]
    fn contains_need_min_defaults_to_one() {
        let need: ContainsNeed = serde_json::from_value(json!({"schema": true})).unwrap();
        assert_eq!(need.min, 1);
        assert_eq!(need.max, None);
    }
}
