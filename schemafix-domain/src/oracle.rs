//! `jsonschema`-backed [`Validator`] that reports errors in the engine's normalised shape.

use crate::pointer;
use crate::ports::Validator;
use regex::{Regex, RegexBuilder};
use schemafix_types::validation::ValidationError;
use serde_json::{Value, json};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tracing::debug;

const REGEX_SIZE_LIMIT: usize = 1 << 20;
const MAX_EVAL_DEPTH: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("schema failed to compile: {0}")]
    Compile(String),
}

/// Root validator plus a cache of compiled sub-schema validators.
pub struct JsonSchemaOracle {
    root: Value,
    validator: jsonschema::Validator,
    sub_cache: Mutex<HashMap<String, Arc<jsonschema::Validator>>>,
}

impl std::fmt::Debug for JsonSchemaOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaOracle")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl JsonSchemaOracle {
    pub fn compile(schema: &Value) -> Result<Self, OracleError> {
        let validator =
            jsonschema::validator_for(schema).map_err(|e| OracleError::Compile(e.to_string()))?;
        Ok(Self {
            root: schema.clone(),
            validator,
            sub_cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn schema(&self) -> &Value {
        &self.root
    }

    fn sub_validator(&self, schema: &Value) -> Option<Arc<jsonschema::Validator>> {
        let wrapped = self.wrap_subschema(schema);
        let key = wrapped.to_string();
        let mut cache = self
            .sub_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(hit) = cache.get(&key) {
            return Some(Arc::clone(hit));
        }
        match jsonschema::validator_for(&wrapped) {
            Ok(v) => {
                let v = Arc::new(v);
                cache.insert(key, Arc::clone(&v));
                Some(v)
            }
            Err(e) => {
                debug!(error = %e, "sub-schema failed to compile");
                None
            }
        }
    }

    /// Carry the root's definitions and dialect so local `$ref`s keep resolving.
    fn wrap_subschema(&self, schema: &Value) -> Value {
        let Value::Object(map) = schema else {
            return schema.clone();
        };
        let mut out = map.clone();
        for key in ["$schema", "$defs", "definitions"] {
            if let Some(v) = self.root.get(key)
                && !out.contains_key(key)
            {
                out.insert(key.to_string(), v.clone());
            }
        }
        Value::Object(out)
    }

    fn normalise(
        &self,
        instance: &Value,
        instance_path: &str,
        schema_path: &str,
    ) -> Vec<ValidationError> {
        let tokens = pointer::split(schema_path);
        let Some(kw_idx) = pointer::keyword_index(&tokens) else {
            return vec![ValidationError::new("other", instance_path, schema_path)];
        };

        if let Some(pn_idx) = pointer::property_names_index(&tokens) {
            let object_schema = pointer::join(&tokens[..pn_idx]);
            return self.property_names_errors(instance, instance_path, &object_schema);
        }

        let keyword = tokens[kw_idx].clone();
        let keyword_ptr = pointer::join(&tokens[..=kw_idx]);
        let parent_ptr = pointer::join(&tokens[..kw_idx]);
        let parent = pointer::resolve_schema(&self.root, &parent_ptr).map(|(n, _)| n);
        let node = parent.and_then(|p| p.get(&keyword));
        let current = pointer::get(instance, instance_path);
        let base = || ValidationError::new(keyword.clone(), instance_path, keyword_ptr.clone());

        match keyword.as_str() {
            "required" => {
                let names = node.and_then(Value::as_array).cloned().unwrap_or_default();
                let Some(obj) = current.and_then(Value::as_object) else {
                    return vec![base()];
                };
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|n| !obj.contains_key(*n))
                    .map(|n| base().with_param("missingProperty", json!(n)))
                    .collect()
            }
            "additionalProperties" => {
                let (Some(obj), Some(parent)) = (current.and_then(Value::as_object), parent) else {
                    return vec![base()];
                };
                let names: Vec<&String> =
                    obj.keys().filter(|k| !declared_by(parent, k)).collect();
                if names.is_empty() {
                    return vec![base()];
                }
                names
                    .into_iter()
                    .map(|n| base().with_param("additionalProperty", json!(n)))
                    .collect()
            }
            "unevaluatedProperties" => {
                let (Some(value), Some(parent)) = (current, parent) else {
                    return vec![base()];
                };
                let Some(obj) = value.as_object() else {
                    return vec![base()];
                };
                let mut evaluated = BTreeSet::new();
                self.collect_evaluated(parent, value, &mut evaluated, 0);
                let names: Vec<&String> =
                    obj.keys().filter(|k| !evaluated.contains(k.as_str())).collect();
                if names.is_empty() {
                    return vec![base()];
                }
                names
                    .into_iter()
                    .map(|n| base().with_param("unevaluatedProperty", json!(n)))
                    .collect()
            }
            _ => {
                let mut err = base();
                if let Some(node) = node {
                    let param = match keyword.as_str() {
                        "type" => Some("type"),
                        "enum" => Some("allowedValues"),
                        "const" => Some("allowedValue"),
                        "pattern" => Some("pattern"),
                        "multipleOf" => Some("multipleOf"),
                        "minLength" | "maxLength" | "minItems" | "maxItems" | "minimum"
                        | "maximum" | "exclusiveMinimum" | "exclusiveMaximum" | "minContains"
                        | "maxContains" | "minProperties" | "maxProperties" => Some("limit"),
                        _ => None,
                    };
                    if let Some(param) = param {
                        err = err.with_param(param, node.clone());
                    }
                }
                vec![err]
            }
        }
    }

    /// One error per key of the object that fails the `propertyNames` sub-schema.
    fn property_names_errors(
        &self,
        instance: &Value,
        instance_path: &str,
        object_schema: &str,
    ) -> Vec<ValidationError> {
        let schema_path = pointer::child(object_schema, "propertyNames");
        let Some((names_schema, _)) = pointer::resolve_schema(&self.root, &schema_path) else {
            return vec![ValidationError::new("propertyNames", instance_path, schema_path)];
        };

        // The crate reports either the object or the offending key; try both.
        let mut candidates = vec![instance_path.to_string()];
        if let Some((parent, _)) = pointer::parent(instance_path) {
            candidates.push(parent);
        }
        for object_ptr in candidates {
            let Some(obj) = pointer::get(instance, &object_ptr).and_then(Value::as_object) else {
                continue;
            };
            let offending: Vec<ValidationError> = obj
                .keys()
                .filter(|k| !self.is_match(names_schema, &Value::String((*k).clone())))
                .map(|k| {
                    ValidationError::new("propertyNames", object_ptr.clone(), schema_path.clone())
                        .with_param("propertyName", json!(k))
                })
                .collect();
            if !offending.is_empty() {
                return offending;
            }
        }
        vec![ValidationError::new("propertyNames", instance_path, schema_path)]
    }

    /// Names some applicable sub-schema evaluates. Failing `anyOf`/`oneOf` branches and the
    /// untaken side of `if` contribute nothing.
    fn collect_evaluated(
        &self,
        node: &Value,
        instance: &Value,
        out: &mut BTreeSet<String>,
        depth: usize,
    ) {
        if depth > MAX_EVAL_DEPTH {
            return;
        }
        let Some(obj) = instance.as_object() else {
            return;
        };
        let opens_all = node.get("additionalProperties").is_some()
            || node
                .get("unevaluatedProperties")
                .is_some_and(|u| u != &Value::Bool(false));
        if opens_all {
            out.extend(obj.keys().cloned());
            return;
        }
        for key in obj.keys() {
            if declared_by(node, key) {
                out.insert(key.clone());
            }
        }
        if let Some(target) = node.get("$ref").and_then(Value::as_str)
            && let Some((resolved, _)) = target
                .strip_prefix('#')
                .and_then(|local| pointer::resolve_schema(&self.root, local))
        {
            self.collect_evaluated(resolved, instance, out, depth + 1);
        }
        if let Some(all) = node.get("allOf").and_then(Value::as_array) {
            for branch in all {
                self.collect_evaluated(branch, instance, out, depth + 1);
            }
        }
        for key in ["anyOf", "oneOf"] {
            if let Some(branches) = node.get(key).and_then(Value::as_array) {
                for branch in branches.iter().filter(|b| self.is_match(b, instance)) {
                    self.collect_evaluated(branch, instance, out, depth + 1);
                }
            }
        }
        if let Some(cond) = node.get("if") {
            if self.is_match(cond, instance) {
                self.collect_evaluated(cond, instance, out, depth + 1);
                if let Some(then) = node.get("then") {
                    self.collect_evaluated(then, instance, out, depth + 1);
                }
            } else if let Some(otherwise) = node.get("else") {
                self.collect_evaluated(otherwise, instance, out, depth + 1);
            }
        }
        if let Some(deps) = node.get("dependentSchemas").and_then(Value::as_object) {
            for (name, dep) in deps {
                if obj.contains_key(name) {
                    self.collect_evaluated(dep, instance, out, depth + 1);
                }
            }
        }
    }
}

impl Validator for JsonSchemaOracle {
    fn validate(&self, instance: &Value) -> Vec<ValidationError> {
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        for err in self.validator.iter_errors(instance) {
            let instance_path = err.instance_path().to_string();
            let schema_path = err.schema_path().to_string();
            for normalised in self.normalise(instance, &instance_path, &schema_path) {
                let key = (
                    normalised.keyword.clone(),
                    normalised.instance_path.clone(),
                    normalised.schema_path.clone(),
                    Value::Object(normalised.params.clone()).to_string(),
                );
                if seen.insert(key) {
                    out.push(normalised);
                }
            }
        }
        out
    }

    fn is_match(&self, schema: &Value, instance: &Value) -> bool {
        match schema {
            Value::Bool(b) => *b,
            _ => self
                .sub_validator(schema)
                .is_some_and(|v| v.is_valid(instance)),
        }
    }

    fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }
}

/// Whether `name` is covered by `properties` or `patternProperties` of `node`.
fn declared_by(node: &Value, name: &str) -> bool {
    if node
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|p| p.contains_key(name))
    {
        return true;
    }
    node.get("patternProperties")
        .and_then(Value::as_object)
        .is_some_and(|pp| {
            pp.keys()
                .filter_map(|p| compile_regex(p))
                .any(|re| re.is_match(name))
        })
}

fn compile_regex(pattern: &str) -> Option<Regex> {
    RegexBuilder::new(pattern)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_reports_each_missing_name() {
        let schema = json!({"type": "object", "required": ["a", "b", "c"]});
        let oracle = JsonSchemaOracle::compile(&schema).unwrap();
        let errors = oracle.validate(&json!({"b": 1}));
        let missing: Vec<&str> = errors
            .iter()
            .filter(|e| e.keyword == "required")
            .filter_map(|e| e.param_str("missingProperty"))
            .collect();
        assert_eq!(missing, vec!["a", "c"]);
    }

    #[test]
    fn additional_and_property_names_are_per_name() {
        let schema = json!({
            "type": "object",
            "properties": {"a": {}},
            "propertyNames": {"enum": ["a", "b"]},
            "additionalProperties": false
        });
        let oracle = JsonSchemaOracle::compile(&schema).unwrap();
        let errors = oracle.validate(&json!({"a": 1, "z": 2}));

        let extra: Vec<&str> = errors
            .iter()
            .filter(|e| e.keyword == "additionalProperties")
            .filter_map(|e| e.param_str("additionalProperty"))
            .collect();
        assert_eq!(extra, vec!["z"]);

        let names: Vec<&ValidationError> =
            errors.iter().filter(|e| e.keyword == "propertyNames").collect();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].param_str("propertyName"), Some("z"));
        assert_eq!(names[0].instance_path, "");
        assert_eq!(names[0].schema_path, "/propertyNames");
    }

    #[test]
    fn limits_come_from_the_schema_node() {
        let schema = json!({"properties": {"n": {"type": "string", "minLength": 3}}});
        let oracle = JsonSchemaOracle::compile(&schema).unwrap();
        let errors = oracle.validate(&json!({"n": "a"}));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].keyword, "minLength");
        assert_eq!(errors[0].instance_path, "/n");
        assert_eq!(errors[0].schema_path, "/properties/n/minLength");
        assert_eq!(errors[0].param_f64("limit"), Some(3.0));
    }

    #[test]
    fn sub_schema_matches_resolve_root_defs() {
        let schema = json!({
            "$defs": {"x": {"const": "x"}},
            "type": "array",
            "contains": {"$ref": "#/$defs/x"}
        });
        let oracle = JsonSchemaOracle::compile(&schema).unwrap();
        assert!(oracle.is_match(&json!({"$ref": "#/$defs/x"}), &json!("x")));
        assert!(!oracle.is_match(&json!({"$ref": "#/$defs/x"}), &json!("y")));
        assert!(oracle.is_match(&json!(true), &json!(1)));
    }

    #[test]
    fn unevaluated_ignores_failing_branches() {
        let schema = json!({
            "type": "object",
            "anyOf": [
                {"properties": {"a": {"const": 1}}, "required": ["a"]},
                {"properties": {"b": {"type": "string"}}, "required": ["b"]}
            ],
            "unevaluatedProperties": false
        });
        let oracle = JsonSchemaOracle::compile(&schema).unwrap();
        let errors = oracle.validate(&json!({"a": 1, "b": 2}));
        let names: Vec<&str> = errors
            .iter()
            .filter(|e| e.keyword == "unevaluatedProperties")
            .filter_map(|e| e.param_str("unevaluatedProperty"))
            .collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn compile_failure_is_reported() {
        let err = JsonSchemaOracle::compile(&json!({"type": 12})).unwrap_err();
        assert!(matches!(err, OracleError::Compile(_)));
    }
}
