//! Repair Action Dispatcher: one pass over the current error list, in a fixed keyword order.
//!
//! Every strategy re-reads the current value at the error's instance path before editing, so an
//! error made stale by an earlier step in the same pass is skipped instead of misapplied.

mod arrays;
mod contains;
mod names;
mod numbers;
mod patterns;
mod required;
mod scalar;
mod strings;

use crate::pointer;
use crate::ports::{CoverageSink, Validator};
use crate::rename::RenameRegistry;
use crate::resolver::PointerResolver;
use schemafix_types::compose::ComposeResult;
use schemafix_types::options::PlanOptions;
use schemafix_types::repair::{ActionKind, DiagnosticEnvelope, RepairAction};
use schemafix_types::validation::{ErrorSignature, Keyword, ValidationError};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};

/// Read-only inputs shared by every item of a batch.
pub(crate) struct RepairEnv<'a> {
    pub schema: &'a Value,
    pub compose: &'a ComposeResult,
    pub plan: &'a PlanOptions,
    pub validator: &'a dyn Validator,
    pub coverage: Option<&'a dyn CoverageSink>,
    /// Some node declares `unevaluatedProperties: false`.
    pub unevaluated_closed: bool,
}

/// Schema location of one error after pointer resolution.
pub(crate) struct Located<'a> {
    pub canon: String,
    pub origin: String,
    /// Schema node that carries the violated keyword.
    pub node: &'a Value,
}

/// Per-item state that survives across passes.
pub(crate) struct ItemSession<'a> {
    pub env: &'a RepairEnv<'a>,
    pub resolver: PointerResolver<'a>,
    pub registry: RenameRegistry,
    pub baseline: BTreeSet<ErrorSignature>,
    pub item_index: usize,
    pub actions: Vec<RepairAction>,
    pub diagnostics: Vec<DiagnosticEnvelope>,
}

impl<'a> ItemSession<'a> {
    pub fn new(env: &'a RepairEnv<'a>, item_index: usize) -> Self {
        Self {
            env,
            resolver: PointerResolver::new(env.schema, env.compose),
            registry: RenameRegistry::default(),
            baseline: BTreeSet::new(),
            item_index,
            actions: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Resolve the schema node that owns the keyword at the end of `schema_path`.
    pub fn locate(&mut self, schema_path: &str, property: Option<&str>) -> Option<Located<'a>> {
        let (parent, _) = pointer::parent(schema_path)?;
        self.locate_node(&parent, property)
    }

    /// Resolve a schema node pointer directly.
    pub fn locate_node(&mut self, schema_ptr: &str, property: Option<&str>) -> Option<Located<'a>> {
        let resolved = self.resolver.resolve(schema_ptr, property);
        let canon = resolved.canon.clone()?;
        let node = self.resolver.origin_node(&resolved)?;
        let node = pointer::deref(self.env.schema, node);
        Some(Located {
            canon,
            origin: resolved.origin,
            node,
        })
    }

    pub fn record(
        &mut self,
        action: ActionKind,
        at: &Located<'_>,
        instance_path: &str,
        details: Value,
    ) {
        self.actions.push(RepairAction {
            action,
            canon_path: at.canon.clone(),
            orig_path: Some(at.origin.clone()),
            instance_path: Some(instance_path.to_string()),
            details: Some(details),
            item_index: self.item_index,
        });
    }

    pub fn diagnose(&mut self, code: &str, canon_path: &str, details: Value) {
        let mut diag = DiagnosticEnvelope::repair(code, canon_path, details);
        diag.item_index = self.item_index;
        self.diagnostics.push(diag);
    }
}

/// Dependent-constraint and `oneOf` signatures present before a pass.
pub(crate) fn baseline_signatures(errors: &[ValidationError]) -> BTreeSet<ErrorSignature> {
    errors
        .iter()
        .filter(|e| {
            let kind = e.kind();
            kind.is_dependent() || kind == Keyword::OneOf
        })
        .map(ValidationError::signature)
        .collect()
}

/// Run the eight steps once. Returns the number of edits applied.
pub(crate) fn run_pass(
    session: &mut ItemSession<'_>,
    working: &mut Value,
    errors: &[ValidationError],
) -> usize {
    let errors = dedupe(errors);
    let mut edits = 0;

    for step in 1..=8u8 {
        let mut batch: Vec<&ValidationError> = errors
            .iter()
            .copied()
            .filter(|e| step_of(e.kind()) == Some(step))
            .collect();
        batch.sort_by_key(|e| within_step(e.kind()));
        if batch.is_empty() {
            continue;
        }
        if step == 8 {
            edits += names::repair(session, working, &batch);
            continue;
        }
        if step == 6 {
            // One contains repair per array covers every obligation sharing it.
            for group in group_by_instance(&batch) {
                edits += usize::from(contains::repair(session, working, &group));
            }
            continue;
        }
        for err in batch {
            let applied = match step {
                1 => scalar::repair(session, working, err),
                2 => required::repair(session, working, err),
                3 => strings::repair(session, working, err),
                4 => arrays::repair(session, working, err),
                5 => numbers::repair(session, working, err),
                _ => patterns::repair(session, working, err),
            };
            edits += usize::from(applied);
        }
    }

    edits
}

fn step_of(kind: Keyword) -> Option<u8> {
    match kind {
        Keyword::Type | Keyword::Enum | Keyword::Const => Some(1),
        Keyword::Required => Some(2),
        Keyword::MinLength | Keyword::MaxLength => Some(3),
        Keyword::UniqueItems | Keyword::MaxItems | Keyword::MinItems => Some(4),
        Keyword::Minimum | Keyword::Maximum | Keyword::ExclusiveMinimum | Keyword::ExclusiveMaximum => {
            Some(5)
        }
        Keyword::Contains | Keyword::MinContains | Keyword::MaxContains => Some(6),
        Keyword::Pattern | Keyword::MultipleOf => Some(7),
        Keyword::PropertyNames | Keyword::AdditionalProperties | Keyword::UnevaluatedProperties => {
            Some(8)
        }
        Keyword::DependentRequired | Keyword::DependentSchemas | Keyword::OneOf | Keyword::Other => {
            None
        }
    }
}

/// Order inside a step. Arrays dedupe before truncating so truncation keeps distinct values.
fn within_step(kind: Keyword) -> u8 {
    match kind {
        Keyword::UniqueItems => 0,
        Keyword::MaxItems => 1,
        Keyword::MinItems => 2,
        _ => 0,
    }
}

/// Errors sharing an instance path, in order of first appearance.
fn group_by_instance<'e>(batch: &[&'e ValidationError]) -> Vec<Vec<&'e ValidationError>> {
    let mut groups: Vec<Vec<&'e ValidationError>> = Vec::new();
    for &err in batch {
        match groups
            .iter_mut()
            .find(|g| g[0].instance_path == err.instance_path)
        {
            Some(group) => group.push(err),
            None => groups.push(vec![err]),
        }
    }
    groups
}

/// Keep the first error per `(keyword, instancePath)`; name-carrying keywords also key on the name.
fn dedupe(errors: &[ValidationError]) -> Vec<&ValidationError> {
    let mut seen = HashSet::new();
    errors
        .iter()
        .filter(|e| {
            let name = ["missingProperty", "additionalProperty", "unevaluatedProperty", "propertyName"]
                .iter()
                .find_map(|k| e.param_str(k))
                .map(str::to_string);
            seen.insert((e.keyword.clone(), e.instance_path.clone(), name))
        })
        .collect()
}

/// Whether the schema path walks through a `propertyNames` subtree.
pub(crate) fn under_property_names(schema_path: &str) -> bool {
    pointer::property_names_index(&pointer::split(schema_path)).is_some()
}

/// `limit` from the schema node, falling back to the error params.
pub(crate) fn limit(node: &Value, keyword: &str, err: &ValidationError) -> Option<f64> {
    node.get(keyword)
        .and_then(Value::as_f64)
        .or_else(|| err.param_f64("limit"))
}
