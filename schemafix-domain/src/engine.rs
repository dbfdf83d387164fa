//! Fixpoint Driver: validate, dispatch one pass, re-validate, until done or out of budget.

use crate::ports::{CoverageSink, MetricsSink, Validator};
use crate::strategies::{self, ItemSession, RepairEnv};
use schemafix_types::codes;
use schemafix_types::compose::ComposeResult;
use schemafix_types::keywords;
use schemafix_types::options::{PlanOptions, RepairOptions};
use schemafix_types::repair::{DiagnosticEnvelope, RepairAction, RepairItemsResult};
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Schema-side inputs of a repair call.
#[derive(Debug, Clone, Copy)]
pub struct RepairInput<'a> {
    /// Original (pre-canonicalization) schema.
    pub schema: &'a Value,
    pub compose: &'a ComposeResult,
    pub plan: &'a PlanOptions,
}

/// Optional observers. Neither can influence the repair outcome.
#[derive(Clone, Copy, Default)]
pub struct RepairSinks<'a> {
    pub coverage: Option<&'a dyn CoverageSink>,
    pub metrics: Option<&'a dyn MetricsSink>,
}

/// Result for one item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    pub item: Value,
    pub actions: Vec<RepairAction>,
    pub diagnostics: Vec<DiagnosticEnvelope>,
    /// Passes spent; `0` when the item was already valid.
    pub passes: u32,
    /// Errors left after the last pass.
    pub residual_errors: usize,
}

impl ItemOutcome {
    pub fn is_valid(&self) -> bool {
        self.residual_errors == 0
    }
}

/// Repair every item in order. Output cardinality always equals input cardinality.
pub fn repair_items(
    items: Vec<Value>,
    input: &RepairInput<'_>,
    options: &RepairOptions,
    validator: &dyn Validator,
    sinks: RepairSinks<'_>,
) -> RepairItemsResult {
    let mut out = RepairItemsResult::default();
    for (index, item) in items.into_iter().enumerate() {
        let outcome = repair_item(index, item, input, options, validator, sinks);
        out.items.push(outcome.item);
        out.actions.extend(outcome.actions);
        out.diagnostics.extend(outcome.diagnostics);
    }
    out
}

/// Repair one item. `index` tags every action and diagnostic.
pub fn repair_item(
    index: usize,
    item: Value,
    input: &RepairInput<'_>,
    options: &RepairOptions,
    validator: &dyn Validator,
    sinks: RepairSinks<'_>,
) -> ItemOutcome {
    let mut errors = validator.validate(&item);
    if errors.is_empty() {
        if let Some(metrics) = sinks.metrics {
            metrics.record_passes(index, 0);
        }
        return ItemOutcome {
            item,
            actions: Vec::new(),
            diagnostics: Vec::new(),
            passes: 0,
            residual_errors: 0,
        };
    }

    let env = RepairEnv {
        schema: input.schema,
        compose: input.compose,
        plan: input.plan,
        validator,
        coverage: sinks.coverage.filter(|_| options.coverage.mode.is_active()),
        unevaluated_closed: has_closed_unevaluated(input.schema),
    };
    let mut session = ItemSession::new(&env, index);
    let cap = options.pass_cap(input.plan);
    let mut working = item;
    let mut cycles = 0u32;
    let mut stall = None;

    while cycles < cap {
        session.baseline = strategies::baseline_signatures(&errors);
        let edits = strategies::run_pass(&mut session, &mut working, &errors);
        cycles += 1;

        let previous = errors.len();
        errors = validator.validate(&working);
        debug!(item = index, pass = cycles, edits, errors = errors.len(), "repair pass");

        if errors.is_empty() {
            break;
        }
        if edits == 0 {
            stall = Some("noEdit");
            break;
        }
        // Conservative: a pass that trades errors without reducing the count ends the loop,
        // even when a later pass might have converged.
        if errors.len() >= previous {
            stall = Some("noProgress");
            break;
        }
    }

    let residual = errors.len();
    if residual > 0 {
        if cycles >= cap {
            warn!(item = index, cycles, errors = residual, "repair budget exhausted");
            session.diagnose(
                codes::UNSAT_BUDGET_EXHAUSTED,
                "",
                json!({"cycles": cycles, "errors": residual}),
            );
        } else {
            let reason = stall.unwrap_or("noProgress");
            debug!(item = index, cycles, errors = residual, reason, "repair stalled");
            session.diagnose(
                codes::REPAIR_STALLED,
                "",
                json!({"reason": reason, "cycles": cycles, "errors": residual}),
            );
        }
    }

    if let Some(metrics) = sinks.metrics {
        metrics.record_passes(index, cycles);
    }

    ItemOutcome {
        item: working,
        actions: session.actions,
        diagnostics: session.diagnostics,
        passes: cycles,
        residual_errors: residual,
    }
}

/// Whether any schema node declares `unevaluatedProperties: false`.
pub(crate) fn has_closed_unevaluated(schema: &Value) -> bool {
    if schema.get("unevaluatedProperties") == Some(&Value::Bool(false)) {
        return true;
    }
    let mut found = false;
    keywords::for_each_subschema(schema, |_, child| {
        found = found || has_closed_unevaluated(child);
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::JsonSchemaOracle;
    use schemafix_types::repair::ActionKind;
    use schemafix_types::validation::ValidationError;
    use std::sync::Mutex;

    fn repair_one(schema: &Value, item: Value, options: &RepairOptions) -> ItemOutcome {
        let compose = ComposeResult::identity(schema);
        let plan = PlanOptions::default();
        let oracle = JsonSchemaOracle::compile(schema).unwrap();
        let input = RepairInput {
            schema,
            compose: &compose,
            plan: &plan,
        };
        repair_item(0, item, &input, options, &oracle, RepairSinks::default())
    }

    #[derive(Default)]
    struct Passes(Mutex<Vec<(usize, u32)>>);

    impl MetricsSink for Passes {
        fn record_passes(&self, item_index: usize, passes: u32) {
            self.0.lock().unwrap().push((item_index, passes));
        }
    }

    /// Reports the same error forever and never matches anything.
    struct Stubborn;

    impl Validator for Stubborn {
        fn validate(&self, _instance: &Value) -> Vec<ValidationError> {
            vec![ValidationError::new("not", "", "/not")]
        }

        fn is_match(&self, _schema: &Value, _instance: &Value) -> bool {
            false
        }
    }

    #[test]
    fn valid_items_pass_through_untouched() {
        let schema = json!({"type": "object", "properties": {"a": {"type": "integer"}}});
        let item = json!({"a": 1, "extra": [1.5, "x"]});
        let out = repair_one(&schema, item.clone(), &RepairOptions::default());
        assert_eq!(out.item, item);
        assert!(out.actions.is_empty());
        assert_eq!(out.passes, 0);
    }

    #[test]
    fn rename_then_delete_reaches_a_valid_object() {
        let schema = json!({
            "type": "object",
            "propertyNames": {"enum": ["a", "b", "c"]},
            "additionalProperties": false
        });
        let out = repair_one(&schema, json!({"z": 1}), &RepairOptions::default());
        assert_eq!(out.actions[0].action, ActionKind::RenameProperty);
        assert_eq!(out.actions[0].details, Some(json!({"from": "z", "to": "a"})));
        assert!(out.is_valid());
    }

    #[test]
    fn zero_cap_reports_budget_exhaustion() {
        let schema = json!({"type": "string"});
        let options = RepairOptions {
            attempts: Some(0),
            ..Default::default()
        };
        let out = repair_one(&schema, json!(5), &options);
        assert_eq!(out.item, json!(5));
        assert_eq!(out.passes, 0);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].code, codes::UNSAT_BUDGET_EXHAUSTED);
        assert_eq!(out.diagnostics[0].details, json!({"cycles": 0, "errors": 1}));
    }

    #[test]
    fn unrepairable_errors_stall_without_edits() {
        let schema = json!({});
        let compose = ComposeResult::identity(&schema);
        let plan = PlanOptions::default();
        let input = RepairInput {
            schema: &schema,
            compose: &compose,
            plan: &plan,
        };
        let metrics = Passes::default();
        let sinks = RepairSinks {
            metrics: Some(&metrics),
            ..Default::default()
        };
        let out = repair_item(3, json!(1), &input, &RepairOptions::default(), &Stubborn, sinks);
        assert_eq!(out.passes, 1);
        assert_eq!(out.diagnostics[0].code, codes::REPAIR_STALLED);
        assert_eq!(out.diagnostics[0].details["reason"], json!("noEdit"));
        assert_eq!(out.diagnostics[0].item_index, 3);
        assert_eq!(*metrics.0.lock().unwrap(), vec![(3, 1)]);
    }

    #[test]
    fn closed_unevaluated_detection_is_deep() {
        assert!(has_closed_unevaluated(
            &json!({"allOf": [{"unevaluatedProperties": false}]})
        ));
        assert!(!has_closed_unevaluated(&json!({"unevaluatedProperties": {}})));
        // A property that happens to carry the keyword's name is not the keyword.
        assert!(!has_closed_unevaluated(
            &json!({"properties": {"unevaluatedProperties": false}})
        ));
        assert!(!has_closed_unevaluated(
            &json!({"const": {"unevaluatedProperties": false}})
        ));
    }
}
