use schemafix_types::coverage::CoverageEvent;
use schemafix_types::validation::ValidationError;
use serde_json::Value;

/// Schema oracle compiled once and shared read-only by every worker.
///
/// schemafix-domain only talks to the validator through this trait so strategies can be tested
/// against scripted oracles as well as the real `jsonschema` adapter.
pub trait Validator: Send + Sync {
    /// Structured violations for `instance`, normalised to one error per offending name.
    fn validate(&self, instance: &Value) -> Vec<ValidationError>;

    /// Whether `instance` satisfies `schema`, a sub-schema of the compiled root.
    fn is_match(&self, schema: &Value, instance: &Value) -> bool;

    fn is_valid(&self, instance: &Value) -> bool {
        self.validate(instance).is_empty()
    }
}

/// Receives coverage hits produced by repairs. Failures are swallowed by the engine.
pub trait CoverageSink: Send + Sync {
    fn emit(&self, event: CoverageEvent) -> anyhow::Result<()>;
}

/// Receives the number of passes spent per item.
pub trait MetricsSink: Send + Sync {
    fn record_passes(&self, item_index: usize, passes: u32);
}
