//! Batch repair pipeline, extracted from the CLI.
//!
//! The entry points are I/O-agnostic: inputs arrive through [`ItemSource`] and
//! artifacts leave through [`WritePort`].

use crate::adapters::{CollectingCoverageSink, PassHistogram};
use crate::ports::{ItemSource, WritePort};
use crate::render::render_report_md;
use crate::settings::{RepairSettings, RunMode};
use anyhow::Context;
use camino::Utf8Path;
use chrono::Utc;
use schemafix_domain::{
    ItemOutcome, JsonSchemaOracle, MetricsSink, OracleError, RepairInput, RepairSinks, Validator,
    repair_item,
};
use schemafix_types::compose::ComposeResult;
use schemafix_types::coverage::CoverageEvent;
use schemafix_types::options::RepairOptions;
use schemafix_types::repair::RepairItemsResult;
use schemafix_types::report::{
    RepairReport, ReportCounts, ReportRunInfo, ReportToolInfo, ReportVerdict,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Error type for pipeline results. Residual errors are not an error: see [`RepairOutcome::exit_code`].
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("compile schema: {0}")]
    Schema(#[from] OracleError),
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

/// Outcome of `run_repair`.
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub result: RepairItemsResult,
    /// Coverage events in item order. Empty unless coverage mode is active.
    pub coverage: Vec<CoverageEvent>,
    pub report: RepairReport,
}

impl RepairOutcome {
    pub fn has_residual(&self) -> bool {
        self.report.verdict.counts.residual > 0
    }

    /// `0` when every item validates, `2` when residual errors remain.
    pub fn exit_code(&self, mode: RunMode) -> u8 {
        match mode {
            RunMode::Standalone if self.has_residual() => 2,
            _ => 0,
        }
    }
}

/// Items repaired by one worker, in index order.
struct Shard {
    outcomes: Vec<ItemOutcome>,
    coverage: Vec<CoverageEvent>,
}

/// Run the repair pipeline over every item the source yields.
///
/// The caller is responsible for writing artifacts (via `WritePort`) or the
/// convenience `write_repair_artifacts` helper.
pub fn run_repair(
    settings: &RepairSettings,
    source: &dyn ItemSource,
    tool: ReportToolInfo,
) -> Result<RepairOutcome, ToolError> {
    let started_at = Utc::now();
    let run_id = Uuid::new_v4().to_string();

    let schema = source.load_schema().context("load schema")?;
    let compose = match source.load_compose().context("load compose result")? {
        Some(compose) => compose,
        None => ComposeResult::identity(&schema),
    };
    let items = source.load_items().context("load items")?;
    let oracle = JsonSchemaOracle::compile(&schema)?;

    let jobs = settings.effective_jobs(items.len());
    info!(run_id = %run_id, items = items.len(), jobs, "repair run started");

    let input = RepairInput {
        schema: &schema,
        compose: &compose,
        plan: &settings.plan,
    };
    let histogram = PassHistogram::default();
    let shards = repair_sharded(items, &input, &settings.options, &oracle, &histogram, jobs)?;

    let mut result = RepairItemsResult::default();
    let mut coverage = Vec::new();
    let mut counts = ReportCounts::default();
    for shard in shards {
        for outcome in shard.outcomes {
            counts.items += 1;
            match (outcome.passes, outcome.is_valid()) {
                (0, true) => counts.already_valid += 1,
                (_, true) => counts.repaired += 1,
                _ => counts.residual += 1,
            }
            result.items.push(outcome.item);
            result.actions.extend(outcome.actions);
            result.diagnostics.extend(outcome.diagnostics);
        }
        coverage.extend(shard.coverage);
    }

    let mut actions_by_kind = BTreeMap::new();
    for action in &result.actions {
        *actions_by_kind
            .entry(action.action.as_str().to_string())
            .or_insert(0u64) += 1;
    }
    let mut diagnostics_by_code = BTreeMap::new();
    for diag in &result.diagnostics {
        *diagnostics_by_code.entry(diag.code.clone()).or_insert(0u64) += 1;
    }

    let ended_at = Utc::now();
    let duration_ms = u64::try_from((ended_at - started_at).num_milliseconds()).unwrap_or(0);
    info!(
        run_id = %run_id,
        repaired = counts.repaired,
        residual = counts.residual,
        duration_ms,
        "repair run finished"
    );

    let report = RepairReport {
        schema: schemafix_types::schema::SCHEMAFIX_REPORT_V1.to_string(),
        tool,
        run: ReportRunInfo {
            run_id,
            started_at: started_at.to_rfc3339(),
            ended_at: Some(ended_at.to_rfc3339()),
            duration_ms: Some(duration_ms),
            jobs,
        },
        verdict: ReportVerdict {
            status: counts.status(),
            counts,
        },
        actions_by_kind,
        diagnostics_by_code,
        pass_histogram: histogram.snapshot(),
    };

    Ok(RepairOutcome {
        result,
        coverage,
        report,
    })
}

/// Split items into contiguous index ranges, one per worker, and repair them on scoped threads
/// sharing the compiled oracle. Shards come back in index order.
fn repair_sharded(
    items: Vec<Value>,
    input: &RepairInput<'_>,
    options: &RepairOptions,
    validator: &dyn Validator,
    metrics: &dyn MetricsSink,
    jobs: usize,
) -> anyhow::Result<Vec<Shard>> {
    let indexed: Vec<(usize, Value)> = items.into_iter().enumerate().collect();
    if jobs <= 1 {
        return Ok(vec![repair_shard(indexed, input, options, validator, metrics)]);
    }

    let size = indexed.len().div_ceil(jobs);
    let mut batches = Vec::with_capacity(jobs);
    let mut rest = indexed.into_iter().peekable();
    while rest.peek().is_some() {
        batches.push(rest.by_ref().take(size).collect::<Vec<_>>());
    }
    debug!(shards = batches.len(), size, "sharding items");

    std::thread::scope(|scope| {
        let handles: Vec<_> = batches
            .into_iter()
            .map(|batch| {
                scope.spawn(move || repair_shard(batch, input, options, validator, metrics))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .map_err(|_| anyhow::anyhow!("repair worker panicked"))
            })
            .collect()
    })
}

fn repair_shard(
    batch: Vec<(usize, Value)>,
    input: &RepairInput<'_>,
    options: &RepairOptions,
    validator: &dyn Validator,
    metrics: &dyn MetricsSink,
) -> Shard {
    let coverage = CollectingCoverageSink::default();
    let outcomes: Vec<ItemOutcome> = {
        let sinks = RepairSinks {
            coverage: Some(&coverage),
            metrics: Some(metrics),
        };
        batch
            .into_iter()
            .map(|(index, item)| repair_item(index, item, input, options, validator, sinks))
            .collect()
    };
    Shard {
        outcomes,
        coverage: coverage.into_events(),
    }
}

fn write_json<T: Serialize + ?Sized>(
    writer: &dyn WritePort,
    path: &Utf8Path,
    value: &T,
) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).with_context(|| format!("serialize {}", path))?;
    writer.write_file(path, json.as_bytes())
}

/// Write `items.json`, `actions.json`, `diagnostics.json`, `coverage.json`,
/// `report.json` and `report.md` under `out_dir`.
pub fn write_repair_artifacts(
    outcome: &RepairOutcome,
    out_dir: &Utf8Path,
    writer: &dyn WritePort,
) -> anyhow::Result<()> {
    writer.create_dir_all(out_dir)?;

    write_json(writer, &out_dir.join("items.json"), &outcome.result.items)?;
    write_json(writer, &out_dir.join("actions.json"), &outcome.result.actions)?;
    write_json(
        writer,
        &out_dir.join("diagnostics.json"),
        &outcome.result.diagnostics,
    )?;
    write_json(writer, &out_dir.join("coverage.json"), &outcome.coverage)?;
    write_json(writer, &out_dir.join("report.json"), &outcome.report)?;

    let md = render_report_md(&outcome.report, &outcome.result.diagnostics);
    writer.write_file(&out_dir.join("report.md"), md.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryItemSource;
    use camino::Utf8PathBuf;
    use pretty_assertions::assert_eq;
    use schemafix_types::codes;
    use schemafix_types::compose::ContainsNeed;
    use schemafix_types::coverage::CoverageMode;
    use schemafix_types::options::CoverageOptions;
    use schemafix_types::report::ReportStatus;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemWritePort {
        files: Mutex<HashMap<String, Vec<u8>>>,
        dirs: Mutex<Vec<String>>,
    }

    impl WritePort for MemWritePort {
        fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
            let key = path.as_str().replace('\\', "/");
            self.files
                .lock()
                .expect("lock files")
                .insert(key, contents.to_vec());
            Ok(())
        }

        fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()> {
            let key = path.as_str().replace('\\', "/");
            self.dirs.lock().expect("lock dirs").push(key);
            Ok(())
        }
    }

    fn tool() -> ReportToolInfo {
        ReportToolInfo {
            name: "schemafix".into(),
            version: "0.0.0-test".into(),
        }
    }

    fn user_schema() -> Value {
        json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": {"type": "string", "minLength": 2},
                "age": {"type": "integer", "minimum": 0}
            }
        })
    }

    fn user_items() -> Vec<Value> {
        vec![
            json!({"name": "ok"}),
            json!({"name": "x", "age": -4}),
            json!({}),
            json!({"name": "fine", "age": 3}),
            json!({"age": 2.0}),
        ]
    }

    fn settings(jobs: usize) -> RepairSettings {
        RepairSettings {
            jobs,
            ..Default::default()
        }
    }

    #[test]
    fn run_repair_counts_items_by_outcome() {
        let source = InMemoryItemSource::new(user_schema(), user_items());
        let outcome = run_repair(&settings(1), &source, tool()).expect("run_repair");

        let counts = &outcome.report.verdict.counts;
        assert_eq!(counts.items, 5);
        assert_eq!(counts.already_valid, 2);
        assert_eq!(counts.repaired, 3);
        assert_eq!(counts.residual, 0);
        assert_eq!(outcome.report.verdict.status, ReportStatus::Pass);
        assert_eq!(outcome.result.items[1], json!({"name": "xa", "age": 0}));
        assert_eq!(outcome.report.pass_histogram.get(&0), Some(&2));
        assert_eq!(outcome.exit_code(RunMode::Standalone), 0);
        assert!(outcome.report.actions_by_kind.contains_key("addRequired"));
    }

    #[test]
    fn sharded_run_matches_sequential_run() {
        let sequential = run_repair(
            &settings(1),
            &InMemoryItemSource::new(user_schema(), user_items()),
            tool(),
        )
        .expect("sequential");
        let sharded = run_repair(
            &settings(3),
            &InMemoryItemSource::new(user_schema(), user_items()),
            tool(),
        )
        .expect("sharded");

        assert_eq!(sharded.report.run.jobs, 3);
        assert_eq!(sharded.result, sequential.result);
        let indices: Vec<usize> = sharded.result.actions.iter().map(|a| a.item_index).collect();
        let mut sorted = indices.clone();
        sorted.sort();
        assert_eq!(indices, sorted);
    }

    #[test]
    fn residual_items_map_to_exit_two_in_standalone_mode() {
        let schema = json!({"allOf": [{"type": "string"}, {"type": "integer"}]});
        let source = InMemoryItemSource::new(schema, vec![json!(1), json!("a")]);
        let outcome = run_repair(&settings(2), &source, tool()).expect("run_repair");

        assert!(outcome.has_residual());
        assert_eq!(outcome.report.verdict.counts.residual, 2);
        assert_eq!(outcome.report.verdict.status, ReportStatus::Fail);
        assert_eq!(outcome.exit_code(RunMode::Standalone), 2);
        assert_eq!(outcome.exit_code(RunMode::Embedded), 0);
        assert_eq!(outcome.result.diagnostics.len(), 2);
        let total: u64 = outcome.report.diagnostics_by_code.values().sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn invalid_schema_is_a_tool_error() {
        let source = InMemoryItemSource::new(json!({"type": 12}), vec![json!(1)]);
        let err = run_repair(&settings(1), &source, tool()).unwrap_err();
        assert!(matches!(err, ToolError::Schema(_)), "{err}");
    }

    #[test]
    fn coverage_events_are_collected_in_item_order() {
        let schema = json!({"type": "object", "required": ["id"]});
        let items = vec![json!({}), json!({"id": 1}), json!({})];
        let mut s = settings(3);
        s.options = RepairOptions {
            coverage: CoverageOptions {
                mode: CoverageMode::Measure,
            },
            ..Default::default()
        };
        let outcome =
            run_repair(&s, &InMemoryItemSource::new(schema, items), tool()).expect("run_repair");
        assert_eq!(outcome.coverage.len(), 2);
        assert!(outcome.coverage.iter().all(|e| e.kind == "PROPERTY_PRESENT"));
    }

    #[test]
    fn supplied_compose_result_is_used() {
        let schema = json!({"type": "array", "contains": {"const": 1}});
        let compose = ComposeResult {
            canonical_schema: schema.clone(),
            rev_ptr_map: [(String::new(), vec![String::new()])].into_iter().collect(),
            contains_bag: [(
                String::new(),
                vec![ContainsNeed {
                    schema: json!({"const": 1}),
                    min: 2,
                    max: None,
                }],
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        };
        let source = InMemoryItemSource::new(schema, vec![json!([])]).with_compose(compose);
        let outcome = run_repair(&settings(1), &source, tool()).expect("run_repair");
        // The composed obligation asks for two matches where the schema alone needs one.
        assert_eq!(outcome.result.items[0], json!([1, 1]));
    }

    #[test]
    fn budget_exhaustion_is_reported() {
        let mut s = settings(1);
        s.options.attempts = Some(0);
        let source = InMemoryItemSource::new(json!({"type": "string"}), vec![json!(5)]);
        let outcome = run_repair(&s, &source, tool()).expect("run_repair");
        assert_eq!(
            outcome.report.diagnostics_by_code.get(codes::UNSAT_BUDGET_EXHAUSTED),
            Some(&1)
        );
    }

    #[test]
    fn empty_batch_passes() {
        let source = InMemoryItemSource::new(user_schema(), vec![]);
        let outcome = run_repair(&settings(4), &source, tool()).expect("run_repair");
        assert_eq!(outcome.report.verdict.counts.items, 0);
        assert_eq!(outcome.report.run.jobs, 1);
        assert_eq!(outcome.exit_code(RunMode::Standalone), 0);
    }

    #[test]
    fn write_repair_artifacts_writes_expected_files() {
        let source = InMemoryItemSource::new(user_schema(), user_items());
        let outcome = run_repair(&settings(1), &source, tool()).expect("run_repair");

        let writer = MemWritePort::default();
        let out_dir = Utf8PathBuf::from("out");
        write_repair_artifacts(&outcome, &out_dir, &writer).expect("write artifacts");

        let files = writer.files.lock().expect("files");
        for name in [
            "items.json",
            "actions.json",
            "diagnostics.json",
            "coverage.json",
            "report.json",
            "report.md",
        ] {
            assert!(files.contains_key(&format!("out/{name}")), "missing {name}");
        }
        assert_eq!(*writer.dirs.lock().expect("dirs"), vec!["out".to_string()]);

        let report: Value = serde_json::from_slice(&files["out/report.json"]).expect("report");
        assert_eq!(report["schema"], schemafix_types::schema::SCHEMAFIX_REPORT_V1);
        assert_eq!(report["verdict"]["counts"]["items"], json!(5));

        let items: Value = serde_json::from_slice(&files["out/items.json"]).expect("items");
        assert_eq!(items.as_array().map(Vec::len), Some(5));

        let md = String::from_utf8(files["out/report.md"].clone()).expect("utf8");
        assert!(md.starts_with("# schemafix report\n"));
        assert!(md.contains("_No diagnostics._"));
    }
}
