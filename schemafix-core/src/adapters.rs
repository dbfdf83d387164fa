//! Default filesystem-backed port implementations, plus collecting sinks.

use crate::ports::{ItemSource, WritePort};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use glob::glob;
use schemafix_domain::{CoverageSink, MetricsSink};
use schemafix_types::compose::ComposeResult;
use schemafix_types::coverage::CoverageEvent;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Loads inputs from disk.
///
/// `items_path` may be a JSON array file, a JSON Lines file (`.jsonl` / `.ndjson`),
/// or a directory whose `*.json` files each hold one item (sorted by path).
#[derive(Debug, Clone)]
pub struct FsItemSource {
    pub schema_path: Utf8PathBuf,
    pub compose_path: Option<Utf8PathBuf>,
    pub items_path: Utf8PathBuf,
}

impl FsItemSource {
    pub fn new(schema_path: Utf8PathBuf, items_path: Utf8PathBuf) -> Self {
        Self {
            schema_path,
            compose_path: None,
            items_path,
        }
    }

    pub fn with_compose(mut self, compose_path: Utf8PathBuf) -> Self {
        self.compose_path = Some(compose_path);
        self
    }
}

fn read_json(path: &Utf8Path) -> anyhow::Result<Value> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).with_context(|| format!("parse JSON {}", path))
}

fn is_json_lines(path: &Utf8Path) -> bool {
    matches!(path.extension(), Some("jsonl" | "ndjson"))
}

fn parse_json_lines(path: &Utf8Path, text: &str) -> anyhow::Result<Vec<Value>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("parse {} line {}", path, n + 1))
        })
        .collect()
}

fn load_item_dir(dir: &Utf8Path) -> anyhow::Result<Vec<Value>> {
    let pattern = dir.join("*.json");
    debug!(pattern = %pattern, "scanning directory for items");

    let mut paths = Vec::new();
    for entry in glob(pattern.as_str()).context("glob *.json")? {
        let path = entry.map_err(|e| anyhow::anyhow!("glob error: {e}"))?;
        paths.push(Utf8PathBuf::from(path.to_string_lossy().to_string()));
    }
    // Deterministic order matters: item indices follow it.
    paths.sort();
    paths.iter().map(|p| read_json(p)).collect()
}

impl ItemSource for FsItemSource {
    fn load_schema(&self) -> anyhow::Result<Value> {
        read_json(&self.schema_path).with_context(|| format!("load schema {}", self.schema_path))
    }

    fn load_compose(&self) -> anyhow::Result<Option<ComposeResult>> {
        let Some(path) = &self.compose_path else {
            return Ok(None);
        };
        let text = fs::read_to_string(path)?;
        let compose = serde_json::from_str(&text)
            .with_context(|| format!("parse compose result {}", path))?;
        Ok(Some(compose))
    }

    fn load_items(&self) -> anyhow::Result<Vec<Value>> {
        let path = &self.items_path;
        if path.is_dir() {
            return load_item_dir(path).with_context(|| format!("load items from {}", path));
        }
        let text = fs::read_to_string(path)?;
        if is_json_lines(path) {
            return parse_json_lines(path, &text);
        }
        match serde_json::from_str(&text).with_context(|| format!("parse items {}", path))? {
            Value::Array(items) => Ok(items),
            other => anyhow::bail!(
                "{} must hold a JSON array of items, found {}",
                path,
                json_kind(&other)
            ),
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// In-memory item source for embedding and testing.
#[derive(Debug, Clone)]
pub struct InMemoryItemSource {
    schema: Value,
    compose: Option<ComposeResult>,
    items: Vec<Value>,
}

impl InMemoryItemSource {
    pub fn new(schema: Value, items: Vec<Value>) -> Self {
        Self {
            schema,
            compose: None,
            items,
        }
    }

    pub fn with_compose(mut self, compose: ComposeResult) -> Self {
        self.compose = Some(compose);
        self
    }
}

impl ItemSource for InMemoryItemSource {
    fn load_schema(&self) -> anyhow::Result<Value> {
        Ok(self.schema.clone())
    }

    fn load_compose(&self) -> anyhow::Result<Option<ComposeResult>> {
        Ok(self.compose.clone())
    }

    fn load_items(&self) -> anyhow::Result<Vec<Value>> {
        Ok(self.items.clone())
    }
}

/// Filesystem write operations.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }
        fs::write(path, contents).with_context(|| format!("write {}", path))
    }

    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()> {
        fs::create_dir_all(path).with_context(|| format!("create_dir_all {}", path))
    }
}

// A panicked worker must not hide the events other workers collected.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Coverage sink that keeps every event in emission order.
#[derive(Debug, Default)]
pub struct CollectingCoverageSink {
    events: Mutex<Vec<CoverageEvent>>,
}

impl CollectingCoverageSink {
    pub fn into_events(self) -> Vec<CoverageEvent> {
        self.events
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CoverageSink for CollectingCoverageSink {
    fn emit(&self, event: CoverageEvent) -> anyhow::Result<()> {
        lock(&self.events).push(event);
        Ok(())
    }
}

/// Metrics sink building a histogram of passes per item.
#[derive(Debug, Default)]
pub struct PassHistogram {
    counts: Mutex<BTreeMap<u32, u64>>,
}

impl PassHistogram {
    pub fn snapshot(&self) -> BTreeMap<u32, u64> {
        lock(&self.counts).clone()
    }
}

impl MetricsSink for PassHistogram {
    fn record_passes(&self, _item_index: usize, passes: u32) {
        *lock(&self.counts).entry(passes).or_default() += 1;
    }
}
