//! Port traits abstracting all I/O away from the pipeline.

use camino::Utf8Path;
use schemafix_types::compose::ComposeResult;
use serde_json::Value;

/// Source of the schema, the optional compose result, and the items to repair.
pub trait ItemSource {
    fn load_schema(&self) -> anyhow::Result<Value>;

    /// `None` when no upstream canonicaliser ran.
    fn load_compose(&self) -> anyhow::Result<Option<ComposeResult>>;

    /// Items in batch order.
    fn load_items(&self) -> anyhow::Result<Vec<Value>>;
}

/// File-system write operations.
pub trait WritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()>;
}
