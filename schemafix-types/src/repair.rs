use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of edit recorded by a [`RepairAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    CoerceType,
    SnapEnum,
    SetConst,
    AddRequired,
    PadString,
    TruncateString,
    DedupeArray,
    TruncateArray,
    GrowArray,
    ClampMinimum,
    ClampMaximum,
    NudgeExclusiveMinimum,
    NudgeExclusiveMaximum,
    ContainsAdd,
    ContainsRemove,
    PatternLiteral,
    RoundMultipleOf,
    RenameProperty,
    DeleteProperty,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::CoerceType => "coerceType",
            ActionKind::SnapEnum => "snapEnum",
            ActionKind::SetConst => "setConst",
            ActionKind::AddRequired => "addRequired",
            ActionKind::PadString => "padString",
            ActionKind::TruncateString => "truncateString",
            ActionKind::DedupeArray => "dedupeArray",
            ActionKind::TruncateArray => "truncateArray",
            ActionKind::GrowArray => "growArray",
            ActionKind::ClampMinimum => "clampMinimum",
            ActionKind::ClampMaximum => "clampMaximum",
            ActionKind::NudgeExclusiveMinimum => "nudgeExclusiveMinimum",
            ActionKind::NudgeExclusiveMaximum => "nudgeExclusiveMaximum",
            ActionKind::ContainsAdd => "containsAdd",
            ActionKind::ContainsRemove => "containsRemove",
            ActionKind::PatternLiteral => "patternLiteral",
            ActionKind::RoundMultipleOf => "roundMultipleOf",
            ActionKind::RenameProperty => "renameProperty",
            ActionKind::DeleteProperty => "deleteProperty",
        }
    }
}

/// Audit record of one applied edit. One per successful mutation, not per attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairAction {
    pub action: ActionKind,
    pub canon_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orig_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,

    /// Index of the item in the batch this action belongs to.
    #[serde(default)]
    pub item_index: usize,
}

/// Pipeline phase that produced a diagnostic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Repair,
}

/// A structured, non-fatal notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticEnvelope {
    pub code: String,
    pub canon_path: String,
    pub phase: Phase,

    #[serde(default)]
    pub details: Value,

    #[serde(default)]
    pub item_index: usize,
}

impl DiagnosticEnvelope {
    pub fn repair(code: &str, canon_path: &str, details: Value) -> Self {
        Self {
            code: code.to_string(),
            canon_path: canon_path.to_string(),
            phase: Phase::Repair,
            details,
            item_index: 0,
        }
    }
}

/// Output of one batch repair call. `items` preserves input order and cardinality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairItemsResult {
    pub items: Vec<Value>,

    #[serde(default)]
    pub diagnostics: Vec<DiagnosticEnvelope>,

    #[serde(default)]
    pub actions: Vec<RepairAction>,
}

impl RepairItemsResult {
    /// Append another result, keeping item order and re-sorting logs by item index.
    pub fn merge(&mut self, other: RepairItemsResult) {
        self.items.extend(other.items);
        self.diagnostics.extend(other.diagnostics);
        self.actions.extend(other.actions);
        self.diagnostics.sort_by_key(|d| d.item_index);
        self.actions.sort_by_key(|a| a.item_index);
    }
}
