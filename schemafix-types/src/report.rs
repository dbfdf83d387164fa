use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary of one batch repair run, written as `report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    pub schema: String,
    pub tool: ReportToolInfo,
    pub run: ReportRunInfo,
    pub verdict: ReportVerdict,

    /// Action counts keyed by wire action name.
    #[serde(default)]
    pub actions_by_kind: BTreeMap<String, u64>,

    #[serde(default)]
    pub diagnostics_by_code: BTreeMap<String, u64>,

    /// Items per number of passes spent (`0` = already valid).
    #[serde(default)]
    pub pass_histogram: BTreeMap<u32, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportToolInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRunInfo {
    pub run_id: String,
    pub started_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Worker threads used for the run.
    pub jobs: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportVerdict {
    pub status: ReportStatus,
    pub counts: ReportCounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Every item validates.
    Pass,
    /// At least one item kept residual errors.
    Fail,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCounts {
    pub items: u64,
    pub already_valid: u64,
    pub repaired: u64,
    pub residual: u64,
}

impl ReportCounts {
    pub fn status(&self) -> ReportStatus {
        if self.residual == 0 {
            ReportStatus::Pass
        } else {
            ReportStatus::Fail
        }
    }
}
