//! Markdown rendering for `report.md`.

use schemafix_types::repair::DiagnosticEnvelope;
use schemafix_types::report::{RepairReport, ReportStatus};

/// Diagnostics listed individually before the tail is summarised.
const MAX_LISTED_DIAGNOSTICS: usize = 50;

pub fn render_report_md(report: &RepairReport, diagnostics: &[DiagnosticEnvelope]) -> String {
    let counts = &report.verdict.counts;
    let mut out = String::new();
    out.push_str("# schemafix report\n\n");
    out.push_str(&format!(
        "- Status: `{}`\n",
        match report.verdict.status {
            ReportStatus::Pass => "pass",
            ReportStatus::Fail => "fail",
        }
    ));
    out.push_str(&format!(
        "- Items: {} (already valid {}, repaired {}, residual {})\n",
        counts.items, counts.already_valid, counts.repaired, counts.residual
    ));
    out.push_str(&format!("- Run: `{}`\n\n", report.run.run_id));

    out.push_str("## Actions\n\n");
    if report.actions_by_kind.is_empty() {
        out.push_str("_No actions recorded._\n\n");
    } else {
        out.push_str("| action | count |\n|---|---|\n");
        for (kind, n) in &report.actions_by_kind {
            out.push_str(&format!("| `{}` | {} |\n", kind, n));
        }
        out.push('\n');
    }

    out.push_str("## Passes\n\n");
    if report.pass_histogram.is_empty() {
        out.push_str("_No items._\n\n");
    } else {
        out.push_str("| passes | items |\n|---|---|\n");
        for (passes, n) in &report.pass_histogram {
            out.push_str(&format!("| {} | {} |\n", passes, n));
        }
        out.push('\n');
    }

    out.push_str("## Diagnostics\n\n");
    if diagnostics.is_empty() {
        out.push_str("_No diagnostics._\n");
        return out;
    }
    for (code, n) in &report.diagnostics_by_code {
        out.push_str(&format!("- `{}`: {}\n", code, n));
    }
    out.push('\n');
    for d in diagnostics.iter().take(MAX_LISTED_DIAGNOSTICS) {
        let at = if d.canon_path.is_empty() {
            "#".to_string()
        } else {
            d.canon_path.clone()
        };
        out.push_str(&format!(
            "- item {}: `{}` at `{}` {}\n",
            d.item_index, d.code, at, d.details
        ));
    }
    if diagnostics.len() > MAX_LISTED_DIAGNOSTICS {
        out.push_str(&format!(
            "- _... {} more_\n",
            diagnostics.len() - MAX_LISTED_DIAGNOSTICS
        ));
    }

    out
}
