//! Shared DTOs (schemas-as-code) for the schemafix workspace.
//!
//! # Design constraints
//! - These types cross the boundary with upstream composition and downstream reporting.
//! - Wire field names are camelCase (`instancePath`, `canonPath`, ...).
//! - Prefer adding optional fields over changing semantics.

pub mod compose;
pub mod coverage;
pub mod keywords;
pub mod options;
pub mod repair;
pub mod report;
pub mod validation;

/// Schema identifiers for serialized artifacts.
pub mod schema {
    pub const SCHEMAFIX_REPORT_V1: &str = "schemafix.report.v1";
}

/// Diagnostic codes surfaced by the repair engine.
///
/// All codes are advisory: none of them abort a batch call.
pub mod codes {
    /// A rename candidate or deletion failed preflight re-validation (`reason`: `dependent` | `branch`).
    pub const REPAIR_RENAME_PREFLIGHT_FAIL: &str = "REPAIR_RENAME_PREFLIGHT_FAIL";
    /// A required-add or rename candidate would be reported as unevaluated.
    pub const REPAIR_EVAL_GUARD_FAIL: &str = "REPAIR_EVAL_GUARD_FAIL";
    /// The must-cover guard is enabled but the coverage index has no entry for the object.
    pub const MUSTCOVER_INDEX_MISSING: &str = "MUSTCOVER_INDEX_MISSING";
    /// The pass cap was reached with residual errors.
    pub const UNSAT_BUDGET_EXHAUSTED: &str = "UNSAT_BUDGET_EXHAUSTED";
    /// The loop stopped below the cap with residual errors.
    pub const REPAIR_STALLED: &str = "REPAIR_STALLED";
    /// A contains obligation could not be met without breaking another one.
    pub const REPAIR_CONTAINS_UNSAT: &str = "REPAIR_CONTAINS_UNSAT";
    /// An offending property was renamed.
    pub const REPAIR_RENAME_APPLIED: &str = "REPAIR_RENAME_APPLIED";
    /// An offending property was deleted.
    pub const REPAIR_PROPERTY_DELETED: &str = "REPAIR_PROPERTY_DELETED";

    /// Every known code, in display order.
    pub const ALL: &[&str] = &[
        REPAIR_RENAME_PREFLIGHT_FAIL,
        REPAIR_EVAL_GUARD_FAIL,
        MUSTCOVER_INDEX_MISSING,
        UNSAT_BUDGET_EXHAUSTED,
        REPAIR_STALLED,
        REPAIR_CONTAINS_UNSAT,
        REPAIR_RENAME_APPLIED,
        REPAIR_PROPERTY_DELETED,
    ];
}

/// Deletion reasons carried by rename fallbacks.
pub mod delete_reasons {
    pub const NO_SAFE_NAME: &str = "deletedNoSafeName";
    pub const MUST_COVER_REJECTED: &str = "deletedMustCoverRejected";
}
