//! Diagnostic code explanations for the `schemafix explain` command.

use schemafix_types::codes;

/// What a diagnostic code means and what to do about it.
#[derive(Debug, Clone)]
pub struct CodeExplanation {
    pub code: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    /// Keys found in the diagnostic's `details`.
    pub details: &'static [&'static str],
    pub remediation: &'static str,
}

/// Registry of every diagnostic the engine emits.
pub static CODE_REGISTRY: &[CodeExplanation] = &[
    CodeExplanation {
        code: codes::REPAIR_RENAME_PREFLIGHT_FAIL,
        title: "Rename or deletion rejected by preflight",
        description: r#"An edit to an offending property was tried on a draft copy of the object and
re-validated. The draft showed a new dependentRequired/dependentSchemas error
(`reason: "dependent"`) or a new oneOf failure (`reason: "branch"`).
For a rename (`stage: "rename"`) the next candidate is tried. For a deletion
(`stage: "delete"`) the property is kept."#,
        details: &["from", "to", "reason", "stage"],
        remediation: "Usually informational. A kept property leaves the item with residual errors; \
widen propertyNames, declare the property, or relax the dependency or oneOf branch it trips.",
    },
    CodeExplanation {
        code: codes::REPAIR_EVAL_GUARD_FAIL,
        title: "Name would be unevaluated",
        description: r#"Adding a required property or renaming an offender would leave the name
reported under `unevaluatedProperties: false`, so the edit was not applied."#,
        details: &["property", "from", "to", "stage"],
        remediation: "Declare the property in `properties`/`patternProperties` of a branch that \
evaluates it, or drop it from `required`.",
    },
    CodeExplanation {
        code: codes::MUSTCOVER_INDEX_MISSING,
        title: "Coverage index has no entry for the object",
        description: r#"The must-cover guard is on and the object is closed with
`additionalProperties: false`, but the composed coverage index has no entry for it.
Renames are refused and the offender falls back to deletion."#,
        details: &["property"],
        remediation: "Regenerate the compose result with coverage indexing, or disable \
`must_cover_guard`.",
    },
    CodeExplanation {
        code: codes::UNSAT_BUDGET_EXHAUSTED,
        title: "Repair budget exhausted",
        description: r#"The item still had validation errors after the pass cap
(`min(bail_on_unsat_after, attempts)`) was reached. The partially repaired item
is returned as-is."#,
        details: &["cycles", "errors"],
        remediation: "Raise `--attempts` / `bail_on_unsat_after`, or inspect the schema for \
constraints that cannot be met together.",
    },
    CodeExplanation {
        code: codes::REPAIR_STALLED,
        title: "Repair loop stalled",
        description: r#"The loop stopped below the pass cap with residual errors, either because
a pass applied no edit (`reason: "noEdit"`) or because it did not reduce the
error count (`reason: "noProgress"`)."#,
        details: &["reason", "cycles", "errors"],
        remediation: "The residual errors need keywords the engine does not repair (for example \
`not`, `oneOf` exclusivity or `dependentRequired`). Fix the generator upstream.",
    },
    CodeExplanation {
        code: codes::REPAIR_CONTAINS_UNSAT,
        title: "Contains obligation cannot be met",
        description: r#"An array carries several contains obligations and no element could be added
or removed without pushing another obligation out of range
(`reason: "noSynthesizedMatch"` or `"noSafeRemoval"`)."#,
        details: &["reason", "obligation"],
        remediation: "Check that minContains/maxContains across allOf branches are jointly \
satisfiable.",
    },
    CodeExplanation {
        code: codes::REPAIR_RENAME_APPLIED,
        title: "Property renamed",
        description: r#"An offending property was renamed to the smallest legal name (UTF-16 order)
that passed preflight."#,
        details: &["from", "to"],
        remediation: "Informational.",
    },
    CodeExplanation {
        code: codes::REPAIR_PROPERTY_DELETED,
        title: "Property deleted",
        description: r#"An offending property under `additionalProperties: false` or
`unevaluatedProperties: false` was removed because no safe rename existed
(`reason: "deletedNoSafeName"` or `"deletedMustCoverRejected"`)."#,
        details: &["property", "reason"],
        remediation: "Informational. Required properties are never deleted.",
    },
];

/// Look up by code, ignoring case and accepting `-` for `_`.
pub fn lookup_code(query: &str) -> Option<&'static CodeExplanation> {
    let normalized = query.trim().to_uppercase().replace('-', "_");
    CODE_REGISTRY.iter().find(|c| c.code == normalized)
}

pub fn list_codes() -> Vec<&'static str> {
    CODE_REGISTRY.iter().map(|c| c.code).collect()
}
