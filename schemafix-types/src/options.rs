use crate::coverage::CoverageMode;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DECIMAL_PRECISION: u32 = 12;
pub const DEFAULT_BAIL_ON_UNSAT_AFTER: u32 = 12;
pub const DEFAULT_REPAIR_ATTEMPTS: u32 = 12;

/// Read-only planning configuration shared with the rest of the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanOptions {
    /// Decimal places used for epsilon nudges and `multipleOf` tolerance.
    pub decimal_precision: u32,

    /// Restrict renames under `additionalProperties:false` to must-cover names.
    pub must_cover_guard: bool,

    /// Upper bound on repair passes per item.
    pub bail_on_unsat_after: u32,

    /// Default attempts when the caller does not override them.
    pub repair_attempts: u32,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            decimal_precision: DEFAULT_DECIMAL_PRECISION,
            must_cover_guard: false,
            bail_on_unsat_after: DEFAULT_BAIL_ON_UNSAT_AFTER,
            repair_attempts: DEFAULT_REPAIR_ATTEMPTS,
        }
    }
}

impl PlanOptions {
    /// `10^-p` as a float and its `"1e-<p>"` rendering.
    pub fn epsilon(&self) -> (f64, String) {
        let p = self.decimal_precision;
        (10f64.powi(-(p as i32)), format!("1e-{}", p))
    }
}

/// Per-call repair options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepairOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,

    pub coverage: CoverageOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoverageOptions {
    pub mode: CoverageMode,
}

impl RepairOptions {
    /// `min(bailOnUnsatAfter, attempts)`.
    pub fn pass_cap(&self, plan: &PlanOptions) -> u32 {
        let attempts = self.attempts.unwrap_or(plan.repair_attempts);
        plan.bail_on_unsat_after.min(attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsilon_uses_precision() {
        let plan = PlanOptions {
            decimal_precision: 3,
            ..Default::default()
        };
        let (eps, label) = plan.epsilon();
        assert!((eps - 0.001).abs() < 1e-15);
        assert_eq!(label, "1e-3");
        assert_eq!(PlanOptions::default().epsilon().1, "1e-12");
    }

    #[test]
    fn pass_cap_takes_minimum() {
        let plan = PlanOptions {
            bail_on_unsat_after: 4,
            ..Default::default()
        };
        let opts = RepairOptions {
            attempts: Some(9),
            ..Default::default()
        };
        assert_eq!(opts.pass_cap(&plan), 4);

        let opts = RepairOptions {
            attempts: Some(2),
            ..Default::default()
        };
        assert_eq!(opts.pass_cap(&plan), 2);

        let opts = RepairOptions {
            attempts: Some(0),
            ..Default::default()
        };
        assert_eq!(opts.pass_cap(&plan), 0);
    }
}
