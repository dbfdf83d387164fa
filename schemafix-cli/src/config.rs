//! Configuration file loading for schemafix.
//!
//! Discovers and loads `schemafix.toml` from the working directory (or an explicit path).
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use schemafix_types::coverage::CoverageMode;
use schemafix_types::options::{CoverageOptions, PlanOptions, RepairOptions};
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "schemafix.toml";

const DEFAULT_OUT_DIR: &str = "artifacts/schemafix";

/// Top-level configuration from schemafix.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemafixConfig {
    pub plan: PlanConfig,
    pub coverage: CoverageConfig,
    pub run: RunConfig,
}

/// `[plan]`: planning options shared with the generator.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlanConfig {
    pub decimal_precision: Option<u32>,
    pub must_cover_guard: Option<bool>,
    pub bail_on_unsat_after: Option<u32>,
    pub repair_attempts: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoverageConfig {
    pub mode: Option<CoverageMode>,
}

/// `[run]`: batch execution.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Worker threads; `0` uses every available core.
    pub jobs: Option<usize>,
    pub out_dir: Option<Utf8PathBuf>,
    /// Per-call attempts override.
    pub attempts: Option<u32>,
}

/// Discover `schemafix.toml` in `dir`.
pub fn discover_config(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<SchemafixConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<SchemafixConfig> {
    let config: SchemafixConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load the explicit config when given (it must exist), else discover one in `dir`,
/// else fall back to defaults.
pub fn load_or_default(
    dir: &Utf8Path,
    explicit: Option<&Utf8Path>,
) -> anyhow::Result<SchemafixConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match discover_config(dir) {
        Some(path) => load_config(&path),
        None => Ok(SchemafixConfig::default()),
    }
}

/// Values given on the command line. `None` / `false` means "not given".
#[derive(Debug, Clone, Default)]
pub struct RepairOverrides {
    pub attempts: Option<u32>,
    pub precision: Option<u32>,
    pub must_cover_guard: bool,
    pub coverage: Option<CoverageMode>,
    pub jobs: Option<usize>,
    pub out_dir: Option<Utf8PathBuf>,
}

/// Effective settings after merging file and CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedConfig {
    pub plan: PlanOptions,
    pub options: RepairOptions,
    pub jobs: usize,
    pub out_dir: Utf8PathBuf,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: SchemafixConfig,
}

impl ConfigMerger {
    pub fn new(config: SchemafixConfig) -> Self {
        Self { config }
    }

    /// CLI values win over the file, the file wins over built-in defaults.
    /// `--must-cover-guard` can only switch the guard on.
    pub fn merge_repair_args(self, cli: &RepairOverrides) -> MergedConfig {
        let file = self.config;
        let defaults = PlanOptions::default();

        let plan = PlanOptions {
            decimal_precision: cli
                .precision
                .or(file.plan.decimal_precision)
                .unwrap_or(defaults.decimal_precision),
            must_cover_guard: cli.must_cover_guard
                || file.plan.must_cover_guard.unwrap_or(defaults.must_cover_guard),
            bail_on_unsat_after: file
                .plan
                .bail_on_unsat_after
                .unwrap_or(defaults.bail_on_unsat_after),
            repair_attempts: file
                .plan
                .repair_attempts
                .unwrap_or(defaults.repair_attempts),
        };

        let options = RepairOptions {
            attempts: cli.attempts.or(file.run.attempts),
            coverage: CoverageOptions {
                mode: cli.coverage.or(file.coverage.mode).unwrap_or_default(),
            },
        };

        MergedConfig {
            plan,
            options,
            jobs: cli.jobs.or(file.run.jobs).unwrap_or(1),
            out_dir: cli
                .out_dir
                .clone()
                .or(file.run.out_dir)
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUT_DIR)),
        }
    }
}
