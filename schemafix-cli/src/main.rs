mod config;
mod explain;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use config::{ConfigMerger, RepairOverrides};
use schemafix_core::adapters::{FsItemSource, FsWritePort};
use schemafix_core::pipeline::{run_repair, write_repair_artifacts};
use schemafix_core::settings::{RepairSettings, RunMode};
use schemafix_types::coverage::CoverageMode;
use schemafix_types::report::ReportToolInfo;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "schemafix",
    version,
    about = "Validator-driven repair of JSON instances against a JSON Schema."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Repair a batch of items and write the repaired items plus audit artifacts.
    Repair(RepairArgs),
    /// Explain a diagnostic code.
    Explain(ExplainArgs),
}

#[derive(Debug, Parser)]
struct RepairArgs {
    /// JSON Schema the items must satisfy.
    #[arg(long)]
    schema: Utf8PathBuf,

    /// Compose result (canonical schema, pointer map, contains bag, coverage index).
    #[arg(long)]
    compose: Option<Utf8PathBuf>,

    /// Items: a JSON array file, a `.jsonl` file, or a directory of `*.json` files.
    #[arg(long)]
    items: Utf8PathBuf,

    /// Output directory for artifacts (default: artifacts/schemafix).
    #[arg(long)]
    out_dir: Option<Utf8PathBuf>,

    /// Repair attempts per item (capped by bail_on_unsat_after).
    #[arg(long)]
    attempts: Option<u32>,

    /// Decimal precision for exclusive-bound nudges and multipleOf tolerance.
    #[arg(long)]
    precision: Option<u32>,

    /// Restrict renames under additionalProperties:false to must-cover names.
    #[arg(long, default_value_t = false)]
    must_cover_guard: bool,

    /// Coverage accounting mode.
    #[arg(long, value_enum)]
    coverage: Option<CoverageArg>,

    /// Worker threads (0 = one per core).
    #[arg(long, env = "SCHEMAFIX_JOBS")]
    jobs: Option<usize>,

    /// Config file (default: ./schemafix.toml when present).
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Exit-code semantics: `embedded` exits 0 even when residual errors remain.
    #[arg(long, value_enum, default_value = "standalone")]
    mode: ModeArg,
}

#[derive(Debug, Parser)]
struct ExplainArgs {
    /// Diagnostic code to explain (e.g., "REPAIR_STALLED").
    #[arg(required_unless_present = "list")]
    code: Option<String>,

    /// List every diagnostic code.
    #[arg(long, conflicts_with = "code")]
    list: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CoverageArg {
    Off,
    Measure,
    Guided,
}

impl From<CoverageArg> for CoverageMode {
    fn from(arg: CoverageArg) -> Self {
        match arg {
            CoverageArg::Off => CoverageMode::Off,
            CoverageArg::Measure => CoverageMode::Measure,
            CoverageArg::Guided => CoverageMode::Guided,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Standalone,
    Embedded,
}

impl From<ModeArg> for RunMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Standalone => RunMode::Standalone,
            ModeArg::Embedded => RunMode::Embedded,
        }
    }
}

fn main() -> ExitCode {
    match real_main() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(1)
        }
    }
}

fn real_main() -> anyhow::Result<u8> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Repair(args) => cmd_repair(args),
        Command::Explain(args) => cmd_explain(args).map(|()| 0),
    }
}

fn tool_info() -> ReportToolInfo {
    ReportToolInfo {
        name: "schemafix".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

fn cmd_repair(args: RepairArgs) -> anyhow::Result<u8> {
    // Load config file and merge with CLI arguments
    let file_config = config::load_or_default(&Utf8PathBuf::from("."), args.config.as_deref())
        .context("load schemafix.toml config")?;
    let overrides = RepairOverrides {
        attempts: args.attempts,
        precision: args.precision,
        must_cover_guard: args.must_cover_guard,
        coverage: args.coverage.map(CoverageMode::from),
        jobs: args.jobs,
        out_dir: args.out_dir,
    };
    let merged = ConfigMerger::new(file_config).merge_repair_args(&overrides);
    debug!("merged config: {:?}", merged);

    let settings = RepairSettings {
        out_dir: merged.out_dir,
        plan: merged.plan,
        options: merged.options,
        jobs: merged.jobs,
        mode: args.mode.into(),
    };

    let mut source = FsItemSource::new(args.schema, args.items);
    if let Some(compose) = args.compose {
        source = source.with_compose(compose);
    }

    let outcome = run_repair(&settings, &source, tool_info())?;
    write_repair_artifacts(&outcome, &settings.out_dir, &FsWritePort)
        .with_context(|| format!("write artifacts to {}", settings.out_dir))?;

    let counts = &outcome.report.verdict.counts;
    info!(out_dir = %settings.out_dir, "wrote repair artifacts");
    println!(
        "{} items: {} already valid, {} repaired, {} residual ({})",
        counts.items, counts.already_valid, counts.repaired, counts.residual, settings.out_dir
    );

    Ok(outcome.exit_code(settings.mode))
}

fn cmd_explain(args: ExplainArgs) -> anyhow::Result<()> {
    use explain::{CODE_REGISTRY, list_codes, lookup_code};

    if args.list {
        for entry in CODE_REGISTRY {
            println!("{:<30} {}", entry.code, entry.title);
        }
        return Ok(());
    }

    let query = args.code.unwrap_or_default();
    let Some(entry) = lookup_code(&query) else {
        let available = list_codes().join(", ");
        anyhow::bail!(
            "Unknown diagnostic code: '{}'\n\nAvailable codes: {}",
            query,
            available
        );
    };

    println!("================================================================================");
    println!("{}: {}", entry.code, entry.title);
    println!("================================================================================");
    println!();
    println!("DESCRIPTION");
    println!("--------------------------------------------------------------------------------");
    println!("{}", entry.description);
    println!();
    println!("DETAILS");
    println!("--------------------------------------------------------------------------------");
    for key in entry.details {
        println!("  - {}", key);
    }
    println!();
    println!("REMEDIATION");
    println!("--------------------------------------------------------------------------------");
    println!("{}", entry.remediation);

    Ok(())
}
