//! Embeddable batch pipeline for schemafix.
//!
//! Provides a clap-free, I/O-abstracted entry point suitable for linking
//! into a data generator or other host process.
//!
//! # Port traits
//!
//! All I/O is abstracted behind port traits in [`ports`]:
//! - [`ItemSource`](ports::ItemSource) loads the schema, optional compose result and items
//! - [`WritePort`](ports::WritePort) writes files and creates directories
//!
//! The [`adapters`] module provides filesystem-backed and in-memory implementations,
//! plus collecting coverage and metrics sinks.
//!
//! # Entry points
//!
//! - [`run_repair`](pipeline::run_repair) repairs a batch and builds the run report
//! - [`write_repair_artifacts`](pipeline::write_repair_artifacts) persists an outcome, including
//!   the markdown summary from [`render_report_md`](render::render_report_md)

pub mod adapters;
pub mod pipeline;
pub mod ports;
pub mod render;
pub mod settings;

// Re-export so embedders don't need schemafix-domain directly.
pub use schemafix_domain::{CoverageSink, JsonSchemaOracle, MetricsSink, OracleError, Validator};
