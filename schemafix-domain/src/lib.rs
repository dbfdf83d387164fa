//! Domain logic: turn almost-valid JSON instances into valid ones by reading oracle errors.
//!
//! This crate owns *what* edit fixes each violation and in which order. It does not own how items
//! are loaded, sharded or reported; that's the `schemafix-core` crate.

mod engine;
mod oracle;
mod ports;
mod rename;
mod strategies;

pub mod pattern;
pub mod pointer;
pub mod resolver;
pub mod synth;

pub use engine::{ItemOutcome, RepairInput, RepairSinks, repair_item, repair_items};
pub use oracle::{JsonSchemaOracle, OracleError};
pub use ports::{CoverageSink, MetricsSink, Validator};
pub use resolver::{PointerResolver, ResolvedPointer};
