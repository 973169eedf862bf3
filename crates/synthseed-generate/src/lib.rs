//! Row generation for synthseed.
//!
//! Tables are generated in dependency order from their faker schemas. The
//! engine honours foreign keys, parent ratios, unique tuples and `null_if_no`
//! conditions, and is deterministic for a given seed.

pub mod engine;
pub mod errors;
pub mod foreign;
pub mod generators;
pub mod model;
pub mod output;
pub mod params;
pub mod planner;

pub use engine::GenerationEngine;
pub use errors::GenerationError;
pub use foreign::{
    ParentKeys, migration_key_columns, migration_key_tuples, referenced_columns, referenced_tuples,
};
pub use generators::{Generator, GeneratorContext, GeneratorRegistry};
pub use model::{DEFAULT_MAX_UNIQUE_RETRIES, GenerateOptions, GenerationReport, TableReport};
pub use output::{write_table_csv, write_tables_csv};
pub use planner::{GenerationTask, plan_tables};
