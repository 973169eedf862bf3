//! Orchestration of a synthseed run: configuration loading, logging and the
//! seed pipeline shared by the `synthseed` binary and its tests.

pub mod config;
pub mod error;
pub mod logging;
pub mod run;

pub use config::{load_connection, load_tables, table_document_schema};
pub use error::{ConfigError, RunError, RunResult};
pub use logging::{LogPaths, init_run_logging};
pub use run::{RunContext, RunOptions, RunSummary, format_elapsed, run_seed};
