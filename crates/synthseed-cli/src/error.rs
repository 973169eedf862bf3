use std::path::PathBuf;

use thiserror::Error;

use synthseed_db::DbError;
use synthseed_generate::GenerationError;
use synthseed_introspect::IntrospectError;

/// Errors raised while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid json in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{} does not match the table schema: {}", path.display(), messages.join("; "))]
    Schema { path: PathBuf, messages: Vec<String> },
    #[error("invalid json schema: {0}")]
    SchemaCompile(String),
    #[error(transparent)]
    Core(#[from] synthseed_core::Error),
}

/// Fatal errors of a seeding run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Core(#[from] synthseed_core::Error),
    #[error("database error: {0}")]
    Db(#[from] DbError),
    #[error("introspection error: {0}")]
    Introspect(#[from] IntrospectError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("logging error: {0}")]
    Logging(String),
}

pub type RunResult<T> = std::result::Result<T, RunError>;
