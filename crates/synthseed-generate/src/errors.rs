use thiserror::Error;

/// Errors emitted by the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("unknown generator '{generator}' for column {table}.{column}")]
    UnknownGenerator {
        generator: String,
        table: String,
        column: String,
    },
    #[error("invalid params for '{generator}': {message}")]
    InvalidParams { generator: String, message: String },
    #[error("no keys available in {parent}.{parent_column} for {table}.{column}")]
    MissingParentKeys {
        table: String,
        column: String,
        parent: String,
        parent_column: String,
    },
    #[error("unique tuple {columns:?} of table '{table}' still collides after {attempts} attempts")]
    UniqueExhausted {
        table: String,
        columns: Vec<String>,
        attempts: u32,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl GenerationError {
    pub(crate) fn invalid_params(generator: &str, message: impl Into<String>) -> Self {
        GenerationError::InvalidParams {
            generator: generator.to_string(),
            message: message.into(),
        }
    }
}
