use thiserror::Error;

use synthseed_db::DbError;

#[derive(Debug, Error)]
pub enum IntrospectError {
    #[error("introspection failed for table '{table}': {source}")]
    Table {
        table: String,
        #[source]
        source: DbError,
    },
    #[error("introspection task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, IntrospectError>;
