use thiserror::Error;

use synthseed_core::Vendor;

/// Errors raised by the database access layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// The vendor pool could not be established.
    #[error("cannot connect to {vendor} server: {message}")]
    Connection { vendor: Vendor, message: String },
    /// A statement failed; `caller` names the issuing stage.
    #[error("[{caller}] query failed: {message}")]
    Query { caller: String, message: String },
    /// Errors returned by `sqlx` when executing statements.
    #[error("database error: {0}")]
    Sql(#[from] sqlx::Error),
    /// The client semaphore was closed while waiting for a client.
    #[error("connection pool closed")]
    PoolClosed,
    /// Errors from the scripted in-memory driver.
    #[error("driver error: {0}")]
    Driver(String),
}

impl DbError {
    /// A statement reached the server and failed there. Any other error
    /// means the database cannot be used at all.
    pub fn is_query_failure(&self) -> bool {
        matches!(self, DbError::Query { .. })
    }
}

/// Convenience alias for database results.
pub type DbResult<T> = std::result::Result<T, DbError>;
