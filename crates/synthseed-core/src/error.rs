use thiserror::Error;

/// Core error type shared across synthseed crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The table or connection configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Foreign keys form a cycle that does not consist of a single self-reference.
    #[error("dependency cycle: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),
    /// The configured database vendor has no driver.
    #[error("database vendor '{0}' is not supported")]
    UnsupportedVendor(String),
}

/// Convenience alias for results returned by synthseed crates.
pub type Result<T> = std::result::Result<T, Error>;
