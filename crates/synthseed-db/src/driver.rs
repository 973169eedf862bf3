use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use synthseed_core::{ConnectionConfig, GeneratedValue, Vendor};

use crate::error::DbResult;
use crate::mysql::MySqlDriver;
use crate::postgres::PostgresDriver;

/// A vendor driver able to open a client pool.
#[async_trait]
pub trait Driver: Send + Sync + fmt::Debug {
    fn vendor(&self) -> Vendor;

    /// Open the vendor pool. Called at most once per [`crate::DbAccess`].
    async fn connect(&self, config: &ConnectionConfig) -> DbResult<Arc<dyn ClientPool>>;
}

/// A live pool of vendor connections.
#[async_trait]
pub trait ClientPool: Send + Sync {
    async fn checkout(&self) -> DbResult<Box<dyn Session>>;

    async fn close(&self);
}

/// A single checked-out connection.
#[async_trait]
pub trait Session: Send {
    /// Execute `sql` with positional `bindings`.
    ///
    /// Statements that produce rows return them; everything else reports the
    /// number of affected rows.
    async fn execute(&mut self, sql: &str, bindings: &[GeneratedValue]) -> DbResult<QueryData>;
}

/// One result row with every column rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataRow {
    values: BTreeMap<String, Option<String>>,
}

impl DataRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: Option<&str>) -> Self {
        self.insert(column, value.map(str::to_string));
        self
    }

    pub fn insert(&mut self, column: &str, value: Option<String>) {
        self.values.insert(column.to_string(), value);
    }

    /// Value of `column`; `None` when the column is missing or NULL.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).and_then(|value| value.as_deref())
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }
}

/// Result of a single statement.
#[derive(Debug, Clone, Default)]
pub struct QueryData {
    pub rows: Vec<DataRow>,
    pub rows_affected: u64,
}

/// Driver for the vendor chosen at startup.
pub fn driver_for(vendor: Vendor) -> Arc<dyn Driver> {
    match vendor {
        Vendor::MySql => Arc::new(MySqlDriver),
        Vendor::Postgres => Arc::new(PostgresDriver),
    }
}

/// Whether a statement is expected to return a result set.
pub(crate) fn returns_rows(sql: &str) -> bool {
    let head: String = sql
        .trim_start()
        .chars()
        .take_while(|ch| ch.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_lowercase();
    matches!(
        head.as_str(),
        "select" | "with" | "show" | "describe" | "explain" | "values"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_row_returning_statements() {
        assert!(returns_rows("  SELECT 1"));
        assert!(returns_rows("with x as (select 1) select * from x"));
        assert!(!returns_rows("INSERT INTO t VALUES (1)"));
        assert!(!returns_rows("update t set a = 1"));
    }

    #[test]
    fn data_row_treats_null_as_missing() {
        let row = DataRow::new().with("id", Some("1")).with("name", None);
        assert_eq!(row.get("id"), Some("1"));
        assert_eq!(row.get("name"), None);
        assert!(row.contains("name"));
        assert!(!row.contains("other"));
    }
}
