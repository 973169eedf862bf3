use std::sync::Arc;

use synthseed_core::{GeneratedValue, Vendor};

use crate::mysql::MySqlCatalog;
use crate::postgres::PostgresCatalog;

/// Column aliases every catalog query must produce, one row per constraint
/// column membership.
pub mod columns {
    /// `p` (primary key), `u` (unique) or `f` (foreign key).
    pub const KIND: &str = "kind";
    pub const CONSTRAINT_NAME: &str = "constraint_name";
    pub const COLUMN_NAME: &str = "column_name";
    /// 1-based position of the column inside the constraint.
    pub const POSITION: &str = "position";
    pub const REFERENCED_TABLE: &str = "referenced_table";
    pub const REFERENCED_COLUMN: &str = "referenced_column";
}

/// Vendor-specific catalog statement for one table's constraints.
pub trait CatalogQueries: Send + Sync {
    fn vendor(&self) -> Vendor;

    /// SQL and bindings returning the constraint rows of `table`.
    fn constraints_query(&self, table: &str) -> (String, Vec<GeneratedValue>);
}

pub fn catalog_for(vendor: Vendor, schema: &str) -> Arc<dyn CatalogQueries> {
    match vendor {
        Vendor::MySql => Arc::new(MySqlCatalog),
        Vendor::Postgres => Arc::new(PostgresCatalog::new(schema)),
    }
}
