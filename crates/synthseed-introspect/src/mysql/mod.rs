use synthseed_core::{GeneratedValue, Vendor};

use crate::adapter::CatalogQueries;

mod queries;

/// Catalog queries against `information_schema` of the current database.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlCatalog;

impl CatalogQueries for MySqlCatalog {
    fn vendor(&self) -> Vendor {
        Vendor::MySql
    }

    fn constraints_query(&self, table: &str) -> (String, Vec<GeneratedValue>) {
        (
            queries::TABLE_CONSTRAINTS.to_string(),
            vec![GeneratedValue::Text(table.to_string())],
        )
    }
}
