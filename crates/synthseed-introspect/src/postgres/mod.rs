use synthseed_core::{GeneratedValue, Vendor};

use crate::adapter::CatalogQueries;

mod queries;

/// Catalog queries against `pg_constraint` and `pg_index`.
#[derive(Debug, Clone)]
pub struct PostgresCatalog {
    schema: String,
}

impl PostgresCatalog {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
        }
    }
}

impl CatalogQueries for PostgresCatalog {
    fn vendor(&self) -> Vendor {
        Vendor::Postgres
    }

    fn constraints_query(&self, table: &str) -> (String, Vec<GeneratedValue>) {
        (
            queries::TABLE_CONSTRAINTS.to_string(),
            vec![
                GeneratedValue::Text(self.schema.clone()),
                GeneratedValue::Text(table.to_string()),
            ],
        )
    }
}
