//! Constraint introspection for configured tables.
//!
//! One catalog query per table runs concurrently through the shared
//! [`DbAccess`]; the pool bound caps how many are in flight.

pub mod adapter;
pub mod error;
pub mod mapper;
pub mod mysql;
pub mod options;
pub mod postgres;

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};

use synthseed_core::{ConstraintSet, TableConfigurations};
use synthseed_db::{DbAccess, DbResult, Query};

pub use adapter::{CatalogQueries, catalog_for};
pub use error::{IntrospectError, Result};
pub use mapper::map_constraints;
pub use options::IntrospectOptions;

/// Outcome of an introspection pass.
#[derive(Debug, Clone, Default)]
pub struct IntrospectReport {
    pub inspected: usize,
    /// Tables whose catalog query failed; they continue without constraints.
    pub failed_tables: Vec<String>,
}

/// Introspect every configured table and merge the result into it.
///
/// All queries complete before anything is merged. A failed catalog query
/// leaves its table without constraints, unless the pass is strict. Failing
/// to reach the database at all aborts the pass in either mode.
pub async fn introspect_constraints(
    access: &DbAccess,
    tables: &mut TableConfigurations,
    options: &IntrospectOptions,
) -> Result<IntrospectReport> {
    let schema = options
        .schema
        .clone()
        .unwrap_or_else(|| access.config().schema.clone());
    let catalog = catalog_for(access.vendor(), &schema);

    let mut join_set = JoinSet::new();
    for name in tables.keys() {
        let access = access.clone();
        let catalog = Arc::clone(&catalog);
        let table = name.clone();
        join_set.spawn(async move {
            let result = fetch_table_constraints(&access, catalog.as_ref(), &table).await;
            (table, result)
        });
    }

    let mut results: BTreeMap<String, DbResult<ConstraintSet>> = BTreeMap::new();
    while let Some(joined) = join_set.join_next().await {
        let (table, result) = joined?;
        results.insert(table, result);
    }

    let mut report = IntrospectReport {
        inspected: results.len(),
        ..IntrospectReport::default()
    };
    for (name, result) in results {
        match result {
            Ok(constraints) => {
                if let Some(table) = tables.get_mut(&name) {
                    table.merge_constraints(constraints);
                }
            }
            Err(source) if options.strict || !source.is_query_failure() => {
                return Err(IntrospectError::Table {
                    table: name,
                    source,
                });
            }
            Err(err) => {
                warn!(table = %name, error = %err, "introspection failed; continuing without constraints");
                report.failed_tables.push(name);
            }
        }
    }

    info!(
        event = "introspection_finished",
        tables = report.inspected,
        failed = report.failed_tables.len(),
        "constraint introspection finished"
    );
    Ok(report)
}

async fn fetch_table_constraints(
    access: &DbAccess,
    catalog: &dyn CatalogQueries,
    table: &str,
) -> DbResult<ConstraintSet> {
    let (sql, bindings) = catalog.constraints_query(table);
    let caller = format!("introspect:{table}");
    let data = access
        .query(Query::new(&caller, &sql).bind(&bindings))
        .await?
        .into_result()?;
    Ok(map_constraints(&data.rows))
}
