//! Batched multi-row INSERTs in dependency order.

use std::collections::BTreeSet;
use std::ops::Range;

use serde::Serialize;
use tracing::{error, info, warn};

use synthseed_core::{
    DependencyGraph, GeneratedRow, GeneratedValue, TableConfiguration, TableConfigurations, Vendor,
};

use crate::access::{DbAccess, FailureMode, Query};
use crate::dialect::{MAX_BIND_PARAMS, max_payload_bytes, placeholder, quote_identifier};
use crate::error::DbResult;

/// Fixed statement overhead besides the column values.
const STATEMENT_OVERHEAD: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct InsertOptions {
    /// Hard cap on rows per statement, applied on top of vendor limits.
    pub max_rows_per_batch: Option<usize>,
    /// Override of the vendor payload budget.
    pub max_payload_bytes: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertStatus {
    Inserted,
    /// A later batch failed; remaining batches were not sent.
    Abandoned,
    /// Filled by migrations; never inserted.
    SkippedMigration,
    /// A parent table was abandoned, so FK targets are incomplete.
    SkippedDependency,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableInsertReport {
    pub table: String,
    pub status: InsertStatus,
    pub rows_inserted: u64,
    pub batches: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InsertReport {
    pub tables: Vec<TableInsertReport>,
}

impl InsertReport {
    pub fn rows_inserted(&self) -> u64 {
        self.tables.iter().map(|table| table.rows_inserted).sum()
    }

    pub fn tables_with(&self, status: InsertStatus) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|table| table.status == status)
            .map(|table| table.table.as_str())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.tables.iter().all(|table| {
            matches!(
                table.status,
                InsertStatus::Inserted | InsertStatus::SkippedMigration
            )
        })
    }
}

/// Insert every generated table in `order`.
///
/// The first batch of a table is fail-fast: its error aborts the run. A later
/// batch failure abandons the rest of that table and skips every table that
/// depends on it, while unrelated tables continue.
pub async fn insert_tables(
    access: &DbAccess,
    tables: &mut TableConfigurations,
    order: &[String],
    options: &InsertOptions,
) -> DbResult<InsertReport> {
    let graph = DependencyGraph::from_tables(tables);
    let mut blocked: BTreeSet<String> = BTreeSet::new();
    let mut report = InsertReport::default();

    for name in order {
        let Some(table) = tables.get_mut(name) else {
            continue;
        };

        if table.is_populated_by_migration {
            info!(table = %name, "table populated by migration; skipping insert");
            report.tables.push(TableInsertReport {
                table: name.clone(),
                status: InsertStatus::SkippedMigration,
                rows_inserted: 0,
                batches: 0,
            });
            continue;
        }

        if blocked.contains(name) {
            warn!(table = %name, "parent table incomplete; skipping insert");
            report.tables.push(TableInsertReport {
                table: name.clone(),
                status: InsertStatus::SkippedDependency,
                rows_inserted: 0,
                batches: 0,
            });
            continue;
        }

        let table_report = insert_table(access, table, options).await?;
        if table_report.status == InsertStatus::Abandoned {
            blocked.extend(graph.descendants_of(name));
        }
        report.tables.push(table_report);
    }

    Ok(report)
}

async fn insert_table(
    access: &DbAccess,
    table: &mut TableConfiguration,
    options: &InsertOptions,
) -> DbResult<TableInsertReport> {
    let vendor = access.vendor();
    let columns = insert_columns(table);
    let batches = plan_batches(vendor, &columns, &table.data, options);
    let caller = format!("insert:{}", table.name);
    let mut rows_inserted = 0u64;

    for (index, range) in batches.iter().enumerate() {
        let rows = &table.data[range.clone()];
        let (sql, bindings) = build_insert(vendor, &table.name, &columns, rows);
        let mode = if index == 0 {
            FailureMode::FailFast
        } else {
            FailureMode::Report
        };

        let outcome = access
            .query(Query::new(&caller, &sql).bind(&bindings).mode(mode))
            .await?;
        if let Some(err) = outcome.error {
            error!(
                table = %table.name,
                batch = index,
                batches = batches.len(),
                rows_inserted,
                error = %err,
                "batch failed; abandoning remaining batches"
            );
            return Ok(TableInsertReport {
                table: table.name.clone(),
                status: InsertStatus::Abandoned,
                rows_inserted,
                batches: index,
            });
        }
        rows_inserted += rows.len() as u64;
    }

    table.is_populated = true;
    info!(
        table = %table.name,
        rows = rows_inserted,
        batches = batches.len(),
        "table inserted"
    );
    Ok(TableInsertReport {
        table: table.name.clone(),
        status: InsertStatus::Inserted,
        rows_inserted,
        batches: batches.len(),
    })
}

fn insert_columns(table: &TableConfiguration) -> Vec<String> {
    if table.columns_order.is_empty() {
        table.faker_schema.keys().cloned().collect()
    } else {
        table.columns_order.clone()
    }
}

/// Split `rows` into contiguous batches that respect payload and parameter
/// limits. Every batch holds at least one row.
pub fn plan_batches(
    vendor: Vendor,
    columns: &[String],
    rows: &[GeneratedRow],
    options: &InsertOptions,
) -> Vec<Range<usize>> {
    if rows.is_empty() || columns.is_empty() {
        return Vec::new();
    }

    let payload_limit = options
        .max_payload_bytes
        .unwrap_or_else(|| max_payload_bytes(vendor));
    let header = STATEMENT_OVERHEAD
        + columns
            .iter()
            .map(|column| column.len() + 4)
            .sum::<usize>();
    let mut row_cap = MAX_BIND_PARAMS / columns.len();
    if let Some(max_rows) = options.max_rows_per_batch {
        row_cap = row_cap.min(max_rows);
    }
    let row_cap = row_cap.max(1);

    let mut batches = Vec::new();
    let mut start = 0;
    let mut bytes = header;
    for (index, row) in rows.iter().enumerate() {
        let row_bytes = row_size(columns, row);
        let rows_in_batch = index - start;
        if rows_in_batch > 0 && (rows_in_batch >= row_cap || bytes + row_bytes > payload_limit) {
            batches.push(start..index);
            start = index;
            bytes = header;
        }
        bytes += row_bytes;
    }
    batches.push(start..rows.len());
    batches
}

fn row_size(columns: &[String], row: &GeneratedRow) -> usize {
    // Parentheses, separators and placeholder text per value.
    4 + columns
        .iter()
        .map(|column| {
            row.get(column)
                .map(GeneratedValue::approx_size)
                .unwrap_or(4)
                + 8
        })
        .sum::<usize>()
}

/// Build a multi-row INSERT. NULL values are written as literals and do not
/// consume a placeholder.
pub fn build_insert(
    vendor: Vendor,
    table: &str,
    columns: &[String],
    rows: &[GeneratedRow],
) -> (String, Vec<GeneratedValue>) {
    let column_list = columns
        .iter()
        .map(|column| quote_identifier(vendor, column))
        .collect::<Vec<_>>()
        .join(", ");

    let mut bindings = Vec::new();
    let mut tuples = Vec::with_capacity(rows.len());
    for row in rows {
        let values = columns
            .iter()
            .map(|column| match row.get(column) {
                None | Some(GeneratedValue::Null) => "NULL".to_string(),
                Some(value) => {
                    bindings.push(value.clone());
                    placeholder(vendor, bindings.len())
                }
            })
            .collect::<Vec<_>>();
        tuples.push(format!("({})", values.join(", ")));
    }

    let sql = format!(
        "INSERT INTO {} ({column_list}) VALUES {}",
        quote_identifier(vendor, table),
        tuples.join(", ")
    );
    (sql, bindings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, GeneratedValue)]) -> GeneratedRow {
        pairs
            .iter()
            .map(|(column, value)| (column.to_string(), value.clone()))
            .collect()
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn builds_postgres_insert_with_null_literals() {
        let rows = vec![
            row(&[
                ("id", GeneratedValue::Int(1)),
                ("name", GeneratedValue::Text("a".into())),
            ]),
            row(&[("id", GeneratedValue::Int(2)), ("name", GeneratedValue::Null)]),
        ];
        let (sql, bindings) = build_insert(Vendor::Postgres, "users", &columns(&["id", "name"]), &rows);
        assert_eq!(
            sql,
            "INSERT INTO \"users\" (\"id\", \"name\") VALUES ($1, $2), ($3, NULL)"
        );
        assert_eq!(bindings.len(), 3);
    }

    #[test]
    fn builds_mysql_insert() {
        let rows = vec![row(&[("id", GeneratedValue::Int(7))])];
        let (sql, bindings) = build_insert(Vendor::MySql, "t", &columns(&["id", "missing"]), &rows);
        assert_eq!(sql, "INSERT INTO `t` (`id`, `missing`) VALUES (?, NULL)");
        assert_eq!(bindings, vec![GeneratedValue::Int(7)]);
    }

    #[test]
    fn batches_respect_row_cap() {
        let rows: Vec<GeneratedRow> = (0..10)
            .map(|id| row(&[("id", GeneratedValue::Int(id))]))
            .collect();
        let options = InsertOptions {
            max_rows_per_batch: Some(4),
            ..InsertOptions::default()
        };
        let batches = plan_batches(Vendor::Postgres, &columns(&["id"]), &rows, &options);
        assert_eq!(batches, vec![0..4, 4..8, 8..10]);
    }

    #[test]
    fn batches_respect_payload_budget() {
        let text = "x".repeat(100);
        let rows: Vec<GeneratedRow> = (0..5)
            .map(|_| row(&[("body", GeneratedValue::Text(text.clone()))]))
            .collect();
        let options = InsertOptions {
            max_payload_bytes: Some(400),
            ..InsertOptions::default()
        };
        let batches = plan_batches(Vendor::MySql, &columns(&["body"]), &rows, &options);
        assert!(batches.len() > 1);
        assert_eq!(batches.first().map(|range| range.start), Some(0));
        assert_eq!(batches.last().map(|range| range.end), Some(5));
        for pair in batches.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn batches_respect_bind_limit() {
        let names: Vec<String> = (0..1000).map(|i| format!("c{i}")).collect();
        let wide: GeneratedRow = names
            .iter()
            .map(|name| (name.clone(), GeneratedValue::Bool(true)))
            .collect();
        let rows = vec![wide; 200];
        let batches = plan_batches(Vendor::Postgres, &names, &rows, &InsertOptions::default());
        assert!(batches.iter().all(|range| range.len() * names.len() <= MAX_BIND_PARAMS));
        assert_eq!(batches.last().map(|range| range.end), Some(200));
    }
}
