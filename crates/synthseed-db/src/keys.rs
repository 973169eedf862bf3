use synthseed_core::{GeneratedValue, KeyKind, Vendor};

use crate::access::{DbAccess, Query};
use crate::dialect::{cast_to_text, quote_identifier};
use crate::error::DbResult;

const TYPE_ALIAS: &str = "key_type";

/// Read every non-null value of `table.column` from the database.
///
/// Used for tables filled by migrations, whose keys child tables reference.
/// Values are typed after the column's catalog type; an unknown column
/// keeps its values as text.
pub async fn fetch_existing_keys(
    access: &DbAccess,
    table: &str,
    column: &str,
) -> DbResult<Vec<GeneratedValue>> {
    let tuples = fetch_existing_key_tuples(access, table, &[column.to_string()]).await?;
    Ok(tuples.into_iter().flatten().collect())
}

/// Read the rows of `table` projected on `columns`, skipping rows where any
/// of them is NULL. Each tuple keeps the order of `columns`.
pub async fn fetch_existing_key_tuples(
    access: &DbAccess,
    table: &str,
    columns: &[String],
) -> DbResult<Vec<Vec<GeneratedValue>>> {
    let vendor = access.vendor();
    let caller = format!("existing_keys:{table}");

    let mut kinds = Vec::with_capacity(columns.len());
    for column in columns {
        let (sql, bindings) = column_type_query(vendor, &access.config().schema, table, column);
        let kind = access
            .query(Query::new(&caller, &sql).bind(&bindings))
            .await?
            .into_result()?
            .rows
            .first()
            .and_then(|row| row.get(TYPE_ALIAS))
            .map(KeyKind::from_data_type)
            .unwrap_or_default();
        kinds.push(kind);
    }

    let idents: Vec<String> = columns
        .iter()
        .map(|column| quote_identifier(vendor, column))
        .collect();
    let projection = idents
        .iter()
        .enumerate()
        .map(|(index, ident)| format!("{} AS {}", cast_to_text(vendor, ident), key_alias(index)))
        .collect::<Vec<_>>()
        .join(", ");
    let filter = idents
        .iter()
        .map(|ident| format!("{ident} IS NOT NULL"))
        .collect::<Vec<_>>()
        .join(" AND ");
    let sql = format!(
        "SELECT {projection} FROM {} WHERE {filter}",
        quote_identifier(vendor, table),
    );
    let data = access
        .query(Query::new(&caller, &sql))
        .await?
        .into_result()?;

    Ok(data
        .rows
        .iter()
        .filter_map(|row| {
            kinds
                .iter()
                .enumerate()
                .map(|(index, kind)| {
                    row.get(&key_alias(index))
                        .map(|value| GeneratedValue::from_db_text(Some(value), *kind))
                })
                .collect::<Option<Vec<_>>>()
        })
        .collect())
}

fn key_alias(index: usize) -> String {
    format!("key_{index}")
}

fn column_type_query(
    vendor: Vendor,
    schema: &str,
    table: &str,
    column: &str,
) -> (String, Vec<GeneratedValue>) {
    let text = |value: &str| GeneratedValue::Text(value.to_string());
    match vendor {
        Vendor::Postgres => (
            format!(
                "SELECT data_type::text AS {TYPE_ALIAS} FROM information_schema.columns \
                 WHERE table_schema = $1 AND table_name = $2 AND column_name = $3"
            ),
            vec![text(schema), text(table), text(column)],
        ),
        Vendor::MySql => (
            format!(
                "SELECT CAST(DATA_TYPE AS CHAR) AS {TYPE_ALIAS} FROM information_schema.COLUMNS \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND COLUMN_NAME = ?"
            ),
            vec![text(table), text(column)],
        ),
    }
}
