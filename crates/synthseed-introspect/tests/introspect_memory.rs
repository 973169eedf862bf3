use std::sync::Arc;

use synthseed_core::{
    ConnectionConfig, ConnectionParams, GeneratedValue, GenerationRule, TableConfiguration,
    TableConfigurations, Vendor,
};
use synthseed_db::{DataRow, DbAccess, MemoryDriver, MemoryResponse};
use synthseed_introspect::{IntrospectOptions, introspect_constraints};

fn key_row(kind: &str, name: &str, column: &str, position: &str) -> DataRow {
    DataRow::new()
        .with("kind", Some(kind))
        .with("constraint_name", Some(name))
        .with("column_name", Some(column))
        .with("position", Some(position))
}

fn catalog(_sql: &str, bindings: &[GeneratedValue]) -> MemoryResponse {
    let table = bindings.last().map(GeneratedValue::to_text).unwrap_or_default();
    match table.as_str() {
        "countries" => MemoryResponse::Rows(vec![
            key_row("p", "countries_pkey", "id", "1"),
            key_row("u", "countries_code_key", "code", "1"),
        ]),
        "cities" => MemoryResponse::Rows(vec![
            key_row("p", "cities_pkey", "id", "1"),
            key_row("f", "cities_country_fk", "country_id", "1")
                .with("referenced_table", Some("countries"))
                .with("referenced_column", Some("id")),
        ]),
        "broken" => MemoryResponse::Fail("permission denied for table broken".to_string()),
        _ => MemoryResponse::Rows(Vec::new()),
    }
}

fn access(vendor: Vendor) -> DbAccess {
    let driver = MemoryDriver::with_handler(vendor, catalog);
    let mut config = ConnectionConfig::new(vendor, ConnectionParams::default());
    config.pool_size = 2;
    DbAccess::with_driver(config, Arc::new(driver))
}

fn generated(id: &str) -> GenerationRule {
    GenerationRule {
        generator: Some(id.to_string()),
        ..GenerationRule::default()
    }
}

fn tables(names: &[&str]) -> TableConfigurations {
    names
        .iter()
        .map(|name| {
            let table = TableConfiguration::new(*name)
                .with_amount(1)
                .with_rule("id", generated("int.sequence"))
                .with_rule("code", generated("text"))
                .with_rule("country_id", generated("int.range"));
            (name.to_string(), table)
        })
        .collect()
}

#[tokio::test]
async fn merges_constraints_into_tables() {
    let access = access(Vendor::Postgres);
    let mut tables = tables(&["cities", "countries"]);

    let report = introspect_constraints(&access, &mut tables, &IntrospectOptions::default())
        .await
        .expect("introspection");

    assert_eq!(report.inspected, 2);
    assert!(report.failed_tables.is_empty());

    let countries = &tables["countries"];
    assert_eq!(countries.primary_key, Some(vec!["id".to_string()]));
    assert!(countries.unique_indexes.contains(&vec!["code".to_string()]));

    let cities = &tables["cities"];
    assert_eq!(cities.foreign_keys.len(), 1);
    let rule = &cities.faker_schema["country_id"];
    let fk = rule.foreign_key.as_ref().expect("fk filled from catalog");
    assert_eq!(fk.table, "countries");
    assert_eq!(fk.column, "id");
    assert_eq!(access.clients_in_use(), 0);
}

#[tokio::test]
async fn failing_table_is_tolerated_by_default() {
    let access = access(Vendor::MySql);
    let mut tables = tables(&["broken", "countries"]);

    let report = introspect_constraints(&access, &mut tables, &IntrospectOptions::default())
        .await
        .expect("non-strict introspection");

    assert_eq!(report.failed_tables, vec!["broken".to_string()]);
    assert!(tables["broken"].primary_key.is_none());
    assert!(tables["countries"].primary_key.is_some());
}

#[tokio::test]
async fn failing_table_is_fatal_in_strict_mode() {
    let access = access(Vendor::MySql);
    let mut tables = tables(&["broken", "countries"]);

    let err = introspect_constraints(&access, &mut tables, &IntrospectOptions::strict())
        .await
        .expect_err("strict introspection");
    assert!(err.to_string().contains("broken"));
}

#[tokio::test]
async fn unreachable_database_is_fatal_without_strict_mode() {
    let driver = MemoryDriver::unreachable(Vendor::Postgres, "connection refused");
    let access = DbAccess::with_driver(
        ConnectionConfig::new(Vendor::Postgres, ConnectionParams::default()),
        Arc::new(driver),
    );
    let mut tables = tables(&["cities", "countries"]);

    let err = introspect_constraints(&access, &mut tables, &IntrospectOptions::default())
        .await
        .expect_err("connection failure");
    assert!(err.to_string().contains("connection refused"));
    assert!(tables.values().all(|table| table.primary_key.is_none()));
}
