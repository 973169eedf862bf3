//! Loading of `connection.json` and the per-table documents.
//!
//! Layout under the base directory:
//!
//! ```text
//! config/connection.json
//! config/synthetic_data_configuration/<table>.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use jsonschema::JSONSchema;
use schemars::schema::RootSchema;
use schemars::schema_for;
use serde::de::DeserializeOwned;
use serde_json::Value;

use synthseed_core::{
    ConnectionConfig, ConnectionDocument, TableConfiguration, TableConfigurations, TableDocument,
};

use crate::error::ConfigError;

pub const CONFIG_DIR: &str = "config";
pub const CONNECTION_FILE: &str = "connection.json";
pub const TABLES_DIR: &str = "synthetic_data_configuration";

/// JSON Schema every per-table document must satisfy.
pub fn table_document_schema() -> RootSchema {
    schema_for!(TableDocument)
}

pub fn connection_path(base_dir: &Path) -> PathBuf {
    base_dir.join(CONFIG_DIR).join(CONNECTION_FILE)
}

pub fn tables_dir(base_dir: &Path) -> PathBuf {
    base_dir.join(CONFIG_DIR).join(TABLES_DIR)
}

pub fn load_connection(base_dir: &Path) -> Result<ConnectionConfig, ConfigError> {
    let path = connection_path(base_dir);
    let value = read_json(&path)?;
    let doc: ConnectionDocument = parse_json(&path, value)?;
    Ok(ConnectionConfig::from_document(doc)?)
}

/// Load every `<table>.json`; the file stem is the table name.
pub fn load_tables(base_dir: &Path) -> Result<TableConfigurations, ConfigError> {
    let dir = tables_dir(base_dir);
    let entries = fs::read_dir(&dir).map_err(|source| ConfigError::Read {
        path: dir.clone(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ConfigError::Read {
            path: dir.clone(),
            source,
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let schema = serde_json::to_value(table_document_schema())
        .map_err(|err| ConfigError::SchemaCompile(err.to_string()))?;
    let compiled =
        JSONSchema::compile(&schema).map_err(|err| ConfigError::SchemaCompile(err.to_string()))?;

    let mut tables = TableConfigurations::new();
    for path in paths {
        let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let value = read_json(&path)?;
        validate_document(&compiled, &path, &value)?;
        let doc: TableDocument = parse_json(&path, value)?;
        tables.insert(name.to_string(), TableConfiguration::from_document(name, doc));
    }
    Ok(tables)
}

fn validate_document(compiled: &JSONSchema, path: &Path, value: &Value) -> Result<(), ConfigError> {
    if let Err(errors) = compiled.validate(value) {
        let messages = errors
            .map(|error| format!("{}: {error}", error.instance_path))
            .collect();
        return Err(ConfigError::Schema {
            path: path.to_path_buf(),
            messages,
        });
    }
    Ok(())
}

fn read_json(path: &Path) -> Result<Value, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_json<T: DeserializeOwned>(path: &Path, value: Value) -> Result<T, ConfigError> {
    serde_json::from_value(value).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_base(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "synthseed_config_{label}_{}",
            uuid::Uuid::new_v4()
        ));
        fs::create_dir_all(tables_dir(&dir)).expect("create config dirs");
        dir
    }

    #[test]
    fn loads_tables_by_file_stem() {
        let base = temp_base("load");
        fs::write(
            tables_dir(&base).join("countries.json"),
            r#"{"amount": 2, "faker_schema": {"id": {"generator": "int.sequence"}}}"#,
        )
        .expect("write countries");
        fs::write(tables_dir(&base).join("notes.txt"), "ignored").expect("write notes");

        let tables = load_tables(&base).expect("load tables");
        assert_eq!(tables.keys().collect::<Vec<_>>(), vec!["countries"]);
        assert_eq!(tables["countries"].amount, Some(2));
        fs::remove_dir_all(&base).ok();
    }

    #[test]
    fn schema_rejects_unknown_fields() {
        let base = temp_base("schema");
        fs::write(
            tables_dir(&base).join("users.json"),
            r#"{"amount": 2, "faker_schema": {}, "amout": 3}"#,
        )
        .expect("write users");

        let err = load_tables(&base).expect_err("unknown field");
        assert!(matches!(err, ConfigError::Schema { .. }));
        fs::remove_dir_all(&base).ok();
    }

    #[test]
    fn loads_connection_defaults() {
        let base = temp_base("connection");
        fs::write(
            connection_path(&base),
            r#"{"db_vendor": "mysql", "connection": {"host": "db", "database": "shop"}}"#,
        )
        .expect("write connection");

        let config = load_connection(&base).expect("connection");
        assert_eq!(config.vendor, synthseed_core::Vendor::MySql);
        assert_eq!(config.pool_size, 10);
        fs::remove_dir_all(&base).ok();
    }
}
