use std::sync::Arc;

use async_trait::async_trait;
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlPoolOptions, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::{Column, MySql, MySqlPool, Row};

use synthseed_core::{ConnectionConfig, GeneratedValue, Vendor};

use crate::driver::{ClientPool, DataRow, Driver, QueryData, Session, returns_rows};
use crate::error::{DbError, DbResult};

/// MySQL driver backed by `sqlx`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDriver;

/// MySQL's `utf8` is a 3-byte subset; generated text may need all of UTF-8.
fn charset_for(encoding: &str) -> String {
    let normalized = encoding.trim().to_ascii_lowercase().replace('-', "");
    match normalized.as_str() {
        "utf8" | "utf8mb3" => "utf8mb4".to_string(),
        _ => normalized,
    }
}

#[async_trait]
impl Driver for MySqlDriver {
    fn vendor(&self) -> Vendor {
        Vendor::MySql
    }

    async fn connect(&self, config: &ConnectionConfig) -> DbResult<Arc<dyn ClientPool>> {
        let params = &config.params;
        let mut options = MySqlConnectOptions::new().charset(&charset_for(&config.encoding));
        if let Some(host) = &params.host {
            options = options.host(host);
        }
        if let Some(port) = params.port {
            options = options.port(port);
        }
        if let Some(user) = &params.user {
            options = options.username(user);
        }
        if let Some(password) = &params.password {
            options = options.password(password);
        }
        if let Some(database) = &params.database {
            options = options.database(database);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(config.pool_size)
            .connect_with(options)
            .await
            .map_err(|err| DbError::Connection {
                vendor: Vendor::MySql,
                message: err.to_string(),
            })?;
        Ok(Arc::new(MySqlClientPool { pool }))
    }
}

struct MySqlClientPool {
    pool: MySqlPool,
}

#[async_trait]
impl ClientPool for MySqlClientPool {
    async fn checkout(&self) -> DbResult<Box<dyn Session>> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(MySqlSession { conn }))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

struct MySqlSession {
    conn: PoolConnection<MySql>,
}

#[async_trait]
impl Session for MySqlSession {
    async fn execute(&mut self, sql: &str, bindings: &[GeneratedValue]) -> DbResult<QueryData> {
        let mut query = sqlx::query(sql);
        for value in bindings {
            query = bind_value(query, value);
        }

        if returns_rows(sql) {
            let rows = query.fetch_all(&mut *self.conn).await?;
            Ok(QueryData {
                rows: rows.iter().map(decode_row).collect(),
                rows_affected: 0,
            })
        } else {
            let result = query.execute(&mut *self.conn).await?;
            Ok(QueryData {
                rows: Vec::new(),
                rows_affected: result.rows_affected(),
            })
        }
    }
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &GeneratedValue,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        GeneratedValue::Null => query.bind(None::<String>),
        GeneratedValue::Bool(value) => query.bind(*value),
        GeneratedValue::Int(value) => query.bind(*value),
        GeneratedValue::Float(value) => query.bind(*value),
        GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => query.bind(value.clone()),
        GeneratedValue::Date(value) => query.bind(*value),
        GeneratedValue::Time(value) => query.bind(*value),
        GeneratedValue::Timestamp(value) => query.bind(*value),
    }
}

fn decode_row(row: &MySqlRow) -> DataRow {
    let mut data = DataRow::new();
    for column in row.columns() {
        let index = column.ordinal();
        let value = row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .or_else(|| text_of::<i64>(row, index))
            .or_else(|| text_of::<u64>(row, index))
            .or_else(|| text_of::<i32>(row, index))
            .or_else(|| text_of::<f64>(row, index))
            .or_else(|| text_of::<bool>(row, index));
        data.insert(column.name(), value);
    }
    data
}

fn text_of<T>(row: &MySqlRow, index: usize) -> Option<String>
where
    T: for<'r> sqlx::Decode<'r, MySql> + sqlx::Type<MySql> + ToString,
{
    row.try_get::<Option<T>, _>(index)
        .ok()
        .flatten()
        .map(|value| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::charset_for;

    #[test]
    fn utf8_upgrades_to_utf8mb4() {
        assert_eq!(charset_for("utf8"), "utf8mb4");
        assert_eq!(charset_for("UTF-8"), "utf8mb4");
        assert_eq!(charset_for("latin1"), "latin1");
    }
}
