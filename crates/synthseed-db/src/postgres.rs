use std::sync::Arc;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row};
use tracing::warn;

use synthseed_core::{ConnectionConfig, GeneratedValue, Vendor};

use crate::driver::{ClientPool, DataRow, Driver, QueryData, Session, returns_rows};
use crate::error::{DbError, DbResult};

/// PostgreSQL driver backed by `sqlx`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDriver;

#[async_trait]
impl Driver for PostgresDriver {
    fn vendor(&self) -> Vendor {
        Vendor::Postgres
    }

    async fn connect(&self, config: &ConnectionConfig) -> DbResult<Arc<dyn ClientPool>> {
        let encoding = config.encoding.to_ascii_lowercase().replace('-', "");
        if encoding != "utf8" && encoding != "utf8mb4" {
            warn!(
                encoding = %config.encoding,
                "postgres connections always use UTF8; configured encoding ignored"
            );
        }

        let params = &config.params;
        let mut options = PgConnectOptions::new();
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
        options = options.options([("search_path", config.schema.as_str())]);

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .connect_with(options)
            .await
            .map_err(|err| DbError::Connection {
                vendor: Vendor::Postgres,
                message: err.to_string(),
            })?;
        Ok(Arc::new(PostgresPool { pool }))
    }
}

struct PostgresPool {
    pool: PgPool,
}

#[async_trait]
impl ClientPool for PostgresPool {
    async fn checkout(&self) -> DbResult<Box<dyn Session>> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(PostgresSession { conn }))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

struct PostgresSession {
    conn: PoolConnection<Postgres>,
}

#[async_trait]
impl Session for PostgresSession {
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
    query: Query<'q, Postgres, PgArguments>,
    value: &GeneratedValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        GeneratedValue::Null => query.bind(None::<String>),
        GeneratedValue::Bool(value) => query.bind(*value),
        GeneratedValue::Int(value) => query.bind(*value),
        GeneratedValue::Float(value) => query.bind(*value),
        GeneratedValue::Text(value) => query.bind(value.clone()),
        GeneratedValue::Uuid(value) => match uuid::Uuid::parse_str(value) {
            Ok(id) => query.bind(id),
            Err(_) => query.bind(value.clone()),
        },
        GeneratedValue::Date(value) => query.bind(*value),
        GeneratedValue::Time(value) => query.bind(*value),
        GeneratedValue::Timestamp(value) => query.bind(*value),
    }
}

fn decode_row(row: &PgRow) -> DataRow {
    let mut data = DataRow::new();
    for column in row.columns() {
        let index = column.ordinal();
        let value = row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .or_else(|| text_of::<i64>(row, index))
            .or_else(|| text_of::<i32>(row, index))
            .or_else(|| text_of::<i16>(row, index))
            .or_else(|| text_of::<bool>(row, index))
            .or_else(|| text_of::<f64>(row, index))
            .or_else(|| text_of::<uuid::Uuid>(row, index));
        data.insert(column.name(), value);
    }
    data
}

fn text_of<T>(row: &PgRow, index: usize) -> Option<String>
where
    T: for<'r> sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres> + ToString,
{
    row.try_get::<Option<T>, _>(index)
        .ok()
        .flatten()
        .map(|value| value.to_string())
}
