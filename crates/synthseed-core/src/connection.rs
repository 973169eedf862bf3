use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_POOL_SIZE: u32 = 10;
pub const DEFAULT_ENCODING: &str = "utf8";
pub const DEFAULT_SCHEMA: &str = "public";

/// Database product targeted by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "pg")]
    Postgres,
}

impl Vendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::MySql => "mysql",
            Vendor::Postgres => "pg",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Vendor {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "mysql" => Ok(Vendor::MySql),
            "pg" | "postgres" | "postgresql" => Ok(Vendor::Postgres),
            other => Err(Error::UnsupportedVendor(other.to_string())),
        }
    }
}

/// Vendor-native connection parameters.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ConnectionParams {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .finish()
    }
}

impl ConnectionParams {
    /// One-line description safe to write to logs.
    pub fn redacted(&self) -> String {
        let user = self.user.as_deref().unwrap_or("");
        let secret = if self.password.is_some() { ":***" } else { "" };
        let at = if user.is_empty() && secret.is_empty() { "" } else { "@" };
        let host = self.host.as_deref().unwrap_or("localhost");
        let port = self.port.map(|port| format!(":{port}")).unwrap_or_default();
        let database = self.database.as_deref().unwrap_or("");
        format!("{user}{secret}{at}{host}{port}/{database}")
    }
}

/// Raw `connection.json` document as written by users.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionDocument {
    pub db_vendor: String,
    #[serde(default)]
    pub connection: ConnectionParams,
    #[serde(default)]
    pub db_uploads_path: Option<PathBuf>,
    #[serde(default)]
    pub connection_pool_size: Option<u32>,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
}

/// Resolved connection configuration with defaults applied.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub vendor: Vendor,
    pub params: ConnectionParams,
    pub uploads_path: Option<PathBuf>,
    pub pool_size: u32,
    pub encoding: String,
    /// Only meaningful for PostgreSQL.
    pub schema: String,
}

impl ConnectionConfig {
    pub fn new(vendor: Vendor, params: ConnectionParams) -> Self {
        Self {
            vendor,
            params,
            uploads_path: None,
            pool_size: DEFAULT_POOL_SIZE,
            encoding: DEFAULT_ENCODING.to_string(),
            schema: DEFAULT_SCHEMA.to_string(),
        }
    }

    pub fn from_document(doc: ConnectionDocument) -> Result<Self> {
        let vendor = doc.db_vendor.parse::<Vendor>()?;
        let pool_size = doc.connection_pool_size.unwrap_or(DEFAULT_POOL_SIZE);
        if pool_size == 0 {
            return Err(Error::InvalidConfiguration(
                "connection_pool_size must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            vendor,
            params: doc.connection,
            uploads_path: doc.db_uploads_path,
            pool_size,
            encoding: doc
                .encoding
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ENCODING.to_string()),
            schema: doc
                .schema
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
        })
    }

    /// Directory receiving CSV dumps of generated tables.
    pub fn synthetic_data_files_path(&self) -> Option<PathBuf> {
        self.uploads_path
            .as_ref()
            .map(|path| path.join("synthetic_data_files"))
    }
}
