//! In-memory driver used for dry runs and tests.
//!
//! Every statement is recorded. A handler decides what each statement returns,
//! so callers can script result sets and failures without a database server.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use synthseed_core::{ConnectionConfig, GeneratedValue, Vendor};

use crate::driver::{ClientPool, DataRow, Driver, QueryData, Session};
use crate::error::{DbError, DbResult};

/// What the in-memory driver answers for one statement.
#[derive(Debug, Clone)]
pub enum MemoryResponse {
    Rows(Vec<DataRow>),
    Affected(u64),
    Fail(String),
}

/// A statement seen by the in-memory driver.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub sql: String,
    pub bindings: Vec<GeneratedValue>,
}

type Handler = dyn Fn(&str, &[GeneratedValue]) -> MemoryResponse + Send + Sync;

struct MemoryState {
    vendor: Vendor,
    handler: Box<Handler>,
    statements: Mutex<Vec<RecordedStatement>>,
    connects: AtomicUsize,
    fail_connect: Option<String>,
}

#[derive(Clone)]
pub struct MemoryDriver {
    state: Arc<MemoryState>,
}

impl fmt::Debug for MemoryDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDriver")
            .field("vendor", &self.state.vendor)
            .field("connects", &self.connect_count())
            .finish_non_exhaustive()
    }
}

impl MemoryDriver {
    /// Driver that accepts every statement and returns no rows.
    pub fn new(vendor: Vendor) -> Self {
        Self::with_handler(vendor, |_, _| MemoryResponse::Affected(0))
    }

    pub fn with_handler<F>(vendor: Vendor, handler: F) -> Self
    where
        F: Fn(&str, &[GeneratedValue]) -> MemoryResponse + Send + Sync + 'static,
    {
        Self {
            state: Arc::new(MemoryState {
                vendor,
                handler: Box::new(handler),
                statements: Mutex::new(Vec::new()),
                connects: AtomicUsize::new(0),
                fail_connect: None,
            }),
        }
    }

    /// Driver whose pool can never be opened.
    pub fn unreachable(vendor: Vendor, message: impl Into<String>) -> Self {
        Self {
            state: Arc::new(MemoryState {
                vendor,
                handler: Box::new(|_, _| MemoryResponse::Affected(0)),
                statements: Mutex::new(Vec::new()),
                connects: AtomicUsize::new(0),
                fail_connect: Some(message.into()),
            }),
        }
    }

    pub fn statements(&self) -> Vec<RecordedStatement> {
        self.state
            .statements
            .lock()
            .map(|statements| statements.clone())
            .unwrap_or_default()
    }

    /// Number of times a pool was opened.
    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    fn vendor(&self) -> Vendor {
        self.state.vendor
    }

    async fn connect(&self, _config: &ConnectionConfig) -> DbResult<Arc<dyn ClientPool>> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        // Give concurrent first callers a chance to race the pool creation.
        tokio::task::yield_now().await;
        if let Some(message) = &self.state.fail_connect {
            return Err(DbError::Connection {
                vendor: self.state.vendor,
                message: message.clone(),
            });
        }
        Ok(Arc::new(MemoryPool {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MemoryPool {
    state: Arc<MemoryState>,
}

#[async_trait]
impl ClientPool for MemoryPool {
    async fn checkout(&self) -> DbResult<Box<dyn Session>> {
        Ok(Box::new(MemorySession {
            state: Arc::clone(&self.state),
        }))
    }

    async fn close(&self) {}
}

struct MemorySession {
    state: Arc<MemoryState>,
}

#[async_trait]
impl Session for MemorySession {
    async fn execute(&mut self, sql: &str, bindings: &[GeneratedValue]) -> DbResult<QueryData> {
        if let Ok(mut statements) = self.state.statements.lock() {
            statements.push(RecordedStatement {
                sql: sql.to_string(),
                bindings: bindings.to_vec(),
            });
        }
        match (self.state.handler)(sql, bindings) {
            MemoryResponse::Rows(rows) => Ok(QueryData {
                rows,
                rows_affected: 0,
            }),
            MemoryResponse::Affected(rows_affected) => Ok(QueryData {
                rows: Vec::new(),
                rows_affected,
            }),
            MemoryResponse::Fail(message) => Err(DbError::Driver(message)),
        }
    }
}
