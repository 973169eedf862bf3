use std::fmt;
use std::sync::Arc;

use tokio::sync::{OnceCell, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info};

use synthseed_core::{ConnectionConfig, GeneratedValue, Vendor};

use crate::driver::{ClientPool, Driver, QueryData, Session, driver_for};
use crate::error::{DbError, DbResult};

const LOGGED_SQL_CHARS: usize = 512;

/// How a failing statement is surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Return the error; the run is expected to stop.
    #[default]
    FailFast,
    /// Log the error and hand it back inside [`QueryOutcome::error`].
    Report,
}

/// A checked-out session holding one slot of the client budget.
///
/// Dropping the client returns both the session and the slot.
pub struct Client {
    session: Box<dyn Session>,
    _permit: OwnedSemaphorePermit,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

/// A statement to run through [`DbAccess::query`].
pub struct Query<'a> {
    caller: &'a str,
    sql: &'a str,
    bindings: &'a [GeneratedValue],
    mode: FailureMode,
    keep_client: bool,
    client: Option<Client>,
}

impl<'a> Query<'a> {
    pub fn new(caller: &'a str, sql: &'a str) -> Self {
        Self {
            caller,
            sql,
            bindings: &[],
            mode: FailureMode::FailFast,
            keep_client: false,
            client: None,
        }
    }

    pub fn bind(mut self, bindings: &'a [GeneratedValue]) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn mode(mut self, mode: FailureMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn report_errors(self) -> Self {
        self.mode(FailureMode::Report)
    }

    /// Hand the client back in the outcome instead of releasing it.
    pub fn keep_client(mut self) -> Self {
        self.keep_client = true;
        self
    }

    /// Run on an already checked-out client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }
}

/// Outcome of a query in [`FailureMode::Report`] mode, or a successful one.
#[derive(Debug, Default)]
pub struct QueryOutcome {
    pub client: Option<Client>,
    pub data: Option<QueryData>,
    pub error: Option<DbError>,
}

impl QueryOutcome {
    pub fn rows(&self) -> &[crate::driver::DataRow] {
        self.data
            .as_ref()
            .map(|data| data.rows.as_slice())
            .unwrap_or_default()
    }

    pub fn into_result(self) -> DbResult<QueryData> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.data.unwrap_or_default()),
        }
    }
}

struct AccessInner {
    driver: Arc<dyn Driver>,
    config: ConnectionConfig,
    pool: OnceCell<Arc<dyn ClientPool>>,
    permits: Arc<Semaphore>,
    capacity: usize,
}

/// Shared handle to the vendor pool.
///
/// The pool is created on first use. At most `pool_size` clients are checked
/// out at once; further callers wait in FIFO order for a released slot.
#[derive(Clone)]
pub struct DbAccess {
    inner: Arc<AccessInner>,
}

impl fmt::Debug for DbAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbAccess")
            .field("vendor", &self.vendor())
            .field("capacity", &self.inner.capacity)
            .field("clients_in_use", &self.clients_in_use())
            .field("connected", &self.inner.pool.initialized())
            .finish()
    }
}

impl DbAccess {
    /// Access layer using the real driver for the configured vendor.
    pub fn connect_lazy(config: ConnectionConfig) -> Self {
        let driver = driver_for(config.vendor);
        Self::with_driver(config, driver)
    }

    pub fn with_driver(config: ConnectionConfig, driver: Arc<dyn Driver>) -> Self {
        let capacity = config.pool_size.max(1) as usize;
        Self {
            inner: Arc::new(AccessInner {
                driver,
                config,
                pool: OnceCell::new(),
                permits: Arc::new(Semaphore::new(capacity)),
                capacity,
            }),
        }
    }

    pub fn vendor(&self) -> Vendor {
        self.inner.driver.vendor()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn clients_in_use(&self) -> usize {
        self.inner.capacity - self.inner.permits.available_permits()
    }

    async fn pool(&self) -> DbResult<Arc<dyn ClientPool>> {
        let pool = self
            .inner
            .pool
            .get_or_try_init(|| async {
                let config = &self.inner.config;
                info!(
                    event = "pool_connecting",
                    vendor = %config.vendor,
                    target = %config.params.redacted(),
                    pool_size = config.pool_size,
                    "creating database pool"
                );
                self.inner.driver.connect(config).await
            })
            .await?;
        Ok(Arc::clone(pool))
    }

    /// Check out a client, waiting while the budget is exhausted.
    pub async fn acquire_client(&self) -> DbResult<Client> {
        let permit = Arc::clone(&self.inner.permits)
            .acquire_owned()
            .await
            .map_err(|_| DbError::PoolClosed)?;
        let pool = self.pool().await?;
        let session = pool.checkout().await?;
        debug!(in_use = self.clients_in_use(), "client acquired");
        Ok(Client {
            session,
            _permit: permit,
        })
    }

    /// Return a client to the pool. `None` is accepted and ignored.
    pub fn release_client(&self, client: Option<Client>) {
        if let Some(client) = client {
            drop(client);
            debug!(in_use = self.clients_in_use(), "client released");
        }
    }

    /// Run one statement.
    ///
    /// Without an explicit client one is acquired and, unless
    /// [`Query::keep_client`] was set, released before returning. Failures are
    /// always logged with the caller tag and statement text.
    pub async fn query(&self, request: Query<'_>) -> DbResult<QueryOutcome> {
        let Query {
            caller,
            sql,
            bindings,
            mode,
            keep_client,
            client,
        } = request;

        let mut client = match client {
            Some(client) => client,
            None => match self.acquire_client().await {
                Ok(client) => client,
                Err(err) => {
                    error!(caller, error = %err, sql = %abbreviate(sql), "cannot obtain a database client");
                    return surface(mode, err, None);
                }
            },
        };

        let result = client.session.execute(sql, bindings).await;
        let client = if keep_client {
            Some(client)
        } else {
            self.release_client(Some(client));
            None
        };

        match result {
            Ok(data) => Ok(QueryOutcome {
                client,
                data: Some(data),
                error: None,
            }),
            Err(err) => {
                let err = DbError::Query {
                    caller: caller.to_string(),
                    message: err.to_string(),
                };
                error!(caller, error = %err, sql = %abbreviate(sql), "query failed");
                surface(mode, err, client)
            }
        }
    }

    /// Close the underlying pool if it was ever opened.
    pub async fn close(&self) {
        if let Some(pool) = self.inner.pool.get() {
            pool.close().await;
            info!(event = "pool_closed", "database pool closed");
        }
    }
}

fn surface(mode: FailureMode, err: DbError, client: Option<Client>) -> DbResult<QueryOutcome> {
    match mode {
        FailureMode::FailFast => Err(err),
        FailureMode::Report => Ok(QueryOutcome {
            client,
            data: None,
            error: Some(err),
        }),
    }
}

fn abbreviate(sql: &str) -> String {
    if sql.chars().count() <= LOGGED_SQL_CHARS {
        return sql.to_string();
    }
    let mut short: String = sql.chars().take(LOGGED_SQL_CHARS).collect();
    short.push_str("...");
    short
}
