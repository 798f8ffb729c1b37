//! The seam between the topology layer and concrete database drivers.
//!
//! A [`Backend`] opens a [`ConnectionPool`] from a DSN. Backends are looked up
//! by name in a [`BackendRegistry`]; the process-wide registry is reached
//! through [`registry`] and filled with [`register`].
//!
//! ```rust,ignore
//! use strata_core::backend;
//!
//! backend::register(strata_mysql::MysqlBackend::new());
//! assert!(backend::registry().contains("mysql"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::schema::Schema;

/// One result row, column name to value, in select order.
pub type Row = IndexMap<String, Value>;

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Number of rows changed.
    pub rows_affected: u64,
    /// Auto-increment id generated by the statement, if any.
    pub last_insert_id: Option<u64>,
}

/// Pool limits handed to a backend at open time.
///
/// `None` leaves the backend default in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolLimits {
    /// Maximum open connections.
    pub max_open: Option<u32>,
    /// Maximum idle connections.
    pub max_idle: Option<u32>,
    /// Maximum lifetime of a connection.
    pub max_lifetime: Option<Duration>,
}

impl PoolLimits {
    /// Take every strictly positive limit from a schema.
    pub fn from_schema(schema: &Schema) -> Self {
        Self {
            max_open: Some(schema.max_open()).filter(|n| *n > 0),
            max_idle: Some(schema.max_idle()).filter(|n| *n > 0),
            max_lifetime: Some(schema.max_lifetime()).filter(|d| !d.is_zero()),
        }
    }
}

/// A live connection pool owned by exactly one driver.
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    /// Run a statement that returns rows.
    ///
    /// Values are JSON. A backend must decode a row the same way whether the
    /// statement ran with or without args.
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>>;

    /// Run a statement that returns no rows.
    async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult>;

    /// Close every connection in the pool.
    ///
    /// May be called again after a failure.
    async fn close(&self) -> Result<()>;
}

/// Something that can open pools for one kind of database.
pub trait Backend: Send + Sync {
    /// Name drivers refer to this backend by, e.g. `mysql`.
    fn name(&self) -> &str;

    /// Open a pool for `dsn`, applying whichever limits are set.
    fn open(&self, dsn: &str, limits: &PoolLimits) -> Result<Box<dyn ConnectionPool>>;
}

/// Name-indexed set of backends.
#[derive(Default)]
pub struct BackendRegistry {
    backends: RwLock<HashMap<String, Arc<dyn Backend>>>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its own name, returning the one it replaced.
    pub fn register(&self, backend: impl Backend + 'static) -> Option<Arc<dyn Backend>> {
        self.register_arc(Arc::new(backend))
    }

    /// Register a shared backend under its own name.
    pub fn register_arc(&self, backend: Arc<dyn Backend>) -> Option<Arc<dyn Backend>> {
        let name = backend.name().to_string();
        debug!(backend = %name, "Registering backend");
        self.backends.write().insert(name, backend)
    }

    /// Look a backend up by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Backend>> {
        self.backends.read().get(name).cloned()
    }

    /// Whether a backend is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.backends.read().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Open a pool through the backend registered as `name`.
    pub fn open(
        &self,
        name: &str,
        dsn: &str,
        limits: &PoolLimits,
    ) -> Result<Box<dyn ConnectionPool>> {
        let backend = self
            .get(name)
            .ok_or_else(|| Error::UnknownBackend(name.to_string()))?;
        backend.open(dsn, limits)
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.names())
            .finish()
    }
}

static GLOBAL: OnceLock<Arc<BackendRegistry>> = OnceLock::new();

/// The process-wide registry used when a builder is given none.
pub fn registry() -> Arc<BackendRegistry> {
    GLOBAL.get_or_init(|| Arc::new(BackendRegistry::new())).clone()
}

/// Register a backend in the process-wide registry.
pub fn register(backend: impl Backend + 'static) -> Option<Arc<dyn Backend>> {
    registry().register(backend)
}
