//! A single pool bound to a schema.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info};

use crate::backend::{self, BackendRegistry, ConnectionPool, ExecResult, PoolLimits, Row};
use crate::dsn::{DsnJoiner, dsn_joiner};
use crate::error::{Error, Result};
use crate::schema::Schema;

/// A live connection pool together with the schema it was opened from.
pub struct Driver {
    name: String,
    dsn: String,
    schema: Schema,
    pool: Box<dyn ConnectionPool>,
    closed: AtomicBool,
}

impl Driver {
    /// Start building a driver.
    pub fn builder() -> DriverBuilder {
        DriverBuilder::new()
    }

    /// Backend name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// DSN the pool was opened with.
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    /// Schema the driver was built from.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Underlying pool.
    pub fn pool(&self) -> &dyn ConnectionPool {
        self.pool.as_ref()
    }

    /// Whether [`Driver::close`] has succeeded.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Run a query and return every row.
    ///
    /// Fails with [`Error::EmptyResult`] when nothing matched.
    pub async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Row>> {
        debug!(backend = %self.name, database = %self.schema.database(), sql = %sql, "Executing query");
        let rows = self.pool.query(sql, args).await?;
        if rows.is_empty() {
            return Err(Error::EmptyResult);
        }
        Ok(rows)
    }

    /// Run a query and return its first row.
    ///
    /// Fails with [`Error::EmptyResult`] when nothing matched.
    pub async fn first(&self, sql: &str, args: &[Value]) -> Result<Row> {
        debug!(backend = %self.name, database = %self.schema.database(), sql = %sql, "Executing first");
        self.pool
            .query(sql, args)
            .await?
            .into_iter()
            .next()
            .ok_or(Error::EmptyResult)
    }

    /// Run a statement that returns no rows.
    pub async fn exec(&self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        debug!(backend = %self.name, database = %self.schema.database(), sql = %sql, "Executing statement");
        self.pool.exec(sql, args).await
    }

    /// Close the pool.
    ///
    /// Calls after a successful close are no-ops. A failed close leaves the
    /// driver open, so the next call tries again.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Err(e) = self.pool.close().await {
            self.closed.store(false, Ordering::Release);
            return Err(e);
        }
        info!(backend = %self.name, host = %self.schema.host(), database = %self.schema.database(), "Driver closed");
        Ok(())
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("name", &self.name)
            .field("host", &self.schema.host())
            .field("port", &self.schema.port())
            .field("database", &self.schema.database())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[derive(Default)]
struct DriverFields {
    name: String,
    schema: Option<Schema>,
    joiner: Option<DsnJoiner>,
    registry: Option<Arc<BackendRegistry>>,
}

/// Builder for [`Driver`].
///
/// Like every builder here, setters lock around each write but `build` is not
/// atomic with respect to concurrent setters.
#[derive(Default)]
pub struct DriverBuilder {
    fields: Mutex<DriverFields>,
}

impl DriverBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend name.
    pub fn name(&self, s: impl AsRef<str>) -> &Self {
        let s = s.as_ref().trim().to_string();
        self.fields.lock().name = s;
        self
    }

    /// Set the schema.
    pub fn schema(&self, schema: Schema) -> &Self {
        self.fields.lock().schema = Some(schema);
        self
    }

    /// Replace the DSN strategy.
    pub fn joiner(&self, joiner: DsnJoiner) -> &Self {
        self.fields.lock().joiner = Some(joiner);
        self
    }

    /// Resolve backends in `registry` instead of the process-wide one.
    pub fn registry(&self, registry: Arc<BackendRegistry>) -> &Self {
        self.fields.lock().registry = Some(registry);
        self
    }

    /// Open the pool and wrap it in a [`Driver`].
    pub fn build(&self) -> Result<Driver> {
        let f = self.fields.lock();

        if f.name.is_empty() {
            return Err(Error::Empty("name"));
        }

        let Some(schema) = f.schema.clone() else {
            return Err(Error::Nil("schema"));
        };

        let dsn = match &f.joiner {
            Some(joiner) => joiner(&schema),
            None => dsn_joiner(Some(&schema)),
        };
        if dsn.is_empty() {
            return Err(Error::Empty("dsn"));
        }

        let registry = f.registry.clone().unwrap_or_else(backend::registry);
        let limits = PoolLimits::from_schema(&schema);
        let pool = registry.open(&f.name, &dsn, &limits)?;

        info!(
            backend = %f.name,
            host = %schema.host(),
            port = schema.port(),
            database = %schema.database(),
            max_open = ?limits.max_open,
            "Driver opened"
        );

        Ok(Driver {
            name: f.name.clone(),
            dsn,
            schema,
            pool,
            closed: AtomicBool::new(false),
        })
    }
}
