//! Connection pool for MySQL.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, Opts, Pool, PoolConstraints, PoolOpts};
use serde_json::Value as JsonValue;
use strata_core::{ConnectionPool, ExecResult, PoolLimits, Row};
use tracing::{debug, info};

use crate::config::MysqlConfig;
use crate::error::{MysqlError, MysqlResult};
use crate::row::decode_row;
use crate::types::to_params;

/// Idle connections kept when no limit is configured.
pub const DEFAULT_MIN_CONNECTIONS: usize = 10;

/// Open connections allowed when no limit is configured.
pub const DEFAULT_MAX_CONNECTIONS: usize = 100;

/// A connection pool for MySQL.
pub struct MysqlPool {
    inner: Pool,
    config: Arc<MysqlConfig>,
    closed: AtomicBool,
}

impl MysqlPool {
    /// Create a pool from configuration and limits.
    ///
    /// No connection is made until the first query. Must be called from
    /// within a tokio runtime.
    pub fn open(config: MysqlConfig, limits: &PoolLimits) -> MysqlResult<Self> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(MysqlError::pool("opening a pool requires a tokio runtime"));
        }

        let (min, max) = constraints(limits);
        let constraints = PoolConstraints::new(min, max).ok_or_else(|| {
            MysqlError::pool(format!("invalid pool constraints min={} max={}", min, max))
        })?;
        let pool_opts = PoolOpts::new()
            .with_constraints(constraints)
            .with_abs_conn_ttl(limits.max_lifetime);

        let pool = Pool::new(Opts::from(config.to_opts_builder().pool_opts(pool_opts)));

        info!(
            host = %config.host,
            port = %config.port,
            database = %config.database,
            min_connections = min,
            max_connections = max,
            "MySQL connection pool created"
        );

        Ok(Self {
            inner: pool,
            config: Arc::new(config),
            closed: AtomicBool::new(false),
        })
    }

    /// Get the pool configuration.
    pub fn config(&self) -> &MysqlConfig {
        &self.config
    }

    /// Whether [`ConnectionPool::close`] has succeeded.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn conn(&self) -> MysqlResult<Conn> {
        if self.is_closed() {
            return Err(MysqlError::pool("pool is closed"));
        }

        debug!("Acquiring connection from pool");
        match self.config.connect_timeout {
            Some(limit) if !limit.is_zero() => tokio::time::timeout(limit, self.inner.get_conn())
                .await
                .map_err(|_| MysqlError::timeout(format!("no connection within {:?}", limit)))?
                .map_err(MysqlError::from),
            _ => Ok(self.inner.get_conn().await?),
        }
    }
}

/// `(min, max)` connection counts for the given limits.
///
/// `max_idle` becomes the idle floor, capped by `max_open`.
pub fn constraints(limits: &PoolLimits) -> (usize, usize) {
    let max = limits
        .max_open
        .map_or(DEFAULT_MAX_CONNECTIONS, |n| n as usize);
    let min = limits
        .max_idle
        .map_or(DEFAULT_MIN_CONNECTIONS, |n| n as usize);

    match limits.max_open {
        Some(_) => (min.min(max), max),
        None => (min, max.max(min)),
    }
}

#[async_trait]
impl ConnectionPool for MysqlPool {
    async fn query(&self, sql: &str, args: &[JsonValue]) -> strata_core::Result<Vec<Row>> {
        let mut conn = self.conn().await?;
        debug!(query = %sql, args = args.len(), "Executing query");

        let rows = if args.is_empty() {
            conn.query::<mysql_async::Row, _>(sql).await
        } else {
            conn.exec::<mysql_async::Row, _, _>(sql, to_params(args)).await
        }
        .map_err(MysqlError::from)?;

        Ok(rows.iter().map(decode_row).collect())
    }

    async fn exec(&self, sql: &str, args: &[JsonValue]) -> strata_core::Result<ExecResult> {
        let mut conn = self.conn().await?;
        debug!(query = %sql, args = args.len(), "Executing statement");

        if args.is_empty() {
            conn.query_drop(sql).await
        } else {
            conn.exec_drop(sql, to_params(args)).await
        }
        .map_err(MysqlError::from)?;

        Ok(ExecResult {
            rows_affected: conn.affected_rows(),
            last_insert_id: conn.last_insert_id().filter(|id| *id != 0),
        })
    }

    async fn close(&self) -> strata_core::Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        if let Err(e) = self.inner.clone().disconnect().await {
            self.closed.store(false, Ordering::Release);
            return Err(MysqlError::from(e).into());
        }
        info!(database = %self.config.database, "MySQL connection pool closed");
        Ok(())
    }
}
