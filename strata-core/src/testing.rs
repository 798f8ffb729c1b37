//! In-memory backend for tests.
//!
//! [`MemoryBackend`] records every pool it opens, serves canned rows, and can
//! be told to fail opens or closes. Clones share state, so a test keeps one
//! handle for assertions and registers another.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::backend::{Backend, ConnectionPool, ExecResult, PoolLimits, Row};
use crate::error::{Error, Result};

/// Error raised by the in-memory backend.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct MemoryError(pub String);

/// A pool the backend opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRecord {
    /// DSN the pool was opened with.
    pub dsn: String,
    /// Limits passed at open time.
    pub limits: PoolLimits,
}

#[derive(Debug, Default)]
struct Shared {
    opened: Mutex<Vec<OpenRecord>>,
    close_calls: AtomicUsize,
}

/// Backend that never touches the network.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    name: String,
    rows: Vec<Row>,
    open_error: Option<String>,
    close_error_for: Vec<String>,
    shared: Arc<Shared>,
}

impl MemoryBackend {
    /// Create a backend registered as `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
            open_error: None,
            close_error_for: Vec::new(),
            shared: Arc::new(Shared::default()),
        }
    }

    /// Rows every query returns.
    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    /// Make every open fail with `message`.
    pub fn fail_open(mut self, message: impl Into<String>) -> Self {
        self.open_error = Some(message.into());
        self
    }

    /// Make closing fail for pools whose DSN contains `needle`.
    pub fn fail_close_when(mut self, needle: impl Into<String>) -> Self {
        self.close_error_for.push(needle.into());
        self
    }

    /// Every pool opened so far.
    pub fn opened(&self) -> Vec<OpenRecord> {
        self.shared.opened.lock().clone()
    }

    /// Number of close calls that reached a pool.
    pub fn close_calls(&self) -> usize {
        self.shared.close_calls.load(Ordering::SeqCst)
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, dsn: &str, limits: &PoolLimits) -> Result<Box<dyn ConnectionPool>> {
        if let Some(message) = &self.open_error {
            return Err(Error::backend(MemoryError(message.clone())));
        }

        self.shared.opened.lock().push(OpenRecord {
            dsn: dsn.to_string(),
            limits: *limits,
        });

        Ok(Box::new(MemoryPool {
            dsn: dsn.to_string(),
            rows: self.rows.clone(),
            fail_close: self.close_error_for.iter().any(|n| dsn.contains(n.as_str())),
            shared: self.shared.clone(),
        }))
    }
}

struct MemoryPool {
    dsn: String,
    rows: Vec<Row>,
    fail_close: bool,
    shared: Arc<Shared>,
}

#[async_trait]
impl ConnectionPool for MemoryPool {
    async fn query(&self, _sql: &str, _args: &[Value]) -> Result<Vec<Row>> {
        Ok(self.rows.clone())
    }

    async fn exec(&self, _sql: &str, args: &[Value]) -> Result<ExecResult> {
        Ok(ExecResult {
            rows_affected: args.len() as u64,
            last_insert_id: None,
        })
    }

    async fn close(&self) -> Result<()> {
        self.shared.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(Error::backend(MemoryError(format!(
                "close {}: broken pipe",
                self.dsn
            ))));
        }
        Ok(())
    }
}
