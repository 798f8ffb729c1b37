//! Error types for MySQL operations.

use thiserror::Error;

/// Result type for MySQL operations.
pub type MysqlResult<T> = Result<T, MysqlError>;

/// Error type for MySQL operations.
#[derive(Error, Debug)]
pub enum MysqlError {
    /// Pool error.
    #[error("pool error: {0}")]
    Pool(String),

    /// MySQL driver error.
    #[error(transparent)]
    Mysql(#[from] mysql_async::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Timeout error.
    #[error("timeout error: {0}")]
    Timeout(String),
}

impl MysqlError {
    /// Create a pool error.
    pub fn pool(msg: impl Into<String>) -> Self {
        Self::Pool(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Whether the error came from the server or the wire.
    pub fn is_driver(&self) -> bool {
        matches!(self, Self::Mysql(_))
    }
}

impl From<MysqlError> for strata_core::Error {
    fn from(err: MysqlError) -> Self {
        strata_core::Error::backend(err)
    }
}
