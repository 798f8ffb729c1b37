//! The `mysql` backend.

use std::sync::Arc;

use strata_core::{Backend, ConnectionPool, PoolLimits};
use tracing::debug;

use crate::config::MysqlConfig;
use crate::pool::MysqlPool;

/// Name drivers use to select this backend.
pub const NAME: &str = "mysql";

/// Opens [`MysqlPool`]s from strata DSNs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlBackend;

impl MysqlBackend {
    /// Create the backend.
    pub fn new() -> Self {
        Self
    }
}

impl Backend for MysqlBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn open(&self, dsn: &str, limits: &PoolLimits) -> strata_core::Result<Box<dyn ConnectionPool>> {
        let config = MysqlConfig::parse(dsn)?;
        debug!(host = %config.host, database = %config.database, "Opening MySQL pool");
        Ok(Box::new(MysqlPool::open(config, limits)?))
    }
}

/// Install the backend in the process-wide registry.
///
/// Returns `true` when it replaced an earlier registration.
pub fn register() -> bool {
    strata_core::backend::registry()
        .register_arc(Arc::new(MysqlBackend))
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{BackendRegistry, Error};

    #[test]
    fn test_name() {
        assert_eq!(MysqlBackend::new().name(), "mysql");
    }

    #[test]
    fn test_open_rejects_bad_dsn() {
        let err = MysqlBackend
            .open("not a dsn", &PoolLimits::default())
            .err()
            .unwrap();
        assert!(matches!(err, Error::Backend(_)));
        assert_eq!(err.to_string(), "configuration error: missing '/' before database name");
    }

    #[tokio::test]
    async fn test_open_through_registry() {
        let registry = BackendRegistry::new();
        registry.register(MysqlBackend::new());

        let pool = registry.open(
            "mysql",
            "root:123456@tcp(127.0.0.1:3306)/test?charset=utf8mb4&collation=utf8mb4_general_ci",
            &PoolLimits::default(),
        );
        assert!(pool.is_ok());
    }

    #[test]
    fn test_register_global() {
        register();
        assert!(strata_core::backend::registry().contains("mysql"));
        assert!(register());
    }
}
