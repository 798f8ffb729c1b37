//! MySQL backend for strata.
//!
//! This crate opens `mysql_async` pools from the DSNs strata builds, so
//! drivers named `"mysql"` resolve to real connections.
//!
//! # Features
//!
//! - Positional DSN parsing (`user:pass@tcp(host:port)/db?charset=..`)
//! - Pool limits mapped onto `mysql_async` pool constraints
//! - Rows decoded to JSON values, column order preserved
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_core::{DriversBuilder, Role};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     strata_mysql::register();
//!
//!     let builder = DriversBuilder::new();
//!     builder.set_id("orders")?;
//!     builder.set_name("mysql")?;
//!     builder.add_writer(schema);
//!     let drivers = builder.build()?;
//!
//!     let row = drivers.get(Role::Writer)?.first("SELECT NOW() AS now", &[]).await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod pool;
pub mod row;
pub mod types;

pub use backend::{MysqlBackend, register};
pub use config::MysqlConfig;
pub use error::{MysqlError, MysqlResult};
pub use pool::MysqlPool;
