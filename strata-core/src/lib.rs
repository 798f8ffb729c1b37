//! # strata-core
//!
//! Connection topology for fleets of relational databases.
//!
//! This crate turns configuration into live, routable connection pools:
//! - [`Schema`] describes how to reach one database, validated by [`SchemaBuilder`]
//! - [`Profile`] is the flat key/value record configuration files are made of
//! - [`Driver`] binds one pool to one schema
//! - [`Drivers`] groups writers, readers and backups and picks one at random per role
//! - [`Sharding`] maps shard numbers to the driver of each physical database
//!
//! Pools come from a [`Backend`] looked up by name in a [`BackendRegistry`].
//! The MySQL backend lives in `strata-mysql`.
//!
//! ## Schemas and DSNs
//!
//! ```rust
//! use strata_core::{SchemaBuilder, dsn_joiner};
//!
//! let builder = SchemaBuilder::new();
//! builder
//!     .host("127.0.0.1")
//!     .database("test")
//!     .username("root")
//!     .password("123456");
//! let schema = builder.build().unwrap();
//!
//! assert_eq!(
//!     dsn_joiner(Some(&schema)),
//!     "root:123456@tcp(127.0.0.1:3306)/test?charset=utf8mb4&collation=utf8mb4_general_ci"
//! );
//! ```
//!
//! ## Replica groups
//!
//! ```rust,ignore
//! use strata_core::{DriversBuilder, Role};
//!
//! let builder = DriversBuilder::new();
//! builder.set_id("orders")?;
//! builder.set_name("mysql")?;
//! builder.add_writer(primary);
//! builder.add_reader(replica_a);
//! builder.add_reader(replica_b);
//!
//! let drivers = builder.build()?;
//! let rows = drivers.get(Role::Reader)?.query("SELECT 1", &[]).await?;
//! ```
//!
//! ## Empty results
//!
//! Queries that match nothing fail with [`Error::EmptyResult`]; use
//! [`is_empty_result`] to tell absence apart from real failures.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

pub mod backend;
pub mod defaults;
pub mod driver;
pub mod drivers;
pub mod dsn;
pub mod error;
pub mod logging;
pub mod picker;
pub mod profile;
pub mod role;
pub mod schema;
pub mod sharding;

#[cfg(any(test, feature = "testing"))]
#[cfg_attr(docsrs, doc(cfg(feature = "testing")))]
pub mod testing;

pub use backend::{Backend, BackendRegistry, ConnectionPool, ExecResult, PoolLimits, Row};
pub use driver::{Driver, DriverBuilder};
pub use drivers::{Drivers, DriversBuilder};
pub use dsn::{DsnJoiner, default_joiner, dsn_joiner, dsn_path, dsn_query};
pub use error::{BoxError, CloseFailure, Error, Result, is_empty_result};
pub use picker::{IndexPicker, SeededPicker, ThreadRngPicker};
pub use profile::Profile;
pub use role::Role;
pub use schema::{Schema, SchemaBuilder};
pub use sharding::{
    Sharding, ShardingBuilder, ShardingJoiner, default_sharding_joiner, derive_sharded_schema,
    separator_joiner, shard_name,
};

pub use logging::{init as init_logging, init_with_level, is_debug_enabled};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::backend::{Backend, BackendRegistry, ConnectionPool, Row};
    pub use crate::driver::{Driver, DriverBuilder};
    pub use crate::drivers::{Drivers, DriversBuilder};
    pub use crate::error::{CloseFailure, Error, Result, is_empty_result};
    pub use crate::profile::Profile;
    pub use crate::role::Role;
    pub use crate::schema::{Schema, SchemaBuilder};
    pub use crate::sharding::{Sharding, ShardingBuilder};
}
