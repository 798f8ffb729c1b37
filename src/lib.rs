//! # Strata
//!
//! Replica and shard topology for fleets of relational databases.
//!
//! Strata provides:
//! - Validated connection schemas and DSN assembly
//! - Replica groups with writer, reader and backup roles
//! - Shard groups mapping shard numbers to physical databases
//! - Flat key/value profiles for loading all of the above from configuration
//! - A MySQL backend on `mysql_async` (the default `mysql` feature)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strata::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), strata::Error> {
//!     strata::mysql::register();
//!
//!     let primary = SchemaBuilder::new();
//!     primary.host("10.0.0.1").database("orders").username("app").password("secret");
//!     let replica = SchemaBuilder::new();
//!     replica.host("10.0.0.2").database("orders").username("app").password("secret");
//!
//!     let builder = DriversBuilder::new();
//!     builder.set_id("orders")?;
//!     builder.set_name("mysql")?;
//!     builder.add_writer(primary.build()?);
//!     builder.add_reader(replica.build()?);
//!     let drivers = builder.build()?;
//!
//!     match drivers.get(Role::Reader)?.first("SELECT * FROM orders WHERE id = ?", &[1.into()]).await {
//!         Ok(row) => println!("{:?}", row),
//!         Err(e) if e.is_empty_result() => println!("no such order"),
//!         Err(e) => return Err(e),
//!     }
//!
//!     for failure in drivers.close().await {
//!         eprintln!("{}", failure);
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use strata_core::*;

/// The MySQL backend.
#[cfg(feature = "mysql")]
#[cfg_attr(docsrs, doc(cfg(feature = "mysql")))]
pub mod mysql {
    pub use strata_mysql::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use strata_core::prelude::*;

    #[cfg(feature = "mysql")]
    pub use strata_mysql::MysqlBackend;
}
