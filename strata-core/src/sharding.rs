//! Shard groups: one logical database split over numbered schemas.
//!
//! Shard `n` of database `orders` lives in the schema named by the sharding
//! joiner, `orders_n` by default. [`Sharding::get_driver`] only validates
//! and serves the mapping; choosing `n` (typically `hash(key) % size`) is up
//! to the caller.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use strata_core::{BackendRegistry, SchemaBuilder, ShardingBuilder};
//! use strata_core::testing::MemoryBackend;
//!
//! let registry = Arc::new(BackendRegistry::new());
//! registry.register(MemoryBackend::new("memory"));
//!
//! let builder = ShardingBuilder::new();
//! builder.set_id("orders").unwrap();
//! builder.set_name("memory").unwrap();
//! builder.registry(registry);
//! for num in 0..4 {
//!     let schema = SchemaBuilder::new();
//!     schema.host("10.0.1.1").database("orders").username("app");
//!     builder.set_schema(num, schema.build().unwrap()).unwrap();
//! }
//!
//! let sharding = builder.build().unwrap();
//! assert_eq!(sharding.size(), 4);
//! assert_eq!(sharding.get_driver(3).unwrap().schema().database(), "orders_3");
//! assert!(sharding.get_driver(4).is_err());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::backend::BackendRegistry;
use crate::defaults::SHARDING_SEPARATOR;
use crate::driver::{Driver, DriverBuilder};
use crate::drivers::{check_once, set_once};
use crate::dsn::DsnJoiner;
use crate::error::{CloseFailure, Error, Result};
use crate::profile::Profile;
use crate::schema::Schema;

/// Strategy naming the physical database of a shard: `(database, num) -> name`.
pub type ShardingJoiner = Arc<dyn Fn(&str, usize) -> String + Send + Sync>;

/// `database + separator + num`.
pub fn shard_name(database: &str, num: usize, separator: &str) -> String {
    format!("{}{}{}", database, separator, num)
}

/// The default [`ShardingJoiner`], `database_num`.
pub fn default_sharding_joiner() -> ShardingJoiner {
    separator_joiner(SHARDING_SEPARATOR)
}

/// A [`ShardingJoiner`] placing `separator` between name and number.
pub fn separator_joiner(separator: impl Into<String>) -> ShardingJoiner {
    let separator = separator.into();
    Arc::new(move |database: &str, num: usize| shard_name(database, num, &separator))
}

/// Copy of `base` pointing at the physical database of shard `num`.
///
/// `base` itself is left untouched.
pub fn derive_sharded_schema(base: &Schema, num: usize, joiner: &ShardingJoiner) -> Schema {
    base.with_database(joiner(base.database(), num))
}

/// Drivers of one sharded database, indexed by shard number.
pub struct Sharding {
    id: String,
    drivers: Vec<Driver>,
}

impl Sharding {
    /// Group identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of shards.
    pub fn size(&self) -> usize {
        self.drivers.len()
    }

    /// Every driver, in shard order.
    pub fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    /// Driver of shard `num`.
    pub fn get_driver(&self, num: i64) -> Result<&Driver> {
        if self.drivers.is_empty() {
            return Err(Error::Empty("drivers"));
        }

        if num < 0 {
            return Err(Error::NegativeShard(num));
        }

        let size = self.size();
        usize::try_from(num)
            .ok()
            .and_then(|index| self.drivers.get(index))
            .ok_or(Error::ShardOutOfRange { num, size })
    }

    /// Close every shard's driver.
    ///
    /// Every driver gets a close attempt; all failures are returned, each
    /// tagged `<id>/<shard>`.
    pub async fn close(&self) -> Vec<CloseFailure> {
        let mut failures = Vec::new();

        for (num, driver) in self.drivers.iter().enumerate() {
            if let Err(error) = driver.close().await {
                let component = format!("{}/{}", self.id, num);
                warn!(component = %component, error = %error, "Failed to close shard");
                failures.push(CloseFailure::new(component, error));
            }
        }

        info!(id = %self.id, failures = failures.len(), "Shard group closed");
        failures
    }
}

impl fmt::Debug for Sharding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sharding")
            .field("id", &self.id)
            .field("size", &self.size())
            .field("drivers", &self.drivers)
            .finish()
    }
}

#[derive(Default)]
struct ShardingFields {
    id: String,
    name: String,
    separator: String,
    dsn_joiner: Option<DsnJoiner>,
    sharding_joiner: Option<ShardingJoiner>,
    registry: Option<Arc<BackendRegistry>>,
    schemas: BTreeMap<i64, Schema>,
}

/// Builder for [`Sharding`].
///
/// Stored schemas keep their logical database name; the physical name is
/// derived at build time, so building twice yields the same shard names.
#[derive(Default)]
pub struct ShardingBuilder {
    fields: Mutex<ShardingFields>,
}

impl ShardingBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the group id.
    pub fn set_id(&self, id: impl AsRef<str>) -> Result<()> {
        let mut f = self.fields.lock();
        set_once("id", &mut f.id, id.as_ref())
    }

    /// Set the backend name.
    pub fn set_name(&self, name: impl AsRef<str>) -> Result<()> {
        let mut f = self.fields.lock();
        set_once("name", &mut f.name, name.as_ref())
    }

    /// Set the separator used by the default sharding joiner.
    pub fn set_separator(&self, separator: impl AsRef<str>) -> Result<()> {
        let mut f = self.fields.lock();
        set_once("separator", &mut f.separator, separator.as_ref())
    }

    /// Replace the DSN strategy.
    pub fn dsn_joiner(&self, joiner: DsnJoiner) -> &Self {
        self.fields.lock().dsn_joiner = Some(joiner);
        self
    }

    /// Replace the shard naming strategy. Takes precedence over the separator.
    pub fn sharding_joiner(&self, joiner: ShardingJoiner) -> &Self {
        self.fields.lock().sharding_joiner = Some(joiner);
        self
    }

    /// Resolve backends in `registry` instead of the process-wide one.
    pub fn registry(&self, registry: Arc<BackendRegistry>) -> &Self {
        self.fields.lock().registry = Some(registry);
        self
    }

    /// Assign the schema of shard `num`. Each number can be set once.
    pub fn set_schema(&self, num: i64, schema: Schema) -> Result<()> {
        if num < 0 {
            return Err(Error::NegativeShard(num));
        }

        let mut f = self.fields.lock();
        if f.schemas.contains_key(&num) {
            return Err(Error::DuplicateShard(num));
        }

        f.schemas.insert(num, schema);
        Ok(())
    }

    /// Take id, backend name, separator and one schema per shard in
    /// `[sharding_first, sharding_last]` from a profile.
    ///
    /// Nothing is applied unless every shard in the range is free.
    pub fn add_profile(&self, profile: &Profile) -> Result<()> {
        let first = profile.sharding_first();
        let last = profile.sharding_last();

        if first < 0 {
            return Err(Error::InvalidShardRange {
                first,
                last,
                reason: "first can't be less than 0",
            });
        }

        if last <= 0 {
            return Err(Error::InvalidShardRange {
                first,
                last,
                reason: "last can't be less or equal than 0",
            });
        }

        if first >= last {
            return Err(Error::InvalidShardRange {
                first,
                last,
                reason: "first can't be greater or equal than last",
            });
        }

        let schema = Schema::from_profile(profile)?;
        let separator = profile.sharding_separator();
        let nums = i64::from(first)..=i64::from(last);

        let mut f = self.fields.lock();
        check_once("id", &f.id, profile.id())?;
        check_once("name", &f.name, profile.driver())?;
        if !separator.trim().is_empty() {
            check_once("separator", &f.separator, separator)?;
        }
        if let Some(num) = nums.clone().find(|num| f.schemas.contains_key(num)) {
            return Err(Error::DuplicateShard(num));
        }

        set_once("id", &mut f.id, profile.id())?;
        set_once("name", &mut f.name, profile.driver())?;
        if !separator.trim().is_empty() {
            set_once("separator", &mut f.separator, separator)?;
        }

        debug!(id = %profile.id(), first, last, "Adding profile to shard group");
        for num in nums {
            f.schemas.insert(num, schema.clone());
        }

        Ok(())
    }

    /// Open one driver per shard.
    pub fn build(&self) -> Result<Sharding> {
        let f = self.fields.lock();

        if f.id.is_empty() {
            return Err(Error::Empty("id"));
        }

        if f.name.is_empty() {
            return Err(Error::Empty("name"));
        }

        if f.schemas.is_empty() {
            return Err(Error::Empty("schemas"));
        }

        // Distinct non-negative keys all below the key count form exactly 0..size.
        let size = f.schemas.len();
        for &num in f.schemas.keys() {
            if num < 0 {
                return Err(Error::NegativeShard(num));
            }
            if usize::try_from(num).map_or(true, |n| n >= size) {
                return Err(Error::ShardOutOfRange { num, size });
            }
        }

        let sharding_joiner = match (&f.sharding_joiner, f.separator.is_empty()) {
            (Some(joiner), _) => joiner.clone(),
            (None, true) => default_sharding_joiner(),
            (None, false) => separator_joiner(f.separator.clone()),
        };

        let builder = DriverBuilder::new();
        builder.name(&f.name);
        if let Some(joiner) = &f.dsn_joiner {
            builder.joiner(joiner.clone());
        }
        if let Some(registry) = &f.registry {
            builder.registry(registry.clone());
        }

        let drivers = f
            .schemas
            .values()
            .enumerate()
            .map(|(num, base)| {
                let schema = derive_sharded_schema(base, num, &sharding_joiner);
                builder.schema(schema).build()
            })
            .collect::<Result<Vec<_>>>()?;

        info!(id = %f.id, backend = %f.name, size = drivers.len(), "Shard group built");

        Ok(Sharding {
            id: f.id.clone(),
            drivers,
        })
    }
}
