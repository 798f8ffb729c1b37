//! Validated connection parameters.
//!
//! A [`Schema`] is produced by [`SchemaBuilder::build`] (or derived from a
//! [`Profile`]) and never changes afterwards.
//!
//! ```rust
//! use strata_core::SchemaBuilder;
//!
//! let schema = SchemaBuilder::new()
//!     .host("127.0.0.1")
//!     .database("test")
//!     .username("root")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(schema.proto(), "tcp");
//! assert_eq!(schema.port(), 3306);
//! assert_eq!(schema.charset(), "utf8mb4");
//! ```

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::defaults::{CHARSET, COLLATION, PORT, PROTO};
use crate::error::{Error, Result};
use crate::profile::Profile;

/// Immutable connection parameters for one database instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    proto: String,
    host: String,
    port: u16,
    database: String,
    username: String,
    #[serde(skip_serializing)]
    password: String,
    charset: String,
    collation: String,
    timeout: String,
    max_open: u32,
    max_idle: u32,
    max_lifetime: Duration,
    dsn: String,
}

impl Schema {
    /// Start building a schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Derive a schema from every connection field of a profile.
    pub fn from_profile(profile: &Profile) -> Result<Self> {
        let builder = SchemaBuilder::new();
        builder
            .proto(profile.proto())
            .host(profile.host())
            .database(profile.database())
            .username(profile.username())
            .password(profile.password())
            .charset(profile.charset())
            .collation(profile.collation())
            .timeout(profile.timeout())
            .dsn(profile.dsn())
            .port(profile.port())
            .max_open(profile.max_open())
            .max_idle(profile.max_idle())
            .max_lifetime_nanos(profile.max_lifetime_nanos());

        builder.build()
    }

    /// Copy of this schema pointing at another database.
    pub(crate) fn with_database(&self, database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..self.clone()
        }
    }

    /// Network protocol, e.g. `tcp`.
    pub fn proto(&self) -> &str {
        &self.proto
    }

    /// Host name or IP address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port number.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Login user.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Login password.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Character set.
    pub fn charset(&self) -> &str {
        &self.charset
    }

    /// Collation.
    pub fn collation(&self) -> &str {
        &self.collation
    }

    /// Connect timeout in the backend's duration syntax (e.g. `90s`), or empty.
    pub fn timeout(&self) -> &str {
        &self.timeout
    }

    /// Maximum open connections, 0 for the backend default.
    pub fn max_open(&self) -> u32 {
        self.max_open
    }

    /// Maximum idle connections, 0 for the backend default.
    pub fn max_idle(&self) -> u32 {
        self.max_idle
    }

    /// Maximum connection lifetime, zero for the backend default.
    pub fn max_lifetime(&self) -> Duration {
        self.max_lifetime
    }

    /// Raw DSN override, or empty.
    pub fn dsn(&self) -> &str {
        &self.dsn
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "proto:       {}", self.proto)?;
        writeln!(f, "host:        {}", self.host)?;
        writeln!(f, "port:        {}", self.port)?;
        writeln!(f, "database:    {}", self.database)?;
        writeln!(f, "username:    {}", self.username)?;
        writeln!(f, "password:    {}", if self.password.is_empty() { "" } else { "******" })?;
        writeln!(f, "charset:     {}", self.charset)?;
        writeln!(f, "collation:   {}", self.collation)?;
        writeln!(f, "timeout:     {}", self.timeout)?;
        writeln!(f, "maxOpen:     {}", self.max_open)?;
        writeln!(f, "maxIdle:     {}", self.max_idle)?;
        writeln!(f, "maxLifetime: {:?}", self.max_lifetime)?;
        writeln!(f, "dsn:         {}", if self.dsn.is_empty() { "" } else { "******" })
    }
}

#[derive(Debug, Default)]
struct SchemaFields {
    proto: String,
    host: String,
    port: i32,
    database: String,
    username: String,
    password: String,
    charset: String,
    collation: String,
    timeout: String,
    max_open: i32,
    max_idle: i32,
    max_lifetime: i64,
    dsn: String,
}

/// Builder for [`Schema`].
///
/// Setters take `&self` and lock around each write, so they may be called from
/// several threads. A `build` racing with setters can observe a partial
/// update; configure first, then build.
///
/// The builder is reusable: building twice without changes yields equal
/// schemas.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Mutex<SchemaFields>,
}

impl SchemaBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and freeze the accumulated fields.
    ///
    /// Checks run in a fixed order and the first failure is returned: host,
    /// port, database, username, max open, max idle, max lifetime.
    pub fn build(&self) -> Result<Schema> {
        let f = self.fields.lock();

        if f.host.is_empty() {
            return Err(Error::Empty("host"));
        }

        if f.port < 0 {
            return Err(Error::negative("port", i64::from(f.port)));
        }
        let port = u16::try_from(f.port).map_err(|_| Error::PortOutOfRange(i64::from(f.port)))?;

        if f.database.is_empty() {
            return Err(Error::Empty("database"));
        }

        if f.username.is_empty() {
            return Err(Error::Empty("username"));
        }

        if f.max_open < 0 {
            return Err(Error::negative("max open", i64::from(f.max_open)));
        }

        if f.max_idle < 0 {
            return Err(Error::negative("max idle", i64::from(f.max_idle)));
        }

        if f.max_lifetime < 0 {
            return Err(Error::negative("max lifetime", f.max_lifetime));
        }

        let schema = Schema {
            proto: or_default(&f.proto, PROTO),
            host: f.host.clone(),
            port: if port == 0 { PORT } else { port },
            database: f.database.clone(),
            username: f.username.clone(),
            password: f.password.clone(),
            charset: or_default(&f.charset, CHARSET),
            collation: or_default(&f.collation, COLLATION),
            timeout: f.timeout.clone(),
            max_open: f.max_open.unsigned_abs(),
            max_idle: f.max_idle.unsigned_abs(),
            max_lifetime: Duration::from_nanos(f.max_lifetime.unsigned_abs()),
            dsn: f.dsn.clone(),
        };

        debug!(host = %schema.host, port = schema.port, database = %schema.database, "Schema built");
        Ok(schema)
    }

    /// Set the protocol.
    pub fn proto(&self, s: impl AsRef<str>) -> &Self {
        let s = s.as_ref().trim().to_string();
        self.fields.lock().proto = s;
        self
    }

    /// Set the host.
    pub fn host(&self, s: impl AsRef<str>) -> &Self {
        let s = s.as_ref().trim().to_string();
        self.fields.lock().host = s;
        self
    }

    /// Set the port; 0 selects the default.
    pub fn port(&self, port: i32) -> &Self {
        self.fields.lock().port = port;
        self
    }

    /// Set the database name.
    pub fn database(&self, s: impl AsRef<str>) -> &Self {
        let s = s.as_ref().trim().to_string();
        self.fields.lock().database = s;
        self
    }

    /// Set the login user.
    pub fn username(&self, s: impl AsRef<str>) -> &Self {
        let s = s.as_ref().trim().to_string();
        self.fields.lock().username = s;
        self
    }

    /// Set the password. Not trimmed.
    pub fn password(&self, s: impl Into<String>) -> &Self {
        self.fields.lock().password = s.into();
        self
    }

    /// Set the character set.
    pub fn charset(&self, s: impl AsRef<str>) -> &Self {
        let s = s.as_ref().trim().to_string();
        self.fields.lock().charset = s;
        self
    }

    /// Set the collation.
    pub fn collation(&self, s: impl AsRef<str>) -> &Self {
        let s = s.as_ref().trim().to_string();
        self.fields.lock().collation = s;
        self
    }

    /// Set the connect timeout, e.g. `90s`.
    pub fn timeout(&self, s: impl AsRef<str>) -> &Self {
        let s = s.as_ref().trim().to_string();
        self.fields.lock().timeout = s;
        self
    }

    /// Set the maximum number of open connections.
    pub fn max_open(&self, n: i32) -> &Self {
        self.fields.lock().max_open = n;
        self
    }

    /// Set the maximum number of idle connections.
    pub fn max_idle(&self, n: i32) -> &Self {
        self.fields.lock().max_idle = n;
        self
    }

    /// Set the maximum connection lifetime.
    pub fn max_lifetime(&self, d: Duration) -> &Self {
        let nanos = i64::try_from(d.as_nanos()).unwrap_or(i64::MAX);
        self.max_lifetime_nanos(nanos)
    }

    /// Set the maximum connection lifetime as a signed nanosecond count.
    pub fn max_lifetime_nanos(&self, nanos: i64) -> &Self {
        self.fields.lock().max_lifetime = nanos;
        self
    }

    /// Set a raw DSN that overrides every computed connection string.
    pub fn dsn(&self, s: impl AsRef<str>) -> &Self {
        let s = s.as_ref().trim().to_string();
        self.fields.lock().dsn = s;
        self
    }
}

fn or_default(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> SchemaBuilder {
        let builder = SchemaBuilder::new();
        builder.host("127.0.0.1").database("test").username("root");
        builder
    }

    #[test]
    fn test_build_applies_defaults() {
        let schema = valid().build().unwrap();

        assert_eq!(schema.proto(), PROTO);
        assert_eq!(schema.port(), PORT);
        assert_eq!(schema.charset(), CHARSET);
        assert_eq!(schema.collation(), COLLATION);
        assert_eq!(schema.timeout(), "");
        assert_eq!(schema.max_open(), 0);
        assert_eq!(schema.max_lifetime(), Duration::ZERO);
    }

    #[test]
    fn test_build_keeps_explicit_values() {
        let builder = valid();
        builder
            .proto("unix")
            .port(3307)
            .charset("utf8")
            .collation("utf8_general_ci")
            .timeout("10s")
            .max_open(20)
            .max_idle(5)
            .max_lifetime(Duration::from_secs(60));

        let schema = builder.build().unwrap();
        assert_eq!(schema.proto(), "unix");
        assert_eq!(schema.port(), 3307);
        assert_eq!(schema.charset(), "utf8");
        assert_eq!(schema.collation(), "utf8_general_ci");
        assert_eq!(schema.timeout(), "10s");
        assert_eq!(schema.max_open(), 20);
        assert_eq!(schema.max_idle(), 5);
        assert_eq!(schema.max_lifetime(), Duration::from_secs(60));
    }

    #[test]
    fn test_setters_trim() {
        let builder = SchemaBuilder::new();
        builder
            .host("  db.local ")
            .database(" orders\t")
            .username(" app ")
            .password(" secret ");

        let schema = builder.build().unwrap();
        assert_eq!(schema.host(), "db.local");
        assert_eq!(schema.database(), "orders");
        assert_eq!(schema.username(), "app");
        assert_eq!(schema.password(), " secret ");
    }

    #[test]
    fn test_validation_order() {
        let builder = SchemaBuilder::new();
        builder.port(-1).max_open(-1);
        assert_eq!(builder.build().unwrap_err().to_string(), "host can't be empty");

        builder.host("h");
        assert!(matches!(
            builder.build().unwrap_err(),
            Error::Negative { field: "port", value: -1 }
        ));

        builder.port(70000);
        assert!(matches!(builder.build().unwrap_err(), Error::PortOutOfRange(70000)));

        builder.port(0);
        assert_eq!(builder.build().unwrap_err().to_string(), "database can't be empty");

        builder.database("d");
        assert_eq!(builder.build().unwrap_err().to_string(), "username can't be empty");

        builder.username("u");
        assert!(matches!(
            builder.build().unwrap_err(),
            Error::Negative { field: "max open", .. }
        ));

        builder.max_open(0).max_idle(-2);
        assert!(matches!(
            builder.build().unwrap_err(),
            Error::Negative { field: "max idle", .. }
        ));

        builder.max_idle(0).max_lifetime_nanos(-5);
        assert!(matches!(
            builder.build().unwrap_err(),
            Error::Negative { field: "max lifetime", value: -5 }
        ));

        builder.max_lifetime_nanos(0);
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_build_is_repeatable() {
        let builder = valid();
        assert_eq!(builder.build().unwrap(), builder.build().unwrap());
    }

    #[test]
    fn test_with_database_leaves_original() {
        let schema = valid().build().unwrap();
        let shard = schema.with_database("test_3");

        assert_eq!(schema.database(), "test");
        assert_eq!(shard.database(), "test_3");
        assert_eq!(shard.host(), schema.host());
    }

    #[test]
    fn test_display_masks_password() {
        let builder = valid();
        builder.password("hunter2");
        let text = builder.build().unwrap().to_string();

        assert!(text.contains("host:        127.0.0.1"));
        assert!(!text.contains("hunter2"));
    }

    #[test]
    fn test_concurrent_setters() {
        let builder = std::sync::Arc::new(valid());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let b = builder.clone();
                std::thread::spawn(move || {
                    b.max_open(i);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let schema = builder.build().unwrap();
        assert!(schema.max_open() < 8);
    }
}
