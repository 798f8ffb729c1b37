//! Flat key/value connection profiles.
//!
//! A [`Profile`] is what configuration systems usually hand over: a map of
//! strings. Typed fields are parsed once, when the profile is created, and a
//! bad value fails construction naming its key.
//!
//! ```rust
//! use std::collections::HashMap;
//! use strata_core::{Profile, Role};
//!
//! let data: HashMap<String, String> = [
//!     ("id", "orders"),
//!     ("driver", "mysql"),
//!     ("host", "10.0.0.2"),
//!     ("database", "orders"),
//!     ("username", "app"),
//!     ("read", "true"),
//! ]
//! .into_iter()
//! .map(|(k, v)| (k.to_string(), v.to_string()))
//! .collect();
//!
//! let profile = Profile::new(&data).unwrap();
//! assert_eq!(profile.roles(), vec![Role::Reader]);
//! assert!(!profile.is_sharded());
//! ```

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::role::Role;

/// Profile key for the group identifier.
pub const ID: &str = "id";
/// Profile key for the first shard number (inclusive).
pub const SHARDING_FIRST: &str = "sharding_first";
/// Profile key for the last shard number (inclusive).
pub const SHARDING_LAST: &str = "sharding_last";
/// Profile key for the shard name separator.
pub const SHARDING_SEPARATOR: &str = "sharding_separator";
/// Profile key for the writer flag.
pub const WRITE: &str = "write";
/// Profile key for the reader flag.
pub const READ: &str = "read";
/// Profile key for the backup flag.
pub const BACKUP: &str = "backup";
/// Profile key for the host.
pub const HOST: &str = "host";
/// Profile key for the login user.
pub const USERNAME: &str = "username";
/// Profile key for the password.
pub const PASSWORD: &str = "password";
/// Profile key for the backend name.
pub const DRIVER: &str = "driver";
/// Profile key for the protocol.
pub const PROTO: &str = "proto";
/// Profile key for the port.
pub const PORT: &str = "port";
/// Profile key for the database name.
pub const DATABASE: &str = "database";
/// Profile key for the character set.
pub const CHARSET: &str = "charset";
/// Profile key for the collation.
pub const COLLATION: &str = "collation";
/// Profile key for the connect timeout.
pub const TIMEOUT: &str = "timeout";
/// Profile key for the open connection limit.
pub const MAX_OPEN: &str = "max_open";
/// Profile key for the idle connection limit.
pub const MAX_IDLE: &str = "max_idle";
/// Profile key for the connection lifetime, in nanoseconds.
pub const MAX_LIFETIME: &str = "max_lifetime";
/// Profile key for a raw DSN override.
pub const DSN: &str = "dsn";

/// Typed view of a flat configuration record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "HashMap<String, String>")]
pub struct Profile {
    id: String,
    sharding_first: i32,
    sharding_last: i32,
    sharding_separator: String,
    write: bool,
    read: bool,
    backup: bool,
    host: String,
    username: String,
    password: String,
    driver: String,
    proto: String,
    port: i32,
    database: String,
    charset: String,
    collation: String,
    timeout: String,
    max_open: i32,
    max_idle: i32,
    max_lifetime: i64,
    dsn: String,
}

impl Profile {
    /// Parse a profile from a flat string map.
    ///
    /// Missing or empty keys take their defaults: `-1` for the sharding range
    /// (not sharded), `false` for role flags, `0` for numbers, empty strings
    /// otherwise.
    pub fn new(data: &HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            id: text(data, ID),
            sharding_first: int32(data, SHARDING_FIRST, -1)?,
            sharding_last: int32(data, SHARDING_LAST, -1)?,
            sharding_separator: text(data, SHARDING_SEPARATOR),
            write: boolean(data, WRITE)?,
            read: boolean(data, READ)?,
            backup: boolean(data, BACKUP)?,
            host: text(data, HOST),
            username: text(data, USERNAME),
            password: text(data, PASSWORD),
            driver: text(data, DRIVER),
            proto: text(data, PROTO),
            port: int32(data, PORT, 0)?,
            database: text(data, DATABASE),
            charset: text(data, CHARSET),
            collation: text(data, COLLATION),
            timeout: text(data, TIMEOUT),
            max_open: int32(data, MAX_OPEN, 0)?,
            max_idle: int32(data, MAX_IDLE, 0)?,
            max_lifetime: int64(data, MAX_LIFETIME, 0)?,
            dsn: text(data, DSN),
        })
    }

    /// Group identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// First shard number, `-1` when unset.
    pub fn sharding_first(&self) -> i32 {
        self.sharding_first
    }

    /// Last shard number, `-1` when unset.
    pub fn sharding_last(&self) -> i32 {
        self.sharding_last
    }

    /// Separator between database name and shard number, or empty.
    pub fn sharding_separator(&self) -> &str {
        &self.sharding_separator
    }

    /// Whether this instance is a writer.
    pub fn write(&self) -> bool {
        self.write
    }

    /// Whether this instance is a reader.
    pub fn read(&self) -> bool {
        self.read
    }

    /// Whether this instance is a backup.
    pub fn backup(&self) -> bool {
        self.backup
    }

    /// Roles selected by the write/read/backup flags.
    pub fn roles(&self) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| match role {
                Role::Writer => self.write,
                Role::Reader => self.read,
                Role::Backup => self.backup,
            })
            .collect()
    }

    /// Whether a sharding range was configured at all.
    pub fn is_sharded(&self) -> bool {
        self.sharding_first >= 0 || self.sharding_last >= 0
    }

    /// Host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Login user.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Password.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Backend name, e.g. `mysql`.
    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// Protocol.
    pub fn proto(&self) -> &str {
        &self.proto
    }

    /// Port, 0 when unset.
    pub fn port(&self) -> i32 {
        self.port
    }

    /// Database name.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Character set.
    pub fn charset(&self) -> &str {
        &self.charset
    }

    /// Collation.
    pub fn collation(&self) -> &str {
        &self.collation
    }

    /// Connect timeout.
    pub fn timeout(&self) -> &str {
        &self.timeout
    }

    /// Open connection limit.
    pub fn max_open(&self) -> i32 {
        self.max_open
    }

    /// Idle connection limit.
    pub fn max_idle(&self) -> i32 {
        self.max_idle
    }

    /// Connection lifetime in nanoseconds.
    pub fn max_lifetime_nanos(&self) -> i64 {
        self.max_lifetime
    }

    /// Raw DSN override.
    pub fn dsn(&self) -> &str {
        &self.dsn
    }
}

impl TryFrom<HashMap<String, String>> for Profile {
    type Error = Error;

    fn try_from(data: HashMap<String, String>) -> Result<Self> {
        Self::new(&data)
    }
}

impl TryFrom<&HashMap<String, String>> for Profile {
    type Error = Error;

    fn try_from(data: &HashMap<String, String>) -> Result<Self> {
        Self::new(data)
    }
}

fn text(data: &HashMap<String, String>, key: &str) -> String {
    data.get(key).cloned().unwrap_or_default()
}

fn raw<'a>(data: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    data.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

fn invalid(key: &'static str, value: &str, reason: impl ToString) -> Error {
    Error::InvalidProfileValue {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn int32(data: &HashMap<String, String>, key: &'static str, default: i32) -> Result<i32> {
    match raw(data, key) {
        Some(v) => v.parse().map_err(|e| invalid(key, v, e)),
        None => Ok(default),
    }
}

fn int64(data: &HashMap<String, String>, key: &'static str, default: i64) -> Result<i64> {
    match raw(data, key) {
        Some(v) => v.parse().map_err(|e| invalid(key, v, e)),
        None => Ok(default),
    }
}

fn boolean(data: &HashMap<String, String>, key: &'static str) -> Result<bool> {
    match raw(data, key) {
        Some("1" | "t" | "T" | "TRUE" | "true" | "True") => Ok(true),
        Some("0" | "f" | "F" | "FALSE" | "false" | "False") => Ok(false),
        Some(v) => Err(invalid(key, v, "invalid syntax")),
        None => Ok(false),
    }
}
