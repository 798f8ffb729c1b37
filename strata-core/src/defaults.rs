//! Default values shared by every builder.

/// Default character set.
pub const CHARSET: &str = "utf8mb4";

/// Default collation.
pub const COLLATION: &str = "utf8mb4_general_ci";

/// Default network protocol.
pub const PROTO: &str = "tcp";

/// Default port.
pub const PORT: u16 = 3306;

/// Message carried by the "no rows" sentinel error.
pub const EMPTY_RESULT: &str = "empty result";

/// Separator placed between a database name and its shard number.
pub const SHARDING_SEPARATOR: &str = "_";
