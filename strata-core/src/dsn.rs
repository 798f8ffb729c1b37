//! Data source name assembly.
//!
//! A DSN has the shape
//!
//! ```text
//! user:pass@proto(host:port)/database[?charset=C&collation=L&timeout=T]
//! ```
//!
//! Query keys appear only when their field is set, always in the order
//! `charset`, `collation`, `timeout`. Consumers parse the string positionally,
//! so that order must not change.
//!
//! ```rust
//! use strata_core::{SchemaBuilder, dsn_joiner};
//!
//! let builder = SchemaBuilder::new();
//! builder
//!     .host("127.0.0.1")
//!     .database("test")
//!     .username("root")
//!     .password("123456")
//!     .timeout("90s");
//! let schema = builder.build().unwrap();
//!
//! assert_eq!(
//!     dsn_joiner(Some(&schema)),
//!     "root:123456@tcp(127.0.0.1:3306)/test?charset=utf8mb4&collation=utf8mb4_general_ci&timeout=90s"
//! );
//! ```

use std::sync::Arc;

use crate::schema::Schema;

/// Strategy turning a schema into the string handed to a backend.
pub type DsnJoiner = Arc<dyn Fn(&Schema) -> String + Send + Sync>;

/// The default [`DsnJoiner`], backed by [`dsn_joiner`].
pub fn default_joiner() -> DsnJoiner {
    Arc::new(|schema: &Schema| dsn_joiner(Some(schema)))
}

/// Build the full DSN for a schema.
///
/// A non-empty raw DSN on the schema wins unconditionally.
pub fn dsn_joiner(schema: Option<&Schema>) -> String {
    let Some(schema) = schema else {
        return String::new();
    };

    if !schema.dsn().is_empty() {
        return schema.dsn().to_string();
    }

    let path = dsn_path(Some(schema));
    let query = dsn_query(Some(schema));
    if query.is_empty() {
        path
    } else {
        format!("{}?{}", path, query)
    }
}

/// `user:pass@proto(host:port)/database`.
pub fn dsn_path(schema: Option<&Schema>) -> String {
    match schema {
        Some(s) => format!(
            "{}:{}@{}({}:{})/{}",
            s.username(),
            s.password(),
            s.proto(),
            s.host(),
            s.port(),
            s.database()
        ),
        None => String::new(),
    }
}

/// `charset=..&collation=..&timeout=..`, skipping empty fields.
pub fn dsn_query(schema: Option<&Schema>) -> String {
    let Some(schema) = schema else {
        return String::new();
    };

    [
        ("charset", schema.charset()),
        ("collation", schema.collation()),
        ("timeout", schema.timeout()),
    ]
    .iter()
    .filter(|(_, value)| !value.is_empty())
    .map(|(key, value)| format!("{}={}", key, value))
    .collect::<Vec<_>>()
    .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;

    fn schema(timeout: &str, dsn: &str) -> Schema {
        let builder = SchemaBuilder::new();
        builder
            .host("127.0.0.1")
            .database("test")
            .username("root")
            .password("123456")
            .charset("utf8mb4")
            .collation("utf8mb4_general_ci")
            .timeout(timeout)
            .dsn(dsn);
        builder.build().unwrap()
    }

    #[test]
    fn test_dsn_joiner_none() {
        assert_eq!(dsn_joiner(None), "");
        assert_eq!(dsn_path(None), "");
        assert_eq!(dsn_query(None), "");
    }

    #[test]
    fn test_dsn_joiner_computed() {
        assert_eq!(
            dsn_joiner(Some(&schema("90s", ""))),
            "root:123456@tcp(127.0.0.1:3306)/test?charset=utf8mb4&collation=utf8mb4_general_ci&timeout=90s"
        );
    }

    #[test]
    fn test_dsn_joiner_raw_override() {
        let raw = "admin:123123@tcp(192.168.0.1:3306)/user?charset=utf8&collation=utf8_general_ci&timeout=10s";
        assert_eq!(dsn_joiner(Some(&schema("90s", raw))), raw);
    }

    #[test]
    fn test_dsn_path() {
        assert_eq!(
            dsn_path(Some(&schema("", ""))),
            "root:123456@tcp(127.0.0.1:3306)/test"
        );
    }

    #[test]
    fn test_dsn_query_skips_empty_timeout() {
        let s = schema("", "");
        let query = dsn_query(Some(&s));

        assert_eq!(query, "charset=utf8mb4&collation=utf8mb4_general_ci");
        assert!(!query.ends_with('&'));
        assert_eq!(dsn_joiner(Some(&s)), format!("{}?{}", dsn_path(Some(&s)), query));
    }

    #[test]
    fn test_default_joiner_matches_function() {
        let s = schema("5s", "");
        assert_eq!(default_joiner()(&s), dsn_joiner(Some(&s)));
    }
}
