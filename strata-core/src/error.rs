//! Error types for topology construction and routing.
//!
//! Every error is a local, synchronous validation failure, except for the
//! [`Error::Backend`] variant which carries a backend's own error through
//! untouched.
//!
//! # Categories
//!
//! | Category          | Variants                                                         |
//! |-------------------|------------------------------------------------------------------|
//! | Missing field     | [`Error::Empty`], [`Error::Nil`], [`Error::Negative`], [`Error::PortOutOfRange`] |
//! | Identity conflict | [`Error::Conflict`]                                              |
//! | Shard numbering   | [`Error::NegativeShard`], [`Error::ShardOutOfRange`], [`Error::DuplicateShard`], [`Error::InvalidShardRange`] |
//! | Role buckets      | [`Error::RoleNotConfigured`], [`Error::RoleEmpty`], [`Error::NoDrivers`], [`Error::PickerOutOfRange`] |
//! | Backend           | [`Error::UnknownBackend`], [`Error::Backend`]                    |
//! | Absence           | [`Error::EmptyResult`]                                           |
//!
//! ```rust
//! use strata_core::{Error, is_empty_result};
//!
//! let err = Error::Empty("host");
//! assert_eq!(err.to_string(), "host can't be empty");
//!
//! assert!(is_empty_result(&Error::EmptyResult));
//! ```

use std::fmt;

use thiserror::Error;

use crate::defaults::EMPTY_RESULT;
use crate::role::Role;

/// Result type for topology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error produced by a backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while building or routing through a topology.
#[derive(Error, Debug)]
pub enum Error {
    /// A required value is empty.
    #[error("{0} can't be empty")]
    Empty(&'static str),

    /// A required value is absent.
    #[error("{0} can't be nil")]
    Nil(&'static str),

    /// A numeric value is below zero.
    #[error("{field} can't be less than 0, got {value}")]
    Negative {
        /// Offending field.
        field: &'static str,
        /// Rejected value.
        value: i64,
    },

    /// A port does not fit in 16 bits.
    #[error("port {0} can't be greater than 65535")]
    PortOutOfRange(i64),

    /// A write-once identity was given a different value.
    #[error("{field} \"{given}\" must be equal to the current {field} \"{current}\"")]
    Conflict {
        /// Identity field (`id`, `name`, `separator`).
        field: &'static str,
        /// Value the caller tried to set.
        given: String,
        /// Value already held.
        current: String,
    },

    /// The role was never populated.
    #[error("{0}s can't be nil")]
    RoleNotConfigured(Role),

    /// The role was populated but holds no drivers.
    #[error("{0}s can't be empty")]
    RoleEmpty(Role),

    /// An [`IndexPicker`](crate::picker::IndexPicker) returned an index outside its range.
    #[error("picker returned index {index} for {len} {role}s")]
    PickerOutOfRange {
        /// Role being picked from.
        role: Role,
        /// Index the picker returned.
        index: usize,
        /// Number of candidates.
        len: usize,
    },

    /// A replica group ended up with no drivers in any role.
    #[error("no driver, writer & reader & backup are all empty")]
    NoDrivers,

    /// A shard number is negative.
    #[error("num {0} can't be less than 0")]
    NegativeShard(i64),

    /// A shard number is past the end of the group.
    #[error("num {num} can't be greater or equal than size {size}")]
    ShardOutOfRange {
        /// Requested shard number.
        num: i64,
        /// Number of shards.
        size: usize,
    },

    /// A shard number was assigned twice.
    #[error("num {0} has been contained in schemas")]
    DuplicateShard(i64),

    /// A profile's sharding range is unusable.
    #[error("invalid sharding range [{first}, {last}]: {reason}")]
    InvalidShardRange {
        /// First shard number (inclusive).
        first: i32,
        /// Last shard number (inclusive).
        last: i32,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A profile value could not be parsed.
    #[error("invalid {key} {value:?}: {reason}")]
    InvalidProfileValue {
        /// Profile key.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// A numeric mode is not one of the role flags.
    #[error("unsupported mode {0}, must be 1 or 2 or 4")]
    UnsupportedMode(i32),

    /// No backend is registered under the requested name.
    #[error("no backend registered as \"{0}\"")]
    UnknownBackend(String),

    /// A query returned no rows.
    #[error("empty result")]
    EmptyResult,

    /// An error raised by the backend, passed through as-is.
    #[error(transparent)]
    Backend(BoxError),
}

impl Error {
    /// Wrap a backend error without altering its message.
    pub fn backend(err: impl Into<BoxError>) -> Self {
        Self::Backend(err.into())
    }

    /// Shortcut for [`Error::Negative`].
    pub fn negative(field: &'static str, value: i64) -> Self {
        Self::Negative { field, value }
    }

    /// Shortcut for [`Error::Conflict`].
    pub fn conflict(
        field: &'static str,
        given: impl Into<String>,
        current: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            field,
            given: given.into(),
            current: current.into(),
        }
    }

    /// Check whether this is the empty-result sentinel.
    pub fn is_empty_result(&self) -> bool {
        is_empty_result(self)
    }
}

/// Check whether an error signals "no rows".
///
/// The match is on the exact message, so backend errors that carry the same
/// text are treated as absence too.
pub fn is_empty_result(err: &(dyn std::error::Error + 'static)) -> bool {
    err.to_string() == EMPTY_RESULT
}

/// A driver that failed to close, with where it lives in its group.
#[derive(Debug)]
pub struct CloseFailure {
    /// `<group id>/<role>/<index>` for replica groups, `<group id>/<shard>` for shard groups.
    pub component: String,
    /// Error returned by the backend.
    pub error: Error,
}

impl CloseFailure {
    /// Create a new failure record.
    pub fn new(component: impl Into<String>, error: Error) -> Self {
        Self {
            component: component.into(),
            error,
        }
    }
}

impl fmt::Display for CloseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.component, self.error)
    }
}

impl std::error::Error for CloseFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
