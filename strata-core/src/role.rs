//! Replica roles and their numeric mode flags.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Mode flag for the primary (write) database.
pub const WRITE: i32 = 1;

/// Mode flag for read-only replicas.
pub const READ: i32 = 2;

/// Mode flag for backup instances serving heavy queries.
pub const BACKUP: i32 = 4;

/// Role of a database instance inside a replica group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Primary, accepts writes.
    Writer,
    /// Read-only replica.
    Reader,
    /// Backup, used for expensive queries.
    Backup,
}

impl Role {
    /// Every role, in routing order.
    pub const ALL: [Role; 3] = [Role::Writer, Role::Reader, Role::Backup];

    /// Numeric mode flag of this role.
    pub fn mode(self) -> i32 {
        match self {
            Self::Writer => WRITE,
            Self::Reader => READ,
            Self::Backup => BACKUP,
        }
    }

    /// Map a mode flag back to its role.
    pub fn from_mode(mode: i32) -> Result<Self> {
        match mode {
            WRITE => Ok(Self::Writer),
            READ => Ok(Self::Reader),
            BACKUP => Ok(Self::Backup),
            other => Err(Error::UnsupportedMode(other)),
        }
    }

    /// Lowercase role name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Writer => "writer",
            Self::Reader => "reader",
            Self::Backup => "backup",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `mode` is the write flag.
pub fn is_write(mode: i32) -> bool {
    mode == WRITE
}

/// Whether `mode` is the read flag.
pub fn is_read(mode: i32) -> bool {
    mode == READ
}

/// Whether `mode` is the backup flag.
pub fn is_backup(mode: i32) -> bool {
    mode == BACKUP
}

/// Whether `mode` is any supported flag.
pub fn is_mode(mode: i32) -> bool {
    is_write(mode) || is_read(mode) || is_backup(mode)
}

/// Reject unsupported mode numbers.
pub fn check_mode(mode: i32) -> Result<()> {
    if is_mode(mode) {
        Ok(())
    } else {
        Err(Error::UnsupportedMode(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_mode(role.mode()).unwrap(), role);
        }
    }

    #[test]
    fn test_check_mode() {
        assert!(check_mode(WRITE).is_ok());
        assert!(check_mode(READ).is_ok());
        assert!(check_mode(BACKUP).is_ok());

        let err = check_mode(3).unwrap_err();
        assert_eq!(err.to_string(), "unsupported mode 3, must be 1 or 2 or 4");
    }

    #[test]
    fn test_predicates() {
        assert!(is_write(1));
        assert!(!is_write(2));
        assert!(is_read(2));
        assert!(is_backup(4));
        assert!(!is_mode(0));
        assert!(!is_mode(7));
    }

    #[test]
    fn test_display() {
        assert_eq!(Role::Writer.to_string(), "writer");
        assert_eq!(Role::Reader.to_string(), "reader");
        assert_eq!(Role::Backup.to_string(), "backup");
    }
}
