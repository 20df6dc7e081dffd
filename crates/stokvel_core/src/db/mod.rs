//! Stokvel database bootstrap.
//!
//! # Responsibility
//! - Own the club schema: one row per stokvel plus its constitution,
//!   members, contribution and penalty rules, cycles and bank accounts.
//! - Open connections with that schema fully migrated.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - Currency amounts are stored as decimal TEXT, never as REAL.
//! - Partial unique indexes allow at most one active cycle and one primary
//!   active bank account per club.
//! - Every table in `STOKVEL_TABLES` exists once migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

/// Tables the repository refuses to run without.
pub const STOKVEL_TABLES: [&str; 7] = [
    "stokvels",
    "constitutions",
    "members",
    "contribution_rules",
    "penalty_rules",
    "cycles",
    "bank_accounts",
];

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The stokvel file was migrated by a newer build and is left untouched.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "stokvel database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
