//! Core domain logic for stokvel (savings club) administration.
//!
//! The crate owns the club schema, its persistence and the read-side
//! aggregates shown on club pages.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schedule;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LoggingError};
pub use model::rule::{RuleKind, RuleRecord};
pub use model::stokvel::{Constitution, Stokvel, StokvelId};
pub use repo::stokvel_repo::{
    RepoError, RepoResult, SqliteStokvelRepository, StokvelListQuery, StokvelRepository,
    StokvelSnapshot, StokvelStatusFilter,
};
pub use repo::stokvel_store::StokvelStore;
pub use service::aggregate::{
    MemberAcceptance, MemberStats, SetupValidation, StokvelDashboard, Summary,
};
pub use service::summary_service::{
    parse_stokvel_id, StokvelSummaryProvider, StokvelsListResult, SummaryError, SummaryResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
