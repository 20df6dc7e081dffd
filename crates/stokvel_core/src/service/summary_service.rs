//! Stokvel summary provider.
//!
//! # Responsibility
//! - Serve the read-side aggregates of one club: summary counts, member
//!   statistics, setup diagnostics and recent rule listings.
//! - Map missing clubs to `SummaryError::StokvelNotFound`.
//!
//! # Invariants
//! - Every aggregate of one call is computed from a single snapshot, so
//!   counts never mix states from concurrent writes.
//! - Providers never write.

use crate::model::rule::{PenaltyRule, PenaltyType, RuleKind, RuleRecord};
use crate::model::stokvel::{Stokvel, StokvelId};
use crate::repo::stokvel_repo::{
    normalize_stokvel_limit, RepoError, StokvelListQuery, StokvelRepository, StokvelSnapshot,
};
use crate::service::aggregate::{
    self, MemberAcceptance, MemberStats, SetupValidation, StokvelDashboard, Summary,
};
use chrono::NaiveDate;
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

const RECENT_RULES_DEFAULT_LIMIT: u32 = 5;
const RECENT_RULES_LIMIT_MAX: u32 = 50;

/// Error returned by summary provider operations.
#[derive(Debug)]
pub enum SummaryError {
    /// No club with this identifier exists.
    StokvelNotFound(String),
    Repo(RepoError),
}

impl Display for SummaryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StokvelNotFound(id) => write!(f, "stokvel not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SummaryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::StokvelNotFound(_) => None,
        }
    }
}

impl From<RepoError> for SummaryError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "stokvel",
                id,
            } => Self::StokvelNotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub type SummaryResult<T> = Result<T, SummaryError>;

/// List result envelope for the club index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StokvelsListResult {
    pub items: Vec<Stokvel>,
    /// Effective normalized limit used by the query.
    pub applied_limit: u32,
}

/// Parses a user-supplied club identifier.
///
/// Malformed identifiers cannot name an existing club and are reported as
/// `StokvelNotFound`.
pub fn parse_stokvel_id(value: &str) -> SummaryResult<StokvelId> {
    Uuid::parse_str(value.trim()).map_err(|_| SummaryError::StokvelNotFound(value.to_string()))
}

/// Normalizes the recent-rules limit. `Some(0)` is honored as an empty list.
pub fn normalize_recent_limit(limit: Option<u32>) -> u32 {
    match limit {
        None => RECENT_RULES_DEFAULT_LIMIT,
        Some(value) => value.min(RECENT_RULES_LIMIT_MAX),
    }
}

/// Read-side aggregation facade over a stokvel repository.
pub struct StokvelSummaryProvider<R: StokvelRepository> {
    repo: R,
    reference_date: Option<NaiveDate>,
}

impl<R: StokvelRepository> StokvelSummaryProvider<R> {
    /// Creates a provider that evaluates date-sensitive checks against the
    /// local calendar date at call time.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            reference_date: None,
        }
    }

    /// Creates a provider pinned to `reference_date`.
    pub fn with_reference_date(repo: R, reference_date: NaiveDate) -> Self {
        Self {
            repo,
            reference_date: Some(reference_date),
        }
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    pub fn compute_summary(&self, stokvel_id: StokvelId) -> SummaryResult<Summary> {
        self.with_snapshot("compute_summary", stokvel_id, |snapshot| {
            aggregate::summarize(snapshot)
        })
    }

    pub fn compute_member_stats(&self, stokvel_id: StokvelId) -> SummaryResult<MemberStats> {
        self.with_snapshot("compute_member_stats", stokvel_id, aggregate::member_stats)
    }

    /// Lists setup issues. Contribution rules count only when they apply on
    /// the provider's reference date.
    pub fn validate_setup(&self, stokvel_id: StokvelId) -> SummaryResult<SetupValidation> {
        let today = self.reference_date();
        self.with_snapshot("validate_setup", stokvel_id, |snapshot| {
            aggregate::validate_setup(snapshot, today)
        })
    }

    pub fn can_accept_new_members(&self, stokvel_id: StokvelId) -> SummaryResult<MemberAcceptance> {
        self.with_snapshot(
            "can_accept_new_members",
            stokvel_id,
            aggregate::member_acceptance,
        )
    }

    /// Membership-bound issues, `None` when the club has no constitution.
    pub fn constitution_compliance(
        &self,
        stokvel_id: StokvelId,
    ) -> SummaryResult<Option<Vec<String>>> {
        self.with_snapshot(
            "constitution_compliance",
            stokvel_id,
            aggregate::constitution_compliance,
        )
    }

    pub fn dashboard(&self, stokvel_id: StokvelId) -> SummaryResult<StokvelDashboard> {
        let today = self.reference_date();
        self.with_snapshot("dashboard", stokvel_id, |snapshot| {
            aggregate::dashboard(snapshot, today, RECENT_RULES_DEFAULT_LIMIT as usize)
        })
    }

    /// Penalty rule of `penalty_type` in force on `as_of`, defaulting to the
    /// provider's reference date.
    pub fn applicable_penalty_rule(
        &self,
        stokvel_id: StokvelId,
        penalty_type: PenaltyType,
        as_of: Option<NaiveDate>,
    ) -> SummaryResult<Option<PenaltyRule>> {
        let as_of = as_of.unwrap_or_else(|| self.reference_date());
        self.with_snapshot("applicable_penalty_rule", stokvel_id, |snapshot| {
            aggregate::applicable_penalty_rule(snapshot, penalty_type, as_of).cloned()
        })
    }

    /// Most recently created rules of one kind, newest first.
    ///
    /// `None` yields 5 rules; limits above 50 are clamped.
    pub fn recent_rules(
        &self,
        stokvel_id: StokvelId,
        kind: RuleKind,
        limit: Option<u32>,
    ) -> SummaryResult<Vec<RuleRecord>> {
        let started_at = Instant::now();
        let applied_limit = normalize_recent_limit(limit);
        let records = self
            .repo
            .list_recent_rules(stokvel_id, kind, applied_limit)
            .map_err(|err| log_failure("recent_rules", stokvel_id, err))?
            .ok_or_else(|| not_found("recent_rules", stokvel_id))?;
        debug!(
            "event=recent_rules module=summary status=ok stokvel_id={stokvel_id} kind={kind:?} limit={applied_limit} count={} duration_ms={}",
            records.len(),
            started_at.elapsed().as_millis()
        );
        Ok(records)
    }

    pub fn list_stokvels(&self, query: StokvelListQuery) -> SummaryResult<StokvelsListResult> {
        let applied_limit = normalize_stokvel_limit(query.limit);
        let query = StokvelListQuery {
            search: query
                .search
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            limit: Some(applied_limit),
            ..query
        };
        let items = self.repo.list_stokvels(&query)?;
        Ok(StokvelsListResult {
            items,
            applied_limit,
        })
    }

    fn with_snapshot<T>(
        &self,
        operation: &'static str,
        stokvel_id: StokvelId,
        compute: impl FnOnce(&StokvelSnapshot) -> T,
    ) -> SummaryResult<T> {
        let started_at = Instant::now();
        let snapshot = self
            .repo
            .load_snapshot(stokvel_id)
            .map_err(|err| log_failure(operation, stokvel_id, err))?
            .ok_or_else(|| not_found(operation, stokvel_id))?;
        let value = compute(&snapshot);
        debug!(
            "event={operation} module=summary status=ok stokvel_id={stokvel_id} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(value)
    }
}

fn not_found(operation: &str, stokvel_id: StokvelId) -> SummaryError {
    debug!("event={operation} module=summary status=not_found stokvel_id={stokvel_id}");
    SummaryError::StokvelNotFound(stokvel_id.to_string())
}

fn log_failure(operation: &str, stokvel_id: StokvelId, err: RepoError) -> SummaryError {
    warn!("event={operation} module=summary status=error stokvel_id={stokvel_id} error={err}");
    SummaryError::from(err)
}

#[cfg(test)]
mod tests {
    use super::{normalize_recent_limit, parse_stokvel_id, SummaryError};
    use crate::repo::stokvel_repo::RepoError;

    #[test]
    fn recent_limit_defaults_and_clamps() {
        assert_eq!(normalize_recent_limit(None), 5);
        assert_eq!(normalize_recent_limit(Some(0)), 0);
        assert_eq!(normalize_recent_limit(Some(12)), 12);
        assert_eq!(normalize_recent_limit(Some(500)), 50);
    }

    #[test]
    fn malformed_id_is_not_found() {
        let err = parse_stokvel_id("not-a-uuid").expect_err("must reject");
        assert!(matches!(err, SummaryError::StokvelNotFound(id) if id == "not-a-uuid"));
    }

    #[test]
    fn repo_not_found_for_stokvel_maps_to_not_found() {
        let err = SummaryError::from(RepoError::NotFound {
            entity: "stokvel",
            id: "abc".to_string(),
        });
        assert!(matches!(err, SummaryError::StokvelNotFound(id) if id == "abc"));

        let err = SummaryError::from(RepoError::Conflict("taken".to_string()));
        assert!(matches!(err, SummaryError::Repo(RepoError::Conflict(_))));
    }
}
