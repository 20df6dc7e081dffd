//! Pure aggregation over one club snapshot.
//!
//! # Responsibility
//! - Turn a `StokvelSnapshot` into the view models the club detail and
//!   dashboard pages render.
//! - Decide setup completeness and member acceptance.
//!
//! # Invariants
//! - Functions here never touch storage; the same snapshot always yields
//!   the same result.
//! - `MemberStats` partitions members: active + pending + probation == total.
//! - `SetupValidation::setup_valid` is true iff `issues` is empty.

use crate::model::cycle::Cycle;
use crate::model::member::MemberStatus;
use crate::model::rule::{PenaltyRule, PenaltyType, RuleRecord};
use crate::model::stokvel::{Constitution, Stokvel, StokvelId};
use crate::repo::stokvel_repo::StokvelSnapshot;
use chrono::NaiveDate;
use serde::Serialize;

/// Club counts shown on the detail page header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub stokvel_id: StokvelId,
    pub total_members: usize,
    pub active_members: usize,
    /// Rules with the active flag set.
    pub contribution_rules_count: usize,
    pub penalty_rules_count: usize,
    /// `None` renders as "None".
    pub current_cycle: Option<Cycle>,
    pub total_cycles: usize,
    /// Active accounts only.
    pub bank_accounts_count: usize,
    pub has_constitution: bool,
}

/// Member counts by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MemberStats {
    pub total_members: usize,
    pub active_members: usize,
    pub pending_members: usize,
    pub probation_members: usize,
}

impl MemberStats {
    pub fn count(&self, status: MemberStatus) -> usize {
        match status {
            MemberStatus::Active => self.active_members,
            MemberStatus::Pending => self.pending_members,
            MemberStatus::Probation => self.probation_members,
        }
    }

    /// Share of `status` in percent, rounded to 2 decimals. `None` without members.
    pub fn percentage(&self, status: MemberStatus) -> Option<f64> {
        if self.total_members == 0 {
            return None;
        }
        let share = self.count(status) as f64 / self.total_members as f64 * 100.0;
        Some((share * 100.0).round() / 100.0)
    }

    pub fn is_empty(&self) -> bool {
        self.total_members == 0
    }
}

/// Setup completeness diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupValidation {
    pub setup_valid: bool,
    /// Human-readable issues in check order.
    pub issues: Vec<String>,
}

impl SetupValidation {
    fn from_issues(issues: Vec<String>) -> Self {
        Self {
            setup_valid: issues.is_empty(),
            issues,
        }
    }
}

/// Whether the club can take another member, with the reason shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberAcceptance {
    pub can_accept: bool,
    pub reason: String,
}

/// Everything the club detail page renders, from one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StokvelDashboard {
    pub stokvel: Stokvel,
    pub summary: Summary,
    pub member_stats: MemberStats,
    pub setup: SetupValidation,
    pub acceptance: MemberAcceptance,
    /// `None` when the club has no constitution.
    pub compliance_issues: Option<Vec<String>>,
    pub recent_contribution_rules: Vec<RuleRecord>,
    pub recent_penalty_rules: Vec<RuleRecord>,
}

pub fn summarize(snapshot: &StokvelSnapshot) -> Summary {
    let stats = member_stats(snapshot);
    Summary {
        stokvel_id: snapshot.stokvel.id,
        total_members: stats.total_members,
        active_members: stats.active_members,
        contribution_rules_count: snapshot
            .contribution_rules
            .iter()
            .filter(|rule| rule.is_active)
            .count(),
        penalty_rules_count: snapshot
            .penalty_rules
            .iter()
            .filter(|rule| rule.is_active)
            .count(),
        current_cycle: snapshot.cycles.iter().find(|cycle| cycle.is_current()).cloned(),
        total_cycles: snapshot.cycles.len(),
        bank_accounts_count: snapshot
            .bank_accounts
            .iter()
            .filter(|account| account.is_active)
            .count(),
        has_constitution: snapshot.constitution.is_some(),
    }
}

pub fn member_stats(snapshot: &StokvelSnapshot) -> MemberStats {
    snapshot
        .members
        .iter()
        .fold(MemberStats::default(), |mut stats, member| {
            stats.total_members += 1;
            match member.status {
                MemberStatus::Active => stats.active_members += 1,
                MemberStatus::Pending => stats.pending_members += 1,
                MemberStatus::Probation => stats.probation_members += 1,
            }
            stats
        })
}

/// Checks whether the club is ready to operate on `today`.
pub fn validate_setup(snapshot: &StokvelSnapshot, today: NaiveDate) -> SetupValidation {
    let mut issues = Vec::new();

    if snapshot.constitution.is_none() {
        issues.push("Stokvel constitution not configured".to_string());
    }

    if !snapshot
        .contribution_rules
        .iter()
        .any(|rule| rule.is_active_for_date(today))
    {
        issues.push("No active contribution rules defined".to_string());
    }

    if !snapshot.penalty_rules.iter().any(|rule| rule.is_active) {
        issues.push("No penalty rules defined".to_string());
    }

    if !snapshot
        .bank_accounts
        .iter()
        .any(|account| account.is_active)
    {
        issues.push("No active bank accounts configured".to_string());
    }

    if !snapshot
        .bank_accounts
        .iter()
        .any(|account| account.is_active && account.is_primary)
    {
        issues.push("No primary bank account set".to_string());
    }

    if let Some(constitution) = &snapshot.constitution {
        let active = member_stats(snapshot).active_members;
        let minimum = constitution.minimum_members as usize;
        if active < minimum {
            issues.push(format!(
                "Below minimum members requirement: {active}/{minimum}"
            ));
        }
        if snapshot.stokvel.is_accepting_members {
            if let Some(maximum) = constitution.member_cap() {
                if active > maximum as usize {
                    issues.push(format!("Exceeds maximum members limit: {active}/{maximum}"));
                }
            }
        }
    }

    SetupValidation::from_issues(issues)
}

pub fn member_acceptance(snapshot: &StokvelSnapshot) -> MemberAcceptance {
    let refuse = |reason: String| MemberAcceptance {
        can_accept: false,
        reason,
    };

    if !snapshot.stokvel.is_accepting_members {
        return refuse("Stokvel is not accepting new members".to_string());
    }
    if !snapshot.stokvel.is_active {
        return refuse("Stokvel is not active".to_string());
    }
    if let Some(maximum) = snapshot
        .constitution
        .as_ref()
        .and_then(Constitution::member_cap)
    {
        let current = snapshot.members.len();
        if current >= maximum as usize {
            return refuse(format!(
                "Maximum member limit reached ({current}/{maximum})"
            ));
        }
    }

    MemberAcceptance {
        can_accept: true,
        reason: "Can accept new members".to_string(),
    }
}

/// Membership-bound issues against the constitution, `None` without one.
pub fn constitution_compliance(snapshot: &StokvelSnapshot) -> Option<Vec<String>> {
    let constitution = snapshot.constitution.as_ref()?;
    let active = member_stats(snapshot).active_members;
    let mut issues = Vec::new();

    let minimum = constitution.minimum_members as usize;
    if active < minimum {
        issues.push(format!(
            "Below minimum members requirement: {active}/{minimum}"
        ));
    }
    if let Some(maximum) = constitution.member_cap() {
        if active > maximum as usize {
            issues.push(format!("Exceeds maximum members limit: {active}/{maximum}"));
        }
    }

    Some(issues)
}

/// Penalty rule of `penalty_type` that governs `as_of`.
///
/// A rule with a closing date still in force wins over an open-ended one;
/// within each group the newest rule is picked.
pub fn applicable_penalty_rule(
    snapshot: &StokvelSnapshot,
    penalty_type: PenaltyType,
    as_of: NaiveDate,
) -> Option<&PenaltyRule> {
    let candidates = snapshot
        .penalty_rules
        .iter()
        .filter(|rule| rule.penalty_type == penalty_type && rule.is_active_for_date(as_of));
    let mut open_ended = None;
    for rule in candidates {
        if rule.effective_until.is_some() {
            return Some(rule);
        }
        open_ended.get_or_insert(rule);
    }
    open_ended
}

pub fn dashboard(
    snapshot: &StokvelSnapshot,
    today: NaiveDate,
    recent_limit: usize,
) -> StokvelDashboard {
    StokvelDashboard {
        stokvel: snapshot.stokvel.clone(),
        summary: summarize(snapshot),
        member_stats: member_stats(snapshot),
        setup: validate_setup(snapshot, today),
        acceptance: member_acceptance(snapshot),
        compliance_issues: constitution_compliance(snapshot),
        recent_contribution_rules: snapshot
            .contribution_rules
            .iter()
            .take(recent_limit)
            .map(RuleRecord::from)
            .collect(),
        recent_penalty_rules: snapshot
            .penalty_rules
            .iter()
            .take(recent_limit)
            .map(RuleRecord::from)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        applicable_penalty_rule, constitution_compliance, member_acceptance, member_stats, summarize,
        validate_setup,
    };
    use crate::model::bank_account::BankAccount;
    use crate::model::cycle::{Cycle, CycleStatus};
    use crate::model::member::{Member, MemberStatus};
    use crate::model::rule::{ContributionRule, ContributionType, PenaltyRule, PenaltyType};
    use crate::model::stokvel::{Constitution, Stokvel};
    use crate::repo::stokvel_repo::StokvelSnapshot;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
    }

    fn empty_snapshot() -> StokvelSnapshot {
        StokvelSnapshot {
            stokvel: Stokvel::new("Masakhane", date(2020, 3, 1)),
            constitution: None,
            members: Vec::new(),
            contribution_rules: Vec::new(),
            penalty_rules: Vec::new(),
            cycles: Vec::new(),
            bank_accounts: Vec::new(),
        }
    }

    fn with_members(mut snapshot: StokvelSnapshot, statuses: &[MemberStatus]) -> StokvelSnapshot {
        let stokvel_id = snapshot.stokvel.id;
        snapshot.members = statuses
            .iter()
            .enumerate()
            .map(|(index, status)| {
                Member::new(stokvel_id, format!("member {index}")).with_status(*status)
            })
            .collect();
        snapshot
    }

    fn fully_configured() -> StokvelSnapshot {
        let mut snapshot = with_members(empty_snapshot(), &[MemberStatus::Active; 5]);
        let stokvel_id = snapshot.stokvel.id;
        snapshot.constitution = Some(Constitution::default());
        snapshot.contribution_rules.push(ContributionRule::new(
            stokvel_id,
            "Monthly",
            ContributionType::Regular,
            Decimal::from(500),
            date(2025, 1, 1),
        ));
        snapshot.penalty_rules.push(PenaltyRule::new(
            stokvel_id,
            "Late",
            PenaltyType::LatePayment,
            Decimal::from(50),
            date(2025, 1, 1),
        ));
        let mut account = BankAccount::new(stokvel_id, "Capitec", "Masakhane", "1234567890");
        account.is_primary = true;
        snapshot.bank_accounts.push(account);
        snapshot
    }

    #[test]
    fn empty_club_has_zero_counts_and_no_current_cycle() {
        let summary = summarize(&empty_snapshot());
        assert_eq!(summary.total_members, 0);
        assert_eq!(summary.active_members, 0);
        assert_eq!(summary.total_cycles, 0);
        assert!(summary.current_cycle.is_none());
        assert!(member_stats(&empty_snapshot()).is_empty());
    }

    #[test]
    fn member_stats_partition_by_status() {
        let snapshot = with_members(
            empty_snapshot(),
            &[
                MemberStatus::Active,
                MemberStatus::Pending,
                MemberStatus::Active,
                MemberStatus::Probation,
                MemberStatus::Pending,
                MemberStatus::Active,
            ],
        );
        let stats = member_stats(&snapshot);
        assert_eq!(
            (
                stats.total_members,
                stats.active_members,
                stats.pending_members,
                stats.probation_members
            ),
            (6, 3, 2, 1)
        );
        assert_eq!(stats.percentage(MemberStatus::Active), Some(50.0));
        assert_eq!(stats.percentage(MemberStatus::Probation), Some(16.67));
    }

    #[test]
    fn current_cycle_is_the_active_one() {
        let mut snapshot = empty_snapshot();
        let stokvel_id = snapshot.stokvel.id;
        let mut active = Cycle::new(stokvel_id, "2025", date(2025, 1, 1), date(2025, 12, 31));
        active.status = CycleStatus::Active;
        let mut done = Cycle::new(stokvel_id, "2024", date(2024, 1, 1), date(2024, 12, 31));
        done.status = CycleStatus::Completed;
        snapshot.cycles = vec![active.clone(), done];

        let summary = summarize(&snapshot);
        assert_eq!(summary.total_cycles, 2);
        assert_eq!(summary.current_cycle, Some(active));
    }

    #[test]
    fn unconfigured_club_reports_every_missing_piece_in_order() {
        let validation = validate_setup(&empty_snapshot(), date(2025, 6, 1));
        assert!(!validation.setup_valid);
        assert_eq!(
            validation.issues,
            vec![
                "Stokvel constitution not configured",
                "No active contribution rules defined",
                "No penalty rules defined",
                "No active bank accounts configured",
                "No primary bank account set",
            ]
        );
    }

    #[test]
    fn fully_configured_club_is_valid() {
        let validation = validate_setup(&fully_configured(), date(2025, 6, 1));
        assert!(validation.setup_valid);
        assert!(validation.issues.is_empty());
    }

    #[test]
    fn contribution_rule_outside_its_window_does_not_count() {
        let snapshot = fully_configured();
        let validation = validate_setup(&snapshot, date(2024, 12, 31));
        assert_eq!(validation.issues, vec!["No active contribution rules defined"]);
        assert_eq!(summarize(&snapshot).contribution_rules_count, 1);
    }

    #[test]
    fn membership_bounds_are_checked_against_active_members() {
        let mut snapshot = fully_configured();
        snapshot.constitution = Some(Constitution {
            minimum_members: 6,
            ..Constitution::default()
        });
        let validation = validate_setup(&snapshot, date(2025, 6, 1));
        assert_eq!(
            validation.issues,
            vec!["Below minimum members requirement: 5/6"]
        );

        snapshot.constitution = Some(Constitution {
            minimum_members: 2,
            maximum_members: Some(4),
            ..Constitution::default()
        });
        let validation = validate_setup(&snapshot, date(2025, 6, 1));
        assert_eq!(validation.issues, vec!["Exceeds maximum members limit: 5/4"]);

        snapshot.stokvel.is_accepting_members = false;
        assert!(validate_setup(&snapshot, date(2025, 6, 1)).setup_valid);
        assert_eq!(
            constitution_compliance(&snapshot),
            Some(vec!["Exceeds maximum members limit: 5/4".to_string()])
        );
    }

    #[test]
    fn acceptance_checks_flags_before_capacity() {
        let mut snapshot = fully_configured();
        snapshot.constitution = Some(Constitution {
            minimum_members: 1,
            maximum_members: Some(5),
            ..Constitution::default()
        });
        assert_eq!(
            member_acceptance(&snapshot).reason,
            "Maximum member limit reached (5/5)"
        );

        snapshot.stokvel.is_active = false;
        assert_eq!(member_acceptance(&snapshot).reason, "Stokvel is not active");

        snapshot.stokvel.is_accepting_members = false;
        let acceptance = member_acceptance(&snapshot);
        assert!(!acceptance.can_accept);
        assert_eq!(acceptance.reason, "Stokvel is not accepting new members");
    }

    #[test]
    fn zero_maximum_members_does_not_cap_the_club() {
        let mut snapshot = fully_configured();
        snapshot.constitution = Some(Constitution {
            minimum_members: 1,
            maximum_members: Some(0),
            ..Constitution::default()
        });

        let acceptance = member_acceptance(&snapshot);
        assert!(acceptance.can_accept);
        assert_eq!(acceptance.reason, "Can accept new members");
        assert!(validate_setup(&snapshot, date(2025, 6, 1)).setup_valid);
        assert_eq!(constitution_compliance(&snapshot), Some(Vec::new()));
    }

    fn penalty(
        snapshot: &StokvelSnapshot,
        name: &str,
        penalty_type: PenaltyType,
        effective_until: Option<NaiveDate>,
    ) -> PenaltyRule {
        let mut rule = PenaltyRule::new(
            snapshot.stokvel.id,
            name,
            penalty_type,
            Decimal::from(20),
            date(2025, 1, 1),
        );
        rule.effective_until = effective_until;
        rule
    }

    #[test]
    fn bounded_penalty_rule_wins_while_in_force() {
        let mut snapshot = empty_snapshot();
        snapshot.penalty_rules = vec![
            penalty(&snapshot, "standing", PenaltyType::LatePayment, None),
            penalty(&snapshot, "promo", PenaltyType::LatePayment, Some(date(2025, 6, 30))),
            penalty(&snapshot, "absent", PenaltyType::MissedMeeting, Some(date(2025, 12, 31))),
        ];

        let pick = |as_of| {
            applicable_penalty_rule(&snapshot, PenaltyType::LatePayment, as_of)
                .map(|rule| rule.name.as_str())
        };
        assert_eq!(pick(date(2025, 3, 1)), Some("promo"));
        assert_eq!(pick(date(2025, 7, 1)), Some("standing"));
        assert_eq!(pick(date(2024, 12, 31)), None);
    }

    #[test]
    fn inactive_or_unmatched_penalty_rules_are_not_applicable() {
        let mut snapshot = empty_snapshot();
        let mut retired = penalty(&snapshot, "retired", PenaltyType::LatePayment, None);
        retired.is_active = false;
        snapshot.penalty_rules = vec![retired];

        assert!(
            applicable_penalty_rule(&snapshot, PenaltyType::LatePayment, date(2025, 3, 1))
                .is_none()
        );
        assert!(
            applicable_penalty_rule(&snapshot, PenaltyType::EarlyExit, date(2025, 3, 1))
                .is_none()
        );
    }

    #[test]
    fn compliance_is_absent_without_constitution() {
        assert_eq!(constitution_compliance(&empty_snapshot()), None);
    }
}
