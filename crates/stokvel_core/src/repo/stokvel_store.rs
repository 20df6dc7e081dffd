//! Stokvel write contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist clubs and their child records for seeding and form handlers.
//! - Keep multi-row invariants (current cycle, primary account, member
//!   numbering) inside one immediate transaction per write.
//!
//! # Invariants
//! - Every write validates its model before touching SQL.
//! - Writes against an unknown club fail with `NotFound`, never insert orphans.
//! - Activating a cycle completes any other active cycle of the same club.
//! - The first active bank account of a club becomes its primary account.

use super::rows::{bool_to_int, contribution_rule_from_row, CONTRIBUTION_RULE_SELECT_SQL};
use super::stokvel_repo::{query_stokvel, RepoError, RepoResult, SqliteStokvelRepository};
use crate::model::bank_account::BankAccount;
use crate::model::cycle::{expected_cycle_contributions, Cycle, CycleId, CycleStatus};
use crate::model::member::{next_member_number, Member, MemberId, MemberStatus};
use crate::model::rule::{ContributionRule, PenaltyRule, RuleId};
use crate::model::stokvel::{Constitution, Stokvel, StokvelId};
use chrono::NaiveDate;
use rusqlite::{
    params, Connection, ErrorCode, OptionalExtension, Transaction, TransactionBehavior,
};

/// Write contract for clubs and their child records.
pub trait StokvelStore {
    /// Creates a club, optionally with its constitution, in one transaction.
    fn create_stokvel(
        &self,
        stokvel: &Stokvel,
        constitution: Option<&Constitution>,
    ) -> RepoResult<StokvelId>;
    /// Inserts or replaces the club constitution.
    fn set_constitution(&self, stokvel_id: StokvelId, constitution: &Constitution)
        -> RepoResult<()>;
    /// Deactivation is refused while the club still has active members.
    fn set_stokvel_active(&self, stokvel_id: StokvelId, is_active: bool) -> RepoResult<()>;
    fn set_accepting_members(&self, stokvel_id: StokvelId, accepting: bool) -> RepoResult<()>;
    /// Inserts a member and returns it with its assigned member number.
    fn add_member(&self, member: &Member) -> RepoResult<Member>;
    fn set_member_status(&self, member_id: MemberId, status: MemberStatus) -> RepoResult<()>;
    fn add_contribution_rule(&self, rule: &ContributionRule) -> RepoResult<RuleId>;
    /// Marks a rule inactive and closes its effective window at `end_date`.
    fn deactivate_contribution_rule(&self, rule_id: RuleId, end_date: NaiveDate)
        -> RepoResult<()>;
    fn add_penalty_rule(&self, rule: &PenaltyRule) -> RepoResult<RuleId>;
    /// Inserts a planned cycle with its expected contribution total filled in.
    fn add_cycle(&self, cycle: &Cycle) -> RepoResult<Cycle>;
    fn activate_cycle(&self, cycle_id: CycleId) -> RepoResult<()>;
    /// Inserts an account, promoting it to primary when it is the first
    /// active one or when requested.
    fn add_bank_account(&self, account: &BankAccount) -> RepoResult<BankAccount>;
}

impl StokvelStore for SqliteStokvelRepository<'_> {
    fn create_stokvel(
        &self,
        stokvel: &Stokvel,
        constitution: Option<&Constitution>,
    ) -> RepoResult<StokvelId> {
        stokvel.validate()?;
        if let Some(constitution) = constitution {
            constitution.validate()?;
        }

        let tx = begin_write(self.conn)?;
        tx.execute(
            "INSERT INTO stokvels (
                id,
                name,
                description,
                registration_number,
                date_established,
                is_active,
                is_accepting_members
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                stokvel.id.to_string(),
                stokvel.name.trim(),
                stokvel.description.as_str(),
                stokvel.registration_number.as_deref(),
                stokvel.date_established,
                bool_to_int(stokvel.is_active),
                bool_to_int(stokvel.is_accepting_members),
            ],
        )
        .map_err(|err| {
            conflict_or_db(
                err,
                format!("stokvel with name `{}` already exists", stokvel.name.trim()),
            )
        })?;

        if let Some(constitution) = constitution {
            upsert_constitution(&tx, stokvel.id, constitution)?;
        }
        tx.commit()?;

        Ok(stokvel.id)
    }

    fn set_constitution(
        &self,
        stokvel_id: StokvelId,
        constitution: &Constitution,
    ) -> RepoResult<()> {
        constitution.validate()?;
        let tx = begin_write(self.conn)?;
        require_stokvel(&tx, stokvel_id)?;
        upsert_constitution(&tx, stokvel_id, constitution)?;
        tx.commit()?;
        Ok(())
    }

    fn set_stokvel_active(&self, stokvel_id: StokvelId, is_active: bool) -> RepoResult<()> {
        let tx = begin_write(self.conn)?;
        require_stokvel(&tx, stokvel_id)?;

        if !is_active {
            let active_members: i64 = tx.query_row(
                "SELECT COUNT(*) FROM members WHERE stokvel_id = ?1 AND status = 'active';",
                [stokvel_id.to_string()],
                |row| row.get(0),
            )?;
            if active_members > 0 {
                return Err(RepoError::Conflict(format!(
                    "cannot deactivate stokvel with {active_members} active members"
                )));
            }
        }

        tx.execute(
            "UPDATE stokvels
             SET
                is_active = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![stokvel_id.to_string(), bool_to_int(is_active)],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn set_accepting_members(&self, stokvel_id: StokvelId, accepting: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE stokvels
             SET
                is_accepting_members = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![stokvel_id.to_string(), bool_to_int(accepting)],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("stokvel", stokvel_id));
        }
        Ok(())
    }

    fn add_member(&self, member: &Member) -> RepoResult<Member> {
        member.validate()?;
        let tx = begin_write(self.conn)?;
        require_stokvel(&tx, member.stokvel_id)?;

        let member_number = if member.member_number.trim().is_empty() {
            let mut stmt = tx.prepare("SELECT member_number FROM members WHERE stokvel_id = ?1;")?;
            let existing = stmt
                .query_map([member.stokvel_id.to_string()], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            next_member_number(existing.iter().map(String::as_str))
        } else {
            member.member_number.trim().to_string()
        };

        tx.execute(
            "INSERT INTO members (
                id,
                stokvel_id,
                member_number,
                display_name,
                status
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                member.id.to_string(),
                member.stokvel_id.to_string(),
                member_number.as_str(),
                member.display_name.trim(),
                member.status.as_db_str(),
            ],
        )
        .map_err(|err| conflict_or_db(err, format!("member number `{member_number}` is taken")))?;
        tx.commit()?;

        Ok(Member {
            member_number,
            display_name: member.display_name.trim().to_string(),
            ..member.clone()
        })
    }

    fn set_member_status(&self, member_id: MemberId, status: MemberStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE members SET status = ?2 WHERE id = ?1;",
            params![member_id.to_string(), status.as_db_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("member", member_id));
        }
        Ok(())
    }

    fn add_contribution_rule(&self, rule: &ContributionRule) -> RepoResult<RuleId> {
        rule.validate()?;
        let tx = begin_write(self.conn)?;
        require_stokvel(&tx, rule.stokvel_id)?;
        tx.execute(
            "INSERT INTO contribution_rules (
                id,
                stokvel_id,
                name,
                contribution_type,
                amount,
                frequency,
                effective_from,
                effective_until,
                is_active,
                is_mandatory,
                description
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                rule.id.to_string(),
                rule.stokvel_id.to_string(),
                rule.name.trim(),
                rule.contribution_type.as_db_str(),
                rule.amount.to_string(),
                rule.frequency.as_db_str(),
                rule.effective_from,
                rule.effective_until,
                bool_to_int(rule.is_active),
                bool_to_int(rule.is_mandatory),
                rule.description.as_str(),
            ],
        )?;
        tx.commit()?;
        Ok(rule.id)
    }

    fn deactivate_contribution_rule(
        &self,
        rule_id: RuleId,
        end_date: NaiveDate,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE contribution_rules
             SET
                is_active = 0,
                effective_until = ?2
             WHERE id = ?1;",
            params![rule_id.to_string(), end_date],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("contribution rule", rule_id));
        }
        Ok(())
    }

    fn add_penalty_rule(&self, rule: &PenaltyRule) -> RepoResult<RuleId> {
        rule.validate()?;
        let tx = begin_write(self.conn)?;
        require_stokvel(&tx, rule.stokvel_id)?;
        tx.execute(
            "INSERT INTO penalty_rules (
                id,
                stokvel_id,
                name,
                penalty_type,
                calculation_method,
                amount,
                grace_period_days,
                maximum_amount,
                effective_from,
                effective_until,
                is_active,
                description
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                rule.id.to_string(),
                rule.stokvel_id.to_string(),
                rule.name.trim(),
                rule.penalty_type.as_db_str(),
                rule.calculation_method.as_db_str(),
                rule.amount.to_string(),
                rule.grace_period_days,
                rule.maximum_amount.map(|amount| amount.to_string()),
                rule.effective_from,
                rule.effective_until,
                bool_to_int(rule.is_active),
                rule.description.as_str(),
            ],
        )?;
        tx.commit()?;
        Ok(rule.id)
    }

    fn add_cycle(&self, cycle: &Cycle) -> RepoResult<Cycle> {
        cycle.validate()?;
        let tx = begin_write(self.conn)?;
        require_stokvel(&tx, cycle.stokvel_id)?;
        let key = cycle.stokvel_id.to_string();

        let overlapping: i64 = tx.query_row(
            "SELECT COUNT(*)
             FROM cycles
             WHERE stokvel_id = ?1
               AND start_date < ?3
               AND end_date > ?2;",
            params![key, cycle.start_date, cycle.end_date],
            |row| row.get(0),
        )?;
        if overlapping > 0 {
            return Err(RepoError::Conflict(
                "cycle dates overlap with an existing cycle".to_string(),
            ));
        }

        let rules = {
            let mut stmt = tx.prepare(&format!(
                "{CONTRIBUTION_RULE_SELECT_SQL} WHERE stokvel_id = ?1 AND is_active = 1;"
            ))?;
            let mut rows = stmt.query([key.as_str()])?;
            let mut rules = Vec::new();
            while let Some(row) = rows.next()? {
                rules.push(contribution_rule_from_row(row)?);
            }
            rules
        };
        let active_members: i64 = tx.query_row(
            "SELECT COUNT(*) FROM members WHERE stokvel_id = ?1 AND status = 'active';",
            [key.as_str()],
            |row| row.get(0),
        )?;
        let expected = expected_cycle_contributions(
            &rules,
            cycle.start_date,
            cycle.end_date,
            usize::try_from(active_members).unwrap_or(0),
        )?;

        let stored = Cycle {
            status: CycleStatus::Planned,
            expected_total_contributions: expected,
            ..cycle.clone()
        };
        tx.execute(
            "INSERT INTO cycles (
                id,
                stokvel_id,
                name,
                start_date,
                end_date,
                status,
                expected_total_contributions,
                description
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                stored.id.to_string(),
                key,
                stored.name.trim(),
                stored.start_date,
                stored.end_date,
                stored.status.as_db_str(),
                stored.expected_total_contributions.to_string(),
                stored.description.as_str(),
            ],
        )?;
        tx.commit()?;

        Ok(stored)
    }

    fn activate_cycle(&self, cycle_id: CycleId) -> RepoResult<()> {
        let tx = begin_write(self.conn)?;
        let stokvel_id: Option<String> = tx
            .query_row(
                "SELECT stokvel_id FROM cycles WHERE id = ?1;",
                [cycle_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(stokvel_id) = stokvel_id else {
            return Err(RepoError::not_found("cycle", cycle_id));
        };

        tx.execute(
            "UPDATE cycles
             SET status = 'completed'
             WHERE stokvel_id = ?1
               AND status = 'active'
               AND id <> ?2;",
            params![stokvel_id, cycle_id.to_string()],
        )?;
        tx.execute(
            "UPDATE cycles SET status = 'active' WHERE id = ?1;",
            [cycle_id.to_string()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn add_bank_account(&self, account: &BankAccount) -> RepoResult<BankAccount> {
        account.validate()?;
        let tx = begin_write(self.conn)?;
        require_stokvel(&tx, account.stokvel_id)?;
        let key = account.stokvel_id.to_string();

        let has_active: i64 = tx.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM bank_accounts WHERE stokvel_id = ?1 AND is_active = 1
            );",
            [key.as_str()],
            |row| row.get(0),
        )?;
        let is_primary = account.is_active && (account.is_primary || has_active == 0);

        if is_primary {
            tx.execute(
                "UPDATE bank_accounts SET is_primary = 0 WHERE stokvel_id = ?1;",
                [key.as_str()],
            )?;
        }

        tx.execute(
            "INSERT INTO bank_accounts (
                id,
                stokvel_id,
                bank_name,
                account_name,
                account_number,
                branch_code,
                account_type,
                is_primary,
                is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                account.id.to_string(),
                key,
                account.bank_name.trim(),
                account.account_name.trim(),
                account.account_number.as_str(),
                account.branch_code.as_str(),
                account.account_type.as_str(),
                bool_to_int(is_primary),
                bool_to_int(account.is_active),
            ],
        )
        .map_err(|err| conflict_or_db(err, "bank account already exists".to_string()))?;
        tx.commit()?;

        Ok(BankAccount {
            is_primary,
            ..account.clone()
        })
    }
}

fn begin_write(conn: &Connection) -> RepoResult<Transaction<'_>> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    Ok(tx)
}

fn require_stokvel(conn: &Connection, stokvel_id: StokvelId) -> RepoResult<()> {
    if query_stokvel(conn, stokvel_id)?.is_none() {
        return Err(RepoError::not_found("stokvel", stokvel_id));
    }
    Ok(())
}

fn upsert_constitution(
    conn: &Connection,
    stokvel_id: StokvelId,
    constitution: &Constitution,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO constitutions (
            stokvel_id,
            meeting_frequency,
            minimum_attendance_percentage,
            minimum_members,
            maximum_members,
            probation_period_months,
            contribution_start_day,
            contribution_due_day,
            notice_period_days,
            payout_frequency,
            payout_order_method
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT (stokvel_id) DO UPDATE SET
            meeting_frequency = excluded.meeting_frequency,
            minimum_attendance_percentage = excluded.minimum_attendance_percentage,
            minimum_members = excluded.minimum_members,
            maximum_members = excluded.maximum_members,
            probation_period_months = excluded.probation_period_months,
            contribution_start_day = excluded.contribution_start_day,
            contribution_due_day = excluded.contribution_due_day,
            notice_period_days = excluded.notice_period_days,
            payout_frequency = excluded.payout_frequency,
            payout_order_method = excluded.payout_order_method;",
        params![
            stokvel_id.to_string(),
            constitution.meeting_frequency.as_db_str(),
            constitution.minimum_attendance_percentage,
            constitution.minimum_members,
            constitution.maximum_members,
            constitution.probation_period_months,
            constitution.contribution_start_day,
            constitution.contribution_due_day,
            constitution.notice_period_days,
            constitution.payout_frequency.as_db_str(),
            constitution.payout_order_method.as_db_str(),
        ],
    )?;
    Ok(())
}

fn conflict_or_db(err: rusqlite::Error, message: String) -> RepoError {
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => RepoError::Conflict(message),
        _ => RepoError::from(err),
    }
}
