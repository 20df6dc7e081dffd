//! Row decoding shared by the stokvel repository read and write paths.
//!
//! Persisted rows are re-validated on read: unknown labels, malformed UUIDs
//! or decimals surface as `RepoError::InvalidData` instead of being masked.

use super::stokvel_repo::{RepoError, RepoResult};
use crate::model::bank_account::BankAccount;
use crate::model::cycle::{Cycle, CycleStatus};
use crate::model::member::{Member, MemberStatus};
use crate::model::rule::{
    CalculationMethod, ContributionFrequency, ContributionRule, ContributionType, PenaltyRule,
    PenaltyType,
};
use crate::model::stokvel::{
    Constitution, MeetingFrequency, PayoutFrequency, PayoutOrderMethod, Stokvel,
};
use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

pub(crate) const STOKVEL_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    registration_number,
    date_established,
    is_active,
    is_accepting_members
FROM stokvels";

pub(crate) const CONSTITUTION_SELECT_SQL: &str = "SELECT
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
FROM constitutions";

pub(crate) const MEMBER_SELECT_SQL: &str = "SELECT
    id,
    stokvel_id,
    member_number,
    display_name,
    status
FROM members";

pub(crate) const CONTRIBUTION_RULE_SELECT_SQL: &str = "SELECT
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
    description,
    created_at
FROM contribution_rules";

pub(crate) const PENALTY_RULE_SELECT_SQL: &str = "SELECT
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
    description,
    created_at
FROM penalty_rules";

pub(crate) const CYCLE_SELECT_SQL: &str = "SELECT
    id,
    stokvel_id,
    name,
    start_date,
    end_date,
    status,
    expected_total_contributions,
    description
FROM cycles";

pub(crate) const BANK_ACCOUNT_SELECT_SQL: &str = "SELECT
    id,
    stokvel_id,
    bank_name,
    account_name,
    account_number,
    branch_code,
    account_type,
    is_primary,
    is_active
FROM bank_accounts";

pub(crate) fn stokvel_from_row(row: &Row<'_>) -> RepoResult<Stokvel> {
    Ok(Stokvel {
        id: uuid_column(row, "stokvels", "id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        registration_number: row.get("registration_number")?,
        date_established: row.get("date_established")?,
        is_active: bool_column(row, "stokvels", "is_active")?,
        is_accepting_members: bool_column(row, "stokvels", "is_accepting_members")?,
    })
}

pub(crate) fn constitution_from_row(row: &Row<'_>) -> RepoResult<Constitution> {
    Ok(Constitution {
        meeting_frequency: label_column(
            row,
            "constitutions",
            "meeting_frequency",
            MeetingFrequency::from_db_str,
        )?,
        minimum_attendance_percentage: row.get("minimum_attendance_percentage")?,
        minimum_members: row.get("minimum_members")?,
        maximum_members: row.get("maximum_members")?,
        probation_period_months: row.get("probation_period_months")?,
        contribution_start_day: row.get("contribution_start_day")?,
        contribution_due_day: row.get("contribution_due_day")?,
        notice_period_days: row.get("notice_period_days")?,
        payout_frequency: label_column(
            row,
            "constitutions",
            "payout_frequency",
            PayoutFrequency::from_db_str,
        )?,
        payout_order_method: label_column(
            row,
            "constitutions",
            "payout_order_method",
            PayoutOrderMethod::from_db_str,
        )?,
    })
}

pub(crate) fn member_from_row(row: &Row<'_>) -> RepoResult<Member> {
    Ok(Member {
        id: uuid_column(row, "members", "id")?,
        stokvel_id: uuid_column(row, "members", "stokvel_id")?,
        member_number: row.get("member_number")?,
        display_name: row.get("display_name")?,
        status: label_column(row, "members", "status", MemberStatus::from_db_str)?,
    })
}

pub(crate) fn contribution_rule_from_row(row: &Row<'_>) -> RepoResult<ContributionRule> {
    const TABLE: &str = "contribution_rules";
    Ok(ContributionRule {
        id: uuid_column(row, TABLE, "id")?,
        stokvel_id: uuid_column(row, TABLE, "stokvel_id")?,
        name: row.get("name")?,
        contribution_type: label_column(
            row,
            TABLE,
            "contribution_type",
            ContributionType::from_db_str,
        )?,
        amount: decimal_column(row, TABLE, "amount")?,
        frequency: label_column(row, TABLE, "frequency", ContributionFrequency::from_db_str)?,
        effective_from: row.get("effective_from")?,
        effective_until: row.get("effective_until")?,
        is_active: bool_column(row, TABLE, "is_active")?,
        is_mandatory: bool_column(row, TABLE, "is_mandatory")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    })
}

pub(crate) fn penalty_rule_from_row(row: &Row<'_>) -> RepoResult<PenaltyRule> {
    const TABLE: &str = "penalty_rules";
    let maximum_amount = match row.get::<_, Option<String>>("maximum_amount")? {
        Some(text) => Some(parse_decimal(&text, TABLE, "maximum_amount")?),
        None => None,
    };

    Ok(PenaltyRule {
        id: uuid_column(row, TABLE, "id")?,
        stokvel_id: uuid_column(row, TABLE, "stokvel_id")?,
        name: row.get("name")?,
        penalty_type: label_column(row, TABLE, "penalty_type", PenaltyType::from_db_str)?,
        calculation_method: label_column(
            row,
            TABLE,
            "calculation_method",
            CalculationMethod::from_db_str,
        )?,
        amount: decimal_column(row, TABLE, "amount")?,
        grace_period_days: row.get("grace_period_days")?,
        maximum_amount,
        effective_from: row.get("effective_from")?,
        effective_until: row.get("effective_until")?,
        is_active: bool_column(row, TABLE, "is_active")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    })
}

pub(crate) fn cycle_from_row(row: &Row<'_>) -> RepoResult<Cycle> {
    Ok(Cycle {
        id: uuid_column(row, "cycles", "id")?,
        stokvel_id: uuid_column(row, "cycles", "stokvel_id")?,
        name: row.get("name")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        status: label_column(row, "cycles", "status", CycleStatus::from_db_str)?,
        expected_total_contributions: decimal_column(
            row,
            "cycles",
            "expected_total_contributions",
        )?,
        description: row.get("description")?,
    })
}

pub(crate) fn bank_account_from_row(row: &Row<'_>) -> RepoResult<BankAccount> {
    Ok(BankAccount {
        id: uuid_column(row, "bank_accounts", "id")?,
        stokvel_id: uuid_column(row, "bank_accounts", "stokvel_id")?,
        bank_name: row.get("bank_name")?,
        account_name: row.get("account_name")?,
        account_number: row.get("account_number")?,
        branch_code: row.get("branch_code")?,
        account_type: row.get("account_type")?,
        is_primary: bool_column(row, "bank_accounts", "is_primary")?,
        is_active: bool_column(row, "bank_accounts", "is_active")?,
    })
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn uuid_column(row: &Row<'_>, table: &str, column: &str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    Uuid::parse_str(&text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{text}` in {table}.{column}"))
    })
}

fn bool_column(row: &Row<'_>, table: &str, column: &str) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {table}.{column}"
        ))),
    }
}

fn label_column<T>(
    row: &Row<'_>,
    table: &str,
    column: &str,
    parse: fn(&str) -> Option<T>,
) -> RepoResult<T> {
    let text: String = row.get(column)?;
    parse(&text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid value `{text}` in {table}.{column}"))
    })
}

fn decimal_column(row: &Row<'_>, table: &str, column: &str) -> RepoResult<Decimal> {
    let text: String = row.get(column)?;
    parse_decimal(&text, table, column)
}

fn parse_decimal(text: &str, table: &str, column: &str) -> RepoResult<Decimal> {
    Decimal::from_str(text).map_err(|_| {
        RepoError::InvalidData(format!("invalid decimal value `{text}` in {table}.{column}"))
    })
}
