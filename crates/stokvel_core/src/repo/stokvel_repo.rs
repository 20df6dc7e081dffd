//! Stokvel read repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Resolve clubs and list them for the club index page.
//! - Load every child collection of one club inside a single read
//!   transaction, so aggregates never mix two states of the store.
//! - List recent rules of one kind, newest first.
//!
//! # Invariants
//! - Read paths reject invalid persisted state instead of masking it.
//! - An unknown club yields `Ok(None)`; callers decide whether that is an error.
//! - Recent-rule order is `created_at DESC`, ties broken by newest insert.

use super::rows::{
    bank_account_from_row, constitution_from_row, contribution_rule_from_row, cycle_from_row,
    member_from_row, penalty_rule_from_row, stokvel_from_row, table_exists,
    BANK_ACCOUNT_SELECT_SQL, CONSTITUTION_SELECT_SQL, CONTRIBUTION_RULE_SELECT_SQL,
    CYCLE_SELECT_SQL, MEMBER_SELECT_SQL, PENALTY_RULE_SELECT_SQL, STOKVEL_SELECT_SQL,
};
use crate::db::{DbError, STOKVEL_TABLES};
use crate::model::bank_account::BankAccount;
use crate::model::cycle::Cycle;
use crate::model::member::Member;
use crate::model::rule::{ContributionRule, PenaltyRule, RuleKind, RuleRecord};
use crate::model::stokvel::{Constitution, Stokvel, StokvelId};
use crate::model::validation::ModelValidationError;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};

const STOKVELS_DEFAULT_LIMIT: u32 = 10;
const STOKVELS_LIMIT_MAX: u32 = 50;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for stokvel persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ModelValidationError),
    Db(DbError),
    /// Referenced record does not exist.
    NotFound { entity: &'static str, id: String },
    /// Write would break a uniqueness or business constraint.
    Conflict(String),
    InvalidData(String),
    /// Connection was not bootstrapped with the stokvel schema.
    MissingRequiredTable(&'static str),
}

impl RepoError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing; run migrations first")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelValidationError> for RepoError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Club status filter used by the club index page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StokvelStatusFilter {
    Active,
    /// Active and currently accepting new members.
    Accepting,
}

/// Query options for listing clubs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StokvelListQuery {
    /// Case-insensitive substring match on name or description.
    pub search: Option<String>,
    pub status: Option<StokvelStatusFilter>,
    pub established_year: Option<i32>,
    /// Defaults to 10 and clamps to 50.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Every record of one club, read in one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StokvelSnapshot {
    pub stokvel: Stokvel,
    pub constitution: Option<Constitution>,
    /// Ordered by member number.
    pub members: Vec<Member>,
    /// Newest first.
    pub contribution_rules: Vec<ContributionRule>,
    /// Newest first.
    pub penalty_rules: Vec<PenaltyRule>,
    /// Latest start date first.
    pub cycles: Vec<Cycle>,
    /// Primary account first.
    pub bank_accounts: Vec<BankAccount>,
}

/// Read contract consumed by the summary provider and list pages.
pub trait StokvelRepository {
    fn get_stokvel(&self, id: StokvelId) -> RepoResult<Option<Stokvel>>;
    fn list_stokvels(&self, query: &StokvelListQuery) -> RepoResult<Vec<Stokvel>>;
    fn load_snapshot(&self, id: StokvelId) -> RepoResult<Option<StokvelSnapshot>>;
    /// Returns `None` when the club does not exist.
    fn list_recent_rules(
        &self,
        id: StokvelId,
        kind: RuleKind,
        limit: u32,
    ) -> RepoResult<Option<Vec<RuleRecord>>>;
}

/// SQLite-backed stokvel repository.
pub struct SqliteStokvelRepository<'conn> {
    pub(crate) conn: &'conn Connection,
}

impl<'conn> SqliteStokvelRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// Fails with `MissingRequiredTable` when the schema is absent.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        for table in STOKVEL_TABLES {
            if !table_exists(conn, table)? {
                return Err(RepoError::MissingRequiredTable(table));
            }
        }
        Ok(Self { conn })
    }
}

impl StokvelRepository for SqliteStokvelRepository<'_> {
    fn get_stokvel(&self, id: StokvelId) -> RepoResult<Option<Stokvel>> {
        query_stokvel(self.conn, id)
    }

    fn list_stokvels(&self, query: &StokvelListQuery) -> RepoResult<Vec<Stokvel>> {
        let mut sql = format!("{STOKVEL_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(search) = query.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                sql.push_str(
                    " AND (name LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\')",
                );
                let pattern = format!("%{}%", escape_like(search));
                bind_values.push(Value::Text(pattern.clone()));
                bind_values.push(Value::Text(pattern));
            }
        }

        match query.status {
            Some(StokvelStatusFilter::Active) => sql.push_str(" AND is_active = 1"),
            Some(StokvelStatusFilter::Accepting) => {
                sql.push_str(" AND is_active = 1 AND is_accepting_members = 1")
            }
            None => {}
        }

        if let Some(year) = query.established_year {
            sql.push_str(" AND substr(date_established, 1, 4) = ?");
            bind_values.push(Value::Text(format!("{year:04}")));
        }

        sql.push_str(" ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?");
        bind_values.push(Value::Integer(i64::from(normalize_stokvel_limit(
            query.limit,
        ))));
        bind_values.push(Value::Integer(i64::from(query.offset)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut stokvels = Vec::new();
        while let Some(row) = rows.next()? {
            stokvels.push(stokvel_from_row(row)?);
        }
        Ok(stokvels)
    }

    fn load_snapshot(&self, id: StokvelId) -> RepoResult<Option<StokvelSnapshot>> {
        let tx = self.conn.unchecked_transaction()?;

        let Some(stokvel) = query_stokvel(&tx, id)? else {
            return Ok(None);
        };
        let key = id.to_string();

        let constitution = {
            let mut stmt =
                tx.prepare(&format!("{CONSTITUTION_SELECT_SQL} WHERE stokvel_id = ?1;"))?;
            let mut rows = stmt.query([key.as_str()])?;
            match rows.next()? {
                Some(row) => Some(constitution_from_row(row)?),
                None => None,
            }
        };

        let snapshot = StokvelSnapshot {
            stokvel,
            constitution,
            members: collect_rows(
                &tx,
                &format!("{MEMBER_SELECT_SQL} WHERE stokvel_id = ?1 ORDER BY member_number ASC;"),
                &key,
                member_from_row,
            )?,
            contribution_rules: collect_rows(
                &tx,
                &format!(
                    "{CONTRIBUTION_RULE_SELECT_SQL} WHERE stokvel_id = ?1
                     ORDER BY created_at DESC, rowid DESC;"
                ),
                &key,
                contribution_rule_from_row,
            )?,
            penalty_rules: collect_rows(
                &tx,
                &format!(
                    "{PENALTY_RULE_SELECT_SQL} WHERE stokvel_id = ?1
                     ORDER BY created_at DESC, rowid DESC;"
                ),
                &key,
                penalty_rule_from_row,
            )?,
            cycles: collect_rows(
                &tx,
                &format!(
                    "{CYCLE_SELECT_SQL} WHERE stokvel_id = ?1
                     ORDER BY start_date DESC, rowid DESC;"
                ),
                &key,
                cycle_from_row,
            )?,
            bank_accounts: collect_rows(
                &tx,
                &format!(
                    "{BANK_ACCOUNT_SELECT_SQL} WHERE stokvel_id = ?1
                     ORDER BY is_primary DESC, created_at ASC, rowid ASC;"
                ),
                &key,
                bank_account_from_row,
            )?,
        };

        tx.commit()?;
        Ok(Some(snapshot))
    }

    fn list_recent_rules(
        &self,
        id: StokvelId,
        kind: RuleKind,
        limit: u32,
    ) -> RepoResult<Option<Vec<RuleRecord>>> {
        let tx = self.conn.unchecked_transaction()?;
        if query_stokvel(&tx, id)?.is_none() {
            return Ok(None);
        }

        let key = id.to_string();
        let records = match kind {
            RuleKind::Contribution => collect_limited(
                &tx,
                CONTRIBUTION_RULE_SELECT_SQL,
                &key,
                limit,
                |row| contribution_rule_from_row(row).map(|rule| RuleRecord::from(&rule)),
            )?,
            RuleKind::Penalty => collect_limited(
                &tx,
                PENALTY_RULE_SELECT_SQL,
                &key,
                limit,
                |row| penalty_rule_from_row(row).map(|rule| RuleRecord::from(&rule)),
            )?,
        };

        tx.commit()?;
        Ok(Some(records))
    }
}

/// Normalizes club list page size.
pub fn normalize_stokvel_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => STOKVELS_DEFAULT_LIMIT,
        Some(value) if value > STOKVELS_LIMIT_MAX => STOKVELS_LIMIT_MAX,
        Some(value) => value,
    }
}

pub(crate) fn query_stokvel(conn: &Connection, id: StokvelId) -> RepoResult<Option<Stokvel>> {
    let mut stmt = conn.prepare(&format!("{STOKVEL_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query(params![id.to_string()])?;
    match rows.next()? {
        Some(row) => Ok(Some(stokvel_from_row(row)?)),
        None => Ok(None),
    }
}

fn collect_rows<T>(
    conn: &Connection,
    sql: &str,
    stokvel_key: &str,
    decode: fn(&rusqlite::Row<'_>) -> RepoResult<T>,
) -> RepoResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([stokvel_key])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(decode(row)?);
    }
    Ok(items)
}

fn collect_limited(
    conn: &Connection,
    select_sql: &str,
    stokvel_key: &str,
    limit: u32,
    decode: impl Fn(&rusqlite::Row<'_>) -> RepoResult<RuleRecord>,
) -> RepoResult<Vec<RuleRecord>> {
    let mut stmt = conn.prepare(&format!(
        "{select_sql} WHERE stokvel_id = ?1
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?2;"
    ))?;
    let mut rows = stmt.query(params![stokvel_key, i64::from(limit)])?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(decode(row)?);
    }
    Ok(records)
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{escape_like, normalize_stokvel_limit};

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn list_limit_defaults_and_clamps() {
        assert_eq!(normalize_stokvel_limit(None), 10);
        assert_eq!(normalize_stokvel_limit(Some(0)), 10);
        assert_eq!(normalize_stokvel_limit(Some(25)), 25);
        assert_eq!(normalize_stokvel_limit(Some(500)), 50);
    }
}
