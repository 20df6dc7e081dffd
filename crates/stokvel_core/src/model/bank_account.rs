//! Club bank account record.
//!
//! # Invariants
//! - `(bank_name, account_number)` is unique across clubs.
//! - At most one active primary account per club.

use super::stokvel::StokvelId;
use super::validation::{require_text, ModelValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type BankAccountId = Uuid;

static ACCOUNT_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{8,12}$").expect("valid account number regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: BankAccountId,
    pub stokvel_id: StokvelId,
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
    pub branch_code: String,
    pub account_type: String,
    pub is_primary: bool,
    pub is_active: bool,
}

impl BankAccount {
    /// Creates an active, non-primary account. Storage promotes the first
    /// active account of a club to primary.
    pub fn new(
        stokvel_id: StokvelId,
        bank_name: impl Into<String>,
        account_name: impl Into<String>,
        account_number: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            stokvel_id,
            bank_name: bank_name.into(),
            account_name: account_name.into(),
            account_number: account_number.into(),
            branch_code: String::new(),
            account_type: "savings".to_string(),
            is_primary: false,
            is_active: true,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("bank_name", &self.bank_name)?;
        require_text("account_name", &self.account_name)?;
        let compact = self.account_number.replace(' ', "");
        if !ACCOUNT_NUMBER_RE.is_match(&compact) {
            return Err(ModelValidationError::InvalidAccountNumber(
                self.account_number.clone(),
            ));
        }
        Ok(())
    }

    /// Account number with all but the last four digits hidden.
    pub fn masked_account_number(&self) -> String {
        let chars: Vec<char> = self.account_number.chars().collect();
        if chars.len() <= 4 {
            return self.account_number.clone();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::BankAccount;
    use crate::model::validation::ModelValidationError;
    use uuid::Uuid;

    #[test]
    fn masked_number_keeps_last_four_digits() {
        let account = BankAccount::new(Uuid::new_v4(), "Capitec", "Club", "1234567890");
        assert_eq!(account.masked_account_number(), "****7890");

        let short = BankAccount {
            account_number: "123".to_string(),
            ..account
        };
        assert_eq!(short.masked_account_number(), "123");
    }

    #[test]
    fn account_number_allows_spaces_but_not_letters() {
        let spaced = BankAccount::new(Uuid::new_v4(), "FNB", "Club", "6200 1234 56");
        assert!(spaced.validate().is_ok());

        let lettered = BankAccount::new(Uuid::new_v4(), "FNB", "Club", "62AB123456");
        assert_eq!(
            lettered.validate(),
            Err(ModelValidationError::InvalidAccountNumber(
                "62AB123456".to_string()
            ))
        );
    }
}
