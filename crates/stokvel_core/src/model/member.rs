//! Club membership record.
//!
//! # Invariants
//! - A member belongs to exactly one club.
//! - `status` is one of `active`, `pending`, `probation`.
//! - `member_number` is unique per club once assigned by storage.

use super::stokvel::StokvelId;
use super::validation::{require_text, ModelValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type MemberId = Uuid;

/// Standing of a member within their club.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    /// Full member in good standing.
    Active,
    /// Applied, awaiting approval.
    Pending,
    /// Approved but still serving the probation period.
    Probation,
}

impl MemberStatus {
    pub const ALL: [MemberStatus; 3] = [Self::Active, Self::Pending, Self::Probation];

    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Probation => "probation",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "pending" => Some(Self::Pending),
            "probation" => Some(Self::Probation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub stokvel_id: StokvelId,
    /// Zero-padded sequence (`001`, `002`, ...). Empty until stored.
    pub member_number: String,
    pub display_name: String,
    pub status: MemberStatus,
}

impl Member {
    /// Creates a pending member; the member number is assigned on insert.
    pub fn new(stokvel_id: StokvelId, display_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            stokvel_id,
            member_number: String::new(),
            display_name: display_name.into(),
            status: MemberStatus::Pending,
        }
    }

    pub fn with_status(mut self, status: MemberStatus) -> Self {
        self.status = status;
        self
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("display_name", &self.display_name)
    }
}

/// Formats the next member number after the highest numeric one in use.
pub fn next_member_number<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let highest = existing
        .into_iter()
        .filter_map(|value| value.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{:03}", highest.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::next_member_number;

    #[test]
    fn first_member_number_is_padded() {
        assert_eq!(next_member_number(Vec::<&str>::new()), "001");
    }

    #[test]
    fn member_number_skips_non_numeric_values() {
        assert_eq!(next_member_number(["004", "legacy", "012"]), "013");
    }

    #[test]
    fn member_number_grows_past_padding_width() {
        assert_eq!(next_member_number(["999"]), "1000");
    }
}
