//! Club aggregate root and its constitution.
//!
//! # Responsibility
//! - Define the `Stokvel` record and the per-club `Constitution`.
//! - Validate membership bounds and calendar settings before persistence.
//!
//! # Invariants
//! - `name` is non-empty and unique across clubs (enforced by storage).
//! - A club has zero or one constitution.
//! - `contribution_due_day == 31` means "last day of the month".

use super::validation::{require_text, ModelValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a club.
pub type StokvelId = Uuid;

/// Savings club root record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stokvel {
    pub id: StokvelId,
    pub name: String,
    pub description: String,
    pub registration_number: Option<String>,
    pub date_established: NaiveDate,
    /// Inactive clubs are kept for history but cannot take new members.
    pub is_active: bool,
    pub is_accepting_members: bool,
}

impl Stokvel {
    /// Creates an active club that accepts members, with a generated ID.
    pub fn new(name: impl Into<String>, date_established: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            registration_number: None,
            date_established,
            is_active: true,
            is_accepting_members: true,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("name", &self.name)
    }
}

/// How often members meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingFrequency {
    Weekly,
    BiWeekly,
    Monthly,
    Quarterly,
    Annually,
}

impl MeetingFrequency {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::BiWeekly => "bi_weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annually => "annually",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "weekly" => Some(Self::Weekly),
            "bi_weekly" => Some(Self::BiWeekly),
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "annually" => Some(Self::Annually),
            _ => None,
        }
    }
}

/// How often the pot is paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutFrequency {
    Monthly,
    Quarterly,
    BiAnnually,
    Annually,
    EndOfCycle,
}

impl PayoutFrequency {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::BiAnnually => "bi_annually",
            Self::Annually => "annually",
            Self::EndOfCycle => "end_of_cycle",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "bi_annually" => Some(Self::BiAnnually),
            "annually" => Some(Self::Annually),
            "end_of_cycle" => Some(Self::EndOfCycle),
            _ => None,
        }
    }
}

/// Order in which members receive payouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutOrderMethod {
    Rotation,
    Draw,
    Seniority,
    ContributionBased,
}

impl PayoutOrderMethod {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Rotation => "rotation",
            Self::Draw => "draw",
            Self::Seniority => "seniority",
            Self::ContributionBased => "contribution_based",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "rotation" => Some(Self::Rotation),
            "draw" => Some(Self::Draw),
            "seniority" => Some(Self::Seniority),
            "contribution_based" => Some(Self::ContributionBased),
            _ => None,
        }
    }
}

/// Per-club rule set governing membership bounds and schedules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constitution {
    pub meeting_frequency: MeetingFrequency,
    pub minimum_attendance_percentage: u8,
    pub minimum_members: u32,
    /// `None` or `Some(0)` means the club has no upper bound.
    pub maximum_members: Option<u32>,
    pub probation_period_months: u32,
    pub contribution_start_day: u8,
    pub contribution_due_day: u8,
    pub notice_period_days: u32,
    pub payout_frequency: PayoutFrequency,
    pub payout_order_method: PayoutOrderMethod,
}

impl Default for Constitution {
    fn default() -> Self {
        Self {
            meeting_frequency: MeetingFrequency::Monthly,
            minimum_attendance_percentage: 60,
            minimum_members: 5,
            maximum_members: None,
            probation_period_months: 3,
            contribution_start_day: 1,
            contribution_due_day: 31,
            notice_period_days: 30,
            payout_frequency: PayoutFrequency::Monthly,
            payout_order_method: PayoutOrderMethod::Rotation,
        }
    }
}

impl Constitution {
    /// Effective upper bound on membership; a stored zero is treated as unset.
    pub fn member_cap(&self) -> Option<u32> {
        self.maximum_members.filter(|&maximum| maximum > 0)
    }

    /// Checks calendar days, attendance percentage and membership bounds.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        for (field, value) in [
            ("contribution_start_day", self.contribution_start_day),
            ("contribution_due_day", self.contribution_due_day),
        ] {
            if !(1..=31).contains(&value) {
                return Err(ModelValidationError::DayOutOfRange { field, value });
            }
        }

        if self.minimum_attendance_percentage > 100 {
            return Err(ModelValidationError::AttendanceOutOfRange(
                self.minimum_attendance_percentage,
            ));
        }

        if let Some(maximum) = self.member_cap() {
            if maximum < self.minimum_members {
                return Err(ModelValidationError::MemberBoundsInverted {
                    minimum: self.minimum_members,
                    maximum,
                });
            }
        }

        Ok(())
    }
}
