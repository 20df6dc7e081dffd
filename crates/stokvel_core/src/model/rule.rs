//! Contribution and penalty rules.
//!
//! # Responsibility
//! - Define the two rule records a club configures.
//! - Decide whether a rule applies on a given date.
//! - Compute penalty amounts from a rule's calculation method.
//!
//! # Invariants
//! - Contribution amounts are strictly positive.
//! - Penalty amounts are non-negative; percentage penalties are at most 100.
//! - `effective_until`, when set, is not before `effective_from`.
//! - `created_at` is assigned by storage and ignored on insert.

use super::stokvel::StokvelId;
use super::validation::{check_money, require_text, ModelValidationError};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RuleId = Uuid;

/// Which rule table a listing reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Contribution,
    Penalty,
}

impl RuleKind {
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "contribution" | "contributions" => Some(Self::Contribution),
            "penalty" | "penalties" => Some(Self::Penalty),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionType {
    Regular,
    Registration,
    Special,
    Emergency,
}

impl ContributionType {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Registration => "registration",
            Self::Special => "special",
            Self::Emergency => "emergency",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "regular" => Some(Self::Regular),
            "registration" => Some(Self::Registration),
            "special" => Some(Self::Special),
            "emergency" => Some(Self::Emergency),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionFrequency {
    OnceOff,
    Weekly,
    Monthly,
    Quarterly,
    Annually,
}

impl ContributionFrequency {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::OnceOff => "once_off",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annually => "annually",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "once_off" => Some(Self::OnceOff),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "annually" => Some(Self::Annually),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyType {
    LatePayment,
    InsufficientPayment,
    NoPayment,
    MissedMeeting,
    EarlyExit,
    BreachOfRules,
}

impl PenaltyType {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::LatePayment => "late_payment",
            Self::InsufficientPayment => "insufficient_payment",
            Self::NoPayment => "no_payment",
            Self::MissedMeeting => "missed_meeting",
            Self::EarlyExit => "early_exit",
            Self::BreachOfRules => "breach_of_rules",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "late_payment" => Some(Self::LatePayment),
            "insufficient_payment" => Some(Self::InsufficientPayment),
            "no_payment" => Some(Self::NoPayment),
            "missed_meeting" => Some(Self::MissedMeeting),
            "early_exit" => Some(Self::EarlyExit),
            "breach_of_rules" => Some(Self::BreachOfRules),
            _ => None,
        }
    }
}

/// How a penalty amount is derived from the rule's `amount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMethod {
    /// `amount` as-is.
    Fixed,
    /// `amount` percent of the base amount.
    Percentage,
    /// `amount` per day past the grace period.
    Daily,
    /// Placeholder for tier tables; currently behaves like `Fixed`.
    Tiered,
}

impl CalculationMethod {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Percentage => "percentage",
            Self::Daily => "daily",
            Self::Tiered => "tiered",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "fixed" => Some(Self::Fixed),
            "percentage" => Some(Self::Percentage),
            "daily" => Some(Self::Daily),
            "tiered" => Some(Self::Tiered),
            _ => None,
        }
    }
}

/// Amount members owe on a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionRule {
    pub id: RuleId,
    pub stokvel_id: StokvelId,
    pub name: String,
    pub contribution_type: ContributionType,
    pub amount: Decimal,
    pub frequency: ContributionFrequency,
    pub effective_from: NaiveDate,
    pub effective_until: Option<NaiveDate>,
    pub is_active: bool,
    pub is_mandatory: bool,
    pub description: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl ContributionRule {
    /// Creates an active, mandatory, monthly rule.
    pub fn new(
        stokvel_id: StokvelId,
        name: impl Into<String>,
        contribution_type: ContributionType,
        amount: Decimal,
        effective_from: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            stokvel_id,
            name: name.into(),
            contribution_type,
            amount,
            frequency: ContributionFrequency::Monthly,
            effective_from,
            effective_until: None,
            is_active: true,
            is_mandatory: true,
            description: String::new(),
            created_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("name", &self.name)?;
        if self.amount <= Decimal::ZERO {
            return Err(ModelValidationError::NonPositiveAmount {
                field: "amount",
                amount: self.amount,
            });
        }
        check_money("amount", self.amount)?;
        validate_effective_range(self.effective_from, self.effective_until)
    }

    pub fn is_active_for_date(&self, date: NaiveDate) -> bool {
        applies_on(self.is_active, self.effective_from, self.effective_until, date)
    }
}

/// Sanction applied to a member payment or conduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyRule {
    pub id: RuleId,
    pub stokvel_id: StokvelId,
    pub name: String,
    pub penalty_type: PenaltyType,
    pub calculation_method: CalculationMethod,
    /// Fixed amount, daily amount, or percentage depending on the method.
    pub amount: Decimal,
    pub grace_period_days: u32,
    pub maximum_amount: Option<Decimal>,
    pub effective_from: NaiveDate,
    pub effective_until: Option<NaiveDate>,
    pub is_active: bool,
    pub description: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl PenaltyRule {
    /// Creates an active fixed-amount rule without grace period or cap.
    pub fn new(
        stokvel_id: StokvelId,
        name: impl Into<String>,
        penalty_type: PenaltyType,
        amount: Decimal,
        effective_from: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            stokvel_id,
            name: name.into(),
            penalty_type,
            calculation_method: CalculationMethod::Fixed,
            amount,
            grace_period_days: 0,
            maximum_amount: None,
            effective_from,
            effective_until: None,
            is_active: true,
            description: String::new(),
            created_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        require_text("name", &self.name)?;
        if self.amount < Decimal::ZERO {
            return Err(ModelValidationError::NegativeAmount {
                field: "amount",
                amount: self.amount,
            });
        }
        check_money("amount", self.amount)?;
        if self.calculation_method == CalculationMethod::Percentage
            && self.amount > Decimal::ONE_HUNDRED
        {
            return Err(ModelValidationError::PercentageOutOfRange(self.amount));
        }
        if let Some(maximum) = self.maximum_amount {
            if maximum < Decimal::ZERO {
                return Err(ModelValidationError::NegativeAmount {
                    field: "maximum_amount",
                    amount: maximum,
                });
            }
            check_money("maximum_amount", maximum)?;
        }
        validate_effective_range(self.effective_from, self.effective_until)
    }

    pub fn is_active_for_date(&self, date: NaiveDate) -> bool {
        applies_on(self.is_active, self.effective_from, self.effective_until, date)
    }

    /// Computes the penalty owed for `base_amount` paid `days_late` days late.
    ///
    /// Returns zero while `days_late` is within the grace period. The result
    /// is capped at `maximum_amount` when one is configured.
    ///
    /// Fails with `AmountOverflow` instead of panicking when the product
    /// does not fit a `Decimal`.
    pub fn calculate_penalty(
        &self,
        base_amount: Decimal,
        days_late: u32,
    ) -> Result<Decimal, ModelValidationError> {
        if days_late <= self.grace_period_days {
            return Ok(Decimal::ZERO);
        }

        let penalty = match self.calculation_method {
            CalculationMethod::Fixed | CalculationMethod::Tiered => Some(self.amount),
            CalculationMethod::Percentage => base_amount
                .checked_mul(self.amount)
                .and_then(|product| product.checked_div(Decimal::ONE_HUNDRED)),
            CalculationMethod::Daily => self
                .amount
                .checked_mul(Decimal::from(days_late - self.grace_period_days)),
        }
        .ok_or(ModelValidationError::AmountOverflow("penalty"))?;

        Ok(match self.maximum_amount {
            Some(maximum) if penalty > maximum => maximum,
            _ => penalty,
        })
    }
}

/// Typed rule category shown next to a rule in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "type", rename_all = "snake_case")]
pub enum RuleCategory {
    Contribution(ContributionType),
    Penalty(PenaltyType),
}

impl RuleCategory {
    pub fn kind(self) -> RuleKind {
        match self {
            Self::Contribution(_) => RuleKind::Contribution,
            Self::Penalty(_) => RuleKind::Penalty,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Contribution(value) => value.as_db_str(),
            Self::Penalty(value) => value.as_db_str(),
        }
    }
}

/// Read model for "recent rules" listings of either kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: RuleId,
    pub stokvel_id: StokvelId,
    pub name: String,
    pub category: RuleCategory,
    pub amount: Decimal,
    pub is_active: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl From<&ContributionRule> for RuleRecord {
    fn from(rule: &ContributionRule) -> Self {
        Self {
            id: rule.id,
            stokvel_id: rule.stokvel_id,
            name: rule.name.clone(),
            category: RuleCategory::Contribution(rule.contribution_type),
            amount: rule.amount,
            is_active: rule.is_active,
            created_at: rule.created_at,
        }
    }
}

impl From<&PenaltyRule> for RuleRecord {
    fn from(rule: &PenaltyRule) -> Self {
        Self {
            id: rule.id,
            stokvel_id: rule.stokvel_id,
            name: rule.name.clone(),
            category: RuleCategory::Penalty(rule.penalty_type),
            amount: rule.amount,
            is_active: rule.is_active,
            created_at: rule.created_at,
        }
    }
}

fn applies_on(
    is_active: bool,
    effective_from: NaiveDate,
    effective_until: Option<NaiveDate>,
    date: NaiveDate,
) -> bool {
    if !is_active || effective_from > date {
        return false;
    }
    effective_until.map_or(true, |until| until >= date)
}

fn validate_effective_range(
    effective_from: NaiveDate,
    effective_until: Option<NaiveDate>,
) -> Result<(), ModelValidationError> {
    match effective_until {
        Some(until) if until < effective_from => Err(ModelValidationError::InvalidDateRange {
            field: "effective_until",
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{CalculationMethod, ContributionRule, ContributionType, PenaltyRule, PenaltyType};
    use crate::model::validation::ModelValidationError;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
    }

    fn late_payment(method: CalculationMethod, amount: i64) -> PenaltyRule {
        let mut rule = PenaltyRule::new(
            Uuid::new_v4(),
            "Late payment",
            PenaltyType::LatePayment,
            Decimal::from(amount),
            date(2025, 1, 1),
        );
        rule.calculation_method = method;
        rule
    }

    #[test]
    fn penalty_is_zero_within_grace_period() {
        let mut rule = late_payment(CalculationMethod::Fixed, 50);
        rule.grace_period_days = 3;
        assert_eq!(rule.calculate_penalty(Decimal::from(500), 3), Ok(Decimal::ZERO));
        assert_eq!(rule.calculate_penalty(Decimal::from(500), 4), Ok(Decimal::from(50)));
    }

    #[test]
    fn percentage_penalty_uses_base_amount() {
        let rule = late_payment(CalculationMethod::Percentage, 10);
        assert_eq!(rule.calculate_penalty(Decimal::from(500), 1), Ok(Decimal::from(50)));
    }

    #[test]
    fn daily_penalty_accumulates_after_grace_and_respects_cap() {
        let mut rule = late_payment(CalculationMethod::Daily, 20);
        rule.grace_period_days = 2;
        assert_eq!(rule.calculate_penalty(Decimal::ZERO, 5), Ok(Decimal::from(60)));

        rule.maximum_amount = Some(Decimal::from(45));
        assert_eq!(rule.calculate_penalty(Decimal::ZERO, 5), Ok(Decimal::from(45)));
    }

    #[test]
    fn oversized_daily_penalty_is_rejected_and_does_not_overflow() {
        let mut rule = late_payment(CalculationMethod::Daily, 0);
        rule.amount = Decimal::MAX;
        assert!(matches!(
            rule.validate(),
            Err(ModelValidationError::AmountOutOfRange { field: "amount", .. })
        ));
        assert_eq!(
            rule.calculate_penalty(Decimal::from(100), 3),
            Err(ModelValidationError::AmountOverflow("penalty"))
        );
    }

    #[test]
    fn penalty_amounts_allow_two_decimal_places() {
        let mut rule = late_payment(CalculationMethod::Fixed, 0);
        rule.amount = Decimal::new(1, 3);
        assert!(matches!(
            rule.validate(),
            Err(ModelValidationError::TooManyDecimalPlaces { field: "amount", .. })
        ));

        rule.amount = Decimal::new(1_050, 2);
        rule.maximum_amount = Some(Decimal::from(100_000_000));
        assert!(matches!(
            rule.validate(),
            Err(ModelValidationError::AmountOutOfRange {
                field: "maximum_amount",
                ..
            })
        ));

        rule.maximum_amount = Some(Decimal::new(25_000, 2));
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn percentage_above_hundred_is_rejected() {
        let rule = late_payment(CalculationMethod::Percentage, 150);
        assert_eq!(
            rule.validate(),
            Err(ModelValidationError::PercentageOutOfRange(Decimal::from(150)))
        );
    }

    #[test]
    fn contribution_amount_must_be_positive() {
        let rule = ContributionRule::new(
            Uuid::new_v4(),
            "Monthly",
            ContributionType::Regular,
            Decimal::ZERO,
            date(2025, 1, 1),
        );
        assert!(matches!(
            rule.validate(),
            Err(ModelValidationError::NonPositiveAmount { field: "amount", .. })
        ));
    }

    #[test]
    fn contribution_amount_is_bounded() {
        let mut rule = ContributionRule::new(
            Uuid::new_v4(),
            "Monthly",
            ContributionType::Regular,
            Decimal::MAX,
            date(2025, 1, 1),
        );
        assert!(matches!(
            rule.validate(),
            Err(ModelValidationError::AmountOutOfRange { field: "amount", .. })
        ));

        rule.amount = Decimal::new(1, 3);
        assert!(matches!(
            rule.validate(),
            Err(ModelValidationError::TooManyDecimalPlaces { field: "amount", .. })
        ));
    }

    #[test]
    fn rule_applies_only_inside_effective_window() {
        let mut rule = ContributionRule::new(
            Uuid::new_v4(),
            "Monthly",
            ContributionType::Regular,
            Decimal::from(500),
            date(2025, 3, 1),
        );
        rule.effective_until = Some(date(2025, 6, 30));

        assert!(!rule.is_active_for_date(date(2025, 2, 28)));
        assert!(rule.is_active_for_date(date(2025, 3, 1)));
        assert!(rule.is_active_for_date(date(2025, 6, 30)));
        assert!(!rule.is_active_for_date(date(2025, 7, 1)));

        rule.is_active = false;
        assert!(!rule.is_active_for_date(date(2025, 4, 1)));
    }
}
