//! Write-side validation errors shared by all model records.

use rust_decimal::Decimal;
use std::error::Error;
use std::fmt::{Display, Formatter};

const MONEY_LIMIT: i64 = 100_000_000;
const MONEY_SCALE: u32 = 2;

/// Reasons a record is rejected before it reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// A required text field is empty after trimming.
    EmptyField(&'static str),
    /// Amount must be strictly greater than zero.
    NonPositiveAmount { field: &'static str, amount: Decimal },
    /// Amount must not be negative.
    NegativeAmount { field: &'static str, amount: Decimal },
    /// Amount does not fit 8 integer digits.
    AmountOutOfRange { field: &'static str, amount: Decimal },
    /// Amount carries more than 2 decimal places.
    TooManyDecimalPlaces { field: &'static str, amount: Decimal },
    /// Derived amount does not fit a `Decimal`.
    AmountOverflow(&'static str),
    /// Percentage-based penalty above 100%.
    PercentageOutOfRange(Decimal),
    /// Day-of-month outside `1..=31`.
    DayOutOfRange { field: &'static str, value: u8 },
    /// Attendance percentage outside `0..=100`.
    AttendanceOutOfRange(u8),
    /// `maximum_members` lower than `minimum_members`.
    MemberBoundsInverted { minimum: u32, maximum: u32 },
    /// End date is not after the start date.
    InvalidDateRange { field: &'static str },
    /// Account number is not 8-12 digits.
    InvalidAccountNumber(String),
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "{field} cannot be empty"),
            Self::NonPositiveAmount { field, amount } => {
                write!(f, "{field} must be greater than 0, got {amount}")
            }
            Self::NegativeAmount { field, amount } => {
                write!(f, "{field} cannot be negative, got {amount}")
            }
            Self::AmountOutOfRange { field, amount } => {
                write!(f, "{field} must be below 100000000, got {amount}")
            }
            Self::TooManyDecimalPlaces { field, amount } => {
                write!(f, "{field} allows at most 2 decimal places, got {amount}")
            }
            Self::AmountOverflow(field) => write!(f, "{field} overflowed"),
            Self::PercentageOutOfRange(amount) => {
                write!(f, "percentage penalty cannot exceed 100%, got {amount}")
            }
            Self::DayOutOfRange { field, value } => {
                write!(f, "{field} must be between 1 and 31, got {value}")
            }
            Self::AttendanceOutOfRange(value) => {
                write!(f, "attendance percentage must be between 0 and 100, got {value}")
            }
            Self::MemberBoundsInverted { minimum, maximum } => write!(
                f,
                "maximum_members ({maximum}) cannot be lower than minimum_members ({minimum})"
            ),
            Self::InvalidDateRange { field } => {
                write!(f, "{field} must be after the start date")
            }
            Self::InvalidAccountNumber(value) => {
                write!(f, "invalid bank account number `{value}`")
            }
        }
    }
}

impl Error for ModelValidationError {}

/// Currency amounts are stored with up to 8 integer digits and 2 decimals.
pub(crate) fn check_money(field: &'static str, amount: Decimal) -> Result<(), ModelValidationError> {
    if amount.abs() >= Decimal::from(MONEY_LIMIT) {
        return Err(ModelValidationError::AmountOutOfRange { field, amount });
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(ModelValidationError::TooManyDecimalPlaces { field, amount });
    }
    Ok(())
}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ModelValidationError> {
    if value.trim().is_empty() {
        return Err(ModelValidationError::EmptyField(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{check_money, ModelValidationError};
    use rust_decimal::Decimal;

    #[test]
    fn money_is_bounded_to_eight_digits_and_two_decimals() {
        assert!(check_money("amount", Decimal::new(9_999_999_999, 2)).is_ok());
        assert!(check_money("amount", Decimal::new(1_500, 3)).is_ok());
        assert_eq!(
            check_money("amount", Decimal::from(100_000_000)),
            Err(ModelValidationError::AmountOutOfRange {
                field: "amount",
                amount: Decimal::from(100_000_000)
            })
        );
        assert!(matches!(
            check_money("amount", Decimal::MAX),
            Err(ModelValidationError::AmountOutOfRange { .. })
        ));
        assert!(matches!(
            check_money("amount", Decimal::new(1, 3)),
            Err(ModelValidationError::TooManyDecimalPlaces { .. })
        ));
    }
}
