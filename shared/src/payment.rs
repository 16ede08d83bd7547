use std::fmt;

use crate::league::PaidStatus;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaymentAmountError {
    NotFinite,
    NotPositive(f64),
}

impl fmt::Display for PaymentAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFinite => f.write_str("payment amount must be a finite number"),
            Self::NotPositive(amount) => {
                write!(f, "payment amount must be greater than zero, got {amount}")
            }
        }
    }
}

impl std::error::Error for PaymentAmountError {}

/// Classify a recorded amount against the expected weekly dues.
pub fn validate_payment_amount(
    amount: f64,
    expected: f64,
) -> Result<PaidStatus, PaymentAmountError> {
    if !amount.is_finite() {
        return Err(PaymentAmountError::NotFinite);
    }
    if amount <= 0.0 {
        return Err(PaymentAmountError::NotPositive(amount));
    }
    // Cent-level tolerance for amounts typed into the UI.
    if amount + 0.005 >= expected {
        Ok(PaidStatus::Paid)
    } else {
        Ok(PaidStatus::Partial)
    }
}
