use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{Result, SaccoError};
use crate::types::{InterestMethod, InterestPeriod, ProductId};

/// terms of a loan product offered by the cooperative
///
/// Loans copy the rate, period and method at creation time, so later product
/// updates never retroactively alter existing loans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanProduct {
    pub id: ProductId,
    pub name: String,
    pub interest_rate: Rate,
    pub interest_period: InterestPeriod,
    pub interest_method: InterestMethod,
    /// months; also the default term when the application omits one
    pub max_repayment_period: u32,
    /// unset bound = unbounded
    pub min_loan_amount: Option<Money>,
    pub max_loan_amount: Option<Money>,
    pub requires_guarantor: bool,
    pub min_guarantors: u32,
}

impl LoanProduct {
    pub fn new(
        name: impl Into<String>,
        interest_rate: Rate,
        interest_period: InterestPeriod,
        interest_method: InterestMethod,
        max_repayment_period: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            interest_rate,
            interest_period,
            interest_method,
            max_repayment_period,
            min_loan_amount: None,
            max_loan_amount: None,
            requires_guarantor: false,
            min_guarantors: 0,
        }
    }

    pub fn with_amount_bounds(mut self, min: Option<Money>, max: Option<Money>) -> Self {
        self.min_loan_amount = min;
        self.max_loan_amount = max;
        self
    }

    pub fn with_guarantors(mut self, min_guarantors: u32) -> Self {
        self.requires_guarantor = true;
        self.min_guarantors = min_guarantors;
        self
    }

    /// check a requested amount against the product bounds
    pub fn validate_amount(&self, amount: Money) -> Result<()> {
        if !amount.is_positive() {
            return Err(SaccoError::validation("loan amount must be positive"));
        }
        if let Some(min) = self.min_loan_amount {
            if amount < min {
                return Err(SaccoError::validation(format!(
                    "loan amount {} is below the minimum {} for '{}'",
                    amount, min, self.name
                )));
            }
        }
        if let Some(max) = self.max_loan_amount {
            if amount > max {
                return Err(SaccoError::validation(format!(
                    "loan amount {} exceeds the maximum {} for '{}'",
                    amount, max, self.name
                )));
            }
        }
        Ok(())
    }

    /// resolve the requested term, falling back to the product maximum
    pub fn resolve_term(&self, requested: Option<u32>) -> Result<u32> {
        match requested {
            None => Ok(self.max_repayment_period),
            Some(months) if months == 0 => Err(SaccoError::InvalidTerm { months: 0 }),
            Some(months) if months > self.max_repayment_period => {
                Err(SaccoError::validation(format!(
                    "repayment period {} months exceeds the product maximum of {}",
                    months, self.max_repayment_period
                )))
            }
            Some(months) => Ok(months),
        }
    }
}
