use crate::decimal::Money;
use crate::errors::{Result, SaccoError};
use crate::loan::Loan;
use crate::types::{LoanStatus, RepaymentSplit};

/// outcome of applying one payment to a loan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepaymentOutcome {
    pub split: RepaymentSplit,
    pub outstanding_after: Money,
    pub completed: bool,
}

/// applies payments across accrued interest and principal
///
/// The split is proportional to the loan's total interest and principal
/// shares of the total repayable, with the interest portion capped at the
/// interest still due.
pub struct RepaymentWaterfall;

impl RepaymentWaterfall {
    /// compute the interest/principal split without mutating the loan
    pub fn split(loan: &Loan, payment: Money) -> RepaymentSplit {
        let total_repayable = loan.total_repayable.as_decimal();
        if total_repayable.is_zero() {
            return RepaymentSplit {
                interest: Money::ZERO,
                principal: payment,
            };
        }

        let interest_ratio = loan.total_interest.as_decimal() / total_repayable;
        let mut interest = payment * interest_ratio;

        let remaining_interest_due = (loan.total_interest - loan.interest_paid).max(Money::ZERO);
        if interest > remaining_interest_due {
            interest = remaining_interest_due;
        }

        // principal takes the rest so the two portions always sum to the payment
        RepaymentSplit {
            interest,
            principal: payment - interest,
        }
    }

    /// apply a payment: update running totals and transition to Completed on payoff
    pub fn apply(loan: &mut Loan, payment: Money) -> Result<RepaymentOutcome> {
        if loan.is_closed() {
            return Err(SaccoError::LoanAlreadyClosed);
        }
        if !payment.is_positive() {
            return Err(SaccoError::validation("payment amount must be positive"));
        }

        let split = Self::split(loan, payment);

        loan.interest_paid += split.interest;
        loan.principal_paid += split.principal;
        loan.outstanding_balance -= payment;

        let completed = if loan.outstanding_balance <= Money::ZERO {
            loan.outstanding_balance = Money::ZERO;
            if loan.status == LoanStatus::Active {
                loan.complete()?;
                true
            } else {
                false
            }
        } else {
            false
        };

        Ok(RepaymentOutcome {
            split,
            outstanding_after: loan.outstanding_balance,
            completed,
        })
    }
}
