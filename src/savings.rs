use chrono::NaiveDate;

use crate::decimal::Money;
use crate::errors::{Result, SaccoError};
use crate::ledger::{Account, Voucher};
use crate::types::{MemberId, SavingsTransaction};

/// builds savings postings and derives savings totals
///
/// The member's savings total is always recomputed as the signed sum over the
/// posted transactions, never kept as an incrementally mutated counter.
pub struct SavingsLedger;

impl SavingsLedger {
    /// Dr cash / Cr member savings
    pub fn deposit_voucher(
        cash: &Account,
        member_savings: &Account,
        member: MemberId,
        amount: Money,
        date: NaiveDate,
    ) -> Voucher {
        Voucher::new(date, format!("savings deposit for {}", member))
            .debit(cash.id, amount)
            .credit_party(member_savings.id, amount, member)
    }

    /// Dr member savings / Cr cash
    pub fn withdrawal_voucher(
        cash: &Account,
        member_savings: &Account,
        member: MemberId,
        amount: Money,
        date: NaiveDate,
    ) -> Voucher {
        Voucher::new(date, format!("savings withdrawal for {}", member))
            .debit_party(member_savings.id, amount, member)
            .credit(cash.id, amount)
    }

    /// a withdrawal may never push the balance below zero
    pub fn validate_withdrawal(current_total: Money, amount: Money) -> Result<()> {
        if !amount.is_positive() {
            return Err(SaccoError::validation("withdrawal amount must be positive"));
        }
        if amount > current_total {
            return Err(SaccoError::InsufficientFunds {
                available: current_total,
                requested: amount,
            });
        }
        Ok(())
    }

    /// signed sum over all posted savings transactions for a member
    pub fn recompute_total(transactions: &[SavingsTransaction]) -> Money {
        transactions.iter().map(|t| t.signed_amount()).sum()
    }
}
