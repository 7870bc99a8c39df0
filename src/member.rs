use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{AccountId, LoanId, MemberId, MemberStatus};

/// a cooperative member with their two ledger accounts
///
/// `total_savings` and `total_loan_outstanding` are cached read-optimizations;
/// the ledger postings on the member's accounts are the source of truth and the
/// cached values are recomputed after every posting that touches them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub email: Option<String>,
    pub status: MemberStatus,
    pub loan_eligible: bool,
    pub registration_fee_paid: bool,
    /// loan-receivable account (debit-normal)
    pub loan_account: AccountId,
    /// savings-liability account (credit-normal)
    pub savings_account: AccountId,
    pub active_loan: Option<LoanId>,
    pub total_savings: Money,
    pub total_loan_outstanding: Money,
    pub joined: NaiveDate,
}

impl Member {
    pub fn new(
        name: impl Into<String>,
        loan_account: AccountId,
        savings_account: AccountId,
        joined: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: None,
            status: MemberStatus::Probation,
            loan_eligible: false,
            registration_fee_paid: false,
            loan_account,
            savings_account,
            active_loan: None,
            total_savings: Money::ZERO,
            total_loan_outstanding: Money::ZERO,
            joined,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn has_active_loan(&self) -> bool {
        self.active_loan.is_some()
    }
}

/// cached-versus-derived balance pair produced by a reconciliation check
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub cached: Money,
    pub derived: Money,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.cached == self.derived
    }
}
