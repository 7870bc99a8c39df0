use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a member
pub type MemberId = Uuid;
/// unique identifier for a loan
pub type LoanId = Uuid;
/// unique identifier for a loan product
pub type ProductId = Uuid;
/// unique identifier for a ledger account
pub type AccountId = Uuid;
/// unique identifier for a posted voucher
pub type VoucherId = Uuid;

/// member lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    /// newly registered, savings history too short for loans
    Probation,
    /// registration invoice issued but unpaid
    PendingPayment,
    /// member in good standing
    Active,
    Suspended,
    Inactive,
}

/// loan lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    Draft,
    PendingApproval,
    Approved,
    /// disbursed and being repaid
    Active,
    /// fully repaid
    Completed,
    Defaulted,
}

/// period the interest rate is quoted over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterestPeriod {
    Monthly,
    Annually,
}

/// interest computation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterestMethod {
    /// interest computed once on the original principal, spread evenly
    FlatRate,
    /// interest computed each period on the remaining principal (EMI-style)
    ReducingBalance,
}

/// how a payment reaches the cooperative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMode {
    Cash,
    /// paid out of the member's own savings balance
    Savings,
    Bank,
    Mobile,
}

/// direction of a savings transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SavingsEntryType {
    Deposit,
    Withdrawal,
}

/// direction of a welfare fund transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WelfareEntryType {
    Contribution,
    Payout,
}

/// system-owned ledger accounts resolved by transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemAccount {
    Cash,
    InterestIncome,
    RegistrationIncome,
    ShareCapital,
    WelfareFund,
}

/// split of a single repayment across interest and principal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct RepaymentSplit {
    pub interest: Money,
    pub principal: Money,
}

impl RepaymentSplit {
    pub fn total(&self) -> Money {
        self.interest + self.principal
    }
}

/// member pledging a guarantee amount against another member's loan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Guarantor {
    pub member: MemberId,
    pub guarantee_amount: Money,
}

/// defaulter record status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaulterStatus {
    New,
    InRecovery,
    Resolved,
}

/// snapshot taken when a loan transitions to Defaulted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaulterRecord {
    pub id: Uuid,
    pub member: MemberId,
    pub loan: LoanId,
    pub overdue_amount: Money,
    pub days_overdue: u32,
    pub status: DefaulterStatus,
    pub recorded_at: DateTime<Utc>,
}

/// immutable record of one posted loan repayment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRepayment {
    pub id: Uuid,
    pub loan: LoanId,
    pub member: MemberId,
    pub amount: Money,
    pub mode: PaymentMode,
    pub date: NaiveDate,
    pub split: RepaymentSplit,
    pub voucher: VoucherId,
}

/// immutable record of one posted savings transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsTransaction {
    pub id: Uuid,
    pub member: MemberId,
    pub entry_type: SavingsEntryType,
    pub amount: Money,
    pub mode: PaymentMode,
    pub date: NaiveDate,
    pub voucher: VoucherId,
}

impl SavingsTransaction {
    /// signed contribution to the member's savings total
    pub fn signed_amount(&self) -> Money {
        match self.entry_type {
            SavingsEntryType::Deposit => self.amount,
            SavingsEntryType::Withdrawal => Money::ZERO - self.amount,
        }
    }
}
