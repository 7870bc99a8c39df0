//! Core accounting engine for a savings and credit cooperative (SACCO).
//!
//! Double-entry ledger postings, member savings, loan products with
//! flat-rate or reducing-balance amortization, a guarded loan state
//! machine, proportional repayment waterfall, welfare fund flows and
//! defaulter tracking. Storage, ledger, account resolution and member
//! notification sit behind traits so the engine embeds anywhere.

pub mod accounts;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod loan;
pub mod member;
pub mod notify;
pub mod product;
pub mod repayment;
pub mod repository;
pub mod savings;
pub mod schedule;
pub mod shares;
pub mod types;
pub mod welfare;

// re-export key types
pub use accounts::{AccountResolver, ChartOfAccounts};
pub use config::SaccoConfig;
pub use decimal::{Money, Rate};
pub use engine::{MemberReconciliation, SaccoEngine};
pub use errors::{Result, SaccoError};
pub use events::{Event, EventStore};
pub use ledger::{Account, AccountKind, Ledger, MemoryLedger, PostingLine, Voucher};
pub use loan::{validate_eligibility, Loan};
pub use member::{Member, Reconciliation};
pub use notify::{LoggingSink, NotificationSink};
pub use product::LoanProduct;
pub use repayment::{RepaymentOutcome, RepaymentWaterfall};
pub use repository::{MemoryRepository, Repository};
pub use savings::SavingsLedger;
pub use schedule::{
    demanded_as_of, AmortizationCalculator, AmortizationResult, AmortizationTerms,
    DemandedTotals, ScheduleEntry,
};
pub use shares::{ShareLedger, ShareTransaction};
pub use types::{
    AccountId, DefaulterRecord, DefaulterStatus, Guarantor, InterestMethod, InterestPeriod,
    LoanId, LoanRepayment, LoanStatus, MemberId, MemberStatus, PaymentMode, ProductId,
    RepaymentSplit, SavingsEntryType, SavingsTransaction, SystemAccount, VoucherId,
    WelfareEntryType,
};
pub use welfare::{WelfareLedger, WelfareTransaction};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
