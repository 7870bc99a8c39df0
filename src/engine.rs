use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use uuid::Uuid;

use crate::accounts::AccountResolver;
use crate::config::SaccoConfig;
use crate::decimal::Money;
use crate::errors::{Result, SaccoError};
use crate::events::{Event, EventStore};
use crate::ledger::{Ledger, Voucher};
use crate::loan::{validate_eligibility, Loan};
use crate::member::{Member, Reconciliation};
use crate::notify::{notify_best_effort, NotificationSink};
use crate::repayment::{RepaymentOutcome, RepaymentWaterfall};
use crate::repository::Repository;
use crate::savings::SavingsLedger;
use crate::shares::{ShareLedger, ShareTransaction};
use crate::schedule::{
    demanded_as_of, AmortizationCalculator, AmortizationTerms, DemandedTotals,
};
use crate::types::{
    DefaulterRecord, DefaulterStatus, Guarantor, LoanId, LoanRepayment, LoanStatus, MemberId,
    MemberStatus, PaymentMode, SavingsEntryType, SavingsTransaction, SystemAccount, VoucherId,
    WelfareEntryType,
};
use crate::welfare::{WelfareLedger, WelfareTransaction};

/// cached-vs-derived balances for both of a member's accounts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemberReconciliation {
    pub savings: Reconciliation,
    pub loan_outstanding: Reconciliation,
}

impl MemberReconciliation {
    pub fn is_consistent(&self) -> bool {
        self.savings.is_consistent() && self.loan_outstanding.is_consistent()
    }
}

/// the operation surface of the cooperative
///
/// Owns the repository, ledger, account resolver, notification sink and the
/// injected clock. Every operation validates fully before mutating anything,
/// so a returned error means no entity and no posting changed. Operations
/// take `&mut self`; callers embedding the engine across threads serialize
/// access themselves.
pub struct SaccoEngine {
    repo: Box<dyn Repository>,
    ledger: Box<dyn Ledger>,
    accounts: Box<dyn AccountResolver>,
    sink: Box<dyn NotificationSink>,
    config: SaccoConfig,
    time: SafeTimeProvider,
    events: EventStore,
}

impl SaccoEngine {
    pub fn new(
        repo: Box<dyn Repository>,
        ledger: Box<dyn Ledger>,
        accounts: Box<dyn AccountResolver>,
        sink: Box<dyn NotificationSink>,
        config: SaccoConfig,
        time: SafeTimeProvider,
    ) -> Self {
        Self {
            repo,
            ledger,
            accounts,
            sink,
            config,
            time,
            events: EventStore::new(),
        }
    }

    fn today(&self) -> NaiveDate {
        self.time.now().date_naive()
    }

    /// recompute the member's cached totals from the posted record
    fn refresh_member_caches(&mut self, member: &mut Member) -> Result<()> {
        let transactions = self.repo.savings_for_member(member.id);
        member.total_savings = SavingsLedger::recompute_total(&transactions);

        let loan_account = self.accounts.loan_account_for(member)?;
        member.total_loan_outstanding = self.ledger.balance(&loan_account, None);
        Ok(())
    }

    // ---- membership ------------------------------------------------------

    /// record the registration fee and lift the member out of probation
    ///
    /// The fee posting is skipped when the config waives it; either way the
    /// member ends up Active with the fee marked as settled.
    pub fn confirm_registration(&mut self, member_id: MemberId) -> Result<Option<VoucherId>> {
        let mut member = self.repo.load_member(member_id)?;
        if member.registration_fee_paid {
            return Err(SaccoError::validation(format!(
                "registration fee already settled for {}",
                member.name
            )));
        }

        let today = self.today();
        let fee = self.config.registration_fee;
        let fee_voucher = if self.config.charge_registration_fee_on_onboarding && fee.is_positive()
        {
            let cash = self.accounts.system_account(SystemAccount::Cash);
            let income = self.accounts.system_account(SystemAccount::RegistrationIncome);
            let voucher = Voucher::new(today, format!("registration fee from {}", member.name))
                .debit(cash.id, fee)
                .credit(income.id, fee);
            Some(self.ledger.post(voucher)?)
        } else {
            None
        };

        member.registration_fee_paid = true;
        if matches!(
            member.status,
            MemberStatus::Probation | MemberStatus::PendingPayment
        ) {
            member.status = MemberStatus::Active;
        }

        tracing::info!(member = %member.id, fee = %fee, "member registration confirmed");
        notify_best_effort(
            self.sink.as_mut(),
            &member,
            "Welcome",
            "Your registration is complete. You can now save and, once your savings history qualifies, apply for loans.",
        );
        self.events.emit(Event::MemberActivated {
            member: member.id,
            fee_voucher,
            date: today,
        });
        self.repo.save_member(member);
        Ok(fee_voucher)
    }

    // ---- loan lifecycle -------------------------------------------------

    /// create a Draft loan after the full eligibility check
    pub fn apply_for_loan(
        &mut self,
        member_id: MemberId,
        product_id: Uuid,
        amount: Money,
        requested_term: Option<u32>,
        purpose: Option<String>,
        guarantors: Vec<Guarantor>,
    ) -> Result<LoanId> {
        let member = self.repo.load_member(member_id)?;
        let product = self.repo.load_product(product_id)?;

        validate_eligibility(&member, &product, &self.config, amount, &guarantors)?;
        let term = product.resolve_term(requested_term)?;

        let mut loan = Loan::new(member_id, &product, amount, term, self.today())
            .with_guarantors(guarantors);
        if let Some(purpose) = purpose {
            loan = loan.with_purpose(purpose);
        }

        let loan_id = loan.id;
        tracing::info!(loan = %loan_id, member = %member_id, amount = %amount, "loan application created");
        self.repo.save_loan(loan);
        self.events.emit(Event::LoanApplied {
            loan: loan_id,
            member: member_id,
            amount,
        });
        Ok(loan_id)
    }

    /// Draft -> PendingApproval
    pub fn submit_loan(&mut self, loan_id: LoanId) -> Result<()> {
        let mut loan = self.repo.load_loan(loan_id)?;
        loan.submit()?;
        self.repo.save_loan(loan);
        self.events.emit(Event::LoanSubmitted { loan: loan_id });
        Ok(())
    }

    /// PendingApproval -> Approved
    pub fn approve_loan(&mut self, loan_id: LoanId) -> Result<()> {
        let mut loan = self.repo.load_loan(loan_id)?;
        loan.approve()?;
        self.repo.save_loan(loan);
        self.events.emit(Event::LoanApproved { loan: loan_id });
        Ok(())
    }

    /// Approved -> Active: re-check eligibility, compute the amortization,
    /// post the disbursement and install the schedule
    ///
    /// The disbursed principal lands on the member's savings account, where
    /// it is immediately withdrawable.
    pub fn disburse_loan(&mut self, loan_id: LoanId) -> Result<VoucherId> {
        let mut loan = self.repo.load_loan(loan_id)?;
        if loan.status != LoanStatus::Approved {
            return Err(SaccoError::InvalidStateTransition {
                current: loan.status,
                required: LoanStatus::Approved,
            });
        }
        let mut member = self.repo.load_member(loan.member)?;
        let product = self.repo.load_product(loan.product)?;

        // conditions may have changed since application
        validate_eligibility(&member, &product, &self.config, loan.loan_amount, &loan.guarantors)?;

        let today = self.today();
        let amortization = AmortizationCalculator::compute(
            AmortizationTerms {
                principal: loan.loan_amount,
                rate: loan.interest_rate,
                period: loan.interest_period,
                method: loan.interest_method,
                term_months: loan.repayment_period,
            },
            today,
        )?;

        let loan_account = self.accounts.loan_account_for(&member)?;
        let savings_account = self.accounts.savings_account_for(&member)?;
        let voucher = Voucher::new(today, format!("disbursement of loan {}", loan.id))
            .debit_party(loan_account.id, loan.loan_amount, member.id)
            .credit_party(savings_account.id, loan.loan_amount, member.id);
        let voucher_id = self.ledger.post(voucher)?;

        loan.activate(amortization, today)?;
        member.active_loan = Some(loan.id);

        self.repo.save_savings(SavingsTransaction {
            id: Uuid::new_v4(),
            member: member.id,
            entry_type: SavingsEntryType::Deposit,
            amount: loan.loan_amount,
            mode: PaymentMode::Bank,
            date: today,
            voucher: voucher_id,
        });
        self.refresh_member_caches(&mut member)?;

        let total_repayable = loan.total_repayable;
        let amount = loan.loan_amount;
        tracing::info!(
            loan = %loan.id,
            member = %member.id,
            amount = %amount,
            total_repayable = %total_repayable,
            "loan disbursed"
        );
        notify_best_effort(
            self.sink.as_mut(),
            &member,
            "Loan disbursed",
            &format!(
                "Your loan of {} has been disbursed to your savings account. Total repayable: {}.",
                amount, total_repayable
            ),
        );

        self.events.emit(Event::LoanDisbursed {
            loan: loan.id,
            member: member.id,
            amount,
            total_repayable,
            voucher: voucher_id,
            date: today,
        });
        self.repo.save_loan(loan);
        self.repo.save_member(member);
        Ok(voucher_id)
    }

    /// apply a payment: waterfall split, ledger posting, completion check
    ///
    /// A payment above the outstanding balance is truncated to it, not
    /// escrowed: only the outstanding part is posted and applied, and a
    /// Savings-mode payment draws that truncated amount from the member's
    /// savings balance.
    pub fn record_repayment(
        &mut self,
        loan_id: LoanId,
        amount: Money,
        mode: PaymentMode,
    ) -> Result<RepaymentOutcome> {
        let mut loan = self.repo.load_loan(loan_id)?;
        match loan.status {
            LoanStatus::Active | LoanStatus::Defaulted => {}
            LoanStatus::Completed => return Err(SaccoError::LoanAlreadyClosed),
            other => {
                return Err(SaccoError::InvalidStateTransition {
                    current: other,
                    required: LoanStatus::Active,
                })
            }
        }
        if !amount.is_positive() {
            return Err(SaccoError::validation("payment amount must be positive"));
        }
        let mut member = self.repo.load_member(loan.member)?;

        // an overpayment settles the loan; only the outstanding part is posted
        let effective = amount.min(loan.outstanding_balance);
        if !effective.is_positive() {
            return Err(SaccoError::validation(
                "loan has no outstanding balance to repay",
            ));
        }

        if mode == PaymentMode::Savings {
            let transactions = self.repo.savings_for_member(member.id);
            let balance = SavingsLedger::recompute_total(&transactions);
            SavingsLedger::validate_withdrawal(balance, effective)?;
        }

        let today = self.today();
        let split = RepaymentWaterfall::split(&loan, effective);

        let loan_account = self.accounts.loan_account_for(&member)?;
        let savings_account = self.accounts.savings_account_for(&member)?;
        let cash = self.accounts.system_account(SystemAccount::Cash);
        let interest_income = self.accounts.system_account(SystemAccount::InterestIncome);

        let mut voucher = Voucher::new(today, format!("repayment on loan {}", loan.id));
        voucher = match mode {
            PaymentMode::Savings => voucher.debit_party(savings_account.id, effective, member.id),
            _ => voucher.debit(cash.id, effective),
        };
        if split.principal.is_positive() {
            voucher = voucher.credit_party(loan_account.id, split.principal, member.id);
        }
        if split.interest.is_positive() {
            voucher = voucher.credit(interest_income.id, split.interest);
        }
        let voucher_id = self.ledger.post(voucher)?;

        let outcome = RepaymentWaterfall::apply(&mut loan, effective)?;

        self.repo.save_repayment(LoanRepayment {
            id: Uuid::new_v4(),
            loan: loan.id,
            member: member.id,
            amount: effective,
            mode,
            date: today,
            split: outcome.split,
            voucher: voucher_id,
        });
        if mode == PaymentMode::Savings {
            self.repo.save_savings(SavingsTransaction {
                id: Uuid::new_v4(),
                member: member.id,
                entry_type: SavingsEntryType::Withdrawal,
                amount: effective,
                mode,
                date: today,
                voucher: voucher_id,
            });
        }

        if outcome.completed {
            member.active_loan = None;
        }
        self.refresh_member_caches(&mut member)?;

        self.events.emit(Event::RepaymentReceived {
            loan: loan.id,
            member: member.id,
            amount: effective,
            applied_to_interest: outcome.split.interest,
            applied_to_principal: outcome.split.principal,
            mode,
            voucher: voucher_id,
            date: today,
        });
        if outcome.completed {
            tracing::info!(loan = %loan.id, member = %member.id, "loan fully repaid");
            self.events.emit(Event::LoanCompleted {
                loan: loan.id,
                member: member.id,
                date: today,
            });
            notify_best_effort(
                self.sink.as_mut(),
                &member,
                "Loan fully repaid",
                "Congratulations, your loan has been fully repaid.",
            );
        } else {
            notify_best_effort(
                self.sink.as_mut(),
                &member,
                "Repayment received",
                &format!(
                    "Payment of {} received. Outstanding balance: {}.",
                    effective, outcome.outstanding_after
                ),
            );
        }

        self.repo.save_loan(loan);
        self.repo.save_member(member);
        Ok(outcome)
    }

    /// Active -> Defaulted: snapshot the arrears and notify the guarantors
    pub fn mark_defaulted(&mut self, loan_id: LoanId) -> Result<()> {
        let mut loan = self.repo.load_loan(loan_id)?;
        loan.mark_defaulted()?;
        let member = self.repo.load_member(loan.member)?;

        let today = self.today();
        // the full remaining repayable is overdue once the loan defaults
        let overdue_amount = loan.outstanding_balance;
        let days_overdue = days_overdue(&loan, today);

        self.repo.save_defaulter(DefaulterRecord {
            id: Uuid::new_v4(),
            member: member.id,
            loan: loan.id,
            overdue_amount,
            days_overdue,
            status: DefaulterStatus::New,
            recorded_at: self.time.now(),
        });

        tracing::warn!(
            loan = %loan.id,
            member = %member.id,
            overdue = %overdue_amount,
            days_overdue,
            "loan marked as defaulted"
        );
        notify_best_effort(
            self.sink.as_mut(),
            &member,
            "Loan in default",
            &format!(
                "Your loan is {} days overdue with {} in arrears. Please contact the office.",
                days_overdue, overdue_amount
            ),
        );
        for guarantor in &loan.guarantors {
            if let Ok(guarantor_member) = self.repo.load_member(guarantor.member) {
                notify_best_effort(
                    self.sink.as_mut(),
                    &guarantor_member,
                    "Guaranteed loan in default",
                    &format!(
                        "A loan you guaranteed for {} is in default. Your pledged amount is {}.",
                        member.name, guarantor.guarantee_amount
                    ),
                );
            }
        }

        self.events.emit(Event::LoanDefaulted {
            loan: loan.id,
            member: member.id,
            overdue_amount,
            days_overdue,
            date: today,
        });
        self.repo.save_loan(loan);
        Ok(())
    }

    // ---- savings and welfare --------------------------------------------

    /// Dr cash / Cr member savings, then refresh the cached total
    pub fn record_deposit(
        &mut self,
        member_id: MemberId,
        amount: Money,
        mode: PaymentMode,
    ) -> Result<VoucherId> {
        if !amount.is_positive() {
            return Err(SaccoError::validation("deposit amount must be positive"));
        }
        let mut member = self.repo.load_member(member_id)?;

        let cash = self.accounts.system_account(SystemAccount::Cash);
        let savings_account = self.accounts.savings_account_for(&member)?;
        let today = self.today();
        let voucher =
            SavingsLedger::deposit_voucher(&cash, &savings_account, member.id, amount, today);
        let voucher_id = self.ledger.post(voucher)?;

        self.repo.save_savings(SavingsTransaction {
            id: Uuid::new_v4(),
            member: member.id,
            entry_type: SavingsEntryType::Deposit,
            amount,
            mode,
            date: today,
            voucher: voucher_id,
        });
        self.refresh_member_caches(&mut member)?;

        let new_total = member.total_savings;
        notify_best_effort(
            self.sink.as_mut(),
            &member,
            "Deposit received",
            &format!("Deposit of {} received. Savings balance: {}.", amount, new_total),
        );
        self.events.emit(Event::SavingsPosted {
            member: member.id,
            entry_type: SavingsEntryType::Deposit,
            amount,
            new_total,
            voucher: voucher_id,
            date: today,
        });
        self.repo.save_member(member);
        Ok(voucher_id)
    }

    /// Dr member savings / Cr cash; rejects overdrafts
    pub fn record_withdrawal(
        &mut self,
        member_id: MemberId,
        amount: Money,
        mode: PaymentMode,
    ) -> Result<VoucherId> {
        let mut member = self.repo.load_member(member_id)?;

        let transactions = self.repo.savings_for_member(member.id);
        let balance = SavingsLedger::recompute_total(&transactions);
        SavingsLedger::validate_withdrawal(balance, amount)?;

        let cash = self.accounts.system_account(SystemAccount::Cash);
        let savings_account = self.accounts.savings_account_for(&member)?;
        let today = self.today();
        let voucher =
            SavingsLedger::withdrawal_voucher(&cash, &savings_account, member.id, amount, today);
        let voucher_id = self.ledger.post(voucher)?;

        self.repo.save_savings(SavingsTransaction {
            id: Uuid::new_v4(),
            member: member.id,
            entry_type: SavingsEntryType::Withdrawal,
            amount,
            mode,
            date: today,
            voucher: voucher_id,
        });
        self.refresh_member_caches(&mut member)?;

        let new_total = member.total_savings;
        notify_best_effort(
            self.sink.as_mut(),
            &member,
            "Withdrawal recorded",
            &format!("Withdrawal of {} recorded. Savings balance: {}.", amount, new_total),
        );
        self.events.emit(Event::SavingsPosted {
            member: member.id,
            entry_type: SavingsEntryType::Withdrawal,
            amount,
            new_total,
            voucher: voucher_id,
            date: today,
        });
        self.repo.save_member(member);
        Ok(voucher_id)
    }

    /// welfare fund contribution or payout
    pub fn record_welfare(
        &mut self,
        member_id: MemberId,
        entry_type: WelfareEntryType,
        amount: Money,
    ) -> Result<VoucherId> {
        if !amount.is_positive() {
            return Err(SaccoError::validation("welfare amount must be positive"));
        }
        let member = self.repo.load_member(member_id)?;

        let cash = self.accounts.system_account(SystemAccount::Cash);
        let fund = self.accounts.system_account(SystemAccount::WelfareFund);
        if entry_type == WelfareEntryType::Payout {
            let available = self.ledger.balance(&fund, None);
            if amount > available {
                return Err(SaccoError::InsufficientFunds {
                    available,
                    requested: amount,
                });
            }
        }

        let today = self.today();
        let voucher = WelfareLedger::voucher(&cash, &fund, member.id, entry_type, amount, today);
        let voucher_id = self.ledger.post(voucher)?;

        self.repo.save_welfare(WelfareTransaction {
            id: Uuid::new_v4(),
            member: member.id,
            entry_type,
            amount,
            date: today,
            voucher: voucher_id,
        });
        self.events.emit(Event::WelfarePosted {
            member: member.id,
            entry_type,
            amount,
            voucher: voucher_id,
            date: today,
        });
        Ok(voucher_id)
    }

    /// purchase of cooperative shares: Dr cash / Cr share capital
    pub fn record_share_purchase(
        &mut self,
        member_id: MemberId,
        shares: u32,
        share_price: Money,
    ) -> Result<VoucherId> {
        if shares == 0 {
            return Err(SaccoError::validation("share purchase must cover at least one share"));
        }
        if !share_price.is_positive() {
            return Err(SaccoError::validation("share price must be positive"));
        }
        let member = self.repo.load_member(member_id)?;
        let amount = ShareLedger::purchase_amount(shares, share_price);

        let cash = self.accounts.system_account(SystemAccount::Cash);
        let capital = self.accounts.system_account(SystemAccount::ShareCapital);
        let today = self.today();
        let voucher = ShareLedger::purchase_voucher(&cash, &capital, member.id, amount, today);
        let voucher_id = self.ledger.post(voucher)?;

        self.repo.save_share(ShareTransaction {
            id: Uuid::new_v4(),
            member: member.id,
            shares,
            share_price,
            amount,
            date: today,
            voucher: voucher_id,
        });
        self.events.emit(Event::SharesPurchased {
            member: member.id,
            shares,
            amount,
            voucher: voucher_id,
            date: today,
        });
        Ok(voucher_id)
    }

    // ---- corrections and derived state ----------------------------------

    /// cancel a posted voucher by posting its offset; history is never mutated
    pub fn reverse_voucher(&mut self, voucher_id: VoucherId) -> Result<VoucherId> {
        let today = self.today();
        let reversal = self.ledger.reverse(voucher_id, today)?;
        self.events.emit(Event::VoucherReversed {
            original: voucher_id,
            reversal,
            date: today,
        });
        Ok(reversal)
    }

    /// walk the schedule and persist the portions that have fallen due
    pub fn recompute_demanded_amounts(&mut self, loan_id: LoanId) -> Result<DemandedTotals> {
        let mut loan = self.repo.load_loan(loan_id)?;
        let today = self.today();
        let demanded = demanded_as_of(&loan.repayment_schedule, today);
        loan.total_principal_demanded = demanded.principal;
        loan.total_interest_demanded = demanded.interest;

        self.events.emit(Event::DemandRecomputed {
            loan: loan.id,
            principal_demanded: demanded.principal,
            interest_demanded: demanded.interest,
            as_of: today,
        });
        self.repo.save_loan(loan);
        Ok(demanded)
    }

    /// compare the member's cached totals against the ledger-derived ones
    pub fn reconcile_member(&self, member_id: MemberId) -> Result<MemberReconciliation> {
        let member = self.repo.load_member(member_id)?;
        let savings_account = self.accounts.savings_account_for(&member)?;
        let loan_account = self.accounts.loan_account_for(&member)?;

        Ok(MemberReconciliation {
            savings: Reconciliation {
                cached: member.total_savings,
                derived: self.ledger.balance(&savings_account, None),
            },
            loan_outstanding: Reconciliation {
                cached: member.total_loan_outstanding,
                derived: self.ledger.balance(&loan_account, None),
            },
        })
    }

    // ---- accessors -------------------------------------------------------

    pub fn repository(&self) -> &dyn Repository {
        self.repo.as_ref()
    }

    pub fn repository_mut(&mut self) -> &mut dyn Repository {
        self.repo.as_mut()
    }

    pub fn ledger(&self) -> &dyn Ledger {
        self.ledger.as_ref()
    }

    pub fn resolver(&self) -> &dyn AccountResolver {
        self.accounts.as_ref()
    }

    pub fn config(&self) -> &SaccoConfig {
        &self.config
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }
}

/// days since the earliest installment the payments to date no longer cover
fn days_overdue(loan: &Loan, today: NaiveDate) -> u32 {
    let paid = loan.interest_paid + loan.principal_paid;
    let mut cumulative = Money::ZERO;
    for entry in &loan.repayment_schedule {
        cumulative += entry.amount;
        if cumulative > paid && entry.date <= today {
            return (today - entry.date).num_days().max(0) as u32;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::ChartOfAccounts;
    use crate::decimal::Rate;
    use crate::ledger::{Account, MemoryLedger};
    use crate::notify::LoggingSink;
    use crate::product::LoanProduct;
    use crate::repository::MemoryRepository;
    use crate::types::{InterestMethod, InterestPeriod};
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn engine_with_member_on(ledger: Box<dyn Ledger>) -> (SaccoEngine, MemberId, Uuid) {
        let mut repo = MemoryRepository::new();
        let mut chart = ChartOfAccounts::new();

        let (loan_account, savings_account) = chart.open_member_accounts("Jane Wanjiku");
        let mut member = Member::new(
            "Jane Wanjiku",
            loan_account,
            savings_account,
            NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
        );
        member.status = MemberStatus::Active;
        member.loan_eligible = true;
        member.registration_fee_paid = true;
        let member_id = member.id;
        repo.save_member(member);

        let product = LoanProduct::new(
            "Development Loan",
            Rate::from_percentage(10),
            InterestPeriod::Annually,
            InterestMethod::FlatRate,
            12,
        );
        let product_id = product.id;
        repo.save_product(product);

        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        ));
        let engine = SaccoEngine::new(
            Box::new(repo),
            ledger,
            Box::new(chart),
            Box::new(LoggingSink),
            SaccoConfig::default(),
            time,
        );
        (engine, member_id, product_id)
    }

    fn engine_with_member() -> (SaccoEngine, MemberId, Uuid) {
        engine_with_member_on(Box::new(MemoryLedger::new()))
    }

    fn disbursed_loan(engine: &mut SaccoEngine, member: MemberId, product: Uuid) -> LoanId {
        let loan = engine
            .apply_for_loan(
                member,
                product,
                Money::from_major(12_000),
                Some(12),
                None,
                Vec::new(),
            )
            .unwrap();
        engine.submit_loan(loan).unwrap();
        engine.approve_loan(loan).unwrap();
        engine.disburse_loan(loan).unwrap();
        loan
    }

    #[test]
    fn test_confirm_registration_posts_fee_and_activates() {
        let (mut engine, member_id, _) = engine_with_member();
        let mut member = engine.repository().load_member(member_id).unwrap();
        member.status = MemberStatus::Probation;
        member.registration_fee_paid = false;
        engine.repository_mut().save_member(member);

        let voucher = engine.confirm_registration(member_id).unwrap();
        assert!(voucher.is_some());

        let member = engine.repository().load_member(member_id).unwrap();
        assert_eq!(member.status, MemberStatus::Active);
        assert!(member.registration_fee_paid);

        let income = engine.resolver().system_account(SystemAccount::RegistrationIncome);
        assert_eq!(engine.ledger().balance(&income, None), Money::from_major(1_000));

        // settling twice is rejected
        assert!(engine.confirm_registration(member_id).is_err());
    }

    #[test]
    fn test_registration_fee_waived_by_config() {
        let (mut engine, member_id, _) = engine_with_member();
        let mut member = engine.repository().load_member(member_id).unwrap();
        member.status = MemberStatus::Probation;
        member.registration_fee_paid = false;
        engine.repository_mut().save_member(member);
        engine.config.charge_registration_fee_on_onboarding = false;

        let voucher = engine.confirm_registration(member_id).unwrap();
        assert!(voucher.is_none());

        let member = engine.repository().load_member(member_id).unwrap();
        assert!(member.registration_fee_paid);
        assert_eq!(member.status, MemberStatus::Active);
    }

    #[test]
    fn test_disbursement_posts_and_caches() {
        let (mut engine, member_id, product_id) = engine_with_member();
        let loan_id = disbursed_loan(&mut engine, member_id, product_id);

        let loan = engine.repository().load_loan(loan_id).unwrap();
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.total_repayable, Money::from_major(13_200));

        let member = engine.repository().load_member(member_id).unwrap();
        assert_eq!(member.active_loan, Some(loan_id));
        // principal landed on savings; receivable carries the principal
        assert_eq!(member.total_savings, Money::from_major(12_000));
        assert_eq!(member.total_loan_outstanding, Money::from_major(12_000));

        assert!(engine.reconcile_member(member_id).unwrap().is_consistent());
    }

    #[test]
    fn test_disburse_from_draft_rejected_without_postings() {
        let (mut engine, member_id, product_id) = engine_with_member();
        let loan_id = engine
            .apply_for_loan(
                member_id,
                product_id,
                Money::from_major(12_000),
                Some(12),
                None,
                Vec::new(),
            )
            .unwrap();

        let err = engine.disburse_loan(loan_id).unwrap_err();
        assert!(matches!(
            err,
            SaccoError::InvalidStateTransition {
                current: LoanStatus::Draft,
                required: LoanStatus::Approved,
            }
        ));

        let loan = engine.repository().load_loan(loan_id).unwrap();
        assert_eq!(loan.status, LoanStatus::Draft);
        assert!(loan.repayment_schedule.is_empty());
        let member = engine.repository().load_member(member_id).unwrap();
        assert_eq!(member.total_savings, Money::ZERO);
        assert!(member.active_loan.is_none());
    }

    #[test]
    fn test_second_loan_blocked_while_one_is_active() {
        let (mut engine, member_id, product_id) = engine_with_member();
        disbursed_loan(&mut engine, member_id, product_id);

        let err = engine
            .apply_for_loan(
                member_id,
                product_id,
                Money::from_major(1_000),
                Some(6),
                None,
                Vec::new(),
            )
            .unwrap_err();
        assert!(matches!(err, SaccoError::Eligibility { .. }));
    }

    #[test]
    fn test_repayment_from_savings_checks_balance() {
        let (mut engine, member_id, product_id) = engine_with_member();
        let loan_id = disbursed_loan(&mut engine, member_id, product_id);
        // empty the savings account that received the disbursement
        engine
            .record_withdrawal(member_id, Money::from_major(12_000), PaymentMode::Cash)
            .unwrap();

        let err = engine
            .record_repayment(loan_id, Money::from_major(1_100), PaymentMode::Savings)
            .unwrap_err();
        assert!(matches!(err, SaccoError::InsufficientFunds { .. }));

        // a cash repayment is unaffected
        engine
            .record_repayment(loan_id, Money::from_major(1_100), PaymentMode::Cash)
            .unwrap();
    }

    #[test]
    fn test_full_repayment_completes_and_clears_active_loan() {
        let (mut engine, member_id, product_id) = engine_with_member();
        let loan_id = disbursed_loan(&mut engine, member_id, product_id);

        let outcome = engine
            .record_repayment(loan_id, Money::from_major(13_200), PaymentMode::Cash)
            .unwrap();
        assert!(outcome.completed);

        let loan = engine.repository().load_loan(loan_id).unwrap();
        assert_eq!(loan.status, LoanStatus::Completed);
        let member = engine.repository().load_member(member_id).unwrap();
        assert!(member.active_loan.is_none());
        assert_eq!(member.total_loan_outstanding, Money::ZERO);
        assert!(engine.reconcile_member(member_id).unwrap().is_consistent());

        let err = engine
            .record_repayment(loan_id, Money::from_major(100), PaymentMode::Cash)
            .unwrap_err();
        assert!(matches!(err, SaccoError::LoanAlreadyClosed));
    }

    #[test]
    fn test_overpayment_posts_only_the_outstanding_part() {
        let (mut engine, member_id, product_id) = engine_with_member();
        let loan_id = disbursed_loan(&mut engine, member_id, product_id);

        let outcome = engine
            .record_repayment(loan_id, Money::from_major(20_000), PaymentMode::Cash)
            .unwrap();
        assert!(outcome.completed);
        assert_eq!(outcome.outstanding_after, Money::ZERO);

        let member = engine.repository().load_member(member_id).unwrap();
        assert_eq!(member.total_loan_outstanding, Money::ZERO);
        assert!(engine.reconcile_member(member_id).unwrap().is_consistent());
    }

    #[test]
    fn test_mark_defaulted_records_snapshot() {
        let (mut engine, member_id, product_id) = engine_with_member();
        let loan_id = disbursed_loan(&mut engine, member_id, product_id);

        engine.mark_defaulted(loan_id).unwrap();

        let loan = engine.repository().load_loan(loan_id).unwrap();
        assert_eq!(loan.status, LoanStatus::Defaulted);
        let defaulters = engine.repository().defaulters();
        assert_eq!(defaulters.len(), 1);
        assert_eq!(defaulters[0].loan, loan_id);
        assert_eq!(defaulters[0].status, DefaulterStatus::New);
        // the whole remaining repayable is overdue
        assert_eq!(defaulters[0].overdue_amount, Money::from_major(13_200));
        assert_eq!(defaulters[0].days_overdue, 0);
    }

    #[test]
    fn test_defaulter_overdue_reflects_payments_made() {
        let (mut engine, member_id, product_id) = engine_with_member();
        let loan_id = disbursed_loan(&mut engine, member_id, product_id);
        engine
            .record_repayment(loan_id, Money::from_major(1_100), PaymentMode::Cash)
            .unwrap();

        engine.mark_defaulted(loan_id).unwrap();

        let defaulters = engine.repository().defaulters();
        assert_eq!(defaulters[0].overdue_amount, Money::from_major(12_100));
    }

    #[test]
    fn test_recompute_demanded_amounts_persists_totals() {
        let (mut engine, member_id, product_id) = engine_with_member();
        let loan_id = disbursed_loan(&mut engine, member_id, product_id);

        // nothing due on the disbursement date
        let none = engine.recompute_demanded_amounts(loan_id).unwrap();
        assert_eq!(none.total(), Money::ZERO);

        let mut loan = engine.repository().load_loan(loan_id).unwrap();
        // pull the schedule back three months to simulate elapsed time
        for entry in &mut loan.repayment_schedule {
            entry.date = entry.date - chrono::Months::new(3);
        }
        engine.repository_mut().save_loan(loan);

        let demanded = engine.recompute_demanded_amounts(loan_id).unwrap();
        assert_eq!(demanded.principal, Money::from_major(3_000));
        assert_eq!(demanded.interest, Money::from_major(300));

        let loan = engine.repository().load_loan(loan_id).unwrap();
        assert_eq!(loan.total_principal_demanded, Money::from_major(3_000));
        assert_eq!(loan.total_interest_demanded, Money::from_major(300));
    }

    #[test]
    fn test_reverse_voucher_restores_balances() {
        let (mut engine, member_id, _) = engine_with_member();
        let voucher = engine
            .record_deposit(member_id, Money::from_major(500), PaymentMode::Cash)
            .unwrap();

        engine.reverse_voucher(voucher).unwrap();

        let member = engine.repository().load_member(member_id).unwrap();
        let savings_account = engine.resolver().savings_account_for(&member).unwrap();
        assert_eq!(engine.ledger().balance(&savings_account, None), Money::ZERO);
    }

    struct CountingLedger {
        inner: MemoryLedger,
        posts: Arc<AtomicUsize>,
    }

    impl Ledger for CountingLedger {
        fn post(&mut self, voucher: Voucher) -> Result<VoucherId> {
            let id = self.inner.post(voucher)?;
            self.posts.fetch_add(1, Ordering::SeqCst);
            Ok(id)
        }

        fn reverse(&mut self, voucher: VoucherId, date: NaiveDate) -> Result<VoucherId> {
            let id = self.inner.reverse(voucher, date)?;
            self.posts.fetch_add(1, Ordering::SeqCst);
            Ok(id)
        }

        fn balance(&self, account: &Account, as_of: Option<NaiveDate>) -> Money {
            self.inner.balance(account, as_of)
        }
    }

    #[test]
    fn test_failed_repayment_leaves_no_posting() {
        let posts = Arc::new(AtomicUsize::new(0));
        let ledger = CountingLedger {
            inner: MemoryLedger::new(),
            posts: Arc::clone(&posts),
        };
        let (mut engine, member_id, product_id) = engine_with_member_on(Box::new(ledger));
        let loan_id = disbursed_loan(&mut engine, member_id, product_id);
        engine.mark_defaulted(loan_id).unwrap();
        // pay the defaulted loan down to zero; it stays Defaulted, never Completed
        engine
            .record_repayment(loan_id, Money::from_major(13_200), PaymentMode::Cash)
            .unwrap();
        let posted = posts.load(Ordering::SeqCst);

        let err = engine
            .record_repayment(loan_id, Money::from_major(100), PaymentMode::Cash)
            .unwrap_err();
        assert!(matches!(err, SaccoError::Validation { .. }));
        assert_eq!(posts.load(Ordering::SeqCst), posted);
    }

    #[test]
    fn test_share_purchase_posts_to_share_capital() {
        let (mut engine, member_id, _) = engine_with_member();

        engine
            .record_share_purchase(member_id, 40, Money::from_major(25))
            .unwrap();

        let capital = engine.resolver().system_account(SystemAccount::ShareCapital);
        assert_eq!(engine.ledger().balance(&capital, None), Money::from_major(1_000));
        assert!(matches!(
            engine.events().last(),
            Some(Event::SharesPurchased { shares: 40, .. })
        ));

        assert!(engine
            .record_share_purchase(member_id, 0, Money::from_major(25))
            .is_err());
        assert!(engine
            .record_share_purchase(member_id, 10, Money::ZERO)
            .is_err());
    }

    #[test]
    fn test_welfare_payout_limited_to_fund_balance() {
        let (mut engine, member_id, _) = engine_with_member();
        engine
            .record_welfare(member_id, WelfareEntryType::Contribution, Money::from_major(800))
            .unwrap();

        let err = engine
            .record_welfare(member_id, WelfareEntryType::Payout, Money::from_major(1_000))
            .unwrap_err();
        assert!(matches!(err, SaccoError::InsufficientFunds { .. }));

        engine
            .record_welfare(member_id, WelfareEntryType::Payout, Money::from_major(500))
            .unwrap();
    }

    #[test]
    fn test_events_record_the_lifecycle() {
        let (mut engine, member_id, product_id) = engine_with_member();
        let loan_id = disbursed_loan(&mut engine, member_id, product_id);
        engine
            .record_repayment(loan_id, Money::from_major(13_200), PaymentMode::Cash)
            .unwrap();

        let events = engine.take_events();
        assert!(matches!(events[0], Event::LoanApplied { loan, .. } if loan == loan_id));
        assert!(matches!(events[1], Event::LoanSubmitted { loan } if loan == loan_id));
        assert!(matches!(events[2], Event::LoanApproved { loan } if loan == loan_id));
        assert!(matches!(events[3], Event::LoanDisbursed { loan, .. } if loan == loan_id));
        assert!(matches!(events[4], Event::RepaymentReceived { .. }));
        assert!(matches!(events[5], Event::LoanCompleted { .. }));
        assert!(engine.take_events().is_empty());
    }
}
