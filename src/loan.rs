use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SaccoConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{Result, SaccoError};
use crate::member::Member;
use crate::product::LoanProduct;
use crate::schedule::{AmortizationResult, ScheduleEntry};
use crate::types::{
    Guarantor, InterestMethod, InterestPeriod, LoanId, LoanStatus, MemberId, ProductId,
};

/// a member loan
///
/// Rate, period and method are copied from the product at creation time.
/// After disbursement the balances change only through posted repayments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub member: MemberId,
    pub product: ProductId,
    pub loan_amount: Money,
    /// months
    pub repayment_period: u32,
    pub interest_rate: Rate,
    pub interest_period: InterestPeriod,
    pub interest_method: InterestMethod,
    pub purpose: Option<String>,
    pub total_interest: Money,
    pub total_repayable: Money,
    pub monthly_installment: Money,
    pub outstanding_balance: Money,
    pub principal_paid: Money,
    pub interest_paid: Money,
    pub total_principal_demanded: Money,
    pub total_interest_demanded: Money,
    pub repayment_schedule: Vec<ScheduleEntry>,
    pub guarantors: Vec<Guarantor>,
    pub status: LoanStatus,
    pub applied_on: NaiveDate,
    pub disbursed_on: Option<NaiveDate>,
}

impl Loan {
    /// create a Draft loan, copying terms from the product
    pub fn new(
        member: MemberId,
        product: &LoanProduct,
        loan_amount: Money,
        repayment_period: u32,
        applied_on: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            member,
            product: product.id,
            loan_amount,
            repayment_period,
            interest_rate: product.interest_rate,
            interest_period: product.interest_period,
            interest_method: product.interest_method,
            purpose: None,
            total_interest: Money::ZERO,
            total_repayable: Money::ZERO,
            monthly_installment: Money::ZERO,
            outstanding_balance: Money::ZERO,
            principal_paid: Money::ZERO,
            interest_paid: Money::ZERO,
            total_principal_demanded: Money::ZERO,
            total_interest_demanded: Money::ZERO,
            repayment_schedule: Vec::new(),
            guarantors: Vec::new(),
            status: LoanStatus::Draft,
            applied_on,
            disbursed_on: None,
        }
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }

    pub fn with_guarantors(mut self, guarantors: Vec<Guarantor>) -> Self {
        self.guarantors = guarantors;
        self
    }

    fn guard(&self, required: LoanStatus) -> Result<()> {
        if self.status == required {
            Ok(())
        } else {
            Err(SaccoError::InvalidStateTransition {
                current: self.status,
                required,
            })
        }
    }

    /// Draft -> PendingApproval
    pub fn submit(&mut self) -> Result<()> {
        self.guard(LoanStatus::Draft)?;
        self.status = LoanStatus::PendingApproval;
        Ok(())
    }

    /// PendingApproval -> Approved
    pub fn approve(&mut self) -> Result<()> {
        self.guard(LoanStatus::PendingApproval)?;
        self.status = LoanStatus::Approved;
        Ok(())
    }

    /// Approved -> Active, installing the computed amortization
    pub fn activate(&mut self, amortization: AmortizationResult, disbursed_on: NaiveDate) -> Result<()> {
        self.guard(LoanStatus::Approved)?;
        self.total_interest = amortization.total_interest;
        self.total_repayable = amortization.total_repayable;
        self.monthly_installment = amortization.installment;
        self.outstanding_balance = amortization.total_repayable;
        self.repayment_schedule = amortization.schedule;
        self.disbursed_on = Some(disbursed_on);
        self.status = LoanStatus::Active;
        Ok(())
    }

    /// Active -> Completed, triggered when the outstanding balance reaches zero
    pub fn complete(&mut self) -> Result<()> {
        self.guard(LoanStatus::Active)?;
        self.outstanding_balance = Money::ZERO;
        self.status = LoanStatus::Completed;
        Ok(())
    }

    /// Active -> Defaulted
    pub fn mark_defaulted(&mut self) -> Result<()> {
        self.guard(LoanStatus::Active)?;
        self.status = LoanStatus::Defaulted;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.status == LoanStatus::Completed
    }

    /// sum of pledged guarantee amounts
    pub fn guarantee_coverage(&self) -> Money {
        self.guarantors.iter().map(|g| g.guarantee_amount).sum()
    }
}

/// eligibility checks run before Draft creation and re-run before disbursement
pub fn validate_eligibility(
    member: &Member,
    product: &LoanProduct,
    config: &SaccoConfig,
    loan_amount: Money,
    guarantors: &[Guarantor],
) -> Result<()> {
    if member.status != crate::types::MemberStatus::Active {
        return Err(SaccoError::eligibility(format!(
            "member {} is not active",
            member.name
        )));
    }
    if !member.loan_eligible {
        return Err(SaccoError::eligibility(
            "member is not eligible for loans yet (savings history rule)",
        ));
    }
    if !member.registration_fee_paid {
        return Err(SaccoError::eligibility("registration fee not paid"));
    }
    if member.has_active_loan() && !config.allows_parallel_loan(product.id) {
        return Err(SaccoError::eligibility(format!(
            "member already has an active loan: {}",
            member.active_loan.map(|id| id.to_string()).unwrap_or_default()
        )));
    }

    if product.requires_guarantor && (guarantors.len() as u32) < product.min_guarantors {
        return Err(SaccoError::validation(format!(
            "product '{}' requires at least {} guarantors, provided {}",
            product.name,
            product.min_guarantors,
            guarantors.len()
        )));
    }

    if config.enforce_guarantor_coverage && product.requires_guarantor {
        let coverage: Money = guarantors.iter().map(|g| g.guarantee_amount).sum();
        if coverage < loan_amount {
            return Err(SaccoError::validation(format!(
                "guarantee coverage {} does not cover the loan amount {}",
                coverage, loan_amount
            )));
        }
    }

    product.validate_amount(loan_amount)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{AmortizationCalculator, AmortizationTerms};
    use crate::types::MemberStatus;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn product() -> LoanProduct {
        LoanProduct::new(
            "Development Loan",
            Rate::from_percentage(10),
            InterestPeriod::Annually,
            InterestMethod::FlatRate,
            24,
        )
    }

    fn active_member() -> Member {
        let mut member = Member::new(
            "Jane Wanjiku",
            Uuid::new_v4(),
            Uuid::new_v4(),
            date(2023, 6, 1),
        );
        member.status = MemberStatus::Active;
        member.loan_eligible = true;
        member.registration_fee_paid = true;
        member
    }

    fn amortization(loan: &Loan) -> AmortizationResult {
        AmortizationCalculator::compute(
            AmortizationTerms {
                principal: loan.loan_amount,
                rate: loan.interest_rate,
                period: loan.interest_period,
                method: loan.interest_method,
                term_months: loan.repayment_period,
            },
            date(2024, 1, 1),
        )
        .unwrap()
    }

    #[test]
    fn test_happy_path_transitions() {
        let product = product();
        let mut loan = Loan::new(
            Uuid::new_v4(),
            &product,
            Money::from_major(12_000),
            12,
            date(2024, 1, 1),
        );

        loan.submit().unwrap();
        assert_eq!(loan.status, LoanStatus::PendingApproval);

        loan.approve().unwrap();
        assert_eq!(loan.status, LoanStatus::Approved);

        let result = amortization(&loan);
        loan.activate(result, date(2024, 1, 1)).unwrap();
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.total_repayable, Money::from_major(13_200));
        assert_eq!(loan.outstanding_balance, Money::from_major(13_200));
        assert_eq!(loan.repayment_schedule.len(), 12);

        loan.complete().unwrap();
        assert_eq!(loan.status, LoanStatus::Completed);
    }

    #[test]
    fn test_illegal_transitions_leave_loan_unchanged() {
        let product = product();
        let mut loan = Loan::new(
            Uuid::new_v4(),
            &product,
            Money::from_major(12_000),
            12,
            date(2024, 1, 1),
        );

        // disburse straight from Draft
        let result = amortization(&loan);
        let err = loan.activate(result, date(2024, 1, 1)).unwrap_err();
        assert!(matches!(
            err,
            SaccoError::InvalidStateTransition {
                current: LoanStatus::Draft,
                required: LoanStatus::Approved,
            }
        ));
        assert_eq!(loan.status, LoanStatus::Draft);
        assert!(loan.repayment_schedule.is_empty());
        assert_eq!(loan.outstanding_balance, Money::ZERO);

        // approve from Draft
        assert!(loan.approve().is_err());
        assert_eq!(loan.status, LoanStatus::Draft);

        // complete or default before activation
        assert!(loan.complete().is_err());
        assert!(loan.mark_defaulted().is_err());
        assert_eq!(loan.status, LoanStatus::Draft);

        // double submit
        loan.submit().unwrap();
        assert!(loan.submit().is_err());
        assert_eq!(loan.status, LoanStatus::PendingApproval);
    }

    #[test]
    fn test_default_only_from_active() {
        let product = product();
        let mut loan = Loan::new(
            Uuid::new_v4(),
            &product,
            Money::from_major(12_000),
            12,
            date(2024, 1, 1),
        );
        loan.submit().unwrap();
        loan.approve().unwrap();
        let result = amortization(&loan);
        loan.activate(result, date(2024, 1, 1)).unwrap();

        loan.mark_defaulted().unwrap();
        assert_eq!(loan.status, LoanStatus::Defaulted);

        // no way out of Defaulted
        assert!(loan.complete().is_err());
        assert!(loan.mark_defaulted().is_err());
    }

    #[test]
    fn test_eligibility_member_checks() {
        let product = product();
        let config = SaccoConfig::default();
        let amount = Money::from_major(5_000);

        let mut member = active_member();
        member.status = MemberStatus::Probation;
        assert!(matches!(
            validate_eligibility(&member, &product, &config, amount, &[]),
            Err(SaccoError::Eligibility { .. })
        ));

        let mut member = active_member();
        member.loan_eligible = false;
        assert!(validate_eligibility(&member, &product, &config, amount, &[]).is_err());

        let mut member = active_member();
        member.registration_fee_paid = false;
        assert!(validate_eligibility(&member, &product, &config, amount, &[]).is_err());

        let member = active_member();
        assert!(validate_eligibility(&member, &product, &config, amount, &[]).is_ok());
    }

    #[test]
    fn test_parallel_loan_exception() {
        let product = product();
        let mut member = active_member();
        member.active_loan = Some(Uuid::new_v4());
        let amount = Money::from_major(5_000);

        let config = SaccoConfig::default();
        assert!(validate_eligibility(&member, &product, &config, amount, &[]).is_err());

        let mut config = SaccoConfig::default();
        config.parallel_loan_products.insert(product.id);
        assert!(validate_eligibility(&member, &product, &config, amount, &[]).is_ok());
    }

    #[test]
    fn test_guarantor_count_and_coverage() {
        let product = product().with_guarantors(2);
        let member = active_member();
        let config = SaccoConfig::default();
        let amount = Money::from_major(10_000);

        let one = vec![Guarantor {
            member: Uuid::new_v4(),
            guarantee_amount: Money::from_major(2_000),
        }];
        assert!(validate_eligibility(&member, &product, &config, amount, &one).is_err());

        let two = vec![
            Guarantor {
                member: Uuid::new_v4(),
                guarantee_amount: Money::from_major(2_000),
            },
            Guarantor {
                member: Uuid::new_v4(),
                guarantee_amount: Money::from_major(2_000),
            },
        ];
        // count satisfied; coverage short but not enforced by default
        assert!(validate_eligibility(&member, &product, &config, amount, &two).is_ok());

        let mut strict = SaccoConfig::default();
        strict.enforce_guarantor_coverage = true;
        assert!(validate_eligibility(&member, &product, &strict, amount, &two).is_err());

        let covered = vec![
            Guarantor {
                member: Uuid::new_v4(),
                guarantee_amount: Money::from_major(6_000),
            },
            Guarantor {
                member: Uuid::new_v4(),
                guarantee_amount: Money::from_major(4_000),
            },
        ];
        assert!(validate_eligibility(&member, &product, &strict, amount, &covered).is_ok());
    }
}
