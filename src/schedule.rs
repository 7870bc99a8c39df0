use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{Result, SaccoError};
use crate::types::{InterestMethod, InterestPeriod};

/// inputs to the amortization calculator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmortizationTerms {
    pub principal: Money,
    /// quoted rate, e.g. 12% annually
    pub rate: Rate,
    pub period: InterestPeriod,
    pub method: InterestMethod,
    pub term_months: u32,
}

/// one installment in a repayment schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub period: u32,
    pub date: NaiveDate,
    pub amount: Money,
    pub principal: Money,
    pub interest: Money,
    /// remaining total repayable after this installment
    pub balance_after: Money,
}

/// computed totals plus the full payment schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationResult {
    pub total_interest: Money,
    pub total_repayable: Money,
    pub installment: Money,
    pub schedule: Vec<ScheduleEntry>,
}

/// computes interest totals, installments, and payment schedules
pub struct AmortizationCalculator;

impl AmortizationCalculator {
    /// compute totals and the full schedule, dates starting one month after `start_date`
    pub fn compute(terms: AmortizationTerms, start_date: NaiveDate) -> Result<AmortizationResult> {
        if terms.term_months == 0 {
            return Err(SaccoError::InvalidTerm { months: 0 });
        }
        if !terms.principal.is_positive() {
            return Err(SaccoError::validation("principal must be positive"));
        }
        if terms.rate.as_decimal().is_sign_negative() {
            return Err(SaccoError::validation("interest rate must not be negative"));
        }

        let (total_interest, total_repayable, installment) = match terms.method {
            InterestMethod::FlatRate => flat_rate_totals(&terms),
            InterestMethod::ReducingBalance => reducing_balance_totals(&terms),
        };

        let schedule = generate_schedule(&terms, start_date, total_interest, total_repayable, installment);

        Ok(AmortizationResult {
            total_interest,
            total_repayable,
            installment,
            schedule,
        })
    }
}

/// monthly rate for the reducing-balance method
fn monthly_rate(terms: &AmortizationTerms) -> Decimal {
    match terms.period {
        InterestPeriod::Monthly => terms.rate.as_decimal(),
        InterestPeriod::Annually => terms.rate.as_decimal() / dec!(12),
    }
}

fn flat_rate_totals(terms: &AmortizationTerms) -> (Money, Money, Money) {
    let principal = terms.principal.as_decimal();
    let rate = terms.rate.as_decimal();
    let term = Decimal::from(terms.term_months);

    let interest = match terms.period {
        InterestPeriod::Monthly => principal * rate * term,
        InterestPeriod::Annually => principal * rate * (term / dec!(12)),
    };

    let total_interest = Money::from_decimal(interest);
    let total_repayable = terms.principal + total_interest;
    let installment = total_repayable / term;
    (total_interest, total_repayable, installment)
}

fn reducing_balance_totals(terms: &AmortizationTerms) -> (Money, Money, Money) {
    let r = monthly_rate(terms);
    let n = terms.term_months;

    let installment = if r.is_zero() {
        terms.principal / Decimal::from(n)
    } else {
        // EMI = P * r * (1 + r)^n / ((1 + r)^n - 1)
        let mut compound = Decimal::ONE;
        let base = Decimal::ONE + r;
        for _ in 0..n {
            compound *= base;
        }
        let numerator = terms.principal.as_decimal() * r * compound;
        let denominator = compound - Decimal::ONE;
        Money::from_decimal(numerator / denominator)
    };

    let total_repayable = installment * Decimal::from(n);
    let total_interest = total_repayable - terms.principal;
    (total_interest, total_repayable, installment)
}

fn generate_schedule(
    terms: &AmortizationTerms,
    start_date: NaiveDate,
    total_interest: Money,
    total_repayable: Money,
    installment: Money,
) -> Vec<ScheduleEntry> {
    let total_rep = total_repayable.as_decimal();
    let (principal_ratio, interest_ratio) = if total_rep.is_zero() {
        (Decimal::ONE, Decimal::ZERO)
    } else {
        (
            terms.principal.as_decimal() / total_rep,
            total_interest.as_decimal() / total_rep,
        )
    };

    let r = match terms.method {
        InterestMethod::ReducingBalance => monthly_rate(terms),
        InterestMethod::FlatRate => Decimal::ZERO,
    };

    let mut schedule = Vec::with_capacity(terms.term_months as usize);
    let mut remaining = total_repayable;
    let mut running_principal = terms.principal;

    for i in 1..=terms.term_months {
        let date = add_months(start_date, i);

        let (principal, interest) = match terms.method {
            InterestMethod::ReducingBalance => {
                let interest = running_principal * r;
                let principal = installment - interest;
                running_principal -= principal;
                (principal, interest)
            }
            InterestMethod::FlatRate => {
                (installment * principal_ratio, installment * interest_ratio)
            }
        };

        remaining -= installment;
        schedule.push(ScheduleEntry {
            period: i,
            date,
            amount: installment,
            principal,
            interest,
            balance_after: remaining.max(Money::ZERO),
        });
    }

    schedule
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(date)
}

/// cumulative principal and interest that fell due on or before a date
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DemandedTotals {
    pub principal: Money,
    pub interest: Money,
}

impl DemandedTotals {
    pub fn total(&self) -> Money {
        self.principal + self.interest
    }
}

/// walk the schedule and sum the portions demanded by `today`
pub fn demanded_as_of(schedule: &[ScheduleEntry], today: NaiveDate) -> DemandedTotals {
    schedule
        .iter()
        .filter(|entry| entry.date <= today)
        .fold(DemandedTotals::default(), |mut acc, entry| {
            acc.principal += entry.principal;
            acc.interest += entry.interest;
            acc
        })
}
