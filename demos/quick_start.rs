/// quick start - one member, one loan, one repayment
use chrono::{NaiveDate, TimeZone, Utc};
use sacco_core::{
    ChartOfAccounts, InterestMethod, InterestPeriod, LoanProduct, LoggingSink, Member,
    MemberStatus, MemoryLedger, MemoryRepository, Money, PaymentMode, Rate, Repository,
    SaccoConfig, SaccoEngine, SafeTimeProvider, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // set up the chart of accounts and register a member
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

    // a 10% flat-rate development loan product
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
    let mut engine = SaccoEngine::new(
        Box::new(repo),
        Box::new(MemoryLedger::new()),
        Box::new(chart),
        Box::new(LoggingSink),
        SaccoConfig::default(),
        time,
    );

    // apply, approve, disburse
    let loan_id = engine.apply_for_loan(
        member_id,
        product_id,
        Money::from_major(12_000),
        Some(12),
        Some("farm inputs".to_string()),
        Vec::new(),
    )?;
    engine.submit_loan(loan_id)?;
    engine.approve_loan(loan_id)?;
    engine.disburse_loan(loan_id)?;

    // pay the first installment
    let outcome = engine.record_repayment(loan_id, Money::from_major(1_100), PaymentMode::Cash)?;

    let loan = engine.repository().load_loan(loan_id)?;
    println!("total repayable: {}", loan.total_repayable);
    println!(
        "installment paid: {} interest / {} principal",
        outcome.split.interest, outcome.split.principal
    );
    println!("outstanding: {}", outcome.outstanding_after);

    Ok(())
}
