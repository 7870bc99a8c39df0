use std::collections::HashMap;

use crate::errors::{Result, SaccoError};
use crate::loan::Loan;
use crate::member::Member;
use crate::product::LoanProduct;
use crate::shares::ShareTransaction;
use crate::types::{DefaulterRecord, LoanId, LoanRepayment, MemberId, ProductId, SavingsTransaction};
use crate::welfare::WelfareTransaction;

/// entity load/save/query capability, persistence-agnostic
///
/// Load hands out owned copies; save replaces the stored entity. A failed
/// operation that never calls save leaves storage untouched.
pub trait Repository {
    fn load_member(&self, id: MemberId) -> Result<Member>;
    fn save_member(&mut self, member: Member);

    fn load_loan(&self, id: LoanId) -> Result<Loan>;
    fn save_loan(&mut self, loan: Loan);

    fn load_product(&self, id: ProductId) -> Result<LoanProduct>;
    fn save_product(&mut self, product: LoanProduct);

    fn savings_for_member(&self, member: MemberId) -> Vec<SavingsTransaction>;
    fn save_savings(&mut self, transaction: SavingsTransaction);

    fn repayments_for_loan(&self, loan: LoanId) -> Vec<LoanRepayment>;
    fn save_repayment(&mut self, repayment: LoanRepayment);

    fn defaulters(&self) -> Vec<DefaulterRecord>;
    fn save_defaulter(&mut self, record: DefaulterRecord);

    fn save_welfare(&mut self, transaction: WelfareTransaction);

    fn save_share(&mut self, transaction: ShareTransaction);
}

/// in-memory repository for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryRepository {
    members: HashMap<MemberId, Member>,
    loans: HashMap<LoanId, Loan>,
    products: HashMap<ProductId, LoanProduct>,
    savings: Vec<SavingsTransaction>,
    repayments: Vec<LoanRepayment>,
    defaulter_records: Vec<DefaulterRecord>,
    welfare: Vec<WelfareTransaction>,
    shares: Vec<ShareTransaction>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn welfare_transactions(&self) -> &[WelfareTransaction] {
        &self.welfare
    }

    pub fn share_transactions(&self) -> &[ShareTransaction] {
        &self.shares
    }
}

impl Repository for MemoryRepository {
    fn load_member(&self, id: MemberId) -> Result<Member> {
        self.members
            .get(&id)
            .cloned()
            .ok_or(SaccoError::not_found("member", id))
    }

    fn save_member(&mut self, member: Member) {
        self.members.insert(member.id, member);
    }

    fn load_loan(&self, id: LoanId) -> Result<Loan> {
        self.loans
            .get(&id)
            .cloned()
            .ok_or(SaccoError::not_found("loan", id))
    }

    fn save_loan(&mut self, loan: Loan) {
        self.loans.insert(loan.id, loan);
    }

    fn load_product(&self, id: ProductId) -> Result<LoanProduct> {
        self.products
            .get(&id)
            .cloned()
            .ok_or(SaccoError::not_found("loan product", id))
    }

    fn save_product(&mut self, product: LoanProduct) {
        self.products.insert(product.id, product);
    }

    fn savings_for_member(&self, member: MemberId) -> Vec<SavingsTransaction> {
        self.savings
            .iter()
            .filter(|t| t.member == member)
            .cloned()
            .collect()
    }

    fn save_savings(&mut self, transaction: SavingsTransaction) {
        self.savings.push(transaction);
    }

    fn repayments_for_loan(&self, loan: LoanId) -> Vec<LoanRepayment> {
        self.repayments
            .iter()
            .filter(|r| r.loan == loan)
            .cloned()
            .collect()
    }

    fn save_repayment(&mut self, repayment: LoanRepayment) {
        self.repayments.push(repayment);
    }

    fn defaulters(&self) -> Vec<DefaulterRecord> {
        self.defaulter_records.clone()
    }

    fn save_defaulter(&mut self, record: DefaulterRecord) {
        self.defaulter_records.push(record);
    }

    fn save_welfare(&mut self, transaction: WelfareTransaction) {
        self.welfare.push(transaction);
    }

    fn save_share(&mut self, transaction: ShareTransaction) {
        self.shares.push(transaction);
    }
}
