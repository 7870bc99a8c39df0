use std::collections::HashMap;

use crate::errors::{Result, SaccoError};
use crate::ledger::{Account, AccountKind};
use crate::member::Member;
use crate::types::{AccountId, SystemAccount};

/// maps members and transaction types to ledger accounts
pub trait AccountResolver {
    /// the member's loan-receivable account
    fn loan_account_for(&self, member: &Member) -> Result<Account>;

    /// the member's savings-liability account
    fn savings_account_for(&self, member: &Member) -> Result<Account>;

    /// system account for a transaction type
    fn system_account(&self, kind: SystemAccount) -> Account;
}

/// in-memory chart of accounts
///
/// Provisions the two per-member accounts at registration time and owns the
/// fixed system accounts (cash, interest income, welfare fund).
#[derive(Debug, Clone)]
pub struct ChartOfAccounts {
    accounts: HashMap<AccountId, Account>,
    system: HashMap<SystemAccount, Account>,
}

impl ChartOfAccounts {
    pub fn new() -> Self {
        let mut system = HashMap::new();
        system.insert(SystemAccount::Cash, Account::new("Cash", AccountKind::DebitNormal));
        system.insert(
            SystemAccount::InterestIncome,
            Account::new("Interest Income", AccountKind::CreditNormal),
        );
        system.insert(
            SystemAccount::RegistrationIncome,
            Account::new("Registration Fees", AccountKind::CreditNormal),
        );
        system.insert(
            SystemAccount::ShareCapital,
            Account::new("Share Capital", AccountKind::CreditNormal),
        );
        system.insert(
            SystemAccount::WelfareFund,
            Account::new("Welfare Fund", AccountKind::CreditNormal),
        );
        Self {
            accounts: HashMap::new(),
            system,
        }
    }

    /// create the loan-receivable and savings-liability accounts for a member
    ///
    /// Returns `(loan_account, savings_account)` ids for the member record.
    pub fn open_member_accounts(&mut self, member_name: &str) -> (AccountId, AccountId) {
        let loan = Account::new(format!("{} - Loans", member_name), AccountKind::DebitNormal);
        let savings = Account::new(format!("SAV - {}", member_name), AccountKind::CreditNormal);
        let ids = (loan.id, savings.id);
        self.accounts.insert(loan.id, loan);
        self.accounts.insert(savings.id, savings);
        ids
    }

    fn lookup(&self, id: AccountId) -> Result<Account> {
        self.accounts
            .get(&id)
            .cloned()
            .ok_or(SaccoError::not_found("account", id))
    }
}

impl Default for ChartOfAccounts {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountResolver for ChartOfAccounts {
    fn loan_account_for(&self, member: &Member) -> Result<Account> {
        self.lookup(member.loan_account)
    }

    fn savings_account_for(&self, member: &Member) -> Result<Account> {
        self.lookup(member.savings_account)
    }

    fn system_account(&self, kind: SystemAccount) -> Account {
        // system accounts are created in the constructor, the map is total
        self.system[&kind].clone()
    }
}
