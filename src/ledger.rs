use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{Result, SaccoError};
use crate::types::{AccountId, MemberId, VoucherId};

/// balance rule for an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    /// asset/receivable accounts: balance = debits - credits
    DebitNormal,
    /// liability/income accounts: balance = credits - debits
    CreditNormal,
}

impl AccountKind {
    /// signed balance contribution of one posting line
    pub fn balance_change(self, debit: Money, credit: Money) -> Money {
        match self {
            AccountKind::DebitNormal => debit - credit,
            AccountKind::CreditNormal => credit - debit,
        }
    }
}

/// a ledger account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub kind: AccountKind,
}

impl Account {
    pub fn new(name: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
        }
    }
}

/// one debit or credit line inside a voucher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingLine {
    pub account: AccountId,
    pub debit: Money,
    pub credit: Money,
    pub party: Option<MemberId>,
}

/// a balanced set of debit and credit lines recorded under one id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: VoucherId,
    pub date: NaiveDate,
    pub memo: String,
    pub lines: Vec<PostingLine>,
    /// set when this voucher offsets a previously posted one
    pub reverses: Option<VoucherId>,
}

impl Voucher {
    pub fn new(date: NaiveDate, memo: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            memo: memo.into(),
            lines: Vec::new(),
            reverses: None,
        }
    }

    pub fn debit(mut self, account: AccountId, amount: Money) -> Self {
        self.lines.push(PostingLine {
            account,
            debit: amount,
            credit: Money::ZERO,
            party: None,
        });
        self
    }

    pub fn credit(mut self, account: AccountId, amount: Money) -> Self {
        self.lines.push(PostingLine {
            account,
            debit: Money::ZERO,
            credit: amount,
            party: None,
        });
        self
    }

    pub fn debit_party(mut self, account: AccountId, amount: Money, party: MemberId) -> Self {
        self.lines.push(PostingLine {
            account,
            debit: amount,
            credit: Money::ZERO,
            party: Some(party),
        });
        self
    }

    pub fn credit_party(mut self, account: AccountId, amount: Money, party: MemberId) -> Self {
        self.lines.push(PostingLine {
            account,
            debit: Money::ZERO,
            credit: amount,
            party: Some(party),
        });
        self
    }

    pub fn total_debits(&self) -> Money {
        self.lines.iter().map(|l| l.debit).sum()
    }

    pub fn total_credits(&self) -> Money {
        self.lines.iter().map(|l| l.credit).sum()
    }

    pub fn is_balanced(&self) -> bool {
        self.total_debits() == self.total_credits()
    }

    /// build the offsetting voucher: every debit becomes a credit and vice versa
    pub fn reversal(&self, date: NaiveDate) -> Voucher {
        Voucher {
            id: Uuid::new_v4(),
            date,
            memo: format!("reversal of {}", self.id),
            lines: self
                .lines
                .iter()
                .map(|l| PostingLine {
                    account: l.account,
                    debit: l.credit,
                    credit: l.debit,
                    party: l.party,
                })
                .collect(),
            reverses: Some(self.id),
        }
    }
}

/// appends balanced vouchers and derives account balances from postings
pub trait Ledger {
    /// append a voucher; rejects unbalanced or malformed vouchers
    fn post(&mut self, voucher: Voucher) -> Result<VoucherId>;

    /// post the offsetting voucher for a previously posted one
    fn reverse(&mut self, voucher: VoucherId, date: NaiveDate) -> Result<VoucherId>;

    /// balance of an account, per its kind, over postings up to `as_of` inclusive
    fn balance(&self, account: &Account, as_of: Option<NaiveDate>) -> Money;
}

/// in-memory append-only ledger
#[derive(Debug, Default)]
pub struct MemoryLedger {
    vouchers: Vec<Voucher>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vouchers(&self) -> &[Voucher] {
        &self.vouchers
    }

    pub fn voucher(&self, id: VoucherId) -> Option<&Voucher> {
        self.vouchers.iter().find(|v| v.id == id)
    }

    fn validate(voucher: &Voucher) -> Result<()> {
        if voucher.lines.is_empty() {
            return Err(SaccoError::validation("voucher has no posting lines"));
        }
        for line in &voucher.lines {
            if line.debit.is_negative() || line.credit.is_negative() {
                return Err(SaccoError::validation("posting amounts must not be negative"));
            }
            if line.debit.is_positive() && line.credit.is_positive() {
                return Err(SaccoError::validation(
                    "a posting line must be either a debit or a credit, not both",
                ));
            }
        }
        if !voucher.is_balanced() {
            return Err(SaccoError::UnbalancedPosting {
                debits: voucher.total_debits(),
                credits: voucher.total_credits(),
            });
        }
        Ok(())
    }
}

impl Ledger for MemoryLedger {
    fn post(&mut self, voucher: Voucher) -> Result<VoucherId> {
        Self::validate(&voucher)?;
        tracing::debug!(
            voucher = %voucher.id,
            date = %voucher.date,
            amount = %voucher.total_debits(),
            memo = %voucher.memo,
            "posting voucher"
        );
        let id = voucher.id;
        self.vouchers.push(voucher);
        Ok(id)
    }

    fn reverse(&mut self, voucher: VoucherId, date: NaiveDate) -> Result<VoucherId> {
        let original = self
            .voucher(voucher)
            .ok_or(SaccoError::not_found("voucher", voucher))?;
        let reversal = original.reversal(date);
        self.post(reversal)
    }

    fn balance(&self, account: &Account, as_of: Option<NaiveDate>) -> Money {
        self.vouchers
            .iter()
            .filter(|v| as_of.map_or(true, |cutoff| v.date <= cutoff))
            .flat_map(|v| v.lines.iter())
            .filter(|l| l.account == account.id)
            .map(|l| account.kind.balance_change(l.debit, l.credit))
            .sum()
    }
}
