use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::ledger::{Account, Voucher};
use crate::types::{MemberId, VoucherId};

/// record of one posted share purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareTransaction {
    pub id: Uuid,
    pub member: MemberId,
    pub shares: u32,
    pub share_price: Money,
    pub amount: Money,
    pub date: NaiveDate,
    pub voucher: VoucherId,
}

/// builds share capital postings
pub struct ShareLedger;

impl ShareLedger {
    /// total cost of a purchase: shares x price
    pub fn purchase_amount(shares: u32, share_price: Money) -> Money {
        share_price * Decimal::from(shares)
    }

    /// Dr cash / Cr share capital
    pub fn purchase_voucher(
        cash: &Account,
        share_capital: &Account,
        member: MemberId,
        amount: Money,
        date: NaiveDate,
    ) -> Voucher {
        Voucher::new(date, format!("share purchase by {}", member))
            .debit(cash.id, amount)
            .credit(share_capital.id, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AccountKind, Ledger, MemoryLedger};

    #[test]
    fn test_purchase_amount_is_shares_times_price() {
        assert_eq!(
            ShareLedger::purchase_amount(40, Money::from_major(25)),
            Money::from_major(1_000)
        );
        assert_eq!(ShareLedger::purchase_amount(0, Money::from_major(25)), Money::ZERO);
    }

    #[test]
    fn test_purchases_grow_share_capital() {
        let cash = Account::new("Cash", AccountKind::DebitNormal);
        let capital = Account::new("Share Capital", AccountKind::CreditNormal);
        let mut ledger = MemoryLedger::new();
        let member = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();

        let voucher = ShareLedger::purchase_voucher(
            &cash,
            &capital,
            member,
            Money::from_major(1_000),
            date,
        );
        ledger.post(voucher).unwrap();

        assert_eq!(ledger.balance(&capital, None), Money::from_major(1_000));
        assert_eq!(ledger.balance(&cash, None), Money::from_major(1_000));
    }
}
