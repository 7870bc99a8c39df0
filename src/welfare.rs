use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::ledger::{Account, Voucher};
use crate::types::{MemberId, VoucherId, WelfareEntryType};

/// record of one posted welfare fund movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelfareTransaction {
    pub id: Uuid,
    pub member: MemberId,
    pub entry_type: WelfareEntryType,
    pub amount: Money,
    pub date: NaiveDate,
    pub voucher: VoucherId,
}

/// builds welfare fund postings
pub struct WelfareLedger;

impl WelfareLedger {
    /// Contribution: Dr cash / Cr welfare fund. Payout: Dr welfare fund / Cr cash.
    pub fn voucher(
        cash: &Account,
        welfare_fund: &Account,
        member: MemberId,
        entry_type: WelfareEntryType,
        amount: Money,
        date: NaiveDate,
    ) -> Voucher {
        match entry_type {
            WelfareEntryType::Contribution => {
                Voucher::new(date, format!("welfare contribution from {}", member))
                    .debit(cash.id, amount)
                    .credit(welfare_fund.id, amount)
            }
            WelfareEntryType::Payout => {
                Voucher::new(date, format!("welfare payout to {}", member))
                    .debit(welfare_fund.id, amount)
                    .credit(cash.id, amount)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AccountKind, Ledger, MemoryLedger};

    #[test]
    fn test_contributions_and_payouts_move_the_fund() {
        let cash = Account::new("Cash", AccountKind::DebitNormal);
        let fund = Account::new("Welfare Fund", AccountKind::CreditNormal);
        let mut ledger = MemoryLedger::new();
        let member = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let contribution = WelfareLedger::voucher(
            &cash,
            &fund,
            member,
            WelfareEntryType::Contribution,
            Money::from_major(1_000),
            date,
        );
        ledger.post(contribution).unwrap();
        assert_eq!(ledger.balance(&fund, None), Money::from_major(1_000));

        let payout = WelfareLedger::voucher(
            &cash,
            &fund,
            member,
            WelfareEntryType::Payout,
            Money::from_major(400),
            date,
        );
        ledger.post(payout).unwrap();
        assert_eq!(ledger.balance(&fund, None), Money::from_major(600));
        assert_eq!(ledger.balance(&cash, None), Money::from_major(600));
    }
}
