use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{
    LoanId, MemberId, PaymentMode, SavingsEntryType, VoucherId, WelfareEntryType,
};

/// all events emitted by the core operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // membership
    MemberActivated {
        member: MemberId,
        fee_voucher: Option<VoucherId>,
        date: NaiveDate,
    },

    // loan lifecycle
    LoanApplied {
        loan: LoanId,
        member: MemberId,
        amount: Money,
    },
    LoanSubmitted {
        loan: LoanId,
    },
    LoanApproved {
        loan: LoanId,
    },
    LoanDisbursed {
        loan: LoanId,
        member: MemberId,
        amount: Money,
        total_repayable: Money,
        voucher: VoucherId,
        date: NaiveDate,
    },
    LoanCompleted {
        loan: LoanId,
        member: MemberId,
        date: NaiveDate,
    },
    LoanDefaulted {
        loan: LoanId,
        member: MemberId,
        overdue_amount: Money,
        days_overdue: u32,
        date: NaiveDate,
    },

    // money movements
    RepaymentReceived {
        loan: LoanId,
        member: MemberId,
        amount: Money,
        applied_to_interest: Money,
        applied_to_principal: Money,
        mode: PaymentMode,
        voucher: VoucherId,
        date: NaiveDate,
    },
    SavingsPosted {
        member: MemberId,
        entry_type: SavingsEntryType,
        amount: Money,
        new_total: Money,
        voucher: VoucherId,
        date: NaiveDate,
    },
    WelfarePosted {
        member: MemberId,
        entry_type: WelfareEntryType,
        amount: Money,
        voucher: VoucherId,
        date: NaiveDate,
    },
    SharesPurchased {
        member: MemberId,
        shares: u32,
        amount: Money,
        voucher: VoucherId,
        date: NaiveDate,
    },
    VoucherReversed {
        original: VoucherId,
        reversal: VoucherId,
        date: NaiveDate,
    },

    // demand tracking
    DemandRecomputed {
        loan: LoanId,
        principal_demanded: Money,
        interest_demanded: Money,
        as_of: NaiveDate,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
