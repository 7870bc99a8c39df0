use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::LoanStatus;

#[derive(Error, Debug)]
pub enum SaccoError {
    #[error("validation failed: {message}")]
    Validation {
        message: String,
    },

    #[error("member not eligible: {reason}")]
    Eligibility {
        reason: String,
    },

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Money,
        requested: Money,
    },

    #[error("invalid state transition: loan is {current:?}, operation requires {required:?}")]
    InvalidStateTransition {
        current: LoanStatus,
        required: LoanStatus,
    },

    #[error("loan already fully paid, no further payments can be recorded")]
    LoanAlreadyClosed,

    #[error("unbalanced posting: debits {debits} do not equal credits {credits}")]
    UnbalancedPosting {
        debits: Money,
        credits: Money,
    },

    #[error("invalid repayment term: {months} months")]
    InvalidTerm {
        months: i64,
    },

    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: Uuid,
    },
}

impl SaccoError {
    pub fn validation(message: impl Into<String>) -> Self {
        SaccoError::Validation {
            message: message.into(),
        }
    }

    pub fn eligibility(reason: impl Into<String>) -> Self {
        SaccoError::Eligibility {
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        SaccoError::NotFound { entity, id }
    }
}

pub type Result<T> = std::result::Result<T, SaccoError>;
