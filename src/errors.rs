use thiserror::Error;

use crate::types::LoanId;

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("invalid loan terms: {reason}")]
    InvalidLoanTerms {
        reason: String,
    },

    #[error("unsupported pricing model: {model}")]
    UnsupportedPricingModel {
        model: String,
    },

    #[error("malformed schedule for loan {loan_id}: {reason}")]
    MalformedSchedule {
        loan_id: LoanId,
        reason: String,
    },

    #[error("loan not found: {loan_id}")]
    LoanNotFound {
        loan_id: LoanId,
    },

    #[error("repository error: {message}")]
    Repository {
        message: String,
    },

    #[error("calculation error: {message}")]
    Calculation {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LoanError {
    pub(crate) fn invalid_terms(reason: impl Into<String>) -> Self {
        LoanError::InvalidLoanTerms {
            reason: reason.into(),
        }
    }

    /// true for failures caused by the caller's input
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LoanError::InvalidLoanTerms { .. } | LoanError::UnsupportedPricingModel { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LoanError>;
