use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a customer
pub type CustomerId = Uuid;

/// unique identifier for a ledger transaction
pub type TransactionId = Uuid;

/// how interest is priced over the life of the loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum PricingModel {
    /// interest on the original principal for the whole term
    Flat,
    /// interest on the remaining principal each period
    Diminishing,
}

impl FromStr for PricingModel {
    type Err = LoanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(PricingModel::Flat),
            "diminishing" => Ok(PricingModel::Diminishing),
            _ => Err(LoanError::UnsupportedPricingModel {
                model: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for PricingModel {
    type Error = LoanError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for PricingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingModel::Flat => write!(f, "Flat"),
            PricingModel::Diminishing => write!(f, "Diminishing"),
        }
    }
}

/// loan lifecycle status as kept by the loan store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// created, awaiting approval or disbursement
    Pending,
    /// disbursed and being repaid
    Active,
    /// fully repaid
    Completed,
    /// written down as defaulted
    Defaulted,
}

/// ledger transaction kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Disbursement,
    Repayment,
    Fee,
    Penalty,
}

/// immutable pricing terms of a loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_months: u32,
    pub pricing_model: PricingModel,
    pub start_date: NaiveDate,
}

impl LoanTerms {
    pub fn new(
        principal: Money,
        annual_rate: Rate,
        term_months: u32,
        pricing_model: PricingModel,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            principal,
            annual_rate,
            term_months,
            pricing_model,
            start_date,
        }
    }

    /// reject terms no schedule can be built from
    pub fn validate(&self) -> Result<()> {
        if !self.principal.is_positive() {
            return Err(LoanError::invalid_terms(format!(
                "principal must be positive, got {}",
                self.principal
            )));
        }
        if self.term_months == 0 {
            return Err(LoanError::invalid_terms("term must be at least one month"));
        }
        if self.annual_rate.is_negative() {
            return Err(LoanError::invalid_terms(format!(
                "annual rate must not be negative, got {}",
                self.annual_rate
            )));
        }
        Ok(())
    }

    /// due date of the given installment (1-based), clamped to month end
    pub fn due_date(&self, installment: u32) -> Result<NaiveDate> {
        self.start_date
            .checked_add_months(Months::new(installment))
            .ok_or_else(|| LoanError::Calculation {
                message: format!(
                    "due date of installment {} overflows the calendar",
                    installment
                ),
            })
    }

    /// date of the final installment
    pub fn maturity_date(&self) -> Result<NaiveDate> {
        self.due_date(self.term_months)
    }
}

/// loan as handed over by the loan store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub id: LoanId,
    pub customer_id: CustomerId,
    pub terms: LoanTerms,
    pub status: LoanStatus,
}

impl LoanRecord {
    pub fn new(customer_id: CustomerId, terms: LoanTerms, status: LoanStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            terms,
            status,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }
}

/// ledger transaction as handed over by the transaction store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub loan_id: Option<LoanId>,
    pub customer_id: CustomerId,
    pub amount: Money,
    pub transaction_type: TransactionType,
    pub description: String,
    pub date: DateTime<Utc>,
}

impl Transaction {
    /// repayment transactions of a loan become actual payments
    pub fn as_payment_for(&self, loan_id: LoanId) -> Option<ActualPayment> {
        if self.transaction_type != TransactionType::Repayment || self.loan_id != Some(loan_id) {
            return None;
        }
        Some(ActualPayment {
            loan_id,
            amount: self.amount,
            payment_date: self.date.date_naive(),
        })
    }
}

/// repayment actually received against a loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualPayment {
    pub loan_id: LoanId,
    pub amount: Money,
    pub payment_date: NaiveDate,
}

impl ActualPayment {
    pub fn new(loan_id: LoanId, amount: Money, payment_date: NaiveDate) -> Self {
        Self {
            loan_id,
            amount,
            payment_date,
        }
    }
}
