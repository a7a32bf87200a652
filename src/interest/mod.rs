pub mod diminishing;
pub mod flat;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::types::{LoanTerms, PricingModel};

pub use diminishing::DiminishingBalance;
pub use flat::FlatRate;

/// principal/interest split of one scheduled period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodSplit {
    pub principal: Money,
    pub interest: Money,
}

/// pricing-model specific installment math
pub trait InstallmentCalculator {
    /// per-period installment before currency rounding
    fn raw_installment(&self, terms: &LoanTerms) -> Result<Decimal>;

    /// split the installment for a period given the balance owed before it
    fn split_period(&self, terms: &LoanTerms, emi: Money, balance_before: Money) -> PeriodSplit;

    /// interest over the whole term for a quote
    fn total_interest(&self, terms: &LoanTerms, emi: Money) -> Money;
}

/// quoted cost of a loan
///
/// Totals come from the closed-form formulas. A generated schedule rounds each
/// row to cents, so its interest total can differ from the quote by a few cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanQuote {
    pub pricing_model: PricingModel,
    pub emi: Money,
    pub total_interest: Money,
    pub total_payable: Money,
}

/// calculator for the given pricing model
pub fn calculator_for(model: PricingModel) -> &'static dyn InstallmentCalculator {
    match model {
        PricingModel::Flat => &FlatRate,
        PricingModel::Diminishing => &DiminishingBalance,
    }
}

/// entry point for EMI and quote computation
pub struct RateCalculator;

impl RateCalculator {
    /// periodic installment rounded to currency precision
    pub fn emi(terms: &LoanTerms) -> Result<Money> {
        terms.validate()?;
        let raw = calculator_for(terms.pricing_model).raw_installment(terms)?;
        Ok(Money::from_decimal(raw))
    }

    /// emi plus total interest and total payable
    pub fn quote(terms: &LoanTerms) -> Result<LoanQuote> {
        let emi = Self::emi(terms)?;
        let total_interest = calculator_for(terms.pricing_model).total_interest(terms, emi);

        Ok(LoanQuote {
            pricing_model: terms.pricing_model,
            emi,
            total_interest,
            total_payable: terms.principal + total_interest,
        })
    }
}

/// calculate (1 + r)^n, failing instead of overflowing
pub(crate) fn compound_factor(rate: Decimal, periods: u32) -> Result<Decimal> {
    let base = Decimal::ONE + rate;
    let mut factor = Decimal::ONE;
    for _ in 0..periods {
        factor = factor.checked_mul(base).ok_or_else(|| LoanError::Calculation {
            message: format!("compound factor overflows for rate {} over {} periods", rate, periods),
        })?;
    }
    Ok(factor)
}
