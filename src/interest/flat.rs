use rust_decimal::Decimal;

use crate::decimal::Money;
use crate::errors::Result;
use crate::interest::{InstallmentCalculator, PeriodSplit};
use crate::types::LoanTerms;

/// flat-rate pricing: interest charged on the original principal every period
pub struct FlatRate;

impl FlatRate {
    /// interest charged each month, before rounding
    pub fn monthly_interest(terms: &LoanTerms) -> Decimal {
        terms.principal.as_decimal() * terms.annual_rate.monthly_rate().as_decimal()
    }

    /// principal repaid each month, before rounding
    pub fn monthly_principal(terms: &LoanTerms) -> Decimal {
        terms.principal.as_decimal() / Decimal::from(terms.term_months)
    }
}

impl InstallmentCalculator for FlatRate {
    fn raw_installment(&self, terms: &LoanTerms) -> Result<Decimal> {
        Ok(Self::monthly_principal(terms) + Self::monthly_interest(terms))
    }

    fn split_period(&self, terms: &LoanTerms, emi: Money, _balance_before: Money) -> PeriodSplit {
        // balance does not matter: every period carries the same split
        let principal = Money::from_decimal(Self::monthly_principal(terms));
        PeriodSplit {
            principal,
            interest: emi - principal,
        }
    }

    fn total_interest(&self, terms: &LoanTerms, _emi: Money) -> Money {
        let years = Decimal::from(terms.term_months) / Decimal::from(12);
        Money::from_decimal(terms.principal.as_decimal() * terms.annual_rate.as_decimal() * years)
    }
}
