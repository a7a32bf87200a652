use rust_decimal::Decimal;

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::interest::{compound_factor, InstallmentCalculator, PeriodSplit};
use crate::types::LoanTerms;

/// diminishing-balance pricing: interest charged on the remaining principal
pub struct DiminishingBalance;

impl InstallmentCalculator for DiminishingBalance {
    fn raw_installment(&self, terms: &LoanTerms) -> Result<Decimal> {
        let principal = terms.principal.as_decimal();
        let r = terms.annual_rate.monthly_rate().as_decimal();
        let n = terms.term_months;

        if r.is_zero() {
            return Ok(principal / Decimal::from(n));
        }

        // EMI = P * r * (1 + r)^n / ((1 + r)^n - 1)
        let compound = compound_factor(r, n)?;
        let denominator = compound - Decimal::ONE;
        if denominator.is_zero() {
            return Err(LoanError::Calculation {
                message: format!("monthly rate {} too small to amortize over {} months", r, n),
            });
        }

        principal
            .checked_mul(r)
            .and_then(|v| v.checked_mul(compound))
            .and_then(|v| v.checked_div(denominator))
            .ok_or_else(|| LoanError::Calculation {
                message: format!("installment overflows for principal {}", terms.principal),
            })
    }

    fn split_period(&self, terms: &LoanTerms, emi: Money, balance_before: Money) -> PeriodSplit {
        let r = terms.annual_rate.monthly_rate().as_decimal();
        let interest = Money::from_decimal(balance_before.as_decimal() * r);
        PeriodSplit {
            principal: emi - interest,
            interest,
        }
    }

    fn total_interest(&self, terms: &LoanTerms, emi: Money) -> Money {
        emi * Decimal::from(terms.term_months) - terms.principal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::types::PricingModel;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn terms(principal: i64, rate_pct: Decimal, term: u32) -> LoanTerms {
        LoanTerms::new(
            Money::from_major(principal),
            Rate::from_percentage(rate_pct),
            term,
            PricingModel::Diminishing,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
    }

    #[test]
    fn test_reference_installment() {
        let raw = DiminishingBalance.raw_installment(&terms(100_000, dec!(12), 12)).unwrap();
        assert_eq!(Money::from_decimal(raw), Money::from_str_exact("8884.88").unwrap());
        assert!(raw > dec!(8884.87) && raw < dec!(8884.89));
    }

    #[test]
    fn test_zero_rate_divides_principal_evenly() {
        let raw = DiminishingBalance.raw_installment(&terms(12_000, Decimal::ZERO, 12)).unwrap();
        assert_eq!(raw, dec!(1000));
    }

    #[test]
    fn test_split_uses_balance() {
        let t = terms(100_000, dec!(12), 12);
        let emi = Money::from_str_exact("8884.88").unwrap();

        let first = DiminishingBalance.split_period(&t, emi, Money::from_major(100_000));
        assert_eq!(first.interest, Money::from_major(1_000));
        assert_eq!(first.principal, Money::from_str_exact("7884.88").unwrap());

        let second = DiminishingBalance.split_period(&t, emi, Money::from_str_exact("92115.12").unwrap());
        assert_eq!(second.interest, Money::from_str_exact("921.15").unwrap());
        assert!(second.principal > first.principal);
    }

    #[test]
    fn test_overflowing_term_is_an_error() {
        let err = DiminishingBalance.raw_installment(&terms(1_000, dec!(1200), 120)).unwrap_err();
        assert!(matches!(err, LoanError::Calculation { .. }));
    }
}
