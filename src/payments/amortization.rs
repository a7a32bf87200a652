use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::interest::{calculator_for, RateCalculator};
use crate::types::{LoanId, LoanTerms};

/// one row of an amortization schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledInstallment {
    pub sequence: u32,
    pub due_date: NaiveDate,
    pub amount: Money,
    pub principal: Money,
    pub interest: Money,
    /// principal still owed after this installment is paid
    pub remaining_principal: Money,
}

/// amortization schedule projected from loan terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub terms: LoanTerms,
    pub emi: Money,
    pub installments: Vec<ScheduledInstallment>,
    pub total_principal: Money,
    pub total_interest: Money,
    pub total_payable: Money,
}

impl AmortizationSchedule {
    /// get installment by 1-based sequence number
    pub fn installment(&self, sequence: u32) -> Option<&ScheduledInstallment> {
        sequence
            .checked_sub(1)
            .and_then(|idx| self.installments.get(idx as usize))
    }

    /// remaining principal after the given installment
    pub fn balance_after(&self, sequence: u32) -> Money {
        self.installment(sequence)
            .map(|i| i.remaining_principal)
            .unwrap_or(self.terms.principal)
    }

    pub fn len(&self) -> usize {
        self.installments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.installments.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// builds amortization schedules from loan terms
pub struct ScheduleGenerator;

impl ScheduleGenerator {
    /// generate the full schedule; either all `term_months` rows or an error
    pub fn generate(terms: &LoanTerms) -> Result<AmortizationSchedule> {
        let emi = RateCalculator::emi(terms)?;
        let calculator = calculator_for(terms.pricing_model);
        let term = terms.term_months;

        let mut installments = Vec::with_capacity(term as usize);
        let mut remaining = terms.principal;

        for sequence in 1..=term {
            let due_date = terms.due_date(sequence)?;
            let split = calculator.split_period(terms, emi, remaining);

            // the last row takes whatever principal is left so the balance lands on zero
            let principal = if sequence == term {
                remaining
            } else {
                split.principal.max(Money::ZERO).min(remaining)
            };

            remaining = (remaining - principal).max(Money::ZERO);

            installments.push(ScheduledInstallment {
                sequence,
                due_date,
                amount: principal + split.interest,
                principal,
                interest: split.interest,
                remaining_principal: remaining,
            });
        }

        let total_principal: Money = installments.iter().map(|i| i.principal).sum();
        let total_interest: Money = installments.iter().map(|i| i.interest).sum();

        Ok(AmortizationSchedule {
            terms: terms.clone(),
            emi,
            installments,
            total_principal,
            total_interest,
            total_payable: total_principal + total_interest,
        })
    }
}

/// check that installments are a complete schedule for the given terms
pub fn validate_installments<'a, I>(loan_id: LoanId, terms: &LoanTerms, installments: I) -> Result<()>
where
    I: IntoIterator<Item = &'a ScheduledInstallment>,
{
    let mut count = 0u32;
    let mut last_balance = None;
    for installment in installments {
        count += 1;
        last_balance = Some(installment.remaining_principal);
    }

    let malformed = |reason: String| LoanError::MalformedSchedule { loan_id, reason };

    let Some(final_balance) = last_balance else {
        return Err(malformed("schedule has no installments".to_string()));
    };
    if count != terms.term_months {
        return Err(malformed(format!(
            "expected {} installments, found {}",
            terms.term_months, count
        )));
    }
    if !final_balance.is_zero() {
        return Err(malformed(format!(
            "final remaining principal is {}, expected 0.00",
            final_balance
        )));
    }
    Ok(())
}
