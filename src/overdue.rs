use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_OVERDUE_THRESHOLD_DAYS, DEFAULT_PARALLEL_THRESHOLD};
use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::payments::{validate_installments, InstallmentStatus, ReconciledInstallment};
use crate::types::{CustomerId, LoanId, LoanRecord};

/// a loan together with its reconciled installments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioLoan {
    pub loan: LoanRecord,
    pub installments: Vec<ReconciledInstallment>,
}

impl PortfolioLoan {
    pub fn new(loan: LoanRecord, installments: Vec<ReconciledInstallment>) -> Self {
        Self { loan, installments }
    }
}

/// overdue exposure of a single loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueSummary {
    pub overdue_amount: Money,
    pub overdue_installments: u32,
    /// days since the earliest overdue due date
    pub days_overdue: u32,
    /// earliest obligation still unmet
    pub next_payment_due: NaiveDate,
}

/// report line for a loan with overdue installments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueLoanEntry {
    pub loan_id: LoanId,
    pub customer_id: CustomerId,
    pub principal: Money,
    pub start_date: NaiveDate,
    pub maturity_date: NaiveDate,
    pub earliest_overdue_due: NaiveDate,
    #[serde(flatten)]
    pub summary: OverdueSummary,
}

/// loan left out of a report because its schedule could not be trusted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedLoan {
    pub loan_id: LoanId,
    pub reason: String,
}

/// overdue exposure across a portfolio, worst first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioOverdueReport {
    pub entries: Vec<OverdueLoanEntry>,
    pub total_count: usize,
    pub total_overdue_amount: Money,
    pub threshold_days: u32,
    pub generated_on: NaiveDate,
    pub skipped: Vec<SkippedLoan>,
}

impl PortfolioOverdueReport {
    pub fn entry(&self, loan_id: LoanId) -> Option<&OverdueLoanEntry> {
        self.entries.iter().find(|e| e.loan_id == loan_id)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

enum LoanOutcome {
    Overdue(OverdueLoanEntry),
    Clear,
    Skipped(SkippedLoan),
}

/// flags overdue installments and aggregates exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverdueDetector {
    pub threshold_days: u32,
    pub parallel_threshold: usize,
}

impl Default for OverdueDetector {
    fn default() -> Self {
        Self::new(DEFAULT_OVERDUE_THRESHOLD_DAYS)
    }
}

impl OverdueDetector {
    pub fn new(threshold_days: u32) -> Self {
        Self {
            threshold_days,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    pub fn with_parallel_threshold(mut self, loans: usize) -> Self {
        self.parallel_threshold = loans.max(1);
        self
    }

    /// due dates strictly before this day are past the grace period
    fn cutoff(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_days(Days::new(u64::from(self.threshold_days)))
            .unwrap_or(NaiveDate::MIN)
    }

    /// summarize one loan; `None` when nothing is past the grace period
    pub fn summarize(
        &self,
        loan: &LoanRecord,
        installments: &[ReconciledInstallment],
        today: NaiveDate,
    ) -> Result<Option<OverdueLoanEntry>> {
        validate_installments(loan.id, &loan.terms, installments.iter().map(|i| &i.installment))?;

        let cutoff = self.cutoff(today);
        let flagged: Vec<&ReconciledInstallment> = installments
            .iter()
            .filter(|i| i.status == InstallmentStatus::Overdue && i.due_date() < cutoff)
            .collect();

        let Some(earliest_overdue_due) = flagged.iter().map(|i| i.due_date()).min() else {
            return Ok(None);
        };

        let overdue_amount: Money = flagged.iter().map(|i| i.expected_amount()).sum();
        let days_overdue = (today - earliest_overdue_due).num_days();
        let next_payment_due = installments
            .iter()
            .filter(|i| i.status.is_unpaid())
            .map(|i| i.due_date())
            .min()
            .unwrap_or(earliest_overdue_due);

        Ok(Some(OverdueLoanEntry {
            loan_id: loan.id,
            customer_id: loan.customer_id,
            principal: loan.terms.principal,
            start_date: loan.terms.start_date,
            maturity_date: loan.terms.maturity_date()?,
            earliest_overdue_due,
            summary: OverdueSummary {
                overdue_amount,
                overdue_installments: flagged.len() as u32,
                days_overdue: u32::try_from(days_overdue).unwrap_or(u32::MAX),
                next_payment_due,
            },
        }))
    }

    fn assess(&self, item: &PortfolioLoan, today: NaiveDate) -> Option<LoanOutcome> {
        if !item.loan.is_active() {
            return None;
        }
        let outcome = match self.summarize(&item.loan, &item.installments, today) {
            Ok(Some(entry)) => LoanOutcome::Overdue(entry),
            Ok(None) => LoanOutcome::Clear,
            Err(LoanError::MalformedSchedule { loan_id, reason }) => {
                LoanOutcome::Skipped(SkippedLoan { loan_id, reason })
            }
            Err(err) => LoanOutcome::Skipped(SkippedLoan {
                loan_id: item.loan.id,
                reason: err.to_string(),
            }),
        };
        Some(outcome)
    }

    /// scan active loans and build the portfolio report
    pub fn detect(&self, portfolio: &[PortfolioLoan], today: NaiveDate) -> PortfolioOverdueReport {
        let outcomes = maybe_parallel_map(portfolio, self.parallel_threshold, |item| {
            self.assess(item, today)
        });

        let mut entries = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes.into_iter().flatten() {
            match outcome {
                LoanOutcome::Overdue(entry) => entries.push(entry),
                LoanOutcome::Clear => {}
                LoanOutcome::Skipped(skip) => {
                    tracing::warn!(
                        loan_id = %skip.loan_id,
                        reason = %skip.reason,
                        "skipping loan with malformed schedule"
                    );
                    skipped.push(skip);
                }
            }
        }

        // stable: equally overdue loans keep portfolio order
        entries.sort_by(|a, b| b.summary.days_overdue.cmp(&a.summary.days_overdue));

        let total_overdue_amount: Money = entries.iter().map(|e| e.summary.overdue_amount).sum();

        PortfolioOverdueReport {
            total_count: entries.len(),
            total_overdue_amount,
            entries,
            threshold_days: self.threshold_days,
            generated_on: today,
            skipped,
        }
    }
}

/// map sequentially, or on the rayon pool once the input is large enough
fn maybe_parallel_map<T, R, F>(items: &[T], threshold: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        if items.len() >= threshold {
            use rayon::prelude::*;
            return items.par_iter().map(f).collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = threshold;

    items.iter().map(f).collect()
}
