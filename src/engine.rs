use std::collections::HashMap;
use std::sync::Arc;

use hourglass_rs::{SafeTimeProvider, TimeSource};
use parking_lot::RwLock;

use crate::config::EngineConfig;
use crate::errors::{LoanError, Result};
use crate::interest::{LoanQuote, RateCalculator};
use crate::overdue::{OverdueDetector, PortfolioLoan, PortfolioOverdueReport, SkippedLoan};
use crate::payments::{AmortizationSchedule, PaymentReconciler, ReconciledSchedule, ScheduleGenerator};
use crate::repository::{LoanRepository, TransactionRepository};
use crate::types::{LoanId, LoanRecord, LoanTerms};

/// generated schedules keyed by loan id, along with the terms they came from
#[derive(Debug, Default)]
struct ScheduleCache {
    entries: RwLock<HashMap<LoanId, (LoanTerms, Arc<AmortizationSchedule>)>>,
}

impl ScheduleCache {
    fn get(&self, loan_id: LoanId, terms: &LoanTerms) -> Option<Arc<AmortizationSchedule>> {
        self.entries
            .read()
            .get(&loan_id)
            .filter(|(cached_terms, _)| cached_terms == terms)
            .map(|(_, schedule)| Arc::clone(schedule))
    }

    fn insert(&self, loan_id: LoanId, schedule: Arc<AmortizationSchedule>) {
        self.entries
            .write()
            .insert(loan_id, (schedule.terms.clone(), schedule));
    }

    fn remove(&self, loan_id: LoanId) -> bool {
        self.entries.write().remove(&loan_id).is_some()
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

/// entry point tying loans, repayments and the calculators together
pub struct LoanEngine<L, T> {
    loans: L,
    transactions: T,
    config: EngineConfig,
    cache: ScheduleCache,
}

impl<L, T> LoanEngine<L, T>
where
    L: LoanRepository,
    T: TransactionRepository,
{
    pub fn new(loans: L, transactions: T) -> Self {
        Self {
            loans,
            transactions,
            config: EngineConfig::default(),
            cache: ScheduleCache::default(),
        }
    }

    pub fn with_config(loans: L, transactions: T, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            loans,
            transactions,
            config,
            cache: ScheduleCache::default(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn loans(&self) -> &L {
        &self.loans
    }

    pub fn transactions(&self) -> &T {
        &self.transactions
    }

    /// installment and totals for prospective terms
    pub fn quote(&self, terms: &LoanTerms) -> Result<LoanQuote> {
        RateCalculator::quote(terms)
    }

    fn load_loan(&self, loan_id: LoanId) -> Result<LoanRecord> {
        self.loans
            .get_loan(loan_id)?
            .ok_or(LoanError::LoanNotFound { loan_id })
    }

    fn schedule_for(&self, loan: &LoanRecord) -> Result<Arc<AmortizationSchedule>> {
        if self.config.cache_schedules {
            if let Some(schedule) = self.cache.get(loan.id, &loan.terms) {
                return Ok(schedule);
            }
        }

        let schedule = Arc::new(ScheduleGenerator::generate(&loan.terms)?);
        tracing::debug!(
            loan_id = %loan.id,
            model = %loan.terms.pricing_model,
            installments = schedule.len(),
            emi = %schedule.emi,
            "computed amortization schedule"
        );

        if self.config.cache_schedules {
            self.cache.insert(loan.id, Arc::clone(&schedule));
        }
        Ok(schedule)
    }

    /// amortization schedule of a stored loan
    pub fn compute_schedule(&self, loan_id: LoanId) -> Result<Arc<AmortizationSchedule>> {
        let loan = self.load_loan(loan_id)?;
        self.schedule_for(&loan)
    }

    /// schedule of a stored loan reconciled against its repayments
    pub fn compute_reconciled_schedule(
        &self,
        loan_id: LoanId,
        time_provider: &SafeTimeProvider,
    ) -> Result<ReconciledSchedule> {
        let today = time_provider.now().date_naive();
        let loan = self.load_loan(loan_id)?;
        let schedule = self.schedule_for(&loan)?;
        let payments = self.transactions.list_repayments(loan_id)?;

        let reconciled = ReconciledSchedule::build(loan_id, &schedule, &payments, today);
        tracing::debug!(
            loan_id = %loan_id,
            paid = reconciled.counts.paid,
            late = reconciled.counts.late,
            overdue = reconciled.counts.overdue,
            settled = %reconciled.amount_settled(),
            "reconciled schedule"
        );
        Ok(reconciled)
    }

    /// reconcile against the wall clock
    pub fn compute_reconciled_schedule_now(&self, loan_id: LoanId) -> Result<ReconciledSchedule> {
        self.compute_reconciled_schedule(loan_id, &SafeTimeProvider::new(TimeSource::System))
    }

    /// overdue report across all active loans
    ///
    /// `threshold_days` falls back to the configured grace period. Loans whose
    /// schedule cannot be built or fails validation are listed as skipped;
    /// repository failures abort the report.
    pub fn compute_overdue_report(
        &self,
        threshold_days: Option<u32>,
        time_provider: &SafeTimeProvider,
    ) -> Result<PortfolioOverdueReport> {
        let today = time_provider.now().date_naive();
        let threshold = threshold_days.unwrap_or(self.config.overdue_threshold_days);

        let mut portfolio = Vec::new();
        let mut unscheduled = Vec::new();
        for loan in self.loans.list_active_loans()? {
            let schedule = match self.schedule_for(&loan) {
                Ok(schedule) => schedule,
                Err(err) if err.is_validation() || matches!(err, LoanError::Calculation { .. }) => {
                    tracing::warn!(loan_id = %loan.id, error = %err, "skipping loan without a schedule");
                    unscheduled.push(SkippedLoan {
                        loan_id: loan.id,
                        reason: err.to_string(),
                    });
                    continue;
                }
                Err(err) => return Err(err),
            };
            let payments = self.transactions.list_repayments(loan.id)?;
            let installments = PaymentReconciler::reconcile(&schedule.installments, &payments, today);
            portfolio.push(PortfolioLoan::new(loan, installments));
        }

        let detector =
            OverdueDetector::new(threshold).with_parallel_threshold(self.config.parallel_threshold);
        let mut report = detector.detect(&portfolio, today);
        unscheduled.append(&mut report.skipped);
        report.skipped = unscheduled;

        tracing::info!(
            threshold_days = threshold,
            loans = portfolio.len(),
            overdue_loans = report.total_count,
            total_overdue = %report.total_overdue_amount,
            skipped = report.skipped.len(),
            "overdue report generated"
        );
        Ok(report)
    }

    /// overdue report against the wall clock
    pub fn compute_overdue_report_now(
        &self,
        threshold_days: Option<u32>,
    ) -> Result<PortfolioOverdueReport> {
        self.compute_overdue_report(threshold_days, &SafeTimeProvider::new(TimeSource::System))
    }

    /// drop the cached schedule of a loan; true when one was cached
    pub fn invalidate_schedule(&self, loan_id: LoanId) -> bool {
        self.cache.remove(loan_id)
    }

    pub fn cached_schedules(&self) -> usize {
        self.cache.len()
    }
}
