pub mod amortization;
pub mod reconciliation;

use crate::types::{ActualPayment, LoanId, Transaction};

pub use amortization::{
    validate_installments, AmortizationSchedule, ScheduleGenerator, ScheduledInstallment,
};
pub use reconciliation::{
    InstallmentStatus, PaymentReconciler, ReconciledInstallment, ReconciledSchedule, StatusCounts,
};

/// repayment transactions of a loan as actual payments, in input order
pub fn repayments_for<'a, I>(loan_id: LoanId, transactions: I) -> Vec<ActualPayment>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    transactions
        .into_iter()
        .filter_map(|tx| tx.as_payment_for(loan_id))
        .collect()
}
