use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::Result;
use crate::payments::amortization::{AmortizationSchedule, ScheduledInstallment};
use crate::types::{ActualPayment, LoanId};

/// repayment status of a scheduled installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstallmentStatus {
    /// not yet due and not paid
    Upcoming,
    /// paid on or before the due date
    Paid,
    /// paid after the due date
    Late,
    /// past due and not paid
    Overdue,
}

impl InstallmentStatus {
    /// classify an installment from its due date and the date it was paid, if any
    pub fn classify(due_date: NaiveDate, paid_on: Option<NaiveDate>, today: NaiveDate) -> Self {
        match paid_on {
            Some(paid) if paid <= due_date => InstallmentStatus::Paid,
            Some(_) => InstallmentStatus::Late,
            None if due_date >= today => InstallmentStatus::Upcoming,
            None => InstallmentStatus::Overdue,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, InstallmentStatus::Paid | InstallmentStatus::Late)
    }

    /// still an open obligation
    pub fn is_unpaid(&self) -> bool {
        matches!(self, InstallmentStatus::Upcoming | InstallmentStatus::Overdue)
    }
}

/// scheduled installment with the payment matched to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledInstallment {
    #[serde(flatten)]
    pub installment: ScheduledInstallment,
    pub status: InstallmentStatus,
    pub payment: Option<ActualPayment>,
}

impl ReconciledInstallment {
    pub fn due_date(&self) -> NaiveDate {
        self.installment.due_date
    }

    pub fn expected_amount(&self) -> Money {
        self.installment.amount
    }

    pub fn paid_on(&self) -> Option<NaiveDate> {
        self.payment.as_ref().map(|p| p.payment_date)
    }

    pub fn paid_amount(&self) -> Option<Money> {
        self.payment.as_ref().map(|p| p.amount)
    }
}

/// matches actual payments to scheduled installments
pub struct PaymentReconciler;

impl PaymentReconciler {
    /// reconcile payments against the schedule as of `today`
    ///
    /// Payments are taken in date order, ties in input order. Each installment first
    /// takes the earliest unmatched payment made in its due month. Installments still
    /// unmatched then take an unmatched payment made early, within the month before
    /// the due date. A payment settles at most one installment, whatever its amount.
    pub fn reconcile(
        installments: &[ScheduledInstallment],
        payments: &[ActualPayment],
        today: NaiveDate,
    ) -> Vec<ReconciledInstallment> {
        let mut order: Vec<usize> = (0..payments.len()).collect();
        order.sort_by_key(|&idx| payments[idx].payment_date);

        let mut consumed = vec![false; payments.len()];
        let mut matches: Vec<Option<usize>> = vec![None; installments.len()];

        for (slot, installment) in matches.iter_mut().zip(installments) {
            *slot = take_first(&order, &mut consumed, |payment| {
                same_month(payments[payment].payment_date, installment.due_date)
            });
        }

        for (slot, installment) in matches.iter_mut().zip(installments) {
            if slot.is_some() {
                continue;
            }
            *slot = take_first(&order, &mut consumed, |payment| {
                paid_early(payments[payment].payment_date, installment.due_date)
            });
        }

        installments
            .iter()
            .zip(matches)
            .map(|(installment, matched)| {
                let payment = matched.map(|idx| payments[idx].clone());
                let status = InstallmentStatus::classify(
                    installment.due_date,
                    payment.as_ref().map(|p| p.payment_date),
                    today,
                );
                ReconciledInstallment {
                    installment: installment.clone(),
                    status,
                    payment,
                }
            })
            .collect()
    }
}

fn take_first<F>(order: &[usize], consumed: &mut [bool], accept: F) -> Option<usize>
where
    F: Fn(usize) -> bool,
{
    let found = order
        .iter()
        .copied()
        .find(|&idx| !consumed[idx] && accept(idx))?;
    consumed[found] = true;
    Some(found)
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

fn paid_early(paid: NaiveDate, due: NaiveDate) -> bool {
    match due.checked_sub_months(Months::new(1)) {
        Some(window_start) => paid > window_start && paid < due,
        None => paid < due,
    }
}

/// per-status installment counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub upcoming: u32,
    pub paid: u32,
    pub late: u32,
    pub overdue: u32,
}

impl StatusCounts {
    pub fn tally<'a, I>(installments: I) -> Self
    where
        I: IntoIterator<Item = &'a ReconciledInstallment>,
    {
        let mut counts = StatusCounts::default();
        for installment in installments {
            match installment.status {
                InstallmentStatus::Upcoming => counts.upcoming += 1,
                InstallmentStatus::Paid => counts.paid += 1,
                InstallmentStatus::Late => counts.late += 1,
                InstallmentStatus::Overdue => counts.overdue += 1,
            }
        }
        counts
    }
}

/// a loan's schedule reconciled against its repayments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledSchedule {
    pub loan_id: LoanId,
    pub as_of: NaiveDate,
    pub installments: Vec<ReconciledInstallment>,
    pub counts: StatusCounts,
    pub total_payable: Money,
    /// every repayment received, matched or not
    pub total_repaid: Money,
    /// payable minus repaid; negative when the borrower overpaid
    pub outstanding_balance: Money,
}

impl ReconciledSchedule {
    pub fn build(
        loan_id: LoanId,
        schedule: &AmortizationSchedule,
        payments: &[ActualPayment],
        today: NaiveDate,
    ) -> Self {
        let installments = PaymentReconciler::reconcile(&schedule.installments, payments, today);
        let total_repaid: Money = payments.iter().map(|p| p.amount).sum();

        Self {
            loan_id,
            as_of: today,
            counts: StatusCounts::tally(&installments),
            installments,
            total_payable: schedule.total_payable,
            total_repaid,
            outstanding_balance: schedule.total_payable - total_repaid,
        }
    }

    /// scheduled amount of the installments already settled, on time or late
    pub fn amount_settled(&self) -> Money {
        self.installments
            .iter()
            .filter(|i| i.status.is_settled())
            .map(|i| i.expected_amount())
            .sum()
    }

    /// earliest installment still owed
    pub fn next_unpaid(&self) -> Option<&ReconciledInstallment> {
        self.installments
            .iter()
            .filter(|i| i.status.is_unpaid())
            .min_by_key(|i| i.due_date())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::payments::amortization::ScheduleGenerator;
    use crate::types::{LoanTerms, PricingModel};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn installment(sequence: u32, due_date: NaiveDate, amount: &str) -> ScheduledInstallment {
        ScheduledInstallment {
            sequence,
            due_date,
            amount: Money::from_str_exact(amount).unwrap(),
            principal: Money::ZERO,
            interest: Money::ZERO,
            remaining_principal: Money::ZERO,
        }
    }

    fn payment(loan_id: LoanId, amount: &str, on: NaiveDate) -> ActualPayment {
        ActualPayment::new(loan_id, Money::from_str_exact(amount).unwrap(), on)
    }

    #[test]
    fn test_classification_table() {
        let due = date(2024, 3, 1);
        let today = date(2024, 3, 10);

        assert_eq!(InstallmentStatus::classify(due, Some(date(2024, 2, 28)), today), InstallmentStatus::Paid);
        assert_eq!(InstallmentStatus::classify(due, Some(due), today), InstallmentStatus::Paid);
        assert_eq!(InstallmentStatus::classify(due, Some(date(2024, 3, 15)), today), InstallmentStatus::Late);
        assert_eq!(InstallmentStatus::classify(due, None, today), InstallmentStatus::Overdue);
        assert_eq!(InstallmentStatus::classify(due, None, due), InstallmentStatus::Upcoming);
        assert_eq!(InstallmentStatus::classify(due, None, date(2024, 2, 1)), InstallmentStatus::Upcoming);
    }

    #[test]
    fn test_early_payment_is_paid() {
        let loan_id = Uuid::new_v4();
        let schedule = vec![installment(3, date(2024, 3, 1), "8884.88")];
        let payments = vec![payment(loan_id, "8884.88", date(2024, 2, 28))];

        let result = PaymentReconciler::reconcile(&schedule, &payments, date(2024, 4, 1));

        assert_eq!(result[0].status, InstallmentStatus::Paid);
        assert_eq!(result[0].paid_on(), Some(date(2024, 2, 28)));
        assert_eq!(result[0].paid_amount(), Some(Money::from_str_exact("8884.88").unwrap()));
    }

    #[test]
    fn test_payment_after_due_in_same_month_is_late() {
        let loan_id = Uuid::new_v4();
        let schedule = vec![installment(3, date(2024, 3, 1), "8884.88")];
        let payments = vec![payment(loan_id, "8884.88", date(2024, 3, 15))];

        let result = PaymentReconciler::reconcile(&schedule, &payments, date(2024, 4, 1));
        assert_eq!(result[0].status, InstallmentStatus::Late);
    }

    #[test]
    fn test_missing_payment_in_past_is_overdue() {
        let schedule = vec![installment(3, date(2024, 3, 1), "8884.88")];

        let result = PaymentReconciler::reconcile(&schedule, &[], date(2024, 4, 1));
        assert_eq!(result[0].status, InstallmentStatus::Overdue);
        assert!(result[0].payment.is_none());
    }

    #[test]
    fn test_payment_settles_one_installment() {
        let loan_id = Uuid::new_v4();
        let schedule = vec![
            installment(1, date(2024, 2, 1), "100.00"),
            installment(2, date(2024, 3, 1), "100.00"),
        ];
        // one payment in february: it belongs to the february installment only
        let payments = vec![payment(loan_id, "100.00", date(2024, 2, 1))];

        let result = PaymentReconciler::reconcile(&schedule, &payments, date(2024, 3, 20));
        assert_eq!(result[0].status, InstallmentStatus::Paid);
        assert_eq!(result[1].status, InstallmentStatus::Overdue);
    }

    #[test]
    fn test_same_month_match_wins_over_early_match() {
        let loan_id = Uuid::new_v4();
        let schedule = vec![
            installment(1, date(2024, 2, 1), "100.00"),
            installment(2, date(2024, 3, 1), "100.00"),
        ];
        let payments = vec![
            payment(loan_id, "100.00", date(2024, 2, 28)),
            payment(loan_id, "100.00", date(2024, 2, 1)),
        ];

        let result = PaymentReconciler::reconcile(&schedule, &payments, date(2024, 3, 20));

        // the earliest february payment settles february, the later one pays march early
        assert_eq!(result[0].paid_on(), Some(date(2024, 2, 1)));
        assert_eq!(result[0].status, InstallmentStatus::Paid);
        assert_eq!(result[1].paid_on(), Some(date(2024, 2, 28)));
        assert_eq!(result[1].status, InstallmentStatus::Paid);
    }

    #[test]
    fn test_underpayment_still_settles() {
        let loan_id = Uuid::new_v4();
        let schedule = vec![installment(1, date(2024, 2, 1), "100.00")];
        let payments = vec![payment(loan_id, "1.00", date(2024, 2, 1))];

        let result = PaymentReconciler::reconcile(&schedule, &payments, date(2024, 3, 1));
        assert_eq!(result[0].status, InstallmentStatus::Paid);
    }

    #[test]
    fn test_stale_payments_do_not_match() {
        let loan_id = Uuid::new_v4();
        let schedule = vec![installment(1, date(2024, 5, 10), "100.00")];
        let payments = vec![payment(loan_id, "100.00", date(2024, 1, 15))];

        let result = PaymentReconciler::reconcile(&schedule, &payments, date(2024, 6, 1));
        assert_eq!(result[0].status, InstallmentStatus::Overdue);
    }

    #[test]
    fn test_reconciliation_is_deterministic() {
        let loan_id = Uuid::new_v4();
        let terms = LoanTerms::new(
            Money::from_major(100_000),
            Rate::from_percentage(dec!(12)),
            12,
            PricingModel::Diminishing,
            date(2024, 1, 1),
        );
        let schedule = ScheduleGenerator::generate(&terms).unwrap();
        let payments = vec![
            payment(loan_id, "8884.88", date(2024, 3, 5)),
            payment(loan_id, "8884.88", date(2024, 2, 1)),
            payment(loan_id, "8884.88", date(2024, 4, 1)),
        ];

        let first = PaymentReconciler::reconcile(&schedule.installments, &payments, date(2024, 6, 15));
        let second = PaymentReconciler::reconcile(&schedule.installments, &payments, date(2024, 6, 15));
        assert_eq!(first, second);

        let statuses: Vec<_> = first.iter().take(6).map(|i| i.status).collect();
        assert_eq!(
            statuses,
            vec![
                InstallmentStatus::Paid,    // feb 1
                InstallmentStatus::Late,    // mar 5
                InstallmentStatus::Paid,    // apr 1
                InstallmentStatus::Overdue, // may 1
                InstallmentStatus::Overdue, // jun 1
                InstallmentStatus::Upcoming,
            ]
        );
    }

    #[test]
    fn test_reconciled_schedule_totals() {
        let loan_id = Uuid::new_v4();
        let terms = LoanTerms::new(
            Money::from_major(120_000),
            Rate::from_percentage(dec!(12)),
            12,
            PricingModel::Flat,
            date(2024, 1, 1),
        );
        let schedule = ScheduleGenerator::generate(&terms).unwrap();
        let payments = vec![
            payment(loan_id, "11200.00", date(2024, 2, 1)),
            payment(loan_id, "11200.00", date(2024, 3, 10)),
            // extra repayment with no installment in its month
            payment(loan_id, "500.00", date(2023, 12, 1)),
        ];

        let reconciled = ReconciledSchedule::build(loan_id, &schedule, &payments, date(2024, 4, 15));

        assert_eq!(reconciled.installments.len(), 12);
        assert_eq!(
            reconciled.counts,
            StatusCounts { upcoming: 9, paid: 1, late: 1, overdue: 1 }
        );
        assert_eq!(reconciled.total_payable, Money::from_major(134_400));
        assert_eq!(reconciled.total_repaid, Money::from_major(22_900));
        assert_eq!(reconciled.outstanding_balance, Money::from_major(111_500));
        assert_eq!(reconciled.next_unpaid().unwrap().installment.sequence, 3);
        // the unmatched 500.00 counts as repaid but settles nothing
        assert_eq!(reconciled.amount_settled(), Money::from_major(22_400));
    }

    #[test]
    fn test_reconciled_json_flattens_installment() {
        let schedule = vec![installment(1, date(2024, 2, 1), "100.00")];
        let result = PaymentReconciler::reconcile(&schedule, &[], date(2024, 1, 1));

        let value = serde_json::to_value(&result[0]).unwrap();
        assert_eq!(value["sequence"], 1);
        assert_eq!(value["amount"], "100.00");
        assert_eq!(value["status"], "Upcoming");
        assert!(value["payment"].is_null());
    }
}
