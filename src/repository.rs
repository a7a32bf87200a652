use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::{LoanError, Result};
use crate::payments::repayments_for;
use crate::types::{ActualPayment, LoanId, LoanRecord, LoanTerms, Transaction};

/// read access to loan records
pub trait LoanRepository: Send + Sync {
    fn get_loan(&self, loan_id: LoanId) -> Result<Option<LoanRecord>>;
    fn list_active_loans(&self) -> Result<Vec<LoanRecord>>;
}

/// read access to repayments
pub trait TransactionRepository: Send + Sync {
    /// repayments of one loan, in recorded order
    fn list_repayments(&self, loan_id: LoanId) -> Result<Vec<ActualPayment>>;
}

impl<R: LoanRepository + ?Sized> LoanRepository for Arc<R> {
    fn get_loan(&self, loan_id: LoanId) -> Result<Option<LoanRecord>> {
        (**self).get_loan(loan_id)
    }

    fn list_active_loans(&self) -> Result<Vec<LoanRecord>> {
        (**self).list_active_loans()
    }
}

impl<R: TransactionRepository + ?Sized> TransactionRepository for Arc<R> {
    fn list_repayments(&self, loan_id: LoanId) -> Result<Vec<ActualPayment>> {
        (**self).list_repayments(loan_id)
    }
}

/// in-memory loan book backing both repositories
#[derive(Debug, Default)]
pub struct InMemoryLoanBook {
    loans: RwLock<Vec<LoanRecord>>,
    transactions: RwLock<Vec<Transaction>>,
}

impl InMemoryLoanBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// add or replace a loan, keeping insertion order
    pub fn add_loan(&self, loan: LoanRecord) -> Result<()> {
        let mut loans = self.loans.write();
        match loans.iter_mut().find(|l| l.id == loan.id) {
            Some(existing) => *existing = loan,
            None => loans.push(loan),
        }
        Ok(())
    }

    pub fn add_transaction(&self, transaction: Transaction) -> Result<()> {
        self.transactions.write().push(transaction);
        Ok(())
    }

    /// replace the terms of a stored loan
    pub fn update_terms(&self, loan_id: LoanId, terms: LoanTerms) -> Result<()> {
        let mut loans = self.loans.write();
        let loan = loans
            .iter_mut()
            .find(|l| l.id == loan_id)
            .ok_or(LoanError::LoanNotFound { loan_id })?;
        loan.terms = terms;
        Ok(())
    }

    pub fn loan_count(&self) -> usize {
        self.loans.read().len()
    }

    /// transactions per loan, for quick inspection
    pub fn transaction_counts(&self) -> HashMap<LoanId, usize> {
        let mut counts = HashMap::new();
        for loan_id in self.transactions.read().iter().filter_map(|t| t.loan_id) {
            *counts.entry(loan_id).or_insert(0) += 1;
        }
        counts
    }
}

impl LoanRepository for InMemoryLoanBook {
    fn get_loan(&self, loan_id: LoanId) -> Result<Option<LoanRecord>> {
        Ok(self.loans.read().iter().find(|l| l.id == loan_id).cloned())
    }

    fn list_active_loans(&self) -> Result<Vec<LoanRecord>> {
        Ok(self.loans.read().iter().filter(|l| l.is_active()).cloned().collect())
    }
}

impl TransactionRepository for InMemoryLoanBook {
    fn list_repayments(&self, loan_id: LoanId) -> Result<Vec<ActualPayment>> {
        Ok(repayments_for(loan_id, self.transactions.read().iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Money, Rate};
    use crate::types::{LoanStatus, PricingModel, TransactionType};
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn loan(status: LoanStatus) -> LoanRecord {
        let terms = LoanTerms::new(
            Money::from_major(5_000),
            Rate::from_percentage(dec!(10)),
            6,
            PricingModel::Diminishing,
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        );
        LoanRecord::new(Uuid::new_v4(), terms, status)
    }

    fn repayment(loan: &LoanRecord, day: u32) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            loan_id: Some(loan.id),
            customer_id: loan.customer_id,
            amount: Money::from_major(860),
            transaction_type: TransactionType::Repayment,
            description: "monthly repayment".to_string(),
            date: Utc.with_ymd_and_hms(2024, 2, day, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_active_loans_only() {
        let book = InMemoryLoanBook::new();
        let active = loan(LoanStatus::Active);
        book.add_loan(active.clone()).unwrap();
        book.add_loan(loan(LoanStatus::Pending)).unwrap();
        book.add_loan(loan(LoanStatus::Completed)).unwrap();

        let listed = book.list_active_loans().unwrap();
        assert_eq!(listed, vec![active.clone()]);
        assert_eq!(book.get_loan(active.id).unwrap(), Some(active));
        assert_eq!(book.get_loan(Uuid::new_v4()).unwrap(), None);
        assert_eq!(book.loan_count(), 3);
    }

    #[test]
    fn test_add_loan_replaces_existing() {
        let book = InMemoryLoanBook::new();
        let mut record = loan(LoanStatus::Pending);
        book.add_loan(record.clone()).unwrap();

        record.status = LoanStatus::Active;
        book.add_loan(record.clone()).unwrap();

        assert_eq!(book.loan_count(), 1);
        assert_eq!(book.get_loan(record.id).unwrap().unwrap().status, LoanStatus::Active);
    }

    #[test]
    fn test_repayments_only() {
        let book = InMemoryLoanBook::new();
        let record = loan(LoanStatus::Active);
        book.add_loan(record.clone()).unwrap();

        book.add_transaction(repayment(&record, 15)).unwrap();
        let mut fee = repayment(&record, 16);
        fee.transaction_type = TransactionType::Fee;
        book.add_transaction(fee).unwrap();
        book.add_transaction(repayment(&record, 3)).unwrap();

        let payments = book.list_repayments(record.id).unwrap();
        let dates: Vec<_> = payments.iter().map(|p| p.payment_date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 3).unwrap(),
            ]
        );
        assert_eq!(book.transaction_counts().get(&record.id), Some(&3));
    }

    #[test]
    fn test_book_survives_panicking_writer() {
        let book = Arc::new(InMemoryLoanBook::new());
        let record = loan(LoanStatus::Active);
        book.add_loan(record.clone()).unwrap();
        book.add_transaction(repayment(&record, 15)).unwrap();

        let writer = Arc::clone(&book);
        let crashed = std::thread::spawn(move || {
            let _loans = writer.loans.write();
            let _transactions = writer.transactions.write();
            panic!("writer failed mid-update");
        })
        .join();
        assert!(crashed.is_err());

        assert_eq!(book.loan_count(), 1);
        assert_eq!(book.transaction_counts().get(&record.id), Some(&1));
        assert_eq!(book.list_active_loans().unwrap(), vec![record.clone()]);
        assert_eq!(book.list_repayments(record.id).unwrap().len(), 1);
        book.add_loan(loan(LoanStatus::Pending)).unwrap();
        assert_eq!(book.loan_count(), 2);
    }

    #[test]
    fn test_concurrent_writers() {
        let book = Arc::new(InMemoryLoanBook::new());
        let record = loan(LoanStatus::Active);
        book.add_loan(record.clone()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let book = Arc::clone(&book);
                let record = record.clone();
                std::thread::spawn(move || {
                    for day in 1..=10 {
                        book.add_transaction(repayment(&record, day)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(book.list_repayments(record.id).unwrap().len(), 80);
    }

    #[test]
    fn test_update_terms() {
        let book = InMemoryLoanBook::new();
        let record = loan(LoanStatus::Active);
        book.add_loan(record.clone()).unwrap();

        let mut terms = record.terms.clone();
        terms.term_months = 12;
        book.update_terms(record.id, terms).unwrap();
        assert_eq!(book.get_loan(record.id).unwrap().unwrap().terms.term_months, 12);

        assert!(matches!(
            book.update_terms(Uuid::new_v4(), record.terms),
            Err(LoanError::LoanNotFound { .. })
        ));
    }
}
