/// reconciliation - match repayments against the schedule with a controlled clock
use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use loan_ledger_rs::{
    InMemoryLoanBook, LoanEngine, LoanRecord, LoanStatus, LoanTerms, Money, PricingModel, Rate,
    SafeTimeProvider, TimeSource, Transaction, TransactionType, Uuid,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("loan_ledger_rs=debug")),
        )
        .init();

    let book = Arc::new(InMemoryLoanBook::new());
    let engine = LoanEngine::new(Arc::clone(&book), Arc::clone(&book));

    let loan = LoanRecord::new(
        Uuid::new_v4(),
        LoanTerms::new(
            Money::from_major(24_000),
            Rate::from_percentage(dec!(10)),
            12,
            PricingModel::Flat,
            NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("bad date")?,
        ),
        LoanStatus::Active,
    );
    book.add_loan(loan.clone())?;

    let emi = engine.compute_schedule(loan.id)?.emi;
    // on time, early, late
    for (y, m, d) in [(2024, 2, 1), (2024, 2, 27), (2024, 4, 6)] {
        book.add_transaction(Transaction {
            id: Uuid::new_v4(),
            loan_id: Some(loan.id),
            customer_id: loan.customer_id,
            amount: emi,
            transaction_type: TransactionType::Repayment,
            description: "monthly repayment".to_string(),
            date: Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).single().ok_or("bad date")?,
        })?;
    }

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 4, 10, 0, 0, 0).single().ok_or("bad date")?,
    ));
    let controller = time.test_control().ok_or("no test clock")?;

    let reconciled = engine.compute_reconciled_schedule(loan.id, &time)?;
    println!("as of {}", reconciled.as_of);
    for row in reconciled.installments.iter().take(5) {
        println!(
            "  #{:<2} due {}  {:?}  paid {}",
            row.installment.sequence,
            row.due_date(),
            row.status,
            row.paid_on().map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
        );
    }

    // two months later nothing else has come in
    controller.advance(Duration::days(60));
    let later = engine.compute_reconciled_schedule(loan.id, &time)?;
    println!(
        "\nas of {}: {} paid, {} late, {} overdue, settled {}, outstanding {}",
        later.as_of,
        later.counts.paid,
        later.counts.late,
        later.counts.overdue,
        later.amount_settled(),
        later.outstanding_balance
    );

    println!("\n{}", later.to_json()?);
    Ok(())
}
