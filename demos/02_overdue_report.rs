/// overdue report - portfolio scan with a grace period
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use loan_ledger_rs::{
    EngineConfig, InMemoryLoanBook, LoanEngine, LoanRecord, LoanStatus, LoanTerms, Money,
    PricingModel, Rate, SafeTimeProvider, TimeSource, Uuid,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("loan_ledger_rs=info")),
        )
        .init();

    let config = EngineConfig::from_json(r#"{ "overdue_threshold_days": 5 }"#)?;
    let book = Arc::new(InMemoryLoanBook::new());
    let engine = LoanEngine::with_config(Arc::clone(&book), Arc::clone(&book), config)?;

    let starts = [(2024, 1, 10), (2024, 3, 20), (2024, 5, 12), (2024, 6, 1)];
    for (i, (y, m, d)) in starts.into_iter().enumerate() {
        let model = if i % 2 == 0 { PricingModel::Flat } else { PricingModel::Diminishing };
        let terms = LoanTerms::new(
            Money::from_major(10_000 * (i as i64 + 1)),
            Rate::from_percentage(dec!(14.5)),
            24,
            model,
            NaiveDate::from_ymd_opt(y, m, d).ok_or("bad date")?,
        );
        book.add_loan(LoanRecord::new(Uuid::new_v4(), terms, LoanStatus::Active))?;
    }

    // a loan with broken terms is reported as skipped
    let mut broken = LoanTerms::new(
        Money::from_major(5_000),
        Rate::from_percentage(dec!(9)),
        12,
        PricingModel::Flat,
        NaiveDate::from_ymd_opt(2024, 2, 1).ok_or("bad date")?,
    );
    broken.term_months = 0;
    book.add_loan(LoanRecord::new(Uuid::new_v4(), broken, LoanStatus::Active))?;

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).single().ok_or("bad date")?,
    ));
    let report = engine.compute_overdue_report(None, &time)?;

    println!(
        "{} loans overdue by more than {} days, {} in total",
        report.total_count, report.threshold_days, report.total_overdue_amount
    );
    for entry in &report.entries {
        println!(
            "  {}  {:>3} days  {:>2} installments  {:>10}  next due {}",
            entry.loan_id,
            entry.summary.days_overdue,
            entry.summary.overdue_installments,
            entry.summary.overdue_amount,
            entry.summary.next_payment_due
        );
    }
    for skipped in &report.skipped {
        println!("  skipped {}: {}", skipped.loan_id, skipped.reason);
    }

    Ok(())
}
