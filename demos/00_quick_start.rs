/// quick start - quote a loan and print its schedule
use chrono::NaiveDate;
use loan_ledger_rs::{LoanTerms, Money, PricingModel, Rate, RateCalculator, ScheduleGenerator};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // $100,000 over 12 months at 12% p.a.
    let terms = LoanTerms::new(
        Money::from_major(100_000),
        Rate::from_percentage(dec!(12)),
        12,
        PricingModel::Diminishing,
        NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("bad date")?,
    );

    // compare both pricing models
    for model in [PricingModel::Flat, PricingModel::Diminishing] {
        let quote = RateCalculator::quote(&LoanTerms {
            pricing_model: model,
            ..terms.clone()
        })?;
        println!(
            "{:<12} emi {:>10}  interest {:>10}  payable {:>11}",
            model, quote.emi, quote.total_interest, quote.total_payable
        );
    }

    let schedule = ScheduleGenerator::generate(&terms)?;
    println!("\n  #  due date        amount   principal   interest     balance");
    for row in &schedule.installments {
        println!(
            "{:>3}  {}  {:>10}  {:>10}  {:>9}  {:>10}",
            row.sequence, row.due_date, row.amount, row.principal, row.interest, row.remaining_principal
        );
    }

    Ok(())
}
