pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod interest;
pub mod overdue;
pub mod payments;
pub mod repository;
pub mod types;

// re-export key types
pub use config::EngineConfig;
pub use decimal::{Money, Rate};
pub use engine::LoanEngine;
pub use errors::{LoanError, Result};
pub use interest::{InstallmentCalculator, LoanQuote, RateCalculator};
pub use overdue::{
    OverdueDetector, OverdueLoanEntry, OverdueSummary, PortfolioLoan, PortfolioOverdueReport,
    SkippedLoan,
};
pub use payments::{
    AmortizationSchedule, InstallmentStatus, PaymentReconciler, ReconciledInstallment,
    ReconciledSchedule, ScheduleGenerator, ScheduledInstallment, StatusCounts,
};
pub use repository::{InMemoryLoanBook, LoanRepository, TransactionRepository};
pub use types::{
    ActualPayment, CustomerId, LoanId, LoanRecord, LoanStatus, LoanTerms, PricingModel,
    Transaction, TransactionId, TransactionType,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
