//! The billing engine: pure charge arithmetic and the accrual scheduler.

pub mod calculator;
pub mod scheduler;

pub use calculator::{monthly_charge, prorated_charge};
pub use scheduler::{run_accrual_pass, AccrualRunSummary, BillingAction, SkipReason};
