//! Services for subscriber-billing.

pub mod database;
pub mod store;

pub use database::Database;
