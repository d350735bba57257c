pub mod config;
pub mod engine;
pub mod models;
pub mod reports;
pub mod services;
pub mod startup;
