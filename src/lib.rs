//! Expense tracker - household expenses with tax-deductible reporting
//!
//! This library provides the core of the expense tracker: expenses grouped by
//! type, per-person allocation of medical costs, insurance claim tracking,
//! invoice storage and the yearly tax-deductible report, alongside income,
//! fixed expenses, loans, investments and payment methods.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models (expenses, people, invoices, etc.)
//! - `storage`: SQLite storage layer
//! - `services`: Business logic layer
//! - `reports`: Tax-deductible, merchant and monthly reports
//! - `export`: CSV export
//! - `display`: Terminal formatting helpers
//! - `api`: JSON HTTP API
//! - `cli`: Command-line handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use expense_tracker::config::paths::TrackerPaths;
//! use expense_tracker::reports::TaxDeductibleReport;
//! use expense_tracker::storage::Storage;
//!
//! let storage = Storage::open(TrackerPaths::new()?)?;
//! let report = TaxDeductibleReport::generate(&storage, 2025, None)?;
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod models;
pub mod reports;
pub mod services;
pub mod storage;

pub use error::{TrackerError, TrackerResult};
