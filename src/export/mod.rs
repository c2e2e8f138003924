//! Export module for the expense tracker
//!
//! CSV export of expenses in the importer's spreadsheet layout. Report
//! exports live on the reports themselves.

pub mod csv;

pub use self::csv::export_expenses_csv;
