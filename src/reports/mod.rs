//! Reports for the expense tracker
//!
//! Read-only views built from several repositories at once: the yearly
//! tax-deductible report, merchant analytics, the monthly summary and
//! month-end reminders. Each report serialises to JSON for the API and can
//! render itself for the terminal.

pub mod merchants;
pub mod monthly_summary;
pub mod reminders;
pub mod tax_deductible;

pub use merchants::{MerchantDetail, MerchantPeriod, MerchantSort, MerchantSummary, TopMerchantsReport};
pub use monthly_summary::MonthlySummary;
pub use reminders::ReminderStatus;
pub use tax_deductible::TaxDeductibleReport;
