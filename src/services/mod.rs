//! Service layer for the expense tracker
//!
//! Services sit between the API/CLI and the repositories. They validate
//! input, keep related rows consistent (card balances, allocations, invoice
//! files) and log every mutation.

pub mod expense;
pub mod fixed_expense;
pub mod import;
pub mod income;
pub mod investment;
pub mod invoice;
pub mod loan;
pub mod payment_method;
pub mod person;
pub mod place;
pub mod recurring;
pub mod workbook;

pub use expense::ExpenseService;
pub use fixed_expense::{FixedExpenseMonth, FixedExpenseService};
pub use import::{ImportResult, ImportService, RowError, ValidationReport};
pub use income::{IncomeMonth, IncomeService};
pub use investment::{InvestmentDetail, InvestmentService, Portfolio};
pub use invoice::{InvoiceService, InvoiceUpload};
pub use loan::{LoanDetail, LoanService};
pub use payment_method::{CreditCardStatement, DeleteOutcome, PaymentMethodService};
pub use person::PersonService;
pub use place::{PlaceService, SimilarPlaceGroup, StandardizeResult};
pub use recurring::{GenerationFailure, GenerationResult, RecurringService};
pub use workbook::{ConversionReport, SheetOutcome, WorkbookConverter};
