//! Core data models for the expense tracker
//!
//! This module contains the data structures for every tracked resource:
//! expenses (with insurance and per-person allocations), invoices, people,
//! income, fixed expenses, loans, investments, payment methods and recurring
//! expense templates.

/// Generates a closed enum whose variants map one-to-one onto the strings
/// stored in SQLite and sent over the API.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $value)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The stored / wire representation
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }

            /// Parse the stored representation (case-insensitive)
            pub fn parse(s: &str) -> Option<Self> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
            }

            /// Parse a request field, naming the field and the allowed values on failure
            pub fn parse_field(
                field: &str,
                s: &str,
            ) -> Result<Self, crate::error::TrackerError> {
                Self::parse(s).ok_or_else(|| {
                    crate::error::TrackerError::Validation(format!(
                        "Invalid {} \"{}\" (must be one of: {})",
                        field,
                        s,
                        Self::ALL
                            .iter()
                            .map(|v| v.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ))
                })
            }

            /// Like `parse_field`, treating a missing or blank value as `None`
            pub fn parse_optional_field(
                field: &str,
                s: Option<&str>,
            ) -> Result<Option<Self>, crate::error::TrackerError> {
                match s.map(str::trim) {
                    Some(s) if !s.is_empty() => Self::parse_field(field, s).map(Some),
                    _ => Ok(None),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod category;
pub mod expense;
pub mod fixed_expense;
pub mod income;
pub mod invoice;
pub mod investment;
pub mod loan;
pub mod money;
pub mod payment_method;
pub mod period;
pub mod person;
pub mod recurring;

pub use category::ExpenseCategory;
pub use expense::{AllocationInput, ClaimStatus, Expense, ExpenseFilter, ExpenseInput, PersonAllocation};
pub use fixed_expense::{FixedExpense, FixedExpenseInput};
pub use income::{IncomeCategory, IncomeInput, IncomeSource};
pub use invoice::Invoice;
pub use investment::{Investment, InvestmentInput, InvestmentType, InvestmentValue, InvestmentValueInput};
pub use loan::{Loan, LoanBalance, LoanBalanceInput, LoanInput, LoanType, PaymentFrequency, RateType};
pub use money::Money;
pub use payment_method::{PaymentMethod, PaymentMethodInput, PaymentMethodType};
pub use period::YearMonth;
pub use person::{Person, PersonInput};
pub use recurring::{RecurringExpense, RecurringInput};
