//! Fixed (recurring monthly) expense lines
//!
//! Rent, insurance premiums and loan payments are recorded once per month as
//! fixed expenses rather than as dated expenses. A line may point at the loan
//! it pays down.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::ExpenseCategory;
use super::money::Money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedExpense {
    pub id: i64,
    pub year: i32,
    pub month: u32,
    pub name: String,
    pub amount: Money,
    pub category: ExpenseCategory,
    /// Payment method display name
    pub payment_type: String,
    /// Day of month the payment is due (1..=31)
    pub payment_due_day: Option<u32>,
    pub linked_loan_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FixedExpenseInput {
    pub year: i32,
    pub month: u32,
    pub name: String,
    pub amount: Money,
    pub category: String,
    pub payment_type: String,
    pub payment_due_day: Option<u32>,
    pub linked_loan_id: Option<i64>,
}
