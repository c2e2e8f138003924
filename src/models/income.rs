//! Monthly income sources

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::money::Money;

string_enum! {
    /// Kind of income
    pub enum IncomeCategory {
        Salary => "Salary",
        Government => "Government",
        Gifts => "Gifts",
        Other => "Other",
    }
}

impl Default for IncomeCategory {
    fn default() -> Self {
        Self::Other
    }
}

/// An income line for one month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeSource {
    pub id: i64,
    pub year: i32,
    pub month: u32,
    pub name: String,
    pub amount: Money,
    pub category: IncomeCategory,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IncomeInput {
    pub year: i32,
    pub month: u32,
    pub name: String,
    pub amount: Money,
    pub category: Option<String>,
}
