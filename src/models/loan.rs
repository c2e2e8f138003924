//! Loans, lines of credit and mortgages
//!
//! Balances are not derived from payments: the user records the remaining
//! balance (and rate) each month, and everything else is computed from that
//! history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::money::Money;

string_enum! {
    pub enum LoanType {
        Loan => "loan",
        LineOfCredit => "line_of_credit",
        Mortgage => "mortgage",
    }
}

string_enum! {
    /// Mortgage interest rate type
    pub enum RateType {
        Fixed => "fixed",
        Variable => "variable",
    }
}

string_enum! {
    /// Mortgage payment schedule
    pub enum PaymentFrequency {
        Monthly => "monthly",
        BiWeekly => "bi-weekly",
        AcceleratedBiWeekly => "accelerated_bi-weekly",
        Weekly => "weekly",
    }
}

impl PaymentFrequency {
    /// Payments per year
    pub fn payments_per_year(&self) -> u32 {
        match self {
            Self::Monthly => 12,
            Self::BiWeekly | Self::AcceleratedBiWeekly => 26,
            Self::Weekly => 52,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: i64,
    pub name: String,
    pub initial_balance: Money,
    pub start_date: NaiveDate,
    pub loan_type: LoanType,
    pub notes: String,
    pub is_paid_off: bool,
    /// Amortization period in years (mortgages)
    pub amortization_period: Option<u32>,
    /// Term length in years (mortgages)
    pub term_length: Option<u32>,
    pub renewal_date: Option<NaiveDate>,
    pub rate_type: Option<RateType>,
    pub payment_frequency: Option<PaymentFrequency>,
    pub estimated_property_value: Option<Money>,
    pub created_at: DateTime<Utc>,
}

impl Loan {
    pub fn is_mortgage(&self) -> bool {
        self.loan_type == LoanType::Mortgage
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoanInput {
    pub name: String,
    pub initial_balance: Money,
    pub start_date: NaiveDate,
    pub loan_type: Option<String>,
    #[serde(default)]
    pub notes: String,
    pub amortization_period: Option<u32>,
    pub term_length: Option<u32>,
    pub renewal_date: Option<NaiveDate>,
    pub rate_type: Option<String>,
    pub payment_frequency: Option<String>,
    pub estimated_property_value: Option<Money>,
}

/// Remaining balance recorded for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanBalance {
    pub id: i64,
    pub loan_id: i64,
    pub year: i32,
    pub month: u32,
    pub remaining_balance: Money,
    /// Annual interest rate in percent
    pub rate: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoanBalanceInput {
    pub year: i32,
    pub month: u32,
    pub remaining_balance: Money,
    #[serde(default)]
    pub rate: f64,
}
