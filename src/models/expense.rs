//! Expense model
//!
//! An expense is a dated purchase at a place, paid with a payment method and
//! filed under one category. Medical expenses may additionally carry insurance
//! claim data and be split between household members.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::category::ExpenseCategory;
use super::money::Money;
use super::period::YearMonth;

string_enum! {
    /// Progress of an insurance reimbursement claim
    pub enum ClaimStatus {
        NotClaimed => "not_claimed",
        InProgress => "in_progress",
        Paid => "paid",
        Denied => "denied",
    }
}

impl Default for ClaimStatus {
    fn default() -> Self {
        Self::NotClaimed
    }
}

/// The share of an expense attributed to one person
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonAllocation {
    pub person_id: i64,
    /// Person's name at read time (joined, not stored on the allocation)
    pub name: String,
    /// Out-of-pocket amount attributed to this person
    pub amount: Money,
    /// Pre-reimbursement cost attributed to this person, for insured expenses
    pub original_amount: Option<Money>,
}

/// A recorded expense
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub date: NaiveDate,
    pub place: String,
    pub notes: String,
    /// Amount actually paid (out of pocket, after any reimbursement)
    pub amount: Money,
    #[serde(rename = "type")]
    pub category: ExpenseCategory,
    /// Week of month, 1..=5
    pub week: u8,
    /// Payment method display name
    pub method: String,
    pub payment_method_id: Option<i64>,
    pub insurance_eligible: bool,
    pub claim_status: Option<ClaimStatus>,
    /// Cost before insurance, when the expense was submitted to a plan
    pub original_cost: Option<Money>,
    /// Template this expense was generated from
    pub recurring_id: Option<i64>,
    #[serde(default)]
    pub people: Vec<PersonAllocation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    pub fn month(&self) -> YearMonth {
        YearMonth::of(self.date)
    }

    pub fn is_tax_deductible(&self) -> bool {
        self.category.is_tax_deductible()
    }

    /// Whether a medical expense has no person assigned
    pub fn is_unassigned_medical(&self) -> bool {
        self.category.is_medical() && self.people.is_empty()
    }

    /// Amount the insurer paid back; zero unless the claim is paid
    pub fn reimbursed_amount(&self) -> Money {
        match (self.claim_status, self.original_cost) {
            (Some(ClaimStatus::Paid), Some(original)) if original > self.amount => {
                original - self.amount
            }
            _ => Money::zero(),
        }
    }

    /// Sum of all person allocations
    pub fn allocated_total(&self) -> Money {
        self.people.iter().map(|p| p.amount).sum()
    }
}

impl fmt::Display for Expense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({})",
            self.date.format("%Y-%m-%d"),
            self.place,
            self.amount,
            self.category
        )
    }
}

/// One person's share in a create/update request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AllocationInput {
    pub person_id: i64,
    /// Omitted amounts are only allowed when a single person takes the whole expense
    pub amount: Option<Money>,
    pub original_amount: Option<Money>,
}

/// Request body for creating or replacing an expense
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExpenseInput {
    pub date: NaiveDate,
    #[serde(default)]
    pub place: String,
    #[serde(default)]
    pub notes: String,
    pub amount: Money,
    /// Category display name; validated against the allow-list by the service
    #[serde(rename = "type", alias = "category")]
    pub category: String,
    pub week: Option<u8>,
    pub method: String,
    #[serde(default)]
    pub insurance_eligible: bool,
    pub claim_status: Option<String>,
    pub original_cost: Option<Money>,
    /// `None` keeps existing allocations on update; `Some(vec![])` clears them
    pub people: Option<Vec<AllocationInput>>,
}

impl ExpenseInput {
    /// Minimal input used by imports, templates and tests
    pub fn new(
        date: NaiveDate,
        place: impl Into<String>,
        amount: Money,
        category: ExpenseCategory,
        method: impl Into<String>,
    ) -> Self {
        Self {
            date,
            place: place.into(),
            notes: String::new(),
            amount,
            category: category.as_str().to_string(),
            week: None,
            method: method.into(),
            insurance_eligible: false,
            claim_status: None,
            original_cost: None,
            people: None,
        }
    }
}

/// Filters for listing expenses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseFilter {
    pub year: Option<i32>,
    pub month: Option<u32>,
    #[serde(rename = "type", alias = "category")]
    pub category: Option<String>,
    pub method: Option<String>,
    /// Case-insensitive substring match on place and notes
    pub search: Option<String>,
}
