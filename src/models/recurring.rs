//! Recurring expense templates
//!
//! A template produces one ordinary expense per month between its start and
//! (optional) end month, unless paused.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::ExpenseCategory;
use super::money::Money;
use super::period::YearMonth;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringExpense {
    pub id: i64,
    pub place: String,
    pub amount: Money,
    pub notes: String,
    #[serde(rename = "type")]
    pub category: ExpenseCategory,
    pub method: String,
    pub day_of_month: u32,
    pub start_month: YearMonth,
    pub end_month: Option<YearMonth>,
    pub paused: bool,
    pub created_at: DateTime<Utc>,
}

impl RecurringExpense {
    /// Whether the template should produce an expense in `month`
    pub fn applies_to(&self, month: YearMonth) -> bool {
        !self.paused
            && month >= self.start_month
            && self.end_month.map_or(true, |end| month <= end)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecurringInput {
    pub place: String,
    pub amount: Money,
    #[serde(default)]
    pub notes: String,
    #[serde(rename = "type", alias = "category")]
    pub category: String,
    pub method: String,
    pub day_of_month: u32,
    /// "YYYY-MM"
    pub start_month: String,
    pub end_month: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applies_to_window() {
        let template = RecurringExpense {
            id: 1,
            place: "Netflix".into(),
            amount: Money::from_cents(1699),
            notes: String::new(),
            category: ExpenseCategory::Subscriptions,
            method: "VISA".into(),
            day_of_month: 15,
            start_month: YearMonth::new(2025, 2).unwrap(),
            end_month: Some(YearMonth::new(2025, 6).unwrap()),
            paused: false,
            created_at: Utc::now(),
        };

        assert!(!template.applies_to(YearMonth::new(2025, 1).unwrap()));
        assert!(template.applies_to(YearMonth::new(2025, 2).unwrap()));
        assert!(template.applies_to(YearMonth::new(2025, 6).unwrap()));
        assert!(!template.applies_to(YearMonth::new(2025, 7).unwrap()));

        let paused = RecurringExpense { paused: true, ..template };
        assert!(!paused.applies_to(YearMonth::new(2025, 3).unwrap()));
    }
}
