//! Expense categories
//!
//! Categories are a fixed allow-list. The display string is also the value
//! stored in the database and sent over the API, so `"Tax - Medical"` is both
//! what the user sees and what a `CHECK` constraint compares against.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An expense category from the fixed allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExpenseCategory {
    Housing,
    Utilities,
    Groceries,
    #[serde(rename = "Dining Out")]
    DiningOut,
    Insurance,
    Gas,
    #[serde(rename = "Vehicle Maintenance")]
    VehicleMaintenance,
    Entertainment,
    Subscriptions,
    #[serde(rename = "Recreation Activities")]
    RecreationActivities,
    #[serde(rename = "Pet Care")]
    PetCare,
    #[serde(rename = "Tax - Medical")]
    TaxMedical,
    #[serde(rename = "Tax - Donation")]
    TaxDonation,
    Other,
}

impl ExpenseCategory {
    /// Every category, in display order
    pub const ALL: [ExpenseCategory; 14] = [
        Self::Housing,
        Self::Utilities,
        Self::Groceries,
        Self::DiningOut,
        Self::Insurance,
        Self::Gas,
        Self::VehicleMaintenance,
        Self::Entertainment,
        Self::Subscriptions,
        Self::RecreationActivities,
        Self::PetCare,
        Self::TaxMedical,
        Self::TaxDonation,
        Self::Other,
    ];

    /// Categories that count toward the tax-deductible report
    pub const TAX_DEDUCTIBLE: [ExpenseCategory; 2] = [Self::TaxMedical, Self::TaxDonation];

    /// The stored / displayed name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Housing => "Housing",
            Self::Utilities => "Utilities",
            Self::Groceries => "Groceries",
            Self::DiningOut => "Dining Out",
            Self::Insurance => "Insurance",
            Self::Gas => "Gas",
            Self::VehicleMaintenance => "Vehicle Maintenance",
            Self::Entertainment => "Entertainment",
            Self::Subscriptions => "Subscriptions",
            Self::RecreationActivities => "Recreation Activities",
            Self::PetCare => "Pet Care",
            Self::TaxMedical => "Tax - Medical",
            Self::TaxDonation => "Tax - Donation",
            Self::Other => "Other",
        }
    }

    /// Parse from the exact display name
    ///
    /// The retired "Food" category is accepted and mapped to Dining Out so old
    /// spreadsheets still import.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s == "Food" {
            return Some(Self::DiningOut);
        }
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }

    /// Parse, producing a validation message listing the allowed values
    pub fn parse_or_error(s: &str) -> Result<Self, String> {
        Self::parse(s).ok_or_else(|| {
            format!(
                "Invalid category \"{}\" (must be one of: {})",
                s,
                Self::names().join(", ")
            )
        })
    }

    /// All display names
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|c| c.as_str()).collect()
    }

    pub fn is_tax_deductible(&self) -> bool {
        matches!(self, Self::TaxMedical | Self::TaxDonation)
    }

    pub fn is_medical(&self) -> bool {
        matches!(self, Self::TaxMedical)
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_round_trips_through_its_name() {
        for category in ExpenseCategory::ALL {
            assert_eq!(ExpenseCategory::parse(category.as_str()), Some(category));
        }
    }

    #[test]
    fn test_unknown_and_legacy_names() {
        assert_eq!(ExpenseCategory::parse("Food"), Some(ExpenseCategory::DiningOut));
        assert_eq!(ExpenseCategory::parse("tax - medical"), None);
        let err = ExpenseCategory::parse_or_error("Travel").unwrap_err();
        assert!(err.contains("Invalid category \"Travel\""));
        assert!(err.contains("Tax - Donation"));
    }

    #[test]
    fn test_tax_deductible_set() {
        let deductible: Vec<_> = ExpenseCategory::ALL
            .iter()
            .filter(|c| c.is_tax_deductible())
            .collect();
        assert_eq!(deductible.len(), 2);
        assert!(ExpenseCategory::TaxMedical.is_medical());
        assert!(!ExpenseCategory::TaxDonation.is_medical());
    }

    #[test]
    fn test_serde_uses_display_names() {
        let json = serde_json::to_string(&ExpenseCategory::TaxMedical).unwrap();
        assert_eq!(json, "\"Tax - Medical\"");
        let parsed: ExpenseCategory = serde_json::from_str("\"Pet Care\"").unwrap();
        assert_eq!(parsed, ExpenseCategory::PetCare);
    }
}
