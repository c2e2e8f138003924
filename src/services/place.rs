//! Place name service
//!
//! Spotting spellings of the same place ("Costco", "COSTCO ", "Costco.") and
//! rewriting them to one canonical name.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{TrackerError, TrackerResult};
use crate::services::expense::MAX_TEXT_LEN;
use crate::storage::{ExpenseRepository, Storage};

/// One spelling of a place and how many expenses use it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceVariant {
    pub name: String,
    pub count: i64,
}

/// Spellings that normalise to the same key
#[derive(Debug, Clone, Serialize)]
pub struct SimilarPlaceGroup {
    /// Most used spelling, offered as the default canonical name
    pub suggested: String,
    pub variants: Vec<PlaceVariant>,
    pub total_count: i64,
}

/// Outcome of a standardisation
#[derive(Debug, Clone, Serialize)]
pub struct StandardizeResult {
    pub canonical: String,
    pub updated_count: usize,
}

/// Normalise a place name for matching
///
/// Lowercases, drops punctuation and collapses runs of whitespace.
pub fn normalize_place(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct PlaceService<'a> {
    storage: &'a Storage,
}

impl<'a> PlaceService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Every distinct place with its expense count
    pub fn list(&self) -> TrackerResult<Vec<PlaceVariant>> {
        let conn = self.storage.connection()?;
        Ok(ExpenseRepository::new(&conn)
            .places()?
            .into_iter()
            .map(|(name, count)| PlaceVariant { name, count })
            .collect())
    }

    /// Groups of two or more spellings sharing a normalised name
    ///
    /// Sorted by total usage, largest first.
    pub fn similar(&self) -> TrackerResult<Vec<SimilarPlaceGroup>> {
        let mut by_key: BTreeMap<String, Vec<PlaceVariant>> = BTreeMap::new();
        for variant in self.list()? {
            let key = normalize_place(&variant.name);
            if key.is_empty() {
                continue;
            }
            by_key.entry(key).or_default().push(variant);
        }

        let mut groups: Vec<SimilarPlaceGroup> = by_key
            .into_values()
            .filter(|variants| variants.len() > 1)
            .map(|mut variants| {
                variants.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
                SimilarPlaceGroup {
                    suggested: variants[0].name.clone(),
                    total_count: variants.iter().map(|v| v.count).sum(),
                    variants,
                }
            })
            .collect();

        groups.sort_by(|a, b| {
            b.total_count
                .cmp(&a.total_count)
                .then_with(|| a.suggested.cmp(&b.suggested))
        });
        tracing::debug!(groups = groups.len(), "Found similar places");
        Ok(groups)
    }

    /// Rewrite every expense at one of `variants` to `canonical`
    pub fn standardize(
        &self,
        variants: &[String],
        canonical: &str,
    ) -> TrackerResult<StandardizeResult> {
        let canonical = canonical.trim();
        if canonical.is_empty() {
            return Err(TrackerError::Validation("Canonical name is required".into()));
        }
        if canonical.chars().count() > MAX_TEXT_LEN {
            return Err(TrackerError::Validation(format!(
                "Place cannot exceed {} characters",
                MAX_TEXT_LEN
            )));
        }
        if variants.is_empty() {
            return Err(TrackerError::Validation(
                "At least one variant is required".into(),
            ));
        }

        let conn = self.storage.connection()?;
        let updated_count = ExpenseRepository::new(&conn).rename_places(variants, canonical)?;

        tracing::info!(canonical, updated_count, "Standardized place names");
        Ok(StandardizeResult {
            canonical: canonical.to_string(),
            updated_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExpenseCategory, ExpenseInput, Money};
    use crate::services::ExpenseService;
    use crate::storage::test_support::create_test_storage;

    fn add(storage: &Storage, place: &str) {
        ExpenseService::new(storage)
            .create(ExpenseInput::new(
                "2025-04-02".parse().unwrap(),
                place,
                Money::from_cents(1000),
                ExpenseCategory::Groceries,
                "Debit",
            ))
            .unwrap();
    }

    #[test]
    fn test_normalize_place() {
        assert_eq!(normalize_place("  COSTCO   Wholesale. "), "costco wholesale");
        assert_eq!(normalize_place("Tim Hortons'"), "tim hortons");
        assert_eq!(normalize_place("..."), "");
    }

    #[test]
    fn test_similar_and_standardize() {
        let (_temp_dir, storage) = create_test_storage();
        add(&storage, "Costco");
        add(&storage, "Costco");
        add(&storage, "COSTCO.");
        add(&storage, "Shell");

        let service = PlaceService::new(&storage);
        let groups = service.similar().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].suggested, "Costco");
        assert_eq!(groups[0].total_count, 3);

        let result = service
            .standardize(&["COSTCO.".to_string(), "Costco".to_string()], "Costco")
            .unwrap();
        assert_eq!(result.updated_count, 1);
        assert!(service.similar().unwrap().is_empty());
    }

    #[test]
    fn test_standardize_requires_names() {
        let (_temp_dir, storage) = create_test_storage();
        let service = PlaceService::new(&storage);
        assert!(service.standardize(&[], "Costco").unwrap_err().is_validation());
        assert!(service
            .standardize(&["a".to_string()], "  ")
            .unwrap_err()
            .is_validation());
    }
}
