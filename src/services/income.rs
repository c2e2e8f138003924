//! Income service
//!
//! Provides business logic for monthly income sources: CRUD, per-month
//! summaries and copying last month's sources forward.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;

use crate::error::{TrackerError, TrackerResult};
use crate::models::{IncomeCategory, IncomeInput, IncomeSource, Money, YearMonth};
use crate::storage::{IncomeRepository, Storage};

/// Income for one month with totals
#[derive(Debug, Clone, Serialize)]
pub struct IncomeMonth {
    pub year: i32,
    pub month: u32,
    pub sources: Vec<IncomeSource>,
    pub total: Money,
    pub by_category: BTreeMap<String, Money>,
}

/// Service for income sources
pub struct IncomeService<'a> {
    storage: &'a Storage,
}

impl<'a> IncomeService<'a> {
    /// Create a new income service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn create(&self, input: IncomeInput) -> TrackerResult<IncomeSource> {
        let mut source = validate(input)?;
        let conn = self.storage.connection()?;
        source.id = IncomeRepository::new(&conn).insert(&source)?;

        tracing::info!(id = source.id, amount = %source.amount, "Created income source");
        Ok(source)
    }

    pub fn get(&self, id: i64) -> TrackerResult<IncomeSource> {
        let conn = self.storage.connection()?;
        IncomeRepository::new(&conn)
            .get(id)?
            .ok_or_else(|| TrackerError::income_not_found(id))
    }

    /// Sources for a month with total and per-category totals
    pub fn month(&self, month: YearMonth) -> TrackerResult<IncomeMonth> {
        let conn = self.storage.connection()?;
        let sources = IncomeRepository::new(&conn).list_for_month(month)?;

        let total = sources.iter().map(|s| s.amount).sum();
        let mut by_category = BTreeMap::new();
        for source in &sources {
            *by_category
                .entry(source.category.as_str().to_string())
                .or_insert_with(Money::zero) += source.amount;
        }

        Ok(IncomeMonth {
            year: month.year,
            month: month.month,
            sources,
            total,
            by_category,
        })
    }

    pub fn update(&self, id: i64, input: IncomeInput) -> TrackerResult<IncomeSource> {
        let mut source = validate(input)?;
        let conn = self.storage.connection()?;
        let repo = IncomeRepository::new(&conn);

        let existing = repo
            .get(id)?
            .ok_or_else(|| TrackerError::income_not_found(id))?;
        source.id = id;
        source.created_at = existing.created_at;
        repo.update(&source)?;

        tracing::info!(id, "Updated income source");
        Ok(source)
    }

    pub fn delete(&self, id: i64) -> TrackerResult<()> {
        let conn = self.storage.connection()?;
        if !IncomeRepository::new(&conn).delete(id)? {
            return Err(TrackerError::income_not_found(id));
        }
        tracing::info!(id, "Deleted income source");
        Ok(())
    }

    /// Copy the previous month's sources into `month`
    ///
    /// Refused when `month` already has sources, so it never duplicates.
    pub fn copy_from_previous(&self, month: YearMonth) -> TrackerResult<Vec<IncomeSource>> {
        let mut conn = self.storage.connection()?;
        let tx = conn.transaction()?;
        let repo = IncomeRepository::new(&tx);

        if !repo.list_for_month(month)?.is_empty() {
            return Err(TrackerError::Validation(format!(
                "{} already has income sources",
                month
            )));
        }

        let previous = month.previous();
        let now = Utc::now();
        let mut copied = Vec::new();
        for source in repo.list_for_month(previous)? {
            let mut copy = IncomeSource {
                id: 0,
                year: month.year,
                month: month.month,
                created_at: now,
                ..source
            };
            copy.id = repo.insert(&copy)?;
            copied.push(copy);
        }
        tx.commit()?;

        tracing::info!(%month, count = copied.len(), "Copied income from previous month");
        Ok(copied)
    }
}

fn validate(input: IncomeInput) -> TrackerResult<IncomeSource> {
    YearMonth::new(input.year, input.month)?;

    let name = input.name.trim();
    if name.is_empty() {
        return Err(TrackerError::Validation("Name is required".into()));
    }
    if input.amount.is_negative() {
        return Err(TrackerError::Validation("Amount cannot be negative".into()));
    }
    let category = match input.category.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => IncomeCategory::parse_field("category", s)?,
        _ => IncomeCategory::default(),
    };

    Ok(IncomeSource {
        id: 0,
        year: input.year,
        month: input.month,
        name: name.to_string(),
        amount: input.amount,
        category,
        created_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::create_test_storage;

    fn input(month: u32, name: &str, cents: i64, category: &str) -> IncomeInput {
        IncomeInput {
            year: 2025,
            month,
            name: name.into(),
            amount: Money::from_cents(cents),
            category: Some(category.into()),
        }
    }

    #[test]
    fn test_month_summary() {
        let (_temp_dir, storage) = create_test_storage();
        let service = IncomeService::new(&storage);

        service.create(input(3, "Paycheque", 400000, "Salary")).unwrap();
        service.create(input(3, "Child benefit", 50000, "Government")).unwrap();
        service.create(input(4, "Paycheque", 400000, "Salary")).unwrap();

        let march = service.month(YearMonth::new(2025, 3).unwrap()).unwrap();
        assert_eq!(march.sources.len(), 2);
        assert_eq!(march.total.cents(), 450000);
        assert_eq!(march.by_category["Government"].cents(), 50000);
    }

    #[test]
    fn test_validation() {
        let (_temp_dir, storage) = create_test_storage();
        let service = IncomeService::new(&storage);

        assert!(service.create(input(13, "Pay", 100, "Salary")).unwrap_err().is_validation());
        assert!(service.create(input(1, "Pay", -100, "Salary")).unwrap_err().is_validation());
        assert!(service.create(input(1, "Pay", 100, "Lottery")).unwrap_err().is_validation());

        let mut no_category = input(1, "Pay", 100, "");
        no_category.category = None;
        assert_eq!(
            service.create(no_category).unwrap().category,
            IncomeCategory::Other
        );
    }

    #[test]
    fn test_copy_from_previous() {
        let (_temp_dir, storage) = create_test_storage();
        let service = IncomeService::new(&storage);
        service.create(input(12, "Paycheque", 400000, "Salary")).unwrap();

        let january = YearMonth::new(2025, 12).unwrap().next();
        let copied = service.copy_from_previous(january).unwrap();
        assert_eq!(copied.len(), 1);
        assert_eq!((copied[0].year, copied[0].month), (2026, 1));
        assert_eq!(copied[0].name, "Paycheque");

        assert!(service.copy_from_previous(january).unwrap_err().is_validation());

        let empty = service.copy_from_previous(YearMonth::new(2025, 6).unwrap()).unwrap();
        assert!(empty.is_empty());
    }
}
