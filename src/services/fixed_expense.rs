//! Fixed expense service
//!
//! Monthly line items such as rent or insurance premiums. Each month keeps its
//! own rows; carrying forward copies the previous month's list.

use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;

use crate::error::{TrackerError, TrackerResult};
use crate::models::{ExpenseCategory, FixedExpense, FixedExpenseInput, Money, YearMonth};
use crate::storage::{FixedExpenseRepository, LoanRepository, Storage};

/// Fixed expenses for one month with their total
#[derive(Debug, Clone, Serialize)]
pub struct FixedExpenseMonth {
    pub year: i32,
    pub month: u32,
    pub items: Vec<FixedExpense>,
    pub total: Money,
}

pub struct FixedExpenseService<'a> {
    storage: &'a Storage,
}

impl<'a> FixedExpenseService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn create(&self, input: FixedExpenseInput) -> TrackerResult<FixedExpense> {
        let conn = self.storage.connection()?;
        let mut item = validate(&conn, input)?;
        item.id = FixedExpenseRepository::new(&conn).insert(&item)?;

        tracing::info!(id = item.id, name = %item.name, "Created fixed expense");
        Ok(item)
    }

    pub fn get(&self, id: i64) -> TrackerResult<FixedExpense> {
        let conn = self.storage.connection()?;
        FixedExpenseRepository::new(&conn)
            .get(id)?
            .ok_or_else(|| TrackerError::fixed_expense_not_found(id))
    }

    pub fn month(&self, month: YearMonth) -> TrackerResult<FixedExpenseMonth> {
        let conn = self.storage.connection()?;
        let items = FixedExpenseRepository::new(&conn).list_for_month(month)?;
        let total = items.iter().map(|i| i.amount).sum();
        Ok(FixedExpenseMonth {
            year: month.year,
            month: month.month,
            items,
            total,
        })
    }

    pub fn update(&self, id: i64, input: FixedExpenseInput) -> TrackerResult<FixedExpense> {
        let conn = self.storage.connection()?;
        let repo = FixedExpenseRepository::new(&conn);
        let existing = repo
            .get(id)?
            .ok_or_else(|| TrackerError::fixed_expense_not_found(id))?;

        let mut item = validate(&conn, input)?;
        item.id = id;
        item.created_at = existing.created_at;
        repo.update(&item)?;

        tracing::info!(id, "Updated fixed expense");
        Ok(item)
    }

    pub fn delete(&self, id: i64) -> TrackerResult<()> {
        let conn = self.storage.connection()?;
        if !FixedExpenseRepository::new(&conn).delete(id)? {
            return Err(TrackerError::fixed_expense_not_found(id));
        }
        tracing::info!(id, "Deleted fixed expense");
        Ok(())
    }

    /// Copy last month's fixed expenses into an empty month
    pub fn carry_forward(&self, month: YearMonth) -> TrackerResult<Vec<FixedExpense>> {
        let mut conn = self.storage.connection()?;
        let tx = conn.transaction()?;
        let repo = FixedExpenseRepository::new(&tx);

        if !repo.list_for_month(month)?.is_empty() {
            return Err(TrackerError::Validation(format!(
                "{} already has fixed expenses",
                month
            )));
        }

        let now = Utc::now();
        let mut carried = Vec::new();
        for item in repo.list_for_month(month.previous())? {
            let mut copy = FixedExpense {
                id: 0,
                year: month.year,
                month: month.month,
                created_at: now,
                ..item
            };
            copy.id = repo.insert(&copy)?;
            carried.push(copy);
        }
        tx.commit()?;

        tracing::info!(%month, count = carried.len(), "Carried fixed expenses forward");
        Ok(carried)
    }
}

fn validate(conn: &Connection, input: FixedExpenseInput) -> TrackerResult<FixedExpense> {
    YearMonth::new(input.year, input.month)?;

    let name = input.name.trim();
    if name.is_empty() {
        return Err(TrackerError::Validation("Name is required".into()));
    }
    if input.amount.is_negative() {
        return Err(TrackerError::Validation("Amount cannot be negative".into()));
    }
    let category =
        ExpenseCategory::parse_or_error(&input.category).map_err(TrackerError::Validation)?;

    let payment_type = input.payment_type.trim();
    if payment_type.is_empty() {
        return Err(TrackerError::Validation("Payment type is required".into()));
    }
    if let Some(day) = input.payment_due_day {
        if !(1..=31).contains(&day) {
            return Err(TrackerError::Validation(
                "Payment due day must be between 1 and 31".into(),
            ));
        }
    }
    if let Some(loan_id) = input.linked_loan_id {
        if LoanRepository::new(conn).get(loan_id)?.is_none() {
            return Err(TrackerError::Validation(format!(
                "Linked loan {} does not exist",
                loan_id
            )));
        }
    }

    Ok(FixedExpense {
        id: 0,
        year: input.year,
        month: input.month,
        name: name.to_string(),
        amount: input.amount,
        category,
        payment_type: payment_type.to_string(),
        payment_due_day: input.payment_due_day,
        linked_loan_id: input.linked_loan_id,
        created_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::create_test_storage;

    fn input(month: u32, name: &str, cents: i64) -> FixedExpenseInput {
        FixedExpenseInput {
            year: 2025,
            month,
            name: name.into(),
            amount: Money::from_cents(cents),
            category: "Housing".into(),
            payment_type: "Debit".into(),
            payment_due_day: Some(1),
            linked_loan_id: None,
        }
    }

    #[test]
    fn test_month_total_and_carry_forward() {
        let (_temp_dir, storage) = create_test_storage();
        let service = FixedExpenseService::new(&storage);
        service.create(input(5, "Rent", 180000)).unwrap();
        service.create(input(5, "Internet", 8000)).unwrap();

        let may = YearMonth::new(2025, 5).unwrap();
        assert_eq!(service.month(may).unwrap().total.cents(), 188000);

        let carried = service.carry_forward(may.next()).unwrap();
        assert_eq!(carried.len(), 2);
        assert_eq!(service.month(may.next()).unwrap().total.cents(), 188000);
        assert!(service.carry_forward(may.next()).unwrap_err().is_validation());
    }

    #[test]
    fn test_validation() {
        let (_temp_dir, storage) = create_test_storage();
        let service = FixedExpenseService::new(&storage);

        let mut bad = input(5, "Rent", 100);
        bad.linked_loan_id = Some(42);
        assert!(service.create(bad).unwrap_err().is_validation());

        let mut bad = input(5, "Rent", 100);
        bad.category = "Rent".into();
        assert!(service.create(bad).unwrap_err().is_validation());

        let mut bad = input(5, "Rent", 100);
        bad.payment_due_day = Some(32);
        assert!(service.create(bad).unwrap_err().is_validation());
    }
}
