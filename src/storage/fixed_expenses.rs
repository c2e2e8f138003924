//! Fixed expense repository

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::TrackerResult;
use crate::models::{FixedExpense, Money, YearMonth};

const COLUMNS: &str = "id, year, month, name, amount, category, payment_type, payment_due_day, \
                       linked_loan_id, created_at";

pub struct FixedExpenseRepository<'c> {
    conn: &'c Connection,
}

impl<'c> FixedExpenseRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<FixedExpense> {
        Ok(FixedExpense {
            id: row.get(0)?,
            year: row.get(1)?,
            month: row.get(2)?,
            name: row.get(3)?,
            amount: row.get(4)?,
            category: row.get(5)?,
            payment_type: row.get(6)?,
            payment_due_day: row.get(7)?,
            linked_loan_id: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    pub fn get(&self, id: i64) -> TrackerResult<Option<FixedExpense>> {
        let sql = format!("SELECT {} FROM fixed_expenses WHERE id = ?1", COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::from_row)
            .optional()?)
    }

    /// Items for a month ordered by due day (items without one last), then name
    pub fn list_for_month(&self, month: YearMonth) -> TrackerResult<Vec<FixedExpense>> {
        let sql = format!(
            "SELECT {} FROM fixed_expenses WHERE year = ?1 AND month = ?2
             ORDER BY payment_due_day IS NULL, payment_due_day, name COLLATE NOCASE, id",
            COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![month.year, month.month], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    pub fn total_for_month(&self, month: YearMonth) -> TrackerResult<Money> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM fixed_expenses WHERE year = ?1 AND month = ?2",
            params![month.year, month.month],
            |row| row.get(0),
        )?)
    }

    pub fn insert(&self, item: &FixedExpense) -> TrackerResult<i64> {
        self.conn.execute(
            "INSERT INTO fixed_expenses (year, month, name, amount, category, payment_type,
                payment_due_day, linked_loan_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                item.year,
                item.month,
                item.name,
                item.amount,
                item.category,
                item.payment_type,
                item.payment_due_day,
                item.linked_loan_id,
                item.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update(&self, item: &FixedExpense) -> TrackerResult<bool> {
        let changed = self.conn.execute(
            "UPDATE fixed_expenses SET year = ?2, month = ?3, name = ?4, amount = ?5, category = ?6,
                payment_type = ?7, payment_due_day = ?8, linked_loan_id = ?9
             WHERE id = ?1",
            params![
                item.id,
                item.year,
                item.month,
                item.name,
                item.amount,
                item.category,
                item.payment_type,
                item.payment_due_day,
                item.linked_loan_id,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete(&self, id: i64) -> TrackerResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM fixed_expenses WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}
