//! Recurring expense template repository

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::TrackerResult;
use crate::models::RecurringExpense;

const COLUMNS: &str = "id, place, amount, notes, category, method, day_of_month, start_month, \
                       end_month, paused, created_at";

pub struct RecurringRepository<'c> {
    conn: &'c Connection,
}

impl<'c> RecurringRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<RecurringExpense> {
        Ok(RecurringExpense {
            id: row.get(0)?,
            place: row.get(1)?,
            amount: row.get(2)?,
            notes: row.get(3)?,
            category: row.get(4)?,
            method: row.get(5)?,
            day_of_month: row.get(6)?,
            start_month: row.get(7)?,
            end_month: row.get(8)?,
            paused: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    pub fn get(&self, id: i64) -> TrackerResult<Option<RecurringExpense>> {
        let sql = format!("SELECT {} FROM recurring_expenses WHERE id = ?1", COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::from_row)
            .optional()?)
    }

    pub fn list(&self) -> TrackerResult<Vec<RecurringExpense>> {
        let sql = format!(
            "SELECT {} FROM recurring_expenses ORDER BY day_of_month, place COLLATE NOCASE, id",
            COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let templates = stmt
            .query_map([], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(templates)
    }

    pub fn insert(&self, template: &RecurringExpense) -> TrackerResult<i64> {
        self.conn.execute(
            "INSERT INTO recurring_expenses (place, amount, notes, category, method, day_of_month,
                start_month, end_month, paused, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                template.place,
                template.amount,
                template.notes,
                template.category,
                template.method,
                template.day_of_month,
                template.start_month,
                template.end_month,
                template.paused,
                template.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update(&self, template: &RecurringExpense) -> TrackerResult<bool> {
        let changed = self.conn.execute(
            "UPDATE recurring_expenses SET place = ?2, amount = ?3, notes = ?4, category = ?5,
                method = ?6, day_of_month = ?7, start_month = ?8, end_month = ?9, paused = ?10
             WHERE id = ?1",
            params![
                template.id,
                template.place,
                template.amount,
                template.notes,
                template.category,
                template.method,
                template.day_of_month,
                template.start_month,
                template.end_month,
                template.paused,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Point templates using `old` at the renamed method
    pub fn rename_method(&self, old: &str, new: &str) -> TrackerResult<usize> {
        Ok(self.conn.execute(
            "UPDATE recurring_expenses SET method = ?2 WHERE method = ?1 COLLATE NOCASE",
            params![old, new],
        )?)
    }

    /// Delete a template; generated expenses stay and lose the link
    pub fn delete(&self, id: i64) -> TrackerResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM recurring_expenses WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}
