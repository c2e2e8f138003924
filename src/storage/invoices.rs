//! Invoice metadata repository
//!
//! Only metadata lives in SQLite; the files themselves are written under the
//! invoices directory by the invoice service.

use std::collections::HashMap;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::sql::placeholders;
use crate::error::TrackerResult;
use crate::models::Invoice;

const COLUMNS: &str = "id, expense_id, person_id, filename, original_filename, file_path, \
                       file_size, mime_type, upload_date";

pub struct InvoiceRepository<'c> {
    conn: &'c Connection,
}

impl<'c> InvoiceRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Invoice> {
        Ok(Invoice {
            id: row.get(0)?,
            expense_id: row.get(1)?,
            person_id: row.get(2)?,
            filename: row.get(3)?,
            original_filename: row.get(4)?,
            file_path: row.get(5)?,
            file_size: row.get(6)?,
            mime_type: row.get(7)?,
            upload_date: row.get(8)?,
        })
    }

    pub fn get(&self, id: i64) -> TrackerResult<Option<Invoice>> {
        let sql = format!("SELECT {} FROM expense_invoices WHERE id = ?1", COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::from_row)
            .optional()?)
    }

    pub fn list_for_expense(&self, expense_id: i64) -> TrackerResult<Vec<Invoice>> {
        let sql = format!(
            "SELECT {} FROM expense_invoices WHERE expense_id = ?1 ORDER BY upload_date, id",
            COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let invoices = stmt
            .query_map(params![expense_id], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(invoices)
    }

    /// Invoice counts for the given expenses; expenses without invoices are absent
    pub fn counts_for_expenses(&self, expense_ids: &[i64]) -> TrackerResult<HashMap<i64, i64>> {
        let mut counts = HashMap::new();
        for chunk in expense_ids.chunks(500) {
            let sql = format!(
                "SELECT expense_id, COUNT(*) FROM expense_invoices
                 WHERE expense_id IN ({}) GROUP BY expense_id",
                placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (expense_id, count) = row?;
                counts.insert(expense_id, count);
            }
        }
        Ok(counts)
    }

    pub fn insert(&self, invoice: &Invoice) -> TrackerResult<i64> {
        self.conn.execute(
            "INSERT INTO expense_invoices (expense_id, person_id, filename, original_filename,
                file_path, file_size, mime_type, upload_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                invoice.expense_id,
                invoice.person_id,
                invoice.filename,
                invoice.original_filename,
                invoice.file_path,
                invoice.file_size,
                invoice.mime_type,
                invoice.upload_date,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn set_person(&self, id: i64, person_id: Option<i64>) -> TrackerResult<bool> {
        let changed = self.conn.execute(
            "UPDATE expense_invoices SET person_id = ?2 WHERE id = ?1",
            params![id, person_id],
        )?;
        Ok(changed > 0)
    }

    pub fn delete(&self, id: i64) -> TrackerResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM expense_invoices WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}
