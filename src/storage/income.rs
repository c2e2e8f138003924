//! Income source repository

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::TrackerResult;
use crate::models::{IncomeSource, Money, YearMonth};

const COLUMNS: &str = "id, year, month, name, amount, category, created_at";

pub struct IncomeRepository<'c> {
    conn: &'c Connection,
}

impl<'c> IncomeRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<IncomeSource> {
        Ok(IncomeSource {
            id: row.get(0)?,
            year: row.get(1)?,
            month: row.get(2)?,
            name: row.get(3)?,
            amount: row.get(4)?,
            category: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    pub fn get(&self, id: i64) -> TrackerResult<Option<IncomeSource>> {
        let sql = format!("SELECT {} FROM income_sources WHERE id = ?1", COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::from_row)
            .optional()?)
    }

    pub fn list_for_month(&self, month: YearMonth) -> TrackerResult<Vec<IncomeSource>> {
        let sql = format!(
            "SELECT {} FROM income_sources WHERE year = ?1 AND month = ?2 ORDER BY id",
            COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let sources = stmt
            .query_map(params![month.year, month.month], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sources)
    }

    pub fn total_for_month(&self, month: YearMonth) -> TrackerResult<Money> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM income_sources WHERE year = ?1 AND month = ?2",
            params![month.year, month.month],
            |row| row.get(0),
        )?)
    }

    pub fn insert(&self, source: &IncomeSource) -> TrackerResult<i64> {
        self.conn.execute(
            "INSERT INTO income_sources (year, month, name, amount, category, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                source.year,
                source.month,
                source.name,
                source.amount,
                source.category,
                source.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update(&self, source: &IncomeSource) -> TrackerResult<bool> {
        let changed = self.conn.execute(
            "UPDATE income_sources SET year = ?2, month = ?3, name = ?4, amount = ?5, category = ?6
             WHERE id = ?1",
            params![
                source.id,
                source.year,
                source.month,
                source.name,
                source.amount,
                source.category,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete(&self, id: i64) -> TrackerResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM income_sources WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}
