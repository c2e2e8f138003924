//! Investment and value history repository

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::TrackerResult;
use crate::models::{Investment, InvestmentValue};

pub struct InvestmentRepository<'c> {
    conn: &'c Connection,
}

impl<'c> InvestmentRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Investment> {
        Ok(Investment {
            id: row.get(0)?,
            name: row.get(1)?,
            investment_type: row.get(2)?,
            initial_value: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn value_from_row(row: &Row<'_>) -> rusqlite::Result<InvestmentValue> {
        Ok(InvestmentValue {
            id: row.get(0)?,
            investment_id: row.get(1)?,
            year: row.get(2)?,
            month: row.get(3)?,
            value: row.get(4)?,
        })
    }

    pub fn get(&self, id: i64) -> TrackerResult<Option<Investment>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, investment_type, initial_value, created_at
                 FROM investments WHERE id = ?1",
                params![id],
                Self::from_row,
            )
            .optional()?)
    }

    pub fn list(&self) -> TrackerResult<Vec<Investment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, investment_type, initial_value, created_at
             FROM investments ORDER BY name COLLATE NOCASE, id",
        )?;
        let investments = stmt
            .query_map([], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(investments)
    }

    pub fn insert(&self, investment: &Investment) -> TrackerResult<i64> {
        self.conn.execute(
            "INSERT INTO investments (name, investment_type, initial_value, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                investment.name,
                investment.investment_type,
                investment.initial_value,
                investment.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update(&self, investment: &Investment) -> TrackerResult<bool> {
        let changed = self.conn.execute(
            "UPDATE investments SET name = ?2, investment_type = ?3, initial_value = ?4
             WHERE id = ?1",
            params![
                investment.id,
                investment.name,
                investment.investment_type,
                investment.initial_value,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete(&self, id: i64) -> TrackerResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM investments WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Value history, oldest first
    pub fn values(&self, investment_id: i64) -> TrackerResult<Vec<InvestmentValue>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, investment_id, year, month, value FROM investment_values
             WHERE investment_id = ?1 ORDER BY year, month",
        )?;
        let values = stmt
            .query_map(params![investment_id], Self::value_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(values)
    }

    pub fn upsert_value(&self, value: &InvestmentValue) -> TrackerResult<i64> {
        self.conn.execute(
            "INSERT INTO investment_values (investment_id, year, month, value)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(investment_id, year, month) DO UPDATE SET value = excluded.value",
            params![value.investment_id, value.year, value.month, value.value],
        )?;
        Ok(self.conn.query_row(
            "SELECT id FROM investment_values WHERE investment_id = ?1 AND year = ?2 AND month = ?3",
            params![value.investment_id, value.year, value.month],
            |row| row.get(0),
        )?)
    }

    pub fn delete_value(&self, investment_id: i64, value_id: i64) -> TrackerResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM investment_values WHERE id = ?1 AND investment_id = ?2",
            params![value_id, investment_id],
        )?;
        Ok(changed > 0)
    }

    /// Ids of investments without a value recorded for the month
    pub fn missing_value_ids(&self, year: i32, month: u32) -> TrackerResult<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT i.id FROM investments i
             WHERE NOT EXISTS (
                SELECT 1 FROM investment_values v
                WHERE v.investment_id = i.id AND v.year = ?1 AND v.month = ?2)
             ORDER BY i.id",
        )?;
        let ids = stmt
            .query_map(params![year, month], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }
}
