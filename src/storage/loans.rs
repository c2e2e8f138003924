//! Loan and balance history repository

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::TrackerResult;
use crate::models::{Loan, LoanBalance};

const COLUMNS: &str = "id, name, initial_balance, start_date, loan_type, notes, is_paid_off, \
                       amortization_period, term_length, renewal_date, rate_type, payment_frequency, \
                       estimated_property_value, created_at";

pub struct LoanRepository<'c> {
    conn: &'c Connection,
}

impl<'c> LoanRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Loan> {
        Ok(Loan {
            id: row.get(0)?,
            name: row.get(1)?,
            initial_balance: row.get(2)?,
            start_date: row.get(3)?,
            loan_type: row.get(4)?,
            notes: row.get(5)?,
            is_paid_off: row.get(6)?,
            amortization_period: row.get(7)?,
            term_length: row.get(8)?,
            renewal_date: row.get(9)?,
            rate_type: row.get(10)?,
            payment_frequency: row.get(11)?,
            estimated_property_value: row.get(12)?,
            created_at: row.get(13)?,
        })
    }

    fn balance_from_row(row: &Row<'_>) -> rusqlite::Result<LoanBalance> {
        Ok(LoanBalance {
            id: row.get(0)?,
            loan_id: row.get(1)?,
            year: row.get(2)?,
            month: row.get(3)?,
            remaining_balance: row.get(4)?,
            rate: row.get(5)?,
        })
    }

    pub fn get(&self, id: i64) -> TrackerResult<Option<Loan>> {
        let sql = format!("SELECT {} FROM loans WHERE id = ?1", COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::from_row)
            .optional()?)
    }

    /// Active loans first, then by start date
    pub fn list(&self) -> TrackerResult<Vec<Loan>> {
        let sql = format!(
            "SELECT {} FROM loans ORDER BY is_paid_off, start_date, id",
            COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let loans = stmt
            .query_map([], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(loans)
    }

    pub fn insert(&self, loan: &Loan) -> TrackerResult<i64> {
        self.conn.execute(
            "INSERT INTO loans (name, initial_balance, start_date, loan_type, notes, is_paid_off,
                amortization_period, term_length, renewal_date, rate_type, payment_frequency,
                estimated_property_value, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                loan.name,
                loan.initial_balance,
                loan.start_date,
                loan.loan_type,
                loan.notes,
                loan.is_paid_off,
                loan.amortization_period,
                loan.term_length,
                loan.renewal_date,
                loan.rate_type,
                loan.payment_frequency,
                loan.estimated_property_value,
                loan.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update(&self, loan: &Loan) -> TrackerResult<bool> {
        let changed = self.conn.execute(
            "UPDATE loans SET name = ?2, initial_balance = ?3, start_date = ?4, loan_type = ?5,
                notes = ?6, is_paid_off = ?7, amortization_period = ?8, term_length = ?9,
                renewal_date = ?10, rate_type = ?11, payment_frequency = ?12,
                estimated_property_value = ?13
             WHERE id = ?1",
            params![
                loan.id,
                loan.name,
                loan.initial_balance,
                loan.start_date,
                loan.loan_type,
                loan.notes,
                loan.is_paid_off,
                loan.amortization_period,
                loan.term_length,
                loan.renewal_date,
                loan.rate_type,
                loan.payment_frequency,
                loan.estimated_property_value,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn set_paid_off(&self, id: i64, paid_off: bool) -> TrackerResult<()> {
        self.conn.execute(
            "UPDATE loans SET is_paid_off = ?2 WHERE id = ?1",
            params![id, paid_off],
        )?;
        Ok(())
    }

    /// Delete a loan; balances cascade and linked fixed expenses are unlinked
    pub fn delete(&self, id: i64) -> TrackerResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM loans WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Balance history, oldest first
    pub fn balances(&self, loan_id: i64) -> TrackerResult<Vec<LoanBalance>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, loan_id, year, month, remaining_balance, rate FROM loan_balances
             WHERE loan_id = ?1 ORDER BY year, month",
        )?;
        let balances = stmt
            .query_map(params![loan_id], Self::balance_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(balances)
    }

    /// Insert or replace the balance recorded for (loan, year, month)
    pub fn upsert_balance(&self, balance: &LoanBalance) -> TrackerResult<i64> {
        self.conn.execute(
            "INSERT INTO loan_balances (loan_id, year, month, remaining_balance, rate)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(loan_id, year, month)
             DO UPDATE SET remaining_balance = excluded.remaining_balance, rate = excluded.rate",
            params![
                balance.loan_id,
                balance.year,
                balance.month,
                balance.remaining_balance,
                balance.rate,
            ],
        )?;
        Ok(self.conn.query_row(
            "SELECT id FROM loan_balances WHERE loan_id = ?1 AND year = ?2 AND month = ?3",
            params![balance.loan_id, balance.year, balance.month],
            |row| row.get(0),
        )?)
    }

    pub fn delete_balance(&self, loan_id: i64, balance_id: i64) -> TrackerResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM loan_balances WHERE id = ?1 AND loan_id = ?2",
            params![balance_id, loan_id],
        )?;
        Ok(changed > 0)
    }

    /// Ids of unpaid loans without a balance recorded for the month
    pub fn missing_balance_ids(&self, year: i32, month: u32) -> TrackerResult<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.id FROM loans l
             WHERE l.is_paid_off = 0 AND NOT EXISTS (
                SELECT 1 FROM loan_balances b
                WHERE b.loan_id = l.id AND b.year = ?1 AND b.month = ?2)
             ORDER BY l.id",
        )?;
        let ids = stmt
            .query_map(params![year, month], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }
}
