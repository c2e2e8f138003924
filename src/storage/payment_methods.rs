//! Payment method repository

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::TrackerResult;
use crate::models::payment_method::DEFAULT_METHODS;
use crate::models::{Money, PaymentMethod, PaymentMethodType};

const COLUMNS: &str = "id, display_name, method_type, full_name, account_details, credit_limit, \
                       current_balance, payment_due_day, billing_cycle_day, is_active, created_at";

/// Repository for payment methods
pub struct PaymentMethodRepository<'c> {
    conn: &'c Connection,
}

impl<'c> PaymentMethodRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<PaymentMethod> {
        Ok(PaymentMethod {
            id: row.get(0)?,
            display_name: row.get(1)?,
            method_type: row.get(2)?,
            full_name: row.get(3)?,
            account_details: row.get(4)?,
            credit_limit: row.get(5)?,
            current_balance: row.get(6)?,
            payment_due_day: row.get(7)?,
            billing_cycle_day: row.get(8)?,
            is_active: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    /// Insert the default methods that are not present yet
    pub fn seed_defaults(&self) -> TrackerResult<usize> {
        let now = Utc::now();
        let mut inserted = 0;
        for (name, method_type) in DEFAULT_METHODS {
            inserted += self.conn.execute(
                "INSERT OR IGNORE INTO payment_methods (display_name, method_type, created_at)
                 VALUES (?1, ?2, ?3)",
                params![name, method_type, now],
            )?;
        }
        if inserted > 0 {
            tracing::info!(inserted, "Seeded default payment methods");
        }
        Ok(inserted)
    }

    pub fn get(&self, id: i64) -> TrackerResult<Option<PaymentMethod>> {
        let sql = format!("SELECT {} FROM payment_methods WHERE id = ?1", COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::from_row)
            .optional()?)
    }

    /// Look up by display name (case-insensitive)
    pub fn get_by_name(&self, name: &str) -> TrackerResult<Option<PaymentMethod>> {
        let sql = format!(
            "SELECT {} FROM payment_methods WHERE display_name = ?1 COLLATE NOCASE",
            COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![name.trim()], Self::from_row)
            .optional()?)
    }

    /// All methods, active first then by name
    pub fn list(&self, active_only: bool) -> TrackerResult<Vec<PaymentMethod>> {
        let sql = format!(
            "SELECT {} FROM payment_methods {} ORDER BY is_active DESC, display_name COLLATE NOCASE",
            COLUMNS,
            if active_only { "WHERE is_active = 1" } else { "" }
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let methods = stmt
            .query_map([], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(methods)
    }

    pub fn insert(&self, method: &PaymentMethod) -> TrackerResult<i64> {
        self.conn.execute(
            "INSERT INTO payment_methods (display_name, method_type, full_name, account_details,
                credit_limit, current_balance, payment_due_day, billing_cycle_day, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                method.display_name,
                method.method_type,
                method.full_name,
                method.account_details,
                method.credit_limit,
                method.current_balance,
                method.payment_due_day,
                method.billing_cycle_day,
                method.is_active,
                method.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update(&self, method: &PaymentMethod) -> TrackerResult<bool> {
        let changed = self.conn.execute(
            "UPDATE payment_methods SET display_name = ?2, method_type = ?3, full_name = ?4,
                account_details = ?5, credit_limit = ?6, current_balance = ?7,
                payment_due_day = ?8, billing_cycle_day = ?9, is_active = ?10
             WHERE id = ?1",
            params![
                method.id,
                method.display_name,
                method.method_type,
                method.full_name,
                method.account_details,
                method.credit_limit,
                method.current_balance,
                method.payment_due_day,
                method.billing_cycle_day,
                method.is_active,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn set_active(&self, id: i64, active: bool) -> TrackerResult<bool> {
        let changed = self.conn.execute(
            "UPDATE payment_methods SET is_active = ?2 WHERE id = ?1",
            params![id, active],
        )?;
        Ok(changed > 0)
    }

    pub fn delete(&self, id: i64) -> TrackerResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM payment_methods WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Move a credit card's balance by `delta`; other method types are left alone
    pub fn adjust_balance(&self, id: i64, delta: Money) -> TrackerResult<()> {
        if delta.is_zero() {
            return Ok(());
        }
        self.conn.execute(
            "UPDATE payment_methods SET current_balance = current_balance + ?2
             WHERE id = ?1 AND method_type = ?3",
            params![id, delta, PaymentMethodType::CreditCard],
        )?;
        Ok(())
    }

    /// Number of expenses paid with the method
    pub fn usage_count(&self, id: i64) -> TrackerResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM expenses WHERE payment_method_id = ?1",
            params![id],
            |row| row.get(0),
        )?)
    }
}
