//! Storage layer for the expense tracker
//!
//! A single SQLite connection sits behind a mutex in [`Storage`]. Services
//! lock it for the duration of one operation and hand the connection (or a
//! transaction, which derefs to one) to the per-resource repositories.

pub mod expenses;
pub mod file_io;
pub mod fixed_expenses;
pub mod income;
pub mod investments;
pub mod invoices;
pub mod loans;
pub mod payment_methods;
pub mod people;
pub mod recurring;
pub mod schema;
pub mod sql;

pub use expenses::{ExpenseQuery, ExpenseRepository};
pub use file_io::{read_json, remove_file_if_exists, write_bytes_atomic, write_json_atomic};
pub use fixed_expenses::FixedExpenseRepository;
pub use income::IncomeRepository;
pub use investments::InvestmentRepository;
pub use invoices::InvoiceRepository;
pub use loans::LoanRepository;
pub use payment_methods::PaymentMethodRepository;
pub use people::PersonRepository;
pub use recurring::RecurringRepository;

use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::paths::TrackerPaths;
use crate::error::{TrackerError, TrackerResult};

/// Main storage coordinator owning the database connection
pub struct Storage {
    paths: TrackerPaths,
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open (creating if needed) the database under the given paths
    pub fn open(paths: TrackerPaths) -> TrackerResult<Self> {
        paths.ensure_directories()?;
        let conn = Connection::open(paths.database_file())?;
        Self::from_connection(paths, conn)
    }

    /// Open a throwaway in-memory database; invoices still go under `paths`
    pub fn open_in_memory(paths: TrackerPaths) -> TrackerResult<Self> {
        paths.ensure_directories()?;
        let conn = Connection::open_in_memory()?;
        Self::from_connection(paths, conn)
    }

    fn from_connection(paths: TrackerPaths, conn: Connection) -> TrackerResult<Self> {
        schema::initialize(&conn)?;
        PaymentMethodRepository::new(&conn).seed_defaults()?;
        Ok(Self {
            paths,
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection for one unit of work
    pub fn connection(&self) -> TrackerResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| TrackerError::Storage(format!("Failed to acquire database lock: {}", e)))
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &TrackerPaths {
        &self.paths
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::create_test_storage;

    #[test]
    fn test_storage_creation() {
        let (temp_dir, storage) = create_test_storage();

        assert!(temp_dir.path().join("data").join("expenses.db").exists());
        assert!(temp_dir.path().join("invoices").exists());
        assert!(storage.paths().is_initialized());
    }

    #[test]
    fn test_reopen_keeps_seeded_methods_unique() {
        let (temp_dir, storage) = create_test_storage();
        drop(storage);

        let paths = crate::config::TrackerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = super::Storage::open(paths).unwrap();
        let conn = storage.connection().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM payment_methods", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 7);
    }
}
