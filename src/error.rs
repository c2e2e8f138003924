//! Custom error types for the expense tracker
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions. The HTTP layer maps these onto status codes
//! in `api::error`.

use thiserror::Error;

/// The main error type for expense tracker operations
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for request data and models
    #[error("{0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Duplicate entity errors
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: &'static str,
        identifier: String,
    },

    /// SQLite errors
    #[error("Database error: {0}")]
    Database(String),

    /// Storage errors (locking, directory layout)
    #[error("Storage error: {0}")]
    Storage(String),

    /// CSV import errors
    #[error("Import error: {0}")]
    Import(String),

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),

    /// Invoice upload errors
    #[error("Upload error: {0}")]
    Upload(String),
}

impl TrackerError {
    /// Create a "not found" error for expenses
    pub fn expense_not_found(identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: "Expense",
            identifier: identifier.to_string(),
        }
    }

    /// Create a "not found" error for people
    pub fn person_not_found(identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: "Person",
            identifier: identifier.to_string(),
        }
    }

    /// Create a "not found" error for invoices
    pub fn invoice_not_found(identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: "Invoice",
            identifier: identifier.to_string(),
        }
    }

    /// Create a "not found" error for loans
    pub fn loan_not_found(identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: "Loan",
            identifier: identifier.to_string(),
        }
    }

    /// Create a "not found" error for investments
    pub fn investment_not_found(identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: "Investment",
            identifier: identifier.to_string(),
        }
    }

    /// Create a "not found" error for payment methods
    pub fn payment_method_not_found(identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: "Payment method",
            identifier: identifier.to_string(),
        }
    }

    /// Create a "not found" error for income sources
    pub fn income_not_found(identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: "Income source",
            identifier: identifier.to_string(),
        }
    }

    /// Create a "not found" error for fixed expenses
    pub fn fixed_expense_not_found(identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: "Fixed expense",
            identifier: identifier.to_string(),
        }
    }

    /// Create a "not found" error for recurring templates
    pub fn recurring_not_found(identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: "Recurring expense",
            identifier: identifier.to_string(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether the error was caused by the caller rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Duplicate { .. } | Self::Import(_) | Self::Upload(_)
        )
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for TrackerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<rusqlite::Error> for TrackerError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<csv::Error> for TrackerError {
    fn from(err: csv::Error) -> Self {
        Self::Import(err.to_string())
    }
}

/// Result type alias for expense tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;
