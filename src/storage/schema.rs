//! Database schema and migrations
//!
//! Tables are created idempotently on every open. Columns added after the
//! first release are applied by inspecting `PRAGMA table_info`, so older
//! databases pick them up without a separate migration tool.

use rusqlite::Connection;

use crate::error::TrackerResult;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS people (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL CHECK (length(trim(name)) > 0),
    date_of_birth TEXT,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS payment_methods (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    display_name      TEXT NOT NULL UNIQUE,
    method_type       TEXT NOT NULL CHECK (method_type IN ('cash', 'cheque', 'debit', 'credit_card')),
    full_name         TEXT,
    account_details   TEXT,
    credit_limit      INTEGER CHECK (credit_limit IS NULL OR credit_limit >= 0),
    current_balance   INTEGER NOT NULL DEFAULT 0,
    payment_due_day   INTEGER CHECK (payment_due_day IS NULL OR payment_due_day BETWEEN 1 AND 31),
    billing_cycle_day INTEGER CHECK (billing_cycle_day IS NULL OR billing_cycle_day BETWEEN 1 AND 31),
    is_active         INTEGER NOT NULL DEFAULT 1,
    created_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS recurring_expenses (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    place        TEXT NOT NULL,
    amount       INTEGER NOT NULL CHECK (amount > 0),
    notes        TEXT NOT NULL DEFAULT '',
    category     TEXT NOT NULL CHECK (category IN (
                    'Housing', 'Utilities', 'Groceries', 'Dining Out', 'Insurance', 'Gas',
                    'Vehicle Maintenance', 'Entertainment', 'Subscriptions',
                    'Recreation Activities', 'Pet Care', 'Tax - Medical', 'Tax - Donation', 'Other')),
    method       TEXT NOT NULL,
    day_of_month INTEGER NOT NULL CHECK (day_of_month BETWEEN 1 AND 31),
    start_month  TEXT NOT NULL,
    end_month    TEXT,
    paused       INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS expenses (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    date               TEXT NOT NULL,
    place              TEXT NOT NULL DEFAULT '',
    notes              TEXT NOT NULL DEFAULT '',
    amount             INTEGER NOT NULL CHECK (amount >= 0),
    category           TEXT NOT NULL CHECK (category IN (
                          'Housing', 'Utilities', 'Groceries', 'Dining Out', 'Insurance', 'Gas',
                          'Vehicle Maintenance', 'Entertainment', 'Subscriptions',
                          'Recreation Activities', 'Pet Care', 'Tax - Medical', 'Tax - Donation', 'Other')),
    week               INTEGER NOT NULL CHECK (week BETWEEN 1 AND 5),
    method             TEXT NOT NULL,
    payment_method_id  INTEGER REFERENCES payment_methods(id) ON DELETE SET NULL,
    insurance_eligible INTEGER NOT NULL DEFAULT 0,
    claim_status       TEXT CHECK (claim_status IS NULL OR claim_status IN ('not_claimed', 'in_progress', 'paid', 'denied')),
    original_cost      INTEGER CHECK (original_cost IS NULL OR original_cost >= 0),
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date);
CREATE INDEX IF NOT EXISTS idx_expenses_category ON expenses(category);
CREATE INDEX IF NOT EXISTS idx_expenses_place ON expenses(place);

CREATE TABLE IF NOT EXISTS expense_people (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    expense_id INTEGER NOT NULL REFERENCES expenses(id) ON DELETE CASCADE,
    person_id  INTEGER NOT NULL REFERENCES people(id) ON DELETE CASCADE,
    amount     INTEGER NOT NULL CHECK (amount >= 0),
    UNIQUE (expense_id, person_id)
);

CREATE TABLE IF NOT EXISTS expense_invoices (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    expense_id        INTEGER NOT NULL REFERENCES expenses(id) ON DELETE CASCADE,
    person_id         INTEGER REFERENCES people(id) ON DELETE SET NULL,
    filename          TEXT NOT NULL UNIQUE,
    original_filename TEXT NOT NULL,
    file_path         TEXT NOT NULL,
    file_size         INTEGER NOT NULL CHECK (file_size >= 0),
    mime_type         TEXT NOT NULL,
    upload_date       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_invoices_expense ON expense_invoices(expense_id);

CREATE TABLE IF NOT EXISTS income_sources (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    year       INTEGER NOT NULL,
    month      INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
    name       TEXT NOT NULL,
    amount     INTEGER NOT NULL CHECK (amount >= 0),
    category   TEXT NOT NULL DEFAULT 'Other' CHECK (category IN ('Salary', 'Government', 'Gifts', 'Other')),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS loans (
    id                       INTEGER PRIMARY KEY AUTOINCREMENT,
    name                     TEXT NOT NULL,
    initial_balance          INTEGER NOT NULL CHECK (initial_balance >= 0),
    start_date               TEXT NOT NULL,
    loan_type                TEXT NOT NULL DEFAULT 'loan' CHECK (loan_type IN ('loan', 'line_of_credit', 'mortgage')),
    notes                    TEXT NOT NULL DEFAULT '',
    is_paid_off              INTEGER NOT NULL DEFAULT 0,
    amortization_period      INTEGER,
    term_length              INTEGER,
    renewal_date             TEXT,
    rate_type                TEXT CHECK (rate_type IS NULL OR rate_type IN ('fixed', 'variable')),
    payment_frequency        TEXT CHECK (payment_frequency IS NULL OR payment_frequency IN ('monthly', 'bi-weekly', 'accelerated_bi-weekly', 'weekly')),
    estimated_property_value INTEGER CHECK (estimated_property_value IS NULL OR estimated_property_value >= 0),
    created_at               TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS loan_balances (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    loan_id           INTEGER NOT NULL REFERENCES loans(id) ON DELETE CASCADE,
    year              INTEGER NOT NULL,
    month             INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
    remaining_balance INTEGER NOT NULL CHECK (remaining_balance >= 0),
    rate              REAL NOT NULL DEFAULT 0 CHECK (rate >= 0),
    UNIQUE (loan_id, year, month)
);

CREATE TABLE IF NOT EXISTS fixed_expenses (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    year            INTEGER NOT NULL,
    month           INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
    name            TEXT NOT NULL,
    amount          INTEGER NOT NULL CHECK (amount >= 0),
    category        TEXT NOT NULL,
    payment_type    TEXT NOT NULL,
    payment_due_day INTEGER CHECK (payment_due_day IS NULL OR payment_due_day BETWEEN 1 AND 31),
    linked_loan_id  INTEGER REFERENCES loans(id) ON DELETE SET NULL,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS investments (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL,
    investment_type TEXT NOT NULL CHECK (investment_type IN ('TFSA', 'RRSP', 'other')),
    initial_value   INTEGER NOT NULL CHECK (initial_value >= 0),
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS investment_values (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    investment_id INTEGER NOT NULL REFERENCES investments(id) ON DELETE CASCADE,
    year          INTEGER NOT NULL,
    month         INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
    value         INTEGER NOT NULL CHECK (value >= 0),
    UNIQUE (investment_id, year, month)
);
"#;

/// Columns added after the initial schema: (table, column, definition)
const ADDED_COLUMNS: &[(&str, &str, &str)] = &[
    (
        "expenses",
        "recurring_id",
        "INTEGER REFERENCES recurring_expenses(id) ON DELETE SET NULL",
    ),
    ("expense_people", "original_amount", "INTEGER"),
];

/// Create tables and apply column migrations
pub fn initialize(conn: &Connection) -> TrackerResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA_SQL)?;
    run_migrations(conn)?;
    Ok(())
}

fn run_migrations(conn: &Connection) -> TrackerResult<()> {
    for (table, column, definition) in ADDED_COLUMNS {
        let columns = table_columns(conn, table)?;
        if !columns.iter().any(|c| c == column) {
            conn.execute_batch(&format!(
                "ALTER TABLE {} ADD COLUMN {} {};",
                table, column, definition
            ))?;
            tracing::info!(table, column, "Added column");
        }
    }

    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_expenses_recurring ON expenses(recurring_id);",
    )?;

    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> TrackerResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        initialize(&conn).unwrap();

        let columns = table_columns(&conn, "expenses").unwrap();
        assert!(columns.contains(&"recurring_id".to_string()));
        assert!(columns.contains(&"claim_status".to_string()));
    }

    #[test]
    fn test_category_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO expenses (date, amount, category, week, method, created_at, updated_at)
             VALUES ('2025-01-01', 100, 'Travel', 1, 'Cash', '', '')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_claim_status_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO expenses (date, amount, category, week, method, claim_status, created_at, updated_at)
             VALUES ('2025-01-01', 100, 'Tax - Medical', 1, 'Cash', 'lost', '', '')",
            [],
        );
        assert!(result.is_err());
    }
}
