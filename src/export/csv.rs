//! CSV Export functionality
//!
//! Writes expenses in the spreadsheet layout the importer reads, so an
//! export can be edited and imported again.

use std::io::Write;

use crate::error::{TrackerError, TrackerResult};
use crate::models::ExpenseFilter;
use crate::services::import::HEADER_ROWS;
use crate::services::ExpenseService;
use crate::storage::Storage;

/// Column headings, written on the last of the ignored header rows
pub const COLUMNS: [&str; 7] = ["Date", "Place", "Amount", "Notes", "Type", "Week", "Method"];

/// Export the expenses matching `filter`; returns the number of rows written
pub fn export_expenses_csv<W: Write>(
    storage: &Storage,
    filter: &ExpenseFilter,
    mut writer: W,
) -> TrackerResult<usize> {
    let expenses = ExpenseService::new(storage).list(filter)?;

    for _ in 1..HEADER_ROWS {
        writeln!(writer).map_err(|e| TrackerError::Export(e.to_string()))?;
    }

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(COLUMNS).map_err(export_error)?;
    for e in &expenses {
        csv.write_record([
            e.date.format("%Y-%m-%d").to_string(),
            e.place.clone(),
            format!("{:.2}", e.amount.to_f64()),
            e.notes.clone(),
            e.category.to_string(),
            e.week.to_string(),
            e.method.clone(),
        ])
        .map_err(export_error)?;
    }
    csv.flush().map_err(|e| TrackerError::Export(e.to_string()))?;

    tracing::info!(rows = expenses.len(), "Exported expenses to CSV");
    Ok(expenses.len())
}

fn export_error(e: csv::Error) -> TrackerError {
    TrackerError::Export(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExpenseCategory, ExpenseInput, Money};
    use crate::services::ImportService;
    use crate::storage::test_support::create_test_storage;

    #[test]
    fn test_export_can_be_imported_again() {
        let (_temp_dir, storage) = create_test_storage();
        let mut input = ExpenseInput::new(
            "2025-05-06".parse().unwrap(),
            "Loblaws, Main St",
            Money::from_cents(4510),
            ExpenseCategory::Groceries,
            "Debit",
        );
        input.notes = "Weekly shop".into();
        ExpenseService::new(&storage).create(input).unwrap();

        let mut buffer = Vec::new();
        let rows = export_expenses_csv(&storage, &ExpenseFilter::default(), &mut buffer).unwrap();
        assert_eq!(rows, 1);

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "");
        assert_eq!(lines[2], "Date,Place,Amount,Notes,Type,Week,Method");
        assert_eq!(
            lines[3],
            "2025-05-06,\"Loblaws, Main St\",45.10,Weekly shop,Groceries,1,Debit"
        );

        let (_other_dir, other) = create_test_storage();
        let result = ImportService::new(&other).import(text.as_bytes()).unwrap();
        assert_eq!(result.imported, 1);
        assert!(result.errors.is_empty());
    }
}
