//! CLI command handlers for CSV validation, import and workbook conversion
//!
//! The file layout is the spreadsheet export: three header rows, then
//! Date, Place, Amount, Notes, Type, Week, Method.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::{TrackerError, TrackerResult};
use crate::services::{ImportService, RowError, WorkbookConverter};
use crate::storage::Storage;

/// Rows shown before the error list is cut short
const MAX_ERRORS_SHOWN: usize = 20;

fn print_errors(errors: &[RowError]) {
    for error in errors.iter().take(MAX_ERRORS_SHOWN) {
        println!("  Row {}: {}", error.row, error.error);
    }
    if errors.len() > MAX_ERRORS_SHOWN {
        println!("  ... and {} more", errors.len() - MAX_ERRORS_SHOWN);
    }
}

fn check_exists(file: &Path) -> TrackerResult<()> {
    if !file.exists() {
        return Err(TrackerError::Import(format!(
            "File not found: {}",
            file.display()
        )));
    }
    Ok(())
}

/// Handle `validate`: report problems without writing anything
///
/// Fails when any row is invalid so scripts can check the exit status.
pub fn handle_validate_command(storage: &Storage, file: &Path) -> TrackerResult<()> {
    check_exists(file)?;
    let report = ImportService::new(storage).validate_file(file)?;

    println!("Validation of {}", file.display());
    println!("{}", "=".repeat(40));
    println!("  Valid rows:    {}", report.valid_count);
    println!("  Invalid rows:  {}", report.invalid_count);

    if report.is_valid() {
        println!();
        println!("File is ready to import.");
        return Ok(());
    }

    println!();
    print_errors(&report.errors);
    Err(TrackerError::Import(format!(
        "{} invalid row(s) in {}",
        report.invalid_count,
        file.display()
    )))
}

/// Handle `import`: insert new rows, skipping duplicates and invalid rows
pub fn handle_import_command(storage: &Storage, file: &Path) -> TrackerResult<()> {
    check_exists(file)?;
    let result = ImportService::new(storage).import_file(file)?;

    println!("Import Complete!");
    println!("  Imported:    {}", result.imported);
    println!("  Skipped:     {}", result.duplicates_skipped);
    if !result.errors.is_empty() {
        println!("  Errors:      {}", result.errors.len());
        print_errors(&result.errors);
    }

    Ok(())
}

/// Handle `convert`: turn a workbook into a CSV ready for `import`
pub fn handle_convert_command(
    file: &Path,
    output: Option<PathBuf>,
    since: Option<NaiveDate>,
) -> TrackerResult<()> {
    check_exists(file)?;
    let output = output.unwrap_or_else(|| WorkbookConverter::default_output(file));

    println!("Reading workbook: {}", file.display());
    let report = WorkbookConverter::new(since).convert_file(file, &output)?;

    for sheet in &report.sheets {
        match &sheet.skipped {
            Some(reason) => println!("  Skipped '{}' ({})", sheet.name, reason),
            None => println!("  Read '{}': {} rows", sheet.name, sheet.rows),
        }
    }
    println!();
    println!("Converted {} rows to: {}", report.total_rows, report.output.display());
    println!("Run 'expense-tracker validate' on it before importing.");

    Ok(())
}
