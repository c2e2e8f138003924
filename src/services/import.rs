//! CSV Import service
//!
//! Imports expenses from the spreadsheet export format: three leading rows
//! that are ignored, then one expense per row with the columns
//! Date, Place, Amount, Notes, Type, Week, Method.
//!
//! Rows are first parsed and checked (`preview`), which is also what the
//! `validate` command reports. Importing then inserts every valid row that
//! does not duplicate an existing expense.

use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;

use crate::error::{TrackerError, TrackerResult};
use crate::models::period::week_of_month;
use crate::models::{ExpenseCategory, ExpenseInput, Money};
use crate::services::expense::ExpenseService;
use crate::storage::{ExpenseQuery, ExpenseRepository, PaymentMethodRepository, Storage};

/// Rows ignored at the top of every file
pub const HEADER_ROWS: usize = 3;
/// Columns every data row must have
pub const REQUIRED_COLUMNS: usize = 7;

/// Date formats accepted in the Date column, tried in order
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%d-%b-%Y", "%Y/%m/%d"];

/// The raw text of one data row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawRow {
    pub date: String,
    pub place: String,
    pub amount: String,
    pub notes: String,
    #[serde(rename = "Type")]
    pub expense_type: String,
    pub week: String,
    pub method: String,
}

impl RawRow {
    fn from_record(record: &StringRecord) -> Self {
        let field = |i: usize| record.get(i).map(|s| s.trim().to_string()).unwrap_or_default();
        Self {
            date: field(0),
            place: field(1),
            amount: field(2),
            notes: field(3),
            expense_type: field(4),
            week: field(5),
            method: field(6),
        }
    }
}

/// A row that passed validation
#[derive(Debug, Clone)]
pub struct ParsedExpense {
    /// 1-based line number in the file
    pub row: usize,
    pub date: NaiveDate,
    pub place: String,
    pub amount: Money,
    pub notes: String,
    pub category: ExpenseCategory,
    pub week: u8,
    pub method: String,
}

impl ParsedExpense {
    /// Fields two rows must share to count as the same expense
    fn duplicate_key(&self) -> (NaiveDate, String, Money, ExpenseCategory) {
        (
            self.date,
            self.place.to_ascii_lowercase(),
            self.amount,
            self.category,
        )
    }

    fn to_input(&self) -> ExpenseInput {
        let mut input = ExpenseInput::new(
            self.date,
            self.place.clone(),
            self.amount,
            self.category,
            self.method.clone(),
        );
        input.notes = self.notes.clone();
        input.week = Some(self.week);
        input
    }
}

/// A row that failed validation
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    pub row: usize,
    /// Every problem with the row, joined with "; "
    pub error: String,
    /// Parsed fields, when the row had enough columns
    pub data: Option<RawRow>,
    /// The raw fields otherwise
    pub raw: Option<Vec<String>>,
}

/// Status of a row for import preview
#[derive(Debug, Clone)]
pub enum ImportStatus {
    /// Row will be imported
    New(ParsedExpense),
    /// An identical expense already exists, or an earlier row of the same
    /// file is identical; the row will be skipped
    Duplicate(ParsedExpense),
    /// Row has errors and cannot be imported
    Error(RowError),
}

/// Outcome of validating a file without importing it
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid_count: usize,
    pub invalid_count: usize,
    pub errors: Vec<RowError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Result of a completed import
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportResult {
    pub imported: usize,
    pub duplicates_skipped: usize,
    pub imported_ids: Vec<i64>,
    pub errors: Vec<RowError>,
}

/// Service for CSV import
pub struct ImportService<'a> {
    storage: &'a Storage,
}

impl<'a> ImportService<'a> {
    /// Create a new import service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Parse and check every data row of a file
    pub fn preview<R: std::io::Read>(&self, reader: R) -> TrackerResult<Vec<ImportStatus>> {
        let records = read_records(reader)?;

        let conn = self.storage.connection()?;
        let methods: Vec<String> = PaymentMethodRepository::new(&conn)
            .list(true)?
            .into_iter()
            .map(|m| m.display_name)
            .collect();
        let expenses = ExpenseRepository::new(&conn);

        let mut seen = HashSet::new();
        let mut preview = Vec::with_capacity(records.len());
        for (row, record) in records {
            match parse_record(row, &record, &methods) {
                Ok(parsed) => {
                    if !seen.insert(parsed.duplicate_key()) || is_duplicate(&expenses, &parsed)? {
                        preview.push(ImportStatus::Duplicate(parsed));
                    } else {
                        preview.push(ImportStatus::New(parsed));
                    }
                }
                Err(error) => preview.push(ImportStatus::Error(error)),
            }
        }
        Ok(preview)
    }

    /// Validate a file without writing anything
    pub fn validate<R: std::io::Read>(&self, reader: R) -> TrackerResult<ValidationReport> {
        let preview = self.preview(reader)?;
        let total = preview.len();
        let errors: Vec<RowError> = preview
            .into_iter()
            .filter_map(|status| match status {
                ImportStatus::Error(e) => Some(e),
                _ => None,
            })
            .collect();
        Ok(ValidationReport {
            valid_count: total - errors.len(),
            invalid_count: errors.len(),
            errors,
        })
    }

    pub fn validate_file(&self, path: &Path) -> TrackerResult<ValidationReport> {
        self.validate(open(path)?)
    }

    /// Import every new valid row in one transaction; invalid rows are reported
    pub fn import<R: std::io::Read>(&self, reader: R) -> TrackerResult<ImportResult> {
        let preview = self.preview(reader)?;
        let mut result = ImportResult::default();

        let mut conn = self.storage.connection()?;
        let tx = conn.transaction()?;
        for status in preview {
            match status {
                ImportStatus::New(parsed) => {
                    match ExpenseService::create_in(&tx, parsed.to_input(), None) {
                        Ok(expense) => {
                            result.imported += 1;
                            result.imported_ids.push(expense.id);
                        }
                        Err(e) if e.is_client_error() || e.is_not_found() => {
                            result.errors.push(RowError {
                                row: parsed.row,
                                error: e.to_string(),
                                data: None,
                                raw: None,
                            });
                        }
                        Err(e) => return Err(e),
                    }
                }
                ImportStatus::Duplicate(_) => result.duplicates_skipped += 1,
                ImportStatus::Error(error) => result.errors.push(error),
            }
        }
        tx.commit()?;

        tracing::info!(
            imported = result.imported,
            duplicates = result.duplicates_skipped,
            errors = result.errors.len(),
            "Imported expenses from CSV"
        );
        Ok(result)
    }

    pub fn import_file(&self, path: &Path) -> TrackerResult<ImportResult> {
        self.import(open(path)?)
    }
}

fn open(path: &Path) -> TrackerResult<std::fs::File> {
    std::fs::File::open(path).map_err(|e| {
        TrackerError::Import(format!("Failed to open {}: {}", path.display(), e))
    })
}

/// Data records with their 1-based line numbers, after the header rows
fn read_records<R: std::io::Read>(mut reader: R) -> TrackerResult<Vec<(usize, StringRecord)>> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(|e| TrackerError::Import(format!("Failed to read CSV: {}", e)))?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    // Header rows are physical lines and are often blank, which the csv
    // reader would otherwise skip over.
    let mut offset = 0;
    for _ in 0..HEADER_ROWS {
        match content[offset..].find('\n') {
            Some(i) => offset += i + 1,
            None => {
                offset = content.len();
                break;
            }
        }
    }

    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content[offset..].as_bytes());

    let mut records = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        let line = record
            .position()
            .map_or(records.len() + 1, |p| p.line() as usize);
        records.push((HEADER_ROWS + line, record));
    }
    Ok(records)
}

/// Check one data row, collecting every problem with it
fn parse_record(
    row: usize,
    record: &StringRecord,
    methods: &[String],
) -> Result<ParsedExpense, RowError> {
    if record.len() < REQUIRED_COLUMNS {
        return Err(RowError {
            row,
            error: format!(
                "Not enough columns (has {}, needs {})",
                record.len(),
                REQUIRED_COLUMNS
            ),
            data: None,
            raw: Some(record.iter().map(|s| s.to_string()).collect()),
        });
    }

    let raw = RawRow::from_record(record);
    let mut errors = Vec::new();

    let date = if raw.date.is_empty() {
        errors.push("Missing Date".to_string());
        None
    } else {
        let parsed = parse_date(&raw.date);
        if parsed.is_none() {
            errors.push(format!("Invalid Date: \"{}\"", raw.date));
        }
        parsed
    };

    let amount = if raw.amount.is_empty() {
        errors.push("Missing Amount".to_string());
        None
    } else {
        match Money::parse(&raw.amount) {
            Ok(amount) if amount.is_positive() => Some(amount),
            Ok(_) => {
                errors.push(format!("Amount must be greater than zero: \"{}\"", raw.amount));
                None
            }
            Err(_) => {
                errors.push(format!("Invalid Amount: \"{}\"", raw.amount));
                None
            }
        }
    };

    let category = if raw.expense_type.is_empty() {
        errors.push("Missing Type".to_string());
        None
    } else {
        let parsed = ExpenseCategory::parse(&raw.expense_type);
        if parsed.is_none() {
            errors.push(format!(
                "Invalid Type: \"{}\" (must be one of: {})",
                raw.expense_type,
                ExpenseCategory::names().join(", ")
            ));
        }
        parsed
    };

    let method = if raw.method.is_empty() {
        errors.push("Missing Method".to_string());
        None
    } else {
        let found = methods
            .iter()
            .find(|m| m.eq_ignore_ascii_case(&raw.method))
            .cloned();
        if found.is_none() {
            errors.push(format!(
                "Invalid Method: \"{}\" (must be one of: {})",
                raw.method,
                methods.join(", ")
            ));
        }
        found
    };

    match (date, amount, category, method) {
        (Some(date), Some(amount), Some(category), Some(method)) if errors.is_empty() => {
            let week = raw
                .week
                .parse::<u8>()
                .ok()
                .filter(|w| (1..=5).contains(w))
                .unwrap_or_else(|| week_of_month(date));
            Ok(ParsedExpense {
                row,
                date,
                place: raw.place,
                amount,
                notes: raw.notes,
                category,
                week,
                method,
            })
        }
        _ => Err(RowError {
            row,
            error: errors.join("; "),
            data: Some(raw),
            raw: None,
        }),
    }
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    // Spreadsheet exports sometimes carry a time component
    let s = s.split_whitespace().next().unwrap_or(s);
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
}

/// Whether an expense with the same date, place, amount and category exists
fn is_duplicate(expenses: &ExpenseRepository<'_>, parsed: &ParsedExpense) -> TrackerResult<bool> {
    let query = ExpenseQuery {
        place: Some(parsed.place.clone()),
        ..ExpenseQuery::between(parsed.date, parsed.date)
    };
    Ok(expenses
        .list(&query)?
        .iter()
        .any(|e| e.amount == parsed.amount && e.category == parsed.category))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::create_test_storage;

    const HEADER: &str = "\n\n\n";

    fn csv(rows: &[&str]) -> String {
        format!("{}{}\n", HEADER, rows.join("\n"))
    }

    #[test]
    fn test_validate_reports_row_errors() {
        let (_temp_dir, storage) = create_test_storage();
        let service = ImportService::new(&storage);

        let data = csv(&[
            "2025-01-04,Costco,$123.45,,Groceries,1,Debit",
            ",Shell,abc,,Travel,1,",
            "2025-01-05,Too short",
            "2025-01-06,Vet,\"1,200.00\",Checkup,Pet Care,1,VISA",
        ]);
        let report = service.validate(data.as_bytes()).unwrap();

        assert_eq!(report.valid_count, 2);
        assert_eq!(report.invalid_count, 2);
        assert!(!report.is_valid());

        let first = &report.errors[0];
        assert_eq!(first.row, 5);
        assert!(first.error.starts_with("Missing Date; Invalid Amount: \"abc\"; Invalid Type: \"Travel\""));
        assert!(first.error.ends_with("Missing Method"));

        let second = &report.errors[1];
        assert_eq!(second.row, 6);
        assert_eq!(second.error, "Not enough columns (has 2, needs 7)");
    }

    #[test]
    fn test_import_inserts_valid_rows_and_skips_duplicates() {
        let (_temp_dir, storage) = create_test_storage();
        let service = ImportService::new(&storage);

        let data = csv(&[
            "2025-02-03,Loblaws,45.10,Weekly shop,Groceries,1,Debit",
            "2025-02-10,Dentist,$220.00,Cleaning,Tax - Medical,2,VISA",
            "2025-02-11,Mystery,10.00,,Other,2,Gift card",
        ]);
        let result = service.import(data.as_bytes()).unwrap();
        assert_eq!(result.imported, 2);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].row, 6);

        let again = service.import(data.as_bytes()).unwrap();
        assert_eq!(again.imported, 0);
        assert_eq!(again.duplicates_skipped, 2);

        let expense = ExpenseService::new(&storage)
            .get(result.imported_ids[1])
            .unwrap();
        assert_eq!(expense.amount.cents(), 22000);
        assert_eq!(expense.category, ExpenseCategory::TaxMedical);
        assert_eq!(expense.week, 2);
    }

    #[test]
    fn test_legacy_food_and_date_formats() {
        let (_temp_dir, storage) = create_test_storage();
        let service = ImportService::new(&storage);

        let data = csv(&["3/15/2025,Diner,18.00,,Food,,cash"]);
        let result = service.import(data.as_bytes()).unwrap();
        assert_eq!(result.imported, 1);

        let expense = ExpenseService::new(&storage)
            .get(result.imported_ids[0])
            .unwrap();
        assert_eq!(expense.category, ExpenseCategory::DiningOut);
        assert_eq!(expense.method, "Cash");
        assert_eq!(expense.week, 3);
    }

    #[test]
    fn test_repeated_rows_in_one_file_import_once() {
        let (_temp_dir, storage) = create_test_storage();
        let service = ImportService::new(&storage);

        let data = csv(&[
            "2025-04-01,Costco,80.00,,Groceries,1,Debit",
            "2025-04-01,COSTCO,80.00,second card swipe,Groceries,1,VISA",
            "2025-04-01,Costco,80.00,,Other,1,Debit",
            "2025-04-02,Costco,80.00,,Groceries,1,Debit",
        ]);
        let preview = service.preview(data.as_bytes()).unwrap();
        assert!(matches!(preview[0], ImportStatus::New(_)));
        assert!(matches!(preview[1], ImportStatus::Duplicate(_)));
        assert!(matches!(preview[2], ImportStatus::New(_)));
        assert!(matches!(preview[3], ImportStatus::New(_)));

        let result = service.import(data.as_bytes()).unwrap();
        assert_eq!(result.imported, 3);
        assert_eq!(result.duplicates_skipped, 1);
    }
}
