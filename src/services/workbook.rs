//! Workbook to CSV conversion
//!
//! Turns a spreadsheet with one sheet per period into a single CSV in the
//! import layout. On each sheet the header row is the first row with a
//! `Date` cell, and the seven columns starting there are taken as
//! Date, Place, Amount, Notes, Type, Week, Method. The `Summary` sheet is
//! never converted.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{Duration, NaiveDate};
use csv::WriterBuilder;
use serde::Serialize;

use crate::error::{TrackerError, TrackerResult};
use crate::services::import::{parse_date, RawRow, HEADER_ROWS, REQUIRED_COLUMNS};

const SUMMARY_SHEET: &str = "summary";
const DATE_HEADER: &str = "Date";

/// What happened to one sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetOutcome {
    pub name: String,
    pub rows: usize,
    /// Why the sheet contributed nothing
    pub skipped: Option<String>,
}

/// Result of converting a workbook
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub output: PathBuf,
    pub sheets: Vec<SheetOutcome>,
    pub total_rows: usize,
}

/// Converts workbooks, optionally dropping rows dated before `since`
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkbookConverter {
    pub since: Option<NaiveDate>,
}

impl WorkbookConverter {
    pub fn new(since: Option<NaiveDate>) -> Self {
        Self { since }
    }

    /// Default output path: `<stem>_combined.csv` next to the input
    pub fn default_output(input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "expenses".to_string());
        input.with_file_name(format!("{}_combined.csv", stem))
    }

    /// Convert every sheet of `input` into one CSV at `output`
    pub fn convert_file(&self, input: &Path, output: &Path) -> TrackerResult<ConversionReport> {
        let mut workbook = open_workbook_auto(input).map_err(|e| {
            TrackerError::Import(format!("Cannot open workbook {}: {}", input.display(), e))
        })?;

        let mut sheets = Vec::new();
        let mut rows = Vec::new();
        for name in workbook.sheet_names() {
            if name.trim().eq_ignore_ascii_case(SUMMARY_SHEET) {
                sheets.push(SheetOutcome {
                    name,
                    rows: 0,
                    skipped: Some("excluded".into()),
                });
                continue;
            }
            let range = workbook.worksheet_range(&name).map_err(|e| {
                TrackerError::Import(format!("Cannot read sheet '{}': {}", name, e))
            })?;

            let outcome = match self.sheet_rows(&range) {
                Ok(sheet_rows) if sheet_rows.is_empty() => SheetOutcome {
                    name,
                    rows: 0,
                    skipped: Some("no data rows".into()),
                },
                Ok(sheet_rows) => {
                    let count = sheet_rows.len();
                    rows.extend(sheet_rows);
                    SheetOutcome {
                        name,
                        rows: count,
                        skipped: None,
                    }
                }
                Err(reason) => SheetOutcome {
                    name,
                    rows: 0,
                    skipped: Some(reason.into()),
                },
            };
            tracing::debug!(sheet = %outcome.name, rows = outcome.rows, "Read sheet");
            sheets.push(outcome);
        }

        if rows.is_empty() {
            return Err(TrackerError::Import(format!(
                "No expense rows found in {}",
                input.display()
            )));
        }

        if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = File::create(output).map_err(|e| {
            TrackerError::Export(format!("Failed to create file {}: {}", output.display(), e))
        })?;
        write_csv(&rows, BufWriter::new(file))?;

        tracing::info!(
            input = %input.display(),
            output = %output.display(),
            rows = rows.len(),
            "Converted workbook"
        );
        Ok(ConversionReport {
            output: output.to_path_buf(),
            total_rows: rows.len(),
            sheets,
        })
    }

    /// Expense rows of one sheet, or why the sheet has none
    pub fn sheet_rows(&self, range: &Range<Data>) -> Result<Vec<RawRow>, &'static str> {
        let (header_idx, date_col) = range
            .rows()
            .enumerate()
            .find_map(|(r, row)| {
                row.iter()
                    .position(|cell| matches!(cell, Data::String(s) if s.trim() == DATE_HEADER))
                    .map(|c| (r, c))
            })
            .ok_or("no header row found")?;

        let mut rows = Vec::new();
        for row in range.rows().skip(header_idx + 1) {
            let cell = |offset: usize| row.get(date_col + offset).and_then(cell_text);
            let Some(date) = row.get(date_col).and_then(cell_date) else {
                continue;
            };
            if let (Some(since), DateCell::Parsed(d)) = (self.since, &date) {
                if *d < since {
                    continue;
                }
            }

            rows.push(RawRow {
                date: date.into_text(),
                place: cell(1).unwrap_or_default(),
                amount: cell(2).unwrap_or_default(),
                notes: cell(3).unwrap_or_default(),
                expense_type: cell(4).unwrap_or_default(),
                week: cell(5).unwrap_or_default(),
                method: cell(6).unwrap_or_default(),
            });
        }
        Ok(rows)
    }
}

/// Write rows in the import layout: blank header rows, then one row per expense
pub fn write_csv<W: Write>(rows: &[RawRow], mut writer: W) -> TrackerResult<()> {
    for _ in 0..HEADER_ROWS {
        writer.write_all(b"\n")?;
    }

    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    for row in rows {
        let record: [&str; REQUIRED_COLUMNS] = [
            &row.date,
            &row.place,
            &row.amount,
            &row.notes,
            &row.expense_type,
            &row.week,
            &row.method,
        ];
        csv_writer
            .write_record(record)
            .map_err(|e| TrackerError::Export(format!("Failed to write CSV: {}", e)))?;
    }
    csv_writer
        .flush()
        .map_err(|e| TrackerError::Export(format!("Failed to write CSV: {}", e)))?;
    Ok(())
}

/// A Date cell: a real date, or text kept as-is so validation reports it
enum DateCell {
    Parsed(NaiveDate),
    Text(String),
}

impl DateCell {
    fn into_text(self) -> String {
        match self {
            Self::Parsed(d) => d.format("%Y-%m-%d").to_string(),
            Self::Text(s) => s,
        }
    }
}

fn cell_date(cell: &Data) -> Option<DateCell> {
    match cell {
        Data::Float(f) => excel_serial_to_date(*f).map(DateCell::Parsed),
        Data::Int(i) => excel_serial_to_date(*i as f64).map(DateCell::Parsed),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()).map(DateCell::Parsed),
        _ => {
            let text = cell_text(cell)?;
            Some(match parse_date(&text) {
                Some(d) => DateCell::Parsed(d),
                None => DateCell::Text(text),
            })
        }
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// Spreadsheet serial day numbers count from 1899-12-30
fn excel_serial_to_date(v: f64) -> Option<NaiveDate> {
    if !v.is_finite() {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(v.floor() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ImportService;
    use crate::storage::test_support::create_test_storage;

    fn sheet(cells: &[(u32, u32, Data)]) -> Range<Data> {
        let mut range = Range::new((0, 0), (8, 8));
        for (row, col, value) in cells {
            range.set_value((*row, *col), value.clone());
        }
        range
    }

    fn text(s: &str) -> Data {
        Data::String(s.into())
    }

    fn header_at(row: u32, col: u32) -> Vec<(u32, u32, Data)> {
        ["Date", "Place", "Amount", "Notes", "Type", "Week", "Method"]
            .iter()
            .enumerate()
            .map(|(i, h)| (row, col + i as u32, text(h)))
            .collect()
    }

    #[test]
    fn test_sheet_rows_start_at_date_header() {
        let mut cells = vec![(0, 0, text("January 2025"))];
        cells.extend(header_at(2, 1));
        cells.extend([
            // 45663 is 2025-01-06
            (3, 1, Data::Float(45663.0)),
            (3, 2, text("Dental Clinic")),
            (3, 3, Data::Float(120.5)),
            (3, 5, text("Tax - Medical")),
            (3, 6, Data::Float(2.0)),
            (3, 7, text("Debit")),
            (4, 2, text("No date, dropped")),
            (5, 1, text("2025-01-08 00:00:00")),
            (5, 2, text("Metro")),
            (5, 3, text("$45.10")),
            (5, 4, text("weekly shop")),
            (5, 5, text("Groceries")),
            (5, 7, text("Cash")),
        ]);

        let rows = WorkbookConverter::default().sheet_rows(&sheet(&cells)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, "2025-01-06");
        assert_eq!(rows[0].place, "Dental Clinic");
        assert_eq!(rows[0].amount, "120.5");
        assert_eq!(rows[0].notes, "");
        assert_eq!(rows[0].week, "2");
        assert_eq!(rows[1].date, "2025-01-08");
        assert_eq!(rows[1].notes, "weekly shop");
        assert_eq!(rows[1].method, "Cash");
    }

    #[test]
    fn test_since_filter_and_missing_header() {
        let mut cells = header_at(0, 0);
        cells.extend([
            (1, 0, text("2024-12-30")),
            (1, 1, text("Old")),
            (2, 0, text("2025-01-02")),
            (2, 1, text("New")),
        ]);
        let converter = WorkbookConverter::new(Some("2025-01-01".parse().unwrap()));
        let rows = converter.sheet_rows(&sheet(&cells)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].place, "New");

        let no_header = sheet(&[(0, 0, text("Totals")), (1, 0, Data::Float(10.0))]);
        assert_eq!(
            converter.sheet_rows(&no_header).unwrap_err(),
            "no header row found"
        );
    }

    #[test]
    fn test_written_csv_passes_import_validation() {
        let mut cells = header_at(0, 0);
        cells.extend([
            (1, 0, Data::Float(45663.0)),
            (1, 1, text("Heart Fund, Ottawa")),
            (1, 2, Data::Int(50)),
            (1, 4, text("Tax - Donation")),
            (1, 5, Data::Int(2)),
            (1, 6, text("VISA")),
        ]);
        let rows = WorkbookConverter::default().sheet_rows(&sheet(&cells)).unwrap();

        let mut out = Vec::new();
        write_csv(&rows, &mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();
        assert!(csv.starts_with("\n\n\n2025-01-06,\"Heart Fund, Ottawa\",50,,Tax - Donation,2,VISA"));

        let (_temp_dir, storage) = create_test_storage();
        let report = ImportService::new(&storage).validate(csv.as_bytes()).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.valid_count, 1);
    }

    #[test]
    fn test_default_output_name() {
        assert_eq!(
            WorkbookConverter::default_output(Path::new("/data/expenses 2025.xlsx")),
            PathBuf::from("/data/expenses 2025_combined.csv")
        );
    }
}
