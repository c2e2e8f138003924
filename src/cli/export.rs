//! CLI commands for data export

use crate::error::{TrackerError, TrackerResult};
use crate::export::export_expenses_csv;
use crate::models::ExpenseFilter;
use crate::storage::Storage;
use clap::Subcommand;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Export subcommands
#[derive(Subcommand, Debug)]
pub enum ExportCommands {
    /// Export expenses to CSV in the importable layout
    Expenses {
        /// Output file path
        output: PathBuf,

        #[arg(short, long)]
        year: Option<i32>,

        #[arg(short, long)]
        month: Option<u32>,

        /// Expense type (e.g. "Medical")
        #[arg(short = 't', long = "type")]
        category: Option<String>,
    },
}

/// Handle export commands
pub fn handle_export_command(storage: &Storage, cmd: ExportCommands) -> TrackerResult<()> {
    match cmd {
        ExportCommands::Expenses {
            output,
            year,
            month,
            category,
        } => {
            let file = File::create(&output).map_err(|e| {
                TrackerError::Export(format!(
                    "Failed to create file {}: {}",
                    output.display(),
                    e
                ))
            })?;
            let filter = ExpenseFilter {
                year,
                month,
                category,
                ..ExpenseFilter::default()
            };
            let count = export_expenses_csv(storage, &filter, BufWriter::new(file))?;
            println!("Exported {} expenses to: {}", count, output.display());
            Ok(())
        }
    }
}
