//! CLI commands for reports
//!
//! Provides commands for printing and exporting the tax, merchant and monthly
//! reports.

use crate::error::{TrackerError, TrackerResult};
use crate::models::YearMonth;
use crate::reports::merchants::DEFAULT_LIMIT;
use crate::reports::{
    MerchantPeriod, MerchantSort, MonthlySummary, ReminderStatus, TaxDeductibleReport,
    TopMerchantsReport,
};
use crate::storage::Storage;
use clap::Subcommand;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Report subcommands
#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Yearly tax-deductible report (medical and donations)
    #[command(alias = "tax-deductible")]
    Tax {
        /// Tax year (defaults to the current year)
        #[arg(short, long)]
        year: Option<i32>,

        /// Only insurance-eligible medical expenses with this claim status
        #[arg(long)]
        claim_status: Option<String>,

        /// Export to CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Top merchants by spending
    Merchants {
        /// all, year or month
        #[arg(short, long, default_value = "all")]
        period: String,

        #[arg(short, long)]
        year: Option<i32>,

        #[arg(short, long)]
        month: Option<u32>,

        /// total, visits or average
        #[arg(short, long)]
        sort: Option<String>,

        #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },

    /// Monthly summary with income, fixed costs and reminders
    Summary {
        /// Month (YYYY-MM, defaults to the current month)
        #[arg(short, long)]
        month: Option<String>,
    },
}

/// Handle report commands
pub fn handle_report_command(
    storage: &Storage,
    symbol: &str,
    cmd: ReportCommands,
) -> TrackerResult<()> {
    match cmd {
        ReportCommands::Tax {
            year,
            claim_status,
            output,
        } => handle_tax_report(storage, symbol, year, claim_status, output),
        ReportCommands::Merchants {
            period,
            year,
            month,
            sort,
            limit,
        } => {
            let period = MerchantPeriod::from_params(Some(period.as_str()), year, month)?;
            let sort = MerchantSort::parse(sort.as_deref())?;
            let report = TopMerchantsReport::generate(storage, period, sort, limit)?;
            println!("{}", report.format_terminal(symbol));
            Ok(())
        }
        ReportCommands::Summary { month } => handle_summary(storage, symbol, month),
    }
}

fn handle_tax_report(
    storage: &Storage,
    symbol: &str,
    year: Option<i32>,
    claim_status: Option<String>,
    output: Option<PathBuf>,
) -> TrackerResult<()> {
    let year = year.unwrap_or_else(|| YearMonth::current().year);
    let report = TaxDeductibleReport::generate(storage, year, claim_status.as_deref())?;

    if let Some(path) = output {
        let file = File::create(&path).map_err(|e| {
            TrackerError::Export(format!("Failed to create file {}: {}", path.display(), e))
        })?;
        report.export_csv(BufWriter::new(file))?;
        println!("Tax report exported to: {}", path.display());
    } else {
        println!("{}", report.format_terminal(symbol));
    }

    Ok(())
}

fn handle_summary(storage: &Storage, symbol: &str, month: Option<String>) -> TrackerResult<()> {
    let month = match month {
        Some(s) => YearMonth::parse(&s)?,
        None => YearMonth::current(),
    };

    let summary = MonthlySummary::generate(storage, month)?;
    println!("{}", summary.format_terminal(symbol));

    let reminders = ReminderStatus::generate(storage, month)?;
    if reminders.has_reminders {
        println!();
        println!("Reminders for {}:", month);
        for item in &reminders.investments_missing {
            println!("  - Record a value for investment '{}'", item.name);
        }
        for item in &reminders.loans_missing {
            println!("  - Record a balance for loan '{}'", item.name);
        }
    }

    Ok(())
}
