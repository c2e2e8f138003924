use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use expense_tracker::api::{init_tracing, run_server, AppState};
use expense_tracker::cli::{
    handle_convert_command, handle_export_command, handle_import_command,
    handle_report_command, handle_validate_command, ExportCommands, ReportCommands,
};
use expense_tracker::config::{paths::TrackerPaths, settings::Settings};
use expense_tracker::models::payment_method::DEFAULT_METHODS;
use expense_tracker::storage::Storage;

#[derive(Parser)]
#[command(
    name = "expense-tracker",
    version,
    about = "Household expense tracker with tax-deductible reporting",
    long_about = "Tracks household expenses, income, loans and investments in a local \
                  SQLite database. Produces the yearly tax-deductible report for medical \
                  expenses and donations, with insurance claim and invoice tracking, and \
                  serves everything over a JSON API."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Address to bind (overrides settings)
        #[arg(long, env = "EXPENSE_TRACKER_HOST")]
        host: Option<String>,

        /// Port to listen on (overrides settings)
        #[arg(short, long, env = "EXPENSE_TRACKER_PORT")]
        port: Option<u16>,
    },

    /// Check a CSV file without importing it
    Validate {
        /// Path to CSV file
        file: PathBuf,
    },

    /// Import expenses from a CSV file
    Import {
        /// Path to CSV file
        file: PathBuf,
    },

    /// Convert a spreadsheet workbook (.xlsx, .xls, .ods) into an importable CSV
    Convert {
        /// Path to the workbook
        file: PathBuf,

        /// Output CSV (defaults to <name>_combined.csv next to the workbook)
        output: Option<PathBuf>,

        /// Drop rows dated before this day (YYYY-MM-DD)
        #[arg(long)]
        since: Option<NaiveDate>,
    },

    /// Reports
    #[command(subcommand)]
    Report(ReportCommands),

    /// Data export
    #[command(subcommand)]
    Export(ExportCommands),

    /// Create the data directory, database and settings file
    Init,

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = TrackerPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;
    init_tracing(&settings.log_filter);

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            let host = host.unwrap_or_else(|| settings.host.clone());
            let port = port.unwrap_or(settings.port);
            let storage = Storage::open(paths)?;
            let state = AppState::new(storage, settings);

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_server(state, &host, port))?;
        }
        Some(Commands::Validate { file }) => {
            let storage = Storage::open(paths)?;
            handle_validate_command(&storage, &file)?;
        }
        Some(Commands::Import { file }) => {
            let storage = Storage::open(paths)?;
            handle_import_command(&storage, &file)?;
        }
        Some(Commands::Convert {
            file,
            output,
            since,
        }) => {
            handle_convert_command(&file, output, since)?;
        }
        Some(Commands::Report(cmd)) => {
            let storage = Storage::open(paths)?;
            handle_report_command(&storage, &settings.currency_symbol, cmd)?;
        }
        Some(Commands::Export(cmd)) => {
            let storage = Storage::open(paths)?;
            handle_export_command(&storage, cmd)?;
        }
        Some(Commands::Init) => {
            println!("Initializing expense tracker at: {}", paths.base_dir().display());
            Storage::open(paths.clone())?;
            settings.save(&paths)?;
            println!("Initialization complete!");
            println!();
            println!("Default payment methods have been created:");
            for (name, _) in DEFAULT_METHODS {
                println!("  - {}", name);
            }
            println!();
            println!("Run 'expense-tracker serve' to start the API.");
        }
        Some(Commands::Config) => {
            println!("Expense Tracker Configuration");
            println!("=============================");
            println!("Base directory:    {}", paths.base_dir().display());
            println!("Database:          {}", paths.database_file().display());
            println!("Invoices:          {}", paths.invoices_dir().display());
            println!("Settings file:     {}", paths.settings_file().display());
            println!();
            println!("Settings:");
            println!("  Bind address:    {}", settings.bind_address());
            println!("  Log filter:      {}", settings.log_filter);
            println!("  Max invoice:     {} bytes", settings.max_invoice_bytes);
            println!("  Currency symbol: {}", settings.currency_symbol);
        }
        None => {
            println!("expense-tracker - household expenses and tax-deductible reporting");
            println!();
            println!("Run 'expense-tracker --help' for usage information.");
            println!("Run 'expense-tracker serve' to start the API server.");
        }
    }

    Ok(())
}
