//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod export;
pub mod import;
pub mod report;

pub use export::{handle_export_command, ExportCommands};
pub use import::{handle_convert_command, handle_import_command, handle_validate_command};
pub use report::{handle_report_command, ReportCommands};
