//! Display formatting for terminal output
//!
//! Column, percentage and bar helpers shared by the report renderers.

pub mod report;

pub use report::{
    double_separator, format_bar, format_change, format_percentage, money_column, right_align,
    separator, truncate,
};
