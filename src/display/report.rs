//! Formatting helpers for terminal reports

use crate::models::Money;

/// Format a money amount with a currency symbol, right-aligned in `width`
pub fn money_column(amount: Money, symbol: &str, width: usize) -> String {
    right_align(&amount.format_with_symbol(symbol), width)
}

/// Format a percentage with appropriate precision
pub fn format_percentage(pct: f64) -> String {
    let magnitude = pct.abs();
    if magnitude < 0.1 && magnitude > 0.0 {
        format!("{:.2}%", pct)
    } else if magnitude < 10.0 {
        format!("{:.1}%", pct)
    } else {
        format!("{:.0}%", pct)
    }
}

/// Format a signed change with an explicit sign
pub fn format_change(change: Money, symbol: &str) -> String {
    if change.is_negative() {
        change.format_with_symbol(symbol)
    } else {
        format!("+{}", change.format_with_symbol(symbol))
    }
}

/// A horizontal bar proportional to `value / max_value`
pub fn format_bar(value: f64, max_value: f64, width: usize) -> String {
    if max_value <= 0.0 || value <= 0.0 {
        return " ".repeat(width);
    }

    let filled = ((value / max_value) * width as f64).round() as usize;
    let filled = filled.min(width);

    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Format a separator line
pub fn separator(width: usize) -> String {
    "─".repeat(width)
}

/// Format a double separator line
pub fn double_separator(width: usize) -> String {
    "═".repeat(width)
}

/// Truncate to at most `max_len` characters, marking the cut with "..."
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        ".".repeat(max_len)
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

/// Right-align text in a field of given width
pub fn right_align(s: &str, width: usize) -> String {
    format!("{:>width$}", s, width = width)
}
