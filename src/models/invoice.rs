//! Invoice metadata
//!
//! The file itself lives under the invoices directory; the row records where
//! and what it is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content types accepted for invoice uploads
pub const ALLOWED_MIME_TYPES: [&str; 3] = ["application/pdf", "image/png", "image/jpeg"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub expense_id: i64,
    /// Person the invoice belongs to, for expenses split between people
    pub person_id: Option<i64>,
    /// Name on disk (unique)
    pub filename: String,
    /// Name the file was uploaded with
    pub original_filename: String,
    /// Path relative to the invoices directory
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub upload_date: DateTime<Utc>,
}

/// Guess a content type from a file name when the client didn't send one
pub fn mime_type_for(filename: &str) -> Option<&'static str> {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        Some("application/pdf")
    } else if lower.ends_with(".png") {
        Some("image/png")
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        Some("image/jpeg")
    } else {
        None
    }
}

/// Reduce an uploaded file name to a safe basename
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "invoice".to_string()
    } else {
        trimmed.chars().take(100).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for("Receipt.PDF"), Some("application/pdf"));
        assert_eq!(mime_type_for("scan.jpeg"), Some("image/jpeg"));
        assert_eq!(mime_type_for("notes.txt"), None);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\scans\\dr visit.pdf"), "dr_visit.pdf");
        assert_eq!(sanitize_filename("..."), "invoice");
    }
}
