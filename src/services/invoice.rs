//! Invoice service
//!
//! Receipts and invoices attached to tax-deductible expenses. Files live under
//! `invoices/<YYYY>/<MM>/` named `<uuid>_<sanitised original name>`; the
//! database keeps the metadata and the path relative to the invoices dir.

use std::path::PathBuf;

use chrono::{Datelike, Utc};
use uuid::Uuid;

use crate::error::{TrackerError, TrackerResult};
use crate::models::invoice::{mime_type_for, sanitize_filename, ALLOWED_MIME_TYPES};
use crate::models::Invoice;
use crate::storage::{
    remove_file_if_exists, write_bytes_atomic, ExpenseRepository, InvoiceRepository,
    PersonRepository, Storage,
};

/// An uploaded file and the expense it belongs to
#[derive(Debug, Clone)]
pub struct InvoiceUpload {
    pub expense_id: i64,
    pub person_id: Option<i64>,
    pub original_filename: String,
    /// Content type the client declared, if any
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Service for invoice files
pub struct InvoiceService<'a> {
    storage: &'a Storage,
    max_bytes: u64,
}

impl<'a> InvoiceService<'a> {
    pub fn new(storage: &'a Storage, max_bytes: u64) -> Self {
        Self { storage, max_bytes }
    }

    /// Store an uploaded invoice and record it
    pub fn upload(&self, upload: InvoiceUpload) -> TrackerResult<Invoice> {
        if upload.bytes.is_empty() {
            return Err(TrackerError::Upload("No file uploaded".into()));
        }
        if upload.bytes.len() as u64 > self.max_bytes {
            return Err(TrackerError::Upload(format!(
                "File is too large ({} bytes, limit {} bytes)",
                upload.bytes.len(),
                self.max_bytes
            )));
        }
        let mime_type = detect_mime_type(&upload)?;

        let conn = self.storage.connection()?;
        let expense = ExpenseRepository::new(&conn)
            .get(upload.expense_id)?
            .ok_or_else(|| TrackerError::expense_not_found(upload.expense_id))?;
        if !expense.is_tax_deductible() {
            return Err(TrackerError::Upload(
                "Invoices can only be attached to tax-deductible expenses".into(),
            ));
        }
        if let Some(person_id) = upload.person_id {
            PersonRepository::new(&conn)
                .get(person_id)?
                .ok_or_else(|| TrackerError::person_not_found(person_id))?;
        }

        let original_filename = upload
            .original_filename
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .to_string();
        let filename = format!("{}_{}", Uuid::new_v4(), sanitize_filename(&original_filename));
        let relative = format!(
            "{:04}/{:02}/{}",
            expense.date.year(),
            expense.date.month(),
            filename
        );
        let full_path = self.storage.paths().invoices_dir().join(&relative);
        write_bytes_atomic(&full_path, &upload.bytes)?;

        let mut invoice = Invoice {
            id: 0,
            expense_id: expense.id,
            person_id: upload.person_id,
            filename,
            original_filename,
            file_path: relative,
            file_size: upload.bytes.len() as i64,
            mime_type: mime_type.to_string(),
            upload_date: Utc::now(),
        };
        match InvoiceRepository::new(&conn).insert(&invoice) {
            Ok(id) => invoice.id = id,
            Err(e) => {
                let _ = remove_file_if_exists(&full_path);
                return Err(e);
            }
        }

        tracing::info!(
            id = invoice.id,
            expense_id = invoice.expense_id,
            size = invoice.file_size,
            "Stored invoice"
        );
        Ok(invoice)
    }

    pub fn get(&self, id: i64) -> TrackerResult<Invoice> {
        let conn = self.storage.connection()?;
        InvoiceRepository::new(&conn)
            .get(id)?
            .ok_or_else(|| TrackerError::invoice_not_found(id))
    }

    /// Invoices of one expense, oldest first
    pub fn list_for_expense(&self, expense_id: i64) -> TrackerResult<Vec<Invoice>> {
        let conn = self.storage.connection()?;
        ExpenseRepository::new(&conn)
            .get(expense_id)?
            .ok_or_else(|| TrackerError::expense_not_found(expense_id))?;
        InvoiceRepository::new(&conn).list_for_expense(expense_id)
    }

    /// Metadata and file contents for download
    pub fn read(&self, id: i64) -> TrackerResult<(Invoice, Vec<u8>)> {
        let invoice = self.get(id)?;
        let path = self.file_path(&invoice);
        let bytes = std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TrackerError::NotFound {
                    entity_type: "Invoice file",
                    identifier: invoice.filename.clone(),
                }
            } else {
                TrackerError::Io(format!("Failed to read {}: {}", path.display(), e))
            }
        })?;
        Ok((invoice, bytes))
    }

    /// Attribute the invoice to a person, or clear the attribution
    pub fn set_person(&self, id: i64, person_id: Option<i64>) -> TrackerResult<Invoice> {
        let conn = self.storage.connection()?;
        if let Some(person_id) = person_id {
            PersonRepository::new(&conn)
                .get(person_id)?
                .ok_or_else(|| TrackerError::person_not_found(person_id))?;
        }
        let repo = InvoiceRepository::new(&conn);
        if !repo.set_person(id, person_id)? {
            return Err(TrackerError::invoice_not_found(id));
        }
        tracing::info!(id, person_id, "Reassigned invoice");
        repo.get(id)?.ok_or_else(|| TrackerError::invoice_not_found(id))
    }

    /// Delete the row and the file
    pub fn delete(&self, id: i64) -> TrackerResult<()> {
        let invoice = {
            let conn = self.storage.connection()?;
            let repo = InvoiceRepository::new(&conn);
            let invoice = repo
                .get(id)?
                .ok_or_else(|| TrackerError::invoice_not_found(id))?;
            repo.delete(id)?;
            invoice
        };

        let path = self.file_path(&invoice);
        if let Err(e) = remove_file_if_exists(&path) {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove invoice file");
        }
        tracing::info!(id, "Deleted invoice");
        Ok(())
    }

    fn file_path(&self, invoice: &Invoice) -> PathBuf {
        self.storage.paths().invoices_dir().join(&invoice.file_path)
    }
}

/// Work out the file type from its leading bytes, checked against the name and
/// declared type
fn detect_mime_type(upload: &InvoiceUpload) -> TrackerResult<&'static str> {
    let not_allowed = || {
        TrackerError::Upload(format!(
            "Only PDF, PNG and JPEG files are allowed ({})",
            ALLOWED_MIME_TYPES.join(", ")
        ))
    };

    let sniffed = sniff_mime_type(&upload.bytes).ok_or_else(not_allowed)?;

    if let Some(by_name) = mime_type_for(&upload.original_filename) {
        if by_name != sniffed {
            return Err(TrackerError::Upload(format!(
                "File contents ({}) do not match the file name",
                sniffed
            )));
        }
    }

    if let Some(declared) = upload.content_type.as_deref() {
        let declared = declared.split(';').next().unwrap_or_default().trim();
        let generic = declared.is_empty() || declared == "application/octet-stream";
        let same = declared == sniffed || (declared == "image/jpg" && sniffed == "image/jpeg");
        if !generic && !same {
            return Err(not_allowed());
        }
    }

    Ok(sniffed)
}

fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"%PDF-") {
        Some("application/pdf")
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else {
        None
    }
}
