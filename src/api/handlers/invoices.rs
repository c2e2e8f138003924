//! Invoice upload, listing and download

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection},
        Multipart, Path, State,
    },
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use super::deleted;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::models::Invoice;
use crate::services::{InvoiceService, InvoiceUpload};

/// Multipart field carrying the file
pub const FILE_FIELD: &str = "invoice";

fn service(storage: &crate::storage::Storage, max_bytes: usize) -> InvoiceService<'_> {
    InvoiceService::new(storage, max_bytes as u64)
}

fn parse_id(field: &str, text: &str) -> Result<Option<i64>, ApiError> {
    let text = text.trim();
    if text.is_empty() || text == "null" {
        return Ok(None);
    }
    text.parse()
        .map(Some)
        .map_err(|_| ApiError::BadRequest(format!("Invalid {} \"{}\"", field, text)))
}

/// POST /api/invoices (multipart: `expense_id`, optional `person_id`, `invoice`)
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    let mut multipart = multipart?;
    let mut expense_id = None;
    let mut person_id = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "expense_id" => expense_id = parse_id("expense_id", &field.text().await?)?,
            "person_id" => person_id = parse_id("person_id", &field.text().await?)?,
            FILE_FIELD => {
                let filename = field.file_name().unwrap_or("invoice").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                file = Some((filename, content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let expense_id =
        expense_id.ok_or_else(|| ApiError::BadRequest("expense_id is required".into()))?;
    let (original_filename, content_type, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("No file uploaded".into()))?;

    let invoice = state
        .run(move |storage, settings| {
            service(storage, settings.max_invoice_bytes).upload(InvoiceUpload {
                expense_id,
                person_id,
                original_filename,
                content_type,
                bytes,
            })
        })
        .await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// GET /api/expenses/:id/invoices
pub async fn list_for_expense(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Vec<Invoice>>> {
    let Path(expense_id) = id?;
    let invoices = state
        .run(move |storage, settings| {
            service(storage, settings.max_invoice_bytes).list_for_expense(expense_id)
        })
        .await?;
    Ok(Json(invoices))
}

/// GET /api/invoices/:id
pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Invoice>> {
    let Path(id) = id?;
    let invoice = state
        .run(move |storage, settings| service(storage, settings.max_invoice_bytes).get(id))
        .await?;
    Ok(Json(invoice))
}

/// GET /api/invoices/:id/file
pub async fn download(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let (invoice, bytes) = state
        .run(move |storage, settings| service(storage, settings.max_invoice_bytes).read(id))
        .await?;

    let disposition = format!(
        "inline; filename=\"{}\"",
        invoice.original_filename.replace('"', "")
    );
    Ok((
        [
            (header::CONTENT_TYPE, invoice.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

#[derive(Debug, Deserialize)]
pub struct PersonBody {
    pub person_id: Option<i64>,
}

/// PATCH /api/invoices/:id/person
pub async fn set_person(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<PersonBody>, JsonRejection>,
) -> ApiResult<Json<Invoice>> {
    let Path(id) = id?;
    let Json(body) = body?;
    let invoice = state
        .run(move |storage, settings| {
            service(storage, settings.max_invoice_bytes).set_person(id, body.person_id)
        })
        .await?;
    Ok(Json(invoice))
}

/// DELETE /api/invoices/:id
pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Path(id) = id?;
    state
        .run(move |storage, settings| service(storage, settings.max_invoice_bytes).delete(id))
        .await?;
    Ok(deleted("Invoice", id))
}
