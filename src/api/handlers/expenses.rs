use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use super::deleted;
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::models::{Expense, ExpenseFilter, ExpenseInput};
use crate::reports::TaxDeductibleReport;
use crate::services::ExpenseService;

/// GET /api/expenses
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ExpenseFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<Expense>>> {
    let Query(filter) = query?;
    let expenses = state
        .run(move |storage, _| ExpenseService::new(storage).list(&filter))
        .await?;
    Ok(Json(expenses))
}

/// POST /api/expenses
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<ExpenseInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    let Json(input) = body?;
    let expense = state
        .run(move |storage, _| ExpenseService::new(storage).create(input))
        .await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// GET /api/expenses/:id
pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Expense>> {
    let Path(id) = id?;
    let expense = state
        .run(move |storage, _| ExpenseService::new(storage).get(id))
        .await?;
    Ok(Json(expense))
}

/// PUT /api/expenses/:id
pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<ExpenseInput>, JsonRejection>,
) -> ApiResult<Json<Expense>> {
    let Path(id) = id?;
    let Json(input) = body?;
    let expense = state
        .run(move |storage, _| ExpenseService::new(storage).update(id, input))
        .await?;
    Ok(Json(expense))
}

/// DELETE /api/expenses/:id
pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Path(id) = id?;
    state
        .run(move |storage, _| ExpenseService::new(storage).delete(id))
        .await?;
    Ok(deleted("Expense", id))
}

#[derive(Debug, Deserialize)]
pub struct ClaimStatusBody {
    pub claim_status: String,
}

/// PATCH /api/expenses/:id/claim-status
pub async fn update_claim_status(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<ClaimStatusBody>, JsonRejection>,
) -> ApiResult<Json<Expense>> {
    let Path(id) = id?;
    let Json(body) = body?;
    let expense = state
        .run(move |storage, _| {
            ExpenseService::new(storage).update_claim_status(id, &body.claim_status)
        })
        .await?;
    Ok(Json(expense))
}

#[derive(Debug, Deserialize)]
pub struct TaxParams {
    pub year: Option<i32>,
    pub claim_status: Option<String>,
}

/// GET /api/expenses/tax-deductible
pub async fn tax_deductible(
    State(state): State<AppState>,
    query: Result<Query<TaxParams>, QueryRejection>,
) -> ApiResult<Json<TaxDeductibleReport>> {
    let Query(params) = query?;
    let year = params
        .year
        .unwrap_or_else(|| crate::models::YearMonth::current().year);
    let report = state
        .run(move |storage, _| {
            TaxDeductibleReport::generate(storage, year, params.claim_status.as_deref())
        })
        .await?;
    Ok(Json(report))
}
