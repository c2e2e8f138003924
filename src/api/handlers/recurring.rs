use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use super::{deleted, MonthBody};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::models::{RecurringExpense, RecurringInput};
use crate::services::{GenerationResult, RecurringService};

/// GET /api/recurring
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<RecurringExpense>>> {
    let templates = state
        .run(|storage, _| RecurringService::new(storage).list())
        .await?;
    Ok(Json(templates))
}

/// POST /api/recurring
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<RecurringInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RecurringExpense>)> {
    let Json(input) = body?;
    let template = state
        .run(move |storage, _| RecurringService::new(storage).create(input))
        .await?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// GET /api/recurring/:id
pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<RecurringExpense>> {
    let Path(id) = id?;
    let template = state
        .run(move |storage, _| RecurringService::new(storage).get(id))
        .await?;
    Ok(Json(template))
}

/// PUT /api/recurring/:id
pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<RecurringInput>, JsonRejection>,
) -> ApiResult<Json<RecurringExpense>> {
    let Path(id) = id?;
    let Json(input) = body?;
    let template = state
        .run(move |storage, _| RecurringService::new(storage).update(id, input))
        .await?;
    Ok(Json(template))
}

#[derive(Debug, Deserialize)]
pub struct PausedBody {
    pub paused: bool,
}

/// PATCH /api/recurring/:id/paused
pub async fn set_paused(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<PausedBody>, JsonRejection>,
) -> ApiResult<Json<RecurringExpense>> {
    let Path(id) = id?;
    let Json(body) = body?;
    let template = state
        .run(move |storage, _| RecurringService::new(storage).set_paused(id, body.paused))
        .await?;
    Ok(Json(template))
}

/// DELETE /api/recurring/:id
pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Path(id) = id?;
    state
        .run(move |storage, _| RecurringService::new(storage).delete(id))
        .await?;
    Ok(deleted("Recurring expense", id))
}

/// POST /api/recurring/generate
pub async fn generate(
    State(state): State<AppState>,
    body: Result<Json<MonthBody>, JsonRejection>,
) -> ApiResult<Json<GenerationResult>> {
    let Json(body) = body?;
    let result = state
        .run(move |storage, _| RecurringService::new(storage).generate(body.resolve()?))
        .await?;
    Ok(Json(result))
}
