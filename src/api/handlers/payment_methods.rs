use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::models::{PaymentMethod, PaymentMethodInput};
use crate::services::{CreditCardStatement, DeleteOutcome, PaymentMethodService};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub active_only: bool,
}

/// GET /api/payment-methods
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<PaymentMethod>>> {
    let Query(params) = query?;
    let methods = state
        .run(move |storage, _| PaymentMethodService::new(storage).list(params.active_only))
        .await?;
    Ok(Json(methods))
}

/// POST /api/payment-methods
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<PaymentMethodInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PaymentMethod>)> {
    let Json(input) = body?;
    let method = state
        .run(move |storage, _| PaymentMethodService::new(storage).create(input))
        .await?;
    Ok((StatusCode::CREATED, Json(method)))
}

/// GET /api/payment-methods/:id
pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<PaymentMethod>> {
    let Path(id) = id?;
    let method = state
        .run(move |storage, _| PaymentMethodService::new(storage).get(id))
        .await?;
    Ok(Json(method))
}

/// PUT /api/payment-methods/:id
pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<PaymentMethodInput>, JsonRejection>,
) -> ApiResult<Json<PaymentMethod>> {
    let Path(id) = id?;
    let Json(input) = body?;
    let method = state
        .run(move |storage, _| PaymentMethodService::new(storage).update(id, input))
        .await?;
    Ok(Json(method))
}

/// DELETE /api/payment-methods/:id
///
/// Methods still referenced by expenses are deactivated instead.
pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let outcome = state
        .run(move |storage, _| PaymentMethodService::new(storage).delete(id))
        .await?;
    let message = match outcome {
        DeleteOutcome::Deleted => "Payment method deleted",
        DeleteOutcome::Deactivated => "Payment method is in use and was deactivated",
    };
    Ok(Json(json!({ "message": message, "id": id, "outcome": outcome })))
}

/// GET /api/payment-methods/:id/statement
pub async fn statement(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<CreditCardStatement>> {
    let Path(id) = id?;
    let statement = state
        .run(move |storage, _| PaymentMethodService::new(storage).statement(id))
        .await?;
    Ok(Json(statement))
}
