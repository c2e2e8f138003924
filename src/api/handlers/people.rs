use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use serde_json::Value;

use super::deleted;
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::models::{Person, PersonInput};
use crate::services::PersonService;

/// GET /api/people
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Person>>> {
    let people = state
        .run(|storage, _| PersonService::new(storage).list())
        .await?;
    Ok(Json(people))
}

/// POST /api/people
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<PersonInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Person>)> {
    let Json(input) = body?;
    let person = state
        .run(move |storage, _| PersonService::new(storage).create(input))
        .await?;
    Ok((StatusCode::CREATED, Json(person)))
}

/// GET /api/people/:id
pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Person>> {
    let Path(id) = id?;
    let person = state
        .run(move |storage, _| PersonService::new(storage).get(id))
        .await?;
    Ok(Json(person))
}

/// PUT /api/people/:id
pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<PersonInput>, JsonRejection>,
) -> ApiResult<Json<Person>> {
    let Path(id) = id?;
    let Json(input) = body?;
    let person = state
        .run(move |storage, _| PersonService::new(storage).update(id, input))
        .await?;
    Ok(Json(person))
}

/// DELETE /api/people/:id
pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Path(id) = id?;
    state
        .run(move |storage, _| PersonService::new(storage).delete(id))
        .await?;
    Ok(deleted("Person", id))
}
