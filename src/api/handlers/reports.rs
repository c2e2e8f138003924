//! Merchant analytics, place names, monthly summary and reminders

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Deserialize;

use super::MonthParams;
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::reports::merchants::DEFAULT_LIMIT;
use crate::reports::{
    MerchantDetail, MerchantPeriod, MerchantSort, MonthlySummary, ReminderStatus,
    TopMerchantsReport,
};
use crate::services::place::PlaceVariant;
use crate::services::{PlaceService, SimilarPlaceGroup, StandardizeResult};

#[derive(Debug, Default, Deserialize)]
pub struct TopMerchantParams {
    pub period: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub sort: Option<String>,
    pub limit: Option<usize>,
}

/// GET /api/merchants/top
pub async fn top_merchants(
    State(state): State<AppState>,
    query: Result<Query<TopMerchantParams>, QueryRejection>,
) -> ApiResult<Json<TopMerchantsReport>> {
    let Query(params) = query?;
    let report = state
        .run(move |storage, _| {
            let period =
                MerchantPeriod::from_params(params.period.as_deref(), params.year, params.month)?;
            let sort = MerchantSort::parse(params.sort.as_deref())?;
            let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
            TopMerchantsReport::generate(storage, period, sort, limit)
        })
        .await?;
    Ok(Json(report))
}

/// GET /api/merchants/:place
pub async fn merchant_detail(
    State(state): State<AppState>,
    place: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<MerchantDetail>> {
    let Path(place) = place?;
    let detail = state
        .run(move |storage, _| MerchantDetail::generate(storage, &place))
        .await?;
    Ok(Json(detail))
}

/// GET /api/places
pub async fn list_places(State(state): State<AppState>) -> ApiResult<Json<Vec<PlaceVariant>>> {
    let places = state
        .run(|storage, _| PlaceService::new(storage).list())
        .await?;
    Ok(Json(places))
}

/// GET /api/places/similar
pub async fn similar_places(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<SimilarPlaceGroup>>> {
    let groups = state
        .run(|storage, _| PlaceService::new(storage).similar())
        .await?;
    Ok(Json(groups))
}

#[derive(Debug, Deserialize)]
pub struct StandardizeBody {
    pub variants: Vec<String>,
    pub canonical: String,
}

/// POST /api/places/standardize
pub async fn standardize_places(
    State(state): State<AppState>,
    body: Result<Json<StandardizeBody>, JsonRejection>,
) -> ApiResult<Json<StandardizeResult>> {
    let Json(body) = body?;
    let result = state
        .run(move |storage, _| {
            PlaceService::new(storage).standardize(&body.variants, &body.canonical)
        })
        .await?;
    Ok(Json(result))
}

/// GET /api/summary/monthly
pub async fn monthly_summary(
    State(state): State<AppState>,
    query: Result<Query<MonthParams>, QueryRejection>,
) -> ApiResult<Json<MonthlySummary>> {
    let Query(params) = query?;
    let summary = state
        .run(move |storage, _| MonthlySummary::generate(storage, params.resolve()?))
        .await?;
    Ok(Json(summary))
}

/// GET /api/reminders/status
pub async fn reminder_status(
    State(state): State<AppState>,
    query: Result<Query<MonthParams>, QueryRejection>,
) -> ApiResult<Json<ReminderStatus>> {
    let Query(params) = query?;
    let status = state
        .run(move |storage, _| ReminderStatus::generate(storage, params.resolve()?))
        .await?;
    Ok(Json(status))
}
