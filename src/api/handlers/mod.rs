//! Request handlers, one module per resource
//!
//! Handlers only translate between HTTP and the services; each one hands its
//! work to [`AppState::run`](super::state::AppState::run).

pub mod expenses;
pub mod finances;
pub mod invoices;
pub mod payment_methods;
pub mod people;
pub mod recurring;
pub mod reports;

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::TrackerResult;
use crate::models::YearMonth;

/// `?year=&month=` query, defaulting to the current month
#[derive(Debug, Default, Deserialize)]
pub struct MonthParams {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl MonthParams {
    pub fn resolve(&self) -> TrackerResult<YearMonth> {
        let current = YearMonth::current();
        YearMonth::new(
            self.year.unwrap_or(current.year),
            self.month.unwrap_or(current.month),
        )
    }
}

/// `{"year": .., "month": ..}` body naming a target month
#[derive(Debug, Deserialize, Serialize)]
pub struct MonthBody {
    pub year: i32,
    pub month: u32,
}

impl MonthBody {
    pub fn resolve(&self) -> TrackerResult<YearMonth> {
        YearMonth::new(self.year, self.month)
    }
}

/// Body returned by delete endpoints
pub fn deleted(what: &str, id: i64) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "message": format!("{} deleted", what), "id": id })),
    )
}

/// GET /health
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
