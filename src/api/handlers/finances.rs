//! Income, fixed expenses, loans and investments

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

use super::{deleted, MonthBody, MonthParams};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::models::{
    FixedExpense, FixedExpenseInput, IncomeInput, IncomeSource, Investment, InvestmentInput,
    InvestmentValueInput, Loan, LoanBalanceInput, LoanInput,
};
use crate::services::{
    FixedExpenseMonth, FixedExpenseService, IncomeMonth, IncomeService, InvestmentDetail,
    InvestmentService, LoanDetail, LoanService, Portfolio,
};

type IdPath = Result<Path<i64>, PathRejection>;
type PairPath = Result<Path<(i64, i64)>, PathRejection>;

// Income

pub async fn list_income(
    State(state): State<AppState>,
    query: Result<Query<MonthParams>, QueryRejection>,
) -> ApiResult<Json<IncomeMonth>> {
    let Query(params) = query?;
    let month = state
        .run(move |storage, _| IncomeService::new(storage).month(params.resolve()?))
        .await?;
    Ok(Json(month))
}

pub async fn create_income(
    State(state): State<AppState>,
    body: Result<Json<IncomeInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<IncomeSource>)> {
    let Json(input) = body?;
    let income = state
        .run(move |storage, _| IncomeService::new(storage).create(input))
        .await?;
    Ok((StatusCode::CREATED, Json(income)))
}

pub async fn get_income(State(state): State<AppState>, id: IdPath) -> ApiResult<Json<IncomeSource>> {
    let Path(id) = id?;
    let income = state
        .run(move |storage, _| IncomeService::new(storage).get(id))
        .await?;
    Ok(Json(income))
}

pub async fn update_income(
    State(state): State<AppState>,
    id: IdPath,
    body: Result<Json<IncomeInput>, JsonRejection>,
) -> ApiResult<Json<IncomeSource>> {
    let Path(id) = id?;
    let Json(input) = body?;
    let income = state
        .run(move |storage, _| IncomeService::new(storage).update(id, input))
        .await?;
    Ok(Json(income))
}

pub async fn delete_income(
    State(state): State<AppState>,
    id: IdPath,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Path(id) = id?;
    state
        .run(move |storage, _| IncomeService::new(storage).delete(id))
        .await?;
    Ok(deleted("Income source", id))
}

/// POST /api/income/copy-previous
pub async fn copy_previous_income(
    State(state): State<AppState>,
    body: Result<Json<MonthBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Vec<IncomeSource>>)> {
    let Json(body) = body?;
    let copied = state
        .run(move |storage, _| IncomeService::new(storage).copy_from_previous(body.resolve()?))
        .await?;
    Ok((StatusCode::CREATED, Json(copied)))
}

// Fixed expenses

pub async fn list_fixed(
    State(state): State<AppState>,
    query: Result<Query<MonthParams>, QueryRejection>,
) -> ApiResult<Json<FixedExpenseMonth>> {
    let Query(params) = query?;
    let month = state
        .run(move |storage, _| FixedExpenseService::new(storage).month(params.resolve()?))
        .await?;
    Ok(Json(month))
}

pub async fn create_fixed(
    State(state): State<AppState>,
    body: Result<Json<FixedExpenseInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<FixedExpense>)> {
    let Json(input) = body?;
    let fixed = state
        .run(move |storage, _| FixedExpenseService::new(storage).create(input))
        .await?;
    Ok((StatusCode::CREATED, Json(fixed)))
}

pub async fn get_fixed(State(state): State<AppState>, id: IdPath) -> ApiResult<Json<FixedExpense>> {
    let Path(id) = id?;
    let fixed = state
        .run(move |storage, _| FixedExpenseService::new(storage).get(id))
        .await?;
    Ok(Json(fixed))
}

pub async fn update_fixed(
    State(state): State<AppState>,
    id: IdPath,
    body: Result<Json<FixedExpenseInput>, JsonRejection>,
) -> ApiResult<Json<FixedExpense>> {
    let Path(id) = id?;
    let Json(input) = body?;
    let fixed = state
        .run(move |storage, _| FixedExpenseService::new(storage).update(id, input))
        .await?;
    Ok(Json(fixed))
}

pub async fn delete_fixed(
    State(state): State<AppState>,
    id: IdPath,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Path(id) = id?;
    state
        .run(move |storage, _| FixedExpenseService::new(storage).delete(id))
        .await?;
    Ok(deleted("Fixed expense", id))
}

/// POST /api/fixed-expenses/carry-forward
pub async fn carry_forward_fixed(
    State(state): State<AppState>,
    body: Result<Json<MonthBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Vec<FixedExpense>>)> {
    let Json(body) = body?;
    let copied = state
        .run(move |storage, _| FixedExpenseService::new(storage).carry_forward(body.resolve()?))
        .await?;
    Ok((StatusCode::CREATED, Json(copied)))
}

// Loans

pub async fn list_loans(State(state): State<AppState>) -> ApiResult<Json<Vec<LoanDetail>>> {
    let loans = state
        .run(|storage, _| LoanService::new(storage).list())
        .await?;
    Ok(Json(loans))
}

pub async fn create_loan(
    State(state): State<AppState>,
    body: Result<Json<LoanInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Loan>)> {
    let Json(input) = body?;
    let loan = state
        .run(move |storage, _| LoanService::new(storage).create(input))
        .await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

pub async fn get_loan(State(state): State<AppState>, id: IdPath) -> ApiResult<Json<LoanDetail>> {
    let Path(id) = id?;
    let loan = state
        .run(move |storage, _| LoanService::new(storage).get(id))
        .await?;
    Ok(Json(loan))
}

pub async fn update_loan(
    State(state): State<AppState>,
    id: IdPath,
    body: Result<Json<LoanInput>, JsonRejection>,
) -> ApiResult<Json<Loan>> {
    let Path(id) = id?;
    let Json(input) = body?;
    let loan = state
        .run(move |storage, _| LoanService::new(storage).update(id, input))
        .await?;
    Ok(Json(loan))
}

#[derive(Debug, Deserialize)]
pub struct PaidOffBody {
    pub paid_off: bool,
}

/// PATCH /api/loans/:id/paid-off
pub async fn set_loan_paid_off(
    State(state): State<AppState>,
    id: IdPath,
    body: Result<Json<PaidOffBody>, JsonRejection>,
) -> ApiResult<Json<Loan>> {
    let Path(id) = id?;
    let Json(body) = body?;
    let loan = state
        .run(move |storage, _| LoanService::new(storage).set_paid_off(id, body.paid_off))
        .await?;
    Ok(Json(loan))
}

pub async fn delete_loan(
    State(state): State<AppState>,
    id: IdPath,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Path(id) = id?;
    state
        .run(move |storage, _| LoanService::new(storage).delete(id))
        .await?;
    Ok(deleted("Loan", id))
}

/// POST /api/loans/:id/balances
pub async fn record_loan_balance(
    State(state): State<AppState>,
    id: IdPath,
    body: Result<Json<LoanBalanceInput>, JsonRejection>,
) -> ApiResult<Json<LoanDetail>> {
    let Path(id) = id?;
    let Json(input) = body?;
    let loan = state
        .run(move |storage, _| LoanService::new(storage).record_balance(id, input))
        .await?;
    Ok(Json(loan))
}

/// DELETE /api/loans/:id/balances/:balance_id
pub async fn delete_loan_balance(
    State(state): State<AppState>,
    ids: PairPath,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Path((loan_id, balance_id)) = ids?;
    state
        .run(move |storage, _| LoanService::new(storage).delete_balance(loan_id, balance_id))
        .await?;
    Ok(deleted("Loan balance", balance_id))
}

// Investments

/// GET /api/investments
pub async fn portfolio(State(state): State<AppState>) -> ApiResult<Json<Portfolio>> {
    let portfolio = state
        .run(|storage, _| InvestmentService::new(storage).portfolio())
        .await?;
    Ok(Json(portfolio))
}

pub async fn create_investment(
    State(state): State<AppState>,
    body: Result<Json<InvestmentInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Investment>)> {
    let Json(input) = body?;
    let investment = state
        .run(move |storage, _| InvestmentService::new(storage).create(input))
        .await?;
    Ok((StatusCode::CREATED, Json(investment)))
}

pub async fn get_investment(
    State(state): State<AppState>,
    id: IdPath,
) -> ApiResult<Json<InvestmentDetail>> {
    let Path(id) = id?;
    let investment = state
        .run(move |storage, _| InvestmentService::new(storage).get(id))
        .await?;
    Ok(Json(investment))
}

pub async fn update_investment(
    State(state): State<AppState>,
    id: IdPath,
    body: Result<Json<InvestmentInput>, JsonRejection>,
) -> ApiResult<Json<Investment>> {
    let Path(id) = id?;
    let Json(input) = body?;
    let investment = state
        .run(move |storage, _| InvestmentService::new(storage).update(id, input))
        .await?;
    Ok(Json(investment))
}

pub async fn delete_investment(
    State(state): State<AppState>,
    id: IdPath,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Path(id) = id?;
    state
        .run(move |storage, _| InvestmentService::new(storage).delete(id))
        .await?;
    Ok(deleted("Investment", id))
}

/// POST /api/investments/:id/values
pub async fn record_investment_value(
    State(state): State<AppState>,
    id: IdPath,
    body: Result<Json<InvestmentValueInput>, JsonRejection>,
) -> ApiResult<Json<InvestmentDetail>> {
    let Path(id) = id?;
    let Json(input) = body?;
    let investment = state
        .run(move |storage, _| InvestmentService::new(storage).record_value(id, input))
        .await?;
    Ok(Json(investment))
}

/// DELETE /api/investments/:id/values/:value_id
pub async fn delete_investment_value(
    State(state): State<AppState>,
    ids: PairPath,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Path((investment_id, value_id)) = ids?;
    state
        .run(move |storage, _| InvestmentService::new(storage).delete_value(investment_id, value_id))
        .await?;
    Ok(deleted("Investment value", value_id))
}
