use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    self, expenses, finances, invoices, payment_methods, people, recurring, reports,
};
use super::state::AppState;

/// Headroom on top of the invoice limit for multipart framing and form fields
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the application router with every API endpoint
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.settings().max_invoice_bytes + MULTIPART_OVERHEAD;
    let cors_allow_any = state.settings().cors_allow_any;

    let router = Router::new()
        .route("/health", get(handlers::health_check))
        // Expenses
        .route("/api/expenses", get(expenses::list).post(expenses::create))
        .route("/api/expenses/tax-deductible", get(expenses::tax_deductible))
        .route(
            "/api/expenses/:id",
            get(expenses::get).put(expenses::update).delete(expenses::delete),
        )
        .route(
            "/api/expenses/:id/claim-status",
            patch(expenses::update_claim_status),
        )
        .route("/api/expenses/:id/invoices", get(invoices::list_for_expense))
        // People
        .route("/api/people", get(people::list).post(people::create))
        .route(
            "/api/people/:id",
            get(people::get).put(people::update).delete(people::delete),
        )
        // Invoices
        .route("/api/invoices", post(invoices::upload))
        .route(
            "/api/invoices/:id",
            get(invoices::get).delete(invoices::delete),
        )
        .route("/api/invoices/:id/file", get(invoices::download))
        .route("/api/invoices/:id/person", patch(invoices::set_person))
        // Income
        .route(
            "/api/income",
            get(finances::list_income).post(finances::create_income),
        )
        .route("/api/income/copy-previous", post(finances::copy_previous_income))
        .route(
            "/api/income/:id",
            get(finances::get_income)
                .put(finances::update_income)
                .delete(finances::delete_income),
        )
        // Fixed expenses
        .route(
            "/api/fixed-expenses",
            get(finances::list_fixed).post(finances::create_fixed),
        )
        .route(
            "/api/fixed-expenses/carry-forward",
            post(finances::carry_forward_fixed),
        )
        .route(
            "/api/fixed-expenses/:id",
            get(finances::get_fixed)
                .put(finances::update_fixed)
                .delete(finances::delete_fixed),
        )
        // Loans
        .route(
            "/api/loans",
            get(finances::list_loans).post(finances::create_loan),
        )
        .route(
            "/api/loans/:id",
            get(finances::get_loan)
                .put(finances::update_loan)
                .delete(finances::delete_loan),
        )
        .route("/api/loans/:id/paid-off", patch(finances::set_loan_paid_off))
        .route("/api/loans/:id/balances", post(finances::record_loan_balance))
        .route(
            "/api/loans/:id/balances/:balance_id",
            axum::routing::delete(finances::delete_loan_balance),
        )
        // Investments
        .route(
            "/api/investments",
            get(finances::portfolio).post(finances::create_investment),
        )
        .route(
            "/api/investments/:id",
            get(finances::get_investment)
                .put(finances::update_investment)
                .delete(finances::delete_investment),
        )
        .route(
            "/api/investments/:id/values",
            post(finances::record_investment_value),
        )
        .route(
            "/api/investments/:id/values/:value_id",
            axum::routing::delete(finances::delete_investment_value),
        )
        // Payment methods
        .route(
            "/api/payment-methods",
            get(payment_methods::list).post(payment_methods::create),
        )
        .route(
            "/api/payment-methods/:id",
            get(payment_methods::get)
                .put(payment_methods::update)
                .delete(payment_methods::delete),
        )
        .route(
            "/api/payment-methods/:id/statement",
            get(payment_methods::statement),
        )
        // Recurring templates
        .route("/api/recurring", get(recurring::list).post(recurring::create))
        .route("/api/recurring/generate", post(recurring::generate))
        .route(
            "/api/recurring/:id",
            get(recurring::get)
                .put(recurring::update)
                .delete(recurring::delete),
        )
        .route("/api/recurring/:id/paused", patch(recurring::set_paused))
        // Analytics
        .route("/api/merchants/top", get(reports::top_merchants))
        .route("/api/merchants/:place", get(reports::merchant_detail))
        .route("/api/places", get(reports::list_places))
        .route("/api/places/similar", get(reports::similar_places))
        .route("/api/places/standardize", post(reports::standardize_places))
        .route("/api/summary/monthly", get(reports::monthly_summary))
        .route("/api/reminders/status", get(reports::reminder_status))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http());

    if cors_allow_any {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    }
}
