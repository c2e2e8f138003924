//! JSON HTTP API
//!
//! An axum router over the services and reports. Handlers run database work
//! on the blocking pool through [`AppState::run`].

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use router::create_router;
pub use server::{init_tracing, run_server};
pub use state::AppState;
