//! HTTP interface - axum routers, request/response types, and error mapping.
//!
//! Handlers stay thin: they deserialize, call into [`crate::core`], and
//! serialize. All business rules, including when a mutation triggers a
//! ledger recalculation, live in the core layer.

pub mod cash_boxes;
pub mod reports;
pub mod transactions;

use crate::{
    config::settings::AppConfig,
    core::ledger::BoxLocks,
    errors::Error,
};
use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Service configuration
    pub config: Arc<AppConfig>,
    /// Per-box mutation locks
    pub locks: Arc<BoxLocks>,
}

/// Builds the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/cash-boxes", cash_boxes::router())
        .nest("/cash-box-transactions", transactions::router())
        .nest("/reports", reports::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Uniform JSON error body.
pub(crate) fn json_error(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": code, "message": message.into() })),
    )
        .into_response()
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::CashBoxNotFound { .. } | Error::TransactionNotFound { .. } => {
                json_error(StatusCode::NOT_FOUND, "not_found", self.to_string())
            }
            Error::Validation { .. }
            | Error::InvalidAmount { .. }
            | Error::AmountAboveLimit { .. }
            | Error::InsufficientBalance { .. }
            | Error::UnknownTransactionKind { .. }
            | Error::InvalidTransfer { .. } => json_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_failed",
                self.to_string(),
            ),
            _ => {
                tracing::error!(error = %self, "request failed");
                json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error",
                )
            }
        }
    }
}
