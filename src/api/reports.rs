//! Reporting endpoints.

use crate::{api::AppState, core::report};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use serde::Deserialize;

/// Routes for reporting.
pub fn router() -> Router<AppState> {
    Router::new().route("/cash-boxes", get(cash_box_summaries))
}

/// Query of `GET /reports/cash-boxes`.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryParams {
    /// First business date included, if any
    pub from: Option<NaiveDate>,
    /// Last business date included, if any
    pub to: Option<NaiveDate>,
}

async fn cash_box_summaries(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> Response {
    match report::generate_all_summaries(&state.db, params.from, params.to).await {
        Ok(summaries) => (StatusCode::OK, Json(summaries)).into_response(),
        Err(e) => e.into_response(),
    }
}
