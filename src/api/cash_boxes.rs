//! Cash box catalog endpoints.

use crate::{
    api::AppState,
    core::cash_box,
    entities,
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Routes for the cash box catalog.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cash_boxes).post(create_cash_box))
        .route("/{id}", get(get_cash_box).delete(delete_cash_box))
}

/// Body of `POST /cash-boxes`.
#[derive(Debug, Deserialize)]
pub struct CreateCashBoxRequest {
    /// Name of the new box
    pub name: String,
    /// Balance at inception
    pub opening_balance: Decimal,
}

/// A cash box together with its derived current balance.
#[derive(Debug, Serialize)]
pub struct CashBoxResponse {
    /// The stored cash box
    #[serde(flatten)]
    pub cash_box: entities::cash_box::Model,
    /// Last cached post-balance, or the opening balance for an empty log
    pub current_balance: Decimal,
}

async fn with_balance(
    db: &sea_orm::DatabaseConnection,
    cash_box: entities::cash_box::Model,
) -> Result<CashBoxResponse> {
    let current_balance = cash_box::current_balance(db, &cash_box).await?;
    Ok(CashBoxResponse {
        cash_box,
        current_balance,
    })
}

async fn create_cash_box(
    State(state): State<AppState>,
    Json(body): Json<CreateCashBoxRequest>,
) -> Response {
    let created = match cash_box::create_cash_box(&state.db, body.name, body.opening_balance).await
    {
        Ok(c) => c,
        Err(e) => return e.into_response(),
    };
    match with_balance(&state.db, created).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn list_cash_boxes(State(state): State<AppState>) -> Response {
    let boxes = match cash_box::get_all_active_cash_boxes(&state.db).await {
        Ok(b) => b,
        Err(e) => return e.into_response(),
    };

    let mut items = Vec::with_capacity(boxes.len());
    for cash_box in boxes {
        match with_balance(&state.db, cash_box).await {
            Ok(item) => items.push(item),
            Err(e) => return e.into_response(),
        }
    }
    (StatusCode::OK, Json(items)).into_response()
}

async fn get_cash_box(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match cash_box::get_cash_box_by_id(&state.db, id).await {
        Ok(Some(found)) => match with_balance(&state.db, found).await {
            Ok(response) => (StatusCode::OK, Json(response)).into_response(),
            Err(e) => e.into_response(),
        },
        Ok(None) => Error::CashBoxNotFound { id }.into_response(),
        Err(e) => e.into_response(),
    }
}

async fn delete_cash_box(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match cash_box::soft_delete_cash_box(&state.db, &state.locks, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
