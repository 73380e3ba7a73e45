//! Ledger transaction endpoints.
//!
//! One route set covers plain entries and transfers: a create request with a
//! `counterparty_cash_box_id` and kind `transfer_out` books both legs, and
//! edits or deletes against either leg of a transfer are routed through the
//! transfer operation so the counter-entry stays in step.

use crate::{
    api::AppState,
    core::transaction::{self, TransactionKind, TransactionUpdate},
    core::transfer,
    errors::Error,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Routes for ledger transactions.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_transactions).post(create_transaction))
        .route("/{id}", axum::routing::put(update_transaction).delete(delete_transaction))
}

/// Query of `GET /cash-box-transactions`.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Box whose log is listed
    pub cash_box_id: i64,
}

/// Body of `POST /cash-box-transactions`.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    /// Owning box (the source box for transfers)
    pub cash_box_id: i64,
    /// Entry kind
    pub kind: TransactionKind,
    /// Amount, strictly positive
    pub amount: Decimal,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Business date
    pub occurred_at: NaiveDate,
    /// Destination box; required for (and only valid with) kind `transfer_out`
    pub counterparty_cash_box_id: Option<i64>,
}

async fn list_transactions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    match transaction::get_transactions_for_cash_box(&state.db, params.cash_box_id).await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn create_transaction(
    State(state): State<AppState>,
    Json(body): Json<CreateTransactionRequest>,
) -> Response {
    let limit = state.config.max_transaction_amount;

    match (body.kind, body.counterparty_cash_box_id) {
        (TransactionKind::TransferOut, Some(counterparty)) => {
            match transfer::create_transfer(
                &state.db,
                &state.locks,
                limit,
                body.cash_box_id,
                counterparty,
                body.amount,
                body.description,
                body.occurred_at,
            )
            .await
            {
                Ok(pair) => (StatusCode::CREATED, Json(pair)).into_response(),
                Err(e) => e.into_response(),
            }
        }
        (TransactionKind::TransferOut, None) => Error::InvalidTransfer {
            message: "a transfer needs a counterparty_cash_box_id".to_string(),
        }
        .into_response(),
        (_, Some(_)) => Error::InvalidTransfer {
            message: "only kind transfer_out may carry a counterparty_cash_box_id".to_string(),
        }
        .into_response(),
        (kind, None) => {
            match transaction::create_transaction(
                &state.db,
                &state.locks,
                limit,
                body.cash_box_id,
                kind,
                body.amount,
                body.description,
                body.occurred_at,
            )
            .await
            {
                Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
                Err(e) => e.into_response(),
            }
        }
    }
}

async fn update_transaction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<TransactionUpdate>,
) -> Response {
    let limit = state.config.max_transaction_amount;

    let existing = match transaction::get_transaction_by_id(&state.db, id).await {
        Ok(Some(t)) => t,
        Ok(None) => return Error::TransactionNotFound { id }.into_response(),
        Err(e) => return e.into_response(),
    };
    let kind = match TransactionKind::from_db(&existing.kind) {
        Ok(k) => k,
        Err(e) => return e.into_response(),
    };

    if kind.is_transfer_leg() {
        // Only the amount of a transfer can change; everything else would
        // desynchronize the legs.
        if update.kind.is_some() || update.occurred_at.is_some() || update.description.is_some() {
            return Error::InvalidTransfer {
                message: "only the amount of a transfer can be edited".to_string(),
            }
            .into_response();
        }
        let Some(new_amount) = update.amount else {
            return Error::InvalidTransfer {
                message: "a transfer edit must carry an amount".to_string(),
            }
            .into_response();
        };
        return match transfer::update_transfer_amount(&state.db, &state.locks, limit, id, new_amount)
            .await
        {
            Ok(pair) => (StatusCode::OK, Json(pair)).into_response(),
            Err(e) => e.into_response(),
        };
    }

    match transaction::update_transaction(&state.db, &state.locks, limit, id, update).await {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn delete_transaction(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match transaction::delete_transaction(&state.db, &state.locks, id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use crate::api::test_server::spawn;
    use crate::errors::Result;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};

    async fn create_box(server: &TestServer, name: &str, opening: &str) -> i64 {
        let response = server
            .post("/cash-boxes")
            .json(&json!({ "name": name, "opening_balance": opening }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_deposit_withdraw_flow() -> Result<()> {
        let server = spawn().await?;
        let box_id = create_box(&server, "Front Desk", "1000").await;

        let deposit = server
            .post("/cash-box-transactions")
            .json(&json!({
                "cash_box_id": box_id,
                "kind": "income",
                "amount": "500",
                "description": "ticket sales",
                "occurred_at": "2025-03-01",
            }))
            .await;
        deposit.assert_status(StatusCode::CREATED);
        assert_eq!(deposit.json::<Value>()["post_balance"], "1500");

        let withdraw = server
            .post("/cash-box-transactions")
            .json(&json!({
                "cash_box_id": box_id,
                "kind": "expense",
                "amount": "200",
                "description": "florist",
                "occurred_at": "2025-03-02",
            }))
            .await;
        withdraw.assert_status(StatusCode::CREATED);
        assert_eq!(withdraw.json::<Value>()["post_balance"], "1300");

        let listing = server
            .get(&format!("/cash-box-transactions?cash_box_id={box_id}"))
            .await;
        assert_eq!(listing.json::<Vec<Value>>().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_overdraw_rejected() -> Result<()> {
        let server = spawn().await?;
        let box_id = create_box(&server, "Front Desk", "100").await;

        let response = server
            .post("/cash-box-transactions")
            .json(&json!({
                "cash_box_id": box_id,
                "kind": "expense",
                "amount": "500",
                "occurred_at": "2025-03-01",
            }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.json::<Value>()["error"], "validation_failed");
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_books_both_legs() -> Result<()> {
        let server = spawn().await?;
        let source = create_box(&server, "Front Desk", "1000").await;
        let destination = create_box(&server, "Bar Till", "0").await;

        let response = server
            .post("/cash-box-transactions")
            .json(&json!({
                "cash_box_id": source,
                "kind": "transfer_out",
                "counterparty_cash_box_id": destination,
                "amount": "300",
                "description": "float",
                "occurred_at": "2025-03-01",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let pair: Value = response.json();
        assert_eq!(pair["outgoing"]["post_balance"], "700");
        assert_eq!(pair["incoming"]["post_balance"], "300");

        // Editing the outgoing leg updates the incoming one too.
        let leg_id = pair["outgoing"]["id"].as_i64().unwrap();
        let edited = server
            .put(&format!("/cash-box-transactions/{leg_id}"))
            .json(&json!({ "amount": "100" }))
            .await;
        edited.assert_status(StatusCode::OK);
        let edited: Value = edited.json();
        assert_eq!(edited["outgoing"]["post_balance"], "900");
        assert_eq!(edited["incoming"]["post_balance"], "100");

        // Deleting the incoming leg removes the pair.
        let incoming_id = edited["incoming"]["id"].as_i64().unwrap();
        server
            .delete(&format!("/cash-box-transactions/{incoming_id}"))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let listing = server
            .get(&format!("/cash-box-transactions?cash_box_id={source}"))
            .await;
        assert!(listing.json::<Vec<Value>>().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_without_counterparty_rejected() -> Result<()> {
        let server = spawn().await?;
        let source = create_box(&server, "Front Desk", "1000").await;

        let response = server
            .post("/cash-box-transactions")
            .json(&json!({
                "cash_box_id": source,
                "kind": "transfer_out",
                "amount": "300",
                "occurred_at": "2025-03-01",
            }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        Ok(())
    }

    #[tokio::test]
    async fn test_counterparty_on_plain_entry_rejected() -> Result<()> {
        let server = spawn().await?;
        let box_id = create_box(&server, "Front Desk", "1000").await;

        let response = server
            .post("/cash-box-transactions")
            .json(&json!({
                "cash_box_id": box_id,
                "kind": "income",
                "counterparty_cash_box_id": box_id,
                "amount": "300",
                "occurred_at": "2025-03-01",
            }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_missing_transaction() -> Result<()> {
        let server = spawn().await?;
        server
            .delete("/cash-box-transactions/999")
            .await
            .assert_status(StatusCode::NOT_FOUND);
        Ok(())
    }
}
