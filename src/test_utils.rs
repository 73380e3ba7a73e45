//! Shared test utilities.
//!
//! Common helpers for setting up in-memory test databases and creating
//! entities with sensible defaults.

use crate::{
    core::{cash_box, ledger::BoxLocks, transaction, transaction::TransactionKind},
    entities,
    errors::Result,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::DatabaseConnection;

/// Amount ceiling used throughout the tests; high enough to never interfere
/// unless a test passes its own limit.
pub const TEST_AMOUNT_LIMIT: Decimal = dec!(1_000_000);

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test cash box with an opening balance of 1000.
pub async fn create_test_cash_box(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::cash_box::Model> {
    cash_box::create_cash_box(db, name.to_string(), dec!(1000)).await
}

/// Creates a test cash box with a custom opening balance.
pub async fn create_custom_cash_box(
    db: &DatabaseConnection,
    name: &str,
    opening_balance: Decimal,
) -> Result<entities::cash_box::Model> {
    cash_box::create_cash_box(db, name.to_string(), opening_balance).await
}

/// Creates a validated transaction through the regular mutation path.
///
/// Uses a throwaway lock registry; tests run their scenarios on a single
/// task, so cross-task serialization never comes into play.
pub async fn create_test_transaction(
    db: &DatabaseConnection,
    cash_box_id: i64,
    kind: TransactionKind,
    amount: Decimal,
    occurred_at: NaiveDate,
) -> Result<entities::transaction::Model> {
    transaction::create_transaction(
        db,
        &BoxLocks::default(),
        TEST_AMOUNT_LIMIT,
        cash_box_id,
        kind,
        amount,
        "Test transaction".to_string(),
        occurred_at,
    )
    .await
}

/// Sets up a complete test environment with one cash box.
/// Returns (db, cash_box) for common test scenarios.
pub async fn setup_with_cash_box() -> Result<(DatabaseConnection, entities::cash_box::Model)> {
    let db = setup_test_db().await?;
    let cash_box = create_test_cash_box(&db, "Test Cash Box").await?;
    Ok((db, cash_box))
}
