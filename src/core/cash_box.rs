//! Cash box business logic - Handles the box catalog.
//!
//! Provides functions for creating, retrieving, and retiring cash boxes.
//! The opening balance is fixed at creation; everything after it lives in
//! the transaction log, so the "current balance" of a box is just the last
//! cached `post_balance` in replay order.

use crate::{
    core::ledger::{self, BoxLocks},
    entities::{CashBox, cash_box},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};

/// Creates a new cash box with the given opening balance.
///
/// The name must be non-empty and the opening balance non-negative; the
/// balance is otherwise never validated again.
pub async fn create_cash_box(
    db: &DatabaseConnection,
    name: String,
    opening_balance: Decimal,
) -> Result<cash_box::Model> {
    if name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Cash box name cannot be empty".to_string(),
        });
    }
    if opening_balance < Decimal::ZERO {
        return Err(Error::InvalidAmount {
            amount: opening_balance,
        });
    }

    let cash_box = cash_box::ActiveModel {
        name: Set(name.trim().to_string()),
        opening_balance: Set(opening_balance),
        created_at: Set(Utc::now()),
        is_deleted: Set(false),
        ..Default::default()
    };

    let created = cash_box.insert(db).await?;
    tracing::info!(cash_box_id = created.id, name = %created.name, "cash box created");
    Ok(created)
}

/// Retrieves all active (non-deleted) cash boxes, ordered alphabetically by name.
pub async fn get_all_active_cash_boxes(db: &DatabaseConnection) -> Result<Vec<cash_box::Model>> {
    CashBox::find()
        .filter(cash_box::Column::IsDeleted.eq(false))
        .order_by_asc(cash_box::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an active cash box by its unique ID, returning None if missing or deleted.
pub async fn get_cash_box_by_id(
    db: &DatabaseConnection,
    cash_box_id: i64,
) -> Result<Option<cash_box::Model>> {
    CashBox::find_by_id(cash_box_id)
        .filter(cash_box::Column::IsDeleted.eq(false))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Current balance of a box: the last `post_balance` in replay order, or the
/// opening balance for an empty log.
pub async fn current_balance<C>(conn: &C, cash_box: &cash_box::Model) -> Result<Decimal>
where
    C: ConnectionTrait,
{
    let latest = ledger::latest_transaction(conn, cash_box.id).await?;
    Ok(latest.map_or(cash_box.opening_balance, |t| t.post_balance))
}

/// Soft-deletes a cash box; its log is preserved but the box disappears
/// from listings and from recalculation.
pub async fn soft_delete_cash_box(
    db: &DatabaseConnection,
    locks: &BoxLocks,
    cash_box_id: i64,
) -> Result<()> {
    let _guards = locks.acquire(vec![cash_box_id]).await;

    let cash_box = get_cash_box_by_id(db, cash_box_id)
        .await?
        .ok_or(Error::CashBoxNotFound { id: cash_box_id })?;

    let mut row: cash_box::ActiveModel = cash_box.into();
    row.is_deleted = Set(true);
    row.update(db).await?;

    tracing::info!(cash_box_id, "cash box deleted");
    Ok(())
}
