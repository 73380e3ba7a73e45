//! Transfer business logic - Linked two-leg movements between cash boxes.
//!
//! A transfer is one `transfer_out` row in the source box and one
//! `transfer_in` row in the destination box, cross-referenced through
//! `counterparty_cash_box_id`. Both legs always carry the same amount and
//! business date; editing or deleting either leg mirrors the change onto the
//! counter-entry and replays both boxes, since both balances depend on it.

use crate::{
    core::{
        ledger::{self, BoxLocks},
        transaction::{
            TransactionKind, insertion_context, require_cash_box, validate_amount,
        },
    },
    entities::{Transaction, transaction},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, TransactionTrait, prelude::*};

/// The two rows written for one transfer.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TransferPair {
    /// The `transfer_out` row in the source box
    pub outgoing: transaction::Model,
    /// The `transfer_in` row in the destination box
    pub incoming: transaction::Model,
}

/// Moves an amount from one cash box to another.
///
/// Writes both legs in one storage transaction. The source must cover the
/// amount at the transfer's business date; the destination only receives,
/// so it is never balance-checked.
#[allow(clippy::too_many_arguments)]
pub async fn create_transfer(
    db: &DatabaseConnection,
    locks: &BoxLocks,
    amount_limit: Decimal,
    from_cash_box_id: i64,
    to_cash_box_id: i64,
    amount: Decimal,
    description: String,
    occurred_at: Date,
) -> Result<TransferPair> {
    if from_cash_box_id == to_cash_box_id {
        return Err(Error::InvalidTransfer {
            message: "source and destination cash boxes must differ".to_string(),
        });
    }
    validate_amount(amount, amount_limit)?;

    let _guards = locks.acquire(vec![from_cash_box_id, to_cash_box_id]).await;
    let txn = db.begin().await?;

    let source = require_cash_box(&txn, from_cash_box_id).await?;
    let destination = require_cash_box(&txn, to_cash_box_id).await?;

    let (source_balance, source_has_successor) =
        insertion_context(&txn, &source, occurred_at).await?;
    if source_balance < amount {
        return Err(Error::InsufficientBalance {
            current: source_balance,
            required: amount,
        });
    }

    let now = Utc::now();
    let outgoing = transaction::ActiveModel {
        cash_box_id: Set(source.id),
        counterparty_cash_box_id: Set(Some(destination.id)),
        kind: Set(TransactionKind::TransferOut.as_str().to_string()),
        amount: Set(amount),
        description: Set(description.clone()),
        occurred_at: Set(occurred_at),
        recorded_at: Set(now),
        post_balance: Set(source_balance - amount),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    if source_has_successor {
        ledger::recalculate_in(&txn, source.id).await?;
    }

    let (destination_balance, destination_has_successor) =
        insertion_context(&txn, &destination, occurred_at).await?;
    let incoming = transaction::ActiveModel {
        cash_box_id: Set(destination.id),
        counterparty_cash_box_id: Set(Some(source.id)),
        kind: Set(TransactionKind::TransferIn.as_str().to_string()),
        amount: Set(amount),
        description: Set(description),
        occurred_at: Set(occurred_at),
        recorded_at: Set(now),
        post_balance: Set(destination_balance + amount),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    if destination_has_successor {
        ledger::recalculate_in(&txn, destination.id).await?;
    }

    txn.commit().await?;
    tracing::info!(
        from_cash_box_id,
        to_cash_box_id,
        %amount,
        "transfer created"
    );
    Ok(TransferPair { outgoing, incoming })
}

/// Resolves the counter-entry of a transfer leg.
///
/// The data model links boxes, not rows: the counter-entry is the row in the
/// counterparty box that points back at the leg's box with the mirrored
/// kind, the same amount and business date. Among duplicates the row with
/// the nearest `recorded_at` wins.
pub(crate) async fn find_counter_leg<C>(
    conn: &C,
    leg: &transaction::Model,
) -> Result<Option<transaction::Model>>
where
    C: ConnectionTrait,
{
    let Some(counterparty_id) = leg.counterparty_cash_box_id else {
        return Ok(None);
    };
    let mirrored = match TransactionKind::from_db(&leg.kind)? {
        TransactionKind::TransferOut => TransactionKind::TransferIn,
        TransactionKind::TransferIn => TransactionKind::TransferOut,
        _ => return Ok(None),
    };

    let candidates = Transaction::find()
        .filter(transaction::Column::CashBoxId.eq(counterparty_id))
        .filter(transaction::Column::CounterpartyCashBoxId.eq(leg.cash_box_id))
        .filter(transaction::Column::Kind.eq(mirrored.as_str()))
        .filter(transaction::Column::Amount.eq(leg.amount))
        .filter(transaction::Column::OccurredAt.eq(leg.occurred_at))
        .all(conn)
        .await?;

    Ok(candidates.into_iter().min_by_key(|candidate| {
        (candidate.recorded_at - leg.recorded_at).abs()
    }))
}

/// Loads a transfer leg and its counter-entry, failing when the id does not
/// name a transfer leg or the pair is broken.
async fn require_pair(
    db: &DatabaseConnection,
    leg_id: i64,
) -> Result<(transaction::Model, transaction::Model)> {
    let leg = Transaction::find_by_id(leg_id)
        .one(db)
        .await?
        .ok_or(Error::TransactionNotFound { id: leg_id })?;
    if !TransactionKind::from_db(&leg.kind)?.is_transfer_leg() {
        return Err(Error::InvalidTransfer {
            message: format!("transaction {leg_id} is not a transfer leg"),
        });
    }
    let counter = find_counter_leg(db, &leg)
        .await?
        .ok_or_else(|| Error::InvalidTransfer {
            message: format!("counter-entry of transfer leg {leg_id} not found"),
        })?;
    Ok((leg, counter))
}

/// Changes the amount of a transfer; both legs are rewritten and both boxes
/// replayed.
pub async fn update_transfer_amount(
    db: &DatabaseConnection,
    locks: &BoxLocks,
    amount_limit: Decimal,
    leg_id: i64,
    new_amount: Decimal,
) -> Result<TransferPair> {
    validate_amount(new_amount, amount_limit)?;

    let (leg, counter) = require_pair(db, leg_id).await?;
    let _guards = locks.acquire(vec![leg.cash_box_id, counter.cash_box_id]).await;
    let txn = db.begin().await?;

    let (leg_box, counter_box) = (leg.cash_box_id, counter.cash_box_id);
    let (leg_id, counter_id) = (leg.id, counter.id);
    for model in [leg, counter] {
        let mut row: transaction::ActiveModel = model.into();
        row.amount = Set(new_amount);
        row.update(&txn).await?;
    }

    ledger::recalculate_in(&txn, leg_box).await?;
    ledger::recalculate_in(&txn, counter_box).await?;

    let reloaded_leg = Transaction::find_by_id(leg_id)
        .one(&txn)
        .await?
        .ok_or(Error::TransactionNotFound { id: leg_id })?;
    let reloaded_counter = Transaction::find_by_id(counter_id)
        .one(&txn)
        .await?
        .ok_or(Error::TransactionNotFound { id: counter_id })?;
    txn.commit().await?;

    tracing::info!(leg_id, counter_id, %new_amount, "transfer amount updated");
    Ok(match TransactionKind::from_db(&reloaded_leg.kind)? {
        TransactionKind::TransferOut => TransferPair {
            outgoing: reloaded_leg,
            incoming: reloaded_counter,
        },
        _ => TransferPair {
            outgoing: reloaded_counter,
            incoming: reloaded_leg,
        },
    })
}

/// Removes a transfer given either of its legs; both rows are deleted and
/// both boxes replayed.
pub async fn delete_transfer(
    db: &DatabaseConnection,
    locks: &BoxLocks,
    leg_id: i64,
) -> Result<()> {
    let (leg, counter) = require_pair(db, leg_id).await?;
    let _guards = locks.acquire(vec![leg.cash_box_id, counter.cash_box_id]).await;
    let txn = db.begin().await?;

    let (leg_box, counter_box) = (leg.cash_box_id, counter.cash_box_id);
    let counter_id = counter.id;
    leg.delete(&txn).await?;
    counter.delete(&txn).await?;

    ledger::recalculate_in(&txn, leg_box).await?;
    ledger::recalculate_in(&txn, counter_box).await?;
    txn.commit().await?;

    tracing::info!(leg_id, counter_id, "transfer deleted");
    Ok(())
}
