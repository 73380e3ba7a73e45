//! Ledger recalculation - Rebuilds cached running balances from the transaction log.
//!
//! The transaction log is the source of truth; each row's `post_balance` is a
//! materialized view over it. This module owns the replay that keeps the two
//! in sync: starting from the box's opening balance, transactions are applied
//! in `(occurred_at, recorded_at)` order and every row's `post_balance` is
//! rewritten to the running total immediately after that row.
//!
//! Recalculation is a consistency repair, not a validated operation: it never
//! rejects the stored log (a replay may legitimately produce negative
//! balances for histories that were valid when written) and a missing box is
//! a no-op rather than an error.

use crate::{
    core::transaction::TransactionKind,
    entities::{CashBox, Transaction, cash_box, transaction},
    errors::Result,
};
use sea_orm::{QueryOrder, Select, Set, TransactionTrait, prelude::*};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex},
};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Applies the canonical replay order to a transaction query:
/// business date first, then creation timestamp, with the row id as a
/// final stabilizer for rows recorded in the same instant.
pub(crate) fn replay_order(select: Select<Transaction>) -> Select<Transaction> {
    select
        .order_by_asc(transaction::Column::OccurredAt)
        .order_by_asc(transaction::Column::RecordedAt)
        .order_by_asc(transaction::Column::Id)
}

/// Returns the last transaction of a cash box in replay order, if any.
pub(crate) async fn latest_transaction<C>(
    conn: &C,
    cash_box_id: i64,
) -> Result<Option<transaction::Model>>
where
    C: ConnectionTrait,
{
    Transaction::find()
        .filter(transaction::Column::CashBoxId.eq(cash_box_id))
        .order_by_desc(transaction::Column::OccurredAt)
        .order_by_desc(transaction::Column::RecordedAt)
        .order_by_desc(transaction::Column::Id)
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Recomputes and persists `post_balance` for every transaction of a cash box.
///
/// The whole replay runs inside its own storage transaction, so a failure
/// part-way through never leaves a half-rewritten log. Re-running with
/// unchanged data writes identical values.
///
/// # Arguments
/// * `db` - Database connection
/// * `cash_box_id` - ID of the cash box to recalculate
pub async fn recalculate(db: &DatabaseConnection, cash_box_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    recalculate_in(&txn, cash_box_id).await?;
    txn.commit().await?;
    Ok(())
}

/// Replays a cash box's log within an existing connection or transaction.
///
/// Mutating operations that already hold a storage transaction call this
/// directly so the repair commits atomically with the mutation that
/// triggered it. A missing or deleted box is a no-op: callers have already
/// validated existence, and "nothing to recalculate" is not a failure.
pub async fn recalculate_in<C>(conn: &C, cash_box_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let Some(cash_box) = CashBox::find_by_id(cash_box_id)
        .filter(cash_box::Column::IsDeleted.eq(false))
        .one(conn)
        .await?
    else {
        tracing::debug!(cash_box_id, "recalculation skipped, cash box not found");
        return Ok(());
    };

    let transactions = replay_order(
        Transaction::find().filter(transaction::Column::CashBoxId.eq(cash_box_id)),
    )
    .all(conn)
    .await?;

    let count = transactions.len();
    let mut running = cash_box.opening_balance;
    for entry in transactions {
        let kind = TransactionKind::from_db(&entry.kind)?;
        running += kind.signed_delta(entry.amount);

        let mut row: transaction::ActiveModel = entry.into();
        row.post_balance = Set(running);
        row.update(conn).await?;
    }

    tracing::debug!(cash_box_id, transactions = count, %running, "ledger recalculated");
    Ok(())
}

/// Per-box serialization for ledger mutations.
///
/// Two concurrent mutations of the same box would otherwise both read a
/// pre-edit log and write stale balances. Every mutating operation acquires
/// the locks of the boxes it touches before its read-modify-write sequence;
/// `acquire` sorts the ids so a transfer touching two boxes can never
/// deadlock against another transfer locking them in the opposite order.
#[derive(Debug, Default)]
pub struct BoxLocks {
    locks: StdMutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl BoxLocks {
    /// Locks the given cash boxes in ascending id order and returns the
    /// guards; balances of those boxes must not be read or written without
    /// holding them.
    pub async fn acquire(&self, mut cash_box_ids: Vec<i64>) -> Vec<OwnedMutexGuard<()>> {
        cash_box_ids.sort_unstable();
        cash_box_ids.dedup();

        let mut guards = Vec::with_capacity(cash_box_ids.len());
        for id in cash_box_ids {
            let lock = {
                let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
                Arc::clone(locks.entry(id).or_default())
            };
            guards.push(lock.lock_owned().await);
        }
        guards
    }
}
