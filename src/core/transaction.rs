//! Transaction business logic - Validated mutations of the ledger.
//!
//! Create, update, and delete operations validate their input (positive
//! amount, configured ceiling, sufficient balance for debits) before touching
//! the log, then keep every cached `post_balance` consistent: a tail append
//! extends the running balance directly, anything that can disturb earlier
//! rows triggers a full replay of the owning box. Transfer legs are managed
//! by [`crate::core::transfer`]; deleting one through this module delegates
//! there so both boxes stay consistent.

use crate::{
    core::ledger::{self, BoxLocks},
    entities::{CashBox, Transaction, cash_box, transaction},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};

/// The category of a ledger entry; it determines the sign of the entry's
/// effect on the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Money paid into the box
    Income,
    /// Money paid out of the box
    Expense,
    /// Outgoing leg of a transfer between two boxes
    TransferOut,
    /// Incoming leg of a transfer between two boxes
    TransferIn,
    /// Reversal entry; always balance-decreasing
    Cancellation,
}

impl TransactionKind {
    /// Stored string form of the kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::TransferOut => "transfer_out",
            Self::TransferIn => "transfer_in",
            Self::Cancellation => "cancellation",
        }
    }

    /// Parses the stored string form.
    pub fn from_db(value: &str) -> Result<Self> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer_out" => Ok(Self::TransferOut),
            "transfer_in" => Ok(Self::TransferIn),
            "cancellation" => Ok(Self::Cancellation),
            _ => Err(Error::UnknownTransactionKind {
                value: value.to_string(),
            }),
        }
    }

    /// Whether the kind increases the balance.
    pub const fn is_credit(self) -> bool {
        matches!(self, Self::Income | Self::TransferIn)
    }

    /// Whether the kind is one leg of a transfer pair.
    pub const fn is_transfer_leg(self) -> bool {
        matches!(self, Self::TransferOut | Self::TransferIn)
    }

    /// Amount signed by the kind's effect on the balance.
    pub fn signed_delta(self, amount: Decimal) -> Decimal {
        if self.is_credit() { amount } else { -amount }
    }
}

/// Partial update of a ledger entry; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionUpdate {
    /// New kind, if changing
    pub kind: Option<TransactionKind>,
    /// New amount, if changing
    pub amount: Option<Decimal>,
    /// New business date, if changing
    pub occurred_at: Option<Date>,
    /// New description, if changing
    pub description: Option<String>,
}

/// Rejects non-positive amounts and amounts above the configured ceiling.
pub(crate) fn validate_amount(amount: Decimal, limit: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount { amount });
    }
    if amount > limit {
        return Err(Error::AmountAboveLimit { amount, limit });
    }
    Ok(())
}

/// Loads an active (non-deleted) cash box or fails with `CashBoxNotFound`.
pub(crate) async fn require_cash_box<C>(conn: &C, cash_box_id: i64) -> Result<cash_box::Model>
where
    C: ConnectionTrait,
{
    CashBox::find_by_id(cash_box_id)
        .filter(cash_box::Column::IsDeleted.eq(false))
        .one(conn)
        .await?
        .ok_or(Error::CashBoxNotFound { id: cash_box_id })
}

/// Balance of the box immediately before a row with the given business date
/// would be inserted, and whether any existing row would sort after it.
///
/// A new row's `recorded_at` is the current instant, so every existing row
/// with the same business date sorts before it; only rows with a later
/// business date are successors.
pub(crate) async fn insertion_context<C>(
    conn: &C,
    cash_box: &cash_box::Model,
    occurred_at: Date,
) -> Result<(Decimal, bool)>
where
    C: ConnectionTrait,
{
    let predecessor = Transaction::find()
        .filter(transaction::Column::CashBoxId.eq(cash_box.id))
        .filter(transaction::Column::OccurredAt.lte(occurred_at))
        .order_by_desc(transaction::Column::OccurredAt)
        .order_by_desc(transaction::Column::RecordedAt)
        .order_by_desc(transaction::Column::Id)
        .one(conn)
        .await?;
    let balance_before =
        predecessor.map_or(cash_box.opening_balance, |t| t.post_balance);

    let successor = Transaction::find()
        .filter(transaction::Column::CashBoxId.eq(cash_box.id))
        .filter(transaction::Column::OccurredAt.gt(occurred_at))
        .one(conn)
        .await?;

    Ok((balance_before, successor.is_some()))
}

/// Creates an income, expense, or cancellation entry and keeps cached
/// balances consistent.
///
/// When the new row lands at the tail of the replay order its `post_balance`
/// is the previous balance plus the signed amount and no other row changes;
/// a backdated business date can have successors, so that path replays the
/// whole box instead. Debit kinds must be covered by the balance at the
/// insertion point.
#[allow(clippy::too_many_arguments)]
pub async fn create_transaction(
    db: &DatabaseConnection,
    locks: &BoxLocks,
    amount_limit: Decimal,
    cash_box_id: i64,
    kind: TransactionKind,
    amount: Decimal,
    description: String,
    occurred_at: Date,
) -> Result<transaction::Model> {
    if kind.is_transfer_leg() {
        return Err(Error::InvalidTransfer {
            message: "transfer legs are created through the transfer operation".to_string(),
        });
    }
    validate_amount(amount, amount_limit)?;

    let _guards = locks.acquire(vec![cash_box_id]).await;
    let txn = db.begin().await?;

    let cash_box = require_cash_box(&txn, cash_box_id).await?;
    let (balance_before, has_successor) =
        insertion_context(&txn, &cash_box, occurred_at).await?;

    if !kind.is_credit() && balance_before < amount {
        return Err(Error::InsufficientBalance {
            current: balance_before,
            required: amount,
        });
    }

    let row = transaction::ActiveModel {
        cash_box_id: Set(cash_box_id),
        counterparty_cash_box_id: Set(None),
        kind: Set(kind.as_str().to_string()),
        amount: Set(amount),
        description: Set(description),
        occurred_at: Set(occurred_at),
        recorded_at: Set(Utc::now()),
        post_balance: Set(balance_before + kind.signed_delta(amount)),
        ..Default::default()
    };
    let created = row.insert(&txn).await?;

    // A backdated entry shifts every later balance; repair before committing.
    if has_successor {
        ledger::recalculate_in(&txn, cash_box_id).await?;
    }

    txn.commit().await?;
    tracing::info!(
        cash_box_id,
        transaction_id = created.id,
        kind = kind.as_str(),
        %amount,
        "transaction created"
    );
    Ok(created)
}

/// Retrieves all transactions of a cash box in replay order.
pub async fn get_transactions_for_cash_box(
    db: &DatabaseConnection,
    cash_box_id: i64,
) -> Result<Vec<transaction::Model>> {
    ledger::replay_order(
        Transaction::find().filter(transaction::Column::CashBoxId.eq(cash_box_id)),
    )
    .all(db)
    .await
    .map_err(Into::into)
}

/// Retrieves a specific transaction by its unique ID.
pub async fn get_transaction_by_id(
    db: &DatabaseConnection,
    transaction_id: i64,
) -> Result<Option<transaction::Model>> {
    Transaction::find_by_id(transaction_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Applies a partial edit to a non-transfer entry and replays the owning box.
///
/// Any of kind, amount, or business date can move every subsequent balance,
/// so edits always trigger a full recalculation. Sufficiency is not
/// re-checked: the insufficient-balance rule applies at creation time
/// against the balance at that point in history, never retroactively, so an
/// edit may legitimately leave later balances negative.
pub async fn update_transaction(
    db: &DatabaseConnection,
    locks: &BoxLocks,
    amount_limit: Decimal,
    transaction_id: i64,
    update: TransactionUpdate,
) -> Result<transaction::Model> {
    if let Some(amount) = update.amount {
        validate_amount(amount, amount_limit)?;
    }
    if let Some(kind) = update.kind {
        if kind.is_transfer_leg() {
            return Err(Error::InvalidTransfer {
                message: "an entry cannot be turned into a transfer leg".to_string(),
            });
        }
    }

    let existing = get_transaction_by_id(db, transaction_id)
        .await?
        .ok_or(Error::TransactionNotFound { id: transaction_id })?;
    if TransactionKind::from_db(&existing.kind)?.is_transfer_leg() {
        return Err(Error::InvalidTransfer {
            message: "transfer legs are edited through the transfer operation".to_string(),
        });
    }

    let cash_box_id = existing.cash_box_id;
    let _guards = locks.acquire(vec![cash_box_id]).await;
    let txn = db.begin().await?;

    let mut row: transaction::ActiveModel = existing.into();
    if let Some(kind) = update.kind {
        row.kind = Set(kind.as_str().to_string());
    }
    if let Some(amount) = update.amount {
        row.amount = Set(amount);
    }
    if let Some(occurred_at) = update.occurred_at {
        row.occurred_at = Set(occurred_at);
    }
    if let Some(description) = update.description {
        row.description = Set(description);
    }
    row.update(&txn).await?;

    ledger::recalculate_in(&txn, cash_box_id).await?;

    let updated = Transaction::find_by_id(transaction_id)
        .one(&txn)
        .await?
        .ok_or(Error::TransactionNotFound { id: transaction_id })?;
    txn.commit().await?;

    tracing::info!(cash_box_id, transaction_id, "transaction updated");
    Ok(updated)
}

/// Deletes a transaction and replays the owning box.
///
/// Transfer legs are delegated to the transfer operation, which removes the
/// counter-entry and recalculates both boxes.
pub async fn delete_transaction(
    db: &DatabaseConnection,
    locks: &BoxLocks,
    transaction_id: i64,
) -> Result<()> {
    let existing = get_transaction_by_id(db, transaction_id)
        .await?
        .ok_or(Error::TransactionNotFound { id: transaction_id })?;

    if TransactionKind::from_db(&existing.kind)?.is_transfer_leg() {
        return crate::core::transfer::delete_transfer(db, locks, transaction_id).await;
    }

    let cash_box_id = existing.cash_box_id;
    let _guards = locks.acquire(vec![cash_box_id]).await;
    let txn = db.begin().await?;

    existing.delete(&txn).await?;
    ledger::recalculate_in(&txn, cash_box_id).await?;
    txn.commit().await?;

    tracing::info!(cash_box_id, transaction_id, "transaction deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn day(d: u32) -> Date {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[tokio::test]
    async fn test_create_transaction_rejects_bad_amounts() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let locks = BoxLocks::default();

        let result = create_transaction(
            &db,
            &locks,
            TEST_AMOUNT_LIMIT,
            1,
            TransactionKind::Income,
            Decimal::ZERO,
            "zero".to_string(),
            day(1),
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { .. }));

        let result = create_transaction(
            &db,
            &locks,
            TEST_AMOUNT_LIMIT,
            1,
            TransactionKind::Income,
            dec!(-5),
            "negative".to_string(),
            day(1),
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { .. }));

        let result = create_transaction(
            &db,
            &locks,
            dec!(100),
            1,
            TransactionKind::Income,
            dec!(101),
            "above limit".to_string(),
            day(1),
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::AmountAboveLimit { .. }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_transaction_rejects_transfer_kinds() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let locks = BoxLocks::default();

        for kind in [TransactionKind::TransferOut, TransactionKind::TransferIn] {
            let result = create_transaction(
                &db,
                &locks,
                TEST_AMOUNT_LIMIT,
                1,
                kind,
                dec!(10),
                "leg".to_string(),
                day(1),
            )
            .await;
            assert!(matches!(result.unwrap_err(), Error::InvalidTransfer { .. }));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_create_transaction_missing_box() -> Result<()> {
        let db = setup_test_db().await?;
        let locks = BoxLocks::default();

        let result = create_transaction(
            &db,
            &locks,
            TEST_AMOUNT_LIMIT,
            999,
            TransactionKind::Income,
            dec!(10),
            "orphan".to_string(),
            day(1),
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::CashBoxNotFound { id: 999 }));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_transaction_insufficient_balance() -> Result<()> {
        let db = setup_test_db().await?;
        let locks = BoxLocks::default();
        let cash_box = create_custom_cash_box(&db, "Front Desk", dec!(50)).await?;

        let result = create_transaction(
            &db,
            &locks,
            TEST_AMOUNT_LIMIT,
            cash_box.id,
            TransactionKind::Expense,
            dec!(80),
            "too big".to_string(),
            day(1),
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientBalance { current, required }
                if current == dec!(50) && required == dec!(80)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_tail_append_extends_running_balance() -> Result<()> {
        let db = setup_test_db().await?;
        let cash_box = create_custom_cash_box(&db, "Front Desk", dec!(1000)).await?;

        let t1 = create_test_transaction(&db, cash_box.id, TransactionKind::Income, dec!(500), day(1)).await?;
        let t2 = create_test_transaction(&db, cash_box.id, TransactionKind::Expense, dec!(200), day(2)).await?;
        let t3 = create_test_transaction(&db, cash_box.id, TransactionKind::Income, dec!(100), day(2)).await?;

        assert_eq!(t1.post_balance, dec!(1500));
        assert_eq!(t2.post_balance, dec!(1300));
        assert_eq!(t3.post_balance, dec!(1400));
        Ok(())
    }

    #[tokio::test]
    async fn test_backdated_insert_replays_successors() -> Result<()> {
        let db = setup_test_db().await?;
        let cash_box = create_custom_cash_box(&db, "Front Desk", dec!(1000)).await?;

        create_test_transaction(&db, cash_box.id, TransactionKind::Income, dec!(500), day(5)).await?;

        // Lands before the existing entry, so the whole box is replayed.
        let backdated = create_test_transaction(
            &db,
            cash_box.id,
            TransactionKind::Expense,
            dec!(300),
            day(1),
        )
        .await?;
        assert_eq!(backdated.post_balance, dec!(700));

        let log = get_transactions_for_cash_box(&db, cash_box.id).await?;
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].id, backdated.id);
        assert_eq!(log[0].post_balance, dec!(700));
        assert_eq!(log[1].post_balance, dec!(1200));
        Ok(())
    }

    #[tokio::test]
    async fn test_backdated_debit_checked_against_balance_at_that_point() -> Result<()> {
        let db = setup_test_db().await?;
        let locks = BoxLocks::default();
        let cash_box = create_custom_cash_box(&db, "Front Desk", dec!(100)).await?;

        create_test_transaction(&db, cash_box.id, TransactionKind::Income, dec!(900), day(5)).await?;

        // The box holds 1000 today, but only 100 on day 1.
        let result = create_transaction(
            &db,
            &locks,
            TEST_AMOUNT_LIMIT,
            cash_box.id,
            TransactionKind::Expense,
            dec!(500),
            "backdated".to_string(),
            day(1),
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientBalance { current, .. } if current == dec!(100)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_amount_shifts_later_balances() -> Result<()> {
        let db = setup_test_db().await?;
        let locks = BoxLocks::default();
        let cash_box = create_custom_cash_box(&db, "Front Desk", dec!(1000)).await?;

        let t1 = create_test_transaction(&db, cash_box.id, TransactionKind::Income, dec!(500), day(1)).await?;
        create_test_transaction(&db, cash_box.id, TransactionKind::Expense, dec!(200), day(2)).await?;

        let updated = update_transaction(
            &db,
            &locks,
            TEST_AMOUNT_LIMIT,
            t1.id,
            TransactionUpdate {
                amount: Some(dec!(100)),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.post_balance, dec!(1100));

        let log = get_transactions_for_cash_box(&db, cash_box.id).await?;
        assert_eq!(log[1].post_balance, dec!(900));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_kind_flips_sign() -> Result<()> {
        let db = setup_test_db().await?;
        let locks = BoxLocks::default();
        let cash_box = create_custom_cash_box(&db, "Front Desk", dec!(1000)).await?;

        let t1 = create_test_transaction(&db, cash_box.id, TransactionKind::Income, dec!(500), day(1)).await?;

        let updated = update_transaction(
            &db,
            &locks,
            TEST_AMOUNT_LIMIT,
            t1.id,
            TransactionUpdate {
                kind: Some(TransactionKind::Expense),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.post_balance, dec!(500));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_missing_transaction() -> Result<()> {
        let db = setup_test_db().await?;
        let locks = BoxLocks::default();

        let result = update_transaction(
            &db,
            &locks,
            TEST_AMOUNT_LIMIT,
            999,
            TransactionUpdate::default(),
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::TransactionNotFound { id: 999 }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_shifts_later_balances() -> Result<()> {
        let db = setup_test_db().await?;
        let locks = BoxLocks::default();
        let cash_box = create_custom_cash_box(&db, "Front Desk", dec!(1000)).await?;

        create_test_transaction(&db, cash_box.id, TransactionKind::Income, dec!(500), day(1)).await?;
        let t2 = create_test_transaction(&db, cash_box.id, TransactionKind::Expense, dec!(200), day(2)).await?;
        create_test_transaction(&db, cash_box.id, TransactionKind::Income, dec!(100), day(2)).await?;

        delete_transaction(&db, &locks, t2.id).await?;

        let log = get_transactions_for_cash_box(&db, cash_box.id).await?;
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].post_balance, dec!(1500));
        assert_eq!(log[1].post_balance, dec!(1600));
        Ok(())
    }

    #[tokio::test]
    async fn test_kind_round_trips_through_storage_form() -> Result<()> {
        for kind in [
            TransactionKind::Income,
            TransactionKind::Expense,
            TransactionKind::TransferOut,
            TransactionKind::TransferIn,
            TransactionKind::Cancellation,
        ] {
            assert_eq!(TransactionKind::from_db(kind.as_str())?, kind);
        }
        assert!(matches!(
            TransactionKind::from_db("refund").unwrap_err(),
            Error::UnknownTransactionKind { .. }
        ));
        Ok(())
    }
}
