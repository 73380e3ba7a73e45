//! Report generation business logic.
//!
//! Per-box summaries over the transaction log: totals by kind, entry count,
//! and the closing balance at the end of an optional business-date window.
//! All functions return structured data; formatting belongs to the API layer.

use crate::{
    core::{cash_box::get_cash_box_by_id, ledger, transaction::TransactionKind},
    entities::{Transaction, cash_box, transaction},
    errors::{Error, Result},
};
use sea_orm::prelude::*;
use serde::Serialize;

/// Summary of one cash box's activity, optionally limited to a date window.
#[derive(Debug, Clone, Serialize)]
pub struct CashBoxSummary {
    /// The cash box being reported on
    pub cash_box: cash_box::Model,
    /// Sum of income amounts in the window
    pub total_income: Decimal,
    /// Sum of expense amounts in the window
    pub total_expense: Decimal,
    /// Sum of incoming transfer amounts in the window
    pub total_transfer_in: Decimal,
    /// Sum of outgoing transfer amounts in the window
    pub total_transfer_out: Decimal,
    /// Sum of cancellation amounts in the window
    pub total_cancellation: Decimal,
    /// Number of entries in the window
    pub transaction_count: usize,
    /// Balance after the last entry on or before the window's end
    /// (the opening balance when nothing precedes it)
    pub closing_balance: Decimal,
}

/// Generates a summary for one cash box.
///
/// `from`/`to` bound the business dates considered, inclusive on both ends;
/// either side may be open.
pub async fn generate_cash_box_summary(
    db: &DatabaseConnection,
    cash_box_id: i64,
    from: Option<Date>,
    to: Option<Date>,
) -> Result<CashBoxSummary> {
    let cash_box = get_cash_box_by_id(db, cash_box_id)
        .await?
        .ok_or(Error::CashBoxNotFound { id: cash_box_id })?;

    let mut query = Transaction::find().filter(transaction::Column::CashBoxId.eq(cash_box_id));
    if let Some(from) = from {
        query = query.filter(transaction::Column::OccurredAt.gte(from));
    }
    if let Some(to) = to {
        query = query.filter(transaction::Column::OccurredAt.lte(to));
    }
    let entries = ledger::replay_order(query).all(db).await?;

    let mut summary = CashBoxSummary {
        total_income: Decimal::ZERO,
        total_expense: Decimal::ZERO,
        total_transfer_in: Decimal::ZERO,
        total_transfer_out: Decimal::ZERO,
        total_cancellation: Decimal::ZERO,
        transaction_count: entries.len(),
        closing_balance: closing_balance(db, &cash_box, to).await?,
        cash_box,
    };

    for entry in &entries {
        let bucket = match TransactionKind::from_db(&entry.kind)? {
            TransactionKind::Income => &mut summary.total_income,
            TransactionKind::Expense => &mut summary.total_expense,
            TransactionKind::TransferIn => &mut summary.total_transfer_in,
            TransactionKind::TransferOut => &mut summary.total_transfer_out,
            TransactionKind::Cancellation => &mut summary.total_cancellation,
        };
        *bucket += entry.amount;
    }

    Ok(summary)
}

/// Generates summaries for every active cash box.
pub async fn generate_all_summaries(
    db: &DatabaseConnection,
    from: Option<Date>,
    to: Option<Date>,
) -> Result<Vec<CashBoxSummary>> {
    let boxes = crate::core::cash_box::get_all_active_cash_boxes(db).await?;

    let mut summaries = Vec::with_capacity(boxes.len());
    for cash_box in boxes {
        summaries.push(generate_cash_box_summary(db, cash_box.id, from, to).await?);
    }
    Ok(summaries)
}

/// Balance after the last entry with a business date on or before `to`
/// (over the whole log when `to` is open).
async fn closing_balance(
    db: &DatabaseConnection,
    cash_box: &cash_box::Model,
    to: Option<Date>,
) -> Result<Decimal> {
    let mut query = Transaction::find().filter(transaction::Column::CashBoxId.eq(cash_box.id));
    if let Some(to) = to {
        query = query.filter(transaction::Column::OccurredAt.lte(to));
    }
    let last = ledger::replay_order(query).all(db).await?.pop();
    Ok(last.map_or(cash_box.opening_balance, |t| t.post_balance))
}
