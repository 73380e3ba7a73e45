//! Transaction entity - Represents all ledger entries in the system.
//!
//! Each transaction has a `cash_box_id`, kind, amount, description, a
//! user-supplied business date (`occurred_at`), a system-supplied creation
//! timestamp (`recorded_at`), and a cached `post_balance`. Transfer legs
//! additionally carry `counterparty_cash_box_id`, the other box of the pair.
//!
//! `post_balance` is owned by the ledger recalculator: replaying the box's
//! log ordered by `(occurred_at, recorded_at)` from the opening balance must
//! reproduce it exactly.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the cash box this transaction belongs to
    pub cash_box_id: i64,
    /// The other box of a transfer pair; `None` for non-transfer entries
    pub counterparty_cash_box_id: Option<i64>,
    /// Kind of entry: `"income"`, `"expense"`, `"transfer_out"`,
    /// `"transfer_in"`, or `"cancellation"`
    pub kind: String,
    /// Amount, strictly positive as stored; the sign is implied by the kind
    pub amount: Decimal,
    /// Human-readable description of the transaction
    pub description: String,
    /// Business date of the transaction (user-supplied)
    pub occurred_at: Date,
    /// Creation timestamp (system-supplied, tie-break within one business date)
    pub recorded_at: DateTimeUtc,
    /// Cached running balance immediately after this transaction
    pub post_balance: Decimal,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one cash box
    #[sea_orm(
        belongs_to = "super::cash_box::Entity",
        from = "Column::CashBoxId",
        to = "super::cash_box::Column::Id"
    )]
    CashBox,
}

impl Related<super::cash_box::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CashBox.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
