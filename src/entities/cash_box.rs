//! Cash box entity - Represents a till/account in the back office.
//!
//! Each cash box has a name and an `opening_balance` fixed at creation.
//! The running balance is never stored on the box itself; it is derived
//! from the transaction log.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cash box database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cash_boxes")]
pub struct Model {
    /// Unique identifier for the cash box
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable name of the cash box (e.g., "Front Desk", "Bar Till")
    pub name: String,
    /// Balance at the box's inception; recalculation never touches it
    pub opening_balance: Decimal,
    /// When the cash box was created
    pub created_at: DateTimeUtc,
    /// Soft delete flag - if true, the box is hidden but its log is preserved
    pub is_deleted: bool,
}

/// Defines relationships between CashBox and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One cash box has many transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
