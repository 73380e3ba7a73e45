//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod cash_box;
pub mod transaction;

// Re-export specific types to avoid conflicts
pub use cash_box::{Column as CashBoxColumn, Entity as CashBox, Model as CashBoxModel};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
