//! Unified error types and result handling for the ledger service.

use rust_decimal::Decimal;
use thiserror::Error;

/// All errors the service can surface.
///
/// Validation failures carry the values that were rejected so the API layer
/// can report them back to the client without re-deriving anything.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong while loading or parsing configuration
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Validation error: {message}")]
    Validation {
        /// Why the input was rejected
        message: String,
    },

    #[error("Cash box {id} not found")]
    CashBoxNotFound {
        /// The id that matched no active cash box
        id: i64,
    },

    #[error("Transaction {id} not found")]
    TransactionNotFound {
        /// The id that matched no transaction
        id: i64,
    },

    #[error("Invalid transaction amount: {amount}")]
    InvalidAmount {
        /// The rejected amount (zero or negative)
        amount: Decimal,
    },

    #[error("Amount {amount} exceeds the configured limit of {limit}")]
    AmountAboveLimit {
        /// The rejected amount
        amount: Decimal,
        /// The configured per-transaction ceiling
        limit: Decimal,
    },

    #[error("Insufficient balance: current {current}, required {required}")]
    InsufficientBalance {
        /// Balance of the box at the time of the check
        current: Decimal,
        /// Amount the debit would have withdrawn
        required: Decimal,
    },

    #[error("Unknown transaction kind: {value:?}")]
    UnknownTransactionKind {
        /// The string stored or submitted as the kind
        value: String,
    },

    #[error("Invalid transfer: {message}")]
    InvalidTransfer {
        /// Why the transfer request was rejected
        message: String,
    },
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
