//! Database connection and table creation using `SeaORM`.
//!
//! Tables are created from the entity definitions via
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs without hand-written SQL. Statements are issued with
//! `IF NOT EXISTS`, making the bootstrap safe across restarts.

use crate::entities::{CashBox, Transaction};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Establishes a connection to the database behind the given URL.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates all tables the service needs from the entity definitions.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut cash_box_table = schema.create_table_from_entity(CashBox);
    let mut transaction_table = schema.create_table_from_entity(Transaction);

    db.execute(builder.build(cash_box_table.if_not_exists()))
        .await?;
    db.execute(builder.build(transaction_table.if_not_exists()))
        .await?;

    Ok(())
}
