//! Database configuration module for the idiot-index service.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables and indexes are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust structs.

use crate::entities::{Component, Product};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::info;

/// Connection URL used when neither config.toml nor `DATABASE_URL` names one.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://idiot_index.sqlite?mode=rwc";

/// Establishes a connection to the database at `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    info!("Connecting to database at {}", database_url);
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates the products and component tables, plus the component lookup indexes.
///
/// Every statement uses `IF NOT EXISTS`, so this is safe to run on every startup.
/// Products are created first because component rows reference them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut product_table = schema.create_table_from_entity(Product);
    product_table.if_not_exists();
    let mut component_table = schema.create_table_from_entity(Component);
    component_table.if_not_exists();

    db.execute(builder.build(&product_table)).await?;
    db.execute(builder.build(&component_table)).await?;

    for mut index in schema.create_index_from_entity(Component) {
        index.if_not_exists();
        db.execute(builder.build(&index)).await?;
    }

    Ok(())
}

/// Connects and makes sure the schema exists.
pub async fn init_database(database_url: &str) -> Result<DatabaseConnection> {
    let db = create_connection(database_url).await?;
    create_tables(&db).await?;
    Ok(db)
}
