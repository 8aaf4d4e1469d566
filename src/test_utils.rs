//! Shared test utilities for the idiot-index service.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test products and component edges with sensible defaults.

use crate::{
    config::settings::GraphConfig,
    core::{
        composition::{self, GraphWriteLock, NewComponent, ProductDetail},
        product,
    },
    entities,
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test product with no description or URL.
pub async fn create_test_product(
    db: &DatabaseConnection,
    name: &str,
    retail_price: Decimal,
) -> Result<entities::product::Model> {
    product::create_product(db, name.to_string(), retail_price, None, None).await
}

/// Adds `quantity` units of `component_id` to `parent_id`.
///
/// # Defaults
/// * `unit`: "unit"
/// * limits: `GraphConfig::default()`
pub async fn link_products(
    db: &DatabaseConnection,
    lock: &GraphWriteLock,
    parent_id: i64,
    component_id: i64,
    quantity: Decimal,
) -> Result<ProductDetail> {
    composition::add_component(
        db,
        lock,
        NewComponent {
            parent_id,
            component_id,
            quantity,
            unit: "unit".to_string(),
        },
        GraphConfig::default(),
    )
    .await
}

/// The reference composite: P (32.00) built from 2 x A (5.00) and 3 x B (2.00).
pub struct CompositeExample {
    /// Database holding the example
    pub db: DatabaseConnection,
    /// Parent product "Product P"
    pub p: entities::product::Model,
    /// Raw material "Material A"
    pub a: entities::product::Model,
    /// Raw material "Material B"
    pub b: entities::product::Model,
}

/// Sets up the reference composite in a fresh database.
/// Materials cost of P is 16.00 and its idiot index is 2.
pub async fn setup_composite_example() -> Result<CompositeExample> {
    let db = setup_test_db().await?;
    let lock = GraphWriteLock::default();

    let p = create_test_product(&db, "Product P", Decimal::new(3200, 2)).await?;
    let a = create_test_product(&db, "Material A", Decimal::new(500, 2)).await?;
    let b = create_test_product(&db, "Material B", Decimal::new(200, 2)).await?;

    link_products(&db, &lock, p.id, a.id, Decimal::from(2)).await?;
    link_products(&db, &lock, p.id, b.id, Decimal::from(3)).await?;

    Ok(CompositeExample { db, p, a, b })
}
