//! Product business logic - Handles all product catalog operations.
//!
//! This module provides functions for creating, retrieving, updating, and deleting
//! products. Prices arrive as decimals and are validated and stored as whole cents.
//! Derived values live in [`crate::core::composition`]; nothing here computes costs.

use crate::{
    config::settings::GraphConfig,
    core::{composition::GraphWriteLock, graph::CompositionGraph, pricing},
    entities::{Component, Product, component, product},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, warn};

/// Field changes for [`update_product`]. `None` leaves a field untouched; an empty
/// string clears an optional text field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductChanges {
    /// New name
    pub name: Option<String>,
    /// New retail price
    pub retail_price: Option<Decimal>,
    /// New description, empty to clear
    pub description: Option<String>,
    /// New source URL, empty to clear
    pub url: Option<String>,
}

/// Retrieves all products, ordered alphabetically by name.
pub async fn get_all_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .order_by_asc(product::Column::Name)
        .order_by_asc(product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a specific product by its unique ID.
pub async fn get_product_by_id(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Option<product::Model>> {
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a new product, performing input validation.
///
/// # Errors
/// Returns an error if:
/// - The product name is empty or whitespace-only
/// - The price is negative or has more than two fractional digits
/// - The database insert operation fails
pub async fn create_product(
    db: &DatabaseConnection,
    name: String,
    retail_price: Decimal,
    description: Option<String>,
    url: Option<String>,
) -> Result<product::Model> {
    let name = validate_name(&name)?;
    let retail_price_cents = pricing::price_to_cents(retail_price)?;

    let now = chrono::Utc::now();
    let product = product::ActiveModel {
        name: Set(name),
        description: Set(optional_text(description)),
        url: Set(optional_text(url)),
        retail_price_cents: Set(retail_price_cents),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = product.insert(db).await?;
    info!("Created product {} ({})", created.id, created.name);
    Ok(created)
}

/// Applies `changes` to an existing product and refreshes its updated timestamp.
///
/// A price change is written only if the product and everything built from it can
/// still be valued.
///
/// # Errors
/// Returns an error if:
/// - A new name is empty or whitespace-only
/// - A new price is negative or has more than two fractional digits
/// - The product does not exist
/// - The new price would overflow the materials cost of a product containing it
/// - The database update operation fails
pub async fn update_product(
    db: &DatabaseConnection,
    lock: &GraphWriteLock,
    product_id: i64,
    changes: ProductChanges,
    limits: GraphConfig,
) -> Result<product::Model> {
    let name = changes.name.as_deref().map(validate_name).transpose()?;
    let retail_price_cents = changes
        .retail_price
        .map(pricing::price_to_cents)
        .transpose()?;

    let _guard = lock.acquire().await;
    let txn = db.begin().await?;

    let mut product: product::ActiveModel = Product::find_by_id(product_id)
        .one(&txn)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })?
        .into();

    if let Some(name) = name {
        product.name = Set(name);
    }
    if let Some(cents) = retail_price_cents {
        product.retail_price_cents = Set(cents);
    }
    if let Some(description) = changes.description {
        product.description = Set(optional_text(Some(description)));
    }
    if let Some(url) = changes.url {
        product.url = Set(optional_text(Some(url)));
    }
    product.updated_at = Set(chrono::Utc::now());

    let updated = product.update(&txn).await?;
    if retail_price_cents.is_some() {
        let checked = match CompositionGraph::load(&txn, limits).await {
            Ok(graph) => graph.check_costs_upward(product_id),
            Err(e) => Err(e),
        };
        if let Err(e) = checked {
            warn!("Rejected price change for product {}: {}", product_id, e);
            txn.rollback().await?;
            return Err(e);
        }
    }
    txn.commit().await?;

    info!("Updated product {}", updated.id);
    Ok(updated)
}

/// Deletes a product together with its own bill of materials.
///
/// A product that is still a component of another product is not deleted; the
/// error lists the parents that reference it. The product's outgoing edges and the
/// product row are removed in one transaction.
pub async fn delete_product(
    db: &DatabaseConnection,
    lock: &GraphWriteLock,
    product_id: i64,
) -> Result<product::Model> {
    let _guard = lock.acquire().await;
    let txn = db.begin().await?;

    let product = Product::find_by_id(product_id)
        .one(&txn)
        .await?
        .ok_or(Error::ProductNotFound { id: product_id })?;

    let mut parents: Vec<i64> = Component::find()
        .filter(component::Column::ComponentProductId.eq(product_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|edge| edge.parent_product_id)
        .collect();
    if !parents.is_empty() {
        parents.sort_unstable();
        parents.dedup();
        warn!(
            "Refusing to delete product {} still used by {:?}",
            product_id, parents
        );
        return Err(Error::ProductInUse {
            id: product_id,
            parents,
        });
    }

    let removed_edges = Component::delete_many()
        .filter(component::Column::ParentProductId.eq(product_id))
        .exec(&txn)
        .await?
        .rows_affected;
    Product::delete_by_id(product_id).exec(&txn).await?;
    txn.commit().await?;

    info!(
        "Deleted product {} and {} of its component edges",
        product_id, removed_edges
    );
    Ok(product)
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid("name", "Product name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
