//! Product entity - Represents a priced item that may be composed of other products.
//!
//! A product without outgoing component edges is a raw material: its materials cost is
//! its own retail price. Derived values (materials cost, idiot index) are never stored
//! here; they are computed from the composition graph on every read.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the product (e.g., "Kitchen Chair", "Oak Plank")
    pub name: String,
    /// Optional free-text description
    pub description: Option<String>,
    /// Optional URL the price was taken from
    pub url: Option<String>,
    /// Retail price in cents
    pub retail_price_cents: i64,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

/// Products relate to each other only through `product_components`,
/// which holds two foreign keys into this table.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Retail price as a two-digit decimal
    #[must_use]
    pub fn retail_price(&self) -> Decimal {
        crate::core::pricing::from_minor_units(self.retail_price_cents)
    }
}
