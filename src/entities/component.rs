//! Component entity - A quantity-weighted edge of the composition graph.
//!
//! Each row states "product `parent_product_id` requires `quantity` `unit` of product
//! `component_product_id`". The (parent, component) pair is unique; that is enforced
//! when edges are added rather than by the schema.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Component edge database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_components")]
pub struct Model {
    /// Unique identifier for the edge row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Product that is built from the component
    #[sea_orm(indexed)]
    pub parent_product_id: i64,
    /// Product used as the component
    #[sea_orm(indexed)]
    pub component_product_id: i64,
    /// How much of the component one parent needs, in hundredths; always positive
    pub quantity_hundredths: i64,
    /// Unit label for the quantity (e.g., "kg", "unit")
    pub unit: String,
    /// When the edge was created
    pub created_at: DateTimeUtc,
}

/// Both ends of an edge point at the products table
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The assembled product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ParentProductId",
        to = "super::product::Column::Id"
    )]
    Parent,
    /// The product consumed by the parent
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ComponentProductId",
        to = "super::product::Column::Id"
    )]
    Component,
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Quantity as a two-digit decimal
    #[must_use]
    pub fn quantity(&self) -> Decimal {
        crate::core::pricing::from_minor_units(self.quantity_hundredths)
    }
}
