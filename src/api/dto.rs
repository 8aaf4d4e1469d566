//! Request and response bodies for the HTTP API.
//!
//! Responses are built from the core's full-precision values and rounded here: money to
//! two fractional digits, the idiot index to four. Decimals are written as JSON strings.
//! Request fields are optional at the serde level so that a missing field is reported
//! as an invalid argument naming that field.

use crate::{
    core::{
        composition::{ComponentLine, NewComponent, ProductDetail, ProductValuation, UsageRecord},
        graph::ComponentTreeNode,
        pricing::{self, IndexBand},
        product::ProductChanges,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/products`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProductRequest {
    /// Required product name
    pub name: Option<String>,
    /// Required retail price
    pub retail_price: Option<Decimal>,
    /// Optional description
    pub description: Option<String>,
    /// Optional source URL
    pub url: Option<String>,
}

impl CreateProductRequest {
    /// Splits the request into validated required fields and the optional ones.
    pub fn into_parts(self) -> Result<(String, Decimal, Option<String>, Option<String>)> {
        let name = self
            .name
            .ok_or_else(|| Error::invalid("name", "is required"))?;
        let retail_price = self
            .retail_price
            .ok_or_else(|| Error::invalid("retail_price", "is required"))?;
        Ok((name, retail_price, self.description, self.url))
    }
}

/// Body of `PUT /api/products/{id}`; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductRequest {
    /// New name
    pub name: Option<String>,
    /// New retail price
    pub retail_price: Option<Decimal>,
    /// New description; empty string clears it
    pub description: Option<String>,
    /// New source URL; empty string clears it
    pub url: Option<String>,
}

impl From<UpdateProductRequest> for ProductChanges {
    fn from(request: UpdateProductRequest) -> Self {
        Self {
            name: request.name,
            retail_price: request.retail_price,
            description: request.description,
            url: request.url,
        }
    }
}

/// Body of `POST /api/products/{id}/components`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddComponentRequest {
    /// Product to add as a component
    pub component_id: Option<i64>,
    /// Units of the component per parent
    pub quantity: Option<Decimal>,
    /// Unit label
    pub unit: Option<String>,
}

impl AddComponentRequest {
    /// Builds the core input for parent `parent_id`.
    pub fn into_new_component(self, parent_id: i64) -> Result<NewComponent> {
        Ok(NewComponent {
            parent_id,
            component_id: self
                .component_id
                .ok_or_else(|| Error::invalid("component_id", "is required"))?,
            quantity: self
                .quantity
                .ok_or_else(|| Error::invalid("quantity", "is required"))?,
            unit: self
                .unit
                .ok_or_else(|| Error::invalid("unit", "is required"))?,
        })
    }
}

/// A product with derived values
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductView {
    /// Product id
    pub id: i64,
    /// Product name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Optional source URL
    pub url: Option<String>,
    /// Retail price
    pub retail_price: Decimal,
    /// Aggregated materials cost
    pub materials_cost: Decimal,
    /// Retail price over materials cost; null when materials cost is zero
    pub idiot_index: Option<Decimal>,
    /// Band of the idiot index; null when the index is
    pub index_band: Option<IndexBand>,
    /// True when the product has no components
    pub is_raw_material: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl From<&ProductValuation> for ProductView {
    fn from(valuation: &ProductValuation) -> Self {
        let product = &valuation.product;
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            url: product.url.clone(),
            retail_price: pricing::round_money(product.retail_price()),
            materials_cost: pricing::round_money(valuation.materials_cost),
            idiot_index: valuation.idiot_index.map(pricing::round_index),
            index_band: valuation.idiot_index.map(IndexBand::classify),
            is_raw_material: valuation.is_raw_material,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// One direct component of a product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentLineView {
    /// Component product id
    pub component_id: i64,
    /// Component product name
    pub name: String,
    /// Units per parent
    pub quantity: Decimal,
    /// Unit label
    pub unit: String,
    /// Materials cost of one unit of the component
    pub materials_cost: Decimal,
    /// Materials cost times quantity
    pub line_cost: Decimal,
}

impl From<&ComponentLine> for ComponentLineView {
    fn from(line: &ComponentLine) -> Self {
        Self {
            component_id: line.component.id,
            name: line.component.name.clone(),
            quantity: line.quantity,
            unit: line.unit.clone(),
            materials_cost: pricing::round_money(line.materials_cost),
            line_cost: pricing::round_money(line.line_cost),
        }
    }
}

/// A product with derived values and its direct components
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductDetailView {
    /// Product fields and derived values
    #[serde(flatten)]
    pub product: ProductView,
    /// Direct components
    pub components: Vec<ComponentLineView>,
}

impl From<&ProductDetail> for ProductDetailView {
    fn from(detail: &ProductDetail) -> Self {
        Self {
            product: ProductView::from(&detail.valuation),
            components: detail
                .components
                .iter()
                .map(ComponentLineView::from)
                .collect(),
        }
    }
}

/// A node of the component tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentTreeView {
    /// Product id
    pub id: i64,
    /// Product name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Optional source URL
    pub url: Option<String>,
    /// Retail price
    pub retail_price: Decimal,
    /// Aggregated materials cost
    pub materials_cost: Decimal,
    /// Retail price over materials cost
    pub idiot_index: Option<Decimal>,
    /// Band of the idiot index
    pub index_band: Option<IndexBand>,
    /// Units per parent; absent at the root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    /// Unit label; absent at the root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Materials cost times quantity; absent at the root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_cost: Option<Decimal>,
    /// Direct components
    pub children: Vec<ComponentTreeView>,
}

impl From<&ComponentTreeNode> for ComponentTreeView {
    fn from(node: &ComponentTreeNode) -> Self {
        let product = &node.product;
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            url: product.url.clone(),
            retail_price: pricing::round_money(product.retail_price()),
            materials_cost: pricing::round_money(node.materials_cost),
            idiot_index: node.idiot_index.map(pricing::round_index),
            index_band: node.idiot_index.map(IndexBand::classify),
            quantity: node.usage.as_ref().map(|usage| usage.quantity),
            unit: node.usage.as_ref().map(|usage| usage.unit.clone()),
            line_cost: node.line_cost.map(pricing::round_money),
            children: node.children.iter().map(Self::from).collect(),
        }
    }
}

/// A product that uses another as a component
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageView {
    /// Parent product id
    pub parent_id: i64,
    /// Parent product name
    pub parent_name: String,
    /// Units of the component per parent
    pub quantity: Decimal,
    /// Unit label
    pub unit: String,
    /// The parent's idiot index
    pub parent_idiot_index: Option<Decimal>,
    /// Band of the parent's idiot index
    pub parent_index_band: Option<IndexBand>,
}

impl From<&UsageRecord> for UsageView {
    fn from(record: &UsageRecord) -> Self {
        Self {
            parent_id: record.parent_id,
            parent_name: record.parent_name.clone(),
            quantity: record.quantity,
            unit: record.unit.clone(),
            parent_idiot_index: record.parent_idiot_index.map(pricing::round_index),
            parent_index_band: record.parent_idiot_index.map(IndexBand::classify),
        }
    }
}
