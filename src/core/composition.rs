//! Composition business logic - component edges and the values derived from them.
//!
//! Mutations (adding and removing component edges) run inside a database transaction
//! while holding the process-wide [`GraphWriteLock`], so the cycle check and the insert
//! see the same edge set. Reads load a fresh [`CompositionGraph`] per call and value it
//! with a request-scoped [`Valuator`](crate::core::graph::Valuator); nothing derived is
//! ever written back.

use crate::{
    config::settings::GraphConfig,
    core::{
        graph::{ComponentTreeNode, CompositionGraph, Valuator},
        pricing,
    },
    entities::{Component, component, product},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{DatabaseTransaction, Set, TransactionTrait, prelude::*};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

/// Serializes graph mutations within this process.
///
/// SQLite allows a single writer, but two transactions can both read the edge set
/// before either writes. Holding this lock across check-and-insert closes that window.
#[derive(Debug, Clone, Default)]
pub struct GraphWriteLock(Arc<Mutex<()>>);

impl GraphWriteLock {
    /// Waits for exclusive access to the graph.
    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.0.lock().await
    }
}

/// A product with its derived values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductValuation {
    /// Stored product fields
    pub product: product::Model,
    /// Aggregated materials cost, full precision
    pub materials_cost: Decimal,
    /// Retail price over materials cost, if defined
    pub idiot_index: Option<Decimal>,
    /// True when the product has no components
    pub is_raw_material: bool,
}

/// One direct component of a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentLine {
    /// The component product
    pub component: product::Model,
    /// Units of the component per parent
    pub quantity: Decimal,
    /// Unit label
    pub unit: String,
    /// Materials cost of one unit of the component
    pub materials_cost: Decimal,
    /// `materials_cost * quantity`
    pub line_cost: Decimal,
}

/// A product with its derived values and direct components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDetail {
    /// The product and its derived values
    pub valuation: ProductValuation,
    /// Direct components, in insertion order
    pub components: Vec<ComponentLine>,
}

/// One parent that uses a product as a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    /// Parent product id
    pub parent_id: i64,
    /// Parent product name
    pub parent_name: String,
    /// Units of the component per parent
    pub quantity: Decimal,
    /// Unit label
    pub unit: String,
    /// The parent's idiot index, if defined
    pub parent_idiot_index: Option<Decimal>,
}

/// Input for [`add_component`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComponent {
    /// Product that will contain the component
    pub parent_id: i64,
    /// Product to add as a component
    pub component_id: i64,
    /// Units of the component per parent; positive, at most two fractional digits
    pub quantity: Decimal,
    /// Unit label; must not be blank
    pub unit: String,
}

/// Adds the edge `parent -> component` and returns the parent with fresh derived values.
///
/// # Errors
/// Returns an error if:
/// - The quantity is not positive or has more than two fractional digits
/// - The unit is blank
/// - Either product does not exist
/// - The parent already has this component
/// - The edge would make a product its own (transitive) component
/// - Some component chain through the parent would exceed `limits.max_depth`
/// - The parent or a product containing it could no longer be valued
///
/// Nothing is written when any of these checks fails.
pub async fn add_component(
    db: &DatabaseConnection,
    lock: &GraphWriteLock,
    new_component: NewComponent,
    limits: GraphConfig,
) -> Result<ProductDetail> {
    let NewComponent {
        parent_id,
        component_id,
        quantity,
        unit,
    } = new_component;
    let quantity_hundredths = pricing::quantity_to_hundredths(quantity)?;
    let unit = unit.trim().to_string();
    if unit.is_empty() {
        return Err(Error::invalid("unit", "Unit cannot be empty"));
    }

    let _guard = lock.acquire().await;
    let txn = db.begin().await?;

    let graph = CompositionGraph::load(&txn, limits).await?;
    graph.product(parent_id)?;
    graph.product(component_id)?;

    if graph.edge(parent_id, component_id).is_some() {
        warn!(
            "Rejected duplicate component {} for product {}",
            component_id, parent_id
        );
        return Err(Error::DuplicateComponent {
            parent_id,
            component_id,
        });
    }
    if graph.would_create_cycle(parent_id, component_id) {
        warn!(
            "Rejected component {} for product {}: would create a cycle",
            component_id, parent_id
        );
        return Err(Error::CycleDetected {
            parent_id,
            component_id,
        });
    }

    let edge = component::ActiveModel {
        parent_product_id: Set(parent_id),
        component_product_id: Set(component_id),
        quantity_hundredths: Set(quantity_hundredths),
        unit: Set(unit),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    edge.insert(&txn).await?;

    let detail = match checked_detail(&txn, parent_id, limits).await {
        Ok(detail) => detail,
        Err(e) => {
            warn!(
                "Rejected component {} for product {}: {}",
                component_id, parent_id, e
            );
            txn.rollback().await?;
            return Err(e);
        }
    };
    txn.commit().await?;

    info!(
        "Added component {} x{} to product {}",
        component_id, quantity, parent_id
    );
    Ok(detail)
}

/// Re-checks limits around `parent_id` on the pending graph and builds its detail.
async fn checked_detail(
    txn: &DatabaseTransaction,
    parent_id: i64,
    limits: GraphConfig,
) -> Result<ProductDetail> {
    let graph = CompositionGraph::load(txn, limits).await?;
    graph.check_depth_through(parent_id)?;
    graph.check_costs_upward(parent_id)?;
    product_detail(&graph, parent_id)
}

/// Removes the edge `parent -> component`.
pub async fn remove_component(
    db: &DatabaseConnection,
    lock: &GraphWriteLock,
    parent_id: i64,
    component_id: i64,
) -> Result<()> {
    let _guard = lock.acquire().await;

    let result = Component::delete_many()
        .filter(component::Column::ParentProductId.eq(parent_id))
        .filter(component::Column::ComponentProductId.eq(component_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::ComponentNotFound {
            parent_id,
            component_id,
        });
    }

    info!(
        "Removed component {} from product {}",
        component_id, parent_id
    );
    Ok(())
}

/// Materials cost of a single product.
pub async fn compute_materials_cost(
    db: &DatabaseConnection,
    product_id: i64,
    limits: GraphConfig,
) -> Result<Decimal> {
    let graph = CompositionGraph::load(db, limits).await?;
    graph.valuator().materials_cost(product_id)
}

/// Idiot index of a single product; `None` when its materials cost is zero.
pub async fn compute_idiot_index(
    db: &DatabaseConnection,
    product_id: i64,
    limits: GraphConfig,
) -> Result<Option<Decimal>> {
    let graph = CompositionGraph::load(db, limits).await?;
    graph.valuator().idiot_index(product_id)
}

/// Every product with its derived values, ordered by name.
pub async fn list_product_valuations(
    db: &DatabaseConnection,
    limits: GraphConfig,
) -> Result<Vec<ProductValuation>> {
    let graph = CompositionGraph::load(db, limits).await?;
    let mut valuator = graph.valuator();

    let mut products: Vec<&product::Model> = graph.products().collect();
    products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

    products
        .into_iter()
        .map(|product| value_product(&graph, &mut valuator, product.id))
        .collect()
}

/// One product with derived values and its direct components.
pub async fn get_product_detail(
    db: &DatabaseConnection,
    product_id: i64,
    limits: GraphConfig,
) -> Result<ProductDetail> {
    let graph = CompositionGraph::load(db, limits).await?;
    product_detail(&graph, product_id)
}

/// Direct components of a product.
pub async fn list_components(
    db: &DatabaseConnection,
    product_id: i64,
    limits: GraphConfig,
) -> Result<Vec<ComponentLine>> {
    let graph = CompositionGraph::load(db, limits).await?;
    graph.product(product_id)?;
    component_lines(&graph, &mut graph.valuator(), product_id)
}

/// Full component tree of a product.
pub async fn build_component_tree(
    db: &DatabaseConnection,
    product_id: i64,
    limits: GraphConfig,
) -> Result<ComponentTreeNode> {
    let graph = CompositionGraph::load(db, limits).await?;
    graph.valuator().component_tree(product_id)
}

/// Products that use `product_id` as a direct component, ordered by parent name.
pub async fn list_usages(
    db: &DatabaseConnection,
    product_id: i64,
    limits: GraphConfig,
) -> Result<Vec<UsageRecord>> {
    let graph = CompositionGraph::load(db, limits).await?;
    graph.product(product_id)?;
    let mut valuator = graph.valuator();

    let mut usages = Vec::new();
    for edge in graph.usages_of(product_id) {
        let parent = graph.product(edge.parent_product_id).map_err(|_| {
            Error::GraphCorrupted {
                message: format!(
                    "product {product_id} is used by missing product {}",
                    edge.parent_product_id
                ),
            }
        })?;
        usages.push(UsageRecord {
            parent_id: parent.id,
            parent_name: parent.name.clone(),
            quantity: edge.quantity(),
            unit: edge.unit.clone(),
            parent_idiot_index: valuator.idiot_index(parent.id)?,
        });
    }
    usages.sort_by(|a, b| {
        a.parent_name
            .cmp(&b.parent_name)
            .then(a.parent_id.cmp(&b.parent_id))
    });
    Ok(usages)
}

fn product_detail(graph: &CompositionGraph, product_id: i64) -> Result<ProductDetail> {
    let mut valuator = graph.valuator();
    let valuation = value_product(graph, &mut valuator, product_id)?;
    let components = component_lines(graph, &mut valuator, product_id)?;
    Ok(ProductDetail {
        valuation,
        components,
    })
}

fn value_product(
    graph: &CompositionGraph,
    valuator: &mut Valuator<'_>,
    product_id: i64,
) -> Result<ProductValuation> {
    let product = graph.product(product_id)?;
    let materials_cost = valuator.materials_cost(product_id)?;
    Ok(ProductValuation {
        product: product.clone(),
        materials_cost,
        idiot_index: pricing::idiot_index(product.retail_price(), materials_cost),
        is_raw_material: graph.is_raw_material(product_id),
    })
}

fn component_lines(
    graph: &CompositionGraph,
    valuator: &mut Valuator<'_>,
    product_id: i64,
) -> Result<Vec<ComponentLine>> {
    graph
        .components_of(product_id)
        .map(|edge| {
            let component = graph.product(edge.component_product_id)?;
            let materials_cost = valuator.materials_cost(component.id)?;
            let quantity = edge.quantity();
            let line_cost = materials_cost
                .checked_mul(quantity)
                .ok_or(Error::CostOverflow { product_id })?;
            Ok(ComponentLine {
                component: component.clone(),
                quantity,
                unit: edge.unit.clone(),
                materials_cost,
                line_cost,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn limits() -> GraphConfig {
        GraphConfig::default()
    }

    #[tokio::test]
    async fn test_add_component_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let lock = GraphWriteLock::default();

        let result = add_component(
            &db,
            &lock,
            NewComponent {
                parent_id: 1,
                component_id: 2,
                quantity: dec!(0),
                unit: "kg".to_string(),
            },
            limits(),
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::InvalidArgument {
                field: "quantity",
                ..
            })
        ));

        let result = add_component(
            &db,
            &lock,
            NewComponent {
                parent_id: 1,
                component_id: 2,
                quantity: dec!(1),
                unit: "  ".to_string(),
            },
            limits(),
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::InvalidArgument { field: "unit", .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_composite_cost_example() -> Result<()> {
        let example = setup_composite_example().await?;

        let cost = compute_materials_cost(&example.db, example.p.id, limits()).await?;
        assert_eq!(cost, dec!(16.00));

        let index = compute_idiot_index(&example.db, example.p.id, limits()).await?;
        assert_eq!(index, Some(dec!(2.0)));

        // Leaves cost their own retail price
        let leaf_cost = compute_materials_cost(&example.db, example.a.id, limits()).await?;
        assert_eq!(leaf_cost, dec!(5.00));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_component_returns_materialized_parent() -> Result<()> {
        let db = setup_test_db().await?;
        let lock = GraphWriteLock::default();
        let table = create_test_product(&db, "Table", dec!(100)).await?;
        let leg = create_test_product(&db, "Leg", dec!(7.50)).await?;

        let detail = add_component(
            &db,
            &lock,
            NewComponent {
                parent_id: table.id,
                component_id: leg.id,
                quantity: dec!(4),
                unit: " unit ".to_string(),
            },
            limits(),
        )
        .await?;

        assert_eq!(detail.valuation.product.id, table.id);
        assert_eq!(detail.valuation.materials_cost, dec!(30.00));
        assert!(!detail.valuation.is_raw_material);
        assert_eq!(detail.components.len(), 1);
        assert_eq!(detail.components[0].component.id, leg.id);
        assert_eq!(detail.components[0].unit, "unit");
        assert_eq!(detail.components[0].line_cost, dec!(30.00));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_component_missing_products() -> Result<()> {
        let db = setup_test_db().await?;
        let lock = GraphWriteLock::default();
        let chair = create_test_product(&db, "Chair", dec!(10)).await?;

        let result = link_products(&db, &lock, chair.id, 404, dec!(1)).await;
        assert!(matches!(result, Err(Error::ProductNotFound { id: 404 })));

        let result = link_products(&db, &lock, 405, chair.id, dec!(1)).await;
        assert!(matches!(result, Err(Error::ProductNotFound { id: 405 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_self_loop_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let lock = GraphWriteLock::default();
        let widget = create_test_product(&db, "Widget", dec!(3)).await?;

        let result = link_products(&db, &lock, widget.id, widget.id, dec!(1)).await;
        assert!(matches!(result, Err(Error::CycleDetected { .. })));
        assert!(Component::find().all(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_transitive_cycle_rejected_and_nothing_written() -> Result<()> {
        let db = setup_test_db().await?;
        let lock = GraphWriteLock::default();
        let a = create_test_product(&db, "A", dec!(1)).await?;
        let b = create_test_product(&db, "B", dec!(1)).await?;
        let c = create_test_product(&db, "C", dec!(1)).await?;

        link_products(&db, &lock, a.id, b.id, dec!(1)).await?;
        link_products(&db, &lock, b.id, c.id, dec!(1)).await?;
        let before = Component::find().all(&db).await?;

        let result = link_products(&db, &lock, c.id, a.id, dec!(1)).await;
        assert!(matches!(
            result,
            Err(Error::CycleDetected {
                parent_id,
                component_id,
            }) if parent_id == c.id && component_id == a.id
        ));
        assert_eq!(Component::find().all(&db).await?, before);

        // Forward shortcut is still fine
        link_products(&db, &lock, a.id, c.id, dec!(2)).await?;
        assert_eq!(
            compute_materials_cost(&db, a.id, limits()).await?,
            dec!(3.00)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_component_rejected() -> Result<()> {
        let example = setup_composite_example().await?;
        let lock = GraphWriteLock::default();

        let result = link_products(&example.db, &lock, example.p.id, example.a.id, dec!(9)).await;
        assert!(matches!(result, Err(Error::DuplicateComponent { .. })));

        // Quantity unchanged
        let cost = compute_materials_cost(&example.db, example.p.id, limits()).await?;
        assert_eq!(cost, dec!(16.00));
        Ok(())
    }

    #[tokio::test]
    async fn test_component_tree_example() -> Result<()> {
        let example = setup_composite_example().await?;

        let tree = build_component_tree(&example.db, example.p.id, limits()).await?;
        assert_eq!(tree.product.id, example.p.id);
        assert!(tree.usage.is_none());
        assert_eq!(tree.children.len(), 2);

        let a_node = tree
            .children
            .iter()
            .find(|node| node.product.id == example.a.id)
            .unwrap();
        let usage = a_node.usage.as_ref().unwrap();
        assert_eq!(usage.quantity, dec!(2));
        assert_eq!(usage.unit, "unit");

        let b_node = tree
            .children
            .iter()
            .find(|node| node.product.id == example.b.id)
            .unwrap();
        assert_eq!(b_node.usage.as_ref().unwrap().quantity, dec!(3));
        assert!(tree.children.iter().all(|node| node.children.is_empty()));
        Ok(())
    }

    #[tokio::test]
    async fn test_reads_are_idempotent() -> Result<()> {
        let example = setup_composite_example().await?;

        let first_tree = build_component_tree(&example.db, example.p.id, limits()).await?;
        let second_tree = build_component_tree(&example.db, example.p.id, limits()).await?;
        assert_eq!(first_tree, second_tree);

        let first_cost = compute_materials_cost(&example.db, example.p.id, limits()).await?;
        let second_cost = compute_materials_cost(&example.db, example.p.id, limits()).await?;
        assert_eq!(first_cost, second_cost);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_usages() -> Result<()> {
        let example = setup_composite_example().await?;

        let usages = list_usages(&example.db, example.a.id, limits()).await?;
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].parent_id, example.p.id);
        assert_eq!(usages[0].parent_name, example.p.name);
        assert_eq!(usages[0].quantity, dec!(2));
        assert_eq!(usages[0].unit, "unit");
        assert_eq!(usages[0].parent_idiot_index, Some(dec!(2)));

        assert!(list_usages(&example.db, example.p.id, limits()).await?.is_empty());
        assert!(matches!(
            list_usages(&example.db, 999, limits()).await,
            Err(Error::ProductNotFound { id: 999 })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_component_makes_leaf_again() -> Result<()> {
        let db = setup_test_db().await?;
        let lock = GraphWriteLock::default();
        let kit = create_test_product(&db, "Kit", dec!(40)).await?;
        let part = create_test_product(&db, "Part", dec!(8)).await?;

        link_products(&db, &lock, kit.id, part.id, dec!(2)).await?;
        assert_eq!(
            compute_materials_cost(&db, kit.id, limits()).await?,
            dec!(16.00)
        );

        remove_component(&db, &lock, kit.id, part.id).await?;
        assert_eq!(
            compute_materials_cost(&db, kit.id, limits()).await?,
            dec!(40.00)
        );
        assert!(list_usages(&db, part.id, limits()).await?.is_empty());

        let result = remove_component(&db, &lock, kit.id, part.id).await;
        assert!(matches!(result, Err(Error::ComponentNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_cost_leaf_has_no_index() -> Result<()> {
        let db = setup_test_db().await?;
        let freebie = create_test_product(&db, "Free Sample", dec!(0)).await?;

        assert_eq!(
            compute_idiot_index(&db, freebie.id, limits()).await?,
            None
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_list_product_valuations() -> Result<()> {
        let example = setup_composite_example().await?;

        let valuations = list_product_valuations(&example.db, limits()).await?;
        let names: Vec<&str> = valuations
            .iter()
            .map(|v| v.product.name.as_str())
            .collect();
        assert_eq!(names, vec!["Material A", "Material B", "Product P"]);

        let p = valuations.last().unwrap();
        assert_eq!(p.materials_cost, dec!(16));
        assert_eq!(p.idiot_index, Some(dec!(2)));
        assert!(valuations[0].is_raw_material);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_components() -> Result<()> {
        let example = setup_composite_example().await?;

        let lines = list_components(&example.db, example.p.id, limits()).await?;
        let line_costs: Vec<Decimal> = lines.iter().map(|line| line.line_cost).collect();
        assert_eq!(line_costs, vec![dec!(10), dec!(6)]);
        assert!(list_components(&example.db, example.a.id, limits())
            .await?
            .is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_depth_limit_surfaces_as_error() -> Result<()> {
        let db = setup_test_db().await?;
        let lock = GraphWriteLock::default();
        let mut chain = Vec::new();
        for i in 0..5 {
            chain.push(create_test_product(&db, &format!("Level {i}"), dec!(1)).await?);
        }
        for pair in chain.windows(2) {
            link_products(&db, &lock, pair[0].id, pair[1].id, dec!(1)).await?;
        }

        let shallow = GraphConfig { max_depth: 2 };
        let result = compute_materials_cost(&db, chain[0].id, shallow).await;
        assert!(matches!(result, Err(Error::DepthExceeded { limit: 2 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_too_deep_edge_is_not_written() -> Result<()> {
        let db = setup_test_db().await?;
        let lock = GraphWriteLock::default();
        let shallow = GraphConfig { max_depth: 2 };
        let mut chain = Vec::new();
        for i in 0..4 {
            chain.push(create_test_product(&db, &format!("Level {i}"), dec!(1)).await?);
        }

        // Linked bottom-up, so only the last edge makes the chain too long
        for (parent, component) in [(&chain[2], &chain[3]), (&chain[1], &chain[2])] {
            let new_component = NewComponent {
                parent_id: parent.id,
                component_id: component.id,
                quantity: dec!(1),
                unit: "unit".to_string(),
            };
            add_component(&db, &lock, new_component, shallow).await?;
        }
        let before = Component::find().all(&db).await?;

        let result = add_component(
            &db,
            &lock,
            NewComponent {
                parent_id: chain[0].id,
                component_id: chain[1].id,
                quantity: dec!(1),
                unit: "unit".to_string(),
            },
            shallow,
        )
        .await;
        assert!(matches!(result, Err(Error::DepthExceeded { limit: 2 })));
        assert_eq!(Component::find().all(&db).await?, before);

        // The catalog stays readable under the same limit
        let valuations = list_product_valuations(&db, shallow).await?;
        assert_eq!(valuations.len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_overflowing_edge_is_not_written() -> Result<()> {
        let db = setup_test_db().await?;
        let lock = GraphWriteLock::default();
        let crate_box = create_test_product(&db, "Crate", dec!(1)).await?;
        let ingot = create_test_product(&db, "Ingot", dec!(90000000000000000.00)).await?;

        let result = link_products(
            &db,
            &lock,
            crate_box.id,
            ingot.id,
            dec!(90000000000000000),
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::CostOverflow { product_id }) if product_id == crate_box.id
        ));
        assert!(Component::find().all(&db).await?.is_empty());
        assert!(list_components(&db, crate_box.id, limits()).await?.is_empty());
        assert_eq!(
            compute_materials_cost(&db, crate_box.id, limits()).await?,
            dec!(1.00)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_overflow_in_ancestor_rejects_edge() -> Result<()> {
        let db = setup_test_db().await?;
        let lock = GraphWriteLock::default();
        let pallet = create_test_product(&db, "Pallet", dec!(1)).await?;
        let carton = create_test_product(&db, "Carton", dec!(1)).await?;
        let ingot = create_test_product(&db, "Ingot", dec!(90000000000000000.00)).await?;

        link_products(&db, &lock, pallet.id, carton.id, dec!(90000000000000000)).await?;
        let before = Component::find().all(&db).await?;

        // Carton itself can be valued, but the pallet holding it cannot
        let result = link_products(&db, &lock, carton.id, ingot.id, dec!(1)).await;
        assert!(matches!(
            result,
            Err(Error::CostOverflow { product_id }) if product_id == pallet.id
        ));
        assert_eq!(Component::find().all(&db).await?, before);
        assert_eq!(list_product_valuations(&db, limits()).await?.len(), 3);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_opposite_edges_keep_graph_acyclic() -> Result<()> {
        let db = setup_test_db().await?;
        let lock = GraphWriteLock::default();
        let a = create_test_product(&db, "A", dec!(1)).await?;
        let b = create_test_product(&db, "B", dec!(1)).await?;

        let (forward, backward) = tokio::join!(
            link_products(&db, &lock, a.id, b.id, dec!(1)),
            link_products(&db, &lock, b.id, a.id, dec!(1)),
        );

        let outcomes = [forward, backward];
        assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|outcome| matches!(outcome, Err(Error::CycleDetected { .. })))
                .count(),
            1
        );

        let edges = Component::find().all(&db).await?;
        assert_eq!(edges.len(), 1);
        let graph = CompositionGraph::load(&db, limits()).await?;
        assert!(!graph.descendants(a.id).contains(&a.id));
        assert!(!graph.descendants(b.id).contains(&b.id));
        Ok(())
    }
}
