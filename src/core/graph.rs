//! Composition graph engine.
//!
//! The persisted `product_components` rows form a directed acyclic graph over product
//! ids. [`CompositionGraph`] loads that graph into adjacency maps in two queries and runs
//! every traversal in memory:
//!
//! - cycle checks compute the descendant closure of the candidate component and look
//!   for the candidate parent in it,
//! - materials cost is aggregated bottom-up with an explicit work stack,
//! - component trees are built by depth-bounded recursion.
//!
//! Each [`Valuator`] carries a memo of computed costs, valid for one request only.

use crate::{
    config::settings::GraphConfig,
    core::pricing,
    entities::{Component, Product, component, product},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, EntityTrait, QueryOrder};
use std::collections::{HashMap, HashSet};
use tracing::{debug, error};

/// In-memory snapshot of products and component edges.
#[derive(Debug, Clone)]
pub struct CompositionGraph {
    products: HashMap<i64, product::Model>,
    edges: Vec<component::Model>,
    outgoing: HashMap<i64, Vec<usize>>,
    incoming: HashMap<i64, Vec<usize>>,
    max_depth: usize,
}

impl CompositionGraph {
    /// Loads every product and edge visible to `db`.
    ///
    /// Pass a transaction to get a snapshot consistent with a pending write.
    pub async fn load<C>(db: &C, limits: GraphConfig) -> Result<Self>
    where
        C: ConnectionTrait,
    {
        let products = Product::find().all(db).await?;
        let edges = Component::find()
            .order_by_asc(component::Column::Id)
            .all(db)
            .await?;
        debug!(
            products = products.len(),
            edges = edges.len(),
            "Loaded composition graph"
        );
        Ok(Self::from_parts(products, edges, limits))
    }

    /// Builds a graph from already-fetched rows.
    #[must_use]
    pub fn from_parts(
        products: Vec<product::Model>,
        edges: Vec<component::Model>,
        limits: GraphConfig,
    ) -> Self {
        let mut outgoing: HashMap<i64, Vec<usize>> = HashMap::new();
        let mut incoming: HashMap<i64, Vec<usize>> = HashMap::new();
        for (index, edge) in edges.iter().enumerate() {
            outgoing
                .entry(edge.parent_product_id)
                .or_default()
                .push(index);
            incoming
                .entry(edge.component_product_id)
                .or_default()
                .push(index);
        }

        Self {
            products: products.into_iter().map(|p| (p.id, p)).collect(),
            edges,
            outgoing,
            incoming,
            max_depth: limits.max_depth,
        }
    }

    /// Looks up a product, failing with `ProductNotFound`.
    pub fn product(&self, id: i64) -> Result<&product::Model> {
        self.products
            .get(&id)
            .ok_or(Error::ProductNotFound { id })
    }

    /// All products in the snapshot, in no particular order.
    pub fn products(&self) -> impl Iterator<Item = &product::Model> {
        self.products.values()
    }

    /// Outgoing edges of `id`, in insertion order.
    pub fn components_of(&self, id: i64) -> impl Iterator<Item = &component::Model> {
        self.outgoing
            .get(&id)
            .into_iter()
            .flatten()
            .map(|&index| &self.edges[index])
    }

    /// Incoming edges of `id`, in insertion order.
    pub fn usages_of(&self, id: i64) -> impl Iterator<Item = &component::Model> {
        self.incoming
            .get(&id)
            .into_iter()
            .flatten()
            .map(|&index| &self.edges[index])
    }

    /// The edge `parent -> component`, if present.
    pub fn edge(&self, parent_id: i64, component_id: i64) -> Option<&component::Model> {
        self.components_of(parent_id)
            .find(|edge| edge.component_product_id == component_id)
    }

    /// True when `id` has no outgoing edges.
    #[must_use]
    pub fn is_raw_material(&self, id: i64) -> bool {
        self.outgoing.get(&id).is_none_or(Vec::is_empty)
    }

    /// Every product reachable from `id` by following component edges, excluding `id`
    /// itself unless it lies on a cycle.
    #[must_use]
    pub fn descendants(&self, id: i64) -> HashSet<i64> {
        self.closure(id, |current| self.component_ids(current))
    }

    /// Every product that contains `id`, directly or transitively.
    #[must_use]
    pub fn ancestors(&self, id: i64) -> HashSet<i64> {
        self.closure(id, |current| self.parent_ids(current))
    }

    fn closure<F>(&self, id: i64, neighbors: F) -> HashSet<i64>
    where
        F: Fn(i64) -> Vec<i64>,
    {
        let mut visited = HashSet::new();
        let mut stack = neighbors(id);

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            stack.extend(
                neighbors(current)
                    .into_iter()
                    .filter(|next| !visited.contains(next)),
            );
        }
        visited
    }

    fn component_ids(&self, id: i64) -> Vec<i64> {
        self.components_of(id)
            .map(|edge| edge.component_product_id)
            .collect()
    }

    fn parent_ids(&self, id: i64) -> Vec<i64> {
        self.usages_of(id).map(|edge| edge.parent_product_id).collect()
    }

    /// Number of edges on the longest component chain below `id`.
    pub fn height(&self, id: i64) -> Result<usize> {
        self.longest_chain(id, |current| self.component_ids(current))
    }

    /// Number of edges on the longest chain of parents above `id`.
    pub fn reach(&self, id: i64) -> Result<usize> {
        self.longest_chain(id, |current| self.parent_ids(current))
    }

    fn longest_chain<F>(&self, id: i64, neighbors: F) -> Result<usize>
    where
        F: Fn(i64) -> Vec<i64>,
    {
        let mut lengths: HashMap<i64, usize> = HashMap::new();
        let mut on_path: HashSet<i64> = HashSet::new();
        let mut stack: Vec<(i64, bool)> = vec![(id, false)];

        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                let length = neighbors(current)
                    .iter()
                    .filter_map(|next| lengths.get(next))
                    .map(|length| length + 1)
                    .max()
                    .unwrap_or(0);
                on_path.remove(&current);
                lengths.insert(current, length);
                continue;
            }
            if lengths.contains_key(&current) {
                continue;
            }
            on_path.insert(current);
            stack.push((current, true));
            for next in neighbors(current) {
                if on_path.contains(&next) {
                    return Err(Self::corrupted(format!(
                        "cycle through products {current} and {next}"
                    )));
                }
                if !lengths.contains_key(&next) {
                    stack.push((next, false));
                }
            }
        }

        lengths
            .get(&id)
            .copied()
            .ok_or_else(|| Self::corrupted(format!("no chain length computed for {id}")))
    }

    /// Fails with `DepthExceeded` when some chain through `id` is longer than the limit.
    pub fn check_depth_through(&self, id: i64) -> Result<()> {
        self.product(id)?;
        let longest = self.reach(id)? + self.height(id)?;
        if longest > self.max_depth {
            debug!(
                product = id,
                longest, "Component chain exceeds the depth limit"
            );
            return Err(Error::DepthExceeded {
                limit: self.max_depth,
            });
        }
        Ok(())
    }

    /// Values `id` and every product that contains it, surfacing `CostOverflow`.
    pub fn check_costs_upward(&self, id: i64) -> Result<()> {
        let mut valuator = self.valuator();
        valuator.materials_cost(id)?;
        for ancestor in self.ancestors(id) {
            valuator.materials_cost(ancestor)?;
        }
        Ok(())
    }

    /// Whether adding `parent -> component` would close a cycle.
    ///
    /// True for self-loops and whenever `parent` is already a transitive component of
    /// `component`.
    #[must_use]
    pub fn would_create_cycle(&self, parent_id: i64, component_id: i64) -> bool {
        parent_id == component_id || self.descendants(component_id).contains(&parent_id)
    }

    /// Starts a request-scoped valuation over this snapshot.
    #[must_use]
    pub fn valuator(&self) -> Valuator<'_> {
        Valuator {
            graph: self,
            costs: HashMap::new(),
        }
    }

    fn corrupted(message: String) -> Error {
        error!("Composition graph invariant violated: {}", message);
        Error::GraphCorrupted { message }
    }

    fn component_product(&self, edge: &component::Model) -> Result<&product::Model> {
        self.products.get(&edge.component_product_id).ok_or_else(|| {
            Self::corrupted(format!(
                "product {} lists missing component {}",
                edge.parent_product_id, edge.component_product_id
            ))
        })
    }
}

/// One node of a component tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentTreeNode {
    /// The product at this node
    pub product: product::Model,
    /// Aggregated materials cost, full precision
    pub materials_cost: Decimal,
    /// Retail price over materials cost, if defined
    pub idiot_index: Option<Decimal>,
    /// Quantity and unit as seen from the parent; `None` at the root
    pub usage: Option<EdgeUsage>,
    /// `materials_cost * quantity`; `None` at the root
    pub line_cost: Option<Decimal>,
    /// Direct components, in insertion order
    pub children: Vec<ComponentTreeNode>,
}

/// Quantity and unit of an edge as seen from its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeUsage {
    /// Units of the component per parent
    pub quantity: Decimal,
    /// Unit label
    pub unit: String,
}

impl EdgeUsage {
    fn of(edge: &component::Model) -> Self {
        Self {
            quantity: edge.quantity(),
            unit: edge.unit.clone(),
        }
    }
}

/// Computes derived values over a [`CompositionGraph`], memoizing costs.
#[derive(Debug)]
pub struct Valuator<'g> {
    graph: &'g CompositionGraph,
    costs: HashMap<i64, Decimal>,
}

impl Valuator<'_> {
    /// Materials cost of `id`: its retail price when it has no components, otherwise the
    /// quantity-weighted sum of its components' materials costs.
    ///
    /// Runs post-order over an explicit stack. A node met again while still on the
    /// current path means the stored graph has a cycle, reported as `GraphCorrupted`.
    pub fn materials_cost(&mut self, id: i64) -> Result<Decimal> {
        if let Some(cost) = self.costs.get(&id) {
            return Ok(*cost);
        }
        self.graph.product(id)?;

        let graph = self.graph;
        let mut on_path: HashSet<i64> = HashSet::new();
        // (product, depth, children already pushed)
        let mut stack: Vec<(i64, usize, bool)> = vec![(id, 0, false)];

        while let Some((current, depth, expanded)) = stack.pop() {
            if expanded {
                let cost = self.aggregate(current)?;
                on_path.remove(&current);
                self.costs.insert(current, cost);
                continue;
            }
            if self.costs.contains_key(&current) {
                continue;
            }
            if depth > graph.max_depth {
                return Err(Error::DepthExceeded {
                    limit: graph.max_depth,
                });
            }
            if !on_path.insert(current) {
                return Err(CompositionGraph::corrupted(format!(
                    "product {current} is its own component"
                )));
            }

            stack.push((current, depth, true));
            for edge in graph.components_of(current) {
                graph.component_product(edge)?;
                let next = edge.component_product_id;
                if on_path.contains(&next) {
                    return Err(CompositionGraph::corrupted(format!(
                        "cycle through products {current} and {next}"
                    )));
                }
                if !self.costs.contains_key(&next) {
                    stack.push((next, depth + 1, false));
                }
            }
        }

        self.costs
            .get(&id)
            .copied()
            .ok_or_else(|| CompositionGraph::corrupted(format!("no cost computed for {id}")))
    }

    /// Idiot index of `id`; `None` when the materials cost is zero.
    pub fn idiot_index(&mut self, id: i64) -> Result<Option<Decimal>> {
        let graph = self.graph;
        let cost = self.materials_cost(id)?;
        let retail = graph.product(id)?.retail_price();
        Ok(pricing::idiot_index(retail, cost))
    }

    /// Builds the full component tree rooted at `id`.
    pub fn component_tree(&mut self, id: i64) -> Result<ComponentTreeNode> {
        let graph = self.graph;
        let root = graph.product(id)?;
        let mut path = HashSet::new();
        self.tree_node(root, None, 0, &mut path)
    }

    fn tree_node(
        &mut self,
        product: &product::Model,
        usage: Option<EdgeUsage>,
        depth: usize,
        path: &mut HashSet<i64>,
    ) -> Result<ComponentTreeNode> {
        let graph = self.graph;
        if depth > graph.max_depth {
            return Err(Error::DepthExceeded {
                limit: graph.max_depth,
            });
        }
        if !path.insert(product.id) {
            return Err(CompositionGraph::corrupted(format!(
                "product {} revisited while building its own tree",
                product.id
            )));
        }

        let materials_cost = self.materials_cost(product.id)?;
        let line_cost = usage
            .as_ref()
            .map(|usage| {
                materials_cost
                    .checked_mul(usage.quantity)
                    .ok_or(Error::CostOverflow {
                        product_id: product.id,
                    })
            })
            .transpose()?;
        let mut children = Vec::new();
        for edge in graph.components_of(product.id) {
            let child = graph.component_product(edge)?;
            children.push(self.tree_node(child, Some(EdgeUsage::of(edge)), depth + 1, path)?);
        }
        path.remove(&product.id);

        Ok(ComponentTreeNode {
            product: product.clone(),
            materials_cost,
            idiot_index: pricing::idiot_index(product.retail_price(), materials_cost),
            usage,
            line_cost,
            children,
        })
    }

    fn aggregate(&self, id: i64) -> Result<Decimal> {
        let graph = self.graph;
        let product = graph.product(id)?;
        if graph.is_raw_material(id) {
            return Ok(product.retail_price());
        }

        let mut total = Decimal::ZERO;
        for edge in graph.components_of(id) {
            let component_cost = self.costs.get(&edge.component_product_id).ok_or_else(|| {
                CompositionGraph::corrupted(format!(
                    "component {} of {id} was not valued",
                    edge.component_product_id
                ))
            })?;
            total = component_cost
                .checked_mul(edge.quantity())
                .and_then(|line| total.checked_add(line))
                .ok_or(Error::CostOverflow { product_id: id })?;
        }
        Ok(total.normalize())
    }
}
