//! Composition endpoints - component edges, trees and usages.

use crate::{
    api::{
        AppState,
        dto::{AddComponentRequest, ComponentTreeView, ProductDetailView, UsageView},
    },
    core::composition,
    errors::Result,
};
use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use tracing::info;

/// `POST /api/products/{id}/components` - adds a component to product `id`.
///
/// Responds with the parent product, including its recomputed materials cost.
pub async fn add_component(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<AddComponentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductDetailView>)> {
    let Path(id) = path?;
    let Json(request) = payload?;
    let new_component = request.into_new_component(id)?;
    let component_id = new_component.component_id;

    let detail = composition::add_component(
        &state.database,
        &state.graph_lock,
        new_component,
        state.limits,
    )
    .await?;

    info!("API added component {} to product {}", component_id, id);
    Ok((StatusCode::CREATED, Json(ProductDetailView::from(&detail))))
}

/// `DELETE /api/products/{id}/components/{component_id}` - removes one edge.
pub async fn remove_component(
    State(state): State<AppState>,
    path: std::result::Result<Path<(i64, i64)>, PathRejection>,
) -> Result<StatusCode> {
    let Path((id, component_id)) = path?;
    composition::remove_component(&state.database, &state.graph_lock, id, component_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/products/{id}/tree` - the full component tree.
pub async fn component_tree(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<ComponentTreeView>> {
    let Path(id) = path?;
    let tree = composition::build_component_tree(&state.database, id, state.limits).await?;
    Ok(Json(ComponentTreeView::from(&tree)))
}

/// `GET /api/products/{id}/usages` - products that use `id` directly.
pub async fn usages(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<UsageView>>> {
    let Path(id) = path?;
    let usages = composition::list_usages(&state.database, id, state.limits).await?;
    Ok(Json(usages.iter().map(UsageView::from).collect()))
}
