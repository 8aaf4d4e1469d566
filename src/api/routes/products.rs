//! Product catalog endpoints.

use crate::{
    api::{
        AppState,
        dto::{CreateProductRequest, ProductDetailView, ProductView, UpdateProductRequest},
    },
    core::{composition, product},
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

/// `GET /api/products` - every product with derived values, by name.
pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<ProductView>>> {
    let valuations = composition::list_product_valuations(&state.database, state.limits).await?;
    Ok(Json(valuations.iter().map(ProductView::from).collect()))
}

/// `POST /api/products` - creates a raw product.
pub async fn create_product(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductDetailView>)> {
    let Json(request) = payload?;
    let (name, retail_price, description, url) = request.into_parts()?;

    let created =
        product::create_product(&state.database, name, retail_price, description, url).await?;
    let detail = composition::get_product_detail(&state.database, created.id, state.limits).await?;

    info!("API created product {}", created.id);
    Ok((StatusCode::CREATED, Json(ProductDetailView::from(&detail))))
}

/// `GET /api/products/{id}` - one product with derived values and direct components.
pub async fn get_product(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<ProductDetailView>> {
    let Path(id) = path?;
    let detail = composition::get_product_detail(&state.database, id, state.limits).await?;
    Ok(Json(ProductDetailView::from(&detail)))
}

/// `PUT /api/products/{id}` - edits name, price, description or URL.
pub async fn update_product(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<ProductDetailView>> {
    let Path(id) = path?;
    let Json(request) = payload?;
    product::update_product(
        &state.database,
        &state.graph_lock,
        id,
        request.into(),
        state.limits,
    )
    .await?;
    let detail = composition::get_product_detail(&state.database, id, state.limits).await?;
    Ok(Json(ProductDetailView::from(&detail)))
}

/// `DELETE /api/products/{id}` - deletes a product that no other product uses.
pub async fn delete_product(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<StatusCode> {
    let Path(id) = path?;
    let deleted = product::delete_product(&state.database, &state.graph_lock, id).await?;
    info!("API deleted product {} ({})", deleted.id, deleted.name);
    Ok(StatusCode::NO_CONTENT)
}
