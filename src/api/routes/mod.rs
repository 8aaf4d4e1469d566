//! HTTP route handlers organized by resource.

/// Health probe
pub mod general;

/// Component edges, trees and usages
pub mod components;

/// Product catalog endpoints
pub mod products;

use super::AppState;
use axum::{
    Router,
    routing::{delete, get, post},
};

/// All `/api` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(general::health))
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/products/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/products/:id/components", post(components::add_component))
        .route(
            "/products/:id/components/:component_id",
            delete(components::remove_component),
        )
        .route("/products/:id/tree", get(components::component_tree))
        .route("/products/:id/usages", get(components::usages))
}
