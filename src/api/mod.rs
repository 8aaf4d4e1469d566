//! HTTP interface - axum router, shared state, request and response bodies.
//!
//! Handlers stay thin: they extract input, call into [`crate::core`] and convert the
//! result into a response view. All domain rules live in the core.

/// Request and response bodies
pub mod dto;

/// HTTP mapping for domain errors
pub mod error;

/// Route handlers grouped by resource
pub mod routes;

use crate::{config::settings::GraphConfig, core::composition::GraphWriteLock};
use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub database: Arc<DatabaseConnection>,
    /// Serializes composition graph mutations
    pub graph_lock: GraphWriteLock,
    /// Traversal limits for cost and tree computations
    pub limits: GraphConfig,
}

impl AppState {
    /// Creates state with a fresh graph write lock.
    #[must_use]
    pub fn new(database: DatabaseConnection, limits: GraphConfig) -> Self {
        Self {
            database: Arc::new(database),
            graph_lock: GraphWriteLock::default(),
            limits,
        }
    }
}

/// Builds the application router with every route nested under `/api`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
