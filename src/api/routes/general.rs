//! General endpoints that don't touch the database.

use axum::Json;
use serde_json::{Value, json};

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
