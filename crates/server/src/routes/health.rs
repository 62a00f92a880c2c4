use axum::{Extension, Json};
use serde_json::{json, Value as JsonValue};

use crate::routes::Store;

/// GET /health
pub async fn health_check(Extension(store): Extension<Store>) -> Json<JsonValue> {
    Json(json!({
        "status": "ok",
        "games": store.len().await,
    }))
}
