use std::sync::Arc;

use axum::{extract::Query, Extension, Json};
use serde::{Deserialize, Serialize};

use chess_core::openings::{Opening, OpeningBook};

#[derive(Deserialize)]
pub struct OpeningQuery {
    /// Comma-separated UCI move stack
    #[serde(default)]
    pub moves: String,
}

#[derive(Serialize)]
pub struct OpeningResponse {
    pub opening: Option<Opening>,
    pub continuations: Vec<Opening>,
}

/// GET /api/openings?moves=e2e4,c7c5
/// Opening reached by a move stack and the openings one move further.
pub async fn lookup_opening(
    Extension(book): Extension<Arc<OpeningBook>>,
    Query(q): Query<OpeningQuery>,
) -> Json<OpeningResponse> {
    let stack: Vec<&str> = q.moves.split(',').filter(|m| !m.is_empty()).collect();
    Json(OpeningResponse {
        opening: book.lookup(stack.as_slice()).cloned(),
        continuations: book.continuations(stack.as_slice()).into_iter().cloned().collect(),
    })
}
