use axum::{Extension, Json};
use serde::Deserialize;

use analysis::Strength;

use crate::config::Config;
use crate::error::AppError;
use crate::routes::Store;
use crate::session::EnginePlay;

#[derive(Deserialize)]
pub struct EnginePlayBody {
    pub fen: String,
    pub strength: Option<i64>,
}

/// POST /api/engine/play
/// Engine reply to a position, outside any game.
pub async fn engine_play(
    Extension(store): Extension<Store>,
    Extension(config): Extension<Config>,
    Json(body): Json<EnginePlayBody>,
) -> Result<Json<EnginePlay>, AppError> {
    let strength = body
        .strength
        .map(Strength::clamped)
        .unwrap_or(config.default_strength);
    Ok(Json(store.engine_play(&body.fen, strength).await?))
}
