use axum::{extract::Path, Extension, Json};
use serde::Deserialize;

use analysis::Strength;

use crate::config::Config;
use crate::error::AppError;
use crate::routes::Store;
use crate::session::GameSnapshot;

#[derive(Deserialize)]
pub struct PlayerBody {
    #[serde(default)]
    pub player_name: String,
}

#[derive(Deserialize)]
pub struct CreateBody {
    #[serde(default)]
    pub player_name: String,
    /// Starting position; the standard initial position when absent
    pub fen: Option<String>,
}

fn default_descriptions() -> bool {
    true
}

#[derive(Deserialize)]
pub struct MoveBody {
    #[serde(rename = "move")]
    pub uci: String,
    #[serde(default = "default_descriptions")]
    pub descriptions: bool,
}

#[derive(Deserialize)]
pub struct EngineMoveBody {
    pub strength: Option<i64>,
    #[serde(default = "default_descriptions")]
    pub descriptions: bool,
}

#[derive(Deserialize)]
pub struct DrawAnswerBody {
    pub accept: bool,
}

#[derive(Deserialize)]
pub struct MessageBody {
    pub player: String,
    pub message: String,
}

/// POST /api/games
pub async fn create_game(
    Extension(store): Extension<Store>,
    Json(body): Json<CreateBody>,
) -> Result<Json<GameSnapshot>, AppError> {
    let snapshot = match body.fen.as_deref() {
        Some(fen) => store.create_game_from(&body.player_name, fen).await?,
        None => store.create_game(&body.player_name).await,
    };
    Ok(Json(snapshot))
}

/// GET /api/games/{game_id}
pub async fn poll_game(
    Extension(store): Extension<Store>,
    Path(game_id): Path<String>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(store.poll(&game_id).await?))
}

/// POST /api/games/{game_id}/join
pub async fn join_game(
    Extension(store): Extension<Store>,
    Path(game_id): Path<String>,
    Json(body): Json<PlayerBody>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(store.join_game(&game_id, &body.player_name).await?))
}

/// POST /api/games/{game_id}/moves
pub async fn play_move(
    Extension(store): Extension<Store>,
    Path(game_id): Path<String>,
    Json(body): Json<MoveBody>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(store.play_move(&game_id, &body.uci, body.descriptions).await?))
}

/// POST /api/games/{game_id}/engine-move
/// Out-of-range strengths play at full strength.
pub async fn play_engine_move(
    Extension(store): Extension<Store>,
    Extension(config): Extension<Config>,
    Path(game_id): Path<String>,
    Json(body): Json<EngineMoveBody>,
) -> Result<Json<GameSnapshot>, AppError> {
    let strength = body
        .strength
        .map(Strength::clamped)
        .unwrap_or(config.default_strength);
    Ok(Json(
        store
            .play_engine_move(&game_id, strength, body.descriptions)
            .await?,
    ))
}

/// POST /api/games/{game_id}/draw/offer
pub async fn offer_draw(
    Extension(store): Extension<Store>,
    Path(game_id): Path<String>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(store.offer_draw(&game_id).await?))
}

/// POST /api/games/{game_id}/draw/answer
pub async fn answer_draw(
    Extension(store): Extension<Store>,
    Path(game_id): Path<String>,
    Json(body): Json<DrawAnswerBody>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(store.answer_draw(&game_id, body.accept).await?))
}

/// POST /api/games/{game_id}/draw/reset
pub async fn reset_draw(
    Extension(store): Extension<Store>,
    Path(game_id): Path<String>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(store.reset_draw(&game_id).await?))
}

/// POST /api/games/{game_id}/retire
pub async fn retire(
    Extension(store): Extension<Store>,
    Path(game_id): Path<String>,
    Json(body): Json<PlayerBody>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(store.retire(&game_id, &body.player_name).await?))
}

/// POST /api/games/{game_id}/messages
pub async fn post_message(
    Extension(store): Extension<Store>,
    Path(game_id): Path<String>,
    Json(body): Json<MessageBody>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(
        store
            .post_message(&game_id, &body.player, &body.message)
            .await?,
    ))
}
