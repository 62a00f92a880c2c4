use std::sync::Arc;

use axum::{extract::Path, Extension, Json};
use serde::Serialize;

use chess_core::puzzles::{MateInN, PuzzleBook, SingleMovePuzzle};

use crate::error::AppError;

#[derive(Serialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: usize,
}

/// GET /api/puzzles/single-move/{type}
/// A random single-move puzzle of the given type.
pub async fn single_move_puzzle(
    Extension(puzzles): Extension<Arc<PuzzleBook>>,
    Path(kind): Path<String>,
) -> Result<Json<SingleMovePuzzle>, AppError> {
    puzzles
        .random_single_move(&kind, &mut rand::thread_rng())
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No single-move puzzles of type {kind}")))
}

/// GET /api/puzzles/mate-in/{n}
/// A random forced mate in `n` moves.
pub async fn mate_in_n_puzzle(
    Extension(puzzles): Extension<Arc<PuzzleBook>>,
    Path(n): Path<u32>,
) -> Result<Json<MateInN>, AppError> {
    puzzles
        .random_mate_in(n, &mut rand::thread_rng())
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No mate-in-{n} puzzles")))
}

/// GET /api/puzzles/types
/// Single-move puzzle types with their counts, rarest first.
pub async fn puzzle_types(Extension(puzzles): Extension<Arc<PuzzleBook>>) -> Json<Vec<TypeCount>> {
    Json(
        puzzles
            .type_counts()
            .into_iter()
            .map(|(kind, count)| TypeCount {
                kind: kind.to_string(),
                count,
            })
            .collect(),
    )
}
