use thiserror::Error;

use analysis::AnalysisError;
use chess_core::BoardError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("game_id: {0} does not exist.")]
    NotFound(String),

    #[error("game_id: {0} is full.")]
    Full(String),

    #[error("game_id: {0} is over.")]
    GameOver(String),

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    Engine(#[from] AnalysisError),
}
