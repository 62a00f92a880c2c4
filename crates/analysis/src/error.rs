//! Analysis error types

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stockfish error: {0}")]
    Stockfish(String),

    #[error("Engine did not answer within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Board(#[from] chess_core::BoardError),
}

impl AnalysisError {
    /// True when the engine process itself failed, as opposed to bad input.
    pub fn is_engine_failure(&self) -> bool {
        matches!(self, AnalysisError::Stockfish(_) | AnalysisError::Timeout(_))
    }
}
