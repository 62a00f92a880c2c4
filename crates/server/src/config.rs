use std::env;
use std::time::Duration;

use analysis::{AnalysisError, AnalyzerConfig, Strength};
use chess_core::openings::BOOK_FILE_PATH;
use chess_core::puzzles::PUZZLE_FILE_PATH;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub stockfish_path: String,
    /// Defaults to one engine per CPU
    pub engine_pool_size: Option<usize>,
    pub engine_grace: Duration,
    pub default_strength: Strength,
    pub opening_book_path: String,
    pub puzzle_book_path: String,
    /// Seeds narration and game ids; entropy when unset
    pub narration_seed: Option<u64>,
    pub analyzer: AnalyzerConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, AnalysisError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            stockfish_path: env::var("STOCKFISH_PATH")
                .unwrap_or_else(|_| "/usr/local/bin/stockfish".to_string()),
            engine_pool_size: env::var("ENGINE_POOL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok()),
            engine_grace: Duration::from_millis(
                env::var("ENGINE_GRACE_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1000),
            ),
            default_strength: Strength::clamped(
                env::var("DEFAULT_STRENGTH")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
            opening_book_path: env::var("OPENING_BOOK_PATH")
                .unwrap_or_else(|_| BOOK_FILE_PATH.to_string()),
            puzzle_book_path: env::var("PUZZLE_BOOK_PATH")
                .unwrap_or_else(|_| PUZZLE_FILE_PATH.to_string()),
            narration_seed: env::var("NARRATION_SEED")
                .ok()
                .and_then(|v| v.parse().ok()),
            analyzer: AnalyzerConfig::from_env()?,
        })
    }
}
