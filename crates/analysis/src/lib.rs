//! Engine client and position analysis.
//!
//! Scores are White-relative inside this crate; perspective conversion only
//! happens in [`analyzer::PositionAnalyzer::relative_score`].

pub mod analyzer;
pub mod config;
pub mod engine;
pub mod error;
pub mod pool;
pub mod stockfish;

pub use analyzer::{AnalysisResult, MateResult, MoveQuality, Outcome, PositionAnalyzer};
pub use config::AnalyzerConfig;
pub use engine::{Engine, MoveResult, Score, Strength};
pub use error::AnalysisError;
pub use pool::EnginePool;
pub use stockfish::StockfishEngine;
