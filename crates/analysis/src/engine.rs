//! Engine seam: the UCI process in production, scripted engines in tests.
//!
//! One engine instance serves one caller at a time; share it through
//! [`crate::pool::EnginePool`].

use std::time::Duration;

use async_trait::async_trait;
use shakmaty::Color;

use crate::error::AnalysisError;

pub const MIN_STRENGTH: u8 = 1;
pub const MAX_STRENGTH: u8 = 10;

/// Playing strength on the 1..=10 scale players choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strength(u8);

impl Strength {
    pub const MAX: Strength = Strength(MAX_STRENGTH);

    pub fn new(value: i64) -> Result<Self, AnalysisError> {
        if (MIN_STRENGTH as i64..=MAX_STRENGTH as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(AnalysisError::Config(format!(
                "Expected strength in range {MIN_STRENGTH}-{MAX_STRENGTH} but was {value}"
            )))
        }
    }

    /// Out-of-range values play at full strength instead of failing the game.
    pub fn clamped(value: i64) -> Self {
        Self::new(value).unwrap_or(Self::MAX)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Stockfish `Skill Level` (0-20).
    pub fn native(self) -> u8 {
        self.0 * 2
    }
}

impl Default for Strength {
    fn default() -> Self {
        Self::MAX
    }
}

/// Engine evaluation relative to one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    /// Centipawns
    Cp(i32),
    /// Mate in N; positive when the side the score is relative to delivers it
    Mate(i32),
}

impl Score {
    pub fn flip(self) -> Self {
        match self {
            Score::Cp(cp) => Score::Cp(-cp),
            Score::Mate(n) => Score::Mate(-n),
        }
    }

    /// Re-express a score reported for `side_to_move` relative to `perspective`.
    pub fn relative_to(self, side_to_move: Color, perspective: Color) -> Self {
        if side_to_move == perspective {
            self
        } else {
            self.flip()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveResult {
    /// Best move in UCI notation; absent when the position has no legal move
    pub best_move: Option<String>,
    /// Reply the engine expects after `best_move`
    pub ponder: Option<String>,
}

#[async_trait]
pub trait Engine: Send {
    /// Reconfigure playing strength without restarting the process.
    async fn configure(&mut self, strength: Strength) -> Result<(), AnalysisError>;

    async fn best_move(&mut self, fen: &str, limit: Duration) -> Result<MoveResult, AnalysisError>;

    /// Evaluation of `fen` relative to `perspective`.
    async fn evaluate(
        &mut self,
        fen: &str,
        perspective: Color,
        limit: Duration,
    ) -> Result<Score, AnalysisError>;

    /// Up to `count` candidate moves in UCI notation, best first.
    async fn top_moves(
        &mut self,
        fen: &str,
        count: usize,
        limit: Duration,
    ) -> Result<Vec<String>, AnalysisError>;

    async fn quit(&mut self) {}
}
