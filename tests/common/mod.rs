//! Shared helpers: a scripted engine and a store built on it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use analysis::{AnalysisError, Engine, EnginePool, MoveResult, PositionAnalyzer, Score, Strength};
use async_trait::async_trait;
use chess_core::board;
use chess_core::openings::{Opening, OpeningBook};
use server::session::SessionStore;
use shakmaty::Color;

/// Answers from a table of White-relative scores keyed by FEN.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    pub scores: HashMap<String, Score>,
    pub reply: Option<String>,
    pub top: Vec<String>,
    pub broken: bool,
}

impl ScriptedEngine {
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub fn score(mut self, fen: &str, white: Score) -> Self {
        self.scores.insert(fen.to_string(), white);
        self
    }

    fn check(&self) -> Result<(), AnalysisError> {
        if self.broken {
            Err(AnalysisError::Stockfish("Stockfish process exited".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    async fn configure(&mut self, _strength: Strength) -> Result<(), AnalysisError> {
        self.check()
    }

    async fn best_move(&mut self, _fen: &str, _limit: Duration) -> Result<MoveResult, AnalysisError> {
        self.check()?;
        Ok(MoveResult {
            best_move: self.reply.clone(),
            ponder: None,
        })
    }

    async fn evaluate(
        &mut self,
        fen: &str,
        perspective: Color,
        _limit: Duration,
    ) -> Result<Score, AnalysisError> {
        self.check()?;
        let white = self.scores.get(fen).copied().unwrap_or(Score::Cp(0));
        Ok(white.relative_to(Color::White, perspective))
    }

    async fn top_moves(
        &mut self,
        _fen: &str,
        count: usize,
        _limit: Duration,
    ) -> Result<Vec<String>, AnalysisError> {
        self.check()?;
        Ok(self.top.iter().take(count).cloned().collect())
    }
}

pub fn book() -> OpeningBook {
    OpeningBook::from_openings(vec![
        Opening {
            eco: "B00".into(),
            name: "King's Pawn Game".into(),
            link: None,
            move_stack: vec!["e2e4".into()],
        },
        Opening {
            eco: "B20".into(),
            name: "Sicilian Defense".into(),
            link: None,
            move_stack: vec!["e2e4".into(), "c7c5".into()],
        },
    ])
}

pub fn store_with(engines: Vec<ScriptedEngine>, seed: u64) -> Arc<SessionStore<ScriptedEngine>> {
    let pool = EnginePool::new(engines).expect("non-empty pool");
    Arc::new(SessionStore::new(
        Arc::new(pool),
        PositionAnalyzer::default(),
        Arc::new(book()),
        Some(seed),
    ))
}

pub fn store() -> Arc<SessionStore<ScriptedEngine>> {
    store_with(vec![ScriptedEngine::default()], 7)
}

/// Positions before each move, and the final position.
pub fn positions(moves: &[&str]) -> (Vec<String>, String) {
    let mut fens = Vec::new();
    let mut fen = board::STARTING_FEN.to_string();
    for mv in moves {
        fens.push(fen.clone());
        fen = board::apply(&fen, mv).expect("legal move");
    }
    (fens, fen)
}

pub const FOOLS_MATE: [&str; 4] = ["f2f3", "e7e5", "g2g4", "d8h4"];
