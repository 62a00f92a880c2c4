//! Position analysis: engine output and board state in, typed move signals out.
//!
//! "No signal" conditions come back as `None`. Board and engine failures
//! propagate unchanged so a dead engine never yields a fabricated score.

use serde::Serialize;
use shakmaty::{Color, Role};
use tracing::debug;

use chess_core::board::{self, Terminal};

use crate::config::AnalyzerConfig;
use crate::engine::{Engine, Score};
use crate::error::AnalysisError;

/// How a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    #[serde(rename = "white")]
    WhiteWins,
    #[serde(rename = "black")]
    BlackWins,
    #[serde(rename = "stale")]
    Stalemate,
    #[serde(rename = "draw")]
    Draw,
}

impl Outcome {
    pub fn win(winner: Color) -> Self {
        match winner {
            Color::White => Outcome::WhiteWins,
            Color::Black => Outcome::BlackWins,
        }
    }

    pub fn winner(self) -> Option<Color> {
        match self {
            Outcome::WhiteWins => Some(Color::White),
            Outcome::BlackWins => Some(Color::Black),
            Outcome::Stalemate | Outcome::Draw => None,
        }
    }
}

/// A forced mate: `side` delivers it in `plies_to_mate` (0 = already mated).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MateResult {
    pub side: Color,
    pub plies_to_mate: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveQuality {
    Blunder { critical: bool },
    Good,
    /// `engine_line` when the move is the engine's own choice or the reply it predicted
    Fantastic { engine_line: bool },
}

/// Everything known about one played move.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisResult {
    /// White-relative score of the resulting position in (-1, 1)
    pub score: Option<f64>,
    pub mate: Option<MateResult>,
    pub outcome: Option<Outcome>,
    pub capture: Option<Role>,
    pub is_check: bool,
    /// Score change for the side that moved
    pub delta: Option<f64>,
    pub quality: Option<MoveQuality>,
    /// Better moves in SAN, only after a blunder
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PositionAnalyzer {
    config: AnalyzerConfig,
}

impl PositionAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn is_over(&self, fen: &str) -> Result<Option<Outcome>, AnalysisError> {
        let outcome = match board::terminal_outcome(fen)? {
            Terminal::Ongoing => None,
            Terminal::Checkmate { winner } => Some(Outcome::win(winner)),
            Terminal::Stalemate => Some(Outcome::Stalemate),
            Terminal::Draw => Some(Outcome::Draw),
        };
        Ok(outcome)
    }

    /// Score in (-1, 1), positive favoring White, negated for a Black
    /// perspective. `None` when the engine sees a forced mate.
    pub async fn relative_score<E: Engine + ?Sized>(
        &self,
        engine: &mut E,
        fen: &str,
        perspective: Color,
    ) -> Result<Option<f64>, AnalysisError> {
        let score = engine.evaluate(fen, Color::White, self.config.eval_time).await?;
        Ok(self.logistic(score).map(|v| orient(v, perspective)))
    }

    pub async fn mate_result<E: Engine + ?Sized>(
        &self,
        engine: &mut E,
        fen: &str,
        requesting: Color,
    ) -> Result<Option<MateResult>, AnalysisError> {
        if let Terminal::Checkmate { winner } = board::terminal_outcome(fen)? {
            return Ok(Some(MateResult {
                side: winner,
                plies_to_mate: 0,
            }));
        }
        let score = engine.evaluate(fen, requesting, self.config.eval_time).await?;
        Ok(self.mate_in_window(score, requesting))
    }

    /// Change in `side`'s score between the second-to-last history entry and
    /// `current`. Needs `min_delta_history` plies of history.
    pub async fn advantage_delta<E: Engine + ?Sized>(
        &self,
        engine: &mut E,
        fen_history: &[String],
        current: &str,
        side: Color,
    ) -> Result<Option<f64>, AnalysisError> {
        if fen_history.len() < self.config.min_delta_history {
            return Ok(None);
        }
        let now = self.relative_score(engine, current, Color::White).await?;
        self.delta_from(engine, fen_history, &[], now, side).await
    }

    /// `advantage_delta` against an already known White-relative score of the
    /// current position. `score_history[i]` is the score of `fen_history[i]`
    /// for its side to move; a missing entry is evaluated again.
    async fn delta_from<E: Engine + ?Sized>(
        &self,
        engine: &mut E,
        fen_history: &[String],
        score_history: &[Option<f64>],
        now: Option<f64>,
        side: Color,
    ) -> Result<Option<f64>, AnalysisError> {
        if fen_history.len() < self.config.min_delta_history {
            return Ok(None);
        }
        let Some(now) = now else {
            return Ok(None);
        };
        let i = fen_history.len() - 2;
        let previous = &fen_history[i];

        let before = match score_history.get(i).copied().flatten() {
            Some(stored) => orient(orient(stored, board::side_to_move(previous)?), side),
            None => match self.relative_score(engine, previous, side).await? {
                Some(before) => before,
                None => return Ok(None),
            },
        };
        Ok(Some(orient(now, side) - before))
    }

    pub fn classify_delta(&self, delta: f64) -> Option<MoveQuality> {
        let c = &self.config;
        if delta <= c.critical_blunder_threshold {
            Some(MoveQuality::Blunder { critical: true })
        } else if delta < c.blunder_threshold {
            Some(MoveQuality::Blunder { critical: false })
        } else if delta >= c.fantastic_move_threshold {
            Some(MoveQuality::Fantastic { engine_line: false })
        } else if delta > c.good_move_threshold {
            Some(MoveQuality::Good)
        } else {
            None
        }
    }

    /// Piece captured by `uci`, played from the last history entry.
    pub fn capture_result(
        &self,
        fen_history: &[String],
        uci: &str,
    ) -> Result<Option<Role>, AnalysisError> {
        match fen_history.last() {
            Some(before) => Ok(board::capture_at(before, uci)?),
            None => Ok(None),
        }
    }

    pub fn is_check(&self, fen: &str) -> Result<bool, AnalysisError> {
        Ok(board::is_check(fen)?)
    }

    /// Signals that need no engine: capture, check, terminal outcome and an
    /// already-delivered mate.
    pub fn board_facts(
        &self,
        fen_history: &[String],
        current: &str,
        uci: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        let outcome = self.is_over(current)?;
        Ok(AnalysisResult {
            capture: self.capture_result(fen_history, uci)?,
            is_check: self.is_check(current)?,
            outcome,
            mate: outcome.and_then(Outcome::winner).map(|side| MateResult {
                side,
                plies_to_mate: 0,
            }),
            ..AnalysisResult::default()
        })
    }

    /// Add engine signals to `result`. Terminal positions are left as they are.
    ///
    /// `score_history` runs alongside `fen_history` as `Session` records it and
    /// may be empty, in which case earlier positions are evaluated again.
    pub async fn enrich<E: Engine + ?Sized>(
        &self,
        engine: &mut E,
        fen_history: &[String],
        score_history: &[Option<f64>],
        current: &str,
        uci: &str,
        result: &mut AnalysisResult,
    ) -> Result<(), AnalysisError> {
        if result.outcome.is_some() {
            return Ok(());
        }
        let mover = !board::side_to_move(current)?;

        let white = engine.evaluate(current, Color::White, self.config.eval_time).await?;
        result.score = self.logistic(white);
        result.mate = self.mate_in_window(white, Color::White);
        result.delta = self
            .delta_from(engine, fen_history, score_history, result.score, mover)
            .await?;

        result.quality = match result.delta.and_then(|d| self.classify_delta(d)) {
            Some(MoveQuality::Fantastic { .. }) => Some(MoveQuality::Fantastic {
                engine_line: self.is_engine_line(engine, fen_history, uci).await?,
            }),
            Some(blunder @ MoveQuality::Blunder { .. }) => {
                result.suggestions = self.suggestions(engine, fen_history).await?;
                Some(blunder)
            }
            other => other,
        };

        debug!(
            uci,
            score = ?result.score,
            delta = ?result.delta,
            quality = ?result.quality,
            "Move analysed"
        );
        Ok(())
    }

    /// The move matches the engine's best move, or the reply it predicted a ply earlier.
    async fn is_engine_line<E: Engine + ?Sized>(
        &self,
        engine: &mut E,
        fen_history: &[String],
        uci: &str,
    ) -> Result<bool, AnalysisError> {
        let Some(before) = fen_history.last() else {
            return Ok(false);
        };
        let best = engine.best_move(before, self.config.eval_time).await?;
        if best.best_move.as_deref() == Some(uci) {
            return Ok(true);
        }
        if fen_history.len() < 2 {
            return Ok(false);
        }
        let earlier = engine
            .best_move(&fen_history[fen_history.len() - 2], self.config.eval_time)
            .await?;
        Ok(earlier.ponder.as_deref() == Some(uci))
    }

    async fn suggestions<E: Engine + ?Sized>(
        &self,
        engine: &mut E,
        fen_history: &[String],
    ) -> Result<Vec<String>, AnalysisError> {
        let Some(before) = fen_history.last() else {
            return Ok(vec![]);
        };
        let count = self.config.suggestion_count.clamp(1, 3);
        let moves = engine
            .top_moves(before, count, self.config.eval_time)
            .await?;
        Ok(moves
            .iter()
            .take(count)
            .filter_map(|m| board::san(before, m).ok())
            .collect())
    }

    /// Logistic transform of a White-relative score; undefined for mates.
    fn logistic(&self, white: Score) -> Option<f64> {
        match white {
            Score::Mate(_) => None,
            Score::Cp(cp) => {
                // Fed from Black's frame so that a positive result favors White.
                let cp = -(cp as f64);
                Some(-(2.0 / (1.0 + (-self.config.logistic_k * cp).exp()) - 1.0))
            }
        }
    }

    fn mate_in_window(&self, score: Score, perspective: Color) -> Option<MateResult> {
        let Score::Mate(n) = score else {
            return None;
        };
        let distance = n.unsigned_abs();
        if !self.config.mate_window.contains(&distance) {
            return None;
        }
        let side = if n > 0 { perspective } else { !perspective };
        Some(MateResult {
            side,
            plies_to_mate: distance,
        })
    }
}

fn orient(white_score: f64, perspective: Color) -> f64 {
    match perspective {
        Color::White => white_score,
        Color::Black => -white_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MoveResult, Strength};
    use async_trait::async_trait;
    use chess_core::board::STARTING_FEN;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Answers from fixed White-relative scores keyed by FEN.
    #[derive(Default)]
    struct ScriptedEngine {
        scores: HashMap<String, Score>,
        best: HashMap<String, MoveResult>,
        top: Vec<String>,
        calls: usize,
    }

    #[async_trait]
    impl Engine for ScriptedEngine {
        async fn configure(&mut self, _strength: Strength) -> Result<(), AnalysisError> {
            Ok(())
        }

        async fn best_move(&mut self, fen: &str, _limit: Duration) -> Result<MoveResult, AnalysisError> {
            self.calls += 1;
            Ok(self.best.get(fen).cloned().unwrap_or_default())
        }

        async fn evaluate(
            &mut self,
            fen: &str,
            perspective: Color,
            _limit: Duration,
        ) -> Result<Score, AnalysisError> {
            self.calls += 1;
            let white = self.scores.get(fen).copied().unwrap_or(Score::Cp(0));
            Ok(white.relative_to(Color::White, perspective))
        }

        async fn top_moves(
            &mut self,
            _fen: &str,
            count: usize,
            _limit: Duration,
        ) -> Result<Vec<String>, AnalysisError> {
            Ok(self.top.iter().take(count).cloned().collect())
        }
    }

    struct DeadEngine;

    #[async_trait]
    impl Engine for DeadEngine {
        async fn configure(&mut self, _strength: Strength) -> Result<(), AnalysisError> {
            Err(AnalysisError::Stockfish("process exited".into()))
        }

        async fn best_move(&mut self, _fen: &str, _limit: Duration) -> Result<MoveResult, AnalysisError> {
            Err(AnalysisError::Stockfish("process exited".into()))
        }

        async fn evaluate(
            &mut self,
            _fen: &str,
            _perspective: Color,
            limit: Duration,
        ) -> Result<Score, AnalysisError> {
            Err(AnalysisError::Timeout(limit))
        }

        async fn top_moves(
            &mut self,
            _fen: &str,
            _count: usize,
            _limit: Duration,
        ) -> Result<Vec<String>, AnalysisError> {
            Err(AnalysisError::Stockfish("process exited".into()))
        }
    }

    /// FEN before each move, plus the final position.
    fn history(moves: &[&str]) -> (Vec<String>, String) {
        let mut fens = Vec::new();
        let mut fen = STARTING_FEN.to_string();
        for mv in moves {
            fens.push(fen.clone());
            fen = board::apply(&fen, mv).unwrap();
        }
        (fens, fen)
    }

    #[tokio::test]
    async fn test_relative_score_logistic() {
        let analyzer = PositionAnalyzer::default();
        let mut engine = ScriptedEngine::default();
        engine.scores.insert(STARTING_FEN.to_string(), Score::Cp(100));

        let white = analyzer
            .relative_score(&mut engine, STARTING_FEN, Color::White)
            .await
            .unwrap()
            .unwrap();
        let black = analyzer
            .relative_score(&mut engine, STARTING_FEN, Color::Black)
            .await
            .unwrap()
            .unwrap();

        assert!((white - 0.1974).abs() < 1e-3);
        assert_eq!(white, -black);
        assert!(white > 0.0 && white < 1.0);
    }

    #[tokio::test]
    async fn test_relative_score_none_for_mate() {
        let analyzer = PositionAnalyzer::default();
        let mut engine = ScriptedEngine::default();
        engine.scores.insert(STARTING_FEN.to_string(), Score::Mate(3));
        let score = analyzer
            .relative_score(&mut engine, STARTING_FEN, Color::White)
            .await
            .unwrap();
        assert_eq!(score, None);
    }

    #[tokio::test]
    async fn test_mate_result_on_checkmate() {
        let analyzer = PositionAnalyzer::default();
        let (_, mated) = history(&["f2f3", "e7e5", "g2g4", "d8h4"]);
        let mut engine = DeadEngine;

        let mate = analyzer
            .mate_result(&mut engine, &mated, Color::White)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mate.plies_to_mate, 0);
        assert_eq!(mate.side, Color::Black);
        assert_eq!(analyzer.is_over(&mated).unwrap(), Some(Outcome::BlackWins));
    }

    #[tokio::test]
    async fn test_mate_result_window() {
        let analyzer = PositionAnalyzer::default();
        let mut engine = ScriptedEngine::default();

        let cases = [
            (Score::Mate(3), Some((Color::White, 3))),
            (Score::Mate(-2), Some((Color::Black, 2))),
            (Score::Mate(1), Some((Color::White, 1))),
            (Score::Mate(5), None),
            (Score::Mate(9), None),
            (Score::Cp(500), None),
        ];
        for (score, expected) in cases {
            engine.scores.insert(STARTING_FEN.to_string(), score);
            let result = analyzer
                .mate_result(&mut engine, STARTING_FEN, Color::White)
                .await
                .unwrap()
                .map(|m| (m.side, m.plies_to_mate));
            assert_eq!(result, expected, "score {score:?}");
        }
    }

    #[tokio::test]
    async fn test_mate_result_from_black_request() {
        let analyzer = PositionAnalyzer::default();
        let mut engine = ScriptedEngine::default();
        engine.scores.insert(STARTING_FEN.to_string(), Score::Mate(2));
        let mate = analyzer
            .mate_result(&mut engine, STARTING_FEN, Color::Black)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mate.side, Color::White);
    }

    #[tokio::test]
    async fn test_advantage_delta_needs_history() {
        let analyzer = PositionAnalyzer::default();
        let mut engine = ScriptedEngine::default();
        let (fens, current) = history(&["e2e4", "e7e5", "g1f3"]);

        for side in [Color::White, Color::Black] {
            let delta = analyzer
                .advantage_delta(&mut engine, &fens, &current, side)
                .await
                .unwrap();
            assert_eq!(delta, None);
        }
        assert_eq!(engine.calls, 0);
    }

    #[tokio::test]
    async fn test_advantage_delta() {
        let analyzer = PositionAnalyzer::default();
        let mut engine = ScriptedEngine::default();
        let (fens, current) = history(&["e2e4", "e7e5", "g1f3", "b8c6", "f1c4"]);
        engine.scores.insert(fens[3].clone(), Score::Cp(0));
        engine.scores.insert(current.clone(), Score::Cp(100));

        let delta = analyzer
            .advantage_delta(&mut engine, &fens, &current, Color::White)
            .await
            .unwrap()
            .unwrap();
        assert!((delta - 0.1974).abs() < 1e-3);

        let black = analyzer
            .advantage_delta(&mut engine, &fens, &current, Color::Black)
            .await
            .unwrap()
            .unwrap();
        assert!((black + 0.1974).abs() < 1e-3);

        engine.scores.insert(fens[3].clone(), Score::Mate(4));
        let delta = analyzer
            .advantage_delta(&mut engine, &fens, &current, Color::White)
            .await
            .unwrap();
        assert_eq!(delta, None);
    }

    #[test]
    fn test_classify_delta() {
        let analyzer = PositionAnalyzer::default();
        assert_eq!(
            analyzer.classify_delta(-0.7),
            Some(MoveQuality::Blunder { critical: true })
        );
        assert_eq!(
            analyzer.classify_delta(-0.35),
            Some(MoveQuality::Blunder { critical: false })
        );
        assert_eq!(analyzer.classify_delta(-0.3), None);
        assert_eq!(analyzer.classify_delta(0.05), None);
        assert_eq!(analyzer.classify_delta(0.1), None);
        assert_eq!(analyzer.classify_delta(0.15), Some(MoveQuality::Good));
        assert_eq!(
            analyzer.classify_delta(0.2),
            Some(MoveQuality::Fantastic { engine_line: false })
        );
    }

    #[test]
    fn test_board_facts() {
        let analyzer = PositionAnalyzer::default();
        let (fens, current) = history(&["e2e4", "d7d5", "e4d5"]);
        let facts = analyzer.board_facts(&fens, &current, "e4d5").unwrap();
        assert_eq!(facts.capture, Some(Role::Pawn));
        assert!(!facts.is_check);
        assert_eq!(facts.outcome, None);

        let (fens, current) = history(&["f2f3", "e7e5", "g2g4", "d8h4"]);
        let facts = analyzer.board_facts(&fens, &current, "d8h4").unwrap();
        assert!(facts.is_check);
        assert_eq!(facts.outcome, Some(Outcome::BlackWins));
        assert_eq!(facts.mate.map(|m| m.plies_to_mate), Some(0));
    }

    #[tokio::test]
    async fn test_enrich_blunder_suggests_moves() {
        let analyzer = PositionAnalyzer::default();
        let mut engine = ScriptedEngine::default();
        let (fens, current) = history(&["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8h6"]);
        engine.scores.insert(fens[4].clone(), Score::Cp(0));
        engine.scores.insert(current.clone(), Score::Cp(300));
        engine.top = vec!["g8f6".to_string(), "f8c5".to_string(), "d7d6".to_string()];

        let mut result = analyzer.board_facts(&fens, &current, "g8h6").unwrap();
        analyzer
            .enrich(&mut engine, &fens, &[], &current, "g8h6", &mut result)
            .await
            .unwrap();

        assert!(matches!(result.quality, Some(MoveQuality::Blunder { .. })));
        assert_eq!(result.suggestions, vec!["Nf6", "Bc5"]);
        assert!(result.score.unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_enrich_fantastic_engine_line() {
        let analyzer = PositionAnalyzer::default();
        let mut engine = ScriptedEngine::default();
        let (fens, current) = history(&["e2e4", "e7e5", "g1f3", "b8c6", "f1c4"]);
        engine.scores.insert(fens[3].clone(), Score::Cp(0));
        engine.scores.insert(current.clone(), Score::Cp(200));
        engine.best.insert(
            fens[4].clone(),
            MoveResult {
                best_move: Some("f1c4".to_string()),
                ponder: None,
            },
        );

        let mut result = analyzer.board_facts(&fens, &current, "f1c4").unwrap();
        analyzer
            .enrich(&mut engine, &fens, &[], &current, "f1c4", &mut result)
            .await
            .unwrap();
        assert_eq!(
            result.quality,
            Some(MoveQuality::Fantastic { engine_line: true })
        );
    }

    #[tokio::test]
    async fn test_enrich_reuses_recorded_scores() {
        let analyzer = PositionAnalyzer::default();
        let mut engine = ScriptedEngine::default();
        let (fens, current) = history(&["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8h6"]);
        engine.scores.insert(fens[4].clone(), Score::Cp(-40));
        engine.scores.insert(current.clone(), Score::Cp(300));

        // Recorded for White, the side to move at fens[4].
        let mut recorder = ScriptedEngine::default();
        recorder.scores.insert(fens[4].clone(), Score::Cp(-40));
        let mut scores = vec![None; fens.len()];
        scores[4] = analyzer
            .relative_score(&mut recorder, &fens[4], Color::White)
            .await
            .unwrap();

        let mut result = analyzer.board_facts(&fens, &current, "g8h6").unwrap();
        analyzer
            .enrich(&mut engine, &fens, &scores, &current, "g8h6", &mut result)
            .await
            .unwrap();
        assert_eq!(engine.calls, 1);
        assert!(matches!(result.quality, Some(MoveQuality::Blunder { .. })));

        let recomputed = analyzer
            .advantage_delta(&mut engine, &fens, &current, Color::Black)
            .await
            .unwrap();
        assert_eq!(result.delta, recomputed);
    }

    #[tokio::test]
    async fn test_enrich_propagates_engine_failure() {
        let analyzer = PositionAnalyzer::default();
        let (fens, current) = history(&["e2e4"]);
        let mut result = analyzer.board_facts(&fens, &current, "e2e4").unwrap();
        let err = analyzer
            .enrich(&mut DeadEngine, &fens, &[], &current, "e2e4", &mut result)
            .await
            .unwrap_err();
        assert!(err.is_engine_failure());
        assert_eq!(result.score, None);
    }
}
