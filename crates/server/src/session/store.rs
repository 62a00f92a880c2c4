//! Session registry. Every operation on a session runs under that session's
//! lock; different sessions proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use shakmaty::Color;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use analysis::{AnalysisResult, Engine, EnginePool, Outcome, PositionAnalyzer, Strength};
use chess_core::board;
use chess_core::openings::OpeningBook;
use narrative::{MoveFacts, Names, Narrator};

use super::error::SessionError;
use super::model::{DrawResponse, GameSnapshot, GameState, Session};

const GAME_ID_LEN: usize = 6;

/// Result of a stateless engine move.
#[derive(Debug, Clone, Serialize)]
pub struct EnginePlay {
    pub fen: String,
    #[serde(rename = "move")]
    pub uci: Option<String>,
    pub winner: Option<Outcome>,
}

struct Registry {
    sessions: HashMap<String, Arc<Mutex<Session>>>,
    rng: StdRng,
}

pub struct SessionStore<E> {
    registry: RwLock<Registry>,
    engines: Arc<EnginePool<E>>,
    analyzer: PositionAnalyzer,
    narrator: Narrator,
    book: Arc<OpeningBook>,
}

impl<E: Engine> SessionStore<E> {
    /// `seed` makes game ids and narration reproducible.
    pub fn new(
        engines: Arc<EnginePool<E>>,
        analyzer: PositionAnalyzer,
        book: Arc<OpeningBook>,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            registry: RwLock::new(Registry {
                sessions: HashMap::new(),
                rng,
            }),
            engines,
            analyzer,
            narrator: Narrator::new(),
            book,
        }
    }

    pub async fn len(&self) -> usize {
        self.registry.read().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn session(&self, id: &str) -> Result<Arc<Mutex<Session>>, SessionError> {
        let registry = self.registry.read().await;
        registry.sessions.get(id).cloned().ok_or_else(|| {
            warn!(game_id = %id, "Game not found");
            SessionError::NotFound(id.to_string())
        })
    }

    pub async fn create_game(&self, player_one: &str) -> GameSnapshot {
        self.insert(player_one, None).await
    }

    /// A game that starts from `fen` instead of the initial position, e.g. a
    /// puzzle. A position that is already over starts FINISHED.
    pub async fn create_game_from(&self, player_one: &str, fen: &str) -> Result<GameSnapshot, SessionError> {
        let pos = board::parse_position(fen)?;
        let outcome = self.analyzer.is_over(fen)?;
        Ok(self.insert(player_one, Some((board::to_fen(&pos), outcome))).await)
    }

    async fn insert(&self, player_one: &str, start: Option<(String, Option<Outcome>)>) -> GameSnapshot {
        let name = name_or(player_one, "Player 1");
        let mut registry = self.registry.write().await;

        let id = loop {
            let id: String = (&mut registry.rng)
                .sample_iter(&Alphanumeric)
                .take(GAME_ID_LEN)
                .map(char::from)
                .collect();
            if !registry.sessions.contains_key(&id) {
                break id;
            }
        };
        let session_rng = StdRng::seed_from_u64(registry.rng.gen());

        let mut session = Session::new(id.clone(), name, session_rng);
        if let Some((fen, outcome)) = start {
            session.fen = fen;
            if let Some(outcome) = outcome {
                session.finish(outcome);
            }
        }
        session.add_system_message(&format!("{} created the game", session.player_one));
        let snapshot = session.snapshot();
        registry.sessions.insert(id.clone(), Arc::new(Mutex::new(session)));

        info!(game_id = %id, "Game created");
        snapshot
    }

    pub async fn join_game(&self, id: &str, player_two: &str) -> Result<GameSnapshot, SessionError> {
        let session = self.session(id).await?;
        let mut session = session.lock().await;

        if session.player_two.is_some() {
            warn!(game_id = %id, "Join rejected, game is full");
            return Err(SessionError::Full(id.to_string()));
        }

        let name = name_or(player_two, "Player 2");
        session.add_system_message(&format!("{name} joined the game"));
        session.player_two = Some(name);
        if session.state == GameState::Waiting {
            session.state = GameState::InProgress;
        }

        info!(game_id = %id, "Player two joined");
        Ok(session.snapshot())
    }

    pub async fn play_move(&self, id: &str, uci: &str, narrate: bool) -> Result<GameSnapshot, SessionError> {
        let session = self.session(id).await?;
        let mut session = session.lock().await;
        self.apply_move(&mut session, uci, narrate).await?;
        Ok(session.snapshot())
    }

    /// Let the engine choose and play the next move at `strength`.
    pub async fn play_engine_move(
        &self,
        id: &str,
        strength: Strength,
        narrate: bool,
    ) -> Result<GameSnapshot, SessionError> {
        let session = self.session(id).await?;
        let mut session = session.lock().await;
        if session.is_closed() {
            return Err(SessionError::GameOver(id.to_string()));
        }

        let chosen = self.engine_move(&session.fen, strength).await?;
        match chosen {
            Some(uci) => self.apply_move(&mut session, &uci, narrate).await?,
            None => info!(game_id = %id, "Engine has no move to play"),
        }
        Ok(session.snapshot())
    }

    /// An engine reply to `fen` without a session.
    pub async fn engine_play(&self, fen: &str, strength: Strength) -> Result<EnginePlay, SessionError> {
        board::parse_position(fen)?;
        if let Some(winner) = self.analyzer.is_over(fen)? {
            return Ok(EnginePlay {
                fen: fen.to_string(),
                uci: None,
                winner: Some(winner),
            });
        }

        let Some(uci) = self.engine_move(fen, strength).await? else {
            return Ok(EnginePlay {
                fen: fen.to_string(),
                uci: None,
                winner: None,
            });
        };
        let next = board::apply(fen, &uci)?;
        let winner = self.analyzer.is_over(&next)?;
        Ok(EnginePlay {
            fen: next,
            uci: Some(uci),
            winner,
        })
    }

    /// No-op until both seats are taken, on a closed game, or with an offer
    /// already pending.
    pub async fn offer_draw(&self, id: &str) -> Result<GameSnapshot, SessionError> {
        let session = self.session(id).await?;
        let mut session = session.lock().await;
        if !session.draw_offered && !session.is_closed() && session.player_two.is_some() {
            session.draw_offered = true;
            session.add_system_message("A draw has been offered");
        }
        Ok(session.snapshot())
    }

    pub async fn answer_draw(&self, id: &str, accept: bool) -> Result<GameSnapshot, SessionError> {
        let session = self.session(id).await?;
        let mut session = session.lock().await;
        if !session.draw_offered || session.is_closed() {
            return Ok(session.snapshot());
        }

        if accept {
            session.draw_response = DrawResponse::Accepted;
            session.finish(Outcome::Draw);
            session.add_system_message("The draw was accepted");
            info!(game_id = %id, "Game drawn by agreement");
        } else {
            session.draw_response = DrawResponse::Rejected;
            session.draw_offered = false;
            session.add_system_message("The draw was declined");
        }
        Ok(session.snapshot())
    }

    pub async fn reset_draw(&self, id: &str) -> Result<GameSnapshot, SessionError> {
        let session = self.session(id).await?;
        let mut session = session.lock().await;
        session.draw_response = DrawResponse::Unknown;
        session.draw_offered = false;
        Ok(session.snapshot())
    }

    /// Retiring twice keeps the first retiring player.
    pub async fn retire(&self, id: &str, player: &str) -> Result<GameSnapshot, SessionError> {
        let session = self.session(id).await?;
        let mut session = session.lock().await;
        if session.retired || session.state == GameState::Finished {
            return Ok(session.snapshot());
        }

        session.retired = true;
        session.player_retired = Some(player.to_string());
        session.state = GameState::Retired;
        session.add_system_message(&format!("{player} retired"));
        info!(game_id = %id, player, "Player retired");
        Ok(session.snapshot())
    }

    pub async fn post_message(&self, id: &str, player: &str, message: &str) -> Result<GameSnapshot, SessionError> {
        let session = self.session(id).await?;
        let mut session = session.lock().await;
        session.add_message(player, message);
        Ok(session.snapshot())
    }

    /// Current snapshot; finishes the game if its position is terminal.
    pub async fn poll(&self, id: &str) -> Result<GameSnapshot, SessionError> {
        let session = self.session(id).await?;
        let mut session = session.lock().await;
        if !session.is_closed() {
            if let Some(outcome) = self.analyzer.is_over(&session.fen)? {
                session.finish(outcome);
            }
        }
        Ok(session.snapshot())
    }

    async fn engine_move(&self, fen: &str, strength: Strength) -> Result<Option<String>, SessionError> {
        let mut engine = self.engines.checkout().await;
        engine.configure(strength).await?;
        let result = engine.best_move(fen, self.analyzer.config().move_time).await;
        // Analysis always runs at full strength.
        engine.configure(Strength::MAX).await?;
        Ok(result?.best_move)
    }

    /// Validate, score, record, analyse and narrate one ply.
    async fn apply_move(&self, session: &mut Session, uci: &str, narrate: bool) -> Result<(), SessionError> {
        if session.is_closed() {
            return Err(SessionError::GameOver(session.id.clone()));
        }
        let before = session.fen.clone();
        let next = board::apply(&before, uci)?;
        let mover = board::side_to_move(&before)?;

        let mut engine = self.engines.checkout().await;
        let score = match self.analyzer.relative_score(&mut *engine, &before, mover).await {
            Ok(score) => score,
            Err(e) => {
                warn!(game_id = %session.id, error = %e, "Failed to score position");
                None
            }
        };
        session.record_move(uci, score, next);

        let mut result = match self.analyzer.board_facts(&session.fen_history, &session.fen, uci) {
            Ok(result) => result,
            Err(e) => {
                warn!(game_id = %session.id, error = %e, "Failed to read board facts");
                AnalysisResult::default()
            }
        };
        if narrate {
            if let Err(e) = self
                .analyzer
                .enrich(
                    &mut *engine,
                    &session.fen_history,
                    &session.score_history,
                    &session.fen,
                    uci,
                    &mut result,
                )
                .await
            {
                warn!(game_id = %session.id, error = %e, "Move analysis degraded");
            }
        }
        drop(engine);

        if let Some(outcome) = result.outcome {
            info!(game_id = %session.id, ?outcome, "Game over");
            session.finish(outcome);
        }

        if narrate {
            self.narrate(session, uci, &before, &result);
        }
        Ok(())
    }

    fn narrate(&self, session: &mut Session, uci: &str, before: &str, result: &AnalysisResult) {
        let (Ok(san), Ok(square), Ok(mover)) = (
            board::san(before, uci),
            board::square_name(before, uci),
            board::side_to_move(before),
        ) else {
            warn!(game_id = %session.id, uci, "Cannot describe move");
            return;
        };

        let ply = session.move_history.len();
        let previous_san = (ply >= 2)
            .then(|| board::san(&session.fen_history[ply - 2], &session.move_history[ply - 2]).ok())
            .flatten();

        // Move stacks in the book start from the initial position.
        let from_start = session.fen_history.first().map(String::as_str) == Some(board::STARTING_FEN);
        let (opening, parent) = if from_start {
            (
                self.book.lookup(session.move_history.as_slice()),
                self.book.lookup(&session.move_history[..ply - 1]),
            )
        } else {
            (None, None)
        };
        let opening_name = opening.map(|o| o.display_name(parent).to_string());
        // Only announce an opening when the name changes.
        let opening_name = opening_name.filter(|_| opening.map(|o| &o.name) != parent.map(|p| &p.name));

        let facts = MoveFacts {
            mover,
            san: &san,
            square: &square,
            previous_san: previous_san.as_deref(),
            ply,
            opening: opening_name.as_deref(),
            analysis: result,
        };

        let white_name = session.player_name(Color::White).to_string();
        let black_name = session.player_name(Color::Black).to_string();
        let names = Names {
            white: &white_name,
            black: &black_name,
        };

        let white = self.narrator.describe(&facts, Color::White, &names, &mut session.rng);
        let black = self.narrator.describe(&facts, Color::Black, &names, &mut session.rng);
        session.white_descriptions.push(white);
        session.black_descriptions.push(black);
    }
}

fn name_or(name: &str, default: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        default.to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis::{AnalysisError, MoveResult, Score};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Sees every position as level and always answers with `reply`.
    struct LevelEngine {
        reply: Option<String>,
    }

    #[async_trait]
    impl Engine for LevelEngine {
        async fn configure(&mut self, _strength: Strength) -> Result<(), AnalysisError> {
            Ok(())
        }

        async fn best_move(&mut self, _fen: &str, _limit: Duration) -> Result<MoveResult, AnalysisError> {
            Ok(MoveResult {
                best_move: self.reply.clone(),
                ponder: None,
            })
        }

        async fn evaluate(
            &mut self,
            _fen: &str,
            _perspective: Color,
            _limit: Duration,
        ) -> Result<Score, AnalysisError> {
            Ok(Score::Cp(0))
        }

        async fn top_moves(
            &mut self,
            _fen: &str,
            _count: usize,
            _limit: Duration,
        ) -> Result<Vec<String>, AnalysisError> {
            Ok(vec![])
        }
    }

    fn store(reply: Option<&str>) -> SessionStore<LevelEngine> {
        let pool = EnginePool::new(vec![LevelEngine {
            reply: reply.map(str::to_string),
        }])
        .unwrap();
        SessionStore::new(
            Arc::new(pool),
            PositionAnalyzer::default(),
            Arc::new(OpeningBook::default()),
            Some(42),
        )
    }

    #[test]
    fn test_name_or_default() {
        assert_eq!(name_or("", "Player 2"), "Player 2");
        assert_eq!(name_or("  ", "Player 2"), "Player 2");
        assert_eq!(name_or("Ada", "Player 1"), "Ada");
    }

    #[tokio::test]
    async fn test_game_ids_are_unique() {
        let store = store(None);
        let a = store.create_game("Ada").await;
        let b = store.create_game("Grace").await;
        assert_eq!(a.game_id.len(), GAME_ID_LEN);
        assert_ne!(a.game_id, b.game_id);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_play_engine_move() {
        let store = store(Some("e2e4"));
        let game = store.create_game("Ada").await;
        let snapshot = store
            .play_engine_move(&game.game_id, Strength::clamped(3), true)
            .await
            .unwrap();
        assert_eq!(snapshot.move_stack, vec!["e2e4"]);
        assert_eq!(snapshot.white_descriptions.len(), 1);
    }

    #[tokio::test]
    async fn test_engine_without_move_leaves_game_unchanged() {
        let store = store(None);
        let game = store.create_game("Ada").await;
        let snapshot = store
            .play_engine_move(&game.game_id, Strength::MAX, false)
            .await
            .unwrap();
        assert!(snapshot.move_stack.is_empty());
    }

    #[tokio::test]
    async fn test_engine_play_stateless() {
        let store = store(Some("e7e5"));
        let fen = board::apply(board::STARTING_FEN, "e2e4").unwrap();
        let play = store.engine_play(&fen, Strength::MAX).await.unwrap();
        assert_eq!(play.uci.as_deref(), Some("e7e5"));
        assert_eq!(play.winner, None);
        assert!(play.fen.contains(" w "));

        let err = store.engine_play("not a fen", Strength::MAX).await.unwrap_err();
        assert!(matches!(err, SessionError::Board(_)));
    }
}
