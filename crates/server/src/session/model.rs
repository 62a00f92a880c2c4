use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use serde::Serialize;
use shakmaty::Color;

use analysis::Outcome;
use chess_core::board::{color_name, STARTING_FEN};

/// Sender name of messages the session itself posts.
pub const SYSTEM_SENDER: &str = "system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameState {
    Waiting,
    InProgress,
    Finished,
    Retired,
    PlayerLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DrawResponse {
    Unknown,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub player: String,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

/// One game. Player one plays White, player two Black.
///
/// `fen_history[i]` is the position before `move_history[i]` was played, and
/// `score_history[i]` the score of that position for the side to move.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub player_one: String,
    pub player_two: Option<String>,
    pub state: GameState,
    pub fen: String,
    pub move_history: Vec<String>,
    pub fen_history: Vec<String>,
    pub score_history: Vec<Option<f64>>,
    pub outcome: Option<Outcome>,
    pub draw_offered: bool,
    pub draw_response: DrawResponse,
    pub retired: bool,
    pub player_retired: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub white_descriptions: Vec<String>,
    pub black_descriptions: Vec<String>,
    pub(crate) rng: StdRng,
}

impl Session {
    pub fn new(id: String, player_one: String, rng: StdRng) -> Self {
        Self {
            id,
            player_one,
            player_two: None,
            state: GameState::Waiting,
            fen: STARTING_FEN.to_string(),
            move_history: Vec::new(),
            fen_history: Vec::new(),
            score_history: Vec::new(),
            outcome: None,
            draw_offered: false,
            draw_response: DrawResponse::Unknown,
            retired: false,
            player_retired: None,
            messages: Vec::new(),
            white_descriptions: Vec::new(),
            black_descriptions: Vec::new(),
            rng,
        }
    }

    /// Finished and retired games take no further moves.
    pub fn is_closed(&self) -> bool {
        matches!(self.state, GameState::Finished | GameState::Retired)
    }

    pub fn player_name(&self, color: Color) -> &str {
        match color {
            Color::White => &self.player_one,
            Color::Black => self.player_two.as_deref().unwrap_or("Black"),
        }
    }

    pub fn add_message(&mut self, player: &str, message: &str) {
        self.messages.push(ChatMessage {
            player: player.to_string(),
            message: message.to_string(),
            sent_at: Utc::now(),
        });
    }

    pub fn add_system_message(&mut self, message: &str) {
        self.add_message(SYSTEM_SENDER, message);
    }

    /// Append one ply. The histories stay the same length.
    pub(crate) fn record_move(&mut self, uci: &str, score: Option<f64>, next_fen: String) {
        let before = std::mem::replace(&mut self.fen, next_fen);
        self.fen_history.push(before);
        self.move_history.push(uci.to_string());
        self.score_history.push(score);
    }

    pub(crate) fn finish(&mut self, outcome: Outcome) {
        self.state = GameState::Finished;
        self.outcome = Some(outcome);
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let turn = chess_core::board::side_to_move(&self.fen)
            .map(color_name)
            .unwrap_or("white");
        GameSnapshot {
            game_id: self.id.clone(),
            state: self.state,
            player_one: self.player_one.clone(),
            player_two: self.player_two.clone(),
            fen: self.fen.clone(),
            turn,
            winner: self.outcome,
            move_stack: self.move_history.clone(),
            fen_stack: self.fen_history.clone(),
            score_stack: self.score_history.clone(),
            draw_offered: self.draw_offered,
            draw_response: self.draw_response,
            retired: self.retired,
            player_retired: self.player_retired.clone(),
            messages: self.messages.clone(),
            white_descriptions: self.white_descriptions.clone(),
            black_descriptions: self.black_descriptions.clone(),
        }
    }
}

/// Serialized view of a session returned by every store operation.
#[derive(Debug, Clone, Serialize)]
pub struct GameSnapshot {
    pub game_id: String,
    pub state: GameState,
    pub player_one: String,
    pub player_two: Option<String>,
    pub fen: String,
    pub turn: &'static str,
    pub winner: Option<Outcome>,
    pub move_stack: Vec<String>,
    pub fen_stack: Vec<String>,
    pub score_stack: Vec<Option<f64>>,
    pub draw_offered: bool,
    pub draw_response: DrawResponse,
    pub retired: bool,
    pub player_retired: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub white_descriptions: Vec<String>,
    pub black_descriptions: Vec<String>,
}
