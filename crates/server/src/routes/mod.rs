use std::sync::Arc;

use analysis::StockfishEngine;

use crate::session::SessionStore;

pub mod engine;
pub mod games;
pub mod health;
pub mod openings;
pub mod puzzles;

/// Store backed by the Stockfish pool.
pub type Store = Arc<SessionStore<StockfishEngine>>;
