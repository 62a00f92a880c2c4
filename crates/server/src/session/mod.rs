//! Live game sessions.

mod error;
mod model;
mod store;

pub use error::SessionError;
pub use model::{ChatMessage, DrawResponse, GameSnapshot, GameState, Session, SYSTEM_SENDER};
pub use store::{EnginePlay, SessionStore};
