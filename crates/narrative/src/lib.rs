//! Move commentary from small composable grammars.

pub mod error;
pub mod fragments;
pub mod generator;
pub mod grammar;

pub use error::GrammarError;
pub use fragments::Voice;
pub use generator::{MoveFacts, Names, Narrator};
pub use grammar::{Fragment, Grammar, Symbol};
