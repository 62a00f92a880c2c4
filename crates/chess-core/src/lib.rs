pub mod board;
pub mod error;
pub mod openings;
pub mod puzzles;

pub use error::BoardError;
