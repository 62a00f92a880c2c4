//! Read-only opening repository keyed by move stack.
//!
//! The book is loaded from a binary file at startup for instant lookups. Keys
//! are the space-joined UCI move stack that reaches the opening position.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::board::{self, STARTING_FEN};

/// Default path to the binary book file.
pub const BOOK_FILE_PATH: &str = "data/openings.bin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opening {
    pub eco: String,
    pub name: String,
    /// Canonical reference page for the opening.
    pub link: Option<String>,
    /// UCI moves from the starting position.
    pub move_stack: Vec<String>,
}

impl Opening {
    /// Name used in commentary. A variation of `parent` drops the parent's
    /// name prefix ("Sicilian Defense: Najdorf Variation" -> "Najdorf Variation").
    pub fn display_name<'a>(&'a self, parent: Option<&Opening>) -> &'a str {
        match parent {
            Some(p) if p.name != self.name => self
                .name
                .strip_prefix(p.name.as_str())
                .and_then(|rest| rest.strip_prefix(": "))
                .unwrap_or(self.name.as_str()),
            _ => self.name.as_str(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OpeningBook {
    by_stack: HashMap<String, Opening>,
}

impl OpeningBook {
    pub fn from_openings(openings: impl IntoIterator<Item = Opening>) -> Self {
        let by_stack = openings
            .into_iter()
            .map(|o| (stack_key(&o.move_stack), o))
            .collect();
        Self { by_stack }
    }

    /// Load the book from a binary file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let openings: Vec<Opening> = bincode::deserialize_from(reader)?;
        Ok(Self::from_openings(openings))
    }

    /// Load the book, falling back to an empty book when the file is missing.
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(book) => {
                tracing::info!("Loaded opening book: {} openings", book.len());
                book
            }
            Err(e) => {
                tracing::warn!("Failed to load opening book from {}: {}", path.display(), e);
                tracing::warn!("Opening names will be omitted from commentary");
                Self::default()
            }
        }
    }

    /// Save the book to a binary file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let mut openings: Vec<&Opening> = self.by_stack.values().collect();
        openings.sort_by(|a, b| a.move_stack.cmp(&b.move_stack));
        let file = File::create(path)?;
        bincode::serialize_into(file, &openings)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.by_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_stack.is_empty()
    }

    /// Opening reached by exactly this move stack.
    pub fn lookup<S: AsRef<str>>(&self, moves: &[S]) -> Option<&Opening> {
        if moves.is_empty() {
            return None;
        }
        self.by_stack.get(&stack_key(moves))
    }

    /// Openings one move beyond `moves`, sorted by name.
    pub fn continuations<S: AsRef<str>>(&self, moves: &[S]) -> Vec<&Opening> {
        let mut found: Vec<&Opening> = self
            .by_stack
            .values()
            .filter(|o| {
                o.move_stack.len() == moves.len() + 1
                    && o.move_stack
                        .iter()
                        .zip(moves)
                        .all(|(a, b)| a.as_str() == b.as_ref())
            })
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }
}

/// Parse rows of the chess-openings TSV files (`eco name pgn uci epd`).
///
/// The header row is skipped, as are rows whose UCI stack is not legal from
/// the starting position.
pub fn parse_tsv<R: BufRead>(reader: R) -> std::io::Result<Vec<Opening>> {
    let mut openings = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let cols: Vec<&str> = line.split('\t').collect();
        if i == 0 && cols[0] == "eco" {
            continue;
        }
        if cols.len() < 4 {
            tracing::warn!(line = i + 1, "Skipping opening row with {} columns", cols.len());
            continue;
        }

        let move_stack: Vec<String> = cols[3].split_whitespace().map(String::from).collect();
        let legal = move_stack
            .iter()
            .try_fold(STARTING_FEN.to_string(), |fen, mv| board::apply(&fen, mv))
            .is_ok();
        if move_stack.is_empty() || !legal {
            tracing::warn!(line = i + 1, name = cols[1], "Skipping opening with illegal moves");
            continue;
        }

        openings.push(Opening {
            eco: cols[0].to_string(),
            name: cols[1].to_string(),
            link: None,
            move_stack,
        });
    }

    Ok(openings)
}

fn stack_key<S: AsRef<str>>(moves: &[S]) -> String {
    moves
        .iter()
        .map(|m| m.as_ref())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opening(eco: &str, name: &str, moves: &str) -> Opening {
        Opening {
            eco: eco.to_string(),
            name: name.to_string(),
            link: Some(format!("https://en.wikipedia.org/wiki/{}", name.replace(' ', "_"))),
            move_stack: moves.split_whitespace().map(String::from).collect(),
        }
    }

    fn sample_book() -> OpeningBook {
        OpeningBook::from_openings(vec![
            opening("B00", "King's Pawn Game", "e2e4"),
            opening("B20", "Sicilian Defense", "e2e4 c7c5"),
            opening("C20", "King's Pawn Game: Open Game", "e2e4 e7e5"),
            opening("B27", "Sicilian Defense: Hyperaccelerated Dragon", "e2e4 c7c5 g1f3 g7g6"),
        ])
    }

    #[test]
    fn test_lookup_exact_stack() {
        let book = sample_book();
        let moves = vec!["e2e4".to_string(), "c7c5".to_string()];
        assert_eq!(book.lookup(&moves).unwrap().name, "Sicilian Defense");
        assert!(book.lookup(&["e2e4", "c7c5", "g1f3"]).is_none());
        assert!(book.lookup::<&str>(&[]).is_none());
    }

    #[test]
    fn test_continuations() {
        let book = sample_book();
        let names: Vec<&str> = book
            .continuations(&["e2e4"])
            .iter()
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(names, vec!["King's Pawn Game: Open Game", "Sicilian Defense"]);
    }

    #[test]
    fn test_display_name_strips_parent() {
        let book = sample_book();
        let parent = book.lookup(&["e2e4"]);
        let open = book.lookup(&["e2e4", "e7e5"]).unwrap();
        assert_eq!(open.display_name(parent), "Open Game");
        assert_eq!(open.display_name(None), "King's Pawn Game: Open Game");

        let sicilian = book.lookup(&["e2e4", "c7c5"]).unwrap();
        assert_eq!(sicilian.display_name(parent), "Sicilian Defense");
    }

    #[test]
    fn test_save_and_load() {
        let book = sample_book();
        let path = std::env::temp_dir().join(format!("openings-{}.bin", std::process::id()));
        book.save(&path).unwrap();
        let loaded = OpeningBook::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.len(), book.len());
        assert_eq!(loaded.lookup(&["e2e4"]), book.lookup(&["e2e4"]));
    }

    #[test]
    fn test_parse_tsv() {
        let tsv = "eco\tname\tpgn\tuci\tepd\n\
            B20\tSicilian Defense\t1. e4 c5\te2e4 c7c5\trnbqkbnr/pp1ppppp/8/2p5/4P3/8/PPPP1PPP/RNBQKBNR w KQkq -\n\
            A00\tBroken Line\t1. e5\te2e5\t-\n\
            short row\n\
            \n\
            C20\tKing's Pawn Game: Open Game\t1. e4 e5\te2e4 e7e5\t-\n";
        let openings = parse_tsv(tsv.as_bytes()).unwrap();
        assert_eq!(openings.len(), 2);
        assert_eq!(openings[0].eco, "B20");
        assert_eq!(openings[0].move_stack, vec!["e2e4", "c7c5"]);

        let book = OpeningBook::from_openings(openings);
        assert_eq!(book.lookup(&["e2e4", "e7e5"]).unwrap().name, "King's Pawn Game: Open Game");
    }

    #[test]
    fn test_missing_file_gives_empty_book() {
        let book = OpeningBook::load_or_empty("/definitely/not/here.bin");
        assert!(book.is_empty());
    }
}
