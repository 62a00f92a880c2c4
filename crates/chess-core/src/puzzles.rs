//! Read-only puzzle repository.
//!
//! Two kinds of puzzle are kept: single-move tactics grouped by type, and
//! forced mates grouped by the number of moves to mate. Like the opening
//! book, the collection is a bincode file loaded once at startup.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::board::{self, color_name};

/// Default path to the binary puzzle file.
pub const PUZZLE_FILE_PATH: &str = "data/puzzles.bin";

/// One winning move from `starting_fen`, and the reply expected after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleMovePuzzle {
    #[serde(rename = "type")]
    pub kind: String,
    /// Score swing the move wins for the side to move.
    pub gain: f64,
    pub starting_fen: String,
    pub ending_fen: String,
    /// `"white"` or `"black"`
    pub to_move: String,
    #[serde(rename = "move")]
    pub uci: String,
    pub follow_move: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MateInN {
    pub starting_fen: String,
    pub to_move: String,
    pub moves_to_mate: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PuzzleBook {
    single_moves: Vec<SingleMovePuzzle>,
    mates: Vec<MateInN>,
}

impl PuzzleBook {
    pub fn from_puzzles(single_moves: Vec<SingleMovePuzzle>, mates: Vec<MateInN>) -> Self {
        Self {
            single_moves,
            mates,
        }
    }

    /// Load the puzzles from a binary file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let file = File::open(path)?;
        Ok(bincode::deserialize_from(BufReader::new(file))?)
    }

    /// Load the puzzles, falling back to an empty collection when the file is missing.
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(book) => {
                tracing::info!(
                    "Loaded puzzles: {} single-move, {} mate-in-n",
                    book.single_moves.len(),
                    book.mates.len()
                );
                book
            }
            Err(e) => {
                tracing::warn!("Failed to load puzzles from {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let file = File::create(path)?;
        bincode::serialize_into(file, self)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.single_moves.len() + self.mates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn single_moves_of(&self, kind: &str) -> Vec<&SingleMovePuzzle> {
        self.single_moves.iter().filter(|p| p.kind == kind).collect()
    }

    pub fn mates_in(&self, n: u32) -> Vec<&MateInN> {
        self.mates.iter().filter(|p| p.moves_to_mate == n).collect()
    }

    pub fn random_single_move<R: Rng + ?Sized>(&self, kind: &str, rng: &mut R) -> Option<&SingleMovePuzzle> {
        self.single_moves_of(kind).choose(rng).copied()
    }

    pub fn random_mate_in<R: Rng + ?Sized>(&self, n: u32, rng: &mut R) -> Option<&MateInN> {
        self.mates_in(n).choose(rng).copied()
    }

    /// Single-move puzzle types with their counts, rarest first.
    pub fn type_counts(&self) -> Vec<(&str, usize)> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for p in &self.single_moves {
            *counts.entry(p.kind.as_str()).or_default() += 1;
        }
        let mut counts: Vec<(&str, usize)> = counts.into_iter().collect();
        counts.sort_by_key(|&(_, count)| count);
        counts
    }
}

/// Header-addressed TSV rows. Rows that lack a required column are skipped.
struct Rows {
    columns: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl Rows {
    fn read<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let mut lines = reader.lines();
        let columns = match lines.next() {
            Some(header) => header?
                .split('\t')
                .enumerate()
                .map(|(i, name)| (name.trim().to_string(), i))
                .collect(),
            None => HashMap::new(),
        };
        let mut rows = Vec::new();
        for line in lines {
            let line = line?;
            if !line.trim().is_empty() {
                rows.push(line.split('\t').map(|c| c.trim().to_string()).collect());
            }
        }
        Ok(Self { columns, rows })
    }

    fn get<'a>(&self, row: &'a [String], name: &str) -> Option<&'a str> {
        let value = row.get(*self.columns.get(name)?)?.as_str();
        (!value.is_empty() && value != "NULL").then_some(value)
    }
}

/// Parse an export of single-move puzzles with the columns
/// `type gain starting_fen move follow_move` (others are ignored).
///
/// `to_move` and `ending_fen` are derived from the position and move; rows
/// whose move is illegal are skipped.
pub fn parse_single_move_tsv<R: BufRead>(reader: R) -> std::io::Result<Vec<SingleMovePuzzle>> {
    let table = Rows::read(reader)?;
    let mut puzzles = Vec::new();

    for (i, row) in table.rows.iter().enumerate() {
        let (Some(kind), Some(fen), Some(uci)) = (
            table.get(row, "type"),
            table.get(row, "starting_fen"),
            table.get(row, "move"),
        ) else {
            tracing::warn!(row = i + 1, "Skipping puzzle row with missing columns");
            continue;
        };
        let (Ok(ending_fen), Ok(side)) = (board::apply(fen, uci), board::side_to_move(fen)) else {
            tracing::warn!(row = i + 1, fen, uci, "Skipping puzzle with illegal move");
            continue;
        };

        puzzles.push(SingleMovePuzzle {
            kind: kind.to_string(),
            gain: table.get(row, "gain").and_then(|g| g.parse().ok()).unwrap_or(0.0),
            starting_fen: fen.to_string(),
            ending_fen,
            to_move: color_name(side).to_string(),
            uci: uci.to_string(),
            follow_move: table.get(row, "follow_move").map(str::to_string),
        });
    }

    Ok(puzzles)
}

/// Parse an export of mate puzzles with the columns `starting_fen moves_to_mate`.
pub fn parse_mate_tsv<R: BufRead>(reader: R) -> std::io::Result<Vec<MateInN>> {
    let table = Rows::read(reader)?;
    let mut puzzles = Vec::new();

    for (i, row) in table.rows.iter().enumerate() {
        let fen = table.get(row, "starting_fen");
        let n = table.get(row, "moves_to_mate").and_then(|n| n.parse().ok());
        let (Some(fen), Some(moves_to_mate)) = (fen, n) else {
            tracing::warn!(row = i + 1, "Skipping mate row with missing columns");
            continue;
        };
        let Ok(side) = board::side_to_move(fen) else {
            tracing::warn!(row = i + 1, fen, "Skipping mate with invalid FEN");
            continue;
        };

        puzzles.push(MateInN {
            starting_fen: fen.to_string(),
            to_move: color_name(side).to_string(),
            moves_to_mate,
        });
    }

    Ok(puzzles)
}
