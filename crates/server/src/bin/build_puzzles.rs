//! Build the puzzle book from table exports.
//!
//! Usage: cargo run --release --bin build-puzzles -- <single_move.tsv> <mate_in_n.tsv> [--out data/puzzles.bin]
//!
//! `single_move.tsv` needs the columns `type gain starting_fen move follow_move`
//! and `mate_in_n.tsv` the columns `starting_fen moves_to_mate`, each with a
//! header row. Other columns are ignored.

use std::env;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use chess_core::puzzles::{parse_mate_tsv, parse_single_move_tsv, PuzzleBook, PUZZLE_FILE_PATH};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <single_move.tsv> <mate_in_n.tsv> [--out PATH]", args[0]);
        std::process::exit(1);
    }

    let out = args
        .iter()
        .position(|a| a == "--out")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
        .unwrap_or(PUZZLE_FILE_PATH);

    let single = File::open(&args[1]).with_context(|| format!("Failed to open {}", args[1]))?;
    let single_moves = parse_single_move_tsv(BufReader::new(single))?;
    println!("  {:>6} single-move puzzles from {}", single_moves.len(), args[1]);

    let mates = File::open(&args[2]).with_context(|| format!("Failed to open {}", args[2]))?;
    let mates = parse_mate_tsv(BufReader::new(mates))?;
    println!("  {:>6} mate-in-n puzzles from {}", mates.len(), args[2]);

    let book = PuzzleBook::from_puzzles(single_moves, mates);
    for (kind, count) in book.type_counts() {
        println!("  {:>6} {}", count, kind);
    }

    let path = Path::new(out);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    book.save(path)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", out, e))?;

    println!();
    println!("Done! {} puzzles written to {}", book.len(), out);
    Ok(())
}
