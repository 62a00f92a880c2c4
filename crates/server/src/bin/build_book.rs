//! Build the opening book from the chess-openings TSV files.
//!
//! Reads every `*.tsv` file (columns `eco name pgn uci epd`) in a directory and
//! writes a bincode-serialized opening book.
//!
//! Usage: cargo run --release --bin build-book -- <tsv_dir> [--out data/openings.bin]
//!
//! Example:
//!   git clone https://github.com/niklasf/chess-openings.git
//!   cargo run --release --bin build-book -- chess-openings/

use std::env;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use chess_core::openings::{parse_tsv, OpeningBook, BOOK_FILE_PATH};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <tsv_dir> [--out PATH]", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  cargo run --release --bin build-book -- chess-openings/");
        std::process::exit(1);
    }

    let tsv_dir = &args[1];
    let out = args
        .iter()
        .position(|a| a == "--out")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
        .unwrap_or(BOOK_FILE_PATH);

    let pattern = format!("{}/*.tsv", tsv_dir.trim_end_matches('/'));
    let mut tsv_files: Vec<_> = glob::glob(&pattern)?.filter_map(|p| p.ok()).collect();
    tsv_files.sort();

    if tsv_files.is_empty() {
        eprintln!("No TSV files found in {}", tsv_dir);
        std::process::exit(1);
    }

    println!("Found {} TSV files", tsv_files.len());

    let mut openings = Vec::new();
    for path in &tsv_files {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let parsed = parse_tsv(BufReader::new(file))
            .with_context(|| format!("Failed to read {}", path.display()))?;
        println!("  {:>5} openings from {}", parsed.len(), path.display());
        openings.extend(parsed);
    }

    let book = OpeningBook::from_openings(openings);

    let book_path = Path::new(out);
    if let Some(parent) = book_path.parent() {
        fs::create_dir_all(parent)?;
    }
    book.save(book_path)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", out, e))?;

    let file_size = fs::metadata(book_path)?.len();
    println!();
    println!("Done!");
    println!("  Output: {}", out);
    println!("  Size: {} KB", file_size / 1024);
    println!("  Openings: {}", book.len());

    Ok(())
}
