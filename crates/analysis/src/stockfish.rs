//! Stockfish engine wrapper using UCI protocol (async I/O)

use std::time::Duration;

use async_trait::async_trait;
use shakmaty::Color;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use crate::engine::{Engine, MoveResult, Score, Strength};
use crate::error::AnalysisError;

/// Extra wait past the search budget before a search counts as hung.
pub const DEFAULT_GRACE: Duration = Duration::from_millis(1000);

/// A single PV line from multi-PV analysis
#[derive(Debug, Clone, Default)]
pub struct PvLine {
    /// Principal variation moves
    pub pv: Vec<String>,
    /// Score from the side to move
    pub score: Option<Score>,
}

/// Everything one `go` command produced
#[derive(Debug, Clone, Default)]
struct SearchOutput {
    lines: Vec<PvLine>,
    best_move: Option<String>,
    ponder: Option<String>,
}

impl SearchOutput {
    fn primary_score(&self) -> Option<Score> {
        self.lines.first().and_then(|l| l.score)
    }
}

/// Stockfish engine instance
pub struct StockfishEngine {
    path: String,
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    strength: Strength,
    grace: Duration,
    /// Set on any failed or timed-out exchange; the process is respawned
    /// before its next use.
    stale: bool,
}

impl StockfishEngine {
    /// Spawn a new Stockfish process and initialize UCI
    pub async fn new(path: &str) -> Result<Self, AnalysisError> {
        let (process, stdin, stdout) = spawn(path)?;

        let mut engine = Self {
            path: path.to_string(),
            process,
            stdin,
            stdout,
            strength: Strength::default(),
            grace: DEFAULT_GRACE,
            stale: false,
        };

        engine.handshake().await?;
        Ok(engine)
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Kill the current process and start a fresh one at the same strength.
    pub async fn restart(&mut self) -> Result<(), AnalysisError> {
        let _ = self.process.start_kill();
        let _ = self.process.wait().await;

        let (process, stdin, stdout) = spawn(&self.path)?;
        self.process = process;
        self.stdin = stdin;
        self.stdout = stdout;
        self.stale = false;

        self.handshake().await
    }

    async fn handshake(&mut self) -> Result<(), AnalysisError> {
        self.send("uci").await?;
        self.wait_for("uciok").await?;

        self.send("setoption name Threads value 1").await?;
        self.send("setoption name Hash value 64").await?;
        self.send(&format!(
            "setoption name Skill Level value {}",
            self.strength.native()
        ))
        .await?;
        self.send("isready").await?;
        self.wait_for("readyok").await
    }

    async fn ensure_ready(&mut self) -> Result<(), AnalysisError> {
        if self.stale {
            warn!(path = %self.path, "Restarting stale Stockfish process");
            self.restart().await?;
        }
        Ok(())
    }

    /// Send a command to Stockfish
    async fn send(&mut self, cmd: &str) -> Result<(), AnalysisError> {
        debug!(cmd, "SF <");
        let written = match self.stdin.write_all(format!("{cmd}\n").as_bytes()).await {
            Ok(()) => self.stdin.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            self.stale = true;
            return Err(AnalysisError::Stockfish(format!("Failed to write to Stockfish: {e}")));
        }
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, AnalysisError> {
        let mut line = String::new();
        let read = match self.stdout.read_line(&mut line).await {
            Ok(read) => read,
            Err(e) => {
                self.stale = true;
                return Err(AnalysisError::Stockfish(format!("Failed to read from Stockfish: {e}")));
            }
        };
        if read == 0 {
            self.stale = true;
            return Err(AnalysisError::Stockfish("Stockfish closed its output".into()));
        }
        let trimmed = line.trim().to_string();
        debug!(line = %trimmed, "SF >");
        Ok(trimmed)
    }

    /// Wait for a specific response line, at most `grace` long.
    async fn wait_for(&mut self, expected: &str) -> Result<(), AnalysisError> {
        let grace = self.grace;
        match tokio::time::timeout(grace, self.read_until(expected)).await {
            Ok(result) => result,
            Err(_) => {
                self.stale = true;
                warn!(expected, ?grace, "Stockfish did not acknowledge");
                Err(AnalysisError::Timeout(grace))
            }
        }
    }

    async fn read_until(&mut self, expected: &str) -> Result<(), AnalysisError> {
        loop {
            if self.read_line().await? == expected {
                return Ok(());
            }
        }
    }

    /// Search `fen` for `limit`, bounded by `limit + grace` of wall time.
    async fn search(
        &mut self,
        fen: &str,
        limit: Duration,
        multipv: usize,
    ) -> Result<SearchOutput, AnalysisError> {
        self.ensure_ready().await?;

        if multipv > 1 {
            self.send(&format!("setoption name MultiPV value {multipv}")).await?;
        }
        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go movetime {}", limit.as_millis().max(1))).await?;

        let deadline = limit + self.grace;
        let outcome = tokio::time::timeout(deadline, self.collect_search(multipv)).await;

        let output = match outcome {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                self.stale = true;
                warn!(?deadline, "Stockfish search timed out");
                return Err(AnalysisError::Timeout(deadline));
            }
        };

        if multipv > 1 {
            self.send("setoption name MultiPV value 1").await?;
        }
        Ok(output)
    }

    async fn collect_search(&mut self, multipv: usize) -> Result<SearchOutput, AnalysisError> {
        let mut output = SearchOutput {
            lines: vec![PvLine::default(); multipv.max(1)],
            ..SearchOutput::default()
        };

        loop {
            let line = self.read_line().await?;

            if line.starts_with("info") && line.contains(" score ") {
                let idx = parse_multipv_index(&line).unwrap_or(1).max(1) as usize - 1;
                if let Some(entry) = output.lines.get_mut(idx) {
                    entry.score = parse_score(&line);
                    if line.contains(" pv ") {
                        entry.pv = parse_pv(&line);
                    }
                }
            } else if line.starts_with("bestmove") {
                let (best_move, ponder) = parse_bestmove(&line);
                output.best_move = best_move;
                output.ponder = ponder;
                return Ok(output);
            }
        }
    }

    /// Send quit command and wait for process to exit
    pub async fn shutdown(&mut self) {
        let _ = self.send("quit").await;
        let _ = self.process.wait().await;
    }
}

#[async_trait]
impl Engine for StockfishEngine {
    async fn configure(&mut self, strength: Strength) -> Result<(), AnalysisError> {
        self.ensure_ready().await?;
        self.strength = strength;
        self.send(&format!(
            "setoption name Skill Level value {}",
            strength.native()
        ))
        .await?;
        self.send("isready").await?;
        self.wait_for("readyok").await
    }

    async fn best_move(&mut self, fen: &str, limit: Duration) -> Result<MoveResult, AnalysisError> {
        let output = self.search(fen, limit, 1).await?;
        Ok(MoveResult {
            best_move: output.best_move,
            ponder: output.ponder,
        })
    }

    async fn evaluate(
        &mut self,
        fen: &str,
        perspective: Color,
        limit: Duration,
    ) -> Result<Score, AnalysisError> {
        let side_to_move = chess_core::board::side_to_move(fen)?;
        let output = self.search(fen, limit, 1).await?;
        let score = output
            .primary_score()
            .ok_or_else(|| AnalysisError::Stockfish(format!("No score reported for {fen}")))?;
        Ok(score.relative_to(side_to_move, perspective))
    }

    async fn top_moves(
        &mut self,
        fen: &str,
        count: usize,
        limit: Duration,
    ) -> Result<Vec<String>, AnalysisError> {
        let output = self.search(fen, limit, count.max(1)).await?;
        Ok(output
            .lines
            .into_iter()
            .filter_map(|line| line.pv.into_iter().next())
            .collect())
    }

    async fn quit(&mut self) {
        self.shutdown().await;
    }
}

impl Drop for StockfishEngine {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        let _ = self.process.start_kill();
    }
}

fn spawn(path: &str) -> Result<(Child, ChildStdin, BufReader<ChildStdout>), AnalysisError> {
    let mut process = Command::new(path)
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| AnalysisError::Stockfish(format!("Failed to spawn Stockfish: {e}")))?;

    let stdin = process
        .stdin
        .take()
        .ok_or_else(|| AnalysisError::Stockfish("Stockfish stdin unavailable".into()))?;
    let stdout = process
        .stdout
        .take()
        .ok_or_else(|| AnalysisError::Stockfish("Stockfish stdout unavailable".into()))?;

    Ok((process, stdin, BufReader::new(stdout)))
}

/// Value following `key` in a whitespace-separated info line
fn parse_after<T: std::str::FromStr>(line: &str, key: &str) -> Option<T> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == key && i + 1 < parts.len() {
            return parts[i + 1].parse().ok();
        }
    }
    None
}

/// Parse score (centipawns or mate) from info line
fn parse_score(line: &str) -> Option<Score> {
    if let Some(cp) = parse_after::<i32>(line, "cp") {
        return Some(Score::Cp(cp));
    }
    parse_after::<i32>(line, "mate").map(Score::Mate)
}

/// Parse multipv index from info line
fn parse_multipv_index(line: &str) -> Option<u32> {
    parse_after(line, "multipv")
}

/// Parse PV moves from info line
fn parse_pv(line: &str) -> Vec<String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let mut in_pv = false;
    let mut moves = Vec::new();

    for part in parts {
        if part == "pv" {
            in_pv = true;
            continue;
        }
        if in_pv {
            // PV ends at next keyword or end of line
            if part.starts_with("bmc") || part == "string" {
                break;
            }
            moves.push(part.to_string());
        }
    }

    moves
}

/// Parse `bestmove <move> [ponder <move>]`; `(none)` means no legal move
fn parse_bestmove(line: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let best = parts
        .get(1)
        .filter(|m| **m != "(none)")
        .map(|m| m.to_string());
    let ponder = match (parts.get(2), parts.get(3)) {
        (Some(&"ponder"), Some(m)) => Some(m.to_string()),
        _ => None,
    };
    (best, ponder)
}
