//! Board adapter over shakmaty.
//!
//! Positions cross crate boundaries as FEN strings and moves as UCI strings, so
//! callers never hold a `Chess` value across an engine call.

use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Position, Role};

use crate::error::BoardError;

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Terminal state of a position as the rules library sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Ongoing,
    Checkmate { winner: Color },
    Stalemate,
    /// Insufficient material or the fifty-move rule.
    Draw,
}

/// Parse a FEN string into a position.
pub fn parse_position(fen: &str) -> Result<Chess, BoardError> {
    let parsed: Fen = fen.parse().map_err(|e| invalid_fen(fen, e))?;
    let pos: Chess = parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| invalid_fen(fen, e))?;
    Ok(pos)
}

/// Serialize a position back to FEN.
pub fn to_fen(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

/// Apply a UCI move and return the resulting FEN.
pub fn apply(fen: &str, uci: &str) -> Result<String, BoardError> {
    let mut pos = parse_position(fen)?;
    let mv = resolve_move(&pos, fen, uci)?;
    pos.play_unchecked(mv);
    Ok(to_fen(&pos))
}

pub fn is_check(fen: &str) -> Result<bool, BoardError> {
    Ok(parse_position(fen)?.is_check())
}

pub fn side_to_move(fen: &str) -> Result<Color, BoardError> {
    Ok(parse_position(fen)?.turn())
}

/// Piece kind captured by `uci` when played from `fen`.
///
/// Reads the destination square before the move. When the destination is
/// empty (en passant) the capture is re-derived from the material the
/// opponent lost in the resulting position.
pub fn capture_at(fen: &str, uci: &str) -> Result<Option<Role>, BoardError> {
    let pos = parse_position(fen)?;
    let mv = resolve_move(&pos, fen, uci)?;
    let mover = pos.turn();

    if let Some(piece) = pos.board().piece_at(mv.to()) {
        if piece.color != mover {
            return Ok(Some(piece.role));
        }
    }

    let mut after = pos.clone();
    after.play_unchecked(mv);
    Ok(lost_role(&pos, &after, !mover))
}

/// Terminal classification of a position.
pub fn terminal_outcome(fen: &str) -> Result<Terminal, BoardError> {
    let pos = parse_position(fen)?;
    let terminal = if pos.is_checkmate() {
        Terminal::Checkmate { winner: !pos.turn() }
    } else if pos.is_stalemate() {
        Terminal::Stalemate
    } else if pos.is_insufficient_material() || pos.halfmoves() >= 100 {
        Terminal::Draw
    } else {
        Terminal::Ongoing
    };
    Ok(terminal)
}

/// Standard algebraic notation for a UCI move played from `fen`.
pub fn san(fen: &str, uci: &str) -> Result<String, BoardError> {
    let pos = parse_position(fen)?;
    let mv = resolve_move(&pos, fen, uci)?;
    Ok(San::from_move(&pos, mv).to_string())
}

/// Display name of the destination square of a move, e.g. `"e4"`.
pub fn square_name(fen: &str, uci: &str) -> Result<String, BoardError> {
    let pos = parse_position(fen)?;
    let mv = resolve_move(&pos, fen, uci)?;
    Ok(mv.to().to_string())
}

pub fn piece_name(role: Role) -> &'static str {
    match role {
        Role::Pawn => "pawn",
        Role::Knight => "knight",
        Role::Bishop => "bishop",
        Role::Rook => "rook",
        Role::Queen => "queen",
        Role::King => "king",
    }
}

pub fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}

fn resolve_move(pos: &Chess, fen: &str, uci: &str) -> Result<Move, BoardError> {
    let illegal = || BoardError::IllegalMove {
        fen: fen.to_string(),
        uci: uci.to_string(),
    };
    let parsed: UciMove = uci.parse().map_err(|_| illegal())?;
    parsed.to_move(pos).map_err(|_| illegal())
}

fn lost_role(before: &Chess, after: &Chess, color: Color) -> Option<Role> {
    Role::ALL.into_iter().find(|role| {
        let piece = role.of(color);
        after.board().by_piece(piece).count() < before.board().by_piece(piece).count()
    })
}

fn invalid_fen(fen: &str, reason: impl std::fmt::Display) -> BoardError {
    BoardError::InvalidFen {
        fen: fen.to_string(),
        reason: reason.to_string(),
    }
}
