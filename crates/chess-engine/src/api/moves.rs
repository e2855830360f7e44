//! Move validation and execution
//!
//! `valid_moves` filters raw generation through a king-safety simulation;
//! `make_move` re-validates, applies the move to a fresh copy of the state
//! and recomputes clocks, rights, en passant and the game status.

use crate::error::{MoveError, MoveResult};
use crate::move_gen::{raw_moves, square_attacked};
use crate::types::*;

use super::state::{has_any_legal_move, is_in_check};

/// The successor state together with the move that produced it
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub state: ChessState,
    pub record: MoveRecord,
}

/// Legal destinations for the piece on `from`
///
/// Empty when the square is empty, when the piece belongs to the opponent of
/// the player to move, or when every geometric move would leave the mover's
/// own king attacked.
pub fn valid_moves(state: &ChessState, from: Square) -> Vec<Square> {
    match state.piece_at(from) {
        Some(piece) if piece.color == state.current_player => legal_moves_from(state, from),
        _ => Vec::new(),
    }
}

/// Legal destinations regardless of whose turn it is
///
/// Used both by `valid_moves` and by terminal detection, which probes the
/// side that has just come to move.
pub(crate) fn legal_moves_from(state: &ChessState, from: Square) -> Vec<Square> {
    let Some(piece) = state.piece_at(from) else {
        return Vec::new();
    };

    raw_moves(state, from)
        .into_iter()
        .filter(|&to| !leaves_king_exposed(state, from, to, piece.color))
        .collect()
}

/// Simulate the move on a scratch copy and test whether the mover's king
/// ends up attacked
fn leaves_king_exposed(state: &ChessState, from: Square, to: Square, color: PieceColor) -> bool {
    let mut scratch = state.clone();
    apply_piece_move(&mut scratch, from, to);
    match scratch.king_square(color) {
        Some(king) => square_attacked(&scratch, king, color.opposite()),
        None => false,
    }
}

/// Apply the move from `from` to `to`, validating legality first
///
/// Handles castling rook transit, en-passant capture, and promotion (queen
/// unless `promotion` names another piece). The input state is untouched.
pub fn make_move(
    state: &ChessState,
    from: Square,
    to: Square,
    promotion: Option<PieceType>,
) -> MoveResult<MoveOutcome> {
    if state.game_status.is_terminal() {
        return Err(MoveError::GameOver);
    }

    let piece = state.piece_at(from).ok_or(MoveError::EmptySquare(from))?;
    if piece.color != state.current_player {
        return Err(MoveError::WrongColor(from));
    }

    if let Some(target) = promotion {
        if matches!(target, PieceType::King | PieceType::Pawn) {
            return Err(MoveError::InvalidPromotion(target));
        }
    }

    if !valid_moves(state, from).contains(&to) {
        return Err(MoveError::IllegalMove { from, to });
    }

    // Kings are never capturable; a position offering one is corrupt
    if state
        .piece_at(to)
        .is_some_and(|p| p.piece_type == PieceType::King)
    {
        return Err(MoveError::KingCapture);
    }

    let mover = piece.color;
    let mut next = state.clone();

    let is_en_passant = piece.piece_type == PieceType::Pawn
        && next.en_passant_target == Some(to)
        && from.col != to.col;
    let is_castle =
        piece.piece_type == PieceType::King && (to.col as i8 - from.col as i8).abs() == 2;
    let is_two_square =
        piece.piece_type == PieceType::Pawn && (to.row as i8 - from.row as i8).abs() == 2;

    let captured = apply_piece_move(&mut next, from, to);
    if let Some(victim) = captured {
        next.captured_pieces.record(mover, victim);
    }

    let mut promoted = None;
    if piece.piece_type == PieceType::Pawn && to.row == mover.promotion_row() {
        let target = promotion.unwrap_or(PieceType::Queen);
        next.set_piece(to, Some(Piece::new(target, mover)));
        promoted = Some(target);
    }

    if captured.is_some() || piece.piece_type == PieceType::Pawn {
        next.half_move_clock = 0;
    } else {
        next.half_move_clock += 1;
    }
    if mover == PieceColor::Black {
        next.full_move_number += 1;
    }

    update_castling_rights(&mut next, piece, from, to);

    next.en_passant_target = if is_two_square {
        Some(Square::new((from.row + to.row) / 2, from.col))
    } else {
        None
    };

    next.current_player = mover.opposite();

    let in_check = is_in_check(&next, next.current_player);
    let has_replies = has_any_legal_move(&next, next.current_player);
    next.game_status = match (in_check, has_replies) {
        (true, false) => {
            next.winner = Some(mover);
            GameStatus::Checkmate
        }
        (true, true) => GameStatus::Check,
        (false, false) => GameStatus::Stalemate,
        (false, true) => GameStatus::Active,
    };

    let record = MoveRecord {
        from,
        to,
        piece,
        captured,
        promotion: promoted,
        is_castle,
        is_en_passant,
    };
    next.move_history.push(record);

    Ok(MoveOutcome {
        state: next,
        record,
    })
}

/// Move the piece on the board only, returning any captured piece
///
/// Shared between real execution and king-safety simulation, so it also
/// performs the en-passant removal and the castling rook transit but leaves
/// clocks, rights and status untouched.
fn apply_piece_move(state: &mut ChessState, from: Square, to: Square) -> Option<Piece> {
    let Some(piece) = state.piece_at(from) else {
        return None;
    };

    let mut captured = state.piece_at(to);

    if piece.piece_type == PieceType::Pawn
        && state.en_passant_target == Some(to)
        && from.col != to.col
        && captured.is_none()
    {
        let victim_square = Square::new(from.row, to.col);
        captured = state.piece_at(victim_square);
        state.set_piece(victim_square, None);
    }

    if piece.piece_type == PieceType::King && (to.col as i8 - from.col as i8).abs() == 2 {
        let back = from.row;
        let (rook_from, rook_to) = if to.col == 6 {
            (Square::new(back, 7), Square::new(back, 5))
        } else {
            (Square::new(back, 0), Square::new(back, 3))
        };
        let rook = state.piece_at(rook_from);
        state.set_piece(rook_from, None);
        state.set_piece(rook_to, rook);
    }

    state.set_piece(to, Some(piece));
    state.set_piece(from, None);

    captured
}

/// Any king move voids both rights; a rook leaving a home corner, or a
/// capture landing on an enemy home corner, voids the matching side
fn update_castling_rights(next: &mut ChessState, piece: Piece, from: Square, to: Square) {
    let mover = piece.color;

    match piece.piece_type {
        PieceType::King => {
            *next.castling_rights.for_color_mut(mover) = SideCastling::none();
        }
        PieceType::Rook => {
            let back = mover.back_row();
            let rights = next.castling_rights.for_color_mut(mover);
            if from == Square::new(back, 0) {
                rights.queen_side = false;
            } else if from == Square::new(back, 7) {
                rights.king_side = false;
            }
        }
        _ => {}
    }

    let enemy = mover.opposite();
    let enemy_back = enemy.back_row();
    let enemy_rights = next.castling_rights.for_color_mut(enemy);
    if to == Square::new(enemy_back, 0) {
        enemy_rights.queen_side = false;
    } else if to == Square::new(enemy_back, 7) {
        enemy_rights.king_side = false;
    }
}
