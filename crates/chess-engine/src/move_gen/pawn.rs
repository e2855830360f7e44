//! Pawn move generation
//!
//! - Single push onto an empty square
//! - Double push from the starting rank when both squares are empty
//! - Diagonal captures onto enemy pieces
//! - En passant onto the recorded target square
//!
//! Promotion is not a distinct move here; it is applied during move
//! execution when a pawn lands on the last rank.

use crate::types::*;

pub fn pawn_moves(state: &ChessState, from: Square, color: PieceColor) -> Vec<Square> {
    let mut moves = Vec::new();
    let dir = color.pawn_direction();

    // Forward pushes
    if let Some(one) = from.offset(dir, 0) {
        if state.is_empty(one) {
            moves.push(one);

            if from.row == color.pawn_start_row() {
                if let Some(two) = from.offset(2 * dir, 0) {
                    if state.is_empty(two) {
                        moves.push(two);
                    }
                }
            }
        }
    }

    // Diagonal captures, en passant included
    for dc in [-1i8, 1] {
        let Some(target) = from.offset(dir, dc) else {
            continue;
        };
        match state.piece_at(target) {
            Some(occupant) if occupant.color != color => moves.push(target),
            None if state.en_passant_target == Some(target) => moves.push(target),
            _ => {}
        }
    }

    moves
}
